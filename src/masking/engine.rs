//! Masking engine: detect, substitute, and reverse
//!
//! The engine itself is stateless apart from its compiled catalog and a
//! handle to the audit queue, so one instance is shared across requests.
//! All reversal state lives in the [`RedactionContext`] passed to each
//! call, or in the context installed by [`scope::run`](super::scope::run)
//! for the `*_active` variants.
//!
//! ```text
//! text ─▶ PatternCatalog::detect ─▶ mode filter ─▶ RedactionContext::record ─▶ masked text
//!                                                          │
//!                                                          └─▶ AuditQueue (counts only)
//! masked reply ─▶ TokenScanner ─▶ RedactionContext::resolve ─▶ restored text
//! ```

use super::catalog::{PatternCatalog, PiiSpan};
use super::category::{MaskingMode, MessageRole};
use super::context::{MaskingStats, RedactionContext};
use super::scope;
use crate::audit::{AuditMetadata, AuditQueue};
use crate::config::VeilConfig;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Arguments as JSON; may also be a JSON-encoded string.
    #[serde(default)]
    pub arguments: Value,
}

/// One conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: Option<String>,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
        }
    }
}

/// Extra audit tagging for a single call.
#[derive(Default)]
struct CallTag {
    tool_name: Option<String>,
    role: Option<MessageRole>,
}

/// Orchestrates the pattern catalog, redaction context and audit queue.
pub struct MaskingEngine {
    catalog: Arc<PatternCatalog>,
    audit: Arc<AuditQueue>,
    default_mode: MaskingMode,
}

impl MaskingEngine {
    /// Build an engine with the built-in catalog.
    pub fn new(audit: Arc<AuditQueue>) -> Result<Self> {
        Ok(Self::with_catalog(Arc::new(PatternCatalog::new()?), audit))
    }

    pub fn with_catalog(catalog: Arc<PatternCatalog>, audit: Arc<AuditQueue>) -> Self {
        Self {
            catalog,
            audit,
            default_mode: MaskingMode::default(),
        }
    }

    /// Build an engine and its audit queue from configuration.
    pub fn from_config(config: &VeilConfig) -> Result<Self> {
        let audit = Arc::new(AuditQueue::from_config(&config.audit));
        let mut engine = Self::new(audit)?;
        engine.default_mode = config.masking.default_mode;
        Ok(engine)
    }

    pub fn default_mode(&self) -> MaskingMode {
        self.default_mode
    }

    pub fn audit_queue(&self) -> &Arc<AuditQueue> {
        &self.audit
    }

    pub fn catalog(&self) -> &PatternCatalog {
        &self.catalog
    }

    /// Detect PII spans without masking anything.
    pub fn detect(&self, text: &str) -> Vec<PiiSpan> {
        self.catalog.detect(text)
    }

    pub fn contains_pii(&self, text: &str) -> bool {
        self.catalog.contains_pii(text)
    }

    // =========================================================================
    // Masking with an explicit context
    // =========================================================================

    /// Replace every PII span allowed by `mode` with a placeholder recorded
    /// in `ctx`. Absent input yields absent output.
    pub fn mask<'a>(
        &self,
        ctx: &mut RedactionContext,
        text: impl Into<Option<&'a str>>,
        mode: MaskingMode,
    ) -> Option<String> {
        let text = text.into()?;
        Some(self.mask_tagged(ctx, text, mode, CallTag::default()))
    }

    /// Mask a message about to enter model context (new input or replayed
    /// history). Always uses [`MaskingMode::Full`].
    pub fn mask_message_for_llm<'a>(
        &self,
        ctx: &mut RedactionContext,
        text: impl Into<Option<&'a str>>,
        role: MessageRole,
    ) -> Option<String> {
        let text = text.into()?;
        let tag = CallTag {
            role: Some(role),
            ..Default::default()
        };
        Some(self.mask_tagged(ctx, text, MaskingMode::Full, tag))
    }

    /// Mask every turn of a conversation history for replay.
    pub fn mask_history(
        &self,
        ctx: &mut RedactionContext,
        messages: &[ChatMessage],
    ) -> Vec<ChatMessage> {
        messages
            .iter()
            .map(|m| ChatMessage {
                role: m.role,
                content: self.mask_message_for_llm(ctx, m.content.as_deref(), m.role),
            })
            .collect()
    }

    /// Restore placeholders recorded in `ctx`. Unknown tokens are left
    /// verbatim.
    pub fn unmask<'a>(
        &self,
        ctx: &RedactionContext,
        text: impl Into<Option<&'a str>>,
    ) -> Option<String> {
        let text = text.into()?;
        let tokens = self.catalog.tokens();
        if !tokens.contains_token(text) {
            return Some(text.to_string());
        }
        Some(tokens.replace_with(text, |token| ctx.resolve(token).map(str::to_string)))
    }

    /// Mask string values of a JSON object.
    ///
    /// With `keys_to_mask = None` every string value is masked. Otherwise
    /// only values under the listed keys are masked, at every nesting level;
    /// string elements of an array inherit their key's selection. Non-string
    /// values pass through unchanged.
    pub fn mask_dict(
        &self,
        ctx: &mut RedactionContext,
        map: &Map<String, Value>,
        keys_to_mask: Option<&[&str]>,
        mode: MaskingMode,
    ) -> Map<String, Value> {
        let mut stats = MaskingStats::new();
        let masked = self.mask_map(ctx, map, keys_to_mask, mode, &mut stats);
        self.emit(ctx, &stats, mode, CallTag::default());
        masked
    }

    /// Mask every string argument of each tool call, keeping ids, names and
    /// argument structure intact.
    pub fn mask_tool_call_args(
        &self,
        ctx: &mut RedactionContext,
        calls: &[ToolCall],
    ) -> Vec<ToolCall> {
        calls
            .iter()
            .map(|call| {
                let mut stats = MaskingStats::new();
                let arguments =
                    self.mask_value(ctx, &call.arguments, true, None, MaskingMode::Full, &mut stats);
                let tag = CallTag {
                    tool_name: Some(call.name.clone()),
                    ..Default::default()
                };
                self.emit(ctx, &stats, MaskingMode::Full, tag);
                ToolCall {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    arguments,
                }
            })
            .collect()
    }

    // =========================================================================
    // Masking against the active context
    // =========================================================================

    /// [`mask`](Self::mask) against the active context.
    pub fn mask_active<'a>(
        &self,
        text: impl Into<Option<&'a str>>,
        mode: MaskingMode,
    ) -> Result<Option<String>> {
        let text = text.into();
        scope::with_active(|ctx| self.mask(ctx, text, mode))
    }

    /// [`mask_message_for_llm`](Self::mask_message_for_llm) against the
    /// active context.
    pub fn mask_message_for_llm_active<'a>(
        &self,
        text: impl Into<Option<&'a str>>,
        role: MessageRole,
    ) -> Result<Option<String>> {
        let text = text.into();
        scope::with_active(|ctx| self.mask_message_for_llm(ctx, text, role))
    }

    /// [`unmask`](Self::unmask) against the active context.
    pub fn unmask_active<'a>(&self, text: impl Into<Option<&'a str>>) -> Result<Option<String>> {
        let text = text.into();
        scope::with_active(|ctx| self.unmask(ctx, text))
    }

    /// [`mask_dict`](Self::mask_dict) against the active context.
    pub fn mask_dict_active(
        &self,
        map: &Map<String, Value>,
        keys_to_mask: Option<&[&str]>,
        mode: MaskingMode,
    ) -> Result<Map<String, Value>> {
        scope::with_active(|ctx| self.mask_dict(ctx, map, keys_to_mask, mode))
    }

    /// [`mask_tool_call_args`](Self::mask_tool_call_args) against the
    /// active context.
    pub fn mask_tool_call_args_active(&self, calls: &[ToolCall]) -> Result<Vec<ToolCall>> {
        scope::with_active(|ctx| self.mask_tool_call_args(ctx, calls))
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn mask_tagged(
        &self,
        ctx: &mut RedactionContext,
        text: &str,
        mode: MaskingMode,
        tag: CallTag,
    ) -> String {
        let mut stats = MaskingStats::new();
        let masked = self.mask_text(ctx, text, mode, &mut stats);
        self.emit(ctx, &stats, mode, tag);
        masked
    }

    fn mask_text(
        &self,
        ctx: &mut RedactionContext,
        text: &str,
        mode: MaskingMode,
        stats: &mut MaskingStats,
    ) -> String {
        for range in self.catalog.tokens().ranges(text) {
            ctx.reserve(&text[range]);
        }

        let spans: Vec<PiiSpan> = self
            .catalog
            .detect(text)
            .into_iter()
            .filter(|s| mode.allows(s.category))
            .collect();
        if spans.is_empty() {
            return text.to_string();
        }

        let mut result = String::with_capacity(text.len());
        let mut last = 0;
        for span in spans {
            result.push_str(&text[last..span.start]);
            let token = ctx.record(span.category, &text[span.range()]);
            result.push_str(&token);
            stats.add(span.category);
            last = span.end;
        }
        result.push_str(&text[last..]);
        result
    }

    fn mask_map(
        &self,
        ctx: &mut RedactionContext,
        map: &Map<String, Value>,
        keys: Option<&[&str]>,
        mode: MaskingMode,
        stats: &mut MaskingStats,
    ) -> Map<String, Value> {
        map.iter()
            .map(|(key, value)| {
                let selected = keys.map_or(true, |keys| keys.contains(&key.as_str()));
                let masked = self.mask_value(ctx, value, selected, keys, mode, stats);
                (key.clone(), masked)
            })
            .collect()
    }

    fn mask_value(
        &self,
        ctx: &mut RedactionContext,
        value: &Value,
        selected: bool,
        keys: Option<&[&str]>,
        mode: MaskingMode,
        stats: &mut MaskingStats,
    ) -> Value {
        match value {
            Value::String(s) if selected => Value::String(self.mask_text(ctx, s, mode, stats)),
            Value::Object(map) => Value::Object(self.mask_map(ctx, map, keys, mode, stats)),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.mask_value(ctx, item, selected, keys, mode, stats))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    fn emit(&self, ctx: &RedactionContext, stats: &MaskingStats, mode: MaskingMode, tag: CallTag) {
        if stats.is_empty() {
            return;
        }

        tracing::debug!(
            context = %ctx.id(),
            total = stats.total,
            mode = %mode,
            tool = tag.tool_name.as_deref().unwrap_or("-"),
            role = tag.role.map(|r| r.as_str()).unwrap_or("-"),
            "Masked PII"
        );

        let meta = ctx.metadata();
        self.audit.log_masking_event(
            stats,
            AuditMetadata {
                user_id: meta.user_id.clone(),
                request_id: meta.request_id.clone(),
                endpoint: meta.endpoint.clone(),
                tool_name: tag.tool_name,
                masking_mode: mode,
                message_role: tag.role,
            },
        );
    }
}
