//! Redaction context: the per-unit-of-work store of placeholder reversals
//!
//! A context is created by the caller at the start of one logical unit of
//! work (one inbound request, one chat turn) and cleared or dropped at the
//! end. Original values live only in memory and are zeroized when the
//! context is cleared or dropped.
//!
//! Two independently created contexts share nothing: each owns its own
//! counters, mappings and audit trail.

use super::category::PiiCategory;
use super::placeholder::{Placeholder, PlaceholderAllocator};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Caller-supplied identity of the unit of work, copied into audit events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextMetadata {
    pub user_id: Option<String>,
    pub request_id: Option<String>,
    pub endpoint: Option<String>,
}

/// One stored reversal.
#[derive(Zeroize, ZeroizeOnDrop)]
struct RedactionEntry {
    value: String,
    #[zeroize(skip)]
    category: PiiCategory,
    #[zeroize(skip)]
    order: u64,
}

/// Audit trail entry. Never carries the original value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub category: PiiCategory,
    pub placeholder: String,
    pub masked_at: DateTime<Utc>,
}

/// Per-category masking counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskingStats {
    pub counts: BTreeMap<PiiCategory, usize>,
    pub total: usize,
}

impl MaskingStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, category: PiiCategory) {
        *self.counts.entry(category).or_insert(0) += 1;
        self.total += 1;
    }

    /// Count for one category (0 if never seen).
    pub fn get(&self, category: PiiCategory) -> usize {
        self.counts.get(&category).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Fold another set of counts into this one.
    pub fn merge(&mut self, other: &MaskingStats) {
        for (category, count) in &other.counts {
            *self.counts.entry(*category).or_insert(0) += count;
        }
        self.total += other.total;
    }
}

/// Scoped store mapping placeholder tokens to original values.
pub struct RedactionContext {
    id: Uuid,
    metadata: ContextMetadata,
    created_at: DateTime<Utc>,
    allocator: PlaceholderAllocator,
    entries: HashMap<String, RedactionEntry>,
    // placeholder-shaped text seen in input; never issued
    reserved: HashSet<String>,
    audit: Vec<AuditEntry>,
    next_order: u64,
}

impl RedactionContext {
    /// Create an empty context with no caller metadata.
    pub fn new() -> Self {
        Self::with_metadata(ContextMetadata::default())
    }

    pub fn with_metadata(metadata: ContextMetadata) -> Self {
        Self {
            id: Uuid::new_v4(),
            metadata,
            created_at: Utc::now(),
            allocator: PlaceholderAllocator::new(),
            entries: HashMap::new(),
            reserved: HashSet::new(),
            audit: Vec::new(),
            next_order: 0,
        }
    }

    /// Create a context for one inbound request.
    pub fn for_request(user_id: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self::with_metadata(ContextMetadata {
            user_id: Some(user_id.into()),
            request_id: Some(request_id.into()),
            endpoint: None,
        })
    }

    /// Set the endpoint reported in audit events.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.metadata.endpoint = Some(endpoint.into());
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn metadata(&self) -> &ContextMetadata {
        &self.metadata
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Allocate a placeholder for `value`, store the reversal, and return
    /// the token.
    pub fn record(&mut self, category: PiiCategory, value: &str) -> String {
        let token = loop {
            let token = self.allocator.next(category).token();
            if !self.reserved.contains(&token) && !self.entries.contains_key(&token) {
                break token;
            }
        };
        self.entries.insert(
            token.clone(),
            RedactionEntry {
                value: value.to_string(),
                category,
                order: self.next_order,
            },
        );
        self.next_order += 1;
        self.audit.push(AuditEntry {
            category,
            placeholder: token.clone(),
            masked_at: Utc::now(),
        });
        token
    }

    /// Mark a placeholder that already appears in caller text as taken so
    /// [`record`](Self::record) never issues it. Reserved tokens do not
    /// resolve.
    pub fn reserve(&mut self, token: &str) {
        if Placeholder::parse(token).is_some() && !self.entries.contains_key(token) {
            self.reserved.insert(token.to_string());
        }
    }

    /// Original value for a previously issued token.
    ///
    /// `None` is a normal outcome: unknown, foreign, or cleared tokens
    /// simply do not resolve.
    pub fn resolve(&self, token: &str) -> Option<&str> {
        self.entries.get(token).map(|e| e.value.as_str())
    }

    /// Category recorded for a token.
    pub fn category_of(&self, token: &str) -> Option<PiiCategory> {
        self.entries.get(token).map(|e| e.category)
    }

    /// Tokens issued so far, in creation order.
    pub fn tokens(&self) -> Vec<String> {
        let mut tokens: Vec<(&String, u64)> =
            self.entries.iter().map(|(t, e)| (t, e.order)).collect();
        tokens.sort_by_key(|(_, order)| *order);
        tokens.into_iter().map(|(t, _)| t.clone()).collect()
    }

    /// Counts per category over every value recorded in this context.
    pub fn stats(&self) -> MaskingStats {
        let mut stats = MaskingStats::new();
        for entry in self.entries.values() {
            stats.add(entry.category);
        }
        stats
    }

    /// Ordered audit trail. Contains placeholders and categories only.
    pub fn audit_log(&self) -> &[AuditEntry] {
        &self.audit
    }

    /// Number of placeholders issued so far for `category`.
    pub fn issued(&self, category: PiiCategory) -> u32 {
        self.allocator.issued(category)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Erase every stored value and reset counters and audit trail.
    /// Tokens issued before the call no longer resolve.
    pub fn clear(&mut self) {
        // entries zeroize their values on drop
        self.entries.clear();
        self.reserved.clear();
        self.audit.clear();
        self.allocator.reset();
        self.next_order = 0;
        tracing::debug!(context = %self.id, "Redaction context cleared");
    }
}

impl Default for RedactionContext {
    fn default() -> Self {
        Self::new()
    }
}

// Values must never reach logs, so Debug reports counts only.
impl fmt::Debug for RedactionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedactionContext")
            .field("id", &self.id)
            .field("metadata", &self.metadata)
            .field("entries", &self.entries.len())
            .field("audit", &self.audit.len())
            .finish()
    }
}

/// Parse and resolve in one step, for callers holding a raw token.
pub(crate) fn resolve_placeholder<'a>(
    context: &'a RedactionContext,
    token: &str,
) -> Option<&'a str> {
    Placeholder::parse(token)?;
    context.resolve(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_resolve() {
        let mut ctx = RedactionContext::new();
        let token = ctx.record(PiiCategory::Email, "x@y.com");
        assert_eq!(token, "[EMAIL_1]");
        assert_eq!(ctx.resolve("[EMAIL_1]"), Some("x@y.com"));
        assert_eq!(ctx.category_of("[EMAIL_1]"), Some(PiiCategory::Email));
    }

    #[test]
    fn test_repeated_value_gets_new_token() {
        let mut ctx = RedactionContext::new();
        let a = ctx.record(PiiCategory::Phone, "415-555-1234");
        let b = ctx.record(PiiCategory::Phone, "415-555-1234");
        assert_eq!(a, "[PHONE_1]");
        assert_eq!(b, "[PHONE_2]");
        assert_eq!(ctx.resolve(&a), ctx.resolve(&b));
    }

    #[test]
    fn test_resolve_unknown_is_none() {
        let ctx = RedactionContext::new();
        assert_eq!(ctx.resolve("[EMAIL_999]"), None);
        assert_eq!(resolve_placeholder(&ctx, "not a token"), None);
    }

    #[test]
    fn test_stats() {
        let mut ctx = RedactionContext::new();
        ctx.record(PiiCategory::Email, "a@b.com");
        ctx.record(PiiCategory::Email, "c@d.com");
        ctx.record(PiiCategory::Phone, "415-555-1234");

        let stats = ctx.stats();
        assert_eq!(stats.get(PiiCategory::Email), 2);
        assert_eq!(stats.get(PiiCategory::Phone), 1);
        assert_eq!(stats.get(PiiCategory::Ssn), 0);
        assert_eq!(stats.total, 3);
    }

    #[test]
    fn test_audit_log_has_no_values() {
        let mut ctx = RedactionContext::new();
        ctx.record(PiiCategory::Ssn, "123-45-6789");
        ctx.record(PiiCategory::Card, "4111111111111111");

        let log = ctx.audit_log();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].placeholder, "[SSN_1]");
        assert_eq!(log[1].category, PiiCategory::Card);

        let json = serde_json::to_string(log).unwrap();
        assert!(!json.contains("123-45-6789"));
        assert!(!json.contains("4111111111111111"));
    }

    #[test]
    fn test_tokens_in_creation_order() {
        let mut ctx = RedactionContext::new();
        ctx.record(PiiCategory::Phone, "1");
        ctx.record(PiiCategory::Email, "2");
        ctx.record(PiiCategory::Phone, "3");
        assert_eq!(ctx.tokens(), vec!["[PHONE_1]", "[EMAIL_1]", "[PHONE_2]"]);
    }

    #[test]
    fn test_clear_invalidates_tokens() {
        let mut ctx = RedactionContext::new();
        let token = ctx.record(PiiCategory::Email, "x@y.com");
        ctx.clear();

        assert_eq!(ctx.resolve(&token), None);
        assert!(ctx.is_empty());
        assert!(ctx.audit_log().is_empty());
        assert_eq!(ctx.stats().total, 0);
        assert_eq!(ctx.record(PiiCategory::Email, "z@y.com"), "[EMAIL_1]");
    }

    #[test]
    fn test_contexts_are_isolated() {
        let mut a = RedactionContext::new();
        a.record(PiiCategory::Email, "x@y.com");

        let b = RedactionContext::new();
        assert_eq!(b.resolve("[EMAIL_1]"), None);
        assert_eq!(b.issued(PiiCategory::Email), 0);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_debug_hides_values() {
        let mut ctx = RedactionContext::for_request("user-1", "req-1").endpoint("/chat");
        ctx.record(PiiCategory::Email, "secret@example.com");
        let debug = format!("{:?}", ctx);
        assert!(!debug.contains("secret@example.com"));
        assert!(debug.contains("user-1"));
    }

    #[test]
    fn test_reserved_tokens_are_skipped() {
        let mut ctx = RedactionContext::new();
        ctx.reserve("[EMAIL_1]");
        ctx.reserve("[EMAIL_2]");
        ctx.reserve("not a token");

        assert_eq!(ctx.record(PiiCategory::Email, "a@b.com"), "[EMAIL_3]");
        assert_eq!(ctx.record(PiiCategory::Phone, "415-555-1234"), "[PHONE_1]");
        assert_eq!(ctx.resolve("[EMAIL_1]"), None);
        assert_eq!(ctx.len(), 2);

        ctx.clear();
        assert_eq!(ctx.record(PiiCategory::Email, "a@b.com"), "[EMAIL_1]");
    }

    #[test]
    fn test_reserving_issued_token_keeps_it_resolvable() {
        let mut ctx = RedactionContext::new();
        let token = ctx.record(PiiCategory::Ssn, "123-45-6789");
        ctx.reserve(&token);
        assert_eq!(ctx.resolve(&token), Some("123-45-6789"));
        assert_eq!(ctx.record(PiiCategory::Ssn, "987-65-4321"), "[SSN_2]");
    }

    #[test]
    fn test_stats_merge() {
        let mut a = MaskingStats::new();
        a.add(PiiCategory::Email);
        let mut b = MaskingStats::new();
        b.add(PiiCategory::Email);
        b.add(PiiCategory::Dob);
        a.merge(&b);
        assert_eq!(a.get(PiiCategory::Email), 2);
        assert_eq!(a.get(PiiCategory::Dob), 1);
        assert_eq!(a.total, 3);
    }
}
