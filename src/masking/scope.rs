//! Active redaction context for the current unit of work
//!
//! A context is installed per task with [`run`] (or [`run_sync`] for
//! synchronous callers) and is uninstalled when that future or closure
//! finishes. There is no process-wide default: code running outside a
//! scope gets [`Error::NoActiveContext`] and must fail closed.
//!
//! Installation does not propagate into `tokio::spawn`ed tasks; each task
//! that masks must install its own context.

use super::context::{resolve_placeholder, RedactionContext};
use crate::error::{Error, Result};
use std::future::Future;
use std::sync::{Arc, Mutex};

tokio::task_local! {
    static ACTIVE: SharedContext;
}

/// A redaction context that can be installed as the active context and
/// inspected by the caller afterwards.
#[derive(Debug, Clone)]
pub struct SharedContext(Arc<Mutex<RedactionContext>>);

impl SharedContext {
    pub fn new(context: RedactionContext) -> Self {
        Self(Arc::new(Mutex::new(context)))
    }

    /// Run `f` with exclusive access to the context.
    pub fn with<R>(&self, f: impl FnOnce(&mut RedactionContext) -> R) -> Result<R> {
        let mut guard = self
            .0
            .lock()
            .map_err(|_| Error::Internal("redaction context lock poisoned".to_string()))?;
        Ok(f(&mut guard))
    }

    /// Erase all stored values. Tokens issued so far stop resolving.
    pub fn clear(&self) -> Result<()> {
        self.with(|ctx| ctx.clear())
    }
}

impl From<RedactionContext> for SharedContext {
    fn from(context: RedactionContext) -> Self {
        Self::new(context)
    }
}

/// Run `fut` with `context` installed as the active context.
pub async fn run<F: Future>(context: SharedContext, fut: F) -> F::Output {
    ACTIVE.scope(context, fut).await
}

/// Run `f` with `context` installed as the active context.
pub fn run_sync<R>(context: SharedContext, f: impl FnOnce() -> R) -> R {
    ACTIVE.sync_scope(context, f)
}

/// The context installed for the current unit of work.
pub fn active() -> Result<SharedContext> {
    ACTIVE.try_with(|ctx| ctx.clone()).map_err(|_| {
        tracing::warn!("PII masking requested outside a redaction scope");
        Error::NoActiveContext
    })
}

pub fn is_active() -> bool {
    ACTIVE.try_with(|_| ()).is_ok()
}

/// Run `f` against the active context.
pub fn with_active<R>(f: impl FnOnce(&mut RedactionContext) -> R) -> Result<R> {
    active()?.with(f)
}

/// Resolve a single placeholder against the active context.
pub fn resolve_pii_reference(token: &str) -> Result<Option<String>> {
    with_active(|ctx| resolve_placeholder(ctx, token).map(str::to_string))
}
