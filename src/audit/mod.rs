//! Masking audit trail
//!
//! Records how many values of each category were masked per call, with
//! request metadata, for later batch persistence. Raw values never enter
//! this module.
//!
//! ```text
//! MaskingEngine ──log_masking_event──▶ AuditQueue ──flush_once / spawn_flusher──▶ AuditSink
//! ```

pub mod flush;
pub mod queue;

pub use flush::{flush_once, spawn_configured_flusher, spawn_flusher, AuditSink, TracingSink};
pub use queue::{AuditEvent, AuditMetadata, AuditQueue};
