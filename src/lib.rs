//! Veil - Reversible PII masking for LLM-backed personal assistants
//!
//! Veil sits between a user and an external language model. Personal data in
//! outbound text is replaced by typed placeholders before the model sees it,
//! and placeholders the model echoes back are restored before the reply
//! reaches the user. Originals never leave the process.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          Unit of work                               │
//! │  ┌───────────────────────────────────────────────────────────────┐  │
//! │  │             RedactionContext (task-local scope)               │  │
//! │  │  - Placeholder counters per category                          │  │
//! │  │  - [TOKEN] -> original value (zeroized on clear/drop)         │  │
//! │  └───────────────▲───────────────────────────┬───────────────────┘  │
//! │                  │ record                    │ resolve              │
//! │  ┌───────────────┴───────────────────────────▼───────────────────┐  │
//! │  │                     MaskingEngine                             │  │
//! │  │  mask / mask_message_for_llm / mask_dict / mask_tool_call_args│  │
//! │  │  unmask / resolve_pii_reference                               │  │
//! │  └───────────────┬───────────────────────────┬───────────────────┘  │
//! │                  │ detect                    │ counts only          │
//! │  ┌───────────────▼───────────┐   ┌───────────▼───────────────────┐  │
//! │  │      PatternCatalog       │   │         AuditQueue            │  │
//! │  │  email card dob ssn       │   │  bounded, drop-oldest         │  │
//! │  │  account phone address    │   │  flushed to an AuditSink      │  │
//! │  └───────────────────────────┘   └───────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`masking`]: Detection, placeholders, redaction contexts and the engine
//! - [`audit`]: Masking event queue and periodic flushing
//! - [`config`]: Configuration management
//! - [`error`]: Error types

pub mod audit;
pub mod config;
pub mod error;
pub mod masking;

pub use config::VeilConfig;
pub use error::{Error, Result};
