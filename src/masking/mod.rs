//! Reversible PII masking
//!
//! Values found by the [`PatternCatalog`] are swapped for typed placeholder
//! tokens such as `[EMAIL_1]` before text reaches a model. The mapping back
//! to the original value lives only in a [`RedactionContext`] owned by the
//! current unit of work, so a model reply that echoes a token can be
//! restored for the user and nowhere else.
//!
//! ## Categories (priority order)
//!
//! | Category | Prefix    | Financial |
//! |----------|-----------|-----------|
//! | Email    | `EMAIL`   | no        |
//! | Card     | `CARD`    | yes       |
//! | Dob      | `DOB`     | yes       |
//! | Ssn      | `SSN`     | yes       |
//! | Account  | `ACCOUNT` | yes       |
//! | Phone    | `PHONE`   | no        |
//! | Address  | `ADDRESS` | yes       |
//!
//! When two categories match overlapping text, the earlier one in the table
//! wins. Phone numbers written without separators (`+14155551234`) are
//! claimed right after email so they never read as cards or accounts.

pub mod catalog;
pub mod category;
pub mod context;
pub mod engine;
pub mod placeholder;
pub mod scope;

pub use catalog::{PatternCatalog, PiiSpan};
pub use category::{MaskingMode, MessageRole, PiiCategory};
pub use context::{AuditEntry, ContextMetadata, MaskingStats, RedactionContext};
pub use engine::{ChatMessage, MaskingEngine, ToolCall};
pub use placeholder::{Placeholder, PlaceholderAllocator, TokenScanner};
pub use scope::{resolve_pii_reference, SharedContext};
