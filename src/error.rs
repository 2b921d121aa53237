//! Veil error types

use thiserror::Error;

/// Veil error type
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// No redaction context installed for the current unit of work.
    ///
    /// Masking without a context would lose the information needed to
    /// reverse it, so callers must refuse to forward the affected text.
    #[error("No active redaction context; refusing to mask without a place to store reversals")]
    NoActiveContext,

    /// Pattern compilation error
    #[error("Pattern error: {0}")]
    Pattern(String),

    /// Audit queue or sink error
    #[error("Audit error: {0}")]
    Audit(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Veil operations
pub type Result<T> = std::result::Result<T, Error>;
