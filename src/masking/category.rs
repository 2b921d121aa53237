//! PII categories, masking modes, and message roles

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A pattern-matchable category of PII.
///
/// Variant order is the detection priority order used by the pattern
/// catalog; see [`PiiCategory::PRIORITY`]. Separator-free dialing numbers
/// are the one exception and are claimed as phones right after email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PiiCategory {
    Email,
    Card,
    Dob,
    Ssn,
    Account,
    Phone,
    Address,
}

impl PiiCategory {
    /// Every category, highest detection priority first.
    pub const PRIORITY: [PiiCategory; 7] = [
        PiiCategory::Email,
        PiiCategory::Card,
        PiiCategory::Dob,
        PiiCategory::Ssn,
        PiiCategory::Account,
        PiiCategory::Phone,
        PiiCategory::Address,
    ];

    /// Canonical placeholder prefix (`EMAIL` in `[EMAIL_1]`).
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Email => "EMAIL",
            Self::Phone => "PHONE",
            Self::Ssn => "SSN",
            Self::Card => "CARD",
            Self::Account => "ACCOUNT",
            Self::Address => "ADDRESS",
            Self::Dob => "DOB",
        }
    }

    /// Look up a category by its placeholder prefix.
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::PRIORITY.into_iter().find(|c| c.prefix() == prefix)
    }

    /// Lowercase name used in stats, audit events and config.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Ssn => "ssn",
            Self::Card => "card",
            Self::Account => "account",
            Self::Address => "address",
            Self::Dob => "dob",
        }
    }

    /// Whether the category counts as financially sensitive.
    pub fn is_financial(&self) -> bool {
        !matches!(self, Self::Email | Self::Phone)
    }

    /// Position in the priority order (0 = highest).
    pub(crate) fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for PiiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Policy selecting which categories are redacted on a given call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskingMode {
    /// Redact every category
    #[default]
    Full,
    /// Redact only financially sensitive categories; email and phone stay visible
    FinancialOnly,
}

impl MaskingMode {
    /// Whether this mode redacts the given category.
    pub fn allows(&self, category: PiiCategory) -> bool {
        match self {
            Self::Full => true,
            Self::FinancialOnly => category.is_financial(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::FinancialOnly => "financial_only",
        }
    }
}

impl fmt::Display for MaskingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MaskingMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "full" => Ok(Self::Full),
            "financial_only" | "financial" => Ok(Self::FinancialOnly),
            other => Err(Error::Config(format!("Unknown masking mode '{}'", other))),
        }
    }
}

/// Role of a conversation message being prepared for a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
