//! Placeholder tokens and per-context allocation
//!
//! A placeholder has the exact shape `[<PREFIX>_<N>]`, where `N` is a
//! 1-based counter kept per category inside a single redaction context.

use super::category::PiiCategory;
use crate::error::{Error, Result};
use regex::Regex;
use std::fmt;
use std::ops::Range;

/// A typed placeholder such as `[EMAIL_3]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Placeholder {
    pub category: PiiCategory,
    pub index: u32,
}

impl Placeholder {
    /// Parse a complete token. Returns `None` for anything that is not
    /// exactly `[<PREFIX>_<N>]` with a known prefix.
    pub fn parse(token: &str) -> Option<Self> {
        let inner = token.strip_prefix('[')?.strip_suffix(']')?;
        let (prefix, digits) = inner.rsplit_once('_')?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let category = PiiCategory::from_prefix(prefix)?;
        let index = digits.parse().ok()?;
        Some(Self { category, index })
    }

    /// Render the token string.
    pub fn token(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}_{}]", self.category.prefix(), self.index)
    }
}

/// Per-category counters for one redaction context.
///
/// Holds no global state: two allocators never influence each other.
#[derive(Debug, Clone, Default)]
pub struct PlaceholderAllocator {
    counters: [u32; PiiCategory::PRIORITY.len()],
}

impl PlaceholderAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next placeholder for `category`.
    pub fn next(&mut self, category: PiiCategory) -> Placeholder {
        let counter = &mut self.counters[category.index()];
        *counter += 1;
        Placeholder {
            category,
            index: *counter,
        }
    }

    /// Number of placeholders issued so far for `category`.
    pub fn issued(&self, category: PiiCategory) -> u32 {
        self.counters[category.index()]
    }

    pub fn reset(&mut self) {
        self.counters = Default::default();
    }
}

/// Finds placeholder-shaped substrings in text.
#[derive(Debug, Clone)]
pub struct TokenScanner {
    pattern: Regex,
}

impl TokenScanner {
    pub fn new() -> Result<Self> {
        let prefixes = PiiCategory::PRIORITY
            .iter()
            .map(|c| c.prefix())
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!(r"\[(?:{})_[0-9]+\]", prefixes))
            .map_err(|e| Error::Pattern(format!("Invalid placeholder pattern: {}", e)))?;
        Ok(Self { pattern })
    }

    /// Byte ranges of every placeholder-shaped token, left to right.
    pub fn ranges(&self, text: &str) -> Vec<Range<usize>> {
        self.pattern.find_iter(text).map(|m| m.range()).collect()
    }

    /// Replace each token with the result of `resolve`, leaving tokens for
    /// which it returns `None` verbatim.
    pub fn replace_with<F>(&self, text: &str, mut resolve: F) -> String
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut result = String::with_capacity(text.len());
        let mut last = 0;
        for m in self.pattern.find_iter(text) {
            result.push_str(&text[last..m.start()]);
            match resolve(m.as_str()) {
                Some(value) => result.push_str(&value),
                None => result.push_str(m.as_str()),
            }
            last = m.end();
        }
        result.push_str(&text[last..]);
        result
    }

    pub fn contains_token(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}
