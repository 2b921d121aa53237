//! Pattern catalog: one matcher per PII category
//!
//! Matchers run in [`PiiCategory::PRIORITY`] order over a shadow copy of
//! the input. Every span a matcher claims is blanked in the shadow before
//! the next matcher runs, so lower-priority categories can never overlap a
//! higher-priority one. Placeholder tokens are blanked up front and are
//! therefore never detected as PII.

use super::category::PiiCategory;
use super::placeholder::TokenScanner;
use crate::error::{Error, Result};
use regex::bytes::Regex;
use std::ops::Range;

/// Byte used to blank claimed ranges in the shadow copy.
const CLAIMED: u8 = 0;

// Unicode-aware so non-ASCII local parts and domains are caught whole.
const EMAIL_PATTERN: &str =
    r"[\p{L}\p{N}._%+-]+@[\p{L}\p{N}-]+(?:\.[\p{L}\p{N}-]+)*\.\p{L}{2,}";

// Separator-free E.164 and 1-prefixed North American numbers. Claimed right
// after email so the digit runs are never read as cards or accounts.
const DIALING_PATTERN: &str = concat!(
    r"(?-u)(?:\+[0-9]{7,15}|1[2-9][0-9]{2}[2-9][0-9]{6})",
    r"(?:\s*(?i:x|ext\.?)\s*[0-9]{1,6})?",
);

// 4-4-4-(1..7) and 4-6-(4..5) groupings, or a bare 13-19 digit run.
const CARD_PATTERN: &str = r"(?-u)[0-9]{4}(?:[ -][0-9]{4}){2}[ -][0-9]{1,7}|[0-9]{4}[ -][0-9]{6}[ -][0-9]{4,5}|[0-9]{13,19}";

const DOB_PATTERN: &str = concat!(
    r"(?-u)(?i)",
    // MM/DD/YYYY, DD/MM/YYYY (also with - or .)
    r"(?:0?[1-9]|[12][0-9]|3[01])[/.-](?:0?[1-9]|[12][0-9]|3[01])[/.-](?:19|20)[0-9]{2}",
    // YYYY-MM-DD
    r"|(?:19|20)[0-9]{2}[/.-](?:0?[1-9]|1[0-2])[/.-](?:0?[1-9]|[12][0-9]|3[01])",
    // March 5, 1990
    r"|(?:jan|feb|mar|apr|may|jun|jul|aug|sep|sept|oct|nov|dec)[a-z]*\.?\s+(?:0?[1-9]|[12][0-9]|3[01])(?:st|nd|rd|th)?,?\s+(?:19|20)[0-9]{2}",
    // 5 March 1990
    r"|(?:0?[1-9]|[12][0-9]|3[01])(?:st|nd|rd|th)?\s+(?:jan|feb|mar|apr|may|jun|jul|aug|sep|sept|oct|nov|dec)[a-z]*\.?,?\s+(?:19|20)[0-9]{2}",
);

// US SSN (3-2-4) and the 3-3-3 digit-group form used by e.g. Canadian SINs.
const SSN_PATTERN: &str = r"(?-u)[0-9]{3}-[0-9]{2}-[0-9]{4}|[0-9]{3} [0-9]{2} [0-9]{4}|[0-9]{3}[- ][0-9]{3}[- ][0-9]{3}";

const ACCOUNT_PATTERN: &str = r"(?-u)[0-9]{11,}";

const PHONE_PATTERN: &str = concat!(
    r"(?-u)",
    // North American, optional +1 / 1 prefix, optional parentheses
    r"(?:\+?1[-. ]?)?(?:\([0-9]{3}\)|[0-9]{3})[-. ]?[0-9]{3}[-. ]?[0-9]{4}",
    r"(?:\s*(?i:x|ext\.?)\s*[0-9]{1,6})?",
    // International with a leading +
    r"|\+[0-9]{1,3}(?:[-. ]?(?:\([0-9]{1,4}\)|[0-9]{1,4})){2,5}",
    r"(?:\s*(?i:x|ext\.?)\s*[0-9]{1,6})?",
    // Local 7-digit
    r"|[0-9]{3}-[0-9]{4}",
);

const ADDRESS_PATTERN: &str = concat!(
    r"(?-u)",
    r"[0-9]{1,6}[A-Za-z]?\s+(?:[NSEW]\.?\s+)?(?:[A-Za-z][A-Za-z0-9'.-]*\s+){1,4}",
    r"(?i:street|st|avenue|ave|road|rd|boulevard|blvd|lane|ln|drive|dr|court|ct|way|place|pl|terrace|ter|circle|cir|parkway|pkwy|highway|hwy|square|sq)\b\.?",
    // unit
    r"(?:,?\s+(?i:apt|apartment|suite|ste|unit)\.?\s*#?[A-Za-z0-9-]+|,?\s+#[A-Za-z0-9-]+)?",
    // locality, state, zip
    r"(?:,\s*[A-Z][A-Za-z]+(?:\s+[A-Z][A-Za-z]+){0,2}(?:,\s*[A-Z]{2})?(?:\s+[0-9]{5}(?:-[0-9]{4})?)?)?",
);

/// A detected PII span. Holds only offsets, never the matched value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PiiSpan {
    pub category: PiiCategory,
    /// Start byte offset in the input text
    pub start: usize,
    /// End byte offset in the input text
    pub end: usize,
}

impl PiiSpan {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

struct CategoryMatcher {
    category: PiiCategory,
    pattern: Regex,
}

/// Ordered set of category matchers plus the placeholder scanner.
pub struct PatternCatalog {
    matchers: Vec<CategoryMatcher>,
    tokens: TokenScanner,
}

impl PatternCatalog {
    /// Compile the built-in matchers.
    pub fn new() -> Result<Self> {
        let matchers = PASSES
            .into_iter()
            .map(|(category, pattern)| {
                let pattern = Regex::new(pattern).map_err(|e| {
                    Error::Pattern(format!(
                        "Invalid pattern for category '{}': {}",
                        category, e
                    ))
                })?;
                Ok(CategoryMatcher { category, pattern })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            matchers,
            tokens: TokenScanner::new()?,
        })
    }

    /// Non-overlapping PII spans in `text`, sorted by start offset.
    pub fn detect(&self, text: &str) -> Vec<PiiSpan> {
        let mut shadow = text.as_bytes().to_vec();
        for range in self.tokens.ranges(text) {
            shadow[range].fill(CLAIMED);
        }

        let mut spans = Vec::new();
        for matcher in &self.matchers {
            let claimed: Vec<Range<usize>> = matcher
                .pattern
                .find_iter(&shadow)
                .map(|m| m.range())
                .filter(|r| is_isolated(&shadow, r))
                .collect();

            for range in claimed {
                shadow[range.clone()].fill(CLAIMED);
                spans.push(PiiSpan {
                    category: matcher.category,
                    start: range.start,
                    end: range.end,
                });
            }
        }

        spans.sort_by_key(|s| s.start);
        spans
    }

    /// Whether `text` contains any detectable PII.
    pub fn contains_pii(&self, text: &str) -> bool {
        !self.detect(text).is_empty()
    }

    /// The placeholder scanner shared with unmasking.
    pub fn tokens(&self) -> &TokenScanner {
        &self.tokens
    }
}

/// Matcher passes in claim order: [`PiiCategory::PRIORITY`] with the
/// dialing-form phone pass hoisted ahead of the bare-digit categories.
const PASSES: [(PiiCategory, &str); 8] = [
    (PiiCategory::Email, EMAIL_PATTERN),
    (PiiCategory::Phone, DIALING_PATTERN),
    (PiiCategory::Card, CARD_PATTERN),
    (PiiCategory::Dob, DOB_PATTERN),
    (PiiCategory::Ssn, SSN_PATTERN),
    (PiiCategory::Account, ACCOUNT_PATTERN),
    (PiiCategory::Phone, PHONE_PATTERN),
    (PiiCategory::Address, ADDRESS_PATTERN),
];

/// A match must not be glued to letters or digits on either side.
fn is_isolated(haystack: &[u8], range: &Range<usize>) -> bool {
    let before_ok = range.start == 0 || !haystack[range.start - 1].is_ascii_alphanumeric();
    let after_ok = range.end >= haystack.len() || !haystack[range.end].is_ascii_alphanumeric();
    before_ok && after_ok && !range.is_empty()
}
