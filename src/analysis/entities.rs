//! Regex-driven entity extraction.
//!
//! An [`EntityExtractor`] applies one pattern per [`EntityKind`] over a text blob
//! and collects every distinct match into an [`EntityBag`]. Patterns are data: a
//! different [`EntityPatterns`] set can be substituted without touching the
//! extraction algorithm.
//!
//! # Example
//!
//! ```
//! use mailsift::analysis::{EntityExtractor, EntityKind};
//!
//! let bag = EntityExtractor::new()
//!     .extract("Contact john@example.com or call 555-123-4567. Budget $10,000.");
//!
//! assert!(bag.contains(EntityKind::Emails, "john@example.com"));
//! assert!(bag.get(EntityKind::Money).iter().any(|m| m.contains("10,000")));
//! assert!(bag.get(EntityKind::Urls).is_empty());
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{MailsiftError, Result};

// ── Standard pattern set ────────────────────────────────────────────────

const EMAIL_PATTERN: &str = r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b";

const PHONE_PATTERN: &str = r"(?:\+?1[-.\s]?)?\(?[0-9]{3}\)?[-.\s]?[0-9]{3}[-.\s]?[0-9]{4}\b";

const DATE_PATTERN: &str = r"\b(?:\d{1,2}[/-]\d{1,2}[/-]\d{2,4}|\d{4}[/-]\d{1,2}[/-]\d{1,2})\b";

const URL_PATTERN: &str =
    r"https?://(?:[-\w.])+(?:[:\d]+)?(?:/(?:[\w/_.])*(?:\?(?:[\w&=%.])*)?(?:#(?:[\w.])*)?)?";

const MONEY_PATTERN: &str = r"(?:\$\d{1,3}(?:,\d{3})*(?:\.\d{2})?|\d{1,3}(?:,\d{3})*(?:\.\d{2})?\s*(?:USD|EUR|GBP|dollars?))";

static STANDARD_PATTERNS: LazyLock<EntityPatterns> = LazyLock::new(|| {
    EntityPatterns::from_sources([
        (EntityKind::Emails, EMAIL_PATTERN),
        (EntityKind::Phones, PHONE_PATTERN),
        (EntityKind::Dates, DATE_PATTERN),
        (EntityKind::Urls, URL_PATTERN),
        (EntityKind::Money, MONEY_PATTERN),
    ])
    .unwrap()
});

static NO_VALUES: BTreeSet<String> = BTreeSet::new();

// ── Types ───────────────────────────────────────────────────────────────

/// Kind of literal extracted from free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// Email addresses (`local@domain`)
    Emails,
    /// North-American style phone numbers
    Phones,
    /// Numeric dates (`15/01/2024`, `2024-01-15`)
    Dates,
    /// http(s) URLs
    Urls,
    /// Monetary amounts (`$10,000`, `250 EUR`)
    Money,
}

impl EntityKind {
    /// Returns every kind in declaration order.
    pub fn all() -> &'static [EntityKind] {
        &[
            EntityKind::Emails,
            EntityKind::Phones,
            EntityKind::Dates,
            EntityKind::Urls,
            EntityKind::Money,
        ]
    }

    /// Returns the key used for this kind in serialized output.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Emails => "emails",
            EntityKind::Phones => "phones",
            EntityKind::Dates => "dates",
            EntityKind::Urls => "urls",
            EntityKind::Money => "money",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        EntityKind::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!(
                    "Unknown entity kind: '{}'. Expected one of: emails, phones, dates, urls, money",
                    s
                )
            })
    }
}

/// Distinct extracted values per entity kind.
///
/// Every kind is present (possibly empty) in a bag built by [`EntityBag::new`],
/// and no kind ever holds an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityBag {
    entries: BTreeMap<EntityKind, BTreeSet<String>>,
}

impl EntityBag {
    /// Creates a bag with an empty set for every kind.
    pub fn new() -> Self {
        Self {
            entries: EntityKind::all()
                .iter()
                .map(|kind| (*kind, BTreeSet::new()))
                .collect(),
        }
    }

    /// Adds a value after trimming it. Returns `true` if it was new.
    ///
    /// Blank values are ignored.
    pub fn insert(&mut self, kind: EntityKind, value: &str) -> bool {
        let value = value.trim();
        if value.is_empty() {
            return false;
        }
        self.entries
            .entry(kind)
            .or_default()
            .insert(value.to_string())
    }

    /// Returns the values for a kind.
    pub fn get(&self, kind: EntityKind) -> &BTreeSet<String> {
        self.entries.get(&kind).unwrap_or(&NO_VALUES)
    }

    /// Returns `true` if `value` was extracted for `kind`.
    pub fn contains(&self, kind: EntityKind, value: &str) -> bool {
        self.get(kind).contains(value)
    }

    /// Number of distinct values for a kind.
    pub fn count(&self, kind: EntityKind) -> usize {
        self.get(kind).len()
    }

    /// Number of distinct values across all kinds.
    pub fn total(&self) -> usize {
        self.entries.values().map(BTreeSet::len).sum()
    }

    /// Returns `true` if nothing was extracted.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Iterates kinds with their values in kind order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityKind, &BTreeSet<String>)> {
        self.entries.iter().map(|(kind, values)| (*kind, values))
    }
}

impl Default for EntityBag {
    fn default() -> Self {
        Self::new()
    }
}

/// An ordered set of compiled patterns, one per entity kind.
///
/// Patterns are compiled case-insensitively. A kind without a pattern still
/// appears in extraction results, with no values.
#[derive(Debug, Clone)]
pub struct EntityPatterns {
    patterns: Vec<(EntityKind, Regex)>,
}

impl EntityPatterns {
    /// Returns the standard pattern set.
    pub fn standard() -> Self {
        STANDARD_PATTERNS.clone()
    }

    /// Compiles a pattern set from `(kind, pattern)` pairs.
    ///
    /// A later pair for the same kind replaces an earlier one.
    pub fn from_sources<'a>(sources: impl IntoIterator<Item = (EntityKind, &'a str)>) -> Result<Self> {
        let mut set = Self {
            patterns: Vec::new(),
        };
        for (kind, source) in sources {
            set = set.with_pattern(kind, source)?;
        }
        Ok(set)
    }

    /// Replaces (or adds) the pattern for one kind.
    pub fn with_pattern(mut self, kind: EntityKind, source: &str) -> Result<Self> {
        let regex = RegexBuilder::new(source)
            .case_insensitive(true)
            .build()
            .map_err(|e| MailsiftError::invalid_pattern(source, e))?;

        match self.patterns.iter_mut().find(|(k, _)| *k == kind) {
            Some(slot) => slot.1 = regex,
            None => self.patterns.push((kind, regex)),
        }
        Ok(self)
    }

    /// Returns the source text of the pattern for a kind.
    pub fn pattern(&self, kind: EntityKind) -> Option<&str> {
        self.patterns
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, re)| re.as_str())
    }

    /// Iterates `(kind, pattern source)` pairs in set order.
    pub fn sources(&self) -> impl Iterator<Item = (EntityKind, &str)> {
        self.patterns.iter().map(|(kind, re)| (*kind, re.as_str()))
    }
}

impl Default for EntityPatterns {
    fn default() -> Self {
        Self::standard()
    }
}

/// Extracts typed entities from text.
#[derive(Debug, Clone, Default)]
pub struct EntityExtractor {
    patterns: EntityPatterns,
}

impl EntityExtractor {
    /// Creates an extractor with the standard patterns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an extractor with a substituted pattern set.
    pub fn with_patterns(patterns: EntityPatterns) -> Self {
        Self { patterns }
    }

    /// Returns the pattern set in use.
    pub fn patterns(&self) -> &EntityPatterns {
        &self.patterns
    }

    /// Collects every non-overlapping match of every pattern in `text`.
    pub fn extract(&self, text: &str) -> EntityBag {
        let mut bag = EntityBag::new();
        for (kind, regex) in &self.patterns.patterns {
            for m in regex.find_iter(text) {
                bag.insert(*kind, m.as_str());
            }
        }
        bag
    }
}

/// Extracts entities with the standard pattern set.
pub fn extract_entities(text: &str) -> EntityBag {
    EntityExtractor::with_patterns(EntityPatterns::standard()).extract(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_line_entities() {
        let bag = extract_entities("Contact john@example.com or call 555-123-4567. Budget $10,000.");

        assert_eq!(
            bag.get(EntityKind::Emails).iter().collect::<Vec<_>>(),
            vec!["john@example.com"]
        );
        assert!(bag.get(EntityKind::Phones).iter().any(|p| p.contains("555")));
        assert!(bag.get(EntityKind::Money).iter().any(|m| m.contains("10,000")));
    }

    #[test]
    fn test_every_kind_present_when_empty() {
        let bag = extract_entities("");
        assert!(bag.is_empty());
        let json = serde_json::to_value(&bag).unwrap();
        for kind in EntityKind::all() {
            assert_eq!(json[kind.as_str()], serde_json::json!([]));
        }
    }

    #[test]
    fn test_duplicates_collapse() {
        let bag = extract_entities("a@b.io wrote to a@b.io and A@B.io");
        assert_eq!(bag.count(EntityKind::Emails), 2);
    }

    #[test]
    fn test_urls_and_dates() {
        let bag = extract_entities(
            "See https://example.com/docs/page.html?x=1 before 15/01/2024 or 2024-02-01.",
        );
        assert!(bag.contains(EntityKind::Urls, "https://example.com/docs/page.html?x=1"));
        assert!(bag.contains(EntityKind::Dates, "15/01/2024"));
        assert!(bag.contains(EntityKind::Dates, "2024-02-01"));
    }

    #[test]
    fn test_money_with_currency_suffix() {
        let bag = extract_entities("Fee is 250 EUR, refund 1,200.50 dollars");
        assert!(bag.contains(EntityKind::Money, "250 EUR"));
        assert!(bag.contains(EntityKind::Money, "1,200.50 dollars"));
    }

    #[test]
    fn test_insert_rejects_blank() {
        let mut bag = EntityBag::new();
        assert!(!bag.insert(EntityKind::Urls, "   "));
        assert!(bag.insert(EntityKind::Urls, " https://x.io "));
        assert!(bag.contains(EntityKind::Urls, "https://x.io"));
    }

    #[test]
    fn test_substituted_patterns() {
        let patterns = EntityPatterns::standard()
            .with_pattern(EntityKind::Money, r"\d+\s*credits")
            .unwrap();
        let extractor = EntityExtractor::with_patterns(patterns);
        let bag = extractor.extract("Costs $5 or 40 CREDITS");

        assert!(bag.contains(EntityKind::Money, "40 CREDITS"));
        assert!(!bag.contains(EntityKind::Money, "$5"));
        assert_eq!(extractor.patterns().pattern(EntityKind::Money), Some(r"\d+\s*credits"));
    }

    #[test]
    fn test_partial_pattern_set_keeps_all_kinds() {
        let patterns = EntityPatterns::from_sources([(EntityKind::Emails, EMAIL_PATTERN)]).unwrap();
        let bag = EntityExtractor::with_patterns(patterns).extract("x@y.com 555-123-4567");
        assert_eq!(bag.count(EntityKind::Emails), 1);
        assert_eq!(bag.count(EntityKind::Phones), 0);
        assert_eq!(bag.iter().count(), EntityKind::all().len());
    }

    #[test]
    fn test_invalid_pattern_is_error() {
        let err = EntityPatterns::standard()
            .with_pattern(EntityKind::Dates, "(unclosed")
            .unwrap_err();
        assert!(matches!(err, MailsiftError::InvalidPattern { .. }));
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("EMAILS".parse::<EntityKind>().unwrap(), EntityKind::Emails);
        assert!("addresses".parse::<EntityKind>().is_err());
    }
}
