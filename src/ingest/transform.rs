//! Per-cell value normalization.
//!
//! Each target column has a [`FieldKind`] (explicit in the template, or
//! inferred from the column name). [`transform`] applies the template's
//! [`TransformRules`] for that kind to one cell. Kinds without a configured
//! rule pass through unchanged.
//!
//! # Example
//!
//! ```
//! use mailsift::config::TransformConfig;
//! use mailsift::ingest::{transform, CellValue, FieldKind, TransformRules};
//!
//! let rules = TransformRules::from_config(&TransformConfig::standard())?;
//!
//! let dob = transform(&CellValue::from("1990-02-01"), FieldKind::Date, &rules);
//! assert_eq!(dob.value, CellValue::from("01/02/1990"));
//!
//! let sex = transform(&CellValue::from("f"), FieldKind::Sex, &rules);
//! assert_eq!(sex.value, CellValue::from("Female"));
//!
//! let bad = transform(&CellValue::from("soon"), FieldKind::Date, &rules);
//! assert_eq!(bad.value, CellValue::from("soon"));
//! assert!(bad.unparseable_date);
//! # Ok::<(), mailsift::MailsiftError>(())
//! ```

use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::table::CellValue;
use crate::config::{CaseRule, TransformConfig};
use crate::error::{MailsiftError, Result};

static NUMERIC_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,4})[/.\-](\d{1,2})[/.\-](\d{1,4})(?:[T ]\d{1,2}:\d{2}(?::\d{2}(?:\.\d+)?)?)?$")
        .unwrap()
});

const TEXTUAL_DATE_FORMATS: &[&str] = &[
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%d-%b-%Y",
    "%d-%b-%y",
    "%Y%m%d",
];

/// Semantic type of a target column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Date,
    #[serde(alias = "gender")]
    Sex,
    Name,
    Postcode,
    #[default]
    Text,
}

impl FieldKind {
    /// Infers a kind from a column name.
    ///
    /// ```
    /// use mailsift::ingest::FieldKind;
    ///
    /// assert_eq!(FieldKind::infer("Child 2 Dob"), FieldKind::Date);
    /// assert_eq!(FieldKind::infer("Gender"), FieldKind::Sex);
    /// assert_eq!(FieldKind::infer("Post Code"), FieldKind::Postcode);
    /// assert_eq!(FieldKind::infer("First Name1"), FieldKind::Name);
    /// assert_eq!(FieldKind::infer("Reference"), FieldKind::Text);
    /// ```
    pub fn infer(column: &str) -> Self {
        let lower = column.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

        if has(&["dob", "date", "birth"]) {
            FieldKind::Date
        } else if has(&["sex", "gender"]) {
            FieldKind::Sex
        } else if lower.contains("post") && lower.contains("code") {
            FieldKind::Postcode
        } else if has(&["name", "surname", "forename", "title"]) {
            FieldKind::Name
        } else {
            FieldKind::Text
        }
    }
}

/// Output pattern plus day/month preference for ambiguous input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRule {
    pattern: String,
    day_first: bool,
}

impl DateRule {
    /// Builds a rule from a named format (`DD/MM/YYYY`, `YYYY-MM-DD`,
    /// `MM/DD/YYYY`) or a chrono strftime pattern.
    pub fn parse(format: &str) -> Result<Self> {
        let (pattern, day_first) = match format {
            "DD/MM/YYYY" => ("%d/%m/%Y", true),
            "DD-MM-YYYY" => ("%d-%m-%Y", true),
            "YYYY-MM-DD" => ("%Y-%m-%d", false),
            "MM/DD/YYYY" => ("%m/%d/%Y", false),
            other if other.contains('%') => {
                if !renders_dates(other) {
                    return Err(MailsiftError::invalid_date(other));
                }
                (other, true)
            }
            other => return Err(MailsiftError::invalid_date(other)),
        };
        Ok(Self {
            pattern: pattern.to_string(),
            day_first,
        })
    }

    /// The chrono output pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Reformats `input`, or `None` if it is not a recognizable date.
    pub fn reformat(&self, input: &str) -> Option<String> {
        let date = parse_date(input, self.day_first)?;
        let mut out = String::new();
        write!(out, "{}", date.format(&self.pattern)).ok()?;
        Some(out)
    }
}

/// Returns `true` if a strftime pattern is well-formed and needs nothing but
/// a calendar date, so no time or zone fields.
fn renders_dates(pattern: &str) -> bool {
    let mut out = String::new();
    write!(out, "{}", NaiveDate::MIN.format(pattern)).is_ok()
}

/// Compiled per-template transform rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformRules {
    date: Option<DateRule>,
    genders: Option<BTreeMap<String, String>>,
    name_case: Option<CaseRule>,
    postcode_case: Option<CaseRule>,
}

impl TransformRules {
    /// Rules that change nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// Compiles configured rules. Gender table keys are upper-cased.
    pub fn from_config(config: &TransformConfig) -> Result<Self> {
        let date = config
            .date_format
            .as_deref()
            .map(DateRule::parse)
            .transpose()?;
        let genders = config.gender_standardization.as_ref().map(|table| {
            table
                .iter()
                .map(|(k, v)| (k.trim().to_uppercase(), v.clone()))
                .collect()
        });
        Ok(Self {
            date,
            genders,
            name_case: config.name_case,
            postcode_case: config.postcode_case,
        })
    }

    /// Returns `true` if a rule exists for this kind.
    pub fn applies_to(&self, kind: FieldKind) -> bool {
        match kind {
            FieldKind::Date => self.date.is_some(),
            FieldKind::Sex => self.genders.is_some(),
            FieldKind::Name => self.name_case.is_some(),
            FieldKind::Postcode => self.postcode_case.is_some(),
            FieldKind::Text => false,
        }
    }
}

/// Result of transforming one cell.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformOutcome {
    pub value: CellValue,
    /// A date rule applied but the input was not a recognizable date; the
    /// value is the original
    pub unparseable_date: bool,
}

impl TransformOutcome {
    fn unchanged(value: &CellValue) -> Self {
        Self {
            value: value.clone(),
            unparseable_date: false,
        }
    }

    fn text(value: String) -> Self {
        Self {
            value: CellValue::Text(value),
            unparseable_date: false,
        }
    }
}

/// Applies the rule for `kind` to one cell. Never fails.
pub fn transform(value: &CellValue, kind: FieldKind, rules: &TransformRules) -> TransformOutcome {
    if value.is_empty() {
        return TransformOutcome::unchanged(value);
    }
    let text = value.as_text();

    match kind {
        FieldKind::Date => match &rules.date {
            Some(rule) => match rule.reformat(&text) {
                Some(formatted) => TransformOutcome::text(formatted),
                None => TransformOutcome {
                    value: value.clone(),
                    unparseable_date: true,
                },
            },
            None => TransformOutcome::unchanged(value),
        },
        FieldKind::Sex => match &rules.genders {
            Some(table) => match table.get(&text.trim().to_uppercase()) {
                Some(mapped) => TransformOutcome::text(mapped.clone()),
                None => TransformOutcome::unchanged(value),
            },
            None => TransformOutcome::unchanged(value),
        },
        FieldKind::Name => match rules.name_case {
            Some(rule) => TransformOutcome::text(apply_case(text.trim(), rule)),
            None => TransformOutcome::unchanged(value),
        },
        FieldKind::Postcode => match rules.postcode_case {
            Some(rule) => TransformOutcome::text(apply_case(text.trim(), rule)),
            None => TransformOutcome::unchanged(value),
        },
        FieldKind::Text => TransformOutcome::unchanged(value),
    }
}

fn apply_case(text: &str, rule: CaseRule) -> String {
    match rule {
        CaseRule::Upper => text.to_uppercase(),
        CaseRule::Lower => text.to_lowercase(),
        CaseRule::Title => title_case(text),
    }
}

/// Upper-cases the first letter of every run of letters and lower-cases the
/// rest, so `o'brien-SMITH` becomes `O'Brien-Smith`.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

/// Parses common date shapes.
///
/// Numeric `a/b/c` forms (any of `/`, `-`, `.`) are year-first when `a` has
/// four digits, otherwise day-first or month-first per `day_first`, falling
/// back to the other order when the preferred one is not a valid date. Two
/// digit years pivot at 69 (`69`-`99` are 19xx). A trailing time is ignored.
pub fn parse_date(input: &str, day_first: bool) -> Option<NaiveDate> {
    let input = input.trim();

    if let Some(caps) = NUMERIC_DATE.captures(input) {
        let a = &caps[1];
        let b: u32 = caps[2].parse().ok()?;
        let c = &caps[3];

        if a.len() == 4 {
            let year: i32 = a.parse().ok()?;
            let day: u32 = c.parse().ok()?;
            return NaiveDate::from_ymd_opt(year, b, day);
        }

        let first: u32 = a.parse().ok()?;
        let year = expand_year(c)?;
        let (day, month) = if day_first { (first, b) } else { (b, first) };
        return NaiveDate::from_ymd_opt(year, month, day)
            .or_else(|| NaiveDate::from_ymd_opt(year, day, month));
    }

    TEXTUAL_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(input, fmt).ok())
}

fn expand_year(digits: &str) -> Option<i32> {
    let year: i32 = digits.parse().ok()?;
    match digits.len() {
        1 | 2 if year >= 69 => Some(1900 + year),
        1 | 2 => Some(2000 + year),
        4 => Some(year),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn standard() -> TransformRules {
        TransformRules::from_config(&TransformConfig::standard()).unwrap()
    }

    fn text(v: &str) -> CellValue {
        CellValue::from(v)
    }

    #[test]
    fn test_parse_date_day_first() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(parse_date("15/01/2024", true), Some(d));
        assert_eq!(parse_date("15-01-2024", true), Some(d));
        assert_eq!(parse_date("15.1.24", true), Some(d));
        assert_eq!(parse_date("2024-01-15", true), Some(d));
        assert_eq!(parse_date("2024-01-15 00:00:00", true), Some(d));
        assert_eq!(parse_date("15 January 2024", true), Some(d));
        assert_eq!(parse_date("Jan 15, 2024", true), Some(d));
        assert_eq!(parse_date("15-Jan-2024", true), Some(d));
    }

    #[test]
    fn test_parse_date_ambiguous_order() {
        let feb_first = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        assert_eq!(parse_date("01/02/2024", true), Some(feb_first));
        assert_eq!(parse_date("02/01/2024", false), Some(feb_first));
    }

    #[test]
    fn test_parse_date_falls_back_when_day_first_impossible() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 25).unwrap();
        assert_eq!(parse_date("01/25/2024", true), Some(d));
    }

    #[test]
    fn test_parse_date_two_digit_year_pivot() {
        assert_eq!(parse_date("01/01/70", true).unwrap().year_ce().1, 1970);
        assert_eq!(parse_date("01/01/05", true).unwrap().year_ce().1, 2005);
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(parse_date("not a date", true).is_none());
        assert!(parse_date("32/13/2024", true).is_none());
        assert!(parse_date("2024-02-30", true).is_none());
        assert!(parse_date("1/2/123", true).is_none());
    }

    #[test]
    fn test_date_rule_named_and_strftime() {
        assert_eq!(DateRule::parse("YYYY-MM-DD").unwrap().pattern(), "%Y-%m-%d");
        let custom = DateRule::parse("%d %b %Y").unwrap();
        assert_eq!(custom.reformat("2024-01-15").as_deref(), Some("15 Jan 2024"));
        assert!(DateRule::parse("DD.MM.YY").is_err());
        assert!(DateRule::parse("%Q").is_err());
    }

    #[test]
    fn test_date_rule_rejects_time_fields() {
        for pattern in ["%d/%m/%Y %H:%M", "%Y-%m-%dT%T", "%d %b %Y %z"] {
            let err = DateRule::parse(pattern).unwrap_err();
            assert!(matches!(err, MailsiftError::InvalidDate { .. }), "{pattern}");
        }
        assert!(DateRule::parse("%A %e %B %Y").is_ok());
    }

    #[test]
    fn test_transform_date() {
        let rules = standard();
        let out = transform(&text("1990-12-31"), FieldKind::Date, &rules);
        assert_eq!(out.value, text("31/12/1990"));
        assert!(!out.unparseable_date);

        let out = transform(&text("unknown"), FieldKind::Date, &rules);
        assert_eq!(out.value, text("unknown"));
        assert!(out.unparseable_date);
    }

    #[test]
    fn test_transform_empty_passes_through() {
        let rules = standard();
        let out = transform(&CellValue::Null, FieldKind::Date, &rules);
        assert_eq!(out.value, CellValue::Null);
        assert!(!out.unparseable_date);
    }

    #[test]
    fn test_transform_sex() {
        let rules = standard();
        assert_eq!(transform(&text(" m "), FieldKind::Sex, &rules).value, text("Male"));
        assert_eq!(transform(&text("FEMALE"), FieldKind::Sex, &rules).value, text("Female"));
        assert_eq!(transform(&text("X"), FieldKind::Sex, &rules).value, text("X"));
    }

    #[test]
    fn test_transform_name_and_postcode() {
        let rules = standard();
        assert_eq!(
            transform(&text("  o'brien-SMITH "), FieldKind::Name, &rules).value,
            text("O'Brien-Smith")
        );
        assert_eq!(
            transform(&text(" sw1a 1aa "), FieldKind::Postcode, &rules).value,
            text("SW1A 1AA")
        );
    }

    #[test]
    fn test_no_rule_passes_through() {
        let rules = TransformRules::none();
        for kind in [FieldKind::Date, FieldKind::Sex, FieldKind::Name, FieldKind::Postcode] {
            assert!(!rules.applies_to(kind));
            assert_eq!(transform(&text("mIxEd"), kind, &rules).value, text("mIxEd"));
        }
        assert_eq!(transform(&text("x"), FieldKind::Text, &standard()).value, text("x"));
    }

    #[test]
    fn test_number_cells_use_text_form() {
        let rules = TransformRules::from_config(&TransformConfig {
            postcode_case: Some(CaseRule::Upper),
            ..TransformConfig::default()
        })
        .unwrap();
        let out = transform(&CellValue::Number(12345.0), FieldKind::Postcode, &rules);
        assert_eq!(out.value, text("12345"));
    }

    #[test]
    fn test_field_kind_deserialize_alias() {
        let kind: FieldKind = serde_json::from_str(r#""gender""#).unwrap();
        assert_eq!(kind, FieldKind::Sex);
    }
}
