//! Binds a template's target columns to a file's source headers.
//!
//! Target columns are visited in template order. For each one the strategies
//! below are tried in turn against headers not yet taken by an earlier column;
//! the first hit wins:
//!
//! | Strategy | [`MatchMethod`] |
//! |----------|-----------------|
//! | header equals the target or one of its aliases | `Exact` |
//! | same, ignoring case | `CaseInsensitive` |
//! | same, after [`normalize_column_name`] on both sides | `Alias` |
//! | header carries the column's slot in an indexed group | `IndexedPattern` |
//!
//! Unbound columns are normal. They show up in the [`ColumnMapping`] and the
//! report, never as errors.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::registry::Template;

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s]").unwrap());

/// Trims, lower-cases and strips everything but word characters and
/// whitespace.
///
/// ```
/// use mailsift::ingest::normalize_column_name;
///
/// assert_eq!(normalize_column_name("  Post-Code (UK) "), "postcode uk");
/// ```
pub fn normalize_column_name(name: &str) -> String {
    NON_WORD.replace_all(&name.trim().to_lowercase(), "").into_owned()
}

/// How a target column found its source header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    Exact,
    CaseInsensitive,
    Alias,
    IndexedPattern,
}

impl MatchMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchMethod::Exact => "exact",
            MatchMethod::CaseInsensitive => "case-insensitive",
            MatchMethod::Alias => "alias",
            MatchMethod::IndexedPattern => "indexed pattern",
        }
    }
}

/// One target column and what it is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnBinding {
    pub target: String,
    pub source: Option<String>,
    /// Position of `source` in the header list
    pub source_index: Option<usize>,
    pub method: Option<MatchMethod>,
}

impl ColumnBinding {
    pub fn is_bound(&self) -> bool {
        self.source.is_some()
    }
}

/// The full binding of one template against one header list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    bindings: Vec<ColumnBinding>,
    headers: Vec<String>,
}

impl ColumnMapping {
    /// One binding per target column, in template order.
    pub fn bindings(&self) -> &[ColumnBinding] {
        &self.bindings
    }

    /// The source headers the mapping was resolved against.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Source header bound to `target`.
    pub fn source_for(&self, target: &str) -> Option<&str> {
        self.bindings
            .iter()
            .find(|b| b.target == target)
            .and_then(|b| b.source.as_deref())
    }

    pub fn resolved_count(&self) -> usize {
        self.bindings.iter().filter(|b| b.is_bound()).count()
    }

    /// Number of target columns.
    pub fn total(&self) -> usize {
        self.bindings.len()
    }

    /// `resolved / total`, 0 for a template without columns.
    pub fn coverage(&self) -> f64 {
        if self.bindings.is_empty() {
            0.0
        } else {
            self.resolved_count() as f64 / self.total() as f64
        }
    }

    /// Target columns left unbound, in template order.
    pub fn unmapped(&self) -> Vec<&str> {
        self.bindings
            .iter()
            .filter(|b| !b.is_bound())
            .map(|b| b.target.as_str())
            .collect()
    }

    /// Source headers no target column took.
    pub fn unused_headers(&self) -> Vec<&str> {
        self.headers
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.bindings.iter().any(|b| b.source_index == Some(*i)))
            .map(|(_, h)| h.as_str())
            .collect()
    }
}

/// Resolves every target column of `template` against `headers`.
///
/// ```
/// use mailsift::config::{ColumnMappingConfig, TemplateCatalogue, TemplateConfig, RoutingCatalogue};
/// use mailsift::ingest::{resolve, Catalogue, MatchMethod};
///
/// let templates = TemplateCatalogue::new()
///     .with_template("t", TemplateConfig::new("T", ["Surname", "Forename"]))
///     .with_column_mapping("t", ColumnMappingConfig::new().with_aliases("Surname", ["last_name"]));
/// let catalogue = Catalogue::from_documents(&templates, &RoutingCatalogue::new())?;
///
/// let headers = vec!["last_name".to_string(), "FORENAME".to_string()];
/// let mapping = resolve(catalogue.template("t")?, &headers);
///
/// assert_eq!(mapping.source_for("Surname"), Some("last_name"));
/// assert_eq!(mapping.bindings()[1].method, Some(MatchMethod::CaseInsensitive));
/// assert_eq!(mapping.coverage(), 1.0);
/// # Ok::<(), mailsift::MailsiftError>(())
/// ```
pub fn resolve(template: &Template, headers: &[String]) -> ColumnMapping {
    let normalized: Vec<String> = headers.iter().map(|h| normalize_column_name(h)).collect();
    let lowered: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();
    let mut taken = vec![false; headers.len()];

    let bindings = template
        .columns()
        .iter()
        .map(|target| {
            let found = find_source(template, target, headers, &lowered, &normalized, &taken);
            match found {
                Some((index, method)) => {
                    taken[index] = true;
                    debug!(target = %target, source = %headers[index], method = method.as_str(), "column bound");
                    ColumnBinding {
                        target: target.clone(),
                        source: Some(headers[index].clone()),
                        source_index: Some(index),
                        method: Some(method),
                    }
                }
                None => ColumnBinding {
                    target: target.clone(),
                    source: None,
                    source_index: None,
                    method: None,
                },
            }
        })
        .collect();

    ColumnMapping {
        bindings,
        headers: headers.to_vec(),
    }
}

fn find_source(
    template: &Template,
    target: &str,
    headers: &[String],
    lowered: &[String],
    normalized: &[String],
    taken: &[bool],
) -> Option<(usize, MatchMethod)> {
    let candidates: Vec<&str> = std::iter::once(target)
        .chain(template.aliases_for(target).iter().map(String::as_str))
        .collect();
    let first = |test: &dyn Fn(usize, &str) -> bool| {
        candidates
            .iter()
            .find_map(|&c| (0..headers.len()).find(|&i| !taken[i] && test(i, c)))
    };

    if let Some(i) = first(&|i, c| headers[i] == c) {
        return Some((i, MatchMethod::Exact));
    }
    if let Some(i) = first(&|i, c| lowered[i] == c.to_lowercase()) {
        return Some((i, MatchMethod::CaseInsensitive));
    }
    if let Some(i) = first(&|i, c| {
        let wanted = normalize_column_name(c);
        !wanted.is_empty() && normalized[i] == wanted
    }) {
        return Some((i, MatchMethod::Alias));
    }

    let (group, slot) = template.group_slot(target)?;
    (0..headers.len())
        .find(|&i| !taken[i] && group.index_in(&normalized[i]) == Some(slot))
        .map(|i| (i, MatchMethod::IndexedPattern))
}
