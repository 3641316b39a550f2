//! Per-message analysis and folder-level aggregation.
//!
//! [`MessageAnalyzer`] runs extraction, correlation, categorization and
//! summarization over one [`MessageContent`] and returns an immutable
//! [`MessageAnalysis`]. [`PatternAccumulator`] folds many analyses into a
//! [`FolderPatternReport`].
//!
//! # Example
//!
//! ```
//! use mailsift::analysis::{aggregate, MessageAnalyzer};
//! use mailsift::message::MessageContent;
//!
//! let analyzer = MessageAnalyzer::new();
//! let msg = MessageContent::new("Invoice 42", "Payment of $1,200.00 is due.");
//! let analysis = analyzer.analyze(&msg)?;
//!
//! assert_eq!(analysis.categories(), ["invoice"]);
//!
//! let report = aggregate(&[analysis], &["billing@example.com"])?;
//! assert_eq!(report.total_messages, 1);
//! assert_eq!(report.category_count("invoice"), 1);
//! # Ok::<(), mailsift::MailsiftError>(())
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::categorize::CategoryTable;
use super::correlation::correlation_score;
use super::entities::{EntityBag, EntityExtractor, EntityKind, EntityPatterns};
use super::summarize::{attachment_summary, priority_indicators, summarize};
use crate::error::{MailsiftError, Result};
use crate::message::MessageContent;

/// Correlation above this counts as high.
pub const HIGH_CORRELATION: f64 = 0.7;

/// Correlation below this counts as low.
pub const LOW_CORRELATION: f64 = 0.3;

// =========================================================================
// MessageAnalysis
// =========================================================================

/// Structured result of analyzing one message.
///
/// Only [`MessageAnalyzer::analyze`] builds one, so the category list is never
/// empty. It serializes for output but cannot be read back:
///
/// ```compile_fail
/// let _: mailsift::analysis::MessageAnalysis = serde_json::from_str("{}").unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageAnalysis {
    entities: EntityBag,
    correlation_score: f64,
    categories: Vec<String>,
    summary: String,
    key_points: Vec<String>,
    action_items: Vec<String>,
    priority_indicators: Vec<String>,
    attachment_summary: String,
}

impl MessageAnalysis {
    /// Entities found in subject and body.
    pub fn entities(&self) -> &EntityBag {
        &self.entities
    }

    /// Correlation score in `[0, 1]`.
    pub fn correlation_score(&self) -> f64 {
        self.correlation_score
    }

    /// Category labels, never empty.
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// One-line summary.
    pub fn summary(&self) -> &str {
        &self.summary
    }

    /// Up to five key points.
    pub fn key_points(&self) -> &[String] {
        &self.key_points
    }

    /// Up to three action items.
    pub fn action_items(&self) -> &[String] {
        &self.action_items
    }

    /// Priority levels (`high`, `medium`, `deadline`) detected in the text.
    pub fn priority_indicators(&self) -> &[String] {
        &self.priority_indicators
    }

    /// Attachment count, types and size.
    pub fn attachment_summary(&self) -> &str {
        &self.attachment_summary
    }
}

// =========================================================================
// MessageAnalyzer
// =========================================================================

/// Runs every message-side extractor.
#[derive(Debug, Clone, Default)]
pub struct MessageAnalyzer {
    extractor: EntityExtractor,
    categories: CategoryTable,
}

impl MessageAnalyzer {
    /// Creates an analyzer with the standard pattern set and category table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to substitute the entity pattern set.
    #[must_use]
    pub fn with_patterns(mut self, patterns: EntityPatterns) -> Self {
        self.extractor = EntityExtractor::with_patterns(patterns);
        self
    }

    /// Builder method to substitute the category table.
    #[must_use]
    pub fn with_categories(mut self, categories: CategoryTable) -> Self {
        self.categories = categories;
        self
    }

    /// Analyzes one message.
    ///
    /// Fails with [`MailsiftError::Analysis`] when the message is not fit for
    /// analysis; no partial result is ever returned.
    pub fn analyze(&self, message: &MessageContent) -> Result<MessageAnalysis> {
        message.validate()?;

        let subject = message.subject();
        let body = message.body_text();
        let attachments = message.attachments();

        let entities = self.extractor.extract(&format!("{subject} {body}"));
        let correlation_score = correlation_score(subject, body, attachments);
        let categories = self.categories.categorize(subject, body, attachments);
        let content = summarize(subject, body);

        debug!(
            subject,
            entities = entities.total(),
            correlation = correlation_score,
            categories = ?categories,
            "analyzed message"
        );

        Ok(MessageAnalysis {
            entities,
            correlation_score,
            categories,
            summary: content.summary,
            key_points: content.key_points,
            action_items: content.action_items,
            priority_indicators: priority_indicators(subject, body),
            attachment_summary: attachment_summary(attachments),
        })
    }
}

// =========================================================================
// Folder aggregation
// =========================================================================

/// Per-category statistics.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CategoryStats {
    pub count: usize,
    pub avg_correlation: f64,
}

/// Per-entity-kind statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntityStats {
    /// Distinct values across the folder
    pub distinct: usize,
    /// Sum of per-message distinct counts
    pub mentions: usize,
}

/// Correlation distribution across a folder.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CorrelationStats {
    pub average: f64,
    pub min: f64,
    pub max: f64,
    /// Messages scoring above [`HIGH_CORRELATION`]
    pub high_count: usize,
    /// Messages scoring below [`LOW_CORRELATION`]
    pub low_count: usize,
}

/// Aggregated statistics over the messages of one folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderPatternReport {
    pub total_messages: usize,
    pub categories: BTreeMap<String, CategoryStats>,
    pub senders: BTreeMap<String, usize>,
    pub entities: BTreeMap<EntityKind, EntityStats>,
    pub correlation: CorrelationStats,
}

impl FolderPatternReport {
    /// Number of messages carrying a category label.
    pub fn category_count(&self, label: &str) -> usize {
        self.categories.get(label).map_or(0, |c| c.count)
    }

    /// Number of messages from a sender.
    pub fn sender_count(&self, sender: &str) -> usize {
        self.senders.get(sender).copied().unwrap_or(0)
    }

    /// Distinct values of one entity kind across the folder.
    pub fn entity_distinct(&self, kind: EntityKind) -> usize {
        self.entities.get(&kind).map_or(0, |e| e.distinct)
    }

    /// Senders ordered by message count (descending), then name.
    pub fn senders_by_frequency(&self) -> Vec<(&str, usize)> {
        let mut list: Vec<(&str, usize)> = self
            .senders
            .iter()
            .map(|(name, count)| (name.as_str(), *count))
            .collect();
        list.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        list
    }
}

#[derive(Debug, Default)]
struct CategoryTally {
    count: usize,
    correlation_sum: f64,
}

/// Running counters for folder aggregation.
#[derive(Debug, Default)]
pub struct PatternAccumulator {
    messages: usize,
    categories: BTreeMap<String, CategoryTally>,
    senders: BTreeMap<String, usize>,
    entity_values: BTreeMap<EntityKind, BTreeSet<String>>,
    entity_mentions: BTreeMap<EntityKind, usize>,
    correlation_sum: f64,
    correlation_min: f64,
    correlation_max: f64,
    high_count: usize,
    low_count: usize,
}

impl PatternAccumulator {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one analysis into the counters.
    pub fn add(&mut self, analysis: &MessageAnalysis, sender: &str) {
        let score = analysis.correlation_score;

        if self.messages == 0 {
            self.correlation_min = score;
            self.correlation_max = score;
        } else {
            self.correlation_min = self.correlation_min.min(score);
            self.correlation_max = self.correlation_max.max(score);
        }
        self.messages += 1;
        self.correlation_sum += score;
        if score > HIGH_CORRELATION {
            self.high_count += 1;
        }
        if score < LOW_CORRELATION {
            self.low_count += 1;
        }

        for label in &analysis.categories {
            let tally = self.categories.entry(label.clone()).or_default();
            tally.count += 1;
            tally.correlation_sum += score;
        }

        *self.senders.entry(sender.to_string()).or_default() += 1;

        for (kind, values) in analysis.entities.iter() {
            *self.entity_mentions.entry(kind).or_default() += values.len();
            self.entity_values
                .entry(kind)
                .or_default()
                .extend(values.iter().cloned());
        }
    }

    /// Number of messages folded so far.
    pub fn len(&self) -> usize {
        self.messages
    }

    /// Returns `true` if nothing was folded.
    pub fn is_empty(&self) -> bool {
        self.messages == 0
    }

    /// Produces the report.
    pub fn finish(self) -> FolderPatternReport {
        let average = |sum: f64, n: usize| if n == 0 { 0.0 } else { sum / n as f64 };

        let categories = self
            .categories
            .into_iter()
            .map(|(label, tally)| {
                let stats = CategoryStats {
                    count: tally.count,
                    avg_correlation: average(tally.correlation_sum, tally.count),
                };
                (label, stats)
            })
            .collect();

        let entities = EntityKind::all()
            .iter()
            .map(|kind| {
                let stats = EntityStats {
                    distinct: self.entity_values.get(kind).map_or(0, |v| v.len()),
                    mentions: self.entity_mentions.get(kind).copied().unwrap_or(0),
                };
                (*kind, stats)
            })
            .collect();

        FolderPatternReport {
            total_messages: self.messages,
            categories,
            senders: self.senders,
            entities,
            correlation: CorrelationStats {
                average: average(self.correlation_sum, self.messages),
                min: self.correlation_min,
                max: self.correlation_max,
                high_count: self.high_count,
                low_count: self.low_count,
            },
        }
    }
}

/// Aggregates analyses with their parallel sender list.
///
/// An empty folder yields an all-zero report.
pub fn aggregate<S: AsRef<str>>(analyses: &[MessageAnalysis], senders: &[S]) -> Result<FolderPatternReport> {
    if analyses.len() != senders.len() {
        return Err(MailsiftError::LengthMismatch {
            analyses: analyses.len(),
            senders: senders.len(),
        });
    }

    let mut acc = PatternAccumulator::new();
    for (analysis, sender) in analyses.iter().zip(senders) {
        acc.add(analysis, sender.as_ref());
    }
    Ok(acc.finish())
}
