//! Message-side analysis.
//!
//! Everything in this module is a pure function over already-decoded text:
//!
//! - [`entities`] - typed literal extraction (emails, phones, dates, urls, money)
//! - [`correlation`] - subject/body/attachment overlap score
//! - [`categorize`] - keyword-table labels
//! - [`summarize`] - rule-based summary, key points and action items
//! - [`pipeline`] - [`MessageAnalyzer`] and folder aggregation

pub mod categorize;
pub mod correlation;
pub mod entities;
pub mod pipeline;
pub mod summarize;

pub use categorize::{CategoryTable, GENERAL, HAS_ATTACHMENTS, categorize};
pub use correlation::{ATTACHMENT_WEIGHT, correlation_score};
pub use entities::{EntityBag, EntityExtractor, EntityKind, EntityPatterns, extract_entities};
pub use pipeline::{
    CategoryStats, CorrelationStats, EntityStats, FolderPatternReport, MessageAnalysis,
    MessageAnalyzer, PatternAccumulator, aggregate,
};
pub use summarize::{
    ContentSummary, attachment_summary, extract_action_items, extract_key_points,
    generate_summary, priority_indicators, summarize,
};
