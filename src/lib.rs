//! # mailsift
//!
//! Two independent engines over already-decoded input:
//!
//! - **Message analysis** - typed entity extraction (emails, phones, dates,
//!   URLs, money), a subject/body/attachment correlation score, keyword
//!   categorization and a rule-based summary for each decoded email message,
//!   plus folder-level pattern statistics.
//! - **Tabular ingestion** - routes a spreadsheet/CSV file to one of several
//!   configured target templates, binds template columns to the file's headers
//!   (exact, case-insensitive, alias and indexed-group matching), normalizes
//!   values and reports coverage and data quality.
//!
//! Decoding message containers and reading workbook formats is left to the
//! caller; the engines take plain records and return plain records.
//!
//! ## Quick Start
//!
//! ```rust
//! use mailsift::prelude::*;
//!
//! let message = MessageContent::new("Invoice 42", "Please pay $1,200 by Friday.")
//!     .with_sender("billing@example.com")
//!     .with_attachment(Attachment::new("invoice_42.pdf", 48_000, "application/pdf"));
//!
//! let analysis = MessageAnalyzer::new().analyze(&message)?;
//!
//! assert!(analysis.categories().contains(&"invoice".to_string()));
//! assert!(analysis.entities().contains(EntityKind::Money, "$1,200"));
//!
//! let report = aggregate(&[analysis], &["billing@example.com"])?;
//! assert_eq!(report.total_messages, 1);
//! # Ok::<(), MailsiftError>(())
//! ```
//!
//! ## Tabular Ingestion
//!
//! ```rust,no_run
//! # #[cfg(feature = "csv-output")]
//! # fn main() -> mailsift::Result<()> {
//! use mailsift::prelude::*;
//!
//! let registry = SchemaRegistry::from_dir("config")?;
//! let pipeline = IngestionPipeline::from_registry(&registry);
//!
//! let outcome = pipeline.ingest_file("data/group1.csv")?;
//! println!("{}", outcome.report);
//! write_csv(&outcome.table, "output/group1.csv", b',')?;
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "csv-output"))]
//! # fn main() {}
//! ```
//!
//! ## Module Structure
//!
//! - [`message`] - [`MessageContent`] and [`Attachment`] input records
//! - [`analysis`] - entity extraction, correlation, categories, summaries,
//!   [`MessageAnalyzer`](analysis::MessageAnalyzer) and folder aggregation
//! - [`config`] - serde shapes of `templates_config.json` and `file_mappings.json`
//! - [`ingest`] - routing, column resolution, value transforms, ingestion and reports
//! - [`output`] - CSV / JSON / JSONL writers
//! - [`format`] - [`OutputFormat`](format::OutputFormat) selection
//! - [`cli`] - CLI argument types (feature `cli`)
//! - [`error`] - [`MailsiftError`] and [`Result`]
//! - [`prelude`] - Convenient re-exports

pub mod analysis;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod ingest;
pub mod message;
pub mod output;

// Re-export the main types at the crate root for convenience
pub use error::{AnalysisError, MailsiftError, Result};
pub use message::{Attachment, MessageContent};

/// Convenient re-exports for common usage.
///
/// ```rust
/// use mailsift::prelude::*;
/// ```
pub mod prelude {
    // Input records
    pub use crate::message::{Attachment, MessageContent, parse_recipients};

    // Error types
    pub use crate::error::{AnalysisError, MailsiftError, Result};

    // Message analysis
    pub use crate::analysis::{
        CategoryTable, ContentSummary, EntityBag, EntityExtractor, EntityKind, EntityPatterns,
        FolderPatternReport, MessageAnalysis, MessageAnalyzer, PatternAccumulator, aggregate,
        categorize, correlation_score, extract_entities, summarize,
    };

    // Configuration documents
    pub use crate::config::{RoutingCatalogue, TemplateCatalogue};

    // Tabular ingestion
    #[cfg(feature = "csv-output")]
    pub use crate::ingest::IngestOutcome;
    pub use crate::ingest::{
        Catalogue, CellValue, IngestionPipeline, MappedTable, MappingReport, QualityIssue,
        SchemaRegistry, SourceTable, Template, TemplateMatch,
    };

    // Output
    pub use crate::format::{OutputFormat, write_table};
    #[cfg(feature = "csv-output")]
    pub use crate::output::{to_csv, write_csv};
    pub use crate::output::{to_json, to_jsonl, write_json, write_jsonl};
}
