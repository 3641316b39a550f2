//! Tabular ingestion: route a file to a template, bind its columns, normalize
//! its values, and report on the result.
//!
//! # Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`table`] | [`SourceTable`] input, [`MappedTable`] output, CSV loading |
//! | [`glob`] | Path normalization and include/exclude patterns |
//! | [`registry`] | Validated [`Catalogue`], routing, reloadable [`SchemaRegistry`] |
//! | [`resolver`] | Target column to source header binding |
//! | [`transform`] | Per-cell value normalization |
//! | [`report`] | [`MappingReport`] and [`QualityIssue`] |
//! | [`pipeline`] | [`IngestionPipeline`] tying the above together |

pub mod glob;
pub mod pipeline;
pub mod registry;
pub mod report;
pub mod resolver;
pub mod table;
pub mod transform;

pub use glob::{PathPattern, normalize_path};
#[cfg(feature = "csv-output")]
pub use pipeline::{BatchEntry, BatchReport, IngestOutcome, find_csv_files};
pub use pipeline::{IngestionPipeline, ingest_table};
pub use registry::{
    Catalogue, IndexedGroup, MatchSource, Route, SchemaRegistry, Template, TemplateMatch,
};
pub use report::{ColumnDetail, DataQualityMetrics, MappingReport, QualityIssue};
pub use resolver::{ColumnBinding, ColumnMapping, MatchMethod, normalize_column_name, resolve};
pub use table::{CellValue, MappedRecord, MappedTable, SourceRow, SourceTable, normalize_header};
pub use transform::{DateRule, FieldKind, TransformOutcome, TransformRules, parse_date, transform};
