//! Output writers.
//!
//! - [`write_csv`] / [`to_csv`] - mapped tables as CSV, header row in template
//!   column order (requires `csv-output`)
//! - [`write_json`] / [`to_json`] - any serializable value as pretty JSON
//! - [`write_jsonl`] / [`to_jsonl`] - one compact JSON object per line
//!
//! # Choosing a Format
//!
//! | Format | Use Case |
//! |--------|----------|
//! | CSV | Mapped tables for spreadsheets and downstream loaders |
//! | JSON | Analyses, reports, whole tables |
//! | JSONL | Streams of analyses or table rows |
//!
//! # Example
//!
//! ```rust
//! # #[cfg(feature = "csv-output")]
//! # fn main() -> mailsift::Result<()> {
//! use mailsift::config::{RoutingCatalogue, TemplateCatalogue, TemplateConfig};
//! use mailsift::ingest::{ingest_table, Catalogue, SourceTable};
//! use mailsift::output::{to_csv, to_jsonl};
//!
//! let templates = TemplateCatalogue::new()
//!     .with_template("t", TemplateConfig::new("T", ["Surname", "Forename"]));
//! let catalogue = Catalogue::from_documents(&templates, &RoutingCatalogue::new())?;
//!
//! let source = SourceTable::new(["forename", "surname"]).with_row(["Ann", "Smith"]);
//! let (mapped, _report) = ingest_table(catalogue.template("t")?, &source);
//!
//! assert_eq!(to_csv(&mapped, b',')?, "Surname,Forename\nSmith,Ann\n");
//! assert_eq!(to_jsonl(mapped.records())?, "{\"Surname\":\"Smith\",\"Forename\":\"Ann\"}\n");
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "csv-output"))]
//! # fn main() {}
//! ```

#[cfg(feature = "csv-output")]
mod csv_writer;
mod json_writer;
mod jsonl_writer;

#[cfg(feature = "csv-output")]
pub use csv_writer::{DEFAULT_DELIMITER, to_csv, write_csv};
pub use json_writer::{to_json, write_json};
pub use jsonl_writer::{to_jsonl, write_jsonl};
