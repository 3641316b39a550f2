//! Output format selection for mapped tables.
//!
//! # Example
//!
//! ```rust
//! use mailsift::format::OutputFormat;
//!
//! let format = OutputFormat::from_path("people.jsonl")?;
//! assert_eq!(format, OutputFormat::Jsonl);
//! assert_eq!(format.extension(), "jsonl");
//! # Ok::<(), mailsift::MailsiftError>(())
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{MailsiftError, Result};
use crate::ingest::MappedTable;

/// Output format for mapped tables.
///
/// - [`Csv`](OutputFormat::Csv) - header row plus one record per row (default)
/// - [`Json`](OutputFormat::Json) - array of row objects
/// - [`Jsonl`](OutputFormat::Jsonl) - one row object per line
///
/// ```rust
/// use mailsift::format::OutputFormat;
/// use std::str::FromStr;
///
/// assert_eq!(OutputFormat::from_str("ndjson").unwrap(), OutputFormat::Jsonl);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum OutputFormat {
    /// Comma-separated values
    #[default]
    Csv,

    /// JSON array of row objects
    Json,

    /// JSON Lines, also known as NDJSON
    #[cfg_attr(feature = "cli", value(alias = "ndjson"))]
    Jsonl,
}

impl OutputFormat {
    /// Returns the file extension for this format (without dot).
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
            OutputFormat::Jsonl => "jsonl",
        }
    }

    /// Returns all supported format names.
    pub fn all_names() -> &'static [&'static str] {
        &["csv", "json", "jsonl", "ndjson"]
    }

    /// Returns all available formats.
    pub fn all() -> &'static [OutputFormat] {
        &[OutputFormat::Csv, OutputFormat::Json, OutputFormat::Jsonl]
    }

    /// Detects format from a file path based on extension.
    pub fn from_path(path: &str) -> Result<Self> {
        let ext = path.rsplit('.').next().unwrap_or("").to_lowercase();

        match ext.as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            "jsonl" | "ndjson" => Ok(OutputFormat::Jsonl),
            _ => Err(MailsiftError::InvalidFormat {
                format: "output",
                message: format!("Unknown file extension: '.{ext}'. Expected one of: csv, json, jsonl"),
            }),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Csv => write!(f, "CSV"),
            OutputFormat::Json => write!(f, "JSON"),
            OutputFormat::Jsonl => write!(f, "JSONL"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            "jsonl" | "ndjson" => Ok(OutputFormat::Jsonl),
            _ => Err(format!(
                "Unknown format: '{}'. Expected one of: {}",
                s,
                OutputFormat::all_names().join(", ")
            )),
        }
    }
}

/// Writes a mapped table to a file in the given format.
///
/// CSV needs the `csv-output` feature.
pub fn write_table(table: &MappedTable, path: &str, format: OutputFormat) -> Result<()> {
    match format {
        #[cfg(feature = "csv-output")]
        OutputFormat::Csv => crate::output::write_csv(table, path, crate::output::DEFAULT_DELIMITER),
        OutputFormat::Json => crate::output::write_json(table, path),
        OutputFormat::Jsonl => crate::output::write_jsonl(table.records(), path),
        #[allow(unreachable_patterns)]
        _ => Err(feature_missing(format)),
    }
}

/// Renders a mapped table as a string in the given format.
pub fn to_format_string(table: &MappedTable, format: OutputFormat) -> Result<String> {
    match format {
        #[cfg(feature = "csv-output")]
        OutputFormat::Csv => crate::output::to_csv(table, crate::output::DEFAULT_DELIMITER),
        OutputFormat::Json => crate::output::to_json(table),
        OutputFormat::Jsonl => crate::output::to_jsonl(table.records()),
        #[allow(unreachable_patterns)]
        _ => Err(feature_missing(format)),
    }
}

#[allow(dead_code)]
fn feature_missing(format: OutputFormat) -> MailsiftError {
    MailsiftError::InvalidFormat {
        format: "output",
        message: format!("Output format {format} requires the 'csv-output' feature to be enabled"),
    }
}
