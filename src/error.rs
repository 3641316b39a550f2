//! Unified error types for mailsift.
//!
//! This module provides a single [`MailsiftError`] enum that covers all fatal
//! error cases in the library. Per-message validation failures are described by
//! the nested [`AnalysisError`] kind.
//!
//! # Error Handling Philosophy
//!
//! - **Fatal at the call**: configuration validation and genuinely invalid inputs
//! - **Per item**: one bad message or one unroutable file is an error for that item
//!   only; batch loops record it and continue with the siblings
//! - **Never an error**: unresolved columns, unparseable dates, empty or duplicate
//!   rows. Those are [`QualityIssue`](crate::ingest::QualityIssue) values inside the
//!   [`MappingReport`](crate::ingest::MappingReport)

use std::io;

use thiserror::Error;

/// A specialized [`Result`] type for mailsift operations.
///
/// # Example
///
/// ```rust
/// use mailsift::error::Result;
/// use mailsift::analysis::EntityBag;
///
/// fn my_function() -> Result<EntityBag> {
///     Ok(EntityBag::new())
/// }
/// ```
pub type Result<T> = std::result::Result<T, MailsiftError>;

/// The error type for all mailsift operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MailsiftError {
    /// An I/O error occurred.
    ///
    /// This typically happens when a configuration directory or an input file
    /// cannot be read, or an output file cannot be written.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON parsing/serialization error.
    ///
    /// Raised for malformed configuration documents and message files.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV reading or writing error.
    #[cfg(feature = "csv-output")]
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A message could not be analyzed.
    ///
    /// Fatal to that single message only.
    #[error("Cannot analyze message: {0}")]
    Analysis(#[from] AnalysisError),

    /// The template/routing catalogue is internally inconsistent.
    ///
    /// Carries every violation found, not just the first.
    #[error("Invalid configuration ({}): {}", violation_count(.violations), .violations.join("; "))]
    ConfigValidation {
        /// One human-readable line per violation
        violations: Vec<String>,
    },

    /// Routing found no applicable template for a file.
    #[error("No template applies to '{path}'")]
    TemplateNotFound {
        /// The path that was routed
        path: String,
    },

    /// A template id was requested that the catalogue does not define.
    #[error("Unknown template '{id}'")]
    UnknownTemplate {
        /// The requested template id
        id: String,
    },

    /// A configured regular expression failed to compile.
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The pattern as written in configuration
        pattern: String,
        /// The underlying regex error
        #[source]
        source: regex::Error,
    },

    /// A date format specification could not be understood.
    #[error("Invalid date format '{input}'. Expected {expected}")]
    InvalidDate {
        /// The invalid specification
        input: String,
        /// Expected format description
        expected: &'static str,
    },

    /// An unsupported output format or file extension.
    #[error("Invalid {format} format: {message}")]
    InvalidFormat {
        /// What kind of format was being chosen, e.g. `output`
        format: &'static str,
        /// What went wrong
        message: String,
    },

    /// Analyses and senders passed to folder aggregation differ in length.
    #[error("Cannot aggregate {analyses} analyses with {senders} senders")]
    LengthMismatch {
        /// Number of analyses supplied
        analyses: usize,
        /// Number of senders supplied
        senders: usize,
    },
}

/// Reasons a single message is rejected by the analysis pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// A mandatory field is empty.
    #[error("missing mandatory field `{field}`")]
    MissingField {
        /// Dotted path of the field, e.g. `attachments[2].filename`
        field: String,
    },

    /// A text field contains bytes that were never decoded to text.
    #[error("field `{field}` contains non-text content")]
    NonTextContent {
        /// Name of the offending field
        field: &'static str,
    },
}

fn violation_count(violations: &[String]) -> String {
    match violations.len() {
        1 => "1 violation".to_string(),
        n => format!("{n} violations"),
    }
}

// ============================================================================
// Convenience constructors
// ============================================================================

impl MailsiftError {
    /// Creates a configuration validation error from collected violations.
    pub fn config_validation(violations: Vec<String>) -> Self {
        MailsiftError::ConfigValidation { violations }
    }

    /// Creates a template-not-found error for a routed path.
    pub fn template_not_found(path: impl Into<String>) -> Self {
        MailsiftError::TemplateNotFound { path: path.into() }
    }

    /// Creates an unknown-template error.
    pub fn unknown_template(id: impl Into<String>) -> Self {
        MailsiftError::UnknownTemplate { id: id.into() }
    }

    /// Creates an invalid pattern error.
    pub fn invalid_pattern(pattern: impl Into<String>, source: regex::Error) -> Self {
        MailsiftError::InvalidPattern {
            pattern: pattern.into(),
            source,
        }
    }

    /// Creates an invalid date format error.
    pub fn invalid_date(input: impl Into<String>) -> Self {
        MailsiftError::InvalidDate {
            input: input.into(),
            expected: "DD/MM/YYYY, YYYY-MM-DD, MM/DD/YYYY or a strftime pattern",
        }
    }

    /// Returns `true` if this is an IO error.
    pub fn is_io(&self) -> bool {
        matches!(self, MailsiftError::Io(_))
    }

    /// Returns `true` if this is a per-message analysis error.
    pub fn is_analysis(&self) -> bool {
        matches!(self, MailsiftError::Analysis(_))
    }

    /// Returns `true` if this is a configuration validation error.
    pub fn is_config_validation(&self) -> bool {
        matches!(self, MailsiftError::ConfigValidation { .. })
    }

    /// Returns `true` if routing found no template.
    pub fn is_template_not_found(&self) -> bool {
        matches!(self, MailsiftError::TemplateNotFound { .. })
    }

    /// Returns the validation violations, if this is a validation error.
    pub fn violations(&self) -> &[String] {
        match self {
            MailsiftError::ConfigValidation { violations } => violations,
            _ => &[],
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err = MailsiftError::from(io_err);
        let display = err.to_string();
        assert!(display.contains("IO error"));
        assert!(display.contains("file not found"));
        assert!(err.is_io());
    }

    #[test]
    fn test_config_validation_lists_every_violation() {
        let err = MailsiftError::config_validation(vec![
            "rule 'a' references unknown template 'x'".into(),
            "template 'y' has no columns".into(),
        ]);
        let display = err.to_string();
        assert!(display.contains("2 violations"));
        assert!(display.contains("unknown template 'x'"));
        assert!(display.contains("no columns"));
        assert_eq!(err.violations().len(), 2);
        assert!(err.is_config_validation());
    }

    #[test]
    fn test_single_violation_is_singular() {
        let err = MailsiftError::config_validation(vec!["only one".into()]);
        assert!(err.to_string().contains("1 violation)"));
    }

    #[test]
    fn test_template_not_found_display() {
        let err = MailsiftError::template_not_found("data/unknown.csv");
        assert!(err.to_string().contains("data/unknown.csv"));
        assert!(err.is_template_not_found());
        assert!(err.violations().is_empty());
    }

    #[test]
    fn test_analysis_error_conversion() {
        let err: MailsiftError = AnalysisError::MissingField {
            field: "attachments[0].filename".into(),
        }
        .into();
        assert!(err.is_analysis());
        assert!(err.to_string().contains("attachments[0].filename"));

        let err: MailsiftError = AnalysisError::NonTextContent { field: "body_text" }.into();
        assert!(err.to_string().contains("non-text"));
    }

    #[test]
    fn test_invalid_pattern_has_source() {
        use std::error::Error;
        let regex_err = regex::Regex::new("child(").unwrap_err();
        let err = MailsiftError::invalid_pattern("child(", regex_err);
        assert!(err.to_string().contains("child("));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: MailsiftError = json_err.into();
        assert!(err.to_string().contains("JSON error"));
    }

    #[test]
    fn test_length_mismatch_display() {
        let err = MailsiftError::LengthMismatch {
            analyses: 3,
            senders: 2,
        };
        assert!(err.to_string().contains("3 analyses"));
    }

    #[test]
    fn test_error_debug() {
        let err = MailsiftError::invalid_date("QQ");
        let debug = format!("{:?}", err);
        assert!(debug.contains("InvalidDate"));
    }
}
