//! Per-file mapping and data quality report.
//!
//! Nothing in here is an error. Unbound columns, empty or duplicate rows,
//! missing required values and unparseable dates are all recorded as
//! [`QualityIssue`]s while processing carries on.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::registry::Template;
use super::resolver::{ColumnBinding, ColumnMapping};

/// One data quality warning. Row numbers are 1-based data rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QualityIssue {
    /// Every cell in the row is empty.
    EmptyRow { row: usize },

    /// Same values as an earlier row.
    DuplicateRow { row: usize, first: usize },

    /// A bound required column has no value in this row.
    MissingRequired { row: usize, column: String },

    /// A required column has no source header at all.
    RequiredColumnUnmapped { column: String },

    /// A date rule applied but the value was left as is.
    UnparseableDate {
        row: usize,
        column: String,
        value: String,
    },
}

impl QualityIssue {
    /// The row the issue concerns, if it is row-level.
    pub fn row(&self) -> Option<usize> {
        match self {
            QualityIssue::EmptyRow { row }
            | QualityIssue::DuplicateRow { row, .. }
            | QualityIssue::MissingRequired { row, .. }
            | QualityIssue::UnparseableDate { row, .. } => Some(*row),
            QualityIssue::RequiredColumnUnmapped { .. } => None,
        }
    }
}

impl fmt::Display for QualityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityIssue::EmptyRow { row } => write!(f, "row {row} is empty"),
            QualityIssue::DuplicateRow { row, first } => {
                write!(f, "row {row} duplicates row {first}")
            }
            QualityIssue::MissingRequired { row, column } => {
                write!(f, "row {row} has no value for required column '{column}'")
            }
            QualityIssue::RequiredColumnUnmapped { column } => {
                write!(f, "required column '{column}' is not mapped")
            }
            QualityIssue::UnparseableDate { row, column, value } => {
                write!(f, "row {row}: cannot parse date '{value}' in '{column}'")
            }
        }
    }
}

/// Fill statistics for one bound column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDetail {
    pub target: String,
    pub source: String,
    pub rows_with_data: usize,
    pub rows_empty: usize,
    /// 0 to 100
    pub data_percentage: f64,
}

impl ColumnDetail {
    pub(crate) fn new(target: &str, source: &str, rows_with_data: usize, row_count: usize) -> Self {
        let data_percentage = if row_count == 0 {
            0.0
        } else {
            rows_with_data as f64 / row_count as f64 * 100.0
        };
        Self {
            target: target.to_string(),
            source: source.to_string(),
            rows_with_data,
            rows_empty: row_count - rows_with_data,
            data_percentage,
        }
    }
}

/// Aggregates over [`ColumnDetail`]s.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataQualityMetrics {
    pub columns_with_data: usize,
    pub completely_empty_columns: usize,
    /// Mean `data_percentage` over bound columns
    pub average_data_coverage: f64,
}

impl DataQualityMetrics {
    fn from_details(details: &[ColumnDetail]) -> Self {
        let columns_with_data = details.iter().filter(|d| d.rows_with_data > 0).count();
        let average_data_coverage = if details.is_empty() {
            0.0
        } else {
            details.iter().map(|d| d.data_percentage).sum::<f64>() / details.len() as f64
        };
        Self {
            columns_with_data,
            completely_empty_columns: details.len() - columns_with_data,
            average_data_coverage,
        }
    }
}

/// Everything known about how one file mapped onto its template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file: Option<String>,
    template_id: String,
    template_name: String,
    row_count: usize,
    resolved_count: usize,
    total_columns: usize,
    coverage: f64,
    unmapped_columns: Vec<String>,
    unused_headers: Vec<String>,
    bindings: Vec<ColumnBinding>,
    column_details: Vec<ColumnDetail>,
    metrics: DataQualityMetrics,
    issues: Vec<QualityIssue>,
}

impl MappingReport {
    pub(crate) fn new(
        template: &Template,
        mapping: &ColumnMapping,
        row_count: usize,
        column_details: Vec<ColumnDetail>,
        issues: Vec<QualityIssue>,
    ) -> Self {
        Self {
            file: None,
            template_id: template.id().to_string(),
            template_name: template.name().to_string(),
            row_count,
            resolved_count: mapping.resolved_count(),
            total_columns: mapping.total(),
            coverage: mapping.coverage(),
            unmapped_columns: mapping.unmapped().into_iter().map(String::from).collect(),
            unused_headers: mapping.unused_headers().into_iter().map(String::from).collect(),
            bindings: mapping.bindings().to_vec(),
            metrics: DataQualityMetrics::from_details(&column_details),
            column_details,
            issues,
        }
    }

    /// Builder method to record the source file.
    #[must_use]
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    pub fn template_id(&self) -> &str {
        &self.template_id
    }

    pub fn template_name(&self) -> &str {
        &self.template_name
    }

    /// Input rows, which is also the output row count.
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn resolved_count(&self) -> usize {
        self.resolved_count
    }

    pub fn total_columns(&self) -> usize {
        self.total_columns
    }

    /// Resolved share of target columns, 0 to 1.
    pub fn coverage(&self) -> f64 {
        self.coverage
    }

    pub fn unmapped_columns(&self) -> &[String] {
        &self.unmapped_columns
    }

    pub fn unused_headers(&self) -> &[String] {
        &self.unused_headers
    }

    pub fn bindings(&self) -> &[ColumnBinding] {
        &self.bindings
    }

    pub fn column_details(&self) -> &[ColumnDetail] {
        &self.column_details
    }

    pub fn metrics(&self) -> &DataQualityMetrics {
        &self.metrics
    }

    pub fn issues(&self) -> &[QualityIssue] {
        &self.issues
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    pub fn empty_rows(&self) -> usize {
        self.count(|i| matches!(i, QualityIssue::EmptyRow { .. }))
    }

    pub fn duplicate_rows(&self) -> usize {
        self.count(|i| matches!(i, QualityIssue::DuplicateRow { .. }))
    }

    fn count(&self, pred: impl Fn(&QualityIssue) -> bool) -> usize {
        self.issues.iter().filter(|i| pred(i)).count()
    }
}

impl fmt::Display for MappingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);

        writeln!(f, "{rule}")?;
        if let Some(file) = &self.file {
            writeln!(f, "FILE: {file}")?;
        }
        writeln!(f, "TEMPLATE: {} ({})", self.template_name, self.template_id)?;
        writeln!(f, "{rule}")?;

        writeln!(f, "\nPROCESSING SUMMARY")?;
        writeln!(f, "  Rows processed:   {}", self.row_count)?;
        writeln!(
            f,
            "  Columns mapped:   {}/{} ({:.1}%)",
            self.resolved_count,
            self.total_columns,
            self.coverage * 100.0
        )?;
        if !self.unmapped_columns.is_empty() {
            writeln!(f, "  Unmapped columns: {}", self.unmapped_columns.join(", "))?;
        }
        if !self.unused_headers.is_empty() {
            writeln!(f, "  Unused headers:   {}", self.unused_headers.join(", "))?;
        }
        writeln!(f, "  Empty rows:       {}", self.empty_rows())?;
        writeln!(f, "  Duplicate rows:   {}", self.duplicate_rows())?;

        writeln!(f, "\nDATA QUALITY METRICS")?;
        writeln!(f, "  Columns with data:        {}", self.metrics.columns_with_data)?;
        writeln!(f, "  Completely empty columns: {}", self.metrics.completely_empty_columns)?;
        writeln!(
            f,
            "  Average data coverage:    {:.1}%",
            self.metrics.average_data_coverage
        )?;

        writeln!(f, "\nCOLUMN MAPPINGS")?;
        for binding in self.bindings.iter().filter(|b| b.is_bound()) {
            let method = binding.method.map_or("", |m| m.as_str());
            writeln!(
                f,
                "  {} <- {} ({method})",
                binding.target,
                binding.source.as_deref().unwrap_or_default()
            )?;
        }

        if !self.column_details.is_empty() {
            writeln!(f, "\nAFFECTED COLUMNS DETAIL")?;
            writeln!(
                f,
                "  {:<28} {:>10} {:>8} {:>8}",
                "Column", "With data", "Empty", "Data %"
            )?;
            for d in &self.column_details {
                writeln!(
                    f,
                    "  {:<28} {:>10} {:>8} {:>7.1}%",
                    d.target, d.rows_with_data, d.rows_empty, d.data_percentage
                )?;
            }
        }

        if !self.issues.is_empty() {
            writeln!(f, "\nISSUES ({})", self.issues.len())?;
            for issue in &self.issues {
                writeln!(f, "  - {issue}")?;
            }
        }
        Ok(())
    }
}
