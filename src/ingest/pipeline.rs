//! Maps a loaded table onto a template.
//!
//! Columns are resolved once per table. Every source row then yields exactly
//! one output row in template column order, with each bound cell passed
//! through [`transform`] and unbound columns left empty. Problems found on the
//! way go into the [`MappingReport`]; rows are never dropped.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use mailsift::config::{
//!     ColumnMappingConfig, RoutingCatalogue, TemplateCatalogue, TemplateConfig, TransformConfig,
//! };
//! use mailsift::ingest::{Catalogue, CellValue, IngestionPipeline, SourceTable};
//!
//! let templates = TemplateCatalogue::new()
//!     .with_template(
//!         "t",
//!         TemplateConfig::new("T", ["Surname", "Reference"])
//!             .with_transformations(TransformConfig::standard()),
//!     )
//!     .with_column_mapping("t", ColumnMappingConfig::new().with_aliases("Surname", ["last_name"]));
//! let catalogue = Catalogue::from_documents(&templates, &RoutingCatalogue::new())?;
//! let pipeline = IngestionPipeline::new(Arc::new(catalogue));
//!
//! let source = SourceTable::new(["last_name", "dob"])
//!     .with_row(["smith", "1990-01-02"])
//!     .with_row(["jones", ""]);
//! let (table, report) = pipeline.ingest("t", &source)?;
//!
//! assert_eq!(table.row_count(), 2);
//! assert_eq!(table.get(0, "Surname"), Some(&CellValue::from("Smith")));
//! assert_eq!(table.get(0, "Reference"), Some(&CellValue::Null));
//! assert_eq!(report.coverage(), 0.5);
//! # Ok::<(), mailsift::MailsiftError>(())
//! ```

use std::borrow::Cow;
use std::collections::HashMap;
#[cfg(feature = "csv-output")]
use std::fs;
#[cfg(feature = "csv-output")]
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[cfg(feature = "csv-output")]
use serde::Serialize;
#[cfg(feature = "csv-output")]
use tracing::error;
use tracing::{debug, info, warn};

use super::registry::{Catalogue, SchemaRegistry, Template};
#[cfg(feature = "csv-output")]
use super::registry::TemplateMatch;
use super::report::{ColumnDetail, MappingReport, QualityIssue};
use super::resolver::resolve;
use super::table::{CellValue, MappedTable, SourceTable};
use super::transform::transform;
use crate::error::Result;

/// Result of ingesting a file from disk.
#[cfg(feature = "csv-output")]
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// How the template was chosen; `None` when it was given explicitly
    pub matched: Option<TemplateMatch>,
    pub table: MappedTable,
    pub report: MappingReport,
}

/// What happened to one file of a batch.
#[cfg(feature = "csv-output")]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchEntry {
    Ingested {
        file: String,
        template_id: String,
        rows: usize,
        issues: usize,
    },
    /// No route matched the file
    Unrouted { file: String, reason: String },
    Failed { file: String, error: String },
}

#[cfg(feature = "csv-output")]
impl BatchEntry {
    pub fn file(&self) -> &str {
        match self {
            BatchEntry::Ingested { file, .. }
            | BatchEntry::Unrouted { file, .. }
            | BatchEntry::Failed { file, .. } => file,
        }
    }
}

/// Per-file results of [`IngestionPipeline::ingest_batch`], in input order.
#[cfg(feature = "csv-output")]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    entries: Vec<BatchEntry>,
}

#[cfg(feature = "csv-output")]
impl BatchReport {
    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ingested(&self) -> usize {
        self.count(|e| matches!(e, BatchEntry::Ingested { .. }))
    }

    pub fn unrouted(&self) -> usize {
        self.count(|e| matches!(e, BatchEntry::Unrouted { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|e| matches!(e, BatchEntry::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&BatchEntry) -> bool) -> usize {
        self.entries.iter().filter(|e| pred(e)).count()
    }
}

/// Ingests tables against one catalogue snapshot.
#[derive(Debug, Clone)]
pub struct IngestionPipeline {
    catalogue: Arc<Catalogue>,
}

impl IngestionPipeline {
    pub fn new(catalogue: Arc<Catalogue>) -> Self {
        Self { catalogue }
    }

    /// Uses the registry's current snapshot. Later reloads do not affect
    /// this pipeline.
    pub fn from_registry(registry: &SchemaRegistry) -> Self {
        Self::new(registry.snapshot())
    }

    pub fn catalogue(&self) -> &Catalogue {
        &self.catalogue
    }

    /// Maps `table` onto the template `template_id`.
    ///
    /// Fails only when the template does not exist.
    pub fn ingest(&self, template_id: &str, table: &SourceTable) -> Result<(MappedTable, MappingReport)> {
        let template = self.catalogue.template(template_id)?;
        Ok(ingest_table(template, table))
    }

    /// Loads a CSV file, routes it, and ingests it.
    ///
    /// Routing sees the headers of the first row, so auto-detection applies.
    /// When the chosen template has a different header row the file is
    /// reloaded with that offset.
    #[cfg(feature = "csv-output")]
    pub fn ingest_file(&self, path: impl AsRef<Path>) -> Result<IngestOutcome> {
        let path = path.as_ref();
        let display = path.to_string_lossy();
        let first_pass = SourceTable::from_csv_path(path, 0)?;
        let matched = self.catalogue.resolve_with_headers(&display, first_pass.headers())?;
        let template = self.catalogue.template(&matched.template_id)?;

        let (table, report) = if template.header_row() == 0 {
            ingest_table(template, &first_pass)
        } else {
            ingest_table(template, &SourceTable::from_csv_path(path, template.header_row())?)
        };
        Ok(IngestOutcome {
            matched: Some(matched),
            table,
            report: report.with_file(display),
        })
    }

    /// Loads a CSV file and ingests it against an explicit template.
    #[cfg(feature = "csv-output")]
    pub fn ingest_file_as(&self, path: impl AsRef<Path>, template_id: &str) -> Result<IngestOutcome> {
        let path = path.as_ref();
        let template = self.catalogue.template(template_id)?;
        let source = SourceTable::from_csv_path(path, template.header_row())?;
        let (table, report) = ingest_table(template, &source);
        Ok(IngestOutcome {
            matched: None,
            table,
            report: report.with_file(path.to_string_lossy()),
        })
    }

    /// Routes and ingests every file in `paths`, handing each outcome to `sink`.
    ///
    /// A file with no matching route is recorded as unrouted and skipped. Any
    /// other failure, including one returned by `sink`, is recorded when the
    /// catalogue's `continue_on_error` is set and returned otherwise.
    #[cfg(feature = "csv-output")]
    pub fn ingest_batch<I, P, F>(&self, paths: I, mut sink: F) -> Result<BatchReport>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
        F: FnMut(&IngestOutcome) -> Result<()>,
    {
        let continue_on_error = self.catalogue.processing_options().continue_on_error;
        let mut batch = BatchReport::default();

        for path in paths {
            let path = path.as_ref();
            let file = path.to_string_lossy().into_owned();
            let result = self
                .ingest_file(path)
                .and_then(|outcome| sink(&outcome).map(|()| outcome));

            let entry = match result {
                Ok(outcome) => BatchEntry::Ingested {
                    template_id: outcome.report.template_id().to_string(),
                    rows: outcome.table.row_count(),
                    issues: outcome.report.issues().len(),
                    file,
                },
                Err(e) if e.is_template_not_found() => {
                    warn!(file = %file, "no template for file, skipped");
                    BatchEntry::Unrouted {
                        file,
                        reason: e.to_string(),
                    }
                }
                Err(e) if continue_on_error => {
                    error!(file = %file, error = %e, "file failed, continuing");
                    BatchEntry::Failed {
                        file,
                        error: e.to_string(),
                    }
                }
                Err(e) => return Err(e),
            };
            batch.entries.push(entry);
        }

        info!(
            ingested = batch.ingested(),
            unrouted = batch.unrouted(),
            failed = batch.failed(),
            "batch finished"
        );
        Ok(batch)
    }
}

/// Lists `*.csv` files under `dir` and its subdirectories, sorted by path.
#[cfg(feature = "csv-output")]
pub fn find_csv_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![dir.as_ref().to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv")) {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}

/// Maps `table` onto `template`. Never fails.
pub fn ingest_table(template: &Template, table: &SourceTable) -> (MappedTable, MappingReport) {
    let table: Cow<'_, SourceTable> = if template.use_first_row_as_headers() {
        let mut promoted = table.clone();
        promoted.promote_first_row();
        Cow::Owned(promoted)
    } else {
        Cow::Borrowed(table)
    };

    let mapping = resolve(template, table.headers());
    let sources: Vec<Option<usize>> = mapping.bindings().iter().map(|b| b.source_index).collect();
    let required: Vec<(usize, &str)> = template
        .required_columns()
        .iter()
        .filter_map(|c| {
            let at = template.columns().iter().position(|t| t == c)?;
            Some((at, c.as_str()))
        })
        .collect();

    let mut issues = Vec::new();
    for &(at, column) in &required {
        if sources[at].is_none() {
            issues.push(QualityIssue::RequiredColumnUnmapped {
                column: column.to_string(),
            });
        }
    }

    let mut output = MappedTable::new(template.columns().to_vec());
    let mut filled = vec![0usize; sources.len()];
    let mut seen: HashMap<Vec<Cow<'_, str>>, usize> = HashMap::new();

    for (i, row) in table.rows().iter().enumerate() {
        let row_no = i + 1;

        if row.iter().all(CellValue::is_empty) {
            issues.push(QualityIssue::EmptyRow { row: row_no });
        } else {
            let key: Vec<Cow<'_, str>> = row.iter().map(CellValue::as_text).collect();
            match seen.get(&key) {
                Some(&first) => issues.push(QualityIssue::DuplicateRow { row: row_no, first }),
                None => {
                    seen.insert(key, row_no);
                }
            }
        }

        let mut cells = Vec::with_capacity(sources.len());
        for (col, source) in sources.iter().enumerate() {
            let Some(source) = *source else {
                cells.push(CellValue::Null);
                continue;
            };
            let raw = row.get(source).unwrap_or(&CellValue::Null);
            let outcome = transform(raw, template.field_kinds()[col], template.rules());
            if outcome.unparseable_date {
                issues.push(QualityIssue::UnparseableDate {
                    row: row_no,
                    column: template.columns()[col].clone(),
                    value: raw.as_text().into_owned(),
                });
            }
            if !outcome.value.is_empty() {
                filled[col] += 1;
            }
            cells.push(outcome.value);
        }

        for &(at, column) in &required {
            if sources[at].is_some() && cells[at].is_empty() && !row.iter().all(CellValue::is_empty) {
                issues.push(QualityIssue::MissingRequired {
                    row: row_no,
                    column: column.to_string(),
                });
            }
        }
        output.push_row(cells);
    }

    let row_count = table.row_count();
    let details = mapping
        .bindings()
        .iter()
        .enumerate()
        .filter_map(|(col, b)| {
            let source = b.source.as_deref()?;
            Some(ColumnDetail::new(&b.target, source, filled[col], row_count))
        })
        .collect();

    for issue in &issues {
        debug!(%issue, "quality issue");
    }
    if !issues.is_empty() {
        warn!(template = template.id(), issues = issues.len(), "data quality issues found");
    }
    info!(
        template = template.id(),
        rows = row_count,
        resolved = mapping.resolved_count(),
        total = mapping.total(),
        "table ingested"
    );

    let report = MappingReport::new(template, &mapping, row_count, details, issues);
    (output, report)
}
