//! In-memory tabular data.
//!
//! [`SourceTable`] is what a loader hands to the ingestion pipeline: an ordered
//! header list plus rows of raw [`CellValue`]s. [`MappedTable`] is what comes
//! out: rows laid out in template column order.
//!
//! With the `csv-output` feature, [`SourceTable::from_csv_path`] loads a CSV
//! file, honoring a header row offset.

use std::borrow::Cow;
use std::fmt;
#[cfg(feature = "csv-output")]
use std::path::Path;

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

#[cfg(feature = "csv-output")]
use crate::error::Result;

/// Prefix given to blank source headers by the loader.
pub const UNNAMED_PREFIX: &str = "Unnamed";

/// One raw cell.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Null,
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Returns `true` for null and whitespace-only text.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Number(_) => false,
            CellValue::Text(s) => s.trim().is_empty(),
        }
    }

    /// Text form of the value; whole numbers print without a fraction.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            CellValue::Null => Cow::Borrowed(""),
            CellValue::Text(s) => Cow::Borrowed(s),
            CellValue::Number(n) => Cow::Owned(format_number(*n)),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CellValue::Null, Into::into)
    }
}

/// Trims a header and collapses inner whitespace runs to one space.
pub fn normalize_header(header: &str) -> String {
    header.split_whitespace().collect::<Vec<_>>().join(" ")
}

// =========================================================================
// SourceTable
// =========================================================================

/// One data row, a cell per source header.
pub type SourceRow = Vec<CellValue>;

/// Loaded input rows with their headers.
///
/// Every row has exactly one cell per header; short rows are padded with
/// [`CellValue::Null`] and long rows truncated.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "RawSourceTable")]
pub struct SourceTable {
    headers: Vec<String>,
    rows: Vec<SourceRow>,
}

/// Wire shape of a table before headers are normalized and rows fitted.
#[derive(Deserialize)]
struct RawSourceTable {
    headers: Vec<String>,
    #[serde(default)]
    rows: Vec<SourceRow>,
}

impl From<RawSourceTable> for SourceTable {
    fn from(raw: RawSourceTable) -> Self {
        let mut table = Self::new(raw.headers);
        for row in raw.rows {
            table.push_row(row);
        }
        table
    }
}

impl SourceTable {
    /// Creates an empty table. Headers are whitespace-normalized and blank
    /// headers become `Unnamed: {i}`.
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let headers = headers
            .into_iter()
            .enumerate()
            .map(|(i, h)| {
                let h = normalize_header(h.as_ref());
                if h.is_empty() {
                    format!("{UNNAMED_PREFIX}: {i}")
                } else {
                    h
                }
            })
            .collect();
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Builder method to append a row.
    #[must_use]
    pub fn with_row<I, V>(mut self, cells: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        self.push_row(cells.into_iter().map(Into::into).collect());
        self
    }

    /// Appends a row, fitting it to the header count.
    pub fn push_row(&mut self, mut cells: SourceRow) {
        cells.resize(self.headers.len(), CellValue::Null);
        self.rows.push(cells);
    }

    /// Header names in source order.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Data rows.
    pub fn rows(&self) -> &[SourceRow] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Position of the first header with this exact name.
    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    /// Cell at `(row, header)`.
    pub fn get(&self, row: usize, header: &str) -> Option<&CellValue> {
        let col = self.column_index(header)?;
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// One row as an ordered header to value view.
    pub fn record(&self, row: usize) -> Option<impl Iterator<Item = (&str, &CellValue)>> {
        self.rows
            .get(row)
            .map(|cells| self.headers.iter().map(String::as_str).zip(cells))
    }

    /// Replaces the headers with the first data row and drops that row.
    ///
    /// A non-empty first-row cell names its column unless the existing header
    /// is an `Unnamed` placeholder, which becomes `Column_{i}` (1-based).
    /// Tables without rows are left unchanged.
    pub fn promote_first_row(&mut self) {
        if self.rows.is_empty() {
            return;
        }
        let first = self.rows.remove(0);
        for (i, (header, cell)) in self.headers.iter_mut().zip(first).enumerate() {
            if header.starts_with(UNNAMED_PREFIX) {
                *header = format!("Column_{}", i + 1);
            } else if !cell.is_empty() {
                *header = normalize_header(&cell.as_text());
            }
        }
    }
}

#[cfg(feature = "csv-output")]
impl SourceTable {
    /// Reads CSV text. Records before `header_row` are skipped, the record at
    /// `header_row` supplies the headers, and everything after is data.
    ///
    /// Empty cells load as [`CellValue::Null`]; everything else as text.
    pub fn from_csv_reader<R: std::io::Read>(reader: R, header_row: usize) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut records = csv_reader.records().skip(header_row);
        let header = match records.next() {
            Some(record) => record?,
            None => return Ok(Self::default()),
        };
        let mut table = Self::new(header.iter());

        for record in records {
            let record = record?;
            let cells = record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        CellValue::Null
                    } else {
                        CellValue::Text(field.to_string())
                    }
                })
                .collect();
            table.push_row(cells);
        }

        Ok(table)
    }

    /// Reads a CSV file.
    pub fn from_csv_path(path: impl AsRef<Path>, header_row: usize) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(file, header_row)
    }
}

// =========================================================================
// MappedTable
// =========================================================================

/// Output rows in template column order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MappedTable {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl MappedTable {
    /// Creates an empty table with the given columns.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Appends a row; it must have one cell per column.
    pub(crate) fn push_row(&mut self, row: Vec<CellValue>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Cell at `(row, column)`.
    pub fn get(&self, row: usize, column: &str) -> Option<&CellValue> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Rows as serializable column-ordered objects.
    pub fn records(&self) -> impl Iterator<Item = MappedRecord<'_>> {
        self.rows.iter().map(|cells| MappedRecord {
            columns: &self.columns,
            cells,
        })
    }
}

/// One output row, serialized as an object whose keys follow column order.
#[derive(Debug, Clone, Copy)]
pub struct MappedRecord<'a> {
    columns: &'a [String],
    cells: &'a [CellValue],
}

impl Serialize for MappedRecord<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, cell) in self.columns.iter().zip(self.cells) {
            map.serialize_entry(column, cell)?;
        }
        map.end()
    }
}

impl Serialize for MappedTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.records())
    }
}
