//! CSV output writer.

use std::fs::File;
use std::io::Write;

use crate::error::Result;
use crate::ingest::MappedTable;

/// Field delimiter used unless another is asked for.
pub const DEFAULT_DELIMITER: u8 = b',';

/// Writes a mapped table to CSV.
///
/// # Format
/// - Header: the template's target columns, in order
/// - One record per row; empty cells are empty fields
/// - Numbers with no fractional part are written without a decimal point
/// - Encoding: UTF-8
pub fn write_csv(table: &MappedTable, output_path: &str, delimiter: u8) -> Result<()> {
    let file = File::create(output_path)?;
    write_records(table, file, delimiter)
}

/// Converts a mapped table to a CSV string.
///
/// Same format as [`write_csv`], but returns a String instead of writing to file.
pub fn to_csv(table: &MappedTable, delimiter: u8) -> Result<String> {
    let mut buf = Vec::new();
    write_records(table, &mut buf, delimiter)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn write_records<W: Write>(table: &MappedTable, out: W, delimiter: u8) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(out);

    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(|cell| cell.as_text().into_owned()))?;
    }

    writer.flush()?;
    Ok(())
}
