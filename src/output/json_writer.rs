//! JSON output writer.

use std::fs::File;
use std::io::Write;

use serde::Serialize;

use crate::error::Result;

/// Writes any serializable value to a pretty-printed JSON file.
///
/// Mapped tables serialize as an array of objects whose keys follow the
/// template column order:
///
/// ```json
/// [
///   {"Reference": "A1", "Surname": "Smith"},
///   {"Reference": "A2", "Surname": "Jones"}
/// ]
/// ```
pub fn write_json<T: Serialize + ?Sized>(value: &T, output_path: &str) -> Result<()> {
    let json = to_json(value)?;
    let mut file = File::create(output_path)?;
    file.write_all(json.as_bytes())?;
    Ok(())
}

/// Converts a value to a pretty-printed JSON string.
///
/// Same format as [`write_json`], but returns a String instead of writing to file.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
