//! JSON Lines (JSONL) output writer.
//!
//! One compact JSON object per line, suited to streaming consumers and
//! line-oriented tools.

use std::fs::File;
use std::io::{BufWriter, Write};

use serde::Serialize;

use crate::error::Result;

/// Writes each item as one JSON line.
///
/// ```jsonl
/// {"Reference":"A1","Surname":"Smith"}
/// {"Reference":"A2","Surname":"Jones"}
/// ```
pub fn write_jsonl<I>(items: I, output_path: &str) -> Result<()>
where
    I: IntoIterator,
    I::Item: Serialize,
{
    let file = File::create(output_path)?;
    let mut writer = BufWriter::new(file);
    for item in items {
        serde_json::to_writer(&mut writer, &item)?;
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}

/// Converts items to a JSONL string.
///
/// Same format as [`write_jsonl`], but returns a String instead of writing to file.
pub fn to_jsonl<I>(items: I) -> Result<String>
where
    I: IntoIterator,
    I::Item: Serialize,
{
    let mut out = String::new();
    for item in items {
        out.push_str(&serde_json::to_string(&item)?);
        out.push('\n');
    }
    Ok(out)
}
