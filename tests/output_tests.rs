//! Tests for output writers (JSON, JSONL, CSV)

use std::fs;

use mailsift::analysis::{MessageAnalyzer, aggregate};
use mailsift::config::{RoutingCatalogue, TemplateCatalogue, TemplateConfig};
use mailsift::format::{OutputFormat, to_format_string, write_table};
use mailsift::ingest::{Catalogue, CellValue, MappedTable, SourceTable, ingest_table};
use mailsift::output::{to_json, to_jsonl, write_json, write_jsonl};
use mailsift::{Attachment, MessageContent};
use tempfile::tempdir;

fn sample_table() -> MappedTable {
    let templates = TemplateCatalogue::new().with_template(
        "people",
        TemplateConfig::new("People", ["Reference", "Surname", "Note"]),
    );
    let catalogue = Catalogue::from_documents(&templates, &RoutingCatalogue::new()).unwrap();
    let source = SourceTable::new(["Surname", "Reference", "Note"])
        .with_row([
            CellValue::from("Smith"),
            CellValue::Number(7.0),
            CellValue::from("said \"hi\", left"),
        ])
        .with_row([CellValue::from("Zoë"), CellValue::Null, CellValue::from("line1\nline2")]);
    ingest_table(catalogue.template("people").unwrap(), &source).0
}

// ============================================================================
// JSON Writer Tests
// ============================================================================

mod json_writer_tests {
    use super::*;

    #[test]
    fn test_write_json_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.json");

        write_json(&sample_table(), path.to_str().unwrap()).unwrap();

        let parsed: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let rows = parsed.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["Reference"], 7.0);
        assert_eq!(rows[0]["Surname"], "Smith");
        assert!(rows[1]["Reference"].is_null());
    }

    #[test]
    fn test_json_keeps_column_order() {
        let json = to_json(&sample_table()).unwrap();
        let reference = json.find("\"Reference\"").unwrap();
        let surname = json.find("\"Surname\"").unwrap();
        let note = json.find("\"Note\"").unwrap();
        assert!(reference < surname && surname < note);
    }

    #[test]
    fn test_write_json_analysis_report() {
        let message = MessageContent::new("Report", "See the report")
            .with_sender("a@example.com")
            .with_attachment(Attachment::new("report.pdf", 10, "application/pdf"));
        let analysis = MessageAnalyzer::new().analyze(&message).unwrap();
        let report = aggregate(&[analysis], &["a@example.com"]).unwrap();

        let json = to_json(&report).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed["total_messages"], 1);
        assert_eq!(parsed["senders"]["a@example.com"], 1);
        assert_eq!(parsed["categories"]["report"]["count"], 1);
        assert!(parsed["entities"]["emails"].is_object());
    }
}

// ============================================================================
// JSONL Writer Tests
// ============================================================================

mod jsonl_writer_tests {
    use super::*;

    #[test]
    fn test_write_jsonl_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        let table = sample_table();

        write_jsonl(table.records(), path.to_str().unwrap()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in &lines {
            let row: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(row.is_object());
        }
        assert!(content.ends_with('\n'));
    }

    #[test]
    fn test_jsonl_escapes_newlines() {
        let out = to_jsonl(sample_table().records()).unwrap();
        assert_eq!(out.lines().count(), 2);
        assert!(out.contains("line1\\nline2"));
    }

    #[test]
    fn test_jsonl_empty() {
        let empty: Vec<serde_json::Value> = Vec::new();
        assert_eq!(to_jsonl(&empty).unwrap(), "");
    }
}

// ============================================================================
// CSV Writer Tests
// ============================================================================

#[cfg(feature = "csv-output")]
mod csv_writer_tests {
    use super::*;
    use mailsift::output::{to_csv, write_csv};

    #[test]
    fn test_csv_escapes_quotes_and_commas() {
        let out = to_csv(&sample_table(), b',').unwrap();
        assert!(out.starts_with("Reference,Surname,Note\n"));
        assert!(out.contains("7,Smith,\"said \"\"hi\"\", left\""));
    }

    #[test]
    fn test_csv_multiline_roundtrips_through_reader() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_csv(&sample_table(), path.to_str().unwrap(), b',').unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[1][0], "");
        assert_eq!(&rows[1][1], "Zoë");
        assert_eq!(&rows[1][2], "line1\nline2");
    }

    #[test]
    fn test_csv_custom_delimiter() {
        let out = to_csv(&sample_table(), b';').unwrap();
        assert!(out.starts_with("Reference;Surname;Note\n"));
    }

    #[test]
    fn test_csv_empty_table_has_header() {
        let table = MappedTable::new(vec!["A".into(), "B".into()]);
        assert_eq!(to_csv(&table, b',').unwrap(), "A,B\n");
    }
}

// ============================================================================
// Format dispatch
// ============================================================================

mod format_tests {
    use super::*;

    #[test]
    fn test_write_table_per_format() {
        let dir = tempdir().unwrap();
        let table = sample_table();

        for format in OutputFormat::all() {
            let path = dir.path().join(format!("out.{}", format.extension()));
            let path = path.to_str().unwrap();
            match write_table(&table, path, *format) {
                Ok(()) => assert!(fs::metadata(path).unwrap().len() > 0),
                Err(e) => assert!(!cfg!(feature = "csv-output"), "{format}: {e}"),
            }
        }
    }

    #[test]
    fn test_format_string_json_matches_writer() {
        let table = sample_table();
        assert_eq!(
            to_format_string(&table, OutputFormat::Json).unwrap(),
            to_json(&table).unwrap()
        );
    }
}
