//! End-to-end CLI tests for mailsift.
//!
//! These tests run the actual binary with various arguments and check its
//! output.
//!
//! # Test Categories
//!
//! - **Message commands**: analyze, patterns, entities
//! - **Tabular commands**: ingest, route, templates
//! - **Error handling**: Proper error messages for bad input
//!
//! # Running Tests
//!
//! ```bash
//! cargo test --test cli_e2e
//! ```

#![cfg(feature = "cli")]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::{TempDir, tempdir};

// ============================================================================
// Test Fixtures
// ============================================================================

/// Creates a temporary directory with message files, a config directory and
/// a CSV input.
fn setup_fixtures() -> TempDir {
    let dir = tempdir().expect("Failed to create temp dir");

    let inbox = dir.path().join("inbox");
    fs::create_dir(&inbox).unwrap();

    let single = r#"{
  "subject": "Invoice 42",
  "sender": "billing@vendor.com",
  "body_text": "Please pay $1,200 by 2024-03-01. Questions: billing@vendor.com",
  "attachments": [{"filename": "invoice_42.pdf", "size_bytes": 48000, "content_type": "application/pdf"}]
}"#;
    fs::write(inbox.join("invoice.json"), single).unwrap();

    let many = r#"[
  {"subject": "Team meeting", "sender": "ann@example.com", "body_text": "The meeting moved to 3pm."},
  {"subject": "Lunch?", "sender": "ann@example.com", "body_text": "Are you free tomorrow"}
]"#;
    fs::write(inbox.join("thread.json"), many).unwrap();

    let config = dir.path().join("config");
    fs::create_dir(&config).unwrap();
    let templates = r#"{
  "templates": {
    "standard": {
      "name": "Standard Import",
      "columns": ["Reference", "Surname", "Dob"],
      "required_columns": ["Reference"],
      "output_suffix": "_mapped",
      "data_transformations": {"date_format": "DD/MM/YYYY", "name_case": "title"}
    },
    "special": {"name": "Special", "columns": ["Reference"]}
  },
  "column_mappings": {
    "standard": {"aliases": {"Surname": ["last_name"], "Dob": ["date_of_birth"]}}
  }
}"#;
    fs::write(config.join("templates_config.json"), templates).unwrap();
    let routing = r#"{
  "default_template": "standard",
  "specific_file_overrides": {"overrides": {"data/special.csv": "special"}}
}"#;
    fs::write(config.join("file_mappings.json"), routing).unwrap();

    fs::write(
        dir.path().join("people.csv"),
        "Reference,last_name,date_of_birth\nR1,smith,2001-02-03\nR2,jones,\n",
    )
    .unwrap();

    dir
}

fn mailsift() -> Command {
    Command::cargo_bin("mailsift").unwrap()
}

// ============================================================================
// Message commands
// ============================================================================

#[test]
fn test_analyze_single_file() {
    let dir = setup_fixtures();

    mailsift()
        .arg("analyze")
        .arg(dir.path().join("inbox/invoice.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"invoice\""))
        .stdout(predicate::str::contains("$1,200"))
        .stderr(predicate::str::contains("Analyzed 1 messages"));
}

#[test]
fn test_analyze_jsonl_to_file() {
    let dir = setup_fixtures();
    let out = dir.path().join("analyses.jsonl");

    mailsift()
        .arg("analyze")
        .arg(dir.path().join("inbox/invoice.json"))
        .arg(dir.path().join("inbox/thread.json"))
        .arg("--jsonl")
        .arg("-o")
        .arg(&out)
        .assert()
        .success();

    let content = fs::read_to_string(&out).unwrap();
    assert_eq!(content.lines().count(), 3);
    for line in content.lines() {
        let value: serde_json::Value = serde_json::from_str(line).unwrap();
        assert!(value["categories"].is_array());
    }
}

#[test]
fn test_analyze_skips_unreadable_file() {
    let dir = setup_fixtures();
    fs::write(dir.path().join("broken.json"), "{ nope").unwrap();

    mailsift()
        .arg("analyze")
        .arg(dir.path().join("broken.json"))
        .arg(dir.path().join("inbox/invoice.json"))
        .assert()
        .success()
        .stderr(predicate::str::contains("broken.json"))
        .stderr(predicate::str::contains("1 failed"));
}

#[test]
fn test_patterns_over_folder() {
    let dir = setup_fixtures();

    let output = mailsift()
        .arg("patterns")
        .arg(dir.path().join("inbox"))
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["total_messages"], 3);
    assert_eq!(report["senders"]["ann@example.com"], 2);
    assert_eq!(report["categories"]["meeting"]["count"], 1);
}

#[test]
fn test_entities_command() {
    mailsift()
        .args(["entities", "Contact john@example.com or call 555-123-4567."])
        .assert()
        .success()
        .stdout(predicate::str::contains("john@example.com"))
        .stdout(predicate::str::contains("555-123-4567"));
}

#[test]
fn test_entities_show_patterns() {
    mailsift()
        .args(["entities", "nothing here", "--show-patterns"])
        .assert()
        .success()
        .stderr(predicate::str::contains("emails"));
}

// ============================================================================
// Tabular commands
// ============================================================================

#[test]
fn test_ingest_with_explicit_output() {
    let dir = setup_fixtures();
    let out = dir.path().join("out/people.csv");
    let report = dir.path().join("report.json");

    mailsift()
        .arg("ingest")
        .arg(dir.path().join("people.csv"))
        .arg("--config")
        .arg(dir.path().join("config"))
        .arg("-o")
        .arg(&out)
        .arg("--report")
        .arg(&report)
        .assert()
        .success()
        .stdout(predicate::str::contains("Standard Import"))
        .stdout(predicate::str::contains("COLUMN MAPPINGS"));

    let csv = fs::read_to_string(&out).unwrap();
    assert_eq!(csv, "Reference,Surname,Dob\nR1,Smith,03/02/2001\nR2,Jones,\n");

    let report: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(report["template_id"], "standard");
}

#[test]
fn test_ingest_jsonl_format() {
    let dir = setup_fixtures();
    let out = dir.path().join("people.jsonl");

    mailsift()
        .arg("ingest")
        .arg(dir.path().join("people.csv"))
        .arg("-c")
        .arg(dir.path().join("config"))
        .arg("-o")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("JSONL"));

    let content = fs::read_to_string(&out).unwrap();
    assert_eq!(content.lines().count(), 2);
    assert!(content.starts_with("{\"Reference\":\"R1\""));
}

#[test]
fn test_ingest_default_output_location() {
    let dir = setup_fixtures();

    mailsift()
        .current_dir(dir.path())
        .args(["ingest", "people.csv", "-c", "config"])
        .assert()
        .success();

    assert!(dir.path().join("output/standard/people_mapped.csv").exists());
}

#[test]
fn test_ingest_unknown_template() {
    let dir = setup_fixtures();

    mailsift()
        .arg("ingest")
        .arg(dir.path().join("people.csv"))
        .arg("-c")
        .arg(dir.path().join("config"))
        .args(["-t", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown template 'missing'"));
}

#[test]
fn test_batch_over_directory() {
    let dir = setup_fixtures();
    let data = dir.path().join("data");
    fs::create_dir(&data).unwrap();
    fs::copy(dir.path().join("people.csv"), data.join("people.csv")).unwrap();
    fs::write(data.join("special.csv"), "Reference\nS1\n").unwrap();

    mailsift()
        .current_dir(dir.path())
        .args(["batch", "data", "missing.csv", "-c", "config", "--report", "batch.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("missing.csv"))
        .stdout(predicate::str::contains("2 ingested, 0 unrouted, 1 failed"));

    assert!(dir.path().join("output/standard/people_mapped.csv").exists());
    assert_eq!(
        fs::read_to_string(dir.path().join("output/special/special.csv")).unwrap(),
        "Reference\nS1\n"
    );

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("batch.json")).unwrap()).unwrap();
    let entries = report["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["status"], "ingested");
    assert_eq!(entries[1]["template_id"], "special");
    assert_eq!(entries[2]["status"], "failed");
}

#[test]
fn test_batch_stops_on_error_when_configured() {
    let dir = setup_fixtures();
    fs::write(
        dir.path().join("config/file_mappings.json"),
        r#"{"default_template": "standard", "processing_options": {"continue_on_error": false}}"#,
    )
    .unwrap();

    mailsift()
        .current_dir(dir.path())
        .args(["batch", "missing.csv", "people.csv", "-c", "config"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("❌ Error"));

    assert!(!dir.path().join("output/standard/people_mapped.csv").exists());
}

#[test]
fn test_route_override_and_default() {
    let dir = setup_fixtures();

    mailsift()
        .current_dir(dir.path())
        .args(["route", "data/special.csv", "data/other.csv", "-c", "config"])
        .assert()
        .success()
        .stdout(predicate::str::contains("data/special.csv → special"))
        .stdout(predicate::str::contains("data/other.csv → standard"));
}

#[test]
fn test_templates_lists_catalogue() {
    let dir = setup_fixtures();

    mailsift()
        .arg("templates")
        .arg("-c")
        .arg(dir.path().join("config"))
        .assert()
        .success()
        .stdout(predicate::str::contains("2 templates"))
        .stdout(predicate::str::contains("Standard Import"));
}

// ============================================================================
// Error handling
// ============================================================================

#[test]
fn test_invalid_config_fails() {
    let dir = setup_fixtures();
    fs::write(
        dir.path().join("config/file_mappings.json"),
        r#"{"default_template": "ghost"}"#,
    )
    .unwrap();

    mailsift()
        .arg("templates")
        .arg("-c")
        .arg(dir.path().join("config"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("❌ Error"))
        .stderr(predicate::str::contains("ghost"));
}

#[test]
fn test_missing_subcommand() {
    mailsift().assert().failure();
}

#[test]
fn test_version() {
    mailsift()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mailsift"));
}
