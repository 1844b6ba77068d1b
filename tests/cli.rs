mod common;

use std::fs;

use assert_cmd::Command;
use common::{TestWorkspace, feedback_csv, parse, spawn_stub};
use predicates::{prelude::PredicateBooleanExt, str::contains};

fn bin() -> Command {
    let mut command = Command::cargo_bin("feedback-ingest").expect("binary exists");
    command
        .env_remove("FEEDBACK_API_URL")
        .env_remove("FEEDBACK_API_TOKEN")
        .env_remove("FEEDBACK_INGEST_CONFIG");
    command
}

#[test]
fn validate_reports_detected_column() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("reviews.csv", &feedback_csv("Comments", 120, 5));
    bin()
        .args(["validate", "-i", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("column: Comments"))
        .stdout(contains("valid rows: 120 of 125"));
}

#[test]
fn validate_json_includes_headers_for_override_selection() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("reviews.csv", &feedback_csv("Review", 100, 0));
    let assert = bin()
        .args(["validate", "-i", input.to_str().unwrap(), "--json"])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("stdout");
    let summary: serde_json::Value = serde_json::from_str(&stdout).expect("json summary");
    assert_eq!(summary["column"], "Review");
    assert_eq!(summary["headers"], serde_json::json!(["id", "Review", "rating"]));
    assert_eq!(summary["valid_rows"], 100);
}

#[test]
fn validate_without_feedback_column_fails_with_found_columns() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("scores.csv", "id,date,score\n1,2024-01-01,4\n");
    bin()
        .args(["validate", "-i", input.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(contains("Found columns: id, date, score"));
}

#[test]
fn validate_reports_malformed_row_number() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("broken.csv", "a,b,review\n1,2,ok\n1,2\n");
    bin()
        .args(["validate", "-i", input.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(contains("Row 3").and(contains("too few fields")));
}

#[test]
fn filter_writes_only_rows_with_feedback() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("reviews.csv", &feedback_csv("Feedback", 130, 20));
    let output = workspace.path().join("filtered.csv");
    bin()
        .args([
            "filter",
            "-i",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ])
        .assert()
        .success();
    let filtered = parse(&fs::read_to_string(&output).expect("read filtered"));
    assert_eq!(filtered.row_count(), 130);
    assert_eq!(filtered.headers(), ["id", "Feedback", "rating"]);
}

#[test]
fn filter_reads_stdin_and_honors_delimiter() {
    let text = feedback_csv("review", 100, 2).replace(',', ";");
    let assert = bin()
        .args(["filter", "-i", "-", "--delimiter", ";"])
        .write_stdin(text)
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("stdout");
    assert_eq!(stdout.lines().count(), 101);
    assert!(stdout.starts_with("id;review;rating\n"));
}

#[test]
fn filter_rejects_unknown_override() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("reviews.csv", &feedback_csv("Review", 100, 0));
    bin()
        .args(["filter", "-i", input.to_str().unwrap(), "--column", "Body"])
        .assert()
        .failure()
        .stderr(contains("Column 'Body' is not present"));
}

#[test]
fn columns_marks_feedback_candidates() {
    let workspace = TestWorkspace::new();
    let input = workspace.write(
        "reviews.csv",
        "id,Review,Comments\n1,good,\n2,bad,meh\n",
    );
    bin()
        .args(["columns", "-i", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("Review    default"))
        .stdout(contains("Comments  alias"));
}

#[test]
fn upload_dry_run_writes_payload() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("reviews.csv", &feedback_csv("text", 100, 7));
    let output = workspace.path().join("payload.csv");
    bin()
        .args([
            "upload",
            "-i",
            input.to_str().unwrap(),
            "--dry-run",
            "-o",
            output.to_str().unwrap(),
        ])
        .assert()
        .success();
    let payload = parse(&fs::read_to_string(&output).expect("read payload"));
    assert_eq!(payload.row_count(), 100);
}

#[test]
fn upload_refuses_non_csv_files() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("reviews.txt", &feedback_csv("Review", 100, 0));
    bin()
        .args(["upload", "-i", input.to_str().unwrap(), "--dry-run"])
        .assert()
        .failure()
        .stderr(contains("Please upload a CSV file"));
}

#[test]
fn upload_refuses_binary_files_before_parsing() {
    let workspace = TestWorkspace::new();
    let input = workspace.write_bytes("report.xlsx", b"PK\x03\x04\xff\xfe\x00\x14\x00\x06\x00");
    bin()
        .args(["upload", "-i", input.to_str().unwrap(), "--dry-run"])
        .assert()
        .failure()
        .stderr(contains("Please upload a CSV file"))
        .stderr(contains("CSV parsing error").not());
}

#[test]
fn upload_submits_and_prints_report() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("reviews.csv", &feedback_csv("Review", 110, 4));
    let (url, handle) = spawn_stub(
        200,
        r#"{"results": {"topic_sentiment": [{"topic_label": "Support", "positive_count": 70, "negative_count": 40, "total_documents": 110, "topic_keywords": ["agent"]}], "visualizations": ["sunburst.html"]}}"#,
    );
    bin()
        .args([
            "upload",
            "-i",
            input.to_str().unwrap(),
            "--api-url",
            &url,
            "--token",
            "t0k3n",
        ])
        .assert()
        .success()
        .stdout(contains("sentiment: 70 positive, 40 negative"))
        .stdout(contains("Support"))
        .stdout(contains("visualization: /static/sunburst.html"));
    let raw = handle.join().expect("stub thread");
    assert!(raw.to_ascii_lowercase().contains("authorization: bearer t0k3n"));
    assert!(raw.contains("name=\"columnName\"\r\n\r\nReview"));
}

#[test]
fn upload_surfaces_service_detail() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("reviews.csv", &feedback_csv("Review", 100, 0));
    let (url, handle) = spawn_stub(500, r#"{"detail": "Topic model unavailable"}"#);
    bin()
        .args(["upload", "-i", input.to_str().unwrap(), "--api-url", &url])
        .assert()
        .failure()
        .stderr(contains("Topic model unavailable"));
    handle.join().expect("stub thread");
}

#[test]
fn config_file_changes_threshold() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("reviews.csv", &feedback_csv("Review", 20, 0));
    let config = workspace.write("config.yaml", "ingest:\n  min_valid_rows: 20\n");
    bin()
        .args(["validate", "-i", input.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(contains("only 20 valid reviews"));
    bin()
        .args([
            "validate",
            "-i",
            input.to_str().unwrap(),
            "--config",
            config.to_str().unwrap(),
        ])
        .assert()
        .success();
}
