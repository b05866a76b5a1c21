//! Integration tests for the batch file processor.
//! Runs against temp directories, no external services involved.

use std::fs;

use birdsift_parser::{process_directory, ParsedRecord};
use serde_json::{json, Value};
use tempfile::TempDir;

/// One well-formed timeline entry with the given text.
fn tweet_entry(id: &str, text: &str) -> Value {
    json!({
        "content": { "itemContent": { "tweet_results": { "result": {
            "legacy": {
                "id_str": id,
                "full_text": text,
                "created_at": "Mon Jan 01 00:00:00 +0000 2024",
                "favorite_count": 5
            }
        }}}}
    })
}

// =========================================================================
// Happy path
// =========================================================================

#[test]
fn writes_one_parsed_file_per_input_file() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();

    fs::write(
        input.path().join("alpha.json"),
        serde_json::to_string(&json!([tweet_entry("1", "first"), tweet_entry("2", "second")]))
            .unwrap(),
    )
    .unwrap();
    fs::write(
        input.path().join("beta.json"),
        serde_json::to_string(&json!([tweet_entry("3", "third")])).unwrap(),
    )
    .unwrap();

    let summary = process_directory(input.path(), output.path()).unwrap();

    assert_eq!(summary.files_processed, 2);
    assert_eq!(summary.total_records, 3);
    assert!(output.path().join("parsed_alpha.json").is_file());
    assert!(output.path().join("parsed_beta.json").is_file());

    let records: Vec<ParsedRecord> =
        serde_json::from_str(&fs::read_to_string(output.path().join("parsed_alpha.json")).unwrap())
            .unwrap();
    assert_eq!(records.len(), 2);
    match &records[0] {
        ParsedRecord::Tweet(t) => {
            assert_eq!(t.tweet_id.as_deref(), Some("1"));
            assert_eq!(t.date, "2024-01-01 00:00:00");
            assert_eq!(t.likes, 5);
        }
        other => panic!("expected a tweet, got {other:?}"),
    }
}

#[test]
fn processes_files_in_name_order() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();

    for name in ["zeta.json", "alpha.json", "mid.json"] {
        fs::write(input.path().join(name), "[]").unwrap();
    }

    let summary = process_directory(input.path(), output.path()).unwrap();
    let order: Vec<&str> = summary
        .files
        .iter()
        .map(|f| f.file_name.as_str())
        .collect();
    assert_eq!(order, ["alpha.json", "mid.json", "zeta.json"]);
}

#[test]
fn output_keeps_unicode_verbatim_with_two_space_indent() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();

    fs::write(
        input.path().join("uni.json"),
        serde_json::to_string(&json!([tweet_entry("1", "café résumé ☕")])).unwrap(),
    )
    .unwrap();

    process_directory(input.path(), output.path()).unwrap();

    let body = fs::read_to_string(output.path().join("parsed_uni.json")).unwrap();
    assert!(body.contains("café résumé ☕"));
    assert!(!body.contains("\\u"));
    assert!(body.starts_with("[\n  {\n    \"tweet_id\""));
}

#[test]
fn ignores_files_without_json_extension() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();

    fs::write(input.path().join("notes.txt"), "not json").unwrap();
    fs::write(input.path().join("real.json"), "[]").unwrap();

    let summary = process_directory(input.path(), output.path()).unwrap();
    assert_eq!(summary.files_processed, 1);
    assert_eq!(summary.files[0].file_name, "real.json");
}

// =========================================================================
// Failure isolation
// =========================================================================

#[test]
fn bad_file_becomes_error_object_and_counts_zero() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();

    fs::write(input.path().join("broken.json"), "{ not json").unwrap();
    fs::write(
        input.path().join("good.json"),
        serde_json::to_string(&json!([tweet_entry("1", "ok")])).unwrap(),
    )
    .unwrap();

    let summary = process_directory(input.path(), output.path()).unwrap();

    assert_eq!(summary.files_processed, 2);
    assert_eq!(summary.total_records, 1);

    let marker: Value =
        serde_json::from_str(&fs::read_to_string(output.path().join("parsed_broken.json")).unwrap())
            .unwrap();
    let message = marker["error"].as_str().unwrap();
    assert!(message.starts_with("Failed to parse file: "));
}

#[test]
fn non_array_top_level_is_a_file_error() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();

    fs::write(input.path().join("object.json"), "{\"a\": 1}").unwrap();

    let summary = process_directory(input.path(), output.path()).unwrap();
    assert_eq!(summary.total_records, 0);

    let marker: Value =
        serde_json::from_str(&fs::read_to_string(output.path().join("parsed_object.json")).unwrap())
            .unwrap();
    assert_eq!(
        marker["error"],
        "Failed to parse file: expected a JSON array of results"
    );
}

#[test]
fn junk_entries_become_error_records_not_file_errors() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();

    fs::write(
        input.path().join("mixed.json"),
        serde_json::to_string(&json!([tweet_entry("1", "fine"), "junk entry"])).unwrap(),
    )
    .unwrap();

    let summary = process_directory(input.path(), output.path()).unwrap();
    assert_eq!(summary.total_records, 2);

    let records: Vec<ParsedRecord> =
        serde_json::from_str(&fs::read_to_string(output.path().join("parsed_mixed.json")).unwrap())
            .unwrap();
    assert!(matches!(records[0], ParsedRecord::Tweet(_)));
    assert!(matches!(records[1], ParsedRecord::Error { .. }));
}

#[test]
fn missing_input_directory_is_an_error() {
    let output = TempDir::new().unwrap();
    let missing = output.path().join("does-not-exist");
    assert!(process_directory(&missing, output.path()).is_err());
}

#[test]
fn empty_directory_yields_empty_summary() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();

    let summary = process_directory(input.path(), output.path()).unwrap();
    assert_eq!(summary.files_processed, 0);
    assert_eq!(summary.total_records, 0);
    assert!(summary.files.is_empty());
}
