//! Integration test: structured log contract.
//!
//! Validates that:
//! 1. LogEmitter writes one valid JSONL line per event.
//! 2. Trace ids follow `<suite>::<run_id>::<seq>` and increase.
//! 3. The validator catches violations a hand-edited log could contain.
//!
//! Run: cargo test -p gnl-harness --test structured_log_test

use gnl_harness::structured_log::{
    EVENTS, LogEmitter, LogEntry, LogLevel, Outcome, validate_log_file, validate_log_line,
};

#[test]
fn emitter_writes_valid_jsonl() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.jsonl");
    {
        let mut log = LogEmitter::to_file(&path, "gnl", "r42").unwrap();
        let start = log.entry(LogLevel::Info, "suite_start");
        log.emit_entry(start).unwrap();
        let entry = log
            .entry(LogLevel::Warn, "case_result")
            .with_case("Giant line", 42)
            .with_outcome(Outcome::Fail)
            .with_exit_code(1)
            .with_duration_ms(17);
        log.emit_entry(entry).unwrap();
        log.emit_entry(
            LogEntry::new("", LogLevel::Info, "build")
                .with_case("Giant line", 42)
                .with_artifact("a".repeat(64)),
        )
        .unwrap();
        log.flush().unwrap();
    }

    let (count, errors) = validate_log_file(&path).unwrap();
    assert_eq!(count, 3);
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");

    let content = std::fs::read_to_string(&path).unwrap();
    let values: Vec<serde_json::Value> = content
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    let ids: Vec<&str> = values
        .iter()
        .map(|v| v["trace_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["gnl::r42::001", "gnl::r42::002", "gnl::r42::003"]);
    assert!(values.iter().all(|v| v["suite"] == "gnl"));
    assert_eq!(values[1]["exit_code"], 1);
    assert_eq!(values[1]["level"], "warn");
}

#[test]
fn every_known_event_validates() {
    for (i, event) in EVENTS.iter().enumerate() {
        let mut entry = LogEntry::new(format!("gnl::r::{i:03}"), LogLevel::Info, *event);
        if *event == "case_result" {
            entry = entry.with_case("x", 1).with_outcome(Outcome::Pass);
        }
        let line = entry.to_jsonl().unwrap();
        assert!(
            validate_log_line(&line, i + 1).is_ok(),
            "{event} should validate: {line}"
        );
    }
}

#[test]
fn unknown_event_is_rejected() {
    let line = LogEntry::new("gnl::r::001", LogLevel::Info, "case_exploded")
        .to_jsonl()
        .unwrap();
    let errors = validate_log_line(&line, 7).unwrap_err();
    assert_eq!(errors[0].field, "event");
    assert!(errors[0].to_string().starts_with("line 7: field 'event'"));
}

#[test]
fn missing_required_fields_are_listed() {
    let errors = validate_log_line(r#"{"event":"suite_end"}"#, 1).unwrap_err();
    let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
    for field in ["timestamp", "trace_id", "level"] {
        assert!(fields.contains(&field), "{field} not reported");
    }
}

#[test]
fn blank_lines_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sparse.jsonl");
    let line = LogEntry::new("gnl::r::001", LogLevel::Info, "suite_end")
        .to_jsonl()
        .unwrap();
    std::fs::write(&path, format!("\n{line}\n\n")).unwrap();
    let (count, errors) = validate_log_file(&path).unwrap();
    assert_eq!(count, 1);
    assert!(errors.is_empty());
}
