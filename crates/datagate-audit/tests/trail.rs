//! Audit trail behavior: disabled mode, JSONL appends, rotation,
//! batching, and the CSV table sink.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tempfile::TempDir;

use datagate_audit::{
    AssessmentOutcome, AuditConfig, AuditFormat, AuditLogger, DataInfo, ExecutionContext,
    FailedCheck, PerformanceMetrics,
};
use datagate_model::{Dimension, GateAction};

fn outcome(action: GateAction) -> AssessmentOutcome {
    AssessmentOutcome {
        overall_score: 88.0,
        passed: action == GateAction::Allowed,
        dimension_scores: BTreeMap::from([
            (Dimension::Validity, 20.0),
            (Dimension::Completeness, 18.0),
        ]),
        standard_id: "orders".to_string(),
        standard_version: "1.0".to_string(),
        standard_path: "standards/orders.toml".to_string(),
        standard_checksum: "deadbeef".to_string(),
        action,
    }
}

fn context() -> ExecutionContext {
    ExecutionContext {
        function_name: "load_orders".to_string(),
        module_path: "pipeline::orders".to_string(),
        environment: "test".to_string(),
    }
}

fn data_info() -> DataInfo {
    DataInfo {
        description: "orders batch".to_string(),
        checksum: None,
        row_count: 250,
        column_count: 6,
        columns: vec!["order_id".to_string(), "amount".to_string()],
        samples: BTreeMap::new(),
    }
}

fn config(dir: &TempDir, format: AuditFormat) -> AuditConfig {
    AuditConfig {
        enabled: true,
        log_dir: dir.path().to_path_buf(),
        file_prefix: "trail".to_string(),
        format,
        max_log_size_bytes: 10 * 1024 * 1024,
        batch_size: 0,
        include_data_samples: false,
    }
}

fn line_count(path: &Path) -> usize {
    fs::read_to_string(path).unwrap().lines().count()
}

#[test]
fn disabled_trail_writes_nothing_and_returns_none() {
    let dir = TempDir::new().unwrap();
    let logger = AuditLogger::new(AuditConfig {
        enabled: false,
        ..config(&dir, AuditFormat::Jsonl)
    });

    let record = logger
        .log_assessment(&outcome(GateAction::Allowed), &context(), &data_info(), None, &[])
        .expect("disabled trail never errors");
    assert!(record.is_none());
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn jsonl_appends_one_object_per_line() {
    let dir = TempDir::new().unwrap();
    let logger = AuditLogger::new(config(&dir, AuditFormat::Jsonl));

    for _ in 0..3 {
        logger
            .log_assessment(&outcome(GateAction::Allowed), &context(), &data_info(), None, &[])
            .expect("log")
            .expect("record returned");
    }

    let path = dir.path().join("trail.jsonl");
    assert_eq!(line_count(&path), 3);
    for line in fs::read_to_string(&path).unwrap().lines() {
        let value: serde_json::Value = serde_json::from_str(line).expect("valid json per line");
        assert_eq!(value["assessment_results"]["overall_score"], 88.0);
        assert_eq!(value["action_taken"], "ALLOWED");
    }
}

#[test]
fn oversized_log_rotates_to_timestamped_file() {
    let dir = TempDir::new().unwrap();
    let logger = AuditLogger::new(AuditConfig {
        max_log_size_bytes: 64,
        ..config(&dir, AuditFormat::Jsonl)
    });

    logger
        .log_assessment(&outcome(GateAction::Allowed), &context(), &data_info(), None, &[])
        .expect("first write");
    // The first record exceeds 64 bytes, so the second append rotates.
    logger
        .log_assessment(&outcome(GateAction::Blocked), &context(), &data_info(), None, &[])
        .expect("second write");

    let names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert!(names.contains(&"trail.jsonl".to_string()));
    let rotated: Vec<&String> = names
        .iter()
        .filter(|n| n.starts_with("trail.") && n.ends_with(".jsonl") && **n != "trail.jsonl")
        .collect();
    assert_eq!(rotated.len(), 1, "names: {names:?}");
    assert_eq!(line_count(&dir.path().join("trail.jsonl")), 1);
}

#[test]
fn rotations_in_the_same_second_keep_every_file() {
    let dir = TempDir::new().unwrap();
    let logger = AuditLogger::new(AuditConfig {
        max_log_size_bytes: 64,
        ..config(&dir, AuditFormat::Jsonl)
    });

    // Every record exceeds 64 bytes, so each append after the first
    // rotates; back-to-back writes share a second-granular timestamp.
    for _ in 0..4 {
        logger
            .log_assessment(&outcome(GateAction::Allowed), &context(), &data_info(), None, &[])
            .expect("write");
    }

    let rotated: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with("trail.") && n.ends_with(".jsonl") && *n != "trail.jsonl")
        .collect();
    assert_eq!(rotated.len(), 3, "rotated: {rotated:?}");
    for name in &rotated {
        assert_eq!(line_count(&dir.path().join(name)), 1);
    }
}

#[test]
fn batching_holds_records_until_the_batch_fills() {
    let dir = TempDir::new().unwrap();
    let logger = AuditLogger::new(AuditConfig {
        batch_size: 3,
        ..config(&dir, AuditFormat::Jsonl)
    });
    let path = dir.path().join("trail.jsonl");

    for _ in 0..2 {
        logger
            .log_assessment(&outcome(GateAction::Allowed), &context(), &data_info(), None, &[])
            .expect("log");
    }
    assert_eq!(logger.pending(), 2);
    assert!(!path.exists());

    logger
        .log_assessment(&outcome(GateAction::Allowed), &context(), &data_info(), None, &[])
        .expect("log");
    assert_eq!(logger.pending(), 0);
    assert_eq!(line_count(&path), 3);
}

#[test]
fn flush_drains_a_partial_batch() {
    let dir = TempDir::new().unwrap();
    let logger = AuditLogger::new(AuditConfig {
        batch_size: 10,
        ..config(&dir, AuditFormat::Jsonl)
    });

    logger
        .log_assessment(&outcome(GateAction::Warned), &context(), &data_info(), None, &[])
        .expect("log");
    assert_eq!(logger.pending(), 1);
    logger.flush().expect("flush");
    assert_eq!(logger.pending(), 0);
    assert_eq!(line_count(&dir.path().join("trail.jsonl")), 1);
}

#[test]
fn csv_sink_writes_three_aligned_tables() {
    let dir = TempDir::new().unwrap();
    let logger = AuditLogger::new(config(&dir, AuditFormat::Csv));

    let failed = vec![FailedCheck {
        rule: "required_fields".to_string(),
        dimension: Dimension::Completeness,
        score: 11.0,
        weight: 20.0,
        narrative: "email sparsely populated".to_string(),
    }];
    let record = logger
        .log_assessment(
            &outcome(GateAction::Blocked),
            &context(),
            &data_info(),
            Some(PerformanceMetrics::derive(100, 250, 12)),
            &failed,
        )
        .expect("log")
        .expect("record");

    let main = fs::read_to_string(dir.path().join("trail_audit.csv")).unwrap();
    let mut main_lines = main.lines();
    assert!(main_lines.next().unwrap().starts_with("assessment_id,timestamp"));
    let row = main_lines.next().unwrap();
    assert!(row.contains(&record.assessment_metadata.assessment_id));
    assert!(row.contains("BLOCKED"));

    let dimensions = fs::read_to_string(dir.path().join("trail_dimensions.csv")).unwrap();
    // Header plus one row per scored dimension.
    assert_eq!(dimensions.lines().count(), 3);

    let failed_csv = fs::read_to_string(dir.path().join("trail_failed_checks.csv")).unwrap();
    assert_eq!(failed_csv.lines().count(), 2);
    assert!(failed_csv.contains("required_fields"));

    // Header written once: a second record appends rows only.
    logger
        .log_assessment(&outcome(GateAction::Allowed), &context(), &data_info(), None, &[])
        .expect("log");
    let main_again = fs::read_to_string(dir.path().join("trail_audit.csv")).unwrap();
    assert_eq!(
        main_again.matches("assessment_id,timestamp").count(),
        1
    );
    assert_eq!(main_again.lines().count(), 3);
}

#[test]
fn fingerprint_falls_back_to_description_hash() {
    let dir = TempDir::new().unwrap();
    let logger = AuditLogger::new(config(&dir, AuditFormat::Jsonl));
    let record = logger
        .log_assessment(&outcome(GateAction::Allowed), &context(), &data_info(), None, &[])
        .unwrap()
        .unwrap();
    assert_eq!(record.data_fingerprint.checksum.len(), 64);

    let explicit = DataInfo {
        checksum: Some("abc123".to_string()),
        ..data_info()
    };
    let record = logger
        .log_assessment(&outcome(GateAction::Allowed), &context(), &explicit, None, &[])
        .unwrap()
        .unwrap();
    assert_eq!(record.data_fingerprint.checksum, "abc123");
}
