use std::fs;

use polars::prelude::{Column, DataFrame};
use tempfile::TempDir;

use datagate_audit::AuditFormat;
use datagate_guard::{FailureMode, GuardConfig, GuardError, GuardRequest, ProtectionGuard};
use datagate_model::GateAction;
use datagate_standards::Standard;

// One rule per dimension so each carries its full 20-point ceiling and
// scores stay easy to reason about.
const ORDERS_TOML: &str = r#"
[standards]
id = "orders-v1"
version = "1.0.0"
authority = "data-platform"

[requirements]
overall_minimum = 80.0
mandatory_fields = ["order_id", "amount"]
field_presence_threshold = 0.9

[[requirements.rules]]
name = "amount_numeric"
dimension = "validity"
type = "type_consistency"
config = { column = "amount", expected = "numeric" }

[[requirements.rules]]
name = "ship_after_order"
dimension = "consistency"
type = "cross_field"
config = { expression = "ship_date >= order_date" }

[[requirements.rules]]
name = "updated_recent"
dimension = "freshness"
type = "recency"
config = { column = "updated", max_age_days = 30, as_of = "2026-08-30" }

[[requirements.rules]]
name = "amount_in_range"
dimension = "plausibility"
type = "range_check"
config = { column = "amount", min = 0.0, max = 100.0 }
"#;

fn make_df(cols: Vec<(&str, Vec<&str>)>) -> DataFrame {
    let columns: Vec<Column> = cols
        .into_iter()
        .map(|(name, values)| Column::new(name.into(), values))
        .collect();
    DataFrame::new(columns).expect("build frame")
}

fn clean_orders() -> DataFrame {
    make_df(vec![
        ("order_id", vec!["ORD-1", "ORD-2", "ORD-3", "ORD-4"]),
        ("amount", vec!["10.0", "25.5", "50.0", "99.0"]),
        (
            "order_date",
            vec!["2026-08-01", "2026-08-02", "2026-08-03", "2026-08-04"],
        ),
        (
            "ship_date",
            vec!["2026-08-02", "2026-08-03", "2026-08-05", "2026-08-04"],
        ),
        (
            "updated",
            vec!["2026-08-20", "2026-08-21", "2026-08-22", "2026-08-23"],
        ),
    ])
}

/// Completeness 20, validity 20, freshness 20, consistency 0 (every
/// shipment precedes its order), plausibility 5 (one of four amounts in
/// range): overall 65.
fn dirty_orders() -> DataFrame {
    make_df(vec![
        ("order_id", vec!["ORD-1", "ORD-2", "ORD-3", "ORD-4"]),
        ("amount", vec!["50.0", "150.0", "200.0", "300.0"]),
        (
            "order_date",
            vec!["2026-08-10", "2026-08-11", "2026-08-12", "2026-08-13"],
        ),
        (
            "ship_date",
            vec!["2026-08-01", "2026-08-02", "2026-08-03", "2026-08-04"],
        ),
        (
            "updated",
            vec!["2026-08-20", "2026-08-21", "2026-08-22", "2026-08-23"],
        ),
    ])
}

fn guard_config(dir: &TempDir) -> GuardConfig {
    let mut config = GuardConfig::default();
    config.standards_dir = dir.path().join("standards");
    config.audit.enabled = false;
    config
}

fn write_orders_standard(config: &GuardConfig) -> std::path::PathBuf {
    fs::create_dir_all(&config.standards_dir).unwrap();
    let path = config.standards_dir.join("orders.toml");
    fs::write(&path, ORDERS_TOML).unwrap();
    path
}

fn request() -> GuardRequest {
    GuardRequest::new("load_orders")
        .with_data_param("orders")
        .with_module_path("pipeline::ingest")
        .with_standard_name("orders")
}

#[test]
fn clean_data_is_allowed_and_the_call_runs() {
    let dir = TempDir::new().unwrap();
    let config = guard_config(&dir);
    write_orders_standard(&config);

    let guard = ProtectionGuard::new(config);
    let outcome = guard
        .protect(&request(), &clean_orders(), |df| df.height())
        .expect("clean data passes");

    assert_eq!(outcome.value, 4);
    assert_eq!(outcome.decision.decision, GateAction::Allowed);
    assert!(outcome.report.passed);
    assert_eq!(outcome.report.overall_score, 100.0);
}

#[test]
fn raise_mode_blocks_with_score_threshold_and_findings() {
    let dir = TempDir::new().unwrap();
    let config = guard_config(&dir);
    write_orders_standard(&config);

    let guard = ProtectionGuard::new(config);
    let mut ran = false;
    let err = guard
        .protect(&request(), &dirty_orders(), |_| ran = true)
        .expect_err("dirty data blocks");

    assert!(!ran, "blocked call must not run");
    match err {
        GuardError::QualityInsufficient {
            overall_score,
            required_score,
            readiness_level,
            top_findings,
        } => {
            assert_eq!(overall_score, 65.0);
            assert_eq!(required_score, 80.0);
            assert_eq!(readiness_level, "fair");
            assert!(!top_findings.is_empty());
            assert!(top_findings.len() <= 5);
            // Consistency lost the most points, so it leads.
            assert!(top_findings[0].contains("ship_date >= order_date"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn blocking_error_message_carries_both_scores() {
    let dir = TempDir::new().unwrap();
    let config = guard_config(&dir);
    write_orders_standard(&config);

    let guard = ProtectionGuard::new(config);
    let err = guard
        .protect(&request(), &dirty_orders(), |_| ())
        .expect_err("dirty data blocks");

    let message = err.to_string();
    assert!(message.contains("65.0"), "message: {message}");
    assert!(message.contains("80.0"), "message: {message}");
    assert!(message.contains("fair"), "message: {message}");
}

#[test]
fn warn_mode_runs_the_call_and_reports_the_failure() {
    let dir = TempDir::new().unwrap();
    let mut config = guard_config(&dir);
    config.failure_mode = FailureMode::Warn;
    write_orders_standard(&config);

    let guard = ProtectionGuard::new(config);
    let outcome = guard
        .protect(&request(), &dirty_orders(), |df| df.height())
        .expect("warn mode does not block");

    assert_eq!(outcome.value, 4);
    assert_eq!(outcome.decision.decision, GateAction::Warned);
    assert!(!outcome.report.passed);
    assert_eq!(outcome.report.overall_score, 65.0);
}

#[test]
fn minimum_override_beats_the_standard_threshold() {
    let dir = TempDir::new().unwrap();
    let mut config = guard_config(&dir);
    config.minimum_override = Some(10.0);
    write_orders_standard(&config);

    let guard = ProtectionGuard::new(config);
    let outcome = guard
        .protect(&request(), &dirty_orders(), |_| ())
        .expect("override lowers the bar");

    assert_eq!(outcome.decision.decision, GateAction::Allowed);
    assert!(outcome.report.passed);
}

#[test]
fn explicit_standard_path_wins_over_name_resolution() {
    let dir = TempDir::new().unwrap();
    let config = guard_config(&dir);
    let path = dir.path().join("elsewhere.toml");
    fs::write(&path, ORDERS_TOML).unwrap();

    let guard = ProtectionGuard::new(config);
    let req = request().with_standard_path(&path);
    let outcome = guard
        .protect(&req, &clean_orders(), |_| ())
        .expect("explicit path resolves");
    assert!(outcome.report.passed);
    // Nothing was generated under standards_dir.
    assert!(!dir.path().join("standards").exists());
}

#[test]
fn missing_standard_is_generated_persisted_and_reused() {
    let dir = TempDir::new().unwrap();
    let config = guard_config(&dir);
    let standards_dir = config.standards_dir.clone();

    let guard = ProtectionGuard::new(config);
    let req = GuardRequest::new("load_orders").with_data_param("orders");
    let outcome = guard
        .protect(&req, &clean_orders(), |_| ())
        .expect("generated standard accepts its own data");
    assert_eq!(outcome.decision.decision, GateAction::Allowed);

    let generated = standards_dir.join("load_orders_orders_standard.toml");
    assert!(generated.exists());

    let loaded = Standard::from_path(&generated).expect("generated file parses");
    assert_eq!(loaded.standard.standards.id, "load_orders_orders_standard");
    assert_eq!(loaded.standard.metadata.get("generated").map(String::as_str), Some("true"));
    assert!(loaded
        .standard
        .requirements
        .mandatory_fields
        .contains(&"amount".to_string()));

    // Second call reuses the persisted file unchanged.
    let before = fs::read_to_string(&generated).unwrap();
    guard
        .protect(&req, &clean_orders(), |_| ())
        .expect("reuse passes");
    assert_eq!(fs::read_to_string(&generated).unwrap(), before);
}

#[test]
fn audit_record_is_written_for_allowed_and_blocked_paths() {
    let dir = TempDir::new().unwrap();
    let mut config = guard_config(&dir);
    config.audit.enabled = true;
    config.audit.log_dir = dir.path().join("audit");
    config.audit.format = AuditFormat::Jsonl;
    write_orders_standard(&config);

    let guard = ProtectionGuard::new(config);
    guard
        .protect(&request(), &clean_orders(), |_| ())
        .expect("clean data passes");
    let _ = guard.protect(&request(), &dirty_orders(), |_| ());

    let log_path = dir.path().join("audit").join("datagate.jsonl");
    let contents = fs::read_to_string(log_path).expect("audit log exists");
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);

    let allowed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(allowed["action_taken"], "ALLOWED");
    assert_eq!(allowed["standard_applied"]["id"], "orders-v1");
    assert_eq!(allowed["execution_context"]["function_name"], "load_orders");

    let blocked: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
    assert_eq!(blocked["action_taken"], "BLOCKED");
    assert_eq!(blocked["assessment_results"]["overall_score"], 65.0);
}

#[test]
fn missing_standard_file_under_explicit_path_is_generated_too() {
    let dir = TempDir::new().unwrap();
    let config = guard_config(&dir);

    let guard = ProtectionGuard::new(config);
    let path = dir.path().join("nested").join("fresh.toml");
    let req = request().with_standard_name("ignored").with_standard_path(&path);
    guard
        .protect(&req, &clean_orders(), |_| ())
        .expect("generates at the explicit path");
    assert!(path.exists());
}
