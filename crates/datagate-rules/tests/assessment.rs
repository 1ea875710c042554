//! End-to-end assessment: standard -> rule catalog -> sealed report.

use polars::prelude::*;
use proptest::prelude::*;

use datagate_model::Dimension;
use datagate_rules::{evaluate_rule, Assessor};
use datagate_standards::standard::{FieldRequirement, RuleDefinition, Standard};
use datagate_standards::{rule_catalog, TemplateEvaluator};

fn make_df(cols: Vec<(&str, Vec<&str>)>) -> DataFrame {
    let columns: Vec<Column> = cols
        .into_iter()
        .map(|(name, values)| Column::new(name.into(), values))
        .collect();
    DataFrame::new(columns).expect("dataframe")
}

fn orders_standard() -> Standard {
    let mut standard = Standard::default();
    standard.standards.id = "orders".to_string();
    standard.standards.version = "1.0".to_string();
    standard.requirements.overall_minimum = 70.0;
    standard.requirements.mandatory_fields =
        vec!["order_id".to_string(), "amount".to_string()];
    standard.requirements.field_requirements.insert(
        "order_id".to_string(),
        FieldRequirement {
            pattern: Some("ORD-[0-9]{3}".to_string()),
            ..FieldRequirement::default()
        },
    );
    standard.requirements.field_requirements.insert(
        "amount".to_string(),
        FieldRequirement {
            field_type: Some(datagate_standards::standard::ExpectedType::Numeric),
            min_value: Some(0.0),
            max_value: Some(1000.0),
            ..FieldRequirement::default()
        },
    );
    standard.requirements.rules.push(RuleDefinition {
        name: "amount_bounds".to_string(),
        dimension: Dimension::Consistency,
        rule_type: "cross_field".to_string(),
        weight: None,
        config: [(
            "expression".to_string(),
            serde_json::json!("amount >= 0"),
        )]
        .into_iter()
        .collect(),
    });
    standard
}

fn clean_orders() -> DataFrame {
    make_df(vec![
        ("order_id", vec!["ORD-001", "ORD-002", "ORD-003", "ORD-004"]),
        ("amount", vec!["10.0", "250.5", "400", "999.99"]),
    ])
}

#[test]
fn clean_data_passes_with_high_score() {
    let standard = orders_standard();
    let specs = rule_catalog(&standard).expect("catalog");
    let report = Assessor::new().assess_with_minimum(
        &clean_orders(),
        &specs,
        standard.requirements.overall_minimum,
    );

    assert!(report.passed, "overall = {}", report.overall_score);
    assert!(report.overall_score > 70.0);
    // Every populated dimension stays within its ceiling.
    for (dimension, score) in &report.dimension_scores {
        assert!(
            score.earned <= dimension.ceiling() + 1e-9,
            "{dimension} over ceiling"
        );
    }
    assert_eq!(report.metadata["row_count"], 4);
}

#[test]
fn dirty_data_fails_and_reports_findings() {
    let standard = orders_standard();
    let specs = rule_catalog(&standard).expect("catalog");
    let df = make_df(vec![
        ("order_id", vec!["bad", "", "also-bad", ""]),
        ("amount", vec!["-5", "oops", "", "nope"]),
    ]);
    let report = Assessor::new().assess_with_minimum(
        &df,
        &specs,
        standard.requirements.overall_minimum,
    );

    assert!(!report.passed);
    let findings = report.top_findings(5);
    assert!(!findings.is_empty());
    // Findings are ordered by points lost.
    for pair in findings.windows(2) {
        let lost_first = pair[0].weight - pair[0].score;
        let lost_second = pair[1].weight - pair[1].score;
        assert!(lost_first >= lost_second - 1e-9);
    }
}

#[test]
fn field_analysis_tracks_presence_and_rule_outcomes() {
    let standard = orders_standard();
    let specs = rule_catalog(&standard).expect("catalog");
    let df = make_df(vec![
        ("order_id", vec!["ORD-001", "ORD-002"]),
        ("amount", vec!["10", ""]),
    ]);
    let report = Assessor::new().assess(&df, &specs);

    let amount = &report.field_analysis["amount"];
    assert!((amount.presence_ratio - 0.5).abs() < 1e-9);
    let order_id = &report.field_analysis["order_id"];
    assert_eq!(order_id.presence_ratio, 1.0);
    assert!(order_id
        .rules_passed
        .iter()
        .any(|r| r == "format_pattern_order_id"));
}

#[test]
fn evaluator_closes_the_loop_on_assessed_reports() {
    let standard = orders_standard();
    let specs = rule_catalog(&standard).expect("catalog");
    let report = Assessor::new().assess_with_minimum(
        &clean_orders(),
        &specs,
        standard.requirements.overall_minimum,
    );
    let evaluation = TemplateEvaluator::new().evaluate(&standard, &report);
    assert!(evaluation.compliant, "gaps: {:?}", evaluation.gaps);
}

#[test]
fn template_evaluation_is_idempotent() {
    let standard = orders_standard();
    let specs = rule_catalog(&standard).expect("catalog");
    let df = make_df(vec![
        ("order_id", vec!["bad", ""]),
        ("amount", vec!["-5", "oops"]),
    ]);
    let report = Assessor::new().assess_with_minimum(
        &df,
        &specs,
        standard.requirements.overall_minimum,
    );

    let evaluator = TemplateEvaluator::new();
    let first = evaluator.evaluate(&standard, &report);
    let second = evaluator.evaluate(&standard, &report);

    assert!(!first.compliant);
    assert!(!first.gaps.is_empty());
    assert_eq!(
        serde_json::to_value(&first).expect("serialize"),
        serde_json::to_value(&second).expect("serialize")
    );
}

proptest! {
    // Score bounds hold for arbitrary numeric data.
    #[test]
    fn scores_stay_within_bounds(values in prop::collection::vec(-1e6..1e6f64, 1..60)) {
        let df = DataFrame::new(vec![Column::new("x".into(), values)]).unwrap();
        let spec = datagate_standards::catalog::RuleSpec {
            name: "x_outliers".to_string(),
            dimension: Dimension::Plausibility,
            weight: 20.0,
            check: datagate_standards::catalog::CheckKind::OutlierDetection {
                column: "x".to_string(),
                method: datagate_standards::catalog::OutlierMethod::Zscore,
                threshold: 3.0,
                multiplier: 1.5,
                exclude_outliers: true,
            },
        };
        let result = evaluate_rule(&df, &spec);
        prop_assert!(result.score >= 0.0);
        prop_assert!(result.score <= result.weight + 1e-9);
    }

    #[test]
    fn overall_score_is_clamped(rows in prop::collection::vec("[a-z]{0,8}", 1..40)) {
        let df = DataFrame::new(vec![Column::new(
            "name".into(),
            rows,
        )])
        .unwrap();
        let standard = orders_standard();
        let specs = rule_catalog(&standard).expect("catalog");
        let report = Assessor::new().assess(&df, &specs);
        prop_assert!(report.overall_score >= 0.0);
        prop_assert!(report.overall_score <= 100.0);
        for (dimension, score) in &report.dimension_scores {
            prop_assert!(score.earned <= dimension.ceiling() + 1e-9);
        }
    }
}
