//! Per-rule evaluator behavior over small in-memory frames.

use polars::prelude::*;

use datagate_model::Dimension;
use datagate_rules::evaluate_rule;
use datagate_standards::catalog::{
    CheckKind, ComparisonOp, CrossFieldMode, FieldComparison, OutlierMethod, RuleSpec,
    UniformFormat,
};

fn make_df(cols: Vec<(&str, Vec<&str>)>) -> DataFrame {
    let columns: Vec<Column> = cols
        .into_iter()
        .map(|(name, values)| Column::new(name.into(), values))
        .collect();
    DataFrame::new(columns).expect("dataframe")
}

fn make_numeric_df(cols: Vec<(&str, Vec<f64>)>) -> DataFrame {
    let columns: Vec<Column> = cols
        .into_iter()
        .map(|(name, values)| Column::new(name.into(), values))
        .collect();
    DataFrame::new(columns).expect("dataframe")
}

fn spec(name: &str, dimension: Dimension, weight: f64, check: CheckKind) -> RuleSpec {
    RuleSpec {
        name: name.to_string(),
        dimension,
        weight,
        check,
    }
}

#[test]
fn required_fields_scores_partial_population_against_threshold() {
    // 100 rows, email 85% populated, threshold 0.9.
    let mut email: Vec<&str> = vec!["a@example.com"; 85];
    email.extend(vec![""; 15]);
    let ids: Vec<String> = (0..100).map(|i| format!("id-{i}")).collect();
    let df = make_df(vec![
        ("id", ids.iter().map(String::as_str).collect()),
        ("email", email),
    ]);

    let result = evaluate_rule(
        &df,
        &spec(
            "required_fields",
            Dimension::Completeness,
            10.0,
            CheckKind::RequiredFields {
                fields: vec!["email".to_string()],
                threshold: 0.9,
            },
        ),
    );

    assert!(!result.valid);
    let expected = 10.0 * (0.85_f64 / 0.9).min(1.0);
    assert!(
        (result.score - expected).abs() < 1e-9,
        "score {} != {expected}",
        result.score
    );
}

#[test]
fn cross_field_expression_counts_invalid_rows() {
    let df = make_numeric_df(vec![
        ("min_value", vec![10.0, 20.0, 30.0, 40.0, 50.0]),
        ("max_value", vec![100.0, 50.0, 20.0, 90.0, 150.0]),
    ]);

    let result = evaluate_rule(
        &df,
        &spec(
            "min_le_max",
            Dimension::Consistency,
            20.0,
            CheckKind::CrossField {
                mode: CrossFieldMode::Expression("min_value <= max_value".to_string()),
            },
        ),
    );

    assert!(!result.valid);
    assert_eq!(result.details["invalid_rows"], 1);
    assert!((result.details["consistency_ratio"].as_f64().unwrap() - 0.8).abs() < 1e-9);
    assert!((result.score - 16.0).abs() < 1e-9);
}

#[test]
fn cross_field_comparisons_match_expression_mode() {
    let df = make_numeric_df(vec![
        ("min_value", vec![10.0, 20.0, 30.0]),
        ("max_value", vec![100.0, 50.0, 20.0]),
    ]);

    let result = evaluate_rule(
        &df,
        &spec(
            "min_le_max",
            Dimension::Consistency,
            20.0,
            CheckKind::CrossField {
                mode: CrossFieldMode::Comparisons(vec![FieldComparison {
                    field1: "min_value".to_string(),
                    operator: ComparisonOp::Le,
                    field2: "max_value".to_string(),
                }]),
            },
        ),
    );

    assert_eq!(result.details["invalid_rows"], 1);
}

#[test]
fn zscore_outliers_flag_exactly_the_injected_points() {
    // 95 tightly clustered points plus 5 far outliers.
    let mut values: Vec<f64> = (0..95).map(|i| 50.0 + f64::from(i % 10) * 0.1).collect();
    values.extend([10_000.0; 5]);
    let df = make_numeric_df(vec![("amount", values)]);

    let result = evaluate_rule(
        &df,
        &spec(
            "outliers",
            Dimension::Plausibility,
            20.0,
            CheckKind::OutlierDetection {
                column: "amount".to_string(),
                method: OutlierMethod::Zscore,
                threshold: 3.0,
                multiplier: 1.5,
                exclude_outliers: true,
            },
        ),
    );

    assert_eq!(result.details["outlier_count"], 5);
    assert!(
        (result.details["plausibility_ratio"].as_f64().unwrap() - 0.95).abs() < 1e-9
    );
    assert!(!result.valid);
}

#[test]
fn outlier_report_only_mode_keeps_full_score() {
    let mut values: Vec<f64> = vec![1.0; 50];
    values.push(1_000.0);
    let df = make_numeric_df(vec![("amount", values)]);

    let result = evaluate_rule(
        &df,
        &spec(
            "outliers",
            Dimension::Plausibility,
            20.0,
            CheckKind::OutlierDetection {
                column: "amount".to_string(),
                method: OutlierMethod::Iqr,
                threshold: 3.0,
                multiplier: 1.5,
                exclude_outliers: false,
            },
        ),
    );

    assert!(result.valid);
    assert_eq!(result.score, 20.0);
    assert_eq!(result.details["outlier_count"], 1);
}

#[test]
fn missing_column_degrades_instead_of_erroring() {
    let df = make_df(vec![("present", vec!["x"])]);
    let result = evaluate_rule(
        &df,
        &spec(
            "ghost",
            Dimension::Validity,
            5.0,
            CheckKind::FormatPattern {
                column: "absent".to_string(),
                pattern: ".*".to_string(),
            },
        ),
    );
    assert!(!result.valid);
    assert_eq!(result.score, 0.0);
    assert!(result.narrative.contains("absent"));
}

#[test]
fn column_resolution_is_case_insensitive() {
    let df = make_df(vec![("Email", vec!["a@example.com", "bad"])]);
    let result = evaluate_rule(
        &df,
        &spec(
            "email_shape",
            Dimension::Validity,
            10.0,
            CheckKind::FormatPattern {
                column: "EMAIL".to_string(),
                pattern: r"[^@]+@[^@]+\.[^@]+".to_string(),
            },
        ),
    );
    assert!(!result.valid);
    assert_eq!(result.details["conforming"], 1);
    assert_eq!(result.examples, vec!["bad"]);
}

#[test]
fn allowed_values_respects_case_flag() {
    let df = make_df(vec![("status", vec!["Active", "inactive", "ACTIVE"])]);
    let check = |case_insensitive| {
        evaluate_rule(
            &df,
            &spec(
                "status_values",
                Dimension::Validity,
                10.0,
                CheckKind::AllowedValues {
                    column: "status".to_string(),
                    allowed: vec!["active".to_string(), "inactive".to_string()],
                    case_insensitive,
                },
            ),
        )
    };
    assert!(check(true).valid);
    assert!(!check(false).valid);
}

#[test]
fn primary_key_uniqueness_counts_duplicates() {
    let df = make_df(vec![
        ("region", vec!["eu", "eu", "us", "eu"]),
        ("order", vec!["1", "2", "1", "1"]),
    ]);
    let result = evaluate_rule(
        &df,
        &spec(
            "pk",
            Dimension::Validity,
            10.0,
            CheckKind::PrimaryKeyUnique {
                columns: vec!["region".to_string(), "order".to_string()],
            },
        ),
    );
    assert!(!result.valid);
    assert_eq!(result.details["duplicates"], 1);
}

#[test]
fn uniform_length_flags_mixed_widths() {
    let df = make_df(vec![("code", vec!["AAA", "BBB", "CC", ""])]);
    let result = evaluate_rule(
        &df,
        &spec(
            "code_width",
            Dimension::Consistency,
            20.0,
            CheckKind::UniformRepresentation {
                column: "code".to_string(),
                format: UniformFormat::Length(3),
            },
        ),
    );
    // The empty cell is missing, not malformed.
    assert_eq!(result.details["checked"], 3);
    assert_eq!(result.details["conforming"], 2);
    assert!(!result.valid);
}

#[test]
fn recency_scores_fraction_within_window() {
    let df = make_df(vec![(
        "updated",
        vec!["2026-08-29", "2026-08-25", "2026-01-01", "2026-08-28"],
    )]);
    let as_of = chrono::NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
    let result = evaluate_rule(
        &df,
        &spec(
            "recent",
            Dimension::Freshness,
            20.0,
            CheckKind::Recency {
                column: "updated".to_string(),
                max_age_days: 7,
                as_of: Some(as_of),
            },
        ),
    );
    assert!(!result.valid);
    assert_eq!(result.details["fresh"], 3);
    assert!((result.score - 15.0).abs() < 1e-9);
}

#[test]
fn last_update_within_is_binary() {
    let df = make_df(vec![("updated", vec!["2026-08-01", "2026-08-20"])]);
    let as_of = chrono::NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
    let in_window = evaluate_rule(
        &df,
        &spec(
            "last_update",
            Dimension::Freshness,
            20.0,
            CheckKind::LastUpdateWithin {
                column: "updated".to_string(),
                max_age_days: 14,
                as_of: Some(as_of),
            },
        ),
    );
    assert!(in_window.valid);
    assert_eq!(in_window.score, 20.0);

    let out_of_window = evaluate_rule(
        &df,
        &spec(
            "last_update",
            Dimension::Freshness,
            20.0,
            CheckKind::LastUpdateWithin {
                column: "updated".to_string(),
                max_age_days: 5,
                as_of: Some(as_of),
            },
        ),
    );
    assert!(!out_of_window.valid);
    assert_eq!(out_of_window.score, 0.0);
}

#[test]
fn range_check_counts_violations_separately() {
    let df = make_numeric_df(vec![("amount", vec![-5.0, 10.0, 20.0, 150.0, 200.0])]);
    let result = evaluate_rule(
        &df,
        &spec(
            "amount_range",
            Dimension::Plausibility,
            20.0,
            CheckKind::RangeCheck {
                column: "amount".to_string(),
                min: Some(0.0),
                max: Some(100.0),
                log_scale: false,
                quantile_bounds: None,
            },
        ),
    );
    assert_eq!(result.details["min_violations"], 1);
    assert_eq!(result.details["max_violations"], 2);
    assert!((result.score - 20.0 * 0.4).abs() < 1e-9);
}

#[test]
fn pattern_frequency_flags_distinct_cap() {
    let values: Vec<String> = (0..20).map(|i| format!("v{i}")).collect();
    let df = make_df(vec![("tag", values.iter().map(String::as_str).collect())]);
    let result = evaluate_rule(
        &df,
        &spec(
            "tag_cardinality",
            Dimension::Plausibility,
            20.0,
            CheckKind::PatternFrequency {
                column: "tag".to_string(),
                min_frequency: None,
                max_frequency: None,
                expected_frequencies: Default::default(),
                tolerance: 0.05,
                max_distinct: Some(10),
            },
        ),
    );
    assert!(!result.valid);
    assert_eq!(result.score, 0.0);
}

#[test]
fn value_distribution_accepts_matching_uniform() {
    // Evenly spaced points over the hypothesized support.
    let values: Vec<f64> = (0..200)
        .map(|i| -2.5 + 5.0 * (f64::from(i) + 0.5) / 200.0)
        .collect();
    let df = make_numeric_df(vec![("z", values)]);
    let result = evaluate_rule(
        &df,
        &spec(
            "z_dist",
            Dimension::Plausibility,
            20.0,
            CheckKind::ValueDistribution {
                column: "z".to_string(),
                distribution: datagate_standards::catalog::Distribution::Uniform {
                    min: -2.5,
                    max: 2.5,
                },
                p_threshold: 0.05,
            },
        ),
    );
    assert!(result.valid, "p = {:?}", result.details["p_value"]);
    assert_eq!(result.score, 20.0);
}

#[test]
fn categorical_distribution_checks_observed_frequencies() {
    let mut status = vec!["A"; 50];
    status.extend(vec!["B"; 50]);
    let check = CheckKind::ValueDistribution {
        column: "status".to_string(),
        distribution: datagate_standards::catalog::Distribution::Categorical {
            probabilities: [("A".to_string(), 0.5), ("B".to_string(), 0.5)]
                .into_iter()
                .collect(),
        },
        p_threshold: 0.05,
    };

    let df = make_df(vec![("status", status)]);
    let result = evaluate_rule(
        &df,
        &spec("status_dist", Dimension::Plausibility, 20.0, check.clone()),
    );
    assert!(result.valid, "p = {:?}", result.details["p_value"]);
    assert_eq!(result.score, 20.0);

    // 90/10 against an expected even split fails the chi-square test.
    let mut skewed = vec!["A"; 90];
    skewed.extend(vec!["B"; 10]);
    let df = make_df(vec![("status", skewed)]);
    let result = evaluate_rule(
        &df,
        &spec("status_dist", Dimension::Plausibility, 20.0, check),
    );
    assert!(!result.valid);
    assert_eq!(result.score, 0.0);
    assert!(result.details["p_value"].as_f64().unwrap() < 0.05);
}

#[test]
fn modified_zscore_flags_against_median_and_mad() {
    let mut values: Vec<f64> = (10..20).map(f64::from).collect();
    values.push(1_000.0);
    let df = make_numeric_df(vec![("amount", values)]);

    let result = evaluate_rule(
        &df,
        &spec(
            "outliers",
            Dimension::Plausibility,
            20.0,
            CheckKind::OutlierDetection {
                column: "amount".to_string(),
                method: OutlierMethod::ModifiedZscore,
                threshold: 3.5,
                multiplier: 1.5,
                exclude_outliers: true,
            },
        ),
    );

    assert_eq!(result.details["outlier_count"], 1);
    assert!(!result.valid);
}

#[test]
fn quantile_bounds_derive_the_range_from_the_data() {
    let values: Vec<f64> = (1..=100).map(f64::from).collect();
    let df = make_numeric_df(vec![("amount", values)]);

    let result = evaluate_rule(
        &df,
        &spec(
            "amount_range",
            Dimension::Plausibility,
            20.0,
            CheckKind::RangeCheck {
                column: "amount".to_string(),
                min: None,
                max: None,
                log_scale: false,
                quantile_bounds: Some((0.1, 0.9)),
            },
        ),
    );

    // Interpolated bounds are 10.9 and 90.1, so ten values fall on each side.
    assert!(!result.valid);
    assert_eq!(result.details["min_violations"], 10);
    assert_eq!(result.details["max_violations"], 10);
    assert!((result.score - 20.0 * 0.8).abs() < 1e-9);
}

#[test]
fn calculation_consistency_flags_rows_off_beyond_tolerance() {
    let df = make_numeric_df(vec![
        ("price", vec![2.0, 3.0, 4.0]),
        ("quantity", vec![5.0, 5.0, 5.0]),
        ("total", vec![10.0, 15.0, 21.0]),
    ]);

    let result = evaluate_rule(
        &df,
        &spec(
            "total_matches_price_times_quantity",
            Dimension::Consistency,
            20.0,
            CheckKind::CalculationConsistency {
                expression: "price * quantity".to_string(),
                target_column: "total".to_string(),
                tolerance: 0.01,
            },
        ),
    );

    assert!(!result.valid);
    assert_eq!(result.details["invalid_rows"], 1);
    assert!((result.score - 20.0 * 2.0 / 3.0).abs() < 1e-9);
}

#[test]
fn schema_extras_are_penalized_when_not_allowed() {
    let df = make_df(vec![
        ("a", vec!["1"]),
        ("b", vec!["2"]),
        ("c", vec!["3"]),
        ("d", vec!["4"]),
    ]);

    let result = evaluate_rule(
        &df,
        &spec(
            "schema",
            Dimension::Completeness,
            10.0,
            CheckKind::SchemaCompleteness {
                expected_fields: vec!["a".to_string(), "b".to_string()],
                case_insensitive: false,
                allow_extra: false,
            },
        ),
    );

    // Both expected columns present; two extras over four actual columns
    // subtract half their share from the ratio.
    assert!(!result.valid);
    assert!((result.score - 10.0 * 0.75).abs() < 1e-9);
    assert_eq!(
        result.details["extra_columns"],
        serde_json::json!(["c", "d"])
    );
}
