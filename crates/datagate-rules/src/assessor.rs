//! Assessment orchestrator: run a rule catalog over a frame and fold the
//! results into a sealed report.

use std::time::Instant;

use polars::prelude::DataFrame;
use serde_json::json;
use tracing::{debug, info};

use datagate_frame::presence_ratio;
use datagate_model::{AssessmentReport, Dimension, FieldAnalysis};
use datagate_standards::RuleSpec;

use crate::engine::evaluate_rule;

/// Default pass threshold when neither the standard nor the caller
/// supplies one.
pub const DEFAULT_MINIMUM: f64 = 75.0;

#[derive(Debug, Default, Clone, Copy)]
pub struct Assessor;

impl Assessor {
    pub fn new() -> Self {
        Assessor
    }

    /// Assess with the default pass threshold.
    pub fn assess(&self, df: &DataFrame, specs: &[RuleSpec]) -> AssessmentReport {
        self.assess_with_minimum(df, specs, DEFAULT_MINIMUM)
    }

    /// Run every rule, aggregate per-dimension scores, and seal the
    /// report against `minimum`.
    pub fn assess_with_minimum(
        &self,
        df: &DataFrame,
        specs: &[RuleSpec],
        minimum: f64,
    ) -> AssessmentReport {
        let started = Instant::now();
        let mut report = AssessmentReport::new();

        for spec in specs {
            let result = evaluate_rule(df, spec);
            debug!(
                rule = %result.rule,
                dimension = %result.dimension,
                valid = result.valid,
                score = result.score,
                weight = result.weight,
                "rule evaluated"
            );
            record_field_outcomes(&mut report, df, spec, result.valid);
            report.push_result(result);
        }

        for column in df.get_column_names_owned() {
            report
                .field_analysis
                .entry(column.to_string())
                .or_default()
                .presence_ratio = presence_ratio(df, &column);
        }

        report.seal(minimum);

        for dimension in Dimension::ALL {
            debug!(
                dimension = %dimension,
                earned = report.dimension_score(dimension),
                ceiling = dimension.ceiling(),
                "dimension scored"
            );
        }

        let duration_ms = started.elapsed().as_millis() as u64;
        report
            .metadata
            .insert("row_count".to_string(), json!(df.height()));
        report
            .metadata
            .insert("column_count".to_string(), json!(df.width()));
        report
            .metadata
            .insert("duration_ms".to_string(), json!(duration_ms));
        report.metadata.insert(
            "assessed_at".to_string(),
            json!(chrono::Utc::now().to_rfc3339()),
        );
        report
            .metadata
            .insert("rule_count".to_string(), json!(specs.len()));

        info!(
            overall = report.overall_score,
            passed = report.passed,
            rules = specs.len(),
            rows = df.height(),
            duration_ms,
            "assessment complete"
        );
        report
    }
}

fn record_field_outcomes(
    report: &mut AssessmentReport,
    df: &DataFrame,
    spec: &RuleSpec,
    valid: bool,
) {
    let lookup = datagate_frame::column_lookup(df);
    for column in spec.check.columns() {
        let Some(actual) = lookup.get(column) else {
            continue;
        };
        let analysis: &mut FieldAnalysis =
            report.field_analysis.entry(actual.to_string()).or_default();
        if valid {
            analysis.rules_passed.push(spec.name.clone());
        } else {
            analysis.rules_failed.push(spec.name.clone());
        }
    }
}
