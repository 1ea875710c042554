//! Template evaluation: compare an assessment report against a standard's
//! requirements and produce a gap report.

use serde::{Deserialize, Serialize};

use datagate_model::{AssessmentReport, Dimension, Expr, Value};

use crate::standard::Standard;

/// One unmet requirement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gap {
    pub requirement_id: String,
    pub description: String,
    pub expected_value: String,
    pub actual_value: String,
    pub dimension: Option<Dimension>,
}

/// The outcome of checking a report against a standard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateEvaluation {
    pub template_id: String,
    pub template_version: String,
    pub overall_score: f64,
    pub required_score: f64,
    pub gaps: Vec<Gap>,
    pub compliant: bool,
    pub certification_eligible: bool,
}

impl TemplateEvaluation {
    fn new(standard: &Standard, report: &AssessmentReport) -> Self {
        TemplateEvaluation {
            template_id: standard.standards.id.clone(),
            template_version: standard.standards.version.clone(),
            overall_score: report.overall_score,
            required_score: standard.requirements.overall_minimum,
            gaps: Vec::new(),
            compliant: false,
            certification_eligible: false,
        }
    }

    fn add_gap(&mut self, gap: Gap) {
        self.gaps.push(gap);
    }

    fn finalize(&mut self) {
        self.compliant = self.gaps.is_empty();
        self.certification_eligible = self.compliant;
    }
}

/// Evaluates assessment reports against standards.
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateEvaluator;

impl TemplateEvaluator {
    pub fn new() -> Self {
        TemplateEvaluator
    }

    /// Check `report` against `standard`.
    ///
    /// In order: the overall score against the overall minimum, each
    /// dimension score against its configured minimum, each required rule
    /// against the execution log, then the compliance/certification
    /// verdict.
    pub fn evaluate(&self, standard: &Standard, report: &AssessmentReport) -> TemplateEvaluation {
        let mut evaluation = TemplateEvaluation::new(standard, report);
        let requirements = &standard.requirements;

        if report.overall_score < requirements.overall_minimum {
            evaluation.add_gap(Gap {
                requirement_id: "overall_minimum".to_string(),
                description: "overall readiness score below required minimum".to_string(),
                expected_value: format!(">= {:.1}", requirements.overall_minimum),
                actual_value: format!("{:.1}", report.overall_score),
                dimension: None,
            });
        }

        for (dimension, requirement) in &requirements.dimension_requirements {
            let earned = report.dimension_score(*dimension);
            if earned < requirement.minimum_score {
                evaluation.add_gap(Gap {
                    requirement_id: format!("{dimension}_minimum"),
                    description: format!("{dimension} score below required minimum"),
                    expected_value: format!(">= {:.1}", requirement.minimum_score),
                    actual_value: format!("{earned:.1}"),
                    dimension: Some(*dimension),
                });
            }

            for rule in &requirement.required_rules {
                match report.rule_passed(rule) {
                    Some(true) => {}
                    Some(false) => evaluation.add_gap(Gap {
                        requirement_id: format!("required_rule:{rule}"),
                        description: format!("required rule '{rule}' failed"),
                        expected_value: "pass".to_string(),
                        actual_value: "fail".to_string(),
                        dimension: Some(*dimension),
                    }),
                    None => evaluation.add_gap(Gap {
                        requirement_id: format!("required_rule:{rule}"),
                        description: format!("required rule '{rule}' was not executed"),
                        expected_value: "pass".to_string(),
                        actual_value: "not executed".to_string(),
                        dimension: Some(*dimension),
                    }),
                }
            }
        }

        for field in &requirements.mandatory_fields {
            let presence = report
                .field_analysis
                .get(field)
                .map(|analysis| analysis.presence_ratio)
                .unwrap_or(0.0);
            if presence < requirements.field_presence_threshold {
                evaluation.add_gap(Gap {
                    requirement_id: format!("mandatory_field:{field}"),
                    description: format!("mandatory field '{field}' insufficiently populated"),
                    expected_value: format!(
                        "presence >= {:.2}",
                        requirements.field_presence_threshold
                    ),
                    actual_value: format!("{presence:.2}"),
                    dimension: Some(Dimension::Completeness),
                });
            }
        }

        for custom in &requirements.custom_rules {
            match Self::custom_rule_holds(&custom.expression, report) {
                Ok(true) => {}
                Ok(false) => evaluation.add_gap(Gap {
                    requirement_id: format!("custom_rule:{}", custom.id),
                    description: custom.description.clone(),
                    expected_value: custom.expression.clone(),
                    actual_value: "false".to_string(),
                    dimension: custom.dimension,
                }),
                Err(message) => evaluation.add_gap(Gap {
                    requirement_id: format!("custom_rule:{}", custom.id),
                    description: custom.description.clone(),
                    expected_value: custom.expression.clone(),
                    actual_value: format!("error: {message}"),
                    dimension: custom.dimension,
                }),
            }
        }

        evaluation.finalize();
        evaluation
    }

    /// Custom rules are boolean expressions over the report's scores:
    /// `overall_score`, `<dimension>_score`, and `row_count`.
    fn custom_rule_holds(expression: &str, report: &AssessmentReport) -> Result<bool, String> {
        let expr = Expr::parse(expression).map_err(|e| e.to_string())?;
        let resolve = |name: &str| -> Option<Value> {
            match name {
                "overall_score" => Some(Value::Num(report.overall_score)),
                "row_count" => report
                    .metadata
                    .get("row_count")
                    .and_then(|v| v.as_f64())
                    .map(Value::Num),
                other => {
                    let score_of = other.strip_suffix("_score")?;
                    let dimension = Dimension::parse(score_of)?;
                    Some(Value::Num(report.dimension_score(dimension)))
                }
            }
        };
        expr.eval_bool(&resolve).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datagate_model::RuleResult;

    use crate::standard::{DimensionRequirement, Standard};

    fn standard_with_minimums() -> Standard {
        let mut standard = Standard::default();
        standard.standards.id = "test-standard".to_string();
        standard.standards.version = "1.0".to_string();
        standard.requirements.overall_minimum = 75.0;
        standard.requirements.dimension_requirements.insert(
            Dimension::Completeness,
            DimensionRequirement {
                minimum_score: 15.0,
                required_rules: vec!["required_fields".to_string()],
                rule_weights: Default::default(),
            },
        );
        standard
    }

    fn report_with(score_per_dimension: f64, required_fields_passed: bool) -> AssessmentReport {
        let mut report = AssessmentReport::new();
        for dimension in Dimension::ALL {
            report.push_result(RuleResult::from_ratio(
                format!("fill_{dimension}"),
                dimension,
                dimension.ceiling(),
                score_per_dimension / dimension.ceiling(),
                true,
                "fill",
            ));
        }
        report.push_result(RuleResult {
            rule: "required_fields".to_string(),
            dimension: Dimension::Completeness,
            valid: required_fields_passed,
            score: 0.0,
            weight: 0.0,
            narrative: String::new(),
            examples: Vec::new(),
            details: Default::default(),
        });
        report.seal(75.0);
        report
    }

    #[test]
    fn compliant_report_has_no_gaps() {
        let standard = standard_with_minimums();
        let report = report_with(18.0, true);
        let evaluation = TemplateEvaluator::new().evaluate(&standard, &report);
        assert!(evaluation.gaps.is_empty());
        assert!(evaluation.compliant);
        assert!(evaluation.certification_eligible);
    }

    #[test]
    fn low_dimension_and_failed_rule_produce_gaps() {
        let standard = standard_with_minimums();
        let report = report_with(13.0, false);
        let evaluation = TemplateEvaluator::new().evaluate(&standard, &report);
        let ids: Vec<&str> = evaluation
            .gaps
            .iter()
            .map(|g| g.requirement_id.as_str())
            .collect();
        assert!(ids.contains(&"overall_minimum"));
        assert!(ids.contains(&"completeness_minimum"));
        assert!(ids.contains(&"required_rule:required_fields"));
        assert!(!evaluation.compliant);
    }
}
