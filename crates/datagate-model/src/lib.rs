pub mod decision;
pub mod dimension;
pub mod error;
pub mod expr;
pub mod lookup;
pub mod report;
pub mod result;

pub use decision::{GateAction, ProtectionDecision};
pub use dimension::{Dimension, DIMENSION_CEILING, OVERALL_CEILING};
pub use error::{ExprError, ModelError, Result};
pub use expr::{Expr, Value};
pub use lookup::CaseInsensitiveColumns;
pub use report::{AssessmentReport, DimensionScore, FieldAnalysis};
pub use result::RuleResult;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_serializes() {
        let mut report = AssessmentReport::new();
        report.push_result(RuleResult::passing(
            "required_fields",
            Dimension::Completeness,
            20.0,
            "all required fields populated",
        ));
        report.seal(15.0);
        let json = serde_json::to_string(&report).expect("serialize report");
        let round: AssessmentReport = serde_json::from_str(&json).expect("deserialize report");
        assert_eq!(round.overall_score, 20.0);
        assert!(round.passed);
    }

    #[test]
    fn dimension_ceilings_sum_to_overall() {
        let total: f64 = Dimension::ALL.iter().map(|d| d.ceiling()).sum();
        assert!((total - OVERALL_CEILING).abs() < f64::EPSILON);
    }
}
