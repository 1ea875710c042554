use thiserror::Error;

use datagate_standards::StandardsError;

#[derive(Debug, Error)]
pub enum GuardError {
    #[error(transparent)]
    Standard(#[from] StandardsError),

    #[error(
        "data readiness {overall_score:.1} below required {required_score:.1} \
         ({readiness_level}): {}",
        top_findings.join("; ")
    )]
    QualityInsufficient {
        overall_score: f64,
        required_score: f64,
        readiness_level: &'static str,
        /// At most five findings, ordered by points lost.
        top_findings: Vec<String>,
    },

    #[error("dataset profiling failed: {message}")]
    Profile { message: String },
}

/// Coarse human-readable band for an overall score.
pub fn readiness_level(overall_score: f64) -> &'static str {
    if overall_score >= 90.0 {
        "excellent"
    } else if overall_score >= 75.0 {
        "good"
    } else if overall_score >= 60.0 {
        "fair"
    } else if overall_score >= 40.0 {
        "poor"
    } else {
        "critical"
    }
}
