use std::fmt;

use serde::{Deserialize, Serialize};

/// Maximum points a single dimension can contribute.
pub const DIMENSION_CEILING: f64 = 20.0;

/// Maximum overall score; the five dimension ceilings sum to this.
pub const OVERALL_CEILING: f64 = 100.0;

/// The five quality axes a dataset is scored against.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Validity,
    Completeness,
    Consistency,
    Freshness,
    Plausibility,
}

impl Dimension {
    /// All dimensions in canonical order.
    pub const ALL: [Dimension; 5] = [
        Dimension::Validity,
        Dimension::Completeness,
        Dimension::Consistency,
        Dimension::Freshness,
        Dimension::Plausibility,
    ];

    /// Points ceiling for this dimension.
    pub fn ceiling(self) -> f64 {
        DIMENSION_CEILING
    }

    /// Canonical lowercase name, stable across serialization surfaces.
    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Validity => "validity",
            Dimension::Completeness => "completeness",
            Dimension::Consistency => "consistency",
            Dimension::Freshness => "freshness",
            Dimension::Plausibility => "plausibility",
        }
    }

    /// Parse a dimension from its name, case-insensitively.
    pub fn parse(name: &str) -> Option<Dimension> {
        match name.trim().to_lowercase().as_str() {
            "validity" => Some(Dimension::Validity),
            "completeness" => Some(Dimension::Completeness),
            "consistency" => Some(Dimension::Consistency),
            "freshness" => Some(Dimension::Freshness),
            "plausibility" => Some(Dimension::Plausibility),
            _ => None,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
