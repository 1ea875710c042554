//! Standard document model.
//!
//! A standard is a versioned specification of expected data shape and
//! minimum quality thresholds, loaded from any structured-text source
//! that deserializes to this shape (TOML and JSON here). Immutable once
//! parsed; cached per resolved path for the process lifetime.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use datagate_model::Dimension;

use crate::error::StandardsError;
use crate::hash::sha256_hex;

/// Named options consumed by a single rule instance. Validated lazily by
/// each rule constructor.
pub type RuleConfig = BTreeMap<String, JsonValue>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Standard {
    pub standards: StandardsMeta,
    pub requirements: Requirements,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certification: Option<Certification>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardsMeta {
    pub id: String,
    pub version: String,
    pub authority: String,
    #[serde(default)]
    pub description: String,
    /// ISO date the standard takes effect; informational.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Requirements {
    /// Minimum overall score (0-100) for the data to pass.
    #[serde(default = "default_overall_minimum")]
    pub overall_minimum: f64,

    /// Per-dimension minimums, required rules, and weight overrides.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dimension_requirements: BTreeMap<Dimension, DimensionRequirement>,

    /// Per-field shape expectations; validity and plausibility rules are
    /// derived from these.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub field_requirements: BTreeMap<String, FieldRequirement>,

    /// Fields that must be present and populated.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mandatory_fields: Vec<String>,

    /// Presence ratio a mandatory field must reach.
    #[serde(default = "default_presence_threshold")]
    pub field_presence_threshold: f64,

    /// Explicitly configured rules (consistency, freshness, plausibility
    /// checks that cannot be derived from field shapes alone).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<RuleDefinition>,

    /// Boolean expressions evaluated over the report's scores.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_rules: Vec<CustomRule>,
}

impl Default for Requirements {
    fn default() -> Self {
        Self {
            overall_minimum: default_overall_minimum(),
            dimension_requirements: BTreeMap::new(),
            field_requirements: BTreeMap::new(),
            mandatory_fields: Vec::new(),
            field_presence_threshold: default_presence_threshold(),
            rules: Vec::new(),
            custom_rules: Vec::new(),
        }
    }
}

fn default_overall_minimum() -> f64 {
    75.0
}

fn default_presence_threshold() -> f64 {
    0.8
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DimensionRequirement {
    /// Minimum points (0-20) this dimension must earn.
    #[serde(default)]
    pub minimum_score: f64,
    /// Rules that must exist and pass in the execution log.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_rules: Vec<String>,
    /// Weight overrides by rule name; unlisted rules share the remainder.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub rule_weights: BTreeMap<String, f64>,
}

/// Expected shape of one field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldRequirement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<ExpectedType>,
    /// Whether missing values are acceptable for this field.
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
}

fn default_true() -> bool {
    true
}

/// Logical value type a field is expected to hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpectedType {
    Numeric,
    String,
    Boolean,
    Date,
}

/// An explicitly configured rule instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub name: String,
    pub dimension: Dimension,
    /// Rule-type identifier resolved through the check registry.
    #[serde(rename = "type")]
    pub rule_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default)]
    pub config: RuleConfig,
}

/// A boolean expression over the report's scores, evaluated by the
/// template evaluator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomRule {
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub expression: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension: Option<Dimension>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Certification {
    pub validity_period_days: u32,
    pub id_prefix: String,
}

/// A standard together with its provenance: where it was loaded from and
/// the checksum of the source bytes.
#[derive(Debug, Clone)]
pub struct LoadedStandard {
    pub standard: Standard,
    pub path: PathBuf,
    pub checksum: String,
}

impl Standard {
    /// Load a standard from a TOML or JSON file, dispatching on extension.
    /// Unknown extensions try TOML first, then JSON.
    pub fn from_path(path: &Path) -> Result<LoadedStandard, StandardsError> {
        let bytes = std::fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StandardsError::MissingFile {
                    path: path.to_path_buf(),
                }
            } else {
                StandardsError::io(path, e)
            }
        })?;
        let text = String::from_utf8_lossy(&bytes);
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let standard = match extension.as_deref() {
            Some("json") => {
                serde_json::from_str(&text).map_err(|e| StandardsError::Json {
                    path: path.to_path_buf(),
                    source: e,
                })?
            }
            Some("toml") => toml::from_str(&text).map_err(|e| StandardsError::Toml {
                path: path.to_path_buf(),
                source: e,
            })?,
            _ => match toml::from_str(&text) {
                Ok(standard) => standard,
                Err(toml_err) => {
                    serde_json::from_str(&text).map_err(|_| StandardsError::Toml {
                        path: path.to_path_buf(),
                        source: toml_err,
                    })?
                }
            },
        };

        let loaded = LoadedStandard {
            standard,
            path: path.to_path_buf(),
            checksum: sha256_hex(&bytes),
        };
        loaded.standard.validate()?;
        Ok(loaded)
    }

    /// Build a standard from already-parsed structured data.
    pub fn from_json_value(value: JsonValue) -> Result<Standard, StandardsError> {
        let standard: Standard =
            serde_json::from_value(value).map_err(|e| StandardsError::InvalidStandard {
                message: e.to_string(),
            })?;
        standard.validate()?;
        Ok(standard)
    }

    /// Persist as pretty TOML.
    pub fn write_toml(&self, path: &Path) -> Result<(), StandardsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StandardsError::io(parent, e))?;
        }
        let text = toml::to_string_pretty(self).map_err(|e| StandardsError::Serialize {
            message: e.to_string(),
        })?;
        std::fs::write(path, text).map_err(|e| StandardsError::io(path, e))
    }

    /// Structural sanity checks beyond what serde enforces.
    pub fn validate(&self) -> Result<(), StandardsError> {
        if self.standards.id.trim().is_empty() {
            return Err(StandardsError::InvalidStandard {
                message: "standards.id must not be empty".to_string(),
            });
        }
        if !(0.0..=100.0).contains(&self.requirements.overall_minimum) {
            return Err(StandardsError::InvalidStandard {
                message: format!(
                    "requirements.overall_minimum must be in [0, 100], got {}",
                    self.requirements.overall_minimum
                ),
            });
        }
        for (dimension, requirement) in &self.requirements.dimension_requirements {
            if !(0.0..=dimension.ceiling()).contains(&requirement.minimum_score) {
                return Err(StandardsError::InvalidStandard {
                    message: format!(
                        "minimum_score for {dimension} must be in [0, {}], got {}",
                        dimension.ceiling(),
                        requirement.minimum_score
                    ),
                });
            }
        }
        Ok(())
    }
}
