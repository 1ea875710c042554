//! Rule catalog: the closed set of check kinds and their derivation from
//! a standard.
//!
//! A `RuleSpec` is one executable rule instance: a name, the dimension it
//! scores into, its weight, and a typed `CheckKind`. Specs come from two
//! sources: derived from a standard's field requirements, and explicitly
//! configured `requirements.rules` entries resolved through
//! [`CheckKind::from_config`] (the rule-type registry).

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use datagate_model::Dimension;

use crate::error::StandardsError;
use crate::standard::{ExpectedType, FieldRequirement, RuleConfig, Standard};

/// One executable rule instance.
#[derive(Debug, Clone)]
pub struct RuleSpec {
    pub name: String,
    pub dimension: Dimension,
    pub weight: f64,
    pub check: CheckKind,
}

/// The closed catalog of quality checks, one variant per rule type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CheckKind {
    // -- validity --
    TypeConsistency {
        column: String,
        expected: ExpectedType,
        threshold: f64,
    },
    AllowedValues {
        column: String,
        allowed: Vec<String>,
        case_insensitive: bool,
    },
    FormatPattern {
        column: String,
        pattern: String,
    },
    LengthBounds {
        column: String,
        min_length: Option<usize>,
        max_length: Option<usize>,
    },
    PrimaryKeyUnique {
        columns: Vec<String>,
    },

    // -- completeness --
    RequiredFields {
        fields: Vec<String>,
        threshold: f64,
    },
    PopulationDensity {
        threshold: f64,
        column_threshold: f64,
    },
    SchemaCompleteness {
        expected_fields: Vec<String>,
        case_insensitive: bool,
        allow_extra: bool,
    },

    // -- consistency --
    CrossField {
        mode: CrossFieldMode,
    },
    CalculationConsistency {
        expression: String,
        target_column: String,
        tolerance: f64,
    },
    UniformRepresentation {
        column: String,
        format: UniformFormat,
    },

    // -- freshness --
    Recency {
        column: String,
        max_age_days: i64,
        as_of: Option<NaiveDate>,
    },
    LastUpdateWithin {
        column: String,
        max_age_days: i64,
        as_of: Option<NaiveDate>,
    },

    // -- plausibility --
    OutlierDetection {
        column: String,
        method: OutlierMethod,
        threshold: f64,
        multiplier: f64,
        exclude_outliers: bool,
    },
    ValueDistribution {
        column: String,
        distribution: Distribution,
        p_threshold: f64,
    },
    RangeCheck {
        column: String,
        min: Option<f64>,
        max: Option<f64>,
        log_scale: bool,
        quantile_bounds: Option<(f64, f64)>,
    },
    PatternFrequency {
        column: String,
        min_frequency: Option<f64>,
        max_frequency: Option<f64>,
        expected_frequencies: BTreeMap<String, f64>,
        tolerance: f64,
        max_distinct: Option<usize>,
    },
}

/// Cross-field consistency operates in one of two modes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CrossFieldMode {
    /// A boolean expression over named columns, evaluated per row.
    Expression(String),
    /// A list of field-operator-field comparisons, evaluated per row.
    Comparisons(Vec<FieldComparison>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldComparison {
    pub field1: String,
    pub operator: ComparisonOp,
    pub field2: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOp {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
}

impl ComparisonOp {
    pub fn as_str(self) -> &'static str {
        match self {
            ComparisonOp::Eq => "==",
            ComparisonOp::Ne => "!=",
            ComparisonOp::Lt => "<",
            ComparisonOp::Le => "<=",
            ComparisonOp::Gt => ">",
            ComparisonOp::Ge => ">=",
        }
    }

    pub fn parse(text: &str) -> Option<ComparisonOp> {
        match text.trim() {
            "==" | "=" => Some(ComparisonOp::Eq),
            "!=" => Some(ComparisonOp::Ne),
            "<" => Some(ComparisonOp::Lt),
            "<=" => Some(ComparisonOp::Le),
            ">" => Some(ComparisonOp::Gt),
            ">=" => Some(ComparisonOp::Ge),
            _ => None,
        }
    }
}

/// Uniform-representation conformity modes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum UniformFormat {
    Pattern(String),
    Categorical {
        allowed: Vec<String>,
        case_insensitive: bool,
    },
    Length(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierMethod {
    Zscore,
    ModifiedZscore,
    Iqr,
}

/// Theoretical distribution for goodness-of-fit testing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Distribution {
    Normal { mean: f64, std_dev: f64 },
    Uniform { min: f64, max: f64 },
    Categorical { probabilities: BTreeMap<String, f64> },
}

impl CheckKind {
    /// The rule-type registry: resolve a type identifier plus a raw
    /// [`RuleConfig`] into a typed check. Config validation happens here,
    /// lazily, per rule.
    pub fn from_config(kind: &str, config: &RuleConfig) -> Result<CheckKind, StandardsError> {
        let cfg = Config { kind, config };
        match kind {
            "type_consistency" => Ok(CheckKind::TypeConsistency {
                column: cfg.require_str("column")?,
                expected: cfg.expected_type("expected")?,
                threshold: cfg.f64_or("threshold", 1.0)?,
            }),
            "allowed_values" => Ok(CheckKind::AllowedValues {
                column: cfg.require_str("column")?,
                allowed: cfg.require_str_list("allowed")?,
                case_insensitive: cfg.bool_or("case_insensitive", false)?,
            }),
            "format_pattern" => Ok(CheckKind::FormatPattern {
                column: cfg.require_str("column")?,
                pattern: cfg.require_str("pattern")?,
            }),
            "length_bounds" => Ok(CheckKind::LengthBounds {
                column: cfg.require_str("column")?,
                min_length: cfg.opt_usize("min_length")?,
                max_length: cfg.opt_usize("max_length")?,
            }),
            "primary_key_unique" => Ok(CheckKind::PrimaryKeyUnique {
                columns: cfg.require_str_list("columns")?,
            }),
            "required_fields" => Ok(CheckKind::RequiredFields {
                fields: cfg.require_str_list("fields")?,
                threshold: cfg.f64_or("threshold", 1.0)?,
            }),
            "population_density" => Ok(CheckKind::PopulationDensity {
                threshold: cfg.f64_or("threshold", 0.9)?,
                column_threshold: cfg.f64_or("column_threshold", 0.5)?,
            }),
            "schema_completeness" => Ok(CheckKind::SchemaCompleteness {
                expected_fields: cfg.require_str_list("expected_fields")?,
                case_insensitive: cfg.bool_or("case_insensitive", true)?,
                allow_extra: cfg.bool_or("allow_extra", true)?,
            }),
            "cross_field" => {
                let mode = if let Some(expression) = cfg.opt_str("expression")? {
                    CrossFieldMode::Expression(expression)
                } else {
                    CrossFieldMode::Comparisons(cfg.comparisons("comparisons")?)
                };
                Ok(CheckKind::CrossField { mode })
            }
            "calculation_consistency" => Ok(CheckKind::CalculationConsistency {
                expression: cfg.require_str("expression")?,
                target_column: cfg.require_str("target_column")?,
                tolerance: cfg.f64_or("tolerance", 1e-9)?,
            }),
            "uniform_representation" => {
                let format = if let Some(pattern) = cfg.opt_str("pattern")? {
                    UniformFormat::Pattern(pattern)
                } else if let Some(length) = cfg.opt_usize("length")? {
                    UniformFormat::Length(length)
                } else {
                    UniformFormat::Categorical {
                        allowed: cfg.require_str_list("allowed")?,
                        case_insensitive: cfg.bool_or("case_insensitive", false)?,
                    }
                };
                Ok(CheckKind::UniformRepresentation {
                    column: cfg.require_str("column")?,
                    format,
                })
            }
            "recency" => Ok(CheckKind::Recency {
                column: cfg.require_str("column")?,
                max_age_days: cfg.require_i64("max_age_days")?,
                as_of: cfg.opt_date("as_of")?,
            }),
            "last_update_within" => Ok(CheckKind::LastUpdateWithin {
                column: cfg.require_str("column")?,
                max_age_days: cfg.require_i64("max_age_days")?,
                as_of: cfg.opt_date("as_of")?,
            }),
            "outlier_detection" => Ok(CheckKind::OutlierDetection {
                column: cfg.require_str("column")?,
                method: cfg.outlier_method("method")?,
                threshold: cfg.f64_or("threshold", 3.0)?,
                multiplier: cfg.f64_or("multiplier", 1.5)?,
                exclude_outliers: cfg.bool_or("exclude_outliers", true)?,
            }),
            "value_distribution" => Ok(CheckKind::ValueDistribution {
                column: cfg.require_str("column")?,
                distribution: cfg.distribution("distribution")?,
                p_threshold: cfg.f64_or("p_threshold", 0.05)?,
            }),
            "range_check" => Ok(CheckKind::RangeCheck {
                column: cfg.require_str("column")?,
                min: cfg.opt_f64("min")?,
                max: cfg.opt_f64("max")?,
                log_scale: cfg.bool_or("log_scale", false)?,
                quantile_bounds: cfg.quantile_bounds()?,
            }),
            "pattern_frequency" => Ok(CheckKind::PatternFrequency {
                column: cfg.require_str("column")?,
                min_frequency: cfg.opt_f64("min_frequency")?,
                max_frequency: cfg.opt_f64("max_frequency")?,
                expected_frequencies: cfg.frequency_map("expected_frequencies")?,
                tolerance: cfg.f64_or("tolerance", 0.05)?,
                max_distinct: cfg.opt_usize("max_distinct")?,
            }),
            other => Err(StandardsError::UnknownRuleType {
                kind: other.to_string(),
            }),
        }
    }

    /// Columns this check reads, used for per-field analysis.
    pub fn columns(&self) -> Vec<&str> {
        match self {
            CheckKind::TypeConsistency { column, .. }
            | CheckKind::AllowedValues { column, .. }
            | CheckKind::FormatPattern { column, .. }
            | CheckKind::LengthBounds { column, .. }
            | CheckKind::UniformRepresentation { column, .. }
            | CheckKind::Recency { column, .. }
            | CheckKind::LastUpdateWithin { column, .. }
            | CheckKind::OutlierDetection { column, .. }
            | CheckKind::ValueDistribution { column, .. }
            | CheckKind::RangeCheck { column, .. }
            | CheckKind::PatternFrequency { column, .. } => vec![column.as_str()],
            CheckKind::CalculationConsistency { target_column, .. } => {
                vec![target_column.as_str()]
            }
            CheckKind::PrimaryKeyUnique { columns } => {
                columns.iter().map(String::as_str).collect()
            }
            CheckKind::RequiredFields { fields, .. } => {
                fields.iter().map(String::as_str).collect()
            }
            CheckKind::CrossField { mode } => match mode {
                CrossFieldMode::Comparisons(comparisons) => comparisons
                    .iter()
                    .flat_map(|c| [c.field1.as_str(), c.field2.as_str()])
                    .collect(),
                CrossFieldMode::Expression(_) => Vec::new(),
            },
            CheckKind::PopulationDensity { .. } | CheckKind::SchemaCompleteness { .. } => {
                Vec::new()
            }
        }
    }
}

/// Derive the executable rule catalog for a standard.
///
/// Field requirements expand into validity/plausibility checks, the
/// mandatory-field list becomes the completeness backbone, and explicit
/// `requirements.rules` entries go through the registry. Weights are then
/// normalized so each dimension's rules sum to its 20-point ceiling.
pub fn rule_catalog(standard: &Standard) -> Result<Vec<RuleSpec>, StandardsError> {
    let requirements = &standard.requirements;
    let mut specs: Vec<RuleSpec> = Vec::new();

    if !requirements.mandatory_fields.is_empty() {
        specs.push(RuleSpec {
            name: "required_fields".to_string(),
            dimension: Dimension::Completeness,
            weight: 0.0,
            check: CheckKind::RequiredFields {
                fields: requirements.mandatory_fields.clone(),
                threshold: requirements.field_presence_threshold,
            },
        });
    }

    if !requirements.field_requirements.is_empty() {
        specs.push(RuleSpec {
            name: "schema_completeness".to_string(),
            dimension: Dimension::Completeness,
            weight: 0.0,
            check: CheckKind::SchemaCompleteness {
                expected_fields: requirements.field_requirements.keys().cloned().collect(),
                case_insensitive: true,
                allow_extra: true,
            },
        });
        specs.push(RuleSpec {
            name: "population_density".to_string(),
            dimension: Dimension::Completeness,
            weight: 0.0,
            check: CheckKind::PopulationDensity {
                threshold: requirements.field_presence_threshold,
                column_threshold: 0.5,
            },
        });
    }

    for (field, requirement) in &requirements.field_requirements {
        specs.extend(field_rules(field, requirement));
    }

    for definition in &requirements.rules {
        let check = CheckKind::from_config(&definition.rule_type, &definition.config)?;
        specs.push(RuleSpec {
            name: definition.name.clone(),
            dimension: definition.dimension,
            weight: definition.weight.unwrap_or(0.0),
            check,
        });
    }

    apply_weights(&mut specs, requirements);
    Ok(specs)
}

/// Expand one field requirement into its derived checks.
fn field_rules(field: &str, requirement: &FieldRequirement) -> Vec<RuleSpec> {
    let mut specs = Vec::new();

    if let Some(expected) = requirement.field_type {
        specs.push(RuleSpec {
            name: format!("type_consistency_{field}"),
            dimension: Dimension::Validity,
            weight: 0.0,
            check: CheckKind::TypeConsistency {
                column: field.to_string(),
                expected,
                threshold: 1.0,
            },
        });
    }
    if let Some(allowed) = &requirement.allowed_values {
        specs.push(RuleSpec {
            name: format!("allowed_values_{field}"),
            dimension: Dimension::Validity,
            weight: 0.0,
            check: CheckKind::AllowedValues {
                column: field.to_string(),
                allowed: allowed.clone(),
                case_insensitive: false,
            },
        });
    }
    if let Some(pattern) = &requirement.pattern {
        specs.push(RuleSpec {
            name: format!("format_pattern_{field}"),
            dimension: Dimension::Validity,
            weight: 0.0,
            check: CheckKind::FormatPattern {
                column: field.to_string(),
                pattern: pattern.clone(),
            },
        });
    }
    if requirement.min_length.is_some() || requirement.max_length.is_some() {
        specs.push(RuleSpec {
            name: format!("length_bounds_{field}"),
            dimension: Dimension::Validity,
            weight: 0.0,
            check: CheckKind::LengthBounds {
                column: field.to_string(),
                min_length: requirement.min_length,
                max_length: requirement.max_length,
            },
        });
    }
    if requirement.min_value.is_some() || requirement.max_value.is_some() {
        specs.push(RuleSpec {
            name: format!("range_check_{field}"),
            dimension: Dimension::Plausibility,
            weight: 0.0,
            check: CheckKind::RangeCheck {
                column: field.to_string(),
                min: requirement.min_value,
                max: requirement.max_value,
                log_scale: false,
                quantile_bounds: None,
            },
        });
    }

    specs
}

/// Assign weights so every dimension's rules sum to its ceiling.
///
/// Explicit weights (from `rule_weights` overrides or rule definitions)
/// are honored; the remaining ceiling is split equally among unweighted
/// rules. When explicit weights alone exceed the ceiling, everything is
/// scaled down proportionally.
fn apply_weights(specs: &mut [RuleSpec], requirements: &crate::standard::Requirements) {
    for spec in specs.iter_mut() {
        if let Some(dimension_requirement) =
            requirements.dimension_requirements.get(&spec.dimension)
        {
            if let Some(weight) = dimension_requirement.rule_weights.get(&spec.name) {
                spec.weight = *weight;
            }
        }
    }

    for dimension in Dimension::ALL {
        let ceiling = dimension.ceiling();
        let indices: Vec<usize> = specs
            .iter()
            .enumerate()
            .filter(|(_, s)| s.dimension == dimension)
            .map(|(i, _)| i)
            .collect();
        if indices.is_empty() {
            continue;
        }

        let explicit_total: f64 = indices
            .iter()
            .filter(|&&i| specs[i].weight > 0.0)
            .map(|&i| specs[i].weight)
            .sum();
        let unweighted: Vec<usize> = indices
            .iter()
            .copied()
            .filter(|&i| specs[i].weight <= 0.0)
            .collect();

        if explicit_total > ceiling {
            let scale = ceiling / explicit_total;
            for &i in &indices {
                specs[i].weight *= scale;
            }
            // Nothing left for unweighted rules; give them zero weight so
            // they still run and report without affecting the score.
            continue;
        }

        if !unweighted.is_empty() {
            let share = (ceiling - explicit_total) / unweighted.len() as f64;
            for i in unweighted {
                specs[i].weight = share;
            }
        }
    }
}

struct Config<'a> {
    kind: &'a str,
    config: &'a RuleConfig,
}

impl Config<'_> {
    fn get(&self, key: &str) -> Option<&JsonValue> {
        self.config.get(key)
    }

    fn invalid(&self, message: impl Into<String>) -> StandardsError {
        StandardsError::InvalidRuleConfig {
            rule: self.kind.to_string(),
            message: message.into(),
        }
    }

    fn require_str(&self, key: &str) -> Result<String, StandardsError> {
        self.opt_str(key)?
            .ok_or_else(|| self.invalid(format!("missing '{key}'")))
    }

    fn opt_str(&self, key: &str) -> Result<Option<String>, StandardsError> {
        match self.get(key) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(JsonValue::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(self.invalid(format!("'{key}' must be a string, got {other}"))),
        }
    }

    fn require_str_list(&self, key: &str) -> Result<Vec<String>, StandardsError> {
        match self.get(key) {
            Some(JsonValue::Array(items)) => items
                .iter()
                .map(|v| match v {
                    JsonValue::String(s) => Ok(s.clone()),
                    other => {
                        Err(self.invalid(format!("'{key}' entries must be strings, got {other}")))
                    }
                })
                .collect(),
            Some(other) => Err(self.invalid(format!("'{key}' must be a list, got {other}"))),
            None => Err(self.invalid(format!("missing '{key}'"))),
        }
    }

    fn opt_f64(&self, key: &str) -> Result<Option<f64>, StandardsError> {
        match self.get(key) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(JsonValue::Number(n)) => Ok(n.as_f64()),
            Some(other) => Err(self.invalid(format!("'{key}' must be a number, got {other}"))),
        }
    }

    fn f64_or(&self, key: &str, default: f64) -> Result<f64, StandardsError> {
        Ok(self.opt_f64(key)?.unwrap_or(default))
    }

    fn require_i64(&self, key: &str) -> Result<i64, StandardsError> {
        match self.get(key) {
            Some(JsonValue::Number(n)) => n
                .as_i64()
                .ok_or_else(|| self.invalid(format!("'{key}' must be an integer"))),
            Some(other) => Err(self.invalid(format!("'{key}' must be an integer, got {other}"))),
            None => Err(self.invalid(format!("missing '{key}'"))),
        }
    }

    fn opt_usize(&self, key: &str) -> Result<Option<usize>, StandardsError> {
        match self.get(key) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(JsonValue::Number(n)) => n
                .as_u64()
                .map(|v| Some(v as usize))
                .ok_or_else(|| self.invalid(format!("'{key}' must be a non-negative integer"))),
            Some(other) => Err(self.invalid(format!("'{key}' must be an integer, got {other}"))),
        }
    }

    fn bool_or(&self, key: &str, default: bool) -> Result<bool, StandardsError> {
        match self.get(key) {
            None | Some(JsonValue::Null) => Ok(default),
            Some(JsonValue::Bool(b)) => Ok(*b),
            Some(other) => Err(self.invalid(format!("'{key}' must be a boolean, got {other}"))),
        }
    }

    fn opt_date(&self, key: &str) -> Result<Option<NaiveDate>, StandardsError> {
        match self.opt_str(key)? {
            None => Ok(None),
            Some(text) => NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
                .map(Some)
                .map_err(|_| self.invalid(format!("'{key}' must be a YYYY-MM-DD date"))),
        }
    }

    fn expected_type(&self, key: &str) -> Result<ExpectedType, StandardsError> {
        match self.require_str(key)?.to_lowercase().as_str() {
            "numeric" | "number" | "float" | "integer" => Ok(ExpectedType::Numeric),
            "string" | "text" => Ok(ExpectedType::String),
            "boolean" | "bool" => Ok(ExpectedType::Boolean),
            "date" | "datetime" => Ok(ExpectedType::Date),
            other => Err(self.invalid(format!("unknown expected type '{other}'"))),
        }
    }

    fn outlier_method(&self, key: &str) -> Result<OutlierMethod, StandardsError> {
        match self
            .opt_str(key)?
            .unwrap_or_else(|| "zscore".to_string())
            .to_lowercase()
            .as_str()
        {
            "zscore" | "z_score" => Ok(OutlierMethod::Zscore),
            "modified_zscore" | "modified_z_score" => Ok(OutlierMethod::ModifiedZscore),
            "iqr" => Ok(OutlierMethod::Iqr),
            other => Err(self.invalid(format!("unknown outlier method '{other}'"))),
        }
    }

    fn distribution(&self, key: &str) -> Result<Distribution, StandardsError> {
        let Some(JsonValue::Object(spec)) = self.get(key) else {
            return Err(self.invalid(format!("missing or non-object '{key}'")));
        };
        let kind = spec
            .get("kind")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| self.invalid(format!("'{key}.kind' must be a string")))?;
        let num = |field: &str| -> Result<f64, StandardsError> {
            spec.get(field)
                .and_then(JsonValue::as_f64)
                .ok_or_else(|| self.invalid(format!("'{key}.{field}' must be a number")))
        };
        match kind.to_lowercase().as_str() {
            "normal" => Ok(Distribution::Normal {
                mean: num("mean")?,
                std_dev: num("std_dev")?,
            }),
            "uniform" => Ok(Distribution::Uniform {
                min: num("min")?,
                max: num("max")?,
            }),
            "categorical" => {
                let Some(JsonValue::Object(probabilities)) = spec.get("probabilities") else {
                    return Err(self.invalid(format!("'{key}.probabilities' must be an object")));
                };
                let mut out = BTreeMap::new();
                for (value, probability) in probabilities {
                    let p = probability.as_f64().ok_or_else(|| {
                        self.invalid(format!("probability for '{value}' must be a number"))
                    })?;
                    out.insert(value.clone(), p);
                }
                Ok(Distribution::Categorical { probabilities: out })
            }
            other => Err(self.invalid(format!("unknown distribution '{other}'"))),
        }
    }

    fn quantile_bounds(&self) -> Result<Option<(f64, f64)>, StandardsError> {
        let lower = self.opt_f64("lower_quantile")?;
        let upper = self.opt_f64("upper_quantile")?;
        match (lower, upper) {
            (None, None) => Ok(None),
            (Some(lo), Some(hi)) if (0.0..=1.0).contains(&lo) && (0.0..=1.0).contains(&hi) => {
                Ok(Some((lo, hi)))
            }
            _ => Err(self.invalid(
                "quantile bounds need both 'lower_quantile' and 'upper_quantile' in [0, 1]",
            )),
        }
    }

    fn frequency_map(&self, key: &str) -> Result<BTreeMap<String, f64>, StandardsError> {
        match self.get(key) {
            None | Some(JsonValue::Null) => Ok(BTreeMap::new()),
            Some(JsonValue::Object(entries)) => {
                let mut out = BTreeMap::new();
                for (value, frequency) in entries {
                    let f = frequency.as_f64().ok_or_else(|| {
                        self.invalid(format!("frequency for '{value}' must be a number"))
                    })?;
                    out.insert(value.clone(), f);
                }
                Ok(out)
            }
            Some(other) => Err(self.invalid(format!("'{key}' must be an object, got {other}"))),
        }
    }

    fn comparisons(&self, key: &str) -> Result<Vec<FieldComparison>, StandardsError> {
        let Some(JsonValue::Array(items)) = self.get(key) else {
            return Err(self.invalid(format!(
                "cross_field needs either 'expression' or a '{key}' list"
            )));
        };
        let mut out = Vec::new();
        for item in items {
            let Some(entry) = item.as_object() else {
                return Err(self.invalid(format!("'{key}' entries must be objects")));
            };
            let field = |name: &str| -> Result<String, StandardsError> {
                entry
                    .get(name)
                    .and_then(JsonValue::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| self.invalid(format!("comparison '{name}' must be a string")))
            };
            let operator_text = field("operator")?;
            let operator = ComparisonOp::parse(&operator_text)
                .ok_or_else(|| self.invalid(format!("unknown operator '{operator_text}'")))?;
            out.push(FieldComparison {
                field1: field("field1")?,
                operator,
                field2: field("field2")?,
            });
        }
        Ok(out)
    }
}
