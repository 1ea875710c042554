//! The audit record: one write-once document per assessment, with flat
//! and tabular export shapes.

use std::collections::BTreeMap;

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use sha2::{Digest, Sha256};

use datagate_model::{AssessmentReport, Dimension, GateAction};

use crate::error::AuditError;

/// Caller identity for a guarded invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub function_name: String,
    pub module_path: String,
    pub environment: String,
}

/// What is known about the assessed data without retaining it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataInfo {
    /// Human-readable description (e.g. "orders export 2026-08-30").
    pub description: String,
    /// Explicit content checksum; when absent the description is hashed
    /// instead so raw data is never required.
    pub checksum: Option<String>,
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<String>,
    /// Optional value samples, stripped on export when privacy settings
    /// disallow them.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub samples: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub duration_ms: u64,
    pub rows_per_second: f64,
    pub rule_count: usize,
}

impl PerformanceMetrics {
    pub fn derive(duration_ms: u64, rows: usize, rule_count: usize) -> Self {
        let rows_per_second = if duration_ms == 0 {
            0.0
        } else {
            rows as f64 / (duration_ms as f64 / 1000.0)
        };
        Self {
            duration_ms,
            rows_per_second,
            rule_count,
        }
    }
}

/// One failed rule, denormalized for the audit surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedCheck {
    pub rule: String,
    pub dimension: Dimension,
    pub score: f64,
    pub weight: f64,
    pub narrative: String,
}

impl FailedCheck {
    /// Collect every failed rule from a report's execution log.
    pub fn from_report(report: &AssessmentReport) -> Vec<FailedCheck> {
        report
            .rule_execution_log
            .iter()
            .filter(|r| !r.valid)
            .map(|r| FailedCheck {
                rule: r.rule.clone(),
                dimension: r.dimension,
                score: r.score,
                weight: r.weight,
                narrative: r.narrative.clone(),
            })
            .collect()
    }
}

/// Scoring summary handed to the trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentOutcome {
    pub overall_score: f64,
    pub passed: bool,
    pub dimension_scores: BTreeMap<Dimension, f64>,
    pub standard_id: String,
    pub standard_version: String,
    pub standard_path: String,
    pub standard_checksum: String,
    pub action: GateAction,
}

impl AssessmentOutcome {
    pub fn from_report(report: &AssessmentReport, action: GateAction) -> Self {
        Self {
            overall_score: report.overall_score,
            passed: report.passed,
            dimension_scores: report
                .dimension_scores
                .iter()
                .map(|(dimension, score)| (*dimension, score.earned))
                .collect(),
            standard_id: String::new(),
            standard_version: String::new(),
            standard_path: String::new(),
            standard_checksum: String::new(),
            action,
        }
    }

    pub fn with_standard(
        mut self,
        id: impl Into<String>,
        version: impl Into<String>,
        path: impl Into<String>,
        checksum: impl Into<String>,
    ) -> Self {
        self.standard_id = id.into();
        self.standard_version = version.into();
        self.standard_path = path.into();
        self.standard_checksum = checksum.into();
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentMetadata {
    pub assessment_id: String,
    pub timestamp: String,
    pub engine_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardApplied {
    pub id: String,
    pub version: String,
    pub path: String,
    pub checksum: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataFingerprint {
    pub checksum: String,
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub samples: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentResults {
    pub overall_score: f64,
    pub passed: bool,
    pub dimension_scores: BTreeMap<Dimension, f64>,
    pub failed_checks: Vec<FailedCheck>,
}

/// Write-once record of one assessment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub assessment_metadata: AssessmentMetadata,
    pub execution_context: ExecutionContext,
    pub standard_applied: StandardApplied,
    pub data_fingerprint: DataFingerprint,
    pub assessment_results: AssessmentResults,
    pub performance_metrics: PerformanceMetrics,
    pub action_taken: GateAction,
}

impl AuditRecord {
    pub fn build(
        outcome: &AssessmentOutcome,
        context: &ExecutionContext,
        data: &DataInfo,
        performance: Option<PerformanceMetrics>,
        failed_checks: &[FailedCheck],
    ) -> AuditRecord {
        AuditRecord {
            assessment_metadata: AssessmentMetadata {
                assessment_id: generate_id(),
                timestamp: Utc::now().to_rfc3339(),
                engine_version: env!("CARGO_PKG_VERSION").to_string(),
            },
            execution_context: context.clone(),
            standard_applied: StandardApplied {
                id: outcome.standard_id.clone(),
                version: outcome.standard_version.clone(),
                path: outcome.standard_path.clone(),
                checksum: outcome.standard_checksum.clone(),
            },
            data_fingerprint: DataFingerprint {
                checksum: data
                    .checksum
                    .clone()
                    .unwrap_or_else(|| sha256_hex(data.description.as_bytes())),
                row_count: data.row_count,
                column_count: data.column_count,
                columns: data.columns.clone(),
                samples: data.samples.clone(),
            },
            assessment_results: AssessmentResults {
                overall_score: outcome.overall_score,
                passed: outcome.passed,
                dimension_scores: outcome.dimension_scores.clone(),
                failed_checks: failed_checks.to_vec(),
            },
            performance_metrics: performance.unwrap_or_default(),
            action_taken: outcome.action,
        }
    }

    /// Serialize, stripping sample-data keys when `include_samples` is
    /// off. The strip is recursive so nested structures cannot leak.
    pub fn to_json(&self, include_samples: bool) -> Result<JsonValue, AuditError> {
        let mut value = serde_json::to_value(self).map_err(|e| AuditError::Serialize {
            message: e.to_string(),
        })?;
        if !include_samples {
            strip_sample_keys(&mut value);
        }
        Ok(value)
    }

    /// Flat key/value shape for structured-log consumption, nested paths
    /// joined with dots.
    pub fn to_flat_map(
        &self,
        include_samples: bool,
    ) -> Result<BTreeMap<String, JsonValue>, AuditError> {
        let value = self.to_json(include_samples)?;
        let mut flat = BTreeMap::new();
        flatten("", &value, &mut flat);
        Ok(flat)
    }

    /// Normalized 3-table shape: one main row, one row per dimension
    /// score, one row per failed check.
    pub fn to_tables(&self) -> AuditTables {
        let id = &self.assessment_metadata.assessment_id;
        let mut main = BTreeMap::new();
        main.insert("assessment_id".to_string(), json!(id));
        main.insert(
            "timestamp".to_string(),
            json!(self.assessment_metadata.timestamp),
        );
        main.insert(
            "function_name".to_string(),
            json!(self.execution_context.function_name),
        );
        main.insert(
            "environment".to_string(),
            json!(self.execution_context.environment),
        );
        main.insert("standard_id".to_string(), json!(self.standard_applied.id));
        main.insert(
            "standard_version".to_string(),
            json!(self.standard_applied.version),
        );
        main.insert(
            "data_checksum".to_string(),
            json!(self.data_fingerprint.checksum),
        );
        main.insert(
            "row_count".to_string(),
            json!(self.data_fingerprint.row_count),
        );
        main.insert(
            "overall_score".to_string(),
            json!(self.assessment_results.overall_score),
        );
        main.insert("passed".to_string(), json!(self.assessment_results.passed));
        main.insert("action_taken".to_string(), json!(self.action_taken));
        main.insert(
            "duration_ms".to_string(),
            json!(self.performance_metrics.duration_ms),
        );
        main.insert(
            "rows_per_second".to_string(),
            json!(self.performance_metrics.rows_per_second),
        );

        let dimensions = self
            .assessment_results
            .dimension_scores
            .iter()
            .map(|(dimension, earned)| {
                let mut row = BTreeMap::new();
                row.insert("assessment_id".to_string(), json!(id));
                row.insert("dimension".to_string(), json!(dimension));
                row.insert("earned".to_string(), json!(earned));
                row.insert("ceiling".to_string(), json!(dimension.ceiling()));
                row
            })
            .collect();

        let failed_checks = self
            .assessment_results
            .failed_checks
            .iter()
            .map(|check| {
                let mut row = BTreeMap::new();
                row.insert("assessment_id".to_string(), json!(id));
                row.insert("rule".to_string(), json!(check.rule));
                row.insert("dimension".to_string(), json!(check.dimension));
                row.insert("score".to_string(), json!(check.score));
                row.insert("weight".to_string(), json!(check.weight));
                row.insert("narrative".to_string(), json!(check.narrative));
                row
            })
            .collect();

        AuditTables {
            main,
            dimensions,
            failed_checks,
        }
    }
}

/// The 3-table export shape.
#[derive(Debug, Clone)]
pub struct AuditTables {
    pub main: BTreeMap<String, JsonValue>,
    pub dimensions: Vec<BTreeMap<String, JsonValue>>,
    pub failed_checks: Vec<BTreeMap<String, JsonValue>>,
}

/// `audit_<yyyymmddHHMMSS>_<6 hex chars>`.
fn generate_id() -> String {
    let stamp = Utc::now().format("%Y%m%d%H%M%S");
    let suffix: u32 = rand::thread_rng().gen_range(0..0x0100_0000);
    format!("audit_{stamp}_{suffix:06x}")
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Remove any object key containing "sample", recursively.
fn strip_sample_keys(value: &mut JsonValue) {
    match value {
        JsonValue::Object(map) => {
            map.retain(|key, _| !key.to_lowercase().contains("sample"));
            for child in map.values_mut() {
                strip_sample_keys(child);
            }
        }
        JsonValue::Array(items) => {
            for item in items {
                strip_sample_keys(item);
            }
        }
        _ => {}
    }
}

fn flatten(prefix: &str, value: &JsonValue, out: &mut BTreeMap<String, JsonValue>) {
    match value {
        JsonValue::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(&path, child, out);
            }
        }
        JsonValue::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten(&format!("{prefix}.{index}"), item, out);
            }
        }
        leaf => {
            out.insert(prefix.to_string(), leaf.clone());
        }
    }
}
