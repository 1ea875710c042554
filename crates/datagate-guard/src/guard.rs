//! The protection guard: resolve a standard, ensure one exists, assess
//! the frame, decide, log, and either run the guarded call or block it.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use polars::prelude::{AnyValue, DataFrame};
use tracing::{debug, info, trace, warn};

use datagate_audit::{
    AssessmentOutcome, AuditLogger, DataInfo, ExecutionContext, FailedCheck, PerformanceMetrics,
};
use datagate_frame::{is_missing_value, value_to_string};
use datagate_model::{AssessmentReport, GateAction, ProtectionDecision};
use datagate_rules::Assessor;
use datagate_standards::generator::GenerationOptions;
use datagate_standards::{rule_catalog, LoadedStandard, StandardCache};

use crate::config::{FailureMode, GuardConfig, GuardRequest};
use crate::error::{readiness_level, GuardError};
use crate::logging::redact_value;
use crate::profile::{DatasetProfiler, DefaultGenerator, FrameProfiler, StandardGenerator};

/// Findings surfaced in a blocking error.
const FINDING_CAP: usize = 5;
/// Per-column values retained as audit samples.
const SAMPLE_CAP: usize = 3;

/// Result of a guarded call that was allowed (or warned) through.
#[derive(Debug)]
pub struct GuardOutcome<T> {
    pub value: T,
    pub report: AssessmentReport,
    pub decision: ProtectionDecision,
}

pub struct ProtectionGuard {
    config: GuardConfig,
    cache: StandardCache,
    assessor: Assessor,
    audit: AuditLogger,
    profiler: Box<dyn DatasetProfiler + Send + Sync>,
    generator: Box<dyn StandardGenerator + Send + Sync>,
}

impl ProtectionGuard {
    pub fn new(config: GuardConfig) -> Self {
        let audit = AuditLogger::new(config.audit.clone());
        let generation = GenerationOptions {
            overall_minimum: config.default_minimum,
            ..GenerationOptions::default()
        };
        Self {
            config,
            cache: StandardCache::new(),
            assessor: Assessor::new(),
            audit,
            profiler: Box::new(FrameProfiler),
            generator: Box::new(DefaultGenerator::new(generation)),
        }
    }

    #[must_use]
    pub fn with_profiler(mut self, profiler: Box<dyn DatasetProfiler + Send + Sync>) -> Self {
        self.profiler = profiler;
        self
    }

    #[must_use]
    pub fn with_generator(mut self, generator: Box<dyn StandardGenerator + Send + Sync>) -> Self {
        self.generator = generator;
        self
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    /// Guard one invocation. The frame is assessed against the resolved
    /// standard before `f` runs; a failing frame either blocks the call
    /// or lets it through with a warning, per the configured failure
    /// mode. Every path leaves an audit record.
    pub fn protect<T, F>(
        &self,
        request: &GuardRequest,
        df: &DataFrame,
        f: F,
    ) -> Result<GuardOutcome<T>, GuardError>
    where
        F: FnOnce(&DataFrame) -> T,
    {
        let path = self.resolve_standard_path(request);
        let loaded = self.ensure_standard(&path, request, df)?;

        let specs = rule_catalog(&loaded.standard)?;
        let minimum = self
            .config
            .minimum_override
            .unwrap_or(loaded.standard.requirements.overall_minimum);
        let report = self.assessor.assess_with_minimum(df, &specs, minimum);

        let (action, reason) = self.decide(&report, minimum);
        let decision = ProtectionDecision::new(action, reason);
        debug!(
            function = %request.function_name,
            standard = %loaded.standard.standards.id,
            overall_score = report.overall_score,
            action = %action,
            "protection decision"
        );

        self.log_outcome(request, df, &loaded, &report, action);

        match action {
            GateAction::Blocked => Err(GuardError::QualityInsufficient {
                overall_score: report.overall_score,
                required_score: minimum,
                readiness_level: readiness_level(report.overall_score),
                top_findings: report
                    .top_findings(FINDING_CAP)
                    .iter()
                    .map(|r| r.narrative.clone())
                    .collect(),
            }),
            GateAction::Warned => {
                warn!(
                    function = %request.function_name,
                    overall_score = report.overall_score,
                    required_score = minimum,
                    "data readiness below threshold, proceeding in warn mode"
                );
                Ok(GuardOutcome {
                    value: f(df),
                    report,
                    decision,
                })
            }
            GateAction::Allowed => Ok(GuardOutcome {
                value: f(df),
                report,
                decision,
            }),
        }
    }

    /// Explicit path wins, then a name under `standards_dir`, then the
    /// derived `{function}_{param}_standard` name.
    fn resolve_standard_path(&self, request: &GuardRequest) -> PathBuf {
        if let Some(path) = &request.standard_path {
            return path.clone();
        }
        let name = request
            .standard_name
            .clone()
            .unwrap_or_else(|| request.derived_standard_name());
        self.config.standards_dir.join(format!("{name}.toml"))
    }

    /// Load the standard at `path`, generating one from the frame when
    /// the file does not exist yet.
    fn ensure_standard(
        &self,
        path: &std::path::Path,
        request: &GuardRequest,
        df: &DataFrame,
    ) -> Result<Arc<LoadedStandard>, GuardError> {
        if !path.exists() {
            let id = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| request.derived_standard_name());
            info!(standard = %id, path = %path.display(), "no standard found, generating one");

            let profile = self.profiler.profile(df, self.config.sample_rows)?;
            let standard = self.generator.generate(&id, &profile)?;
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        datagate_standards::StandardsError::Io {
                            path: path.to_path_buf(),
                            source: e,
                        }
                    })?;
                }
            }
            standard.write_toml(path)?;
        }
        Ok(self.cache.load(path)?)
    }

    fn decide(&self, report: &AssessmentReport, minimum: f64) -> (GateAction, String) {
        if report.passed {
            return (
                GateAction::Allowed,
                format!(
                    "overall score {:.1} meets required {minimum:.1}",
                    report.overall_score
                ),
            );
        }
        let reason = format!(
            "overall score {:.1} below required {minimum:.1}",
            report.overall_score
        );
        match self.config.failure_mode {
            FailureMode::Raise => (GateAction::Blocked, reason),
            FailureMode::Warn => (GateAction::Warned, reason),
        }
    }

    /// Audit failures never change the protection outcome.
    fn log_outcome(
        &self,
        request: &GuardRequest,
        df: &DataFrame,
        loaded: &LoadedStandard,
        report: &AssessmentReport,
        action: GateAction,
    ) {
        let outcome = AssessmentOutcome::from_report(report, action).with_standard(
            loaded.standard.standards.id.clone(),
            loaded.standard.standards.version.clone(),
            loaded.path.display().to_string(),
            loaded.checksum.clone(),
        );
        let context = ExecutionContext {
            function_name: request.function_name.clone(),
            module_path: request.module_path.clone(),
            environment: self.config.environment.clone(),
        };
        let row_trace = tracing::event_enabled!(tracing::Level::TRACE);
        let samples = if self.config.audit.include_data_samples || row_trace {
            collect_samples(df)
        } else {
            BTreeMap::new()
        };
        if row_trace {
            for (column, values) in &samples {
                for value in values {
                    trace!(column = %column, value = redact_value(value), "sampled value");
                }
            }
        }
        let data = DataInfo {
            description: format!("{}({})", request.function_name, request.data_param),
            checksum: None,
            row_count: df.height(),
            column_count: df.width(),
            columns: df
                .get_column_names_owned()
                .iter()
                .map(|n| n.to_string())
                .collect(),
            samples: if self.config.audit.include_data_samples {
                samples
            } else {
                BTreeMap::new()
            },
        };
        let performance = performance_from_report(report);
        let failed = FailedCheck::from_report(report);

        if let Err(e) = self
            .audit
            .log_assessment(&outcome, &context, &data, performance, &failed)
        {
            warn!(error = %e, "failed to write audit record");
        }
    }
}

fn performance_from_report(report: &AssessmentReport) -> Option<PerformanceMetrics> {
    let duration_ms = report.metadata.get("duration_ms")?.as_u64()?;
    let rows = report
        .metadata
        .get("row_count")
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as usize;
    let rule_count = report
        .metadata
        .get("rule_count")
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as usize;
    Some(PerformanceMetrics::derive(duration_ms, rows, rule_count))
}

/// First few non-missing values of each column.
fn collect_samples(df: &DataFrame) -> BTreeMap<String, Vec<String>> {
    let mut samples = BTreeMap::new();
    for name in df.get_column_names_owned() {
        let Ok(series) = df.column(&name) else {
            continue;
        };
        let mut values = Vec::new();
        for idx in 0..df.height() {
            if values.len() >= SAMPLE_CAP {
                break;
            }
            let value = series.get(idx).unwrap_or(AnyValue::Null);
            if !is_missing_value(&value) {
                values.push(value_to_string(&value));
            }
        }
        if !values.is_empty() {
            samples.insert(name.to_string(), values);
        }
    }
    samples
}
