//! Guard policy configuration and the per-call request shape.

use std::path::PathBuf;

use datagate_audit::AuditConfig;

/// What happens when the data fails its readiness threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureMode {
    /// Block the call with a structured error.
    #[default]
    Raise,
    /// Log a warning and run the call anyway.
    Warn,
}

#[derive(Debug, Clone)]
pub struct GuardConfig {
    /// Directory where resolved-by-name and generated standards live.
    pub standards_dir: PathBuf,
    /// Requested pass threshold seeded into generated standards.
    pub default_minimum: f64,
    /// Overrides both the standard and the default when set.
    pub minimum_override: Option<f64>,
    pub failure_mode: FailureMode,
    /// Row cap handed to the profiler when a standard must be generated.
    pub sample_rows: usize,
    pub audit: AuditConfig,
    /// Reported in audit records (e.g. "production", "staging").
    pub environment: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            standards_dir: PathBuf::from("standards"),
            default_minimum: 75.0,
            minimum_override: None,
            failure_mode: FailureMode::default(),
            sample_rows: 1000,
            audit: AuditConfig::default(),
            environment: "development".to_string(),
        }
    }
}

/// Identity of one guarded invocation; drives standard resolution and
/// the audit trail's execution context.
#[derive(Debug, Clone)]
pub struct GuardRequest {
    pub function_name: String,
    /// Name of the guarded function's data argument, used in the
    /// auto-derived standard name.
    pub data_param: String,
    pub module_path: String,
    /// Explicit standard file; takes precedence over everything else.
    pub standard_path: Option<PathBuf>,
    /// Logical standard name, resolved inside `standards_dir`.
    pub standard_name: Option<String>,
}

impl GuardRequest {
    pub fn new(function_name: impl Into<String>) -> Self {
        Self {
            function_name: function_name.into(),
            data_param: "data".to_string(),
            module_path: String::new(),
            standard_path: None,
            standard_name: None,
        }
    }

    #[must_use]
    pub fn with_data_param(mut self, data_param: impl Into<String>) -> Self {
        self.data_param = data_param.into();
        self
    }

    #[must_use]
    pub fn with_module_path(mut self, module_path: impl Into<String>) -> Self {
        self.module_path = module_path.into();
        self
    }

    #[must_use]
    pub fn with_standard_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.standard_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_standard_name(mut self, name: impl Into<String>) -> Self {
        self.standard_name = Some(name.into());
        self
    }

    /// `{function_name}_{data_param}_standard`, the fallback identity
    /// when neither a path nor a name is given.
    pub fn derived_standard_name(&self) -> String {
        format!("{}_{}_standard", self.function_name, self.data_param)
    }
}
