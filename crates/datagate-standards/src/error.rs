use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum StandardsError {
    #[error("failed to read standard {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML standard {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to parse JSON standard {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize standard: {message}")]
    Serialize { message: String },

    #[error("standard file not found: {path}")]
    MissingFile { path: PathBuf },

    #[error("invalid standard: {message}")]
    InvalidStandard { message: String },

    #[error("invalid config for rule '{rule}': {message}")]
    InvalidRuleConfig { rule: String, message: String },

    #[error("unknown rule type: {kind}")]
    UnknownRuleType { kind: String },
}

impl StandardsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
