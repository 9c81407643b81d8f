//! Error types for the engine
//!
//! Only faults that stop a run live here: bad configuration, a missing
//! root, a broken template. Everything found while validating is a
//! [`tracemark_artifact::ValidationError`] in the report instead.

use std::path::PathBuf;
use tracemark_artifact::KindError;
use tracemark_parser::ParseError;
use tracemark_template::TemplateError;

/// Main engine error type
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration is unusable
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Input roots could not be walked
    #[error("ingress failed: {0}")]
    Ingress(#[from] ParseError),

    /// Template could not be loaded
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    /// Parser thread pool could not start
    #[error("cannot start parser pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    /// Focused artifact is not among the validated inputs
    #[error("artifact not found under the configured roots: {0}")]
    UnknownArtifact(PathBuf),

    /// Report could not be serialized
    #[error("report serialization failed: {0}")]
    Report(#[from] serde_json::Error),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config is not valid TOML for this schema
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Kind pattern is not a valid glob
    #[error(transparent)]
    Kind(#[from] KindError),

    /// Value out of range
    #[error("invalid config value for `{key}`: {message}")]
    Invalid { key: &'static str, message: String },
}

impl ConfigError {
    /// Create out-of-range error
    #[inline]
    pub fn invalid(key: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            message: message.into(),
        }
    }
}
