//! Error types for template loading

use std::path::PathBuf;
use tracemark_artifact::ArtifactKind;

/// Errors while loading templates
///
/// Templates are configuration: a broken template stops the run instead of
/// producing findings.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// Template directory does not exist
    #[error("template directory does not exist: {0}")]
    MissingDir(PathBuf),

    /// IO error reading a template
    #[error("io error reading template {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Frontmatter absent or without `kind`
    #[error("template {0} declares no `kind` in its frontmatter")]
    MissingKind(PathBuf),

    /// Frontmatter is not valid YAML or has the wrong shape
    #[error("invalid frontmatter in template {path}: {message}")]
    Frontmatter { path: PathBuf, message: String },

    /// Marker syntax error inside the template
    #[error("malformed template {path} at line {line}: {message}")]
    Malformed {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// Two templates claim the same kind
    #[error("templates {first} and {second} both declare kind {kind}")]
    DuplicateKind {
        kind: ArtifactKind,
        first: PathBuf,
        second: PathBuf,
    },
}

impl TemplateError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
