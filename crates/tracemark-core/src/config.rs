//! Engine configuration
//!
//! Loaded from TOML; every field has a default so an empty file is valid.
//!
//! ```toml
//! artifact_roots = ["docs"]
//! code_roots = ["src"]
//! template_dir = "templates"
//!
//! [[kinds]]
//! name = "PRD"
//! patterns = ["**/PRD.md"]
//!
//! [identifiers]
//! prefix = "sys"
//!
//! [policies]
//! unknown_sections = "warn"
//! duplicate_definitions = "warn"
//! phase_order = "warn"
//!
//! [traceability]
//! mode = "full"
//!
//! [scoring]
//! threshold = 80.0
//!
//! [scoring.kinds.PRD]
//! structure = 40
//!
//! [io]
//! max_file_bytes = 10485760
//! read_timeout_ms = 5000
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracemark_artifact::{ArtifactKind, ErrorType, KindResolver, Policy};
use tracemark_parser::IngressConfig;
use tracemark_symbol::{IdGrammar, TraceabilityMode};
use tracemark_template::{Template, Weights};

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Directories or files holding artifacts
    pub artifact_roots: Vec<PathBuf>,
    /// Directories or files holding source code
    pub code_roots: Vec<PathBuf>,
    /// Extensions treated as artifacts
    pub artifact_extensions: Vec<String>,
    /// Directory of template documents
    pub template_dir: Option<PathBuf>,
    /// Kind path patterns
    pub kinds: Vec<KindConfig>,
    /// Identifier grammar options
    pub identifiers: IdentifierConfig,
    /// Severity policies
    pub policies: PolicyConfig,
    /// Code traceability options
    pub traceability: TraceabilityConfig,
    /// Score threshold and weights
    pub scoring: ScoringConfig,
    /// File loading limits
    pub io: IoConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            artifact_roots: Vec::new(),
            code_roots: Vec::new(),
            artifact_extensions: vec!["md".to_string()],
            template_dir: None,
            kinds: Vec::new(),
            identifiers: IdentifierConfig::default(),
            policies: PolicyConfig::default(),
            traceability: TraceabilityConfig::default(),
            scoring: ScoringConfig::default(),
            io: IoConfig::default(),
        }
    }
}

/// Path patterns for one artifact kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KindConfig {
    /// Kind name
    pub name: String,
    /// Glob patterns matched against artifact paths
    #[serde(default)]
    pub patterns: Vec<String>,
}

/// Identifier prefix used when none is configured
pub const DEFAULT_ID_PREFIX: &str = "sys";

/// Identifier grammar options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IdentifierConfig {
    /// Literal first segment every identifier must carry
    pub prefix: String,
}

impl Default for IdentifierConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_ID_PREFIX.to_string(),
        }
    }
}

/// Severity policies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    /// Blocks not declared by the template
    pub unknown_sections: Policy,
    /// Identifiers defined in more than one artifact
    pub duplicate_definitions: Policy,
    /// CDSL phases that decrease within a scope
    pub phase_order: Policy,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            unknown_sections: Policy::Warn,
            duplicate_definitions: Policy::Warn,
            phase_order: Policy::Warn,
        }
    }
}

/// Code traceability options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TraceabilityConfig {
    /// `full` or `docs-only`
    pub mode: TraceabilityMode,
}

/// Score threshold and weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoringConfig {
    /// Minimum passing score
    pub threshold: f64,
    /// Default weight table
    pub weights: Weights,
    /// Weight tables by kind
    pub kinds: BTreeMap<String, Weights>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            threshold: 80.0,
            weights: Weights::default(),
            kinds: BTreeMap::new(),
        }
    }
}

/// File loading limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IoConfig {
    /// Largest file read, in bytes
    pub max_file_bytes: u64,
    /// Per-read timeout in milliseconds
    pub read_timeout_ms: u64,
    /// Concurrent reads; defaults to available parallelism
    pub workers: Option<usize>,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: 10 * 1024 * 1024, // 10MB
            read_timeout_ms: 5_000,
            workers: None,
        }
    }
}

impl IoConfig {
    /// Limits for the ingress layer
    #[must_use]
    pub fn ingress(&self) -> IngressConfig {
        let defaults = IngressConfig::default();
        IngressConfig {
            max_file_bytes: self.max_file_bytes,
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            workers: self.workers.unwrap_or(defaults.workers),
        }
    }
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    /// Returns error if the TOML is malformed, has unknown keys or holds
    /// out-of-range values
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    ///
    /// Relative paths in the file are taken relative to the file's directory.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is invalid
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        Ok(match path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(base) => config.relative_to(base),
            None => config,
        })
    }

    /// Resolve relative roots against `base`
    #[must_use]
    pub fn relative_to(mut self, base: &Path) -> Self {
        let rebase = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        self.artifact_roots.iter_mut().for_each(rebase);
        self.code_roots.iter_mut().for_each(rebase);
        if let Some(dir) = self.template_dir.as_mut() {
            rebase(dir);
        }
        self
    }

    /// Check value ranges
    ///
    /// # Errors
    /// Returns the first out-of-range value
    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.scoring.threshold;
        if !(0.0..=100.0).contains(&threshold) {
            return Err(ConfigError::invalid(
                "scoring.threshold",
                format!("{threshold} is outside 0..=100"),
            ));
        }
        let tables = std::iter::once(&self.scoring.weights).chain(self.scoring.kinds.values());
        for weights in tables {
            for category in ErrorType::ALL {
                let w = weights.get(category);
                if !w.is_finite() || w < 0.0 {
                    return Err(ConfigError::invalid(
                        "scoring.weights",
                        format!("{category} weight {w} must be a non-negative number"),
                    ));
                }
            }
        }
        if self.artifact_extensions.is_empty() {
            return Err(ConfigError::invalid("artifact_extensions", "at least one extension is required"));
        }
        if self.io.workers == Some(0) {
            return Err(ConfigError::invalid("io.workers", "must be at least 1"));
        }
        let prefix = &self.identifiers.prefix;
        let ok = prefix.starts_with(|c: char| c.is_ascii_lowercase())
            && prefix.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
        if !ok {
            return Err(ConfigError::invalid(
                "identifiers.prefix",
                format!("'{prefix}' must be one lowercase kebab segment"),
            ));
        }
        Ok(())
    }

    /// Identifier grammar for this configuration
    #[must_use]
    pub fn grammar(&self) -> IdGrammar {
        IdGrammar::with_prefix(self.identifiers.prefix.clone())
    }

    /// Kind resolver built from the configured patterns
    ///
    /// # Errors
    /// Returns error if a pattern is not a valid glob
    pub fn kind_resolver(&self) -> Result<KindResolver, ConfigError> {
        let mut resolver = KindResolver::new();
        for kind in &self.kinds {
            resolver.add_rule(ArtifactKind::new(kind.name.as_str()), &kind.patterns)?;
        }
        Ok(resolver)
    }

    /// Weight table for a run whose artifacts all resolve to `kind`
    ///
    /// Configured per-kind table first, then the template's own table, then
    /// the default table.
    #[must_use]
    pub fn weights_for(&self, kind: &ArtifactKind, template: Option<&Template>) -> Weights {
        self.scoring
            .kinds
            .get(kind.as_str())
            .copied()
            .or_else(|| template.and_then(Template::weights).copied())
            .unwrap_or(self.scoring.weights)
    }

    /// Whether `path` has an artifact extension
    #[must_use]
    pub fn is_artifact(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.artifact_extensions.iter().any(|a| a.eq_ignore_ascii_case(ext)))
    }

    /// With an artifact root
    #[inline]
    #[must_use]
    pub fn with_artifact_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.artifact_roots.push(root.into());
        self
    }

    /// With a code root
    #[inline]
    #[must_use]
    pub fn with_code_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.code_roots.push(root.into());
        self
    }

    /// With template directory
    #[inline]
    #[must_use]
    pub fn with_template_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.template_dir = Some(dir.into());
        self
    }

    /// With a kind and its path patterns
    #[must_use]
    pub fn with_kind<I, S>(mut self, name: impl Into<String>, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.kinds.push(KindConfig {
            name: name.into(),
            patterns: patterns.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// With identifier prefix
    #[inline]
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.identifiers.prefix = prefix.into();
        self
    }

    /// With duplicate-definition policy
    #[inline]
    #[must_use]
    pub fn with_duplicate_definitions(mut self, policy: Policy) -> Self {
        self.policies.duplicate_definitions = policy;
        self
    }

    /// With default unknown-section policy
    #[inline]
    #[must_use]
    pub fn with_unknown_sections(mut self, policy: Policy) -> Self {
        self.policies.unknown_sections = policy;
        self
    }

    /// With CDSL phase-order policy
    #[inline]
    #[must_use]
    pub fn with_phase_order(mut self, policy: Policy) -> Self {
        self.policies.phase_order = policy;
        self
    }

    /// With traceability mode
    #[inline]
    #[must_use]
    pub fn with_traceability_mode(mut self, mode: TraceabilityMode) -> Self {
        self.traceability.mode = mode;
        self
    }

    /// With pass threshold
    #[inline]
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.scoring.threshold = threshold;
        self
    }

    /// With concurrent reads
    #[inline]
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.io.workers = Some(workers);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_toml_is_default() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.artifact_extensions, vec!["md"]);
        assert_eq!(config.identifiers.prefix, DEFAULT_ID_PREFIX);
        assert!((config.scoring.threshold - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn parses_full_document() {
        let text = r#"
artifact_roots = ["docs"]
code_roots = ["src"]
template_dir = "templates"

[[kinds]]
name = "PRD"
patterns = ["**/PRD.md"]

[identifiers]
prefix = "req"

[policies]
unknown_sections = "error"
duplicate_definitions = "allow"

[traceability]
mode = "docs-only"

[scoring]
threshold = 90.0

[scoring.weights]
structure = 50

[scoring.kinds.PRD]
cross-reference = 40

[io]
read_timeout_ms = 250
workers = 2
"#;
        let config = EngineConfig::from_toml_str(text).unwrap();
        assert_eq!(config.kinds[0].name, "PRD");
        assert_eq!(config.identifiers.prefix, "req");
        assert_eq!(config.policies.unknown_sections, Policy::Error);
        assert_eq!(config.policies.duplicate_definitions, Policy::Allow);
        assert_eq!(config.policies.phase_order, Policy::Warn);
        assert_eq!(config.traceability.mode, TraceabilityMode::DocsOnly);
        assert!((config.scoring.weights.structure - 50.0).abs() < f64::EPSILON);
        assert!((config.scoring.weights.file - 15.0).abs() < f64::EPSILON);
        assert!((config.scoring.kinds["PRD"].cross_reference - 40.0).abs() < f64::EPSILON);

        let ingress = config.io.ingress();
        assert_eq!(ingress.read_timeout, Duration::from_millis(250));
        assert_eq!(ingress.workers, 2);
        assert_eq!(ingress.max_file_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = EngineConfig::from_toml_str("artifact_rootz = []").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let err = EngineConfig::from_toml_str("[scoring]\nthreshold = 120.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "scoring.threshold", .. }));

        let err = EngineConfig::from_toml_str("[scoring.weights]\nkind = -1").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "scoring.weights", .. }));

        let err = EngineConfig::from_toml_str("[identifiers]\nprefix = \"Sys-x\"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "identifiers.prefix", .. }));

        let err = EngineConfig::from_toml_str("[identifiers]\nprefix = \"\"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "identifiers.prefix", .. }));
    }

    #[test]
    fn grammar_always_carries_a_prefix() {
        let grammar = EngineConfig::new().grammar();
        assert_eq!(grammar.prefix(), Some(DEFAULT_ID_PREFIX));
        assert!(grammar.matches("sys-fr-login"));
        assert!(!grammar.matches("docs-only"));
        assert!(!grammar.matches("serde-json"));

        let grammar = EngineConfig::new().with_prefix("req").grammar();
        assert!(grammar.matches("req-fr-login"));
        assert!(!grammar.matches("sys-fr-login"));
    }

    #[test]
    fn bad_kind_pattern_is_config_error() {
        let config = EngineConfig::new().with_kind("PRD", ["docs/[PRD.md"]);
        assert!(matches!(config.kind_resolver(), Err(ConfigError::Kind(_))));
    }

    #[test]
    fn load_rebases_relative_paths() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("tracemark.toml");
        std::fs::write(&path, "artifact_roots = [\"docs\"]\ntemplate_dir = \"tpl\"\n").unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.artifact_roots, vec![dir.path().join("docs")]);
        assert_eq!(config.template_dir, Some(dir.path().join("tpl")));
    }

    #[test]
    fn kind_weights_take_precedence_over_template() {
        let template = Template::parse(
            "templates/PRD.md",
            "---\nkind: PRD\nweights:\n  structure: 50\n---\n",
        )
        .unwrap();
        let prd = ArtifactKind::new("PRD");

        let config = EngineConfig::new();
        assert!((config.weights_for(&prd, Some(&template)).structure - 50.0).abs() < f64::EPSILON);
        assert!((config.weights_for(&prd, None).structure - 30.0).abs() < f64::EPSILON);

        let config = EngineConfig::from_toml_str("[scoring.kinds.PRD]\nstructure = 70").unwrap();
        assert!((config.weights_for(&prd, Some(&template)).structure - 70.0).abs() < f64::EPSILON);
    }

    #[test]
    fn artifact_extension_filter() {
        let config = EngineConfig::new();
        assert!(config.is_artifact(Path::new("docs/PRD.md")));
        assert!(config.is_artifact(Path::new("docs/PRD.MD")));
        assert!(!config.is_artifact(Path::new("src/lib.rs")));
    }
}
