//! Artifact kinds and kind resolution
//!
//! A kind is either declared explicitly in the artifact's frontmatter
//! (`kind: PRD`) or inferred from its path through configured glob patterns.

use crate::diagnostic::{ErrorType, Severity, ValidationError};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};
use std::path::Path;

/// Artifact kind name (e.g. `PRD`, `DESIGN`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactKind(String);

impl ArtifactKind {
    /// Create kind from name
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Kind name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ArtifactKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind inferred from path patterns
#[derive(Debug, Clone)]
struct KindRule {
    kind: ArtifactKind,
    globs: GlobSet,
}

/// Resolves an artifact's kind from explicit metadata and path patterns
#[derive(Debug, Clone, Default)]
pub struct KindResolver {
    rules: Vec<KindRule>,
    known: BTreeSet<ArtifactKind>,
}

/// Outcome of kind resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindResolution {
    /// Resolved kind, if any
    pub kind: Option<ArtifactKind>,
    /// `kind` findings produced while resolving
    pub findings: Vec<ValidationError>,
}

impl KindResolver {
    /// Create resolver with no rules
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a kind with its path patterns; rules are tried in insertion order
    ///
    /// # Errors
    /// Returns error if any pattern is not a valid glob
    pub fn add_rule<I, S>(&mut self, kind: ArtifactKind, patterns: I) -> Result<(), KindError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let glob = Glob::new(pattern).map_err(|source| KindError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;
            builder.add(glob);
        }
        let globs = builder.build().map_err(|source| KindError::InvalidPattern {
            pattern: kind.to_string(),
            source,
        })?;
        self.known.insert(kind.clone());
        self.rules.push(KindRule { kind, globs });
        Ok(())
    }

    /// Register a kind known without path patterns (e.g. from a template)
    pub fn add_known(&mut self, kind: ArtifactKind) {
        self.known.insert(kind);
    }

    /// Whether the kind is known to this resolver
    #[inline]
    #[must_use]
    pub fn is_known(&self, kind: &ArtifactKind) -> bool {
        self.known.contains(kind)
    }

    /// Kind inferred from the path alone
    #[must_use]
    pub fn infer(&self, path: &Path) -> Option<ArtifactKind> {
        self.rules
            .iter()
            .find(|rule| rule.globs.is_match(path))
            .map(|rule| rule.kind.clone())
    }

    /// Resolve the kind of an artifact
    ///
    /// Explicit metadata wins over the path pattern; a disagreement between
    /// the two, or an explicit kind nobody configured, is a `kind` error. An
    /// artifact with neither gets a `kind` warning and no kind.
    #[must_use]
    pub fn resolve(&self, path: &Path, explicit: Option<&str>) -> KindResolution {
        let inferred = self.infer(path);
        let mut findings = Vec::new();

        let kind = match (explicit.map(ArtifactKind::new), inferred) {
            (Some(declared), inferred) => {
                if !self.is_known(&declared) {
                    findings.push(ValidationError::new(
                        ErrorType::Kind,
                        path,
                        format!("declared kind '{declared}' is not configured"),
                    ));
                }
                if let Some(inferred) = inferred.filter(|k| *k != declared) {
                    findings.push(ValidationError::new(
                        ErrorType::Kind,
                        path,
                        format!("declared kind '{declared}' conflicts with path kind '{inferred}'"),
                    ));
                }
                Some(declared)
            }
            (None, Some(inferred)) => Some(inferred),
            (None, None) => {
                findings.push(
                    ValidationError::new(ErrorType::Kind, path, "artifact kind could not be resolved")
                        .with_severity(Severity::Warning),
                );
                None
            }
        };

        KindResolution { kind, findings }
    }
}

/// Kind configuration errors
#[derive(Debug, thiserror::Error)]
pub enum KindError {
    /// Invalid glob pattern
    #[error("invalid kind pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> KindResolver {
        let mut r = KindResolver::new();
        r.add_rule(ArtifactKind::new("PRD"), ["**/PRD.md"]).unwrap();
        r.add_rule(ArtifactKind::new("DESIGN"), ["**/DESIGN.md", "**/design/*.md"])
            .unwrap();
        r
    }

    #[test]
    fn infers_kind_from_path() {
        let r = resolver();
        assert_eq!(r.infer(Path::new("docs/PRD.md")), Some(ArtifactKind::new("PRD")));
        assert_eq!(
            r.infer(Path::new("docs/design/auth.md")),
            Some(ArtifactKind::new("DESIGN"))
        );
        assert_eq!(r.infer(Path::new("docs/notes.md")), None);
    }

    #[test]
    fn explicit_kind_wins_but_conflict_is_reported() {
        let r = resolver();
        let res = r.resolve(Path::new("docs/PRD.md"), Some("DESIGN"));
        assert_eq!(res.kind, Some(ArtifactKind::new("DESIGN")));
        assert_eq!(res.findings.len(), 1);
        assert_eq!(res.findings[0].error_type, ErrorType::Kind);
        assert!(res.findings[0].message.contains("conflicts"));
    }

    #[test]
    fn unknown_explicit_kind_is_an_error() {
        let r = resolver();
        let res = r.resolve(Path::new("notes.md"), Some("ROADMAP"));
        assert_eq!(res.kind, Some(ArtifactKind::new("ROADMAP")));
        assert!(res.findings[0].is_error());
    }

    #[test]
    fn unresolvable_kind_is_a_warning() {
        let r = resolver();
        let res = r.resolve(Path::new("notes.md"), None);
        assert_eq!(res.kind, None);
        assert_eq!(res.findings.len(), 1);
        assert_eq!(res.findings[0].severity, Severity::Warning);
    }

    #[test]
    fn invalid_glob_is_rejected() {
        let mut r = KindResolver::new();
        let err = r.add_rule(ArtifactKind::new("X"), ["a/[b"]).unwrap_err();
        assert!(err.to_string().contains("a/[b"));
    }
}
