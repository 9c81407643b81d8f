//! Documents under validation
//!
//! An [`Artifact`] is immutable once loaded: raw text, its lines, content hash
//! and the optional YAML frontmatter that may declare its kind.

use crate::hash::ContentHash;
use crate::kind::ArtifactKind;
use std::path::{Path, PathBuf};

/// A single document under validation
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    path: PathBuf,
    text: String,
    lines: Vec<String>,
    hash: ContentHash,
    frontmatter: Option<serde_yaml::Value>,
    frontmatter_error: Option<String>,
    body_start: usize,
    kind: Option<ArtifactKind>,
}

impl Artifact {
    /// Create artifact from its path and raw text
    ///
    /// The content hash is computed eagerly. A leading `---` fenced YAML
    /// block is parsed as frontmatter; invalid YAML is remembered rather
    /// than rejected so the document can still be validated.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let text = text.into();
        let lines: Vec<String> = text.lines().map(str::to_string).collect();
        let hash = ContentHash::compute(text.as_bytes());
        let (frontmatter, frontmatter_error, body_start) = extract_frontmatter(&lines);

        Self {
            path: path.into(),
            text,
            lines,
            hash,
            frontmatter,
            frontmatter_error,
            body_start,
            kind: None,
        }
    }

    /// Attach the resolved kind
    #[inline]
    #[must_use]
    pub fn with_kind(mut self, kind: Option<ArtifactKind>) -> Self {
        self.kind = kind;
        self
    }

    /// Document path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw text
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// All lines, frontmatter included
    #[inline]
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Content hash of the raw text
    #[inline]
    #[must_use]
    pub fn hash(&self) -> &ContentHash {
        &self.hash
    }

    /// Parsed frontmatter, if present and valid
    #[inline]
    #[must_use]
    pub fn frontmatter(&self) -> Option<&serde_yaml::Value> {
        self.frontmatter.as_ref()
    }

    /// YAML error for a present but invalid frontmatter
    #[inline]
    #[must_use]
    pub fn frontmatter_error(&self) -> Option<&str> {
        self.frontmatter_error.as_deref()
    }

    /// 1-based line number of the first body line (after frontmatter)
    #[inline]
    #[must_use]
    pub fn body_start(&self) -> usize {
        self.body_start
    }

    /// Kind declared in frontmatter (`kind: ...`)
    #[must_use]
    pub fn explicit_kind(&self) -> Option<&str> {
        self.frontmatter.as_ref()?.get("kind")?.as_str()
    }

    /// Resolved kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> Option<&ArtifactKind> {
        self.kind.as_ref()
    }
}

fn extract_frontmatter(lines: &[String]) -> (Option<serde_yaml::Value>, Option<String>, usize) {
    if lines.first().map(|l| l.trim_end()) != Some("---") {
        return (None, None, 1);
    }
    let Some(close) = lines.iter().skip(1).position(|l| l.trim_end() == "---") else {
        return (None, None, 1);
    };
    let close = close + 1;
    let yaml = lines[1..close].join("\n");
    match serde_yaml::from_str::<serde_yaml::Value>(&yaml) {
        Ok(value) => (Some(value), None, close + 2),
        Err(e) => (None, Some(e.to_string()), close + 2),
    }
}
