//! Identifiers and the signals that mention them
//!
//! Provides [`Identifier`], the [`IdGrammar`] that recognises them, and the
//! per-document signal types every parser emits: definitions, references,
//! CDSL instructions and code markers.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;
use tracemark_artifact::{ArtifactKind, Has};

/// Lowercase kebab chain with at least two segments
static KEBAB_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z][a-z0-9]*(?:-[a-z0-9]+)+$").expect("identifier grammar is a valid regex")
});

/// Globally-namespaced symbolic token
///
/// Shape: `<prefix>-<hierarchy slugs>-<element kind>-<descriptive slug>`,
/// all lowercase kebab (e.g. `sys-auth-fr-login`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Wrap a token already accepted by an [`IdGrammar`]
    #[inline]
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Token text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Kebab segments
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('-')
    }

    /// First segment (the literal prefix)
    #[inline]
    #[must_use]
    pub fn prefix(&self) -> &str {
        self.0.split('-').next().unwrap_or_default()
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identifier grammar, optionally pinned to a literal prefix
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdGrammar {
    prefix: Option<String>,
}

impl IdGrammar {
    /// Grammar accepting any kebab chain of two or more segments
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Grammar requiring the first segment to equal `prefix`
    #[inline]
    #[must_use]
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    /// Configured prefix
    #[inline]
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Whether `token` is an identifier under this grammar
    #[must_use]
    pub fn matches(&self, token: &str) -> bool {
        if !KEBAB_ID.is_match(token) {
            return false;
        }
        match &self.prefix {
            Some(prefix) => token
                .strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.starts_with('-')),
            None => true,
        }
    }

    /// Parse a token into an identifier
    ///
    /// # Errors
    /// Returns error if the token does not follow the grammar
    pub fn parse(&self, token: &str) -> Result<Identifier, RegistryError> {
        if self.matches(token) {
            Ok(Identifier::new(token))
        } else {
            Err(RegistryError::InvalidIdentifier {
                token: token.to_string(),
                prefix: self.prefix.clone(),
            })
        }
    }
}

/// Constraints inherited from the block an identifier is defined in
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinitionSpec {
    /// Defining block name (marker mode)
    pub block: Option<String>,
    /// Kinds that must reference the identifier
    pub covered_by: Vec<ArtifactKind>,
    /// Content feature demanded of the definition
    pub has: Option<Has>,
    /// Identifier needs at least one code marker
    pub to_code: bool,
}

/// One occurrence of an identifier being declared
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierDefinition {
    /// Identifier declared
    pub id: Identifier,
    /// Defining artifact
    pub path: PathBuf,
    /// 1-based line
    pub line: usize,
    /// Checkbox state, if the definition carries one
    pub checked: Option<bool>,
    /// Priority 1-9, if present
    pub priority: Option<u8>,
    /// Kind of the defining artifact
    pub kind: Option<ArtifactKind>,
    /// Block-level constraints
    pub spec: DefinitionSpec,
    /// Extracted heuristically from an unmarked document
    pub markerless: bool,
}

/// One occurrence of an identifier being mentioned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierReference {
    /// Identifier mentioned
    pub id: Identifier,
    /// Referencing artifact
    pub path: PathBuf,
    /// 1-based line
    pub line: usize,
    /// Kind of the referencing artifact
    pub kind: Option<ArtifactKind>,
}

/// Binding of an instruction to the definition it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentBinding {
    /// Parent identifier
    pub id: Identifier,
    /// Derived from "nearest preceding definition" rather than structure
    pub approximate: bool,
    /// Another definition sat on the same line as the chosen parent
    pub ambiguous: bool,
}

/// One ordered, phase-tagged step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CdslInstruction {
    /// Phase number (`pN`)
    pub phase: u32,
    /// Checkbox state
    pub checked: bool,
    /// Free-text description
    pub description: String,
    /// Instruction-local token (e.g. `inst-validate-input`)
    pub token: String,
    /// Artifact the instruction is in
    pub path: PathBuf,
    /// 1-based line
    pub line: usize,
    /// Parent definition, if one could be bound
    pub parent: Option<ParentBinding>,
}

/// Single-line code marker: `@MARK-<kind>:<id>:p<N>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeMarker {
    /// Kind token (`flow`, `algo`, ...)
    pub kind: String,
    /// Identifier bound
    pub id: Identifier,
    /// Phase
    pub phase: u32,
    /// Source file
    pub path: PathBuf,
    /// 1-based line
    pub line: usize,
}

/// Paired code marker: `@MARK-begin:<id>:p<N>:<token>` ... `@MARK-end:...`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockMarker {
    /// Identifier bound
    pub id: Identifier,
    /// Phase
    pub phase: u32,
    /// Local instruction token
    pub token: String,
    /// Source file
    pub path: PathBuf,
    /// Line of the `begin` marker
    pub begin_line: usize,
    /// Line of the matching `end` marker, when one was found
    pub end_line: Option<usize>,
}

impl BlockMarker {
    /// Wrapped source lines (exclusive of the markers), when closed
    #[must_use]
    pub fn span(&self) -> Option<std::ops::Range<usize>> {
        self.end_line.map(|end| self.begin_line + 1..end)
    }
}

/// Source-code marker binding implementation to an identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CodeMarker {
    /// Single-line scope marker
    Scope(ScopeMarker),
    /// Begin/end block pair
    Block(BlockMarker),
}

impl CodeMarker {
    /// Identifier bound
    #[inline]
    #[must_use]
    pub fn id(&self) -> &Identifier {
        match self {
            CodeMarker::Scope(m) => &m.id,
            CodeMarker::Block(m) => &m.id,
        }
    }

    /// Source file
    #[inline]
    #[must_use]
    pub fn path(&self) -> &PathBuf {
        match self {
            CodeMarker::Scope(m) => &m.path,
            CodeMarker::Block(m) => &m.path,
        }
    }

    /// Line of the (first) marker
    #[inline]
    #[must_use]
    pub fn line(&self) -> usize {
        match self {
            CodeMarker::Scope(m) => m.line,
            CodeMarker::Block(m) => m.begin_line,
        }
    }

    /// Phase
    #[inline]
    #[must_use]
    pub fn phase(&self) -> u32 {
        match self {
            CodeMarker::Scope(m) => m.phase,
            CodeMarker::Block(m) => m.phase,
        }
    }

    /// Marker name for reports (`begin` or the scope kind)
    #[must_use]
    pub fn marker_name(&self) -> &str {
        match self {
            CodeMarker::Scope(m) => &m.kind,
            CodeMarker::Block(_) => "begin",
        }
    }
}

/// Registry-level errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Token does not follow the identifier grammar
    #[error("invalid identifier '{token}'{}", prefix.as_ref().map(|p| format!(" (expected prefix '{p}-')")).unwrap_or_default())]
    InvalidIdentifier {
        token: String,
        prefix: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grammar_accepts_kebab_chains() {
        let g = IdGrammar::new();
        assert!(g.matches("sys-fr-login"));
        assert!(g.matches("sys-x"));
        assert!(g.matches("cpt-auth-algo-hash-password2"));
    }

    #[test]
    fn grammar_rejects_non_identifiers() {
        let g = IdGrammar::new();
        assert!(!g.matches("sys"));
        assert!(!g.matches("p1"));
        assert!(!g.matches("Sys-fr"));
        assert!(!g.matches("sys--fr"));
        assert!(!g.matches("sys-fr-"));
        assert!(!g.matches("sys_fr"));
        assert!(!g.matches("1sys-fr"));
    }

    #[test]
    fn grammar_with_prefix_pins_first_segment() {
        let g = IdGrammar::with_prefix("sys");
        assert!(g.matches("sys-fr-login"));
        assert!(!g.matches("system-fr-login"));
        assert!(!g.matches("inst-validate"));

        let err = g.parse("inst-validate").unwrap_err();
        assert!(err.to_string().contains("expected prefix 'sys-'"));
    }

    #[test]
    fn identifier_segments_and_prefix() {
        let id = Identifier::new("sys-auth-fr-login");
        assert_eq!(id.prefix(), "sys");
        assert_eq!(id.segments().count(), 4);
        assert_eq!(id.to_string(), "sys-auth-fr-login");
    }

    #[test]
    fn block_marker_span_excludes_markers() {
        let m = BlockMarker {
            id: Identifier::new("sys-a"),
            phase: 1,
            token: "inst-a".into(),
            path: "src/lib.rs".into(),
            begin_line: 10,
            end_line: Some(14),
        };
        assert_eq!(m.span(), Some(11..14));

        let open = BlockMarker { end_line: None, ..m };
        assert_eq!(open.span(), None);
    }

    #[test]
    fn code_marker_accessors() {
        let scope = CodeMarker::Scope(ScopeMarker {
            kind: "flow".into(),
            id: Identifier::new("sys-flow-login"),
            phase: 2,
            path: "a.py".into(),
            line: 3,
        });
        assert_eq!(scope.id().as_str(), "sys-flow-login");
        assert_eq!(scope.phase(), 2);
        assert_eq!(scope.line(), 3);
        assert_eq!(scope.marker_name(), "flow");
    }

    proptest::proptest! {
        #[test]
        fn generated_kebab_chains_are_identifiers(
            head in "[a-z][a-z0-9]{0,6}",
            tail in proptest::collection::vec("[a-z0-9]{1,6}", 1..5),
        ) {
            let token = format!("{head}-{}", tail.join("-"));
            proptest::prop_assert!(IdGrammar::new().matches(&token));
            proptest::prop_assert!(IdGrammar::with_prefix(head.clone()).matches(&token));
            proptest::prop_assert!(!IdGrammar::new().matches(&token.to_uppercase()));
        }
    }
}
