//! Validation findings
//!
//! Every detected violation becomes a [`ValidationError`] value. Findings are
//! collected, never thrown: only unreadable roots abort a run.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::path::Path;

/// Finding category
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorType {
    /// Malformed marker or attribute syntax
    Template,
    /// Artifact does not match its declared shape
    Structure,
    /// Artifact kind mismatch or unresolvable
    Kind,
    /// I/O failure
    File,
    /// Orphan, duplicate or coverage-constraint violation
    CrossReference,
    /// Code-marker pairing, nesting or coverage violation
    Traceability,
}

impl ErrorType {
    /// All categories in report order
    pub const ALL: [ErrorType; 6] = [
        ErrorType::Template,
        ErrorType::Structure,
        ErrorType::Kind,
        ErrorType::File,
        ErrorType::CrossReference,
        ErrorType::Traceability,
    ];

    /// Stable textual name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorType::Template => "template",
            ErrorType::Structure => "structure",
            ErrorType::Kind => "kind",
            ErrorType::File => "file",
            ErrorType::CrossReference => "cross-reference",
            ErrorType::Traceability => "traceability",
        }
    }
}

impl Display for ErrorType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Finding severity. Only [`Severity::Error`] counts against the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Violation
    Error,
    /// Reported, not scored
    Warning,
    /// Informational
    Note,
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
        })
    }
}

/// Enum-valued severity policy (`error|warn|allow`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
    /// Report as error
    Error,
    /// Report as warning
    #[default]
    Warn,
    /// Accept silently
    Allow,
}

impl Policy {
    /// Severity to report with, `None` when the policy allows the condition
    #[inline]
    #[must_use]
    pub fn severity(self) -> Option<Severity> {
        match self {
            Policy::Error => Some(Severity::Error),
            Policy::Warn => Some(Severity::Warning),
            Policy::Allow => None,
        }
    }
}

impl std::str::FromStr for Policy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "error" => Ok(Policy::Error),
            "warn" => Ok(Policy::Warn),
            "allow" => Ok(Policy::Allow),
            other => Err(format!("unknown policy '{other}' (expected error|warn|allow)")),
        }
    }
}

/// One unit of report output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Category
    #[serde(rename = "type")]
    pub error_type: ErrorType,
    /// Severity
    pub severity: Severity,
    /// Human-readable message
    pub message: String,
    /// Path of the artifact or source file
    pub path: String,
    /// 1-based line number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// Identifier involved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Block or marker name involved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker_type: Option<String>,
}

impl ValidationError {
    /// Create an error-severity finding
    #[must_use]
    pub fn new(error_type: ErrorType, path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self {
            error_type,
            severity: Severity::Error,
            message: message.into(),
            path: path.as_ref().to_string_lossy().replace('\\', "/"),
            line: None,
            id: None,
            marker_type: None,
        }
    }

    /// Shorthand for a `template` finding
    #[must_use]
    pub fn template(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::new(ErrorType::Template, path, message)
    }

    /// Shorthand for a `structure` finding
    #[must_use]
    pub fn structure(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::new(ErrorType::Structure, path, message)
    }

    /// Shorthand for a `cross-reference` finding
    #[must_use]
    pub fn cross_reference(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::new(ErrorType::CrossReference, path, message)
    }

    /// Shorthand for a `traceability` finding
    #[must_use]
    pub fn traceability(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::new(ErrorType::Traceability, path, message)
    }

    /// With line number
    #[inline]
    #[must_use]
    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// With identifier
    #[inline]
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// With block or marker name
    #[inline]
    #[must_use]
    pub fn with_marker(mut self, name: impl Into<String>) -> Self {
        self.marker_type = Some(name.into());
        self
    }

    /// With severity
    #[inline]
    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Whether this finding counts as a violation
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Deterministic report ordering: path, line, identifier, then the rest
    #[must_use]
    pub fn report_order(&self, other: &Self) -> Ordering {
        self.path
            .cmp(&other.path)
            .then(self.line.cmp(&other.line))
            .then(self.id.cmp(&other.id))
            .then(self.error_type.cmp(&other.error_type))
            .then(self.message.cmp(&other.message))
            .then(self.severity.cmp(&other.severity))
            .then(self.marker_type.cmp(&other.marker_type))
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)?;
        if let Some(line) = self.line {
            write!(f, ":{line}")?;
        }
        write!(f, ": {} [{}] {}", self.severity, self.error_type, self.message)?;
        if let Some(id) = &self.id {
            write!(f, " (id: {id})")?;
        }
        Ok(())
    }
}

/// Sort findings into report order
pub fn sort_findings(findings: &mut [ValidationError]) {
    findings.sort_by(ValidationError::report_order);
}

/// Findings plus the number of checks performed per category
///
/// Check counts are the denominators of the per-category violation ratios.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Findings {
    items: Vec<ValidationError>,
    checks: BTreeMap<ErrorType, usize>,
}

impl Findings {
    /// Create empty collector
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finding
    #[inline]
    pub fn push(&mut self, finding: ValidationError) {
        self.items.push(finding);
    }

    /// Record `n` checks performed in a category
    #[inline]
    pub fn checked(&mut self, category: ErrorType, n: usize) {
        *self.checks.entry(category).or_insert(0) += n;
    }

    /// Merge another collector into this one
    pub fn merge(&mut self, other: Findings) {
        self.items.extend(other.items);
        for (category, n) in other.checks {
            self.checked(category, n);
        }
    }

    /// Findings recorded so far
    #[inline]
    #[must_use]
    pub fn items(&self) -> &[ValidationError] {
        &self.items
    }

    /// Checks performed in a category
    #[inline]
    #[must_use]
    pub fn checks(&self, category: ErrorType) -> usize {
        self.checks.get(&category).copied().unwrap_or(0)
    }

    /// Number of error-severity findings in a category
    #[must_use]
    pub fn violations(&self, category: ErrorType) -> usize {
        self.items
            .iter()
            .filter(|f| f.error_type == category && f.is_error())
            .count()
    }

    /// Consume into findings
    #[inline]
    #[must_use]
    pub fn into_items(self) -> Vec<ValidationError> {
        self.items
    }
}

impl Extend<ValidationError> for Findings {
    fn extend<I: IntoIterator<Item = ValidationError>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn error_type_serializes_kebab_case() {
        let json = serde_json::to_string(&ErrorType::CrossReference).unwrap();
        assert_eq!(json, "\"cross-reference\"");
        assert_eq!(ErrorType::CrossReference.to_string(), "cross-reference");
    }

    #[test]
    fn policy_maps_to_severity() {
        assert_eq!(Policy::Error.severity(), Some(Severity::Error));
        assert_eq!(Policy::Warn.severity(), Some(Severity::Warning));
        assert_eq!(Policy::Allow.severity(), None);
        assert_eq!(Policy::default(), Policy::Warn);
        assert!("strict".parse::<Policy>().is_err());
    }

    #[test]
    fn report_shape_omits_absent_fields() {
        let err = ValidationError::structure("docs/prd.md", "missing block").at_line(3);
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["type"], "structure");
        assert_eq!(value["line"], 3);
        assert!(value.get("id").is_none());
        assert!(value.get("marker_type").is_none());
    }

    #[test]
    fn sorting_is_by_path_then_line_then_id() {
        let mut findings = vec![
            ValidationError::structure("b.md", "x").at_line(1),
            ValidationError::structure("a.md", "x").at_line(9).with_id("sys-b"),
            ValidationError::structure("a.md", "x").at_line(9).with_id("sys-a"),
            ValidationError::structure("a.md", "x").at_line(2),
        ];
        sort_findings(&mut findings);

        let keys: Vec<_> = findings
            .iter()
            .map(|f| (f.path.as_str(), f.line, f.id.as_deref()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("a.md", Some(2), None),
                ("a.md", Some(9), Some("sys-a")),
                ("a.md", Some(9), Some("sys-b")),
                ("b.md", Some(1), None),
            ]
        );
    }

    #[test]
    fn findings_track_checks_and_violations() {
        let mut a = Findings::new();
        a.checked(ErrorType::Structure, 3);
        a.push(ValidationError::structure("a.md", "x"));
        a.push(ValidationError::structure("a.md", "y").with_severity(Severity::Warning));

        let mut b = Findings::new();
        b.checked(ErrorType::Structure, 2);
        b.push(ValidationError::template("b.md", "z"));
        a.merge(b);

        assert_eq!(a.checks(ErrorType::Structure), 5);
        assert_eq!(a.checks(ErrorType::File), 0);
        assert_eq!(a.violations(ErrorType::Structure), 1);
        assert_eq!(a.violations(ErrorType::Template), 1);
        assert_eq!(a.items().len(), 3);
    }

    #[test]
    fn display_includes_location() {
        let err = ValidationError::cross_reference("a.md", "orphan reference")
            .at_line(4)
            .with_id("sys-x");
        assert_eq!(
            err.to_string(),
            "a.md:4: error [cross-reference] orphan reference (id: sys-x)"
        );
    }
}
