//! Validation report
//!
//! The report is the only output of a run: score, status, threshold, a
//! summary of what was validated and the full ordered finding list. Both
//! renderings are pure functions of the report so unchanged input yields
//! byte-identical output.

use crate::scoring::{CategoryScore, Scorecard, Status};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use tracemark_artifact::{sort_findings, ErrorType, Severity, ValidationError};

/// Counts describing what a run covered
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Artifacts validated
    pub artifacts: usize,
    /// Source files scanned
    pub code_files: usize,
    /// Defined identifiers
    pub identifiers: usize,
    /// Identifier references
    pub references: usize,
    /// Code markers
    pub code_markers: usize,
    /// Score breakdown by category
    pub categories: BTreeMap<ErrorType, CategoryScore>,
}

/// Result of a validation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Score in `0..=100`
    pub score: f64,
    /// Pass/fail against the threshold
    pub status: Status,
    /// Threshold applied
    pub threshold: f64,
    /// What was validated
    pub summary: Summary,
    /// Findings in `(path, line, id, type, message)` order
    pub errors: Vec<ValidationError>,
}

impl Report {
    /// Assemble a report; findings are sorted here
    #[must_use]
    pub fn new(
        card: Scorecard,
        threshold: f64,
        mut summary: Summary,
        mut errors: Vec<ValidationError>,
    ) -> Self {
        sort_findings(&mut errors);
        let file_error = errors
            .iter()
            .any(|e| e.error_type == ErrorType::File && e.is_error());
        summary.categories = card.categories;
        Self {
            score: card.score,
            status: Status::decide(card.score, threshold, file_error),
            threshold,
            summary,
            errors,
        }
    }

    /// Whether the run passed
    #[inline]
    #[must_use]
    pub fn passed(&self) -> bool {
        self.status.is_pass()
    }

    /// Number of findings with a severity
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.errors.iter().filter(|e| e.severity == severity).count()
    }

    /// Pretty-printed JSON
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Human-readable rendering, one line per finding and a summary
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for error in &self.errors {
            let _ = writeln!(out, "{error}");
        }
        if !self.errors.is_empty() {
            out.push('\n');
        }

        let s = &self.summary;
        let _ = writeln!(
            out,
            "{} artifacts, {} source files, {} identifiers, {} references, {} code markers",
            s.artifacts, s.code_files, s.identifiers, s.references, s.code_markers
        );
        for (category, c) in &s.categories {
            if c.checks == 0 && c.violations == 0 {
                continue;
            }
            let _ = writeln!(
                out,
                "  {:<16} {}/{} violations  -{:.2}",
                category.as_str(),
                c.violations,
                c.checks,
                c.penalty
            );
        }
        let _ = writeln!(
            out,
            "{} errors, {} warnings, {} notes",
            self.count(Severity::Error),
            self.count(Severity::Warning),
            self.count(Severity::Note)
        );
        let _ = writeln!(
            out,
            "score {:.2} (threshold {:.2}): {}",
            self.score, self.threshold, self.status
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::score;
    use pretty_assertions::assert_eq;
    use tracemark_artifact::Findings;
    use tracemark_template::Weights;

    fn sample() -> Report {
        let mut findings = Findings::new();
        findings.checked(ErrorType::CrossReference, 4);
        findings.push(
            ValidationError::cross_reference("docs/b.md", "reference to undefined identifier `sys-x`")
                .at_line(3)
                .with_id("sys-x"),
        );
        findings.push(ValidationError::structure("docs/a.md", "required block `summary` is missing"));
        let card = score(&findings, &Weights::default());
        Report::new(card, 80.0, Summary::default(), findings.into_items())
    }

    #[test]
    fn errors_are_sorted_and_status_decided() {
        let report = sample();
        let paths: Vec<_> = report.errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["docs/a.md", "docs/b.md"]);
        assert!((report.score - 63.75).abs() < f64::EPSILON);
        assert_eq!(report.status, Status::Fail);
    }

    #[test]
    fn json_carries_report_shape() {
        let json: serde_json::Value = serde_json::from_str(&sample().to_json().unwrap()).unwrap();
        assert_eq!(json["status"], "fail");
        assert_eq!(json["threshold"], 80.0);
        assert_eq!(json["errors"][1]["type"], "cross-reference");
        assert_eq!(json["errors"][1]["line"], 3);
        assert_eq!(json["errors"][1]["id"], "sys-x");
        assert!(json["errors"][0].get("line").is_none());
        assert_eq!(json["summary"]["categories"]["cross-reference"]["checks"], 4);
    }

    #[test]
    fn text_lists_findings_then_summary() {
        let text = sample().to_text();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "docs/a.md: error [structure] required block `summary` is missing");
        assert_eq!(
            lines[1],
            "docs/b.md:3: error [cross-reference] reference to undefined identifier `sys-x` (id: sys-x)"
        );
        assert!(text.ends_with("score 63.75 (threshold 80.00): fail\n"));
    }

    #[test]
    fn file_error_fails_even_with_high_score() {
        let mut findings = Findings::new();
        findings.checked(ErrorType::File, 1000);
        findings.push(ValidationError::new(ErrorType::File, "x.md", "unreadable"));
        let card = score(&findings, &Weights::default());
        let report = Report::new(card, 80.0, Summary::default(), findings.into_items());
        assert!(report.score > 99.0);
        assert!(!report.passed());
    }
}
