//! Deterministic scoring
//!
//! `score = 100 - Σ weight × ratio` over the six finding categories, where
//! `ratio = violations / max(checks, violations, 1)`. Only error-severity
//! findings are violations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use tracemark_artifact::{ErrorType, Findings};
use tracemark_template::Weights;

/// Pass/fail outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Score reached the threshold and every file loaded
    Pass,
    /// Score below threshold or a file failed to load
    Fail,
}

impl Status {
    /// Decide the status of a run
    #[must_use]
    pub fn decide(score: f64, threshold: f64, file_error: bool) -> Self {
        if score >= threshold && !file_error {
            Status::Pass
        } else {
            Status::Fail
        }
    }

    /// Whether the run passed
    #[inline]
    #[must_use]
    pub fn is_pass(self) -> bool {
        self == Status::Pass
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::Pass => "pass",
            Status::Fail => "fail",
        })
    }
}

/// Contribution of one category to the score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    /// Checks performed
    pub checks: usize,
    /// Error-severity findings
    pub violations: usize,
    /// Configured weight
    pub weight: f64,
    /// Points deducted
    pub penalty: f64,
}

/// Score with its per-category breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scorecard {
    /// Final score in `0..=100`, two decimals
    pub score: f64,
    /// Breakdown in category order
    pub categories: BTreeMap<ErrorType, CategoryScore>,
}

/// Share of checks in a category that failed
#[must_use]
pub fn violation_ratio(violations: usize, checks: usize) -> f64 {
    let denominator = checks.max(violations).max(1);
    #[allow(clippy::cast_precision_loss)]
    let ratio = violations as f64 / denominator as f64;
    ratio
}

/// Round to two decimals
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Score collected findings against a weight table
#[must_use]
pub fn score(findings: &Findings, weights: &Weights) -> Scorecard {
    let mut categories = BTreeMap::new();
    let mut deducted = 0.0;

    for category in ErrorType::ALL {
        let checks = findings.checks(category);
        let violations = findings.violations(category);
        let weight = weights.get(category);
        let penalty = weight * violation_ratio(violations, checks);
        deducted += penalty;
        categories.insert(
            category,
            CategoryScore {
                checks,
                violations,
                weight,
                penalty: round2(penalty),
            },
        );
    }

    Scorecard {
        score: round2((100.0 - deducted).clamp(0.0, 100.0)),
        categories,
    }
}
