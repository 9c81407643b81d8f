//! Testing utilities for the tracemark workspace
//!
//! Temporary on-disk projects and a small, fully traced sample project.

#![allow(missing_docs)]
#![allow(clippy::missing_panics_doc)]

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracemark_artifact::{ErrorType, Severity, ValidationError};
use tracemark_core::{CheckSet, Engine, EngineConfig, Report};

pub const PRD_TEMPLATE: &str = r#"---
kind: PRD
---
# {Product}

<!-- MARK:paragraph:summary -->
<!-- MARK:paragraph:summary -->

<!-- MARK:id:requirements repeat="many" covered_by="DESIGN" has="priority" -->
<!-- MARK:id:requirements -->
"#;

pub const DESIGN_TEMPLATE: &str = r#"---
kind: DESIGN
---
# {Component} design

<!-- MARK:id:flows repeat="many" to_code="true" -->
<!-- MARK:cdsl:steps required="false" -->
<!-- MARK:cdsl:steps -->
<!-- MARK:id:flows -->
"#;

pub const PRD_DOC: &str = r#"---
kind: PRD
---
# Login

<!-- MARK:paragraph:summary -->
Users sign in with a password.
<!-- MARK:paragraph:summary -->

<!-- MARK:id:requirements -->
- `p1` - **ID**: `sys-fr-login`
<!-- MARK:id:requirements -->
"#;

pub const DESIGN_DOC: &str = r#"---
kind: DESIGN
---
# Login design

<!-- MARK:id:flows -->
**ID**: `sys-flow-login`

Implements `sys-fr-login`.

<!-- MARK:cdsl:steps -->
1. [x] - `p1` - Validate the form - `inst-validate`
<!-- MARK:cdsl:steps -->
<!-- MARK:id:flows -->
"#;

pub const LOGIN_RS: &str = r#"// @MARK-flow:sys-flow-login:p1
pub fn login(form: &Form) -> bool {
    // @MARK-begin:sys-flow-login:p1:inst-validate
    let ok = form.is_valid();
    // @MARK-end:sys-flow-login:p1:inst-validate
    ok
}
"#;

/// Temporary project directory
///
/// Layout convention: artifacts under `docs/`, source under `src/`,
/// templates under `templates/`.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

impl Workspace {
    /// Create empty workspace
    #[must_use]
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp dir"),
        }
    }

    /// With a file at `rel`
    #[must_use]
    pub fn file(self, rel: &str, text: &str) -> Self {
        self.write(rel, text);
        self
    }

    /// Write (or overwrite) a file at `rel`
    pub fn write(&self, rel: &str, text: &str) {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        std::fs::write(&path, text).expect("write fixture file");
    }

    /// Workspace root
    #[must_use]
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute path of `rel`
    #[must_use]
    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Configuration following the layout convention
    ///
    /// `src/` and `templates/` are only configured when they exist.
    #[must_use]
    pub fn config(&self) -> EngineConfig {
        let mut config = EngineConfig::new()
            .with_artifact_root(self.path("docs"))
            .with_kind("PRD", ["**/PRD.md"])
            .with_kind("DESIGN", ["**/DESIGN.md"]);
        if self.path("src").is_dir() {
            config = config.with_code_root(self.path("src"));
        }
        if self.path("templates").is_dir() {
            config = config.with_template_dir(self.path("templates"));
        }
        config
    }

    /// Engine over [`Workspace::config`]
    pub async fn engine(&self) -> Engine {
        self.engine_with(self.config()).await
    }

    /// Engine over a custom configuration
    pub async fn engine_with(&self, config: EngineConfig) -> Engine {
        Engine::new(config).await.expect("engine starts")
    }

    /// Full validation report over [`Workspace::config`]
    pub async fn report(&self) -> Report {
        self.engine()
            .await
            .validate(CheckSet::All, None)
            .await
            .expect("validation runs")
    }
}

/// Two templates, two artifacts and one traced source file; validates clean
#[must_use]
pub fn sample_project() -> Workspace {
    Workspace::new()
        .file("templates/PRD.md", PRD_TEMPLATE)
        .file("templates/DESIGN.md", DESIGN_TEMPLATE)
        .file("docs/PRD.md", PRD_DOC)
        .file("docs/DESIGN.md", DESIGN_DOC)
        .file("src/login.rs", LOGIN_RS)
}

/// Error-severity findings of one category
#[must_use]
pub fn errors_of(report: &Report, category: ErrorType) -> Vec<&ValidationError> {
    report
        .errors
        .iter()
        .filter(|e| e.error_type == category && e.severity == Severity::Error)
        .collect()
}
