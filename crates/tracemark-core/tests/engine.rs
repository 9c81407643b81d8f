//! Whole-run behavior of the validation engine

use pretty_assertions::assert_eq;
use tracemark_artifact::{ErrorType, Policy, Severity};
use tracemark_core::{CheckSet, Status};
use tracemark_test_utils::{errors_of, sample_project, Workspace, LOGIN_RS};

#[tokio::test]
async fn sample_project_validates_clean() {
    let ws = sample_project();
    let report = ws.report().await;

    assert!(report.errors.iter().all(|e| e.severity != Severity::Error), "{}", report.to_text());
    assert_eq!(report.status, Status::Pass);
    assert!((report.score - 100.0).abs() < f64::EPSILON);

    let summary = &report.summary;
    assert_eq!(summary.artifacts, 2);
    assert_eq!(summary.code_files, 1);
    assert_eq!(summary.identifiers, 2);
    assert_eq!(summary.references, 1);
    assert_eq!(summary.code_markers, 2);
    assert!(summary.categories[&ErrorType::Traceability].checks > 0);
}

#[tokio::test]
async fn empty_required_block_is_one_structure_error() {
    let ws = Workspace::new().file(
        "docs/PRD.md",
        "<!-- MARK:id:reqs required=\"true\" -->\n<!-- MARK:id:reqs -->\n",
    );
    let report = ws.report().await;

    let structure = errors_of(&report, ErrorType::Structure);
    assert_eq!(structure.len(), 1);
    assert_eq!(structure[0].message, "required block `reqs` missing content");
    assert_eq!(structure[0].marker_type.as_deref(), Some("reqs"));
}

#[tokio::test]
async fn inline_reference_resolves_across_artifacts() {
    let ws = Workspace::new()
        .file("docs/PRD.md", "# Login\n\n- [ ] `p1` - **ID**: `sys-fr-login`\n")
        .file("docs/DESIGN.md", "# Design\n\nThe form implements `sys-fr-login` directly.\n");

    let engine = ws.engine().await;
    let run = engine.run(CheckSet::CrossReferences).await.unwrap();

    let entry = run.registry.lookup("sys-fr-login").unwrap();
    assert_eq!(entry.definitions.len(), 1);
    assert_eq!(entry.references.len(), 1);

    let cross: Vec<_> = run
        .findings
        .items()
        .iter()
        .filter(|f| f.error_type == ErrorType::CrossReference && f.is_error())
        .collect();
    assert!(cross.is_empty(), "{cross:?}");
}

#[tokio::test]
async fn orphan_reference_is_reported_at_its_location() {
    let ws = Workspace::new()
        .file("docs/PRD.md", "- [ ] `p1` - **ID**: `sys-fr-login`\n")
        .file(
            "docs/DESIGN.md",
            "# Design\n\nRelies on `sys-fr-ghost`.\nImplements `sys-fr-login`.\n",
        );
    let report = ws.report().await;

    let orphans = errors_of(&report, ErrorType::CrossReference);
    assert_eq!(orphans.len(), 1, "{}", report.to_text());
    assert!(orphans[0].path.ends_with("docs/DESIGN.md"));
    assert_eq!(orphans[0].line, Some(3));
    assert_eq!(orphans[0].id.as_deref(), Some("sys-fr-ghost"));
}

#[tokio::test]
async fn to_code_identifier_without_markers_is_one_coverage_error() {
    let ws = sample_project();
    ws.write("src/login.rs", "pub fn login() -> bool {\n    true\n}\n");
    let report = ws.report().await;

    let trace = errors_of(&report, ErrorType::Traceability);
    assert_eq!(trace.len(), 1, "{}", report.to_text());
    assert_eq!(trace[0].id.as_deref(), Some("sys-flow-login"));
    assert!(trace[0].path.ends_with("docs/DESIGN.md"));
}

#[tokio::test]
async fn repeated_begin_is_one_nesting_error() {
    let ws = sample_project();
    ws.write(
        "src/login.rs",
        "fn login() {\n\
         \x20   // @MARK-begin:sys-flow-login:p1:inst-validate\n\
         \x20   // @MARK-begin:sys-flow-login:p1:inst-validate\n\
         \x20   check();\n\
         \x20   // @MARK-end:sys-flow-login:p1:inst-validate\n\
         }\n",
    );
    let report = ws.report().await;

    let trace = errors_of(&report, ErrorType::Traceability);
    assert_eq!(trace.len(), 1, "{}", report.to_text());
    assert_eq!(trace[0].line, Some(3));
    assert!(trace[0].message.contains("nested"));
}

#[tokio::test]
async fn docs_only_mode_rejects_code_markers() {
    let ws = sample_project();
    let config = ws
        .config()
        .with_traceability_mode(tracemark_symbol::TraceabilityMode::DocsOnly);
    let report = ws
        .engine_with(config)
        .await
        .validate(CheckSet::Traceability, None)
        .await
        .unwrap();

    let trace = errors_of(&report, ErrorType::Traceability);
    assert_eq!(trace.len(), 2, "{}", report.to_text());
    assert!(trace.iter().all(|e| e.path.ends_with("src/login.rs")));
}

#[tokio::test]
async fn unreadable_file_fails_the_run_but_not_the_rest() {
    let ws = sample_project();
    std::fs::write(ws.path("docs/broken.md"), [0xff, 0xfe, 0xfd]).unwrap();
    let report = ws.report().await;

    let files = errors_of(&report, ErrorType::File);
    assert_eq!(files.len(), 1);
    assert!(files[0].path.ends_with("docs/broken.md"));
    assert_eq!(report.summary.artifacts, 2);
    assert_eq!(report.status, Status::Fail);
}

#[tokio::test]
async fn duplicate_definition_severity_follows_policy() {
    let ws = Workspace::new()
        .file("docs/PRD.md", "- [ ] `p1` - **ID**: `sys-fr-login`\n")
        .file("docs/DESIGN.md", "- [ ] `p1` - **ID**: `sys-fr-login`\n");

    let report = ws.report().await;
    let dups: Vec<_> = report
        .errors
        .iter()
        .filter(|e| e.message.starts_with("duplicate definition"))
        .collect();
    assert_eq!(dups.len(), 1);
    assert_eq!(dups[0].severity, Severity::Warning);

    let config = ws.config().with_duplicate_definitions(Policy::Error);
    let report = ws.engine_with(config).await.validate(CheckSet::All, None).await.unwrap();
    let dups: Vec<_> = report
        .errors
        .iter()
        .filter(|e| e.message.starts_with("duplicate definition"))
        .collect();
    assert_eq!(dups.len(), 1);
    assert_eq!(dups[0].severity, Severity::Error);
    assert!(dups[0].path.ends_with("docs/PRD.md"));
}

#[tokio::test]
async fn undeclared_explicit_kind_is_a_kind_error() {
    let ws = Workspace::new().file("docs/notes.md", "---\nkind: MEMO\n---\n# Notes\n");
    let report = ws.report().await;

    let kinds = errors_of(&report, ErrorType::Kind);
    assert_eq!(kinds.len(), 1);
    assert!(kinds[0].message.contains("MEMO"));
}

#[tokio::test]
async fn focus_limits_findings_to_one_artifact() {
    let ws = sample_project();
    ws.write("docs/DESIGN.md", &format!("{}\nSee `sys-fr-ghost`.\n", tracemark_test_utils::DESIGN_DOC));

    let engine = ws.engine().await;
    let full = engine.validate(CheckSet::All, None).await.unwrap();
    assert_eq!(errors_of(&full, ErrorType::CrossReference).len(), 1);

    let prd = ws.path("docs/PRD.md");
    let focused = engine.validate(CheckSet::All, Some(&prd)).await.unwrap();
    assert!(focused.errors.is_empty(), "{}", focused.to_text());
    assert_eq!(focused.summary.artifacts, 1);
    assert_eq!(focused.status, Status::Pass);
}

#[tokio::test]
async fn check_refs_skips_document_checks() {
    let ws = Workspace::new().file(
        "docs/PRD.md",
        "<!-- MARK:id:reqs required=\"true\" -->\n<!-- MARK:id:reqs -->\n",
    );
    let report = ws
        .engine()
        .await
        .validate(CheckSet::CrossReferences, None)
        .await
        .unwrap();
    assert!(errors_of(&report, ErrorType::Structure).is_empty());
}

#[tokio::test]
async fn source_round_trip_has_no_traceability_errors() {
    let ws = sample_project();
    ws.write("src/other.rs", LOGIN_RS);
    let report = ws.report().await;
    assert!(errors_of(&report, ErrorType::Traceability).is_empty(), "{}", report.to_text());
}

#[tokio::test]
async fn to_code_identifier_is_uncovered_without_code_roots() {
    let ws = Workspace::new().file(
        "docs/PRD.md",
        "<!-- MARK:id:flows to_code=\"true\" -->\n**ID**: `sys-flow-login`\n<!-- MARK:id:flows -->\n",
    );
    assert!(ws.config().code_roots.is_empty());

    let report = ws.report().await;
    let trace = errors_of(&report, ErrorType::Traceability);
    assert_eq!(trace.len(), 1, "{}", report.to_text());
    assert_eq!(trace[0].id.as_deref(), Some("sys-flow-login"));
    assert_eq!(trace[0].line, Some(2));
    assert!(trace[0].path.ends_with("docs/PRD.md"));
    assert!(report.score < 100.0);

    let code_only = ws
        .engine()
        .await
        .validate(CheckSet::Traceability, None)
        .await
        .unwrap();
    assert_eq!(errors_of(&code_only, ErrorType::Traceability).len(), 1);
}

#[tokio::test]
async fn prose_kebab_tokens_are_not_references() {
    let ws = Workspace::new()
        .file("docs/PRD.md", "- [ ] `p1` - **ID**: `sys-fr-login`\n")
        .file(
            "docs/DESIGN.md",
            "Implements `sys-fr-login`; run with `docs-only` mode and the `serde-json` crate.\n",
        );

    let run = ws.engine().await.run(CheckSet::CrossReferences).await.unwrap();
    assert_eq!(run.registry.reference_count(), 1);
    assert!(run.registry.lookup("docs-only").is_none());
    assert!(run.registry.lookup("serde-json").is_none());

    let report = ws.report().await;
    assert!(errors_of(&report, ErrorType::CrossReference).is_empty(), "{}", report.to_text());
}

#[cfg(unix)]
#[tokio::test]
async fn unwalkable_entry_is_a_file_error() {
    let ws = sample_project();
    std::os::unix::fs::symlink(ws.path("docs/missing.md"), ws.path("docs/ghost.md")).unwrap();
    let report = ws.report().await;

    let files = errors_of(&report, ErrorType::File);
    assert_eq!(files.len(), 1, "{}", report.to_text());
    assert!(files[0].path.ends_with("docs/ghost.md"));
    assert_eq!(report.summary.artifacts, 2);
    assert_eq!(report.status, Status::Fail);
}
