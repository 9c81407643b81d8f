//! Registry-wide checks
//!
//! Cross-reference checks (orphans, duplicates, `covered_by`) and
//! traceability checks joining code markers against definitions. Both walk
//! the frozen [`Registry`] and return collected [`Findings`].

use crate::identifier::{CodeMarker, Identifier, IdentifierDefinition};
use crate::index::{Entry, Registry};
use serde::{Deserialize, Serialize};
use tracemark_artifact::{ErrorType, Findings, Policy, Severity, ValidationError};

/// How code markers relate to documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TraceabilityMode {
    /// Code markers are expected and `to_code` coverage is enforced
    #[default]
    Full,
    /// Documentation only; any code marker is a violation
    DocsOnly,
}

impl std::str::FromStr for TraceabilityMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(TraceabilityMode::Full),
            "docs-only" => Ok(TraceabilityMode::DocsOnly),
            other => Err(format!("unknown traceability mode '{other}' (expected full|docs-only)")),
        }
    }
}

/// Orphan, duplicate and coverage-constraint checks
///
/// - every reference must resolve to a definition
/// - extra definitions are duplicates: always an error within one artifact,
///   `duplicates` policy across artifacts
/// - `covered_by` kinds must reference the identifier; markerless
///   definitions degrade to "referenced from another kind"
#[must_use]
pub fn check_cross_references(registry: &Registry, duplicates: Policy) -> Findings {
    let mut findings = Findings::new();
    let multi_kind = registry.kinds_seen().len() > 1;

    for (id, entry) in registry.entries() {
        findings.checked(ErrorType::CrossReference, entry.references.len());
        if !entry.is_defined() {
            for reference in &entry.references {
                findings.push(
                    ValidationError::cross_reference(
                        &reference.path,
                        format!("reference to undefined identifier `{id}`"),
                    )
                    .at_line(reference.line)
                    .with_id(id.as_str()),
                );
            }
            continue;
        }

        check_duplicates(id, entry, duplicates, &mut findings);

        let Some(canonical) = entry.canonical() else {
            continue;
        };
        if !canonical.spec.covered_by.is_empty() {
            findings.checked(ErrorType::CrossReference, 1);
            let covered = entry.references.iter().any(|r| {
                r.kind
                    .as_ref()
                    .is_some_and(|k| canonical.spec.covered_by.contains(k))
            });
            if !covered {
                let kinds: Vec<&str> = canonical.spec.covered_by.iter().map(|k| k.as_str()).collect();
                findings.push(
                    definition_finding(
                        canonical,
                        format!(
                            "identifier `{id}` is not referenced from any of: {}",
                            kinds.join(", ")
                        ),
                    )
                    .with_marker(canonical.spec.block.clone().unwrap_or_default()),
                );
            }
        } else if canonical.markerless {
            findings.checked(ErrorType::CrossReference, 1);
            let covered = entry
                .references
                .iter()
                .any(|r| r.kind.is_some() && r.kind != canonical.kind);
            if !covered {
                let severity = if multi_kind {
                    Severity::Error
                } else {
                    Severity::Warning
                };
                findings.push(
                    definition_finding(
                        canonical,
                        format!("identifier `{id}` is not referenced from another artifact kind"),
                    )
                    .with_severity(severity),
                );
            }
        }
    }

    findings
}

fn check_duplicates(id: &Identifier, entry: &Entry, policy: Policy, findings: &mut Findings) {
    findings.checked(ErrorType::CrossReference, 1);
    let Some(first) = entry.canonical() else {
        return;
    };
    for (i, extra) in entry.definitions.iter().enumerate().skip(1) {
        let same_artifact = entry.definitions[..i].iter().any(|d| d.path == extra.path);
        let severity = if same_artifact {
            Some(Severity::Error)
        } else {
            policy.severity()
        };
        let Some(severity) = severity else {
            continue;
        };
        findings.push(
            definition_finding(
                extra,
                format!(
                    "duplicate definition of `{id}` (first defined at {}:{})",
                    first.path.display(),
                    first.line
                ),
            )
            .with_severity(severity),
        );
    }
}

fn definition_finding(def: &IdentifierDefinition, message: String) -> ValidationError {
    ValidationError::cross_reference(&def.path, message)
        .at_line(def.line)
        .with_id(def.id.as_str())
}

/// Code-marker checks that need the whole registry
///
/// In [`TraceabilityMode::Full`]: markers must name defined identifiers,
/// block markers must agree with the identifier's CDSL instructions, and
/// every `to_code` identifier needs at least one marker. In
/// [`TraceabilityMode::DocsOnly`] every marker is itself a violation.
#[must_use]
pub fn check_traceability(registry: &Registry, mode: TraceabilityMode) -> Findings {
    let mut findings = Findings::new();

    for (id, entry) in registry.entries() {
        if mode == TraceabilityMode::DocsOnly {
            findings.checked(ErrorType::Traceability, entry.code_markers.len());
            for marker in &entry.code_markers {
                findings.push(
                    marker_finding(
                        ErrorType::Traceability,
                        marker,
                        format!("code marker for `{id}` not allowed in docs-only mode"),
                    ),
                );
            }
            continue;
        }

        for marker in &entry.code_markers {
            findings.checked(ErrorType::CrossReference, 1);
            if !entry.is_defined() {
                findings.push(marker_finding(
                    ErrorType::CrossReference,
                    marker,
                    format!("invented identifier `{id}` in code marker"),
                ));
                continue;
            }
            if let CodeMarker::Block(block) = marker {
                if entry.instructions.is_empty() {
                    continue;
                }
                findings.checked(ErrorType::Traceability, 1);
                match entry.instructions.iter().find(|i| i.token == block.token) {
                    None => findings.push(marker_finding(
                        ErrorType::Traceability,
                        marker,
                        format!(
                            "code block token `{}` does not name an instruction of `{id}`",
                            block.token
                        ),
                    )),
                    Some(inst) if inst.phase != block.phase => findings.push(marker_finding(
                        ErrorType::Traceability,
                        marker,
                        format!(
                            "code block `{}` has phase p{} but instruction is phase p{}",
                            block.token, block.phase, inst.phase
                        ),
                    )),
                    Some(_) => {}
                }
            }
        }

        if let Some(def) = entry.definitions.iter().find(|d| d.spec.to_code) {
            findings.checked(ErrorType::Traceability, 1);
            if entry.code_markers.is_empty() {
                findings.push(
                    ValidationError::traceability(
                        &def.path,
                        format!("identifier `{id}` requires code but has no code marker"),
                    )
                    .at_line(def.line)
                    .with_id(id.as_str()),
                );
            }
        }
    }

    findings
}

fn marker_finding(error_type: ErrorType, marker: &CodeMarker, message: String) -> ValidationError {
    ValidationError::new(error_type, marker.path(), message)
        .at_line(marker.line())
        .with_id(marker.id().as_str())
        .with_marker(marker.marker_name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::{
        BlockMarker, CdslInstruction, DefinitionSpec, IdentifierReference, ParentBinding,
        ScopeMarker,
    };
    use crate::index::RegistryBuilder;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use tracemark_artifact::ArtifactKind;

    fn def(id: &str, path: &str, line: usize) -> IdentifierDefinition {
        IdentifierDefinition {
            id: Identifier::new(id),
            path: PathBuf::from(path),
            line,
            checked: None,
            priority: None,
            kind: Some(ArtifactKind::new("PRD")),
            spec: DefinitionSpec::default(),
            markerless: false,
        }
    }

    fn reference(id: &str, path: &str, line: usize, kind: &str) -> IdentifierReference {
        IdentifierReference {
            id: Identifier::new(id),
            path: PathBuf::from(path),
            line,
            kind: Some(ArtifactKind::new(kind)),
        }
    }

    fn begin(id: &str, phase: u32, token: &str) -> CodeMarker {
        CodeMarker::Block(BlockMarker {
            id: Identifier::new(id),
            phase,
            token: token.into(),
            path: PathBuf::from("src/login.rs"),
            begin_line: 10,
            end_line: Some(14),
        })
    }

    fn errors(findings: &Findings, category: ErrorType) -> Vec<&ValidationError> {
        findings
            .items()
            .iter()
            .filter(|f| f.error_type == category && f.is_error())
            .collect()
    }

    #[test]
    fn resolved_reference_is_clean() {
        let mut b = RegistryBuilder::new();
        b.define(def("sys-fr-login", "a.md", 1));
        b.reference(reference("sys-fr-login", "b.md", 4, "DESIGN"));
        let findings = check_cross_references(&b.freeze(), Policy::Warn);
        assert!(findings.items().is_empty());
    }

    #[test]
    fn each_orphan_reference_is_reported_once() {
        let mut b = RegistryBuilder::new();
        b.reference(reference("sys-fr-ghost", "b.md", 4, "DESIGN"));
        b.reference(reference("sys-fr-ghost", "b.md", 9, "DESIGN"));
        let findings = check_cross_references(&b.freeze(), Policy::Warn);

        let orphans = errors(&findings, ErrorType::CrossReference);
        assert_eq!(orphans.len(), 2);
        assert_eq!(orphans[0].line, Some(4));
        assert_eq!(orphans[1].line, Some(9));
        assert_eq!(orphans[0].id.as_deref(), Some("sys-fr-ghost"));
    }

    #[test]
    fn duplicate_severity_depends_on_artifact() {
        let mut b = RegistryBuilder::new();
        b.define(def("sys-fr-a", "a.md", 1));
        b.define(def("sys-fr-a", "a.md", 5));
        b.define(def("sys-fr-a", "b.md", 2));
        let findings = check_cross_references(&b.freeze(), Policy::Warn);

        let severities: Vec<_> = findings.items().iter().map(|f| (f.path.as_str(), f.severity)).collect();
        assert_eq!(
            severities,
            vec![("a.md", Severity::Error), ("b.md", Severity::Warning)]
        );
    }

    #[test]
    fn allow_policy_silences_cross_artifact_duplicates() {
        let mut b = RegistryBuilder::new();
        b.define(def("sys-fr-a", "a.md", 1));
        b.define(def("sys-fr-a", "b.md", 2));
        let findings = check_cross_references(&b.freeze(), Policy::Allow);
        assert!(findings.items().is_empty());
    }

    #[test]
    fn covered_by_requires_reference_from_listed_kind() {
        let mut covered = def("sys-fr-login", "prd.md", 3);
        covered.spec.covered_by = vec![ArtifactKind::new("DESIGN")];
        covered.spec.block = Some("requirements".into());

        let mut b = RegistryBuilder::new();
        b.define(covered.clone());
        b.reference(reference("sys-fr-login", "other-prd.md", 1, "PRD"));
        let findings = check_cross_references(&b.freeze(), Policy::Warn);
        let errs = errors(&findings, ErrorType::CrossReference);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].marker_type.as_deref(), Some("requirements"));

        let mut b = RegistryBuilder::new();
        b.define(covered);
        b.reference(reference("sys-fr-login", "design.md", 1, "DESIGN"));
        assert!(check_cross_references(&b.freeze(), Policy::Warn).items().is_empty());
    }

    #[test]
    fn markerless_coverage_warns_in_single_kind_runs() {
        let mut d = def("sys-fr-notes", "notes.md", 2);
        d.markerless = true;

        let mut b = RegistryBuilder::new();
        b.define(d.clone());
        b.note_kind(Some(&ArtifactKind::new("PRD")));
        let single = check_cross_references(&b.freeze(), Policy::Warn);
        assert_eq!(single.items().len(), 1);
        assert_eq!(single.items()[0].severity, Severity::Warning);

        let mut b = RegistryBuilder::new();
        b.define(d);
        b.note_kind(Some(&ArtifactKind::new("PRD")));
        b.note_kind(Some(&ArtifactKind::new("DESIGN")));
        let multi = check_cross_references(&b.freeze(), Policy::Warn);
        assert_eq!(errors(&multi, ErrorType::CrossReference).len(), 1);
    }

    #[test]
    fn matched_code_block_on_defined_id_is_clean() {
        let mut b = RegistryBuilder::new();
        b.define(def("sys-flow-login", "a.md", 1));
        b.bind(begin("sys-flow-login", 1, "inst-a"));
        let findings = check_traceability(&b.freeze(), TraceabilityMode::Full);
        assert!(findings.items().is_empty());
    }

    #[test]
    fn invented_identifier_is_cross_reference_error() {
        let mut b = RegistryBuilder::new();
        b.bind(CodeMarker::Scope(ScopeMarker {
            kind: "algo".into(),
            id: Identifier::new("sys-algo-made-up"),
            phase: 1,
            path: "src/x.py".into(),
            line: 2,
        }));
        let findings = check_traceability(&b.freeze(), TraceabilityMode::Full);
        let errs = errors(&findings, ErrorType::CrossReference);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].marker_type.as_deref(), Some("algo"));
    }

    #[test]
    fn uncovered_to_code_identifier_yields_one_error() {
        let mut d = def("sys-flow-login", "a.md", 7);
        d.spec.to_code = true;
        let mut b = RegistryBuilder::new();
        b.define(d.clone());
        b.define(IdentifierDefinition {
            path: "b.md".into(),
            ..d
        });
        let findings = check_traceability(&b.freeze(), TraceabilityMode::Full);

        let errs = errors(&findings, ErrorType::Traceability);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].id.as_deref(), Some("sys-flow-login"));
        assert_eq!(errs[0].line, Some(7));
    }

    #[test]
    fn block_marker_must_match_bound_instruction() {
        let mut b = RegistryBuilder::new();
        b.define(def("sys-flow-login", "a.md", 1));
        b.instruct(CdslInstruction {
            phase: 2,
            checked: false,
            description: "hash the password".into(),
            token: "inst-hash".into(),
            path: "a.md".into(),
            line: 3,
            parent: Some(ParentBinding {
                id: Identifier::new("sys-flow-login"),
                approximate: false,
                ambiguous: false,
            }),
        });
        b.bind(begin("sys-flow-login", 1, "inst-hash"));
        b.bind(begin("sys-flow-login", 2, "inst-salt"));
        b.bind(begin("sys-flow-login", 2, "inst-hash"));
        let findings = check_traceability(&b.freeze(), TraceabilityMode::Full);

        let messages: Vec<_> = errors(&findings, ErrorType::Traceability)
            .into_iter()
            .map(|f| f.message.clone())
            .collect();
        assert_eq!(messages.len(), 2);
        assert!(messages.iter().any(|m| m.contains("phase p1")));
        assert!(messages.iter().any(|m| m.contains("`inst-salt`")));
    }

    #[test]
    fn docs_only_mode_rejects_every_marker_and_skips_coverage() {
        let mut d = def("sys-flow-login", "a.md", 1);
        d.spec.to_code = true;
        let mut b = RegistryBuilder::new();
        b.define(d);
        b.define(def("sys-flow-other", "a.md", 2));
        b.bind(begin("sys-flow-other", 1, "inst-a"));
        let findings = check_traceability(&b.freeze(), TraceabilityMode::DocsOnly);

        assert_eq!(findings.items().len(), 1);
        assert!(findings.items()[0].message.contains("docs-only"));
        assert_eq!(findings.checks(ErrorType::Traceability), 1);
    }

    #[test]
    fn traceability_mode_parses() {
        assert_eq!("docs-only".parse::<TraceabilityMode>(), Ok(TraceabilityMode::DocsOnly));
        assert!("partial".parse::<TraceabilityMode>().is_err());
    }
}
