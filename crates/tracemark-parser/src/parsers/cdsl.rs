//! CDSL instruction checks
//!
//! Instructions keep document order. Within a scope, instruction tokens must
//! be unique and phases should not decrease; the latter is reported with the
//! configured phase-order policy.

use std::collections::BTreeMap;
use tracemark_artifact::{ErrorType, Findings, Policy, ValidationError};
use tracemark_symbol::{CdslInstruction, Identifier};

/// Scope within which instruction tokens must be unique
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CdslScope {
    /// Bound to a parent definition
    Parent(Identifier),
    /// Unbound, inside the block with this index
    Block(usize),
    /// Unbound in a markerless document
    Document,
}

/// Check token uniqueness and phase order for one document's instructions
///
/// `scopes` runs parallel to `instructions`.
#[must_use]
pub fn check_instructions(
    instructions: &[CdslInstruction],
    scopes: &[CdslScope],
    phase_order: Policy,
) -> Findings {
    let mut findings = Findings::new();
    let mut by_scope: BTreeMap<&CdslScope, Vec<&CdslInstruction>> = BTreeMap::new();
    for (inst, scope) in instructions.iter().zip(scopes) {
        by_scope.entry(scope).or_default().push(inst);
    }

    for (scope, items) in by_scope {
        let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
        let mut last_phase: Option<u32> = None;
        for inst in items {
            findings.checked(ErrorType::Structure, 1);
            if let Some(first) = seen.get(inst.token.as_str()) {
                let mut err = ValidationError::structure(
                    &inst.path,
                    format!("duplicate instruction token `{}` (first at line {first})", inst.token),
                )
                .at_line(inst.line)
                .with_marker("cdsl");
                if let CdslScope::Parent(id) = scope {
                    err = err.with_id(id.as_str());
                }
                findings.push(err);
            } else {
                seen.insert(&inst.token, inst.line);
            }

            if let (Some(prev), Some(severity)) = (last_phase, phase_order.severity()) {
                if inst.phase < prev {
                    findings.push(
                        ValidationError::structure(
                            &inst.path,
                            format!(
                                "instruction `{}` phase p{} follows phase p{prev}",
                                inst.token, inst.phase
                            ),
                        )
                        .at_line(inst.line)
                        .with_marker("cdsl")
                        .with_severity(severity),
                    );
                }
            }
            last_phase = Some(last_phase.map_or(inst.phase, |p| p.max(inst.phase)));
        }
    }

    findings
}
