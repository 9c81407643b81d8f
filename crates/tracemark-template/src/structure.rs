//! Structural validation
//!
//! Block-level rules (empty required blocks, per-type shapes) apply to every
//! marker-annotated document. Template rules (required, repeat, unknown
//! sections) apply only when a template governs the artifact's kind.
//! Definition rules (`has="task"`, `has="priority"`) apply in both modes.

use crate::shape::{self, TASK_ITEM};
use crate::template::Template;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracemark_artifact::{Artifact, BlockType, ErrorType, Findings, Has, Policy, Repeat, ValidationError};
use tracemark_parser::ParsedDocument;
use tracemark_symbol::IdentifierDefinition;

/// Validate a parsed document's structure
///
/// `unknown_sections` applies when the template does not set its own policy.
#[must_use]
pub fn check_structure(
    artifact: &Artifact,
    doc: &ParsedDocument,
    template: Option<&Template>,
    unknown_sections: Policy,
) -> Findings {
    let path = artifact.path();
    let mut findings = Findings::new();

    check_blocks(path, doc, template, &mut findings);
    if let Some(template) = template.filter(|_| !doc.markerless) {
        let policy = template.unknown_sections().unwrap_or(unknown_sections);
        check_template(path, doc, template, policy, &mut findings);
    }
    check_definitions(path, doc, &mut findings);

    findings
}

fn check_blocks(path: &Path, doc: &ParsedDocument, template: Option<&Template>, findings: &mut Findings) {
    for block in doc.blocks.iter().filter(|b| !b.synthetic) {
        let spec = template.and_then(|t| t.spec(&block.name));
        let required = block
            .attrs
            .required
            .or_else(|| spec.and_then(|s| s.attrs.required))
            .unwrap_or(true);

        findings.checked(ErrorType::Structure, 1);
        if block.is_blank() {
            if required {
                findings.push(
                    ValidationError::structure(
                        path,
                        format!("required block `{}` missing content", block.name),
                    )
                    .at_line(block.start_line)
                    .with_marker(block.name.clone()),
                );
            }
            continue;
        }

        if let Some(spec) = spec {
            findings.checked(ErrorType::Structure, 1);
            if spec.block_type != block.block_type {
                findings.push(
                    ValidationError::structure(
                        path,
                        format!(
                            "block `{}` is `{}` but the template declares `{}`",
                            block.name, block.block_type, spec.block_type
                        ),
                    )
                    .at_line(block.start_line)
                    .with_marker(block.name.clone()),
                );
                continue;
            }
        }

        findings.checked(ErrorType::Structure, 1);
        if let Err(expected) = shape::check(block, doc) {
            findings.push(
                ValidationError::structure(
                    path,
                    format!("block `{}` ({}) expected {expected}", block.name, block.block_type),
                )
                .at_line(block.start_line)
                .with_marker(block.name.clone()),
            );
        }
    }
}

fn check_template(
    path: &Path,
    doc: &ParsedDocument,
    template: &Template,
    unknown_sections: Policy,
    findings: &mut Findings,
) {
    let mut seen: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for block in &doc.blocks {
        seen.entry(block.name.as_str()).or_default().push(block.start_line);
    }

    for spec in template.specs() {
        let lines = seen.get(spec.name.as_str()).map_or(&[][..], Vec::as_slice);

        if spec.required() {
            findings.checked(ErrorType::Structure, 1);
            if lines.is_empty() {
                findings.push(
                    ValidationError::structure(
                        path,
                        format!("required block `{}` is missing", spec.name),
                    )
                    .with_marker(spec.name.clone()),
                );
            }
        }

        if spec.repeat() == Repeat::One {
            findings.checked(ErrorType::Structure, 1);
            for &line in lines.iter().skip(1) {
                findings.push(
                    ValidationError::structure(
                        path,
                        format!(
                            "block `{}` appears again but repeat is `one` (first at line {})",
                            spec.name, lines[0]
                        ),
                    )
                    .at_line(line)
                    .with_marker(spec.name.clone()),
                );
            }
        }
    }

    let Some(severity) = unknown_sections.severity() else {
        return;
    };
    for block in &doc.blocks {
        if template.spec(&block.name).is_some() {
            continue;
        }
        findings.checked(ErrorType::Structure, 1);
        findings.push(
            ValidationError::structure(
                path,
                format!(
                    "block `{}` is not declared by the {} template",
                    block.name,
                    template.kind()
                ),
            )
            .at_line(block.start_line)
            .with_marker(block.name.clone())
            .with_severity(severity),
        );
    }
}

fn check_definitions(path: &Path, doc: &ParsedDocument, findings: &mut Findings) {
    let instruction_lines: BTreeSet<usize> =
        doc.signals.instructions.iter().map(|i| i.line).collect();

    for def in &doc.signals.definitions {
        if def.spec.has == Some(Has::Priority) {
            findings.checked(ErrorType::Structure, 1);
            if def.priority.is_none() {
                findings.push(definition_error(path, def, "requires a priority token (`pN`)"));
            }
        }

        let task_scoped = def.spec.has == Some(Has::Task);
        let own = match def.checked {
            Some(own) if task_scoped || def.markerless => own,
            None if task_scoped => {
                findings.checked(ErrorType::Structure, 1);
                findings.push(definition_error(path, def, "requires a checkbox (`- [ ]` or `- [x]`)"));
                continue;
            }
            _ => continue,
        };

        let mut children: Vec<bool> = doc
            .signals
            .instructions
            .iter()
            .filter(|i| i.parent.as_ref().is_some_and(|p| p.id == def.id))
            .map(|i| i.checked)
            .collect();
        if !def.markerless {
            children.extend(task_items(doc, def, &instruction_lines));
        }
        if children.is_empty() {
            continue;
        }

        findings.checked(ErrorType::Structure, 1);
        let done = children.iter().filter(|c| **c).count();
        if own && done < children.len() {
            findings.push(definition_error(
                path,
                def,
                &format!("is checked but {} of {} child tasks are open", children.len() - done, children.len()),
            ));
        } else if !own && done == children.len() {
            findings.push(definition_error(path, def, "is unchecked but all child tasks are done"));
        }
    }
}

/// Checkbox states of task-list items in the definition's own `id` block
fn task_items<'a>(
    doc: &'a ParsedDocument,
    def: &'a IdentifierDefinition,
    instruction_lines: &'a BTreeSet<usize>,
) -> impl Iterator<Item = bool> + 'a {
    let owner = doc
        .blocks
        .iter()
        .enumerate()
        .filter(|(_, b)| b.block_type == BlockType::Id && b.encloses_line(def.line))
        .max_by_key(|(_, b)| b.start_line);

    owner.into_iter().flat_map(move |(index, block)| {
        block.numbered_content().filter_map(move |(line, text)| {
            let nested = doc.blocks.iter().enumerate().any(|(j, b)| {
                j != index
                    && b.block_type == BlockType::Id
                    && b.start_line > block.start_line
                    && b.encloses_line(line)
            });
            if nested
                || line == def.line
                || instruction_lines.contains(&line)
                || doc.fences.contains(line)
                || text.contains("**ID**:")
            {
                return None;
            }
            TASK_ITEM
                .captures(text)
                .map(|c| c["check"].eq_ignore_ascii_case("x"))
        })
    })
}

fn definition_error(path: &Path, def: &IdentifierDefinition, what: &str) -> ValidationError {
    ValidationError::structure(path, format!("definition `{}` {what}", def.id))
        .at_line(def.line)
        .with_id(def.id.as_str())
}
