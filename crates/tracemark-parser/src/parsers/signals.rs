//! Identifier signals from marker-annotated documents
//!
//! Definitions are taken only from `id` blocks and inherit the block's
//! attributes; CDSL instructions only from `cdsl` blocks; references from
//! every other non-fenced, non-marker line.

use super::cdsl::CdslScope;
use super::fence::FenceMap;
use super::markers::MarkerParse;
use super::patterns::{checked, BACKTICKED, DEFINITION_ID, DEFINITION_LINE, INSTRUCTION};
use std::ops::Range;
use std::path::Path;
use tracemark_artifact::{Artifact, BlockType, Severity, ValidationError};
use tracemark_symbol::{
    CdslInstruction, DefinitionSpec, IdGrammar, Identifier, IdentifierDefinition,
    IdentifierReference, ParentBinding,
};

/// Signals extracted from one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentSignals {
    /// Identifier definitions in line order
    pub definitions: Vec<IdentifierDefinition>,
    /// Identifier references in line order
    pub references: Vec<IdentifierReference>,
    /// CDSL instructions in line order
    pub instructions: Vec<CdslInstruction>,
    /// Duplicate-token scope of each instruction (parallel to `instructions`)
    pub scopes: Vec<CdslScope>,
    /// Findings raised while extracting
    pub findings: Vec<ValidationError>,
}

/// Definition line parsed into its parts
pub(crate) struct DefinitionLine {
    pub(crate) tokens: Vec<String>,
    pub(crate) checked: Option<bool>,
    pub(crate) priority: Option<u8>,
}

pub(crate) fn definition_line(text: &str) -> Option<DefinitionLine> {
    let caps = DEFINITION_LINE.captures(text)?;
    let tokens = DEFINITION_ID
        .captures_iter(text)
        .map(|c| c["id"].to_string())
        .collect();
    Some(DefinitionLine {
        tokens,
        checked: checked(caps.name("check")),
        priority: caps.name("prio").and_then(|p| p.as_str().parse().ok()),
    })
}

/// Instruction line parsed into its parts
pub(crate) struct InstructionLine {
    pub(crate) phase: u32,
    pub(crate) checked: bool,
    pub(crate) description: String,
    pub(crate) token: String,
    pub(crate) description_span: Range<usize>,
}

pub(crate) fn instruction_line(text: &str) -> Option<InstructionLine> {
    let caps = INSTRUCTION.captures(text)?;
    let desc = caps.name("desc")?;
    Some(InstructionLine {
        phase: caps["phase"].parse().ok()?,
        checked: checked(caps.name("check")).unwrap_or(false),
        description: desc.as_str().to_string(),
        token: caps["token"].to_string(),
        description_span: desc.range(),
    })
}

/// Backticked identifiers within `span` of `text`
pub(crate) fn references_in<'a>(
    text: &'a str,
    span: Range<usize>,
    grammar: &'a IdGrammar,
) -> impl Iterator<Item = Identifier> + 'a {
    BACKTICKED
        .captures_iter(&text[span])
        .map(|c| c["tok"].to_string())
        .filter(|tok| grammar.matches(tok))
        .map(Identifier::new)
}

pub(crate) fn invalid_identifier(path: &Path, line: usize, token: &str, grammar: &IdGrammar) -> ValidationError {
    let message = match grammar.parse(token) {
        Err(err) => err.to_string(),
        Ok(_) => format!("invalid identifier '{token}'"),
    };
    ValidationError::structure(path, message).at_line(line).with_id(token)
}

/// Extract signals from a document that carries markers
#[must_use]
pub fn extract_marked(
    artifact: &Artifact,
    fences: &FenceMap,
    markers: &MarkerParse,
    grammar: &IdGrammar,
) -> DocumentSignals {
    let path = artifact.path();
    let lines = artifact.lines();
    let blocks = &markers.blocks;
    let mut out = DocumentSignals::default();

    let mut owner: Vec<Option<usize>> = vec![None; lines.len() + 1];
    for (index, block) in blocks.iter().enumerate() {
        let last = block.end_line.min(lines.len() + 1);
        for slot in owner.iter_mut().take(last).skip(block.start_line + 1) {
            *slot = Some(index);
        }
    }

    let mut definition_blocks: Vec<usize> = Vec::new();
    let mut pending: Vec<(CdslInstruction, usize)> = Vec::new();

    for (idx, text) in lines.iter().enumerate() {
        let line = idx + 1;
        if line < artifact.body_start()
            || fences.contains(line)
            || markers.marker_lines.binary_search(&line).is_ok()
        {
            continue;
        }
        let block_index = owner[line];
        let block = block_index.and_then(|i| blocks.get(i));
        let block_type = block.map(|b| b.block_type);

        if let Some(def) = definition_line(text) {
            let (Some(block), Some(index)) = (block.filter(|b| b.block_type == BlockType::Id), block_index) else {
                out.findings.push(
                    ValidationError::structure(path, "definition outside an `id` block is ignored")
                        .at_line(line)
                        .with_severity(Severity::Warning),
                );
                continue;
            };
            for token in def.tokens {
                if !grammar.matches(&token) {
                    out.findings.push(invalid_identifier(path, line, &token, grammar));
                    continue;
                }
                out.definitions.push(IdentifierDefinition {
                    id: Identifier::new(token),
                    path: path.to_path_buf(),
                    line,
                    checked: def.checked,
                    priority: def.priority,
                    kind: artifact.kind().cloned(),
                    spec: DefinitionSpec {
                        block: Some(block.name.clone()),
                        covered_by: block.attrs.covered_by.clone(),
                        has: block.attrs.has,
                        to_code: block.attrs.to_code(),
                    },
                    markerless: false,
                });
                definition_blocks.push(index);
            }
            continue;
        }

        let span = match instruction_line(text) {
            Some(inst) => {
                let span = inst.description_span.clone();
                if let (Some(BlockType::Cdsl), Some(index)) = (block_type, block_index) {
                    pending.push((
                        CdslInstruction {
                            phase: inst.phase,
                            checked: inst.checked,
                            description: inst.description,
                            token: inst.token,
                            path: path.to_path_buf(),
                            line,
                            parent: None,
                        },
                        index,
                    ));
                }
                span
            }
            None => 0..text.len(),
        };

        for id in references_in(text, span, grammar) {
            out.references.push(IdentifierReference {
                id,
                path: path.to_path_buf(),
                line,
                kind: artifact.kind().cloned(),
            });
        }
    }

    for (mut inst, index) in pending {
        let enclosing_id = std::iter::successors(Some(index), |&i| blocks.get(i).and_then(|b| b.parent))
            .find(|&i| blocks.get(i).is_some_and(|b| b.block_type == BlockType::Id));
        let parent = enclosing_id.and_then(|id_block| {
            definition_blocks
                .iter()
                .position(|&b| b == id_block)
                .map(|pos| out.definitions[pos].id.clone())
        });
        let scope = match &parent {
            Some(id) => CdslScope::Parent(id.clone()),
            None => CdslScope::Block(index),
        };
        inst.parent = parent.map(|id| ParentBinding {
            id,
            approximate: false,
            ambiguous: false,
        });
        out.instructions.push(inst);
        out.scopes.push(scope);
    }

    out
}
