//! Markerless extractor
//!
//! Best-effort, line-oriented extraction for documents with no markers.
//! Produces one synthetic whole-document block and independently scanned
//! definitions, references and instructions. Fenced code is skipped.
//!
//! An instruction's parent is the nearest preceding definition by line;
//! that binding is heuristic and flagged `approximate`.

use super::cdsl::CdslScope;
use super::fence::FenceMap;
use super::signals::{definition_line, instruction_line, invalid_identifier, references_in, DocumentSignals};
use tracemark_artifact::{Artifact, Block};
use tracemark_symbol::{
    CdslInstruction, DefinitionSpec, IdGrammar, Identifier, IdentifierDefinition,
    IdentifierReference, ParentBinding,
};

/// Heuristic extractor for unmarked documents
#[derive(Debug, Clone)]
pub struct MarkerlessExtractor<'g> {
    grammar: &'g IdGrammar,
}

impl<'g> MarkerlessExtractor<'g> {
    /// Create extractor using an identifier grammar
    #[inline]
    #[must_use]
    pub fn new(grammar: &'g IdGrammar) -> Self {
        Self { grammar }
    }

    /// Synthetic `free` block spanning the document body
    #[must_use]
    pub fn synthetic_block(artifact: &Artifact) -> Block {
        let body = artifact.lines().get(artifact.body_start() - 1..).unwrap_or_default();
        let mut block = Block::synthetic(body);
        block.start_line = artifact.body_start();
        block.end_line = artifact.lines().len().max(block.start_line);
        block
    }

    /// Scan every non-fenced body line
    #[must_use]
    pub fn extract(&self, artifact: &Artifact, fences: &FenceMap) -> DocumentSignals {
        let path = artifact.path();
        let mut out = DocumentSignals::default();
        let mut nearest: Option<(usize, Vec<Identifier>)> = None;

        for (idx, text) in artifact.lines().iter().enumerate() {
            let line = idx + 1;
            if line < artifact.body_start() || fences.contains(line) {
                continue;
            }

            if let Some(def) = definition_line(text) {
                let mut on_line = Vec::new();
                for token in def.tokens {
                    if !self.grammar.matches(&token) {
                        out.findings.push(invalid_identifier(path, line, &token, self.grammar));
                        continue;
                    }
                    let id = Identifier::new(token);
                    on_line.push(id.clone());
                    out.definitions.push(IdentifierDefinition {
                        id,
                        path: path.to_path_buf(),
                        line,
                        checked: def.checked,
                        priority: def.priority,
                        kind: artifact.kind().cloned(),
                        spec: DefinitionSpec::default(),
                        markerless: true,
                    });
                }
                if !on_line.is_empty() {
                    nearest = Some((line, on_line));
                }
                continue;
            }

            let span = match instruction_line(text) {
                Some(inst) => {
                    let span = inst.description_span.clone();
                    let parent = nearest.as_ref().and_then(|(_, ids)| {
                        ids.first().map(|id| ParentBinding {
                            id: id.clone(),
                            approximate: true,
                            ambiguous: ids.len() > 1,
                        })
                    });
                    let scope = parent
                        .as_ref()
                        .map_or(CdslScope::Document, |p| CdslScope::Parent(p.id.clone()));
                    out.instructions.push(CdslInstruction {
                        phase: inst.phase,
                        checked: inst.checked,
                        description: inst.description,
                        token: inst.token,
                        path: path.to_path_buf(),
                        line,
                        parent,
                    });
                    out.scopes.push(scope);
                    span
                }
                None => 0..text.len(),
            };

            for id in references_in(text, span, self.grammar) {
                out.references.push(IdentifierReference {
                    id,
                    path: path.to_path_buf(),
                    line,
                    kind: artifact.kind().cloned(),
                });
            }
        }

        out
    }
}
