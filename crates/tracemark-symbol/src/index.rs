//! Identifier registry with radix tree prefix index
//!
//! Signals are accumulated in a [`RegistryBuilder`] and then frozen into a
//! read-only [`Registry`]. Freezing sorts every signal by `(path, line)` so
//! the resulting index does not depend on the order workers reported in.

use crate::identifier::{
    CdslInstruction, CodeMarker, Identifier, IdentifierDefinition, IdentifierReference,
};
use radix_trie::{Trie, TrieCommon};
use std::collections::{BTreeMap, BTreeSet};
use tracemark_artifact::ArtifactKind;

/// Everything the registry knows about one identifier
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entry {
    /// Definitions in `(path, line)` order; more than one is a duplicate
    pub definitions: Vec<IdentifierDefinition>,
    /// References in `(path, line)` order
    pub references: Vec<IdentifierReference>,
    /// Code markers bound to the identifier
    pub code_markers: Vec<CodeMarker>,
    /// CDSL instructions whose parent is the identifier
    pub instructions: Vec<CdslInstruction>,
}

impl Entry {
    /// Whether the identifier is defined anywhere
    #[inline]
    #[must_use]
    pub fn is_defined(&self) -> bool {
        !self.definitions.is_empty()
    }

    /// First definition in `(path, line)` order
    #[inline]
    #[must_use]
    pub fn canonical(&self) -> Option<&IdentifierDefinition> {
        self.definitions.first()
    }
}

/// Append-only accumulator for registry signals
///
/// Order of insertion is irrelevant: [`RegistryBuilder::freeze`] imposes a
/// total order before building the index.
#[derive(Debug, Clone, Default)]
pub struct RegistryBuilder {
    definitions: Vec<IdentifierDefinition>,
    references: Vec<IdentifierReference>,
    code_markers: Vec<CodeMarker>,
    instructions: Vec<CdslInstruction>,
    kinds: BTreeSet<ArtifactKind>,
}

impl RegistryBuilder {
    /// Create empty builder
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a definition
    pub fn define(&mut self, definition: IdentifierDefinition) {
        self.definitions.push(definition);
    }

    /// Record a reference
    pub fn reference(&mut self, reference: IdentifierReference) {
        self.references.push(reference);
    }

    /// Record a code marker binding
    pub fn bind(&mut self, marker: CodeMarker) {
        self.code_markers.push(marker);
    }

    /// Record a CDSL instruction; unbound instructions are not indexed
    pub fn instruct(&mut self, instruction: CdslInstruction) {
        self.instructions.push(instruction);
    }

    /// Note the kind of a validated artifact
    pub fn note_kind(&mut self, kind: Option<&ArtifactKind>) {
        if let Some(kind) = kind {
            self.kinds.insert(kind.clone());
        }
    }

    /// Sort all signals and build the read-only registry
    #[must_use]
    pub fn freeze(mut self) -> Registry {
        self.definitions
            .sort_by(|a, b| (&a.path, a.line, &a.id).cmp(&(&b.path, b.line, &b.id)));
        self.references
            .sort_by(|a, b| (&a.path, a.line, &a.id).cmp(&(&b.path, b.line, &b.id)));
        self.code_markers.sort_by(|a, b| {
            (a.path(), a.line(), a.id()).cmp(&(b.path(), b.line(), b.id()))
        });
        self.instructions
            .sort_by(|a, b| (&a.path, a.line, &a.token).cmp(&(&b.path, b.line, &b.token)));

        let mut entries: BTreeMap<Identifier, Entry> = BTreeMap::new();
        for def in self.definitions {
            entries.entry(def.id.clone()).or_default().definitions.push(def);
        }
        for reference in self.references {
            entries
                .entry(reference.id.clone())
                .or_default()
                .references
                .push(reference);
        }
        for marker in self.code_markers {
            entries
                .entry(marker.id().clone())
                .or_default()
                .code_markers
                .push(marker);
        }
        for inst in self.instructions {
            if let Some(parent) = inst.parent.as_ref().map(|p| p.id.clone()) {
                entries.entry(parent).or_default().instructions.push(inst);
            }
        }

        let mut defined = Trie::new();
        for (id, entry) in &entries {
            if entry.is_defined() {
                defined.insert(id.as_str().to_string(), id.clone());
            }
        }

        Registry {
            entries,
            defined,
            kinds: self.kinds,
        }
    }
}

/// Run-scoped, read-only index of identifiers
///
/// Exact lookups go through an ordered map; prefix listings go through a
/// radix trie holding every defined identifier.
#[derive(Debug)]
pub struct Registry {
    entries: BTreeMap<Identifier, Entry>,
    defined: Trie<String, Identifier>,
    kinds: BTreeSet<ArtifactKind>,
}

impl Registry {
    /// Lookup everything known about an identifier
    #[must_use]
    pub fn lookup(&self, id: &str) -> Option<&Entry> {
        self.entries.get(&Identifier::new(id))
    }

    /// All entries in identifier order, defined or not
    pub fn entries(&self) -> impl Iterator<Item = (&Identifier, &Entry)> {
        self.entries.iter()
    }

    /// Defined identifiers in lexicographic order
    pub fn defined_ids(&self) -> impl Iterator<Item = &Identifier> {
        self.entries
            .iter()
            .filter(|(_, e)| e.is_defined())
            .map(|(id, _)| id)
    }

    /// Defined identifiers starting with `prefix`, sorted
    #[must_use]
    pub fn ids_with_prefix(&self, prefix: &str) -> Vec<&Identifier> {
        if prefix.is_empty() {
            return self.defined_ids().collect();
        }
        let Some(subtrie) = self.defined.get_raw_descendant(prefix) else {
            return Vec::new();
        };
        let mut ids: Vec<&Identifier> = subtrie
            .values()
            .filter(|id| id.as_str().starts_with(prefix))
            .collect();
        ids.sort();
        ids
    }

    /// Number of defined identifiers
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.defined.len()
    }

    /// Whether no identifier is defined
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defined.is_empty()
    }

    /// Artifact kinds seen during the run
    #[inline]
    #[must_use]
    pub fn kinds_seen(&self) -> &BTreeSet<ArtifactKind> {
        &self.kinds
    }

    /// Total number of references across all identifiers
    #[must_use]
    pub fn reference_count(&self) -> usize {
        self.entries.values().map(|e| e.references.len()).sum()
    }

    /// Total number of code markers across all identifiers
    #[must_use]
    pub fn code_marker_count(&self) -> usize {
        self.entries.values().map(|e| e.code_markers.len()).sum()
    }
}
