//! Template model
//!
//! A template is itself marker-annotated Markdown. Every block it opens
//! becomes a [`BlockSpec`]; its YAML frontmatter names the artifact kind it
//! governs and may set the unknown-section policy and scoring weights.
//!
//! ```markdown
//! ---
//! kind: PRD
//! unknown_sections: error
//! ---
//! <!-- MARK:id:requirements required="true" repeat="many" covered_by="DESIGN" -->
//! <!-- MARK:id:requirements -->
//! ```

use crate::error::TemplateError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracemark_artifact::{Artifact, ArtifactKind, BlockAttrs, BlockType, ContentHash, ErrorType, Policy, Repeat};
use tracemark_parser::{FenceMap, MarkerParser};
use tracemark_symbol::IdentifierDefinition;

/// Per-category score weights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Weights {
    /// `template` findings
    pub template: f64,
    /// `structure` findings
    pub structure: f64,
    /// `kind` findings
    pub kind: f64,
    /// `file` findings
    pub file: f64,
    /// `cross-reference` findings
    #[serde(alias = "cross_reference")]
    pub cross_reference: f64,
    /// `traceability` findings
    pub traceability: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            template: 10.0,
            structure: 30.0,
            kind: 5.0,
            file: 15.0,
            cross_reference: 25.0,
            traceability: 15.0,
        }
    }
}

impl Weights {
    /// Weight of one category
    #[inline]
    #[must_use]
    pub fn get(&self, category: ErrorType) -> f64 {
        match category {
            ErrorType::Template => self.template,
            ErrorType::Structure => self.structure,
            ErrorType::Kind => self.kind,
            ErrorType::File => self.file,
            ErrorType::CrossReference => self.cross_reference,
            ErrorType::Traceability => self.traceability,
        }
    }
}

/// Expected block declared by a template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSpec {
    /// Block name
    pub name: String,
    /// Declared type
    pub block_type: BlockType,
    /// Declared attributes
    pub attrs: BlockAttrs,
    /// Name of the enclosing spec, if nested
    pub parent: Option<String>,
}

impl BlockSpec {
    /// Whether at least one matching block is required
    #[inline]
    #[must_use]
    pub fn required(&self) -> bool {
        self.attrs.required()
    }

    /// Declared cardinality
    #[inline]
    #[must_use]
    pub fn repeat(&self) -> Repeat {
        self.attrs.repeat()
    }
}

#[derive(Debug, Deserialize)]
struct Header {
    kind: Option<String>,
    #[serde(default)]
    unknown_sections: Option<Policy>,
    #[serde(default)]
    weights: Option<Weights>,
}

/// Expected shape of one artifact kind
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    kind: ArtifactKind,
    path: PathBuf,
    hash: ContentHash,
    specs: IndexMap<String, BlockSpec>,
    unknown_sections: Option<Policy>,
    weights: Option<Weights>,
}

impl Template {
    /// Parse a template document
    ///
    /// # Errors
    /// Returns error if the frontmatter is missing, lacks `kind` or is
    /// malformed, or if any marker in the template is invalid
    pub fn parse(path: impl Into<PathBuf>, text: &str) -> Result<Self, TemplateError> {
        let path = path.into();
        let artifact = Artifact::new(&path, text);

        if let Some(message) = artifact.frontmatter_error() {
            return Err(TemplateError::Frontmatter {
                path,
                message: message.to_string(),
            });
        }
        let Some(value) = artifact.frontmatter() else {
            return Err(TemplateError::MissingKind(path));
        };
        let header: Header =
            serde_yaml::from_value(value.clone()).map_err(|e| TemplateError::Frontmatter {
                path: path.clone(),
                message: e.to_string(),
            })?;
        let Some(kind) = header.kind.filter(|k| !k.trim().is_empty()) else {
            return Err(TemplateError::MissingKind(path));
        };

        let parsed = MarkerParser::new().parse(&artifact, &FenceMap::scan(text));
        if let Some(bad) = parsed.findings.iter().find(|f| f.is_error()) {
            return Err(TemplateError::Malformed {
                path,
                line: bad.line.unwrap_or(0),
                message: bad.message.clone(),
            });
        }

        let mut specs: IndexMap<String, BlockSpec> = IndexMap::with_capacity(parsed.blocks.len());
        for block in &parsed.blocks {
            if specs.contains_key(&block.name) {
                return Err(TemplateError::Malformed {
                    path,
                    line: block.start_line,
                    message: format!("block `{}` is declared twice", block.name),
                });
            }
            specs.insert(block.name.clone(), BlockSpec {
                name: block.name.clone(),
                block_type: block.block_type,
                attrs: block.attrs.clone(),
                parent: block
                    .parent
                    .and_then(|i| parsed.blocks.get(i))
                    .map(|p| p.name.clone()),
            });
        }

        Ok(Self {
            kind: ArtifactKind::new(kind.trim()),
            path,
            hash: *artifact.hash(),
            specs,
            unknown_sections: header.unknown_sections,
            weights: header.weights,
        })
    }

    /// Governed artifact kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &ArtifactKind {
        &self.kind
    }

    /// Template file path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Content hash of the template text
    #[inline]
    #[must_use]
    pub fn hash(&self) -> &ContentHash {
        &self.hash
    }

    /// Declared blocks in template order
    pub fn specs(&self) -> impl Iterator<Item = &BlockSpec> {
        self.specs.values()
    }

    /// Spec for a block name
    #[inline]
    #[must_use]
    pub fn spec(&self, name: &str) -> Option<&BlockSpec> {
        self.specs.get(name)
    }

    /// Fill definition attributes the artifact's own markers leave unset
    ///
    /// A marker in the artifact may set `covered_by`, `has` and `to_code`
    /// itself; otherwise the values declared for its block here apply.
    pub fn inherit_attrs(&self, definitions: &mut [IdentifierDefinition]) {
        for def in definitions {
            let Some(spec) = def.spec.block.as_deref().and_then(|b| self.spec(b)) else {
                continue;
            };
            if def.spec.covered_by.is_empty() {
                def.spec.covered_by.clone_from(&spec.attrs.covered_by);
            }
            if def.spec.has.is_none() {
                def.spec.has = spec.attrs.has;
            }
            if !def.spec.to_code {
                def.spec.to_code = spec.attrs.to_code();
            }
        }
    }

    /// Policy for blocks the template does not declare, if it sets one
    #[inline]
    #[must_use]
    pub fn unknown_sections(&self) -> Option<Policy> {
        self.unknown_sections
    }

    /// Kind-specific score weights
    #[inline]
    #[must_use]
    pub fn weights(&self) -> Option<&Weights> {
        self.weights.as_ref()
    }
}
