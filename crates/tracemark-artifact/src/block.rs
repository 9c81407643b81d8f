//! Structural blocks
//!
//! A [`Block`] is the region of an artifact bounded by a named marker pair,
//! or the synthetic whole-document block produced in markerless mode.
//! Marker attributes are parsed into the typed [`BlockAttrs`] at parse time.

use crate::kind::ArtifactKind;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Declared block type (`MARK:<type>:<name>`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockType {
    /// Free-form content; may contain nested blocks
    #[default]
    Free,
    /// Identifier definitions; may contain nested blocks
    Id,
    /// Identifier references
    IdRef,
    /// Bulleted list
    List,
    /// Numbered list
    NumberedList,
    /// Checkbox list
    TaskList,
    /// Markdown table
    Table,
    /// Prose paragraph
    Paragraph,
    /// Fenced code
    Code,
    /// Heading, optionally at a fixed level
    Heading {
        /// Required level (1-6) if pinned
        level: Option<u8>,
    },
    /// Markdown link
    Link,
    /// Markdown image
    Image,
    /// CDSL instruction steps
    Cdsl,
}

impl BlockType {
    /// Whether markers inside this block are parsed as nested blocks
    #[inline]
    #[must_use]
    pub fn is_container(self) -> bool {
        matches!(self, BlockType::Free | BlockType::Id)
    }
}

impl Display for BlockType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            BlockType::Free => f.write_str("free"),
            BlockType::Id => f.write_str("id"),
            BlockType::IdRef => f.write_str("id-ref"),
            BlockType::List => f.write_str("list"),
            BlockType::NumberedList => f.write_str("numbered-list"),
            BlockType::TaskList => f.write_str("task-list"),
            BlockType::Table => f.write_str("table"),
            BlockType::Paragraph => f.write_str("paragraph"),
            BlockType::Code => f.write_str("code"),
            BlockType::Heading { level: None } => f.write_str("heading"),
            BlockType::Heading { level: Some(n) } => write!(f, "heading-{n}"),
            BlockType::Link => f.write_str("link"),
            BlockType::Image => f.write_str("image"),
            BlockType::Cdsl => f.write_str("cdsl"),
        }
    }
}

impl FromStr for BlockType {
    type Err = AttrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ty = match s {
            "free" => BlockType::Free,
            "id" => BlockType::Id,
            "id-ref" => BlockType::IdRef,
            "list" => BlockType::List,
            "numbered-list" => BlockType::NumberedList,
            "task-list" => BlockType::TaskList,
            "table" => BlockType::Table,
            "paragraph" => BlockType::Paragraph,
            "code" => BlockType::Code,
            "heading" | "heading-level" => BlockType::Heading { level: None },
            "link" => BlockType::Link,
            "image" => BlockType::Image,
            "cdsl" => BlockType::Cdsl,
            other => {
                let level = other
                    .strip_prefix("heading-")
                    .and_then(|n| n.parse::<u8>().ok())
                    .filter(|n| (1..=6).contains(n))
                    .ok_or_else(|| AttrError::UnknownType(other.to_string()))?;
                BlockType::Heading { level: Some(level) }
            }
        };
        Ok(ty)
    }
}

/// Block cardinality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Repeat {
    /// At most one occurrence
    #[default]
    One,
    /// Any number of occurrences
    Many,
}

/// Content feature demanded of definitions in the block (`has="..."`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Has {
    /// Checkbox must agree with child tasks
    Task,
    /// Priority token required
    Priority,
}

/// Typed marker attributes
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlockAttrs {
    /// `required` (default true)
    pub required: Option<bool>,
    /// `repeat` (default one)
    pub repeat: Option<Repeat>,
    /// `covered_by`: kinds that must reference identifiers defined here
    pub covered_by: Vec<ArtifactKind>,
    /// `has`
    pub has: Option<Has>,
    /// `to_code`: identifiers defined here need a code marker
    pub to_code: Option<bool>,
}

impl BlockAttrs {
    /// Effective `required`
    #[inline]
    #[must_use]
    pub fn required(&self) -> bool {
        self.required.unwrap_or(true)
    }

    /// Effective `repeat`
    #[inline]
    #[must_use]
    pub fn repeat(&self) -> Repeat {
        self.repeat.unwrap_or_default()
    }

    /// Effective `to_code`
    #[inline]
    #[must_use]
    pub fn to_code(&self) -> bool {
        self.to_code.unwrap_or(false)
    }

    /// Apply one `key="value"` pair
    ///
    /// # Errors
    /// Returns error for unknown keys or values outside the key's domain
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), AttrError> {
        match key {
            "required" => self.required = Some(parse_bool(key, value)?),
            "to_code" => self.to_code = Some(parse_bool(key, value)?),
            "repeat" => {
                self.repeat = Some(match value {
                    "one" => Repeat::One,
                    "many" => Repeat::Many,
                    _ => return Err(invalid(key, value, "one|many")),
                });
            }
            "has" => {
                self.has = Some(match value {
                    "task" => Has::Task,
                    "priority" => Has::Priority,
                    _ => return Err(invalid(key, value, "task|priority")),
                });
            }
            "covered_by" => {
                self.covered_by = value
                    .split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(ArtifactKind::new)
                    .collect();
            }
            other => return Err(AttrError::UnknownAttribute(other.to_string())),
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, AttrError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(invalid(key, value, "true|false")),
    }
}

fn invalid(key: &str, value: &str, expected: &'static str) -> AttrError {
    AttrError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        expected,
    }
}

/// Attribute and type-token errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttrError {
    /// Unrecognised block type token
    #[error("unknown block type '{0}'")]
    UnknownType(String),

    /// Unrecognised attribute key
    #[error("unknown attribute '{0}'")]
    UnknownAttribute(String),

    /// Value outside the attribute's domain
    #[error("invalid value '{value}' for attribute '{key}' (expected {expected})")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },

    /// Not a `key="value"` pair
    #[error("malformed attribute syntax near '{0}'")]
    Malformed(String),
}

/// Parsed region of an artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Marker name
    pub name: String,
    /// Declared type
    pub block_type: BlockType,
    /// Typed attributes from the opening marker
    pub attrs: BlockAttrs,
    /// Line of the opening marker (1-based)
    pub start_line: usize,
    /// Line of the closing marker (1-based)
    pub end_line: usize,
    /// Raw lines strictly between the markers
    pub content: Vec<String>,
    /// Index of the enclosing block in the document's block list
    pub parent: Option<usize>,
    /// Whole-document block produced in markerless mode
    pub synthetic: bool,
}

impl Block {
    /// Synthetic `free` block spanning a whole markerless document
    #[must_use]
    pub fn synthetic(lines: &[String]) -> Self {
        Self {
            name: "document".to_string(),
            block_type: BlockType::Free,
            attrs: BlockAttrs {
                required: Some(false),
                ..BlockAttrs::default()
            },
            start_line: 1,
            end_line: lines.len(),
            content: lines.to_vec(),
            parent: None,
            synthetic: true,
        }
    }

    /// Content lines paired with their 1-based line numbers
    pub fn numbered_content(&self) -> impl Iterator<Item = (usize, &str)> {
        let first = if self.synthetic {
            self.start_line
        } else {
            self.start_line + 1
        };
        self.content
            .iter()
            .enumerate()
            .map(move |(i, line)| (first + i, line.as_str()))
    }

    /// Whether the block has no non-blank content
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.content.iter().all(|l| l.trim().is_empty())
    }

    /// Whether `line` falls strictly inside this block
    #[inline]
    #[must_use]
    pub fn encloses_line(&self, line: usize) -> bool {
        if self.synthetic {
            (self.start_line..=self.end_line).contains(&line)
        } else {
            line > self.start_line && line < self.end_line
        }
    }
}
