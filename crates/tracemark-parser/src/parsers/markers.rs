//! Marker parser
//!
//! Tokenizes a document into blocks bounded by `<!-- MARK:(TYPE:)?NAME -->`
//! comment pairs. Parsing is error-tolerant: every malformed marker,
//! attribute or pairing problem becomes a finding and the pass continues.
//!
//! Pairing rules:
//! - a marker with attributes always opens a block
//! - a bare marker closes the open block of the same name, otherwise opens
//! - a same-name opener while that name is open is rejected
//! - only `free` and `id` blocks parse nested markers; other blocks are opaque

use super::fence::FenceMap;
use super::patterns::{ATTRIBUTE, MARKER, MARKER_LIKE};
use tracemark_artifact::{
    Artifact, AttrError, Block, BlockAttrs, BlockType, ValidationError,
};

/// One recognised marker line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    /// 1-based line
    pub line: usize,
    /// Block name
    pub name: String,
    /// Explicit type token, if any
    pub block_type: Option<BlockType>,
    /// Parsed attributes
    pub attrs: BlockAttrs,
    /// Marker carried at least one attribute token
    pub has_attrs: bool,
}

/// Result of parsing one document's markers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerParse {
    /// Blocks in opening order; `parent` indexes into this list
    pub blocks: Vec<Block>,
    /// `template` and `structure` findings
    pub findings: Vec<ValidationError>,
    /// Marker occurrences, well-formed or not
    pub marker_count: usize,
    /// Lines occupied by recognised markers
    pub marker_lines: Vec<usize>,
}

struct OpenBlock {
    index: usize,
    name: String,
    block_type: BlockType,
    start_line: usize,
}

/// Marker parser over a single artifact
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkerParser;

impl MarkerParser {
    /// Create new marker parser
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Parse the artifact's body into blocks
    #[must_use]
    pub fn parse(&self, artifact: &Artifact, fences: &FenceMap) -> MarkerParse {
        let path = artifact.path();
        let lines = artifact.lines();
        let mut out = MarkerParse::default();
        let mut stack: Vec<OpenBlock> = Vec::new();

        for (idx, text) in lines.iter().enumerate() {
            let line = idx + 1;
            if line < artifact.body_start() || fences.contains(line) {
                continue;
            }
            if !MARKER_LIKE.is_match(text) {
                continue;
            }

            let opaque = stack.last().is_some_and(|open| !open.block_type.is_container());
            let marker = match Self::parse_marker(text, line) {
                Ok((marker, attr_errors)) => {
                    if opaque && !closes_top(&stack, &marker) {
                        continue;
                    }
                    for err in attr_errors {
                        out.findings.push(
                            ValidationError::template(path, err.to_string())
                                .at_line(line)
                                .with_marker(marker.name.clone()),
                        );
                    }
                    marker
                }
                Err(err) => {
                    if opaque {
                        continue;
                    }
                    out.marker_count += 1;
                    out.findings
                        .push(ValidationError::template(path, err.to_string()).at_line(line));
                    continue;
                }
            };
            out.marker_count += 1;
            out.marker_lines.push(line);

            let open_at = stack.iter().rposition(|open| open.name == marker.name);
            match (marker.has_attrs, open_at) {
                (true, Some(pos)) => {
                    out.findings.push(
                        ValidationError::structure(
                            path,
                            format!(
                                "block `{}` reopened while already open since line {}",
                                marker.name, stack[pos].start_line
                            ),
                        )
                        .at_line(line)
                        .with_marker(marker.name),
                    );
                }
                (false, Some(pos)) => {
                    while stack.len() > pos + 1 {
                        if let Some(inner) = stack.pop() {
                            out.findings.push(unclosed(path, &inner));
                            finish(&mut out.blocks, &inner, line, lines);
                        }
                    }
                    if let Some(open) = stack.pop() {
                        if let Some(ty) = marker.block_type.filter(|ty| *ty != open.block_type) {
                            out.findings.push(
                                ValidationError::structure(
                                    path,
                                    format!(
                                        "closing marker type `{ty}` does not match opening type `{}`",
                                        open.block_type
                                    ),
                                )
                                .at_line(line)
                                .with_marker(open.name.clone()),
                            );
                        }
                        finish(&mut out.blocks, &open, line, lines);
                    }
                }
                (_, None) => {
                    let block_type = marker.block_type.unwrap_or_default();
                    let index = out.blocks.len();
                    out.blocks.push(Block {
                        name: marker.name.clone(),
                        block_type,
                        attrs: marker.attrs,
                        start_line: line,
                        end_line: line,
                        content: Vec::new(),
                        parent: stack.last().map(|open| open.index),
                        synthetic: false,
                    });
                    stack.push(OpenBlock {
                        index,
                        name: marker.name,
                        block_type,
                        start_line: line,
                    });
                }
            }
        }

        let eof = lines.len() + 1;
        while let Some(open) = stack.pop() {
            out.findings.push(unclosed(path, &open));
            finish(&mut out.blocks, &open, eof, lines);
        }
        out
    }

    /// Parse one marker line into its parts plus attribute errors
    ///
    /// # Errors
    /// Returns error if the line is marker-like but not a well-formed marker
    pub fn parse_marker(text: &str, line: usize) -> Result<(Marker, Vec<AttrError>), AttrError> {
        let caps = MARKER
            .captures(text)
            .ok_or_else(|| AttrError::Malformed(text.trim().to_string()))?;
        let head = &caps["head"];
        let mut errors = Vec::new();

        let (block_type, name) = match head.split_once(':') {
            Some((ty, name)) => match ty.parse::<BlockType>() {
                Ok(ty) => (Some(ty), name),
                Err(err) => {
                    errors.push(err);
                    (None, name)
                }
            },
            None => (None, head),
        };
        if name.is_empty() || name.contains(':') {
            return Err(AttrError::Malformed(text.trim().to_string()));
        }

        let raw = caps["attrs"].trim();
        let mut attrs = BlockAttrs::default();
        let mut rest = raw;
        while !rest.is_empty() {
            match ATTRIBUTE.captures(rest) {
                Some(attr) => {
                    if let Err(err) = attrs.set(&attr["key"], &attr["value"]) {
                        errors.push(err);
                    }
                    rest = rest[attr[0].len()..].trim_start();
                }
                None => {
                    let bad = rest.split_whitespace().next().unwrap_or(rest);
                    errors.push(AttrError::Malformed(bad.to_string()));
                    rest = rest[bad.len()..].trim_start();
                }
            }
        }

        let marker = Marker {
            line,
            name: name.to_string(),
            block_type,
            attrs,
            has_attrs: !raw.is_empty(),
        };
        Ok((marker, errors))
    }
}

fn closes_top(stack: &[OpenBlock], marker: &Marker) -> bool {
    !marker.has_attrs && stack.last().is_some_and(|open| open.name == marker.name)
}

fn unclosed(path: &std::path::Path, open: &OpenBlock) -> ValidationError {
    ValidationError::structure(
        path,
        format!("block `{}` opened at line {} is never closed", open.name, open.start_line),
    )
    .at_line(open.start_line)
    .with_marker(open.name.clone())
}

fn finish(blocks: &mut [Block], open: &OpenBlock, close_line: usize, lines: &[String]) {
    if let Some(block) = blocks.get_mut(open.index) {
        let from = open.start_line.min(lines.len());
        let to = close_line.saturating_sub(1).clamp(from, lines.len());
        block.end_line = close_line;
        block.content = lines[from..to].to_vec();
    }
}
