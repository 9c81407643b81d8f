//! Source-code marker parser
//!
//! Recognises `@MARK-<kind>:<id>:p<N>` scope markers and
//! `@MARK-begin:<id>:p<N>:<token>` / `@MARK-end:...` block markers, but only
//! inside a comment of the host language. Block markers are paired with a
//! stack; pairing, nesting and emptiness violations are `traceability`
//! findings.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracemark_artifact::{ErrorType, Findings, ValidationError};
use tracemark_symbol::{BlockMarker, CodeMarker, IdGrammar, Identifier, ScopeMarker};

static CODE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"@MARK-(?P<kind>[a-z][a-z0-9_]*):(?P<id>[^:\s]+):p(?P<phase>\d+)(?::(?P<token>[A-Za-z0-9_-]+))?")
        .expect("code marker pattern is a valid regex")
});

/// Supported programming languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    /// Rust
    Rust,
    /// TypeScript
    TypeScript,
    /// JavaScript
    JavaScript,
    /// Python
    Python,
    /// Go
    Go,
    /// Java and Kotlin
    Jvm,
    /// C and C++
    C,
    /// C#
    CSharp,
    /// Ruby
    Ruby,
    /// POSIX shell
    Shell,
    /// SQL
    Sql,
    /// Lua
    Lua,
    /// HTML and XML
    Markup,
}

impl Language {
    /// Every supported language
    pub const ALL: [Language; 13] = [
        Language::Rust,
        Language::TypeScript,
        Language::JavaScript,
        Language::Python,
        Language::Go,
        Language::Jvm,
        Language::C,
        Language::CSharp,
        Language::Ruby,
        Language::Shell,
        Language::Sql,
        Language::Lua,
        Language::Markup,
    ];

    /// Get file extensions for this language
    #[inline]
    #[must_use]
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Language::Rust => &["rs"],
            Language::TypeScript => &["ts", "tsx"],
            Language::JavaScript => &["js", "jsx", "mjs", "cjs"],
            Language::Python => &["py"],
            Language::Go => &["go"],
            Language::Jvm => &["java", "kt", "kts", "scala"],
            Language::C => &["c", "h", "cc", "cpp", "hpp"],
            Language::CSharp => &["cs"],
            Language::Ruby => &["rb"],
            Language::Shell => &["sh", "bash"],
            Language::Sql => &["sql"],
            Language::Lua => &["lua"],
            Language::Markup => &["html", "xml", "vue", "svelte"],
        }
    }

    /// Tokens that start a comment in this language
    #[must_use]
    pub fn comment_tokens(&self) -> &'static [&'static str] {
        match self {
            Language::Rust
            | Language::TypeScript
            | Language::JavaScript
            | Language::Go
            | Language::Jvm
            | Language::C
            | Language::CSharp => &["//", "/*", "*"],
            Language::Python | Language::Ruby | Language::Shell => &["#"],
            Language::Sql | Language::Lua => &["--"],
            Language::Markup => &["<!--"],
        }
    }

    /// Detect language from file extension
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        Self::ALL
            .into_iter()
            .find(|lang| lang.extensions().contains(&ext))
    }
}

/// Markers and findings from one source file
#[derive(Debug, Clone, Default)]
pub struct CodeScan {
    /// Scope markers and `begin` blocks (closed or not) in line order
    pub markers: Vec<CodeMarker>,
    /// `traceability` findings with their check counts
    pub findings: Findings,
}

/// Source-code marker parser
#[derive(Debug, Clone)]
pub struct CodeParser<'g> {
    grammar: &'g IdGrammar,
}

impl<'g> CodeParser<'g> {
    /// Create new parser with an identifier grammar
    #[inline]
    #[must_use]
    pub fn new(grammar: &'g IdGrammar) -> Self {
        Self { grammar }
    }

    /// Scan one source file
    #[must_use]
    pub fn parse(&self, path: &Path, source: &str) -> CodeScan {
        let tokens: &[&str] = match Language::from_path(path) {
            Some(lang) => lang.comment_tokens(),
            None => &["//", "/*", "*", "#", "--", "<!--", ";"],
        };
        let lines: Vec<&str> = source.lines().collect();
        let mut scan = CodeScan::default();
        let mut open: Vec<BlockMarker> = Vec::new();

        for (idx, text) in lines.iter().enumerate() {
            let line = idx + 1;
            for caps in CODE_MARKER.captures_iter(text) {
                let Some(whole) = caps.get(0) else { continue };
                if !tokens.iter().any(|t| text[..whole.start()].contains(t)) {
                    continue;
                }
                scan.findings.checked(ErrorType::Traceability, 1);

                let kind = &caps["kind"];
                let raw_id = &caps["id"];
                let phase: u32 = caps["phase"].parse().unwrap_or(0);
                let token = caps.name("token").map(|t| t.as_str().to_string());

                if !self.grammar.matches(raw_id) {
                    scan.findings.checked(ErrorType::CrossReference, 1);
                    scan.findings.push(
                        ValidationError::cross_reference(
                            path,
                            format!("invented identifier `{raw_id}` in code marker"),
                        )
                        .at_line(line)
                        .with_id(raw_id)
                        .with_marker(kind),
                    );
                    continue;
                }
                let id = Identifier::new(raw_id);

                match (kind, token) {
                    ("begin", Some(token)) => {
                        open_block(path, line, id, phase, token, &mut open, &mut scan);
                    }
                    ("end", Some(token)) => {
                        close_block(path, line, &id, phase, &token, &lines, &mut open, &mut scan);
                    }
                    ("begin" | "end", None) => scan.findings.push(
                        ValidationError::traceability(
                            path,
                            format!("`{kind}` marker for `{id}` is missing its instruction token"),
                        )
                        .at_line(line)
                        .with_id(id.as_str())
                        .with_marker(kind),
                    ),
                    (_, Some(token)) => scan.findings.push(
                        ValidationError::traceability(
                            path,
                            format!("scope marker `{kind}` for `{id}` carries unexpected token `{token}`"),
                        )
                        .at_line(line)
                        .with_id(id.as_str())
                        .with_marker(kind),
                    ),
                    (_, None) => scan.markers.push(CodeMarker::Scope(ScopeMarker {
                        kind: kind.to_string(),
                        id,
                        phase,
                        path: path.to_path_buf(),
                        line,
                    })),
                }
            }
        }

        for block in open {
            scan.findings.push(
                ValidationError::traceability(
                    path,
                    format!("`begin` marker for `{}` ({}) has no matching `end`", block.id, block.token),
                )
                .at_line(block.begin_line)
                .with_id(block.id.as_str())
                .with_marker("begin"),
            );
            scan.markers.push(CodeMarker::Block(block));
        }
        scan.markers.sort_by_key(CodeMarker::line);
        scan
    }
}

fn open_block(
    path: &Path,
    line: usize,
    id: Identifier,
    phase: u32,
    token: String,
    open: &mut Vec<BlockMarker>,
    scan: &mut CodeScan,
) {
    if let Some(same) = open
        .iter()
        .find(|b| b.id == id && b.phase == phase && b.token == token)
    {
        scan.findings.push(
            ValidationError::traceability(
                path,
                format!(
                    "`begin` for `{id}` ({token}) nested inside the same open block from line {}",
                    same.begin_line
                ),
            )
            .at_line(line)
            .with_id(id.as_str())
            .with_marker("begin"),
        );
        return;
    }
    if let Some(outer) = open.last() {
        scan.findings.push(
            ValidationError::traceability(
                path,
                format!(
                    "`begin` for `{id}` ({token}) overlaps open block `{}` ({}) from line {}",
                    outer.id, outer.token, outer.begin_line
                ),
            )
            .at_line(line)
            .with_id(id.as_str())
            .with_marker("begin"),
        );
    }
    open.push(BlockMarker {
        id,
        phase,
        token,
        path: path.to_path_buf(),
        begin_line: line,
        end_line: None,
    });
}

#[allow(clippy::too_many_arguments)]
fn close_block(
    path: &Path,
    line: usize,
    id: &Identifier,
    phase: u32,
    token: &str,
    lines: &[&str],
    open: &mut Vec<BlockMarker>,
    scan: &mut CodeScan,
) {
    let Some(pos) = open
        .iter()
        .rposition(|b| &b.id == id && b.phase == phase && b.token == token)
    else {
        scan.findings.push(
            ValidationError::traceability(
                path,
                format!("`end` marker for `{id}` ({token}) has no matching `begin`"),
            )
            .at_line(line)
            .with_id(id.as_str())
            .with_marker("end"),
        );
        return;
    };

    let mut block = open.remove(pos);
    block.end_line = Some(line);
    let wrapped = lines
        .get(block.begin_line..line.saturating_sub(1))
        .unwrap_or_default();
    if wrapped.iter().all(|l| l.trim().is_empty()) {
        scan.findings.push(
            ValidationError::traceability(
                path,
                format!("empty block `{id}` ({token}) wraps no source lines"),
            )
            .at_line(block.begin_line)
            .with_id(id.as_str())
            .with_marker("begin"),
        );
    }
    scan.markers.push(CodeMarker::Block(block));
}
