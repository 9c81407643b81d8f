//! Per-type shape rules for block content

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use tracemark_artifact::{Block, BlockType};
use tracemark_parser::ParsedDocument;

static DEFINITION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*ID\*\*:\s*`").expect("definition probe is a valid regex"));

static BULLET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[-*+]\s+\S").expect("bullet pattern is a valid regex"));

static NUMBERED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\d+[.)]\s+\S").expect("numbered pattern is a valid regex"));

static LIST_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:[-*+]|\d+[.)])\s+").expect("list item pattern is a valid regex"));

pub(crate) static TASK_ITEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:[-*+]|\d+\.)\s+\[(?P<check>[ xX])\]").expect("task pattern is a valid regex")
});

static TABLE_SEPARATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*\|?\s*:?-{3,}:?\s*(?:\|\s*:?-{3,}:?\s*)*\|?\s*$")
        .expect("table separator pattern is a valid regex")
});

static HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<hashes>#{1,6})\s+\S").expect("heading pattern is a valid regex"));

static LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^!])\[[^\]]+\]\([^)\s]+\)").expect("link pattern is a valid regex")
});

static IMAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[[^\]]*\]\([^)\s]+\)").expect("image pattern is a valid regex"));

/// Check a non-blank block against its type's shape rule
///
/// Returns the expected shape on mismatch.
pub(crate) fn check(block: &Block, doc: &ParsedDocument) -> Result<(), String> {
    let lines: Vec<(usize, &str)> = block.numbered_content().collect();
    let first = lines.iter().map(|(_, l)| *l).find(|l| !l.trim().is_empty());

    match block.block_type {
        BlockType::Free => Ok(()),
        BlockType::Id => require(
            lines.iter().any(|(_, l)| DEFINITION.is_match(l)),
            "at least one `**ID**:` definition line",
        ),
        BlockType::IdRef => require(
            doc.signals.references.iter().any(|r| block.encloses_line(r.line)),
            "at least one identifier reference",
        ),
        BlockType::List => require(
            lines.iter().any(|(_, l)| BULLET.is_match(l)),
            "bulleted list items (`-` or `*`)",
        ),
        BlockType::NumberedList => require(
            lines.iter().any(|(_, l)| NUMBERED.is_match(l)),
            "numbered list items (`1.`)",
        ),
        BlockType::TaskList => require(
            lines.iter().any(|(_, l)| TASK_ITEM.is_match(l)),
            "task list items (`- [ ]` or `- [x]`)",
        ),
        BlockType::Table => require(
            is_table(&lines),
            "a table with header, separator and at least one data row",
        ),
        BlockType::Paragraph => require(first.is_some_and(is_prose), "a prose paragraph"),
        BlockType::Code => require(is_fenced_code(&lines), "an opening and closing code fence"),
        BlockType::Heading { level } => {
            let found = first
                .and_then(|l| HEADING.captures(l))
                .map(|c| c["hashes"].len());
            match (found, level) {
                (Some(n), Some(want)) if n != usize::from(want) => {
                    Err(format!("a level-{want} heading (found level {n})"))
                }
                (Some(_), _) => Ok(()),
                (None, Some(want)) => Err(format!("a level-{want} heading")),
                (None, None) => Err("a `#` heading".to_string()),
            }
        }
        BlockType::Link => require(lines.iter().any(|(_, l)| LINK.is_match(l)), "a `[text](url)` link"),
        BlockType::Image => require(
            lines.iter().any(|(_, l)| IMAGE.is_match(l)),
            "an `![alt](url)` image",
        ),
        BlockType::Cdsl => {
            let instruction_lines: BTreeSet<usize> = doc
                .signals
                .instructions
                .iter()
                .filter(|i| block.encloses_line(i.line))
                .map(|i| i.line)
                .collect();
            if instruction_lines.is_empty() {
                return Err("at least one CDSL instruction".to_string());
            }
            match lines
                .iter()
                .find(|(n, l)| LIST_ITEM.is_match(l) && !instruction_lines.contains(n))
            {
                Some((n, _)) => Err(format!(
                    "every list item to be a CDSL instruction (line {n} is not)"
                )),
                None => Ok(()),
            }
        }
    }
}

fn require(ok: bool, expected: &str) -> Result<(), String> {
    if ok {
        Ok(())
    } else {
        Err(expected.to_string())
    }
}

fn is_table(lines: &[(usize, &str)]) -> bool {
    let rows: Vec<&str> = lines
        .iter()
        .map(|(_, l)| l.trim())
        .filter(|l| !l.is_empty())
        .collect();
    match rows.as_slice() {
        [header, separator, data @ ..] => {
            header.contains('|')
                && TABLE_SEPARATOR.is_match(separator)
                && data.iter().any(|row| row.contains('|'))
        }
        _ => false,
    }
}

fn is_prose(line: &str) -> bool {
    let line = line.trim_start();
    !(line.starts_with('#')
        || line.starts_with('|')
        || line.starts_with('>')
        || line.starts_with("```")
        || line.starts_with("~~~")
        || line.starts_with("<!--")
        || LIST_ITEM.is_match(line))
}

fn is_fenced_code(lines: &[(usize, &str)]) -> bool {
    let mut rows = lines.iter().map(|(_, l)| l.trim()).filter(|l| !l.is_empty());
    let Some(open) = rows.next() else {
        return false;
    };
    let fence: String = match open.chars().next() {
        Some(c @ ('`' | '~')) => open.chars().take_while(|&x| x == c).collect(),
        _ => return false,
    };
    fence.len() >= 3
        && rows.any(|l| l.starts_with(&fence) && l.trim_start_matches(fence.as_str()).trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracemark_artifact::Artifact;
    use tracemark_parser::DocumentParser;

    fn first_block(text: &str) -> Result<(), String> {
        let doc = DocumentParser::default().parse(&Artifact::new("doc.md", text));
        check(&doc.blocks[0], &doc)
    }

    fn wrap(ty: &str, body: &str) -> String {
        format!("<!-- MARK:{ty}:b -->\n{body}<!-- MARK:{ty}:b -->\n")
    }

    #[test]
    fn table_needs_header_separator_and_data() {
        assert!(first_block(&wrap("table", "| a | b |\n|---|---|\n| 1 | 2 |\n")).is_ok());
        assert!(first_block(&wrap("table", "| a | b |\n|---|---|\n")).is_err());
        assert!(first_block(&wrap("table", "| a | b |\n| 1 | 2 |\n")).is_err());
    }

    #[test]
    fn heading_level_is_enforced() {
        assert!(first_block(&wrap("heading-2", "## Scope\n")).is_ok());
        let err = first_block(&wrap("heading-2", "### Scope\n")).unwrap_err();
        assert!(err.contains("found level 3"));
        assert!(first_block(&wrap("heading", "#### Any\n")).is_ok());
        assert!(first_block(&wrap("heading", "Not a heading\n")).is_err());
    }

    #[test]
    fn code_needs_both_fences() {
        assert!(first_block(&wrap("code", "```rust\nfn main() {}\n```\n")).is_ok());
        assert!(first_block(&wrap("code", "fn main() {}\n")).is_err());
    }

    #[test]
    fn lists_by_type() {
        assert!(first_block(&wrap("list", "- one\n- two\n")).is_ok());
        assert!(first_block(&wrap("list", "1. one\n")).is_err());
        assert!(first_block(&wrap("numbered-list", "1. one\n2. two\n")).is_ok());
        assert!(first_block(&wrap("task-list", "- [ ] one\n- [x] two\n")).is_ok());
        assert!(first_block(&wrap("task-list", "- one\n")).is_err());
    }

    #[test]
    fn paragraph_link_and_image() {
        assert!(first_block(&wrap("paragraph", "Plain prose.\n")).is_ok());
        assert!(first_block(&wrap("paragraph", "- a list\n")).is_err());
        assert!(first_block(&wrap("link", "See [docs](https://example.com).\n")).is_ok());
        assert!(first_block(&wrap("link", "![only](img.png)\n")).is_err());
        assert!(first_block(&wrap("image", "![diagram](arch.png)\n")).is_ok());
    }

    #[test]
    fn cdsl_items_must_all_be_instructions() {
        let ok = wrap("cdsl", "1. [ ] - `p1` - Read - `inst-read`\n");
        assert!(first_block(&ok).is_ok());
        let stray = wrap("cdsl", "1. [ ] - `p1` - Read - `inst-read`\n- loose note\n");
        assert!(first_block(&stray).unwrap_err().contains("line 3"));
        assert!(first_block(&wrap("cdsl", "Just text\n")).is_err());
    }

    #[test]
    fn id_and_id_ref_blocks() {
        assert!(first_block(&wrap("id", "**ID**: `sys-fr-a`\n")).is_ok());
        assert!(first_block(&wrap("id", "no definitions\n")).is_err());
        assert!(first_block(&wrap("id-ref", "- `sys-fr-a`\n")).is_ok());
        assert!(first_block(&wrap("id-ref", "- nothing\n")).is_err());
    }
}
