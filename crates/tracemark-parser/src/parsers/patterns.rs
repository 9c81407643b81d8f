//! Line patterns shared by the Markdown extractors

use once_cell::sync::Lazy;
use regex::Regex;

/// Whole-line marker comment: `<!-- MARK:(TYPE:)?NAME ATTRS -->`
pub(crate) static MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*<!--\s*MARK:(?P<head>[A-Za-z0-9_.:-]+)(?P<attrs>(?:\s[^>]*?)?)\s*-->\s*$")
        .expect("marker pattern is a valid regex")
});

/// Anything that looks like a marker attempt
pub(crate) static MARKER_LIKE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<!--\s*MARK:").expect("marker probe is a valid regex"));

/// One `key="value"` attribute at the start of the input
pub(crate) static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^(?P<key>[A-Za-z_][A-Za-z0-9_-]*)="(?P<value>[^"]*)""#)
        .expect("attribute pattern is a valid regex")
});

/// Definition line prefix: optional list bullet, checkbox and priority, then `**ID**:`
pub(crate) static DEFINITION_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(?:[-*+]\s+|\d+\.\s+)?(?:\[(?P<check>[ xX])\]\s*)?(?:-\s*)?(?:`p(?P<prio>[1-9])`\s*)?(?:-\s*)?\*\*ID\*\*:",
    )
    .expect("definition pattern is a valid regex")
});

/// Each `**ID**: `<id>`` on a definition line
pub(crate) static DEFINITION_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\*\*ID\*\*:\s*`(?P<id>[^`\s]+)`").expect("definition id pattern is a valid regex")
});

/// CDSL instruction: `(N.|-) [ |x] - `pN` - <description> - `<token>``
pub(crate) static INSTRUCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(?:\d+\.|[-*+])\s+\[(?P<check>[ xX])\]\s*(?:-\s*)?`p(?P<phase>\d+)`\s*-\s*(?P<desc>.*?)\s*-\s*`(?P<token>[a-z][a-z0-9]*(?:-[a-z0-9]+)*)`\s*$",
    )
    .expect("instruction pattern is a valid regex")
});

/// Bulleted or numbered list item
pub(crate) static LIST_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:\d+\.|[-*+])\s+").expect("list item pattern is a valid regex"));

/// Any backticked token
pub(crate) static BACKTICKED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`(?P<tok>[^`\s]+)`").expect("backtick pattern is a valid regex"));

/// Checkbox state from a `[ ]` / `[x]` capture
pub(crate) fn checked(capture: Option<regex::Match<'_>>) -> Option<bool> {
    capture.map(|m| m.as_str().eq_ignore_ascii_case("x"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_captures_head_and_attrs() {
        let caps = MARKER
            .captures(r#"<!-- MARK:id:reqs required="true" -->"#)
            .unwrap();
        assert_eq!(&caps["head"], "id:reqs");
        assert_eq!(caps["attrs"].trim(), r#"required="true""#);

        let bare = MARKER.captures("<!-- MARK:reqs -->").unwrap();
        assert_eq!(&bare["head"], "reqs");
        assert!(bare["attrs"].trim().is_empty());
    }

    #[test]
    fn definition_line_variants() {
        for line in [
            "**ID**: `sys-fr-login`",
            "- [ ] **ID**: `sys-fr-login`",
            "- [x] `p1` - **ID**: `sys-fr-login`",
            "* `p2` **ID**: `sys-fr-login`",
        ] {
            assert!(DEFINITION_LINE.is_match(line), "{line}");
            assert_eq!(&DEFINITION_ID.captures(line).unwrap()["id"], "sys-fr-login");
        }
        assert!(!DEFINITION_LINE.is_match("see **ID**: `sys-fr-login`"));
    }

    #[test]
    fn instruction_line_variants() {
        let caps = INSTRUCTION
            .captures("1. [x] - `p2` - Validate the input - `inst-validate-input`")
            .unwrap();
        assert_eq!(&caps["phase"], "2");
        assert_eq!(&caps["desc"], "Validate the input");
        assert_eq!(&caps["token"], "inst-validate-input");
        assert_eq!(checked(caps.name("check")), Some(true));

        assert!(INSTRUCTION.is_match("- [ ] `p1` - Hash - `inst-hash`"));
        assert!(!INSTRUCTION.is_match("- [ ] Hash the password"));
    }
}
