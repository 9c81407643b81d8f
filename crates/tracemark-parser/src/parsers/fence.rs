//! Fenced code detection
//!
//! Uses pulldown-cmark's offset iterator to find fenced code blocks and maps
//! their byte ranges back to 1-based line numbers. Lines inside a fence,
//! including the fence lines themselves, never carry markers or signals.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser as MdParser, Tag};
use std::ops::RangeInclusive;

/// Line ranges covered by fenced code blocks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FenceMap {
    ranges: Vec<RangeInclusive<usize>>,
}

impl FenceMap {
    /// Scan a Markdown document
    #[must_use]
    pub fn scan(text: &str) -> Self {
        let line_starts: Vec<usize> = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        let line_of = |offset: usize| line_starts.partition_point(|&start| start <= offset);

        let mut ranges = Vec::new();
        for (event, range) in MdParser::new_ext(text, Options::empty()).into_offset_iter() {
            if let Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(_))) = event {
                let first = line_of(range.start);
                let last = line_of(range.end.saturating_sub(1).max(range.start));
                ranges.push(first..=last);
            }
        }
        Self { ranges }
    }

    /// Whether a 1-based line lies inside a fence
    #[must_use]
    pub fn contains(&self, line: usize) -> bool {
        self.ranges.iter().any(|r| r.contains(&line))
    }

    /// Fenced ranges in document order
    #[inline]
    #[must_use]
    pub fn ranges(&self) -> &[RangeInclusive<usize>] {
        &self.ranges
    }
}
