//! Document and source parsers
//!
//! Every parser here is a pure function of one document's text:
//! - Markdown artifacts via [`DocumentParser`] (marker or markerless mode)
//! - Source files via [`CodeParser`]

use tracemark_artifact::{Artifact, Block, ErrorType, Findings, Policy, ValidationError};
use tracemark_symbol::IdGrammar;

mod cdsl;
mod code;
mod fence;
mod markerless;
mod markers;
mod patterns;
mod signals;

pub use cdsl::{check_instructions, CdslScope};
pub use code::{CodeParser, CodeScan, Language};
pub use fence::FenceMap;
pub use markerless::MarkerlessExtractor;
pub use markers::{Marker, MarkerParse, MarkerParser};
pub use signals::{extract_marked, DocumentSignals};

/// Everything parsed from one artifact
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// Blocks in opening order; a single synthetic block in markerless mode
    pub blocks: Vec<Block>,
    /// Identifier signals
    pub signals: DocumentSignals,
    /// Parse-time findings with their check counts
    pub findings: Findings,
    /// Document had no markers
    pub markerless: bool,
    /// Fenced code ranges
    pub fences: FenceMap,
}

/// Parses Markdown artifacts into blocks and identifier signals
#[derive(Debug, Clone, Default)]
pub struct DocumentParser {
    grammar: IdGrammar,
    phase_order: Policy,
}

impl DocumentParser {
    /// Create parser with an identifier grammar
    #[inline]
    #[must_use]
    pub fn new(grammar: IdGrammar) -> Self {
        Self {
            grammar,
            phase_order: Policy::default(),
        }
    }

    /// With severity for non-monotonic CDSL phases
    #[inline]
    #[must_use]
    pub fn with_phase_order(mut self, policy: Policy) -> Self {
        self.phase_order = policy;
        self
    }

    /// Identifier grammar in use
    #[inline]
    #[must_use]
    pub fn grammar(&self) -> &IdGrammar {
        &self.grammar
    }

    /// Parse one artifact
    ///
    /// Documents with zero marker occurrences fall back to the markerless
    /// extractor.
    #[must_use]
    pub fn parse(&self, artifact: &Artifact) -> ParsedDocument {
        let fences = FenceMap::scan(artifact.text());
        let markers = MarkerParser::new().parse(artifact, &fences);
        let mut findings = Findings::new();

        if let Some(err) = artifact.frontmatter_error() {
            findings.push(
                ValidationError::template(artifact.path(), format!("invalid frontmatter: {err}"))
                    .at_line(1),
            );
        }

        let markerless = markers.marker_count == 0;
        let (blocks, mut signals) = if markerless {
            let signals = MarkerlessExtractor::new(&self.grammar).extract(artifact, &fences);
            (vec![MarkerlessExtractor::synthetic_block(artifact)], signals)
        } else {
            let signals = extract_marked(artifact, &fences, &markers, &self.grammar);
            (markers.blocks, signals)
        };

        findings.checked(ErrorType::Template, markers.marker_count);
        findings.extend(markers.findings);
        findings.extend(std::mem::take(&mut signals.findings));
        findings.merge(check_instructions(
            &signals.instructions,
            &signals.scopes,
            self.phase_order,
        ));

        ParsedDocument {
            blocks,
            signals,
            findings,
            markerless,
            fences,
        }
    }
}
