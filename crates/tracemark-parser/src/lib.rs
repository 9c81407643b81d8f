//! tracemark parsers
//!
//! The boundary between files on disk and the validation engine.
//!
//! # Core Operations
//!
//! - **Ingress**: discover and load files with size and time limits
//! - **Documents**: split Markdown into marker blocks (or a synthetic block
//!   when a document has no markers) and extract identifier signals
//! - **Code**: find scope and block markers in source comments
//!
//! # Architecture
//!
//! ```text
//! roots → IngressLayer → text → Artifact → DocumentParser → blocks + signals
//!                            ↘ CodeParser → code markers
//! ```
//!
//! # Example
//!
//! ```rust
//! use tracemark_artifact::Artifact;
//! use tracemark_parser::DocumentParser;
//!
//! let text = "<!-- MARK:id:reqs -->\n**ID**: `sys-fr-login`\n<!-- MARK:id:reqs -->\n";
//! let parsed = DocumentParser::default().parse(&Artifact::new("PRD.md", text));
//!
//! assert!(!parsed.markerless);
//! assert_eq!(parsed.signals.definitions[0].id.as_str(), "sys-fr-login");
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod layer;
pub mod parsers;

// Re-exports for convenience
pub use error::ParseError;
pub use layer::{load_one, Discovery, IngressConfig, IngressLayer, Loaded};
pub use parsers::{
    check_instructions, extract_marked, CdslScope, CodeParser, CodeScan, DocumentParser,
    DocumentSignals, FenceMap, Language, Marker, MarkerParse, MarkerParser, MarkerlessExtractor,
    ParsedDocument,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for parsing documents and source files
    pub use crate::error::ParseError;
    pub use crate::layer::{IngressConfig, IngressLayer};
    pub use crate::parsers::{CodeParser, DocumentParser, Language, ParsedDocument};
}
