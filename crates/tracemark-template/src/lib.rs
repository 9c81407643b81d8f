//! tracemark templates
//!
//! Declares what a document of each artifact kind must look like and checks
//! parsed documents against it.
//!
//! # Overview
//!
//! - **Template / BlockSpec**: expected blocks, loaded from marker-annotated
//!   template documents
//! - **TemplateRegistry**: templates by kind, parse results cached by content hash
//! - **check_structure**: required, repeat, unknown-section, shape and
//!   task/priority rules
//!
//! # Example
//!
//! ```rust
//! use tracemark_artifact::{Artifact, Policy};
//! use tracemark_parser::DocumentParser;
//! use tracemark_template::{check_structure, Template};
//!
//! let template = Template::parse(
//!     "templates/PRD.md",
//!     "---\nkind: PRD\n---\n<!-- MARK:list:scope -->\n<!-- MARK:list:scope -->\n",
//! )
//! .unwrap();
//!
//! let artifact = Artifact::new("docs/PRD.md", "# PRD\n<!-- MARK:list:other -->\n- x\n<!-- MARK:list:other -->\n");
//! let doc = DocumentParser::default().parse(&artifact);
//! let findings = check_structure(&artifact, &doc, Some(&template), Policy::Warn);
//!
//! // `scope` is missing; `other` is an unknown section (a warning here)
//! assert_eq!(findings.items().len(), 2);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod registry;
mod shape;
pub mod structure;
pub mod template;

// Re-exports for convenience
pub use error::TemplateError;
pub use registry::TemplateRegistry;
pub use structure::check_structure;
pub use template::{BlockSpec, Template, Weights};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for template validation
    pub use crate::{check_structure, Template, TemplateError, TemplateRegistry, Weights};
}
