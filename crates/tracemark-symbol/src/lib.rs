//! tracemark identifier registry
//!
//! Cross-document index of identifier definitions, references, CDSL
//! instructions and code markers.
//!
//! # Overview
//!
//! - **Identifier / IdGrammar**: the kebab-case identifier token and its grammar
//! - **RegistryBuilder**: append-only accumulation of per-document signals
//! - **Registry**: frozen, read-only index with radix tree prefix lookup
//! - **check_cross_references / check_traceability**: registry-wide checks
//!
//! # Example
//!
//! ```rust
//! use tracemark_symbol::{Identifier, IdentifierDefinition, IdentifierReference, RegistryBuilder};
//! use tracemark_symbol::DefinitionSpec;
//!
//! let mut builder = RegistryBuilder::new();
//! builder.define(IdentifierDefinition {
//!     id: Identifier::new("sys-fr-login"),
//!     path: "docs/PRD.md".into(),
//!     line: 4,
//!     checked: None,
//!     priority: None,
//!     kind: None,
//!     spec: DefinitionSpec::default(),
//!     markerless: false,
//! });
//! builder.reference(IdentifierReference {
//!     id: Identifier::new("sys-fr-login"),
//!     path: "docs/DESIGN.md".into(),
//!     line: 12,
//!     kind: None,
//! });
//!
//! let registry = builder.freeze();
//! let entry = registry.lookup("sys-fr-login").unwrap();
//! assert_eq!(entry.definitions.len(), 1);
//! assert_eq!(entry.references.len(), 1);
//! ```

#![warn(missing_docs)]

pub mod identifier;
pub mod index;
pub mod validation;

// Re-exports
pub use identifier::{
    BlockMarker, CdslInstruction, CodeMarker, DefinitionSpec, IdGrammar, Identifier,
    IdentifierDefinition, IdentifierReference, ParentBinding, RegistryError, ScopeMarker,
};
pub use index::{Entry, Registry, RegistryBuilder};
pub use validation::{check_cross_references, check_traceability, TraceabilityMode};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for registry operations
    pub use crate::{
        check_cross_references, check_traceability, CodeMarker, Identifier, IdGrammar,
        Registry, RegistryBuilder, TraceabilityMode,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
