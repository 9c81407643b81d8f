//! tracemark artifact model
//!
//! Foundation types shared by every tracemark crate.
//!
//! # Core Concepts
//!
//! - [`Artifact`]: an immutable document with lines, hash and frontmatter
//! - [`ArtifactKind`] / [`KindResolver`]: what kind of document it is
//! - [`Block`]: a typed region bounded by a marker pair
//! - [`ValidationError`]: one collected finding
//!
//! # Example
//!
//! ```rust
//! use tracemark_artifact::{Artifact, ArtifactKind, KindResolver};
//! use std::path::Path;
//!
//! let mut kinds = KindResolver::new();
//! kinds.add_rule(ArtifactKind::new("PRD"), ["**/PRD.md"]).unwrap();
//!
//! let artifact = Artifact::new("docs/PRD.md", "# PRD\n");
//! let resolved = kinds.resolve(artifact.path(), artifact.explicit_kind());
//! assert_eq!(resolved.kind, Some(ArtifactKind::new("PRD")));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod artifact;
mod block;
mod diagnostic;
mod hash;
mod kind;

pub use artifact::Artifact;
pub use block::{AttrError, Block, BlockAttrs, BlockType, Has, Repeat};
pub use diagnostic::{sort_findings, ErrorType, Findings, Policy, Severity, ValidationError};
pub use hash::ContentHash;
pub use kind::{ArtifactKind, KindError, KindResolution, KindResolver};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
