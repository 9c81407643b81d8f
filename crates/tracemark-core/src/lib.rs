//! tracemark core - the validation engine
//!
//! Orchestrates a whole validation run:
//! - Loads configuration and templates
//! - Discovers and loads artifacts and source files
//! - Parses documents in parallel and merges their signals into the registry
//! - Runs structural, cross-reference and traceability checks
//! - Scores the findings and emits a deterministic report
//!
//! # Example
//!
//! ```rust,ignore
//! use tracemark_core::{CheckSet, Engine, EngineConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig::load("tracemark.toml".as_ref())?;
//! let engine = Engine::new(config).await?;
//!
//! let report = engine.validate(CheckSet::All, None).await?;
//! println!("{}", report.to_text());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod engine;
pub mod error;
pub mod report;
pub mod scoring;

// Re-exports for convenience
pub use config::{
    EngineConfig, IdentifierConfig, IoConfig, KindConfig, PolicyConfig, ScoringConfig,
    TraceabilityConfig, DEFAULT_ID_PREFIX,
};
pub use engine::{CheckSet, DocumentOutcome, Engine, Run};
pub use error::{ConfigError, EngineError};
pub use report::{Report, Summary};
pub use scoring::{score, violation_ratio, CategoryScore, Scorecard, Status};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running validations
    pub use crate::{CheckSet, Engine, EngineConfig, EngineError, Report, Status};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
