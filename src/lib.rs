//! LCE - language concept extractor for TypeScript projects.
//!
//! Builds a project-wide model of declarations, types and dependencies
//! from TypeScript sources, intended as input to architecture-analysis
//! tooling.
//!
//! # Architecture
//!
//! Data flows strictly forward, one file at a time:
//!
//! - `source`: file enumeration, tree-sitter parsing and semantic queries
//! - `traverse`: walks a syntax tree and dispatches nodes to extractors
//! - `unify`: rewrites FQNs to project-relative form
//! - `postprocess`: project-wide passes (export resolution, dependency
//!   aggregation)
//! - `driver`: folds files into one model and runs the passes
//! - `report`: JSON output and run summary
//!
//! # Adding a New Extractor
//!
//! Write a handler in `src/traverse/` and add an entry to `EXTRACTORS` in
//! `traverse/dispatch.rs`.

pub mod cli;
pub mod concept;
pub mod config;
pub mod driver;
pub mod error;
pub mod postprocess;
pub mod report;
pub mod source;
pub mod traverse;
pub mod unify;

use std::path::Path;

pub use concept::{Concept, ConceptKind, ConceptMap, Fqn};
pub use config::ExtractorConfig;
pub use driver::{Extractor, FileOutcome, FileStatus, ProjectResult, RunReport};
pub use error::{ExtractError, ProviderError, TraversalError};
pub use postprocess::{PostProcessor, POST_PROCESSORS};
pub use source::{SourceProvider, TreeSitterProvider};
pub use traverse::{TraversalContext, Traverser};
pub use unify::{unify, Unifier};

/// Extract the concept model of the project at `root` with the default
/// provider and the configuration found at the root.
pub fn process_project(root: &Path) -> anyhow::Result<ConceptMap> {
    let config = ExtractorConfig::load(root)?;
    let result = Extractor::new(TreeSitterProvider::new(), config).process_project(root)?;
    Ok(result.concepts)
}
