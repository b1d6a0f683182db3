//! Project-wide passes run after all files are merged and unified.

mod dependencies;
mod exports;
mod modules;

use std::path::Path;

use tracing::debug;

use crate::concept::ConceptMap;
use crate::error::ExtractError;

pub use dependencies::DependencyAggregation;
pub use exports::ExportResolution;
pub use modules::ModuleDependencies;

/// A pass over the complete project model.
///
/// Passes may read every concept kind and insert or replace the kinds
/// they own. A kind that is absent reads as empty.
pub trait PostProcessor: Sync {
    fn name(&self) -> &'static str;

    fn post_process(&self, concepts: &mut ConceptMap, root: &Path) -> Result<(), ExtractError>;
}

/// The fixed pass order. Later passes consume what earlier ones produce.
pub static POST_PROCESSORS: &[&dyn PostProcessor] = &[
    &ExportResolution,
    &DependencyAggregation,
    &ModuleDependencies,
];

pub fn run_post_processors(concepts: &mut ConceptMap, root: &Path) -> Result<(), ExtractError> {
    run_passes(POST_PROCESSORS, concepts, root)
}

pub fn run_passes(
    passes: &[&dyn PostProcessor],
    concepts: &mut ConceptMap,
    root: &Path,
) -> Result<(), ExtractError> {
    for pass in passes {
        debug!(pass = pass.name(), "running post-processor");
        pass.post_process(concepts, root)?;
    }
    Ok(())
}
