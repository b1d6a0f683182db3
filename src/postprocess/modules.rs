use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use super::PostProcessor;
use crate::concept::{Concept, ConceptKind, ConceptMap, Fqn, ModuleDependency};
use crate::error::ExtractError;

/// Module-to-module dependency counts derived from aggregated
/// dependencies between two different project modules.
pub struct ModuleDependencies;

impl PostProcessor for ModuleDependencies {
    fn name(&self) -> &'static str {
        "module-dependencies"
    }

    fn post_process(&self, concepts: &mut ConceptMap, _root: &Path) -> Result<(), ExtractError> {
        let modules: HashSet<&Fqn> = concepts
            .get(ConceptKind::Module)
            .iter()
            .filter_map(Concept::fqn)
            .collect();

        let mut counts: BTreeMap<(Fqn, Fqn), u64> = BTreeMap::new();
        for dependency in concepts.get(ConceptKind::Dependency).iter().filter_map(Concept::as_dependency) {
            let (Some(source), Some(target)) = (
                dependency.source_fqn.module_fqn(),
                dependency.target_fqn.module_fqn(),
            ) else {
                continue;
            };
            if source == target || !modules.contains(&source) || !modules.contains(&target) {
                continue;
            }
            *counts.entry((source, target)).or_default() += dependency.cardinality;
        }

        let mut derived = concepts.take(ConceptKind::ModuleDependency);
        derived.extend(counts.into_iter().map(|((source, target), cardinality)| {
            Concept::ModuleDependency(ModuleDependency {
                source_module: source,
                target_module: target,
                cardinality,
            })
        }));
        concepts.set(ConceptKind::ModuleDependency, derived);
        Ok(())
    }
}
