//! FQN unification.
//!
//! While a file is traversed, every declaration FQN carries the absolute
//! path of its module. Unifying at the project root rewrites those module
//! parts to `./`-relative paths, in top-level records and nested attributes
//! alike. Unifying at the empty root leaves FQNs untouched and only folds
//! the project seed concepts together, which makes it safe to run over an
//! already unified map.

use std::path::Path;

use tracing::debug;

use crate::concept::{Concept, ConceptKind, ConceptMap};
use crate::error::ExtractError;

/// Rewrites FQN-bearing fields relative to one normalization root.
#[derive(Debug, Clone)]
pub struct Unifier {
    root: String,
}

impl Unifier {
    pub fn new(root: &str) -> Self {
        Self {
            root: root.replace('\\', "/").trim_end_matches('/').to_string(),
        }
    }

    pub fn for_path(root: &Path) -> Self {
        Self::new(&root.to_string_lossy())
    }

    /// Unifier of the global pass.
    pub fn global() -> Self {
        Self::new("")
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn unify(&self, mut map: ConceptMap) -> Result<ConceptMap, ExtractError> {
        if !self.root.is_empty() {
            map.visit_fqns_mut(&mut |fqn| *fqn = fqn.rebased(&self.root));
        } else {
            fold_project_seeds(&mut map)?;
        }

        if let Some((kind, fqn)) = map.duplicate_fqns().into_iter().next() {
            return Err(ExtractError::invariant(format!(
                "duplicate {} FQN {}",
                kind, fqn
            )));
        }
        Ok(map)
    }
}

/// Convenience wrapper around [`Unifier::unify`].
pub fn unify(map: ConceptMap, root: &str) -> Result<ConceptMap, ExtractError> {
    Unifier::new(root).unify(map)
}

fn fold_project_seeds(map: &mut ConceptMap) -> Result<(), ExtractError> {
    let seeds = map.take(ConceptKind::Project);
    let mut kept: Vec<Concept> = Vec::with_capacity(1);
    for seed in seeds {
        match kept.first() {
            None => kept.push(seed),
            Some(existing) if *existing == seed => {
                debug!("dropping duplicate project seed");
            }
            Some(existing) => {
                let root_of = |c: &Concept| {
                    c.as_project()
                        .map(|p| p.root_path.clone())
                        .unwrap_or_default()
                };
                return Err(ExtractError::invariant(format!(
                    "conflicting project seeds {} and {}",
                    root_of(existing),
                    root_of(&seed)
                )));
            }
        }
    }
    map.set(ConceptKind::Project, kept);
    Ok(())
}
