use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use tracing::debug;

use super::PostProcessor;
use crate::concept::{Concept, ConceptKind, ConceptMap, Dependency, Fqn, EXTERNAL_TARGET};
use crate::error::ExtractError;

const PROPERTY: &str = "property-declaration";
const METHOD: &str = "method-declaration";
const CONSTRUCTOR: &str = "constructor-declaration";
const ACCESSOR: &str = "accessor-property";
const ENUM_MEMBER: &str = "enum-member";

/// Collapses raw dependency edges into one `dependency` per
/// (source, target) pair.
pub struct DependencyAggregation;

impl PostProcessor for DependencyAggregation {
    fn name(&self) -> &'static str {
        "dependency-aggregation"
    }

    fn post_process(&self, concepts: &mut ConceptMap, _root: &Path) -> Result<(), ExtractError> {
        let seeds = concepts.get(ConceptKind::Project).len();
        if seeds != 1 {
            return Err(ExtractError::invariant(format!(
                "expected exactly one project seed, found {seeds}"
            )));
        }

        let index = DeclarationIndex::build(concepts);
        let mut groups: BTreeMap<(Fqn, Fqn), u64> = BTreeMap::new();
        let mut raw = 0usize;
        for concept in concepts.take(ConceptKind::DependencyEdge) {
            let Concept::DependencyEdge(edge) = concept else {
                continue;
            };
            raw += 1;
            if edge.source_fqn == edge.target_fqn {
                continue;
            }
            *groups.entry((edge.source_fqn, edge.target_fqn)).or_default() += 1;
        }

        let mut dependencies = concepts.take(ConceptKind::Dependency);
        dependencies.extend(groups.into_iter().map(|((source, target), cardinality)| {
            Concept::Dependency(Dependency {
                source_type: index.kind_of(&source).map(str::to_string),
                target_type: index.kind_of(&target).unwrap_or(EXTERNAL_TARGET).to_string(),
                source_fqn: source,
                target_fqn: target,
                cardinality,
            })
        }));
        debug!(edges = raw, dependencies = dependencies.len(), "aggregated dependencies");
        concepts.set(ConceptKind::Dependency, dependencies);
        Ok(())
    }
}

/// Declaration FQN to the label of the concept declaring it.
struct DeclarationIndex {
    kinds: HashMap<Fqn, &'static str>,
}

impl DeclarationIndex {
    fn build(concepts: &ConceptMap) -> Self {
        let mut kinds = HashMap::new();
        for (kind, list) in concepts.iter() {
            if !kind.is_fqn_identified() {
                continue;
            }
            for concept in list {
                if let Some(fqn) = concept.fqn() {
                    kinds.insert(fqn.clone(), kind.id());
                }
                match concept {
                    Concept::Class(class) => {
                        kinds.extend(class.constructors.iter().map(|c| (c.fqn.clone(), CONSTRUCTOR)));
                        kinds.extend(class.properties.iter().map(|p| (p.fqn.clone(), PROPERTY)));
                        kinds.extend(class.methods.iter().map(|m| (m.fqn.clone(), METHOD)));
                        kinds.extend(class.accessor_properties.iter().map(|a| (a.fqn.clone(), ACCESSOR)));
                    }
                    Concept::Interface(interface) => {
                        kinds.extend(interface.properties.iter().map(|p| (p.fqn.clone(), PROPERTY)));
                        kinds.extend(interface.methods.iter().map(|m| (m.fqn.clone(), METHOD)));
                    }
                    Concept::Enum(declaration) => {
                        kinds.extend(declaration.members.iter().map(|m| (m.fqn.clone(), ENUM_MEMBER)));
                    }
                    _ => {}
                }
            }
        }
        DeclarationIndex { kinds }
    }

    fn kind_of(&self, fqn: &Fqn) -> Option<&'static str> {
        self.kinds.get(fqn).copied()
    }
}
