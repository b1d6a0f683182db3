//! Dependency records, raw and aggregated.

use serde::{Deserialize, Serialize};

use super::Fqn;

/// How a dependency edge was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReferenceKind {
    Call,
    Construct,
    Read,
    TypeReference,
    Extends,
    Implements,
    Import,
    Export,
}

/// A single reference occurrence recorded during traversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyEdge {
    pub source_fqn: Fqn,
    pub target_fqn: Fqn,
    pub reference_kind: ReferenceKind,
}

impl DependencyEdge {
    pub fn visit_fqns_mut(&mut self, visit: &mut dyn FnMut(&mut Fqn)) {
        visit(&mut self.source_fqn);
        visit(&mut self.target_fqn);
    }
}

/// Concept-kind label of a dependency target that is declared nowhere in
/// the model.
pub const EXTERNAL_TARGET: &str = "external";

/// All edges between one source and one target, collapsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    pub source_fqn: Fqn,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
    pub target_fqn: Fqn,
    pub target_type: String,
    pub cardinality: u64,
}

impl Dependency {
    pub fn is_external(&self) -> bool {
        self.target_type == EXTERNAL_TARGET
    }

    pub fn visit_fqns_mut(&mut self, visit: &mut dyn FnMut(&mut Fqn)) {
        visit(&mut self.source_fqn);
        visit(&mut self.target_fqn);
    }
}

/// Dependencies between two project modules, counted over declarations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDependency {
    pub source_module: Fqn,
    pub target_module: Fqn,
    pub cardinality: u64,
}

impl ModuleDependency {
    pub fn visit_fqns_mut(&mut self, visit: &mut dyn FnMut(&mut Fqn)) {
        visit(&mut self.source_module);
        visit(&mut self.target_module);
    }
}
