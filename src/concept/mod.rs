//! Concept data model.
//!
//! A [`Concept`] is one extracted fact about the analyzed sources. Concepts
//! are grouped by [`ConceptKind`] in a [`ConceptMap`], which is what the
//! traverser produces per file and what the driver folds into the
//! project-wide model.
//!
//! Concepts never hold handles to each other: every cross reference is an
//! [`Fqn`], so forward references and references that leave the project are
//! representable without dangling pointers.

mod declarations;
mod dependency;
mod fqn;
mod module;
mod types;
mod value;

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

pub use declarations::{
    Accessor, AccessorProperty, ClassDeclaration, ConstructorDeclaration, Coordinates,
    EnumDeclaration, EnumMember, FunctionDeclaration, InterfaceDeclaration, MethodDeclaration,
    Parameter, PropertyDeclaration, TypeAliasDeclaration, TypeParameterDecl, VariableDeclaration,
    VariableKind, Visibility,
};
pub use dependency::{Dependency, DependencyEdge, ModuleDependency, ReferenceKind, EXTERNAL_TARGET};
pub use fqn::Fqn;
pub use module::{ExportDeclaration, ExportKind, ImportDeclaration, Module, Project};
pub use types::{ObjectMember, TypeDesc};
pub use value::{LiteralValue, Value};

/// Closed enumeration of concept kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConceptKind {
    #[serde(rename = "typescript-project")]
    Project,
    #[serde(rename = "typescript-module")]
    Module,
    #[serde(rename = "function-declaration")]
    Function,
    #[serde(rename = "class-declaration")]
    Class,
    #[serde(rename = "interface-declaration")]
    Interface,
    #[serde(rename = "type-alias-declaration")]
    TypeAlias,
    #[serde(rename = "enum-declaration")]
    Enum,
    #[serde(rename = "variable-declaration")]
    Variable,
    #[serde(rename = "import-declaration")]
    Import,
    #[serde(rename = "export-declaration")]
    Export,
    #[serde(rename = "dependency-edge")]
    DependencyEdge,
    #[serde(rename = "dependency")]
    Dependency,
    #[serde(rename = "module-dependency")]
    ModuleDependency,
}

impl ConceptKind {
    pub const ALL: [ConceptKind; 13] = [
        ConceptKind::Project,
        ConceptKind::Module,
        ConceptKind::Function,
        ConceptKind::Class,
        ConceptKind::Interface,
        ConceptKind::TypeAlias,
        ConceptKind::Enum,
        ConceptKind::Variable,
        ConceptKind::Import,
        ConceptKind::Export,
        ConceptKind::DependencyEdge,
        ConceptKind::Dependency,
        ConceptKind::ModuleDependency,
    ];

    /// Identifier used as the top-level key of the JSON output.
    pub fn id(self) -> &'static str {
        match self {
            ConceptKind::Project => "typescript-project",
            ConceptKind::Module => "typescript-module",
            ConceptKind::Function => "function-declaration",
            ConceptKind::Class => "class-declaration",
            ConceptKind::Interface => "interface-declaration",
            ConceptKind::TypeAlias => "type-alias-declaration",
            ConceptKind::Enum => "enum-declaration",
            ConceptKind::Variable => "variable-declaration",
            ConceptKind::Import => "import-declaration",
            ConceptKind::Export => "export-declaration",
            ConceptKind::DependencyEdge => "dependency-edge",
            ConceptKind::Dependency => "dependency",
            ConceptKind::ModuleDependency => "module-dependency",
        }
    }

    pub fn from_id(id: &str) -> Option<ConceptKind> {
        ConceptKind::ALL.into_iter().find(|kind| kind.id() == id)
    }

    /// Kinds whose records are identified by their FQN; no two records of
    /// such a kind may share one in a project-scoped map.
    pub fn is_fqn_identified(self) -> bool {
        matches!(
            self,
            ConceptKind::Module
                | ConceptKind::Function
                | ConceptKind::Class
                | ConceptKind::Interface
                | ConceptKind::TypeAlias
                | ConceptKind::Enum
                | ConceptKind::Variable
        )
    }
}

impl fmt::Display for ConceptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// One extracted fact.
///
/// Serialization is untagged: the kind is carried by the map key the
/// record is stored under, see [`Concept::from_value`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Concept {
    Project(Project),
    Module(Module),
    Function(FunctionDeclaration),
    Class(ClassDeclaration),
    Interface(InterfaceDeclaration),
    TypeAlias(TypeAliasDeclaration),
    Enum(EnumDeclaration),
    Variable(VariableDeclaration),
    Import(ImportDeclaration),
    Export(ExportDeclaration),
    DependencyEdge(DependencyEdge),
    Dependency(Dependency),
    ModuleDependency(ModuleDependency),
}

macro_rules! concept_accessors {
    ($($name:ident => $variant:ident($ty:ty)),* $(,)?) => {
        impl Concept {
            $(
                pub fn $name(&self) -> Option<&$ty> {
                    match self {
                        Concept::$variant(inner) => Some(inner),
                        _ => None,
                    }
                }
            )*
        }
    };
}

concept_accessors! {
    as_project => Project(Project),
    as_module => Module(Module),
    as_function => Function(FunctionDeclaration),
    as_class => Class(ClassDeclaration),
    as_interface => Interface(InterfaceDeclaration),
    as_type_alias => TypeAlias(TypeAliasDeclaration),
    as_enum => Enum(EnumDeclaration),
    as_variable => Variable(VariableDeclaration),
    as_import => Import(ImportDeclaration),
    as_export => Export(ExportDeclaration),
    as_dependency_edge => DependencyEdge(DependencyEdge),
    as_dependency => Dependency(Dependency),
    as_module_dependency => ModuleDependency(ModuleDependency),
}

impl Concept {
    pub fn kind(&self) -> ConceptKind {
        match self {
            Concept::Project(_) => ConceptKind::Project,
            Concept::Module(_) => ConceptKind::Module,
            Concept::Function(_) => ConceptKind::Function,
            Concept::Class(_) => ConceptKind::Class,
            Concept::Interface(_) => ConceptKind::Interface,
            Concept::TypeAlias(_) => ConceptKind::TypeAlias,
            Concept::Enum(_) => ConceptKind::Enum,
            Concept::Variable(_) => ConceptKind::Variable,
            Concept::Import(_) => ConceptKind::Import,
            Concept::Export(_) => ConceptKind::Export,
            Concept::DependencyEdge(_) => ConceptKind::DependencyEdge,
            Concept::Dependency(_) => ConceptKind::Dependency,
            Concept::ModuleDependency(_) => ConceptKind::ModuleDependency,
        }
    }

    /// Declaration identity, for kinds that have one.
    pub fn fqn(&self) -> Option<&Fqn> {
        match self {
            Concept::Module(m) => Some(&m.fqn),
            Concept::Function(d) => Some(&d.fqn),
            Concept::Class(d) => Some(&d.fqn),
            Concept::Interface(d) => Some(&d.fqn),
            Concept::TypeAlias(d) => Some(&d.fqn),
            Concept::Enum(d) => Some(&d.fqn),
            Concept::Variable(d) => Some(&d.fqn),
            _ => None,
        }
    }

    /// Declared name, for declaration kinds.
    pub fn name(&self) -> Option<&str> {
        match self {
            Concept::Function(d) => Some(&d.function_name),
            Concept::Class(d) => Some(&d.class_name),
            Concept::Interface(d) => Some(&d.interface_name),
            Concept::TypeAlias(d) => Some(&d.type_alias_name),
            Concept::Enum(d) => Some(&d.enum_name),
            Concept::Variable(d) => Some(&d.variable_name),
            _ => None,
        }
    }

    /// Visit every FQN-bearing field, nested attributes included.
    pub fn visit_fqns_mut(&mut self, visit: &mut dyn FnMut(&mut Fqn)) {
        match self {
            Concept::Project(_) => {}
            Concept::Module(m) => m.visit_fqns_mut(visit),
            Concept::Function(d) => d.visit_fqns_mut(visit),
            Concept::Class(d) => d.visit_fqns_mut(visit),
            Concept::Interface(d) => d.visit_fqns_mut(visit),
            Concept::TypeAlias(d) => d.visit_fqns_mut(visit),
            Concept::Enum(d) => d.visit_fqns_mut(visit),
            Concept::Variable(d) => d.visit_fqns_mut(visit),
            Concept::Import(d) => d.visit_fqns_mut(visit),
            Concept::Export(d) => d.visit_fqns_mut(visit),
            Concept::DependencyEdge(d) => d.visit_fqns_mut(visit),
            Concept::Dependency(d) => d.visit_fqns_mut(visit),
            Concept::ModuleDependency(d) => d.visit_fqns_mut(visit),
        }
    }

    /// Deserialize a record stored under `kind`.
    pub fn from_value(kind: ConceptKind, value: serde_json::Value) -> serde_json::Result<Concept> {
        use serde_json::from_value;
        Ok(match kind {
            ConceptKind::Project => Concept::Project(from_value(value)?),
            ConceptKind::Module => Concept::Module(from_value(value)?),
            ConceptKind::Function => Concept::Function(from_value(value)?),
            ConceptKind::Class => Concept::Class(from_value(value)?),
            ConceptKind::Interface => Concept::Interface(from_value(value)?),
            ConceptKind::TypeAlias => Concept::TypeAlias(from_value(value)?),
            ConceptKind::Enum => Concept::Enum(from_value(value)?),
            ConceptKind::Variable => Concept::Variable(from_value(value)?),
            ConceptKind::Import => Concept::Import(from_value(value)?),
            ConceptKind::Export => Concept::Export(from_value(value)?),
            ConceptKind::DependencyEdge => Concept::DependencyEdge(from_value(value)?),
            ConceptKind::Dependency => Concept::Dependency(from_value(value)?),
            ConceptKind::ModuleDependency => Concept::ModuleDependency(from_value(value)?),
        })
    }
}

/// Concepts grouped by kind, each kind keeping insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConceptMap {
    entries: BTreeMap<ConceptKind, Vec<Concept>>,
}

impl ConceptMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, concept: Concept) {
        self.entries.entry(concept.kind()).or_default().push(concept);
    }

    /// Concepts of `kind`; an absent kind reads as empty.
    pub fn get(&self, kind: ConceptKind) -> &[Concept] {
        self.entries.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Remove and return all concepts of `kind`.
    pub fn take(&mut self, kind: ConceptKind) -> Vec<Concept> {
        self.entries.remove(&kind).unwrap_or_default()
    }

    /// Replace the concepts of `kind`. An empty sequence removes the key.
    pub fn set(&mut self, kind: ConceptKind, concepts: Vec<Concept>) {
        if concepts.is_empty() {
            self.entries.remove(&kind);
        } else {
            self.entries.insert(kind, concepts);
        }
    }

    pub fn contains(&self, kind: ConceptKind) -> bool {
        self.entries.contains_key(&kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = ConceptKind> + '_ {
        self.entries.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ConceptKind, &[Concept])> {
        self.entries.iter().map(|(kind, concepts)| (*kind, concepts.as_slice()))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Concept> {
        self.entries.values_mut().flat_map(|concepts| concepts.iter_mut())
    }

    /// Total number of concepts across kinds.
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Concatenate `other` onto this map, kind by kind.
    ///
    /// Existing concepts keep their position ahead of the new ones. No
    /// deduplication happens here.
    pub fn merge(mut self, other: ConceptMap) -> ConceptMap {
        for (kind, concepts) in other.entries {
            self.entries.entry(kind).or_default().extend(concepts);
        }
        self
    }

    pub fn visit_fqns_mut(&mut self, visit: &mut dyn FnMut(&mut Fqn)) {
        for concept in self.iter_mut() {
            concept.visit_fqns_mut(visit);
        }
    }

    /// FQNs occurring more than once within an FQN-identified kind.
    pub fn duplicate_fqns(&self) -> Vec<(ConceptKind, Fqn)> {
        let mut duplicates = Vec::new();
        for (kind, concepts) in self.iter() {
            if !kind.is_fqn_identified() {
                continue;
            }
            let mut seen = HashSet::new();
            for fqn in concepts.iter().filter_map(Concept::fqn) {
                if !seen.insert(fqn) {
                    duplicates.push((kind, fqn.clone()));
                }
            }
        }
        duplicates
    }
}
