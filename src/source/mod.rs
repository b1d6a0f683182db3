//! Source access: file enumeration, parsing and semantic queries.
//!
//! The pipeline consumes sources through two seams. A [`SourceProvider`]
//! turns a file into a [`Program`] (or reports that the file has none),
//! and the program's [`SemanticQuery`] handle resolves identifiers and
//! computes type descriptions. [`TreeSitterProvider`] is the default
//! provider; it backs the semantic queries with a lexical [`ScopeModel`].

pub mod files;
pub mod imports;
pub mod semantic;
pub mod treesitter;
pub mod typing;

use std::path::{Path, PathBuf};
use std::rc::Rc;

use tree_sitter::{Node, Tree};

use crate::concept::{Fqn, Parameter, TypeDesc, TypeParameterDecl, Value};
use crate::error::ProviderError;

pub use files::collect_source_files;
pub use imports::ModuleResolver;
pub use semantic::ScopeModel;
pub use treesitter::TreeSitterProvider;

/// Produces programs for project files.
pub trait SourceProvider {
    /// Parse and analyze `file`. `Ok(None)` means the file is not part of
    /// any program and contributes nothing.
    fn program(&self, root: &Path, file: &Path) -> Result<Option<Program>, ProviderError>;
}

/// What an identifier refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A declaration with an FQN, in this project or in a package.
    Declaration(Fqn),
    /// A parameter or function-local binding.
    Local,
    /// A type parameter in scope.
    TypeParameter(String),
    /// Found in no scope; carries the unresolved marker FQN.
    Unresolved(Fqn),
}

impl Resolution {
    /// FQN of the referenced declaration for references that leave the
    /// current function body.
    pub fn target(self) -> Option<Fqn> {
        match self {
            Resolution::Declaration(fqn) | Resolution::Unresolved(fqn) => Some(fqn),
            Resolution::Local | Resolution::TypeParameter(_) => None,
        }
    }
}

/// Semantic queries over one parsed file.
///
/// Implementors answer the name-resolution questions; the type and value
/// computations are provided on top of them.
pub trait SemanticQuery {
    /// Source text of the file.
    fn source(&self) -> &[u8];

    /// FQN allocated to a declaration node.
    fn declared_fqn(&self, node: Node<'_>) -> Option<Fqn>;

    /// For an overload signature, the FQN of the implementation it
    /// belongs to.
    fn overload_of(&self, node: Node<'_>) -> Option<Fqn>;

    fn resolve_value(&self, identifier: Node<'_>) -> Resolution;

    fn resolve_type(&self, identifier: Node<'_>) -> Resolution;

    /// Resolve `object.member` where `object` names a namespace.
    fn resolve_member(&self, object: Node<'_>, member: &str) -> Option<Fqn>;

    /// Module FQN an import specifier of this file denotes.
    fn import_target(&self, specifier: &str) -> Fqn;

    fn text(&self, node: Node<'_>) -> &str {
        node.utf8_text(self.source()).unwrap_or("")
    }

    /// Type described by a type node or `type_annotation`.
    fn type_of(&self, node: Node<'_>) -> TypeDesc {
        typing::type_desc(self, node)
    }

    /// Type of an expression.
    fn expression_type(&self, expr: Node<'_>) -> TypeDesc {
        typing::expression_type(self, expr)
    }

    fn parameters(&self, formal_parameters: Node<'_>) -> Vec<Parameter> {
        typing::parameters(self, formal_parameters)
    }

    fn type_parameters(&self, declaration: Node<'_>) -> Vec<TypeParameterDecl> {
        typing::type_parameters(self, declaration)
    }

    /// Declared or inferred return type of a function-like node.
    fn return_type(&self, function: Node<'_>) -> TypeDesc {
        typing::return_type(self, function)
    }

    fn value_of(&self, expr: Node<'_>) -> Value {
        typing::value_of(self, expr)
    }
}

/// One parsed file together with its semantic handle.
pub struct Program {
    path: PathBuf,
    source: Rc<[u8]>,
    tree: Tree,
    semantic: Box<dyn SemanticQuery>,
}

impl Program {
    pub fn new(path: PathBuf, source: Rc<[u8]>, tree: Tree, semantic: Box<dyn SemanticQuery>) -> Self {
        Self {
            path,
            source,
            tree,
            semantic,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source(&self) -> &[u8] {
        &self.source
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn root_node(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn semantic(&self) -> &dyn SemanticQuery {
        self.semantic.as_ref()
    }

    pub fn text(&self, node: Node<'_>) -> &str {
        node.utf8_text(&self.source).unwrap_or("")
    }
}

/// Deepest syntax tree the recursive walks over a program accept.
pub const MAX_TREE_DEPTH: usize = 400;

/// Whether the tree below `root` nests deeper than `limit` levels.
/// Walks with a cursor, so arbitrarily deep trees are safe to check.
pub fn exceeds_depth(root: Node<'_>, limit: usize) -> bool {
    let mut cursor = root.walk();
    let mut depth = 0;
    loop {
        if cursor.goto_first_child() {
            depth += 1;
            if depth > limit {
                return true;
            }
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return false;
            }
            depth -= 1;
        }
    }
}
