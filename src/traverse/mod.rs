//! Per-file traversal.
//!
//! The [`Traverser`] walks a program's syntax tree pre-order and hands
//! each node to the first [`ExtractorEntry`] registered for its
//! [`NodeKind`]. An extractor emits concepts and either lets the walk
//! descend generically or takes over the node's children itself, usually
//! to walk them inside the declaration it just emitted so that references
//! found there are attributed to that declaration.

mod classes;
mod dispatch;
mod exports;
mod functions;
mod imports;
mod references;
mod types;
mod variables;

use std::path::Path;

use tree_sitter::Node;

use crate::concept::{Concept, ConceptMap, Coordinates, DependencyEdge, Fqn, Module, ReferenceKind};
use crate::error::TraversalError;
use crate::source::{exceeds_depth, Program, Resolution, SemanticQuery, MAX_TREE_DEPTH};

pub use dispatch::{ExtractorEntry, Flow, Handler, NodeKind, EXTRACTORS};

/// Everything an extractor may consult about the file being traversed.
pub struct TraversalContext<'p> {
    pub project_root: &'p Path,
    pub source_file_path: &'p Path,
    /// Module FQN in the file-relative form the semantic model uses.
    pub module_fqn: Fqn,
    /// Project-relative path, `./`-prefixed.
    pub module_path: String,
    pub program: &'p Program,
}

impl<'p> TraversalContext<'p> {
    pub fn new(project_root: &'p Path, program: &'p Program) -> Self {
        let source_file_path = program.path();
        let relative = source_file_path
            .strip_prefix(project_root)
            .unwrap_or(source_file_path);
        Self {
            project_root,
            source_file_path,
            module_fqn: Fqn::module(&crate::source::imports::path_string(source_file_path)),
            module_path: format!("./{}", crate::source::imports::path_string(relative)),
            program,
        }
    }
}

/// Walks one file with a fixed extractor table.
#[derive(Clone, Copy)]
pub struct Traverser {
    extractors: &'static [ExtractorEntry],
}

impl Default for Traverser {
    fn default() -> Self {
        Self {
            extractors: EXTRACTORS,
        }
    }
}

impl Traverser {
    pub fn new(extractors: &'static [ExtractorEntry]) -> Self {
        Self { extractors }
    }

    /// Produce the file-scoped concept map of one program. The module
    /// concept comes first.
    pub fn traverse(&self, ctx: &TraversalContext<'_>) -> Result<ConceptMap, TraversalError> {
        if exceeds_depth(ctx.program.root_node(), MAX_TREE_DEPTH) {
            return Err(TraversalError::TooDeep {
                limit: MAX_TREE_DEPTH,
            });
        }
        let mut visit = Visit {
            ctx,
            extractors: self.extractors,
            concepts: ConceptMap::new(),
            owners: Vec::new(),
        };
        visit.emit(Concept::Module(Module {
            fqn: ctx.module_fqn.clone(),
            path: ctx.module_path.clone(),
        }));
        visit.walk_children(ctx.program.root_node())?;
        Ok(visit.concepts)
    }
}

/// Mutable state of one traversal.
pub struct Visit<'p> {
    ctx: &'p TraversalContext<'p>,
    extractors: &'static [ExtractorEntry],
    concepts: ConceptMap,
    owners: Vec<Fqn>,
}

impl<'p> Visit<'p> {
    pub fn ctx(&self) -> &'p TraversalContext<'p> {
        self.ctx
    }

    pub fn sem(&self) -> &'p dyn SemanticQuery {
        self.ctx.program.semantic()
    }

    pub fn text(&self, node: Node<'_>) -> &'p str {
        let source: &'p [u8] = self.ctx.program.source();
        node.utf8_text(source).unwrap_or("")
    }

    pub fn coordinates(&self, node: Node<'_>) -> Coordinates {
        Coordinates::from_node(&self.ctx.module_path, node)
    }

    pub fn emit(&mut self, concept: Concept) {
        self.concepts.push(concept);
    }

    /// FQN that references found at this point are attributed to.
    pub fn source(&self) -> &Fqn {
        self.owners.last().unwrap_or(&self.ctx.module_fqn)
    }

    /// Run `f` with `owner` as the source of recorded references.
    pub fn within<F>(&mut self, owner: Fqn, f: F) -> Result<(), TraversalError>
    where
        F: FnOnce(&mut Self) -> Result<(), TraversalError>,
    {
        self.owners.push(owner);
        let result = f(self);
        self.owners.pop();
        result
    }

    /// Record a dependency edge from the current source.
    pub fn depend(&mut self, target: Fqn, reference_kind: ReferenceKind) {
        let source = self.source().clone();
        if source == target {
            return;
        }
        self.emit(Concept::DependencyEdge(DependencyEdge {
            source_fqn: source,
            target_fqn: target,
            reference_kind,
        }));
    }

    /// Record an edge for a resolved reference. Locals and type
    /// parameters stay inside their function and produce none.
    pub fn reference(&mut self, resolution: Resolution, reference_kind: ReferenceKind) {
        if let Some(target) = resolution.target() {
            self.depend(target, reference_kind);
        }
    }

    pub fn walk(&mut self, node: Node<'p>) -> Result<(), TraversalError> {
        if let Some(kind) = NodeKind::of(node) {
            let entry = self.extractors.iter().find(|e| e.kinds.contains(&kind));
            if let Some(entry) = entry {
                if (entry.handler)(node, self)? == Flow::Handled {
                    return Ok(());
                }
            }
        }
        self.walk_children(node)
    }

    pub fn walk_children(&mut self, node: Node<'p>) -> Result<(), TraversalError> {
        let mut cursor = node.walk();
        let children: Vec<Node<'p>> = node.named_children(&mut cursor).collect();
        for child in children {
            self.walk(child)?;
        }
        Ok(())
    }

    /// Walk the children of `node` with `owner` as the reference source.
    pub fn walk_within(&mut self, owner: Fqn, node: Node<'p>) -> Result<(), TraversalError> {
        self.within(owner, |visit| visit.walk_children(node))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::fs;
    use std::path::Path;

    use tempfile::TempDir;

    use super::{TraversalContext, Traverser};
    use crate::concept::ConceptMap;
    use crate::source::{SourceProvider, TreeSitterProvider};

    /// Traverse `files` written into a fresh project; returns the root and
    /// the per-file maps merged in order.
    pub fn traverse_project(files: &[(&str, &str)]) -> (TempDir, ConceptMap) {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let provider = TreeSitterProvider::new();
        let mut merged = ConceptMap::new();
        for (name, text) in files {
            let path = root.join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(&path, text).unwrap();
        }
        for (name, _) in files {
            let program = provider.program(&root, &root.join(name)).unwrap().unwrap();
            let ctx = TraversalContext::new(&root, &program);
            let map = Traverser::default().traverse(&ctx).unwrap();
            merged = merged.merge(map);
        }
        (dir, merged)
    }

    pub fn traverse_source(source: &str) -> ConceptMap {
        traverse_project(&[("main.ts", source)]).1
    }

    /// Module FQN prefix as it appears before unification.
    pub fn module_prefix(root: &Path, name: &str) -> String {
        format!("\"{}/{}\"", root.canonicalize().unwrap().display(), name)
    }
}
