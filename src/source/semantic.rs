//! Lexical scope model.
//!
//! Built once per file by a single walk over the syntax tree. The walk
//! opens a scope for every node that introduces bindings, binds the names
//! declared there, and allocates FQNs for declarations. FQNs depend only on
//! the module path and the lexical nesting of declarations, never on the
//! order in which files are processed.
//!
//! Nested declarations are qualified by their owner, the nearest enclosing
//! declaration that has an FQN itself:
//!
//! ```text
//! function outer() { function inner() {} }   // "m".outer.inner
//! class C { m() { function helper() {} } }   // "m".C.m.helper
//! ```
//!
//! Two declarations of one kind that would end up with the same FQN (for
//! example in sibling blocks) are told apart by a `$n` suffix in source
//! order.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use tree_sitter::{Node, Tree};

use super::imports::ModuleResolver;
use super::{Resolution, SemanticQuery};
use crate::concept::{ConceptKind, Fqn};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Binding {
    Declared(Fqn),
    Namespace(Fqn),
    Local,
    TypeParameter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Space {
    Value,
    Type,
}

#[derive(Debug, Default)]
struct Scope {
    values: HashMap<String, Binding>,
    types: HashMap<String, Binding>,
}

impl Scope {
    fn get(&self, space: Space, name: &str) -> Option<&Binding> {
        match space {
            Space::Value => self.values.get(name),
            Space::Type => self.types.get(name),
        }
    }
}

/// Scopes, bindings and allocated FQNs of one file.
pub struct ScopeModel {
    source: Rc<[u8]>,
    resolver: ModuleResolver,
    scopes: HashMap<usize, Scope>,
    declared: HashMap<usize, Fqn>,
    overloads: HashMap<usize, Fqn>,
}

const FUNCTION_DECLARATIONS: [&str; 3] = [
    "function_declaration",
    "generator_function_declaration",
    "function_signature",
];

const ANONYMOUS_FUNCTIONS: [&str; 8] = [
    "function_expression",
    "function",
    "arrow_function",
    "generator_function",
    "function_type",
    "constructor_type",
    "call_signature",
    "construct_signature",
];

const MEMBER_FUNCTIONS: [&str; 3] = ["method_definition", "method_signature", "abstract_method_signature"];

/// Walk state handed down the tree.
#[derive(Debug, Clone)]
struct Frame {
    /// Node id of the innermost scope.
    scope: usize,
    /// FQN that nested declarations are qualified by.
    owner: Fqn,
    /// Variables declared here get FQNs (module and namespace bodies).
    module_level: bool,
    /// Members declared here get FQNs (class and interface bodies).
    named_members: bool,
}

impl Frame {
    fn nested(&self, scope: usize, owner: Fqn) -> Frame {
        Frame {
            scope,
            owner,
            module_level: false,
            named_members: false,
        }
    }
}

struct Builder {
    model: ScopeModel,
    allocated: HashSet<(ConceptKind, Fqn)>,
}

impl ScopeModel {
    pub fn build(tree: &Tree, source: Rc<[u8]>, module: Fqn, resolver: ModuleResolver) -> Self {
        let mut builder = Builder {
            model: ScopeModel {
                source,
                resolver,
                scopes: HashMap::new(),
                declared: HashMap::new(),
                overloads: HashMap::new(),
            },
            allocated: HashSet::new(),
        };

        let root = tree.root_node();
        let frame = Frame {
            scope: root.id(),
            owner: module,
            module_level: true,
            named_members: false,
        };
        builder.open_container(root, &frame);
        builder.visit_children(root, &frame);
        builder.model
    }

    fn node_text(&self, node: Node<'_>) -> &str {
        node.utf8_text(&self.source).unwrap_or("")
    }

    fn lookup(&self, node: Node<'_>, name: &str, space: Space) -> Option<&Binding> {
        let mut current = Some(node);
        while let Some(n) = current {
            if let Some(binding) = self.scopes.get(&n.id()).and_then(|s| s.get(space, name)) {
                return Some(binding);
            }
            current = n.parent();
        }
        None
    }

    fn resolve(&self, node: Node<'_>, space: Space) -> Resolution {
        let name = self.node_text(node);
        match self.lookup(node, name, space) {
            Some(Binding::Declared(fqn)) | Some(Binding::Namespace(fqn)) => {
                Resolution::Declaration(fqn.clone())
            }
            Some(Binding::Local) => Resolution::Local,
            Some(Binding::TypeParameter) => Resolution::TypeParameter(name.to_string()),
            None => Resolution::Unresolved(Fqn::unresolved(name)),
        }
    }
}

impl SemanticQuery for ScopeModel {
    fn source(&self) -> &[u8] {
        &self.source
    }

    fn declared_fqn(&self, node: Node<'_>) -> Option<Fqn> {
        self.declared.get(&node.id()).cloned()
    }

    fn overload_of(&self, node: Node<'_>) -> Option<Fqn> {
        self.overloads.get(&node.id()).cloned()
    }

    fn resolve_value(&self, identifier: Node<'_>) -> Resolution {
        self.resolve(identifier, Space::Value)
    }

    fn resolve_type(&self, identifier: Node<'_>) -> Resolution {
        self.resolve(identifier, Space::Type)
    }

    fn resolve_member(&self, object: Node<'_>, member: &str) -> Option<Fqn> {
        if object.kind() != "identifier" {
            return None;
        }
        let name = self.node_text(object);
        [Space::Value, Space::Type]
            .into_iter()
            .find_map(|space| match self.lookup(object, name, space) {
                Some(Binding::Namespace(fqn)) => Some(fqn.child(member)),
                _ => None,
            })
    }

    fn import_target(&self, specifier: &str) -> Fqn {
        self.resolver.resolve(specifier)
    }
}

/// Unquoted content of a string literal node.
pub fn string_content(text: &str) -> &str {
    let trimmed = text.trim();
    if trimmed.len() >= 2 {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    }
}

/// The declaration wrapped by an `export` or `declare` statement.
pub fn unwrap_declaration(node: Node<'_>) -> Option<Node<'_>> {
    match node.kind() {
        "export_statement" => node.child_by_field_name("declaration"),
        "ambient_declaration" => node.named_child(0),
        _ => Some(node),
    }
}

impl Builder {
    fn text(&self, node: Node<'_>) -> String {
        self.model.node_text(node).to_string()
    }

    fn field_text(&self, node: Node<'_>, field: &str) -> Option<String> {
        node.child_by_field_name(field).map(|n| self.text(n))
    }

    fn allocate(&mut self, kind: ConceptKind, fqn: Fqn) -> Fqn {
        if self.allocated.insert((kind, fqn.clone())) {
            return fqn;
        }
        let mut n = 1;
        loop {
            let candidate = Fqn::from_raw(format!("{}${}", fqn, n));
            if self.allocated.insert((kind, candidate.clone())) {
                return candidate;
            }
            n += 1;
        }
    }

    fn bind(&mut self, scope: usize, space: Space, name: &str, binding: Binding) {
        let scope = self.model.scopes.entry(scope).or_default();
        let table = match space {
            Space::Value => &mut scope.values,
            Space::Type => &mut scope.types,
        };
        table.entry(name.to_string()).or_insert(binding);
    }

    fn bind_both(&mut self, scope: usize, name: &str, binding: Binding) {
        self.bind(scope, Space::Value, name, binding.clone());
        self.bind(scope, Space::Type, name, binding);
    }

    fn open_scope(&mut self, node: Node<'_>) {
        self.model.scopes.entry(node.id()).or_default();
    }

    /// Open a statement container and pre-allocate its function
    /// declarations, so overload signatures share the FQN of their
    /// implementation and calls before the declaration resolve.
    fn open_container(&mut self, container: Node<'_>, frame: &Frame) {
        self.open_scope(container);

        let mut groups: Vec<(String, Vec<Node<'_>>)> = Vec::new();
        let mut cursor = container.walk();
        for child in container.named_children(&mut cursor) {
            let Some(decl) = unwrap_declaration(child) else {
                continue;
            };
            if !FUNCTION_DECLARATIONS.contains(&decl.kind()) {
                continue;
            }
            let Some(name) = self.field_text(decl, "name") else {
                continue;
            };
            match groups.iter_mut().find(|(n, _)| *n == name) {
                Some((_, nodes)) => nodes.push(decl),
                None => groups.push((name, vec![decl])),
            }
        }

        for (name, nodes) in groups {
            let primary = nodes
                .iter()
                .rev()
                .find(|n| n.kind() != "function_signature")
                .or_else(|| nodes.first())
                .copied();
            let Some(primary) = primary else {
                continue;
            };
            let fqn = self.allocate(ConceptKind::Function, frame.owner.child(&name));
            self.bind(container.id(), Space::Value, &name, Binding::Declared(fqn.clone()));
            for node in &nodes {
                if node.id() == primary.id() {
                    self.model.declared.insert(node.id(), fqn.clone());
                } else {
                    self.model.overloads.insert(node.id(), fqn.clone());
                }
            }
        }
    }

    fn visit_children(&mut self, node: Node<'_>, frame: &Frame) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.visit(child, frame);
        }
    }

    fn visit(&mut self, node: Node<'_>, frame: &Frame) {
        let kind = node.kind();
        match kind {
            _ if FUNCTION_DECLARATIONS.contains(&kind) => self.function_declaration(node, frame),
            _ if ANONYMOUS_FUNCTIONS.contains(&kind) => {
                if let Some(name) = node.child_by_field_name("name") {
                    let name = self.text(name);
                    self.bind(node.id(), Space::Value, &name, Binding::Local);
                }
                self.function_like(node, frame, frame.owner.clone());
            }
            _ if MEMBER_FUNCTIONS.contains(&kind) => self.member_function(node, frame),
            "class_declaration" | "abstract_class_declaration" => self.class_declaration(node, frame),
            "class" => {
                self.open_scope(node);
                if let Some(name) = self.field_text(node, "name") {
                    self.bind_both(node.id(), &name, Binding::Local);
                }
                self.bind_type_parameters(node);
                let inner = frame.nested(node.id(), frame.owner.clone());
                self.visit_children(node, &inner);
            }
            "interface_declaration" => self.typed_declaration(node, frame, ConceptKind::Interface, true),
            "type_alias_declaration" => self.typed_declaration(node, frame, ConceptKind::TypeAlias, false),
            "enum_declaration" => self.enum_declaration(node, frame),
            "internal_module" | "module" => self.namespace(node, frame),
            "lexical_declaration" | "variable_declaration" => self.variables(node, frame),
            "import_statement" => self.import(node, frame),
            "public_field_definition" | "property_signature" => self.field(node, frame),
            "statement_block" => {
                let inner = frame.nested(node.id(), frame.owner.clone());
                self.open_container(node, &inner);
                self.visit_children(node, &inner);
            }
            "catch_clause" => {
                self.open_scope(node);
                if let Some(parameter) = node.child_by_field_name("parameter") {
                    self.bind_pattern(parameter, node.id());
                }
                let inner = frame.nested(node.id(), frame.owner.clone());
                self.visit_children(node, &inner);
            }
            "for_statement" | "for_in_statement" => {
                self.open_scope(node);
                if node.child_by_field_name("kind").is_some() {
                    if let Some(left) = node.child_by_field_name("left") {
                        self.bind_pattern(left, node.id());
                    }
                }
                let inner = frame.nested(node.id(), frame.owner.clone());
                self.visit_children(node, &inner);
            }
            _ => self.visit_children(node, frame),
        }
    }

    fn function_declaration(&mut self, node: Node<'_>, frame: &Frame) {
        let owner = if let Some(fqn) = self.model.declared.get(&node.id()) {
            fqn.clone()
        } else if let Some(fqn) = self.model.overloads.get(&node.id()) {
            fqn.clone()
        } else if let Some(name) = self.field_text(node, "name") {
            // not directly inside a statement container
            let fqn = self.allocate(ConceptKind::Function, frame.owner.child(&name));
            self.bind(frame.scope, Space::Value, &name, Binding::Declared(fqn.clone()));
            self.model.declared.insert(node.id(), fqn.clone());
            fqn
        } else {
            frame.owner.clone()
        };
        self.function_like(node, frame, owner);
    }

    fn function_like(&mut self, node: Node<'_>, frame: &Frame, owner: Fqn) {
        self.open_scope(node);
        self.bind_type_parameters(node);
        if let Some(parameters) = node.child_by_field_name("parameters") {
            let mut cursor = parameters.walk();
            for parameter in parameters.named_children(&mut cursor) {
                if let Some(pattern) = parameter.child_by_field_name("pattern") {
                    self.bind_pattern(pattern, node.id());
                }
            }
        }
        if let Some(parameter) = node.child_by_field_name("parameter") {
            self.bind_pattern(parameter, node.id());
        }
        let inner = frame.nested(node.id(), owner);
        self.visit_children(node, &inner);
    }

    fn member_function(&mut self, node: Node<'_>, frame: &Frame) {
        let mut owner = frame.owner.clone();
        if frame.named_members {
            if let Some(name) = self.field_text(node, "name") {
                owner = frame.owner.child(&name);
                self.model.declared.insert(node.id(), owner.clone());
            }
        }
        self.function_like(node, frame, owner);
    }

    fn field(&mut self, node: Node<'_>, frame: &Frame) {
        let mut owner = frame.owner.clone();
        if frame.named_members {
            if let Some(name) = self.field_text(node, "name") {
                owner = frame.owner.child(&name);
                self.model.declared.insert(node.id(), owner.clone());
            }
        }
        let inner = frame.nested(frame.scope, owner);
        self.visit_children(node, &inner);
    }

    fn class_declaration(&mut self, node: Node<'_>, frame: &Frame) {
        let Some(name) = self.field_text(node, "name") else {
            return self.visit_children(node, frame);
        };
        let fqn = self.allocate(ConceptKind::Class, frame.owner.child(&name));
        self.bind_both(frame.scope, &name, Binding::Declared(fqn.clone()));
        self.model.declared.insert(node.id(), fqn.clone());

        self.open_scope(node);
        self.bind_type_parameters(node);
        let inner = Frame {
            named_members: true,
            ..frame.nested(node.id(), fqn)
        };
        self.visit_children(node, &inner);
    }

    /// Interfaces and type aliases: type-only declarations with their own
    /// type-parameter scope.
    fn typed_declaration(&mut self, node: Node<'_>, frame: &Frame, kind: ConceptKind, named_members: bool) {
        let Some(name) = self.field_text(node, "name") else {
            return self.visit_children(node, frame);
        };
        let fqn = self.allocate(kind, frame.owner.child(&name));
        self.bind(frame.scope, Space::Type, &name, Binding::Declared(fqn.clone()));
        self.model.declared.insert(node.id(), fqn.clone());

        self.open_scope(node);
        self.bind_type_parameters(node);
        let inner = Frame {
            named_members,
            ..frame.nested(node.id(), fqn)
        };
        self.visit_children(node, &inner);
    }

    fn enum_declaration(&mut self, node: Node<'_>, frame: &Frame) {
        let Some(name) = self.field_text(node, "name") else {
            return self.visit_children(node, frame);
        };
        let fqn = self.allocate(ConceptKind::Enum, frame.owner.child(&name));
        self.bind_both(frame.scope, &name, Binding::Declared(fqn.clone()));
        self.model.declared.insert(node.id(), fqn.clone());
        let inner = frame.nested(frame.scope, fqn);
        self.visit_children(node, &inner);
    }

    fn namespace(&mut self, node: Node<'_>, frame: &Frame) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return self.visit_children(node, frame);
        };
        let name = self.text(name_node);
        let fqn = if name_node.kind() == "string" {
            // `declare module "pkg"` describes a package
            Fqn::module(string_content(&name))
        } else {
            let head = name.split('.').next().unwrap_or(&name).trim().to_string();
            self.bind_both(frame.scope, &head, Binding::Namespace(frame.owner.child(&head)));
            frame.owner.child(&name.replace(char::is_whitespace, ""))
        };
        self.model.declared.insert(node.id(), fqn.clone());

        if let Some(body) = node.child_by_field_name("body") {
            let inner = Frame {
                module_level: true,
                ..frame.nested(body.id(), fqn)
            };
            self.open_container(body, &inner);
            self.visit_children(body, &inner);
        }
    }

    fn variables(&mut self, node: Node<'_>, frame: &Frame) {
        let mut cursor = node.walk();
        for declarator in node.named_children(&mut cursor) {
            if declarator.kind() != "variable_declarator" {
                self.visit(declarator, frame);
                continue;
            }
            let Some(name) = declarator.child_by_field_name("name") else {
                continue;
            };
            if frame.module_level && name.kind() == "identifier" {
                let text = self.text(name);
                let fqn = self.allocate(ConceptKind::Variable, frame.owner.child(&text));
                self.bind(frame.scope, Space::Value, &text, Binding::Declared(fqn.clone()));
                self.model.declared.insert(declarator.id(), fqn.clone());
                let inner = Frame {
                    owner: fqn,
                    ..frame.clone()
                };
                self.visit_children(declarator, &inner);
            } else {
                self.bind_pattern(name, frame.scope);
                self.visit_children(declarator, frame);
            }
        }
    }

    fn import(&mut self, node: Node<'_>, frame: &Frame) {
        let Some(source) = node.child_by_field_name("source") else {
            // `import x = require("y")`
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                if child.kind() == "import_require_clause" {
                    self.import_require(child, frame);
                }
            }
            return;
        };
        let target = self.model.resolver.resolve(string_content(self.model.node_text(source)));

        let mut cursor = node.walk();
        let clauses: Vec<_> = node
            .named_children(&mut cursor)
            .filter(|c| c.kind() == "import_clause")
            .collect();
        for clause in clauses {
            let mut inner = clause.walk();
            for part in clause.named_children(&mut inner) {
                match part.kind() {
                    "identifier" => {
                        let local = self.text(part);
                        self.bind_both(frame.scope, &local, Binding::Declared(target.child("default")));
                    }
                    "namespace_import" => {
                        if let Some(local) = part.named_child(0) {
                            let local = self.text(local);
                            self.bind_both(frame.scope, &local, Binding::Namespace(target.clone()));
                        }
                    }
                    "named_imports" => {
                        let mut specifiers = part.walk();
                        for specifier in part.named_children(&mut specifiers) {
                            let Some(name) = self.field_text(specifier, "name") else {
                                continue;
                            };
                            let imported = string_or_identifier(&name);
                            let local = self.field_text(specifier, "alias").unwrap_or_else(|| name.clone());
                            self.bind_both(frame.scope, &local, Binding::Declared(target.child(imported)));
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    fn import_require(&mut self, clause: Node<'_>, frame: &Frame) {
        let local = clause.named_child(0).map(|n| self.text(n));
        let source = clause
            .child_by_field_name("source")
            .map(|n| string_content(self.model.node_text(n)).to_string());
        if let (Some(local), Some(source)) = (local, source) {
            let target = self.model.resolver.resolve(&source);
            self.bind_both(frame.scope, &local, Binding::Namespace(target));
        }
    }

    fn bind_type_parameters(&mut self, node: Node<'_>) {
        let Some(list) = node.child_by_field_name("type_parameters") else {
            return;
        };
        let mut cursor = list.walk();
        for parameter in list.named_children(&mut cursor) {
            if let Some(name) = self.field_text(parameter, "name") {
                self.bind(node.id(), Space::Type, &name, Binding::TypeParameter);
            }
        }
    }

    /// Bind every identifier a binding pattern introduces as local.
    fn bind_pattern(&mut self, pattern: Node<'_>, scope: usize) {
        match pattern.kind() {
            "identifier" | "shorthand_property_identifier_pattern" => {
                let name = self.text(pattern);
                self.bind(scope, Space::Value, &name, Binding::Local);
            }
            "pair_pattern" => {
                if let Some(value) = pattern.child_by_field_name("value") {
                    self.bind_pattern(value, scope);
                }
            }
            "assignment_pattern" | "object_assignment_pattern" => {
                if let Some(left) = pattern.child_by_field_name("left") {
                    self.bind_pattern(left, scope);
                }
            }
            "object_pattern" | "array_pattern" | "rest_pattern" => {
                let mut cursor = pattern.walk();
                for child in pattern.named_children(&mut cursor) {
                    self.bind_pattern(child, scope);
                }
            }
            _ => {}
        }
    }
}

/// Export names may be written as string literals (`export { x as "y" }`).
pub fn string_or_identifier(name: &str) -> &str {
    if name.starts_with('"') || name.starts_with('\'') {
        string_content(name)
    } else {
        name
    }
}
