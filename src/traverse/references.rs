//! References: identifiers, type names and namespace member accesses that
//! become dependency edges.

use tree_sitter::Node;

use super::{Flow, NodeKind, Visit};
use crate::concept::{Fqn, ReferenceKind};
use crate::error::TraversalError;

/// Node kinds whose `name` field declares rather than references.
const DECLARING_PARENTS: [&str; 15] = [
    "function_declaration",
    "generator_function_declaration",
    "function_signature",
    "function_expression",
    "generator_function",
    "class_declaration",
    "abstract_class_declaration",
    "class",
    "interface_declaration",
    "type_alias_declaration",
    "enum_declaration",
    "variable_declarator",
    "type_parameter",
    "internal_module",
    "module",
];

pub fn extract<'p>(node: Node<'p>, visit: &mut Visit<'p>) -> Result<Flow, TraversalError> {
    match NodeKind::of(node) {
        Some(NodeKind::Identifier) => identifier(node, visit),
        Some(NodeKind::TypeIdentifier) => type_identifier(node, visit),
        Some(NodeKind::MemberAccess) => Ok(member_access(node, visit)),
        Some(NodeKind::NestedTypeIdentifier) => nested_type(node, visit),
        // closing tags repeat the opening tag
        _ => Ok(Flow::Handled),
    }
}

/// Namespace bodies are walked; the dotted namespace name is not a
/// reference.
pub fn enter_namespace<'p>(node: Node<'p>, visit: &mut Visit<'p>) -> Result<Flow, TraversalError> {
    if let Some(body) = node.child_by_field_name("body") {
        visit.walk(body)?;
    }
    Ok(Flow::Handled)
}

fn identifier(node: Node<'_>, visit: &mut Visit<'_>) -> Result<Flow, TraversalError> {
    if is_declaration_name(node) || is_intrinsic_tag(node, visit) {
        return Ok(Flow::Handled);
    }
    let resolution = visit.sem().resolve_value(node);
    visit.reference(resolution, usage(node, ReferenceKind::Read));
    Ok(Flow::Handled)
}

fn type_identifier(node: Node<'_>, visit: &mut Visit<'_>) -> Result<Flow, TraversalError> {
    if is_declaration_name(node) {
        return Ok(Flow::Handled);
    }
    let resolution = visit.sem().resolve_type(node);
    visit.reference(resolution, usage(node, ReferenceKind::TypeReference));
    Ok(Flow::Handled)
}

/// `ns.member` on a namespace binding references the member itself.
fn member_access(node: Node<'_>, visit: &mut Visit<'_>) -> Flow {
    let object = node.child_by_field_name("object");
    let property = node.child_by_field_name("property").map(|p| visit.text(p));
    let resolved = match (object, property) {
        (Some(object), Some(property)) => visit.sem().resolve_member(object, property),
        _ => None,
    };
    match resolved {
        Some(target) => {
            visit.depend(target, usage(node, ReferenceKind::Read));
            Flow::Handled
        }
        None => Flow::Descend,
    }
}

fn nested_type(node: Node<'_>, visit: &mut Visit<'_>) -> Result<Flow, TraversalError> {
    let sem = visit.sem();
    let name = node.child_by_field_name("name").map(|n| visit.text(n)).unwrap_or_default();
    let target = node
        .child_by_field_name("module")
        .and_then(|module| sem.resolve_member(module, name))
        .unwrap_or_else(|| Fqn::unresolved(visit.text(node)));
    visit.depend(target, usage(node, ReferenceKind::TypeReference));
    Ok(Flow::Handled)
}

fn is_declaration_name(node: Node<'_>) -> bool {
    node.parent().is_some_and(|parent| {
        DECLARING_PARENTS.contains(&parent.kind()) && parent.child_by_field_name("name") == Some(node)
    })
}

/// `<div>` names an element, not a binding.
fn is_intrinsic_tag(node: Node<'_>, visit: &Visit<'_>) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    matches!(parent.kind(), "jsx_opening_element" | "jsx_self_closing_element")
        && visit.text(node).starts_with(|c: char| c.is_ascii_lowercase())
}

/// How the expression or type at `node` is used by its parent.
fn usage(node: Node<'_>, default: ReferenceKind) -> ReferenceKind {
    let Some(mut parent) = node.parent() else {
        return default;
    };
    let mut current = node;
    // `extends Base<T>` and `implements Shape<T>`
    if parent.kind() == "generic_type" && parent.child_by_field_name("name") == Some(current) {
        current = parent;
        match parent.parent() {
            Some(grandparent) => parent = grandparent,
            None => return default,
        }
    }
    match parent.kind() {
        "call_expression" if parent.child_by_field_name("function") == Some(current) => ReferenceKind::Call,
        "new_expression" if parent.child_by_field_name("constructor") == Some(current) => {
            ReferenceKind::Construct
        }
        "extends_clause" | "extends_type_clause" => ReferenceKind::Extends,
        "implements_clause" => ReferenceKind::Implements,
        _ => default,
    }
}
