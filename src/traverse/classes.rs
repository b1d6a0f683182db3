//! Classes and the members shared with interfaces.

use std::collections::HashSet;

use tree_sitter::Node;

use super::{Flow, Visit};
use crate::concept::{
    Accessor, AccessorProperty, ClassDeclaration, Concept, ConstructorDeclaration, Fqn,
    MethodDeclaration, PropertyDeclaration, TypeDesc, Visibility,
};
use crate::error::TraversalError;
use crate::source::typing::{has_token, with_undefined};

pub fn extract<'p>(node: Node<'p>, visit: &mut Visit<'p>) -> Result<Flow, TraversalError> {
    let sem = visit.sem();
    let name = node
        .child_by_field_name("name")
        .ok_or_else(|| TraversalError::missing(node, "name"))?;
    let fqn = sem
        .declared_fqn(node)
        .ok_or_else(|| TraversalError::missing(node, "name"))?;
    let body = node
        .child_by_field_name("body")
        .ok_or_else(|| TraversalError::missing(node, "body"))?;

    let mut class = ClassDeclaration {
        fqn: fqn.clone(),
        class_name: visit.text(name).to_string(),
        is_abstract: node.kind() == "abstract_class_declaration",
        type_parameters: sem.type_parameters(node),
        extends_class: None,
        implements_interfaces: Vec::new(),
        constructors: Vec::new(),
        properties: Vec::new(),
        methods: Vec::new(),
        accessor_properties: Vec::new(),
        coordinates: visit.coordinates(node),
    };

    let mut cursor = node.walk();
    let heritage = node
        .named_children(&mut cursor)
        .find(|c| c.kind() == "class_heritage");
    if let Some(heritage) = heritage {
        let mut clauses = heritage.walk();
        for clause in heritage.named_children(&mut clauses) {
            match clause.kind() {
                "extends_clause" => {
                    class.extends_class = clause
                        .child_by_field_name("value")
                        .map(|value| heritage_type(visit, value, clause.child_by_field_name("type_arguments")));
                }
                "implements_clause" => {
                    let mut types = clause.walk();
                    class.implements_interfaces = clause
                        .named_children(&mut types)
                        .map(|ty| sem.type_of(ty))
                        .collect();
                }
                _ => {}
            }
        }
    }

    class_members(visit, &fqn, body, &mut class);
    visit.emit(Concept::Class(class));

    visit.walk_within(fqn, node)?;
    Ok(Flow::Handled)
}

/// Members with an FQN of their own own the references inside them.
pub fn enter_member<'p>(node: Node<'p>, visit: &mut Visit<'p>) -> Result<Flow, TraversalError> {
    match visit.sem().declared_fqn(node) {
        Some(fqn) => {
            visit.walk_within(fqn, node)?;
            Ok(Flow::Handled)
        }
        None => Ok(Flow::Descend),
    }
}

/// Type named by a class `extends` expression.
fn heritage_type(visit: &Visit<'_>, value: Node<'_>, type_arguments: Option<Node<'_>>) -> TypeDesc {
    let sem = visit.sem();
    let text = visit.text(value);
    let fqn = match value.kind() {
        "identifier" => Some(sem.resolve_value(value).target().unwrap_or_else(|| Fqn::unresolved(text))),
        "member_expression" => {
            let property = value
                .child_by_field_name("property")
                .map(|p| visit.text(p))
                .unwrap_or_default();
            Some(
                value
                    .child_by_field_name("object")
                    .and_then(|object| sem.resolve_member(object, property))
                    .unwrap_or_else(|| Fqn::unresolved(text)),
            )
        }
        _ => None,
    };
    match fqn {
        Some(fqn) => TypeDesc::Declared {
            fqn,
            type_arguments: type_arguments
                .map(|args| {
                    let mut cursor = args.walk();
                    let types: Vec<TypeDesc> = args.named_children(&mut cursor).map(|t| sem.type_of(t)).collect();
                    types
                })
                .unwrap_or_default(),
        },
        None => TypeDesc::not_identified(text),
    }
}

fn class_members(visit: &Visit<'_>, class_fqn: &Fqn, body: Node<'_>, class: &mut ClassDeclaration) {
    let sem = visit.sem();
    let mut cursor = body.walk();
    let members: Vec<Node<'_>> = body.named_children(&mut cursor).collect();

    // signatures followed by an implementation are overloads of it
    let implemented: HashSet<&str> = members
        .iter()
        .filter(|m| m.kind() == "method_definition")
        .filter_map(|m| m.child_by_field_name("name"))
        .map(|n| visit.text(n))
        .collect();

    for member in members {
        match member.kind() {
            "method_definition" if member_name(visit, member) == Some("constructor") => {
                let Some(parameters) = member.child_by_field_name("parameters") else {
                    continue;
                };
                class
                    .properties
                    .extend(parameter_properties(visit, class_fqn, parameters));
                class.constructors.push(ConstructorDeclaration {
                    fqn: sem
                        .declared_fqn(member)
                        .unwrap_or_else(|| class_fqn.child("constructor")),
                    parameters: sem.parameters(parameters),
                    coordinates: visit.coordinates(member),
                });
            }
            "method_definition" if has_token(member, "get") || has_token(member, "set") => {
                accessor(visit, member, &mut class.accessor_properties);
            }
            "method_signature" if member_name(visit, member).is_some_and(|n| implemented.contains(n)) => {}
            "method_definition" | "method_signature" | "abstract_method_signature" => {
                if let Some(method) = method(visit, member) {
                    class.methods.push(method);
                }
            }
            "public_field_definition" => {
                if let Some(property) = property(visit, member) {
                    class.properties.push(property);
                }
            }
            _ => {}
        }
    }
}

fn member_name<'p>(visit: &Visit<'p>, member: Node<'_>) -> Option<&'p str> {
    member.child_by_field_name("name").map(|n| visit.text(n))
}

pub(super) fn visibility(visit: &Visit<'_>, node: Node<'_>) -> Visibility {
    let mut cursor = node.walk();
    let modifier = node
        .named_children(&mut cursor)
        .find(|c| c.kind() == "accessibility_modifier");
    match modifier {
        Some(modifier) => Visibility::parse(visit.text(modifier)),
        None if member_name(visit, node).is_some_and(|n| n.starts_with('#')) => Visibility::Private,
        None => Visibility::Public,
    }
}

/// Property from a class field or an interface property signature.
pub(super) fn property(visit: &Visit<'_>, node: Node<'_>) -> Option<PropertyDeclaration> {
    let sem = visit.sem();
    let name = member_name(visit, node)?;
    let optional = has_token(node, "?");
    let mut ty = match (node.child_by_field_name("type"), node.child_by_field_name("value")) {
        (Some(annotation), _) => sem.type_of(annotation),
        (None, Some(value)) => sem.expression_type(value),
        (None, None) => TypeDesc::primitive("any"),
    };
    if optional {
        ty = with_undefined(ty);
    }
    Some(PropertyDeclaration {
        fqn: sem.declared_fqn(node)?,
        property_name: name.to_string(),
        optional,
        ty,
        visibility: visibility(visit, node),
        readonly: has_token(node, "readonly"),
        is_static: has_token(node, "static"),
        is_abstract: has_token(node, "abstract"),
        coordinates: visit.coordinates(node),
    })
}

pub(super) fn method(visit: &Visit<'_>, node: Node<'_>) -> Option<MethodDeclaration> {
    let sem = visit.sem();
    let name = member_name(visit, node)?;
    Some(MethodDeclaration {
        fqn: sem.declared_fqn(node)?,
        method_name: name.to_string(),
        parameters: node
            .child_by_field_name("parameters")
            .map(|p| sem.parameters(p))
            .unwrap_or_default(),
        return_type: sem.return_type(node),
        type_parameters: sem.type_parameters(node),
        optional: has_token(node, "?"),
        visibility: visibility(visit, node),
        is_static: has_token(node, "static"),
        is_abstract: node.kind() == "abstract_method_signature" || has_token(node, "abstract"),
        is_async: has_token(node, "async"),
        coordinates: visit.coordinates(node),
    })
}

/// Constructor parameters with an accessibility modifier or `readonly`
/// declare properties as well.
fn parameter_properties(visit: &Visit<'_>, class_fqn: &Fqn, formal: Node<'_>) -> Vec<PropertyDeclaration> {
    let sem = visit.sem();
    let parameters = sem.parameters(formal);
    let mut cursor = formal.walk();
    let nodes: Vec<Node<'_>> = formal
        .named_children(&mut cursor)
        .filter(|p| matches!(p.kind(), "required_parameter" | "optional_parameter"))
        .collect();

    let mut out = Vec::new();
    for node in nodes {
        let mut modifiers = node.walk();
        let has_modifier = node
            .named_children(&mut modifiers)
            .any(|c| c.kind() == "accessibility_modifier");
        let readonly = has_token(node, "readonly");
        if !has_modifier && !readonly {
            continue;
        }
        let Some(pattern) = node.child_by_field_name("pattern") else {
            continue;
        };
        let name = visit.text(pattern);
        let Some(parameter) = parameters.iter().find(|p| p.name == name) else {
            continue;
        };
        out.push(PropertyDeclaration {
            fqn: class_fqn.child(name),
            property_name: name.to_string(),
            optional: parameter.optional,
            ty: parameter.ty.clone(),
            visibility: visibility(visit, node),
            readonly,
            is_static: false,
            is_abstract: false,
            coordinates: visit.coordinates(node),
        });
    }
    out
}

fn accessor(visit: &Visit<'_>, node: Node<'_>, accessors: &mut Vec<AccessorProperty>) {
    let sem = visit.sem();
    let Some(name) = member_name(visit, node) else {
        return;
    };
    let Some(fqn) = sem.declared_fqn(node) else {
        return;
    };
    let is_static = has_token(node, "static");
    let is_getter = has_token(node, "get");
    let ty = if is_getter {
        sem.return_type(node)
    } else {
        node.child_by_field_name("parameters")
            .and_then(|p| sem.parameters(p).into_iter().next())
            .map(|p| p.ty)
            .unwrap_or_else(|| TypeDesc::primitive("any"))
    };
    let half = Accessor {
        ty,
        visibility: visibility(visit, node),
        coordinates: visit.coordinates(node),
    };

    let index = match accessors
        .iter()
        .position(|a| a.accessor_name == name && a.is_static == is_static)
    {
        Some(index) => index,
        None => {
            accessors.push(AccessorProperty {
                fqn,
                accessor_name: name.to_string(),
                getter: None,
                setter: None,
                is_static,
            });
            accessors.len() - 1
        }
    };
    if is_getter {
        accessors[index].getter = Some(half);
    } else {
        accessors[index].setter = Some(half);
    }
}
