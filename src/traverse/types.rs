//! Interfaces, type aliases and enums.

use tree_sitter::Node;

use super::classes::{method, property};
use super::{Flow, Visit};
use crate::concept::{
    Concept, EnumDeclaration, EnumMember, InterfaceDeclaration, TypeAliasDeclaration,
};
use crate::error::TraversalError;
use crate::source::semantic::string_or_identifier;
use crate::source::typing::has_token;

pub fn extract_interface<'p>(node: Node<'p>, visit: &mut Visit<'p>) -> Result<Flow, TraversalError> {
    let sem = visit.sem();
    let name = node
        .child_by_field_name("name")
        .ok_or_else(|| TraversalError::missing(node, "name"))?;
    let fqn = sem
        .declared_fqn(node)
        .ok_or_else(|| TraversalError::missing(node, "name"))?;

    let mut interface = InterfaceDeclaration {
        fqn: fqn.clone(),
        interface_name: visit.text(name).to_string(),
        type_parameters: sem.type_parameters(node),
        extends_interfaces: Vec::new(),
        properties: Vec::new(),
        methods: Vec::new(),
        coordinates: visit.coordinates(node),
    };

    let mut cursor = node.walk();
    let children: Vec<Node<'p>> = node.named_children(&mut cursor).collect();
    if let Some(extends) = children.iter().find(|c| c.kind() == "extends_type_clause") {
        let mut types = extends.walk();
        interface.extends_interfaces = extends
            .named_children(&mut types)
            .map(|ty| sem.type_of(ty))
            .collect();
    }
    if let Some(body) = node.child_by_field_name("body") {
        let mut members = body.walk();
        for member in body.named_children(&mut members) {
            match member.kind() {
                "property_signature" => interface.properties.extend(property(visit, member)),
                "method_signature" => {
                    // overload signatures share one FQN; the first one stands for all
                    if let Some(method) = method(visit, member) {
                        if !interface.methods.iter().any(|m| m.fqn == method.fqn) {
                            interface.methods.push(method);
                        }
                    }
                }
                _ => {}
            }
        }
    }
    visit.emit(Concept::Interface(interface));

    visit.walk_within(fqn, node)?;
    Ok(Flow::Handled)
}

pub fn extract_type_alias<'p>(node: Node<'p>, visit: &mut Visit<'p>) -> Result<Flow, TraversalError> {
    let sem = visit.sem();
    let name = node
        .child_by_field_name("name")
        .ok_or_else(|| TraversalError::missing(node, "name"))?;
    let fqn = sem
        .declared_fqn(node)
        .ok_or_else(|| TraversalError::missing(node, "name"))?;
    let value = node
        .child_by_field_name("value")
        .ok_or_else(|| TraversalError::missing(node, "value"))?;

    visit.emit(Concept::TypeAlias(TypeAliasDeclaration {
        fqn: fqn.clone(),
        type_alias_name: visit.text(name).to_string(),
        type_parameters: sem.type_parameters(node),
        ty: sem.type_of(value),
        coordinates: visit.coordinates(node),
    }));

    visit.walk_within(fqn, node)?;
    Ok(Flow::Handled)
}

pub fn extract_enum<'p>(node: Node<'p>, visit: &mut Visit<'p>) -> Result<Flow, TraversalError> {
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

    let mut members = Vec::new();
    let mut cursor = body.walk();
    for member in body.named_children(&mut cursor) {
        let (name, init) = match member.kind() {
            "enum_assignment" => (
                member.child_by_field_name("name").or_else(|| member.named_child(0)),
                member.child_by_field_name("value"),
            ),
            "property_identifier" | "string" | "number" | "computed_property_name" => (Some(member), None),
            _ => continue,
        };
        let Some(name) = name.map(|n| string_or_identifier(visit.text(n)).to_string()) else {
            continue;
        };
        members.push(EnumMember {
            fqn: fqn.child(&name),
            name,
            init: init.map(|value| sem.value_of(value)),
        });
    }

    visit.emit(Concept::Enum(EnumDeclaration {
        fqn: fqn.clone(),
        enum_name: visit.text(name).to_string(),
        members,
        constant: has_token(node, "const"),
        declared: is_ambient(node),
        coordinates: visit.coordinates(node),
    }));

    visit.walk_within(fqn, node)?;
    Ok(Flow::Handled)
}

fn is_ambient(node: Node<'_>) -> bool {
    let mut current = node.parent();
    while let Some(parent) = current {
        if parent.kind() == "ambient_declaration" {
            return true;
        }
        current = parent.parent();
    }
    false
}

#[cfg(test)]
mod tests {
    use crate::concept::{ConceptKind, LiteralValue, ReferenceKind, TypeDesc, Value};
    use crate::traverse::test_support::*;

    #[test]
    fn test_interface() {
        let (dir, map) = traverse_project(&[(
            "main.ts",
            "interface Named { name: string }\ninterface User<T> extends Named { readonly id?: T; greet(other: User<T>): string; }\n",
        )]);
        let prefix = module_prefix(dir.path(), "main.ts");
        let user = map.get(ConceptKind::Interface)[1].as_interface().unwrap();
        assert_eq!(user.interface_name, "User");
        assert_eq!(user.type_parameters.len(), 1);
        assert_eq!(
            user.extends_interfaces,
            vec![TypeDesc::declared(format!("{prefix}.Named").as_str().into())]
        );
        assert_eq!(user.properties.len(), 1);
        assert!(user.properties[0].readonly);
        assert!(user.properties[0].optional);
        assert_eq!(user.properties[0].fqn.to_string(), format!("{prefix}.User.id"));
        assert_eq!(user.methods.len(), 1);
        assert_eq!(user.methods[0].return_type, TypeDesc::primitive("string"));

        let extends = map
            .get(ConceptKind::DependencyEdge)
            .iter()
            .filter_map(|c| c.as_dependency_edge())
            .filter(|e| e.reference_kind == ReferenceKind::Extends)
            .count();
        assert_eq!(extends, 1);
    }

    #[test]
    fn test_interface_overloads_fold_into_one_method() {
        let (dir, map) = traverse_project(&[(
            "main.ts",
            "interface Parser { parse(a: string): void; parse(a: number): void; reset(): void; }\n",
        )]);
        let prefix = module_prefix(dir.path(), "main.ts");
        let parser = map.get(ConceptKind::Interface)[0].as_interface().unwrap();
        let fqns: Vec<String> = parser.methods.iter().map(|m| m.fqn.to_string()).collect();
        assert_eq!(fqns, vec![format!("{prefix}.Parser.parse"), format!("{prefix}.Parser.reset")]);
        assert_eq!(parser.methods[0].parameters[0].ty, TypeDesc::primitive("string"));
    }

    #[test]
    fn test_type_alias() {
        let map = traverse_source("type Id = string | number;\n");
        let alias = map.get(ConceptKind::TypeAlias)[0].as_type_alias().unwrap();
        assert_eq!(alias.type_alias_name, "Id");
        assert_eq!(
            alias.ty,
            TypeDesc::Union {
                types: vec![TypeDesc::primitive("string"), TypeDesc::primitive("number")]
            }
        );
    }

    #[test]
    fn test_enums() {
        let map = traverse_source("const enum Color { Red, Green = 2, Blue = \"b\" }\ndeclare enum Remote { A }\n");
        let enums = map.get(ConceptKind::Enum);
        let color = enums[0].as_enum().unwrap();
        assert!(color.constant);
        assert!(!color.declared);
        let names: Vec<&str> = color.members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Red", "Green", "Blue"]);
        assert_eq!(color.members[0].init, None);
        match &color.members[1].init {
            Some(Value::Literal { value: LiteralValue::Number(n), .. }) => assert_eq!(*n, 2.0),
            other => panic!("unexpected init {other:?}"),
        }
        assert!(color.members[2].fqn.as_str().ends_with(".Color.Blue"));

        let remote = enums[1].as_enum().unwrap();
        assert!(remote.declared);
        assert!(!remote.constant);
    }
}
