use tree_sitter::Node;

use super::{Flow, Visit};
use crate::concept::{Concept, TypeDesc, VariableDeclaration, VariableKind};
use crate::error::TraversalError;

/// Module- and namespace-level variables. Declarators without an FQN are
/// locals and are only walked for references.
pub fn extract<'p>(node: Node<'p>, visit: &mut Visit<'p>) -> Result<Flow, TraversalError> {
    let sem = visit.sem();
    let kind = match node.child_by_field_name("kind") {
        Some(keyword) => VariableKind::parse(visit.text(keyword)),
        None => VariableKind::Var,
    };

    let mut cursor = node.walk();
    let declarators: Vec<Node<'p>> = node.named_children(&mut cursor).collect();
    for declarator in declarators {
        let Some(fqn) = sem.declared_fqn(declarator) else {
            visit.walk(declarator)?;
            continue;
        };
        let name = declarator
            .child_by_field_name("name")
            .ok_or_else(|| TraversalError::missing(declarator, "name"))?;
        let value = declarator.child_by_field_name("value");
        let ty = match (declarator.child_by_field_name("type"), value) {
            (Some(annotation), _) => sem.type_of(annotation),
            (None, Some(value)) => sem.expression_type(value),
            (None, None) => TypeDesc::primitive("any"),
        };

        visit.emit(Concept::Variable(VariableDeclaration {
            fqn: fqn.clone(),
            variable_name: visit.text(name).to_string(),
            kind,
            ty,
            init_value: value.map(|v| sem.value_of(v)),
            coordinates: visit.coordinates(declarator),
        }));
        visit.walk_within(fqn, declarator)?;
    }
    Ok(Flow::Handled)
}

#[cfg(test)]
mod tests {
    use crate::concept::{ConceptKind, LiteralValue, TypeDesc, Value, VariableKind};
    use crate::traverse::test_support::*;

    #[test]
    fn test_module_level_variables_only() {
        let map = traverse_source(
            "export const limit: number = 10;\nlet name = \"x\";\nvar flag;\nfunction f() { const local = 1; }\n",
        );
        let variables: Vec<_> = map
            .get(ConceptKind::Variable)
            .iter()
            .filter_map(|c| c.as_variable())
            .collect();
        assert_eq!(variables.len(), 3);

        assert_eq!(variables[0].variable_name, "limit");
        assert_eq!(variables[0].kind, VariableKind::Const);
        assert_eq!(variables[0].ty, TypeDesc::primitive("number"));
        assert_eq!(
            variables[0].init_value,
            Some(Value::Literal {
                value: LiteralValue::Number(10.0),
                ty: TypeDesc::primitive("number"),
            })
        );

        assert_eq!(variables[1].kind, VariableKind::Let);
        assert_eq!(variables[1].ty, TypeDesc::primitive("string"));

        assert_eq!(variables[2].kind, VariableKind::Var);
        assert_eq!(variables[2].ty, TypeDesc::primitive("any"));
        assert_eq!(variables[2].init_value, None);
    }

    #[test]
    fn test_initializer_references_belong_to_variable() {
        let map = traverse_source("function make() { return 1; }\nexport const made = make();\n");
        let edge = map.get(ConceptKind::DependencyEdge)[0].as_dependency_edge().unwrap();
        assert!(edge.source_fqn.as_str().ends_with(".made"));
        assert!(edge.target_fqn.as_str().ends_with(".make"));
    }
}
