use tree_sitter::Node;

use super::{Flow, Visit};
use crate::concept::{Concept, FunctionDeclaration};
use crate::error::TraversalError;
use crate::source::typing::has_token;

/// Function declarations and ambient function signatures. Overload
/// signatures are not concepts of their own; their type references count
/// against the implementation.
pub fn extract<'p>(node: Node<'p>, visit: &mut Visit<'p>) -> Result<Flow, TraversalError> {
    let sem = visit.sem();
    if let Some(implementation) = sem.overload_of(node) {
        visit.walk_within(implementation, node)?;
        return Ok(Flow::Handled);
    }

    let name = node
        .child_by_field_name("name")
        .ok_or_else(|| TraversalError::missing(node, "name"))?;
    let fqn = sem
        .declared_fqn(node)
        .ok_or_else(|| TraversalError::missing(node, "name"))?;
    let parameters = node
        .child_by_field_name("parameters")
        .ok_or_else(|| TraversalError::missing(node, "parameters"))?;

    visit.emit(Concept::Function(FunctionDeclaration {
        fqn: fqn.clone(),
        function_name: visit.text(name).to_string(),
        parameters: sem.parameters(parameters),
        return_type: sem.return_type(node),
        type_parameters: sem.type_parameters(node),
        is_async: has_token(node, "async"),
        coordinates: visit.coordinates(node),
    }));

    visit.walk_within(fqn, node)?;
    Ok(Flow::Handled)
}

#[cfg(test)]
mod tests {
    use crate::concept::{ConceptKind, TypeDesc};
    use crate::traverse::test_support::*;

    #[test]
    fn test_function_signature_details() {
        let map = traverse_source(
            "export async function load<T extends object>(url: string, retries?: number): Promise<T> { return fetch(url) as any; }\n",
        );
        let functions = map.get(ConceptKind::Function);
        assert_eq!(functions.len(), 1);
        let f = functions[0].as_function().unwrap();
        assert_eq!(f.function_name, "load");
        assert!(f.is_async);
        assert_eq!(f.parameters.len(), 2);
        assert_eq!(f.parameters[0].ty, TypeDesc::primitive("string"));
        assert!(f.parameters[1].optional);
        assert_eq!(
            f.parameters[1].ty,
            TypeDesc::Union {
                types: vec![TypeDesc::primitive("number"), TypeDesc::primitive("undefined")]
            }
        );
        assert_eq!(f.type_parameters[0].name, "T");
        assert_eq!(f.type_parameters[0].constraint, Some(TypeDesc::primitive("object")));
        match &f.return_type {
            TypeDesc::Declared { fqn, type_arguments } => {
                assert_eq!(fqn.as_str(), "Promise");
                assert_eq!(type_arguments, &vec![TypeDesc::TypeParameter { name: "T".to_string() }]);
            }
            other => panic!("unexpected return type {other:?}"),
        }
        assert_eq!(f.coordinates.start_line, 1);
        assert_eq!(f.coordinates.file_name, "./main.ts");
    }

    #[test]
    fn test_overloads_produce_one_function() {
        let map = traverse_source(
            "function f(a: string): void;\nfunction f(a: number): void;\nfunction f(a: any) {}\n",
        );
        let functions = map.get(ConceptKind::Function);
        assert_eq!(functions.len(), 1);
        assert_eq!(
            functions[0].as_function().unwrap().parameters[0].ty,
            TypeDesc::primitive("any")
        );
    }

    #[test]
    fn test_same_name_in_different_scopes() {
        let map = traverse_source(
            "function a() { function helper() {} }\nfunction b() { function helper() {} }\n",
        );
        let fqns: Vec<String> = map
            .get(ConceptKind::Function)
            .iter()
            .filter_map(|c| c.fqn())
            .map(|f| f.member_path().unwrap_or_default().to_string())
            .collect();
        assert_eq!(fqns, vec!["a", "a.helper", "b", "b.helper"]);
    }
}
