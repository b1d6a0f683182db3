use tree_sitter::Node;

use super::{Flow, Visit};
use crate::concept::{Concept, Fqn, ImportDeclaration, ReferenceKind};
use crate::error::TraversalError;
use crate::source::semantic::{string_content, string_or_identifier};
use crate::source::typing::has_token;

struct Binding {
    imported_name: String,
    alias: Option<String>,
    target: Fqn,
    is_type_only: bool,
}

/// One import declaration per bound name, plus an import edge from the
/// module to whatever the binding denotes.
pub fn extract<'p>(node: Node<'p>, visit: &mut Visit<'p>) -> Result<Flow, TraversalError> {
    let statement_type_only = has_token(node, "type");
    let mut cursor = node.walk();
    let require = node
        .named_children(&mut cursor)
        .find(|c| c.kind() == "import_require_clause");

    let (specifier_node, bindings) = match require {
        Some(clause) => {
            let source = clause
                .child_by_field_name("source")
                .ok_or_else(|| TraversalError::missing(clause, "source"))?;
            let local = clause.named_child(0).map(|n| visit.text(n).to_string());
            let target = visit.sem().import_target(string_content(visit.text(source)));
            let binding = Binding {
                imported_name: "*".to_string(),
                alias: local,
                target,
                is_type_only: statement_type_only,
            };
            (source, vec![binding])
        }
        None => {
            let source = node
                .child_by_field_name("source")
                .ok_or_else(|| TraversalError::missing(node, "source"))?;
            let module = visit.sem().import_target(string_content(visit.text(source)));
            let bindings = clause_bindings(node, visit, &module, statement_type_only);
            if bindings.is_empty() {
                // side-effect import
                visit.depend(module, ReferenceKind::Import);
                return Ok(Flow::Handled);
            }
            (source, bindings)
        }
    };

    let importer = visit.ctx().module_fqn.clone();
    let specifier = string_content(visit.text(specifier_node)).to_string();
    for binding in bindings {
        visit.depend(binding.target.clone(), ReferenceKind::Import);
        visit.emit(Concept::Import(ImportDeclaration {
            importer: importer.clone(),
            source: specifier.clone(),
            imported_name: binding.imported_name,
            alias: binding.alias,
            target: binding.target,
            is_type_only: binding.is_type_only,
        }));
    }
    Ok(Flow::Handled)
}

fn clause_bindings(node: Node<'_>, visit: &Visit<'_>, module: &Fqn, type_only: bool) -> Vec<Binding> {
    let mut out = Vec::new();
    let mut cursor = node.walk();
    let clauses: Vec<Node<'_>> = node
        .named_children(&mut cursor)
        .filter(|c| c.kind() == "import_clause")
        .collect();
    for clause in clauses {
        let mut parts = clause.walk();
        for part in clause.named_children(&mut parts) {
            match part.kind() {
                "identifier" => out.push(Binding {
                    imported_name: "default".to_string(),
                    alias: Some(visit.text(part).to_string()),
                    target: module.child("default"),
                    is_type_only: type_only,
                }),
                "namespace_import" => out.push(Binding {
                    imported_name: "*".to_string(),
                    alias: part.named_child(0).map(|n| visit.text(n).to_string()),
                    target: module.clone(),
                    is_type_only: type_only,
                }),
                "named_imports" => {
                    let mut specifiers = part.walk();
                    for specifier in part.named_children(&mut specifiers) {
                        let Some(name) = specifier.child_by_field_name("name") else {
                            continue;
                        };
                        let imported = string_or_identifier(visit.text(name));
                        out.push(Binding {
                            imported_name: imported.to_string(),
                            alias: specifier
                                .child_by_field_name("alias")
                                .map(|a| visit.text(a).to_string()),
                            target: module.child(imported),
                            is_type_only: type_only || has_token(specifier, "type"),
                        });
                    }
                }
                _ => {}
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use crate::concept::{ConceptKind, ReferenceKind};
    use crate::traverse::test_support::*;

    #[test]
    fn test_import_bindings() {
        let (dir, map) = traverse_project(&[
            (
                "main.ts",
                "import D, { a, b as c } from \"./lib\";\nimport * as ns from \"lodash\";\nimport type { T } from \"./lib\";\nimport \"./polyfill\";\n",
            ),
            ("lib.ts", "export default 1; export const a = 1, b = 2; export type T = number;\n"),
        ]);
        let lib = module_prefix(dir.path(), "lib.ts");
        let imports: Vec<_> = map
            .get(ConceptKind::Import)
            .iter()
            .filter_map(|c| c.as_import())
            .collect();
        assert_eq!(imports.len(), 5);

        assert_eq!(imports[0].imported_name, "default");
        assert_eq!(imports[0].alias.as_deref(), Some("D"));
        assert_eq!(imports[0].target.to_string(), format!("{lib}.default"));

        assert_eq!(imports[1].imported_name, "a");
        assert_eq!(imports[1].alias, None);
        assert_eq!(imports[2].imported_name, "b");
        assert_eq!(imports[2].alias.as_deref(), Some("c"));
        assert_eq!(imports[2].source, "./lib");

        assert_eq!(imports[3].imported_name, "*");
        assert_eq!(imports[3].target.as_str(), "\"lodash\"");

        assert!(imports[4].is_type_only);
        assert!(!imports[0].is_type_only);

        let import_edges = map
            .get(ConceptKind::DependencyEdge)
            .iter()
            .filter_map(|c| c.as_dependency_edge())
            .filter(|e| e.reference_kind == ReferenceKind::Import)
            .count();
        // five bindings plus the side-effect import
        assert_eq!(import_edges, 6);
    }

    #[test]
    fn test_import_require() {
        let map = traverse_source("import fs = require(\"fs\");\n");
        let import = map.get(ConceptKind::Import)[0].as_import().unwrap();
        assert_eq!(import.imported_name, "*");
        assert_eq!(import.alias.as_deref(), Some("fs"));
        assert_eq!(import.target.as_str(), "\"fs\"");
    }
}
