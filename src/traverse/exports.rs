use tree_sitter::Node;

use super::{Flow, Visit};
use crate::concept::{Concept, ExportDeclaration, ExportKind, Fqn, ReferenceKind};
use crate::error::TraversalError;
use crate::source::semantic::{string_content, string_or_identifier, unwrap_declaration};
use crate::source::typing::has_token;
use crate::source::Resolution;

pub fn extract<'p>(node: Node<'p>, visit: &mut Visit<'p>) -> Result<Flow, TraversalError> {
    let is_default = has_token(node, "default");

    if let Some(declaration) = node.child_by_field_name("declaration") {
        for (identifier, decl_fqn, kind) in declared_names(declaration, visit) {
            export(visit, identifier, None, decl_fqn, is_default, kind);
        }
        return Ok(Flow::Descend);
    }

    let value = node.child_by_field_name("value").or_else(|| {
        // `export = expr`
        has_token(node, "=").then(|| node.named_child(0)).flatten()
    });
    if let Some(value) = value {
        let module = visit.ctx().module_fqn.clone();
        let (identifier, decl_fqn) = match value.kind() {
            "identifier" => match visit.sem().resolve_value(value).target() {
                Some(fqn) => (visit.text(value).to_string(), fqn),
                None => ("default".to_string(), module.child("default")),
            },
            _ => ("default".to_string(), module.child("default")),
        };
        export(visit, identifier, None, decl_fqn, true, ExportKind::Value);
        return Ok(Flow::Descend);
    }

    let type_only = has_token(node, "type");
    let reexported = node
        .child_by_field_name("source")
        .map(|source| visit.sem().import_target(string_content(visit.text(source))));

    let mut cursor = node.walk();
    let children: Vec<Node<'p>> = node.named_children(&mut cursor).collect();
    let clause = children.iter().find(|c| c.kind() == "export_clause");
    let namespace = children.iter().find(|c| c.kind() == "namespace_export");

    match (clause, &reexported) {
        (Some(clause), _) => export_clause(*clause, visit, reexported.as_ref(), type_only),
        (None, Some(target)) => {
            // `export * from` and `export * as ns from`
            let alias = namespace
                .and_then(|ns| ns.named_child(0))
                .map(|n| string_or_identifier(visit.text(n)).to_string());
            visit.depend(target.clone(), ReferenceKind::Export);
            export(visit, "*".to_string(), alias, target.clone(), false, ExportKind::Value);
        }
        // `export as namespace X` declares a UMD global and exports nothing
        (None, None) => {}
    }
    Ok(Flow::Handled)
}

fn export(
    visit: &mut Visit<'_>,
    identifier: String,
    alias: Option<String>,
    decl_fqn: Fqn,
    is_default: bool,
    kind: ExportKind,
) {
    let source_file_path = visit.ctx().module_fqn.clone();
    visit.emit(Concept::Export(ExportDeclaration {
        identifier,
        alias,
        decl_fqn,
        is_default,
        kind,
        source_file_path,
    }));
}

fn export_clause(clause: Node<'_>, visit: &mut Visit<'_>, reexported: Option<&Fqn>, type_only: bool) {
    let mut cursor = clause.walk();
    let specifiers: Vec<Node<'_>> = clause.named_children(&mut cursor).collect();
    for specifier in specifiers {
        let Some(name_node) = specifier.child_by_field_name("name") else {
            continue;
        };
        let name = string_or_identifier(visit.text(name_node)).to_string();
        let alias = specifier
            .child_by_field_name("alias")
            .map(|a| string_or_identifier(visit.text(a)).to_string());
        let type_only = type_only || has_token(specifier, "type");

        let (decl_fqn, kind) = match reexported {
            Some(module) => {
                let target = module.child(&name);
                visit.depend(target.clone(), ReferenceKind::Export);
                (target, if type_only { ExportKind::Type } else { ExportKind::Value })
            }
            None => local_binding(name_node, visit, &name, type_only),
        };
        // `export { x as default }`
        let is_default = alias.as_deref() == Some("default");
        let alias = if is_default { None } else { alias };
        export(visit, name, alias, decl_fqn, is_default, kind);
    }
}

fn local_binding(name_node: Node<'_>, visit: &Visit<'_>, name: &str, type_only: bool) -> (Fqn, ExportKind) {
    let sem = visit.sem();
    let fallback = || visit.ctx().module_fqn.child(name);
    if !type_only {
        if let Resolution::Declaration(fqn) = sem.resolve_value(name_node) {
            return (fqn, ExportKind::Value);
        }
    }
    match sem.resolve_type(name_node) {
        Resolution::Declaration(fqn) => (fqn, ExportKind::Type),
        Resolution::Unresolved(_) | Resolution::Local | Resolution::TypeParameter(_) => {
            let kind = if type_only { ExportKind::Type } else { ExportKind::Value };
            (fallback(), kind)
        }
    }
}

/// Names, FQNs and export kinds a declaration introduces.
fn declared_names(declaration: Node<'_>, visit: &Visit<'_>) -> Vec<(String, Fqn, ExportKind)> {
    let Some(declaration) = unwrap_declaration(declaration) else {
        return Vec::new();
    };
    let sem = visit.sem();
    let name_of = |node: Node<'_>| {
        node.child_by_field_name("name")
            .map(|n| visit.text(n).to_string())
    };
    let kind = match declaration.kind() {
        "interface_declaration" | "type_alias_declaration" => ExportKind::Type,
        _ => ExportKind::Value,
    };

    match declaration.kind() {
        "lexical_declaration" | "variable_declaration" => {
            let mut cursor = declaration.walk();
            let declarators: Vec<Node<'_>> = declaration.named_children(&mut cursor).collect();
            declarators
                .into_iter()
                .filter_map(|d| Some((name_of(d)?, sem.declared_fqn(d)?, ExportKind::Value)))
                .collect()
        }
        "internal_module" | "module" => match (name_of(declaration), sem.declared_fqn(declaration)) {
            (Some(name), Some(fqn)) => vec![(name, fqn, kind)],
            _ => Vec::new(),
        },
        _ => {
            // only the implementation of an overload set is exported once
            if sem.overload_of(declaration).is_some() {
                return Vec::new();
            }
            match (name_of(declaration), sem.declared_fqn(declaration)) {
                (Some(name), Some(fqn)) => vec![(name, fqn, kind)],
                _ => Vec::new(),
            }
        }
    }
}
