//! Project, module, import and export records.

use serde::{Deserialize, Serialize};

use super::Fqn;

/// Seed concept describing the analyzed project itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub root_path: String,
}

/// One processed source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub fqn: Fqn,
    /// Project-relative path, `./`-prefixed.
    pub path: String,
}

impl Module {
    pub fn visit_fqns_mut(&mut self, visit: &mut dyn FnMut(&mut Fqn)) {
        visit(&mut self.fqn);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportDeclaration {
    /// FQN of the importing module.
    pub importer: Fqn,
    /// Module specifier as written.
    pub source: String,
    /// `default`, `*` or the imported binding name.
    pub imported_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub target: Fqn,
    pub is_type_only: bool,
}

impl ImportDeclaration {
    pub fn visit_fqns_mut(&mut self, visit: &mut dyn FnMut(&mut Fqn)) {
        visit(&mut self.importer);
        visit(&mut self.target);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportKind {
    Value,
    Type,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDeclaration {
    /// Local name of the exported binding (`*` for namespace re-exports).
    pub identifier: String,
    /// Name under which the binding is exported, when different.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub decl_fqn: Fqn,
    pub is_default: bool,
    pub kind: ExportKind,
    /// FQN of the exporting module.
    pub source_file_path: Fqn,
}

impl ExportDeclaration {
    /// Name visible to importers of the exporting module.
    pub fn exported_name(&self) -> &str {
        if self.is_default {
            "default"
        } else {
            self.alias.as_deref().unwrap_or(&self.identifier)
        }
    }

    pub fn visit_fqns_mut(&mut self, visit: &mut dyn FnMut(&mut Fqn)) {
        visit(&mut self.decl_fqn);
        visit(&mut self.source_file_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn export(identifier: &str, alias: Option<&str>, is_default: bool) -> ExportDeclaration {
        ExportDeclaration {
            identifier: identifier.to_string(),
            alias: alias.map(str::to_string),
            decl_fqn: Fqn::module("./a.ts").child(identifier),
            is_default,
            kind: ExportKind::Value,
            source_file_path: Fqn::module("./a.ts"),
        }
    }

    #[test]
    fn test_exported_name() {
        assert_eq!(export("f", None, false).exported_name(), "f");
        assert_eq!(export("f", Some("g"), false).exported_name(), "g");
        assert_eq!(export("f", None, true).exported_name(), "default");
    }

    #[test]
    fn test_alias_omitted_when_absent() {
        let json = serde_json::to_value(export("f", None, false)).unwrap();
        assert!(json.get("alias").is_none());
        assert_eq!(json["declFqn"], "\"./a.ts\".f");
        assert_eq!(json["kind"], "value");
    }
}
