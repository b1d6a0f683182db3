//! Node-kind dispatch table.

use phf::phf_map;
use tree_sitter::Node;

use super::{classes, exports, functions, imports, references, types, variables, Visit};
use crate::error::TraversalError;

/// Syntax node kinds that some extractor is interested in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Import,
    Export,
    Function,
    Class,
    Member,
    Interface,
    TypeAlias,
    Enum,
    Variables,
    Namespace,
    Identifier,
    TypeIdentifier,
    MemberAccess,
    NestedTypeIdentifier,
    JsxClosing,
}

static NODE_KINDS: phf::Map<&'static str, NodeKind> = phf_map! {
    "import_statement" => NodeKind::Import,
    "export_statement" => NodeKind::Export,
    "function_declaration" => NodeKind::Function,
    "generator_function_declaration" => NodeKind::Function,
    "function_signature" => NodeKind::Function,
    "class_declaration" => NodeKind::Class,
    "abstract_class_declaration" => NodeKind::Class,
    "method_definition" => NodeKind::Member,
    "method_signature" => NodeKind::Member,
    "abstract_method_signature" => NodeKind::Member,
    "public_field_definition" => NodeKind::Member,
    "property_signature" => NodeKind::Member,
    "interface_declaration" => NodeKind::Interface,
    "type_alias_declaration" => NodeKind::TypeAlias,
    "enum_declaration" => NodeKind::Enum,
    "lexical_declaration" => NodeKind::Variables,
    "variable_declaration" => NodeKind::Variables,
    "internal_module" => NodeKind::Namespace,
    "module" => NodeKind::Namespace,
    "identifier" => NodeKind::Identifier,
    "shorthand_property_identifier" => NodeKind::Identifier,
    "type_identifier" => NodeKind::TypeIdentifier,
    "member_expression" => NodeKind::MemberAccess,
    "nested_type_identifier" => NodeKind::NestedTypeIdentifier,
    "jsx_closing_element" => NodeKind::JsxClosing,
};

impl NodeKind {
    pub fn of(node: Node<'_>) -> Option<NodeKind> {
        NODE_KINDS.get(node.kind()).copied()
    }
}

/// What the walk does after an extractor ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Walk the node's children generically.
    Descend,
    /// The extractor took care of the children.
    Handled,
}

pub type Handler = for<'p> fn(Node<'p>, &mut Visit<'p>) -> Result<Flow, TraversalError>;

pub struct ExtractorEntry {
    pub name: &'static str,
    pub kinds: &'static [NodeKind],
    pub handler: Handler,
}

/// Registered extractors. The first entry claiming a kind handles it.
pub static EXTRACTORS: &[ExtractorEntry] = &[
    ExtractorEntry {
        name: "imports",
        kinds: &[NodeKind::Import],
        handler: imports::extract,
    },
    ExtractorEntry {
        name: "exports",
        kinds: &[NodeKind::Export],
        handler: exports::extract,
    },
    ExtractorEntry {
        name: "functions",
        kinds: &[NodeKind::Function],
        handler: functions::extract,
    },
    ExtractorEntry {
        name: "classes",
        kinds: &[NodeKind::Class],
        handler: classes::extract,
    },
    ExtractorEntry {
        name: "members",
        kinds: &[NodeKind::Member],
        handler: classes::enter_member,
    },
    ExtractorEntry {
        name: "interfaces",
        kinds: &[NodeKind::Interface],
        handler: types::extract_interface,
    },
    ExtractorEntry {
        name: "type-aliases",
        kinds: &[NodeKind::TypeAlias],
        handler: types::extract_type_alias,
    },
    ExtractorEntry {
        name: "enums",
        kinds: &[NodeKind::Enum],
        handler: types::extract_enum,
    },
    ExtractorEntry {
        name: "variables",
        kinds: &[NodeKind::Variables],
        handler: variables::extract,
    },
    ExtractorEntry {
        name: "namespaces",
        kinds: &[NodeKind::Namespace],
        handler: references::enter_namespace,
    },
    ExtractorEntry {
        name: "references",
        kinds: &[
            NodeKind::Identifier,
            NodeKind::TypeIdentifier,
            NodeKind::MemberAccess,
            NodeKind::NestedTypeIdentifier,
            NodeKind::JsxClosing,
        ],
        handler: references::extract,
    },
];
