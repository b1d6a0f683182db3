//! Declaration records: functions, classes, interfaces, aliases, enums,
//! variables and their owned sub-structures.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Fqn, TypeDesc, Value};

/// Source location of a declaration, 1-indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    pub file_name: String,
    pub start_line: usize,
    pub start_column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

impl Coordinates {
    pub fn from_node(file_name: &str, node: tree_sitter::Node) -> Self {
        let start = node.start_position();
        let end = node.end_position();
        Self {
            file_name: file_name.to_string(),
            start_line: start.row + 1, // tree-sitter is 0-indexed
            start_column: start.column + 1,
            end_line: end.row + 1,
            end_column: end.column + 1,
        }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file_name, self.start_line, self.start_column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

impl Visibility {
    pub fn parse(s: &str) -> Self {
        match s {
            "private" => Visibility::Private,
            "protected" => Visibility::Protected,
            _ => Visibility::Public,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub index: usize,
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeDesc,
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeParameterDecl {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<TypeDesc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDeclaration {
    pub fqn: Fqn,
    pub function_name: String,
    pub parameters: Vec<Parameter>,
    pub return_type: TypeDesc,
    pub type_parameters: Vec<TypeParameterDecl>,
    #[serde(rename = "async")]
    pub is_async: bool,
    pub coordinates: Coordinates,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDeclaration {
    pub fqn: Fqn,
    pub property_name: String,
    pub optional: bool,
    #[serde(rename = "type")]
    pub ty: TypeDesc,
    pub visibility: Visibility,
    pub readonly: bool,
    #[serde(rename = "static")]
    pub is_static: bool,
    #[serde(rename = "abstract")]
    pub is_abstract: bool,
    pub coordinates: Coordinates,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodDeclaration {
    pub fqn: Fqn,
    pub method_name: String,
    pub parameters: Vec<Parameter>,
    pub return_type: TypeDesc,
    pub type_parameters: Vec<TypeParameterDecl>,
    pub optional: bool,
    pub visibility: Visibility,
    #[serde(rename = "static")]
    pub is_static: bool,
    #[serde(rename = "abstract")]
    pub is_abstract: bool,
    #[serde(rename = "async")]
    pub is_async: bool,
    pub coordinates: Coordinates,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstructorDeclaration {
    pub fqn: Fqn,
    pub parameters: Vec<Parameter>,
    pub coordinates: Coordinates,
}

/// Getter or setter half of an accessor property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accessor {
    /// Return type of a getter, parameter type of a setter.
    #[serde(rename = "type")]
    pub ty: TypeDesc,
    pub visibility: Visibility,
    pub coordinates: Coordinates,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessorProperty {
    pub fqn: Fqn,
    pub accessor_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub getter: Option<Accessor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setter: Option<Accessor>,
    #[serde(rename = "static")]
    pub is_static: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassDeclaration {
    pub fqn: Fqn,
    pub class_name: String,
    #[serde(rename = "abstract")]
    pub is_abstract: bool,
    pub type_parameters: Vec<TypeParameterDecl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends_class: Option<TypeDesc>,
    pub implements_interfaces: Vec<TypeDesc>,
    pub constructors: Vec<ConstructorDeclaration>,
    pub properties: Vec<PropertyDeclaration>,
    pub methods: Vec<MethodDeclaration>,
    pub accessor_properties: Vec<AccessorProperty>,
    pub coordinates: Coordinates,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceDeclaration {
    pub fqn: Fqn,
    pub interface_name: String,
    pub type_parameters: Vec<TypeParameterDecl>,
    pub extends_interfaces: Vec<TypeDesc>,
    pub properties: Vec<PropertyDeclaration>,
    pub methods: Vec<MethodDeclaration>,
    pub coordinates: Coordinates,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeAliasDeclaration {
    pub fqn: Fqn,
    pub type_alias_name: String,
    pub type_parameters: Vec<TypeParameterDecl>,
    #[serde(rename = "type")]
    pub ty: TypeDesc,
    pub coordinates: Coordinates,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumMember {
    pub fqn: Fqn,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumDeclaration {
    pub fqn: Fqn,
    pub enum_name: String,
    pub members: Vec<EnumMember>,
    pub constant: bool,
    pub declared: bool,
    pub coordinates: Coordinates,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableKind {
    Var,
    Let,
    Const,
}

impl VariableKind {
    pub fn parse(keyword: &str) -> Self {
        match keyword {
            "let" => VariableKind::Let,
            "const" => VariableKind::Const,
            _ => VariableKind::Var,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableDeclaration {
    pub fqn: Fqn,
    pub variable_name: String,
    pub kind: VariableKind,
    #[serde(rename = "type")]
    pub ty: TypeDesc,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init_value: Option<Value>,
    pub coordinates: Coordinates,
}

fn visit_parameters(parameters: &mut [Parameter], visit: &mut dyn FnMut(&mut Fqn)) {
    for parameter in parameters {
        parameter.ty.visit_fqns_mut(visit);
    }
}

fn visit_type_parameters(type_parameters: &mut [TypeParameterDecl], visit: &mut dyn FnMut(&mut Fqn)) {
    for tp in type_parameters {
        if let Some(constraint) = tp.constraint.as_mut() {
            constraint.visit_fqns_mut(visit);
        }
    }
}

impl FunctionDeclaration {
    pub fn visit_fqns_mut(&mut self, visit: &mut dyn FnMut(&mut Fqn)) {
        visit(&mut self.fqn);
        visit_parameters(&mut self.parameters, visit);
        self.return_type.visit_fqns_mut(visit);
        visit_type_parameters(&mut self.type_parameters, visit);
    }
}

impl PropertyDeclaration {
    pub fn visit_fqns_mut(&mut self, visit: &mut dyn FnMut(&mut Fqn)) {
        visit(&mut self.fqn);
        self.ty.visit_fqns_mut(visit);
    }
}

impl MethodDeclaration {
    pub fn visit_fqns_mut(&mut self, visit: &mut dyn FnMut(&mut Fqn)) {
        visit(&mut self.fqn);
        visit_parameters(&mut self.parameters, visit);
        self.return_type.visit_fqns_mut(visit);
        visit_type_parameters(&mut self.type_parameters, visit);
    }
}

impl ClassDeclaration {
    pub fn visit_fqns_mut(&mut self, visit: &mut dyn FnMut(&mut Fqn)) {
        visit(&mut self.fqn);
        visit_type_parameters(&mut self.type_parameters, visit);
        if let Some(extends) = self.extends_class.as_mut() {
            extends.visit_fqns_mut(visit);
        }
        for ty in &mut self.implements_interfaces {
            ty.visit_fqns_mut(visit);
        }
        for ctor in &mut self.constructors {
            visit(&mut ctor.fqn);
            visit_parameters(&mut ctor.parameters, visit);
        }
        for property in &mut self.properties {
            property.visit_fqns_mut(visit);
        }
        for method in &mut self.methods {
            method.visit_fqns_mut(visit);
        }
        for accessor in &mut self.accessor_properties {
            visit(&mut accessor.fqn);
            for half in [accessor.getter.as_mut(), accessor.setter.as_mut()]
                .into_iter()
                .flatten()
            {
                half.ty.visit_fqns_mut(visit);
            }
        }
    }
}

impl InterfaceDeclaration {
    pub fn visit_fqns_mut(&mut self, visit: &mut dyn FnMut(&mut Fqn)) {
        visit(&mut self.fqn);
        visit_type_parameters(&mut self.type_parameters, visit);
        for ty in &mut self.extends_interfaces {
            ty.visit_fqns_mut(visit);
        }
        for property in &mut self.properties {
            property.visit_fqns_mut(visit);
        }
        for method in &mut self.methods {
            method.visit_fqns_mut(visit);
        }
    }
}

impl TypeAliasDeclaration {
    pub fn visit_fqns_mut(&mut self, visit: &mut dyn FnMut(&mut Fqn)) {
        visit(&mut self.fqn);
        visit_type_parameters(&mut self.type_parameters, visit);
        self.ty.visit_fqns_mut(visit);
    }
}

impl EnumDeclaration {
    pub fn visit_fqns_mut(&mut self, visit: &mut dyn FnMut(&mut Fqn)) {
        visit(&mut self.fqn);
        for member in &mut self.members {
            visit(&mut member.fqn);
            if let Some(init) = member.init.as_mut() {
                init.visit_fqns_mut(visit);
            }
        }
    }
}

impl VariableDeclaration {
    pub fn visit_fqns_mut(&mut self, visit: &mut dyn FnMut(&mut Fqn)) {
        visit(&mut self.fqn);
        self.ty.visit_fqns_mut(visit);
        if let Some(init) = self.init_value.as_mut() {
            init.visit_fqns_mut(visit);
        }
    }
}
