//! Type and value descriptions computed from syntax plus name resolution.
//!
//! These are the semantic computations every [`SemanticQuery`] gets for
//! free once it can resolve names. Types come from annotations; where an
//! annotation is missing, a small amount of inference covers literals and
//! obvious operators, and everything else is reported as not identified.

use std::collections::BTreeMap;

use phf::phf_set;
use tree_sitter::Node;

use super::{Resolution, SemanticQuery};
use crate::concept::{
    Fqn, LiteralValue, ObjectMember, Parameter, TypeDesc, TypeParameterDecl, Value,
};

/// Type names that denote primitives even where the grammar parses them
/// as plain type identifiers.
static PRIMITIVE_TYPE_NAMES: phf::Set<&'static str> = phf_set! {
    "any", "bigint", "boolean", "never", "null", "number", "object",
    "string", "symbol", "undefined", "unknown", "void",
};

/// Nodes whose `return` statements belong to themselves.
const FUNCTION_BOUNDARIES: [&str; 10] = [
    "function_declaration",
    "generator_function_declaration",
    "function_expression",
    "function",
    "generator_function",
    "arrow_function",
    "method_definition",
    "class",
    "class_declaration",
    "abstract_class_declaration",
];

/// Whether `node` has an anonymous child token `token` (`async`, `?`, ...).
pub fn has_token(node: Node<'_>, token: &str) -> bool {
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .any(|child| !child.is_named() && child.kind() == token);
    found
}

fn promise_of(inner: TypeDesc) -> TypeDesc {
    TypeDesc::Declared {
        fqn: Fqn::unresolved("Promise"),
        type_arguments: vec![inner],
    }
}

/// `ty | undefined`, unless `ty` already admits `undefined`.
pub fn with_undefined(ty: TypeDesc) -> TypeDesc {
    if ty.admits_undefined() {
        return ty;
    }
    match ty {
        TypeDesc::Union { mut types } => {
            types.push(TypeDesc::primitive("undefined"));
            TypeDesc::Union { types }
        }
        other => TypeDesc::Union {
            types: vec![other, TypeDesc::primitive("undefined")],
        },
    }
}

pub fn type_desc<S: SemanticQuery + ?Sized>(sem: &S, node: Node<'_>) -> TypeDesc {
    let text = sem.text(node);
    match node.kind() {
        "type_annotation"
        | "opting_type_annotation"
        | "omitting_type_annotation"
        | "adding_type_annotation"
        | "parenthesized_type"
        | "readonly_type" => node
            .named_child(0)
            .map(|inner| type_desc(sem, inner))
            .unwrap_or_else(|| TypeDesc::not_identified(text)),
        "predefined_type" => TypeDesc::primitive(text),
        "type_identifier" => named_type(sem, node),
        "nested_type_identifier" => {
            let member = node
                .child_by_field_name("name")
                .map(|n| sem.text(n))
                .unwrap_or_default();
            let fqn = node
                .child_by_field_name("module")
                .and_then(|module| sem.resolve_member(module, member))
                .unwrap_or_else(|| Fqn::unresolved(text));
            TypeDesc::declared(fqn)
        }
        "generic_type" => {
            let base = node
                .child_by_field_name("name")
                .map(|name| type_desc(sem, name))
                .unwrap_or_else(|| TypeDesc::not_identified(text));
            match base {
                TypeDesc::Declared { fqn, .. } => TypeDesc::Declared {
                    fqn,
                    type_arguments: node
                        .child_by_field_name("type_arguments")
                        .map(|args| named_types(sem, args))
                        .unwrap_or_default(),
                },
                other => other,
            }
        }
        "union_type" => {
            let mut types = Vec::new();
            flatten(sem, node, "union_type", &mut types);
            TypeDesc::Union { types }
        }
        "intersection_type" => {
            let mut types = Vec::new();
            flatten(sem, node, "intersection_type", &mut types);
            TypeDesc::Intersection { types }
        }
        "array_type" => TypeDesc::Declared {
            fqn: Fqn::unresolved("Array"),
            type_arguments: node
                .named_child(0)
                .map(|element| vec![type_desc(sem, element)])
                .unwrap_or_default(),
        },
        "tuple_type" => TypeDesc::Tuple {
            types: named_types(sem, node),
        },
        "object_type" => TypeDesc::Object {
            members: object_members(sem, node),
        },
        "function_type" => TypeDesc::Function {
            parameters: node
                .child_by_field_name("parameters")
                .map(|p| parameters(sem, p))
                .unwrap_or_default(),
            return_type: Box::new(
                node.child_by_field_name("return_type")
                    .map(|r| type_desc(sem, r))
                    .unwrap_or_else(|| TypeDesc::primitive("void")),
            ),
        },
        "literal_type" => match node.named_child(0).map(|n| n.kind()) {
            Some("null") => TypeDesc::primitive("null"),
            Some("undefined") => TypeDesc::primitive("undefined"),
            _ => TypeDesc::Literal {
                value: text.to_string(),
            },
        },
        _ => TypeDesc::not_identified(text),
    }
}

fn named_type<S: SemanticQuery + ?Sized>(sem: &S, node: Node<'_>) -> TypeDesc {
    let name = sem.text(node);
    if PRIMITIVE_TYPE_NAMES.contains(name) {
        return TypeDesc::primitive(name);
    }
    match sem.resolve_type(node) {
        Resolution::Declaration(fqn) | Resolution::Unresolved(fqn) => TypeDesc::declared(fqn),
        Resolution::TypeParameter(name) => TypeDesc::TypeParameter { name },
        Resolution::Local => TypeDesc::not_identified(name),
    }
}

fn named_types<S: SemanticQuery + ?Sized>(sem: &S, node: Node<'_>) -> Vec<TypeDesc> {
    let mut cursor = node.walk();
    let types = node
        .named_children(&mut cursor)
        .map(|child| type_desc(sem, child))
        .collect();
    types
}

fn flatten<S: SemanticQuery + ?Sized>(sem: &S, node: Node<'_>, kind: &str, out: &mut Vec<TypeDesc>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == kind {
            flatten(sem, child, kind, out);
        } else {
            out.push(type_desc(sem, child));
        }
    }
}

fn object_members<S: SemanticQuery + ?Sized>(sem: &S, node: Node<'_>) -> Vec<ObjectMember> {
    let mut members = Vec::new();
    let mut cursor = node.walk();
    for member in node.named_children(&mut cursor) {
        let Some(name) = member.child_by_field_name("name").map(|n| sem.text(n).to_string()) else {
            continue;
        };
        let ty = match member.kind() {
            "property_signature" => member
                .child_by_field_name("type")
                .map(|t| type_desc(sem, t))
                .unwrap_or_else(|| TypeDesc::primitive("any")),
            "method_signature" => TypeDesc::Function {
                parameters: member
                    .child_by_field_name("parameters")
                    .map(|p| parameters(sem, p))
                    .unwrap_or_default(),
                return_type: Box::new(return_type(sem, member)),
            },
            _ => continue,
        };
        members.push(ObjectMember {
            name,
            ty,
            optional: has_token(member, "?"),
            readonly: has_token(member, "readonly"),
        });
    }
    members
}

/// Parameters of a `formal_parameters` node. A `this` parameter is not a
/// real parameter and is skipped.
pub fn parameters<S: SemanticQuery + ?Sized>(sem: &S, formal: Node<'_>) -> Vec<Parameter> {
    let mut out = Vec::new();
    let mut cursor = formal.walk();
    for parameter in formal.named_children(&mut cursor) {
        let optional = match parameter.kind() {
            "required_parameter" => false,
            "optional_parameter" => true,
            _ => continue,
        };
        let Some(pattern) = parameter.child_by_field_name("pattern") else {
            continue;
        };
        if pattern.kind() == "this" {
            continue;
        }

        let mut ty = match (
            parameter.child_by_field_name("type"),
            parameter.child_by_field_name("value"),
        ) {
            (Some(annotation), _) => type_desc(sem, annotation),
            (None, Some(default)) => expression_type(sem, default),
            (None, None) => TypeDesc::primitive("any"),
        };
        if optional {
            ty = with_undefined(ty);
        }

        out.push(Parameter {
            index: out.len(),
            name: sem.text(pattern).trim_start_matches("...").to_string(),
            ty,
            optional,
        });
    }
    out
}

pub fn type_parameters<S: SemanticQuery + ?Sized>(sem: &S, declaration: Node<'_>) -> Vec<TypeParameterDecl> {
    let Some(list) = declaration.child_by_field_name("type_parameters") else {
        return Vec::new();
    };
    let mut out = Vec::new();
    let mut cursor = list.walk();
    for parameter in list.named_children(&mut cursor) {
        let Some(name) = parameter.child_by_field_name("name") else {
            continue;
        };
        let constraint = parameter
            .child_by_field_name("constraint")
            .and_then(|c| c.named_child(0))
            .map(|ty| type_desc(sem, ty));
        out.push(TypeParameterDecl {
            name: sem.text(name).to_string(),
            constraint,
        });
    }
    out
}

/// Declared return type, or an inferred one for unannotated bodies.
///
/// Inference: no value-returning `return` gives `void`; returned
/// expressions that all share one primitive type give that type; anything
/// else is not identified. Async functions wrap the result in `Promise`.
pub fn return_type<S: SemanticQuery + ?Sized>(sem: &S, function: Node<'_>) -> TypeDesc {
    if let Some(annotation) = function.child_by_field_name("return_type") {
        return match annotation.kind() {
            "type_predicate_annotation" => TypeDesc::primitive("boolean"),
            "asserts_annotation" => TypeDesc::primitive("void"),
            _ => type_desc(sem, annotation),
        };
    }
    let Some(body) = function.child_by_field_name("body") else {
        return TypeDesc::primitive("any");
    };

    let inferred = if body.kind() == "statement_block" {
        let mut returns = Vec::new();
        collect_returns(body, &mut returns);
        let values: Vec<Node<'_>> = returns.iter().filter_map(|r| r.named_child(0)).collect();
        if values.is_empty() {
            TypeDesc::primitive("void")
        } else {
            common_primitive(sem, &values)
        }
    } else {
        common_primitive(sem, &[body])
    };

    if has_token(function, "async") {
        promise_of(inferred)
    } else {
        inferred
    }
}

fn collect_returns<'t>(node: Node<'t>, out: &mut Vec<Node<'t>>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "return_statement" {
            out.push(child);
        } else if !FUNCTION_BOUNDARIES.contains(&child.kind()) {
            collect_returns(child, out);
        }
    }
}

fn common_primitive<S: SemanticQuery + ?Sized>(sem: &S, values: &[Node<'_>]) -> TypeDesc {
    let mut types = values.iter().map(|v| expression_type(sem, *v));
    let Some(first) = types.next() else {
        return TypeDesc::primitive("void");
    };
    let uniform = matches!(first, TypeDesc::Primitive { .. }) && types.all(|t| t == first);
    if uniform {
        first
    } else {
        TypeDesc::not_identified(sem.text(values[0]))
    }
}

/// Type of an expression, as far as it follows from the expression alone.
pub fn expression_type<S: SemanticQuery + ?Sized>(sem: &S, expr: Node<'_>) -> TypeDesc {
    let text = sem.text(expr);
    match expr.kind() {
        "number" if text.ends_with('n') => TypeDesc::primitive("bigint"),
        "number" => TypeDesc::primitive("number"),
        "string" | "template_string" => TypeDesc::primitive("string"),
        "true" | "false" => TypeDesc::primitive("boolean"),
        "null" => TypeDesc::primitive("null"),
        "undefined" => TypeDesc::primitive("undefined"),
        "regex" => TypeDesc::declared(Fqn::unresolved("RegExp")),
        "parenthesized_expression" | "non_null_expression" => expr
            .named_child(0)
            .map(|inner| expression_type(sem, inner))
            .unwrap_or_else(|| TypeDesc::not_identified(text)),
        "as_expression" | "satisfies_expression" => expr
            .named_child(1)
            .map(|ty| type_desc(sem, ty))
            .unwrap_or_else(|| TypeDesc::not_identified(text)),
        "unary_expression" => {
            let operator = expr.child_by_field_name("operator").map(|o| o.kind());
            match operator {
                Some("!") | Some("delete") => TypeDesc::primitive("boolean"),
                Some("typeof") => TypeDesc::primitive("string"),
                Some("void") => TypeDesc::primitive("undefined"),
                Some("-") | Some("+") | Some("~") => {
                    let operand = expr
                        .child_by_field_name("argument")
                        .map(|a| expression_type(sem, a));
                    match operand {
                        Some(TypeDesc::Primitive { name }) if name == "bigint" => TypeDesc::primitive("bigint"),
                        _ => TypeDesc::primitive("number"),
                    }
                }
                _ => TypeDesc::not_identified(text),
            }
        }
        "binary_expression" => binary_type(sem, expr),
        "new_expression" => expr
            .child_by_field_name("constructor")
            .filter(|c| c.kind() == "identifier")
            .and_then(|c| sem.resolve_value(c).target())
            .map(TypeDesc::declared)
            .unwrap_or_else(|| TypeDesc::not_identified(text)),
        "arrow_function" | "function_expression" | "function" => TypeDesc::Function {
            parameters: expr
                .child_by_field_name("parameters")
                .map(|p| parameters(sem, p))
                .unwrap_or_default(),
            return_type: Box::new(return_type(sem, expr)),
        },
        _ => TypeDesc::not_identified(text),
    }
}

fn binary_type<S: SemanticQuery + ?Sized>(sem: &S, expr: Node<'_>) -> TypeDesc {
    let text = sem.text(expr);
    let Some(operator) = expr.child_by_field_name("operator").map(|o| o.kind()) else {
        return TypeDesc::not_identified(text);
    };
    let side = |field: &str| {
        expr.child_by_field_name(field)
            .map(|n| expression_type(sem, n))
            .unwrap_or_else(|| TypeDesc::not_identified(""))
    };
    let is = |ty: &TypeDesc, primitive: &str| matches!(ty, TypeDesc::Primitive { name } if name == primitive);

    match operator {
        "==" | "===" | "!=" | "!==" | "<" | "<=" | ">" | ">=" | "instanceof" | "in" => {
            TypeDesc::primitive("boolean")
        }
        "+" => {
            let (left, right) = (side("left"), side("right"));
            if is(&left, "string") || is(&right, "string") {
                TypeDesc::primitive("string")
            } else if is(&left, "number") && is(&right, "number") {
                TypeDesc::primitive("number")
            } else {
                TypeDesc::not_identified(text)
            }
        }
        "-" | "*" | "/" | "%" | "**" | "<<" | ">>" | ">>>" | "&" | "|" | "^" => {
            let (left, right) = (side("left"), side("right"));
            if is(&left, "bigint") && is(&right, "bigint") {
                TypeDesc::primitive("bigint")
            } else {
                TypeDesc::primitive("number")
            }
        }
        _ => TypeDesc::not_identified(text),
    }
}

/// Static description of an initializer expression.
pub fn value_of<S: SemanticQuery + ?Sized>(sem: &S, expr: Node<'_>) -> Value {
    let text = sem.text(expr);
    match expr.kind() {
        "number" => number_value(text),
        "string" => Value::Literal {
            value: LiteralValue::Text(super::semantic::string_content(text).to_string()),
            ty: TypeDesc::primitive("string"),
        },
        "template_string" => {
            let mut cursor = expr.walk();
            let substituted = expr
                .named_children(&mut cursor)
                .any(|c| c.kind() == "template_substitution");
            if substituted {
                Value::complex(text)
            } else {
                Value::Literal {
                    value: LiteralValue::Text(super::semantic::string_content(text).to_string()),
                    ty: TypeDesc::primitive("string"),
                }
            }
        }
        "true" | "false" => Value::Literal {
            value: LiteralValue::Bool(expr.kind() == "true"),
            ty: TypeDesc::primitive("boolean"),
        },
        "null" => Value::Null { undefined: false },
        "undefined" => Value::Null { undefined: true },
        "identifier" | "shorthand_property_identifier" => match sem.resolve_value(expr).target() {
            Some(fqn) => Value::Declared { fqn },
            None => Value::complex(text),
        },
        "member_expression" => {
            let object = expr.child_by_field_name("object");
            let property = expr
                .child_by_field_name("property")
                .map(|p| sem.text(p).to_string())
                .unwrap_or_default();
            if let Some(fqn) = object.and_then(|o| sem.resolve_member(o, &property)) {
                return Value::Declared { fqn };
            }
            match object {
                Some(object) => Value::Member {
                    parent: Box::new(value_of(sem, object)),
                    member: property,
                },
                None => Value::complex(text),
            }
        }
        "call_expression" => {
            let Some(callee) = expr.child_by_field_name("function") else {
                return Value::complex(text);
            };
            let args = expr
                .child_by_field_name("arguments")
                .map(|args| {
                    let mut cursor = args.walk();
                    let values: Vec<Value> = args
                        .named_children(&mut cursor)
                        .map(|arg| value_of(sem, arg))
                        .collect();
                    values
                })
                .unwrap_or_default();
            Value::Call {
                callee: Box::new(value_of(sem, callee)),
                args,
            }
        }
        "object" => {
            let mut members = BTreeMap::new();
            let mut cursor = expr.walk();
            for member in expr.named_children(&mut cursor) {
                match member.kind() {
                    "pair" => {
                        let key = member.child_by_field_name("key");
                        let value = member.child_by_field_name("value");
                        if let (Some(key), Some(value)) = (key, value) {
                            let key = match key.kind() {
                                "string" => super::semantic::string_content(sem.text(key)).to_string(),
                                _ => sem.text(key).to_string(),
                            };
                            members.insert(key, value_of(sem, value));
                        }
                    }
                    "shorthand_property_identifier" => {
                        members.insert(sem.text(member).to_string(), value_of(sem, member));
                    }
                    "method_definition" => {
                        if let Some(name) = member.child_by_field_name("name") {
                            members.insert(sem.text(name).to_string(), Value::Function {});
                        }
                    }
                    _ => {}
                }
            }
            Value::Object { members }
        }
        "array" => {
            let mut cursor = expr.walk();
            let items = expr
                .named_children(&mut cursor)
                .map(|item| value_of(sem, item))
                .collect();
            Value::Array { items }
        }
        "arrow_function" | "function_expression" | "function" | "generator_function" => Value::Function {},
        "class" => Value::Class {},
        "parenthesized_expression" | "as_expression" | "satisfies_expression" | "non_null_expression" => expr
            .named_child(0)
            .map(|inner| value_of(sem, inner))
            .unwrap_or_else(|| Value::complex(text)),
        "unary_expression" => {
            let operator = expr.child_by_field_name("operator").map(|o| o.kind());
            let argument = expr.child_by_field_name("argument");
            match (operator, argument.map(|a| value_of(sem, a))) {
                (
                    Some("-"),
                    Some(Value::Literal {
                        value: LiteralValue::Number(n),
                        ty,
                    }),
                ) => Value::Literal {
                    value: LiteralValue::Number(-n),
                    ty,
                },
                (
                    Some("-"),
                    Some(Value::Literal {
                        value: LiteralValue::Text(digits),
                        ty,
                    }),
                ) if matches!(&ty, TypeDesc::Primitive { name } if name == "bigint") => Value::Literal {
                    value: LiteralValue::Text(format!("-{}", digits)),
                    ty,
                },
                _ => Value::complex(text),
            }
        }
        _ => Value::complex(text),
    }
}

/// Numeric literal. Big integers become decimal strings; numbers that do
/// not fit a finite double keep their source text.
fn number_value(text: &str) -> Value {
    let cleaned = text.replace('_', "");
    if let Some(digits) = cleaned.strip_suffix('n') {
        let decimal = radix_integer(digits)
            .map(|v| v.to_string())
            .unwrap_or_else(|| digits.to_string());
        return Value::Literal {
            value: LiteralValue::Text(decimal),
            ty: TypeDesc::primitive("bigint"),
        };
    }

    let parsed = radix_integer(&cleaned)
        .map(|v| v as f64)
        .or_else(|| cleaned.parse::<f64>().ok())
        .filter(|v| v.is_finite());
    Value::Literal {
        value: match parsed {
            Some(v) => LiteralValue::Number(v),
            None => LiteralValue::Text(text.to_string()),
        },
        ty: TypeDesc::primitive("number"),
    }
}

/// Integers written with a `0x` / `0o` / `0b` prefix.
fn radix_integer(text: &str) -> Option<u128> {
    let lower = text.to_ascii_lowercase();
    let (digits, radix) = if let Some(d) = lower.strip_prefix("0x") {
        (d.to_string(), 16)
    } else if let Some(d) = lower.strip_prefix("0o") {
        (d.to_string(), 8)
    } else if let Some(d) = lower.strip_prefix("0b") {
        (d.to_string(), 2)
    } else if !lower.is_empty() && lower.chars().all(|c| c.is_ascii_digit()) {
        (lower.clone(), 10)
    } else {
        return None;
    };
    u128::from_str_radix(&digits, radix).ok()
}
