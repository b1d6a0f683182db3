//! Initializer values of variables and enum members.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Fqn, TypeDesc};

/// A literal scalar.
///
/// Big integers do not fit any JSON number and are carried as decimal
/// strings; the accompanying `TypeDesc` (`bigint`) tells them apart from
/// string literals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LiteralValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

/// A statically described value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Value {
    Null {
        undefined: bool,
    },
    Literal {
        value: LiteralValue,
        #[serde(rename = "type")]
        ty: TypeDesc,
    },
    Declared {
        fqn: Fqn,
    },
    Member {
        parent: Box<Value>,
        member: String,
    },
    Object {
        members: BTreeMap<String, Value>,
    },
    Array {
        items: Vec<Value>,
    },
    Call {
        callee: Box<Value>,
        args: Vec<Value>,
    },
    Function {},
    Class {},
    Complex {
        expression: String,
    },
}

impl Value {
    pub fn complex(expression: &str) -> Self {
        Value::Complex {
            expression: expression.to_string(),
        }
    }

    pub fn visit_fqns_mut(&mut self, visit: &mut dyn FnMut(&mut Fqn)) {
        match self {
            Value::Declared { fqn } => visit(fqn),
            Value::Literal { ty, .. } => ty.visit_fqns_mut(visit),
            Value::Member { parent, .. } => parent.visit_fqns_mut(visit),
            Value::Object { members } => {
                for value in members.values_mut() {
                    value.visit_fqns_mut(visit);
                }
            }
            Value::Array { items } => {
                for item in items {
                    item.visit_fqns_mut(visit);
                }
            }
            Value::Call { callee, args } => {
                callee.visit_fqns_mut(visit);
                for arg in args {
                    arg.visit_fqns_mut(visit);
                }
            }
            Value::Null { .. } | Value::Function {} | Value::Class {} | Value::Complex { .. } => {}
        }
    }
}
