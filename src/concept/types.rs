//! Structured type descriptions.
//!
//! References to other declarations are stored by FQN, never by handle, so
//! self-referential generics (`T extends Node<T>`) stay finite trees.

use serde::{Deserialize, Serialize};

use super::declarations::Parameter;
use super::Fqn;

/// A member of an inline object type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectMember {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeDesc,
    pub optional: bool,
    pub readonly: bool,
}

/// Type description as computed by the semantic model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TypeDesc {
    Primitive {
        name: String,
    },
    Declared {
        fqn: Fqn,
        #[serde(rename = "typeArguments", default)]
        type_arguments: Vec<TypeDesc>,
    },
    Union {
        types: Vec<TypeDesc>,
    },
    Intersection {
        types: Vec<TypeDesc>,
    },
    TypeParameter {
        name: String,
    },
    Object {
        members: Vec<ObjectMember>,
    },
    Function {
        parameters: Vec<Parameter>,
        #[serde(rename = "returnType")]
        return_type: Box<TypeDesc>,
    },
    Literal {
        value: String,
    },
    Tuple {
        types: Vec<TypeDesc>,
    },
    NotIdentified {
        identifier: String,
    },
}

impl TypeDesc {
    pub fn primitive(name: &str) -> Self {
        TypeDesc::Primitive {
            name: name.to_string(),
        }
    }

    pub fn declared(fqn: Fqn) -> Self {
        TypeDesc::Declared {
            fqn,
            type_arguments: Vec::new(),
        }
    }

    pub fn not_identified(identifier: &str) -> Self {
        TypeDesc::NotIdentified {
            identifier: identifier.to_string(),
        }
    }

    /// Whether this is a union that already admits `undefined`.
    pub fn admits_undefined(&self) -> bool {
        match self {
            TypeDesc::Primitive { name } => name == "undefined",
            TypeDesc::Union { types } => types.iter().any(TypeDesc::admits_undefined),
            _ => false,
        }
    }

    /// Visit every FQN embedded in this description.
    pub fn visit_fqns_mut(&mut self, visit: &mut dyn FnMut(&mut Fqn)) {
        match self {
            TypeDesc::Declared {
                fqn,
                type_arguments,
            } => {
                visit(fqn);
                for arg in type_arguments {
                    arg.visit_fqns_mut(visit);
                }
            }
            TypeDesc::Union { types }
            | TypeDesc::Intersection { types }
            | TypeDesc::Tuple { types } => {
                for ty in types {
                    ty.visit_fqns_mut(visit);
                }
            }
            TypeDesc::Object { members } => {
                for member in members {
                    member.ty.visit_fqns_mut(visit);
                }
            }
            TypeDesc::Function {
                parameters,
                return_type,
            } => {
                for parameter in parameters {
                    parameter.ty.visit_fqns_mut(visit);
                }
                return_type.visit_fqns_mut(visit);
            }
            TypeDesc::Primitive { .. }
            | TypeDesc::TypeParameter { .. }
            | TypeDesc::Literal { .. }
            | TypeDesc::NotIdentified { .. } => {}
        }
    }

    /// Collect every declared-type reference, in occurrence order.
    pub fn referenced_fqns(&self) -> Vec<Fqn> {
        let mut out = Vec::new();
        // visit_fqns_mut needs &mut; walk a scratch copy instead
        let mut scratch = self.clone();
        scratch.visit_fqns_mut(&mut |fqn| out.push(fqn.clone()));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_tags() {
        let ty = TypeDesc::Union {
            types: vec![
                TypeDesc::primitive("string"),
                TypeDesc::TypeParameter {
                    name: "T".to_string(),
                },
            ],
        };
        let json = serde_json::to_value(&ty).unwrap();
        assert_eq!(json["type"], "union");
        assert_eq!(json["types"][0]["type"], "primitive");
        assert_eq!(json["types"][1]["type"], "typeParameter");
    }

    #[test]
    fn test_referenced_fqns_nested() {
        let ty = TypeDesc::Declared {
            fqn: Fqn::from("Promise"),
            type_arguments: vec![TypeDesc::Object {
                members: vec![ObjectMember {
                    name: "x".to_string(),
                    ty: TypeDesc::declared(Fqn::module("./a.ts").child("B")),
                    optional: false,
                    readonly: false,
                }],
            }],
        };
        let refs = ty.referenced_fqns();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].as_str(), "Promise");
        assert_eq!(refs[1].as_str(), "\"./a.ts\".B");
    }

    #[test]
    fn test_admits_undefined() {
        let optional = TypeDesc::Union {
            types: vec![TypeDesc::primitive("string"), TypeDesc::primitive("undefined")],
        };
        assert!(optional.admits_undefined());
        assert!(!TypeDesc::primitive("string").admits_undefined());
    }
}
