//! Wire format → `ir`.
//!
//! Schema documents are JSON emitted by the schema-extraction tool. A type is one of:
//!
//! ```text
//! "string" | "number" | "boolean" | "null" | null
//! { "referenceName": "User" }
//! { "arrayElementType": <type> }
//! { "selfType": "Array", "typeArgumentType": <type> }
//! { "genericParameterName": "Array", "genericParameterType": <type> }
//! { "unionMembers": [<type>, ...] }
//! { "props": [<property>, ...] }
//! ```
//!
//! Deserialization accepts any JSON in type position; anything outside the list above is
//! rejected during lowering as `IllegalType`, with the property path it was found at.

use serde::Deserialize;
use serde_json::Value;

use crate::error::SetupError;
use crate::ir::{Prim, Property, Schema, Ty, ATTRS_KEYWORD};

const LITERAL_CONTEXT: &str = "<literal>";

#[derive(Debug, Clone, Deserialize)]
pub struct RawSchema {
    pub name: String,
    #[serde(alias = "properties")]
    pub props: Vec<RawProperty>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawProperty {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: RawType,
    #[serde(default)]
    pub optional: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawType {
    Reference {
        #[serde(rename = "referenceName")]
        name: String,
    },
    Array {
        #[serde(rename = "arrayElementType")]
        element: Box<RawType>,
    },
    Parameterized {
        #[serde(rename = "selfType")]
        self_type: String,
        #[serde(rename = "typeArgumentType")]
        type_argument: Box<RawType>,
    },
    Generic {
        #[serde(rename = "genericParameterName")]
        parameter_name: String,
        #[serde(rename = "genericParameterType")]
        parameter_type: Box<RawType>,
    },
    Union {
        #[serde(rename = "unionMembers")]
        members: Vec<RawType>,
    },
    Literal {
        #[serde(alias = "properties")]
        props: Vec<RawProperty>,
    },
    Keyword(String),
    Null,
    Other(Value),
}

pub fn lower_schema(raw: &RawSchema) -> Result<Schema, SetupError> {
    Ok(Schema::new(raw.name.clone(), lower_props(&raw.props, &raw.name)?))
}

pub fn lower_schemas<'a>(raws: impl IntoIterator<Item = &'a RawSchema>) -> Result<Vec<Schema>, SetupError> {
    raws.into_iter().map(lower_schema).collect()
}

fn lower_props(props: &[RawProperty], context: &str) -> Result<Vec<Property>, SetupError> {
    props.iter()
        .map(|p| {
            let ty = match lower_type(&p.ty) {
                Ok(ty) => ty,
                // attrs is never compiled, so its declared type is not checked either
                Err(_) if p.name == ATTRS_KEYWORD => Ty::Literal(Vec::new()),
                Err(e) => return Err(e.in_property(context, &p.name)),
            };
            Ok(Property { name: p.name.clone(), ty, optional: p.optional })
        })
        .collect()
}

pub fn lower_type(raw: &RawType) -> Result<Ty, SetupError> {
    Ok(match raw {
        RawType::Null => Ty::null(),
        RawType::Keyword(k) => match Prim::ALL.into_iter().find(|p| p.keyword() == k.as_str()) {
            Some(prim) => Ty::Primitive(prim),
            None => return Err(illegal(&Value::String(k.clone()))),
        },
        RawType::Reference { name } => Ty::reference(name.clone()),
        RawType::Array { element } => Ty::array(lower_type(element)?),
        RawType::Parameterized { self_type, type_argument } => {
            Ty::parameterized(self_type.clone(), lower_type(type_argument)?)
        }
        RawType::Generic { parameter_name, parameter_type } => Ty::Generic {
            parameter_name: parameter_name.clone(),
            parameter_type: Box::new(lower_type(parameter_type)?),
        },
        RawType::Union { members } => Ty::Union(
            members.iter().map(lower_type).collect::<Result<_, _>>()?,
        ),
        RawType::Literal { props } => Ty::Literal(lower_props(props, LITERAL_CONTEXT)?),
        RawType::Other(v) => return Err(illegal(v)),
    })
}

fn illegal(found: &Value) -> SetupError {
    SetupError::IllegalType { found: found.to_string() }
}

impl Prim {
    const ALL: [Prim; 4] = [Prim::String, Prim::Number, Prim::Boolean, Prim::Null];

    /// Wire keyword of the primitive.
    pub fn keyword(self) -> &'static str {
        match self {
            Prim::String => "string",
            Prim::Number => "number",
            Prim::Boolean => "boolean",
            Prim::Null => "null",
        }
    }
}
