use serde_json::Value;

use super::{Caster, Codec, Context, Validation};
use crate::value::Decoded;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scalar { String, Number, Boolean, Null }

impl Codec for Scalar {
    fn name(&self) -> &str {
        match self {
            Scalar::String => "string",
            Scalar::Number => "number",
            Scalar::Boolean => "boolean",
            Scalar::Null => "null",
        }
    }

    fn validate(&self, input: &Value, ctx: &Context<'_>) -> Validation {
        match (self, input) {
            (Scalar::String, Value::String(s)) => Ok(Decoded::String(s.clone())),
            (Scalar::Number, Value::Number(n)) => Ok(Decoded::Number(n.clone())),
            (Scalar::Boolean, Value::Bool(b)) => Ok(Decoded::Bool(*b)),
            (Scalar::Null, Value::Null) => Ok(Decoded::Null),
            _ => Err(ctx.failure(self.name(), Some(input))),
        }
    }

    fn encode(&self, value: &Decoded) -> Value {
        value.to_value()
    }

    fn is(&self, value: &Decoded) -> bool {
        matches!(
            (self, value),
            (Scalar::String, Decoded::String(_))
                | (Scalar::Number, Decoded::Number(_))
                | (Scalar::Boolean, Decoded::Bool(_))
                | (Scalar::Null, Decoded::Null)
        )
    }
}

pub fn string() -> Caster { Caster::new(Scalar::String) }
pub fn number() -> Caster { Caster::new(Scalar::Number) }
pub fn boolean() -> Caster { Caster::new(Scalar::Boolean) }
pub fn null() -> Caster { Caster::new(Scalar::Null) }
