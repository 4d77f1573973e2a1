//! Caster compiler: `ir` property lists → composed casters.
//!
//! References are resolved against the registry *at compile time*, so a compiled caster holds
//! direct handles to the casters it depends on and never consults the registry while decoding.
//! That is also why recursive schemas cannot be expressed: the caster of a type that is still
//! being compiled does not exist yet.

use serde_json::Value;

use crate::caster::{self, Caster, Codec, Context, Validation};
use crate::error::SetupError;
use crate::ir::{Prim, Property, Schema, Ty, ATTRS_KEYWORD};
use crate::registry::Registry;
use crate::value::Decoded;

/// Context name used in errors raised inside anonymous inline objects.
const LITERAL_CONTEXT: &str = "<literal>";

pub(crate) struct Compiled {
    pub caster: Caster,
    pub synthesizes_attrs: bool,
}

pub(crate) struct Compiler<'r> {
    registry: &'r Registry,
}

impl<'r> Compiler<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    pub fn compile_schema(&self, schema: &Schema) -> Result<Compiled, SetupError> {
        self.compile_object(&schema.properties, Some(&schema.name))
    }

    /// Required keys → `object`, optional keys → `partial`, both → their intersection.
    pub fn compile_object(&self, properties: &[Property], name: Option<&str>) -> Result<Compiled, SetupError> {
        let context = name.unwrap_or(LITERAL_CONTEXT);
        let synthesizes_attrs = properties.iter().any(Property::is_attrs);
        let (optional, required): (Vec<&Property>, Vec<&Property>) = properties.iter()
            .filter(|p| !p.is_attrs())
            .partition(|p| p.optional);

        let caster = match (required.is_empty(), optional.is_empty()) {
            (false, false) => caster::intersection(
                name,
                caster::object(name, self.compile_props(&required, context)?),
                caster::partial(name, self.compile_props(&optional, context)?),
            ),
            (false, true) => caster::object(name, self.compile_props(&required, context)?),
            (true, false) => caster::partial(name, self.compile_props(&optional, context)?),
            (true, true) => return Err(SetupError::EmptySchema { name: context.to_string() }),
        };

        let caster = if synthesizes_attrs { Caster::new(WithAttrs { inner: caster }) } else { caster };
        Ok(Compiled { caster, synthesizes_attrs })
    }

    fn compile_props(&self, props: &[&Property], context: &str) -> Result<Vec<(String, Caster)>, SetupError> {
        props.iter()
            .map(|p| {
                self.compile_type(&p.ty)
                    .map(|c| (p.name.clone(), c))
                    .map_err(|e| e.in_property(context, &p.name))
            })
            .collect()
    }

    pub fn compile_type(&self, ty: &Ty) -> Result<Caster, SetupError> {
        match ty {
            Ty::Primitive(prim) => Ok(match prim {
                Prim::String => caster::string(),
                Prim::Number => caster::number(),
                Prim::Boolean => caster::boolean(),
                Prim::Null => caster::null(),
            }),
            Ty::Reference(name) => self.registry.resolve(name),
            Ty::Array(element) => Ok(caster::array(self.compile_type(element)?)),
            Ty::Literal(props) => Ok(self.compile_object(props, None)?.caster),
            Ty::Union(members) => {
                if members.is_empty() {
                    return Err(SetupError::IllegalType { found: "empty union".to_string() });
                }
                let members = members.iter()
                    .map(|m| self.compile_type(m))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(caster::union(members))
            }
            Ty::Generic { parameter_name: tag, parameter_type: arg }
            | Ty::Parameterized { self_type: tag, type_argument: arg } => {
                let factory = self.registry.factory(tag)?;
                Ok(factory(self.compile_type(arg)?))
            }
        }
    }
}

// -------------------------------- Attrs ----------------------------------- //

/// Injects `attrs: {}` after decoding; strips it again on encode.
struct WithAttrs {
    inner: Caster,
}

impl Codec for WithAttrs {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn validate(&self, input: &Value, ctx: &Context<'_>) -> Validation {
        let mut decoded = self.inner.validate(input, ctx)?;
        if let Decoded::Object(m) = &mut decoded {
            m.insert(ATTRS_KEYWORD.to_string(), Decoded::Object(Default::default()));
        }
        Ok(decoded)
    }

    fn encode(&self, value: &Decoded) -> Value {
        let mut out = self.inner.encode(value);
        if let Value::Object(m) = &mut out {
            m.remove(ATTRS_KEYWORD);
        }
        out
    }

    fn is(&self, value: &Decoded) -> bool {
        self.inner.is(value)
    }
}
