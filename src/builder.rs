//! Builders: registrations that are not plain schemas.
//!
//! - [`ClassBuilder`] validates with a schema, then hands the validated structural value to a
//!   constructor and yields the constructed object as a [`Decoded::Instance`].
//! - [`CasterBuilder`] stores a hand-written caster under a name (refinements, enum checks, ...).
//!
//! Both register through [`Definition`], alongside schemas, and share their namespace.

use std::any::Any;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::caster::{Caster, Codec, Context, Failure, Validation};
use crate::error::DecodeError;
use crate::ir::{Schema, ATTRS_KEYWORD};
use crate::value::{Decoded, Instance};

type ConstructFn = dyn Fn(Value) -> anyhow::Result<Arc<dyn Any + Send + Sync>> + Send + Sync;

/// A schema plus a constructor producing the domain type.
#[derive(Clone)]
pub struct ClassBuilder {
    schema: Schema,
    class_name: String,
    construct: Arc<ConstructFn>,
}

impl ClassBuilder {
    pub fn new<T, F>(schema: Schema, class_name: impl Into<String>, construct: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(Value) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self {
            schema,
            class_name: class_name.into(),
            construct: Arc::new(move |v: Value| {
                construct(v).map(|t| Arc::new(t) as Arc<dyn Any + Send + Sync>)
            }),
        }
    }

    /// Deserialize the validated value into `S`, then convert it into `T`.
    pub fn from_serde<S, T>(schema: Schema, class_name: impl Into<String>) -> Self
    where
        S: DeserializeOwned + 'static,
        T: From<S> + Any + Send + Sync,
    {
        Self::new(schema, class_name, |v: Value| {
            let data: S = serde_json::from_value(v)?;
            Ok(T::from(data))
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Layer construction on top of the schema's caster. With `synthesizes_attrs` the constructor
    /// sees the empty `attrs` the schema's caster adds.
    pub(crate) fn wrap(&self, inner: Caster, synthesizes_attrs: bool) -> Caster {
        Caster::new(ConstructCaster {
            class: self.class_name.clone(),
            inner,
            synthesizes_attrs,
            construct: self.construct.clone(),
        })
    }
}

/// A caster stored verbatim under `type_name`.
#[derive(Clone, Debug)]
pub struct CasterBuilder {
    type_name: String,
    caster: Caster,
}

impl CasterBuilder {
    pub fn new(type_name: impl Into<String>, caster: Caster) -> Self {
        Self { type_name: type_name.into(), caster }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn caster(&self) -> &Caster {
        &self.caster
    }
}

/// Anything the registry accepts.
#[derive(Clone)]
pub enum Definition {
    Schema(Schema),
    Class(ClassBuilder),
    Caster(CasterBuilder),
}

impl Definition {
    /// Name the definition is registered under.
    pub fn name(&self) -> &str {
        match self {
            Definition::Schema(s) => s.name.as_str(),
            Definition::Class(c) => c.class_name.as_str(),
            Definition::Caster(c) => c.type_name.as_str(),
        }
    }

    /// Names this definition will occupy once registered.
    pub fn declared_names(&self) -> Vec<&str> {
        match self {
            Definition::Class(c) => vec![c.class_name.as_str(), c.schema.name.as_str()],
            other => vec![other.name()],
        }
    }
}

impl From<Schema> for Definition {
    fn from(s: Schema) -> Self { Definition::Schema(s) }
}

impl From<ClassBuilder> for Definition {
    fn from(c: ClassBuilder) -> Self { Definition::Class(c) }
}

impl From<CasterBuilder> for Definition {
    fn from(c: CasterBuilder) -> Self { Definition::Caster(c) }
}

// ------------------------------ Construction ------------------------------ //

struct ConstructCaster {
    class: String,
    inner: Caster,
    synthesizes_attrs: bool,
    construct: Arc<ConstructFn>,
}

impl ConstructCaster {
    /// Encoded structural value, with `attrs` put back when the schema synthesizes it.
    fn structural_value(&self, structural: &Decoded) -> Value {
        let mut raw = self.inner.encode(structural);
        if self.synthesizes_attrs {
            if let Value::Object(m) = &mut raw {
                m.insert(ATTRS_KEYWORD.to_string(), Value::Object(Default::default()));
            }
        }
        raw
    }
}

impl Codec for ConstructCaster {
    fn name(&self) -> &str {
        &self.class
    }

    fn validate(&self, input: &Value, ctx: &Context<'_>) -> Validation {
        let structural = self.inner.validate(input, ctx)?;
        let raw = self.structural_value(&structural);
        match (self.construct)(raw.clone()) {
            Ok(object) => Ok(Decoded::Instance(Instance::new(self.class.clone(), raw, object))),
            Err(source) => Err(Failure::Fatal(DecodeError::Construction {
                class: self.class.clone(),
                source,
            })),
        }
    }

    // construction is one-way: encoding yields the structural value it was built from
    fn encode(&self, value: &Decoded) -> Value {
        match value {
            Decoded::Instance(inst) if inst.class() == self.class => {
                let mut out = inst.raw().clone();
                if self.synthesizes_attrs {
                    if let Value::Object(m) = &mut out {
                        m.remove(ATTRS_KEYWORD);
                    }
                }
                out
            }
            other => self.inner.encode(other),
        }
    }

    fn is(&self, value: &Decoded) -> bool {
        matches!(value, Decoded::Instance(inst) if inst.class() == self.class)
    }
}
