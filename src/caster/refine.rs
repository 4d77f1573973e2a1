use regex::Regex;
use serde_json::Value;

use super::{Caster, Codec, Context, Validation};
use crate::value::Decoded;

type ValidateFn = dyn Fn(&Value, &Context<'_>) -> Validation + Send + Sync;
type EncodeFn = dyn Fn(&Decoded) -> Value + Send + Sync;
type IsFn = dyn Fn(&Decoded) -> bool + Send + Sync;

/// A caster assembled from a validate/encode/is triple.
pub struct Custom {
    name: String,
    validate: Box<ValidateFn>,
    encode: Box<EncodeFn>,
    is: Box<IsFn>,
}

impl Custom {
    pub fn new<V, E, I>(name: impl Into<String>, validate: V, encode: E, is: I) -> Self
    where
        V: Fn(&Value, &Context<'_>) -> Validation + Send + Sync + 'static,
        E: Fn(&Decoded) -> Value + Send + Sync + 'static,
        I: Fn(&Decoded) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            validate: Box::new(validate),
            encode: Box::new(encode),
            is: Box::new(is),
        }
    }

    pub fn into_caster(self) -> Caster {
        Caster::new(self)
    }
}

impl Codec for Custom {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self, input: &Value, ctx: &Context<'_>) -> Validation {
        (self.validate)(input, ctx)
    }

    fn encode(&self, value: &Decoded) -> Value {
        (self.encode)(value)
    }

    fn is(&self, value: &Decoded) -> bool {
        (self.is)(value)
    }
}

/// `base`, narrowed by `predicate` on the decoded value. A value `base` accepts but the predicate
/// rejects is reported against `name`.
pub fn refine<P>(base: Caster, name: impl Into<String>, predicate: P) -> Caster
where
    P: Fn(&Decoded) -> bool + Send + Sync + 'static,
{
    let name = name.into();
    let predicate = std::sync::Arc::new(predicate);
    let (b1, b2, b3) = (base.clone(), base.clone(), base);
    let (p1, p2) = (predicate.clone(), predicate);
    let expected = name.clone();
    Custom::new(
        name,
        move |input, ctx| {
            let d = b1.validate(input, ctx)?;
            if (*p1)(&d) { Ok(d) } else { Err(ctx.failure(&expected, Some(input))) }
        },
        move |value| b2.encode(value),
        move |value| b3.is(value) && (*p2)(value),
    )
    .into_caster()
}

/// Strings matching `pattern`.
pub fn matching(name: impl Into<String>, pattern: Regex) -> Caster {
    refine(super::string(), name, move |d| d.as_str().is_some_and(|s| pattern.is_match(s)))
}
