//! Primitive caster library.
//!
//! A [`Caster`] validates a `serde_json::Value` into a [`Decoded`] value and can encode a decoded
//! value back into JSON. Casters are immutable and cheap to clone; composite casters hold their
//! parts by handle, so compiling a schema never copies the casters it references.
//!
//! Building blocks:
//! - scalars: [`string`], [`number`], [`boolean`], [`null`]
//! - objects: [`object`] (required keys), [`partial`] (optional keys), [`intersection`]
//! - [`array`], [`union`]
//! - refinements: [`refine`], [`matching`], and the fully custom [`Custom`] triple
//!
//! Failures are structured ([`ValidationError`]: path, expected, actual) and rendered by
//! [`report`].
pub mod prim;
pub mod object;
pub mod combinator;
pub mod refine;
pub mod report;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::DecodeError;
use crate::value::Decoded;

pub use prim::{boolean, null, number, string};
pub use object::{object, partial};
pub use combinator::{array, intersection, union};
pub use refine::{matching, refine, Custom};
pub use report::report;

// ------------------------------- Codec ----------------------------------- //

/// One type's validator + encoder.
pub trait Codec: Send + Sync {
    /// Display name, used as the `expected` side of errors.
    fn name(&self) -> &str;

    fn validate(&self, input: &Value, ctx: &Context<'_>) -> Validation;

    fn encode(&self, value: &Decoded) -> Value;

    /// Type guard over already-decoded values.
    fn is(&self, value: &Decoded) -> bool;
}

/// Shared handle to a [`Codec`].
#[derive(Clone)]
pub struct Caster(Arc<dyn Codec>);

impl Caster {
    pub fn new(codec: impl Codec + 'static) -> Self {
        Self(Arc::new(codec))
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }

    /// Validate `input` from the root.
    pub fn decode(&self, input: &Value) -> Validation {
        self.0.validate(input, &Context::root(self.name()))
    }

    /// Validate `input` at a nested position.
    pub fn validate(&self, input: &Value, ctx: &Context<'_>) -> Validation {
        self.0.validate(input, ctx)
    }

    pub fn encode(&self, value: &Decoded) -> Value {
        self.0.encode(value)
    }

    pub fn is(&self, value: &Decoded) -> bool {
        self.0.is(value)
    }
}

impl fmt::Debug for Caster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Caster({})", self.name())
    }
}

// ------------------------------ Context ---------------------------------- //

/// Position inside the input, as a parent-linked chain of keys.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    key: Key<'a>,
    parent: Option<&'a Context<'a>>,
}

#[derive(Debug, Clone, Copy)]
enum Key<'a> {
    Root(&'a str),
    Field(&'a str),
    Index(usize),
}

impl<'a> Context<'a> {
    pub fn root(name: &'a str) -> Self {
        Self { key: Key::Root(name), parent: None }
    }

    pub fn field<'b>(&'b self, name: &'b str) -> Context<'b> {
        Context { key: Key::Field(name), parent: Some(self) }
    }

    pub fn index(&self, i: usize) -> Context<'_> {
        Context { key: Key::Index(i), parent: Some(self) }
    }

    /// Dotted path from the root, e.g. `User.houses.0`.
    pub fn path(&self) -> String {
        let mut keys = Vec::new();
        let mut cur = Some(self);
        while let Some(c) = cur {
            keys.push(c.key);
            cur = c.parent;
        }
        let mut out = String::new();
        for key in keys.into_iter().rev() {
            match key {
                Key::Root(name) => out.push_str(name),
                Key::Field(name) => {
                    if !out.is_empty() { out.push('.'); }
                    out.push_str(name);
                }
                Key::Index(i) => {
                    if !out.is_empty() { out.push('.'); }
                    out.push_str(&i.to_string());
                }
            }
        }
        out
    }

    /// A single failure at this position.
    pub fn failure(&self, expected: &str, actual: Option<&Value>) -> Failure {
        Failure::Invalid(vec![ValidationError {
            path: self.path(),
            expected: expected.to_string(),
            actual: actual.cloned(),
        }])
    }
}

// ------------------------------ Failures --------------------------------- //

pub type Validation = Result<Decoded, Failure>;

/// One mismatch between input and schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub path: String,
    pub expected: String,
    /// `None` when the key was absent.
    pub actual: Option<Value>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.actual {
            Some(v) => write!(f, "{}: expected {}, got {}", self.path, self.expected, v),
            None => write!(f, "{}: expected {}, got nothing", self.path, self.expected),
        }
    }
}

#[derive(Debug)]
pub enum Failure {
    /// The input does not match. Recoverable.
    Invalid(Vec<ValidationError>),
    /// A constructor failed on valid input. Not recoverable by trying another branch.
    Fatal(DecodeError),
}

impl Failure {
    /// Fold `next` into `self`, keeping the first fatal error and dropping repeated errors.
    pub fn absorb(&mut self, next: Failure) {
        match next {
            Failure::Fatal(e) => {
                if let Failure::Invalid(_) = self {
                    *self = Failure::Fatal(e);
                }
            }
            Failure::Invalid(more) => {
                if let Failure::Invalid(errs) = self {
                    for e in more {
                        if !errs.contains(&e) {
                            errs.push(e);
                        }
                    }
                }
            }
        }
    }
}

/// Accumulates failures while validating the parts of a composite value.
#[derive(Debug, Default)]
pub(crate) struct Errors(Vec<ValidationError>);

impl Errors {
    /// Record an invalid part; a fatal failure is returned to the caller immediately.
    pub fn push(&mut self, failure: Failure) -> Result<(), Failure> {
        match failure {
            Failure::Invalid(errs) => {
                self.0.extend(errs);
                Ok(())
            }
            fatal @ Failure::Fatal(_) => Err(fatal),
        }
    }

    pub fn finish(self, ok: Decoded) -> Validation {
        if self.0.is_empty() { Ok(ok) } else { Err(Failure::Invalid(self.0)) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn context_renders_dotted_paths() {
        let root = Context::root("User");
        let houses = root.field("houses");
        let first = houses.index(0);
        assert_eq!(root.path(), "User");
        assert_eq!(first.path(), "User.houses.0");
        assert_eq!(Context::root("").field("name").path(), "name");
    }

    #[test]
    fn validation_error_display() {
        let e = ValidationError { path: "User.name".into(), expected: "string".into(), actual: Some(json!(123)) };
        assert_eq!(e.to_string(), "User.name: expected string, got 123");
        let e = ValidationError { path: "User.houses".into(), expected: "Array<string>".into(), actual: None };
        assert_eq!(e.to_string(), "User.houses: expected Array<string>, got nothing");
    }

    #[test]
    fn fatal_failure_wins_when_absorbing() {
        let mut f = Context::root("A").failure("string", None);
        f.absorb(Failure::Fatal(DecodeError::Construction {
            class: "A".into(),
            source: anyhow::anyhow!("boom"),
        }));
        f.absorb(Context::root("B").failure("number", None));
        assert!(matches!(f, Failure::Fatal(DecodeError::Construction { .. })));
    }
}
