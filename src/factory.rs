//! Generic factories and decode targets.
//!
//! A factory turns the caster of a type argument into the caster of the generic type, e.g.
//! `"Array"`: `T ↦ Array<T>`. Factories back `Generic`/`Parameterized` schema properties and ad hoc
//! decode targets such as `Array<Array<User>>` that have no schema of their own.

use std::fmt;
use std::sync::Arc;

use crate::caster::{self, Caster};

pub type Factory = Arc<dyn Fn(Caster) -> Caster + Send + Sync>;

pub const ARRAY: &str = "Array";

/// Factories every registry starts with.
pub fn defaults() -> Vec<(String, Factory)> {
    vec![(ARRAY.to_string(), Arc::new(caster::array) as Factory)]
}

/// What to decode: a registered name, or a factory applied to a nested target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Named(String),
    Generic { tag: String, arg: Box<Target> },
}

impl Target {
    pub fn named(name: impl Into<String>) -> Self {
        Target::Named(name.into())
    }

    pub fn generic(tag: impl Into<String>, arg: impl Into<Target>) -> Self {
        Target::Generic { tag: tag.into(), arg: Box::new(arg.into()) }
    }

    pub fn array_of(arg: impl Into<Target>) -> Self {
        Self::generic(ARRAY, arg)
    }
}

impl From<&str> for Target {
    fn from(name: &str) -> Self { Target::Named(name.to_string()) }
}

impl From<String> for Target {
    fn from(name: String) -> Self { Target::Named(name) }
}

impl From<&Target> for Target {
    fn from(t: &Target) -> Self { t.clone() }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Named(name) => f.write_str(name),
            Target::Generic { tag, arg } => write!(f, "{tag}<{arg}>"),
        }
    }
}
