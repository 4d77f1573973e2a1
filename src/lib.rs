//! Typed decoding of untyped JSON against registered structural schemas.
//!
//! Schemas are registered into a [`Registry`], which compiles each one into a [`Caster`]
//! as soon as it is registered. [`Registry::finish`] freezes the registry into a [`Decoder`]
//! that validates `serde_json::Value`s, reports path-qualified errors, and optionally builds
//! domain objects through a [`ClassBuilder`].
//!
//! ```
//! use serde_json::json;
//! use shapecast::{Decoder, Property, Schema, Ty};
//!
//! let user = Schema::new("User", vec![
//!     Property::required("name", Ty::string()),
//!     Property::optional("title", Ty::string()),
//!     Property::required("houses", Ty::array(Ty::string())),
//! ]);
//! let decoder = Decoder::from_definitions([user]).unwrap();
//!
//! let mut errors = Vec::new();
//! let decoded = decoder.decode("User", &json!({"name": 123, "houses": "x"}), |e| errors = e).unwrap();
//! assert!(decoded.is_none());
//! assert_eq!(errors, [
//!     "User.name: expected string, got 123",
//!     "User.houses: expected Array<string>, got \"x\"",
//! ]);
//! ```
pub mod ir;
pub mod lower;
pub mod value;
pub mod caster;
pub mod error;
pub mod factory;
pub mod builder;
mod compile;
pub mod registry;
pub mod decoder;
pub mod builtin;
pub mod schema_file;
pub mod jq_exec;

pub use builder::{CasterBuilder, ClassBuilder, Definition};
pub use caster::{Caster, ValidationError};
pub use decoder::Decoder;
pub use error::{DecodeError, SetupError};
pub use factory::Target;
pub use ir::{Property, Schema, Ty, ATTRS_KEYWORD};
pub use registry::{EntryState, Registry};
pub use value::{Decoded, Instance};
