//! Serving-phase facade.
//!
//! A [`Decoder`] is a frozen [`Registry`]: no more registrations, and since every caster is
//! immutable it can be shared across threads and decode concurrently.

use serde_json::Value;

use crate::builder::Definition;
use crate::caster::{report, Failure, ValidationError};
use crate::error::{DecodeError, SetupError};
use crate::factory::Target;
use crate::registry::Registry;
use crate::value::Decoded;

#[derive(Debug)]
pub struct Decoder {
    registry: Registry,
}

impl Decoder {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    /// Register `definitions` (in order) into a fresh registry and freeze it.
    pub fn from_definitions<I>(definitions: I) -> Result<Self, SetupError>
    where
        I: IntoIterator,
        I::Item: Into<Definition>,
    {
        let mut registry = Registry::new();
        registry.register_all(definitions)?;
        Ok(registry.finish())
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Decode `data` as `target`.
    ///
    /// - `Ok(Some(_))`: the input matched.
    /// - `Ok(None)`: the input did not match; `on_error` received one line per error.
    /// - `Err(_)`: the target is not registered, or a constructor failed.
    pub fn decode<F>(&self, target: impl Into<Target>, data: &Value, on_error: F) -> Result<Option<Decoded>, DecodeError>
    where
        F: FnOnce(Vec<String>),
    {
        let target = target.into();
        match self.validate(&target, data)? {
            Ok(decoded) => Ok(Some(decoded)),
            Err(errors) => {
                tracing::debug!(%target, errors = errors.len(), "input rejected");
                on_error(report(&errors));
                Ok(None)
            }
        }
    }

    /// Decode `data` as an array of `element`.
    pub fn decode_array<F>(&self, element: impl Into<Target>, data: &Value, on_error: F) -> Result<Option<Decoded>, DecodeError>
    where
        F: FnOnce(Vec<String>),
    {
        self.decode(Target::array_of(element), data, on_error)
    }

    /// Like [`Decoder::decode`], returning structured errors instead of report lines.
    pub fn validate(&self, target: impl Into<Target>, data: &Value) -> Result<Result<Decoded, Vec<ValidationError>>, DecodeError> {
        let caster = self.registry.resolve_target(&target.into())?;
        match caster.decode(data) {
            Ok(decoded) => Ok(Ok(decoded)),
            Err(Failure::Invalid(errors)) => Ok(Err(errors)),
            Err(Failure::Fatal(error)) => Err(error),
        }
    }

    /// Encode a decoded value back into plain JSON with `target`'s caster.
    pub fn encode(&self, target: impl Into<Target>, value: &Decoded) -> Result<Value, DecodeError> {
        let caster = self.registry.resolve_target(&target.into())?;
        Ok(caster.encode(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Property, Schema, Ty};
    use serde_json::json;

    fn user() -> Schema {
        Schema::new("User", vec![
            Property::required("name", Ty::string()),
            Property::optional("title", Ty::string()),
            Property::required("houses", Ty::array(Ty::string())),
        ])
    }

    #[test]
    fn decoder_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Decoder>();
    }

    #[test]
    fn decode_reports_through_callback() {
        let decoder = Decoder::from_definitions([user()]).unwrap();
        let mut lines = Vec::new();
        let out = decoder.decode("User", &json!({"name": 123, "houses": "x"}), |e| lines = e).unwrap();
        assert!(out.is_none());
        assert_eq!(lines, [
            "User.name: expected string, got 123",
            "User.houses: expected Array<string>, got \"x\"",
        ]);
    }

    #[test]
    fn callback_is_not_called_on_success() {
        let decoder = Decoder::from_definitions([user()]).unwrap();
        let input = json!({"name": "a", "houses": []});
        let out = decoder.decode("User", &input, |_| panic!("unexpected errors")).unwrap();
        assert_eq!(out.unwrap().to_value(), input);
    }

    #[test]
    fn unknown_target_is_an_error() {
        let decoder = Decoder::from_definitions(Vec::<Schema>::new()).unwrap();
        let err = decoder.decode("Ghost", &json!({}), |_| {}).unwrap_err();
        assert!(matches!(err, DecodeError::Unresolved(SetupError::UnknownType { .. })));
    }

    #[test]
    fn decode_array_uses_array_factory() {
        let decoder = Decoder::from_definitions([user()]).unwrap();
        let mut lines = Vec::new();
        let out = decoder
            .decode_array("User", &json!([{"name": "a", "houses": []}, {"name": "b"}]), |e| lines = e)
            .unwrap();
        assert!(out.is_none());
        assert_eq!(lines, ["Array<User>.1.houses: expected Array<string>, got nothing"]);
    }

    #[test]
    fn encode_round_trips() {
        let decoder = Decoder::from_definitions([user()]).unwrap();
        let input = json!({"name": "a", "title": "Dr", "houses": ["x"]});
        let decoded = decoder.decode("User", &input, |_| {}).unwrap().unwrap();
        assert_eq!(decoder.encode("User", &decoded).unwrap(), input);
    }
}
