//! Decoded values.
//!
//! A successful decode yields a [`Decoded`] tree: the structural JSON shape, except where a
//! caster turned a position into a typed object (a class builder, the `Date` caster). Those
//! positions hold an [`Instance`], which also remembers the structural value it was built from so
//! that encoding is always possible.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};

#[derive(Clone, Debug)]
pub enum Decoded {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<Decoded>),
    Object(IndexMap<String, Decoded>),
    Instance(Instance),
}

/// A constructed value plus the structural value it came from.
#[derive(Clone)]
pub struct Instance {
    class: String,
    raw: Value,
    object: Arc<dyn Any + Send + Sync>,
}

impl Instance {
    pub fn new(class: impl Into<String>, raw: Value, object: Arc<dyn Any + Send + Sync>) -> Self {
        Self { class: class.into(), raw, object }
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    /// The pre-construction structural value.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.object.downcast_ref::<T>()
    }

    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.object.clone().downcast::<T>().ok()
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("class", &self.class)
            .field("raw", &self.raw)
            .finish_non_exhaustive()
    }
}

impl From<Value> for Decoded {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Decoded::Null,
            Value::Bool(b) => Decoded::Bool(b),
            Value::Number(n) => Decoded::Number(n),
            Value::String(s) => Decoded::String(s),
            Value::Array(xs) => Decoded::Array(xs.into_iter().map(Decoded::from).collect()),
            Value::Object(m) => Decoded::Object(
                m.into_iter().map(|(k, v)| (k, Decoded::from(v))).collect()
            ),
        }
    }
}

impl Decoded {
    /// Structural view; instances collapse to their raw value.
    pub fn to_value(&self) -> Value {
        match self {
            Decoded::Null => Value::Null,
            Decoded::Bool(b) => Value::Bool(*b),
            Decoded::Number(n) => Value::Number(n.clone()),
            Decoded::String(s) => Value::String(s.clone()),
            Decoded::Array(xs) => Value::Array(xs.iter().map(Decoded::to_value).collect()),
            Decoded::Object(m) => {
                let mut out = Map::with_capacity(m.len());
                for (k, v) in m {
                    out.insert(k.clone(), v.to_value());
                }
                Value::Object(out)
            }
            Decoded::Instance(inst) => inst.raw.clone(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Decoded> {
        match self {
            Decoded::Object(m) => m.get(key),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Decoded::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Decoded::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Decoded]> {
        match self {
            Decoded::Array(xs) => Some(xs),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, Decoded>> {
        match self {
            Decoded::Object(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Decoded::Instance(inst) => Some(inst),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Decoded::Null)
    }

    /// Constructed object at this position, if it is an instance of `T`.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.as_instance().and_then(Instance::downcast::<T>)
    }

    /// Deserialize the structural view into a plain serde type.
    pub fn deserialize<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_value(self.to_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_value_and_back_keeps_key_order() {
        let v = json!({"z": 1, "a": [true, null, "x"], "m": {"k": 1.5}});
        let d = Decoded::from(v.clone());
        assert_eq!(d.to_value(), v);
        let keys: Vec<&str> = d.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, ["z", "a", "m"]);
    }

    #[test]
    fn instance_encodes_as_raw_and_downcasts() {
        #[derive(Debug, PartialEq)]
        struct Point(i64, i64);

        let inst = Instance::new("Point", json!({"x": 1, "y": 2}), Arc::new(Point(1, 2)));
        let d = Decoded::Instance(inst);
        assert_eq!(d.to_value(), json!({"x": 1, "y": 2}));
        assert_eq!(d.downcast::<Point>().as_deref(), Some(&Point(1, 2)));
        assert!(d.downcast::<String>().is_none());
        assert_eq!(d.as_instance().map(Instance::class), Some("Point"));
    }
}
