use std::collections::HashMap;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::{Caster, Codec, Context, Errors, Validation};
use crate::value::Decoded;

/// Object with declared keys. Undeclared keys pass through untouched.
struct ObjectCaster {
    name: String,
    props: Vec<(String, Caster)>,
    partial: bool, // absent keys allowed
}

impl ObjectCaster {
    fn new(name: Option<&str>, props: Vec<(String, Caster)>, partial: bool) -> Self {
        let name = match name {
            Some(n) => n.to_string(),
            None => {
                let body = props.iter()
                    .map(|(k, c)| format!("{k}: {}", c.name()))
                    .collect::<Vec<_>>()
                    .join(", ");
                if partial { format!("Partial<{{ {body} }}>") } else { format!("{{ {body} }}") }
            }
        };
        Self { name, props, partial }
    }

    // last declaration wins on duplicate keys
    fn caster_for(&self, key: &str) -> Option<&Caster> {
        self.props.iter().rev().find(|(k, _)| k == key).map(|(_, c)| c)
    }
}

impl Codec for ObjectCaster {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self, input: &Value, ctx: &Context<'_>) -> Validation {
        let Value::Object(map) = input else {
            return Err(ctx.failure(&self.name, Some(input)));
        };

        let mut errors = Errors::default();
        let mut decoded: HashMap<&str, Decoded> = HashMap::with_capacity(self.props.len());
        for (key, caster) in &self.props {
            let here = ctx.field(key);
            match map.get(key) {
                None if self.partial => {}
                None => errors.push(here.failure(caster.name(), None))?,
                Some(v) => match caster.validate(v, &here) {
                    Ok(d) => { decoded.insert(key.as_str(), d); }
                    Err(failure) => errors.push(failure)?,
                },
            }
        }

        // rebuild in input order
        let mut out = IndexMap::with_capacity(map.len());
        for (k, v) in map {
            let d = decoded.remove(k.as_str()).unwrap_or_else(|| Decoded::from(v.clone()));
            out.insert(k.clone(), d);
        }
        errors.finish(Decoded::Object(out))
    }

    fn encode(&self, value: &Decoded) -> Value {
        let Decoded::Object(m) = value else {
            return value.to_value();
        };
        let mut out = Map::with_capacity(m.len());
        for (k, v) in m {
            let encoded = match self.caster_for(k) {
                Some(c) => c.encode(v),
                None => v.to_value(),
            };
            out.insert(k.clone(), encoded);
        }
        Value::Object(out)
    }

    fn is(&self, value: &Decoded) -> bool {
        let Decoded::Object(m) = value else {
            return false;
        };
        self.props.iter().all(|(k, c)| match m.get(k) {
            Some(v) => c.is(v),
            None => self.partial,
        })
    }
}

/// Every key in `props` must be present.
pub fn object(name: Option<&str>, props: Vec<(String, Caster)>) -> Caster {
    Caster::new(ObjectCaster::new(name, props, false))
}

/// Keys in `props` may be absent; present ones must validate.
pub fn partial(name: Option<&str>, props: Vec<(String, Caster)>) -> Caster {
    Caster::new(ObjectCaster::new(name, props, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caster::{number, string, Failure};
    use serde_json::json;

    fn location() -> Caster {
        object(None, vec![("lat".into(), number()), ("lng".into(), number())])
    }

    #[test]
    fn anonymous_names_describe_shape() {
        assert_eq!(location().name(), "{ lat: number, lng: number }");
        let p = partial(None, vec![("title".into(), string())]);
        assert_eq!(p.name(), "Partial<{ title: string }>");
    }

    #[test]
    fn required_keys_are_reported_when_missing() {
        let err = location().decode(&json!({"lat": 1})).unwrap_err();
        let Failure::Invalid(errs) = err else { panic!("fatal") };
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].path, "{ lat: number, lng: number }.lng");
        assert_eq!(errs[0].actual, None);
    }

    #[test]
    fn partial_allows_absence_but_checks_presence() {
        let p = partial(Some("Opt"), vec![("title".into(), string())]);
        assert!(p.decode(&json!({})).is_ok());
        let Err(Failure::Invalid(errs)) = p.decode(&json!({"title": true})) else { panic!() };
        assert_eq!(errs[0].path, "Opt.title");
        assert!(p.decode(&json!({"title": null})).is_err());
    }

    #[test]
    fn extra_keys_pass_through_in_input_order() {
        let input = json!({"extra": [1, 2], "lng": 37, "lat": 0});
        let d = location().decode(&input).unwrap();
        assert_eq!(d.to_value(), input);
        assert_eq!(location().encode(&d), input);
        assert!(location().is(&d));
    }

    #[test]
    fn non_objects_fail_at_the_object_itself() {
        for bad in [json!(null), json!([]), json!("0/37")] {
            let Err(Failure::Invalid(errs)) = location().decode(&bad) else { panic!() };
            assert_eq!(errs.len(), 1);
            assert_eq!(errs[0].expected, "{ lat: number, lng: number }");
        }
    }
}
