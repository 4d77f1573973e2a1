//! Stock casters registered by [`crate::Registry::with_builtins`].

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use serde_json::Value;

use crate::builder::CasterBuilder;
use crate::caster::{self, Caster, Custom};
use crate::value::{Decoded, Instance};

pub const DATE: &str = "Date";

/// RFC 3339 timestamp → `DateTime<Utc>`.
pub static DATE_CASTER: Lazy<Caster> = Lazy::new(|| {
    Custom::new(
        DATE,
        |input, ctx| {
            let parsed = input.as_str().and_then(|s| DateTime::parse_from_rfc3339(s).ok());
            match parsed {
                Some(dt) => Ok(Decoded::Instance(Instance::new(
                    DATE,
                    input.clone(),
                    Arc::new(dt.with_timezone(&Utc)),
                ))),
                None => Err(ctx.failure(DATE, Some(input))),
            }
        },
        |value| match value.as_instance().and_then(Instance::downcast_ref::<DateTime<Utc>>) {
            Some(dt) => Value::String(dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
            None => value.to_value(),
        },
        |value| value.as_instance().is_some_and(|i| i.downcast_ref::<DateTime<Utc>>().is_some()),
    )
    .into_caster()
});

pub static LATITUDE: Lazy<Caster> = Lazy::new(|| in_range("Latitude", 90.0));
pub static LONGITUDE: Lazy<Caster> = Lazy::new(|| in_range("Longitude", 180.0));

pub static NON_EMPTY_STRING: Lazy<Caster> = Lazy::new(|| {
    caster::refine(caster::string(), "NonEmptyString", |d| d.as_str().is_some_and(|s| !s.is_empty()))
});

fn in_range(name: &str, bound: f64) -> Caster {
    caster::refine(caster::number(), name, move |d| {
        d.as_f64().is_some_and(|n| (-bound..=bound).contains(&n))
    })
}

pub fn casters() -> Vec<CasterBuilder> {
    [&DATE_CASTER, &LATITUDE, &LONGITUDE, &NON_EMPTY_STRING]
        .into_iter()
        .map(|c| CasterBuilder::new(c.name(), Caster::clone(c)))
        .collect()
}
