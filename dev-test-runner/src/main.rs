//! Replays the sample decoding session end to end and prints one line per scenario.
use anyhow::{bail, ensure, Result};
use colored::Colorize;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use shapecast::caster;
use shapecast::{CasterBuilder, ClassBuilder, Decoder, Property, Registry, Schema, SetupError, Target, Ty};

static ZIP_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{5}$").expect("valid regex"));

// ————————————————————————————————————————————————————————————————————————————
// SAMPLE TYPES
// ————————————————————————————————————————————————————————————————————————————

fn schemas() -> Vec<Schema> {
    vec![
        Schema::new("Location", vec![
            Property::required("lat", Ty::number()),
            Property::required("lng", Ty::number()),
        ]),
        Schema::new("google.maps.Marker", vec![Property::required("value", Ty::string())]),
        Schema::new("User", vec![
            Property::required("name", Ty::string()),
            Property::optional("title", Ty::string()),
            Property::required("houses", Ty::array(Ty::string())),
            Property::required("location", Ty::reference("Location")),
            Property::optional("previousLocations", Ty::array(Ty::reference("Location"))),
            Property::required("marker", Ty::reference("google.maps.Marker")),
        ]),
        Schema::new("UserB", vec![
            Property::optional("name", Ty::string()),
            Property::required("title", Ty::string()),
        ]),
    ]
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IGuest {
    first_name: String,
    last_name: String,
}

struct Guest {
    first_name: String,
    last_name: String,
}

impl From<IGuest> for Guest {
    fn from(g: IGuest) -> Self {
        Guest { first_name: g.first_name, last_name: g.last_name }
    }
}

impl Guest {
    fn name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

fn sample_registry() -> Result<Registry> {
    let mut registry = Registry::with_builtins()?;
    registry.register_all(schemas())?;
    registry.register(Schema::new("TryBuiltins", vec![
        Property::required("date", Ty::reference("Date")),
        Property::required("lat", Ty::reference("Latitude")),
        Property::required("lng", Ty::reference("Longitude")),
        Property::required("note", Ty::reference("NonEmptyString")),
    ]))?;
    registry.register(Schema::new("WithAttrs", vec![
        Property::required("name", Ty::string()),
        Property::required("attrs", Ty::Literal(vec![
            Property::required("marker", Ty::reference("google.maps.Icon")),
        ])),
    ]))?;
    registry.register(ClassBuilder::from_serde::<IGuest, Guest>(
        Schema::new("IGuest", vec![
            Property::required("firstName", Ty::string()),
            Property::required("lastName", Ty::string()),
        ]),
        "Guest",
    ))?;
    registry.register(CasterBuilder::new("ZipCode", caster::matching("ZipCode", ZIP_CODE.clone())))?;
    Ok(registry)
}

fn good_user() -> Value {
    json!({
        "name": "Yang",
        "title": "Life Hacker",
        "houses": ["1111 Mission St"],
        "location": {"lat": 0, "lng": 37},
        "marker": {"value": "marker"}
    })
}

// ————————————————————————————————————————————————————————————————————————————
// SCENARIOS
// ————————————————————————————————————————————————————————————————————————————

/// Decode and require the encoded result to equal the input.
fn round_trip(decoder: &Decoder, target: impl Into<Target>, input: &Value) -> Result<()> {
    let target = target.into();
    let mut errors = Vec::new();
    let Some(decoded) = decoder.decode(&target, input, |e| errors = e)? else {
        bail!("rejected: {errors:?}");
    };
    let encoded = decoder.encode(&target, &decoded)?;
    ensure!(&encoded == input, "decoder not cast correctly: expected {input}, got {encoded}");
    Ok(())
}

fn rejected(decoder: &Decoder, target: impl Into<Target>, input: &Value) -> Result<Vec<String>> {
    let mut errors = Vec::new();
    let decoded = decoder.decode(target, input, |e| errors = e)?;
    ensure!(decoded.is_none(), "accepted invalid input {input}");
    Ok(errors)
}

fn setup_error(definitions: Vec<Schema>) -> Result<SetupError> {
    match Decoder::from_definitions(definitions) {
        Ok(_) => bail!("setup succeeded"),
        Err(e) => Ok(e),
    }
}

type Scenario = (&'static str, Box<dyn Fn(&Decoder) -> Result<String>>);

fn scenario<F>(name: &'static str, run: F) -> Scenario
where
    F: Fn(&Decoder) -> Result<String> + 'static,
{
    (name, Box::new(run))
}

fn scenarios() -> Vec<Scenario> {
    vec![
        scenario("good user", |d| round_trip(d, "User", &good_user()).map(|_| String::new())),
        scenario("error example", |d| {
            let bad = json!({"name": 123, "title": true, "houses": "1111 Mission St", "location": "0/37"});
            let errors = rejected(d, "User", &bad)?;
            ensure!(errors.len() == 5, "expected 5 errors, got {errors:?}");
            Ok(errors.join("; "))
        }),
        scenario("error example 2", |d| {
            let bad = json!({"name": 123, "title": true});
            Ok(rejected(d, "UserB", &bad)?.join("; "))
        }),
        scenario("type name conflict", |_| {
            let mut all = schemas();
            all.push(Schema::new("User", vec![Property::required("value", Ty::string())]));
            let e = setup_error(all)?;
            ensure!(matches!(e.root(), SetupError::DuplicateName { .. }), "{e}");
            Ok(e.to_string())
        }),
        scenario("recursive detection", |_| {
            let e = setup_error(vec![Schema::new("Tree", vec![
                Property::required("value", Ty::number()),
                Property::optional("left", Ty::reference("Tree")),
                Property::optional("right", Ty::reference("Tree")),
            ])])?;
            ensure!(matches!(e.root(), SetupError::CyclicDefinition { .. }), "{e}");
            Ok(e.to_string())
        }),
        scenario("topological out of order", |_| {
            let e = setup_error(vec![
                Schema::new("Order", vec![
                    Property::required("price", Ty::number()),
                    Property::required("position", Ty::reference("LatLng")),
                ]),
                Schema::new("LatLng", vec![
                    Property::required("lat", Ty::number()),
                    Property::required("lng", Ty::number()),
                ]),
            ])?;
            ensure!(e.to_string().contains("depends"), "{e}");
            Ok(e.to_string())
        }),
        scenario("empty detection", |_| {
            let e = setup_error(vec![Schema::new("Nothing", vec![])])?;
            ensure!(e.to_string().contains("empty"), "{e}");
            Ok(e.to_string())
        }),
        scenario("decode array", |d| {
            round_trip(d, Target::array_of("User"), &json!([good_user()]))?;
            round_trip(d, Target::array_of(Target::array_of("User")), &json!([[good_user()], []]))?;
            Ok(String::new())
        }),
        scenario("error handling", |d| Ok(rejected(d, "User", &json!({"statusCode": 401}))?.join("; "))),
        scenario("builtin casters", |d| {
            let good = json!({"lat": 80, "lng": 107, "note": "less sugar, no ice", "date": "2019-12-02T02:03:06.783Z"});
            round_trip(d, "TryBuiltins", &good)?;
            Ok(String::new())
        }),
        scenario("builtin error example", |d| {
            let bad = json!({"lat": 10000, "lng": "107", "note": "", "date": "19 Dec 25th"});
            let errors = rejected(d, "TryBuiltins", &bad)?;
            ensure!(errors.len() == 4, "expected 4 errors, got {errors:?}");
            Ok(errors.join("; "))
        }),
        scenario("with attrs", |d| {
            let Some(decoded) = d.decode("WithAttrs", &json!({"name": "sth"}), |_| {})? else {
                bail!("rejected");
            };
            let attrs = decoded.get("attrs").map(|a| a.to_value());
            ensure!(attrs == Some(json!({})), "attrs should be {{}}, got {attrs:?}");
            Ok(String::new())
        }),
        scenario("builder", |d| {
            let input = json!({"firstName": "Yang", "lastName": "Liu"});
            let Some(decoded) = d.decode("Guest", &input, |_| {})? else {
                bail!("rejected");
            };
            let Some(guest) = decoded.downcast::<Guest>() else {
                bail!("builder NOT WORKING");
            };
            let structural: IGuest = decoded.deserialize()?;
            ensure!(structural.first_name == guest.first_name, "structural view lost firstName");
            round_trip(d, "Guest", &input)?;
            Ok(format!("guest's name: {}", guest.name()))
        }),
        scenario("custom caster", |d| {
            round_trip(d, "ZipCode", &json!("94103"))?;
            Ok(rejected(d, "ZipCode", &json!("9410"))?.join("; "))
        }),
    ]
}

fn main() -> Result<()> {
    let decoder = sample_registry()?.finish();
    let mut failed = 0;
    for (name, scenario) in scenarios() {
        match scenario(&decoder) {
            Ok(detail) if detail.is_empty() => println!("{} {name}", "✓".green()),
            Ok(detail) => println!("{} {name}: {}", "✓".green(), detail.dimmed()),
            Err(error) => {
                println!("{} {name}: {}", "✗".red(), error.to_string().red());
                failed += 1;
            }
        }
        println!("{}", "-".repeat(40));
    }
    if failed > 0 {
        bail!("{failed} scenarios failed");
    }
    Ok(())
}
