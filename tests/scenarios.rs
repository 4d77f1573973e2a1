//! End-to-end decoding scenarios through the public API.
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use shapecast::caster;
use shapecast::{
    schema_file, CasterBuilder, ClassBuilder, DecodeError, Decoded, Decoder, EntryState, Property, Registry,
    Schema, SetupError, Target, Ty,
};

// ————————————————————————————————————————————————————————————————————————————
// FIXTURES
// ————————————————————————————————————————————————————————————————————————————

fn location() -> Schema {
    Schema::new("Location", vec![
        Property::required("lat", Ty::number()),
        Property::required("lng", Ty::number()),
    ])
}

fn marker() -> Schema {
    Schema::new("google.maps.Marker", vec![Property::required("value", Ty::string())])
}

fn user() -> Schema {
    Schema::new("User", vec![
        Property::required("name", Ty::string()),
        Property::optional("title", Ty::string()),
        Property::required("houses", Ty::array(Ty::string())),
        Property::required("location", Ty::reference("Location")),
        Property::optional("previousLocations", Ty::array(Ty::reference("Location"))),
        Property::required("marker", Ty::reference("google.maps.Marker")),
    ])
}

fn user_b() -> Schema {
    Schema::new("UserB", vec![
        Property::optional("name", Ty::string()),
        Property::required("title", Ty::string()),
    ])
}

fn sample_decoder() -> Decoder {
    let mut registry = Registry::with_builtins().unwrap();
    registry.register_all([location(), marker(), user(), user_b()]).unwrap();
    registry.finish()
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

fn decode_lines(decoder: &Decoder, target: impl Into<Target>, data: &Value) -> (Option<Decoded>, Vec<String>) {
    let mut lines = Vec::new();
    let out = decoder.decode(target, data, |e| lines = e).unwrap();
    (out, lines)
}

// ————————————————————————————————————————————————————————————————————————————
// DECODING
// ————————————————————————————————————————————————————————————————————————————

#[test]
fn valid_input_round_trips() {
    let decoder = sample_decoder();
    let (out, lines) = decode_lines(&decoder, "User", &good_user());
    assert!(lines.is_empty());
    let decoded = out.unwrap();
    assert_eq!(decoded.to_value(), good_user());
    assert_eq!(decoder.encode("User", &decoded).unwrap(), good_user());
    assert_eq!(decoded.get("location").and_then(|l| l.get("lng")).and_then(Decoded::as_f64), Some(37.0));
}

#[test]
fn concrete_user_scenario_reports_both_errors() {
    let decoder = Decoder::from_definitions([Schema::new("User", vec![
        Property::required("name", Ty::string()),
        Property::optional("title", Ty::string()),
        Property::required("houses", Ty::array(Ty::string())),
    ])])
    .unwrap();
    let (out, lines) = decode_lines(&decoder, "User", &json!({"name": 123, "houses": "x"}));
    assert!(out.is_none());
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("name") && lines[0].contains("123"));
    assert!(lines[1].contains("houses") && lines[1].contains("\"x\""));
}

#[test]
fn bad_input_names_every_offending_path() {
    let decoder = sample_decoder();
    let bad = json!({"name": 123, "title": true, "houses": "1111 Mission St", "location": "0/37"});

    let (out, lines) = decode_lines(&decoder, "User", &bad);
    assert!(out.is_none());
    assert_eq!(lines, [
        "User.name: expected string, got 123",
        "User.houses: expected Array<string>, got \"1111 Mission St\"",
        "User.location: expected Location, got \"0/37\"",
        "User.marker: expected google.maps.Marker, got nothing",
        "User.title: expected string, got true",
    ]);

    // the same input against a type with the opposite optionality
    let (_, lines) = decode_lines(&decoder, "UserB", &bad);
    assert_eq!(lines, [
        "UserB.title: expected string, got true",
        "UserB.name: expected string, got 123",
    ]);
}

#[test]
fn unexpected_payloads_are_rejected_not_fatal() {
    let decoder = sample_decoder();
    for payload in [json!({"statusCode": 401}), json!(null), json!([good_user()]), json!("User")] {
        let (out, lines) = decode_lines(&decoder, "User", &payload);
        assert!(out.is_none(), "{payload}");
        assert!(!lines.is_empty());
    }
}

#[test]
fn arrays_and_nested_generics() {
    let decoder = sample_decoder();
    let (out, _) = decode_lines(&decoder, Target::array_of("User"), &json!([good_user()]));
    assert_eq!(out.unwrap().to_value(), json!([good_user()]));

    let mut lines = Vec::new();
    let nested = json!([[good_user()], [], [good_user(), {"name": "x"}]]);
    let out = decoder
        .decode(Target::array_of(Target::array_of("User")), &nested, |e| lines = e)
        .unwrap();
    assert!(out.is_none());
    assert!(lines.iter().all(|l| l.starts_with("Array<Array<User>>.2.1.")), "{lines:?}");

    let ok = json!([[good_user()], []]);
    let decoded = decoder.decode(Target::array_of(Target::array_of("User")), &ok, |_| {}).unwrap();
    assert_eq!(decoded.unwrap().to_value(), ok);
}

#[test]
fn decode_array_wraps_the_named_type() {
    let decoder = sample_decoder();
    let out = decoder.decode_array("Location", &json!([{"lat": 1, "lng": 2}]), |_| {}).unwrap();
    assert_eq!(out.unwrap().as_array().map(<[Decoded]>::len), Some(1));
}

#[test]
fn nullable_reference_union() {
    let mut registry = Registry::new();
    registry.register_all([
        Schema::new("Customer", vec![Property::required("id", Ty::string())]),
        Schema::new("Order", vec![Property::required("customer", Ty::nullable(Ty::reference("Customer")))]),
    ]).unwrap();
    let decoder = registry.finish();

    let (out, _) = decode_lines(&decoder, "Order", &json!({"customer": null}));
    assert!(out.unwrap().get("customer").unwrap().is_null());
    let (out, _) = decode_lines(&decoder, "Order", &json!({"customer": {"id": "c1"}}));
    assert!(out.is_some());

    let (out, lines) = decode_lines(&decoder, "Order", &json!({"customer": 5}));
    assert!(out.is_none());
    assert_eq!(lines, [
        "Order.customer: expected Customer, got 5",
        "Order.customer: expected null, got 5",
    ]);
}

#[test]
fn literal_types_and_extended_interfaces() {
    let mut registry = Registry::new();
    registry.register(Schema::new("LatLng", vec![
        Property::required("lat", Ty::number()),
        Property::required("lng", Ty::number()),
    ])).unwrap();
    // an interface extending `Order` arrives flattened
    registry.register(Schema::new("ServiceOrder", vec![
        Property::required("price", Ty::number()),
        Property::required("position", Ty::reference("LatLng")),
    ])).unwrap();
    registry.register(Schema::new("WithLiteralType", vec![
        Property::required("price", Ty::number()),
        Property::required("position", Ty::Literal(vec![
            Property::required("lat", Ty::number()),
            Property::required("lng", Ty::number()),
        ])),
    ])).unwrap();
    let decoder = registry.finish();

    let order = json!({"position": {"lat": 0, "lng": 0}, "price": 3});
    assert_eq!(decode_lines(&decoder, "ServiceOrder", &order).0.unwrap().to_value(), order);
    let literal = json!({"price": 30, "position": {"lat": 0, "lng": 0}});
    assert_eq!(decode_lines(&decoder, "WithLiteralType", &literal).0.unwrap().to_value(), literal);
}

// ————————————————————————————————————————————————————————————————————————————
// ATTRS
// ————————————————————————————————————————————————————————————————————————————

#[test]
fn attrs_are_synthesized_on_named_nested_and_array_positions() {
    let mut registry = Registry::new();
    registry.register(Schema::new("WithAttrs", vec![
        Property::required("name", Ty::string()),
        Property::required("attrs", Ty::Literal(vec![
            Property::required("marker", Ty::reference("google.maps.Icon")),
        ])),
    ])).unwrap();
    registry.register(Schema::new("Holder", vec![
        Property::required("one", Ty::reference("WithAttrs")),
        Property::required("many", Ty::array(Ty::reference("WithAttrs"))),
    ])).unwrap();
    assert!(registry.synthesizes_attrs("WithAttrs"));
    assert!(!registry.synthesizes_attrs("Holder"));
    let decoder = registry.finish();

    let (out, _) = decode_lines(&decoder, "WithAttrs", &json!({"name": "sth"}));
    let out = out.unwrap();
    assert_eq!(out.get("name").and_then(Decoded::as_str), Some("sth"));
    assert_eq!(out.get("attrs").unwrap().to_value(), json!({}));

    // whatever the input carries under attrs is replaced
    let (out, _) = decode_lines(&decoder, "WithAttrs", &json!({"name": "sth", "attrs": {"marker": 1}}));
    assert_eq!(out.unwrap().to_value(), json!({"name": "sth", "attrs": {}}));

    let (out, _) = decode_lines(&decoder, "Holder", &json!({"one": {"name": "a"}, "many": [{"name": "b"}]}));
    assert_eq!(out.unwrap().to_value(), json!({
        "one": {"name": "a", "attrs": {}},
        "many": [{"name": "b", "attrs": {}}]
    }));
}

// ————————————————————————————————————————————————————————————————————————————
// BUILDERS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IGuest {
    first_name: String,
    last_name: String,
}

#[derive(Debug)]
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

fn guest_schema() -> Schema {
    Schema::new("IGuest", vec![
        Property::required("firstName", Ty::string()),
        Property::required("lastName", Ty::string()),
    ])
}

#[test]
fn class_builder_constructs_domain_objects() {
    let decoder = Decoder::from_definitions([ClassBuilder::from_serde::<IGuest, Guest>(guest_schema(), "Guest")]).unwrap();
    assert!(decoder.registry().contains("IGuest"));

    let input = json!({"firstName": "Yang", "lastName": "Liu"});
    let (out, _) = decode_lines(&decoder, "Guest", &input);
    let decoded = out.unwrap();
    let guest: Arc<Guest> = decoded.downcast().unwrap();
    assert_eq!(guest.name(), "Yang Liu");

    // the constructed value still serializes to its input
    assert_eq!(decoded.to_value(), input);
    assert_eq!(decoder.encode("Guest", &decoded).unwrap(), input);

    // the schema alone yields the plain structure
    let (plain, _) = decode_lines(&decoder, "IGuest", &input);
    assert!(plain.unwrap().downcast::<Guest>().is_none());
}

#[test]
fn class_builder_rejects_bad_shapes_before_constructing() {
    let decoder = Decoder::from_definitions([ClassBuilder::new(guest_schema(), "Guest", |_: Value| -> anyhow::Result<Guest> {
        panic!("constructor must not run on invalid input")
    })])
    .unwrap();
    let (out, lines) = decode_lines(&decoder, "Guest", &json!({"firstName": "Yang"}));
    assert!(out.is_none());
    assert_eq!(lines, ["Guest.lastName: expected string, got nothing"]);
}

#[test]
fn constructor_failures_escape_unions() {
    let mut registry = Registry::new();
    registry.register(ClassBuilder::new(guest_schema(), "Guest", |_: Value| -> anyhow::Result<Guest> {
        anyhow::bail!("guest list is closed")
    })).unwrap();
    registry.register(Schema::new("Visit", vec![
        Property::required("who", Ty::Union(vec![Ty::reference("Guest"), Ty::string()])),
    ])).unwrap();
    let decoder = registry.finish();

    let err = decoder
        .decode("Visit", &json!({"who": {"firstName": "a", "lastName": "b"}}), |_| panic!("not a validation error"))
        .unwrap_err();
    match err {
        DecodeError::Construction { class, source } => {
            assert_eq!(class, "Guest");
            assert_eq!(source.to_string(), "guest list is closed");
        }
        other => panic!("unexpected {other}"),
    }
    // the string branch is still reachable
    assert!(decoder.decode("Visit", &json!({"who": "anonymous"}), |_| {}).unwrap().is_some());
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IMember {
    first_name: String,
    attrs: serde_json::Map<String, Value>,
}

struct Member {
    first_name: String,
    attrs: serde_json::Map<String, Value>,
}

impl From<IMember> for Member {
    fn from(m: IMember) -> Self {
        Member { first_name: m.first_name, attrs: m.attrs }
    }
}

fn member_schema() -> Schema {
    Schema::new("IMember", vec![
        Property::required("firstName", Ty::string()),
        Property::required("attrs", Ty::Literal(vec![Property::required("badge", Ty::string())])),
    ])
}

#[test]
fn class_builders_over_attrs_schemas_see_the_synthesized_field() {
    let input = json!({"firstName": "Yang"});
    let with_attrs = json!({"firstName": "Yang", "attrs": {}});

    let decoder = Decoder::from_definitions([ClassBuilder::from_serde::<IMember, Member>(member_schema(), "Member")])
        .unwrap();
    assert!(decoder.registry().synthesizes_attrs("Member"));
    let (out, lines) = decode_lines(&decoder, "Member", &input);
    assert!(lines.is_empty(), "{lines:?}");
    let decoded = out.unwrap();
    let member: Arc<Member> = decoded.downcast().unwrap();
    assert_eq!(member.first_name, "Yang");
    assert!(member.attrs.is_empty());

    // the instance's structural view matches the plain schema's decode
    let (plain, _) = decode_lines(&decoder, "IMember", &input);
    assert_eq!(plain.unwrap().to_value(), with_attrs);
    assert_eq!(decoded.to_value(), with_attrs);
    let structural: IMember = decoded.deserialize().unwrap();
    assert!(structural.attrs.is_empty());
    assert_eq!(decoder.encode("Member", &decoded).unwrap(), input);

    let seen = Arc::new(std::sync::Mutex::new(None));
    let sink = seen.clone();
    let decoder = Decoder::from_definitions([ClassBuilder::new(member_schema(), "Member", move |v: Value| {
        *sink.lock().unwrap() = Some(v);
        Ok(())
    })])
    .unwrap();
    assert!(decode_lines(&decoder, "Member", &input).0.is_some());
    assert_eq!(seen.lock().unwrap().clone(), Some(with_attrs));
}

#[test]
fn caster_builders_register_custom_types() {
    let zip = caster::matching("ZipCode", regex::Regex::new(r"^\d{5}$").unwrap());
    let mut registry = Registry::new();
    registry.register(CasterBuilder::new("ZipCode", zip)).unwrap();
    registry.register(Schema::new("Address", vec![Property::required("zip", Ty::reference("ZipCode"))])).unwrap();
    let decoder = registry.finish();

    assert!(decode_lines(&decoder, "Address", &json!({"zip": "94103"})).0.is_some());
    let (_, lines) = decode_lines(&decoder, "Address", &json!({"zip": "9410"}));
    assert_eq!(lines, ["Address.zip: expected ZipCode, got \"9410\""]);
}

// ————————————————————————————————————————————————————————————————————————————
// BUILT-INS
// ————————————————————————————————————————————————————————————————————————————

fn try_builtins() -> Schema {
    Schema::new("TryBuiltins", vec![
        Property::required("date", Ty::reference("Date")),
        Property::required("lat", Ty::reference("Latitude")),
        Property::required("lng", Ty::reference("Longitude")),
        Property::required("note", Ty::reference("NonEmptyString")),
    ])
}

#[test]
fn builtin_casters_decode_and_report() {
    let mut registry = Registry::with_builtins().unwrap();
    registry.register(try_builtins()).unwrap();
    let decoder = registry.finish();

    let good = json!({"lat": 80, "lng": 107, "note": "less sugar, no ice", "date": "2019-12-02T02:03:06.783Z"});
    let (out, _) = decode_lines(&decoder, "TryBuiltins", &good);
    let out = out.unwrap();
    assert!(out.get("date").unwrap().downcast::<DateTime<Utc>>().is_some());
    assert_eq!(out.get("lat").and_then(Decoded::as_f64), Some(80.0));
    assert_eq!(decoder.encode("TryBuiltins", &out).unwrap(), good);

    let bad = json!({"lat": 10000, "lng": "107", "note": "", "date": "19 Dec 25th"});
    let (out, lines) = decode_lines(&decoder, "TryBuiltins", &bad);
    assert!(out.is_none());
    assert_eq!(lines, [
        "TryBuiltins.date: expected Date, got \"19 Dec 25th\"",
        "TryBuiltins.lat: expected Latitude, got 10000",
        "TryBuiltins.lng: expected number, got \"107\"",
        "TryBuiltins.note: expected NonEmptyString, got \"\"",
    ]);
}

#[test]
fn constructed_values_survive_optional_parts() {
    let mut registry = Registry::with_builtins().unwrap();
    registry.register(Schema::new("Shift", vec![
        Property::required("clockIn", Ty::reference("Date")),
        Property::optional("note", Ty::string()),
    ])).unwrap();
    let decoder = registry.finish();

    let (out, _) = decode_lines(&decoder, "Shift", &json!({"clockIn": "2019-12-02T02:03:06Z", "note": "late"}));
    let out = out.unwrap();
    assert!(out.get("clockIn").unwrap().downcast::<DateTime<Utc>>().is_some());
    assert_eq!(
        decoder.encode("Shift", &out).unwrap(),
        json!({"clockIn": "2019-12-02T02:03:06.000Z", "note": "late"})
    );
}

// ————————————————————————————————————————————————————————————————————————————
// SETUP ERRORS
// ————————————————————————————————————————————————————————————————————————————

#[test]
fn duplicate_registration_keeps_the_first() {
    let mut registry = Registry::new();
    registry.register_all([location(), marker(), user()]).unwrap();
    let duplicate = Schema::new("User", vec![Property::required("value", Ty::string())]);
    let err = registry.register(duplicate).unwrap_err();
    assert_eq!(err.to_string(), "type 'User' already registered");

    let decoder = registry.finish();
    assert!(decode_lines(&decoder, "User", &good_user()).0.is_some());
    assert!(decode_lines(&decoder, "User", &json!({"value": "x"})).0.is_none());
}

#[test]
fn recursive_definitions_are_rejected() {
    let tree = Schema::new("Tree", vec![
        Property::required("value", Ty::number()),
        Property::optional("left", Ty::reference("Tree")),
        Property::optional("right", Ty::reference("Tree")),
    ]);
    let err = Decoder::from_definitions([tree]).unwrap_err();
    assert_eq!(err.root(), &SetupError::CyclicDefinition { name: "Tree".into() });
}

#[test]
fn out_of_order_batches_name_the_dependency() {
    let lat_lng = Schema::new("LatLng", vec![
        Property::required("lat", Ty::number()),
        Property::required("lng", Ty::number()),
    ]);
    let order = Schema::new("Order", vec![
        Property::required("price", Ty::number()),
        Property::required("position", Ty::reference("LatLng")),
    ]);
    let err = Decoder::from_definitions([order, lat_lng]).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("depends"), "{message}");
    assert!(message.contains("LatLng"), "{message}");
    assert!(message.starts_with("Order.position: "), "{message}");
}

#[test]
fn empty_and_special_types_are_rejected() {
    let err = Decoder::from_definitions([Schema::new("Nothing", vec![])]).unwrap_err();
    assert!(err.to_string().contains("empty"));

    for keyword in ["any", "unknown"] {
        let doc = format!(r#"{{"name": "WithSpecial", "props": [{{"name": "x", "type": "{keyword}", "optional": false}}]}}"#);
        let err = schema_file::from_str(&doc).unwrap_err();
        assert!(err.to_string().contains("illegal decoder type"), "{err}");
    }
}

#[test]
fn failed_registration_leaves_registry_usable() {
    let mut registry = Registry::new();
    registry.declare_all(["Order"]);
    let order = Schema::new("Order", vec![Property::required("position", Ty::reference("LatLng"))]);
    assert!(registry.register(order.clone()).is_err());
    assert_eq!(registry.state("Order"), Some(EntryState::Pending));

    registry.register(location()).unwrap();
    registry.register(Schema::new("LatLng", vec![Property::required("at", Ty::reference("Location"))])).unwrap();
    registry.register(order).unwrap();
    assert_eq!(registry.state("Order"), Some(EntryState::Resolved));
}

#[test]
fn unknown_targets_are_errors_not_rejections() {
    let decoder = sample_decoder();
    let err = decoder.decode("Nope", &json!({}), |_| panic!("not a validation error")).unwrap_err();
    assert!(matches!(err, DecodeError::Unresolved(SetupError::UnknownType { .. })));
    let err = decoder.decode(Target::generic("Set", "User"), &json!([]), |_| {}).unwrap_err();
    assert!(matches!(err, DecodeError::Unresolved(SetupError::UnknownFactory { .. })));
}

// ————————————————————————————————————————————————————————————————————————————
// SCHEMA DOCUMENTS + CONCURRENCY
// ————————————————————————————————————————————————————————————————————————————

#[test]
fn schema_documents_register_like_hand_built_schemas() {
    let schemas = schema_file::from_str(r#"[
        {"name": "Location", "props": [
            {"name": "lat", "type": "number", "optional": false},
            {"name": "lng", "type": "number", "optional": false}
        ]},
        {"name": "Trip", "props": [
            {"name": "stops", "type": {"arrayElementType": {"referenceName": "Location"}}, "optional": false},
            {"name": "driver", "type": {"unionMembers": ["string", null]}, "optional": true}
        ]}
    ]"#).unwrap();
    let decoder = Decoder::from_definitions(schemas).unwrap();
    let trip = json!({"stops": [{"lat": 1, "lng": 2}], "driver": null});
    assert_eq!(decode_lines(&decoder, "Trip", &trip).0.unwrap().to_value(), trip);
}

#[test]
fn decoder_serves_many_threads() {
    let decoder = Arc::new(sample_decoder());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let decoder = Arc::clone(&decoder);
            std::thread::spawn(move || {
                let input = if i % 2 == 0 { good_user() } else { json!({"name": i}) };
                decoder.decode("User", &input, |_| {}).unwrap().is_some()
            })
        })
        .collect();
    let results: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results, [true, false, true, false]);
}
