//! End-to-end conversion tests over a full schema.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::codec::{decode_model, encode_model, entity_from_bytes, entity_to_bytes, DecodeContext, EncodeContext};
use crate::error::{DecodeError, ModelError, SchemaError, ValidationError};
use crate::model::{
    EnumDomain, GeoPt, Instance, LocalDate, LocalTime, MessageCodec, MessageRegistry, MessageValue,
    PropValue, Property, PropertyType, Schema, SchemaRegistry, UtcDateTime,
};
use crate::wire::{Entity, Key, KeyId, Meaning, Payload, WireValue};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Phone {
    number: String,
    r#type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Person {
    id: i64,
    name: String,
    email: String,
    phones: Vec<Phone>,
}

struct PersonCodec;

impl MessageCodec for PersonCodec {
    fn type_name(&self) -> &str {
        "test.Person"
    }

    fn parse(&self, bytes: &[u8]) -> Result<MessageValue, ModelError> {
        serde_json::from_slice::<Person>(bytes).map_err(|e| {
            ModelError::from(DecodeError::MalformedMessage {
                type_name: self.type_name().to_string(),
                reason: e.to_string(),
            })
        })?;
        Ok(MessageValue::new(self.type_name(), bytes))
    }
}

fn pack_person(person: &Person) -> MessageValue {
    MessageValue::new("test.Person", serde_json::to_vec(person).unwrap())
}

fn items_schema() -> Arc<Schema> {
    Schema::builder("Items")
        .property(Property::boolean("has_hat").with_wire_name("hh"))
        .property(Property::integer("number_of_socks").with_wire_name("ns"))
        .build()
        .unwrap()
}

fn gender_domain() -> Arc<EnumDomain> {
    EnumDomain::new("Gender", [("male", 1), ("female", 2), ("neutral", 3)]).unwrap()
}

fn human_schema(items: &Arc<Schema>, gender: &Arc<EnumDomain>) -> Arc<Schema> {
    Schema::builder("Human")
        .property(Property::string("name").with_wire_name("na"))
        .property(Property::enumeration("gender", gender.clone()).with_wire_name("g").required())
        .property(Property::integer("age").with_wire_name("ag").unindexed())
        .property(Property::structured("items", items.clone()).with_wire_name("i").required())
        .property(Property::json("numbers").with_wire_name("json"))
        .property(Property::text("description").with_wire_name("t"))
        .property(Property::text("description2").with_wire_name("t2").compressed())
        .property(Property::float("meters_tall").with_wire_name("mtrs").unindexed())
        .property(Property::date_time("datetime_of_birth").with_wire_name("dtb").unindexed())
        .property(Property::date("date_of_birth").with_wire_name("db").unindexed())
        .property(Property::time("time_of_birth").with_wire_name("tb").unindexed())
        .property(Property::string("hobbies").with_wire_name("hob").repeated().unindexed())
        .property(Property::pickle("pickle").with_wire_name("pi"))
        .property(Property::blob("binary").with_wire_name("bi"))
        .property(Property::geo_pt("home").with_wire_name("ho").unindexed())
        .property(Property::generic("generic").with_wire_name("gen").unindexed())
        .property(Property::local_structured("model", items.clone()).with_wire_name("mo"))
        .property(Property::message("person_details", "test.Person").with_wire_name("pd"))
        .property(Property::computed(
            "number_of_hobbies",
            PropertyType::Integer,
            |instance| {
                let n = instance
                    .get("hobbies")
                    .and_then(PropValue::as_list)
                    .map_or(0, <[_]>::len);
                Ok(PropValue::Int(n as i64))
            },
        ).with_wire_name("num_hob"))
        .property(Property::string("default_info").with_wire_name("di").unindexed().with_default("unknown"))
        .property(Property::date_time("update").with_wire_name("up").unindexed().auto_now())
        .build()
        .unwrap()
}

fn registries() -> (SchemaRegistry, MessageRegistry, Arc<Schema>, Arc<Schema>) {
    let items = items_schema();
    let human = human_schema(&items, &gender_domain());

    let mut schemas = SchemaRegistry::new();
    schemas.register(human.clone()).unwrap();

    let mut messages = MessageRegistry::new();
    messages.register(Arc::new(PersonCodec)).unwrap();

    (schemas, messages, human, items)
}

fn birth() -> UtcDateTime {
    UtcDateTime::from_civil(2017, 8, 26, 15, 10, 42, 123_456).unwrap()
}

fn arthur(human: &Arc<Schema>, items: &Arc<Schema>) -> Instance {
    let gender = gender_domain();
    let football_at = birth();
    let mut pickled_entry = std::collections::BTreeMap::new();
    pickled_entry.insert("football_at".to_string(), PropValue::DateTime(football_at));

    let person = Person {
        id: 1234,
        name: "John Doe".to_string(),
        email: "jdoe@example.com".to_string(),
        phones: vec![Phone {
            number: "555-4321".to_string(),
            r#type: "home".to_string(),
        }],
    };

    let items_value = |n: i64| {
        Instance::build(items.clone())
            .with("has_hat", true)
            .with("number_of_socks", n)
            .build()
            .unwrap()
    };

    Instance::build(human.clone())
        .key(Key::new("Human").with_namespace("your-namespace"))
        .with("name", "Arthur Dent")
        .with("gender", gender.member("male").unwrap().clone())
        .with("age", 42i64)
        .with("items", items_value(3))
        .with("numbers", serde_json::json!([12, 13, 14]))
        .with("description", "a real man")
        .with("description2", "a real man, oh yeah")
        .with("meters_tall", 1.82)
        .with("datetime_of_birth", birth())
        .with("date_of_birth", LocalDate::new(2017, 8, 26).unwrap())
        .with("time_of_birth", LocalTime::new(15, 10, 42, 123_456).unwrap())
        .with("hobbies", vec!["football", "tv"])
        .with("pickle", PropValue::List(vec![PropValue::Map(pickled_entry)]))
        .with("binary", vec![0x61u8, 0x62, 0x63, 0x00])
        .with("home", GeoPt::new(52.37, 4.88).unwrap())
        .with("generic", 7i64)
        .with("model", items_value(3))
        .with("person_details", pack_person(&person))
        .build()
        .unwrap()
}

#[test]
fn test_complex_model_roundtrip() {
    let (schemas, messages, human, items) = registries();
    let mut instance = arthur(&human, &items);

    let ctx = EncodeContext::new().with_project("kunstakrobaten");
    let entity = encode_model(&mut instance, &ctx).unwrap();

    // Push the entity through the binary form as a transport stand-in.
    let bytes = entity_to_bytes(&entity).unwrap();
    let entity = entity_from_bytes(&bytes).unwrap();

    let decode_ctx = DecodeContext::new(&schemas)
        .with_messages(&messages)
        .allow_pickled();
    let recovered = decode_model(&entity, &decode_ctx).unwrap();

    assert_eq!(recovered.get("name"), Some(&PropValue::Str("Arthur Dent".into())));
    assert_eq!(
        recovered.get("gender").map(|v| match v {
            PropValue::Enum(m) => (m.name.as_str(), m.number),
            _ => panic!("expected enum"),
        }),
        Some(("male", 1))
    );
    assert_eq!(recovered.get("age"), Some(&PropValue::Int(42)));

    let nested = recovered.get("items").and_then(PropValue::as_record).unwrap();
    assert_eq!(nested.get("has_hat"), Some(&PropValue::Bool(true)));
    assert_eq!(nested.get("number_of_socks"), Some(&PropValue::Int(3)));

    assert_eq!(
        recovered.get("numbers"),
        Some(&PropValue::Json(serde_json::json!([12, 13, 14])))
    );
    assert_eq!(
        recovered.get("description"),
        Some(&PropValue::Str("a real man".into()))
    );
    assert_eq!(
        recovered.get("description2"),
        Some(&PropValue::Str("a real man, oh yeah".into()))
    );
    assert_eq!(recovered.get("meters_tall"), Some(&PropValue::Float(1.82)));
    assert_eq!(recovered.get("datetime_of_birth"), Some(&PropValue::DateTime(birth())));
    assert_eq!(
        recovered.get("date_of_birth"),
        Some(&PropValue::Date(LocalDate::new(2017, 8, 26).unwrap()))
    );
    assert_eq!(
        recovered.get("time_of_birth"),
        Some(&PropValue::Time(LocalTime::new(15, 10, 42, 123_456).unwrap()))
    );
    assert_eq!(
        recovered.get("hobbies"),
        Some(&PropValue::from(vec!["football", "tv"]))
    );

    let pickled = recovered.get("pickle").and_then(PropValue::as_list).unwrap();
    let PropValue::Map(entry) = &pickled[0] else {
        panic!("expected pickled map");
    };
    assert_eq!(entry.get("football_at"), Some(&PropValue::DateTime(birth())));

    assert_eq!(
        recovered.get("binary"),
        Some(&PropValue::Bytes(vec![0x61, 0x62, 0x63, 0x00]))
    );

    let PropValue::GeoPt(home) = recovered.get("home").unwrap() else {
        panic!("expected geo point");
    };
    assert!((home.lat() - 52.37).abs() < 1e-9);
    assert!((home.lon() - 4.88).abs() < 1e-9);

    assert_eq!(recovered.get("generic"), Some(&PropValue::Int(7)));

    let local = recovered.get("model").and_then(PropValue::as_record).unwrap();
    assert_eq!(local.get("has_hat"), Some(&PropValue::Bool(true)));
    assert_eq!(local.get("number_of_socks"), Some(&PropValue::Int(3)));

    let PropValue::Message(details) = recovered.get("person_details").unwrap() else {
        panic!("expected message");
    };
    let person: Person = serde_json::from_slice(details.bytes()).unwrap();
    assert_eq!(person.phones[0].number, "555-4321");

    // Set automatically.
    assert_eq!(recovered.get("number_of_hobbies"), Some(&PropValue::Int(2)));
    assert_eq!(
        recovered.get("default_info"),
        Some(&PropValue::Str("unknown".into()))
    );
    assert!(matches!(
        recovered.get("update"),
        Some(PropValue::DateTime(_))
    ));

    // Key round-trips independently of the property map.
    let key = recovered.key().unwrap();
    assert_eq!(key.kind, "Human");
    assert_eq!(key.namespace.as_deref(), Some("your-namespace"));
    assert_eq!(key.project.as_deref(), Some("kunstakrobaten"));
    assert_eq!(key.id, KeyId::Unassigned);
}

#[test]
fn test_computed_property_not_written_to_wire() {
    let (_, _, human, items) = registries();
    let mut instance = arthur(&human, &items);
    let entity = encode_model(&mut instance, &EncodeContext::new()).unwrap();
    assert!(entity.get("num_hob").is_none());
}

#[test]
fn test_compressed_text_is_deflated_bytes() {
    let (_, _, human, items) = registries();
    let mut instance = arthur(&human, &items);
    let entity = encode_model(&mut instance, &EncodeContext::new()).unwrap();

    let value = entity.get("t2").unwrap();
    assert_eq!(value.meaning, Meaning::Compressed);
    assert!(!value.indexed);
    let Payload::Bytes(bytes) = &value.payload else {
        panic!("compressed text must be a bytes payload");
    };
    // zlib container magic.
    assert_eq!(bytes[0], 0x78);

    // Uncompressed text stays a string payload.
    assert!(matches!(entity.get("t").unwrap().payload, Payload::Str(_)));
}

#[test]
fn test_pickle_gate_enforced() {
    let (schemas, messages, human, items) = registries();
    let mut instance = arthur(&human, &items);
    let entity = encode_model(&mut instance, &EncodeContext::new()).unwrap();

    // Gate off: hard failure.
    let gated = DecodeContext::new(&schemas).with_messages(&messages);
    let err = decode_model(&entity, &gated).unwrap_err();
    assert!(matches!(
        err,
        ModelError::Decode(DecodeError::UnsafeDecodeDisabled { .. })
    ));

    // Gate on: full recovery.
    let open = DecodeContext::new(&schemas)
        .with_messages(&messages)
        .allow_pickled();
    assert!(decode_model(&entity, &open).is_ok());
}

#[test]
fn test_unknown_enum_number_fails() {
    let (schemas, messages, _, _) = registries();
    let entity = Entity::new(Key::new("Human"))
        .with_property("g", WireValue::integer(9))
        .with_property("i", WireValue::entity(Entity::new(Key::new("Items"))));

    let ctx = DecodeContext::new(&schemas).with_messages(&messages);
    let err = decode_model(&entity, &ctx).unwrap_err();
    assert!(matches!(
        err,
        ModelError::Decode(DecodeError::UnknownEnumNumber { number: 9, .. })
    ));
}

#[test]
fn test_unregistered_message_type_fails() {
    let (schemas, _, human, items) = registries();
    let mut instance = arthur(&human, &items);
    let entity = encode_model(&mut instance, &EncodeContext::new()).unwrap();

    // No message registry supplied at all.
    let ctx = DecodeContext::new(&schemas).allow_pickled();
    let err = decode_model(&entity, &ctx).unwrap_err();
    assert!(matches!(
        err,
        ModelError::Decode(DecodeError::UnregisteredMessageType { .. })
    ));
}

#[test]
fn test_repeated_structured_preserves_alignment() {
    let items = items_schema();
    let schema = Schema::builder("Wardrobe")
        .property(Property::structured("outfits", items.clone()).repeated())
        .build()
        .unwrap();
    let mut schemas = SchemaRegistry::new();
    schemas.register(schema.clone()).unwrap();

    let outfit = |hat: bool, socks: i64| {
        PropValue::Record(
            Instance::build(items.clone())
                .with("has_hat", hat)
                .with("number_of_socks", socks)
                .build()
                .unwrap(),
        )
    };

    let mut wardrobe = Instance::build(schema)
        .with(
            "outfits",
            PropValue::List(vec![outfit(true, 3), outfit(false, 7), outfit(true, 1)]),
        )
        .build()
        .unwrap();

    let entity = encode_model(&mut wardrobe, &EncodeContext::new()).unwrap();

    // The wire form is an array of nested entities, one per element.
    let Payload::Array(elements) = &entity.get("outfits").unwrap().payload else {
        panic!("expected array payload");
    };
    assert_eq!(elements.len(), 3);
    assert!(elements.iter().all(|e| e.as_entity().is_some()));

    let recovered = decode_model(&entity, &DecodeContext::new(&schemas)).unwrap();
    let outfits = recovered.get("outfits").and_then(PropValue::as_list).unwrap();
    assert_eq!(outfits.len(), 3);
    let socks: Vec<i64> = outfits
        .iter()
        .map(|o| {
            o.as_record()
                .and_then(|r| r.get("number_of_socks"))
                .and_then(PropValue::as_int)
                .unwrap()
        })
        .collect();
    assert_eq!(socks, [3, 7, 1]);
}

#[test]
fn test_columnar_repeated_structured_transposed() {
    let items = items_schema();
    let schema = Schema::builder("Wardrobe")
        .property(Property::structured("outfits", items).repeated())
        .build()
        .unwrap();
    let mut schemas = SchemaRegistry::new();
    schemas.register(schema).unwrap();

    // Legacy writers emit one nested entity with positional sub-field
    // arrays instead of an array of entities.
    let columnar = Entity::new(Key::new("Items"))
        .with_property(
            "hh",
            WireValue::array(vec![WireValue::boolean(true), WireValue::boolean(false)]),
        )
        .with_property(
            "ns",
            WireValue::array(vec![WireValue::integer(3), WireValue::integer(7)]),
        );
    let entity =
        Entity::new(Key::new("Wardrobe")).with_property("outfits", WireValue::entity(columnar));

    let recovered = decode_model(&entity, &DecodeContext::new(&schemas)).unwrap();
    let outfits = recovered.get("outfits").and_then(PropValue::as_list).unwrap();
    assert_eq!(outfits.len(), 2);

    let first = outfits[0].as_record().unwrap();
    assert_eq!(first.get("has_hat"), Some(&PropValue::Bool(true)));
    assert_eq!(first.get("number_of_socks"), Some(&PropValue::Int(3)));
    let second = outfits[1].as_record().unwrap();
    assert_eq!(second.get("has_hat"), Some(&PropValue::Bool(false)));
    assert_eq!(second.get("number_of_socks"), Some(&PropValue::Int(7)));
}

#[test]
fn test_columnar_sibling_length_mismatch_rejected() {
    let items = items_schema();
    let schema = Schema::builder("Wardrobe")
        .property(Property::structured("outfits", items).repeated())
        .build()
        .unwrap();
    let mut schemas = SchemaRegistry::new();
    schemas.register(schema).unwrap();

    let columnar = Entity::new(Key::new("Items"))
        .with_property(
            "hh",
            WireValue::array(vec![WireValue::boolean(true), WireValue::boolean(false)]),
        )
        .with_property("ns", WireValue::array(vec![WireValue::integer(3)]));
    let entity =
        Entity::new(Key::new("Wardrobe")).with_property("outfits", WireValue::entity(columnar));

    let err = decode_model(&entity, &DecodeContext::new(&schemas)).unwrap_err();
    assert!(matches!(
        err,
        ModelError::Validation(ValidationError::SiblingLengthMismatch { .. })
    ));
}

#[test]
fn test_structured_preserves_nested_indexed_flags() {
    let items = items_schema();
    let schema = Schema::builder("Wearer")
        .property(Property::structured("items", items.clone()))
        .build()
        .unwrap();

    let mut wearer = Instance::build(schema)
        .with(
            "items",
            Instance::build(items)
                .with("has_hat", true)
                .with("number_of_socks", 3i64)
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();

    let entity = encode_model(&mut wearer, &EncodeContext::new()).unwrap();
    let nested = entity.get("items").unwrap().as_entity().unwrap();
    // Nested scalar fields keep their own indexed flags.
    assert!(nested.get("hh").unwrap().indexed);
    assert!(nested.get("ns").unwrap().indexed);
}

#[test]
fn test_local_structured_is_opaque_blob() {
    let items = items_schema();
    let schema = Schema::builder("Wearer")
        .property(Property::local_structured("model", items.clone()).with_wire_name("mo"))
        .build()
        .unwrap();

    let mut wearer = Instance::build(schema)
        .with(
            "model",
            Instance::build(items)
                .with("has_hat", true)
                .with("number_of_socks", 3i64)
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();

    let entity = encode_model(&mut wearer, &EncodeContext::new()).unwrap();
    let value = entity.get("mo").unwrap();
    assert!(!value.indexed);
    let Payload::Bytes(bytes) = &value.payload else {
        panic!("local structured must be a bytes payload");
    };
    // The blob parses back into a standalone entity.
    let standalone = entity_from_bytes(bytes).unwrap();
    assert_eq!(standalone.key.kind, "Items");
    assert_eq!(standalone.get("ns").and_then(WireValue::as_int), Some(3));
}

#[test]
fn test_compressed_local_structured_roundtrip() {
    let items = items_schema();
    let schema = Schema::builder("Wearer")
        .property(Property::local_structured("model", items.clone()).compressed())
        .build()
        .unwrap();
    let mut schemas = SchemaRegistry::new();
    schemas.register(schema.clone()).unwrap();

    let record = Instance::build(items)
        .with("has_hat", false)
        .with("number_of_socks", 12i64)
        .build()
        .unwrap();
    let mut wearer = Instance::build(schema).with("model", record).build().unwrap();

    let entity = encode_model(&mut wearer, &EncodeContext::new()).unwrap();
    assert_eq!(entity.get("model").unwrap().meaning, Meaning::Compressed);

    let recovered = decode_model(&entity, &DecodeContext::new(&schemas)).unwrap();
    let decoded = recovered.get("model").and_then(PropValue::as_record).unwrap();
    assert_eq!(decoded.get("number_of_socks"), Some(&PropValue::Int(12)));
}

#[test]
fn test_oversized_indexed_string_rejected() {
    let schema = Schema::builder("Indexed")
        .property(Property::string("s"))
        .build()
        .unwrap();

    let mut instance = Instance::build(schema)
        .with("s", "x".repeat(2000))
        .build()
        .unwrap();
    let err = encode_model(&mut instance, &EncodeContext::new()).unwrap_err();
    assert!(matches!(
        err,
        ModelError::Validation(ValidationError::IndexedValueTooLong { .. })
    ));
}

#[test]
fn test_unindexed_string_may_exceed_index_limit() {
    let schema = Schema::builder("Unindexed")
        .property(Property::string("s").unindexed())
        .build()
        .unwrap();

    let mut instance = Instance::build(schema)
        .with("s", "x".repeat(2000))
        .build()
        .unwrap();
    assert!(encode_model(&mut instance, &EncodeContext::new()).is_ok());
}

#[test]
fn test_duplicate_kind_registration_rejected() {
    let (mut schemas, _messages, human, _items) = registries();
    let err = schemas.register(human).unwrap_err();
    assert!(matches!(err, SchemaError::DuplicateKind { .. }));
}

#[test]
fn test_generic_property_dispatches_by_runtime_kind() {
    let schema = Schema::builder("Bag")
        .property(Property::generic("value").unindexed())
        .build()
        .unwrap();
    let mut schemas = SchemaRegistry::new();
    schemas.register(schema.clone()).unwrap();
    let ctx = DecodeContext::new(&schemas);

    let cases = [
        PropValue::Bool(true),
        PropValue::Int(7),
        PropValue::Float(1.82),
        PropValue::Str("seven".to_string()),
        PropValue::Bytes(vec![7u8]),
        PropValue::DateTime(birth()),
        PropValue::GeoPt(GeoPt::new(52.37, 4.88).unwrap()),
        PropValue::Json(serde_json::json!({"seven": 7})),
    ];

    for value in cases {
        let mut bag = Instance::new(schema.clone());
        bag.set("value", value.clone()).unwrap();
        let entity = encode_model(&mut bag, &EncodeContext::new()).unwrap();
        let recovered = decode_model(&entity, &ctx).unwrap();
        assert_eq!(recovered.get("value"), Some(&value), "failed for {:?}", value);
    }
}

#[test]
fn test_generic_timestamp_never_confused_with_integer() {
    let schema = Schema::builder("Bag")
        .property(Property::generic("value").unindexed())
        .build()
        .unwrap();
    let mut schemas = SchemaRegistry::new();
    schemas.register(schema.clone()).unwrap();

    let dt = birth();
    let mut bag = Instance::new(schema);
    bag.set("value", dt).unwrap();
    let entity = encode_model(&mut bag, &EncodeContext::new()).unwrap();

    // The timestamp slot is distinct from the integer slot on the wire.
    assert!(matches!(
        entity.get("value").unwrap().payload,
        Payload::Timestamp(_)
    ));
    let recovered = decode_model(&entity, &DecodeContext::new(&schemas)).unwrap();
    assert_eq!(recovered.get("value"), Some(&PropValue::DateTime(dt)));
}
