//! Encode a record, print its wire form, and decode it back.

use modelwire::{
    decode_model, encode_model, entity_from_bytes, entity_to_bytes, DecodeContext, EncodeContext,
    EnumDomain, GeoPt, Instance, Key, Payload, PropValue, Property, PropertyType, Schema,
    SchemaRegistry, WireValue,
};

fn format_value(v: &WireValue) -> String {
    let body = match &v.payload {
        Payload::Str(s) => format!("\"{}\"", s),
        Payload::Bytes(b) => format!("BYTES[{}]", b.len()),
        Payload::Int(i) => format!("{}", i),
        Payload::Double(d) => format!("{:.6}", d),
        Payload::Bool(b) => format!("{}", b),
        Payload::Timestamp(t) => format!("TIMESTAMP({})", t),
        Payload::Entity(e) => format!("ENTITY({}, {} fields)", e.key.kind, e.len()),
        Payload::Array(items) => format!("ARRAY[{}]", items.len()),
    };
    if v.indexed {
        body
    } else {
        format!("{} (unindexed)", body)
    }
}

fn main() {
    let items = Schema::builder("Items")
        .property(Property::boolean("has_hat").with_wire_name("hh"))
        .property(Property::integer("number_of_socks").with_wire_name("ns"))
        .build()
        .expect("Items schema");

    let gender = EnumDomain::new("Gender", [("male", 1), ("female", 2), ("neutral", 3)])
        .expect("Gender domain");

    let human = Schema::builder("Human")
        .property(Property::string("name").with_wire_name("na"))
        .property(Property::enumeration("gender", gender.clone()).with_wire_name("g"))
        .property(Property::integer("age").with_wire_name("ag").unindexed())
        .property(Property::structured("items", items.clone()).with_wire_name("i"))
        .property(Property::string("hobbies").with_wire_name("hob").repeated().unindexed())
        .property(Property::geo_pt("home").with_wire_name("ho").unindexed())
        .property(Property::computed(
            "number_of_hobbies",
            PropertyType::Integer,
            |i| {
                let n = i.get("hobbies").and_then(PropValue::as_list).map_or(0, |h| h.len());
                Ok(PropValue::Int(n as i64))
            },
        ))
        .property(Property::string("default_info").with_wire_name("di").with_default("unknown"))
        .build()
        .expect("Human schema");

    let mut registry = SchemaRegistry::new();
    registry.register(human.clone()).expect("register Human");

    let mut arthur = Instance::build(human)
        .key(Key::new("Human").with_namespace("your-namespace"))
        .with("name", "Arthur Dent")
        .with("gender", gender.member("male").expect("member").clone())
        .with("age", 42i64)
        .with(
            "items",
            Instance::build(items)
                .with("has_hat", true)
                .with("number_of_socks", 3i64)
                .build()
                .expect("Items record"),
        )
        .with("hobbies", vec!["football", "tv"])
        .with("home", GeoPt::new(52.37, 4.88).expect("home"))
        .build()
        .expect("Arthur");

    let ctx = EncodeContext::new().with_project("kunstakrobaten");
    let entity = encode_model(&mut arthur, &ctx).expect("encode");

    println!("=== Entity ===");
    println!("Kind: {}", entity.key.kind);
    println!("Namespace: {:?}", entity.key.namespace);
    println!("Project: {:?}", entity.key.project);
    for (name, value) in entity.iter() {
        println!("  {} = {}", name, format_value(value));
    }

    let bytes = entity_to_bytes(&entity).expect("serialize");
    println!("\nSerialized: {} bytes", bytes.len());

    let entity = entity_from_bytes(&bytes).expect("parse");
    let recovered = decode_model(&entity, &DecodeContext::new(&registry)).expect("decode");

    println!("\n=== Recovered ===");
    println!("name = {:?}", recovered.get("name"));
    println!("number_of_hobbies = {:?}", recovered.get("number_of_hobbies"));
    println!("default_info = {:?}", recovered.get("default_info"));
}
