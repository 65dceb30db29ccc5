//! modelwire: typed models over a weakly-typed entity wire format.
//!
//! This crate converts typed application records ("models") to and from the
//! generic entity shape of a document store (key + flat map of tagged
//! values) with full type fidelity. A model's schema is a declarative table
//! of named, typed properties — each with its own storage representation,
//! compression, validation and default/derivation rules — and the codec
//! dispatches per property to a fixed encode/decode strategy.
//!
//! # Quick Start
//!
//! ```rust
//! use modelwire::{
//!     decode_model, encode_model, DecodeContext, EncodeContext, Instance, PropValue,
//!     Property, PropertyType, Schema, SchemaRegistry,
//! };
//!
//! # fn main() -> Result<(), modelwire::ModelError> {
//! // Declare the schema once, at startup.
//! let person = Schema::builder("Person")
//!     .property(Property::string("name").with_wire_name("na"))
//!     .property(Property::string("hobbies").with_wire_name("hob").repeated().unindexed())
//!     .property(Property::computed("number_of_hobbies", PropertyType::Integer, |i| {
//!         let n = i.get("hobbies").and_then(PropValue::as_list).map_or(0, |h| h.len());
//!         Ok(PropValue::Int(n as i64))
//!     }))
//!     .build()?;
//!
//! let mut registry = SchemaRegistry::new();
//! registry.register(person.clone())?;
//!
//! // Build an instance and convert it to a wire entity.
//! let mut arthur = Instance::build(person)
//!     .with("name", "Arthur Dent")
//!     .with("hobbies", vec!["football", "tv"])
//!     .build()?;
//! let entity = encode_model(&mut arthur, &EncodeContext::new())?;
//!
//! // Convert back; the schema is resolved from the entity's kind.
//! let decoded = decode_model(&entity, &DecodeContext::new(&registry))?;
//! assert_eq!(decoded.get("name"), Some(&PropValue::Str("Arthur Dent".into())));
//! assert_eq!(decoded.get("number_of_hobbies"), Some(&PropValue::Int(2)));
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`model`]: schemas, properties, instances, enum domains, registries
//! - [`wire`]: the wire-level data model (Key, Entity, tagged values)
//! - [`codec`]: the conversion algorithms and binary helpers
//! - [`error`]: the error taxonomy
//! - [`limits`]: security limits for decoding untrusted payloads
//!
//! # Safety gate
//!
//! Pickled payloads can encode arbitrary value trees, so decoding them is
//! opt-in per [`DecodeContext`]: without
//! [`DecodeContext::allow_pickled`] a pickled value fails the decode,
//! never silently skips. The gate is a context field, not process-global
//! state, so concurrent decodes with different trust levels don't
//! interfere.

pub mod codec;
pub mod error;
pub mod limits;
pub mod model;
pub mod util;
pub mod wire;

// Re-export commonly used types at crate root
pub use codec::{
    decode_model, encode_model, entity_from_bytes, entity_to_bytes, DecodeContext, EncodeContext,
};
pub use error::{DecodeError, FormatError, ModelError, SchemaError, ValidationError};
pub use model::{
    EnumDomain, EnumMember, GeoPt, Instance, InstanceBuilder, LocalDate, LocalTime, MessageCodec,
    MessageRegistry, MessageValue, PropValue, Property, PropertyType, Schema, SchemaRegistry,
    UtcDateTime,
};
pub use wire::{Entity, Key, KeyId, Meaning, Payload, WireValue};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
