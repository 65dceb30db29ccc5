//! The application-level typed model: schemas, properties, instances and
//! the registries consulted at decode time.
//!
//! Schemas are built once via [`Schema::builder`] and shared as immutable
//! `Arc`s; instances are the typed records the codec converts to and from
//! wire entities.

pub mod builder;
pub mod enums;
pub mod instance;
pub mod property;
pub mod registry;
pub mod schema;
pub mod value;

pub use builder::InstanceBuilder;
pub use enums::{EnumDomain, EnumMember};
pub use instance::Instance;
pub use property::{ComputeFn, Property, PropertyType};
pub use registry::{MessageCodec, MessageRegistry, MessageValue, SchemaRegistry};
pub use schema::{PreEncodeHook, Schema, SchemaBuilder};
pub use value::{GeoPt, LocalDate, LocalTime, PropValue, UtcDateTime};
