//! The wire-level data model: keys, tagged values and entities.
//!
//! This is the generic, weakly typed shape exchanged with the remote store.
//! The typed view lives in [`crate::model`]; [`crate::codec`] converts
//! between the two.

pub mod entity;
pub mod key;
pub mod value;

pub use entity::Entity;
pub use key::{Key, KeyId};
pub use value::{Meaning, Payload, WireValue};
