//! Model <-> entity conversion.
//!
//! [`encode_model`] turns a typed instance into a wire entity;
//! [`decode_model`] resolves the schema from the entity's kind and converts
//! back. Per-type strategies live in [`strategy`], binary helpers for
//! local-structured blobs in [`entity`] and [`primitives`].

pub mod compress;
pub mod decode;
pub mod encode;
pub mod entity;
pub mod pickle;
pub mod primitives;
pub mod strategy;

pub use decode::{decode_model, DecodeContext};
pub use encode::{encode_model, EncodeContext};
pub use entity::{entity_from_bytes, entity_to_bytes};
pub use primitives::{zigzag_decode, zigzag_encode, Reader, Writer};

#[cfg(test)]
mod tests;
