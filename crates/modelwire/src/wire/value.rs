//! Wire-level values.
//!
//! A wire value is one primitive payload plus an indexed flag and a semantic
//! meaning tag. The meaning, not the payload shape, tells the decoder how to
//! interpret byte payloads: compressed text, pickled objects and JSON all
//! arrive as raw bytes.

use serde::{Deserialize, Serialize};

use crate::wire::Entity;

/// Semantic tag attached to a wire value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Meaning {
    #[default]
    Plain = 0,
    /// Bytes payload holding zlib-deflated text or bytes.
    Compressed = 1,
    /// Bytes payload holding a pickled value tree.
    Pickled = 2,
    /// Bytes payload holding JSON text.
    Json = 3,
    /// Entity payload holding a packed lat/lon pair.
    GeoPoint = 4,
    /// Bytes payload holding an externally defined message.
    Message = 5,
}

impl Meaning {
    /// Creates a Meaning from its wire representation.
    pub fn from_u8(v: u8) -> Option<Meaning> {
        match v {
            0 => Some(Meaning::Plain),
            1 => Some(Meaning::Compressed),
            2 => Some(Meaning::Pickled),
            3 => Some(Meaning::Json),
            4 => Some(Meaning::GeoPoint),
            5 => Some(Meaning::Message),
            _ => None,
        }
    }
}

/// The primitive payload of a wire value.
///
/// Exactly one slot is populated. Timestamps are signed microseconds since
/// the Unix epoch (UTC) and are a slot of their own, distinct from plain
/// integers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    Str(String),
    Bytes(Vec<u8>),
    Int(i64),
    Double(f64),
    Bool(bool),
    Timestamp(i64),
    Entity(Entity),
    Array(Vec<WireValue>),
}

impl Payload {
    /// Returns a short name for the populated slot, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Payload::Str(_) => "string",
            Payload::Bytes(_) => "bytes",
            Payload::Int(_) => "integer",
            Payload::Double(_) => "double",
            Payload::Bool(_) => "boolean",
            Payload::Timestamp(_) => "timestamp",
            Payload::Entity(_) => "entity",
            Payload::Array(_) => "array",
        }
    }
}

/// A tagged wire value: payload + indexed flag + meaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireValue {
    pub payload: Payload,
    pub indexed: bool,
    pub meaning: Meaning,
}

impl WireValue {
    /// Creates an indexed, plain value from a payload.
    pub fn new(payload: Payload) -> Self {
        Self {
            payload,
            indexed: true,
            meaning: Meaning::Plain,
        }
    }

    pub fn string(s: impl Into<String>) -> Self {
        Self::new(Payload::Str(s.into()))
    }

    pub fn bytes(b: impl Into<Vec<u8>>) -> Self {
        Self::new(Payload::Bytes(b.into()))
    }

    pub fn integer(i: i64) -> Self {
        Self::new(Payload::Int(i))
    }

    pub fn double(d: f64) -> Self {
        Self::new(Payload::Double(d))
    }

    pub fn boolean(b: bool) -> Self {
        Self::new(Payload::Bool(b))
    }

    pub fn timestamp(micros: i64) -> Self {
        Self::new(Payload::Timestamp(micros))
    }

    pub fn entity(e: Entity) -> Self {
        Self::new(Payload::Entity(e))
    }

    pub fn array(values: Vec<WireValue>) -> Self {
        Self::new(Payload::Array(values))
    }

    /// Clears the indexed flag.
    pub fn unindexed(mut self) -> Self {
        self.indexed = false;
        self
    }

    /// Sets the meaning tag.
    pub fn with_meaning(mut self, meaning: Meaning) -> Self {
        self.meaning = meaning;
        self
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.payload {
            Payload::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.payload {
            Payload::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match &self.payload {
            Payload::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match &self.payload {
            Payload::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match &self.payload {
            Payload::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<i64> {
        match &self.payload {
            Payload::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<&Entity> {
        match &self.payload {
            Payload::Entity(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[WireValue]> {
        match &self.payload {
            Payload::Array(v) => Some(v),
            _ => None,
        }
    }
}
