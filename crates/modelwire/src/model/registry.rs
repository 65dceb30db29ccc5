//! Caller-supplied registries consulted at decode time.
//!
//! The schema registry resolves an incoming entity's kind to its schema.
//! The message registry resolves externally defined payload types to their
//! codecs; decoding a message property whose type is not registered fails.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::{ModelError, SchemaError};
use crate::model::Schema;

/// Maps kind names to schemas for decode-time resolution.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    kinds: FxHashMap<String, Arc<Schema>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a schema under its kind name.
    pub fn register(&mut self, schema: Arc<Schema>) -> Result<(), SchemaError> {
        let kind = schema.kind().to_string();
        if self.kinds.contains_key(&kind) {
            return Err(SchemaError::DuplicateKind { kind });
        }
        self.kinds.insert(kind, schema);
        Ok(())
    }

    /// Resolves a kind name to its schema.
    pub fn resolve(&self, kind: &str) -> Option<&Arc<Schema>> {
        self.kinds.get(kind)
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

/// An opaque, externally defined message payload.
///
/// The payload is kept in its own self-describing serialization; the codec
/// only routes the bytes and checks the type name against the property
/// declaration and the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageValue {
    type_name: String,
    bytes: Vec<u8>,
}

impl MessageValue {
    pub fn new(type_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            type_name: type_name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Codec for one externally defined message type.
///
/// Implementations parse the payload with the type's own deserializer and
/// hand back a validated [`MessageValue`]; malformed bytes must surface a
/// decode error rather than a lossy value.
pub trait MessageCodec: Send + Sync {
    /// The fully qualified type name this codec handles.
    fn type_name(&self) -> &str;

    /// Parses and validates a wire payload.
    fn parse(&self, bytes: &[u8]) -> Result<MessageValue, ModelError>;
}

/// Maps message type names to codecs.
#[derive(Default)]
pub struct MessageRegistry {
    codecs: FxHashMap<String, Arc<dyn MessageCodec>>,
}

impl MessageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a codec under its type name.
    pub fn register(&mut self, codec: Arc<dyn MessageCodec>) -> Result<(), SchemaError> {
        let type_name = codec.type_name().to_string();
        if self.codecs.contains_key(&type_name) {
            return Err(SchemaError::DuplicateMessageType { type_name });
        }
        self.codecs.insert(type_name, codec);
        Ok(())
    }

    /// Resolves a type name to its codec.
    pub fn resolve(&self, type_name: &str) -> Option<&Arc<dyn MessageCodec>> {
        self.codecs.get(type_name)
    }
}
