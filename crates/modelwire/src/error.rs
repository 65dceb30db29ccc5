//! Error types for model/entity conversion.
//!
//! Every failure is scoped to a single encode or decode call and is
//! non-retryable. The four kinds let callers tell bad data apart from a bad
//! schema or a disabled unsafe feature.

use thiserror::Error;

/// Error in the schema itself: definition-time problems and kind resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("no schema registered for kind {kind:?}")]
    UnknownKind { kind: String },

    #[error("schema {kind:?} already registered")]
    DuplicateKind { kind: String },

    #[error("schema {kind:?} declares property {name:?} more than once")]
    DuplicateProperty { kind: String, name: String },

    #[error("schema {kind:?} declares wire name {wire_name:?} more than once")]
    DuplicateWireName { kind: String, wire_name: String },

    #[error("property {property:?} is computed and cannot be assigned directly")]
    ComputedAssignment { property: String },

    #[error("schema {kind:?} has no property named {property:?}")]
    UnknownProperty { kind: String, property: String },

    #[error(
        "repeated structured property {property:?} embeds schema {nested:?} \
         which itself declares repeated properties"
    )]
    NestedRepeated { property: String, nested: String },

    #[error("property {property:?} does not support the {flag} flag")]
    UnsupportedFlag {
        property: String,
        flag: &'static str,
    },

    #[error("enum domain {domain:?} declares member {member:?} more than once")]
    DuplicateEnumMember { domain: String, member: String },

    #[error("enum domain {domain:?} declares number {number} more than once")]
    DuplicateEnumNumber { domain: String, number: i64 },

    #[error("message codec for type {type_name:?} already registered")]
    DuplicateMessageType { type_name: String },
}

/// Error in a value handed to the codec: domain violations caught at encode
/// time or while reassembling structured records.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("required property {property:?} has no value")]
    MissingRequired { property: String },

    #[error("property {property:?} expects {expected}, got {found}")]
    TypeMismatch {
        property: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("value {member:?} is not a member of enum domain {domain:?}")]
    NotInEnumDomain { domain: String, member: String },

    #[error("indexed value for {property:?} is {len} bytes (limit {max})")]
    IndexedValueTooLong {
        property: String,
        len: usize,
        max: usize,
    },

    #[error(
        "structured property {property:?} has sibling arrays of differing \
         lengths ({expected} vs {found})"
    )]
    SiblingLengthMismatch {
        property: String,
        expected: usize,
        found: usize,
    },

    #[error("property {property:?} expects message type {expected:?}, got {found:?}")]
    MessageTypeMismatch {
        property: String,
        expected: String,
        found: String,
    },

    #[error("{kind} values cannot be serialized as a pickled payload")]
    Unpicklable { kind: &'static str },

    #[error("invalid calendar date {year:04}-{month:02}-{day:02}")]
    InvalidDate { year: i32, month: u8, day: u8 },

    #[error("invalid time of day {hour:02}:{minute:02}:{second:02}.{micro:06}")]
    InvalidTime {
        hour: u8,
        minute: u8,
        second: u8,
        micro: u32,
    },

    #[error("latitude {lat} out of range [-90, +90]")]
    LatitudeOutOfRange { lat: f64 },

    #[error("longitude {lon} out of range [-180, +180]")]
    LongitudeOutOfRange { lon: f64 },
}

/// Error while turning wire payloads back into language-level values, or
/// while handling compressed/pickled/blob payloads in either direction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("pickled payload for {property:?} but unsafe decoding is not enabled")]
    UnsafeDecodeDisabled { property: String },

    #[error("integer {number} is not a member of enum domain {domain:?}")]
    UnknownEnumNumber { domain: String, number: i64 },

    #[error("no message codec registered for type {type_name:?}")]
    UnregisteredMessageType { type_name: String },

    #[error("malformed {type_name:?} message payload: {reason}")]
    MalformedMessage { type_name: String, reason: String },

    #[error("invalid JSON payload for {property:?}: {reason}")]
    Json { property: String, reason: String },

    #[error("zlib {context} failed: {reason}")]
    Compression {
        context: &'static str,
        reason: String,
    },

    #[error("unexpected end of input while reading {context}")]
    UnexpectedEof { context: &'static str },

    #[error("varint exceeds maximum length (10 bytes)")]
    VarintTooLong,

    #[error("varint overflow (value exceeds u64)")]
    VarintOverflow,

    #[error("{field} length {len} exceeds maximum {max}")]
    LengthExceedsLimit {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("invalid UTF-8 in {field}")]
    InvalidUtf8 { field: &'static str },

    #[error("invalid {context} tag: {tag}")]
    InvalidTag { context: &'static str, tag: u8 },

    #[error("{context} value out of range")]
    ValueOutOfRange { context: &'static str },

    #[error("entity nesting exceeds maximum depth {max}")]
    NestingTooDeep { max: usize },

    #[error("entity payload declares field {field:?} more than once")]
    DuplicateField { field: String },

    #[error("trailing bytes after {context}")]
    TrailingBytes { context: &'static str },
}

/// Error where an entity or value's shape contradicts its declared tag.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("property {property:?} expects a {expected} payload, got {found}")]
    UnexpectedPayload {
        property: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("property {property:?} is not repeated but carries an array value")]
    UnexpectedArray { property: String },

    #[error("geo point payload is missing the {field:?} field")]
    GeoPointMissingField { field: &'static str },

    #[error("date property {property:?} carries a timestamp with a time-of-day part")]
    DateHasTimePart { property: String },

    #[error("time property {property:?} carries a timestamp outside the epoch day")]
    TimeHasDatePart { property: String },

    #[error("timestamp for property {property:?} overflows the supported range")]
    TimestampOutOfRange { property: String },
}

/// Umbrella error for the public codec entry points.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Format(#[from] FormatError),
}

impl ModelError {
    /// Returns a short name for the error kind, for logging and assertions.
    pub fn kind(&self) -> &'static str {
        match self {
            ModelError::Schema(_) => "schema",
            ModelError::Validation(_) => "validation",
            ModelError::Decode(_) => "decode",
            ModelError::Format(_) => "format",
        }
    }
}
