//! Per-type encode/decode strategies.
//!
//! Each property type tag has a fixed contract for turning one
//! language-level value into one wire value and back. Repeated handling,
//! defaults and key plumbing live in the orchestration layer
//! ([`crate::codec::encode`], [`crate::codec::decode`]); this module only
//! converts scalars.

use crate::codec::compress::{deflate, inflate_bounded};
use crate::codec::decode::{decode_with_schema, DecodeContext};
use crate::codec::encode::encode_nested;
use crate::codec::entity::{entity_from_bytes, entity_to_bytes};
use crate::codec::pickle::{pickle_value, unpickle_value};
use crate::error::{DecodeError, FormatError, ModelError, ValidationError};
use crate::limits::MAX_INDEXED_STRING_BYTES;
use crate::model::{GeoPt, LocalDate, LocalTime, PropValue, Property, PropertyType, UtcDateTime};
use crate::util::datetime::{split_epoch_micros, MICROS_PER_DAY};
use crate::wire::{Entity, Key, Meaning, Payload, WireValue};

/// Kind of the pseudo-entity that packs a geo point's two doubles.
const GEO_POINT_KIND: &str = "GeoPt";

// =============================================================================
// ENCODING
// =============================================================================

/// Encodes one scalar value according to the property's strategy.
pub fn encode_scalar(
    property: &Property,
    value: &PropValue,
    depth: usize,
) -> Result<WireValue, ModelError> {
    let indexed = property.is_indexed();

    match property.property_type() {
        PropertyType::Boolean => {
            let v = expect_bool(property, value)?;
            Ok(flagged(WireValue::boolean(v), indexed))
        }
        PropertyType::Integer => {
            let v = expect_int(property, value)?;
            Ok(flagged(WireValue::integer(v), indexed))
        }
        PropertyType::Float => {
            let v = expect_float(property, value)?;
            Ok(flagged(WireValue::double(v), indexed))
        }
        PropertyType::String => {
            let s = expect_str(property, value)?;
            check_indexed_len(property, indexed, s.len())?;
            Ok(flagged(WireValue::string(s), indexed))
        }
        PropertyType::Text => {
            let s = expect_str(property, value)?;
            if property.is_compressed() {
                let compressed = deflate(s.as_bytes())?;
                Ok(WireValue::bytes(compressed)
                    .unindexed()
                    .with_meaning(Meaning::Compressed))
            } else {
                Ok(WireValue::string(s).unindexed())
            }
        }
        PropertyType::Blob => {
            let b = expect_bytes(property, value)?;
            if property.is_compressed() {
                let compressed = deflate(b)?;
                Ok(WireValue::bytes(compressed)
                    .unindexed()
                    .with_meaning(Meaning::Compressed))
            } else {
                Ok(WireValue::bytes(b.to_vec()).unindexed())
            }
        }
        PropertyType::DateTime => {
            let dt = expect_datetime(property, value)?;
            Ok(flagged(WireValue::timestamp(dt.micros()), indexed))
        }
        PropertyType::Date => match value {
            PropValue::Date(date) => {
                let micros = (date.days() as i64).checked_mul(MICROS_PER_DAY).ok_or(
                    FormatError::TimestampOutOfRange {
                        property: property.name().to_string(),
                    },
                )?;
                Ok(flagged(WireValue::timestamp(micros), indexed))
            }
            other => Err(type_mismatch(property, other)),
        },
        PropertyType::Time => match value {
            PropValue::Time(time) => Ok(flagged(
                WireValue::timestamp(time.micros_of_day()),
                indexed,
            )),
            other => Err(type_mismatch(property, other)),
        },
        PropertyType::GeoPt => match value {
            PropValue::GeoPt(point) => Ok(flagged(
                WireValue::entity(pack_geo_point(point, indexed)).with_meaning(Meaning::GeoPoint),
                indexed,
            )),
            other => Err(type_mismatch(property, other)),
        },
        PropertyType::Json => match value {
            PropValue::Json(json) => {
                let bytes = serde_json::to_vec(json).map_err(|e| DecodeError::Json {
                    property: property.name().to_string(),
                    reason: e.to_string(),
                })?;
                Ok(WireValue::bytes(bytes)
                    .unindexed()
                    .with_meaning(Meaning::Json))
            }
            other => Err(type_mismatch(property, other)),
        },
        PropertyType::Pickle => {
            let bytes = pickle_value(value)?;
            Ok(WireValue::bytes(bytes)
                .unindexed()
                .with_meaning(Meaning::Pickled))
        }
        PropertyType::Generic => encode_generic(property, value),
        PropertyType::Enum => match value {
            PropValue::Enum(member) => Ok(flagged(WireValue::integer(member.number), indexed)),
            other => Err(type_mismatch(property, other)),
        },
        PropertyType::Message => match value {
            PropValue::Message(message) => {
                let expected = property.message_type().unwrap_or_default();
                if message.type_name() != expected {
                    return Err(ValidationError::MessageTypeMismatch {
                        property: property.name().to_string(),
                        expected: expected.to_string(),
                        found: message.type_name().to_string(),
                    }
                    .into());
                }
                Ok(WireValue::bytes(message.bytes().to_vec())
                    .unindexed()
                    .with_meaning(Meaning::Message))
            }
            other => Err(type_mismatch(property, other)),
        },
        PropertyType::Structured => match value {
            PropValue::Record(record) => {
                let nested = encode_nested(record, depth + 1)?;
                Ok(flagged(WireValue::entity(nested), indexed))
            }
            other => Err(type_mismatch(property, other)),
        },
        PropertyType::LocalStructured => match value {
            PropValue::Record(record) => {
                let nested = encode_nested(record, depth + 1)?;
                let bytes = entity_to_bytes(&nested)?;
                if property.is_compressed() {
                    Ok(WireValue::bytes(deflate(&bytes)?)
                        .unindexed()
                        .with_meaning(Meaning::Compressed))
                } else {
                    Ok(WireValue::bytes(bytes).unindexed())
                }
            }
            other => Err(type_mismatch(property, other)),
        },
    }
}

fn encode_generic(property: &Property, value: &PropValue) -> Result<WireValue, ModelError> {
    let indexed = property.is_indexed();
    match value {
        PropValue::Bool(b) => Ok(flagged(WireValue::boolean(*b), indexed)),
        PropValue::Int(i) => Ok(flagged(WireValue::integer(*i), indexed)),
        PropValue::Float(f) => Ok(flagged(WireValue::double(*f), indexed)),
        PropValue::Str(s) => {
            check_indexed_len(property, indexed, s.len())?;
            Ok(flagged(WireValue::string(s.clone()), indexed))
        }
        PropValue::Bytes(b) => Ok(WireValue::bytes(b.clone()).unindexed()),
        PropValue::DateTime(dt) => Ok(flagged(WireValue::timestamp(dt.micros()), indexed)),
        PropValue::GeoPt(point) => Ok(flagged(
            WireValue::entity(pack_geo_point(point, indexed)).with_meaning(Meaning::GeoPoint),
            indexed,
        )),
        PropValue::Json(json) => {
            let bytes = serde_json::to_vec(json).map_err(|e| DecodeError::Json {
                property: property.name().to_string(),
                reason: e.to_string(),
            })?;
            Ok(WireValue::bytes(bytes)
                .unindexed()
                .with_meaning(Meaning::Json))
        }
        other => Err(type_mismatch(property, other)),
    }
}

fn pack_geo_point(point: &GeoPt, indexed: bool) -> Entity {
    let mut entity = Entity::new(Key::new(GEO_POINT_KIND));
    entity.insert("lat", flagged(WireValue::double(point.lat()), indexed));
    entity.insert("lon", flagged(WireValue::double(point.lon()), indexed));
    entity
}

// =============================================================================
// DECODING
// =============================================================================

/// Decodes one scalar wire value according to the property's strategy.
pub fn decode_scalar(
    property: &Property,
    value: &WireValue,
    ctx: &DecodeContext<'_>,
    depth: usize,
) -> Result<PropValue, ModelError> {
    match property.property_type() {
        PropertyType::Boolean => match &value.payload {
            Payload::Bool(b) => Ok(PropValue::Bool(*b)),
            other => Err(payload_mismatch(property, "boolean", other)),
        },
        PropertyType::Integer => match &value.payload {
            Payload::Int(i) => Ok(PropValue::Int(*i)),
            other => Err(payload_mismatch(property, "integer", other)),
        },
        PropertyType::Float => match &value.payload {
            Payload::Double(d) => Ok(PropValue::Float(*d)),
            other => Err(payload_mismatch(property, "double", other)),
        },
        PropertyType::String => match &value.payload {
            Payload::Str(s) => Ok(PropValue::Str(s.clone())),
            other => Err(payload_mismatch(property, "string", other)),
        },
        PropertyType::Text => decode_text(property, value),
        PropertyType::Blob => match &value.payload {
            Payload::Bytes(b) if value.meaning == Meaning::Compressed => {
                Ok(PropValue::Bytes(inflate_bounded(b)?))
            }
            Payload::Bytes(b) => Ok(PropValue::Bytes(b.clone())),
            other => Err(payload_mismatch(property, "bytes", other)),
        },
        PropertyType::DateTime => match &value.payload {
            Payload::Timestamp(t) => Ok(PropValue::DateTime(UtcDateTime::from_micros(*t))),
            other => Err(payload_mismatch(property, "timestamp", other)),
        },
        PropertyType::Date => match &value.payload {
            Payload::Timestamp(t) => {
                let (days, rem) = split_epoch_micros(*t);
                if rem != 0 {
                    return Err(FormatError::DateHasTimePart {
                        property: property.name().to_string(),
                    }
                    .into());
                }
                Ok(PropValue::Date(LocalDate::from_days(days)))
            }
            other => Err(payload_mismatch(property, "timestamp", other)),
        },
        PropertyType::Time => match &value.payload {
            Payload::Timestamp(t) => {
                if !(0..MICROS_PER_DAY).contains(t) {
                    return Err(FormatError::TimeHasDatePart {
                        property: property.name().to_string(),
                    }
                    .into());
                }
                Ok(PropValue::Time(LocalTime::from_micros_of_day(*t)))
            }
            other => Err(payload_mismatch(property, "timestamp", other)),
        },
        PropertyType::GeoPt => match &value.payload {
            Payload::Entity(packed) => Ok(PropValue::GeoPt(unpack_geo_point(packed)?)),
            other => Err(payload_mismatch(property, "entity", other)),
        },
        PropertyType::Json => decode_json(property, value),
        PropertyType::Pickle => {
            if !ctx.pickled_allowed() {
                return Err(DecodeError::UnsafeDecodeDisabled {
                    property: property.name().to_string(),
                }
                .into());
            }
            match &value.payload {
                Payload::Bytes(b) => unpickle_value(b),
                other => Err(payload_mismatch(property, "bytes", other)),
            }
        }
        PropertyType::Generic => decode_generic(property, value, ctx),
        PropertyType::Enum => match &value.payload {
            Payload::Int(number) => {
                // Enum properties always carry a domain by construction.
                let domain = property.enum_domain().ok_or_else(|| {
                    FormatError::UnexpectedPayload {
                        property: property.name().to_string(),
                        expected: "enum domain",
                        found: "none",
                    }
                })?;
                let member =
                    domain
                        .member_by_number(*number)
                        .ok_or_else(|| DecodeError::UnknownEnumNumber {
                            domain: domain.name().to_string(),
                            number: *number,
                        })?;
                Ok(PropValue::Enum(member.clone()))
            }
            other => Err(payload_mismatch(property, "integer", other)),
        },
        PropertyType::Message => match &value.payload {
            Payload::Bytes(b) => {
                let type_name = property.message_type().unwrap_or_default();
                let codec = ctx
                    .messages()
                    .and_then(|registry| registry.resolve(type_name))
                    .ok_or_else(|| DecodeError::UnregisteredMessageType {
                        type_name: type_name.to_string(),
                    })?;
                Ok(PropValue::Message(codec.parse(b)?))
            }
            other => Err(payload_mismatch(property, "bytes", other)),
        },
        PropertyType::Structured => match &value.payload {
            Payload::Entity(nested) => {
                let schema = nested_schema(property)?;
                let record = decode_with_schema(nested, schema, ctx, depth + 1)?;
                Ok(PropValue::Record(record))
            }
            other => Err(payload_mismatch(property, "entity", other)),
        },
        PropertyType::LocalStructured => match &value.payload {
            Payload::Bytes(b) => {
                let bytes;
                let raw: &[u8] = if value.meaning == Meaning::Compressed {
                    bytes = inflate_bounded(b)?;
                    &bytes
                } else {
                    b
                };
                let nested = entity_from_bytes(raw)?;
                let schema = nested_schema(property)?;
                let record = decode_with_schema(&nested, schema, ctx, depth + 1)?;
                Ok(PropValue::Record(record))
            }
            other => Err(payload_mismatch(property, "bytes", other)),
        },
    }
}

fn decode_text(property: &Property, value: &WireValue) -> Result<PropValue, ModelError> {
    match &value.payload {
        Payload::Str(s) => Ok(PropValue::Str(s.clone())),
        Payload::Bytes(b) => {
            let raw = if value.meaning == Meaning::Compressed {
                inflate_bounded(b)?
            } else {
                b.clone()
            };
            String::from_utf8(raw)
                .map(PropValue::Str)
                .map_err(|_| DecodeError::InvalidUtf8 { field: "text" }.into())
        }
        other => Err(payload_mismatch(property, "string", other)),
    }
}

fn decode_json(property: &Property, value: &WireValue) -> Result<PropValue, ModelError> {
    let json = match &value.payload {
        Payload::Bytes(b) => serde_json::from_slice(b),
        Payload::Str(s) => serde_json::from_str(s),
        other => return Err(payload_mismatch(property, "bytes", other)),
    };
    json.map(PropValue::Json).map_err(|e| {
        DecodeError::Json {
            property: property.name().to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

/// Decodes a wire value with no schema-declared type: the populated payload
/// slot plus the meaning tag pick the strategy.
fn decode_generic(
    property: &Property,
    value: &WireValue,
    ctx: &DecodeContext<'_>,
) -> Result<PropValue, ModelError> {
    match &value.payload {
        Payload::Bool(b) => Ok(PropValue::Bool(*b)),
        Payload::Int(i) => Ok(PropValue::Int(*i)),
        Payload::Double(d) => Ok(PropValue::Float(*d)),
        Payload::Str(s) => Ok(PropValue::Str(s.clone())),
        Payload::Timestamp(t) => Ok(PropValue::DateTime(UtcDateTime::from_micros(*t))),
        Payload::Bytes(b) => match value.meaning {
            Meaning::Json => decode_json(property, value),
            Meaning::Pickled => {
                if !ctx.pickled_allowed() {
                    return Err(DecodeError::UnsafeDecodeDisabled {
                        property: property.name().to_string(),
                    }
                    .into());
                }
                unpickle_value(b)
            }
            Meaning::Compressed => {
                let raw = inflate_bounded(b)?;
                String::from_utf8(raw)
                    .map(PropValue::Str)
                    .map_err(|_| DecodeError::InvalidUtf8 { field: "text" }.into())
            }
            _ => Ok(PropValue::Bytes(b.clone())),
        },
        Payload::Entity(packed) if value.meaning == Meaning::GeoPoint => {
            Ok(PropValue::GeoPt(unpack_geo_point(packed)?))
        }
        other => Err(payload_mismatch(property, "primitive", other)),
    }
}

fn unpack_geo_point(packed: &Entity) -> Result<GeoPt, ModelError> {
    let lat = packed
        .get("lat")
        .ok_or(FormatError::GeoPointMissingField { field: "lat" })?;
    let lon = packed
        .get("lon")
        .ok_or(FormatError::GeoPointMissingField { field: "lon" })?;
    match (&lat.payload, &lon.payload) {
        (Payload::Double(lat), Payload::Double(lon)) => Ok(GeoPt::new(*lat, *lon)?),
        _ => Err(FormatError::UnexpectedPayload {
            property: "geo point".to_string(),
            expected: "double",
            found: "other",
        }
        .into()),
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn flagged(value: WireValue, indexed: bool) -> WireValue {
    if indexed {
        value
    } else {
        value.unindexed()
    }
}

fn check_indexed_len(property: &Property, indexed: bool, len: usize) -> Result<(), ModelError> {
    if indexed && len > MAX_INDEXED_STRING_BYTES {
        return Err(ValidationError::IndexedValueTooLong {
            property: property.name().to_string(),
            len,
            max: MAX_INDEXED_STRING_BYTES,
        }
        .into());
    }
    Ok(())
}

fn nested_schema(property: &Property) -> Result<&std::sync::Arc<crate::model::Schema>, ModelError> {
    property
        .nested_schema()
        .ok_or_else(|| {
            FormatError::UnexpectedPayload {
                property: property.name().to_string(),
                expected: "embedded schema",
                found: "none",
            }
            .into()
        })
}

fn type_mismatch(property: &Property, value: &PropValue) -> ModelError {
    ValidationError::TypeMismatch {
        property: property.name().to_string(),
        expected: property.property_type().name(),
        found: value.kind_name(),
    }
    .into()
}

fn payload_mismatch(property: &Property, expected: &'static str, found: &Payload) -> ModelError {
    FormatError::UnexpectedPayload {
        property: property.name().to_string(),
        expected,
        found: found.kind_name(),
    }
    .into()
}

fn expect_bool(property: &Property, value: &PropValue) -> Result<bool, ModelError> {
    match value {
        PropValue::Bool(b) => Ok(*b),
        other => Err(type_mismatch(property, other)),
    }
}

fn expect_int(property: &Property, value: &PropValue) -> Result<i64, ModelError> {
    match value {
        PropValue::Int(i) => Ok(*i),
        other => Err(type_mismatch(property, other)),
    }
}

fn expect_float(property: &Property, value: &PropValue) -> Result<f64, ModelError> {
    match value {
        PropValue::Float(f) => Ok(*f),
        other => Err(type_mismatch(property, other)),
    }
}

fn expect_str<'v>(property: &Property, value: &'v PropValue) -> Result<&'v str, ModelError> {
    match value {
        PropValue::Str(s) => Ok(s),
        other => Err(type_mismatch(property, other)),
    }
}

fn expect_bytes<'v>(property: &Property, value: &'v PropValue) -> Result<&'v [u8], ModelError> {
    match value {
        PropValue::Bytes(b) => Ok(b),
        other => Err(type_mismatch(property, other)),
    }
}

fn expect_datetime(property: &Property, value: &PropValue) -> Result<UtcDateTime, ModelError> {
    match value {
        PropValue::DateTime(dt) => Ok(*dt),
        other => Err(type_mismatch(property, other)),
    }
}
