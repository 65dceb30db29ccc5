//! Opaque serialization of dynamic value trees ("pickled" payloads).
//!
//! Pickle properties accept almost any language-level value, including
//! nested lists and string-keyed maps, and store one self-describing byte
//! blob. The format is private to this crate: a tag byte per node followed
//! by the payload. Decoding is only reachable through the unsafe gate on
//! the decode context.

use std::collections::BTreeMap;

use crate::codec::primitives::{Reader, Writer};
use crate::error::{DecodeError, ModelError, ValidationError};
use crate::limits::{MAX_ARRAY_LEN, MAX_BLOB_LEN, MAX_NESTING_DEPTH, MAX_STRING_LEN};
use crate::model::{EnumMember, GeoPt, LocalDate, LocalTime, PropValue, UtcDateTime};
use crate::util::datetime::MICROS_PER_DAY;

/// Node tags of the pickle format.
mod tags {
    pub const BOOL: u8 = 0x01;
    pub const INT: u8 = 0x02;
    pub const FLOAT: u8 = 0x03;
    pub const STR: u8 = 0x04;
    pub const BYTES: u8 = 0x05;
    pub const DATETIME: u8 = 0x06;
    pub const DATE: u8 = 0x07;
    pub const TIME: u8 = 0x08;
    pub const GEO_PT: u8 = 0x09;
    pub const JSON: u8 = 0x0A;
    pub const ENUM: u8 = 0x0B;
    pub const LIST: u8 = 0x0C;
    pub const MAP: u8 = 0x0D;
}

/// Serializes a value tree into a pickled payload.
pub fn pickle_value(value: &PropValue) -> Result<Vec<u8>, ModelError> {
    let mut writer = Writer::new();
    write_value(&mut writer, value, 0)?;
    Ok(writer.into_bytes())
}

/// Parses a pickled payload back into a value tree.
///
/// The caller is responsible for checking the unsafe-deserialization gate
/// before calling this.
pub fn unpickle_value(bytes: &[u8]) -> Result<PropValue, ModelError> {
    let mut reader = Reader::new(bytes);
    let value = read_value(&mut reader, 0)?;
    if !reader.is_empty() {
        return Err(DecodeError::TrailingBytes {
            context: "pickled payload",
        }
        .into());
    }
    Ok(value)
}

fn write_value(writer: &mut Writer, value: &PropValue, depth: usize) -> Result<(), ModelError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(DecodeError::NestingTooDeep {
            max: MAX_NESTING_DEPTH,
        }
        .into());
    }

    match value {
        PropValue::Bool(b) => {
            writer.write_byte(tags::BOOL);
            writer.write_byte(u8::from(*b));
        }
        PropValue::Int(i) => {
            writer.write_byte(tags::INT);
            writer.write_signed_varint(*i);
        }
        PropValue::Float(f) => {
            writer.write_byte(tags::FLOAT);
            writer.write_f64(*f);
        }
        PropValue::Str(s) => {
            writer.write_byte(tags::STR);
            writer.write_string(s);
        }
        PropValue::Bytes(b) => {
            writer.write_byte(tags::BYTES);
            writer.write_bytes_prefixed(b);
        }
        PropValue::DateTime(dt) => {
            writer.write_byte(tags::DATETIME);
            writer.write_signed_varint(dt.micros());
        }
        PropValue::Date(date) => {
            writer.write_byte(tags::DATE);
            writer.write_signed_varint(date.days() as i64);
        }
        PropValue::Time(time) => {
            writer.write_byte(tags::TIME);
            writer.write_varint(time.micros_of_day() as u64);
        }
        PropValue::GeoPt(point) => {
            writer.write_byte(tags::GEO_PT);
            writer.write_f64(point.lat());
            writer.write_f64(point.lon());
        }
        PropValue::Json(json) => {
            writer.write_byte(tags::JSON);
            let bytes = serde_json::to_vec(json).map_err(|e| DecodeError::Json {
                property: "pickled json".to_string(),
                reason: e.to_string(),
            })?;
            writer.write_bytes_prefixed(&bytes);
        }
        PropValue::Enum(member) => {
            writer.write_byte(tags::ENUM);
            writer.write_string(&member.name);
            writer.write_signed_varint(member.number);
        }
        PropValue::List(items) => {
            writer.write_byte(tags::LIST);
            writer.write_varint(items.len() as u64);
            for item in items {
                write_value(writer, item, depth + 1)?;
            }
        }
        PropValue::Map(entries) => {
            writer.write_byte(tags::MAP);
            writer.write_varint(entries.len() as u64);
            for (key, item) in entries {
                writer.write_string(key);
                write_value(writer, item, depth + 1)?;
            }
        }
        PropValue::Record(_) | PropValue::Message(_) => {
            return Err(ValidationError::Unpicklable {
                kind: value.kind_name(),
            }
            .into());
        }
    }
    Ok(())
}

fn read_value(reader: &mut Reader<'_>, depth: usize) -> Result<PropValue, ModelError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(DecodeError::NestingTooDeep {
            max: MAX_NESTING_DEPTH,
        }
        .into());
    }

    let tag = reader.read_byte("pickle tag")?;
    let value = match tag {
        tags::BOOL => {
            let byte = reader.read_byte("pickle bool")?;
            match byte {
                0x00 => PropValue::Bool(false),
                0x01 => PropValue::Bool(true),
                _ => {
                    return Err(DecodeError::InvalidTag {
                        context: "pickle bool",
                        tag: byte,
                    }
                    .into());
                }
            }
        }
        tags::INT => PropValue::Int(reader.read_signed_varint("pickle int")?),
        tags::FLOAT => PropValue::Float(reader.read_f64("pickle float")?),
        tags::STR => PropValue::Str(reader.read_string(MAX_STRING_LEN, "pickle string")?),
        tags::BYTES => PropValue::Bytes(reader.read_bytes_prefixed(MAX_BLOB_LEN, "pickle bytes")?),
        tags::DATETIME => PropValue::DateTime(UtcDateTime::from_micros(
            reader.read_signed_varint("pickle datetime")?,
        )),
        tags::DATE => {
            let days = reader.read_signed_varint("pickle date")?;
            let days = i32::try_from(days).map_err(|_| DecodeError::ValueOutOfRange {
                context: "pickle date",
            })?;
            PropValue::Date(LocalDate::from_days(days))
        }
        tags::TIME => {
            let micros = reader.read_varint("pickle time")? as i64;
            if !(0..MICROS_PER_DAY).contains(&micros) {
                return Err(DecodeError::ValueOutOfRange {
                    context: "pickle time",
                }
                .into());
            }
            PropValue::Time(LocalTime::from_micros_of_day(micros))
        }
        tags::GEO_PT => {
            let lat = reader.read_f64("pickle geo point")?;
            let lon = reader.read_f64("pickle geo point")?;
            PropValue::GeoPt(GeoPt::new(lat, lon)?)
        }
        tags::JSON => {
            let bytes = reader.read_bytes_prefixed(MAX_BLOB_LEN, "pickle json")?;
            let json = serde_json::from_slice(&bytes).map_err(|e| DecodeError::Json {
                property: "pickled json".to_string(),
                reason: e.to_string(),
            })?;
            PropValue::Json(json)
        }
        tags::ENUM => {
            let name = reader.read_string(MAX_STRING_LEN, "pickle enum")?;
            let number = reader.read_signed_varint("pickle enum")?;
            PropValue::Enum(EnumMember::new(name, number))
        }
        tags::LIST => {
            let count = reader.read_varint("pickle list")? as usize;
            if count > MAX_ARRAY_LEN {
                return Err(DecodeError::LengthExceedsLimit {
                    field: "pickle list",
                    len: count,
                    max: MAX_ARRAY_LEN,
                }
                .into());
            }
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                items.push(read_value(reader, depth + 1)?);
            }
            PropValue::List(items)
        }
        tags::MAP => {
            let count = reader.read_varint("pickle map")? as usize;
            if count > MAX_ARRAY_LEN {
                return Err(DecodeError::LengthExceedsLimit {
                    field: "pickle map",
                    len: count,
                    max: MAX_ARRAY_LEN,
                }
                .into());
            }
            let mut entries = BTreeMap::new();
            for _ in 0..count {
                let key = reader.read_string(MAX_STRING_LEN, "pickle map key")?;
                if entries.contains_key(&key) {
                    return Err(DecodeError::DuplicateField { field: key }.into());
                }
                let item = read_value(reader, depth + 1)?;
                entries.insert(key, item);
            }
            PropValue::Map(entries)
        }
        _ => {
            return Err(DecodeError::InvalidTag {
                context: "pickle",
                tag,
            }
            .into());
        }
    };

    Ok(value)
}
