//! Binary serialization of wire entities.
//!
//! Local-structured properties flatten a nested entity into one opaque
//! blob; this module defines that byte format. It is length-prefixed
//! throughout, bounds every allocation, and refuses trailing bytes, so it
//! can be handed untrusted blobs.
//!
//! Layout:
//!
//! ```text
//! entity  := key field_count:varint (name:str value)*
//! key     := flags:u8 [project:str] [namespace:str] kind:str
//!            [id:svarint | name:str]
//! value   := meaning:u8 flags:u8 tag:u8 payload
//! ```

use crate::codec::primitives::{Reader, Writer};
use crate::error::{DecodeError, ModelError};
use crate::limits::{
    MAX_ARRAY_LEN, MAX_BLOB_LEN, MAX_NAME_LEN, MAX_NESTING_DEPTH, MAX_PROPERTIES_PER_ENTITY,
    MAX_STRING_LEN,
};
use crate::wire::{Entity, Key, KeyId, Meaning, Payload, WireValue};

/// Key flag bits.
mod key_flags {
    pub const HAS_PROJECT: u8 = 0x01;
    pub const HAS_NAMESPACE: u8 = 0x02;
    pub const ID_NUMERIC: u8 = 0x04;
    pub const ID_NAME: u8 = 0x08;
    pub const ALL: u8 = 0x0F;
}

/// Value flag bits.
mod value_flags {
    pub const INDEXED: u8 = 0x01;
    pub const ALL: u8 = 0x01;
}

/// Payload tags.
mod tags {
    pub const STR: u8 = 0x01;
    pub const BYTES: u8 = 0x02;
    pub const INT: u8 = 0x03;
    pub const DOUBLE: u8 = 0x04;
    pub const BOOL: u8 = 0x05;
    pub const TIMESTAMP: u8 = 0x06;
    pub const ENTITY: u8 = 0x07;
    pub const ARRAY: u8 = 0x08;
}

/// Serializes an entity to bytes.
pub fn entity_to_bytes(entity: &Entity) -> Result<Vec<u8>, ModelError> {
    let mut writer = Writer::with_capacity(64 + entity.len() * 16);
    write_entity(&mut writer, entity, 0)?;
    Ok(writer.into_bytes())
}

/// Parses an entity from bytes, rejecting trailing data.
pub fn entity_from_bytes(bytes: &[u8]) -> Result<Entity, ModelError> {
    let mut reader = Reader::new(bytes);
    let entity = read_entity(&mut reader, 0)?;
    if !reader.is_empty() {
        return Err(DecodeError::TrailingBytes {
            context: "entity payload",
        }
        .into());
    }
    Ok(entity)
}

fn write_entity(writer: &mut Writer, entity: &Entity, depth: usize) -> Result<(), ModelError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(DecodeError::NestingTooDeep {
            max: MAX_NESTING_DEPTH,
        }
        .into());
    }
    if entity.len() > MAX_PROPERTIES_PER_ENTITY {
        return Err(DecodeError::LengthExceedsLimit {
            field: "entity fields",
            len: entity.len(),
            max: MAX_PROPERTIES_PER_ENTITY,
        }
        .into());
    }

    write_key(writer, &entity.key)?;

    writer.write_varint(entity.len() as u64);
    for (name, value) in entity.iter() {
        if name.len() > MAX_NAME_LEN {
            return Err(DecodeError::LengthExceedsLimit {
                field: "field name",
                len: name.len(),
                max: MAX_NAME_LEN,
            }
            .into());
        }
        writer.write_string(name);
        write_value(writer, value, depth)?;
    }
    Ok(())
}

fn write_key(writer: &mut Writer, key: &Key) -> Result<(), ModelError> {
    if key.kind.len() > MAX_NAME_LEN {
        return Err(DecodeError::LengthExceedsLimit {
            field: "kind",
            len: key.kind.len(),
            max: MAX_NAME_LEN,
        }
        .into());
    }

    let mut flags = 0u8;
    if key.project.is_some() {
        flags |= key_flags::HAS_PROJECT;
    }
    if key.namespace.is_some() {
        flags |= key_flags::HAS_NAMESPACE;
    }
    match &key.id {
        KeyId::Unassigned => {}
        KeyId::Id(_) => flags |= key_flags::ID_NUMERIC,
        KeyId::Name(_) => flags |= key_flags::ID_NAME,
    }
    writer.write_byte(flags);

    if let Some(project) = &key.project {
        writer.write_string(project);
    }
    if let Some(namespace) = &key.namespace {
        writer.write_string(namespace);
    }
    writer.write_string(&key.kind);
    match &key.id {
        KeyId::Unassigned => {}
        KeyId::Id(id) => writer.write_signed_varint(*id),
        KeyId::Name(name) => writer.write_string(name),
    }
    Ok(())
}

fn write_value(writer: &mut Writer, value: &WireValue, depth: usize) -> Result<(), ModelError> {
    writer.write_byte(value.meaning as u8);
    writer.write_byte(if value.indexed { value_flags::INDEXED } else { 0 });

    match &value.payload {
        Payload::Str(s) => {
            writer.write_byte(tags::STR);
            writer.write_string(s);
        }
        Payload::Bytes(b) => {
            writer.write_byte(tags::BYTES);
            writer.write_bytes_prefixed(b);
        }
        Payload::Int(i) => {
            writer.write_byte(tags::INT);
            writer.write_signed_varint(*i);
        }
        Payload::Double(d) => {
            writer.write_byte(tags::DOUBLE);
            writer.write_f64(*d);
        }
        Payload::Bool(b) => {
            writer.write_byte(tags::BOOL);
            writer.write_byte(u8::from(*b));
        }
        Payload::Timestamp(t) => {
            writer.write_byte(tags::TIMESTAMP);
            writer.write_signed_varint(*t);
        }
        Payload::Entity(e) => {
            writer.write_byte(tags::ENTITY);
            write_entity(writer, e, depth + 1)?;
        }
        Payload::Array(items) => {
            if items.len() > MAX_ARRAY_LEN {
                return Err(DecodeError::LengthExceedsLimit {
                    field: "array",
                    len: items.len(),
                    max: MAX_ARRAY_LEN,
                }
                .into());
            }
            writer.write_byte(tags::ARRAY);
            writer.write_varint(items.len() as u64);
            for item in items {
                write_value(writer, item, depth + 1)?;
            }
        }
    }
    Ok(())
}

fn read_entity(reader: &mut Reader<'_>, depth: usize) -> Result<Entity, ModelError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(DecodeError::NestingTooDeep {
            max: MAX_NESTING_DEPTH,
        }
        .into());
    }

    let key = read_key(reader)?;

    let field_count = reader.read_varint("field count")? as usize;
    if field_count > MAX_PROPERTIES_PER_ENTITY {
        return Err(DecodeError::LengthExceedsLimit {
            field: "entity fields",
            len: field_count,
            max: MAX_PROPERTIES_PER_ENTITY,
        }
        .into());
    }

    let mut entity = Entity::new(key);
    for _ in 0..field_count {
        let name = reader.read_string(MAX_NAME_LEN, "field name")?;
        if entity.contains(&name) {
            return Err(DecodeError::DuplicateField { field: name }.into());
        }
        let value = read_value(reader, depth)?;
        entity.insert(name, value);
    }
    Ok(entity)
}

fn read_key(reader: &mut Reader<'_>) -> Result<Key, ModelError> {
    let flags = reader.read_byte("key flags")?;
    if flags & !key_flags::ALL != 0
        || (flags & key_flags::ID_NUMERIC != 0 && flags & key_flags::ID_NAME != 0)
    {
        return Err(DecodeError::InvalidTag {
            context: "key flags",
            tag: flags,
        }
        .into());
    }

    let project = if flags & key_flags::HAS_PROJECT != 0 {
        Some(reader.read_string(MAX_NAME_LEN, "project")?)
    } else {
        None
    };
    let namespace = if flags & key_flags::HAS_NAMESPACE != 0 {
        Some(reader.read_string(MAX_NAME_LEN, "namespace")?)
    } else {
        None
    };
    let kind = reader.read_string(MAX_NAME_LEN, "kind")?;
    let id = if flags & key_flags::ID_NUMERIC != 0 {
        KeyId::Id(reader.read_signed_varint("key id")?)
    } else if flags & key_flags::ID_NAME != 0 {
        KeyId::Name(reader.read_string(MAX_NAME_LEN, "key name")?)
    } else {
        KeyId::Unassigned
    };

    Ok(Key {
        project,
        namespace,
        kind,
        id,
    })
}

fn read_value(reader: &mut Reader<'_>, depth: usize) -> Result<WireValue, ModelError> {
    let meaning_byte = reader.read_byte("meaning")?;
    let meaning = Meaning::from_u8(meaning_byte).ok_or(DecodeError::InvalidTag {
        context: "meaning",
        tag: meaning_byte,
    })?;

    let flags = reader.read_byte("value flags")?;
    if flags & !value_flags::ALL != 0 {
        return Err(DecodeError::InvalidTag {
            context: "value flags",
            tag: flags,
        }
        .into());
    }
    let indexed = flags & value_flags::INDEXED != 0;

    let tag = reader.read_byte("payload tag")?;
    let payload = match tag {
        tags::STR => Payload::Str(reader.read_string(MAX_STRING_LEN, "string payload")?),
        tags::BYTES => Payload::Bytes(reader.read_bytes_prefixed(MAX_BLOB_LEN, "bytes payload")?),
        tags::INT => Payload::Int(reader.read_signed_varint("integer payload")?),
        tags::DOUBLE => Payload::Double(reader.read_f64("double payload")?),
        tags::BOOL => {
            let byte = reader.read_byte("boolean payload")?;
            match byte {
                0x00 => Payload::Bool(false),
                0x01 => Payload::Bool(true),
                _ => {
                    return Err(DecodeError::InvalidTag {
                        context: "boolean payload",
                        tag: byte,
                    }
                    .into());
                }
            }
        }
        tags::TIMESTAMP => Payload::Timestamp(reader.read_signed_varint("timestamp payload")?),
        tags::ENTITY => Payload::Entity(read_entity(reader, depth + 1)?),
        tags::ARRAY => {
            let count = reader.read_varint("array length")? as usize;
            if count > MAX_ARRAY_LEN {
                return Err(DecodeError::LengthExceedsLimit {
                    field: "array",
                    len: count,
                    max: MAX_ARRAY_LEN,
                }
                .into());
            }
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                items.push(read_value(reader, depth + 1)?);
            }
            Payload::Array(items)
        }
        _ => {
            return Err(DecodeError::InvalidTag {
                context: "payload",
                tag,
            }
            .into());
        }
    };

    Ok(WireValue {
        payload,
        indexed,
        meaning,
    })
}
