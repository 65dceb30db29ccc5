//! Wire entity -> model instance conversion.
//!
//! Resolves the schema from the entity's kind, walks the stored wire
//! fields, drops unknown fields for forward compatibility, applies
//! defaults, validates required fields and recomputes computed properties.
//! The unsafe-deserialization gate and the caller's registries travel on
//! the [`DecodeContext`]; there is no global state.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::codec::strategy::decode_scalar;
use crate::error::{DecodeError, ModelError, SchemaError, ValidationError};
use crate::limits::{MAX_ARRAY_LEN, MAX_NESTING_DEPTH};
use crate::model::{
    Instance, MessageRegistry, PropValue, Property, PropertyType, Schema, SchemaRegistry,
};
use crate::wire::{Entity, Key, Payload, WireValue};

/// Everything a decode call needs besides the entity itself.
///
/// The pickled gate defaults to off; enabling it is an explicit, per-context
/// decision, so concurrent decodes with different trust levels never
/// interfere.
#[derive(Clone, Copy)]
pub struct DecodeContext<'a> {
    registry: &'a SchemaRegistry,
    messages: Option<&'a MessageRegistry>,
    allow_pickled: bool,
}

impl<'a> DecodeContext<'a> {
    /// Creates a context over the given schema registry, gate off.
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self {
            registry,
            messages: None,
            allow_pickled: false,
        }
    }

    /// Supplies the message registry for message properties.
    pub fn with_messages(mut self, messages: &'a MessageRegistry) -> Self {
        self.messages = Some(messages);
        self
    }

    /// Enables decoding of pickled payloads.
    ///
    /// Off by default: a pickled value decoded without this is a hard
    /// failure, never a silent skip.
    pub fn allow_pickled(mut self) -> Self {
        self.allow_pickled = true;
        self
    }

    pub(crate) fn messages(&self) -> Option<&'a MessageRegistry> {
        self.messages
    }

    pub(crate) fn pickled_allowed(&self) -> bool {
        self.allow_pickled
    }
}

/// Decodes a wire entity into a model instance.
///
/// The target schema is resolved from the entity key's kind; an
/// unregistered kind fails.
pub fn decode_model(entity: &Entity, ctx: &DecodeContext<'_>) -> Result<Instance, ModelError> {
    trace!(kind = entity.key.kind, "decoding wire entity");

    let schema = ctx
        .registry
        .resolve(&entity.key.kind)
        .ok_or_else(|| SchemaError::UnknownKind {
            kind: entity.key.kind.clone(),
        })?
        .clone();

    decode_with_schema(entity, &schema, ctx, 0)
}

/// Decodes an entity against a known schema. Used for the top-level record
/// and recursively for structured embedding.
pub(crate) fn decode_with_schema(
    entity: &Entity,
    schema: &Arc<Schema>,
    ctx: &DecodeContext<'_>,
    depth: usize,
) -> Result<Instance, ModelError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(DecodeError::NestingTooDeep {
            max: MAX_NESTING_DEPTH,
        }
        .into());
    }

    let mut instance = Instance::new(schema.clone());
    instance.set_key(Some(entity.key.clone()));

    for (wire_name, wire_value) in entity.iter() {
        let Some((idx, property)) = schema.property_by_wire_name(wire_name) else {
            // Unknown fields are dropped silently: schemas evolve and old
            // readers must tolerate new writers.
            debug!(
                kind = schema.kind(),
                field = wire_name,
                "dropping unknown wire field"
            );
            continue;
        };

        if property.is_computed() {
            // Computed properties have no wire slot; a stored value is stale
            // output from a writer that persisted derivations.
            debug!(
                kind = schema.kind(),
                field = wire_name,
                "dropping stored value for computed property"
            );
            continue;
        }

        let value = if property.is_repeated() {
            decode_repeated(property, wire_value, ctx, depth)?
        } else if matches!(wire_value.payload, Payload::Array(_)) {
            return Err(crate::error::FormatError::UnexpectedArray {
                property: property.name().to_string(),
            }
            .into());
        } else {
            decode_scalar(property, wire_value, ctx, depth)?
        };
        instance.set_slot(idx, Some(value));
    }

    for (idx, property) in schema.properties().iter().enumerate() {
        if instance.slot(idx).is_some() || property.is_computed() {
            continue;
        }
        if let Some(default) = property.default_value() {
            instance.set_slot(idx, Some(default.clone()));
        } else if property.is_required() {
            return Err(ValidationError::MissingRequired {
                property: property.name().to_string(),
            }
            .into());
        } else if property.is_repeated() {
            instance.set_slot(idx, Some(PropValue::List(Vec::new())));
        }
    }

    instance.recompute()?;
    Ok(instance)
}

fn decode_repeated(
    property: &Property,
    wire_value: &WireValue,
    ctx: &DecodeContext<'_>,
    depth: usize,
) -> Result<PropValue, ModelError> {
    match &wire_value.payload {
        Payload::Array(items) => {
            if items.len() > MAX_ARRAY_LEN {
                return Err(DecodeError::LengthExceedsLimit {
                    field: "repeated value",
                    len: items.len(),
                    max: MAX_ARRAY_LEN,
                }
                .into());
            }
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                if matches!(item.payload, Payload::Array(_)) {
                    return Err(crate::error::FormatError::UnexpectedArray {
                        property: property.name().to_string(),
                    }
                    .into());
                }
                values.push(decode_scalar(property, item, ctx, depth)?);
            }
            Ok(PropValue::List(values))
        }
        // Legacy columnar layout: one nested entity whose sub-fields are
        // arrays aligned by position, one element per repeated record.
        Payload::Entity(nested) if property.property_type() == PropertyType::Structured => {
            decode_columnar(property, nested, ctx, depth)
        }
        // A lone scalar in a repeated slot is a single-element history.
        _ => Ok(PropValue::List(vec![decode_scalar(
            property, wire_value, ctx, depth,
        )?])),
    }
}

/// Transposes a columnar repeated-structured value back into one record per
/// position. Sibling arrays of differing lengths are malformed.
fn decode_columnar(
    property: &Property,
    nested: &Entity,
    ctx: &DecodeContext<'_>,
    depth: usize,
) -> Result<PropValue, ModelError> {
    let schema = property.nested_schema().ok_or_else(|| {
        ModelError::from(crate::error::FormatError::UnexpectedPayload {
            property: property.name().to_string(),
            expected: "embedded schema",
            found: "none",
        })
    })?;

    let mut rows: Option<usize> = None;
    for (_, value) in nested.iter() {
        let len = match &value.payload {
            Payload::Array(items) => items.len(),
            _ => 1,
        };
        match rows {
            None => rows = Some(len),
            Some(expected) if expected != len => {
                return Err(ValidationError::SiblingLengthMismatch {
                    property: property.name().to_string(),
                    expected,
                    found: len,
                }
                .into());
            }
            Some(_) => {}
        }
    }

    let rows = rows.unwrap_or(0);
    let mut records = Vec::with_capacity(rows);
    for row in 0..rows {
        let mut row_entity = Entity::new(Key::new(schema.kind()));
        for (name, value) in nested.iter() {
            let item = match &value.payload {
                Payload::Array(items) => items[row].clone(),
                _ => value.clone(),
            };
            row_entity.insert(name, item);
        }
        records.push(PropValue::Record(decode_with_schema(
            &row_entity,
            schema,
            ctx,
            depth + 1,
        )?));
    }
    Ok(PropValue::List(records))
}
