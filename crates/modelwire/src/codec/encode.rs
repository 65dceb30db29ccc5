//! Model instance -> wire entity conversion.
//!
//! Walks the schema in declaration order, stamps auto-now timestamps,
//! refreshes computed properties, validates required fields and assembles
//! the entity. The instance's own key wins; the encode context only fills
//! project/namespace gaps.

use tracing::trace;

use crate::codec::strategy::encode_scalar;
use crate::error::{DecodeError, ModelError, ValidationError};
use crate::limits::{MAX_ARRAY_LEN, MAX_NESTING_DEPTH};
use crate::model::{Instance, PropValue, PropertyType, UtcDateTime};
use crate::wire::{Entity, Key, WireValue};

/// Project/namespace defaults applied to keys that carry none.
#[derive(Debug, Clone, Default)]
pub struct EncodeContext {
    pub project: Option<String>,
    pub namespace: Option<String>,
}

impl EncodeContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

/// Encodes a model instance into a wire entity.
///
/// Takes the instance mutably: auto-now properties are stamped and computed
/// properties refreshed on the instance itself, so what the caller holds
/// afterwards matches what went to the wire.
pub fn encode_model(instance: &mut Instance, ctx: &EncodeContext) -> Result<Entity, ModelError> {
    trace!(kind = instance.kind(), "encoding model instance");

    prepare(instance, UtcDateTime::now())?;

    let mut key = instance
        .key()
        .cloned()
        .unwrap_or_else(|| Key::new(instance.kind()));
    if key.project.is_none() {
        key.project = ctx.project.clone();
    }
    if key.namespace.is_none() {
        key.namespace = ctx.namespace.clone();
    }

    let entity = encode_with_key(instance, key, 0)?;

    if let Some(hook) = instance.schema().pre_encode_hook() {
        hook.as_ref()(instance)?;
    }

    Ok(entity)
}

/// Encodes a nested record for structured/local-structured properties.
///
/// Nested records keep their own key if they have one; otherwise they get
/// an unkeyed placeholder of their kind. Auto-now stamping has already run
/// over the whole tree by the time this is called.
pub(crate) fn encode_nested(record: &Instance, depth: usize) -> Result<Entity, ModelError> {
    let key = record
        .key()
        .cloned()
        .unwrap_or_else(|| Key::new(record.kind()));
    encode_with_key(record, key, depth)
}

fn encode_with_key(instance: &Instance, key: Key, depth: usize) -> Result<Entity, ModelError> {
    if depth > MAX_NESTING_DEPTH {
        return Err(DecodeError::NestingTooDeep {
            max: MAX_NESTING_DEPTH,
        }
        .into());
    }

    let schema = instance.schema();
    let mut entity = Entity::new(key);

    for (idx, property) in schema.properties().iter().enumerate() {
        if property.is_computed() {
            continue;
        }

        let Some(value) = instance.slot(idx) else {
            // Defaults are a decode-time fallback only; a defaulted property
            // satisfies the required check without being written.
            if property.is_required() && property.default_value().is_none() {
                return Err(ValidationError::MissingRequired {
                    property: property.name().to_string(),
                }
                .into());
            }
            continue;
        };

        if property.is_repeated() {
            let PropValue::List(items) = value else {
                return Err(ValidationError::TypeMismatch {
                    property: property.name().to_string(),
                    expected: "list",
                    found: value.kind_name(),
                }
                .into());
            };
            if items.is_empty() {
                continue;
            }
            if items.len() > MAX_ARRAY_LEN {
                return Err(DecodeError::LengthExceedsLimit {
                    field: "repeated value",
                    len: items.len(),
                    max: MAX_ARRAY_LEN,
                }
                .into());
            }
            let mut wire_items = Vec::with_capacity(items.len());
            for item in items {
                wire_items.push(encode_scalar(property, item, depth)?);
            }
            let mut array = WireValue::array(wire_items);
            array.indexed = property.is_indexed();
            entity.insert(property.wire_name(), array);
        } else {
            entity.insert(property.wire_name(), encode_scalar(property, value, depth)?);
        }
    }

    Ok(entity)
}

/// Stamps auto-now timestamps and refreshes computed properties, recursing
/// into nested records so the whole tree is consistent before the walk.
fn prepare(instance: &mut Instance, now: UtcDateTime) -> Result<(), ModelError> {
    let schema = instance.schema().clone();

    for (idx, property) in schema.properties().iter().enumerate() {
        match property.property_type() {
            PropertyType::DateTime => {
                if property.has_auto_now()
                    || (property.has_auto_now_add() && instance.slot(idx).is_none())
                {
                    instance.set_slot(idx, Some(PropValue::DateTime(now)));
                }
            }
            PropertyType::Structured | PropertyType::LocalStructured => {
                match instance.slot_mut(idx) {
                    Some(PropValue::Record(record)) => prepare(record, now)?,
                    Some(PropValue::List(items)) => {
                        for item in items {
                            if let PropValue::Record(record) = item {
                                prepare(record, now)?;
                            }
                        }
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }

    instance.recompute()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Property, Schema};
    use crate::wire::{KeyId, Payload};

    fn person_schema() -> std::sync::Arc<Schema> {
        Schema::builder("Person")
            .property(Property::string("name").with_wire_name("na"))
            .property(Property::integer("age").with_wire_name("ag").unindexed())
            .build()
            .unwrap()
    }

    #[test]
    fn test_encode_emits_in_schema_order() {
        let mut person = Instance::build(person_schema())
            .with("age", 42i64)
            .with("name", "Arthur Dent")
            .build()
            .unwrap();

        let entity = encode_model(&mut person, &EncodeContext::new()).unwrap();
        let names: Vec<&str> = entity.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["na", "ag"]);
        assert!(entity.get("na").unwrap().indexed);
        assert!(!entity.get("ag").unwrap().indexed);
    }

    #[test]
    fn test_unset_fields_are_omitted() {
        let mut person = Instance::build(person_schema())
            .with("name", "Arthur Dent")
            .build()
            .unwrap();

        let entity = encode_model(&mut person, &EncodeContext::new()).unwrap();
        assert!(entity.get("ag").is_none());
    }

    #[test]
    fn test_placeholder_key_takes_context_defaults() {
        let mut person = Instance::build(person_schema())
            .with("name", "x")
            .build()
            .unwrap();

        let ctx = EncodeContext::new()
            .with_project("kunstakrobaten")
            .with_namespace("your-namespace");
        let entity = encode_model(&mut person, &ctx).unwrap();

        assert_eq!(entity.key.kind, "Person");
        assert_eq!(entity.key.id, KeyId::Unassigned);
        assert_eq!(entity.key.project.as_deref(), Some("kunstakrobaten"));
        assert_eq!(entity.key.namespace.as_deref(), Some("your-namespace"));
    }

    #[test]
    fn test_existing_key_wins_over_context() {
        let mut person = Instance::build(person_schema())
            .key(Key::new("Person").with_id(7).with_namespace("kept"))
            .with("name", "x")
            .build()
            .unwrap();

        let ctx = EncodeContext::new()
            .with_project("filled-in")
            .with_namespace("ignored");
        let entity = encode_model(&mut person, &ctx).unwrap();

        assert_eq!(entity.key.id, KeyId::Id(7));
        assert_eq!(entity.key.namespace.as_deref(), Some("kept"));
        // Missing pieces are still filled from the context.
        assert_eq!(entity.key.project.as_deref(), Some("filled-in"));
    }

    #[test]
    fn test_required_missing_fails() {
        let schema = Schema::builder("Strict")
            .property(Property::string("must"))
            .property(Property::string("must_too").required())
            .build()
            .unwrap();

        let mut instance = Instance::build(schema).with("must", "x").build().unwrap();
        let err = encode_model(&mut instance, &EncodeContext::new()).unwrap_err();
        assert!(matches!(
            err,
            ModelError::Validation(ValidationError::MissingRequired { .. })
        ));
    }

    #[test]
    fn test_required_with_default_passes_unset() {
        let schema = Schema::builder("Lenient")
            .property(Property::string("info").required().with_default("unknown"))
            .build()
            .unwrap();

        let mut instance = Instance::build(schema).build().unwrap();
        let entity = encode_model(&mut instance, &EncodeContext::new()).unwrap();
        // The default is never written to the wire.
        assert!(entity.get("info").is_none());
    }

    #[test]
    fn test_empty_repeated_emits_nothing() {
        let schema = Schema::builder("ListHolder")
            .property(Property::string("items").repeated())
            .build()
            .unwrap();

        let mut instance = Instance::build(schema)
            .with("items", PropValue::List(Vec::new()))
            .build()
            .unwrap();
        let entity = encode_model(&mut instance, &EncodeContext::new()).unwrap();
        assert!(entity.is_empty());
    }

    #[test]
    fn test_repeated_emits_array_of_scalars() {
        let schema = Schema::builder("ListHolder")
            .property(Property::string("items").repeated().unindexed())
            .build()
            .unwrap();

        let mut instance = Instance::build(schema)
            .with("items", vec!["a", "b"])
            .build()
            .unwrap();
        let entity = encode_model(&mut instance, &EncodeContext::new()).unwrap();

        let value = entity.get("items").unwrap();
        let Payload::Array(items) = &value.payload else {
            panic!("expected array payload");
        };
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|v| v.as_str().is_some()));
    }

    #[test]
    fn test_auto_now_overwrites_each_encode() {
        let schema = Schema::builder("Stamped")
            .property(Property::date_time("update").auto_now())
            .build()
            .unwrap();

        let stale = UtcDateTime::from_micros(0);
        let mut instance = Instance::new(schema);
        instance.set("update", stale).unwrap();

        let before = UtcDateTime::now().micros();
        let first = encode_model(&mut instance, &EncodeContext::new()).unwrap();
        let second = encode_model(&mut instance, &EncodeContext::new()).unwrap();
        let after = UtcDateTime::now().micros();

        let t1 = first.get("update").unwrap().as_timestamp().unwrap();
        let t2 = second.get("update").unwrap().as_timestamp().unwrap();
        assert!(t1 >= before && t2 <= after);
        assert!(t2 >= t1);
        // The instance now carries the stamped value.
        assert_ne!(instance.get("update"), Some(&PropValue::DateTime(stale)));
    }

    #[test]
    fn test_auto_now_add_fills_only_when_unset() {
        let schema = Schema::builder("Created")
            .property(Property::date_time("created").auto_now_add())
            .build()
            .unwrap();

        let fixed = UtcDateTime::from_civil(2017, 8, 26, 0, 0, 0, 0).unwrap();
        let mut instance = Instance::new(schema.clone());
        instance.set("created", fixed).unwrap();
        let entity = encode_model(&mut instance, &EncodeContext::new()).unwrap();
        assert_eq!(
            entity.get("created").unwrap().as_timestamp(),
            Some(fixed.micros())
        );

        let mut unset = Instance::new(schema);
        let entity = encode_model(&mut unset, &EncodeContext::new()).unwrap();
        assert!(entity.get("created").unwrap().as_timestamp().unwrap() > fixed.micros());
    }

    #[test]
    fn test_pre_encode_hook_can_veto() {
        let schema = Schema::builder("Guarded")
            .property(Property::integer("n"))
            .pre_encode_hook(|instance| {
                if instance.get("n").and_then(PropValue::as_int) == Some(13) {
                    return Err(ValidationError::MissingRequired {
                        property: "n".to_string(),
                    }
                    .into());
                }
                Ok(())
            })
            .build()
            .unwrap();

        let mut ok = Instance::build(schema.clone()).with("n", 7i64).build().unwrap();
        assert!(encode_model(&mut ok, &EncodeContext::new()).is_ok());

        let mut bad = Instance::build(schema).with("n", 13i64).build().unwrap();
        assert!(encode_model(&mut bad, &EncodeContext::new()).is_err());
    }
}
