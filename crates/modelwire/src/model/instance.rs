//! Model instances.
//!
//! An instance holds one optional value per declared property, plus an
//! optional key. Assignment is checked against the property's type and
//! domain; computed properties reject direct assignment and are refreshed
//! via [`Instance::recompute`].

use std::fmt;
use std::sync::Arc;

use crate::error::{ModelError, SchemaError, ValidationError};
use crate::model::{PropValue, Property, PropertyType, Schema};
use crate::wire::Key;

/// A typed record conforming to a schema.
#[derive(Clone)]
pub struct Instance {
    schema: Arc<Schema>,
    key: Option<Key>,
    values: Vec<Option<PropValue>>,
}

impl Instance {
    /// Creates an instance with every slot unset.
    pub fn new(schema: Arc<Schema>) -> Self {
        let values = vec![None; schema.len()];
        Self {
            schema,
            key: None,
            values,
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn kind(&self) -> &str {
        self.schema.kind()
    }

    pub fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    pub fn set_key(&mut self, key: Option<Key>) {
        self.key = key;
    }

    /// Reads a property value by declared name. Unset slots return None.
    pub fn get(&self, name: &str) -> Option<&PropValue> {
        let idx = self.schema.index_of(name)?;
        self.values[idx].as_ref()
    }

    /// Assigns a property value, validating type and domain.
    ///
    /// Computed properties cannot be assigned directly.
    pub fn set(&mut self, name: &str, value: impl Into<PropValue>) -> Result<(), ModelError> {
        let idx = self
            .schema
            .index_of(name)
            .ok_or_else(|| SchemaError::UnknownProperty {
                kind: self.schema.kind().to_string(),
                property: name.to_string(),
            })?;
        let property = &self.schema.properties()[idx];
        if property.is_computed() {
            return Err(SchemaError::ComputedAssignment {
                property: name.to_string(),
            }
            .into());
        }

        let value = value.into();
        check_value(property, &value)?;
        self.values[idx] = Some(value);
        Ok(())
    }

    /// Clears a property value.
    pub fn clear(&mut self, name: &str) -> Result<(), ModelError> {
        let idx = self
            .schema
            .index_of(name)
            .ok_or_else(|| SchemaError::UnknownProperty {
                kind: self.schema.kind().to_string(),
                property: name.to_string(),
            })?;
        self.values[idx] = None;
        Ok(())
    }

    /// Recomputes every computed property from the currently stored fields,
    /// in schema order.
    pub fn recompute(&mut self) -> Result<(), ModelError> {
        for idx in 0..self.schema.len() {
            let Some(compute) = self.schema.properties()[idx].compute_fn().cloned() else {
                continue;
            };
            let value = compute.as_ref()(self)?;
            self.values[idx] = Some(value);
        }
        Ok(())
    }

    /// Writes a slot without assignment checks. The codec uses this for
    /// values it has already validated while decoding.
    pub(crate) fn set_slot(&mut self, idx: usize, value: Option<PropValue>) {
        self.values[idx] = value;
    }

    pub(crate) fn slot(&self, idx: usize) -> Option<&PropValue> {
        self.values[idx].as_ref()
    }

    pub(crate) fn slot_mut(&mut self, idx: usize) -> &mut Option<PropValue> {
        &mut self.values[idx]
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.schema.kind() == other.schema.kind()
            && self.key == other.key
            && self.values == other.values
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Instance");
        s.field("kind", &self.schema.kind());
        s.field("key", &self.key);
        for (property, value) in self.schema.properties().iter().zip(&self.values) {
            s.field(property.name(), value);
        }
        s.finish()
    }
}

/// Checks a value against a property's declared type and domain.
fn check_value(property: &Property, value: &PropValue) -> Result<(), ModelError> {
    if property.is_repeated() {
        let PropValue::List(items) = value else {
            return Err(ValidationError::TypeMismatch {
                property: property.name().to_string(),
                expected: "list",
                found: value.kind_name(),
            }
            .into());
        };
        for item in items {
            check_scalar(property, item)?;
        }
        return Ok(());
    }
    // A bare list is only meaningful on repeated slots, except for pickle
    // properties, whose value domain is the whole dynamic tree.
    if matches!(value, PropValue::List(_)) && property.property_type() != PropertyType::Pickle {
        return Err(ValidationError::TypeMismatch {
            property: property.name().to_string(),
            expected: property.property_type().name(),
            found: "list",
        }
        .into());
    }
    check_scalar(property, value)
}

fn check_scalar(property: &Property, value: &PropValue) -> Result<(), ModelError> {
    let mismatch = || {
        ModelError::from(ValidationError::TypeMismatch {
            property: property.name().to_string(),
            expected: property.property_type().name(),
            found: value.kind_name(),
        })
    };

    let expects = |ok: bool| if ok { Ok(()) } else { Err(mismatch()) };

    match property.property_type() {
        PropertyType::Boolean => expects(matches!(value, PropValue::Bool(_))),
        PropertyType::Integer => expects(matches!(value, PropValue::Int(_))),
        PropertyType::Float => expects(matches!(value, PropValue::Float(_))),
        PropertyType::String | PropertyType::Text => expects(matches!(value, PropValue::Str(_))),
        PropertyType::Blob => expects(matches!(value, PropValue::Bytes(_))),
        PropertyType::DateTime => expects(matches!(value, PropValue::DateTime(_))),
        PropertyType::Date => expects(matches!(value, PropValue::Date(_))),
        PropertyType::Time => expects(matches!(value, PropValue::Time(_))),
        PropertyType::GeoPt => expects(matches!(value, PropValue::GeoPt(_))),
        PropertyType::Json => expects(matches!(value, PropValue::Json(_))),
        PropertyType::Pickle => match value {
            PropValue::Record(_) | PropValue::Message(_) => Err(ValidationError::Unpicklable {
                kind: value.kind_name(),
            }
            .into()),
            _ => Ok(()),
        },
        PropertyType::Generic => match value {
            PropValue::Bool(_)
            | PropValue::Int(_)
            | PropValue::Float(_)
            | PropValue::Str(_)
            | PropValue::Bytes(_)
            | PropValue::DateTime(_)
            | PropValue::GeoPt(_)
            | PropValue::Json(_) => Ok(()),
            _ => Err(mismatch()),
        },
        PropertyType::Enum => {
            let PropValue::Enum(member) = value else {
                return Err(mismatch());
            };
            // Enum properties always carry a domain by construction.
            let Some(domain) = property.enum_domain() else {
                return Err(mismatch());
            };
            if !domain.contains(member) {
                return Err(ValidationError::NotInEnumDomain {
                    domain: domain.name().to_string(),
                    member: member.name.clone(),
                }
                .into());
            }
            Ok(())
        }
        PropertyType::Message => {
            let PropValue::Message(message) = value else {
                return Err(mismatch());
            };
            let expected = property.message_type().unwrap_or_default();
            if message.type_name() != expected {
                return Err(ValidationError::MessageTypeMismatch {
                    property: property.name().to_string(),
                    expected: expected.to_string(),
                    found: message.type_name().to_string(),
                }
                .into());
            }
            Ok(())
        }
        PropertyType::Structured | PropertyType::LocalStructured => {
            let PropValue::Record(record) = value else {
                return Err(mismatch());
            };
            let Some(nested) = property.nested_schema() else {
                return Err(mismatch());
            };
            if record.kind() != nested.kind() {
                return Err(ValidationError::TypeMismatch {
                    property: property.name().to_string(),
                    expected: "record of the embedded kind",
                    found: "record of another kind",
                }
                .into());
            }
            Ok(())
        }
    }
}
