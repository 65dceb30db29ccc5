//! Model schemas.
//!
//! A schema is the ordered set of properties shared by all instances of a
//! kind: its own declarations plus everything inherited from ancestor
//! schemas, with child declarations overriding parents on name collision.
//! Schemas are built once, validated eagerly, and shared as immutable
//! `Arc`s. Because a builder can only embed schemas that already exist,
//! the structured-embedding graph is acyclic by construction.

use std::fmt;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{ModelError, SchemaError};
use crate::model::{Instance, Property, PropertyType};

/// Hook invoked just before an encoded entity is returned. It can observe
/// the instance and veto the encode by returning an error.
pub type PreEncodeHook = Arc<dyn Fn(&Instance) -> Result<(), ModelError> + Send + Sync>;

/// An immutable, validated model schema.
pub struct Schema {
    kind: String,
    properties: Vec<Property>,
    by_name: FxHashMap<String, usize>,
    by_wire_name: FxHashMap<String, usize>,
    pre_encode_hook: Option<PreEncodeHook>,
}

impl Schema {
    /// Starts building a schema for the given kind.
    pub fn builder(kind: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            kind: kind.into(),
            parents: Vec::new(),
            own: Vec::new(),
            pre_encode_hook: None,
        }
    }

    /// The kind name, used as the wire-level record discriminator.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Declared properties in schema order (ancestors first).
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Looks up a property by declared name.
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.by_name.get(name).map(|&i| &self.properties[i])
    }

    /// Returns the slot index for a declared name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Looks up a property and its slot index by wire name.
    pub fn property_by_wire_name(&self, wire_name: &str) -> Option<(usize, &Property)> {
        self.by_wire_name
            .get(wire_name)
            .map(|&i| (i, &self.properties[i]))
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn pre_encode_hook(&self) -> Option<&PreEncodeHook> {
        self.pre_encode_hook.as_ref()
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("kind", &self.kind)
            .field("properties", &self.properties)
            .finish_non_exhaustive()
    }
}

/// Builder that merges declarations with ancestors and validates the result.
pub struct SchemaBuilder {
    kind: String,
    parents: Vec<Arc<Schema>>,
    own: Vec<Property>,
    pre_encode_hook: Option<PreEncodeHook>,
}

impl SchemaBuilder {
    /// Inherits all properties of the given ancestor schema.
    pub fn extends(mut self, parent: &Arc<Schema>) -> Self {
        self.parents.push(parent.clone());
        self
    }

    /// Declares a property.
    pub fn property(mut self, property: Property) -> Self {
        self.own.push(property);
        self
    }

    /// Installs a pre-encode hook.
    pub fn pre_encode_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Instance) -> Result<(), ModelError> + Send + Sync + 'static,
    {
        self.pre_encode_hook = Some(Arc::new(hook));
        self
    }

    /// Validates and freezes the schema.
    pub fn build(self) -> Result<Arc<Schema>, SchemaError> {
        let kind = self.kind;

        // Ancestors first, in extends order; then own declarations, where a
        // name collision replaces the inherited slot (the child's wire name
        // wins) and a new name appends.
        let mut properties: Vec<Property> = Vec::new();
        for parent in &self.parents {
            properties.extend(parent.properties().iter().cloned());
        }

        let mut own_names = FxHashSet::default();
        for property in self.own {
            if !own_names.insert(property.name().to_string()) {
                return Err(SchemaError::DuplicateProperty {
                    kind,
                    name: property.name().to_string(),
                });
            }
            match properties.iter().position(|p| p.name() == property.name()) {
                Some(i) => properties[i] = property,
                None => properties.push(property),
            }
        }

        for property in &mut properties {
            validate_flags(&kind, property)?;
            if !property.property_type().indexable() {
                property.clear_indexed();
            }
        }

        let mut by_name = FxHashMap::default();
        let mut by_wire_name = FxHashMap::default();
        for (i, property) in properties.iter().enumerate() {
            by_name.insert(property.name().to_string(), i);
            if by_wire_name
                .insert(property.wire_name().to_string(), i)
                .is_some()
            {
                return Err(SchemaError::DuplicateWireName {
                    kind,
                    wire_name: property.wire_name().to_string(),
                });
            }
        }

        Ok(Arc::new(Schema {
            kind,
            properties,
            by_name,
            by_wire_name,
            pre_encode_hook: self.pre_encode_hook,
        }))
    }
}

fn validate_flags(kind: &str, property: &Property) -> Result<(), SchemaError> {
    let unsupported = |flag: &'static str| SchemaError::UnsupportedFlag {
        property: format!("{}.{}", kind, property.name()),
        flag,
    };

    if property.is_compressed() && !property.property_type().compressible() {
        return Err(unsupported("compressed"));
    }
    if (property.has_auto_now() || property.has_auto_now_add())
        && property.property_type() != PropertyType::DateTime
    {
        return Err(unsupported("auto_now"));
    }
    if property.is_computed() {
        if property.is_required() {
            return Err(unsupported("required"));
        }
        if property.default_value().is_some() {
            return Err(unsupported("default"));
        }
    }
    if property.is_repeated() {
        if property.default_value().is_some() {
            return Err(unsupported("default"));
        }
        if property.has_auto_now() || property.has_auto_now_add() {
            return Err(unsupported("auto_now"));
        }
        // Arrays of arrays cannot exist on the wire: a repeated structured
        // field cannot embed a schema with repeated fields of its own.
        if property.property_type() == PropertyType::Structured {
            if let Some(nested) = property.nested_schema() {
                if nested.properties().iter().any(Property::is_repeated) {
                    return Err(SchemaError::NestedRepeated {
                        property: format!("{}.{}", kind, property.name()),
                        nested: nested.kind().to_string(),
                    });
                }
            }
        }
    }

    Ok(())
}
