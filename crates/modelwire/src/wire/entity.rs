//! Wire-level entities.
//!
//! An entity is a key plus a flat map of named wire values. Field names are
//! unique; the codec emits fields in schema declaration order, so the map
//! preserves insertion order.

use serde::{Deserialize, Serialize};

use crate::wire::{Key, WireValue};

/// A wire-level record exchanged with the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub key: Key,
    properties: Vec<(String, WireValue)>,
}

impl Entity {
    /// Creates an entity with no properties.
    pub fn new(key: Key) -> Self {
        Self {
            key,
            properties: Vec::new(),
        }
    }

    /// Inserts a field, replacing any existing field of the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: WireValue) {
        let name = name.into();
        if let Some(slot) = self.properties.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.properties.push((name, value));
        }
    }

    /// Adds a field, builder style.
    pub fn with_property(mut self, name: impl Into<String>, value: WireValue) -> Self {
        self.insert(name, value);
        self
    }

    /// Looks up a field by name.
    pub fn get(&self, name: &str) -> Option<&WireValue> {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Returns true if a field with the given name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterates fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &WireValue)> {
        self.properties.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::KeyId;

    #[test]
    fn test_insert_replaces_existing() {
        let mut entity = Entity::new(Key::new("Item"));
        entity.insert("count", WireValue::integer(1));
        entity.insert("count", WireValue::integer(2));

        assert_eq!(entity.len(), 1);
        assert_eq!(entity.get("count").and_then(WireValue::as_int), Some(2));
    }

    #[test]
    fn test_iteration_preserves_insertion_order() {
        let entity = Entity::new(Key::new("Item"))
            .with_property("b", WireValue::integer(1))
            .with_property("a", WireValue::integer(2))
            .with_property("c", WireValue::integer(3));

        let names: Vec<&str> = entity.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["b", "a", "c"]);
    }

    #[test]
    fn test_key_travels_with_entity() {
        let entity = Entity::new(Key::new("Item").with_name("thing-1"));
        assert_eq!(entity.key.kind, "Item");
        assert_eq!(entity.key.id, KeyId::Name("thing-1".to_string()));
    }
}
