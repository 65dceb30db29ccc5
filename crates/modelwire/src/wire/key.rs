//! Entity keys.
//!
//! A key carries the kind (the wire-level record discriminator), an optional
//! numeric or string identifier, and optional namespace/project scoping. It
//! travels on the entity, never in the field map, and round-trips
//! independently of the properties.

use serde::{Deserialize, Serialize};

/// The identifier part of a key.
///
/// `Unassigned` marks a client-constructed record awaiting an identifier
/// from the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum KeyId {
    #[default]
    Unassigned,
    /// Numeric identifier assigned by the store.
    Id(i64),
    /// Caller-chosen string name.
    Name(String),
}

impl KeyId {
    /// Returns true if an identifier has been assigned.
    pub fn is_assigned(&self) -> bool {
        !matches!(self, KeyId::Unassigned)
    }
}

/// A wire-level entity key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Key {
    pub project: Option<String>,
    pub namespace: Option<String>,
    pub kind: String,
    pub id: KeyId,
}

impl Key {
    /// Creates an incomplete key for the given kind.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            project: None,
            namespace: None,
            kind: kind.into(),
            id: KeyId::Unassigned,
        }
    }

    /// Sets a numeric identifier.
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = KeyId::Id(id);
        self
    }

    /// Sets a string name identifier.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.id = KeyId::Name(name.into());
        self
    }

    /// Sets the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Sets the project.
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Returns true if the key has an assigned identifier.
    pub fn is_complete(&self) -> bool {
        self.id.is_assigned()
    }
}
