//! Ergonomic instance construction.
//!
//! The builder defers errors so call sites can chain assignments, and runs
//! the computed-property pass once at the end, mirroring what decode does
//! for incoming entities.

use std::sync::Arc;

use crate::error::ModelError;
use crate::model::{Instance, PropValue, Schema};
use crate::wire::Key;

/// Builder for [`Instance`].
pub struct InstanceBuilder {
    instance: Instance,
    error: Option<ModelError>,
}

impl InstanceBuilder {
    /// Starts building an instance of the given schema.
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            instance: Instance::new(schema),
            error: None,
        }
    }

    /// Sets the entity key.
    pub fn key(mut self, key: Key) -> Self {
        self.instance.set_key(Some(key));
        self
    }

    /// Assigns a property value. The first failing assignment is reported
    /// by [`build`](Self::build); later calls are ignored.
    pub fn with(mut self, name: &str, value: impl Into<PropValue>) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.instance.set(name, value) {
                self.error = Some(e);
            }
        }
        self
    }

    /// Finishes construction, recomputing computed properties.
    pub fn build(mut self) -> Result<Instance, ModelError> {
        if let Some(e) = self.error {
            return Err(e);
        }
        self.instance.recompute()?;
        Ok(self.instance)
    }
}

impl Instance {
    /// Starts a builder for the given schema.
    pub fn build(schema: Arc<Schema>) -> InstanceBuilder {
        InstanceBuilder::new(schema)
    }
}
