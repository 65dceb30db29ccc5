//! Property descriptors.
//!
//! A property is a declarative schema field: name, wire name, type tag and
//! flags. Descriptors are created at schema-definition time and never
//! mutated afterwards; the codec dispatches on the type tag to pick the
//! encode/decode strategy.

use std::fmt;
use std::sync::Arc;

use crate::error::ModelError;
use crate::model::{EnumDomain, Instance, PropValue, Schema};

/// Type tags for properties. Each tag has a fixed encode/decode contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyType {
    Boolean,
    Integer,
    Float,
    /// Short, indexable string.
    String,
    /// Long text; optionally deflate-compressed, never indexed.
    Text,
    /// Raw bytes; optionally deflate-compressed, never indexed.
    Blob,
    DateTime,
    Date,
    Time,
    GeoPt,
    /// Arbitrary JSON stored as canonical text.
    Json,
    /// Opaque serialized value tree; decoding requires the unsafe gate.
    Pickle,
    /// Type inferred from the runtime value at encode time.
    Generic,
    /// Domain-restricted integer.
    Enum,
    /// Externally defined message payload.
    Message,
    /// Nested record embedded as a nested entity, fields independently
    /// indexable.
    Structured,
    /// Nested record flattened into one opaque blob field.
    LocalStructured,
}

impl PropertyType {
    /// Returns a short name for the tag, for error messages.
    pub fn name(&self) -> &'static str {
        match self {
            PropertyType::Boolean => "boolean",
            PropertyType::Integer => "integer",
            PropertyType::Float => "float",
            PropertyType::String => "string",
            PropertyType::Text => "text",
            PropertyType::Blob => "blob",
            PropertyType::DateTime => "datetime",
            PropertyType::Date => "date",
            PropertyType::Time => "time",
            PropertyType::GeoPt => "geo point",
            PropertyType::Json => "json",
            PropertyType::Pickle => "pickle",
            PropertyType::Generic => "generic",
            PropertyType::Enum => "enum",
            PropertyType::Message => "message",
            PropertyType::Structured => "structured",
            PropertyType::LocalStructured => "local structured",
        }
    }

    /// Returns true if values of this type can carry the indexed flag.
    pub fn indexable(&self) -> bool {
        !matches!(
            self,
            PropertyType::Text
                | PropertyType::Blob
                | PropertyType::Json
                | PropertyType::Pickle
                | PropertyType::Message
                | PropertyType::LocalStructured
        )
    }

    /// Returns true if the compressed flag applies to this type.
    pub fn compressible(&self) -> bool {
        matches!(
            self,
            PropertyType::Text | PropertyType::Blob | PropertyType::LocalStructured
        )
    }
}

/// Derivation function for computed properties.
pub type ComputeFn = Arc<dyn Fn(&Instance) -> Result<PropValue, ModelError> + Send + Sync>;

/// A schema-declared field descriptor.
#[derive(Clone)]
pub struct Property {
    name: String,
    wire_name: String,
    property_type: PropertyType,
    indexed: bool,
    repeated: bool,
    required: bool,
    compressed: bool,
    auto_now: bool,
    auto_now_add: bool,
    default: Option<PropValue>,
    compute: Option<ComputeFn>,
    nested: Option<Arc<Schema>>,
    domain: Option<Arc<EnumDomain>>,
    message_type: Option<String>,
}

impl Property {
    fn with_type(name: impl Into<String>, property_type: PropertyType) -> Self {
        let name = name.into();
        Self {
            wire_name: name.clone(),
            name,
            property_type,
            indexed: property_type.indexable(),
            repeated: false,
            required: false,
            compressed: false,
            auto_now: false,
            auto_now_add: false,
            default: None,
            compute: None,
            nested: None,
            domain: None,
            message_type: None,
        }
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::with_type(name, PropertyType::Boolean)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::with_type(name, PropertyType::Integer)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::with_type(name, PropertyType::Float)
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::with_type(name, PropertyType::String)
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::with_type(name, PropertyType::Text)
    }

    pub fn blob(name: impl Into<String>) -> Self {
        Self::with_type(name, PropertyType::Blob)
    }

    pub fn date_time(name: impl Into<String>) -> Self {
        Self::with_type(name, PropertyType::DateTime)
    }

    pub fn date(name: impl Into<String>) -> Self {
        Self::with_type(name, PropertyType::Date)
    }

    pub fn time(name: impl Into<String>) -> Self {
        Self::with_type(name, PropertyType::Time)
    }

    pub fn geo_pt(name: impl Into<String>) -> Self {
        Self::with_type(name, PropertyType::GeoPt)
    }

    pub fn json(name: impl Into<String>) -> Self {
        Self::with_type(name, PropertyType::Json)
    }

    pub fn pickle(name: impl Into<String>) -> Self {
        Self::with_type(name, PropertyType::Pickle)
    }

    pub fn generic(name: impl Into<String>) -> Self {
        Self::with_type(name, PropertyType::Generic)
    }

    /// An enum property over a closed domain.
    pub fn enumeration(name: impl Into<String>, domain: Arc<EnumDomain>) -> Self {
        let mut p = Self::with_type(name, PropertyType::Enum);
        p.domain = Some(domain);
        p
    }

    /// A message property carrying payloads of the given external type.
    pub fn message(name: impl Into<String>, message_type: impl Into<String>) -> Self {
        let mut p = Self::with_type(name, PropertyType::Message);
        p.message_type = Some(message_type.into());
        p
    }

    /// A structured property embedding the given schema as a nested entity.
    pub fn structured(name: impl Into<String>, nested: Arc<Schema>) -> Self {
        let mut p = Self::with_type(name, PropertyType::Structured);
        p.nested = Some(nested);
        p
    }

    /// A local-structured property serializing the given schema into one
    /// opaque blob field.
    pub fn local_structured(name: impl Into<String>, nested: Arc<Schema>) -> Self {
        let mut p = Self::with_type(name, PropertyType::LocalStructured);
        p.nested = Some(nested);
        p
    }

    /// A computed property: no wire slot, derived from the other stored
    /// fields, rejected on direct assignment.
    pub fn computed<F>(name: impl Into<String>, property_type: PropertyType, f: F) -> Self
    where
        F: Fn(&Instance) -> Result<PropValue, ModelError> + Send + Sync + 'static,
    {
        let mut p = Self::with_type(name, property_type);
        p.compute = Some(Arc::new(f));
        p
    }

    /// Overrides the wire name (defaults to the declared name).
    pub fn with_wire_name(mut self, wire_name: impl Into<String>) -> Self {
        self.wire_name = wire_name.into();
        self
    }

    /// Clears the indexed flag.
    pub fn unindexed(mut self) -> Self {
        self.indexed = false;
        self
    }

    /// Marks the property as holding an ordered sequence of values.
    pub fn repeated(mut self) -> Self {
        self.repeated = true;
        self
    }

    /// Requires a value at encode time.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Deflate-compresses the stored payload (text, blob, local-structured).
    pub fn compressed(mut self) -> Self {
        self.compressed = true;
        self
    }

    /// Overwrites the value with the current time at every encode.
    pub fn auto_now(mut self) -> Self {
        self.auto_now = true;
        self
    }

    /// Fills the value with the current time at encode only when unset.
    pub fn auto_now_add(mut self) -> Self {
        self.auto_now_add = true;
        self
    }

    /// Supplies a decode-time fallback; never written to the wire.
    pub fn with_default(mut self, default: impl Into<PropValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn wire_name(&self) -> &str {
        &self.wire_name
    }

    pub fn property_type(&self) -> PropertyType {
        self.property_type
    }

    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    pub fn is_repeated(&self) -> bool {
        self.repeated
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    pub fn has_auto_now(&self) -> bool {
        self.auto_now
    }

    pub fn has_auto_now_add(&self) -> bool {
        self.auto_now_add
    }

    pub fn default_value(&self) -> Option<&PropValue> {
        self.default.as_ref()
    }

    pub fn is_computed(&self) -> bool {
        self.compute.is_some()
    }

    pub fn compute_fn(&self) -> Option<&ComputeFn> {
        self.compute.as_ref()
    }

    pub fn nested_schema(&self) -> Option<&Arc<Schema>> {
        self.nested.as_ref()
    }

    pub fn enum_domain(&self) -> Option<&Arc<EnumDomain>> {
        self.domain.as_ref()
    }

    pub fn message_type(&self) -> Option<&str> {
        self.message_type.as_deref()
    }

    /// Forces the indexed flag off. Used by the schema builder to normalize
    /// non-indexable types.
    pub(crate) fn clear_indexed(&mut self) {
        self.indexed = false;
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("wire_name", &self.wire_name)
            .field("type", &self.property_type)
            .field("indexed", &self.indexed)
            .field("repeated", &self.repeated)
            .field("required", &self.required)
            .field("compressed", &self.compressed)
            .field("computed", &self.compute.is_some())
            .finish_non_exhaustive()
    }
}
