//! The record kept in sync.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A record synchronized between the remote store and the local cache.
///
/// The sync layer never inspects a document beyond its id. Everything else
/// travels through `serde`.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Stable identifier of this document in the remote store.
    fn id(&self) -> &str;
}

/// A schemaless document: any JSON object whose `"id"` field holds its id.
///
/// Used where the concrete document type is unknown, e.g. when inspecting a
/// cache file from the command line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JsonDocument(Map<String, Value>);

impl JsonDocument {
    /// Create a document holding only its id.
    pub fn new(id: &str) -> Self {
        let mut fields = Map::new();
        fields.insert("id".to_string(), Value::String(id.to_string()));
        Self(fields)
    }

    /// Wrap a JSON value. Returns `None` unless it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    /// Set a field, returning the updated document.
    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.0.insert(name.to_string(), value.into());
        self
    }

    /// Read a field.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Unwrap into a JSON object value.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl Document for JsonDocument {
    fn id(&self) -> &str {
        self.0.get("id").and_then(Value::as_str).unwrap_or_default()
    }
}
