//! Values carried by a partial update.
//!
//! Callers pass [`FieldValue`]s, which may hold arbitrary JSON. Only the
//! scalar subset ([`ScalarValue`]) can be persisted as a pending write, so a
//! failed update whose fields are all scalars survives a restart, while one
//! carrying nested JSON cannot be queued.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Field name to value map passed to an update.
pub type UpdateFields = BTreeMap<String, FieldValue>;

/// Field name to scalar map stored in a pending update.
pub type ScalarFields = BTreeMap<String, ScalarValue>;

/// A value written by a partial update.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// UTF-8 string.
    String(String),
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit float.
    Float(f64),
    /// Boolean.
    Boolean(bool),
    /// UTC timestamp.
    Timestamp(DateTime<Utc>),
    /// Any other JSON (arrays, objects, null). Never queued.
    Json(Value),
}

impl FieldValue {
    /// The scalar form of this value, if it has one.
    pub fn to_scalar(&self) -> Option<ScalarValue> {
        match self {
            Self::String(s) => Some(ScalarValue::String(s.clone())),
            Self::Integer(i) => Some(ScalarValue::Integer(*i)),
            Self::Float(f) => Some(ScalarValue::Float(*f)),
            Self::Boolean(b) => Some(ScalarValue::Boolean(*b)),
            Self::Timestamp(t) => Some(ScalarValue::Timestamp(*t)),
            Self::Json(_) => None,
        }
    }

    /// JSON form used when merging into a document.
    ///
    /// Timestamps become RFC 3339 strings, matching chrono's serde output.
    /// Non-finite floats become `null`.
    pub fn to_json(&self) -> Value {
        match self {
            Self::String(s) => Value::String(s.clone()),
            Self::Integer(i) => Value::Number((*i).into()),
            Self::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
            Self::Boolean(b) => Value::Bool(*b),
            Self::Timestamp(t) => Value::String(t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Self::Json(v) => v.clone(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl From<ScalarValue> for FieldValue {
    fn from(value: ScalarValue) -> Self {
        match value {
            ScalarValue::String(s) => Self::String(s),
            ScalarValue::Integer(i) => Self::Integer(i),
            ScalarValue::Float(f) => Self::Float(f),
            ScalarValue::Boolean(b) => Self::Boolean(b),
            ScalarValue::Timestamp(t) => Self::Timestamp(t),
        }
    }
}

/// The closed set of values a pending update may hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ScalarValue {
    /// UTF-8 string.
    String(String),
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit float.
    Float(f64),
    /// Boolean.
    Boolean(bool),
    /// UTC timestamp.
    Timestamp(DateTime<Utc>),
}

/// Convert update fields to their persistable form.
///
/// Returns `None` if any value has no scalar form.
pub fn scalar_fields(fields: &UpdateFields) -> Option<ScalarFields> {
    fields
        .iter()
        .map(|(name, value)| value.to_scalar().map(|scalar| (name.clone(), scalar)))
        .collect()
}

/// Widen persisted scalars back into update fields.
pub fn widen_fields(fields: &ScalarFields) -> UpdateFields {
    fields
        .iter()
        .map(|(name, value)| (name.clone(), FieldValue::from(value.clone())))
        .collect()
}
