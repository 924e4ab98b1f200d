//! Applying a partial update to a document.
//!
//! The document is serialized to JSON, each updated field replaces the
//! top-level key of the same name, and the result is decoded back. Field
//! names are not interpreted as paths. A merge may not change the
//! document's id.

use docsync_types::{Document, UpdateFields};
use thiserror::Error;

/// Reasons a local merge cannot be performed.
#[derive(Debug, Error)]
pub enum MergeError {
    /// The document could not be serialized.
    #[error("failed to encode document: {0}")]
    Encode(#[source] serde_json::Error),

    /// The document does not serialize to a JSON object.
    #[error("document is not a JSON object")]
    NotAnObject,

    /// The merged value no longer matches the document type.
    #[error("merged fields do not fit the document: {0}")]
    Decode(#[source] serde_json::Error),

    /// The fields would give the document a different id.
    #[error("update would change document id from {from} to {to}")]
    IdChanged {
        /// Id before the merge.
        from: String,
        /// Id the merged document would carry.
        to: String,
    },
}

/// Return a copy of `document` with `fields` merged in.
pub fn apply_fields<D: Document>(document: &D, fields: &UpdateFields) -> Result<D, MergeError> {
    let mut value = serde_json::to_value(document).map_err(MergeError::Encode)?;
    let object = value.as_object_mut().ok_or(MergeError::NotAnObject)?;
    for (name, field) in fields {
        object.insert(name.clone(), field.to_json());
    }
    let merged: D = serde_json::from_value(value).map_err(MergeError::Decode)?;
    if merged.id() != document.id() {
        return Err(MergeError::IdChanged {
            from: document.id().to_string(),
            to: merged.id().to_string(),
        });
    }
    Ok(merged)
}
