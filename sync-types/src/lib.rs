//! # sync-types
//!
//! Data types shared by every docsync crate.
//!
//! - [`Document`] - the record kept in sync, identified by a string id
//! - [`FieldValue`] / [`ScalarValue`] - values of a partial update
//! - [`PendingWrite`] - a remote mutation waiting to be retried
//! - [`CacheEnvelope`] - the versioned local snapshot plus its pending writes
//! - [`EnvelopeError`] - codec errors

#![warn(missing_docs)]
#![warn(clippy::all)]

mod document;
mod envelope;
mod error;
mod fields;

pub use document::{Document, JsonDocument};
pub use envelope::{CacheEnvelope, PendingWrite, CACHE_SCHEMA_VERSION};
pub use error::EnvelopeError;
pub use fields::{scalar_fields, widen_fields, FieldValue, ScalarFields, ScalarValue, UpdateFields};
