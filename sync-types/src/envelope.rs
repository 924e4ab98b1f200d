//! The cache envelope - the versioned unit of local persistence.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{EnvelopeError, ScalarFields};

/// Schema version written into new envelopes.
///
/// Compared by exact string equality on load; any other value discards the
/// persisted envelope. Keep the major component stable for additive changes.
pub const CACHE_SCHEMA_VERSION: &str = "1.0";

/// A remote mutation that failed and waits to be retried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "data", rename_all = "snake_case")]
pub enum PendingWrite<D> {
    /// Upsert the whole document.
    Save(D),
    /// Merge scalar fields into the remote document.
    Update(ScalarFields),
    /// Delete the remote document.
    Delete,
}

impl<D> PendingWrite<D> {
    /// Short operation name, for logs and display.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Save(_) => "save",
            Self::Update(_) => "update",
            Self::Delete => "delete",
        }
    }
}

/// Last known document state plus the writes the remote has not accepted yet.
///
/// The envelope is replaced as a whole on every change, never patched in
/// place, so each persisted copy is a consistent snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEnvelope<D> {
    /// Schema version this envelope was written with.
    pub schema_version: String,
    /// Last authoritative copy, `None` if never fetched or after logout/delete.
    pub document: Option<D>,
    /// Unacknowledged writes, oldest first.
    pub pending_writes: Vec<PendingWrite<D>>,
}

impl<D> CacheEnvelope<D> {
    /// An envelope with no document and no pending writes.
    pub fn empty(schema_version: &str) -> Self {
        Self {
            schema_version: schema_version.to_string(),
            document: None,
            pending_writes: Vec::new(),
        }
    }

    /// True iff this envelope was written with exactly `current_version`.
    pub fn is_compatible(&self, current_version: &str) -> bool {
        self.schema_version == current_version
    }

    /// Replace the cached document.
    pub fn with_document(self, document: Option<D>) -> Self {
        Self { document, ..self }
    }

    /// Replace the pending-write queue.
    pub fn with_pending_writes(self, pending_writes: Vec<PendingWrite<D>>) -> Self {
        Self {
            pending_writes,
            ..self
        }
    }

    /// Check whether any writes are waiting to be flushed.
    pub fn has_pending_writes(&self) -> bool {
        !self.pending_writes.is_empty()
    }
}

impl<D: Serialize> CacheEnvelope<D> {
    /// Serialize to MessagePack bytes (named fields).
    pub fn to_bytes(&self) -> Result<Vec<u8>, EnvelopeError> {
        rmp_serde::to_vec_named(self).map_err(EnvelopeError::Serialization)
    }
}

impl<D: DeserializeOwned> CacheEnvelope<D> {
    /// Deserialize from MessagePack bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        rmp_serde::from_slice(bytes).map_err(EnvelopeError::Deserialization)
    }
}

impl<D> Default for CacheEnvelope<D> {
    fn default() -> Self {
        Self::empty(CACHE_SCHEMA_VERSION)
    }
}
