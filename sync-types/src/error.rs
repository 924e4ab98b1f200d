//! Error types for the cache envelope codec.

use thiserror::Error;

/// Errors produced while encoding or decoding a [`CacheEnvelope`](crate::CacheEnvelope).
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// MessagePack serialization failed
    #[error("serialization failed: {0}")]
    Serialization(#[source] rmp_serde::encode::Error),

    /// MessagePack deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] rmp_serde::decode::Error),
}
