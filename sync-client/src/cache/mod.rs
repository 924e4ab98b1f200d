//! Local persistence for the cache envelope.
//!
//! The client keeps its [`CacheEnvelope`] in memory and writes it through
//! this capability after every change. Implementations exchange copies only;
//! they never hold on to the client's envelope.

mod file;
mod memory;

pub use file::FileCache;
pub use memory::MemoryCache;

use async_trait::async_trait;
use docsync_types::{CacheEnvelope, Document, EnvelopeError};
use thiserror::Error;

/// Local persistence errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Reading or writing the backing storage failed.
    #[error("cache I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The stored bytes are not a readable envelope.
    #[error("cache codec failed: {0}")]
    Codec(#[from] EnvelopeError),

    /// Injected or backend-specific failure.
    #[error("cache unavailable: {0}")]
    Unavailable(String),
}

/// Durable (or in-memory) home of the cache envelope.
#[async_trait]
pub trait LocalCache<D: Document>: Send + Sync + 'static {
    /// Read the last stored envelope.
    ///
    /// Nothing stored is `Ok(None)`, not an error.
    async fn load_cache(&self) -> Result<Option<CacheEnvelope<D>>, CacheError>;

    /// Replace the stored envelope.
    ///
    /// Must be atomic from the caller's view: a crash mid-write leaves either
    /// the old or the new envelope, never a torn one.
    async fn save_cache(&self, envelope: &CacheEnvelope<D>) -> Result<(), CacheError>;

    /// Remove the stored envelope. A no-op if nothing is stored.
    async fn clear_cache(&self) -> Result<(), CacheError>;
}
