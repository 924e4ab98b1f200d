//! Remote store abstraction for docsync.
//!
//! The remote store is the authority for the document. This module defines
//! the capability the client needs from it, so a network document database,
//! an in-memory store or a test double can be swapped in.
//!
//! # Design
//!
//! Every operation is async and reports failure through [`RemoteError`]:
//! - `fetch()` reads the document
//! - `save()` upserts it
//! - `update()` merges fields into it
//! - `delete()` removes it
//! - `listen()` streams its state until the returned [`Subscription`] is cancelled
//!
//! # Example
//!
//! ```ignore
//! let remote = MemoryRemote::new();
//! remote.save("u1", &profile).await?;
//! let subscription = remote.listen("u1", callback).await?;
//! subscription.cancel();
//! ```

mod memory;

pub use memory::{MemoryRemote, RemoteCall, RemoteOp};

use std::sync::Arc;

use async_trait::async_trait;
use docsync_types::{Document, UpdateFields};
use thiserror::Error;

/// Remote store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// No document exists at the id.
    #[error("document not found: {id}")]
    NotFound {
        /// The id that was looked up.
        id: String,
    },

    /// The store could not be reached.
    #[error("remote store unavailable: {0}")]
    Unavailable(String),

    /// The store refused the operation.
    #[error("remote store rejected the operation: {0}")]
    Rejected(String),

    /// The operation did not complete in time.
    #[error("remote operation timed out")]
    Timeout,
}

/// Callback receiving the document's state from a subscription.
///
/// `Ok(None)` means the document does not exist remotely. Failures are
/// delivered through the same callback.
pub type ChangeCallback<D> = Arc<dyn Fn(Result<Option<D>, RemoteError>) + Send + Sync>;

/// Handle to a live change subscription.
pub trait Subscription: Send + Sync {
    /// Stop delivering changes.
    ///
    /// Synchronous and idempotent: cancelling twice is a no-op.
    fn cancel(&self);
}

/// Remote store capability for a single document type.
///
/// Implementations must not retain references into the client's cache; they
/// only ever see copies.
#[async_trait]
pub trait RemoteStore<D: Document>: Send + Sync + 'static {
    /// Read the document at `id`.
    ///
    /// Fails with [`RemoteError::NotFound`] if it does not exist.
    async fn fetch(&self, id: &str) -> Result<D, RemoteError>;

    /// Create or replace the document at `id`.
    async fn save(&self, id: &str, document: &D) -> Result<(), RemoteError>;

    /// Merge `fields` into the document at `id`.
    ///
    /// Unknown fields and type mismatches are handled as the store sees fit.
    async fn update(&self, id: &str, fields: &UpdateFields) -> Result<(), RemoteError>;

    /// Delete the document at `id`.
    async fn delete(&self, id: &str) -> Result<(), RemoteError>;

    /// Subscribe to the document at `id`.
    ///
    /// `on_change` is called with the current state before this returns or as
    /// its first invocation, then again on every remote change until the
    /// subscription is cancelled.
    async fn listen(
        &self,
        id: &str,
        on_change: ChangeCallback<D>,
    ) -> Result<Box<dyn Subscription>, RemoteError>;
}
