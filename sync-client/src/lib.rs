//! # sync-client
//!
//! Offline-first sync client for a single document.
//!
//! This is the library that applications use to keep one document in sync.
//!
//! ## Features
//!
//! - **Read fallback**: serves the cached copy when the remote store is unreachable
//! - **Pending writes**: failed writes are queued durably and replayed on demand
//! - **Port abstraction**: pluggable remote store and local cache (memory, file)
//! - **Lifecycle wiring**: subscription follows app background/foreground signals
//! - **Pure core**: uses sync-core for queue, merge and lifecycle logic
//!
//! ## Example
//!
//! ```ignore
//! use docsync_client::{FileCache, LifecycleSignal, SyncClient, SyncConfig};
//!
//! let signal = LifecycleSignal::new();
//! let client = SyncClient::open_with_lifecycle(
//!     SyncConfig::default(),
//!     remote,
//!     FileCache::new("profile.cache"),
//!     &signal,
//! )
//! .await;
//!
//! let profile = client.log_in("u1").await?;
//! client.save(profile).await?;
//! signal.backgrounded();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod client;
pub mod config;
pub mod lifecycle;
pub mod remote;

pub use cache::{CacheError, FileCache, LocalCache, MemoryCache};
pub use client::{ClientError, SyncClient};
pub use config::{CacheSettings, ConfigError, Settings, SyncConfig};
pub use lifecycle::LifecycleSignal;
pub use remote::{
    ChangeCallback, MemoryRemote, RemoteCall, RemoteError, RemoteOp, RemoteStore, Subscription,
};

// Re-export the pieces applications touch without depending on the lower crates.
pub use docsync_core::{FlushPolicy, FlushReport, LifecycleEvent, LifecycleState};
pub use docsync_types::{
    CacheEnvelope, Document, FieldValue, JsonDocument, PendingWrite, ScalarValue, UpdateFields,
    CACHE_SCHEMA_VERSION,
};
