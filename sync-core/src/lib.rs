//! # sync-core
//!
//! Pure logic for docsync (no I/O, instant tests).
//!
//! This crate holds the rules of the sync manager without any network or
//! disk access:
//! - [`pending`] - the pending-write queue and the flush pass over it
//! - [`lifecycle`] - the foreground/background state machine
//! - [`merge`] - applying partial updates to a document
//! - [`session`] - resolving which document an operation targets
//!
//! The actual I/O is performed by `sync-client`, which drives these pieces
//! and interprets the actions they return.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod lifecycle;
pub mod merge;
pub mod pending;
pub mod session;

pub use lifecycle::{LifecycleAction, LifecycleEvent, LifecycleState};
pub use merge::{apply_fields, MergeError};
pub use pending::{FlushBatch, FlushPolicy, FlushReport, PendingQueue, QueueError};
pub use session::resolve_document_id;
