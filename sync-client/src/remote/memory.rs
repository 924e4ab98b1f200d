//! In-memory remote store.
//!
//! Holds documents in a shared map and notifies listeners on every change.
//! Supports injected failures and records every call, which makes it the
//! remote used by tests and the CLI demo.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use docsync_core::apply_fields;
use docsync_types::{Document, UpdateFields};
use parking_lot::Mutex;

use super::{ChangeCallback, RemoteError, RemoteStore, Subscription};

/// Remote operation kinds, for failure injection and call records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOp {
    /// `fetch()`
    Fetch,
    /// `save()`
    Save,
    /// `update()`
    Update,
    /// `delete()`
    Delete,
    /// `listen()`
    Listen,
}

/// A recorded call against the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCall {
    /// Operation that was invoked.
    pub op: RemoteOp,
    /// Document id it targeted.
    pub id: String,
}

/// In-memory remote store.
///
/// Clones share state, so a test can keep one handle while the client owns
/// another.
pub struct MemoryRemote<D> {
    inner: Arc<Mutex<MemoryRemoteInner<D>>>,
}

struct MemoryRemoteInner<D> {
    documents: HashMap<String, D>,
    listeners: HashMap<u64, Listener<D>>,
    next_listener: u64,
    offline: bool,
    fail_next: HashMap<RemoteOp, RemoteError>,
    calls: Vec<RemoteCall>,
}

struct Listener<D> {
    document_id: String,
    callback: ChangeCallback<D>,
}

impl<D> Default for MemoryRemoteInner<D> {
    fn default() -> Self {
        Self {
            documents: HashMap::new(),
            listeners: HashMap::new(),
            next_listener: 0,
            offline: false,
            fail_next: HashMap::new(),
            calls: Vec::new(),
        }
    }
}

impl<D: Document> MemoryRemote<D> {
    /// Create an empty, online store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document without notifying listeners.
    pub fn seed(&self, document: D) {
        let mut inner = self.inner.lock();
        inner
            .documents
            .insert(document.id().to_string(), document);
    }

    /// Current stored copy of a document.
    pub fn document(&self, id: &str) -> Option<D> {
        self.inner.lock().documents.get(id).cloned()
    }

    /// Simulate losing (or regaining) connectivity.
    ///
    /// While offline every operation fails with [`RemoteError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.inner.lock().offline = offline;
    }

    /// Cause the next call of `op` to fail with `error`.
    pub fn fail_next(&self, op: RemoteOp, error: RemoteError) {
        self.inner.lock().fail_next.insert(op, error);
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.inner.lock().calls.clone()
    }

    /// Number of calls made for one operation kind.
    pub fn call_count(&self, op: RemoteOp) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|call| call.op == op)
            .count()
    }

    /// Number of subscriptions not yet cancelled.
    pub fn active_listeners(&self) -> usize {
        self.inner.lock().listeners.len()
    }

    /// Write a document as another replica would, notifying listeners.
    pub fn apply_remote(&self, document: D) {
        let id = document.id().to_string();
        self.inner.lock().documents.insert(id.clone(), document);
        self.notify(&id);
    }

    /// Delete a document as another replica would, notifying listeners.
    pub fn remove_remote(&self, id: &str) {
        self.inner.lock().documents.remove(id);
        self.notify(id);
    }

    /// Record a call and apply injected failures.
    fn begin(&self, op: RemoteOp, id: &str) -> Result<(), RemoteError> {
        let mut inner = self.inner.lock();
        inner.calls.push(RemoteCall {
            op,
            id: id.to_string(),
        });
        if let Some(error) = inner.fail_next.remove(&op) {
            return Err(error);
        }
        if inner.offline {
            return Err(RemoteError::Unavailable("offline".into()));
        }
        Ok(())
    }

    /// Deliver the current state of `id` to its listeners.
    ///
    /// Callbacks run after the lock is released.
    fn notify(&self, id: &str) {
        let (state, callbacks) = {
            let inner = self.inner.lock();
            let callbacks: Vec<ChangeCallback<D>> = inner
                .listeners
                .values()
                .filter(|listener| listener.document_id == id)
                .map(|listener| Arc::clone(&listener.callback))
                .collect();
            (inner.documents.get(id).cloned(), callbacks)
        };
        for callback in callbacks {
            callback(Ok(state.clone()));
        }
    }
}

impl<D> Default for MemoryRemote<D> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryRemoteInner::default())),
        }
    }
}

impl<D> Clone for MemoryRemote<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl<D: Document> RemoteStore<D> for MemoryRemote<D> {
    async fn fetch(&self, id: &str) -> Result<D, RemoteError> {
        self.begin(RemoteOp::Fetch, id)?;
        self.document(id).ok_or_else(|| RemoteError::NotFound { id: id.to_string() })
    }

    async fn save(&self, id: &str, document: &D) -> Result<(), RemoteError> {
        self.begin(RemoteOp::Save, id)?;
        self.inner
            .lock()
            .documents
            .insert(id.to_string(), document.clone());
        self.notify(id);
        Ok(())
    }

    async fn update(&self, id: &str, fields: &UpdateFields) -> Result<(), RemoteError> {
        self.begin(RemoteOp::Update, id)?;
        {
            let mut inner = self.inner.lock();
            let current = inner
                .documents
                .get(id)
                .ok_or_else(|| RemoteError::NotFound { id: id.to_string() })?;
            let merged =
                apply_fields(current, fields).map_err(|e| RemoteError::Rejected(e.to_string()))?;
            inner.documents.insert(id.to_string(), merged);
        }
        self.notify(id);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), RemoteError> {
        self.begin(RemoteOp::Delete, id)?;
        self.inner.lock().documents.remove(id);
        self.notify(id);
        Ok(())
    }

    async fn listen(
        &self,
        id: &str,
        on_change: ChangeCallback<D>,
    ) -> Result<Box<dyn Subscription>, RemoteError> {
        let offline = {
            let mut inner = self.inner.lock();
            inner.calls.push(RemoteCall {
                op: RemoteOp::Listen,
                id: id.to_string(),
            });
            if let Some(error) = inner.fail_next.remove(&RemoteOp::Listen) {
                return Err(error);
            }
            inner.offline
        };

        let key = {
            let mut inner = self.inner.lock();
            let key = inner.next_listener;
            inner.next_listener += 1;
            inner.listeners.insert(
                key,
                Listener {
                    document_id: id.to_string(),
                    callback: Arc::clone(&on_change),
                },
            );
            key
        };

        // Initial delivery: current state, or the connectivity failure.
        if offline {
            on_change(Err(RemoteError::Unavailable("offline".into())));
        } else {
            on_change(Ok(self.document(id)));
        }

        Ok(Box::new(MemorySubscription {
            inner: Arc::downgrade(&self.inner),
            key,
        }))
    }
}

/// Subscription handle returned by [`MemoryRemote::listen`].
struct MemorySubscription<D> {
    inner: Weak<Mutex<MemoryRemoteInner<D>>>,
    key: u64,
}

impl<D: Document> Subscription for MemorySubscription<D> {
    fn cancel(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.lock().listeners.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsync_types::{FieldValue, JsonDocument};
    use std::sync::Mutex as StdMutex;

    type Seen = Arc<StdMutex<Vec<Result<Option<JsonDocument>, RemoteError>>>>;

    fn recorder() -> (ChangeCallback<JsonDocument>, Seen) {
        let seen: Seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: ChangeCallback<JsonDocument> = Arc::new(move |change| {
            sink.lock().unwrap().push(change);
        });
        (callback, seen)
    }

    fn doc(name: &str) -> JsonDocument {
        JsonDocument::new("u1").with_field("name", name)
    }

    // ===========================================
    // Basic Operations
    // ===========================================

    #[tokio::test]
    async fn save_then_fetch() {
        let remote = MemoryRemote::new();
        remote.save("u1", &doc("Ada")).await.unwrap();

        let fetched = remote.fetch("u1").await.unwrap();
        assert_eq!(fetched, doc("Ada"));
    }

    #[tokio::test]
    async fn fetch_missing_is_not_found() {
        let remote: MemoryRemote<JsonDocument> = MemoryRemote::new();

        let result = remote.fetch("nope").await;
        assert_eq!(result, Err(RemoteError::NotFound { id: "nope".into() }));
    }

    #[tokio::test]
    async fn update_merges_fields() {
        let remote = MemoryRemote::new();
        remote.seed(doc("Ada"));

        let mut fields = UpdateFields::new();
        fields.insert("age".into(), FieldValue::Integer(36));
        remote.update("u1", &fields).await.unwrap();

        let stored = remote.document("u1").unwrap();
        assert_eq!(stored.get("age"), Some(&serde_json::json!(36)));
        assert_eq!(stored.get("name"), Some(&serde_json::json!("Ada")));
    }

    #[tokio::test]
    async fn update_missing_document_fails() {
        let remote: MemoryRemote<JsonDocument> = MemoryRemote::new();

        let result = remote.update("u1", &UpdateFields::new()).await;
        assert!(matches!(result, Err(RemoteError::NotFound { .. })));
    }

    #[tokio::test]
    async fn delete_removes_document() {
        let remote = MemoryRemote::new();
        remote.seed(doc("Ada"));

        remote.delete("u1").await.unwrap();
        assert!(remote.document("u1").is_none());
    }

    // ===========================================
    // Failure Injection
    // ===========================================

    #[tokio::test]
    async fn offline_fails_every_operation() {
        let remote = MemoryRemote::new();
        remote.seed(doc("Ada"));
        remote.set_offline(true);

        assert!(matches!(remote.fetch("u1").await, Err(RemoteError::Unavailable(_))));
        assert!(matches!(remote.save("u1", &doc("Bob")).await, Err(RemoteError::Unavailable(_))));
        assert!(matches!(remote.delete("u1").await, Err(RemoteError::Unavailable(_))));
        assert_eq!(remote.document("u1"), Some(doc("Ada")));

        remote.set_offline(false);
        assert!(remote.fetch("u1").await.is_ok());
    }

    #[tokio::test]
    async fn fail_next_only_affects_one_call() {
        let remote = MemoryRemote::new();
        remote.fail_next(RemoteOp::Save, RemoteError::Timeout);

        assert_eq!(remote.save("u1", &doc("Ada")).await, Err(RemoteError::Timeout));
        remote.save("u1", &doc("Ada")).await.unwrap();
    }

    #[tokio::test]
    async fn calls_are_recorded_in_order() {
        let remote = MemoryRemote::new();
        remote.save("u1", &doc("Ada")).await.unwrap();
        let _ = remote.fetch("u1").await;
        let _ = remote.delete("u1").await;

        let ops: Vec<RemoteOp> = remote.calls().iter().map(|c| c.op).collect();
        assert_eq!(ops, vec![RemoteOp::Save, RemoteOp::Fetch, RemoteOp::Delete]);
        assert_eq!(remote.call_count(RemoteOp::Fetch), 1);
    }

    // ===========================================
    // Subscriptions
    // ===========================================

    #[tokio::test]
    async fn listen_delivers_current_state_immediately() {
        let remote = MemoryRemote::new();
        remote.seed(doc("Ada"));
        let (callback, seen) = recorder();

        let _subscription = remote.listen("u1", callback).await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![Ok(Some(doc("Ada")))]);
    }

    #[tokio::test]
    async fn listen_delivers_subsequent_changes() {
        let remote = MemoryRemote::new();
        let (callback, seen) = recorder();
        let _subscription = remote.listen("u1", callback).await.unwrap();

        remote.save("u1", &doc("Ada")).await.unwrap();
        remote.apply_remote(doc("Bob"));
        remote.remove_remote("u1");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0], Ok(None));
        assert_eq!(seen[2], Ok(Some(doc("Bob"))));
        assert_eq!(seen[3], Ok(None));
    }

    #[tokio::test]
    async fn listen_ignores_other_documents() {
        let remote = MemoryRemote::new();
        let (callback, seen) = recorder();
        let _subscription = remote.listen("u1", callback).await.unwrap();

        remote.apply_remote(JsonDocument::new("u2"));

        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn listen_while_offline_delivers_failure() {
        let remote: MemoryRemote<JsonDocument> = MemoryRemote::new();
        remote.set_offline(true);
        let (callback, seen) = recorder();

        let _subscription = remote.listen("u1", callback).await.unwrap();

        let seen = seen.lock().unwrap();
        assert!(matches!(seen[0], Err(RemoteError::Unavailable(_))));
    }

    #[tokio::test]
    async fn cancel_stops_delivery_and_is_idempotent() {
        let remote = MemoryRemote::new();
        let (callback, seen) = recorder();
        let subscription = remote.listen("u1", callback).await.unwrap();
        assert_eq!(remote.active_listeners(), 1);

        subscription.cancel();
        subscription.cancel();
        remote.apply_remote(doc("Ada"));

        assert_eq!(remote.active_listeners(), 0);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn clone_shares_state() {
        let remote1 = MemoryRemote::new();
        let remote2 = remote1.clone();

        remote1.save("u1", &doc("Ada")).await.unwrap();

        assert_eq!(remote2.document("u1"), Some(doc("Ada")));
    }
}
