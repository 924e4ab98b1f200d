//! SyncClient - the offline-first manager for one document.
//!
//! This module provides [`SyncClient`], which keeps a single document in
//! sync between a [`RemoteStore`] and a [`LocalCache`].
//!
//! # Architecture
//!
//! SyncClient uses the pure pieces from sync-core (pending queue, lifecycle
//! state machine, field merge) and interprets their results against the two
//! injected ports.
//!
//! ```text
//! Application → SyncClient → RemoteStore → Network
//!                   ↓     ↘
//!              sync-core    LocalCache → Disk
//! ```
//!
//! Every operation runs under one async lock, so operations on one client
//! never interleave. Remote change notifications are queued on a channel and
//! applied by a background task that takes the same lock.
//!
//! # Example
//!
//! ```ignore
//! use docsync_client::{FileCache, MemoryRemote, SyncClient, SyncConfig};
//!
//! let client = SyncClient::open(SyncConfig::default(), remote, FileCache::new(path)).await;
//!
//! let profile = client.log_in("u1").await?;
//! client.update(fields).await?;
//! client.flush_pending_writes().await;
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use docsync_core::{
    apply_fields, resolve_document_id, FlushReport, LifecycleAction, LifecycleEvent,
    LifecycleState, MergeError, PendingQueue, QueueError,
};
use docsync_types::{
    scalar_fields, widen_fields, CacheEnvelope, Document, PendingWrite, UpdateFields,
};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tokio::task::JoinHandle;

use crate::cache::{CacheError, LocalCache};
use crate::config::SyncConfig;
use crate::lifecycle::LifecycleSignal;
use crate::remote::{ChangeCallback, RemoteError, RemoteStore, Subscription};

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No document id is set and none can be recovered from the cache.
    #[error("no document id: log in or save a document first")]
    MissingDocumentId,

    /// Remote store error with no local fallback.
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    /// A failed write could not be queued.
    #[error("pending-write queue full (capacity: {capacity})")]
    PendingQueueFull {
        /// Queue capacity.
        capacity: usize,
    },
}

type Change<D> = Result<Option<D>, RemoteError>;

/// A change tagged with its delivery number within one subscription.
type Delivery<D> = (u64, Change<D>);

/// The offline-first sync client.
///
/// Owns the cache envelope and the remote subscription for one document.
pub struct SyncClient<D, R, L> {
    inner: Arc<Inner<D, R, L>>,
    lifecycle_task: Option<JoinHandle<()>>,
}

struct Inner<D, R, L> {
    config: SyncConfig,
    remote: R,
    local: L,
    state: Mutex<ClientState<D>>,
    changes: watch::Sender<Option<D>>,
}

struct ClientState<D> {
    document_id: Option<String>,
    cache: CacheEnvelope<D>,
    subscription: Option<ActiveSubscription>,
    lifecycle: LifecycleState,
    // Bumped on every subscribe so a stale pump cannot touch the cache.
    generation: u64,
}

struct ActiveSubscription {
    handle: Box<dyn Subscription>,
    pump: JoinHandle<()>,
    generation: u64,
    delivered: Arc<AtomicU64>,
    // Deliveries numbered at or below this predate the cached document.
    watermark: u64,
}

impl ActiveSubscription {
    fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::SeqCst)
    }

    fn supersede(&mut self, mark: u64) {
        self.watermark = self.watermark.max(mark);
    }

    fn accepts(&self, generation: u64, sequence: u64) -> bool {
        self.generation == generation && sequence > self.watermark
    }
}

impl Drop for ActiveSubscription {
    fn drop(&mut self) {
        self.handle.cancel();
        self.pump.abort();
    }
}

impl<D, R, L> SyncClient<D, R, L>
where
    D: Document,
    R: RemoteStore<D>,
    L: LocalCache<D>,
{
    /// Create a client, loading the cache envelope from `local`.
    ///
    /// An envelope written with a different schema version, or one that can
    /// no longer be decoded, is cleared and the client starts empty. Pending
    /// writes in a compatible envelope are kept.
    pub async fn open(config: SyncConfig, remote: R, local: L) -> Self {
        let cache = load_envelope(&config, &local).await;
        let (changes, _) = watch::channel(cache.document.clone());

        let inner = Arc::new(Inner {
            config,
            remote,
            local,
            state: Mutex::new(ClientState {
                document_id: None,
                cache,
                subscription: None,
                lifecycle: LifecycleState::default(),
                generation: 0,
            }),
            changes,
        });

        Self {
            inner,
            lifecycle_task: None,
        }
    }

    /// Create a client that follows `signal` until it is dropped.
    pub async fn open_with_lifecycle(
        config: SyncConfig,
        remote: R,
        local: L,
        signal: &LifecycleSignal,
    ) -> Self {
        let events = signal.subscribe();
        let mut client = Self::open(config, remote, local).await;
        client.lifecycle_task = Some(tokio::spawn(follow_lifecycle(
            Arc::downgrade(&client.inner),
            events,
        )));
        client
    }

    /// Sign in to the document at `id`.
    ///
    /// Subscribes to remote changes (replacing any previous subscription),
    /// flushes pending writes, then fetches the document. Pending writes go
    /// out before the fetch so the fresh snapshot already reflects them.
    pub async fn log_in(&self, id: &str) -> Result<D, ClientError> {
        let inner = &self.inner;
        let mut state = inner.state.lock().await;

        state.document_id = Some(id.to_string());
        inner.subscribe(&mut state).await;
        inner.flush_locked(&mut state).await;
        inner.get_locked(&mut state).await
    }

    /// Sign out: drop the subscription, the id and the whole cache.
    ///
    /// Pending writes not yet flushed are discarded.
    pub async fn log_out(&self) {
        let inner = &self.inner;
        let mut state = inner.state.lock().await;

        state.subscription = None;
        state.document_id = None;
        if state.cache.has_pending_writes() {
            tracing::warn!(
                "Discarding {} unflushed pending writes on log out",
                state.cache.pending_writes.len()
            );
        }
        state.cache = CacheEnvelope::empty(&inner.config.schema_version);
        inner.changes.send_replace(None);

        if let Err(e) = inner.local.clear_cache().await {
            tracing::warn!("Failed to clear cache: {}", e);
        }
    }

    /// Read the document.
    ///
    /// Fetches from the remote store and caches the result. If the fetch
    /// fails and a document is cached, the cached copy is returned instead.
    pub async fn get(&self) -> Result<D, ClientError> {
        let mut state = self.inner.state.lock().await;
        self.inner.get_locked(&mut state).await
    }

    /// Write the whole document.
    ///
    /// The document's id becomes the current id. On remote failure the save
    /// is queued and the cache is left as it was.
    pub async fn save(&self, document: D) -> Result<(), ClientError> {
        let inner = &self.inner;
        let mut state = inner.state.lock().await;

        let id = document.id().to_string();
        if id.is_empty() {
            return Err(ClientError::MissingDocumentId);
        }
        state.document_id = Some(id.clone());

        let mark = delivery_mark(&state);
        match inner.remote.save(&id, &document).await {
            Ok(()) => {
                inner.replace_document(&mut state, Some(document), mark).await;
                Ok(())
            }
            Err(e) => {
                inner
                    .handle_pending_write(&mut state, PendingWrite::Save(document), &e)
                    .await
            }
        }
    }

    /// Merge `fields` into the document.
    ///
    /// On remote failure, scalar-only fields are queued (when pending writes
    /// are enabled) and merged into the cached copy right away. Fields that
    /// cannot be queued surface the remote error.
    pub async fn update(&self, fields: UpdateFields) -> Result<(), ClientError> {
        let inner = &self.inner;
        let mut state = inner.state.lock().await;
        let id = resolve_id(&state)?;

        let mark = delivery_mark(&state);
        match inner.remote.update(&id, &fields).await {
            Ok(()) => {
                match merge_cached(&state, &fields) {
                    Some(Ok(merged)) => {
                        inner.replace_document(&mut state, Some(merged), mark).await
                    }
                    merge => {
                        if let Some(Err(e)) = merge {
                            tracing::debug!("Local merge failed, refetching {}: {}", id, e);
                        }
                        match inner.remote.fetch(&id).await {
                            Ok(document) => {
                                inner.replace_document(&mut state, Some(document), mark).await
                            }
                            Err(e) => tracing::warn!("Refresh of {} after update failed: {}", id, e),
                        }
                    }
                }
                Ok(())
            }
            Err(e) => {
                let Some(scalars) = scalar_fields(&fields) else {
                    return Err(e.into());
                };

                inner
                    .handle_pending_write(&mut state, PendingWrite::Update(scalars), &e)
                    .await?;

                match merge_cached(&state, &fields) {
                    Some(Ok(merged)) => {
                        inner.replace_document(&mut state, Some(merged), mark).await
                    }
                    Some(Err(e)) => tracing::debug!("Optimistic merge skipped: {}", e),
                    None => {}
                }
                Ok(())
            }
        }
    }

    /// Delete the document.
    ///
    /// On remote failure the delete is queued (if enabled) and the cached
    /// document stays until a retry succeeds.
    pub async fn delete(&self) -> Result<(), ClientError> {
        let inner = &self.inner;
        let mut state = inner.state.lock().await;
        let id = resolve_id(&state)?;

        let mark = delivery_mark(&state);
        match inner.remote.delete(&id).await {
            Ok(()) => {
                inner.replace_document(&mut state, None, mark).await;
                Ok(())
            }
            Err(e) if inner.config.pending_writes => {
                inner
                    .handle_pending_write(&mut state, PendingWrite::Delete, &e)
                    .await
            }
            Err(e) => {
                tracing::error!("Remote delete of {} failed: {}", id, e);
                Err(e.into())
            }
        }
    }

    /// Replay every pending write against the remote store.
    ///
    /// A no-op if the queue is empty or no document id resolves. Writes that
    /// fail stay queued in their original relative order; see
    /// [`FlushPolicy`](docsync_core::FlushPolicy) for what happens to the
    /// writes after a failure.
    pub async fn flush_pending_writes(&self) -> FlushReport {
        let mut state = self.inner.state.lock().await;
        self.inner.flush_locked(&mut state).await
    }

    /// Apply a lifecycle event directly.
    ///
    /// Hosts that do not use a [`LifecycleSignal`] can call this instead.
    pub async fn handle_lifecycle(&self, event: LifecycleEvent) {
        self.inner.handle_lifecycle(event).await;
    }

    /// Current document id, if one is set.
    pub async fn document_id(&self) -> Option<String> {
        self.inner.state.lock().await.document_id.clone()
    }

    /// Cached copy of the document.
    pub async fn cached_document(&self) -> Option<D> {
        self.inner.state.lock().await.cache.document.clone()
    }

    /// Queued writes, oldest first.
    pub async fn pending_writes(&self) -> Vec<PendingWrite<D>> {
        self.inner.state.lock().await.cache.pending_writes.clone()
    }

    /// Copy of the whole cache envelope.
    pub async fn cache(&self) -> CacheEnvelope<D> {
        self.inner.state.lock().await.cache.clone()
    }

    /// True while a remote subscription is live.
    pub async fn is_listening(&self) -> bool {
        self.inner.state.lock().await.subscription.is_some()
    }

    /// Current lifecycle state.
    pub async fn lifecycle_state(&self) -> LifecycleState {
        self.inner.state.lock().await.lifecycle
    }

    /// Watch the cached document.
    ///
    /// The receiver sees every replacement of the cached copy, whether from
    /// an operation or from a remote change notification.
    pub fn watch(&self) -> watch::Receiver<Option<D>> {
        self.inner.changes.subscribe()
    }

    /// Configuration this client runs with.
    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }
}

impl<D, R, L> Drop for SyncClient<D, R, L> {
    fn drop(&mut self) {
        if let Some(task) = self.lifecycle_task.take() {
            task.abort();
        }
    }
}

impl<D, R, L> Inner<D, R, L>
where
    D: Document,
    R: RemoteStore<D>,
    L: LocalCache<D>,
{
    async fn persist(&self, state: &ClientState<D>) {
        if let Err(e) = self.local.save_cache(&state.cache).await {
            tracing::warn!("Failed to persist cache: {}", e);
        }
    }

    /// Replace the cached document as the result of an operation.
    ///
    /// `mark` is the delivery count taken before the operation reached the
    /// remote store. Deliveries up to it are older than `document` and get
    /// dropped; later ones still apply.
    async fn replace_document(
        &self,
        state: &mut ClientState<D>,
        document: Option<D>,
        mark: u64,
    ) {
        if let Some(subscription) = state.subscription.as_mut() {
            subscription.supersede(mark);
        }
        self.store_document(state, document).await;
    }

    async fn store_document(&self, state: &mut ClientState<D>, document: Option<D>) {
        state.cache.document = document;
        self.changes.send_replace(state.cache.document.clone());
        self.persist(state).await;
    }

    async fn get_locked(&self, state: &mut ClientState<D>) -> Result<D, ClientError> {
        let id = resolve_id(state)?;

        let mark = delivery_mark(state);
        match self.remote.fetch(&id).await {
            Ok(document) => {
                self.replace_document(state, Some(document.clone()), mark).await;
                Ok(document)
            }
            Err(e) => match &state.cache.document {
                Some(cached) => {
                    tracing::warn!("Fetch of {} failed, serving cached copy: {}", id, e);
                    Ok(cached.clone())
                }
                None => Err(e.into()),
            },
        }
    }

    async fn handle_pending_write(
        &self,
        state: &mut ClientState<D>,
        write: PendingWrite<D>,
        cause: &RemoteError,
    ) -> Result<(), ClientError> {
        let kind = write.kind();
        if !self.config.pending_writes {
            tracing::error!(
                "Remote {} failed and pending writes are disabled, dropping it: {}",
                kind,
                cause
            );
            return Ok(());
        }

        let mut queue = PendingQueue::from_writes(
            std::mem::take(&mut state.cache.pending_writes),
            self.config.max_pending_writes,
        );
        let pushed = queue.push(write);
        state.cache.pending_writes = queue.into_writes();

        match pushed {
            Ok(()) => {
                tracing::warn!(
                    "Remote {} failed, queued for retry ({} pending): {}",
                    kind,
                    state.cache.pending_writes.len(),
                    cause
                );
                self.persist(state).await;
                Ok(())
            }
            Err(QueueError::Full { capacity }) => {
                tracing::error!(
                    "Remote {} failed and the pending-write queue is full ({}): {}",
                    kind,
                    capacity,
                    cause
                );
                Err(ClientError::PendingQueueFull { capacity })
            }
        }
    }

    async fn flush_locked(&self, state: &mut ClientState<D>) -> FlushReport {
        if state.cache.pending_writes.is_empty() {
            return FlushReport::default();
        }
        let Ok(id) = resolve_id(state) else {
            tracing::debug!("No document id, skipping flush");
            return FlushReport {
                remaining: state.cache.pending_writes.len(),
                ..FlushReport::default()
            };
        };

        let queue = PendingQueue::from_writes(
            std::mem::take(&mut state.cache.pending_writes),
            self.config.max_pending_writes,
        );
        let mut batch = queue.begin_flush(self.config.flush_policy);

        while let Some(write) = batch.next_write() {
            let result = match &write {
                PendingWrite::Save(document) => self.remote.save(document.id(), document).await,
                PendingWrite::Update(fields) => {
                    self.remote.update(&id, &widen_fields(fields)).await
                }
                PendingWrite::Delete => self.remote.delete(&id).await,
            };
            match result {
                Ok(()) => batch.succeeded(),
                Err(e) => {
                    tracing::warn!("Replay of pending {} failed: {}", write.kind(), e);
                    batch.failed(write);
                }
            }
        }

        let (remaining, report) = batch.finish();
        state.cache.pending_writes = remaining;
        self.persist(state).await;

        tracing::info!(
            "Flushed pending writes: {} succeeded, {} failed, {} remaining",
            report.succeeded,
            report.failed,
            report.remaining
        );
        report
    }

    async fn subscribe(self: &Arc<Self>, state: &mut ClientState<D>) {
        state.subscription = None;

        let Some(id) = state.document_id.clone() else {
            return;
        };
        if state.lifecycle.is_suspended() {
            tracing::debug!("Suspended, deferring subscription to {}", id);
            return;
        }

        state.generation += 1;
        let generation = state.generation;

        let delivered = Arc::new(AtomicU64::new(0));
        let (tx, rx) = mpsc::unbounded_channel::<Delivery<D>>();
        let counter = Arc::clone(&delivered);
        let on_change: ChangeCallback<D> = Arc::new(move |change: Change<D>| {
            let sequence = counter.fetch_add(1, Ordering::SeqCst) + 1;
            // Receiver gone means the subscription is being torn down.
            let _ = tx.send((sequence, change));
        });

        match self.remote.listen(&id, on_change).await {
            Ok(handle) => {
                let pump = tokio::spawn(pump_changes(Arc::downgrade(self), rx, generation));
                state.subscription = Some(ActiveSubscription {
                    handle,
                    pump,
                    generation,
                    delivered,
                    watermark: 0,
                });
            }
            Err(e) => tracing::warn!("Failed to subscribe to {}: {}", id, e),
        }
    }

    async fn apply_change(&self, (sequence, change): Delivery<D>, generation: u64) {
        let mut state = self.state.lock().await;
        let current = state
            .subscription
            .as_ref()
            .is_some_and(|subscription| subscription.accepts(generation, sequence));
        if !current {
            return;
        }

        match change {
            Ok(document) => self.store_document(&mut state, document).await,
            Err(e) => tracing::warn!("Subscription error: {}", e),
        }
    }

    async fn handle_lifecycle(self: &Arc<Self>, event: LifecycleEvent) {
        let mut state = self.state.lock().await;
        let (next, actions) = state.lifecycle.on_event(event);
        state.lifecycle = next;

        for action in actions {
            match action {
                LifecycleAction::CancelSubscription => state.subscription = None,
                LifecycleAction::Resubscribe => self.subscribe(&mut state).await,
            }
        }
    }
}

fn resolve_id<D: Document>(state: &ClientState<D>) -> Result<String, ClientError> {
    resolve_document_id(state.document_id.as_deref(), state.cache.document.as_ref())
        .map(str::to_string)
        .ok_or(ClientError::MissingDocumentId)
}

fn delivery_mark<D>(state: &ClientState<D>) -> u64 {
    state
        .subscription
        .as_ref()
        .map_or(0, ActiveSubscription::delivered)
}

fn merge_cached<D: Document>(
    state: &ClientState<D>,
    fields: &UpdateFields,
) -> Option<Result<D, MergeError>> {
    state
        .cache
        .document
        .as_ref()
        .map(|document| apply_fields(document, fields))
}

async fn load_envelope<D, L>(config: &SyncConfig, local: &L) -> CacheEnvelope<D>
where
    D: Document,
    L: LocalCache<D>,
{
    let empty = || CacheEnvelope::empty(&config.schema_version);

    match local.load_cache().await {
        Ok(Some(envelope)) if envelope.is_compatible(&config.schema_version) => envelope,
        Ok(Some(envelope)) => {
            tracing::info!(
                "Discarding cache with schema version {} (expected {})",
                envelope.schema_version,
                config.schema_version
            );
            clear_durable::<D, _>(local).await;
            empty()
        }
        Ok(None) => empty(),
        Err(CacheError::Codec(e)) => {
            tracing::warn!("Discarding unreadable cache: {}", e);
            clear_durable::<D, _>(local).await;
            empty()
        }
        Err(e) => {
            tracing::warn!("Failed to load cache, starting empty: {}", e);
            empty()
        }
    }
}

async fn clear_durable<D: Document, L: LocalCache<D>>(local: &L) {
    if let Err(e) = local.clear_cache().await {
        tracing::warn!("Failed to clear cache: {}", e);
    }
}

async fn pump_changes<D, R, L>(
    inner: Weak<Inner<D, R, L>>,
    mut changes: mpsc::UnboundedReceiver<Delivery<D>>,
    generation: u64,
) where
    D: Document,
    R: RemoteStore<D>,
    L: LocalCache<D>,
{
    while let Some(delivery) = changes.recv().await {
        let Some(client) = inner.upgrade() else {
            break;
        };
        client.apply_change(delivery, generation).await;
    }
}

async fn follow_lifecycle<D, R, L>(
    inner: Weak<Inner<D, R, L>>,
    mut events: broadcast::Receiver<LifecycleEvent>,
) where
    D: Document,
    R: RemoteStore<D>,
    L: LocalCache<D>,
{
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!("Missed {} lifecycle events", skipped);
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };
        let Some(client) = inner.upgrade() else {
            break;
        };
        client.handle_lifecycle(event).await;
    }
}
