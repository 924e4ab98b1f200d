//! In-memory cache for tests.

use std::sync::Arc;

use async_trait::async_trait;
use docsync_types::{CacheEnvelope, Document};
use parking_lot::Mutex;

use super::{CacheError, LocalCache};

/// In-memory cache.
///
/// Clones share state, so a test can inspect what the client persisted or
/// hand the same "disk" to a second client to simulate a restart.
pub struct MemoryCache<D> {
    inner: Arc<Mutex<MemoryCacheInner<D>>>,
}

struct MemoryCacheInner<D> {
    stored: Option<CacheEnvelope<D>>,
    saves: usize,
    clears: usize,
    fail_saves: bool,
}

impl<D: Document> MemoryCache<D> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache already holding `envelope`, as if left by a previous run.
    pub fn with_envelope(envelope: CacheEnvelope<D>) -> Self {
        let cache = Self::new();
        cache.inner.lock().stored = Some(envelope);
        cache
    }

    /// The currently stored envelope.
    pub fn stored(&self) -> Option<CacheEnvelope<D>> {
        self.inner.lock().stored.clone()
    }

    /// Number of successful `save_cache` calls.
    pub fn save_count(&self) -> usize {
        self.inner.lock().saves
    }

    /// Number of `clear_cache` calls.
    pub fn clear_count(&self) -> usize {
        self.inner.lock().clears
    }

    /// Make every `save_cache` fail until turned off again.
    pub fn fail_saves(&self, fail: bool) {
        self.inner.lock().fail_saves = fail;
    }
}

impl<D> Default for MemoryCache<D> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryCacheInner {
                stored: None,
                saves: 0,
                clears: 0,
                fail_saves: false,
            })),
        }
    }
}

impl<D> Clone for MemoryCache<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl<D: Document> LocalCache<D> for MemoryCache<D> {
    async fn load_cache(&self) -> Result<Option<CacheEnvelope<D>>, CacheError> {
        Ok(self.inner.lock().stored.clone())
    }

    async fn save_cache(&self, envelope: &CacheEnvelope<D>) -> Result<(), CacheError> {
        let mut inner = self.inner.lock();
        if inner.fail_saves {
            return Err(CacheError::Unavailable("saves disabled".into()));
        }
        inner.stored = Some(envelope.clone());
        inner.saves += 1;
        Ok(())
    }

    async fn clear_cache(&self) -> Result<(), CacheError> {
        let mut inner = self.inner.lock();
        inner.stored = None;
        inner.clears += 1;
        Ok(())
    }
}
