//! File-backed cache.
//!
//! The envelope is stored as a single MessagePack file. Writes go to a
//! sibling temp file first and are renamed into place, so readers never see
//! a half-written envelope.

use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use docsync_types::{CacheEnvelope, Document};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::{CacheError, LocalCache};

/// Envelope stored in one file on disk.
#[derive(Debug)]
pub struct FileCache<D> {
    path: PathBuf,
    _document: PhantomData<fn() -> D>,
}

impl<D> FileCache<D> {
    /// Cache stored at `path`. Parent directories are created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _document: PhantomData,
        }
    }

    /// Location of the envelope file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl<D> Clone for FileCache<D> {
    fn clone(&self) -> Self {
        Self::new(self.path.clone())
    }
}

async fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path).await {
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[async_trait]
impl<D: Document> LocalCache<D> for FileCache<D> {
    async fn load_cache(&self) -> Result<Option<CacheEnvelope<D>>, CacheError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(CacheEnvelope::from_bytes(&bytes)?))
    }

    async fn save_cache(&self, envelope: &CacheEnvelope<D>) -> Result<(), CacheError> {
        let bytes = envelope.to_bytes()?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let temp = self.temp_path();
        let mut file = fs::File::create(&temp).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp, &self.path).await?;
        Ok(())
    }

    async fn clear_cache(&self) -> Result<(), CacheError> {
        remove_if_exists(&self.temp_path()).await?;
        remove_if_exists(&self.path).await?;
        Ok(())
    }
}
