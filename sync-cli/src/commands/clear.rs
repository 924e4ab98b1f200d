//! Delete the cache file.

use anyhow::{Context, Result};
use docsync_client::{FileCache, JsonDocument, LocalCache};
use std::path::Path;

/// Run the clear command.
pub async fn run(cache_path: &Path) -> Result<()> {
    let existed = cache_path.exists();
    let cache: FileCache<JsonDocument> = FileCache::new(cache_path);
    cache.clear_cache().await.context("Failed to clear cache")?;

    if existed {
        println!("Cleared {}", cache_path.display());
    } else {
        println!("Nothing to clear at {}", cache_path.display());
    }
    Ok(())
}
