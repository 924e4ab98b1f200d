//! Show cache status.

use anyhow::{Context, Result};
use docsync_client::{
    CacheEnvelope, CacheError, Document, FileCache, JsonDocument, LocalCache, SyncConfig,
};
use std::path::Path;

/// Run the status command.
pub async fn run(cache_path: &Path, config: &SyncConfig) -> Result<()> {
    println!("=== docsync status ===");
    println!();
    println!("Cache file: {}", cache_path.display());

    let cache: FileCache<JsonDocument> = FileCache::new(cache_path);
    match cache.load_cache().await {
        Ok(Some(envelope)) => {
            for line in describe(&envelope, &config.schema_version) {
                println!("{}", line);
            }
        }
        Ok(None) => {
            println!("Cache: EMPTY");
            println!();
            println!("Run 'docsync demo' to create one.");
        }
        Err(CacheError::Codec(e)) => {
            println!("Cache: UNREADABLE ({})", e);
            println!();
            println!("It will be discarded on next open. Run 'docsync clear' to remove it now.");
        }
        Err(e) => return Err(e).context("Failed to read cache"),
    }

    Ok(())
}

/// Summary lines for an envelope.
fn describe(envelope: &CacheEnvelope<JsonDocument>, expected_version: &str) -> Vec<String> {
    let compatibility = if envelope.is_compatible(expected_version) {
        "compatible".to_string()
    } else {
        format!("INCOMPATIBLE (expected {}), will be reset", expected_version)
    };

    let document = match &envelope.document {
        Some(document) if document.id().is_empty() => "cached (no id)".to_string(),
        Some(document) => format!("cached (id: {})", document.id()),
        None => "none".to_string(),
    };

    vec![
        format!("Schema:   {} - {}", envelope.schema_version, compatibility),
        format!("Document: {}", document),
        format!("Pending:  {} writes", envelope.pending_writes.len()),
    ]
}
