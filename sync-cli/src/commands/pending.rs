//! List pending writes.

use anyhow::{Context, Result};
use docsync_client::{
    Document, FieldValue, FileCache, JsonDocument, LocalCache, PendingWrite,
};
use std::path::Path;

/// Run the pending command.
pub async fn run(cache_path: &Path, json: bool) -> Result<()> {
    let cache: FileCache<JsonDocument> = FileCache::new(cache_path);
    let writes = cache
        .load_cache()
        .await
        .context("Failed to read cache")?
        .map(|envelope| envelope.pending_writes)
        .unwrap_or_default();

    if json {
        println!("{}", serde_json::to_string_pretty(&writes)?);
        return Ok(());
    }

    if writes.is_empty() {
        println!("No pending writes.");
        return Ok(());
    }

    println!("{} pending writes (oldest first):", writes.len());
    for (i, write) in writes.iter().enumerate() {
        println!("  [{}] {}", i + 1, describe(write));
    }

    Ok(())
}

/// One-line description of a write.
fn describe(write: &PendingWrite<JsonDocument>) -> String {
    match write {
        PendingWrite::Save(document) => format!("save {}", document.id()),
        PendingWrite::Update(fields) => {
            let assignments: Vec<String> = fields
                .iter()
                .map(|(name, value)| {
                    format!("{}={}", name, FieldValue::from(value.clone()).to_json())
                })
                .collect();
            format!("update {}", assignments.join(", "))
        }
        PendingWrite::Delete => "delete".to_string(),
    }
}
