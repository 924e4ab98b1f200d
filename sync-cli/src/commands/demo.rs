//! Offline round trip against an in-memory remote.
//!
//! Logs in, goes offline, updates the document (which queues the write and
//! applies it locally), reads it back from the cache, then reconnects and
//! flushes. The cache file is left behind for `status` and `pending`.

use anyhow::Result;
use docsync_client::{
    FieldValue, FileCache, JsonDocument, MemoryRemote, SyncClient, SyncConfig, UpdateFields,
};
use std::path::Path;

/// Run the demo command.
pub async fn run(
    cache_path: &Path,
    config: SyncConfig,
    id: &str,
    stay_offline: bool,
) -> Result<()> {
    let remote = MemoryRemote::new();
    remote.seed(JsonDocument::new(id).with_field("name", "Bob"));

    let client = SyncClient::open(config, remote.clone(), FileCache::new(cache_path)).await;

    let document = client.log_in(id).await?;
    println!("Logged in:    {}", serde_json::to_string(&document)?);

    remote.set_offline(true);
    println!("Remote is now offline");

    let mut fields = UpdateFields::new();
    fields.insert("name".to_string(), FieldValue::from("Ada"));
    client.update(fields).await?;
    println!("Queued:       {} pending writes", client.pending_writes().await.len());

    let cached = client.get().await?;
    println!("Read (cache): {}", serde_json::to_string(&cached)?);

    if stay_offline {
        println!();
        println!("Left offline. Run 'docsync pending' to see the queued write.");
        return Ok(());
    }

    remote.set_offline(false);
    let report = client.flush_pending_writes().await;
    println!(
        "Flushed:      {} succeeded, {} failed, {} remaining",
        report.succeeded, report.failed, report.remaining
    );

    if let Some(stored) = remote.document(id) {
        println!("Remote:       {}", serde_json::to_string(&stored)?);
    }
    Ok(())
}
