use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::engine::{StoreError, WalStore};
use crate::observability::RESERVATIONS_LIVE;

const CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Background task that rewrites the log once enough appends pile up.
pub async fn run_compactor(store: Arc<WalStore>, threshold: u64) {
    let mut interval = tokio::time::interval(CHECK_INTERVAL);
    loop {
        interval.tick().await;
        if let Err(e) = compact_if_due(&store, threshold).await {
            error!("WAL compaction failed: {e}");
        }
    }
}

/// Compact when at least `threshold` appends happened since the last
/// rewrite. Returns whether a compaction ran.
pub async fn compact_if_due(store: &WalStore, threshold: u64) -> Result<bool, StoreError> {
    let appends = store.appends_since_compact().await;
    if appends < threshold {
        return Ok(false);
    }
    store.compact().await?;
    let live = store.len().await;
    metrics::gauge!(RESERVATIONS_LIVE).set(live as f64);
    info!("compacted WAL after {appends} appends, {live} live reservations");
    Ok(true)
}
