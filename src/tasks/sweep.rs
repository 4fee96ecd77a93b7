//! Expiry Sweep Task
//!
//! Background task that periodically removes expired route and ETA entries
//! and persists the pruned cache.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::TieredCache;

/// Spawns a background task that sweeps expired cache entries.
///
/// The task runs in an infinite loop, sleeping for `interval` between
/// sweeps. The natural interval is the ETA lifetime, the shortest-lived
/// class; the long-lived classes rarely have anything to remove.
///
/// # Returns
/// A JoinHandle for the spawned task. Abort it when the owning context is
/// torn down; the task is never cancelled otherwise.
///
/// # Example
/// ```ignore
/// let handle = spawn_sweep_task(cache.clone(), Duration::from_secs(10));
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_sweep_task(cache: Arc<TieredCache>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting cache expiry sweep every {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.sweep_expired().await;
            if removed > 0 {
                info!("Expiry sweep: removed {} entries", removed);
            } else {
                debug!("Expiry sweep: nothing expired");
            }
        }
    })
}
