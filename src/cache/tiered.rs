//! Tiered Cache
//!
//! Couples the in-memory [`CacheStore`] with durable [`Storage`]. Every
//! write persists the entire snapshot (all three classes), so one key
//! update rewrites every blob.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::cache::{CacheClass, CachePolicy, CacheSnapshot, CacheStats, CacheStore};
use crate::clock::Clock;
use crate::error::Result;
use crate::storage::Storage;

/// Process-wide cache shared by the data access functions.
///
/// Writers are serialized by the store lock; concurrent misses on the same
/// key are not coalesced and each issue their own request.
pub struct TieredCache {
    store: RwLock<CacheStore>,
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    /// Orders snapshot writes so the last persist always holds the latest state
    persist_lock: Mutex<()>,
}

impl TieredCache {
    // == Constructor ==
    /// Creates an empty cache. Call [`TieredCache::restore`] to load
    /// previously persisted contents.
    pub fn new(policy: CachePolicy, storage: Arc<dyn Storage>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: RwLock::new(CacheStore::new(policy)),
            storage,
            clock,
            persist_lock: Mutex::new(()),
        }
    }

    fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    // == Read Path ==
    /// Returns the value under `key` if it is still valid.
    pub async fn get(&self, class: CacheClass, key: &str) -> Option<Value> {
        let now = self.now_ms();
        self.store.write().await.get(class, key, now)
    }

    /// Returns any value ever stored under `key`, expired or not.
    pub async fn get_stale(&self, class: CacheClass, key: &str) -> Option<Value> {
        self.store.write().await.get_stale(class, key)
    }

    /// True if `key` may be served without a refresh. Does not count as a lookup.
    pub async fn is_valid(&self, class: CacheClass, key: &str) -> bool {
        let now = self.now_ms();
        self.store.read().await.is_valid(class, key, now)
    }

    // == Write Path ==
    /// Overwrites `key` with fresh data, then persists the whole snapshot.
    ///
    /// A persist failure is logged; the in-memory write stands.
    pub async fn put(&self, class: CacheClass, key: &str, value: Value) {
        let now = self.now_ms();
        self.store.write().await.insert(class, key, value, now);
        self.persist_logged().await;
    }

    /// Writes several entries of one class and persists once.
    pub async fn put_many(&self, class: CacheClass, entries: Vec<(String, Value)>) {
        if entries.is_empty() {
            return;
        }
        let now = self.now_ms();
        {
            let mut store = self.store.write().await;
            for (key, value) in entries {
                store.insert(class, &key, value, now);
            }
        }
        self.persist_logged().await;
    }

    // == Sweep Expired ==
    /// Drops invalid entries from the keyed classes and persists the result.
    ///
    /// Returns the number of entries removed.
    pub async fn sweep_expired(&self) -> usize {
        let now = self.now_ms();
        let removed = self.store.write().await.sweep_expired(now);
        if removed > 0 {
            self.persist_logged().await;
        }
        removed
    }

    // == Persistence ==
    /// Writes every class blob to storage.
    pub async fn persist(&self) -> Result<()> {
        let _guard = self.persist_lock.lock().await;
        let blobs = self.store.read().await.snapshot().blobs()?;
        for (key, blob) in blobs {
            self.storage.set(key, &blob).await?;
        }
        Ok(())
    }

    async fn persist_logged(&self) {
        if let Err(e) = self.persist().await {
            warn!("Could not persist cache snapshot: {}", e);
        }
    }

    /// Loads persisted blobs into memory, replacing current contents.
    ///
    /// A missing blob leaves its class empty; a corrupt blob is logged and
    /// skipped so the other classes still load.
    pub async fn restore(&self) -> Result<()> {
        let mut snapshot = CacheSnapshot::default();
        for class in CacheClass::ALL {
            let Some(raw) = self.storage.get(class.storage_key()).await? else {
                debug!("No persisted {} cache", class);
                continue;
            };
            if let Err(e) = snapshot.load_blob(class, &raw) {
                warn!("Discarding persisted {} cache: {}", class, e);
            }
        }

        let restored = snapshot.len();
        self.store.write().await.restore(snapshot);
        info!("Restored {} cache entries from storage", restored);
        Ok(())
    }

    /// Copies the current contents.
    pub async fn snapshot(&self) -> CacheSnapshot {
        self.store.read().await.snapshot()
    }

    /// Returns current lookup statistics.
    pub async fn stats(&self) -> CacheStats {
        self.store.read().await.stats()
    }
}
