//! Application State
//!
//! Assembles the shared cache, fetcher and services. UI code holds one
//! `AppState` and calls into `kmb` and `mtr`.

use std::sync::Arc;

use crate::cache::{CachePolicy, TieredCache};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::Result;
use crate::kmb::KmbClient;
use crate::mtr::{MtrEndpoints, MtrService};
use crate::net::{AlwaysOnline, Connectivity, HttpFetcher};
use crate::storage::{FileStorage, Storage};

/// Services shared across the application.
#[derive(Clone)]
pub struct AppState {
    /// Tiered KMB cache, also driven by the sweep task
    pub cache: Arc<TieredCache>,
    pub kmb: Arc<KmbClient>,
    pub mtr: Arc<MtrService>,
}

impl AppState {
    /// Wires the services from explicit collaborators.
    ///
    /// The cache starts empty; call `cache.restore()` to load persisted
    /// contents.
    pub fn new(
        config: &Config,
        storage: Arc<dyn Storage>,
        connectivity: Arc<dyn Connectivity>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let policy = CachePolicy::default();
        let fetcher = Arc::new(HttpFetcher::new(
            config.request_timeout(),
            config.retry_policy(),
            connectivity,
        )?);

        let cache = Arc::new(TieredCache::new(policy, storage.clone(), clock.clone()));
        let kmb = Arc::new(KmbClient::new(
            &config.kmb_base_url,
            fetcher.clone(),
            cache.clone(),
        )?);
        let mtr = Arc::new(MtrService::new(
            MtrEndpoints {
                schedule_url: config.mtr_schedule_url.clone(),
                data_base_url: config.mtr_data_base_url.clone(),
            },
            policy.mtr_static,
            fetcher,
            storage,
            clock,
        ));

        Ok(Self { cache, kmb, mtr })
    }

    /// Production wiring: file storage under the configured cache dir,
    /// system clock, connectivity assumed.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config,
            Arc::new(FileStorage::new(config.cache_dir.clone())),
            Arc::new(AlwaysOnline),
            Arc::new(SystemClock),
        )
    }
}
