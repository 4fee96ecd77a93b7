//! Configuration Module
//!
//! Handles loading upstream endpoints, retry and cache settings from
//! environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::CachePolicy;
use crate::net::RetryPolicy;

/// Default KMB open data API root.
pub const DEFAULT_KMB_BASE_URL: &str = "https://data.etabus.gov.hk/v1/transport/kmb";
/// Default MTR live schedule endpoint.
pub const DEFAULT_MTR_SCHEDULE_URL: &str =
    "https://rt.data.gov.hk/v1/transport/mtr/getSchedule.php";
/// Default MTR static open data root.
pub const DEFAULT_MTR_DATA_BASE_URL: &str = "https://opendata.mtr.com.hk/data";

/// Runtime configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// KMB REST API root, without trailing slash
    pub kmb_base_url: String,
    /// MTR next-train endpoint
    pub mtr_schedule_url: String,
    /// Root for the MTR CSV downloads
    pub mtr_data_base_url: String,
    /// Directory holding persisted cache blobs
    pub cache_dir: PathBuf,
    /// Retries after the first failed attempt
    pub max_retries: u32,
    /// Base delay in milliseconds, multiplied by the retry number
    pub retry_base_delay_ms: u64,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Expiry sweep interval in seconds
    pub sweep_interval_secs: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `KMB_BASE_URL` - KMB API root
    /// - `MTR_SCHEDULE_URL` - MTR next-train endpoint
    /// - `MTR_DATA_BASE_URL` - MTR CSV root
    /// - `CACHE_DIR` - persisted cache directory (default: platform cache dir)
    /// - `MAX_RETRIES` - retries per request (default: 3)
    /// - `RETRY_BASE_DELAY_MS` - backoff base (default: 1000)
    /// - `REQUEST_TIMEOUT_SECS` - request timeout (default: 10)
    /// - `SWEEP_INTERVAL_SECS` - expiry sweep frequency (default: 10)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            kmb_base_url: env::var("KMB_BASE_URL").unwrap_or(defaults.kmb_base_url),
            mtr_schedule_url: env::var("MTR_SCHEDULE_URL").unwrap_or(defaults.mtr_schedule_url),
            mtr_data_base_url: env::var("MTR_DATA_BASE_URL")
                .unwrap_or(defaults.mtr_data_base_url),
            cache_dir: env::var("CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            max_retries: parse_env("MAX_RETRIES").unwrap_or(defaults.max_retries),
            retry_base_delay_ms: parse_env("RETRY_BASE_DELAY_MS")
                .unwrap_or(defaults.retry_base_delay_ms),
            request_timeout_secs: parse_env("REQUEST_TIMEOUT_SECS")
                .unwrap_or(defaults.request_timeout_secs),
            sweep_interval_secs: parse_env("SWEEP_INTERVAL_SECS")
                .unwrap_or(defaults.sweep_interval_secs),
        }
    }

    /// Retry policy described by this configuration.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            Duration::from_millis(self.retry_base_delay_ms),
        )
    }

    /// Request timeout as a Duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Sweep interval as a Duration.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        let sweep_secs = CachePolicy::default().shortest().as_secs();
        Self {
            kmb_base_url: DEFAULT_KMB_BASE_URL.to_string(),
            mtr_schedule_url: DEFAULT_MTR_SCHEDULE_URL.to_string(),
            mtr_data_base_url: DEFAULT_MTR_DATA_BASE_URL.to_string(),
            cache_dir: default_cache_dir(),
            max_retries: 3,
            retry_base_delay_ms: 1000,
            request_timeout_secs: 10,
            sweep_interval_secs: sweep_secs,
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

fn default_cache_dir() -> PathBuf {
    let mut path = dirs::cache_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("hk_transit");
    path
}
