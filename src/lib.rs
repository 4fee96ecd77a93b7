//! HK Transit - cached data access for Hong Kong bus and rail arrivals
//!
//! Wraps the KMB bus and MTR rail open data APIs with a tiered
//! (memory + persisted) cache, retry with linear backoff, and stale-cache
//! fallback when the network fails.

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod eta_display;
pub mod geo;
pub mod kmb;
pub mod mtr;
pub mod net;
pub mod state;
pub mod storage;
pub mod tasks;

pub use config::Config;
pub use error::{Result, TransitError};
pub use state::AppState;
pub use tasks::spawn_sweep_task;
