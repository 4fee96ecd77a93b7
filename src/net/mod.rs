//! Network Module
//!
//! Upstream HTTP access: connectivity probe, retry schedule and fetcher.

mod connectivity;
mod fetch;
mod retry;

pub use connectivity::{AlwaysOnline, Connectivity, ConnectivityFlag};
pub use fetch::HttpFetcher;
pub use retry::RetryPolicy;
