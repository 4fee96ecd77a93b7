//! KMB Module
//!
//! Cached access to the KMB bus open data API.

mod client;
pub mod keys;
mod models;

pub use client::KmbClient;
pub use models::{Direction, Eta, Route, RouteStop, Stop};
