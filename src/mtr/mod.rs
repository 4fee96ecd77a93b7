//! MTR Module
//!
//! Cached rail reference data and live next-train lookups.

mod models;
mod service;
mod tabular;

pub use models::{MtrLine, NextTrains, Station, TrainArrival, MTR_LINES};
pub use service::{MtrDataset, MtrEndpoints, MtrService};
pub use tabular::{parse_rows, TabularRow};
