//! Background Tasks Module
//!
//! Contains background tasks that run periodically while the services are up.
//!
//! # Tasks
//! - Expiry sweep: removes expired route and ETA entries at a fixed interval

mod sweep;

pub use sweep::spawn_sweep_task;
