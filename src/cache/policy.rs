//! Cache classes and their maximum ages.

use std::fmt;
use std::time::Duration;

const HOUR: Duration = Duration::from_secs(60 * 60);
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Top-level data category, each with its own expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheClass {
    /// The full stop list (a single slot)
    Stops,
    /// Route info and route stop lists, keyed
    Routes,
    /// Route and per-stop arrival estimates, keyed
    Eta,
}

impl CacheClass {
    /// All classes, in persistence order.
    pub const ALL: [CacheClass; 3] = [CacheClass::Stops, CacheClass::Routes, CacheClass::Eta];

    /// Logical key of the persisted blob for this class.
    pub fn storage_key(self) -> &'static str {
        match self {
            CacheClass::Stops => "kmb_stops_cache",
            CacheClass::Routes => "kmb_routes_cache",
            CacheClass::Eta => "kmb_eta_cache",
        }
    }
}

impl fmt::Display for CacheClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CacheClass::Stops => "stops",
            CacheClass::Routes => "routes",
            CacheClass::Eta => "eta",
        };
        f.write_str(name)
    }
}

/// Maximum age per cache class. Fixed once the cache is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub stops: Duration,
    pub routes: Duration,
    pub eta: Duration,
    /// Lifetime of the MTR reference datasets
    pub mtr_static: Duration,
}

impl CachePolicy {
    /// Maximum age for a KMB cache class.
    pub fn max_age(&self, class: CacheClass) -> Duration {
        match class {
            CacheClass::Stops => self.stops,
            CacheClass::Routes => self.routes,
            CacheClass::Eta => self.eta,
        }
    }

    /// Shortest lifetime among the KMB classes; the sweep cadence.
    pub fn shortest(&self) -> Duration {
        self.stops.min(self.routes).min(self.eta)
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            stops: 24 * HOUR,
            routes: 24 * HOUR,
            eta: Duration::from_secs(10),
            mtr_static: 30 * DAY,
        }
    }
}
