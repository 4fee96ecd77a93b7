//! Cache Store Module
//!
//! In-memory three-class cache: a single stops slot plus keyed maps for
//! routes and ETAs, each expiring on its own schedule.

use std::collections::HashMap;

use serde_json::Value;

use crate::cache::{CacheClass, CacheEntry, CachePolicy, CacheSnapshot, CacheStats};

/// Outcome of a cache lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// Entry is within its max age
    Fresh(Value),
    /// Entry exists but has expired
    Stale(Value),
    /// Nothing stored under the key
    Missing,
}

// == Cache Store ==
/// In-memory storage for every cache class.
///
/// Time is always passed in, so the store itself is deterministic.
#[derive(Debug, Default)]
pub struct CacheStore {
    /// The full stop list
    stops: CacheEntry<Value>,
    /// Route info and route stop lists
    routes: HashMap<String, CacheEntry<Value>>,
    /// Route ETAs and per-stop ETAs
    eta: HashMap<String, CacheEntry<Value>>,
    /// Max age per class
    policy: CachePolicy,
    /// Lookup statistics
    stats: CacheStats,
}

impl CacheStore {
    // == Constructor ==
    /// Creates an empty store with the given expiry policy.
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    fn entry(&self, class: CacheClass, key: &str) -> Option<&CacheEntry<Value>> {
        match class {
            CacheClass::Stops => Some(&self.stops),
            CacheClass::Routes => self.routes.get(key),
            CacheClass::Eta => self.eta.get(key),
        }
    }

    // == Lookup ==
    /// Classifies the entry under `key` without touching statistics.
    ///
    /// The stops class has a single slot and ignores `key`.
    pub fn lookup(&self, class: CacheClass, key: &str, now_ms: u64) -> Lookup {
        let Some(entry) = self.entry(class, key) else {
            return Lookup::Missing;
        };
        match &entry.data {
            Some(data) if entry.is_valid(self.policy.max_age(class), now_ms) => {
                Lookup::Fresh(data.clone())
            }
            Some(data) if entry.timestamp != 0 => Lookup::Stale(data.clone()),
            _ => Lookup::Missing,
        }
    }

    /// True if the entry under `key` may be served without a refresh.
    pub fn is_valid(&self, class: CacheClass, key: &str, now_ms: u64) -> bool {
        self.entry(class, key)
            .is_some_and(|entry| entry.is_valid(self.policy.max_age(class), now_ms))
    }

    // == Get ==
    /// Returns the value only if it is still valid, counting a hit or miss.
    pub fn get(&mut self, class: CacheClass, key: &str, now_ms: u64) -> Option<Value> {
        match self.lookup(class, key, now_ms) {
            Lookup::Fresh(value) => {
                self.stats.record_hit();
                Some(value)
            }
            Lookup::Stale(_) | Lookup::Missing => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Get Stale ==
    /// Returns whatever is stored under `key`, regardless of age.
    pub fn get_stale(&mut self, class: CacheClass, key: &str) -> Option<Value> {
        let value = self.entry(class, key).and_then(|entry| entry.data.clone());
        if value.is_some() {
            self.stats.record_stale_fallback();
        }
        value
    }

    // == Insert ==
    /// Overwrites the entry under `key` with fresh data written at `now_ms`.
    pub fn insert(&mut self, class: CacheClass, key: &str, value: Value, now_ms: u64) {
        let entry = CacheEntry::new(value, now_ms);
        match class {
            CacheClass::Stops => self.stops = entry,
            CacheClass::Routes => {
                self.routes.insert(key.to_string(), entry);
            }
            CacheClass::Eta => {
                self.eta.insert(key.to_string(), entry);
            }
        }
    }

    // == Sweep Expired ==
    /// Removes invalid entries from the keyed classes.
    ///
    /// The stops slot is kept so it can still serve as a stale fallback.
    /// Returns the number of entries removed.
    pub fn sweep_expired(&mut self, now_ms: u64) -> usize {
        let routes_age = self.policy.routes;
        let eta_age = self.policy.eta;

        let before = self.routes.len() + self.eta.len();
        self.routes
            .retain(|_, entry| entry.is_valid(routes_age, now_ms));
        self.eta.retain(|_, entry| entry.is_valid(eta_age, now_ms));
        let removed = before - (self.routes.len() + self.eta.len());

        self.stats.record_swept(removed);
        removed
    }

    // == Snapshot / Restore ==
    /// Copies the current contents into a serializable snapshot.
    pub fn snapshot(&self) -> CacheSnapshot {
        CacheSnapshot {
            stops: self.stops.clone(),
            routes: self.routes.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            eta: self.eta.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        }
    }

    /// Replaces the contents with a snapshot. Statistics are kept.
    pub fn restore(&mut self, snapshot: CacheSnapshot) {
        self.stops = snapshot.stops;
        self.routes = snapshot.routes.into_iter().collect();
        self.eta = snapshot.eta.into_iter().collect();
    }

    // == Length ==
    /// Number of entries held for a class.
    pub fn len(&self, class: CacheClass) -> usize {
        match class {
            CacheClass::Stops => usize::from(self.stops.is_populated()),
            CacheClass::Routes => self.routes.len(),
            CacheClass::Eta => self.eta.len(),
        }
    }

    /// Returns true if no class holds anything.
    pub fn is_empty(&self) -> bool {
        CacheClass::ALL.iter().all(|&class| self.len(class) == 0)
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.clone()
    }
}
