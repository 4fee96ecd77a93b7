//! Serializable image of the whole cache, one blob per class.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::{CacheClass, CacheEntry};
use crate::error::{Result, TransitError};

/// Everything the cache holds, in a stable order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub stops: CacheEntry<Value>,
    pub routes: BTreeMap<String, CacheEntry<Value>>,
    pub eta: BTreeMap<String, CacheEntry<Value>>,
}

impl CacheSnapshot {
    /// Serializes one class into its persisted blob.
    pub fn blob(&self, class: CacheClass) -> Result<String> {
        let encoded = match class {
            CacheClass::Stops => serde_json::to_string(&self.stops),
            CacheClass::Routes => serde_json::to_string(&self.routes),
            CacheClass::Eta => serde_json::to_string(&self.eta),
        };
        encoded.map_err(|e| TransitError::Storage(format!("encode {class} cache: {e}")))
    }

    /// All three blobs keyed by their storage key.
    pub fn blobs(&self) -> Result<Vec<(&'static str, String)>> {
        CacheClass::ALL
            .iter()
            .map(|&class| Ok((class.storage_key(), self.blob(class)?)))
            .collect()
    }

    /// Replaces one class from its persisted blob.
    pub fn load_blob(&mut self, class: CacheClass, raw: &str) -> Result<()> {
        let decode_err =
            |e: serde_json::Error| TransitError::data_shape(format!("{class} cache blob"), e.to_string());
        match class {
            CacheClass::Stops => self.stops = serde_json::from_str(raw).map_err(decode_err)?,
            CacheClass::Routes => self.routes = serde_json::from_str(raw).map_err(decode_err)?,
            CacheClass::Eta => self.eta = serde_json::from_str(raw).map_err(decode_err)?,
        }
        Ok(())
    }

    /// Number of populated entries across all classes.
    pub fn len(&self) -> usize {
        usize::from(self.stops.is_populated()) + self.routes.len() + self.eta.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
