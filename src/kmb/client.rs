//! KMB Data Access Functions
//!
//! Each accessor checks the tiered cache, fetches with retry on a miss,
//! validates the payload shape, writes the cache and returns typed data.
//! When the fetch fails, any stored value for the key (even expired) is
//! served instead; only with nothing stored does the error reach the caller.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::join_all;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::{CacheClass, TieredCache};
use crate::error::{Result, TransitError};
use crate::geo::{stops_within, Coordinate};
use crate::kmb::{keys, Direction, Eta, Route, RouteStop, Stop};
use crate::net::HttpFetcher;

/// Which part of the response envelope is cached.
#[derive(Debug, Clone, Copy)]
enum Shape {
    /// `data` must be present
    DataField,
    /// `data` must be an array
    DataArray,
}

/// Cached, retrying client for the KMB open data API.
pub struct KmbClient {
    base_url: Url,
    fetcher: Arc<HttpFetcher>,
    cache: Arc<TieredCache>,
}

impl KmbClient {
    // == Constructor ==
    /// Creates a client for the API rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` when `base_url` is not an absolute hierarchical URL.
    pub fn new(
        base_url: &str,
        fetcher: Arc<HttpFetcher>,
        cache: Arc<TieredCache>,
    ) -> Result<Self> {
        let parsed = Url::parse(base_url).map_err(|e| {
            TransitError::InvalidParameter(format!("KMB base URL {base_url:?}: {e}"))
        })?;
        if parsed.cannot_be_a_base() {
            return Err(TransitError::InvalidParameter(format!(
                "KMB base URL {base_url:?} cannot hold a path"
            )));
        }
        Ok(Self {
            base_url: parsed,
            fetcher,
            cache,
        })
    }

    /// Appends `segments` to the base URL, percent-encoding each one so a
    /// caller-supplied ID always stays a single path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<String> {
        if let Some(bad) = segments.iter().find(|s| matches!(**s, "" | "." | "..")) {
            return Err(TransitError::InvalidParameter(format!(
                "{bad:?} is not a usable path segment"
            )));
        }
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        Ok(url.into())
    }

    // == Stops ==
    /// Every KMB stop. Cached for 24 hours.
    pub async fn fetch_all_stops(&self) -> Result<Vec<Stop>> {
        self.cached_fetch(CacheClass::Stops, keys::ALL_STOPS, &["stop"], Shape::DataArray)
            .await
    }

    /// Stops within `radius_m` metres of a point, nearest first.
    pub async fn find_stops_near(
        &self,
        lat: f64,
        lon: f64,
        radius_m: f64,
    ) -> Result<Vec<(Stop, f64)>> {
        let stops = self.fetch_all_stops().await?;
        Ok(stops_within(&stops, Coordinate::new(lat, lon), radius_m))
    }

    // == Routes ==
    /// Origin and destination for one route variant. Cached for 24 hours.
    pub async fn fetch_route_info(
        &self,
        route: &str,
        direction: &str,
        service_type: u32,
    ) -> Result<Route> {
        let key = keys::route_info(route, direction, service_type);
        let service_type = service_type.to_string();
        let segments = ["route", route, direction, service_type.as_str()];
        self.cached_fetch(CacheClass::Routes, &key, &segments, Shape::DataField)
            .await
    }

    /// Ordered stops for one route variant. Cached for 24 hours.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` for an empty route, an unknown direction or a
    /// service type of zero, raised before any network access.
    pub async fn fetch_route_stops(
        &self,
        route: &str,
        direction: &str,
        service_type: u32,
    ) -> Result<Vec<RouteStop>> {
        if route.trim().is_empty() {
            return Err(TransitError::InvalidParameter(
                "route must be a non-empty string".to_string(),
            ));
        }
        let direction: Direction = direction.parse()?;
        if service_type < 1 {
            return Err(TransitError::InvalidParameter(format!(
                "service type must be at least 1, got {service_type}"
            )));
        }

        let key = keys::route_stops(route, direction.as_str(), service_type);
        let service_type = service_type.to_string();
        let segments = ["route-stop", route, direction.as_str(), service_type.as_str()];
        self.cached_fetch(CacheClass::Routes, &key, &segments, Shape::DataField)
            .await
    }

    /// Stop sequence of every route. Cached for 24 hours.
    pub async fn fetch_all_route_stops(&self) -> Result<Vec<RouteStop>> {
        self.cached_fetch(
            CacheClass::Routes,
            keys::ALL_ROUTE_STOPS,
            &["route-stop"],
            Shape::DataArray,
        )
        .await
    }

    // == ETAs ==
    /// Arrival estimates for every stop of a route. Cached for 10 seconds.
    pub async fn fetch_route_eta(&self, route: &str, service_type: u32) -> Result<Vec<Eta>> {
        let key = keys::route_eta(route, service_type);
        let service_type = service_type.to_string();
        let segments = ["route-eta", route, service_type.as_str()];
        self.cached_fetch(CacheClass::Eta, &key, &segments, Shape::DataField)
            .await
    }

    /// Arrival estimates of every route serving one stop. Cached for 10 seconds.
    pub async fn fetch_nearby_stops(&self, stop_id: &str) -> Result<Vec<Eta>> {
        let key = keys::stop_eta(stop_id);
        self.cached_fetch(CacheClass::Eta, &key, &["stop-eta", stop_id], Shape::DataField)
            .await
    }

    /// Arrival estimates for many stops at once.
    ///
    /// Stops with a valid cache entry are answered from memory; the rest are
    /// fetched concurrently. A stop whose fetch fails gets its stale cached
    /// estimates or, failing that, an empty list. This never returns an error.
    pub async fn batch_fetch_stop_etas(&self, stop_ids: &[String]) -> HashMap<String, Vec<Eta>> {
        let mut results = HashMap::with_capacity(stop_ids.len());
        let mut seen = HashSet::new();
        let mut to_fetch = Vec::new();

        for stop_id in stop_ids {
            if !seen.insert(stop_id.as_str()) {
                continue;
            }
            let key = keys::stop_eta(stop_id);
            match self.cached_value::<Vec<Eta>>(CacheClass::Eta, &key).await {
                Some(etas) => {
                    results.insert(stop_id.clone(), etas);
                }
                None => to_fetch.push(stop_id.clone()),
            }
        }

        debug!(
            "Batch ETA: {} cached, {} to fetch",
            results.len(),
            to_fetch.len()
        );

        let outcomes = join_all(to_fetch.into_iter().map(|stop_id| async move {
            let outcome = self
                .fetch_and_decode::<Vec<Eta>>(&["stop-eta", stop_id.as_str()], Shape::DataField)
                .await;
            (stop_id, outcome)
        }))
        .await;

        let mut fresh = Vec::new();
        for (stop_id, outcome) in outcomes {
            match outcome {
                Ok((raw, etas)) => {
                    fresh.push((keys::stop_eta(&stop_id), raw));
                    results.insert(stop_id, etas);
                }
                Err(err) => {
                    let key = keys::stop_eta(&stop_id);
                    let fallback = self
                        .stale_value::<Vec<Eta>>(CacheClass::Eta, &key)
                        .await
                        .unwrap_or_default();
                    warn!(
                        "ETA for stop {} unavailable ({}), using {} cached estimates",
                        stop_id,
                        err,
                        fallback.len()
                    );
                    results.insert(stop_id, fallback);
                }
            }
        }

        // One persist for the whole batch
        self.cache.put_many(CacheClass::Eta, fresh).await;
        results
    }

    // == Maintenance ==
    /// Drops expired route and ETA entries. Returns how many were removed.
    pub async fn clear_expired_cache(&self) -> usize {
        let removed = self.cache.sweep_expired().await;
        if removed > 0 {
            info!("Cleared {} expired cache entries", removed);
        }
        removed
    }

    // == Cache Composition ==
    async fn cached_fetch<T: DeserializeOwned>(
        &self,
        class: CacheClass,
        key: &str,
        segments: &[&str],
        shape: Shape,
    ) -> Result<T> {
        // An unaddressable ID is a caller error and never falls back
        self.endpoint(segments)?;

        if let Some(hit) = self.cached_value(class, key).await {
            debug!("Cache hit: {} {:?}", class, key);
            return Ok(hit);
        }

        match self.fetch_and_decode::<T>(segments, shape).await {
            Ok((raw, decoded)) => {
                self.cache.put(class, key, raw).await;
                Ok(decoded)
            }
            Err(err) if err.is_remote() => match self.stale_value(class, key).await {
                Some(stale) => {
                    warn!("Serving stale {} cache for {:?}: {}", class, key, err);
                    Ok(stale)
                }
                None => Err(err),
            },
            Err(err) => Err(err),
        }
    }

    /// Fetches, checks the envelope and decodes. Returns the raw payload to
    /// cache alongside the typed value.
    async fn fetch_and_decode<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        shape: Shape,
    ) -> Result<(Value, T)> {
        let url = self.endpoint(segments)?;
        let response = self.fetcher.fetch_with_retry(&url).await?;
        let data = extract_data(&url, response, shape)?;
        let decoded = decode(&url, data.clone())?;
        Ok((data, decoded))
    }

    async fn cached_value<T: DeserializeOwned>(&self, class: CacheClass, key: &str) -> Option<T> {
        let value = self.cache.get(class, key).await?;
        decode_logged(class, key, value)
    }

    async fn stale_value<T: DeserializeOwned>(&self, class: CacheClass, key: &str) -> Option<T> {
        let value = self.cache.get_stale(class, key).await?;
        decode_logged(class, key, value)
    }
}

fn extract_data(url: &str, mut response: Value, shape: Shape) -> Result<Value> {
    let data = response
        .get_mut("data")
        .map(Value::take)
        .ok_or_else(|| TransitError::data_shape(url, "response has no data field"))?;
    match shape {
        Shape::DataArray if !data.is_array() => {
            Err(TransitError::data_shape(url, "data is not an array"))
        }
        _ => Ok(data),
    }
}

fn decode<T: DeserializeOwned>(context: &str, data: Value) -> Result<T> {
    serde_json::from_value(data).map_err(|e| TransitError::data_shape(context, e.to_string()))
}

/// Decodes a cached payload; an undecodable entry is treated as absent.
fn decode_logged<T: DeserializeOwned>(class: CacheClass, key: &str, value: Value) -> Option<T> {
    match decode(key, value) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!("Ignoring undecodable {} cache entry {:?}: {}", class, key, e);
            None
        }
    }
}
