//! Shared fixtures: an in-process mock of the upstream open data APIs.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use serde_json::Value;
use tokio::task::JoinHandle;

use hk_transit::cache::{CachePolicy, TieredCache};
use hk_transit::clock::ManualClock;
use hk_transit::kmb::KmbClient;
use hk_transit::net::{ConnectivityFlag, HttpFetcher, RetryPolicy};
use hk_transit::storage::MemoryStorage;

pub const T0: u64 = 1_700_000_000_000;

// == Mock Upstream ==

#[derive(Clone)]
struct Canned {
    status: StatusCode,
    content_type: String,
    body: String,
}

#[derive(Clone, Default)]
struct MockState {
    responses: Arc<Mutex<HashMap<String, Canned>>>,
    hits: Arc<Mutex<HashMap<String, usize>>>,
}

/// HTTP server answering canned responses keyed by path and query.
/// Unknown paths get a 404.
pub struct MockUpstream {
    pub base_url: String,
    state: MockState,
    handle: JoinHandle<()>,
}

impl MockUpstream {
    pub async fn start() -> Self {
        let state = MockState::default();
        let app = Router::new().fallback(respond).with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
            handle,
        }
    }

    pub fn respond(&self, path: &str, status: StatusCode, content_type: &str, body: impl Into<String>) {
        self.state.responses.lock().unwrap().insert(
            path.to_string(),
            Canned {
                status,
                content_type: content_type.to_string(),
                body: body.into(),
            },
        );
    }

    pub fn respond_json(&self, path: &str, body: Value) {
        self.respond(path, StatusCode::OK, "application/json", body.to_string());
    }

    /// Wraps `data` in the KMB response envelope.
    pub fn respond_kmb(&self, path: &str, data: Value) {
        self.respond_json(
            path,
            serde_json::json!({
                "type": "Mock",
                "version": "1.0",
                "generated_timestamp": "2024-03-01T12:00:00+08:00",
                "data": data,
            }),
        );
    }

    pub fn fail(&self, path: &str, status: StatusCode) {
        self.respond(path, status, "application/json", r#"{"error":"boom"}"#);
    }

    pub fn hits(&self, path: &str) -> usize {
        self.state.hits.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.state.hits.lock().unwrap().values().sum()
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn respond(State(state): State<MockState>, uri: Uri) -> Response {
    let key = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());

    *state.hits.lock().unwrap().entry(key.clone()).or_default() += 1;
    let canned = state.responses.lock().unwrap().get(&key).cloned();

    match canned {
        Some(canned) => (
            canned.status,
            [(header::CONTENT_TYPE, canned.content_type)],
            canned.body,
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, format!("no mock for {key}")).into_response(),
    }
}

// == Client Harness ==

/// Fast retries so exhaustion tests finish quickly.
pub fn test_retry_policy() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(5))
}

pub fn test_fetcher(connectivity: &ConnectivityFlag) -> Arc<HttpFetcher> {
    Arc::new(
        HttpFetcher::new(
            Duration::from_secs(5),
            test_retry_policy(),
            Arc::new(connectivity.clone()),
        )
        .unwrap(),
    )
}

pub struct KmbHarness {
    pub upstream: MockUpstream,
    pub clock: Arc<ManualClock>,
    pub storage: Arc<MemoryStorage>,
    pub connectivity: ConnectivityFlag,
    pub cache: Arc<TieredCache>,
    pub kmb: KmbClient,
}

impl KmbHarness {
    pub async fn start() -> Self {
        let upstream = MockUpstream::start().await;
        let clock = Arc::new(ManualClock::new(T0));
        let storage = Arc::new(MemoryStorage::new());
        let connectivity = ConnectivityFlag::new(true);

        let cache = Arc::new(TieredCache::new(
            CachePolicy::default(),
            storage.clone(),
            clock.clone(),
        ));
        let kmb = KmbClient::new(&upstream.base_url, test_fetcher(&connectivity), cache.clone())
            .unwrap();

        Self {
            upstream,
            clock,
            storage,
            connectivity,
            cache,
            kmb,
        }
    }

    /// A second client sharing the upstream and storage but with a fresh,
    /// unrestored cache, as after a process restart.
    pub fn restarted(&self) -> (Arc<TieredCache>, KmbClient) {
        let cache = Arc::new(TieredCache::new(
            CachePolicy::default(),
            self.storage.clone(),
            self.clock.clone(),
        ));
        let kmb = KmbClient::new(
            &self.upstream.base_url,
            test_fetcher(&self.connectivity),
            cache.clone(),
        )
        .unwrap();
        (cache, kmb)
    }
}
