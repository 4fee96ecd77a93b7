//! Retry-Fetch Primitive
//!
//! HTTP GET with a connectivity pre-check, status and content-type
//! validation, JSON decoding and bounded linear-backoff retries.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::error::{Result, TransitError};
use crate::net::{Connectivity, RetryPolicy};

const DEFAULT_USER_AGENT: &str = concat!("hk_transit/", env!("CARGO_PKG_VERSION"));
const PREVIEW_CHAR_LIMIT: usize = 100;

/// Shared HTTP client for every upstream call.
pub struct HttpFetcher {
    client: Client,
    connectivity: Arc<dyn Connectivity>,
    retry: RetryPolicy,
}

impl HttpFetcher {
    /// Builds a fetcher with a request timeout.
    ///
    /// # Errors
    ///
    /// Returns `Transport` when the reqwest client cannot be constructed.
    pub fn new(
        timeout: Duration,
        retry: RetryPolicy,
        connectivity: Arc<dyn Connectivity>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransitError::Transport {
                endpoint: "<client>".to_string(),
                reason: e.to_string(),
            })?;
        debug!("HTTP fetcher ready, retry waits {:?}", retry.schedule());
        Ok(Self::with_client(client, retry, connectivity))
    }

    /// Builds a fetcher around an existing client.
    pub fn with_client(
        client: Client,
        retry: RetryPolicy,
        connectivity: Arc<dyn Connectivity>,
    ) -> Self {
        Self {
            client,
            connectivity,
            retry,
        }
    }

    // == Fetch With Retry ==
    /// Fetches and decodes JSON, retrying every kind of failure.
    ///
    /// Connectivity is rechecked on each attempt. After the last retry the
    /// final error is returned unchanged.
    pub async fn fetch_with_retry(&self, url: &str) -> Result<Value> {
        let mut retries_left = self.retry.max_retries;
        let mut attempt = 1;
        loop {
            match self.fetch_json_checked(url, attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if retries_left > 0 => {
                    let delay = self.retry.delay_for(retries_left);
                    warn!(
                        "Attempt {}/{} for {} failed ({}), retrying in {:?}",
                        attempt,
                        self.retry.max_attempts(),
                        url,
                        err,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    retries_left -= 1;
                    attempt += 1;
                }
                Err(err) => {
                    warn!("Giving up on {} after {} attempts: {}", url, attempt, err);
                    return Err(err);
                }
            }
        }
    }

    // == Single Attempt Variants ==
    /// One attempt, body decoded as JSON whatever the declared content type.
    pub async fn fetch_json_once(&self, url: &str) -> Result<Value> {
        let (_, body) = self.get_body(url, 1).await?;
        parse_json(url, &body)
    }

    /// One attempt, raw text body.
    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        let (_, body) = self.get_body(url, 1).await?;
        Ok(body)
    }

    async fn fetch_json_checked(&self, url: &str, attempt: u32) -> Result<Value> {
        let (content_type, body) = self.get_body(url, attempt).await?;
        if !is_json_content_type(&content_type) {
            return Err(TransitError::InvalidResponseFormat {
                endpoint: url.to_string(),
                reason: format!("expected JSON, got content type {content_type:?}"),
            });
        }
        parse_json(url, &body)
    }

    /// Connectivity check, GET, status check. Returns content type and body.
    async fn get_body(&self, url: &str, attempt: u32) -> Result<(String, String)> {
        if !self.connectivity.is_online().await {
            return Err(TransitError::NoConnectivity {
                endpoint: url.to_string(),
            });
        }

        debug!("GET {} (attempt {})", url, attempt);
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, DEFAULT_USER_AGENT)
            .header(ACCEPT, "application/json, text/csv;q=0.9, */*;q=0.8")
            .send()
            .await
            .map_err(|e| map_transport_error(url, e))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response
            .text()
            .await
            .map_err(|e| map_transport_error(url, e))?;
        trace!("Response {} from {}: {}", status, url, body_preview(&body));

        if !status.is_success() {
            return Err(TransitError::Http {
                endpoint: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok((content_type, body))
    }
}

fn parse_json(url: &str, body: &str) -> Result<Value> {
    serde_json::from_str(body).map_err(|e| TransitError::InvalidResponseFormat {
        endpoint: url.to_string(),
        reason: format!("invalid JSON body: {e}"),
    })
}

fn is_json_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime == "application/json" || mime.ends_with("+json")
}

fn map_transport_error(url: &str, error: reqwest::Error) -> TransitError {
    let reason = if error.is_timeout() {
        format!("timed out: {error}")
    } else {
        error.to_string()
    };
    TransitError::Transport {
        endpoint: url.to_string(),
        reason,
    }
}

fn body_preview(body: &str) -> String {
    let compact = body.split_whitespace().collect::<Vec<_>>().join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
