//! Shared HTTP plumbing for catalog adapters.
//!
//! One `reqwest::Client` per adapter with a bounded timeout, a fixed
//! user agent, and an optional minimum interval between requests.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::{StatusCode, header};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use crate::error::CatalogError;

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default user agent.
const DEFAULT_USER_AGENT: &str = "audiobookrequest/0.1";

/// HTTP settings shared by every catalog adapter.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Per-request timeout (default: 30s).
    pub timeout: Duration,
    /// User-agent string (default: audiobookrequest/0.1).
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout: DEFAULT_TIMEOUT, user_agent: DEFAULT_USER_AGENT.to_string() }
    }
}

impl HttpConfig {
    pub fn new(timeout: Duration, user_agent: impl Into<String>) -> Self {
        Self { timeout, user_agent: user_agent.into() }
    }
}

/// Rate limiter to enforce request intervals.
#[derive(Debug)]
struct RateLimiter {
    last_request: Mutex<Instant>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Mutex::new(Instant::now().checked_sub(min_interval).unwrap_or_else(Instant::now)),
            min_interval,
        }
    }

    /// Acquire permission to make a request, waiting if necessary.
    async fn acquire(&self) {
        if self.min_interval.is_zero() {
            return;
        }
        let mut last = self.last_request.lock().await;
        let elapsed = last.elapsed();
        if elapsed < self.min_interval {
            tokio::time::sleep(self.min_interval - elapsed).await;
        }
        *last = Instant::now();
    }
}

/// JSON-over-HTTP client for one upstream catalog.
#[derive(Debug, Clone)]
pub struct CatalogHttp {
    http: reqwest::Client,
    rate_limiter: Arc<RateLimiter>,
}

impl CatalogHttp {
    /// Build a client. `min_interval` of zero disables rate limiting.
    pub fn new(config: &HttpConfig, min_interval: Duration) -> Result<Self, CatalogError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| CatalogError::Network(Arc::new(e)))?;

        Ok(Self { http, rate_limiter: Arc::new(RateLimiter::new(min_interval)) })
    }

    /// GET `url` with `query` parameters and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self, url: &str, query: &[(&str, String)], headers: &[(&'static str, &'static str)],
    ) -> Result<T, CatalogError> {
        self.rate_limiter.acquire().await;

        let start = Instant::now();
        let mut request = self.http.get(url).query(query).header(header::ACCEPT, "application/json");
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await?;
        let status = response.status();
        tracing::debug!(url, status = status.as_u16(), elapsed = ?start.elapsed(), "catalog response");

        check_status(status)?;

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn check_status(status: StatusCode) -> Result<(), CatalogError> {
    if status == StatusCode::NOT_FOUND {
        return Err(CatalogError::NotFound);
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(CatalogError::RateLimited);
    }
    if status.is_client_error() || status.is_server_error() {
        return Err(CatalogError::HttpError { status: status.as_u16() });
    }
    Ok(())
}
