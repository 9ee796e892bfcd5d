//! HTTP transport shared by the remote strategies.
//!
//! One `reqwest` client per run. Transient failures (429, 5xx gateway
//! errors, timeouts, refused connections) are retried with exponential
//! backoff; anything else surfaces immediately as a `Network` error.

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use llmstxt_shared::{LlmsTxtError, PerformanceSettings, Result};

/// User-Agent string for all source requests.
const USER_AGENT: &str = concat!("llmstxt/", env!("CARGO_PKG_VERSION"));

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

/// HTTP client with retry policy.
#[derive(Debug, Clone)]
pub struct Transport {
    client: Client,
    attempts: u32,
    retry_delay: Duration,
}

impl Transport {
    /// Build a transport with a per-request `timeout`.
    pub fn new(performance: &PerformanceSettings, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(timeout)
            .build()
            .map_err(|e| LlmsTxtError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            attempts: performance.retry_attempts.max(1),
            retry_delay: performance.retry_delay,
        })
    }

    /// GET `url` with query parameters, retrying transient failures.
    /// Only successful (2xx) responses are returned.
    pub async fn get(&self, url: &Url, query: &[(&str, String)]) -> Result<Response> {
        let mut attempt = 1u32;
        loop {
            match self.client.get(url.clone()).query(query).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }
                    if should_retry(status) && attempt < self.attempts {
                        warn!(%url, %status, attempt, "transient HTTP status, retrying");
                        tokio::time::sleep(self.backoff(attempt)).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(LlmsTxtError::Network(format!("{url}: HTTP {status}")));
                }
                Err(err) => {
                    if is_retryable_error(&err) && attempt < self.attempts {
                        warn!(%url, error = %err, attempt, "request failed, retrying");
                        tokio::time::sleep(self.backoff(attempt)).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(LlmsTxtError::Network(format!("{url}: {err}")));
                }
            }
        }
    }

    /// GET and read the body as text.
    pub async fn get_text(&self, url: &Url) -> Result<String> {
        let response = self.get(url, &[]).await?;
        let body = response
            .text()
            .await
            .map_err(|e| LlmsTxtError::Network(format!("{url}: failed to read body: {e}")))?;
        debug!(%url, bytes = body.len(), "fetched");
        Ok(body)
    }

    /// GET and decode a JSON body, returning the response headers alongside.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &Url,
        query: &[(&str, String)],
    ) -> Result<(T, HeaderMap)> {
        let response = self.get(url, query).await?;
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| LlmsTxtError::Network(format!("{url}: failed to read body: {e}")))?;
        let value = serde_json::from_slice(&body)
            .map_err(|e| LlmsTxtError::parse(format!("{url}: invalid JSON: {e}")))?;
        Ok((value, headers))
    }

    /// Delay before retry number `attempt` (1-based): `retry_delay * 2^(attempt-1)`.
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.retry_delay.saturating_mul(1 << exponent)
    }
}

fn should_retry(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}
