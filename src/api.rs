//! HTTP transport: the `Transport` seam used by the paginator and the
//! reconciliation sweep, plus a blocking `reqwest` implementation with bearer
//! auth and retry/backoff on transient statuses.

use crate::error::{EtlError, Result};
use crate::secrets::TokenSource;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde_json::Value;
use std::thread::sleep;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "v2RecentSearchPython";

/// Query parameters as ordered key/value pairs.
pub type Params = Vec<(String, String)>;

/// Issue a GET and return the decoded JSON body.
/// A non-success status must come back as `EtlError::Transport`.
pub trait Transport {
    fn get_json(&self, url: &str, params: &[(String, String)]) -> Result<Value>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get_json(&self, url: &str, params: &[(String, String)]) -> Result<Value> {
        (**self).get_json(url, params)
    }
}

/// Retry strategy for transient statuses: `max_retries` extra attempts, sleeping
/// `backoff * 2^n` before retry `n` (0-based).
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
    pub statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Duration::from_secs(1),
            statuses: vec![429, 500, 502, 503, 504],
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self { max_retries: 0, ..Self::default() }
    }

    pub fn should_retry(&self, status: StatusCode) -> bool {
        self.statuses.contains(&status.as_u16())
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(1u32 << attempt.min(16))
    }
}

pub struct HttpTransport {
    client: Client,
    token: String,
    retry: RetryPolicy,
}

impl HttpTransport {
    /// Resolve the credential up front; a missing token is a configuration error
    /// raised before any network activity.
    pub fn new(tokens: &dyn TokenSource, user_agent: &str) -> Result<Self> {
        let token = tokens.bearer_token()?;
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client, token, retry: RetryPolicy::default() })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl Transport for HttpTransport {
    fn get_json(&self, url: &str, params: &[(String, String)]) -> Result<Value> {
        let mut attempt = 0u32;
        loop {
            let resp = self
                .client
                .get(url)
                .bearer_auth(&self.token)
                .query(params)
                .send()?;
            let status = resp.status();

            if status.is_success() {
                return Ok(resp.json::<Value>()?);
            }

            if attempt < self.retry.max_retries && self.retry.should_retry(status) {
                let delay = self.retry.delay_for(attempt);
                tracing::warn!(status = status.as_u16(), attempt = attempt + 1, delay_ms = delay.as_millis() as u64, "transient HTTP status; retrying");
                sleep(delay);
                attempt += 1;
                continue;
            }

            let body = resp.text().unwrap_or_default();
            return Err(EtlError::Transport { status: status.as_u16(), url: url.to_string(), body });
        }
    }
}
