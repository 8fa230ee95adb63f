//! Rate-limited fetch with bounded retries

use super::transport::{ApiRequest, HttpTransport, RawResponse};
use crate::clock::{sleep_or_cancel, Cancelled};
use crate::credentials::CredentialProvider;
use crate::ratelimit::SlidingWindowLimiter;
use rand::Rng;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Default number of attempts per request
pub const DEFAULT_RETRY_BUDGET: u32 = 3;

/// Wait used when a 429 carries no usable `Retry-After`
const DEFAULT_RETRY_AFTER_SECS: u64 = 1;

/// Non-fatal outcome of a fetch that produced no data
///
/// The scheduler treats every variant the same way: the affected work items
/// stay incomplete and are retried on a later pass.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// Retry budget spent on transport errors or 429 responses
    #[error("Gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },

    /// Non-429 error status, not retried
    #[error("HTTP error {0}")]
    HttpStatus(u16),

    /// Successful response whose body could not be decoded
    #[error("Undecodable response: {0}")]
    Decode(String),

    #[error("Credential unavailable: {0}")]
    Credential(String),

    #[error("Cancelled")]
    Cancelled,
}

impl From<Cancelled> for FetchFailure {
    fn from(_: Cancelled) -> Self {
        FetchFailure::Cancelled
    }
}

/// Single-call fetcher: limiter pacing, backoff, provider retry hints
pub struct RetryingFetcher {
    transport: Arc<dyn HttpTransport>,
    credentials: Option<Arc<dyn CredentialProvider>>,
    retry_budget: u32,
    cancel: CancellationToken,
}

impl RetryingFetcher {
    pub fn new(transport: Arc<dyn HttpTransport>, cancel: CancellationToken) -> Self {
        Self {
            transport,
            credentials: None,
            retry_budget: DEFAULT_RETRY_BUDGET,
            cancel,
        }
    }

    /// Send a bearer token obtained from `credentials` with every attempt
    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Total attempts per request; clamped to at least one
    pub fn with_retry_budget(mut self, budget: u32) -> Self {
        self.retry_budget = budget.max(1);
        self
    }

    /// Fetch `request`, returning the response body
    ///
    /// **Algorithm:**
    /// 1. Wait for a limiter slot (every attempt counts against the quota)
    /// 2. Success status: return the body
    /// 3. Transport error: back off `2^attempt + jitter` seconds and retry
    /// 4. 429: wait the `Retry-After` hint (default 1 s) and retry
    /// 5. Any other status: give up immediately
    ///
    /// Steps 3 and 4 each consume one unit of the retry budget. When the
    /// budget is spent the result is [`FetchFailure::Exhausted`].
    pub async fn fetch(
        &self,
        limiter: &mut SlidingWindowLimiter,
        request: &ApiRequest,
    ) -> Result<String, FetchFailure> {
        let clock = Arc::clone(limiter.clock());
        let mut last_error = String::new();

        for attempt in 0..self.retry_budget {
            let is_last = attempt + 1 == self.retry_budget;

            if attempt > 0 {
                tracing::debug!(url = %request, attempt, "Retrying request");
            }

            limiter.await_slot(&self.cancel).await?;

            let bearer = match &self.credentials {
                Some(provider) => Some(
                    provider
                        .bearer_token()
                        .await
                        .map_err(|e| FetchFailure::Credential(e.to_string()))?,
                ),
                None => None,
            };

            match self.transport.get(request, bearer.as_deref()).await {
                Ok(response) if response.is_success() => {
                    if attempt > 0 {
                        tracing::debug!(url = %request, attempt, "Request succeeded after retry");
                    }
                    return Ok(response.body);
                }
                Ok(RawResponse {
                    status: 429,
                    retry_after,
                    ..
                }) => {
                    let wait_secs = retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS);
                    last_error = "HTTP 429".to_string();
                    if is_last {
                        break;
                    }
                    tracing::warn!(
                        url = %request,
                        attempt,
                        retry_after_secs = wait_secs,
                        "Rate limited by provider, retrying after hint"
                    );
                    sleep_or_cancel(clock.as_ref(), Duration::from_secs(wait_secs), &self.cancel)
                        .await?;
                }
                Ok(response) => {
                    tracing::error!(
                        url = %request,
                        status = response.status,
                        body = %truncate(&response.body, 200),
                        "HTTP error, abandoning request"
                    );
                    return Err(FetchFailure::HttpStatus(response.status));
                }
                Err(e) => {
                    last_error = e.to_string();
                    if is_last {
                        break;
                    }
                    let backoff = backoff_delay(attempt);
                    tracing::warn!(
                        url = %request,
                        attempt,
                        error = %e,
                        backoff_ms = backoff.as_millis() as u64,
                        "Request failed, will retry after backoff"
                    );
                    sleep_or_cancel(clock.as_ref(), backoff, &self.cancel).await?;
                }
            }
        }

        tracing::error!(
            url = %request,
            attempts = self.retry_budget,
            error = %last_error,
            "Request failed: retry budget exhausted"
        );
        Err(FetchFailure::Exhausted {
            attempts: self.retry_budget,
            last: last_error,
        })
    }

    /// Fetch and decode a JSON body
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        limiter: &mut SlidingWindowLimiter,
        request: &ApiRequest,
    ) -> Result<T, FetchFailure> {
        let body = self.fetch(limiter, request).await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::warn!(url = %request, error = %e, "Response did not decode");
            FetchFailure::Decode(e.to_string())
        })
    }
}

/// `2^attempt` seconds plus up to one second of jitter
fn backoff_delay(attempt: u32) -> Duration {
    let jitter: f64 = rand::thread_rng().gen_range(0.0..1.0);
    Duration::from_secs_f64(2f64.powi(attempt.min(16) as i32) + jitter)
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows_with_jitter_below_one_second() {
        for attempt in 0..5 {
            let base = 2f64.powi(attempt as i32);
            let delay = backoff_delay(attempt).as_secs_f64();
            assert!(delay >= base && delay < base + 1.0, "attempt {attempt}: {delay}");
        }
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("abc", 10), "abc");
    }
}
