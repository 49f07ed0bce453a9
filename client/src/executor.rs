//! Retrying request executor.
//!
//! Runs attempts `0..=max_retries` strictly in sequence. Each failure is
//! classified into a [`PinchoError`]; non-retryable categories end the call
//! at once, retryable ones back off and try again until the budget runs out.
//! The round trip and the backoff sleep are both raced against the caller's
//! [`CancelScope`].

use async_trait::async_trait;
use pincho_async_utils::CancelErr;
use pincho_async_utils::CancelScope;
use pincho_async_utils::OrCancelExt;
use std::time::Duration;
use tracing::debug;

use crate::backoff::BackoffPolicy;
use crate::error::PinchoError;
use crate::error::Result;
use crate::transport::HttpRequest;
use crate::transport::HttpResponse;
use crate::transport::Transport;

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Waits between attempts. Swapped out in tests to avoid real sleeping.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: BackoffPolicy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: BackoffPolicy::default(),
        }
    }
}

/// Bookkeeping for one logical call. Never outlives `execute`.
#[derive(Debug, Default)]
struct AttemptState {
    attempt: u32,
    last_status: Option<u16>,
    last_retry_after: Option<String>,
    last_error: Option<PinchoError>,
}

impl AttemptState {
    fn record(&mut self, status: Option<u16>, retry_after: Option<String>, error: PinchoError) {
        self.last_status = status;
        self.last_retry_after = retry_after;
        self.last_error = Some(error);
    }

    fn next_delay(&self, backoff: &BackoffPolicy) -> Duration {
        backoff.delay(
            self.attempt,
            self.last_status.unwrap_or_default(),
            self.last_retry_after.as_deref(),
        )
    }

    fn into_exhausted(self, max_retries: u32) -> PinchoError {
        let message = format!("request failed after {max_retries} retries");
        match self.last_error {
            Some(last) => PinchoError::network_with_source(message, last),
            None => PinchoError::network(message),
        }
    }
}

fn interrupted(err: CancelErr) -> PinchoError {
    PinchoError::network_with_source("request interrupted", err)
}

/// Drives one request through the retry loop.
pub struct RequestExecutor<'a> {
    transport: &'a dyn Transport,
    sleeper: &'a dyn Sleeper,
    policy: RetryPolicy,
}

impl<'a> RequestExecutor<'a> {
    pub fn new(transport: &'a dyn Transport, sleeper: &'a dyn Sleeper, policy: RetryPolicy) -> Self {
        Self {
            transport,
            sleeper,
            policy,
        }
    }

    /// Send `request` until it succeeds (status < 400), fails with a
    /// non-retryable error, exhausts the retry budget, or is interrupted.
    pub async fn execute(&self, request: &HttpRequest, scope: &CancelScope) -> Result<HttpResponse> {
        let max_retries = self.policy.max_retries;
        let mut state = AttemptState::default();

        for attempt in 0..=max_retries {
            state.attempt = attempt;
            scope.check().map_err(interrupted)?;

            debug!(attempt, max_retries, url = %request.url, "sending request");
            let outcome = self
                .transport
                .send(request)
                .or_cancel(scope)
                .await
                .map_err(interrupted)?;

            let (status, retry_after, error) = match outcome {
                Ok(response) if response.status < 400 => {
                    debug!(attempt, status = response.status, "request succeeded");
                    return Ok(response);
                }
                Ok(response) => {
                    let retry_after = response.header("Retry-After").map(str::to_owned);
                    let error = PinchoError::from_response(
                        response.status,
                        retry_after.as_deref(),
                        &response.body,
                    );
                    (Some(response.status), retry_after, error)
                }
                Err(err) => (
                    None,
                    None,
                    PinchoError::network_with_source("network request failed", err),
                ),
            };

            if !error.is_retryable() {
                debug!(attempt, kind = %error.kind(), "non-retryable failure");
                return Err(error);
            }

            state.record(status, retry_after, error);
            if attempt == max_retries {
                break;
            }

            let delay = state.next_delay(&self.policy.backoff);
            if let Some(last) = &state.last_error {
                debug!(
                    attempt,
                    kind = %last.kind(),
                    delay_ms = delay.as_millis() as u64,
                    "request failed, retrying: {last}"
                );
            }
            self.sleeper
                .sleep(delay)
                .or_cancel(scope)
                .await
                .map_err(interrupted)?;
        }

        Err(state.into_exhausted(max_retries))
    }
}
