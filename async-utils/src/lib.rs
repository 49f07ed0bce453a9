//! Cancellation helpers for the request pipeline.
//!
//! A [`CancelScope`] pairs a caller-owned `CancellationToken` with an optional
//! whole-call deadline. The [`OrCancelExt`] trait races any future against a
//! scope, so a network round trip or a backoff sleep ends as soon as either
//! the token fires or the deadline passes.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Reason a scoped future did not run to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CancelErr {
    /// The caller cancelled the token.
    #[error("operation cancelled")]
    Cancelled,
    /// The whole-call deadline passed.
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// Cancellation token plus an optional deadline that together bound one call.
#[derive(Debug, Clone, Default)]
pub struct CancelScope {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CancelScope {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Bound the scope by `deadline`. An earlier existing deadline wins.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// Bound the scope to `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self,
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Non-blocking check, used as a checkpoint before starting new work.
    pub fn check(&self) -> Result<(), CancelErr> {
        if self.token.is_cancelled() {
            return Err(CancelErr::Cancelled);
        }
        if let Some(deadline) = self.deadline
            && Instant::now() >= deadline
        {
            return Err(CancelErr::DeadlineExceeded);
        }
        Ok(())
    }

    /// Resolves once the token is cancelled or the deadline passes.
    pub async fn cancelled(&self) -> CancelErr {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    _ = self.token.cancelled() => CancelErr::Cancelled,
                    _ = tokio::time::sleep_until(deadline) => CancelErr::DeadlineExceeded,
                }
            }
            None => {
                self.token.cancelled().await;
                CancelErr::Cancelled
            }
        }
    }
}

/// Extension trait for making futures cancellable.
///
/// Races the future against a [`CancelScope`]. A scope that is already
/// cancelled or expired never polls the future at all.
#[async_trait]
pub trait OrCancelExt: Sized {
    type Output;

    async fn or_cancel(self, scope: &CancelScope) -> Result<Self::Output, CancelErr>;
}

#[async_trait]
impl<F> OrCancelExt for F
where
    F: Future + Send,
    F::Output: Send,
{
    type Output = F::Output;

    async fn or_cancel(self, scope: &CancelScope) -> Result<Self::Output, CancelErr> {
        scope.check()?;
        tokio::select! {
            biased;
            err = scope.cancelled() => Err(err),
            res = self => Ok(res),
        }
    }
}
