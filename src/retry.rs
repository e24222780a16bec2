// 🔁 Bounded retry - fixed-delay retry for whole passes
//
// A pass is re-run from scratch after a failure, never resumed; that is
// safe only because both linking passes are idempotent.

use crate::config::RetrySettings;
use crate::error::{SyncError, SyncResult};
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn};

/// Where a retried pass stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Running(u32),
    Success,
    Exhausted,
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total invocations allowed, first try included.
    pub max_attempts: u32,
    /// Fixed pause between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetrySettings::default().into()
    }
}

impl From<RetrySettings> for RetryPolicy {
    fn from(settings: RetrySettings) -> Self {
        Self::new(settings.max_attempts, settings.delay)
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// State after attempt `attempt` (1-based) finished.
    #[must_use]
    pub fn next_state(&self, attempt: u32, succeeded: bool) -> RetryState {
        if succeeded {
            RetryState::Success
        } else if attempt < self.max_attempts {
            RetryState::Running(attempt + 1)
        } else {
            RetryState::Exhausted
        }
    }

    /// Run `f(attempt)` until it succeeds or the attempts run out.
    ///
    /// Exhaustion is reported as [`SyncError::RetryExhausted`] carrying the
    /// last failure; it is up to the caller to log it and carry on.
    pub async fn execute<F, Fut, T>(&self, pass: &str, mut f: F) -> SyncResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = SyncResult<T>>,
    {
        let mut attempt = 1;
        loop {
            match f(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(pass, attempt, "Pass succeeded after retries");
                    }
                    return Ok(value);
                }
                Err(err) => {
                    error!(pass, attempt, error = %err, "Request to Notion API failed");

                    match self.next_state(attempt, false) {
                        RetryState::Running(next) => {
                            info!(pass, delay_secs = self.delay.as_secs_f64(), "Retrying");
                            tokio::time::sleep(self.delay).await;
                            attempt = next;
                        }
                        _ => {
                            warn!(pass, attempts = attempt, "Exceeded maximum retry attempts");
                            return Err(SyncError::RetryExhausted {
                                pass: pass.to_string(),
                                attempts: attempt,
                                last_error: Box::new(err),
                            });
                        }
                    }
                }
            }
        }
    }
}
