use std::future::Future;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tracing::{debug, error, warn};

use crate::error::GripperError;

/// How often a command is re-issued before giving up.
///
/// `max_attempts: None` retries forever, which is only sane with a human watching the
/// gripper or with a [`CancelToken`] wired to an abort path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: Option<NonZeroU32>,
    /// Pause between attempts, keeps the half-duplex link from saturating.
    pub delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::bounded(100)
    }
}

impl RetryPolicy {
    /// One attempt, no retry.
    pub const fn once() -> Self {
        Self {
            max_attempts: Some(NonZeroU32::MIN),
            delay_ms: 0,
        }
    }

    /// At most `attempts` attempts (a zero cap is treated as one), 1 ms apart.
    pub const fn bounded(attempts: u32) -> Self {
        let attempts = match NonZeroU32::new(attempts) {
            Some(n) => n,
            None => NonZeroU32::MIN,
        };
        Self {
            max_attempts: Some(attempts),
            delay_ms: 1,
        }
    }

    /// Retry until success or cancellation, 1 ms apart.
    pub const fn unbounded() -> Self {
        Self {
            max_attempts: None,
            delay_ms: 1,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_attempts.is_none()
    }
}

#[derive(Debug, Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Abort signal for retry loops.
///
/// Clones share state. Once cancelled a token stays cancelled; hand a fresh one to the next
/// command.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Run `op` until it succeeds, the policy runs out, or `cancel` fires.
///
/// Every attempt re-issues the exact same operation. Non-retryable errors (validation,
/// cancellation, a closed session) surface immediately. A transaction already on the wire is
/// never interrupted; the token is checked before each attempt and while waiting out the delay.
///
/// When a policy allowing more than one attempt runs out, the last error is returned boxed in
/// [`GripperError::RetryExhausted`]. A single-attempt policy returns the failure as is. Match
/// on [`GripperError::root`] to see the same error under either policy.
pub async fn execute_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancelToken,
    mut op: F,
) -> Result<T, GripperError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GripperError>>,
{
    let mut attempts: u32 = 0;
    loop {
        if cancel.is_cancelled() {
            warn!(attempts, "retry loop cancelled");
            return Err(GripperError::Cancelled { attempts });
        }

        attempts = attempts.saturating_add(1);
        let err = match op().await {
            Ok(value) => {
                if attempts > 1 {
                    debug!(attempts, "command confirmed after retry");
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        if !err.is_retryable() {
            return Err(err);
        }

        if let Some(max) = policy.max_attempts {
            if attempts >= max.get() {
                if max.get() > 1 {
                    error!(attempts, %err, "retry limit reached");
                    return Err(GripperError::RetryExhausted {
                        attempts,
                        last: Box::new(err),
                    });
                }
                // single-shot commands report the raw failure
                return Err(err);
            }
        }
        warn!(attempt = attempts, %err, "command failed, retrying");

        let delay = policy.delay();
        if delay.is_zero() {
            // let a canceller on the same thread run
            tokio::task::yield_now().await;
        } else {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => {}
            }
        }
    }
}
