//! Retry/backoff engine for eventually-consistent UI and REST state.
//!
//! An operation is re-invoked up to `attempts` more times after the first
//! call, with a fixed delay between calls. A failure the predicate does not
//! accept is returned immediately and unchanged. When the budget runs out
//! the result is [`HarnessError::RetriesExhausted`], holding the last failure
//! plus every earlier one as `suppressed`.
//!
//! ```no_run
//! # use console_harness::{retry, HarnessError, HarnessResult};
//! # use std::time::Duration;
//! # async fn demo() -> HarnessResult<()> {
//! let mut polls = 0;
//! retry(3, Duration::from_millis(100), || {
//!     polls += 1;
//!     let ready = polls > 2;
//!     async move {
//!         if ready { Ok(()) } else { Err(HarnessError::assertion("still pending")) }
//!     }
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

use crate::result::{ErrorKind, HarnessError, HarnessResult};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::debug;

/// Which failures a retry policy tolerates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryOn {
    /// Every failure
    #[default]
    Any,
    /// Only failures of this class
    Only(ErrorKind),
}

impl RetryOn {
    /// Whether `err` should be retried
    #[must_use]
    pub fn accepts(&self, err: &HarnessError) -> bool {
        match self {
            Self::Any => true,
            Self::Only(kind) => err.kind() == *kind,
        }
    }
}

/// Attempt budget, delay and predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySpec {
    /// Re-attempts after the first call
    pub attempts: u32,
    /// Pause between calls
    pub delay: Duration,
    /// Failures that are retried
    pub retry_on: RetryOn,
}

impl Default for RetrySpec {
    fn default() -> Self {
        Self::eventual()
    }
}

impl RetrySpec {
    /// Retry any failure `attempts` times, `delay` apart
    #[must_use]
    pub const fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts,
            delay,
            retry_on: RetryOn::Any,
        }
    }

    /// Restrict retries to one failure class
    #[must_use]
    pub const fn only(mut self, kind: ErrorKind) -> Self {
        self.retry_on = RetryOn::Only(kind);
        self
    }

    /// Set the delay between calls
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Short budget for a UI re-render racing an interaction (3 x 100ms)
    #[must_use]
    pub const fn ui_rerender() -> Self {
        Self::new(3, Duration::from_millis(100))
    }

    /// General eventual consistency (10 x 1s)
    #[must_use]
    pub const fn eventual() -> Self {
        Self::new(10, Duration::from_secs(1))
    }

    /// Slow backend provisioning such as databases starting (180 x 1s)
    #[must_use]
    pub const fn provisioning() -> Self {
        Self::new(180, Duration::from_secs(1))
    }

    /// REST endpoint not accepting connections yet (10 calls, 500ms apart)
    #[must_use]
    pub const fn rest_connect() -> Self {
        Self::new(9, Duration::from_millis(500)).only(ErrorKind::Connect)
    }
}

/// Successful result plus how it was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryOutcome<T> {
    /// Value returned by the operation
    pub value: T,
    /// Number of invocations, including the successful one
    pub invocations: u32,
    /// Wall time spent, including delays
    pub elapsed: Duration,
}

/// Core loop: invoke `operation` until it succeeds, fails with an error
/// `predicate` rejects, or the budget is spent
pub async fn retry_if<T, F, Fut, P>(
    attempts: u32,
    delay: Duration,
    predicate: P,
    mut operation: F,
) -> HarnessResult<RetryOutcome<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = HarnessResult<T>>,
    P: Fn(&HarnessError) -> bool,
{
    let start = Instant::now();
    let mut suppressed = Vec::new();
    let mut invocation: u32 = 0;
    loop {
        invocation += 1;
        match operation().await {
            Ok(value) => {
                return Ok(RetryOutcome {
                    value,
                    invocations: invocation,
                    elapsed: start.elapsed(),
                })
            }
            Err(err) if !predicate(&err) => return Err(err),
            Err(err) if invocation > attempts => {
                return Err(HarnessError::RetriesExhausted {
                    attempts,
                    last: Box::new(err),
                    suppressed,
                })
            }
            Err(err) => {
                debug!(attempt = invocation, of = attempts.saturating_add(1), error = %err, "retrying");
                suppressed.push(err);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Retry under a [`RetrySpec`], returning invocation count and elapsed time
pub async fn retry_with_outcome<T, F, Fut>(
    spec: RetrySpec,
    operation: F,
) -> HarnessResult<RetryOutcome<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = HarnessResult<T>>,
{
    let retry_on = spec.retry_on;
    retry_if(spec.attempts, spec.delay, |e| retry_on.accepts(e), operation).await
}

/// Retry under a [`RetrySpec`]
pub async fn retry_with<T, F, Fut>(spec: RetrySpec, operation: F) -> HarnessResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = HarnessResult<T>>,
{
    retry_with_outcome(spec, operation).await.map(|o| o.value)
}

/// Retry any failure `attempts` times, `delay` apart
pub async fn retry<T, F, Fut>(attempts: u32, delay: Duration, operation: F) -> HarnessResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = HarnessResult<T>>,
{
    retry_with(RetrySpec::new(attempts, delay), operation).await
}

/// Retry any failure with [`RetrySpec::eventual`]
pub async fn retry_default<T, F, Fut>(operation: F) -> HarnessResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = HarnessResult<T>>,
{
    retry_with(RetrySpec::eventual(), operation).await
}

/// Retry only stale element references; anything else propagates at once
pub async fn retry_on_stale<T, F, Fut>(
    attempts: u32,
    delay: Duration,
    operation: F,
) -> HarnessResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = HarnessResult<T>>,
{
    retry_with(
        RetrySpec::new(attempts, delay).only(ErrorKind::Stale),
        operation,
    )
    .await
}
