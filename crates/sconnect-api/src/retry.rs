//! Retrying request executor.
//!
//! Every dashboard call goes through [`send_with_retry`]. Transport errors
//! are returned at once; 2xx and non-429 4xx responses are returned at once;
//! everything else (5xx, 429) is retried with exponential backoff plus
//! jitter until the budget runs out, at which point the last response is
//! handed back untouched for the caller to interpret.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::{RequestBuilder, Response, StatusCode};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::Error;

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

// ── RetryPolicy ──────────────────────────────────────────────────────

/// Backoff configuration for transient HTTP failures.
///
/// The delay before retry `n` (0-based) is `base_delay * 2^n` plus a jitter
/// strictly below `max_jitter`. With the defaults that is 1s, 2s, 4s, ...
/// plus up to a second, which spreads out concurrently retrying clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the initial attempt. `0` disables retrying.
    pub max_retries: u32,

    /// Delay unit doubled on every attempt. Default: 1s.
    pub base_delay: Duration,

    /// Exclusive upper bound on the random component. Default: 1s.
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_secs(1),
            max_jitter: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Policy with the default timing and the given retry budget.
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Exponential part of the delay before retry `attempt`.
    pub fn base_backoff(&self, attempt: u32) -> Duration {
        let factor = 2_u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Full delay before retry `attempt`, jitter included.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_backoff(attempt).saturating_add(self.jitter())
    }

    /// Clock-seeded jitter in `[0, max_jitter)`, in thousandths of `max_jitter`.
    ///
    /// Not cryptographically random; it only needs to differ between
    /// processes retrying at the same moment.
    fn jitter(&self) -> Duration {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.subsec_millis());
        let fraction = f64::from(millis) / 1000.0;
        self.max_jitter.mul_f64(fraction)
    }
}

// ── Classification ───────────────────────────────────────────────────

/// Whether a response status is worth another attempt.
///
/// Success (< 300) and client errors other than 429 are final. Server
/// errors, 429, and anything else unexpected are treated as transient.
pub fn is_retryable(status: StatusCode) -> bool {
    if status.as_u16() < 300 {
        return false;
    }
    if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
        return false;
    }
    true
}

// ── Executor ─────────────────────────────────────────────────────────

/// Send a request, retrying transient failures per `policy`.
///
/// `build` is called once per attempt to produce a fresh request. Both the
/// in-flight request and the backoff sleep race against `cancel`; if the
/// token fires first, any held response is dropped and
/// [`Error::Cancelled`] is returned.
///
/// A non-success final status is **not** an error here: after the budget
/// is spent the last response comes back as `Ok`.
pub async fn send_with_retry<F>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    build: F,
) -> Result<Response, Error>
where
    F: Fn() -> RequestBuilder + Send + Sync,
{
    let mut attempt: u32 = 0;

    loop {
        let resp = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::Cancelled),
            result = build().send() => result?,
        };

        let status = resp.status();
        if !is_retryable(status) {
            debug!(%status, attempt, "request settled");
            return Ok(resp);
        }

        if attempt >= policy.max_retries {
            warn!(
                %status,
                max_retries = policy.max_retries,
                "retry budget exhausted, returning last response"
            );
            return Ok(resp);
        }

        let delay = policy.backoff(attempt);
        warn!(
            %status,
            attempt,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "transient failure, backing off"
        );

        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                drop(resp);
                return Err(Error::Cancelled);
            }
            () = tokio::time::sleep(delay) => {}
        }

        // Release the discarded body before the next attempt.
        drop(resp);
        attempt += 1;
    }
}

// ── Tests ────────────────────────────────────────────────────────────
