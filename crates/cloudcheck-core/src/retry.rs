// crates/cloudcheck-core/src/retry.rs
// ============================================================================
// Module: Bounded Retry
// Description: Fixed-backoff retry loop bounded by a wall-clock deadline.
// Purpose: Share one retry primitive between fetching and clause polling.
// Dependencies: tokio::time
// ============================================================================

//! ## Overview
//! [`retry_until`] runs an attempt, classifies its [`Step`], and either stops or
//! sleeps a fixed backoff before trying again. The loop is bounded by the
//! deadline supplied at entry, never by an attempt count: a slow attempt eats
//! into the same budget as the sleeps around it. Backoff sleeps are clamped to
//! the deadline so a caller-supplied limit is honored mid-backoff.
//!
//! The first attempt always runs, so a deadline equal to "now" yields exactly
//! one attempt.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio::time::sleep_until;

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Retry policy with a fixed backoff between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay between the end of one attempt and the start of the next.
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Creates a policy with the given fixed backoff.
    #[must_use]
    pub const fn fixed(backoff: Duration) -> Self {
        Self {
            backoff,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(Duration::from_secs(1))
    }
}

// ============================================================================
// SECTION: Attempt Classification
// ============================================================================

/// Classification of a single attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<T, R, E> {
    /// The attempt succeeded; stop with this value.
    Done(T),
    /// The attempt did not succeed yet; retry if budget remains.
    Retry(R),
    /// The attempt failed fatally; stop without retrying.
    Abort(E),
}

/// Terminal outcome of a retry loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome<T, R, E> {
    /// An attempt returned [`Step::Done`].
    Done {
        /// Value produced by the successful attempt.
        value: T,
        /// Attempts made, including the successful one.
        attempts: u32,
    },
    /// The deadline passed while attempts kept returning [`Step::Retry`].
    Exhausted {
        /// Observation from the last attempt.
        last: R,
        /// Attempts made.
        attempts: u32,
    },
    /// An attempt returned [`Step::Abort`].
    Aborted {
        /// Fatal error from the aborting attempt.
        error: E,
        /// Attempts made, including the aborting one.
        attempts: u32,
    },
}

impl<T, R, E> RetryOutcome<T, R, E> {
    /// Returns the number of attempts made.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Done {
                attempts, ..
            }
            | Self::Exhausted {
                attempts, ..
            }
            | Self::Aborted {
                attempts, ..
            } => *attempts,
        }
    }
}

// ============================================================================
// SECTION: Retry Loop
// ============================================================================

/// Runs `attempt` until it completes, aborts, or `deadline` passes.
///
/// The attempt closure receives the 1-based attempt number.
pub async fn retry_until<F, Fut, T, R, E>(
    deadline: Instant,
    policy: RetryPolicy,
    mut attempt: F,
) -> RetryOutcome<T, R, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Step<T, R, E>>,
{
    let mut attempts: u32 = 0;
    loop {
        attempts = attempts.saturating_add(1);
        let last = match attempt(attempts).await {
            Step::Done(value) => {
                return RetryOutcome::Done {
                    value,
                    attempts,
                };
            }
            Step::Abort(error) => {
                return RetryOutcome::Aborted {
                    error,
                    attempts,
                };
            }
            Step::Retry(last) => last,
        };

        let now = Instant::now();
        if now >= deadline {
            return RetryOutcome::Exhausted {
                last,
                attempts,
            };
        }
        sleep_until(now.checked_add(policy.backoff).map_or(deadline, |wake| wake.min(deadline)))
            .await;
        if Instant::now() >= deadline {
            return RetryOutcome::Exhausted {
                last,
                attempts,
            };
        }
    }
}
