// crates/cloudcheck-core/tests/retry.rs
// ============================================================================
// Module: Bounded Retry Tests
// Description: Deadline, backoff, and classification behavior of retry_until.
// ============================================================================
//! ## Overview
//! Runs the retry loop on paused tokio time so multi-second budgets are
//! deterministic.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::time::Duration;

use cloudcheck_core::RetryOutcome;
use cloudcheck_core::RetryPolicy;
use cloudcheck_core::Step;
use cloudcheck_core::retry_until;
use tokio::time::Instant;

// ============================================================================
// SECTION: Completion
// ============================================================================

#[tokio::test(start_paused = true)]
async fn first_success_stops_without_sleeping() {
    let start = Instant::now();
    let outcome: RetryOutcome<u32, (), ()> =
        retry_until(start + Duration::from_secs(30), RetryPolicy::default(), |n| async move {
            Step::Done(n)
        })
        .await;
    assert_eq!(
        outcome,
        RetryOutcome::Done {
            value: 1,
            attempts: 1
        }
    );
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn retries_with_fixed_backoff_until_done() {
    let start = Instant::now();
    let outcome: RetryOutcome<u32, (), ()> =
        retry_until(start + Duration::from_secs(30), RetryPolicy::default(), |n| async move {
            if n < 3 { Step::Retry(()) } else { Step::Done(n) }
        })
        .await;
    assert_eq!(outcome.attempts(), 3);
    assert_eq!(start.elapsed(), Duration::from_secs(2));
}

// ============================================================================
// SECTION: Deadline Handling
// ============================================================================

#[tokio::test(start_paused = true)]
async fn deadline_at_entry_allows_exactly_one_attempt() {
    let start = Instant::now();
    let outcome: RetryOutcome<(), &str, ()> =
        retry_until(start, RetryPolicy::default(), |_| async { Step::Retry("not yet") }).await;
    assert_eq!(
        outcome,
        RetryOutcome::Exhausted {
            last: "not yet",
            attempts: 1
        }
    );
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn backoff_is_clamped_to_the_deadline() {
    let start = Instant::now();
    let policy = RetryPolicy::fixed(Duration::from_secs(10));
    let outcome: RetryOutcome<(), u32, ()> =
        retry_until(start + Duration::from_millis(2_500), policy, |n| async move {
            Step::Retry(n)
        })
        .await;
    assert_eq!(
        outcome,
        RetryOutcome::Exhausted {
            last: 1,
            attempts: 1
        }
    );
    assert_eq!(start.elapsed(), Duration::from_millis(2_500));
}

#[tokio::test(start_paused = true)]
async fn slow_attempts_consume_the_budget() {
    let start = Instant::now();
    let outcome: RetryOutcome<(), (), ()> =
        retry_until(start + Duration::from_secs(5), RetryPolicy::default(), |_| async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Step::Retry(())
        })
        .await;
    // Attempts start at 0s, 3s; the second ends at 5s which is the deadline.
    assert_eq!(outcome.attempts(), 2);
    assert_eq!(start.elapsed(), Duration::from_secs(5));
}

// ============================================================================
// SECTION: Abort
// ============================================================================

#[tokio::test(start_paused = true)]
async fn abort_stops_immediately() {
    let start = Instant::now();
    let outcome: RetryOutcome<(), (), String> =
        retry_until(start + Duration::from_secs(30), RetryPolicy::default(), |n| async move {
            if n == 2 { Step::Abort("fatal".to_string()) } else { Step::Retry(()) }
        })
        .await;
    assert_eq!(
        outcome,
        RetryOutcome::Aborted {
            error: "fatal".to_string(),
            attempts: 2
        }
    );
    assert_eq!(start.elapsed(), Duration::from_secs(1));
}
