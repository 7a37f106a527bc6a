// crates/cloudcheck-contract/src/verifier.rs
// ============================================================================
// Module: Contract Verifier
// Description: Deadline-bounded polling of contract clauses.
// Purpose: Drive every clause from PENDING to a terminal state and report.
// Dependencies: cloudcheck-core, futures, serde, tokio, tracing
// ============================================================================

//! ## Overview
//! Each clause is polled by its own retry loop: observe, evaluate, and either
//! settle as satisfied or sleep the poll interval and try again. The loop is
//! bounded by the clause's retry budget measured from its first poll, and by
//! the optional overall timeout, which is also enforced while a query is in
//! flight. Every clause's deadline is computed when verification starts and
//! all clauses poll concurrently, so a slow clause never delays another;
//! `max_concurrency` only bounds how many queries are in flight at once. The
//! contract report is assembled in declaration order once every clause has
//! settled.
//!
//! Query errors follow [`QueryErrorPolicy`]: they either fail the clause at
//! once or are retried until the deadline. A clause whose deadline passes
//! after a query error is `FAILED`; one whose last observation was valid but
//! unsatisfying is `TIMED_OUT`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;

use cloudcheck_core::RetryOutcome;
use cloudcheck_core::RetryPolicy;
use cloudcheck_core::Step;
use cloudcheck_core::retry_until;
use futures::future::join_all;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tokio::time::timeout_at;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::clause::Clause;
use crate::contract::Contract;
use crate::query::QueryError;
use crate::report::ClauseReport;
use crate::report::ClauseState;
use crate::report::ConstraintOutcome;
use crate::report::ContractReport;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Handling of resource query errors during polling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryErrorPolicy {
    /// The first query error fails the clause.
    #[default]
    FailFast,
    /// Query errors are recorded and polling continues until the deadline.
    #[serde(alias = "retry")]
    RetryUntilDeadline,
}

/// Verifier tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifierConfig {
    /// Sleep between polls of an unsatisfied clause.
    pub poll_interval: Duration,
    /// Maximum number of resource queries in flight at once.
    pub max_concurrency: usize,
    /// Query error handling.
    pub query_errors: QueryErrorPolicy,
    /// Caller-supplied bound on the whole verification.
    pub overall_timeout: Option<Duration>,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            max_concurrency: 4,
            query_errors: QueryErrorPolicy::FailFast,
            overall_timeout: None,
        }
    }
}

// ============================================================================
// SECTION: Poll Bookkeeping
// ============================================================================

/// Why a poll did not settle the clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollMiss {
    /// The observation was valid but did not satisfy every constraint.
    Unsatisfied,
    /// The query failed and the policy allows retrying.
    QueryFailed,
    /// The overall timeout fired while the query was in flight.
    Interrupted,
}

/// State carried across polls of one clause.
#[derive(Debug, Default)]
struct ClauseProgress {
    /// Last successful observation.
    last_observation: Option<Value>,
    /// Outcomes from evaluating `last_observation`.
    outcomes: Vec<ConstraintOutcome>,
    /// Last query error.
    last_error: Option<String>,
}

// ============================================================================
// SECTION: Verifier
// ============================================================================

/// Polls contract clauses until each settles.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContractVerifier {
    /// Verifier tuning.
    config: VerifierConfig,
}

impl ContractVerifier {
    /// Creates a verifier with the given configuration.
    #[must_use]
    pub const fn new(config: VerifierConfig) -> Self {
        Self {
            config,
        }
    }

    /// Returns the verifier configuration.
    #[must_use]
    pub const fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Verifies every clause of `contract` and returns the itemized report.
    ///
    /// Every clause's deadline is fixed on entry and all clauses are polled
    /// concurrently; `max_concurrency` bounds the queries in flight at once.
    pub async fn verify(&self, contract: &Contract) -> ContractReport {
        let entered = Instant::now();
        let overall_deadline =
            self.config.overall_timeout.and_then(|limit| entered.checked_add(limit));
        let permits = Semaphore::new(self.config.max_concurrency.max(1));
        let clauses = join_all(
            contract
                .clauses()
                .iter()
                .map(|clause| self.poll_clause(clause, entered, overall_deadline, &permits)),
        )
        .await;
        let report = ContractReport::new(clauses);
        if report.satisfied {
            info!(clauses = report.clauses.len(), "contract satisfied");
        } else {
            warn!(
                clauses = report.clauses.len(),
                unsatisfied = report.unsatisfied().count(),
                "contract not satisfied"
            );
        }
        report
    }

    /// Polls one clause until it settles.
    ///
    /// The clause's retry budget starts now; `overall_deadline`, when given,
    /// further bounds both the budget and any in-flight query.
    pub async fn verify_clause(
        &self,
        clause: &Clause,
        overall_deadline: Option<Instant>,
    ) -> ClauseReport {
        let permits = Semaphore::new(self.config.max_concurrency.max(1));
        self.poll_clause(clause, Instant::now(), overall_deadline, &permits).await
    }

    /// Polls `clause` with its budget measured from `entered`.
    async fn poll_clause(
        &self,
        clause: &Clause,
        entered: Instant,
        overall_deadline: Option<Instant>,
        permits: &Semaphore,
    ) -> ClauseReport {
        let budget_deadline = entered.checked_add(clause.retryable_for()).unwrap_or(entered);
        let deadline = overall_deadline.map_or(budget_deadline, |limit| budget_deadline.min(limit));
        let progress = Mutex::new(ClauseProgress::default());
        let shared = &progress;
        let query_errors = self.config.query_errors;

        debug!(
            clause = clause.title(),
            from = ClauseState::Pending.as_str(),
            to = ClauseState::Polling.as_str(),
            budget_ms = duration_ms(clause.retryable_for()),
            "clause state transition"
        );

        let policy = RetryPolicy::fixed(self.config.poll_interval);
        let outcome = retry_until(deadline, policy, move |attempt| {
            async move {
                debug!(clause = clause.title(), attempt, "polling clause");
                let observe = async {
                    let _permit = permits.acquire().await.ok();
                    let observation = clause.query().observe().await?;
                    clause.check_shape(&observation)?;
                    Ok::<Value, QueryError>(observation)
                };
                let observed = match overall_deadline {
                    Some(limit) => match timeout_at(limit, observe).await {
                        Ok(result) => result,
                        Err(_) => return Step::Retry(PollMiss::Interrupted),
                    },
                    None => observe.await,
                };
                match observed {
                    Ok(observation) => {
                        let outcomes = clause.evaluate(&observation);
                        let satisfied = outcomes.iter().all(|outcome| outcome.satisfied);
                        record(shared, |state| {
                            state.last_observation = Some(observation);
                            state.outcomes = outcomes;
                        });
                        if satisfied {
                            Step::Done(())
                        } else {
                            Step::Retry(PollMiss::Unsatisfied)
                        }
                    }
                    Err(error) => {
                        warn!(clause = clause.title(), attempt, error = %error, "resource query failed");
                        record(shared, |state| state.last_error = Some(error.to_string()));
                        match query_errors {
                            QueryErrorPolicy::FailFast => Step::Abort(error),
                            QueryErrorPolicy::RetryUntilDeadline => {
                                Step::Retry(PollMiss::QueryFailed)
                            }
                        }
                    }
                }
            }
        })
        .await;

        let attempts = outcome.attempts();
        let state = settle(&outcome);
        let elapsed_ms = duration_ms(entered.elapsed());
        match state {
            ClauseState::Satisfied => {
                info!(clause = clause.title(), attempts, elapsed_ms, "clause satisfied");
            }
            _ => {
                warn!(
                    clause = clause.title(),
                    state = state.as_str(),
                    attempts,
                    elapsed_ms,
                    "clause not satisfied"
                );
            }
        }

        let progress = progress.into_inner().unwrap_or_else(PoisonError::into_inner);
        ClauseReport {
            title: clause.title().to_string(),
            query: clause.query().describe(),
            state,
            attempts,
            elapsed_ms,
            strict: clause.is_strict(),
            outcomes: progress.outcomes,
            last_observation: progress.last_observation,
            last_error: progress.last_error,
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Maps a retry outcome onto the clause's terminal state.
const fn settle(outcome: &RetryOutcome<(), PollMiss, QueryError>) -> ClauseState {
    match outcome {
        RetryOutcome::Done {
            ..
        } => ClauseState::Satisfied,
        RetryOutcome::Aborted {
            ..
        }
        | RetryOutcome::Exhausted {
            last: PollMiss::QueryFailed,
            ..
        } => ClauseState::Failed,
        RetryOutcome::Exhausted {
            last: PollMiss::Unsatisfied | PollMiss::Interrupted,
            ..
        } => ClauseState::TimedOut,
    }
}

/// Applies `update` to the clause progress.
fn record(progress: &Mutex<ClauseProgress>, update: impl FnOnce(&mut ClauseProgress)) {
    let mut guard = progress.lock().unwrap_or_else(PoisonError::into_inner);
    update(&mut guard);
}

/// Converts a duration to whole milliseconds, saturating.
fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
