// crates/cloudcheck-contract/src/report.rs
// ============================================================================
// Module: Verification Reports
// Description: Clause states and itemized contract reports.
// Purpose: Give every verdict its title, attempts, and last observed state.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Reports are produced once a verification settles. A failing clause always
//! carries its title, the constraint outcomes from its final evaluation, the
//! last observation that was successfully made, and the last query error, so a
//! failure can be diagnosed without re-running the scenario.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Clause State
// ============================================================================

/// Lifecycle of a clause within one verification.
///
/// # Invariants
/// - `Pending` and `Polling` label state-transition log events only; a
///   [`ClauseReport`] always carries `Satisfied`, `TimedOut`, or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClauseState {
    /// Not yet polled.
    Pending,
    /// Polling in progress.
    Polling,
    /// Every constraint held on some observation.
    Satisfied,
    /// The retry budget ran out while constraints were unmet.
    TimedOut,
    /// A query error ended the clause.
    Failed,
}

impl ClauseState {
    /// Returns a stable label for the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Polling => "POLLING",
            Self::Satisfied => "SATISFIED",
            Self::TimedOut => "TIMED_OUT",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for ClauseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Clause Report
// ============================================================================

/// Result of evaluating one constraint against one observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstraintOutcome {
    /// Human-readable constraint description.
    pub description: String,
    /// Whether the constraint held.
    pub satisfied: bool,
}

/// Final record of one clause verification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClauseReport {
    /// Clause title.
    pub title: String,
    /// Description of the clause's resource query.
    pub query: String,
    /// Terminal state.
    pub state: ClauseState,
    /// Number of polls made.
    pub attempts: u32,
    /// Wall-clock time spent polling, in milliseconds.
    pub elapsed_ms: u64,
    /// Whether the clause was strict.
    pub strict: bool,
    /// Constraint outcomes from the last successful observation.
    pub outcomes: Vec<ConstraintOutcome>,
    /// Last successful observation, if any.
    pub last_observation: Option<Value>,
    /// Last query error, if any.
    pub last_error: Option<String>,
}

impl ClauseReport {
    /// Returns true when the clause counts as passing.
    ///
    /// With `timeout_ok`, a timed-out clause is accepted as slow convergence.
    #[must_use]
    pub fn passed(&self, timeout_ok: bool) -> bool {
        match self.state {
            ClauseState::Satisfied => true,
            ClauseState::TimedOut => timeout_ok,
            ClauseState::Pending | ClauseState::Polling | ClauseState::Failed => false,
        }
    }
}

impl fmt::Display for ClauseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "[{}] {} ({} attempt{}, {} ms, via {}{})",
            self.state,
            self.title,
            self.attempts,
            if self.attempts == 1 { "" } else { "s" },
            self.elapsed_ms,
            self.query,
            if self.strict { ", strict" } else { "" }
        )?;
        for outcome in &self.outcomes {
            let marker = if outcome.satisfied { "ok  " } else { "FAIL" };
            writeln!(f, "  {marker} {}", outcome.description)?;
        }
        if let Some(error) = &self.last_error {
            writeln!(f, "  last error: {error}")?;
        }
        match &self.last_observation {
            Some(observation) => {
                writeln!(f, "  last observation:")?;
                let rendered = serde_json::to_string_pretty(observation)
                    .unwrap_or_else(|_| observation.to_string());
                for line in rendered.lines() {
                    writeln!(f, "    {line}")?;
                }
            }
            None => writeln!(f, "  last observation: <none>")?,
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Contract Report
// ============================================================================

/// Itemized result of verifying a contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContractReport {
    /// True iff every clause is satisfied.
    pub satisfied: bool,
    /// Per-clause reports in contract order.
    pub clauses: Vec<ClauseReport>,
}

impl ContractReport {
    /// Aggregates clause reports.
    #[must_use]
    pub fn new(clauses: Vec<ClauseReport>) -> Self {
        let satisfied = clauses.iter().all(|clause| clause.state == ClauseState::Satisfied);
        Self {
            satisfied,
            clauses,
        }
    }

    /// Returns true when every clause passes under the `timeout_ok` policy.
    #[must_use]
    pub fn passed(&self, timeout_ok: bool) -> bool {
        self.clauses.iter().all(|clause| clause.passed(timeout_ok))
    }

    /// Returns the clauses that are not satisfied.
    pub fn unsatisfied(&self) -> impl Iterator<Item = &ClauseReport> {
        self.clauses.iter().filter(|clause| clause.state != ClauseState::Satisfied)
    }

    /// Looks up a clause report by title.
    #[must_use]
    pub fn clause(&self, title: &str) -> Option<&ClauseReport> {
        self.clauses.iter().find(|clause| clause.title == title)
    }
}

impl fmt::Display for ContractReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.satisfied { "SATISFIED" } else { "FAILED" };
        writeln!(f, "contract {verdict} ({} clause(s))", self.clauses.len())?;
        for clause in &self.clauses {
            write!(f, "{clause}")?;
        }
        Ok(())
    }
}
