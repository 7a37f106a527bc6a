// crates/cloudcheck-contract/src/clause.rs
// ============================================================================
// Module: Clauses
// Description: Named, independently retried assertions over one query.
// Purpose: Bind a title, resource query, constraints, budget, and strictness.
// Dependencies: cloudcheck-logic, serde_json
// ============================================================================

//! ## Overview
//! A [`ClauseBuilder`] is obtained from
//! [`ContractBuilder::new_clause_builder`](crate::ContractBuilder::new_clause_builder)
//! and configured with chained calls:
//!
//! ```ignore
//! builder
//!     .new_clause_builder("Instance Created")
//!     .retryable_for_secs(90)
//!     .list_resources(instances)
//!     .contains("name", "katotest-a");
//! ```
//!
//! `contains*` calls add existential constraints (some document matches;
//! every document when strict), `excludes*` calls add "no document matches",
//! and [`ClauseBuilder::add_mapped_constraint`] applies a predicate to every
//! document in the listing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use cloudcheck_logic::Constraint;
use cloudcheck_logic::FieldPath;
use cloudcheck_logic::Predicate;
use cloudcheck_logic::documents;
use serde_json::Value;

use crate::contract::ContractError;
use crate::query::QueryError;
use crate::query::ResourceQuery;
use crate::report::ConstraintOutcome;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Largest retry budget a clause accepts (one day).
pub const MAX_RETRY_BUDGET: Duration = Duration::from_secs(24 * 60 * 60);

// ============================================================================
// SECTION: Clause
// ============================================================================

/// Expected shape of a clause's observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObservationKind {
    /// The query lists many resources: an array, one document, or `null`.
    Listing,
    /// The query inspects one named resource: a document or `null`. An array
    /// is malformed.
    Single,
}

/// Frozen clause ready for verification.
pub struct Clause {
    /// Human-readable title.
    title: String,
    /// Query producing the observation.
    query: Arc<dyn ResourceQuery>,
    /// Expected observation shape.
    kind: ObservationKind,
    /// Constraints that must all hold on the same observation.
    constraints: Vec<Constraint>,
    /// Retry budget; zero means a single attempt.
    retryable_for: Duration,
    /// Whether existential constraints must hold for every document.
    strict: bool,
}

impl Clause {
    /// Returns the clause title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the resource query.
    #[must_use]
    pub fn query(&self) -> &dyn ResourceQuery {
        self.query.as_ref()
    }

    /// Returns the expected observation shape.
    #[must_use]
    pub const fn kind(&self) -> ObservationKind {
        self.kind
    }

    /// Returns the constraints in declaration order.
    #[must_use]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Returns the retry budget.
    #[must_use]
    pub const fn retryable_for(&self) -> Duration {
        self.retryable_for
    }

    /// Returns whether the clause is strict.
    #[must_use]
    pub const fn is_strict(&self) -> bool {
        self.strict
    }

    /// Checks that `observation` has the shape the query kind promises.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Malformed`] when an inspect query returns a
    /// listing.
    pub fn check_shape(&self, observation: &Value) -> Result<(), QueryError> {
        match (self.kind, observation) {
            (ObservationKind::Single, Value::Array(items)) => Err(QueryError::Malformed(format!(
                "inspect query `{}` returned a listing of {} document(s)",
                self.query.describe(),
                items.len()
            ))),
            _ => Ok(()),
        }
    }

    /// Evaluates every constraint against `observation`.
    #[must_use]
    pub fn evaluate(&self, observation: &Value) -> Vec<ConstraintOutcome> {
        let listing = documents(observation);
        self.constraints
            .iter()
            .map(|constraint| ConstraintOutcome {
                description: constraint.to_string(),
                satisfied: constraint.eval(&listing, self.strict),
            })
            .collect()
    }

    /// Returns true when every constraint holds against `observation`.
    #[must_use]
    pub fn is_satisfied_by(&self, observation: &Value) -> bool {
        let listing = documents(observation);
        self.constraints.iter().all(|constraint| constraint.eval(&listing, self.strict))
    }
}

impl fmt::Debug for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clause")
            .field("title", &self.title)
            .field("query", &self.query.describe())
            .field("kind", &self.kind)
            .field("constraints", &self.constraints)
            .field("retryable_for", &self.retryable_for)
            .field("strict", &self.strict)
            .finish()
    }
}

// ============================================================================
// SECTION: Clause Builder
// ============================================================================

/// Fluent builder for one clause.
pub struct ClauseBuilder {
    /// Human-readable title.
    title: String,
    /// Query bound by `list_resources` or `inspect_resource`.
    query: Option<Arc<dyn ResourceQuery>>,
    /// Expected observation shape.
    kind: ObservationKind,
    /// Constraints collected so far.
    constraints: Vec<Constraint>,
    /// Retry budget.
    retryable_for: Duration,
    /// Strictness flag.
    strict: bool,
}

impl ClauseBuilder {
    /// Creates a single-attempt, non-strict clause builder.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            query: None,
            kind: ObservationKind::Listing,
            constraints: Vec::new(),
            retryable_for: Duration::ZERO,
            strict: false,
        }
    }

    /// Sets the retry budget in seconds. Zero means a single attempt.
    pub fn retryable_for_secs(&mut self, secs: u64) -> &mut Self {
        self.retryable_for(Duration::from_secs(secs))
    }

    /// Sets the retry budget, capped at [`MAX_RETRY_BUDGET`].
    pub fn retryable_for(&mut self, budget: Duration) -> &mut Self {
        self.retryable_for = budget.min(MAX_RETRY_BUDGET);
        self
    }

    /// Sets the strictness flag.
    pub const fn strict(&mut self, strict: bool) -> &mut Self {
        self.strict = strict;
        self
    }

    /// Binds a query listing many resources.
    pub fn list_resources(&mut self, query: Arc<dyn ResourceQuery>) -> &mut Self {
        self.query = Some(query);
        self.kind = ObservationKind::Listing;
        self
    }

    /// Binds a query inspecting one named resource.
    pub fn inspect_resource(&mut self, query: Arc<dyn ResourceQuery>) -> &mut Self {
        self.query = Some(query);
        self.kind = ObservationKind::Single;
        self
    }

    /// Some document's value at `path` is or contains `expected`.
    pub fn contains(&mut self, path: impl Into<FieldPath>, expected: impl Into<Value>) -> &mut Self {
        self.add_constraint(Constraint::exists(Predicate::Contains {
            path: path.into(),
            expected: expected.into(),
        }))
    }

    /// Some document's value at `path` equals `expected`.
    pub fn contains_eq(
        &mut self,
        path: impl Into<FieldPath>,
        expected: impl Into<Value>,
    ) -> &mut Self {
        self.add_constraint(Constraint::exists(Predicate::Equals {
            path: path.into(),
            expected: expected.into(),
        }))
    }

    /// Some single document satisfies every predicate in `group`.
    pub fn contains_group(&mut self, group: Vec<Predicate>) -> &mut Self {
        self.add_constraint(Constraint::exists(Predicate::Group(group)))
    }

    /// Some document satisfies `predicate`.
    pub fn contains_match(&mut self, predicate: Predicate) -> &mut Self {
        self.add_constraint(Constraint::exists(predicate))
    }

    /// No document's value at `path` is or contains `expected`.
    pub fn excludes(&mut self, path: impl Into<FieldPath>, expected: impl Into<Value>) -> &mut Self {
        self.add_constraint(Constraint::excludes(Predicate::Contains {
            path: path.into(),
            expected: expected.into(),
        }))
    }

    /// No single document satisfies every predicate in `group`.
    pub fn excludes_group(&mut self, group: Vec<Predicate>) -> &mut Self {
        self.add_constraint(Constraint::excludes(Predicate::Group(group)))
    }

    /// Every document satisfies `predicate`; usually a conditional.
    pub fn add_mapped_constraint(&mut self, predicate: Predicate) -> &mut Self {
        self.add_constraint(Constraint::for_all(predicate))
    }

    /// Adds a pre-built constraint.
    pub fn add_constraint(&mut self, constraint: Constraint) -> &mut Self {
        self.constraints.push(constraint);
        self
    }

    /// Returns the clause title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Freezes the builder into a clause.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError`] when the title is blank, no query is bound,
    /// or no constraint was added.
    pub fn build(self) -> Result<Clause, ContractError> {
        if self.title.trim().is_empty() {
            return Err(ContractError::EmptyTitle);
        }
        let Some(query) = self.query else {
            return Err(ContractError::MissingQuery {
                title: self.title,
            });
        };
        if self.constraints.is_empty() {
            return Err(ContractError::NoConstraints {
                title: self.title,
            });
        }
        Ok(Clause {
            title: self.title,
            query,
            kind: self.kind,
            constraints: self.constraints,
            retryable_for: self.retryable_for,
            strict: self.strict,
        })
    }
}
