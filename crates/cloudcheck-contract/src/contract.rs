// crates/cloudcheck-contract/src/contract.rs
// ============================================================================
// Module: Contracts
// Description: Ordered conjunction of clauses and its builder.
// Purpose: Collect clause builders and freeze them into an immutable contract.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! A [`ContractBuilder`] hands out mutable clause builders in declaration
//! order. [`ContractBuilder::build`] validates and freezes every clause; once
//! built, a [`Contract`] cannot be changed and may be verified any number of
//! times.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashSet;

use thiserror::Error;

use crate::clause::Clause;
use crate::clause::ClauseBuilder;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Contract construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    /// A clause was given a blank title.
    #[error("clause title must not be empty")]
    EmptyTitle,
    /// Two clauses share a title.
    #[error("duplicate clause title: {title}")]
    DuplicateTitle {
        /// Repeated title.
        title: String,
    },
    /// A clause never bound a resource query.
    #[error("clause `{title}` has no resource query")]
    MissingQuery {
        /// Clause title.
        title: String,
    },
    /// A clause has no constraints.
    #[error("clause `{title}` has no constraints")]
    NoConstraints {
        /// Clause title.
        title: String,
    },
}

// ============================================================================
// SECTION: Contract
// ============================================================================

/// Immutable ordered set of clauses.
///
/// # Invariants
/// - Clause titles are unique and non-empty.
/// - Every clause has a query and at least one constraint.
#[derive(Debug)]
pub struct Contract {
    /// Clauses in declaration order.
    clauses: Vec<Clause>,
}

impl Contract {
    /// Returns the clauses in declaration order.
    #[must_use]
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Returns the number of clauses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// Returns true when the contract has no clauses.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Looks up a clause by title.
    #[must_use]
    pub fn clause(&self, title: &str) -> Option<&Clause> {
        self.clauses.iter().find(|clause| clause.title() == title)
    }
}

// ============================================================================
// SECTION: Contract Builder
// ============================================================================

/// Builder accumulating clause builders.
#[derive(Default)]
pub struct ContractBuilder {
    /// Clause builders in declaration order.
    clauses: Vec<ClauseBuilder>,
}

impl ContractBuilder {
    /// Creates an empty contract builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new clause and returns its builder for chained configuration.
    pub fn new_clause_builder(&mut self, title: impl Into<String>) -> &mut ClauseBuilder {
        let index = self.clauses.len();
        self.clauses.push(ClauseBuilder::new(title));
        &mut self.clauses[index]
    }

    /// Returns the number of clauses started so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// Returns true when no clause has been started.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Validates and freezes every clause.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError`] for the first invalid clause, or when two
    /// clauses share a title.
    pub fn build(self) -> Result<Contract, ContractError> {
        let mut seen = HashSet::new();
        let mut clauses = Vec::with_capacity(self.clauses.len());
        for builder in self.clauses {
            let clause = builder.build()?;
            if !seen.insert(clause.title().to_string()) {
                return Err(ContractError::DuplicateTitle {
                    title: clause.title().to_string(),
                });
            }
            clauses.push(clause);
        }
        Ok(Contract {
            clauses,
        })
    }
}
