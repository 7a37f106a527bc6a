// crates/cloudcheck-contract/src/query.rs
// ============================================================================
// Module: Resource Queries
// Description: Backend-agnostic interface for observing resource state.
// Purpose: Decouple clause polling from how a listing is actually fetched.
// Dependencies: async-trait, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A [`ResourceQuery`] returns the current observation of some resources: a
//! JSON array for listings, a single document for inspections, or `null` when
//! the resource does not exist. The verifier only decides when to re-run a
//! query and how to judge its result. [`StaticQuery`] and [`FnQuery`] cover
//! fixed observations and closure-backed fakes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Query Interface
// ============================================================================

/// Resource query errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The query could not be executed.
    #[error("resource query failed: {0}")]
    Failed(String),
    /// The query ran but its output could not be interpreted.
    #[error("resource query returned malformed output: {0}")]
    Malformed(String),
}

/// Backend-agnostic resource observation.
#[async_trait]
pub trait ResourceQuery: Send + Sync {
    /// Returns a short description used in reports, e.g. `list instances`.
    fn describe(&self) -> String;

    /// Observes the current state of the resources.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] when the observation cannot be made.
    async fn observe(&self) -> Result<Value, QueryError>;
}

// ============================================================================
// SECTION: Static Query
// ============================================================================

/// Query returning a fixed observation.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticQuery {
    /// Report description.
    description: String,
    /// Observation returned on every call.
    observation: Value,
}

impl StaticQuery {
    /// Creates a query that always observes `observation`.
    #[must_use]
    pub fn new(description: impl Into<String>, observation: Value) -> Self {
        Self {
            description: description.into(),
            observation,
        }
    }
}

#[async_trait]
impl ResourceQuery for StaticQuery {
    fn describe(&self) -> String {
        self.description.clone()
    }

    async fn observe(&self) -> Result<Value, QueryError> {
        Ok(self.observation.clone())
    }
}

// ============================================================================
// SECTION: Closure Query
// ============================================================================

/// Query backed by a synchronous closure.
pub struct FnQuery<F> {
    /// Report description.
    description: String,
    /// Observation callback.
    observe: F,
}

impl<F> FnQuery<F>
where
    F: Fn() -> Result<Value, QueryError> + Send + Sync,
{
    /// Creates a query that calls `observe` on every poll.
    pub fn new(description: impl Into<String>, observe: F) -> Self {
        Self {
            description: description.into(),
            observe,
        }
    }
}

#[async_trait]
impl<F> ResourceQuery for FnQuery<F>
where
    F: Fn() -> Result<Value, QueryError> + Send + Sync,
{
    fn describe(&self) -> String {
        self.description.clone()
    }

    async fn observe(&self) -> Result<Value, QueryError> {
        (self.observe)()
    }
}
