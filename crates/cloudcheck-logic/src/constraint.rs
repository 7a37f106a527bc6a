// crates/cloudcheck-logic/src/constraint.rs
// ============================================================================
// Module: Listing Constraints
// Description: Quantified predicates over listings of documents.
// Purpose: Separate "some document", "every document", and "no document".
// Dependencies: crate::predicate, serde, serde_json
// ============================================================================

//! ## Overview
//! A listing is the observation returned by a resource query: an array of
//! documents, a single document, or `null` for nothing. [`documents`]
//! normalizes all three. A [`Constraint`] pairs a predicate with a
//! [`Quantifier`]; strict evaluation upgrades `Exists` to "non-empty and every
//! document satisfies", while `ForAll` stays vacuous on an empty listing so
//! "all matching instances are stopping" holds once they are gone.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::predicate::Predicate;

// ============================================================================
// SECTION: Listing Normalization
// ============================================================================

/// Returns the documents held by an observation.
#[must_use]
pub fn documents(observation: &Value) -> Vec<&Value> {
    match observation {
        Value::Array(items) => items.iter().collect(),
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

// ============================================================================
// SECTION: Constraint
// ============================================================================

/// How a predicate is applied across a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantifier {
    /// At least one document satisfies the predicate.
    Exists,
    /// Every document satisfies the predicate.
    ForAll,
    /// No document satisfies the predicate.
    None,
}

/// Predicate applied across a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    /// Quantifier applied over the listing.
    pub quantifier: Quantifier,
    /// Per-document predicate.
    pub predicate: Predicate,
}

impl Constraint {
    /// Requires some document to satisfy `predicate`.
    #[must_use]
    pub const fn exists(predicate: Predicate) -> Self {
        Self {
            quantifier: Quantifier::Exists,
            predicate,
        }
    }

    /// Requires every document to satisfy `predicate`.
    #[must_use]
    pub const fn for_all(predicate: Predicate) -> Self {
        Self {
            quantifier: Quantifier::ForAll,
            predicate,
        }
    }

    /// Requires no document to satisfy `predicate`.
    #[must_use]
    pub const fn excludes(predicate: Predicate) -> Self {
        Self {
            quantifier: Quantifier::None,
            predicate,
        }
    }

    /// Evaluates the constraint against a normalized listing.
    #[must_use]
    pub fn eval(&self, documents: &[&Value], strict: bool) -> bool {
        let mut matches = documents.iter().map(|document| self.predicate.eval(document));
        match self.quantifier {
            Quantifier::Exists if strict => !documents.is_empty() && matches.all(|hit| hit),
            Quantifier::Exists => matches.any(|hit| hit),
            Quantifier::ForAll => matches.all(|hit| hit),
            Quantifier::None => !matches.any(|hit| hit),
        }
    }

    /// Evaluates the constraint against a raw observation.
    #[must_use]
    pub fn eval_observation(&self, observation: &Value, strict: bool) -> bool {
        self.eval(&documents(observation), strict)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.quantifier {
            Quantifier::Exists => write!(f, "some document: {}", self.predicate),
            Quantifier::ForAll => write!(f, "every document: {}", self.predicate),
            Quantifier::None => write!(f, "no document: {}", self.predicate),
        }
    }
}
