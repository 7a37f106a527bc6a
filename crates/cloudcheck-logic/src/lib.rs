// crates/cloudcheck-logic/src/lib.rs
// ============================================================================
// Module: Predicate Logic Root
// Description: Public API surface for the predicate algebra.
// Purpose: Wire together predicates, listing constraints, and constructors.
// Dependencies: crate::{constraint, contains, predicate}
// ============================================================================

//! ## Overview
//! Predicates are pure tests against a single JSON document. Constraints lift a
//! predicate over a listing of documents with an explicit quantifier (exists,
//! for-all, none). The [`convenience`] module mirrors the vocabulary scenario
//! authors use when composing clauses.

// ============================================================================
// SECTION: Core Modules
// ============================================================================

pub mod constraint;
pub mod contains;
pub mod predicate;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use cloudcheck_core::FieldPath;
pub use constraint::Constraint;
pub use constraint::Quantifier;
pub use constraint::documents;
pub use contains::contains;
pub use predicate::Predicate;

// ============================================================================
// SECTION: Convenience Constructors
// ============================================================================

/// Convenience functions for creating predicates without spelling out variants
pub mod convenience {
    use cloudcheck_core::FieldPath;
    use serde_json::Value;

    use super::Predicate;

    /// Value at `path` is or contains `expected`
    #[must_use]
    pub fn path_contains(path: impl Into<FieldPath>, expected: impl Into<Value>) -> Predicate {
        Predicate::Contains {
            path: path.into(),
            expected: expected.into(),
        }
    }

    /// Value at `path` equals `expected`
    #[must_use]
    pub fn path_eq(path: impl Into<FieldPath>, expected: impl Into<Value>) -> Predicate {
        Predicate::Equals {
            path: path.into(),
            expected: expected.into(),
        }
    }

    /// Collection at `path` has `expected` among its elements
    #[must_use]
    pub fn path_elements_contain(
        path: impl Into<FieldPath>,
        expected: impl Into<Value>,
    ) -> Predicate {
        Predicate::ElementsContain {
            path: path.into(),
            expected: expected.into(),
        }
    }

    /// All predicates hold against the same document
    #[must_use]
    pub const fn group(predicates: Vec<Predicate>) -> Predicate {
        Predicate::Group(predicates)
    }

    /// `then` must hold for documents where `when` holds
    #[must_use]
    pub fn if_then(when: Predicate, then: Predicate) -> Predicate {
        Predicate::Conditional {
            when: Box::new(when),
            then: Box::new(then),
        }
    }

    /// Inverts a predicate
    #[must_use]
    pub fn not(predicate: Predicate) -> Predicate {
        Predicate::Not(Box::new(predicate))
    }
}
