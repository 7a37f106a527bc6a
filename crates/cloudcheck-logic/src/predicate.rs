// crates/cloudcheck-logic/src/predicate.rs
// ============================================================================
// Module: Predicates
// Description: Closed predicate algebra over a single JSON document.
// Purpose: Define `Predicate`, its evaluation, and its human-readable form.
// Dependencies: cloudcheck-core, serde, serde_json
// ============================================================================

//! ## Overview
//! [`Predicate`] is a closed set of variants with one evaluation arm each, so
//! adding a variant is a compile-time checked change. Evaluation never mutates
//! the document. A path that resolves to several values (fan-out over arrays)
//! satisfies a field predicate when any resolved value does; a path that
//! resolves to nothing never satisfies a field predicate.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use cloudcheck_core::FieldPath;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::contains::contains;

// ============================================================================
// SECTION: Predicate Definition
// ============================================================================

/// Boolean test against one JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// Value at `path` is or structurally contains `expected`.
    Contains {
        /// Field to inspect.
        path: FieldPath,
        /// Expected value or fragment.
        expected: Value,
    },
    /// Value at `path` equals `expected` exactly.
    Equals {
        /// Field to inspect.
        path: FieldPath,
        /// Expected value.
        expected: Value,
    },
    /// Value at `path` is a collection with an element containing `expected`.
    ///
    /// Unlike [`Predicate::Contains`], a scalar equal to `expected` does not
    /// match.
    ElementsContain {
        /// Collection field to inspect.
        path: FieldPath,
        /// Expected element.
        expected: Value,
    },
    /// Every member holds against the same document. Empty groups hold.
    Group(Vec<Self>),
    /// `then` holds whenever `when` holds; vacuously true otherwise.
    Conditional {
        /// Selector guarding the inner predicate.
        when: Box<Self>,
        /// Predicate applied to selected documents.
        then: Box<Self>,
    },
    /// Inverts the inner predicate.
    Not(Box<Self>),
}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

impl Predicate {
    /// Evaluates this predicate against `document`.
    #[must_use]
    pub fn eval(&self, document: &Value) -> bool {
        match self {
            Self::Contains {
                path,
                expected,
            } => path.resolve(document).into_iter().any(|value| contains(value, expected)),
            Self::Equals {
                path,
                expected,
            } => path.resolve(document).into_iter().any(|value| value == expected),
            Self::ElementsContain {
                path,
                expected,
            } => path.resolve(document).into_iter().any(|value| match value {
                Value::Array(items) => items.iter().any(|item| contains(item, expected)),
                _ => false,
            }),
            Self::Group(predicates) => predicates.iter().all(|predicate| predicate.eval(document)),
            Self::Conditional {
                when,
                then,
            } => !when.eval(document) || then.eval(document),
            Self::Not(inner) => !inner.eval(document),
        }
    }

    /// Returns the number of nodes in this predicate tree.
    #[must_use]
    pub fn complexity(&self) -> usize {
        match self {
            Self::Contains {
                ..
            }
            | Self::Equals {
                ..
            }
            | Self::ElementsContain {
                ..
            } => 1,
            Self::Group(predicates) => 1 + predicates.iter().map(Self::complexity).sum::<usize>(),
            Self::Conditional {
                when,
                then,
            } => 1 + when.complexity() + then.complexity(),
            Self::Not(inner) => 1 + inner.complexity(),
        }
    }
}

impl std::ops::Not for Predicate {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self::Not(Box::new(self))
    }
}

// ============================================================================
// SECTION: Display
// ============================================================================

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Contains {
                path,
                expected,
            } => write!(f, "{path} contains {expected}"),
            Self::Equals {
                path,
                expected,
            } => write!(f, "{path} == {expected}"),
            Self::ElementsContain {
                path,
                expected,
            } => write!(f, "{path} has element {expected}"),
            Self::Group(predicates) => {
                f.write_str("(")?;
                for (index, predicate) in predicates.iter().enumerate() {
                    if index > 0 {
                        f.write_str(" and ")?;
                    }
                    write!(f, "{predicate}")?;
                }
                f.write_str(")")
            }
            Self::Conditional {
                when,
                then,
            } => write!(f, "if {when} then {then}"),
            Self::Not(inner) => write!(f, "not {inner}"),
        }
    }
}
