// crates/cloudcheck-logic/src/contains.rs
// ============================================================================
// Module: Structural Containment
// Description: "Is or contains" relation between JSON values.
// Purpose: Back the contains-style predicates with one recursive rule set.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Scalars compare by equality. An expected object is contained when each of
//! its keys is present and contains the expected value, so a partial object
//! matches a fuller one. An expected array is contained by an actual array
//! when every expected element is contained by some actual element. Any other
//! expected value is contained by an actual array when some element contains
//! it.

use serde_json::Value;

/// Returns true when `actual` is or contains `expected`.
#[must_use]
pub fn contains(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Object(actual), Value::Object(expected)) => expected
            .iter()
            .all(|(key, want)| actual.get(key).is_some_and(|have| contains(have, want))),
        (Value::Array(actual), Value::Array(expected)) => {
            expected.iter().all(|want| actual.iter().any(|have| contains(have, want)))
        }
        (Value::Array(actual), _) => actual.iter().any(|have| contains(have, expected)),
        _ => actual == expected,
    }
}
