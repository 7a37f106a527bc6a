// crates/cloudcheck-introspect/src/expression.rs
// ============================================================================
// Module: Expression Dictionary
// Description: Ordered, override-merged configuration key/value mapping.
// Purpose: Hold effective configuration and expand `${...}` placeholders.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! [`ExpressionDict`] keeps keys in first-insertion order and applies
//! last-write-wins on [`ExpressionDict::update`]. Values are stored raw;
//! [`ExpressionDict::resolve`] expands `${key}` and `${key:default}`
//! placeholders against the same mapping.
//!
//! # Invariants
//! - `update` replaces whole values; nested objects are never deep-merged.
//! - Overriding a key keeps its original position.
//! - Placeholders that cannot be resolved and carry no default are kept
//!   verbatim.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum placeholder nesting followed during expansion.
pub const MAX_EXPANSION_DEPTH: usize = 32;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Placeholder expansion errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpressionError {
    /// A placeholder refers back to a key already being expanded.
    #[error("placeholder cycle through `{key}`")]
    Cycle {
        /// Key that closed the cycle.
        key: String,
    },
    /// Placeholder nesting exceeded [`MAX_EXPANSION_DEPTH`].
    #[error("placeholder nesting exceeds {limit} levels at `{key}`")]
    TooDeep {
        /// Key being expanded when the limit was hit.
        key: String,
        /// Depth limit.
        limit: usize,
    },
}

// ============================================================================
// SECTION: Expression Dictionary
// ============================================================================

/// Ordered key/value mapping with override-merge semantics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpressionDict {
    /// Entries in first-insertion order.
    entries: Map<String, Value>,
}

impl ExpressionDict {
    /// Creates an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override-merges `source` into the mapping; later writes win.
    pub fn update(&mut self, source: &Map<String, Value>) {
        for (key, value) in source {
            self.entries.insert(key.clone(), value.clone());
        }
    }

    /// Sets a single key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Returns the raw value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Returns the raw value for `key`, or `default` when absent.
    #[must_use]
    pub fn get_or<'a>(&'a self, key: &str, default: &'a Value) -> &'a Value {
        self.entries.get(key).unwrap_or(default)
    }

    /// Returns the raw value for `key` when it is a string.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(Value::as_str)
    }

    /// Returns true when `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the mapping is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    /// Returns the underlying map.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.entries
    }

    /// Consumes the mapping, returning the underlying map.
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.entries
    }

    /// Returns the value for `key` with placeholders in strings expanded.
    ///
    /// # Errors
    ///
    /// Returns [`ExpressionError`] on a placeholder cycle or when nesting is
    /// deeper than [`MAX_EXPANSION_DEPTH`].
    pub fn resolve(&self, key: &str) -> Result<Option<Value>, ExpressionError> {
        let mut stack = vec![key.to_string()];
        match self.entries.get(key) {
            None => Ok(None),
            Some(Value::String(text)) => Ok(Some(Value::String(self.expand_in(text, &mut stack)?))),
            Some(other) => Ok(Some(other.clone())),
        }
    }

    /// Expands placeholders in `text` against this mapping.
    ///
    /// # Errors
    ///
    /// Returns [`ExpressionError`] on a placeholder cycle or excessive nesting.
    pub fn expand(&self, text: &str) -> Result<String, ExpressionError> {
        self.expand_in(text, &mut Vec::new())
    }

    /// Expands `text` while `stack` holds the keys currently being expanded.
    fn expand_in(&self, text: &str, stack: &mut Vec<String>) -> Result<String, ExpressionError> {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find("${") {
            out.push_str(&rest[.. start]);
            let body_start = start + 2;
            let Some(body_len) = closing_brace(&rest[body_start ..]) else {
                out.push_str(&rest[start ..]);
                return Ok(out);
            };
            let body = &rest[body_start .. body_start + body_len];
            out.push_str(&self.expand_placeholder(body, stack)?);
            rest = &rest[body_start + body_len + 1 ..];
        }
        out.push_str(rest);
        Ok(out)
    }

    /// Expands one placeholder body (`key` or `key:default`).
    fn expand_placeholder(
        &self,
        body: &str,
        stack: &mut Vec<String>,
    ) -> Result<String, ExpressionError> {
        let (key, default) = match body.split_once(':') {
            Some((key, default)) => (key.trim(), Some(default)),
            None => (body.trim(), None),
        };
        if stack.iter().any(|active| active == key) {
            return Err(ExpressionError::Cycle {
                key: key.to_string(),
            });
        }
        if stack.len() >= MAX_EXPANSION_DEPTH {
            return Err(ExpressionError::TooDeep {
                key: key.to_string(),
                limit: MAX_EXPANSION_DEPTH,
            });
        }
        match (self.entries.get(key), default) {
            (Some(Value::String(text)), _) => {
                stack.push(key.to_string());
                let expanded = self.expand_in(text, stack);
                stack.pop();
                expanded
            }
            (Some(Value::Null), Some(default)) | (None, Some(default)) => {
                self.expand_in(default, stack)
            }
            (Some(Value::Null), None) | (None, None) => Ok(format!("${{{body}}}")),
            (Some(other), _) => Ok(other.to_string()),
        }
    }
}

impl From<Map<String, Value>> for ExpressionDict {
    fn from(entries: Map<String, Value>) -> Self {
        Self {
            entries,
        }
    }
}

impl<'a> IntoIterator for &'a ExpressionDict {
    type IntoIter = serde_json::map::Iter<'a>;
    type Item = (&'a String, &'a Value);

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Returns the offset of the `}` closing a placeholder body, honoring nested
/// `${...}` in defaults.
fn closing_brace(body: &str) -> Option<usize> {
    let bytes = body.as_bytes();
    let mut depth = 0_usize;
    let mut index = 0;
    while index < bytes.len() {
        match bytes[index] {
            b'$' if bytes.get(index + 1) == Some(&b'{') => {
                depth += 1;
                index += 1;
            }
            b'}' if depth == 0 => return Some(index),
            b'}' => depth -= 1,
            _ => {}
        }
        index += 1;
    }
    None
}

// ============================================================================
// SECTION: Tests
// ============================================================================
