// crates/cloudcheck-core/src/path.rs
// ============================================================================
// Module: Field Paths
// Description: Nested field addressing for JSON documents.
// Purpose: Resolve slash- or dot-separated paths to zero or more values.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`FieldPath`] is written `a/b/c`, or `a.b.c` when it contains no slash.
//! The empty path addresses the whole document. Numeric segments index arrays;
//! any other segment applied to an array fans out over its elements, so
//! `tags/items` and `disks/deviceName` both reach into collections. Resolution
//! yields every value reached; an empty result means the field is absent.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Field Path
// ============================================================================

/// Parsed path into a JSON document.
///
/// # Invariants
/// - Segments are non-empty.
/// - An empty segment list addresses the whole document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct FieldPath {
    /// Path segments in traversal order.
    segments: Vec<String>,
}

impl FieldPath {
    /// Returns the path addressing the whole document.
    #[must_use]
    pub const fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Parses a path, splitting on `/` when present and on `.` otherwise.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        let separator = if trimmed.contains('/') { '/' } else { '.' };
        let segments = trimmed
            .split(separator)
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(ToString::to_string)
            .collect();
        Self {
            segments,
        }
    }

    /// Returns true when the path addresses the whole document.
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the parsed segments.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Resolves the path against `document`.
    #[must_use]
    pub fn resolve<'a>(&self, document: &'a Value) -> Vec<&'a Value> {
        let mut current = vec![document];
        for segment in &self.segments {
            let mut next = Vec::new();
            for value in current {
                descend(value, segment, &mut next);
            }
            if next.is_empty() {
                return next;
            }
            current = next;
        }
        current
    }
}

/// Follows one segment from `value`, pushing every reached child into `out`.
fn descend<'a>(value: &'a Value, segment: &str, out: &mut Vec<&'a Value>) {
    match value {
        Value::Object(map) => {
            if let Some(child) = map.get(segment) {
                out.push(child);
            }
        }
        Value::Array(items) => {
            if let Ok(index) = segment.parse::<usize>() {
                if let Some(child) = items.get(index) {
                    out.push(child);
                }
            } else {
                for item in items {
                    descend(item, segment, out);
                }
            }
        }
        _ => {}
    }
}

// ============================================================================
// SECTION: Conversions
// ============================================================================

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str("<document>");
        }
        f.write_str(&self.segments.join("/"))
    }
}

impl From<&str> for FieldPath {
    fn from(text: &str) -> Self {
        Self::parse(text)
    }
}

impl From<String> for FieldPath {
    fn from(text: String) -> Self {
        Self::parse(&text)
    }
}

impl From<Option<&str>> for FieldPath {
    fn from(text: Option<&str>) -> Self {
        text.map_or_else(Self::root, Self::parse)
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.segments.join("/")
    }
}
