// crates/cloudcheck-introspect/src/source.rs
// ============================================================================
// Module: Introspection Sources
// Description: Raw introspection document and its named source table.
// Purpose: Parse `applicationConfig: [name]decorator` keys once.
// Dependencies: regex, serde, serde_json
// ============================================================================

//! ## Overview
//! An introspection endpoint returns one JSON object whose top-level keys name
//! property sources. Keys of the form `applicationConfig: [name]decorator` are
//! configuration files; [`SourceTable`] indexes their sub-documents under
//! `name + decorator`. Other keys (`systemProperties`, `systemEnvironment`,
//! ...) are read directly from the [`RawConfigDocument`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

// ============================================================================
// SECTION: Raw Document
// ============================================================================

/// Untyped document returned by an introspection endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawConfigDocument {
    /// Top-level property sources.
    sources: Map<String, Value>,
}

impl RawConfigDocument {
    /// Returns the empty document, meaning "introspection unsupported".
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns true when the document has no sources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Returns the top-level source named `name`.
    #[must_use]
    pub fn source(&self, name: &str) -> Option<&Value> {
        self.sources.get(name)
    }

    /// Returns the underlying map.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.sources
    }
}

impl From<Map<String, Value>> for RawConfigDocument {
    fn from(sources: Map<String, Value>) -> Self {
        Self {
            sources,
        }
    }
}

// ============================================================================
// SECTION: Source Table
// ============================================================================

/// Prefix marking a configuration-file source.
pub const APPLICATION_CONFIG_MARKER: &str = "applicationConfig";

/// Matches `applicationConfig: [name]decorator`.
fn application_config_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        let marker = regex::escape(APPLICATION_CONFIG_MARKER);
        Regex::new(&format!(r"^{marker}: \[(.+)\](.*)$")).ok()
    })
    .as_ref()
}

/// Configuration-file sources keyed by `name + decorator`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceTable {
    /// Sub-documents by lookup key.
    entries: BTreeMap<String, Value>,
}

impl SourceTable {
    /// Indexes every configuration-file source in `raw`.
    #[must_use]
    pub fn parse(raw: &RawConfigDocument) -> Self {
        let mut entries = BTreeMap::new();
        let Some(pattern) = application_config_re() else {
            return Self {
                entries,
            };
        };
        for (key, value) in raw.as_map() {
            if let Some(captures) = pattern.captures(key) {
                let name = captures.get(1).map_or("", |m| m.as_str());
                let decorator = captures.get(2).map_or("", |m| m.as_str());
                entries.insert(format!("{name}{decorator}"), value.clone());
            }
        }
        Self {
            entries,
        }
    }

    /// Returns the sub-document stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Returns the number of indexed sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no configuration-file source was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates lookup keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
