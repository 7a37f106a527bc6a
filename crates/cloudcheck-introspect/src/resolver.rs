// crates/cloudcheck-introspect/src/resolver.rs
// ============================================================================
// Module: Precedence Resolver
// Description: Spring-style layering of configuration sources.
// Purpose: Reconstruct effective configuration as an auditable merge plan.
// Dependencies: serde_json, tracing
// ============================================================================

//! ## Overview
//! The resolver turns a [`RawConfigDocument`] into an ordered list of
//! [`MergeStep`]s and folds them left to right into a fresh
//! [`ExpressionDict`]. Precedence, lowest to highest:
//!
//! 1. `defaultProperties`
//! 2. `systemProperties`
//! 3. `systemEnvironment`
//! 4. for each location in `spring.config.location` (declared order), and
//!    for each name in `spring.config.name` when the location ends in `/`:
//!    the base file `file:{location}{name}.yml`, then one
//!    `file:{location}{name}-{profile}.yml` per profile in
//!    `spring.profiles.active` (declared order).
//!
//! The three directives are read from the mapping built by steps 1-3, with
//! placeholders expanded. Merging is a shallow override: a later source
//! replaces whole values at the keys it defines.
//!
//! # Invariants
//! - Resolution is a pure function of the raw document.
//! - Missing sources are recorded in the plan as skipped steps and never
//!   cause an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde_json::Map;
use serde_json::Value;
use tracing::debug;
use tracing::warn;

use crate::expression::ExpressionDict;
use crate::source::RawConfigDocument;
use crate::source::SourceTable;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Source holding compiled default properties.
pub const DEFAULT_PROPERTIES: &str = "defaultProperties";
/// Source holding JVM system properties.
pub const SYSTEM_PROPERTIES: &str = "systemProperties";
/// Source holding the process environment.
pub const SYSTEM_ENVIRONMENT: &str = "systemEnvironment";
/// Directive listing configuration file names.
pub const CONFIG_NAME_KEY: &str = "spring.config.name";
/// Directive listing active profiles.
pub const ACTIVE_PROFILES_KEY: &str = "spring.profiles.active";
/// Directive listing configuration file locations.
pub const CONFIG_LOCATION_KEY: &str = "spring.config.location";
/// Path separator marking a location as a directory.
pub const LOCATION_SEPARATOR: char = '/';
/// Extension of configuration file sources.
pub const FILE_EXTENSION: &str = ".yml";

// ============================================================================
// SECTION: Merge Plan
// ============================================================================

/// Origin of one merge step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeSource {
    /// `defaultProperties`.
    Defaults,
    /// `systemProperties`.
    SystemProperties,
    /// `systemEnvironment`.
    SystemEnvironment,
    /// Profile-less configuration file.
    LocationFile {
        /// Lookup key, e.g. `file:/opt/config/clouddriver.yml`.
        key: String,
    },
    /// Profile-specific configuration file.
    ProfileFile {
        /// Lookup key, e.g. `file:/opt/config/clouddriver-local.yml`.
        key: String,
        /// Profile name.
        profile: String,
    },
}

impl fmt::Display for MergeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Defaults => f.write_str(DEFAULT_PROPERTIES),
            Self::SystemProperties => f.write_str(SYSTEM_PROPERTIES),
            Self::SystemEnvironment => f.write_str(SYSTEM_ENVIRONMENT),
            Self::LocationFile {
                key,
            } => f.write_str(key),
            Self::ProfileFile {
                key,
                profile,
            } => write!(f, "{key} (profile {profile})"),
        }
    }
}

/// One override-merge in precedence order.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeStep {
    /// Where the document comes from.
    pub source: MergeSource,
    /// Document to merge; `None` when the source is absent.
    pub document: Option<Map<String, Value>>,
}

impl MergeStep {
    /// Returns true when the source was absent and the step is a no-op.
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        self.document.is_none()
    }
}

/// Comma-separated directives that drive file lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directives {
    /// Configuration file names.
    pub names: Vec<String>,
    /// Active profiles, lowest precedence first.
    pub profiles: Vec<String>,
    /// Candidate locations, lowest precedence first.
    pub locations: Vec<String>,
}

impl Directives {
    /// Reads the directives from `dict`; a missing directive is an empty list.
    #[must_use]
    pub fn read(dict: &ExpressionDict) -> Self {
        Self {
            names: directive_list(dict, CONFIG_NAME_KEY),
            profiles: directive_list(dict, ACTIVE_PROFILES_KEY),
            locations: directive_list(dict, CONFIG_LOCATION_KEY),
        }
    }

    /// Returns the root keys (`file:{location}{name}`) in precedence order.
    #[must_use]
    pub fn roots(&self) -> Vec<String> {
        let unnamed = [String::new()];
        let mut roots = Vec::new();
        for location in &self.locations {
            let names: &[String] =
                if location.ends_with(LOCATION_SEPARATOR) { &self.names } else { &unnamed };
            for name in names {
                roots.push(format!("file:{location}{name}"));
            }
        }
        roots
    }
}

// ============================================================================
// SECTION: Resolver
// ============================================================================

/// Reconstructs effective configuration from an introspection document.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrecedenceResolver;

impl PrecedenceResolver {
    /// Creates a resolver.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Returns every merge step in precedence order, including skipped ones.
    #[must_use]
    pub fn plan(&self, raw: &RawConfigDocument) -> Vec<MergeStep> {
        let mut steps = vec![
            global_step(raw, MergeSource::Defaults, DEFAULT_PROPERTIES),
            global_step(raw, MergeSource::SystemProperties, SYSTEM_PROPERTIES),
            global_step(raw, MergeSource::SystemEnvironment, SYSTEM_ENVIRONMENT),
        ];
        let seed = fold(&steps);
        let directives = Directives::read(&seed);
        debug!(
            names = %directives.names.join(","),
            profiles = %directives.profiles.join(","),
            locations = %directives.locations.join(","),
            "configuration directives"
        );

        let table = SourceTable::parse(raw);
        for root in directives.roots() {
            let key = format!("{root}{FILE_EXTENSION}");
            let document = file_document(&table, &key);
            steps.push(MergeStep {
                source: MergeSource::LocationFile {
                    key,
                },
                document,
            });
            for profile in &directives.profiles {
                let key = format!("{root}-{profile}{FILE_EXTENSION}");
                let document = file_document(&table, &key);
                steps.push(MergeStep {
                    source: MergeSource::ProfileFile {
                        key,
                        profile: profile.clone(),
                    },
                    document,
                });
            }
        }
        steps
    }

    /// Folds the merge plan into the effective configuration.
    #[must_use]
    pub fn infer(&self, raw: &RawConfigDocument) -> ExpressionDict {
        let steps = self.plan(raw);
        for step in &steps {
            if step.is_skipped() {
                debug!(source = %step.source, "configuration source absent");
            } else {
                debug!(source = %step.source, "merging configuration source");
            }
        }
        fold(&steps)
    }
}

/// Resolves `raw` with the default resolver.
#[must_use]
pub fn infer(raw: &RawConfigDocument) -> ExpressionDict {
    PrecedenceResolver::new().infer(raw)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds the step for a top-level source.
fn global_step(raw: &RawConfigDocument, source: MergeSource, name: &str) -> MergeStep {
    MergeStep {
        source,
        document: raw.source(name).and_then(as_document),
    }
}

/// Looks up a configuration file sub-document.
fn file_document(table: &SourceTable, key: &str) -> Option<Map<String, Value>> {
    table.get(key).and_then(as_document)
}

/// Treats non-object sources as empty.
fn as_document(value: &Value) -> Option<Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map.clone()),
        Value::Null => None,
        _ => Some(Map::new()),
    }
}

/// Applies `steps` left to right into a fresh mapping.
fn fold(steps: &[MergeStep]) -> ExpressionDict {
    let mut dict = ExpressionDict::new();
    for document in steps.iter().filter_map(|step| step.document.as_ref()) {
        dict.update(document);
    }
    dict
}

/// Reads a comma-separated directive, dropping blank entries.
fn directive_list(dict: &ExpressionDict, key: &str) -> Vec<String> {
    let text = match dict.resolve(key) {
        Ok(Some(Value::String(text))) => text,
        Ok(Some(Value::Null) | None) => return Vec::new(),
        Ok(Some(other)) => other.to_string(),
        Err(err) => {
            warn!(key, error = %err, "directive expansion failed, using raw value");
            match dict.get(key) {
                Some(Value::String(text)) => text.clone(),
                _ => return Vec::new(),
            }
        }
    };
    text.split(',').map(str::trim).filter(|entry| !entry.is_empty()).map(String::from).collect()
}
