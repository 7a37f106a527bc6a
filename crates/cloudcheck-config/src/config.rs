// crates/cloudcheck-config/src/config.rs
// ============================================================================
// Module: Harness Configuration
// Description: Configuration loading and validation for the harness.
// Purpose: Provide strict, fail-closed TOML parsing with hard limits.
// Dependencies: cloudcheck-contract, cloudcheck-introspect, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with a size limit and validated
//! after parsing. Every section is optional; omitted fields take the runtime
//! defaults of the fetcher and verifier. Unknown fields are rejected.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use cloudcheck_contract::QueryErrorPolicy;
use cloudcheck_contract::VerifierConfig;
use cloudcheck_introspect::FetchPolicy;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "cloudcheck.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "CLOUDCHECK_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Upper bound for backoff and poll intervals in milliseconds.
pub const MAX_INTERVAL_MS: u64 = 60_000;
/// Upper bound for concurrently running resource queries.
pub const MAX_CONCURRENCY: usize = 64;
/// Upper bound for the introspection response size.
pub const MAX_RESPONSE_BYTES: usize = 64 * 1024 * 1024;

// ============================================================================
// SECTION: Configuration Model
// ============================================================================

/// Root harness configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Introspection fetch settings.
    pub introspection: IntrospectionConfig,
    /// Contract verification settings.
    pub verifier: VerificationConfig,
    /// Log output settings.
    pub logging: LoggingConfig,
}

/// `[introspection]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntrospectionConfig {
    /// Overall fetch deadline in seconds.
    pub timeout_secs: u64,
    /// Upper bound on a single attempt in seconds.
    pub attempt_timeout_cap_secs: u64,
    /// Sleep after a timed-out attempt in milliseconds.
    pub backoff_ms: u64,
    /// Treat 404 as an empty document.
    pub empty_if_404: bool,
    /// Largest accepted response body in bytes.
    pub max_response_bytes: usize,
}

impl Default for IntrospectionConfig {
    fn default() -> Self {
        let policy = FetchPolicy::default();
        Self {
            timeout_secs: 60,
            attempt_timeout_cap_secs: policy.attempt_timeout_cap.as_secs(),
            backoff_ms: u64::try_from(policy.backoff.as_millis()).unwrap_or(u64::MAX),
            empty_if_404: policy.empty_if_404,
            max_response_bytes: policy.max_response_bytes,
        }
    }
}

impl IntrospectionConfig {
    /// Validates the section.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "introspection.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.attempt_timeout_cap_secs == 0 {
            return Err(ConfigError::Invalid(
                "introspection.attempt_timeout_cap_secs must be greater than zero".to_string(),
            ));
        }
        validate_interval("introspection.backoff_ms", self.backoff_ms)?;
        if self.max_response_bytes == 0 || self.max_response_bytes > MAX_RESPONSE_BYTES {
            return Err(ConfigError::Invalid(format!(
                "introspection.max_response_bytes must be in [1 .. {MAX_RESPONSE_BYTES}]"
            )));
        }
        Ok(())
    }
}

/// `[verifier]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VerificationConfig {
    /// Sleep between polls in milliseconds.
    pub poll_interval_ms: u64,
    /// Maximum number of resource queries in flight at once.
    pub max_concurrency: usize,
    /// Query error handling.
    pub query_errors: QueryErrorPolicy,
    /// Optional bound on a whole verification in seconds.
    pub overall_timeout_secs: Option<u64>,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        let config = VerifierConfig::default();
        Self {
            poll_interval_ms: u64::try_from(config.poll_interval.as_millis()).unwrap_or(u64::MAX),
            max_concurrency: config.max_concurrency,
            query_errors: config.query_errors,
            overall_timeout_secs: None,
        }
    }
}

impl VerificationConfig {
    /// Validates the section.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_interval("verifier.poll_interval_ms", self.poll_interval_ms)?;
        if self.max_concurrency == 0 || self.max_concurrency > MAX_CONCURRENCY {
            return Err(ConfigError::Invalid(format!(
                "verifier.max_concurrency must be in [1 .. {MAX_CONCURRENCY}]"
            )));
        }
        if self.overall_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "verifier.overall_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    /// Emit ANSI colors.
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            ansi: false,
        }
    }
}

impl LoggingConfig {
    /// Validates the section.
    fn validate(&self) -> Result<(), ConfigError> {
        EnvFilter::try_new(&self.filter)
            .map(|_| ())
            .map_err(|err| ConfigError::Invalid(format!("logging.filter: {err}")))
    }
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl HarnessConfig {
    /// Loads configuration from disk using the default resolution rules:
    /// `path`, then `CLOUDCHECK_CONFIG`, then `cloudcheck.toml`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        let bytes = fs::read(&resolved)
            .map_err(|err| ConfigError::Io(format!("{}: {err}", resolved.display())))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::parse(content)
    }

    /// Parses and validates TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] when validation fails.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.introspection.validate()?;
        self.verifier.validate()?;
        self.logging.validate()
    }

    /// Returns the fetch policy described by `[introspection]`.
    #[must_use]
    pub const fn fetch_policy(&self) -> FetchPolicy {
        FetchPolicy {
            attempt_timeout_cap: Duration::from_secs(self.introspection.attempt_timeout_cap_secs),
            backoff: Duration::from_millis(self.introspection.backoff_ms),
            empty_if_404: self.introspection.empty_if_404,
            max_response_bytes: self.introspection.max_response_bytes,
        }
    }

    /// Returns the overall introspection deadline.
    #[must_use]
    pub const fn introspection_timeout(&self) -> Duration {
        Duration::from_secs(self.introspection.timeout_secs)
    }

    /// Returns the verifier tuning described by `[verifier]`.
    #[must_use]
    pub fn verifier_config(&self) -> VerifierConfig {
        VerifierConfig {
            poll_interval: Duration::from_millis(self.verifier.poll_interval_ms),
            max_concurrency: self.verifier.max_concurrency,
            query_errors: self.verifier.query_errors,
            overall_timeout: self.verifier.overall_timeout_secs.map(Duration::from_secs),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the caller or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Checks a millisecond interval against `[1 .. MAX_INTERVAL_MS]`.
fn validate_interval(field: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 || value > MAX_INTERVAL_MS {
        return Err(ConfigError::Invalid(format!("{field} must be in [1 .. {MAX_INTERVAL_MS}] ms")));
    }
    Ok(())
}
