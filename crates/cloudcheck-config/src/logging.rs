// crates/cloudcheck-config/src/logging.rs
// ============================================================================
// Module: Logging
// Description: Installs the process-wide tracing subscriber.
// Purpose: Route harness logs through a filtered fmt subscriber.
// Dependencies: tracing, tracing-subscriber
// ============================================================================

//! ## Overview
//! `RUST_LOG` wins over the configured filter. Installation is idempotent: a
//! second call, or a subscriber installed by the host, leaves the existing one
//! in place.

// ============================================================================
// SECTION: Imports
// ============================================================================

use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::ConfigError;
use crate::config::LoggingConfig;

// ============================================================================
// SECTION: Installation
// ============================================================================

/// Installs a fmt subscriber for `config`.
///
/// Returns `true` when this call installed the subscriber.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when the configured filter is malformed.
pub fn install_tracing(config: &LoggingConfig) -> Result<bool, ConfigError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.filter)
            .map_err(|err| ConfigError::Invalid(format!("logging.filter: {err}")))?,
    };
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.ansi)
        .try_init()
        .is_ok();
    if installed {
        debug!(filter = %config.filter, "tracing subscriber installed");
    }
    Ok(installed)
}
