// crates/cloudcheck-config/src/lib.rs
// ============================================================================
// Module: Cloudcheck Config Library
// Description: Public API surface for harness configuration.
// Purpose: Load `cloudcheck.toml` and turn it into runtime policies.
// Dependencies: crate::{config, logging}
// ============================================================================

//! ## Overview
//! [`HarnessConfig`] describes how the harness fetches introspection
//! documents, how it polls contracts, and how it logs. It converts into the
//! [`cloudcheck_introspect::FetchPolicy`] and
//! [`cloudcheck_contract::VerifierConfig`] the runtime consumes.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod logging;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::CONFIG_ENV_VAR;
pub use config::ConfigError;
pub use config::HarnessConfig;
pub use config::IntrospectionConfig;
pub use config::LoggingConfig;
pub use config::VerificationConfig;
pub use logging::install_tracing;
