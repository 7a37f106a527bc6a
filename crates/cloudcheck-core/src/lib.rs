// crates/cloudcheck-core/src/lib.rs
// ============================================================================
// Module: Cloudcheck Core Library
// Description: Public API surface for shared harness primitives.
// Purpose: Expose the bounded retry primitive and field-path addressing.
// Dependencies: crate::{path, retry}
// ============================================================================

//! ## Overview
//! Cloudcheck core holds the pieces shared by the introspection fetcher and the
//! contract verifier: a single wall-clock bounded retry loop and the field-path
//! addressing used by predicates to reach into JSON documents.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod path;
pub mod retry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use path::FieldPath;
pub use retry::RetryOutcome;
pub use retry::RetryPolicy;
pub use retry::Step;
pub use retry::retry_until;
