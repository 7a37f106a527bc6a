// crates/cloudcheck-introspect/src/lib.rs
// ============================================================================
// Module: Cloudcheck Introspect Library
// Description: Public API surface for configuration introspection.
// Purpose: Fetch a service's raw environment and reconstruct its config.
// Dependencies: crate::{expression, fetch, resolver, source}
// ============================================================================

//! ## Overview
//! Services assemble configuration at runtime from layered sources. This crate
//! fetches the raw introspection document of a live service with
//! [`ExpressionFetcher`] and replays the layering with [`PrecedenceResolver`]
//! to produce the effective [`ExpressionDict`] the service observes.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod expression;
pub mod fetch;
pub mod resolver;
pub mod source;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use expression::ExpressionDict;
pub use expression::ExpressionError;
pub use fetch::ExpressionFetcher;
pub use fetch::FetchError;
pub use fetch::FetchPolicy;
pub use resolver::Directives;
pub use resolver::MergeSource;
pub use resolver::MergeStep;
pub use resolver::PrecedenceResolver;
pub use resolver::infer;
pub use source::RawConfigDocument;
pub use source::SourceTable;
