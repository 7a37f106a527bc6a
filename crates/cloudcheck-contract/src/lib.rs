// crates/cloudcheck-contract/src/lib.rs
// ============================================================================
// Module: Cloudcheck Contract Library
// Description: Public API surface for contract verification.
// Purpose: Expose clause/contract builders, the verifier, and operation runs.
// Dependencies: crate::{clause, contract, operation, query, report, verifier}
// ============================================================================

//! ## Overview
//! A contract is an ordered conjunction of clauses. Each clause names a
//! resource query and the constraints its observation must meet, plus a retry
//! budget for eventually-consistent state. The [`ContractVerifier`] polls each
//! clause independently until it is satisfied or its budget runs out and
//! returns an itemized [`ContractReport`]. An [`OperationContract`] pairs a
//! triggering operation with the contract that must hold after it.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod clause;
pub mod contract;
pub mod operation;
pub mod query;
pub mod report;
pub mod verifier;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use clause::Clause;
pub use clause::ClauseBuilder;
pub use clause::ObservationKind;
pub use cloudcheck_logic::Constraint;
pub use cloudcheck_logic::Predicate;
pub use cloudcheck_logic::convenience;
pub use contract::Contract;
pub use contract::ContractBuilder;
pub use contract::ContractError;
pub use operation::Operation;
pub use operation::OperationContract;
pub use operation::OperationError;
pub use operation::OperationReceipt;
pub use operation::OperationRunner;
pub use operation::RunError;
pub use operation::RunOptions;
pub use operation::RunOutcome;
pub use query::FnQuery;
pub use query::QueryError;
pub use query::ResourceQuery;
pub use query::StaticQuery;
pub use report::ClauseReport;
pub use report::ClauseState;
pub use report::ConstraintOutcome;
pub use report::ContractReport;
pub use verifier::ContractVerifier;
pub use verifier::QueryErrorPolicy;
pub use verifier::VerifierConfig;
