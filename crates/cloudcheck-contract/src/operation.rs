// crates/cloudcheck-contract/src/operation.rs
// ============================================================================
// Module: Operation Contracts
// Description: Pairs a mutating operation with the contract it must satisfy.
// Purpose: Invoke an operation, then verify its eventual effects.
// Dependencies: async-trait, thiserror, tracing
// ============================================================================

//! ## Overview
//! An [`OperationContract`] couples a platform operation (deploy, resize,
//! terminate, ...) with the contract describing the cloud state that must
//! eventually follow. [`OperationRunner::run`] invokes the operation and
//! verifies the contract only after the invocation returns. Callers that
//! expect slow convergence can accept timed-out clauses through
//! [`RunOptions::timeout_ok`]; failed clauses never pass.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;
use tracing::warn;

use crate::contract::Contract;
use crate::report::ContractReport;
use crate::verifier::ContractVerifier;

// ============================================================================
// SECTION: Operation Interface
// ============================================================================

/// Acknowledgement returned by a triggering operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationReceipt {
    /// Platform-assigned identifier (task id, request id, ...).
    pub id: String,
    /// Operation title.
    pub title: String,
}

/// Triggering operation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    /// The platform rejected or failed the operation.
    #[error("operation `{title}` failed: {message}")]
    Failed {
        /// Operation title.
        title: String,
        /// Failure detail.
        message: String,
    },
}

/// Mutating action against the platform under test.
#[async_trait]
pub trait Operation: Send + Sync {
    /// Returns the operation title used in logs and errors.
    fn title(&self) -> &str;

    /// Invokes the operation.
    ///
    /// # Errors
    ///
    /// Returns [`OperationError`] when the platform does not accept it.
    async fn invoke(&self) -> Result<OperationReceipt, OperationError>;
}

/// Operation paired with the contract its effects must satisfy.
pub struct OperationContract {
    /// Triggering operation.
    operation: Arc<dyn Operation>,
    /// Expected post-state.
    contract: Contract,
}

impl OperationContract {
    /// Pairs `operation` with `contract`.
    #[must_use]
    pub fn new(operation: Arc<dyn Operation>, contract: Contract) -> Self {
        Self {
            operation,
            contract,
        }
    }

    /// Returns the operation title.
    #[must_use]
    pub fn title(&self) -> &str {
        self.operation.title()
    }

    /// Returns the contract.
    #[must_use]
    pub const fn contract(&self) -> &Contract {
        &self.contract
    }
}

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Per-run options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Accept timed-out clauses as passing.
    pub timeout_ok: bool,
}

/// Successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    /// Receipt from the operation.
    pub receipt: OperationReceipt,
    /// Verification report; may contain tolerated timeouts.
    pub report: ContractReport,
}

/// Operation run errors.
#[derive(Debug, Error)]
pub enum RunError {
    /// The operation itself failed; the contract was not verified.
    #[error(transparent)]
    Operation(#[from] OperationError),
    /// The contract did not hold after the operation.
    #[error("contract for `{title}` failed:\n{report}")]
    ContractFailed {
        /// Operation title.
        title: String,
        /// Itemized verification report.
        report: Box<ContractReport>,
    },
}

/// Runs operation contracts with a shared verifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct OperationRunner {
    /// Verifier used after each invocation.
    verifier: ContractVerifier,
}

impl OperationRunner {
    /// Creates a runner around `verifier`.
    #[must_use]
    pub const fn new(verifier: ContractVerifier) -> Self {
        Self {
            verifier,
        }
    }

    /// Invokes the operation, then verifies its contract.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Operation`] when the invocation fails and
    /// [`RunError::ContractFailed`] when a clause does not pass under
    /// `options`.
    pub async fn run(
        &self,
        operation: &OperationContract,
        options: RunOptions,
    ) -> Result<RunOutcome, RunError> {
        let title = operation.title().to_string();
        info!(operation = %title, "invoking operation");
        let receipt = operation.operation.invoke().await?;
        info!(operation = %title, id = %receipt.id, "operation accepted, verifying contract");

        let report = self.verifier.verify(&operation.contract).await;
        if report.passed(options.timeout_ok) {
            Ok(RunOutcome {
                receipt,
                report,
            })
        } else {
            warn!(operation = %title, "operation contract failed");
            Err(RunError::ContractFailed {
                title,
                report: Box::new(report),
            })
        }
    }
}
