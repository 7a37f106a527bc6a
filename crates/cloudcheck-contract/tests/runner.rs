// crates/cloudcheck-contract/tests/runner.rs
// ============================================================================
// Module: Operation Runner Tests
// Description: Operation invocation followed by contract verification.
// ============================================================================
//! ## Overview
//! Checks that verification starts only after the operation returns, that
//! operation errors skip verification, and how `timeout_ok` treats timed-out
//! and failed clauses.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use cloudcheck_contract::ClauseState;
use cloudcheck_contract::Contract;
use cloudcheck_contract::ContractBuilder;
use cloudcheck_contract::ContractVerifier;
use cloudcheck_contract::FnQuery;
use cloudcheck_contract::Operation;
use cloudcheck_contract::OperationContract;
use cloudcheck_contract::OperationError;
use cloudcheck_contract::OperationReceipt;
use cloudcheck_contract::OperationRunner;
use cloudcheck_contract::QueryError;
use cloudcheck_contract::RunError;
use cloudcheck_contract::RunOptions;
use cloudcheck_contract::StaticQuery;
use serde_json::json;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Operation that flips a flag when invoked, or fails.
struct FlagOperation {
    invoked: Arc<AtomicBool>,
    fail: bool,
}

#[async_trait]
impl Operation for FlagOperation {
    fn title(&self) -> &str {
        "deploy katotest"
    }

    async fn invoke(&self) -> Result<OperationReceipt, OperationError> {
        if self.fail {
            return Err(OperationError::Failed {
                title: self.title().to_string(),
                message: "quota exceeded".to_string(),
            });
        }
        self.invoked.store(true, Ordering::SeqCst);
        Ok(OperationReceipt {
            id: "task-17".to_string(),
            title: self.title().to_string(),
        })
    }
}

/// Contract whose only clause holds once the operation has run.
fn deployed_contract(invoked: &Arc<AtomicBool>, polls: &Arc<AtomicU32>) -> Contract {
    let invoked = Arc::clone(invoked);
    let polls = Arc::clone(polls);
    let query = FnQuery::new("list instances", move || {
        polls.fetch_add(1, Ordering::SeqCst);
        if invoked.load(Ordering::SeqCst) {
            Ok(json!([{"name": "katotest-a"}]))
        } else {
            Ok(json!([]))
        }
    });
    let mut builder = ContractBuilder::new();
    builder
        .new_clause_builder("Instance Created")
        .list_resources(Arc::new(query))
        .contains("name", "katotest-a");
    builder.build().unwrap()
}

fn slow_contract(error: bool) -> Contract {
    let mut builder = ContractBuilder::new();
    let clause = builder.new_clause_builder("Instance Deleted").retryable_for_secs(5);
    if error {
        clause.list_resources(Arc::new(FnQuery::new("list instances", || {
            Err(QueryError::Failed("permission denied".to_string()))
        })));
    } else {
        clause.list_resources(Arc::new(StaticQuery::new(
            "list instances",
            json!([{"name": "katotest-a", "status": "STOPPING"}]),
        )));
    }
    clause.excludes("name", "katotest-a");
    builder.build().unwrap()
}

fn noop_operation() -> Arc<FlagOperation> {
    Arc::new(FlagOperation {
        invoked: Arc::new(AtomicBool::new(false)),
        fail: false,
    })
}

// ============================================================================
// SECTION: Runs
// ============================================================================

#[tokio::test(start_paused = true)]
async fn verification_follows_operation() {
    let invoked = Arc::new(AtomicBool::new(false));
    let polls = Arc::new(AtomicU32::new(0));
    let operation = Arc::new(FlagOperation {
        invoked: Arc::clone(&invoked),
        fail: false,
    });
    let contract = OperationContract::new(operation, deployed_contract(&invoked, &polls));

    let outcome = OperationRunner::default().run(&contract, RunOptions::default()).await.unwrap();
    assert_eq!(outcome.receipt.id, "task-17");
    assert!(outcome.report.satisfied);
    assert_eq!(polls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn operation_error_skips_verification() {
    let invoked = Arc::new(AtomicBool::new(false));
    let polls = Arc::new(AtomicU32::new(0));
    let operation = Arc::new(FlagOperation {
        invoked: Arc::clone(&invoked),
        fail: true,
    });
    let contract = OperationContract::new(operation, deployed_contract(&invoked, &polls));

    let error = OperationRunner::default().run(&contract, RunOptions::default()).await.unwrap_err();
    assert!(matches!(error, RunError::Operation(OperationError::Failed { .. })));
    assert_eq!(error.to_string(), "operation `deploy katotest` failed: quota exceeded");
    assert_eq!(polls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn timed_out_clause_fails_without_timeout_ok() {
    let contract = OperationContract::new(noop_operation(), slow_contract(false));
    let runner = OperationRunner::new(ContractVerifier::default());

    let error = runner.run(&contract, RunOptions::default()).await.unwrap_err();
    let RunError::ContractFailed {
        title,
        report,
    } = error
    else {
        panic!("expected contract failure");
    };
    assert_eq!(title, "deploy katotest");
    assert_eq!(report.clauses[0].state, ClauseState::TimedOut);
    assert_eq!(report.clauses[0].attempts, 5);
}

#[tokio::test(start_paused = true)]
async fn timeout_ok_accepts_slow_convergence() {
    let contract = OperationContract::new(noop_operation(), slow_contract(false));
    let outcome = OperationRunner::default()
        .run(
            &contract,
            RunOptions {
                timeout_ok: true,
            },
        )
        .await
        .unwrap();
    assert!(!outcome.report.satisfied);
    assert_eq!(outcome.report.clauses[0].state, ClauseState::TimedOut);
    assert_eq!(outcome.report.clauses[0].elapsed_ms, 5_000);
}

#[tokio::test(start_paused = true)]
async fn timeout_ok_does_not_excuse_failures() {
    let contract = OperationContract::new(noop_operation(), slow_contract(true));
    let error = OperationRunner::default()
        .run(
            &contract,
            RunOptions {
                timeout_ok: true,
            },
        )
        .await
        .unwrap_err();
    let message = error.to_string();
    assert!(message.starts_with("contract for `deploy katotest` failed:"));
    assert!(message.contains("[FAILED] Instance Deleted"));
    assert!(message.contains("last error: resource query failed: permission denied"));
}
