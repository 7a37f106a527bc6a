// crates/cloudcheck-contract/tests/scenario.rs
// ============================================================================
// Module: Operation Scenario Tests
// Description: End-to-end operation contracts against an in-memory cloud.
// ============================================================================
//! ## Overview
//! A fake cloud applies each operation's effect after a delay, the way a real
//! provider converges eventually. Contracts mirror deployment scenarios:
//! instances created and running, target pool registration and
//! deregistration, and instance termination.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use cloudcheck_contract::ClauseState;
use cloudcheck_contract::ContractBuilder;
use cloudcheck_contract::FnQuery;
use cloudcheck_contract::Operation;
use cloudcheck_contract::OperationContract;
use cloudcheck_contract::OperationError;
use cloudcheck_contract::OperationReceipt;
use cloudcheck_contract::OperationRunner;
use cloudcheck_contract::ResourceQuery;
use cloudcheck_contract::RunError;
use cloudcheck_contract::RunOptions;
use cloudcheck_contract::convenience::if_then;
use cloudcheck_contract::convenience::path_contains;
use cloudcheck_contract::convenience::path_elements_contain;
use cloudcheck_contract::convenience::path_eq;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Fake Cloud
// ============================================================================

type Effect = Arc<dyn Fn(&mut Map<String, Value>) + Send + Sync>;

/// Shared cloud state keyed by resource collection.
#[derive(Clone)]
struct FakeCloud {
    state: Arc<Mutex<Map<String, Value>>>,
}

impl FakeCloud {
    fn new(state: Value) -> Self {
        let Value::Object(map) = state else {
            panic!("cloud state must be an object");
        };
        Self {
            state: Arc::new(Mutex::new(map)),
        }
    }

    /// Lists every resource in `collection`.
    fn list(&self, collection: &'static str) -> Arc<dyn ResourceQuery> {
        let state = Arc::clone(&self.state);
        Arc::new(FnQuery::new(format!("list {collection}"), move || {
            Ok(state.lock().unwrap().get(collection).cloned().unwrap_or_else(|| json!([])))
        }))
    }

    /// Inspects the instance called `name`; `null` when it does not exist.
    fn instance(&self, name: &'static str) -> Arc<dyn ResourceQuery> {
        let state = Arc::clone(&self.state);
        Arc::new(FnQuery::new(format!("get instance {name}"), move || {
            let state = state.lock().unwrap();
            let found = state
                .get("instances")
                .and_then(Value::as_array)
                .and_then(|items| items.iter().find(|item| item["name"] == name))
                .cloned();
            Ok(found.unwrap_or(Value::Null))
        }))
    }

    /// Operation whose effect lands `delay` after it is accepted.
    fn operation(&self, title: &str, delay: Duration, effect: Effect) -> Arc<dyn Operation> {
        Arc::new(DelayedOperation {
            title: title.to_string(),
            delay,
            effect,
            state: Arc::clone(&self.state),
        })
    }
}

/// Operation that is accepted immediately and converges later.
struct DelayedOperation {
    title: String,
    delay: Duration,
    effect: Effect,
    state: Arc<Mutex<Map<String, Value>>>,
}

#[async_trait]
impl Operation for DelayedOperation {
    fn title(&self) -> &str {
        &self.title
    }

    async fn invoke(&self) -> Result<OperationReceipt, OperationError> {
        let state = Arc::clone(&self.state);
        let effect = Arc::clone(&self.effect);
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            effect(&mut state.lock().unwrap());
        });
        Ok(OperationReceipt {
            id: format!("task-{}", self.title),
            title: self.title.clone(),
        })
    }
}

fn instance(name: &str, status: &str) -> Value {
    json!({"name": name, "status": status, "machineType": "f1-micro"})
}

/// Sets the status of every named instance.
fn set_status(state: &mut Map<String, Value>, names: &[&str], status: &str) {
    if let Some(Value::Array(items)) = state.get_mut("instances") {
        for item in items.iter_mut() {
            if names.iter().any(|name| item["name"] == *name) {
                item["status"] = json!(status);
            }
        }
    }
}

// ============================================================================
// SECTION: Scenarios
// ============================================================================

#[tokio::test(start_paused = true)]
async fn created_instances_eventually_run() {
    let cloud = FakeCloud::new(json!({"instances": [instance("unrelated", "RUNNING")]}));
    let effect: Effect = Arc::new(|state: &mut Map<String, Value>| {
        if let Some(Value::Array(items)) = state.get_mut("instances") {
            items.push(instance("katotest-a", "RUNNING"));
            items.push(instance("katotest-b", "RUNNING"));
        }
    });

    let mut builder = ContractBuilder::new();
    for name in ["katotest-a", "katotest-b"] {
        builder
            .new_clause_builder(format!("Instance {name} Created"))
            .retryable_for_secs(90)
            .list_resources(cloud.list("instances"))
            .contains("name", name);
        builder
            .new_clause_builder(format!("Instance {name} Is Running"))
            .retryable_for_secs(90)
            .inspect_resource(cloud.instance(name))
            .contains_eq("status", "RUNNING")
            .contains("machineType", "f1-micro");
    }
    let contract = OperationContract::new(
        cloud.operation("deploy instances", Duration::from_millis(6_500), effect),
        builder.build().unwrap(),
    );

    let outcome = OperationRunner::default().run(&contract, RunOptions::default()).await.unwrap();
    assert!(outcome.report.satisfied);
    assert_eq!(outcome.report.clauses.len(), 4);
    for clause in &outcome.report.clauses {
        assert_eq!(clause.state, ClauseState::Satisfied);
        assert_eq!(clause.attempts, 8);
    }
}

#[tokio::test(start_paused = true)]
async fn register_and_deregister_target_pool_instances() {
    let cloud = FakeCloud::new(json!({
        "target-pools": [
            {"name": "katotest-pool", "region": "us-central1"},
            {"name": "other-pool", "region": "us-central1", "instances": ["katotest-c"]}
        ]
    }));

    let register: Effect = Arc::new(|state: &mut Map<String, Value>| {
        state["target-pools"][0]["instances"] = json!(["zones/a/katotest-a", "zones/a/katotest-b"]);
    });
    let mut builder = ContractBuilder::new();
    builder
        .new_clause_builder("Instances in Target Pool")
        .retryable_for_secs(15)
        .list_resources(cloud.list("target-pools"))
        .contains_group(vec![
            path_contains("name", "katotest-pool"),
            path_eq("region", "us-central1"),
            path_elements_contain("instances", "zones/a/katotest-a"),
            path_elements_contain("instances", "zones/a/katotest-b"),
        ])
        .excludes_group(vec![
            path_contains("name", "katotest-pool"),
            path_elements_contain("instances", "katotest-c"),
        ]);
    let contract = OperationContract::new(
        cloud.operation("register instances", Duration::from_millis(3_500), register),
        builder.build().unwrap(),
    );
    let outcome = OperationRunner::default().run(&contract, RunOptions::default()).await.unwrap();
    let clause = &outcome.report.clauses[0];
    assert_eq!(clause.state, ClauseState::Satisfied);
    assert_eq!(clause.attempts, 5);

    // Deregistering every instance drops the `instances` field entirely.
    let deregister: Effect = Arc::new(|state: &mut Map<String, Value>| {
        if let Some(pool) = state["target-pools"][0].as_object_mut() {
            pool.remove("instances");
        }
    });
    let mut builder = ContractBuilder::new();
    builder
        .new_clause_builder("Instances not in Target Pool")
        .retryable_for_secs(15)
        .list_resources(cloud.list("target-pools"))
        .excludes_group(vec![
            path_contains("name", "katotest-pool"),
            path_elements_contain("instances", "zones/a/katotest-a"),
            path_elements_contain("instances", "zones/a/katotest-b"),
        ]);
    let contract = OperationContract::new(
        cloud.operation("deregister instances", Duration::from_millis(1_500), deregister),
        builder.build().unwrap(),
    );
    let outcome = OperationRunner::default().run(&contract, RunOptions::default()).await.unwrap();
    let clause = &outcome.report.clauses[0];
    assert_eq!(clause.state, ClauseState::Satisfied);
    assert_eq!(clause.attempts, 3);
}

#[tokio::test(start_paused = true)]
async fn terminated_instances_must_all_be_stopping() {
    let cloud = FakeCloud::new(json!({
        "instances": [
            instance("katotest-a", "RUNNING"),
            instance("katotest-b", "RUNNING"),
            instance("unrelated", "RUNNING")
        ]
    }));
    // Only one of the two instances ever starts stopping.
    let partial: Effect = Arc::new(|state: &mut Map<String, Value>| set_status(state, &["katotest-a"], "STOPPING"));

    let mut builder = ContractBuilder::new();
    let clause = builder
        .new_clause_builder("Instances Deleted")
        .strict(true)
        .retryable_for_secs(10)
        .list_resources(cloud.list("instances"));
    for name in ["katotest-a", "katotest-b"] {
        clause.add_mapped_constraint(if_then(
            path_contains("name", name),
            path_eq("status", "STOPPING"),
        ));
    }
    let contract = OperationContract::new(
        cloud.operation("terminate instances", Duration::from_millis(500), partial),
        builder.build().unwrap(),
    );

    let error = OperationRunner::default().run(&contract, RunOptions::default()).await.unwrap_err();
    let RunError::ContractFailed {
        report, ..
    } = error
    else {
        panic!("expected contract failure");
    };
    let clause = &report.clauses[0];
    assert_eq!(clause.state, ClauseState::TimedOut);
    assert!(clause.outcomes[0].satisfied);
    assert!(!clause.outcomes[1].satisfied);
    assert_eq!(
        clause.outcomes[1].description,
        "every document: if name contains \"katotest-b\" then status == \"STOPPING\""
    );

    // The same conditional read existentially is satisfied by the unrelated
    // instance alone, which is why termination maps it over the listing.
    let mut builder = ContractBuilder::new();
    builder
        .new_clause_builder("Some Document Passes")
        .list_resources(cloud.list("instances"))
        .contains_match(if_then(path_contains("name", "katotest-b"), path_eq("status", "STOPPING")));
    let contract = builder.build().unwrap();
    let report = cloudcheck_contract::ContractVerifier::default().verify(&contract).await;
    assert!(report.satisfied);
}

#[tokio::test(start_paused = true)]
async fn deleted_resources_disappear_from_listing() {
    let cloud = FakeCloud::new(json!({
        "health-checks": [{"name": "katotest-hc"}, {"name": "keep-hc"}]
    }));
    let delete: Effect = Arc::new(|state: &mut Map<String, Value>| {
        state["health-checks"] = json!([{"name": "keep-hc"}]);
    });
    let mut builder = ContractBuilder::new();
    builder
        .new_clause_builder("Health Check Removed")
        .retryable_for_secs(30)
        .list_resources(cloud.list("health-checks"))
        .excludes("name", "katotest-hc")
        .contains("name", "keep-hc");
    let contract = OperationContract::new(
        cloud.operation("delete health check", Duration::from_millis(11_500), delete),
        builder.build().unwrap(),
    );

    let outcome = OperationRunner::default().run(&contract, RunOptions::default()).await.unwrap();
    assert_eq!(outcome.receipt.id, "task-delete health check");
    assert_eq!(outcome.report.clauses[0].elapsed_ms, 12_000);
}
