// crates/cloudcheck-introspect/tests/expression.rs
// ============================================================================
// Module: Expression Dictionary Tests
// Description: Override-merge ordering and placeholder expansion.
// ============================================================================
//! ## Overview
//! Covers last-write-wins updates, key ordering, default lookups, and
//! `${key:default}` expansion including cycles and verbatim leftovers.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use cloudcheck_introspect::ExpressionDict;
use cloudcheck_introspect::ExpressionError;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

fn object(value: Value) -> Map<String, Value> {
    let Value::Object(map) = value else {
        panic!("expected object");
    };
    map
}

fn dict(value: Value) -> ExpressionDict {
    ExpressionDict::from(object(value))
}

// ============================================================================
// SECTION: Override Merge
// ============================================================================

#[test]
fn later_updates_win_and_keep_key_position() {
    let mut dict = ExpressionDict::new();
    dict.update(&object(json!({"a": "1", "b": "1"})));
    dict.update(&object(json!({"c": "2", "a": "2"})));

    assert_eq!(dict.get("a"), Some(&json!("2")));
    let keys: Vec<&str> = dict.iter().map(|(key, _)| key.as_str()).collect();
    assert_eq!(keys, vec!["a", "b", "c"]);
}

#[test]
fn nested_values_are_replaced_not_merged() {
    let mut dict = ExpressionDict::new();
    dict.update(&object(json!({"aws": {"enabled": true, "region": "us-east-1"}})));
    dict.update(&object(json!({"aws": {"enabled": false}})));
    assert_eq!(dict.get("aws"), Some(&json!({"enabled": false})));
}

#[test]
fn get_or_falls_back_to_default() {
    let dict = dict(json!({"present": "yes"}));
    let fallback = json!("fallback");
    assert_eq!(dict.get_or("present", &fallback), &json!("yes"));
    assert_eq!(dict.get_or("missing", &fallback), &json!("fallback"));
    assert_eq!(dict.get_str("present"), Some("yes"));
    assert!(!dict.contains_key("missing"));
}

// ============================================================================
// SECTION: Placeholder Expansion
// ============================================================================

#[test]
fn placeholders_expand_recursively() {
    let dict = dict(json!({
        "services.clouddriver.host": "localhost",
        "services.clouddriver.port": 7002,
        "services.clouddriver.baseUrl": "http://${services.clouddriver.host}:${services.clouddriver.port}",
        "alias": "${services.clouddriver.baseUrl}/health"
    }));
    assert_eq!(dict.resolve("alias").unwrap(), Some(json!("http://localhost:7002/health")));
    assert_eq!(
        dict.get("alias"),
        Some(&json!("${services.clouddriver.baseUrl}/health"))
    );
}

#[test]
fn defaults_apply_only_when_key_is_missing() {
    let dict = dict(json!({
        "present": "value",
        "a": "${present:unused}",
        "b": "${absent:fallback}",
        "c": "${absent:${present}}"
    }));
    assert_eq!(dict.resolve("a").unwrap(), Some(json!("value")));
    assert_eq!(dict.resolve("b").unwrap(), Some(json!("fallback")));
    assert_eq!(dict.resolve("c").unwrap(), Some(json!("value")));
}

#[test]
fn unresolvable_placeholders_stay_verbatim() {
    let dict = dict(json!({"a": "prefix-${nowhere}-suffix", "b": "open ${brace"}));
    assert_eq!(dict.resolve("a").unwrap(), Some(json!("prefix-${nowhere}-suffix")));
    assert_eq!(dict.resolve("b").unwrap(), Some(json!("open ${brace")));
    assert_eq!(dict.resolve("missing").unwrap(), None);
}

#[test]
fn non_string_values_resolve_unchanged() {
    let dict = dict(json!({"port": 8080, "flags": ["a", "b"]}));
    assert_eq!(dict.resolve("port").unwrap(), Some(json!(8080)));
    assert_eq!(dict.resolve("flags").unwrap(), Some(json!(["a", "b"])));
}

#[test]
fn cycles_are_reported() {
    let chain = dict(json!({"a": "${b}", "b": "${c}", "c": "${a}"}));
    assert_eq!(
        chain.resolve("a").unwrap_err(),
        ExpressionError::Cycle {
            key: "a".to_string()
        }
    );
    let selfish = dict(json!({"x": "${x}"}));
    assert!(matches!(selfish.resolve("x"), Err(ExpressionError::Cycle { .. })));
}

#[test]
fn expand_works_on_free_text() {
    let dict = dict(json!({"name": "katotest"}));
    assert_eq!(dict.expand("${name}-instance-${name}").unwrap(), "katotest-instance-katotest");
}
