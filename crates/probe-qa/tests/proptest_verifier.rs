//! Property-based tests for the report verifier.

use probe_qa::test_util::conforming_report;
use probe_qa::verifier::verify;
use probe_qa::Verification;
use proptest::prelude::*;
use serde_json::{json, Map, Value};

const INPUT: &str = "https://nexa.polito.it/";

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (0u32..1000).prop_map(|n| json!(n)),
        "[a-z_-]{1,12}".prop_map(Value::String),
    ]
}

fn field_table() -> impl Strategy<Value = Map<String, Value>> {
    proptest::collection::btree_map("[a-z_]{1,16}", scalar(), 1..10)
        .prop_map(|m| m.into_iter().collect())
}

/// A value guaranteed to differ from `v` under the verifier's equality.
fn different(v: &Value) -> Value {
    match v {
        Value::Null => json!(false),
        Value::Bool(b) => json!(!b),
        Value::Number(n) => json!(n.as_f64().unwrap_or(0.0) + 1.0),
        Value::String(s) => json!(format!("{s}!")),
        _ => Value::Null,
    }
}

proptest! {
    #[test]
    fn matching_test_keys_pass(expect in field_table()) {
        let report = conforming_report(INPUT, "web_connectivity", Value::Object(expect.clone()));
        let v = Verification::Fields { expect };
        let result = verify("p", Some(INPUT), "web_connectivity", &v, &report).unwrap();
        prop_assert!(result.passed);
    }

    #[test]
    fn altering_any_expected_field_fails(expect in field_table(), pick in any::<prop::sample::Index>()) {
        let key = expect.keys().nth(pick.index(expect.len())).unwrap().clone();
        let mut keys = expect.clone();
        let altered = different(&keys[&key]);
        keys.insert(key.clone(), altered);

        let report = conforming_report(INPUT, "web_connectivity", Value::Object(keys));
        let v = Verification::Fields { expect };
        let result = verify("p", Some(INPUT), "web_connectivity", &v, &report).unwrap();
        prop_assert!(!result.passed);
        let failed: Vec<_> = result.failures().map(|c| c.description.clone()).collect();
        prop_assert_eq!(failed.len(), 1);
        let prefix = format!("{}'s value is", key);
        prop_assert!(failed[0].starts_with(&prefix), "{} does not start with {}", failed[0], prefix);
    }

    #[test]
    fn removing_any_expected_field_fails(expect in field_table(), pick in any::<prop::sample::Index>()) {
        let key = expect.keys().nth(pick.index(expect.len())).unwrap().clone();
        let mut keys = expect.clone();
        keys.remove(&key);

        let report = conforming_report(INPUT, "web_connectivity", Value::Object(keys));
        let v = Verification::Fields { expect };
        let result = verify("p", Some(INPUT), "web_connectivity", &v, &report).unwrap();
        prop_assert!(!result.passed);
    }

    #[test]
    fn verification_is_idempotent(expect in field_table(), keys in field_table()) {
        let report = conforming_report(INPUT, "web_connectivity", Value::Object(keys));
        let v = Verification::Fields { expect };
        let first = verify("p", Some(INPUT), "web_connectivity", &v, &report).unwrap();
        let second = verify("p", Some(INPUT), "web_connectivity", &v, &report).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn integers_match_their_float_form(n in 0u32..1_000_000) {
        let report = conforming_report(INPUT, "web_connectivity", json!({"body_length": f64::from(n)}));
        let v = Verification::fields([("body_length", json!(n))]);
        let result = verify("p", Some(INPUT), "web_connectivity", &v, &report).unwrap();
        prop_assert!(result.passed);
    }
}
