//! Property tests for spec normalization

use contractnav_core::{is_normalized, normalize_spec};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{json, Value};

fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-z ]{0,8}".prop_map(Value::String),
    ];

    leaf.prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::vec(("[a-zA-Z_$/]{1,6}", inner), 0..6)
                .prop_map(|entries| Value::Object(entries.into_iter().collect())),
        ]
    })
}

/// Compare two trees including key iteration order
fn same_layout(a: &Value, b: &Value) -> bool {
    serde_json::to_string(a).ok() == serde_json::to_string(b).ok()
}

proptest! {
    #[test]
    fn normalization_is_idempotent(value in arb_json()) {
        let once = normalize_spec(value);
        let twice = normalize_spec(once.clone());
        prop_assert!(same_layout(&once, &twice));
    }

    #[test]
    fn normalization_preserves_content(value in arb_json()) {
        // Map equality ignores key order, so this checks nothing was added,
        // dropped, renamed or reordered inside arrays.
        let normalized = normalize_spec(value.clone());
        prop_assert_eq!(normalized, value);
    }

    #[test]
    fn normalization_sorts_every_object(value in arb_json()) {
        prop_assert!(is_normalized(&normalize_spec(value)));
    }
}

#[test]
fn openapi_document_is_sorted_at_every_level() {
    let spec = json!({
        "paths": {
            "/users": {
                "post": {"operationId": "createUser"},
                "get": {"operationId": "listUsers"}
            }
        },
        "openapi": "3.0.0",
        "info": {"version": "1.0.0", "title": "Complex API"},
        "components": {
            "schemas": {
                "User": {"type": "object"},
                "Account": {"type": "object"}
            }
        }
    });

    let normalized = normalize_spec(spec);
    let top: Vec<&String> = normalized.as_object().unwrap().keys().collect();
    assert_eq!(top, ["components", "info", "openapi", "paths"]);

    let schemas: Vec<&String> = normalized["components"]["schemas"]
        .as_object()
        .unwrap()
        .keys()
        .collect();
    assert_eq!(schemas, ["Account", "User"]);

    let methods: Vec<&String> = normalized["paths"]["/users"].as_object().unwrap().keys().collect();
    assert_eq!(methods, ["get", "post"]);
}
