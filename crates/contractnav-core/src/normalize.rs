//! Spec normalization
//!
//! Loaded specs are rewritten into a canonical form before they are cached or
//! diffed: every object's keys are sorted by ordinal string comparison at every
//! depth. Arrays keep their element order and no value is added, removed or
//! renamed. Nothing about OpenAPI semantics is interpreted here.

use serde_json::Value;

/// Sort object keys recursively, leaving array order untouched
///
/// Normalizing an already normalized value is a no-op.
pub fn normalize_spec(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_spec).collect()),
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));

            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, child)| (key, normalize_spec(child)))
                    .collect(),
            )
        }
        scalar => scalar,
    }
}

/// Check whether every object in the tree already has sorted keys
pub fn is_normalized(value: &Value) -> bool {
    match value {
        Value::Array(items) => items.iter().all(is_normalized),
        Value::Object(map) => {
            let keys: Vec<&String> = map.keys().collect();
            keys.windows(2).all(|pair| pair[0] <= pair[1]) && map.values().all(is_normalized)
        }
        _ => true,
    }
}
