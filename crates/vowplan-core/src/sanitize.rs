//! Null stripping for payloads headed to the document store.
//!
//! Generation and directory responses are tree-shaped JSON with holes in
//! them. The store rejects nothing, but nulls that reach it show up as
//! broken fields in every reader, so they are removed at any depth before a
//! write.

use serde::Serialize;
use serde_json::{Map, Value};

/// Remove nulls from `value` at every depth.
///
/// Arrays keep their non-null elements in order; objects keep only entries
/// whose cleaned value is non-null. A null root stays null. Applying the
/// function twice gives the same result as applying it once.
pub fn sanitize(value: Value) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(sanitize)
                .filter(|v| !v.is_null())
                .collect(),
        ),
        Value::Object(map) => Value::Object(sanitize_map(map)),
        scalar => scalar,
    }
}

fn sanitize_map(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter()
        .map(|(k, v)| (k, sanitize(v)))
        .filter(|(_, v)| !v.is_null())
        .collect()
}

/// Serialize each record on its own and clean it.
///
/// A record that fails to serialize, or cleans down to nothing, is dropped
/// without affecting its siblings. Returns the cleaned records and the
/// number that were dropped.
pub fn sanitize_each<T: Serialize>(records: &[T]) -> (Vec<Value>, usize) {
    let mut kept = Vec::with_capacity(records.len());
    let mut dropped = 0;
    for record in records {
        match serde_json::to_value(record).map(sanitize) {
            Ok(Value::Null) => dropped += 1,
            Ok(value) => kept.push(value),
            Err(e) => {
                tracing::warn!(error = %e, "dropping record that failed to serialize");
                dropped += 1;
            }
        }
    }
    (kept, dropped)
}

/// True when no null appears anywhere below the root.
pub fn is_clean(value: &Value) -> bool {
    match value {
        Value::Array(items) => items.iter().all(|v| !v.is_null() && is_clean(v)),
        Value::Object(map) => map.values().all(|v| !v.is_null() && is_clean(v)),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn messy() -> Value {
        json!({
            "total": 42000,
            "note": null,
            "categories": [
                { "name": "Venue", "amount": 16800, "description": null },
                null,
                { "name": null, "amount": null },
                [null, [null], { "a": null }],
            ],
            "nested": { "deeper": { "deepest": null, "kept": [1, null, 2] } },
        })
    }

    #[test]
    fn strips_nulls_at_every_depth() {
        let clean = sanitize(messy());
        assert!(is_clean(&clean));
        assert_eq!(
            clean,
            json!({
                "total": 42000,
                "categories": [
                    { "name": "Venue", "amount": 16800 },
                    {},
                    [[], {}],
                ],
                "nested": { "deeper": { "kept": [1, 2] } },
            })
        );
    }

    #[test]
    fn is_idempotent() {
        let once = sanitize(messy());
        let twice = sanitize(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn scalars_and_null_root_are_unchanged() {
        assert_eq!(sanitize(Value::Null), Value::Null);
        assert_eq!(sanitize(json!("x")), json!("x"));
        assert_eq!(sanitize(json!(false)), json!(false));
        assert_eq!(sanitize(json!(0)), json!(0));
    }

    #[test]
    fn deep_nesting_terminates() {
        let mut value = json!({ "leaf": null, "v": 1 });
        for _ in 0..500 {
            value = json!({ "child": value, "gap": null });
        }
        let clean = sanitize(value);
        assert!(is_clean(&clean));
    }

    #[derive(Serialize)]
    struct Rec {
        name: Option<String>,
        score: f64,
    }

    #[test]
    fn sanitize_each_isolates_records() {
        let records = vec![
            Rec {
                name: Some("Rose & Vine".into()),
                score: 4.5,
            },
            Rec {
                name: None,
                score: f64::NAN,
            },
        ];
        let (kept, dropped) = sanitize_each(&records);
        assert_eq!(dropped, 0);
        assert_eq!(kept[0], json!({ "name": "Rose & Vine", "score": 4.5 }));
        // NaN serializes to null and is removed from this record only.
        assert_eq!(kept[1], json!({}));
    }
}
