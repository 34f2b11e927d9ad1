use serde_json::{Map, Value};

/// A flattened content item as seen by the query engine.
///
/// `serde_json` is built with `preserve_order`, so a record keeps the key
/// order it was produced with and serializes back the same way.
pub type Record = Map<String, Value>;

/// Resolve a dotted field path (`customer.id`, `items.price`) against a record.
///
/// Arrays met on the way are mapped element-wise, and a trailing array is
/// expanded into its elements, so the result holds every candidate value the
/// path reaches. Nulls are never returned; an empty result means "missing".
pub fn resolve<'a>(record: &'a Record, path: &str) -> Vec<&'a Value> {
    let mut segments = path.split('.');
    let Some(first) = segments.next() else {
        return Vec::new();
    };
    let mut current: Vec<&Value> = record.get(first).into_iter().collect();

    for segment in segments {
        let mut next = Vec::new();
        for value in current {
            step(value, segment, &mut next);
        }
        if next.is_empty() {
            return next;
        }
        current = next;
    }

    let mut out = Vec::with_capacity(current.len());
    for value in current {
        match value {
            Value::Null => {}
            Value::Array(items) => out.extend(items.iter().filter(|v| !v.is_null())),
            other => out.push(other),
        }
    }
    out
}

fn step<'a>(value: &'a Value, segment: &str, out: &mut Vec<&'a Value>) {
    match value {
        Value::Object(map) => {
            if let Some(found) = map.get(segment) {
                out.push(found);
            }
        }
        Value::Array(items) => {
            for item in items {
                step(item, segment, out);
            }
        }
        _ => {}
    }
}

/// String form of a value used by every comparison and by sorting.
///
/// Integral floats print without a fraction, because the flattener widens
/// every number to `f64` and `where=count=2` must still match.
pub fn display_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                let f = n.as_f64().unwrap_or_default();
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    format!("{}", f as i64)
                } else {
                    f.to_string()
                }
            }
        }
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Sort key of a record for one field path. Missing values sort as `""`.
pub fn sort_string(record: &Record, path: &str) -> String {
    resolve(record, path)
        .into_iter()
        .map(display_string)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn resolves_nested_objects() {
        let r = record(json!({"customer": {"id": "c1", "name": "Ann"}}));
        assert_eq!(resolve(&r, "customer.id"), vec![&json!("c1")]);
        assert!(resolve(&r, "customer.email").is_empty());
        assert!(resolve(&r, "missing.id").is_empty());
    }

    #[test]
    fn maps_across_arrays() {
        let r = record(json!({"items": [{"price": 5.0}, {"price": 12.0}, {"name": "x"}]}));
        let prices: Vec<String> = resolve(&r, "items.price").into_iter().map(display_string).collect();
        assert_eq!(prices, vec!["5", "12"]);
    }

    #[test]
    fn expands_trailing_array_and_drops_nulls() {
        let r = record(json!({"tags": ["a", null, "b"], "gone": null}));
        assert_eq!(resolve(&r, "tags").len(), 2);
        assert!(resolve(&r, "gone").is_empty());
    }

    #[test]
    fn display_strings() {
        assert_eq!(display_string(&json!(2.0)), "2");
        assert_eq!(display_string(&json!(2.5)), "2.5");
        assert_eq!(display_string(&json!(-7)), "-7");
        assert_eq!(display_string(&json!(true)), "true");
        assert_eq!(display_string(&json!("x")), "x");
        assert_eq!(display_string(&json!({"a": 1})), "{\"a\":1}");
    }

    #[test]
    fn sort_string_joins_multiple_values() {
        let r = record(json!({"items": [{"n": "b"}, {"n": "a"}]}));
        assert_eq!(sort_string(&r, "items.n"), "b,a");
        assert_eq!(sort_string(&r, "nope"), "");
    }
}
