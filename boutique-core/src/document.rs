//! Path helpers over JSON documents
//!
//! Paths use dot notation (`shippingAddress.phone`). Lookups traverse arrays of
//! sub-documents the way a document database does: `variants.color` against
//! `{"variants": [{"color": "red"}, {"color": "blue"}]}` yields both colors.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Every value reachable at `path`, with terminal arrays flattened
pub fn candidates<'a>(doc: &'a Value, path: &str) -> Vec<&'a Value> {
    let mut current: Vec<&Value> = vec![doc];
    for segment in path.split('.') {
        let mut next = Vec::new();
        for value in current {
            match value {
                Value::Object(map) => {
                    if let Some(v) = map.get(segment) {
                        next.push(v);
                    }
                }
                Value::Array(items) => {
                    if let Ok(index) = segment.parse::<usize>() {
                        if let Some(v) = items.get(index) {
                            next.push(v);
                        }
                        continue;
                    }
                    for item in items {
                        if let Value::Object(map) = item {
                            if let Some(v) = map.get(segment) {
                                next.push(v);
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        current = next;
    }

    let mut flat = Vec::with_capacity(current.len());
    for value in current {
        match value {
            Value::Array(items) => flat.extend(items.iter()),
            other => flat.push(other),
        }
    }
    flat
}

/// Value at `path` without array traversal
pub fn get_path<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |value, segment| match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

pub fn get_path_mut<'a>(doc: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    path.split('.').try_fold(doc, |value, segment| match value {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(move |i| items.get_mut(i)),
        _ => None,
    })
}

/// Insert `value` at `path`, creating intermediate objects as needed.
/// Returns false when a non-object sits in the way.
pub fn set_path(doc: &mut Value, path: &str, value: Value) -> bool {
    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(last) = segments.pop() else {
        return false;
    };

    let mut current = doc;
    for segment in segments {
        let Value::Object(map) = current else {
            return false;
        };
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    match current {
        Value::Object(map) => {
            map.insert(last.to_string(), value);
            true
        }
        _ => false,
    }
}

/// Remove the value at `path`; arrays of sub-documents are stripped element-wise
pub fn remove_path(doc: &mut Value, path: &str) {
    match path.split_once('.') {
        None => match doc {
            Value::Object(map) => {
                map.remove(path);
            }
            Value::Array(items) => items.iter_mut().for_each(|item| remove_path(item, path)),
            _ => {}
        },
        Some((head, rest)) => match doc {
            Value::Object(map) => {
                if let Some(child) = map.get_mut(head) {
                    remove_path(child, rest);
                }
            }
            Value::Array(items) => items.iter_mut().for_each(|item| remove_path(item, path)),
            _ => {}
        },
    }
}

/// Copy only the listed paths (plus `_id` unless excluded by the caller) into a new document
pub fn pick_paths(doc: &Value, paths: &[String]) -> Value {
    let mut out = Value::Object(Map::new());
    for path in paths {
        if let Some(v) = get_path(doc, path) {
            set_path(&mut out, path, v.clone());
        }
    }
    out
}

/// Read a stored date: RFC 3339 string, `YYYY-MM-DD`, epoch milliseconds or `{"$date": ..}`
pub fn as_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|d| d.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|d| Utc.from_utc_datetime(&d))
            }),
        Value::Number(n) => n.as_i64().and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        Value::Object(map) => map.get("$date").and_then(as_date),
        _ => None,
    }
}

/// Numbers as they are, date strings and `{"$date"}` documents as epoch milliseconds
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(_) | Value::Object(_) => as_date(value).map(|d| d.timestamp_millis() as f64),
        _ => None,
    }
}

fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(v) if numeric(v).is_some() => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Object(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Bool(_)) => 5,
    }
}

/// Total order over optional JSON values: missing and null first, then numbers
/// and dates on one timeline, strings, objects, arrays, booleans
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let (ra, rb) = (type_rank(a), type_rank(b));
    if ra != rb {
        return ra.cmp(&rb);
    }
    match (a, b) {
        (Some(x), Some(y)) if ra == 1 => {
            let (x, y) = (numeric(x).unwrap_or(0.0), numeric(y).unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Array(x)), Some(Value::Array(y))) => {
            for (l, r) in x.iter().zip(y.iter()) {
                let ord = compare_values(Some(l), Some(r));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Some(Value::Object(x)), Some(Value::Object(y))) => {
            Value::Object(x.clone()).to_string().cmp(&Value::Object(y.clone()).to_string())
        }
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_candidates_flatten_arrays() {
        let doc = json!({
            "colors": ["red", "blue"],
            "variants": [{"size": "M"}, {"size": "L"}],
            "meta": {"brand": "Acme"}
        });
        assert_eq!(candidates(&doc, "colors"), vec![&json!("red"), &json!("blue")]);
        assert_eq!(candidates(&doc, "variants.size"), vec![&json!("M"), &json!("L")]);
        assert_eq!(candidates(&doc, "meta.brand"), vec![&json!("Acme")]);
        assert!(candidates(&doc, "missing.path").is_empty());
    }

    #[test]
    fn test_set_and_remove_path() {
        let mut doc = json!({"name": "Shirt"});
        assert!(set_path(&mut doc, "shipping.address.city", json!("Hanoi")));
        assert_eq!(get_path(&doc, "shipping.address.city"), Some(&json!("Hanoi")));

        remove_path(&mut doc, "shipping.address");
        assert_eq!(doc, json!({"name": "Shirt", "shipping": {}}));

        assert!(!set_path(&mut doc, "name.first", json!("x")));
    }

    #[test]
    fn test_remove_path_inside_arrays() {
        let mut doc = json!({"items": [{"sku": "a", "cost": 1}, {"sku": "b", "cost": 2}]});
        remove_path(&mut doc, "items.cost");
        assert_eq!(doc, json!({"items": [{"sku": "a"}, {"sku": "b"}]}));
    }

    #[test]
    fn test_pick_paths() {
        let doc = json!({"_id": "1", "name": "Shirt", "price": 10, "meta": {"a": 1, "b": 2}});
        let picked = pick_paths(&doc, &["_id".into(), "price".into(), "meta.b".into()]);
        assert_eq!(picked, json!({"_id": "1", "price": 10, "meta": {"b": 2}}));
    }

    #[test]
    fn test_compare_values_orders_missing_first() {
        assert_eq!(compare_values(None, Some(&json!(1))), Ordering::Less);
        assert_eq!(compare_values(Some(&Value::Null), None), Ordering::Equal);
        assert_eq!(compare_values(Some(&json!(2.5)), Some(&json!(10))), Ordering::Less);
        assert_eq!(compare_values(Some(&json!("b")), Some(&json!("a"))), Ordering::Greater);
        assert_eq!(compare_values(Some(&json!(99)), Some(&json!("1"))), Ordering::Less);
    }

    #[test]
    fn test_compare_values_orders_dates_as_instants() {
        // 2024-01-01T15:00:00Z against 2024-01-01T20:00:00Z
        let tokyo = json!("2024-01-02T00:00:00+09:00");
        let utc = json!("2024-01-01T20:00:00Z");
        assert_eq!(compare_values(Some(&tokyo), Some(&utc)), Ordering::Less);

        let millis = json!(Utc.with_ymd_and_hms(2024, 1, 1, 18, 0, 0).unwrap().timestamp_millis());
        assert_eq!(compare_values(Some(&tokyo), Some(&millis)), Ordering::Less);
        assert_eq!(compare_values(Some(&millis), Some(&utc)), Ordering::Less);

        let extended = json!({"$date": "2024-01-01T19:00:00Z"});
        assert_eq!(compare_values(Some(&extended), Some(&utc)), Ordering::Less);
        assert_eq!(compare_values(Some(&json!("2024-01-01")), Some(&tokyo)), Ordering::Less);
    }

    #[test]
    fn test_as_date_formats() {
        let midnight = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(as_date(&json!("2024-03-01")), Some(midnight));
        assert_eq!(as_date(&json!("2024-03-01T09:00:00+09:00")), Some(midnight));
        assert_eq!(as_date(&json!(midnight.timestamp_millis())), Some(midnight));
        assert_eq!(as_date(&json!({"$date": "2024-03-01T00:00:00Z"})), Some(midnight));
        assert_eq!(as_date(&json!("soon")), None);
        assert_eq!(as_date(&json!(true)), None);
    }
}
