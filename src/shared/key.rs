//! Canonical subscription keys.
//!
//! Subscriptions and dispatches are correlated by a deterministic string key derived
//! from a flat object (a pair identity or a scanner filter). Two structurally-equal
//! objects produce the same key regardless of field declaration order.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

/// Flatten a serializable value into a key-sorted map of stringified scalars.
///
/// `None`/null fields are omitted entirely. Booleans and numbers are coerced to their
/// string representation; arrays are joined with `,` to match the server's
/// stringification of filter values.
pub fn string_map<T: Serialize>(value: &T) -> BTreeMap<String, String> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map
            .into_iter()
            .filter_map(|(k, v)| scalar_to_string(v).map(|s| (k, s)))
            .collect(),
        _ => BTreeMap::new(),
    }
}

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => {
            // Integral floats render without the fractional part, the way the server
            // stringifies them (1000.0 -> "1000", 1000.5 -> "1000.5").
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Some(u.to_string())
            } else {
                n.as_f64().map(|f| {
                    if f.fract() == 0.0 && f.abs() < 1e15 {
                        format!("{}", f as i64)
                    } else {
                        f.to_string()
                    }
                })
            }
        }
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(scalar_to_string)
                .collect::<Vec<_>>()
                .join(","),
        ),
        Value::Object(_) => None,
    }
}

/// Serialize a stringified map as a compact, key-sorted JSON object.
pub fn canonical_key(map: &BTreeMap<String, String>) -> String {
    serde_json::to_string(map).unwrap_or_default()
}

/// Canonical key of any flat serializable value.
pub fn canonical_key_of<T: Serialize>(value: &T) -> String {
    canonical_key(&string_map(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_order_independence() {
        let a = json!({ "a": 1, "b": 2 });
        let b = json!({ "b": 2, "a": 1 });
        assert_eq!(canonical_key_of(&a), canonical_key_of(&b));
    }

    #[test]
    fn test_value_discrimination() {
        let a = json!({ "a": 1 });
        let b = json!({ "a": 2 });
        assert_ne!(canonical_key_of(&a), canonical_key_of(&b));
    }

    #[test]
    fn test_key_discrimination() {
        let a = json!({ "a": 1 });
        let b = json!({ "b": 1 });
        assert_ne!(canonical_key_of(&a), canonical_key_of(&b));
    }

    #[test]
    fn test_null_fields_omitted() {
        let a = json!({ "a": 1, "b": null });
        let b = json!({ "a": 1 });
        assert_eq!(canonical_key_of(&a), canonical_key_of(&b));
    }

    #[test]
    fn test_scalars_stringified() {
        let v = json!({ "page": 1, "isNotHP": true, "chain": "ETH" });
        let map = string_map(&v);
        assert_eq!(map.get("page").map(String::as_str), Some("1"));
        assert_eq!(map.get("isNotHP").map(String::as_str), Some("true"));
        assert_eq!(map.get("chain").map(String::as_str), Some("ETH"));
    }

    #[test]
    fn test_integral_floats_render_without_fraction() {
        let v = json!({ "minVol24H": 1000.0, "maxLiq": 2500.75 });
        let map = string_map(&v);
        assert_eq!(map.get("minVol24H").map(String::as_str), Some("1000"));
        assert_eq!(map.get("maxLiq").map(String::as_str), Some("2500.75"));
    }

    #[test]
    fn test_arrays_joined() {
        let v = json!({ "dexes": ["uni", "ray"] });
        let map = string_map(&v);
        assert_eq!(map.get("dexes").map(String::as_str), Some("uni,ray"));
    }

    #[test]
    fn test_key_is_sorted_json() {
        let v = json!({ "b": "2", "a": "1" });
        assert_eq!(canonical_key_of(&v), r#"{"a":"1","b":"2"}"#);
    }
}
