//! Identifier coercion.
//!
//! The remote service is not consistent about id types: the same field can
//! arrive as a JSON number in one payload and a numeric string in another.

use serde_json::Value;

/// Coerces a JSON value into an integer id.
///
/// Accepts integers, floats with no fractional part that fit in an `i64`
/// and numeric strings (surrounding whitespace ignored). Everything else
/// yields `None`.
pub fn coerce_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| {
                    f.is_finite()
                        && f.fract() == 0.0
                        && *f >= i64::MIN as f64
                        && *f < i64::MAX as f64
                })
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Reads `record[key]` and coerces it with [`coerce_id`].
pub fn id_field(record: &Value, key: &str) -> Option<i64> {
    record.get(key).and_then(coerce_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numbers_and_strings_coerce() {
        assert_eq!(coerce_id(&json!(42)), Some(42));
        assert_eq!(coerce_id(&json!("42")), Some(42));
        assert_eq!(coerce_id(&json!(" 7 ")), Some(7));
        assert_eq!(coerce_id(&json!(3.0)), Some(3));
    }

    #[test]
    fn test_non_numeric_values_rejected() {
        assert_eq!(coerce_id(&json!("abc")), None);
        assert_eq!(coerce_id(&json!(1.5)), None);
        assert_eq!(coerce_id(&json!(1e20)), None);
        assert_eq!(coerce_id(&json!(-1e20)), None);
        assert_eq!(coerce_id(&json!(null)), None);
        assert_eq!(coerce_id(&json!({ "id": 1 })), None);
    }

    #[test]
    fn test_id_field_missing_key() {
        let record = json!({ "name": "Projects" });
        assert_eq!(id_field(&record, "id"), None);
        assert_eq!(id_field(&json!({ "id": "9" }), "id"), Some(9));
    }
}
