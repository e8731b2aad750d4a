//! Canonical JSON used for every hash and signature in the ledger.
//!
//! The encoding is a compatibility contract: compact output, object keys in
//! lexicographic byte order at every depth, scalars rendered by `serde_json`.
//! Keys are sorted here, independent of the map type behind
//! `serde_json::Value` (the `preserve_order` feature must not change a hash).

use serde::Serialize;
use serde_json::Value;

/// Errors from canonical encoding.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CanonicalError {
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Serialize `value` to its canonical JSON string.
pub fn canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<String, CanonicalError> {
    let value =
        serde_json::to_value(value).map_err(|e| CanonicalError::Serialization(e.to_string()))?;
    let mut out = String::new();
    write_value(&value, &mut out)?;
    Ok(out)
}

fn write_value(value: &Value, out: &mut String) -> Result<(), CanonicalError> {
    match value {
        Value::Object(map) => {
            let mut pairs: Vec<_> = map.iter().collect();
            pairs.sort_by(|(a, _), (b, _)| a.as_str().cmp(b.as_str()));

            out.push('{');
            for (idx, (key, v)) in pairs.into_iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                out.push_str(&scalar(&Value::String(key.clone()))?);
                out.push(':');
                write_value(v, out)?;
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (idx, v) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                write_value(v, out)?;
            }
            out.push(']');
        }
        other => out.push_str(&scalar(other)?),
    }
    Ok(())
}

fn scalar(value: &Value) -> Result<String, CanonicalError> {
    serde_json::to_string(value).map_err(|e| CanonicalError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Serialize)]
    struct Unsorted {
        zeta: u32,
        alpha: Option<String>,
        mid: Vec<u8>,
    }

    #[test]
    fn keys_are_sorted_at_every_level() {
        let value = json!({"b": {"y": 1, "x": 2}, "a": [{"d": 1, "c": 2}]});
        assert_eq!(
            canonical_json(&value).unwrap(),
            r#"{"a":[{"c":2,"d":1}],"b":{"x":2,"y":1}}"#
        );
    }

    #[test]
    fn struct_field_order_does_not_matter() {
        let v = Unsorted {
            zeta: 1,
            alpha: None,
            mid: vec![1, 2],
        };
        assert_eq!(
            canonical_json(&v).unwrap(),
            r#"{"alpha":null,"mid":[1,2],"zeta":1}"#
        );
    }

    #[test]
    fn no_whitespace_and_stable_numbers() {
        let value = json!({"f": 0.5, "i": -3, "s": "a \"q\"\n"});
        assert_eq!(
            canonical_json(&value).unwrap(),
            r#"{"f":0.5,"i":-3,"s":"a \"q\"\n"}"#
        );
    }

    #[test]
    fn canonical_form_is_idempotent() {
        let value = json!({"k": [3, 2, 1], "a": {"z": null, "b": true}});
        let once = canonical_json(&value).unwrap();
        let reparsed: Value = serde_json::from_str(&once).unwrap();
        assert_eq!(canonical_json(&reparsed).unwrap(), once);
    }
}
