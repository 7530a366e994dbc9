//! Canonical JSON and content digests.
//!
//! # Digest algorithm
//!
//! ```text
//! SHA-256(DIGEST_VERSION.to_be_bytes() || 0x00 || canonical_json_bytes)
//! ```
//!
//! Canonical JSON sorts object keys at every level and emits no whitespace,
//! so two values that differ only in key order digest identically. Array
//! order is significant.
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Bumped whenever the canonical form changes.
pub const DIGEST_VERSION: u32 = 1;

/// Serialize `value` with object keys sorted at every depth.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                if let Some(inner) = map.get(key) {
                    write_canonical(inner, out);
                }
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Version-aware digest of a JSON value, as 64 hex characters.
pub fn content_digest(value: &Value) -> String {
    digest_bytes(canonical_json(value).as_bytes())
}

/// Version-aware digest of already-canonical bytes.
pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(DIGEST_VERSION.to_be_bytes());
    hasher.update([0]);
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_order_does_not_change_digest() {
        let a: Value = serde_json::from_str(r#"{"b":1,"a":{"y":[1,2],"x":null}}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"a":{"x":null,"y":[1,2]},"b":1}"#).unwrap();
        assert_eq!(canonical_json(&a), r#"{"a":{"x":null,"y":[1,2]},"b":1}"#);
        assert_eq!(content_digest(&a), content_digest(&b));
    }

    #[test]
    fn array_order_changes_digest() {
        assert_ne!(
            content_digest(&json!({"items": [1, 2]})),
            content_digest(&json!({"items": [2, 1]}))
        );
    }

    #[test]
    fn strings_are_escaped() {
        let value = json!({"q\"k": "line\nbreak"});
        assert_eq!(canonical_json(&value), r#"{"q\"k":"line\nbreak"}"#);
    }

    #[test]
    fn digest_is_hex_sha256() {
        let digest = content_digest(&json!(null));
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
