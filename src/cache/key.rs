//! Cache key derivation.
//!
//! Two kinds of keys:
//!
//! - **Argument keys** ([`CacheKey::new`]): function identity plus the
//!   normalized argument tuple. Arguments are trimmed and lower-cased so
//!   `"Pune "` and `"pune"` share an entry.
//!
//! - **Composite keys** ([`CacheKey::composite`]): derived from the
//!   *content* of earlier results rather than the request parameters. Each
//!   part is serialized to JSON and canonicalized (object keys sorted at every
//!   depth) before hashing, so two structurally identical values produce the
//!   same key regardless of field order. Advice is keyed this way: it must be
//!   re-derived whenever the underlying weather changes, not when a TTL
//!   happens to lapse.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;
use serde_json::Value;

use crate::Result;

/// Separator between normalized arguments. Not expected in user input.
const ARG_SEPARATOR: char = '\u{1f}';

/// Deterministic memoization key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key from a function identity and its argument tuple.
    pub fn new(function: &str, args: &[&str]) -> Self {
        let mut key = String::from(function);
        key.push(':');
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                key.push(ARG_SEPARATOR);
            }
            key.push_str(&normalize_arg(arg));
        }
        Self(key)
    }

    /// Key from the canonicalized content of one or more values.
    pub fn composite<T: Serialize + ?Sized>(function: &str, parts: &[&T]) -> Result<Self> {
        let mut hasher = DefaultHasher::new();
        function.hash(&mut hasher);
        for part in parts {
            let value = serde_json::to_value(part)?;
            canonical_json(&value).hash(&mut hasher);
        }
        Ok(Self(format!("{function}:{:016x}", hasher.finish())))
    }

    /// Borrow the key as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}

fn normalize_arg(arg: &str) -> String {
    arg.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Render a JSON value with object keys sorted at every depth.
///
/// Independent of whether `serde_json` was built with `preserve_order`.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            out.push('{');
            for (i, (k, v)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                // Keys are plain strings; serializing a &String cannot fail.
                out.push_str(&Value::String(k.clone()).to_string());
                out.push(':');
                write_canonical(v, out);
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn argument_key_normalizes_case_and_whitespace() {
        let a = CacheKey::new("weather", &["  New   Delhi "]);
        let b = CacheKey::new("weather", &["new delhi"]);
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "weather:new delhi");
    }

    #[test]
    fn argument_key_differs_on_function() {
        assert_ne!(
            CacheKey::new("weather", &["pune"]),
            CacheKey::new("forecast", &["pune"])
        );
    }

    #[test]
    fn argument_key_keeps_positions_apart() {
        let a = CacheKey::new("market", &["punjab", ""]);
        let b = CacheKey::new("market", &["", "punjab"]);
        assert_ne!(a, b);
    }

    #[test]
    fn canonical_json_sorts_nested_keys() {
        let value = json!({"b": 1, "a": {"d": [ {"z": 1, "y": 2} ], "c": null}});
        assert_eq!(
            canonical_json(&value),
            r#"{"a":{"c":null,"d":[{"y":2,"z":1}]},"b":1}"#
        );
    }

    #[test]
    fn composite_key_ignores_field_order() {
        let first = json!({"temperature": 31.5, "condition": "haze", "humidity": 40});
        let second = json!({"humidity": 40, "condition": "haze", "temperature": 31.5});
        let k1 = CacheKey::composite("advice", &[&first]).unwrap();
        let k2 = CacheKey::composite("advice", &[&second]).unwrap();
        assert_eq!(k1, k2);
    }

    #[test]
    fn composite_key_tracks_content_changes() {
        let first = json!({"temperature": 31.5});
        let second = json!({"temperature": 32.0});
        let k1 = CacheKey::composite("advice", &[&first]).unwrap();
        let k2 = CacheKey::composite("advice", &[&second]).unwrap();
        assert_ne!(k1, k2);
    }

    #[test]
    fn composite_key_part_order_matters() {
        let a = json!({"x": 1});
        let b = json!({"y": 2});
        let k1 = CacheKey::composite("advice", &[&a, &b]).unwrap();
        let k2 = CacheKey::composite("advice", &[&b, &a]).unwrap();
        assert_ne!(k1, k2);
    }
}
