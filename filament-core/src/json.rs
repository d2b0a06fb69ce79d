//! JSON serialization interop.
//!
//! Serializers must see through refs: serializing `ref_(x)` produces exactly
//! what serializing `x` would. The `Serialize` impl for `Value` unwraps refs
//! and computed refs transparently and serializes reactive proxies as their
//! raw containers, so wrapped and unwrapped structures encode identically.
//!
//! Kinds with no JSON representation (byte values, sets, objects,
//! functions) fail with a serialization error, unless [`to_json_with`] is
//! used: its fallback callback is consulted for exactly those values, after
//! ref unwrapping, and its replacement value is encoded recursively under
//! the same rules.

use serde::ser::{Error as SerError, SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::error::Result;
use crate::value::{Key, Value};

type Fallback<'a> = &'a dyn Fn(&Value) -> Option<Value>;

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serialize_value(self, None, serializer)
    }
}

struct SerializeWith<'a> {
    value: &'a Value,
    fallback: Option<Fallback<'a>>,
}

impl Serialize for SerializeWith<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serialize_value(self.value, self.fallback, serializer)
    }
}

fn serialize_value<S: Serializer>(
    value: &Value,
    fallback: Option<Fallback<'_>>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match value {
        Value::Unit => serializer.serialize_unit(),
        Value::Bool(b) => serializer.serialize_bool(*b),
        Value::Int(i) => serializer.serialize_i64(*i),
        Value::Float(x) => serializer.serialize_f64(*x),
        Value::Str(s) => serializer.serialize_str(s),
        Value::Tuple(tuple) => {
            let mut seq = serializer.serialize_seq(Some(tuple.items().len()))?;
            for item in tuple.items() {
                seq.serialize_element(&SerializeWith {
                    value: item,
                    fallback,
                })?;
            }
            seq.end()
        }
        Value::List(list) => {
            let items = list.read().clone();
            let mut seq = serializer.serialize_seq(Some(items.len()))?;
            for item in &items {
                seq.serialize_element(&SerializeWith {
                    value: item,
                    fallback,
                })?;
            }
            seq.end()
        }
        Value::Map(map) => {
            let entries = map.read().clone();
            let mut out = serializer.serialize_map(Some(entries.len()))?;
            for (key, item) in &entries {
                let key = key_string(key).ok_or_else(|| {
                    S::Error::custom(format!("{} key is not JSON serializable", key.kind()))
                })?;
                out.serialize_entry(
                    &key,
                    &SerializeWith {
                        value: item,
                        fallback,
                    },
                )?;
            }
            out.end()
        }
        // Refs unwrap before anything else sees them, fallback included.
        Value::Ref(r) => serialize_value(&r.get(), fallback, serializer),
        Value::Computed(c) => serialize_value(&c.get(), fallback, serializer),
        Value::Proxy(p) => {
            p.track_value();
            serialize_value(p.target(), fallback, serializer)
        }
        other => {
            if let Some(fallback_fn) = fallback {
                if let Some(replacement) = fallback_fn(other) {
                    return serialize_value(&replacement, fallback, serializer);
                }
            }
            Err(S::Error::custom(format!(
                "value of kind {} is not JSON serializable",
                other.kind()
            )))
        }
    }
}

/// JSON object keys are strings; coerce the coercible key kinds.
fn key_string(key: &Key) -> Option<String> {
    match key {
        Key::Unit => Some("null".to_string()),
        Key::Bool(b) => Some(b.to_string()),
        Key::Int(i) => Some(i.to_string()),
        Key::Str(s) => Some(s.to_string()),
        Key::Bytes(_) | Key::Tuple(_) => None,
    }
}

/// Serialize a value to a JSON string, unwrapping refs transparently.
pub fn to_json(value: &Value) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Like [`to_json`], with a fallback for kinds that have no JSON
/// representation. The fallback sees values only after ref unwrapping and
/// returns a replacement to encode, or `None` to fail.
pub fn to_json_with(
    value: &Value,
    fallback: impl Fn(&Value) -> Option<Value>,
) -> Result<String> {
    let wrapper = SerializeWith {
        value,
        fallback: Some(&fallback),
    };
    Ok(serde_json::to_string(&wrapper)?)
}
