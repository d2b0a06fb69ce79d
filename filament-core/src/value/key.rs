//! Hashable keys for mappings and sets.
//!
//! Mapping keys and set members are restricted to the hashable scalar subset
//! of the value model: unit, booleans, integers, strings, byte strings, and
//! tuples of keys. Mutable containers, floats, and the observable kinds are
//! rejected with [`Error::Unhashable`].

use std::fmt;
use std::sync::Arc;

use crate::error::Error;
use crate::value::Value;

/// A hashable value usable as a mapping key or set member.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Unit,
    Bool(bool),
    Int(i64),
    Str(Arc<str>),
    Bytes(Arc<[u8]>),
    Tuple(Arc<[Key]>),
}

impl Key {
    /// Kind name used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Key::Unit => "unit",
            Key::Bool(_) => "bool",
            Key::Int(_) => "int",
            Key::Str(_) => "str",
            Key::Bytes(_) => "bytes",
            Key::Tuple(_) => "tuple",
        }
    }

    /// Convert the key back into a plain value.
    pub fn to_value(&self) -> Value {
        match self {
            Key::Unit => Value::Unit,
            Key::Bool(b) => Value::Bool(*b),
            Key::Int(i) => Value::Int(*i),
            Key::Str(s) => Value::Str(Arc::clone(s)),
            Key::Bytes(b) => Value::Bytes(Arc::clone(b)),
            Key::Tuple(items) => Value::tuple(items.iter().map(|k| k.to_value())),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Unit => write!(f, "null"),
            Key::Bool(b) => write!(f, "{b}"),
            Key::Int(i) => write!(f, "{i}"),
            Key::Str(s) => write!(f, "{s:?}"),
            Key::Bytes(b) => write!(f, "b{:?}", String::from_utf8_lossy(b)),
            Key::Tuple(items) => {
                write!(f, "(")?;
                for (i, k) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}")?;
                }
                write!(f, ")")
            }
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(Arc::from(s))
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Str(Arc::from(s.as_str()))
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Int(i)
    }
}

impl From<i32> for Key {
    fn from(i: i32) -> Self {
        Key::Int(i64::from(i))
    }
}

impl From<bool> for Key {
    fn from(b: bool) -> Self {
        Key::Bool(b)
    }
}

impl From<()> for Key {
    fn from(_: ()) -> Self {
        Key::Unit
    }
}

impl TryFrom<&Value> for Key {
    type Error = Error;

    /// Refs and proxies are unwrapped to their raw payload first, mirroring
    /// how keys behave when a wrapped value is used to index a container.
    fn try_from(value: &Value) -> Result<Self, Error> {
        match value {
            Value::Unit => Ok(Key::Unit),
            Value::Bool(b) => Ok(Key::Bool(*b)),
            Value::Int(i) => Ok(Key::Int(*i)),
            Value::Str(s) => Ok(Key::Str(Arc::clone(s))),
            Value::Bytes(b) => Ok(Key::Bytes(Arc::clone(b))),
            Value::Tuple(t) => t
                .items
                .iter()
                .map(Key::try_from)
                .collect::<Result<Vec<_>, _>>()
                .map(|keys| Key::Tuple(keys.into())),
            Value::Proxy(p) => Key::try_from(p.target()),
            other => Err(Error::Unhashable(other.kind())),
        }
    }
}

impl TryFrom<Value> for Key {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Error> {
        Key::try_from(&value)
    }
}
