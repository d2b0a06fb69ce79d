//! Refs: single-slot observable cells.
//!
//! A ref holds one value behind a tracked `value` slot. Reading it inside an
//! effect subscribes the effect; writing it triggers the subscribers unless
//! the new value equals the current one.
//!
//! The payload is always stored raw. Reads hand it back through `reactive`,
//! so `ref_(map).get()` behaves reactively all the way down; writes
//! normalize through `to_raw`/`unref` so assigning a proxy or another ref
//! never nests wrappers.

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::reactive::{reactive, to_raw};
use crate::runtime::{self, DepKey};
use crate::value::{ObjId, Value};

use parking_lot::RwLock;

/// A single-slot observable cell.
pub struct RefValue {
    id: ObjId,
    value: RwLock<Value>,
}

impl RefValue {
    /// Wrap an already-normalized raw payload.
    pub(crate) fn new(value: Value) -> Arc<Self> {
        Arc::new(Self {
            id: ObjId::new(),
            value: RwLock::new(value),
        })
    }

    pub fn id(&self) -> ObjId {
        self.id
    }

    /// Tracked read. The payload comes back through `reactive`, so mutable
    /// containers stored in a ref are observable when read out of it.
    pub fn get(&self) -> Value {
        runtime::track("ref", self.id, DepKey::Value);
        reactive(self.value.read().clone())
    }

    /// Read the payload without subscribing the current effect.
    pub fn get_untracked(&self) -> Value {
        self.value.read().clone()
    }

    /// Write the slot. The value is normalized to its raw, unwrapped form;
    /// if it equals the current payload, nothing happens.
    pub fn set(&self, value: Value) {
        let value = to_raw(&unref(&value));
        {
            let current = self.value.read();
            if *current == value {
                return;
            }
        }
        *self.value.write() = value;
        runtime::trigger("ref", self.id, &DepKey::Value);
    }

    /// Replace the payload based on its current value.
    pub fn update(&self, f: impl FnOnce(&Value) -> Value) {
        let next = {
            let current = self.value.read();
            f(&current)
        };
        self.set(next);
    }
}

impl fmt::Display for RefValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.value.read();
        write!(f, "<Ref[{}] value={}>", value.kind(), value)
    }
}

impl fmt::Debug for RefValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefValue").field("id", &self.id).finish()
    }
}

/// Create a ref holding `value`, or return `value` itself when it is
/// already a ref (or computed ref).
pub fn ref_(value: impl Into<Value>) -> Value {
    let value = value.into();
    if is_ref(&value) {
        return value;
    }
    Value::Ref(RefValue::new(to_raw(&value)))
}

/// Whether the value is a ref. Computed refs count.
pub fn is_ref(value: &Value) -> bool {
    matches!(value, Value::Ref(_) | Value::Computed(_))
}

/// Unwrap one level: a ref yields its raw payload, anything else passes
/// through.
pub fn unref(value: &Value) -> Value {
    match value {
        Value::Ref(r) => to_raw(&r.get()),
        Value::Computed(c) => to_raw(&c.get()),
        other => other.clone(),
    }
}

/// Recursively unwrap refs at every level of a structure, producing a plain
/// value with no refs and no proxies.
///
/// Maps, lists, and tuples are rebuilt; sets and frozen sets hold hashable
/// members only and are copied as-is. Everything else passes through raw.
pub fn deep_unref(value: &Value) -> Value {
    let value = to_raw(&unref(value));
    match &value {
        Value::Map(map) => {
            let entries = map.read().clone();
            Value::map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, deep_unref(&v)))
                    .collect::<Vec<_>>(),
            )
        }
        Value::List(list) => {
            let items = list.read().clone();
            Value::list(items.iter().map(deep_unref).collect::<Vec<_>>())
        }
        Value::Tuple(tuple) => {
            Value::tuple(tuple.items().iter().map(deep_unref).collect::<Vec<_>>())
        }
        Value::Set(set) => Value::set(set.read().clone()),
        Value::FrozenSet(set) => Value::frozen_set(set.items().clone()),
        other => other.clone(),
    }
}

impl Value {
    /// Tracked read of a ref or computed ref.
    pub fn get(&self) -> Result<Value> {
        match self {
            Value::Ref(r) => Ok(r.get()),
            Value::Computed(c) => Ok(c.get()),
            other => Err(Error::UnsupportedOperation {
                kind: other.kind(),
                op: "get",
            }),
        }
    }

    /// Write a ref's slot. Computed refs are readonly.
    pub fn set(&self, value: impl Into<Value>) -> Result<()> {
        match self {
            Value::Ref(r) => {
                r.set(value.into());
                Ok(())
            }
            Value::Computed(_) => Err(Error::ReadonlyAttribute("value".to_string())),
            other => Err(Error::UnsupportedOperation {
                kind: other.kind(),
                op: "set",
            }),
        }
    }

    /// Borrow the underlying ref cell, if this value is a plain ref.
    pub fn as_ref_cell(&self) -> Option<&Arc<RefValue>> {
        match self {
            Value::Ref(r) => Some(r),
            _ => None,
        }
    }
}
