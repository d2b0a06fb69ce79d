//! Reactive proxies over raw values.
//!
//! `reactive(x)` wraps a mutable value in a transparent proxy: reads through
//! the proxy are recorded in the dependency graph and writes dispatch the
//! subscribers, while identity, equality, iteration, and serialization all
//! behave as on the raw value.
//!
//! # Identity
//!
//! Raw and proxy are one-to-one. Calling `reactive` twice on the same value
//! returns the same proxy; calling it on a proxy returns that proxy; and
//! `to_raw` recovers the original value. The mapping lives in a process-wide
//! identity table keyed by allocation id, holding strong references until
//! [`release`] is called.
//!
//! # Passthrough
//!
//! Unit, booleans, numbers, strings, byte strings, frozen sets, functions,
//! and refs are returned unchanged. So are values registered with
//! [`mark_raw`] and instances of object shapes carrying the skip marker.

mod ops;
mod proxy;
mod views;

pub use ops::ValueIter;
pub use proxy::ReactiveProxy;
pub use views::{MapItems, MapValues};

use std::sync::OnceLock;

use dashmap::{DashMap, DashSet};

use crate::error::{Error, Result};
use crate::value::{ObjId, Value};

// Identity table: raw allocation id -> its proxy. Strong references; entries
// live until `release`.
static RAW_TO_PROXY: OnceLock<DashMap<ObjId, Value>> = OnceLock::new();

// Allocation ids registered through `mark_raw`.
static MARKED_RAW: OnceLock<DashSet<ObjId>> = OnceLock::new();

fn raw_to_proxy() -> &'static DashMap<ObjId, Value> {
    RAW_TO_PROXY.get_or_init(DashMap::new)
}

fn marked_raw() -> &'static DashSet<ObjId> {
    MARKED_RAW.get_or_init(DashSet::new)
}

/// Wrap a value in a reactive proxy, or return it unchanged if it is not
/// observable (see the module docs for the passthrough rules).
pub fn reactive(value: Value) -> Value {
    // Kinds that are never wrapped.
    match &value {
        Value::Unit
        | Value::Func(_)
        | Value::Ref(_)
        | Value::Computed(_)
        | Value::Proxy(_) => return value,
        _ => {}
    }
    if value.is_immutable_builtin() {
        return value;
    }

    let Some(raw_id) = value.obj_id() else {
        return value;
    };
    if marked_raw().contains(&raw_id) {
        return value;
    }
    if let Value::Object(obj) = &value {
        if obj.shape().skips_reactive() {
            return value;
        }
    }

    raw_to_proxy()
        .entry(raw_id)
        .or_insert_with(|| ReactiveProxy::create(value.clone(), false))
        .clone()
}

/// Whether the value is a reactive proxy.
pub fn is_reactive(value: &Value) -> bool {
    matches!(value, Value::Proxy(_))
}

/// Recover the raw value behind a proxy. Non-proxies are returned unchanged.
pub fn to_raw(value: &Value) -> Value {
    match value {
        Value::Proxy(p) => p.target().clone(),
        other => other.clone(),
    }
}

/// Structurally replace every proxy in the value with its raw counterpart.
///
/// Untouched substructures keep their identity; a value containing no
/// proxies is returned as-is.
pub fn deep_to_raw(value: &Value) -> Value {
    deep(value).0
}

fn deep(value: &Value) -> (Value, bool) {
    let raw = to_raw(value);
    let was_proxy = !raw.is(value);
    match &raw {
        Value::List(list) => {
            let items = list.read().clone();
            let mut changed = false;
            let mut out = Vec::with_capacity(items.len());
            for item in &items {
                let (converted, child_changed) = deep(item);
                changed |= child_changed;
                out.push(converted);
            }
            if changed {
                (Value::list(out), true)
            } else {
                (raw, was_proxy)
            }
        }
        Value::Map(map) => {
            let entries = map.read().clone();
            let mut changed = false;
            let mut out = Vec::with_capacity(entries.len());
            for (key, item) in &entries {
                let (converted, child_changed) = deep(item);
                changed |= child_changed;
                out.push((key.clone(), converted));
            }
            if changed {
                (Value::map(out), true)
            } else {
                (raw, was_proxy)
            }
        }
        Value::Tuple(tuple) => {
            let mut changed = false;
            let mut out = Vec::with_capacity(tuple.items().len());
            for item in tuple.items() {
                let (converted, child_changed) = deep(item);
                changed |= child_changed;
                out.push(converted);
            }
            if changed {
                (Value::tuple(out), true)
            } else {
                (raw, was_proxy)
            }
        }
        _ => (raw, was_proxy),
    }
}

/// Mark a value so `reactive()` passes it through unchanged.
pub fn mark_raw(value: Value) -> Value {
    if let Some(id) = value.obj_id() {
        marked_raw().insert(id);
    }
    value
}

/// Whether the value was registered through [`mark_raw`].
pub fn is_marked_raw(value: &Value) -> bool {
    value
        .obj_id()
        .map(|id| marked_raw().contains(&id))
        .unwrap_or(false)
}

/// Drop the identity-table entries and subscriber sets belonging to a value.
///
/// The tables hold strong references and grow monotonically; call this when
/// an observable (given either as the raw value or its proxy) will not be
/// used again. Effects still holding back-references to the dropped sets
/// degrade to no-ops.
pub fn release(value: &Value) {
    let (raw_id, proxy_id) = match value {
        Value::Proxy(p) => (p.target().obj_id(), Some(p.id())),
        other => (other.obj_id(), None),
    };

    if let Some(raw_id) = raw_id {
        marked_raw().remove(&raw_id);
        crate::runtime::drop_observable(raw_id);
        if let Some((_, proxy)) = raw_to_proxy().remove(&raw_id) {
            if let Some(id) = proxy.obj_id() {
                crate::runtime::drop_observable(id);
            }
        }
    }
    if let Some(proxy_id) = proxy_id {
        crate::runtime::drop_observable(proxy_id);
    }
}

/// Create a readonly tracked view over a byte buffer.
///
/// Reads through the view are tracked against the view's own identity;
/// mutation attempts fail with [`Error::ReadonlyViolation`]. Each call
/// produces a fresh view.
pub fn buffer_view(value: &Value) -> Result<Value> {
    let raw = to_raw(value);
    match raw {
        Value::Buffer(_) => Ok(ReactiveProxy::create(raw, true)),
        other => Err(Error::UnsupportedOperation {
            kind: other.kind(),
            op: "buffer_view",
        }),
    }
}

/// Child-value rewrapping shared by the tracked read paths.
///
/// Mapping and attribute reads unwrap refs (and computed refs); list reads
/// keep refs visible. Everything else is wrapped with `reactive`.
pub(crate) fn wrap_child(child: Value, in_list: bool) -> Value {
    if !in_list {
        match &child {
            Value::Ref(r) => return r.get(),
            Value::Computed(c) => return c.get(),
            _ => {}
        }
    }
    reactive(child)
}
