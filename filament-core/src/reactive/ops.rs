//! Container operations on `Value`.
//!
//! Every operation exists in two flavors behind one public method: called on
//! a reactive proxy it tracks (reads) or triggers (writes) against the
//! proxy's identity before delegating; called on a raw value it goes
//! straight to the storage. The raw helpers at the bottom of this file are
//! the single source of truth for container semantics, shared by both paths
//! and by the proxy type.

use std::cmp::Ordering;

use indexmap::IndexSet;

use super::views::{MapItems, MapValues};
use super::{to_raw, wrap_child};
use crate::error::{Error, Result};
use crate::value::{Key, Value};

fn unsupported(value: &Value, op: &'static str) -> Error {
    Error::UnsupportedOperation {
        kind: value.kind(),
        op,
    }
}

/// Snapshot iterator over a container's children.
pub struct ValueIter {
    inner: std::vec::IntoIter<Value>,
}

impl ValueIter {
    fn new(items: Vec<Value>) -> Self {
        Self {
            inner: items.into_iter(),
        }
    }
}

impl Iterator for ValueIter {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

// ----------------------------------------------------------------------------
// Public operation surface
// ----------------------------------------------------------------------------

impl Value {
    /// Read a member. Mapping reads auto-unwrap refs; list reads keep refs
    /// visible.
    pub fn get_item(&self, key: impl Into<Key>) -> Result<Value> {
        let key = key.into();
        match self {
            Value::Proxy(p) => p.get_item(&key),
            raw => raw_get_item(raw, &key),
        }
    }

    /// Write a member. On proxies this normalizes reactive values to raw,
    /// skips the trigger when nothing changes, and writes through an
    /// existing ref slot instead of replacing it.
    pub fn set_item(&self, key: impl Into<Key>, value: impl Into<Value>) -> Result<()> {
        let key = key.into();
        match self {
            Value::Proxy(p) => p.set_item(key, value.into()),
            raw => raw_set_item(raw, key, value.into()),
        }
    }

    /// Delete a member. A missing key surfaces the container error.
    pub fn del_item(&self, key: impl Into<Key>) -> Result<()> {
        let key = key.into();
        match self {
            Value::Proxy(p) => p.del_item(&key),
            raw => raw_del_item(raw, &key),
        }
    }

    /// Read an attribute of an object.
    pub fn get_attr(&self, name: &str) -> Result<Value> {
        match self {
            Value::Proxy(p) => super::ReactiveProxy::get_attr(p, name),
            Value::Object(obj) => {
                if let Some(getter) = obj.shape().property(name).cloned() {
                    (*getter)(self)
                } else if let Some(method) = obj.shape().method(name).cloned() {
                    let this = self.clone();
                    Ok(Value::func(move |args| (*method)(&this, args)))
                } else {
                    obj.field(name)
                        .ok_or_else(|| Error::UnknownAttribute(name.to_string()))
                }
            }
            other => Err(unsupported(other, "get_attr")),
        }
    }

    /// Write an attribute of an object.
    pub fn set_attr(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        match self {
            Value::Proxy(p) => p.set_attr(name, value.into()),
            Value::Object(obj) => {
                if obj.shape().property(name).is_some() {
                    return Err(Error::ReadonlyAttribute(name.to_string()));
                }
                obj.set_field(name, value.into());
                Ok(())
            }
            other => Err(unsupported(other, "set_attr")),
        }
    }

    /// Delete an attribute of an object.
    pub fn del_attr(&self, name: &str) -> Result<()> {
        match self {
            Value::Proxy(p) => p.del_attr(name),
            Value::Object(obj) => obj
                .remove_field(name)
                .map(|_| ())
                .ok_or_else(|| Error::UnknownAttribute(name.to_string())),
            other => Err(unsupported(other, "del_attr")),
        }
    }

    /// Invoke a function value.
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        match self {
            Value::Func(f) => f.call(args),
            other => Err(unsupported(other, "call")),
        }
    }

    /// Number of members or characters.
    pub fn len(&self) -> Result<usize> {
        match self {
            Value::Proxy(p) => p.len(),
            raw => raw_len(raw),
        }
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Membership test: key containment for mappings and sets, element
    /// equality for sequences, byte or substring containment for buffers
    /// and strings.
    pub fn contains(&self, item: impl Into<Value>) -> Result<bool> {
        let item = item.into();
        match self {
            Value::Proxy(p) => p.contains(&item),
            raw => raw_contains(raw, &item),
        }
    }

    /// Iterate the container's children. Mappings yield keys. Children come
    /// back as stored, without rewrapping.
    pub fn iter(&self) -> Result<ValueIter> {
        let items = match self {
            Value::Proxy(p) => p.iter_children()?,
            raw => raw_iter_children(raw)?,
        };
        Ok(ValueIter::new(items))
    }

    // ------------------------------------------------------------------
    // Sequence operations
    // ------------------------------------------------------------------

    pub fn append(&self, value: impl Into<Value>) -> Result<()> {
        match self {
            Value::Proxy(p) => {
                let value = to_raw(&value.into());
                p.mutate(|raw| raw_append(raw, value))
            }
            raw => raw_append(raw, value.into()),
        }
    }

    pub fn insert(&self, index: i64, value: impl Into<Value>) -> Result<()> {
        match self {
            Value::Proxy(p) => {
                let value = to_raw(&value.into());
                p.mutate(|raw| raw_insert(raw, index, value))
            }
            raw => raw_insert(raw, index, value.into()),
        }
    }

    /// Remove and return an element: by index for lists (default last), an
    /// arbitrary member for sets.
    pub fn pop(&self, index: Option<i64>) -> Result<Value> {
        match self {
            Value::Proxy(p) => p.mutate(|raw| raw_pop(raw, index)),
            raw => raw_pop(raw, index),
        }
    }

    /// Remove the first occurrence of a value (lists) or a member (sets).
    pub fn remove(&self, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        match self {
            Value::Proxy(p) => p.mutate(|raw| raw_remove(raw, &value)),
            raw => raw_remove(raw, &value),
        }
    }

    pub fn clear(&self) -> Result<()> {
        match self {
            Value::Proxy(p) => p.mutate(raw_clear),
            raw => raw_clear(raw),
        }
    }

    /// Append every child of `other`.
    pub fn extend(&self, other: &Value) -> Result<()> {
        let children = match other {
            Value::Proxy(p) => raw_iter_children(p.target())?,
            raw => raw_iter_children(raw)?,
        };
        match self {
            Value::Proxy(p) => p.mutate(|raw| {
                for child in children {
                    raw_append(raw, to_raw(&child))?;
                }
                Ok(())
            }),
            raw => {
                for child in children {
                    raw_append(raw, child)?;
                }
                Ok(())
            }
        }
    }

    pub fn reverse(&self) -> Result<()> {
        match self {
            Value::Proxy(p) => p.mutate(raw_reverse),
            raw => raw_reverse(raw),
        }
    }

    /// Sort a list in place. Fails when two elements cannot be ordered.
    pub fn sort(&self) -> Result<()> {
        match self {
            Value::Proxy(p) => p.mutate(raw_sort),
            raw => raw_sort(raw),
        }
    }

    /// Index of the first occurrence of a value in a sequence.
    pub fn index_of(&self, value: &Value) -> Result<usize> {
        match self {
            Value::Proxy(p) => p.tracked_query(|raw| raw_index_of(raw, value)),
            raw => raw_index_of(raw, value),
        }
    }

    /// Number of occurrences of a value in a sequence.
    pub fn count_of(&self, value: &Value) -> Result<usize> {
        match self {
            Value::Proxy(p) => p.tracked_query(|raw| raw_count_of(raw, value)),
            raw => raw_count_of(raw, value),
        }
    }

    /// Shallow copy of a list, mapping, or set, as a fresh raw value.
    pub fn copy(&self) -> Result<Value> {
        match self {
            Value::Proxy(p) => p.tracked_query(raw_copy),
            raw => raw_copy(raw),
        }
    }

    // ------------------------------------------------------------------
    // Mapping operations
    // ------------------------------------------------------------------

    /// Mapping lookup with a default, auto-unwrapping like item reads.
    pub fn get_or(&self, key: impl Into<Key>, default: impl Into<Value>) -> Result<Value> {
        let key = key.into();
        let default = default.into();
        match self {
            Value::Proxy(p) => p.tracked_query(|raw| {
                let found = raw_get_item_opt(raw, &key);
                match raw {
                    Value::Map(_) => Ok(wrap_child(found.unwrap_or(default), false)),
                    other => Err(unsupported(other, "get_or")),
                }
            }),
            Value::Map(map) => Ok(map.read().get(&key).cloned().unwrap_or(default)),
            other => Err(unsupported(other, "get_or")),
        }
    }

    /// Mapping keys, in insertion order.
    pub fn keys(&self) -> Result<Vec<Value>> {
        match self {
            Value::Proxy(p) => p.tracked_query(raw_keys),
            raw => raw_keys(raw),
        }
    }

    /// Mapping values view. Through a proxy the view yields auto-unwrapped /
    /// reactive-wrapped values; raw mappings yield stored values.
    pub fn values(&self) -> Result<MapValues> {
        match self {
            Value::Proxy(p) => p.tracked_query(|raw| {
                let entries = raw_map_entries(raw)?;
                Ok(MapValues::new(
                    entries
                        .into_iter()
                        .map(|(_, v)| wrap_child(v, false))
                        .collect(),
                ))
            }),
            raw => {
                let entries = raw_map_entries(raw)?;
                Ok(MapValues::new(entries.into_iter().map(|(_, v)| v).collect()))
            }
        }
    }

    /// Mapping items view, with the same child rewrapping as `values`.
    pub fn items(&self) -> Result<MapItems> {
        match self {
            Value::Proxy(p) => p.tracked_query(|raw| {
                let entries = raw_map_entries(raw)?;
                Ok(MapItems::new(
                    entries
                        .into_iter()
                        .map(|(k, v)| (k.to_value(), wrap_child(v, false)))
                        .collect(),
                ))
            }),
            raw => {
                let entries = raw_map_entries(raw)?;
                Ok(MapItems::new(
                    entries
                        .into_iter()
                        .map(|(k, v)| (k.to_value(), v))
                        .collect(),
                ))
            }
        }
    }

    /// Merge another mapping into this mapping, or more members into this
    /// set.
    pub fn update(&self, other: &Value) -> Result<()> {
        match self {
            Value::Proxy(p) => {
                let other = to_raw(other);
                p.mutate(|raw| raw_update(raw, &other))
            }
            raw => raw_update(raw, &to_raw(other)),
        }
    }

    /// Remove a mapping entry and return its value.
    pub fn pop_key(&self, key: impl Into<Key>) -> Result<Value> {
        let key = key.into();
        match self {
            Value::Proxy(p) => p.mutate(|raw| raw_map_pop(raw, &key)),
            raw => raw_map_pop(raw, &key),
        }
    }

    /// Remove and return the most recently inserted mapping entry.
    pub fn pop_entry(&self) -> Result<(Value, Value)> {
        match self {
            Value::Proxy(p) => p.mutate(raw_map_pop_entry),
            raw => raw_map_pop_entry(raw),
        }
    }

    /// Return the value under `key`, inserting `default` first if absent.
    pub fn set_default(&self, key: impl Into<Key>, default: impl Into<Value>) -> Result<Value> {
        let key = key.into();
        match self {
            Value::Proxy(p) => {
                let default = to_raw(&default.into());
                p.mutate(|raw| raw_set_default(raw, key, default))
            }
            raw => raw_set_default(raw, key, default.into()),
        }
    }

    // ------------------------------------------------------------------
    // Set operations
    // ------------------------------------------------------------------

    pub fn add(&self, member: impl Into<Key>) -> Result<()> {
        let member = member.into();
        match self {
            Value::Proxy(p) => p.mutate(|raw| raw_set_add(raw, member)),
            raw => raw_set_add(raw, member),
        }
    }

    /// Remove a member if present; never fails on a missing member.
    pub fn discard(&self, member: impl Into<Key>) -> Result<()> {
        let member = member.into();
        match self {
            Value::Proxy(p) => p.mutate(|raw| raw_set_discard(raw, &member)),
            raw => raw_set_discard(raw, &member),
        }
    }

    pub fn union_with(&self, other: &Value) -> Result<Value> {
        self.set_algebra(other, "union_with", |a, b| a.union(b).cloned().collect())
    }

    pub fn intersection_with(&self, other: &Value) -> Result<Value> {
        self.set_algebra(other, "intersection_with", |a, b| {
            a.intersection(b).cloned().collect()
        })
    }

    pub fn difference_with(&self, other: &Value) -> Result<Value> {
        self.set_algebra(other, "difference_with", |a, b| {
            a.difference(b).cloned().collect()
        })
    }

    pub fn symmetric_difference_with(&self, other: &Value) -> Result<Value> {
        self.set_algebra(other, "symmetric_difference_with", |a, b| {
            a.symmetric_difference(b).cloned().collect()
        })
    }

    pub fn is_disjoint(&self, other: &Value) -> Result<bool> {
        let (a, b) = self.set_operands(other, "is_disjoint")?;
        Ok(a.is_disjoint(&b))
    }

    pub fn is_subset(&self, other: &Value) -> Result<bool> {
        let (a, b) = self.set_operands(other, "is_subset")?;
        Ok(a.is_subset(&b))
    }

    pub fn is_superset(&self, other: &Value) -> Result<bool> {
        let (a, b) = self.set_operands(other, "is_superset")?;
        Ok(a.is_superset(&b))
    }

    fn set_algebra(
        &self,
        other: &Value,
        op: &'static str,
        combine: impl FnOnce(&IndexSet<Key>, &IndexSet<Key>) -> IndexSet<Key>,
    ) -> Result<Value> {
        let (a, b) = self.set_operands(other, op)?;
        Ok(Value::set(combine(&a, &b)))
    }

    /// Snapshot both operands as member sets; tracked when `self` is a
    /// proxy.
    fn set_operands(&self, other: &Value, op: &'static str) -> Result<(IndexSet<Key>, IndexSet<Key>)> {
        let a = match self {
            Value::Proxy(p) => p.tracked_query(|raw| raw_member_set(raw, op)),
            raw => raw_member_set(raw, op),
        }?;
        let b = raw_member_set(&to_raw(other), op)?;
        Ok((a, b))
    }

    // ------------------------------------------------------------------
    // Byte-buffer operations
    // ------------------------------------------------------------------

    pub fn push_byte(&self, byte: u8) -> Result<()> {
        match self {
            Value::Proxy(p) => p.mutate(|raw| raw_push_byte(raw, byte)),
            raw => raw_push_byte(raw, byte),
        }
    }

    pub fn extend_bytes(&self, bytes: &[u8]) -> Result<()> {
        match self {
            Value::Proxy(p) => p.mutate(|raw| raw_extend_bytes(raw, bytes)),
            raw => raw_extend_bytes(raw, bytes),
        }
    }

    /// The byte contents of a buffer or byte string.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        match self {
            Value::Proxy(p) => p.tracked_query(raw_to_bytes),
            raw => raw_to_bytes(raw),
        }
    }

    pub fn starts_with_bytes(&self, prefix: &[u8]) -> Result<bool> {
        Ok(self.to_bytes()?.starts_with(prefix))
    }

    pub fn ends_with_bytes(&self, suffix: &[u8]) -> Result<bool> {
        Ok(self.to_bytes()?.ends_with(suffix))
    }

    pub fn find_byte(&self, byte: u8) -> Result<Option<usize>> {
        Ok(self.to_bytes()?.iter().position(|b| *b == byte))
    }

    /// Lowercase hex rendering of a buffer or byte string.
    pub fn hex(&self) -> Result<String> {
        let bytes = self.to_bytes()?;
        let mut out = String::with_capacity(bytes.len() * 2);
        for b in bytes {
            use std::fmt::Write;
            let _ = write!(out, "{b:02x}");
        }
        Ok(out)
    }
}

// ----------------------------------------------------------------------------
// Raw helpers
// ----------------------------------------------------------------------------

fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let idx = if index < 0 { index + len as i64 } else { index };
    if idx >= 0 && (idx as usize) < len {
        Some(idx as usize)
    } else {
        None
    }
}

fn index_key(raw: &Value, key: &Key) -> Result<i64> {
    match key {
        Key::Int(i) => Ok(*i),
        _ => Err(Error::UnsupportedOperation {
            kind: raw.kind(),
            op: "non-integer indexing",
        }),
    }
}

pub(crate) fn raw_get_item(raw: &Value, key: &Key) -> Result<Value> {
    match raw {
        Value::Map(map) => map
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| Error::KeyNotFound(key.to_string())),
        Value::List(list) => {
            let items = list.read();
            let index = index_key(raw, key)?;
            resolve_index(index, items.len())
                .map(|i| items[i].clone())
                .ok_or(Error::IndexOutOfRange {
                    index,
                    len: items.len(),
                })
        }
        Value::Tuple(tuple) => {
            let index = index_key(raw, key)?;
            resolve_index(index, tuple.items().len())
                .map(|i| tuple.items()[i].clone())
                .ok_or(Error::IndexOutOfRange {
                    index,
                    len: tuple.items().len(),
                })
        }
        Value::Buffer(buffer) => {
            let bytes = buffer.read();
            let index = index_key(raw, key)?;
            resolve_index(index, bytes.len())
                .map(|i| Value::Int(i64::from(bytes[i])))
                .ok_or(Error::IndexOutOfRange {
                    index,
                    len: bytes.len(),
                })
        }
        other => Err(unsupported(other, "get_item")),
    }
}

pub(crate) fn raw_get_item_opt(raw: &Value, key: &Key) -> Option<Value> {
    raw_get_item(raw, key).ok()
}

pub(crate) fn raw_set_item(raw: &Value, key: Key, value: Value) -> Result<()> {
    match raw {
        Value::Map(map) => {
            map.write().insert(key, value);
            Ok(())
        }
        Value::List(list) => {
            let mut items = list.write();
            let index = index_key(raw, &key)?;
            let len = items.len();
            match resolve_index(index, len) {
                Some(i) => {
                    items[i] = value;
                    Ok(())
                }
                None => Err(Error::IndexOutOfRange { index, len }),
            }
        }
        Value::Buffer(buffer) => {
            let byte = value
                .as_int()
                .and_then(|i| u8::try_from(i).ok())
                .ok_or(Error::UnsupportedOperation {
                    kind: value.kind(),
                    op: "byte assignment",
                })?;
            let mut bytes = buffer.write();
            let index = index_key(raw, &key)?;
            let len = bytes.len();
            match resolve_index(index, len) {
                Some(i) => {
                    bytes[i] = byte;
                    Ok(())
                }
                None => Err(Error::IndexOutOfRange { index, len }),
            }
        }
        other => Err(unsupported(other, "set_item")),
    }
}

pub(crate) fn raw_del_item(raw: &Value, key: &Key) -> Result<()> {
    match raw {
        Value::Map(map) => map
            .write()
            .shift_remove(key)
            .map(|_| ())
            .ok_or_else(|| Error::KeyNotFound(key.to_string())),
        Value::List(list) => {
            let mut items = list.write();
            let index = index_key(raw, key)?;
            let len = items.len();
            match resolve_index(index, len) {
                Some(i) => {
                    items.remove(i);
                    Ok(())
                }
                None => Err(Error::IndexOutOfRange { index, len }),
            }
        }
        other => Err(unsupported(other, "del_item")),
    }
}

pub(crate) fn raw_len(raw: &Value) -> Result<usize> {
    match raw {
        Value::Str(s) => Ok(s.chars().count()),
        Value::Bytes(b) => Ok(b.len()),
        Value::Tuple(t) => Ok(t.items().len()),
        Value::FrozenSet(s) => Ok(s.items().len()),
        Value::List(l) => Ok(l.read().len()),
        Value::Map(m) => Ok(m.read().len()),
        Value::Set(s) => Ok(s.read().len()),
        Value::Buffer(b) => Ok(b.read().len()),
        other => Err(unsupported(other, "len")),
    }
}

pub(crate) fn raw_contains(raw: &Value, item: &Value) -> Result<bool> {
    match raw {
        Value::Map(map) => {
            let key = Key::try_from(item)?;
            Ok(map.read().contains_key(&key))
        }
        Value::Set(set) => {
            let key = Key::try_from(item)?;
            Ok(set.read().contains(&key))
        }
        Value::FrozenSet(set) => {
            let key = Key::try_from(item)?;
            Ok(set.items().contains(&key))
        }
        Value::List(list) => {
            let items = list.read().clone();
            Ok(items.iter().any(|v| v == item))
        }
        Value::Tuple(tuple) => Ok(tuple.items().iter().any(|v| v == item)),
        Value::Buffer(buffer) => {
            let byte = item
                .as_int()
                .and_then(|i| u8::try_from(i).ok())
                .ok_or_else(|| unsupported(item, "byte containment"))?;
            Ok(buffer.read().contains(&byte))
        }
        Value::Str(s) => match item.as_str() {
            Some(needle) => Ok(s.contains(needle)),
            None => Err(unsupported(item, "substring containment")),
        },
        other => Err(unsupported(other, "contains")),
    }
}

pub(crate) fn raw_iter_children(raw: &Value) -> Result<Vec<Value>> {
    match raw {
        Value::List(list) => Ok(list.read().clone()),
        Value::Tuple(tuple) => Ok(tuple.items().to_vec()),
        Value::Map(map) => Ok(map.read().keys().map(Key::to_value).collect()),
        Value::Set(set) => Ok(set.read().iter().map(Key::to_value).collect()),
        Value::FrozenSet(set) => Ok(set.items().iter().map(Key::to_value).collect()),
        Value::Buffer(buffer) => Ok(buffer
            .read()
            .iter()
            .map(|b| Value::Int(i64::from(*b)))
            .collect()),
        Value::Str(s) => Ok(s.chars().map(|c| Value::from(c.to_string())).collect()),
        other => Err(unsupported(other, "iteration")),
    }
}

fn raw_append(raw: &Value, value: Value) -> Result<()> {
    match raw {
        Value::List(list) => {
            list.write().push(value);
            Ok(())
        }
        other => Err(unsupported(other, "append")),
    }
}

fn raw_insert(raw: &Value, index: i64, value: Value) -> Result<()> {
    match raw {
        Value::List(list) => {
            let mut items = list.write();
            let len = items.len() as i64;
            // Out-of-range insert positions clamp, list-insert style.
            let pos = if index < 0 {
                (index + len).max(0)
            } else {
                index.min(len)
            } as usize;
            items.insert(pos, value);
            Ok(())
        }
        other => Err(unsupported(other, "insert")),
    }
}

fn raw_pop(raw: &Value, index: Option<i64>) -> Result<Value> {
    match raw {
        Value::List(list) => {
            let mut items = list.write();
            if items.is_empty() {
                return Err(Error::EmptyPop("list"));
            }
            let len = items.len();
            let index = index.unwrap_or(-1);
            match resolve_index(index, len) {
                Some(i) => Ok(items.remove(i)),
                None => Err(Error::IndexOutOfRange { index, len }),
            }
        }
        Value::Set(set) => {
            let mut members = set.write();
            let first = members.first().cloned().ok_or(Error::EmptyPop("set"))?;
            members.shift_remove(&first);
            Ok(first.to_value())
        }
        other => Err(unsupported(other, "pop")),
    }
}

fn raw_remove(raw: &Value, value: &Value) -> Result<()> {
    match raw {
        Value::List(list) => {
            let mut items = list.write();
            match items.iter().position(|v| v == value) {
                Some(i) => {
                    items.remove(i);
                    Ok(())
                }
                None => Err(Error::MissingValue("list")),
            }
        }
        Value::Set(set) => {
            let key = Key::try_from(value)?;
            if set.write().shift_remove(&key) {
                Ok(())
            } else {
                Err(Error::KeyNotFound(key.to_string()))
            }
        }
        other => Err(unsupported(other, "remove")),
    }
}

fn raw_clear(raw: &Value) -> Result<()> {
    match raw {
        Value::List(list) => {
            list.write().clear();
            Ok(())
        }
        Value::Map(map) => {
            map.write().clear();
            Ok(())
        }
        Value::Set(set) => {
            set.write().clear();
            Ok(())
        }
        Value::Buffer(buffer) => {
            buffer.write().clear();
            Ok(())
        }
        other => Err(unsupported(other, "clear")),
    }
}

fn raw_reverse(raw: &Value) -> Result<()> {
    match raw {
        Value::List(list) => {
            list.write().reverse();
            Ok(())
        }
        other => Err(unsupported(other, "reverse")),
    }
}

/// Total-order comparison over the sortable kinds; `None` when the two
/// values cannot be ordered relative to each other.
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        (Value::Float(x), Value::Float(y)) => x.partial_cmp(y),
        (Value::Int(x), Value::Float(y)) => (*x as f64).partial_cmp(y),
        (Value::Float(x), Value::Int(y)) => x.partial_cmp(&(*y as f64)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Str(x), Value::Str(y)) => Some(x.cmp(y)),
        (Value::Bytes(x), Value::Bytes(y)) => Some(x.cmp(y)),
        (Value::Tuple(x), Value::Tuple(y)) => {
            compare_sequences(x.items(), y.items())
        }
        (Value::List(x), Value::List(y)) => {
            let lhs = x.read().clone();
            let rhs = y.read().clone();
            compare_sequences(&lhs, &rhs)
        }
        _ => None,
    }
}

fn compare_sequences(a: &[Value], b: &[Value]) -> Option<Ordering> {
    for (x, y) in a.iter().zip(b.iter()) {
        match compare_values(x, y)? {
            Ordering::Equal => continue,
            other => return Some(other),
        }
    }
    Some(a.len().cmp(&b.len()))
}

fn raw_sort(raw: &Value) -> Result<()> {
    match raw {
        Value::List(list) => {
            let mut items = list.write();
            let mut failure: Option<(&'static str, &'static str)> = None;
            items.sort_by(|a, b| match compare_values(a, b) {
                Some(ordering) => ordering,
                None => {
                    failure.get_or_insert((a.kind(), b.kind()));
                    Ordering::Equal
                }
            });
            match failure {
                Some((a, b)) => Err(Error::NotOrderable(a, b)),
                None => Ok(()),
            }
        }
        other => Err(unsupported(other, "sort")),
    }
}

fn raw_index_of(raw: &Value, value: &Value) -> Result<usize> {
    match raw {
        Value::List(list) => {
            let items = list.read().clone();
            items
                .iter()
                .position(|v| v == value)
                .ok_or(Error::MissingValue("list"))
        }
        Value::Tuple(tuple) => tuple
            .items()
            .iter()
            .position(|v| v == value)
            .ok_or(Error::MissingValue("tuple")),
        other => Err(unsupported(other, "index_of")),
    }
}

fn raw_count_of(raw: &Value, value: &Value) -> Result<usize> {
    match raw {
        Value::List(list) => {
            let items = list.read().clone();
            Ok(items.iter().filter(|v| *v == value).count())
        }
        Value::Tuple(tuple) => Ok(tuple.items().iter().filter(|v| *v == value).count()),
        other => Err(unsupported(other, "count_of")),
    }
}

fn raw_copy(raw: &Value) -> Result<Value> {
    match raw {
        Value::List(list) => Ok(Value::list(list.read().clone())),
        Value::Map(map) => Ok(Value::map(map.read().clone())),
        Value::Set(set) => Ok(Value::set(set.read().clone())),
        other => Err(unsupported(other, "copy")),
    }
}

/// Snapshot of a mapping's entries, in insertion order.
pub(crate) fn raw_map_entries(raw: &Value) -> Result<Vec<(Key, Value)>> {
    match raw {
        Value::Map(map) => Ok(map
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()),
        other => Err(unsupported(other, "mapping access")),
    }
}

fn raw_keys(raw: &Value) -> Result<Vec<Value>> {
    Ok(raw_map_entries(raw)?
        .into_iter()
        .map(|(k, _)| k.to_value())
        .collect())
}

fn raw_update(raw: &Value, other: &Value) -> Result<()> {
    match raw {
        Value::Map(map) => {
            let entries = raw_map_entries(other)?;
            let mut target = map.write();
            for (key, value) in entries {
                target.insert(key, to_raw(&value));
            }
            Ok(())
        }
        Value::Set(set) => {
            let members = raw_member_set(other, "update")?;
            set.write().extend(members);
            Ok(())
        }
        other_kind => Err(unsupported(other_kind, "update")),
    }
}

fn raw_map_pop(raw: &Value, key: &Key) -> Result<Value> {
    match raw {
        Value::Map(map) => map
            .write()
            .shift_remove(key)
            .ok_or_else(|| Error::KeyNotFound(key.to_string())),
        other => Err(unsupported(other, "pop_key")),
    }
}

fn raw_map_pop_entry(raw: &Value) -> Result<(Value, Value)> {
    match raw {
        Value::Map(map) => map
            .write()
            .pop()
            .map(|(k, v)| (k.to_value(), v))
            .ok_or(Error::EmptyPop("map")),
        other => Err(unsupported(other, "pop_entry")),
    }
}

fn raw_set_default(raw: &Value, key: Key, default: Value) -> Result<Value> {
    match raw {
        Value::Map(map) => {
            let mut target = map.write();
            Ok(target.entry(key).or_insert(default).clone())
        }
        other => Err(unsupported(other, "set_default")),
    }
}

fn raw_set_add(raw: &Value, member: Key) -> Result<()> {
    match raw {
        Value::Set(set) => {
            set.write().insert(member);
            Ok(())
        }
        other => Err(unsupported(other, "add")),
    }
}

fn raw_set_discard(raw: &Value, member: &Key) -> Result<()> {
    match raw {
        Value::Set(set) => {
            set.write().shift_remove(member);
            Ok(())
        }
        other => Err(unsupported(other, "discard")),
    }
}

/// Member-set snapshot of any set-like or iterable-of-hashables value.
pub(crate) fn raw_member_set(raw: &Value, op: &'static str) -> Result<IndexSet<Key>> {
    match raw {
        Value::Set(set) => Ok(set.read().clone()),
        Value::FrozenSet(set) => Ok(set.items().clone()),
        Value::List(_) | Value::Tuple(_) => raw_iter_children(raw)?
            .iter()
            .map(Key::try_from)
            .collect(),
        other => Err(unsupported(other, op)),
    }
}

fn raw_push_byte(raw: &Value, byte: u8) -> Result<()> {
    match raw {
        Value::Buffer(buffer) => {
            buffer.write().push(byte);
            Ok(())
        }
        other => Err(unsupported(other, "push_byte")),
    }
}

fn raw_extend_bytes(raw: &Value, bytes: &[u8]) -> Result<()> {
    match raw {
        Value::Buffer(buffer) => {
            buffer.write().extend_from_slice(bytes);
            Ok(())
        }
        other => Err(unsupported(other, "extend_bytes")),
    }
}

fn raw_to_bytes(raw: &Value) -> Result<Vec<u8>> {
    match raw {
        Value::Buffer(buffer) => Ok(buffer.read().clone()),
        Value::Bytes(bytes) => Ok(bytes.to_vec()),
        other => Err(unsupported(other, "to_bytes")),
    }
}
