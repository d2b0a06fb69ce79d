//! The dynamic value model.
//!
//! The runtime operates over heterogeneous data: scalars, ordered mappings,
//! sequences, sets, byte buffers, user objects, and the observable kinds
//! (refs, computed refs, reactive proxies). `Value` is the closed enum over
//! all of them.
//!
//! # Sharing
//!
//! Scalars are plain copies. Everything heap-backed is an `Arc` handle:
//! cloning a `Value` never deep-copies, and mutating a list through one
//! handle is visible through every other handle, including its reactive
//! proxy. Mutable containers carry their storage in a [`Shared`] cell, which
//! also assigns the [`ObjId`] used by the identity tables and the dependency
//! graph.
//!
//! # Equality and identity
//!
//! `==` is structural, matching how the values would compare in a dynamic
//! language: integers compare with floats, containers compare element-wise,
//! and a reactive proxy compares equal to its raw value. Refs, computed
//! refs, and functions compare by identity. `Value::is` is identity in the
//! allocation sense: two handles are the same value iff they share storage.

mod key;
mod object;
mod shared;

use std::fmt;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};

pub use key::Key;
pub use object::{Method, NativeFn, ObjectShape, ObjectShapeBuilder, ObjectValue, PropertyGetter};
pub use shared::{ObjId, Shared};

use crate::computed::ComputedValue;
use crate::error::Result;
use crate::reactive::ReactiveProxy;
use crate::refs::RefValue;

/// An immutable sequence.
#[derive(Debug)]
pub struct TupleValue {
    id: ObjId,
    pub(crate) items: Vec<Value>,
}

impl TupleValue {
    pub fn id(&self) -> ObjId {
        self.id
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }
}

/// An immutable set.
#[derive(Debug)]
pub struct FrozenSetValue {
    id: ObjId,
    pub(crate) items: IndexSet<Key>,
}

impl FrozenSetValue {
    pub fn id(&self) -> ObjId {
        self.id
    }

    pub fn items(&self) -> &IndexSet<Key> {
        &self.items
    }
}

/// A dynamically typed value.
#[derive(Debug, Clone)]
pub enum Value {
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    Bytes(Arc<[u8]>),
    Tuple(Arc<TupleValue>),
    FrozenSet(Arc<FrozenSetValue>),
    List(Arc<Shared<Vec<Value>>>),
    Map(Arc<Shared<IndexMap<Key, Value>>>),
    Set(Arc<Shared<IndexSet<Key>>>),
    Buffer(Arc<Shared<Vec<u8>>>),
    Object(Arc<ObjectValue>),
    Func(Arc<NativeFn>),
    Ref(Arc<RefValue>),
    Computed(Arc<ComputedValue>),
    Proxy(Arc<ReactiveProxy>),
}

// ----------------------------------------------------------------------------
// Constructors
// ----------------------------------------------------------------------------

impl Value {
    /// A new list with its own shared storage.
    pub fn list<I, V>(items: I) -> Value
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Value::List(Arc::new(Shared::new(
            items.into_iter().map(Into::into).collect(),
        )))
    }

    /// A new insertion-ordered mapping.
    pub fn map<I, K, V>(entries: I) -> Value
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Key>,
        V: Into<Value>,
    {
        Value::Map(Arc::new(Shared::new(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )))
    }

    /// A new mutable set.
    pub fn set<I, K>(items: I) -> Value
    where
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        Value::Set(Arc::new(Shared::new(
            items.into_iter().map(Into::into).collect(),
        )))
    }

    /// A new immutable tuple.
    pub fn tuple<I, V>(items: I) -> Value
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Value::Tuple(Arc::new(TupleValue {
            id: ObjId::new(),
            items: items.into_iter().map(Into::into).collect(),
        }))
    }

    /// A new immutable set.
    pub fn frozen_set<I, K>(items: I) -> Value
    where
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        Value::FrozenSet(Arc::new(FrozenSetValue {
            id: ObjId::new(),
            items: items.into_iter().map(Into::into).collect(),
        }))
    }

    /// A new mutable byte buffer.
    pub fn buffer(bytes: impl Into<Vec<u8>>) -> Value {
        Value::Buffer(Arc::new(Shared::new(bytes.into())))
    }

    /// An immutable byte string.
    pub fn bytes(bytes: impl AsRef<[u8]>) -> Value {
        Value::Bytes(Arc::from(bytes.as_ref()))
    }

    /// A callable native function.
    pub fn func(body: impl Fn(&[Value]) -> Result<Value> + Send + Sync + 'static) -> Value {
        Value::Func(Arc::new(NativeFn::new(body)))
    }

    /// A user object instance.
    pub fn object<I, K, V>(shape: Arc<ObjectShape>, fields: I) -> Value
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Object(Arc::new(ObjectValue::new(
            shape,
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )))
    }
}

// ----------------------------------------------------------------------------
// Inspection
// ----------------------------------------------------------------------------

impl Value {
    /// Kind name for diagnostics and error messages. Proxies report the kind
    /// of their raw value.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Unit => "unit",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Bytes(_) => "bytes",
            Value::Tuple(_) => "tuple",
            Value::FrozenSet(_) => "frozenset",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Set(_) => "set",
            Value::Buffer(_) => "buffer",
            Value::Object(_) => "object",
            Value::Func(_) => "function",
            Value::Ref(_) => "ref",
            Value::Computed(_) => "computed",
            Value::Proxy(p) => p.target().kind(),
        }
    }

    /// The allocation id of a heap-backed value, if it has one.
    pub fn obj_id(&self) -> Option<ObjId> {
        match self {
            Value::Unit | Value::Bool(_) | Value::Int(_) | Value::Float(_) => None,
            Value::Str(_) | Value::Bytes(_) => None,
            Value::Tuple(t) => Some(t.id()),
            Value::FrozenSet(s) => Some(s.id()),
            Value::List(l) => Some(l.id()),
            Value::Map(m) => Some(m.id()),
            Value::Set(s) => Some(s.id()),
            Value::Buffer(b) => Some(b.id()),
            Value::Object(o) => Some(o.id()),
            Value::Func(f) => Some(f.id()),
            Value::Ref(r) => Some(r.id()),
            Value::Computed(c) => Some(c.id()),
            Value::Proxy(p) => Some(p.id()),
        }
    }

    /// Identity comparison: do the two handles denote the same value?
    ///
    /// Scalars are identical when equal; heap-backed values when they share
    /// an allocation.
    pub fn is(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Unit, Value::Unit) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => Arc::ptr_eq(a, b),
            (Value::Bytes(a), Value::Bytes(b)) => Arc::ptr_eq(a, b),
            (Value::Tuple(a), Value::Tuple(b)) => Arc::ptr_eq(a, b),
            (Value::FrozenSet(a), Value::FrozenSet(b)) => Arc::ptr_eq(a, b),
            (Value::List(a), Value::List(b)) => Arc::ptr_eq(a, b),
            (Value::Map(a), Value::Map(b)) => Arc::ptr_eq(a, b),
            (Value::Set(a), Value::Set(b)) => Arc::ptr_eq(a, b),
            (Value::Buffer(a), Value::Buffer(b)) => Arc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Func(a), Value::Func(b)) => Arc::ptr_eq(a, b),
            (Value::Ref(a), Value::Ref(b)) => Arc::ptr_eq(a, b),
            (Value::Computed(a), Value::Computed(b)) => Arc::ptr_eq(a, b),
            (Value::Proxy(a), Value::Proxy(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, Value::Unit)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Proxy(p) => p.target().as_int(),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            Value::Proxy(p) => p.target().as_float(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Proxy(p) => p.target().as_bool(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Whether this value belongs to the immutable builtin kinds that pass
    /// through `reactive()` unchanged.
    pub fn is_immutable_builtin(&self) -> bool {
        matches!(
            self,
            Value::Bool(_)
                | Value::Int(_)
                | Value::Float(_)
                | Value::Str(_)
                | Value::Bytes(_)
                | Value::FrozenSet(_)
        )
    }
}

// ----------------------------------------------------------------------------
// Equality
// ----------------------------------------------------------------------------

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            // Comparing a proxy is a read of the whole container.
            (Value::Proxy(p), _) => {
                p.track_value();
                p.target() == other
            }
            (_, Value::Proxy(p)) => {
                p.track_value();
                self == p.target()
            }
            (Value::Unit, Value::Unit) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => {
                Arc::ptr_eq(a, b) || a.items == b.items
            }
            (Value::FrozenSet(a), Value::FrozenSet(b)) => {
                Arc::ptr_eq(a, b) || a.items == b.items
            }
            (Value::List(a), Value::List(b)) => {
                Arc::ptr_eq(a, b) || {
                    let lhs = a.read().clone();
                    let rhs = b.read().clone();
                    lhs == rhs
                }
            }
            (Value::Map(a), Value::Map(b)) => {
                Arc::ptr_eq(a, b) || {
                    let lhs = a.read().clone();
                    let rhs = b.read().clone();
                    lhs == rhs
                }
            }
            (Value::Set(a), Value::Set(b)) => {
                Arc::ptr_eq(a, b) || {
                    let lhs = a.read().clone();
                    let rhs = b.read().clone();
                    lhs == rhs
                }
            }
            // A mutable set and a frozen set with the same members are equal.
            (Value::Set(a), Value::FrozenSet(b)) => *a.read() == b.items,
            (Value::FrozenSet(a), Value::Set(b)) => a.items == *b.read(),
            (Value::Buffer(a), Value::Buffer(b)) => {
                Arc::ptr_eq(a, b) || *a.read() == *b.read()
            }
            (Value::Buffer(a), Value::Bytes(b)) => a.read().as_slice() == &b[..],
            (Value::Bytes(a), Value::Buffer(b)) => &a[..] == b.read().as_slice(),
            // Identity semantics for the remaining kinds.
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Func(a), Value::Func(b)) => Arc::ptr_eq(a, b),
            (Value::Ref(a), Value::Ref(b)) => Arc::ptr_eq(a, b),
            (Value::Computed(a), Value::Computed(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

// ----------------------------------------------------------------------------
// Display
// ----------------------------------------------------------------------------

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Bytes(b) => write!(f, "b{:?}", String::from_utf8_lossy(b)),
            Value::Tuple(t) => {
                write!(f, "(")?;
                for (i, item) in t.items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
            Value::FrozenSet(s) => {
                write!(f, "frozenset{{")?;
                for (i, item) in s.items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "}}")
            }
            Value::List(l) => {
                let items = l.read().clone();
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Map(m) => {
                let entries = m.read().clone();
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Value::Set(s) => {
                let items = s.read().clone();
                write!(f, "{{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "}}")
            }
            Value::Buffer(b) => {
                write!(f, "buffer(b{:?})", String::from_utf8_lossy(&b.read()))
            }
            Value::Object(o) => write!(f, "<{} object>", o.shape().name()),
            Value::Func(_) => write!(f, "<function>"),
            Value::Ref(r) => write!(f, "{r}"),
            Value::Computed(c) => write!(f, "{c}"),
            Value::Proxy(p) => write!(f, "{p}"),
        }
    }
}

// ----------------------------------------------------------------------------
// Conversions
// ----------------------------------------------------------------------------

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Unit
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Arc::from(s.as_str()))
    }
}

impl From<Key> for Value {
    fn from(key: Key) -> Self {
        key.to_value()
    }
}

impl From<&Key> for Value {
    fn from(key: &Key) -> Self {
        key.to_value()
    }
}
