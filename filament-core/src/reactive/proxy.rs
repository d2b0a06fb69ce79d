//! The proxy type and its tracked operation surface.
//!
//! A `ReactiveProxy` pairs a raw value with a fresh identity. Every read
//! operation tracks before delegating to the raw storage; every write
//! delegates first and then triggers. Reads of container members re-wrap the
//! child (refs unwrap, mutable children become reactive), so dependency
//! capture follows the data no matter how deeply an effect reaches into it.
//!
//! Dependency keys: attribute accesses use per-name keys; everything that
//! touches the container as a whole (indexing, iteration, length, equality,
//! mutators) uses the value sentinel.

use std::fmt;
use std::sync::Arc;

use super::{ops, to_raw, wrap_child};
use crate::error::{Error, Result};
use crate::runtime::{self, DepKey};
use crate::trace;
use crate::value::{Key, ObjId, Value};

/// Transparent reactive wrapper over a raw container or object.
pub struct ReactiveProxy {
    id: ObjId,
    target: Value,
    readonly: bool,
}

impl ReactiveProxy {
    /// Wrap `target` (which must be a raw, id-bearing value) in a proxy.
    pub(crate) fn create(target: Value, readonly: bool) -> Value {
        let id = ObjId::new();
        if let Some(raw_id) = target.obj_id() {
            trace::create_proxy(target.kind(), raw_id, id);
        }
        Value::Proxy(Arc::new(Self {
            id,
            target,
            readonly,
        }))
    }

    /// The proxy's own identity (distinct from the raw value's).
    pub fn id(&self) -> ObjId {
        self.id
    }

    /// The raw value behind this proxy.
    pub fn target(&self) -> &Value {
        &self.target
    }

    /// Whether this proxy rejects mutation.
    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    fn is_list(&self) -> bool {
        matches!(self.target, Value::List(_))
    }

    pub(crate) fn track_value(&self) {
        runtime::track(self.target.kind(), self.id, DepKey::Value);
    }

    fn track_attr(&self, name: &str) {
        runtime::track(self.target.kind(), self.id, DepKey::attr(name));
    }

    pub(crate) fn trigger_value(&self) {
        runtime::trigger(self.target.kind(), self.id, &DepKey::Value);
    }

    fn trigger_attr(&self, name: &str) {
        runtime::trigger(self.target.kind(), self.id, &DepKey::attr(name));
    }

    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            Err(Error::ReadonlyViolation)
        } else {
            Ok(())
        }
    }

    // ------------------------------------------------------------------
    // Item access
    // ------------------------------------------------------------------

    pub(crate) fn get_item(&self, key: &Key) -> Result<Value> {
        self.track_value();
        let child = ops::raw_get_item(&self.target, key)?;
        Ok(wrap_child(child, self.is_list()))
    }

    pub(crate) fn set_item(&self, key: Key, value: Value) -> Result<()> {
        self.check_writable()?;
        // The raw backing store never holds proxies.
        let value = to_raw(&value);
        let old = ops::raw_get_item_opt(&self.target, &key).unwrap_or(Value::Unit);

        if old == value {
            return Ok(());
        }

        // Refs are transparent assignment targets: writing a plain value
        // over a ref slot writes through the ref instead of replacing it.
        if let Value::Ref(existing) = &old {
            if !matches!(value, Value::Ref(_) | Value::Computed(_)) {
                existing.set(value);
                return Ok(());
            }
        }

        ops::raw_set_item(&self.target, key, value)?;
        self.trigger_value();
        Ok(())
    }

    pub(crate) fn del_item(&self, key: &Key) -> Result<()> {
        self.check_writable()?;
        ops::raw_del_item(&self.target, key)?;
        self.trigger_value();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Attribute access
    // ------------------------------------------------------------------

    pub(crate) fn get_attr(this: &Arc<Self>, name: &str) -> Result<Value> {
        let Value::Object(obj) = &this.target else {
            return Err(Error::UnsupportedOperation {
                kind: this.target.kind(),
                op: "get_attr",
            });
        };
        this.track_attr(name);

        let receiver = Value::Proxy(Arc::clone(this));
        let result = if let Some(getter) = obj.shape().property(name).cloned() {
            // Accessors run against the proxy so the fields they read are
            // tracked for the current subscriber.
            (*getter)(&receiver)?
        } else if let Some(method) = obj.shape().method(name).cloned() {
            Value::func(move |args| (*method)(&receiver, args))
        } else if let Some(field) = obj.field(name) {
            field
        } else {
            return Err(Error::UnknownAttribute(name.to_string()));
        };

        Ok(wrap_child(result, false))
    }

    pub(crate) fn set_attr(&self, name: &str, value: Value) -> Result<()> {
        self.check_writable()?;
        let Value::Object(obj) = &self.target else {
            return Err(Error::UnsupportedOperation {
                kind: self.target.kind(),
                op: "set_attr",
            });
        };
        if obj.shape().property(name).is_some() {
            return Err(Error::ReadonlyAttribute(name.to_string()));
        }

        let value = to_raw(&value);
        let old = obj.field(name).unwrap_or(Value::Unit);

        if old == value {
            return Ok(());
        }

        if let Value::Ref(existing) = &old {
            if !matches!(value, Value::Ref(_) | Value::Computed(_)) {
                existing.set(value);
                return Ok(());
            }
        }

        obj.set_field(name, value);
        self.trigger_attr(name);
        Ok(())
    }

    pub(crate) fn del_attr(&self, name: &str) -> Result<()> {
        self.check_writable()?;
        let Value::Object(obj) = &self.target else {
            return Err(Error::UnsupportedOperation {
                kind: self.target.kind(),
                op: "del_attr",
            });
        };
        if obj.remove_field(name).is_none() {
            return Err(Error::UnknownAttribute(name.to_string()));
        }
        self.trigger_attr(name);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Whole-container reads
    // ------------------------------------------------------------------

    pub(crate) fn len(&self) -> Result<usize> {
        self.track_value();
        ops::raw_len(&self.target)
    }

    pub(crate) fn contains(&self, item: &Value) -> Result<bool> {
        self.track_value();
        ops::raw_contains(&self.target, item)
    }

    /// Iteration delegates to the raw value: children come back unwrapped,
    /// exactly as they are stored.
    pub(crate) fn iter_children(&self) -> Result<Vec<Value>> {
        self.track_value();
        ops::raw_iter_children(&self.target)
    }

    pub(crate) fn tracked_query<T>(
        &self,
        op: impl FnOnce(&Value) -> Result<T>,
    ) -> Result<T> {
        self.track_value();
        op(&self.target)
    }

    // ------------------------------------------------------------------
    // Whole-container writes
    // ------------------------------------------------------------------

    pub(crate) fn mutate<T>(&self, op: impl FnOnce(&Value) -> Result<T>) -> Result<T> {
        self.check_writable()?;
        let result = op(&self.target)?;
        self.trigger_value();
        Ok(result)
    }
}

impl fmt::Display for ReactiveProxy {
    /// Stringification is a read of the whole container.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.track_value();
        write!(f, "{}", self.target)
    }
}

impl fmt::Debug for ReactiveProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveProxy")
            .field("id", &self.id)
            .field("kind", &self.target.kind())
            .field("readonly", &self.readonly)
            .finish()
    }
}
