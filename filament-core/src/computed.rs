//! Computed refs: lazy memoized derived values.
//!
//! A computed ref owns an effect whose function is the user getter. The
//! effect's scheduler does not recompute; it only flips the dirty bit and
//! triggers the computed's own `value` slot. Recomputation happens on the
//! next read. This is what makes computeds lazy: a source can change many
//! times, and the getter runs at most once per read.
//!
//! # Chaining
//!
//! Computeds that read other computeds compose without duplicate work:
//! within one trigger, computed-backed effects are dispatched before plain
//! effects, so by the time a plain effect reads a chain of computeds, every
//! link is either freshly invalidated or a clean cache hit.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::effect::Effect;
use crate::runtime::{self, DepKey};
use crate::value::{ObjId, Value};

/// A lazy, readonly, memoized observable cell.
pub struct ComputedValue {
    id: ObjId,
    value: RwLock<Value>,
    dirty: AtomicBool,
    cacheable: bool,
    effect: Arc<Effect>,
}

impl ComputedValue {
    fn new(getter: impl Fn() -> Value + Send + Sync + 'static) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<ComputedValue>| {
            let id = ObjId::new();
            let handle = weak.clone();
            let scheduler = Arc::new(move || {
                if let Some(cell) = handle.upgrade() {
                    cell.invalidate();
                }
            });
            Self {
                id,
                value: RwLock::new(Value::Unit),
                dirty: AtomicBool::new(true),
                cacheable: true,
                effect: Effect::for_computed(getter, scheduler),
            }
        })
    }

    pub fn id(&self) -> ObjId {
        self.id
    }

    /// The inner effect. Stopping it freezes the cell: reads keep returning
    /// the cached value but no longer track or resubscribe.
    pub fn effect(&self) -> &Arc<Effect> {
        &self.effect
    }

    /// Tracked read, recomputing first when the cache is stale.
    pub fn get(&self) -> Value {
        runtime::track("computed", self.id, DepKey::Value);
        if self.dirty.swap(false, Ordering::SeqCst) {
            let value = self.effect.run();
            *self.value.write() = value;
        }
        self.value.read().clone()
    }

    /// Scheduler body: mark stale and notify readers, but only on the
    /// clean-to-dirty transition so repeated source changes collapse into
    /// one notification per read.
    fn invalidate(&self) {
        if !self.dirty.swap(true, Ordering::SeqCst) {
            runtime::trigger("computed", self.id, &DepKey::Value);
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    pub fn is_cacheable(&self) -> bool {
        self.cacheable
    }

    /// Stop tracking and recomputing. Subsequent reads still evaluate the
    /// getter if the cache was never filled, but without subscribing.
    pub fn stop(&self) {
        self.effect.stop();
    }
}

impl fmt::Display for ComputedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.value.read();
        write!(f, "<ComputedRef[{}] value={}>", value.kind(), value)
    }
}

impl fmt::Debug for ComputedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputedValue")
            .field("id", &self.id)
            .field("dirty", &self.is_dirty())
            .finish()
    }
}

/// Create a lazy computed ref from a getter. The getter does not run until
/// the first read.
pub fn computed(getter: impl Fn() -> Value + Send + Sync + 'static) -> Value {
    Value::Computed(ComputedValue::new(getter))
}

/// Whether the value is a computed ref.
pub fn is_computed_ref(value: &Value) -> bool {
    matches!(value, Value::Computed(_))
}

/// Whether the value is readonly: computed refs and readonly views.
pub fn is_readonly(value: &Value) -> bool {
    match value {
        Value::Computed(_) => true,
        Value::Proxy(p) => p.is_readonly(),
        _ => false,
    }
}

impl Value {
    /// Borrow the underlying computed cell, if this value is a computed
    /// ref.
    pub fn as_computed_cell(&self) -> Option<&Arc<ComputedValue>> {
        match self {
            Value::Computed(c) => Some(c),
            _ => None,
        }
    }
}
