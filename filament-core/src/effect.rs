//! Effects: re-runnable subscribers.
//!
//! An effect wraps a user function. While the function runs, every
//! observable it reads registers the effect as a subscriber; when any of
//! those observables changes, the effect is dispatched again, either through
//! its scheduler (computed refs use this for lazy invalidation) or by
//! calling `run` directly.
//!
//! # Lifecycle
//!
//! Effects stay subscribed until `stop` is called. A stopped effect still
//! evaluates its function when run explicitly, but without entering the
//! active-subscriber stack, so it no longer accumulates subscriptions and is
//! never re-dispatched.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::runtime::{self, ActiveGuard, DepKey};
use crate::value::{ObjId, Value};

/// Unique identifier for an effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EffectId(u64);

impl EffectId {
    fn new() -> Self {
        use std::sync::atomic::AtomicU64;
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

type EffectFn = Box<dyn Fn() -> Value + Send + Sync>;
type Scheduler = Arc<dyn Fn() + Send + Sync>;

/// A re-runnable unit of computation subscribed to the observables it reads.
pub struct Effect {
    id: EffectId,
    active: AtomicBool,
    func: EffectFn,
    scheduler: Option<Scheduler>,
    computed_backed: bool,
    /// Handle to this effect's own allocation, for the active-stack entry.
    this: Weak<Effect>,
    /// Every `(observable, key)` slot this effect has been inserted into.
    back_deps: Mutex<SmallVec<[(ObjId, DepKey); 4]>>,
}

impl Effect {
    fn build(
        func: impl Fn() -> Value + Send + Sync + 'static,
        scheduler: Option<Scheduler>,
        computed_backed: bool,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            id: EffectId::new(),
            active: AtomicBool::new(true),
            func: Box::new(func),
            scheduler,
            computed_backed,
            this: this.clone(),
            back_deps: Mutex::new(SmallVec::new()),
        })
    }

    /// Create an effect without running it.
    pub fn new(func: impl Fn() -> Value + Send + Sync + 'static) -> Arc<Self> {
        Self::build(func, None, false)
    }

    /// Create an effect dispatched through `scheduler` instead of `run`.
    pub fn with_scheduler(
        func: impl Fn() -> Value + Send + Sync + 'static,
        scheduler: Scheduler,
    ) -> Arc<Self> {
        Self::build(func, Some(scheduler), false)
    }

    /// Create the inner effect of a computed ref.
    ///
    /// Computed-backed effects are dispatched before plain effects within a
    /// trigger, which keeps memoized values fresh for their readers.
    pub(crate) fn for_computed(
        func: impl Fn() -> Value + Send + Sync + 'static,
        scheduler: Scheduler,
    ) -> Arc<Self> {
        Self::build(func, Some(scheduler), true)
    }

    pub fn id(&self) -> EffectId {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub(crate) fn is_computed_backed(&self) -> bool {
        self.computed_backed
    }

    pub(crate) fn scheduler(&self) -> Option<Scheduler> {
        self.scheduler.clone()
    }

    /// Evaluate the effect function.
    ///
    /// Active effects run on the active-subscriber stack so their reads are
    /// captured; stopped effects evaluate without tracking. The stack entry
    /// is popped even if the function panics.
    pub fn run(&self) -> Value {
        let handle = self.this.upgrade().filter(|_| self.is_active());
        let _guard = handle.map(ActiveGuard::enter);
        (self.func)()
    }

    /// Unsubscribe from every dependency and deactivate.
    ///
    /// Idempotent: a second call finds no back-references and an already
    /// cleared active flag.
    pub fn stop(&self) {
        let deps: SmallVec<[(ObjId, DepKey); 4]> = std::mem::take(&mut *self.back_deps.lock());
        for (obj, key) in &deps {
            runtime::remove_subscriber(*obj, key, self.id);
        }
        self.active.store(false, Ordering::SeqCst);
    }

    /// Record a `(observable, key)` slot this effect was inserted into.
    pub(crate) fn record_dep(&self, obj: ObjId, key: DepKey) {
        let mut deps = self.back_deps.lock();
        if !deps.iter().any(|(o, k)| *o == obj && *k == key) {
            deps.push((obj, key));
        }
    }

    #[cfg(test)]
    pub(crate) fn dep_count(&self) -> usize {
        self.back_deps.lock().len()
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .field("computed_backed", &self.computed_backed)
            .field("dep_slots", &self.back_deps.lock().len())
            .finish()
    }
}

/// Construct an effect, run it once to capture its dependencies, and return
/// it.
pub fn effect(func: impl Fn() + Send + Sync + 'static) -> Arc<Effect> {
    let e = Effect::new(move || {
        func();
        Value::Unit
    });
    e.run();
    e
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
