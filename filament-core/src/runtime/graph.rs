//! The dependency graph.
//!
//! The graph is a process-wide two-level table: observable id, then
//! dependency key, then the set of subscribed effects. Reads insert the
//! current effect into the set for the touched `(observable, key)` slot;
//! writes look the slot up and dispatch every subscriber.
//!
//! # Ordering
//!
//! Within one trigger, computed-backed subscribers are dispatched before
//! plain subscribers. A plain effect that reads a computed ref therefore
//! always observes a freshly invalidated (or freshly recomputed) value,
//! never a stale one.
//!
//! # Consistency
//!
//! Every effect records each `(observable, key)` slot it has been inserted
//! into, so `Effect::stop` can remove the effect from exactly the sets that
//! contain it. The subscriber set is snapshotted before dispatch because a
//! subscriber re-run typically re-subscribes while the trigger is still
//! iterating.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::fmt;
use std::sync::{Arc, OnceLock};

use indexmap::IndexSet;
use parking_lot::RwLock;

use super::stack;
use crate::effect::{Effect, EffectId};
use crate::trace;
use crate::value::ObjId;

/// Dependency key within one observable.
///
/// `Value` is the whole-container sentinel used for operations that cannot
/// be attributed to a single member (indexing, iteration, length, container
/// mutators, and the `value` slot of refs). Attribute reads and writes get
/// per-name keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DepKey {
    Value,
    Attr(Arc<str>),
}

impl DepKey {
    pub fn attr(name: &str) -> Self {
        DepKey::Attr(Arc::from(name))
    }
}

impl fmt::Display for DepKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DepKey::Value => write!(f, "value"),
            DepKey::Attr(name) => write!(f, "{name}"),
        }
    }
}

/// Set member wrapper hashing effects by id.
#[derive(Clone)]
struct Subscriber(Arc<Effect>);

impl PartialEq for Subscriber {
    fn eq(&self, other: &Self) -> bool {
        self.0.id() == other.0.id()
    }
}

impl Eq for Subscriber {}

impl Hash for Subscriber {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id().hash(state);
    }
}

type DepTable = HashMap<ObjId, HashMap<DepKey, IndexSet<Subscriber>>>;

static DEPS: OnceLock<RwLock<DepTable>> = OnceLock::new();

fn deps() -> &'static RwLock<DepTable> {
    DEPS.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Record that the current effect (if any) depends on `(obj, key)`.
pub(crate) fn track(kind: &'static str, obj: ObjId, key: DepKey) {
    let Some(effect) = stack::current() else {
        return;
    };

    trace::track(kind, obj, &key);

    {
        let mut table = deps().write();
        table
            .entry(obj)
            .or_default()
            .entry(key.clone())
            .or_default()
            .insert(Subscriber(Arc::clone(&effect)));
    }

    // Back-reference for O(set-count) teardown on stop.
    effect.record_dep(obj, key);
}

/// Notify every subscriber of `(obj, key)`.
pub(crate) fn trigger(kind: &'static str, obj: ObjId, key: &DepKey) {
    let snapshot: Vec<Arc<Effect>> = {
        let table = deps().read();
        table
            .get(&obj)
            .and_then(|slots| slots.get(key))
            .map(|set| set.iter().map(|s| Arc::clone(&s.0)).collect())
            .unwrap_or_default()
    };

    trace::trigger(kind, obj, key, snapshot.len());

    for effect in &snapshot {
        if effect.is_computed_backed() {
            dispatch(effect);
        }
    }
    for effect in &snapshot {
        if !effect.is_computed_backed() {
            dispatch(effect);
        }
    }
}

fn dispatch(effect: &Arc<Effect>) {
    match effect.scheduler() {
        Some(scheduler) => (*scheduler)(),
        None => {
            effect.run();
        }
    }
}

/// Remove an effect from one `(obj, key)` subscriber set.
///
/// Called by `Effect::stop` for each recorded back-reference.
pub(crate) fn remove_subscriber(obj: ObjId, key: &DepKey, effect_id: EffectId) {
    let mut table = deps().write();
    if let Some(slots) = table.get_mut(&obj) {
        if let Some(set) = slots.get_mut(key) {
            set.retain(|s| s.0.id() != effect_id);
        }
    }
}

/// Drop every subscriber set belonging to an observable.
///
/// Called by `release` when a value is manually reclaimed. Back-references
/// held by still-live effects become stale no-ops; `remove_subscriber`
/// tolerates missing slots.
pub(crate) fn drop_observable(obj: ObjId) {
    deps().write().remove(&obj);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn track_is_a_noop_without_an_active_effect() {
        let obj = ObjId::new();
        track("test", obj, DepKey::Value);

        let table = deps().read();
        assert!(table.get(&obj).is_none());
    }

    #[test]
    fn trigger_runs_subscribers_recorded_by_track() {
        let obj = ObjId::new();
        let runs = Arc::new(AtomicI32::new(0));

        let runs_clone = Arc::clone(&runs);
        let effect = Effect::new(move || {
            runs_clone.fetch_add(1, Ordering::SeqCst);
            Value::Unit
        });

        {
            let _guard = stack::ActiveGuard::enter(Arc::clone(&effect));
            track("test", obj, DepKey::Value);
        }

        trigger("test", obj, &DepKey::Value);
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        trigger("test", obj, &DepKey::Value);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn attribute_keys_are_independent_slots() {
        let obj = ObjId::new();
        let runs = Arc::new(AtomicI32::new(0));

        let runs_clone = Arc::clone(&runs);
        let effect = Effect::new(move || {
            runs_clone.fetch_add(1, Ordering::SeqCst);
            Value::Unit
        });

        {
            let _guard = stack::ActiveGuard::enter(Arc::clone(&effect));
            track("test", obj, DepKey::attr("x"));
        }

        trigger("test", obj, &DepKey::attr("y"));
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        trigger("test", obj, &DepKey::attr("x"));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn removed_subscribers_are_not_dispatched() {
        let obj = ObjId::new();
        let runs = Arc::new(AtomicI32::new(0));

        let runs_clone = Arc::clone(&runs);
        let effect = Effect::new(move || {
            runs_clone.fetch_add(1, Ordering::SeqCst);
            Value::Unit
        });

        {
            let _guard = stack::ActiveGuard::enter(Arc::clone(&effect));
            track("test", obj, DepKey::Value);
        }

        remove_subscriber(obj, &DepKey::Value, effect.id());
        trigger("test", obj, &DepKey::Value);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }
}
