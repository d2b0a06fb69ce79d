//! Watchers: sources, change detection, callbacks, cleanup.
//!
//! `watch` observes one source (or several, via `watch_many`) and invokes a
//! callback when the observed values change. `watch_effect` is the
//! source-less variant: it just re-runs a function whenever anything it read
//! changes.
//!
//! # Sources
//!
//! A source is a ref, a computed ref, a reactive proxy, or a getter
//! closure. Anything else is rejected with
//! [`Error::InvalidWatchSource`]. Reactive-proxy sources force a deep
//! traversal: the proxy itself never changes identity, so the watcher
//! touches every nested slot to subscribe to them.
//!
//! # Change detection
//!
//! For each source, the callback fires when the new value differs from the
//! old by equality, or - for values that are not immutable builtins - when
//! new and old are the same object (an in-place mutation cannot be detected
//! by equality, so identity forces the callback). Equality is checked
//! first.
//!
//! # Cleanup
//!
//! A callback registered through [`OnCleanup`] runs before every subsequent
//! invocation of the watcher and once when the watcher is stopped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::effect::effect;
use crate::error::{Error, Result};
use crate::reactive::is_reactive;
use crate::refs::is_ref;
use crate::value::{Key, Value};

type CleanupFn = Arc<dyn Fn() + Send + Sync>;
type CleanupSlot = Arc<Mutex<Option<CleanupFn>>>;

/// Registrar handed to callbacks that accept a cleanup hook.
pub struct OnCleanup {
    slot: CleanupSlot,
}

impl OnCleanup {
    /// Register the cleanup to run before the next invocation and on stop.
    /// Replaces any previously registered cleanup.
    pub fn register(&self, f: impl Fn() + Send + Sync + 'static) {
        *self.slot.lock() = Some(Arc::new(f));
    }
}

/// Handle that deactivates a watcher.
///
/// Stopping is a flag flip plus one final cleanup: the underlying effect
/// stays subscribed, but its wrapper becomes a no-op.
#[derive(Clone)]
pub struct StopHandle {
    stop: Arc<dyn Fn() + Send + Sync>,
}

impl StopHandle {
    fn new(stop: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            stop: Arc::new(stop),
        }
    }

    pub fn stop(&self) {
        (*self.stop)();
    }
}

/// One watchable input.
pub enum WatchSource {
    /// A ref, computed ref, or reactive proxy.
    Value(Value),
    /// A getter closure evaluated on every run.
    Getter(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl WatchSource {
    pub fn getter(f: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        WatchSource::Getter(Arc::new(f))
    }
}

impl From<Value> for WatchSource {
    fn from(value: Value) -> Self {
        WatchSource::Value(value)
    }
}

/// Options accepted by `watch`. `watch_effect` takes none, by construction.
#[derive(Debug, Clone, Copy, Default)]
pub struct WatchOptions {
    /// Recursively touch nested slots of observed values, so changes deep
    /// inside a structure fire the callback. Forced on for reactive-proxy
    /// sources.
    pub deep: bool,
    /// Invoke the callback on the first run, with old-value slots holding
    /// unit.
    pub immediate: bool,
}

/// Watch callback, tagged by the data it wants.
///
/// In multi-source mode the `new` and `old` arguments are lists with one
/// slot per source; old slots that have never been filled hold unit.
pub enum WatchCallback {
    Bare(Box<dyn Fn() + Send + Sync>),
    New(Box<dyn Fn(Value) + Send + Sync>),
    NewOld(Box<dyn Fn(Value, Value) + Send + Sync>),
    NewOldCleanup(Box<dyn Fn(Value, Value, &OnCleanup) + Send + Sync>),
}

impl WatchCallback {
    pub fn bare(f: impl Fn() + Send + Sync + 'static) -> Self {
        WatchCallback::Bare(Box::new(f))
    }

    pub fn new_value(f: impl Fn(Value) + Send + Sync + 'static) -> Self {
        WatchCallback::New(Box::new(f))
    }

    pub fn new_old(f: impl Fn(Value, Value) + Send + Sync + 'static) -> Self {
        WatchCallback::NewOld(Box::new(f))
    }

    pub fn new_old_cleanup(f: impl Fn(Value, Value, &OnCleanup) + Send + Sync + 'static) -> Self {
        WatchCallback::NewOldCleanup(Box::new(f))
    }
}

/// Watch a single source.
pub fn watch(
    source: impl Into<WatchSource>,
    callback: WatchCallback,
    options: WatchOptions,
) -> Result<StopHandle> {
    watch_impl(vec![source.into()], true, callback, options)
}

/// Watch several sources; the callback receives value lists.
pub fn watch_many(
    sources: Vec<WatchSource>,
    callback: WatchCallback,
    options: WatchOptions,
) -> Result<StopHandle> {
    watch_impl(sources, false, callback, options)
}

struct WatchState {
    stopped: AtomicBool,
    first_run: AtomicBool,
    cleanup: CleanupSlot,
    old_values: Mutex<Vec<Value>>,
}

fn watch_impl(
    sources: Vec<WatchSource>,
    single_mode: bool,
    callback: WatchCallback,
    options: WatchOptions,
) -> Result<StopHandle> {
    // Validate before subscribing anything.
    for source in &sources {
        if let WatchSource::Value(value) = source {
            if !is_ref(value) && !is_reactive(value) {
                return Err(Error::InvalidWatchSource(value.kind()));
            }
        }
    }

    let accessors: Vec<Box<dyn Fn() -> Value + Send + Sync>> = sources
        .into_iter()
        .map(|source| make_accessor(source, options.deep))
        .collect();

    let count = accessors.len();
    let state = Arc::new(WatchState {
        stopped: AtomicBool::new(false),
        first_run: AtomicBool::new(true),
        cleanup: Arc::new(Mutex::new(None)),
        old_values: Mutex::new(vec![Value::Unit; count]),
    });

    let wrapper_state = Arc::clone(&state);
    let immediate = options.immediate;
    effect(move || {
        if wrapper_state.stopped.load(Ordering::SeqCst) {
            return;
        }

        let registered = wrapper_state.cleanup.lock().clone();
        if let Some(cleanup) = registered {
            (*cleanup)();
        }

        let was_first = wrapper_state.first_run.swap(false, Ordering::SeqCst);
        let new_values: Vec<Value> = accessors.iter().map(|read| read()).collect();

        let skip = {
            let old_values = wrapper_state.old_values.lock();
            !values_changed(&new_values, old_values.as_slice())
        };

        if was_first && !immediate {
            *wrapper_state.old_values.lock() = new_values;
            return;
        }
        if skip {
            return;
        }

        let old_snapshot: Vec<Value> = wrapper_state.old_values.lock().clone();
        let on_cleanup = OnCleanup {
            slot: Arc::clone(&wrapper_state.cleanup),
        };

        match &callback {
            WatchCallback::Bare(f) => f(),
            WatchCallback::New(f) => f(pack(&new_values, single_mode)),
            WatchCallback::NewOld(f) => {
                f(pack(&new_values, single_mode), pack(&old_snapshot, single_mode))
            }
            WatchCallback::NewOldCleanup(f) => f(
                pack(&new_values, single_mode),
                pack(&old_snapshot, single_mode),
                &on_cleanup,
            ),
        }

        *wrapper_state.old_values.lock() = new_values;
    });

    let stop_state = state;
    Ok(StopHandle::new(move || {
        stop_state.stopped.store(true, Ordering::SeqCst);
        let cleanup = stop_state.cleanup.lock().take();
        if let Some(cleanup) = cleanup {
            (*cleanup)();
        }
    }))
}

fn make_accessor(source: WatchSource, deep: bool) -> Box<dyn Fn() -> Value + Send + Sync> {
    match source {
        WatchSource::Getter(f) => Box::new(move || {
            let value = (*f)();
            if deep {
                deeply_walk(&value);
            }
            value
        }),
        WatchSource::Value(value) if is_reactive(&value) => Box::new(move || {
            // The proxy is its own new value; subscribing means walking it.
            deeply_walk(&value);
            value.clone()
        }),
        WatchSource::Value(value) => Box::new(move || {
            let read = value.get().unwrap_or(Value::Unit);
            if deep {
                deeply_walk(&read);
            }
            read
        }),
    }
}

/// Per-slot change gate. Equality first; identity only matters for values
/// that can mutate in place.
fn values_changed(new_values: &[Value], old_values: &[Value]) -> bool {
    for (new_value, old_value) in new_values.iter().zip(old_values.iter()) {
        if new_value != old_value {
            return true;
        }
        // Same object and mutable: equality cannot prove nothing changed.
        if !new_value.is_immutable_builtin() && new_value.is(old_value) {
            return true;
        }
    }
    false
}

/// Touch every nested slot of a value so the current effect subscribes to
/// it. Refs unwrap (a tracked read), mappings recurse through tracked item
/// reads, lists and sets through tracked iteration. Tuples and frozen sets
/// are not descended.
fn deeply_walk(value: &Value) {
    let value = match value {
        Value::Ref(r) => r.get(),
        Value::Computed(c) => c.get(),
        other => other.clone(),
    };
    let Value::Proxy(proxy) = &value else {
        return;
    };
    match proxy.target() {
        Value::Map(_) => {
            let Ok(keys) = value.iter() else { return };
            for key in keys {
                let Ok(key) = Key::try_from(&key) else {
                    continue;
                };
                if let Ok(child) = value.get_item(key) {
                    deeply_walk(&child);
                }
            }
        }
        Value::List(_) | Value::Set(_) => {
            let Ok(children) = value.iter() else { return };
            for child in children {
                deeply_walk(&child);
            }
        }
        _ => {}
    }
}

fn pack(values: &[Value], single_mode: bool) -> Value {
    if single_mode {
        values.first().cloned().unwrap_or(Value::Unit)
    } else {
        Value::list(values.to_vec())
    }
}

/// Re-run a function whenever anything it reads changes.
///
/// Returns a stop handle; after stopping, pending re-runs become no-ops and
/// the registered cleanup (if any) fires once.
pub fn watch_effect(f: impl Fn() + Send + Sync + 'static) -> StopHandle {
    watch_effect_impl(Box::new(move |_| f()))
}

/// `watch_effect` for functions that register cleanups.
pub fn watch_effect_with(f: impl Fn(&OnCleanup) + Send + Sync + 'static) -> StopHandle {
    watch_effect_impl(Box::new(f))
}

fn watch_effect_impl(f: Box<dyn Fn(&OnCleanup) + Send + Sync>) -> StopHandle {
    let stopped = Arc::new(AtomicBool::new(false));
    let cleanup: CleanupSlot = Arc::new(Mutex::new(None));

    let wrapper_stopped = Arc::clone(&stopped);
    let wrapper_cleanup = Arc::clone(&cleanup);
    effect(move || {
        if wrapper_stopped.load(Ordering::SeqCst) {
            return;
        }
        let registered = wrapper_cleanup.lock().clone();
        if let Some(run_cleanup) = registered {
            (*run_cleanup)();
        }
        let on_cleanup = OnCleanup {
            slot: Arc::clone(&wrapper_cleanup),
        };
        f(&on_cleanup);
    });

    StopHandle::new(move || {
        stopped.store(true, Ordering::SeqCst);
        let registered = cleanup.lock().take();
        if let Some(run_cleanup) = registered {
            (*run_cleanup)();
        }
    })
}
