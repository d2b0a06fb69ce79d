//! End-to-end scenarios for the reactivity runtime.
//!
//! These tests exercise the whole pipeline at once: proxies feeding the
//! dependency graph, computed chains re-evaluating before plain effects,
//! watchers over mixed sources, and serialization of wrapped structures.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};

use filament_core::{
    computed, effect, is_reactive, reactive, ref_, to_json, watch_many, Value, WatchCallback,
    WatchOptions, WatchSource,
};

/// Nested containers become observable on first read, and mutations deep in
/// the structure reach effects subscribed through the nesting.
#[test]
fn nested_reactive_mutation_triggers_readers() {
    let o = reactive(Value::map([("nested", Value::map([("foo", 1)]))]));
    assert!(is_reactive(&o.get_item("nested").unwrap()));

    let dummy = Arc::new(AtomicI32::new(-1));
    {
        let o = o.clone();
        let dummy = Arc::clone(&dummy);
        effect(move || {
            let foo = o
                .get_item("nested")
                .unwrap()
                .get_item("foo")
                .unwrap()
                .as_int()
                .unwrap();
            dummy.store(foo as i32, Ordering::SeqCst);
        });
    }

    assert_eq!(dummy.load(Ordering::SeqCst), 1);
    o.get_item("nested").unwrap().set_item("foo", 2).unwrap();
    assert_eq!(dummy.load(Ordering::SeqCst), 2);
}

/// A ref inside a reactive mapping reads as its payload and absorbs writes.
#[test]
fn ref_in_reactive_auto_unwrap() {
    let r = ref_(0);
    let s = reactive(Value::map([("a", r.clone())]));

    assert_eq!(s.get_item("a").unwrap(), Value::Int(0));
    s.set_item("a", 1).unwrap();
    assert_eq!(r.get().unwrap(), Value::Int(1));
}

/// Chained computeds recompute exactly as far as their inputs changed.
#[test]
fn computed_chain() {
    let v = reactive(Value::map([("foo", 0)]));
    let c1 = {
        let v = v.clone();
        computed(move || v.get_item("foo").unwrap())
    };
    let c2 = {
        let c1 = c1.clone();
        computed(move || Value::Int(c1.get().unwrap().as_int().unwrap() + 1))
    };

    assert_eq!(c2.get().unwrap(), Value::Int(1));
    v.set_item("foo", 1).unwrap();
    assert_eq!(c2.get().unwrap(), Value::Int(2));
}

/// A plain effect reading a computed observes the freshly recomputed value
/// when the underlying ref changes (computed-backed subscribers dispatch
/// first).
#[test]
fn computed_refreshes_before_plain_effects() {
    let r = ref_(1);
    let c = {
        let r = r.clone();
        computed(move || Value::Int(r.get().unwrap().as_int().unwrap() * 10))
    };

    let seen: Arc<Mutex<Vec<i64>>> = Arc::new(Mutex::new(Vec::new()));
    {
        let c = c.clone();
        let seen = Arc::clone(&seen);
        effect(move || {
            seen.lock()
                .unwrap()
                .push(c.get().unwrap().as_int().unwrap());
        });
    }

    r.set(2).unwrap();
    r.set(3).unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![10, 20, 30]);
}

/// Multi-source watch: getter over reactive state, a ref, and a computed.
#[test]
fn watch_multi_source_snapshots() {
    let state = reactive(Value::map([("count", 1)]));
    let count = ref_(1);
    let plus = {
        let count = count.clone();
        computed(move || Value::Int(count.get().unwrap().as_int().unwrap() + 1))
    };

    let observed: Arc<Mutex<Option<(Value, Value)>>> = Arc::new(Mutex::new(None));
    {
        let state = state.clone();
        let observed = Arc::clone(&observed);
        watch_many(
            vec![
                WatchSource::getter(move || state.get_item("count").unwrap()),
                count.clone().into(),
                plus.into(),
            ],
            WatchCallback::new_old(move |vals, old_vals| {
                *observed.lock().unwrap() = Some((vals, old_vals));
            }),
            WatchOptions::default(),
        )
        .unwrap();
    }

    let c = state.get_item("count").unwrap().as_int().unwrap();
    state.set_item("count", c + 1).unwrap();
    assert_eq!(
        *observed.lock().unwrap(),
        Some((Value::list([2, 1, 2]), Value::list([1, 1, 2])))
    );

    let c = count.get().unwrap().as_int().unwrap();
    count.set(c + 1).unwrap();
    assert_eq!(
        *observed.lock().unwrap(),
        Some((Value::list([2, 2, 3]), Value::list([2, 1, 2])))
    );
}

/// Serializing a structure wrapped in refs at several depths matches the
/// plain structure byte for byte.
#[test]
fn serialization_round_trip_ignores_refs() {
    let wrapped = ref_(Value::map([
        (
            "foo",
            ref_(Value::map([(
                "bar",
                Value::list([ref_(1), Value::Int(2), Value::Int(3)]),
            )])),
        ),
        ("baz", ref_(1)),
    ]));
    let plain = Value::map([
        ("foo", Value::map([("bar", Value::list([1, 2, 3]))])),
        ("baz", Value::Int(1)),
    ]);

    assert_eq!(to_json(&wrapped).unwrap(), to_json(&plain).unwrap());
}

/// Stopping an effect removes it from every subscriber set it was in.
#[test]
fn stopped_effects_drop_out_of_the_graph() {
    let a = reactive(Value::map([("x", 0)]));
    let b = reactive(Value::map([("y", 0)]));
    let runs = Arc::new(AtomicI32::new(0));

    let runner = {
        let a = a.clone();
        let b = b.clone();
        let runs = Arc::clone(&runs);
        effect(move || {
            let _ = a.get_item("x").unwrap();
            let _ = b.get_item("y").unwrap();
            runs.fetch_add(1, Ordering::SeqCst);
        })
    };

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    a.set_item("x", 1).unwrap();
    b.set_item("y", 1).unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 3);

    runner.stop();
    a.set_item("x", 2).unwrap();
    b.set_item("y", 2).unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 3);
}
