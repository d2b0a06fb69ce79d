//! Integration tests for computed refs.
//!
//! These verify lazy evaluation, caching, invalidation through reactive
//! dependencies, chained computeds (including the no-duplicate-dispatch
//! guarantee), and disposal of the inner effect.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use filament_core::{computed, effect, reactive, Value};

#[test]
fn returns_the_updated_value() {
    let value = reactive(Value::map([("foo", 0)]));
    let c_value = {
        let value = value.clone();
        computed(move || value.get_item("foo").unwrap())
    };

    assert_eq!(c_value.get().unwrap(), Value::Int(0));
    value.set_item("foo", 1).unwrap();
    assert_eq!(c_value.get().unwrap(), Value::Int(1));
}

#[test]
fn computes_lazily() {
    let value = reactive(Value::map([("foo", 0)]));
    let calls = Arc::new(AtomicI32::new(0));

    let c_value = {
        let value = value.clone();
        let calls = Arc::clone(&calls);
        computed(move || {
            calls.fetch_add(1, Ordering::SeqCst);
            value.get_item("foo").unwrap()
        })
    };

    // lazy
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(c_value.get().unwrap(), Value::Int(0));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // should not compute again
    let _ = c_value.get().unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // should not compute until needed
    value.set_item("foo", 1).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // now it should compute
    assert_eq!(c_value.get().unwrap(), Value::Int(1));
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // should not compute again
    let _ = c_value.get().unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn triggers_effects() {
    let value = reactive(Value::map([("foo", 0)]));
    let c_value = {
        let value = value.clone();
        computed(move || value.get_item("foo").unwrap())
    };

    let dummy = Arc::new(AtomicI32::new(-1));
    {
        let dummy = Arc::clone(&dummy);
        let c_value = c_value.clone();
        effect(move || {
            let v = c_value.get().unwrap().as_int().unwrap();
            dummy.store(v as i32, Ordering::SeqCst);
        });
    }

    assert_eq!(dummy.load(Ordering::SeqCst), 0);
    value.set_item("foo", 1).unwrap();
    assert_eq!(dummy.load(Ordering::SeqCst), 1);
}

#[test]
fn works_when_chained() {
    let value = reactive(Value::map([("foo", 0)]));
    let c1 = {
        let value = value.clone();
        computed(move || value.get_item("foo").unwrap())
    };
    let c2 = {
        let c1 = c1.clone();
        computed(move || {
            let base = c1.get().unwrap().as_int().unwrap();
            Value::Int(base + 1)
        })
    };

    assert_eq!(c2.get().unwrap(), Value::Int(1));
    assert_eq!(c1.get().unwrap(), Value::Int(0));

    value.set_item("foo", 1).unwrap();
    assert_eq!(c2.get().unwrap(), Value::Int(2));
    assert_eq!(c1.get().unwrap(), Value::Int(1));
}

#[test]
fn triggers_effects_when_chained() {
    let value = reactive(Value::map([("foo", 0)]));
    let getter1_calls = Arc::new(AtomicI32::new(0));
    let getter2_calls = Arc::new(AtomicI32::new(0));

    let c1 = {
        let value = value.clone();
        let calls = Arc::clone(&getter1_calls);
        computed(move || {
            calls.fetch_add(1, Ordering::SeqCst);
            value.get_item("foo").unwrap()
        })
    };
    let c2 = {
        let c1 = c1.clone();
        let calls = Arc::clone(&getter2_calls);
        computed(move || {
            calls.fetch_add(1, Ordering::SeqCst);
            let base = c1.get().unwrap().as_int().unwrap();
            Value::Int(base + 1)
        })
    };

    let dummy = Arc::new(AtomicI32::new(-1));
    {
        let dummy = Arc::clone(&dummy);
        let c2 = c2.clone();
        effect(move || {
            let v = c2.get().unwrap().as_int().unwrap();
            dummy.store(v as i32, Ordering::SeqCst);
        });
    }

    assert_eq!(dummy.load(Ordering::SeqCst), 1);
    assert_eq!(getter1_calls.load(Ordering::SeqCst), 1);
    assert_eq!(getter2_calls.load(Ordering::SeqCst), 1);

    value.set_item("foo", 1).unwrap();
    assert_eq!(dummy.load(Ordering::SeqCst), 2);
    // should not result in duplicate calls
    assert_eq!(getter1_calls.load(Ordering::SeqCst), 2);
    assert_eq!(getter2_calls.load(Ordering::SeqCst), 2);
}

#[test]
fn triggers_effects_when_chained_mixed_invocations() {
    let value = reactive(Value::map([("foo", 0)]));
    let getter1_calls = Arc::new(AtomicI32::new(0));
    let getter2_calls = Arc::new(AtomicI32::new(0));

    let c1 = {
        let value = value.clone();
        let calls = Arc::clone(&getter1_calls);
        computed(move || {
            calls.fetch_add(1, Ordering::SeqCst);
            value.get_item("foo").unwrap()
        })
    };
    let c2 = {
        let c1 = c1.clone();
        let calls = Arc::clone(&getter2_calls);
        computed(move || {
            calls.fetch_add(1, Ordering::SeqCst);
            let base = c1.get().unwrap().as_int().unwrap();
            Value::Int(base + 1)
        })
    };

    let dummy = Arc::new(AtomicI32::new(-1));
    {
        let dummy = Arc::clone(&dummy);
        let c1 = c1.clone();
        let c2 = c2.clone();
        effect(move || {
            let sum =
                c1.get().unwrap().as_int().unwrap() + c2.get().unwrap().as_int().unwrap();
            dummy.store(sum as i32, Ordering::SeqCst);
        });
    }

    assert_eq!(dummy.load(Ordering::SeqCst), 1);
    assert_eq!(getter1_calls.load(Ordering::SeqCst), 1);
    assert_eq!(getter2_calls.load(Ordering::SeqCst), 1);

    value.set_item("foo", 1).unwrap();
    assert_eq!(dummy.load(Ordering::SeqCst), 3);
    // should not result in duplicate calls
    assert_eq!(getter1_calls.load(Ordering::SeqCst), 2);
    assert_eq!(getter2_calls.load(Ordering::SeqCst), 2);
}

#[test]
fn no_longer_updates_when_stopped() {
    let value = reactive(Value::map([("foo", 0)]));
    let c_value = {
        let value = value.clone();
        computed(move || value.get_item("foo").unwrap())
    };

    let dummy = Arc::new(AtomicI32::new(-1));
    {
        let dummy = Arc::clone(&dummy);
        let c_value = c_value.clone();
        effect(move || {
            let v = c_value.get().unwrap().as_int().unwrap();
            dummy.store(v as i32, Ordering::SeqCst);
        });
    }

    assert_eq!(dummy.load(Ordering::SeqCst), 0);
    value.set_item("foo", 1).unwrap();
    assert_eq!(dummy.load(Ordering::SeqCst), 1);

    c_value.as_computed_cell().unwrap().stop();
    value.set_item("foo", 2).unwrap();
    assert_eq!(dummy.load(Ordering::SeqCst), 1);
}

#[test]
fn exposes_its_value_when_stopped() {
    let x = computed(|| Value::Int(1));
    x.as_computed_cell().unwrap().stop();
    assert_eq!(x.get().unwrap(), Value::Int(1));
}
