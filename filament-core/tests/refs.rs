//! Integration tests for refs.
//!
//! These verify the tracked `value` slot, the equality gate on writes,
//! reactive reads of container payloads, auto-unwrap rules inside reactive
//! objects (and the list exception), and the unwrap helpers.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};

use filament_core::{
    computed, deep_unref, effect, is_ref, reactive, ref_, unref, ObjectShape, Value,
};

#[test]
fn holds_a_value() {
    let a = ref_(1);
    assert_eq!(a.get().unwrap(), Value::Int(1));
    a.set(2).unwrap();
    assert_eq!(a.get().unwrap(), Value::Int(2));
}

#[test]
fn is_reactive_with_equality_gate() {
    let a = ref_(1);
    let dummy = Arc::new(AtomicI32::new(-1));
    let calls = Arc::new(AtomicI32::new(0));

    {
        let a = a.clone();
        let dummy = Arc::clone(&dummy);
        let calls = Arc::clone(&calls);
        effect(move || {
            calls.fetch_add(1, Ordering::SeqCst);
            dummy.store(a.get().unwrap().as_int().unwrap() as i32, Ordering::SeqCst);
        });
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(dummy.load(Ordering::SeqCst), 1);

    a.set(2).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(dummy.load(Ordering::SeqCst), 2);

    // Same value: no trigger.
    a.set(2).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn makes_nested_properties_reactive() {
    let a = ref_(Value::map([("count", 1)]));
    let dummy = Arc::new(AtomicI32::new(-1));

    {
        let a = a.clone();
        let dummy = Arc::clone(&dummy);
        effect(move || {
            let count = a
                .get()
                .unwrap()
                .get_item("count")
                .unwrap()
                .as_int()
                .unwrap();
            dummy.store(count as i32, Ordering::SeqCst);
        });
    }

    assert_eq!(dummy.load(Ordering::SeqCst), 1);
    a.get().unwrap().set_item("count", 2).unwrap();
    assert_eq!(dummy.load(Ordering::SeqCst), 2);
}

#[test]
fn works_without_an_initial_value() {
    let a = ref_(());
    let dummy: Arc<Mutex<Option<Value>>> = Arc::new(Mutex::new(None));

    {
        let a = a.clone();
        let dummy = Arc::clone(&dummy);
        effect(move || {
            *dummy.lock().unwrap() = Some(a.get().unwrap());
        });
    }

    assert_eq!(*dummy.lock().unwrap(), Some(Value::Unit));
    a.set(2).unwrap();
    assert_eq!(*dummy.lock().unwrap(), Some(Value::Int(2)));
}

#[test]
fn behaves_like_a_plain_slot_inside_a_reactive_object() {
    let a = ref_(1);
    let obj = reactive(Value::map([
        ("a", a.clone()),
        ("b", Value::map([("c", a.clone())])),
    ]));

    let dummy1 = Arc::new(AtomicI32::new(-1));
    let dummy2 = Arc::new(AtomicI32::new(-1));

    {
        let obj = obj.clone();
        let dummy1 = Arc::clone(&dummy1);
        let dummy2 = Arc::clone(&dummy2);
        effect(move || {
            dummy1.store(
                obj.get_item("a").unwrap().as_int().unwrap() as i32,
                Ordering::SeqCst,
            );
            dummy2.store(
                obj.get_item("b")
                    .unwrap()
                    .get_item("c")
                    .unwrap()
                    .as_int()
                    .unwrap() as i32,
                Ordering::SeqCst,
            );
        });
    }

    assert_eq!(dummy1.load(Ordering::SeqCst), 1);
    assert_eq!(dummy2.load(Ordering::SeqCst), 1);

    let next = a.get().unwrap().as_int().unwrap() + 1;
    a.set(next).unwrap();
    assert_eq!(dummy1.load(Ordering::SeqCst), 2);
    assert_eq!(dummy2.load(Ordering::SeqCst), 2);

    // Writing the slot goes through the ref.
    obj.set_item("a", 3).unwrap();
    assert_eq!(a.get().unwrap(), Value::Int(3));
    assert_eq!(dummy1.load(Ordering::SeqCst), 3);
    assert_eq!(dummy2.load(Ordering::SeqCst), 3);
}

#[test]
fn ref_of_ref_collapses() {
    let a = ref_(0);
    let b = ref_(a.clone());
    assert!(a.is(&b));
    assert_eq!(b.get().unwrap(), Value::Int(0));
}

#[test]
fn unwraps_nested_refs_in_mappings() {
    let a = Value::map([("b", ref_(0))]);
    let c = ref_(a);

    let b = c.get().unwrap().get_item("b").unwrap();
    assert_eq!(b, Value::Int(0));
}

#[test]
fn does_not_unwrap_refs_nested_inside_lists() {
    let arr = ref_(Value::list([Value::Int(1), ref_(3)])).get().unwrap();

    assert!(!is_ref(&arr.get_item(0).unwrap()));
    assert!(is_ref(&arr.get_item(1).unwrap()));
    assert_eq!(arr.get_item(1).unwrap().get().unwrap(), Value::Int(3));
}

#[test]
fn keeps_heterogeneous_list_members_usable() {
    let t = Value::list([
        Value::Int(0),
        Value::from("1"),
        Value::map([("a", 1)]),
        Value::func(|_| Ok(Value::Int(0))),
        ref_(0),
    ]);
    let t_ref = ref_(t);

    let list = t_ref.get().unwrap();

    let n = list.get_item(0).unwrap().as_int().unwrap();
    list.set_item(0, n + 1).unwrap();
    assert_eq!(list.get_item(0).unwrap(), Value::Int(1));

    let s = list.get_item(1).unwrap().as_str().unwrap().to_string();
    list.set_item(1, format!("{s}1")).unwrap();
    assert_eq!(list.get_item(1).unwrap(), Value::from("11"));

    let map = list.get_item(2).unwrap();
    let a = map.get_item("a").unwrap().as_int().unwrap();
    map.set_item("a", a + 1).unwrap();
    assert_eq!(map.get_item("a").unwrap(), Value::Int(2));

    assert_eq!(list.get_item(3).unwrap().call(&[]).unwrap(), Value::Int(0));

    let nested = list.get_item(4).unwrap();
    let v = nested.get().unwrap().as_int().unwrap();
    nested.set(v + 1).unwrap();
    assert_eq!(nested.get().unwrap(), Value::Int(1));
}

#[test]
fn unref_unwraps() {
    assert_eq!(unref(&Value::Int(1)), Value::Int(1));
    assert_eq!(unref(&ref_(1)), Value::Int(1));
}

#[test]
fn deep_unref_produces_a_plain_structure() {
    let wrapped = ref_(Value::map([
        ("foo", ref_(Value::map([("bar", Value::list([ref_(1), Value::Int(2)]))]))),
        ("baz", ref_(1)),
    ]));

    let plain = deep_unref(&wrapped);
    assert!(!is_ref(&plain));
    assert_eq!(plain.get_item("baz").unwrap(), Value::Int(1));

    let bar = plain.get_item("foo").unwrap().get_item("bar").unwrap();
    assert_eq!(bar.get_item(0).unwrap(), Value::Int(1));
    assert!(!is_ref(&bar.get_item(0).unwrap()));
}

#[test]
fn is_ref_flags() {
    assert!(is_ref(&ref_(1)));
    assert!(is_ref(&computed(|| Value::Int(1))));

    assert!(!is_ref(&Value::Int(0)));
    assert!(!is_ref(&Value::Int(1)));

    // An object with a `value` field is not a ref.
    let lookalike = Value::object(ObjectShape::plain("Obj"), [("value", 0)]);
    assert!(!is_ref(&lookalike));
}

#[test]
fn does_not_trigger_when_setting_the_same_proxy() {
    let obj = reactive(Value::map([("count", 0)]));
    let a = ref_(obj.clone());

    let calls = Arc::new(AtomicI32::new(0));
    {
        let a = a.clone();
        let calls = Arc::clone(&calls);
        effect(move || {
            calls.fetch_add(1, Ordering::SeqCst);
            let _ = a.get().unwrap();
        });
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    a.set(obj).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn update_applies_a_function_to_the_payload() {
    let a = ref_(10);
    a.as_ref_cell()
        .unwrap()
        .update(|v| Value::Int(v.as_int().unwrap() + 5));
    assert_eq!(a.get().unwrap(), Value::Int(15));
}

#[test]
fn get_untracked_reads_without_subscribing() {
    let a = ref_(1);
    let calls = Arc::new(AtomicI32::new(0));

    {
        let a = a.clone();
        let calls = Arc::clone(&calls);
        effect(move || {
            calls.fetch_add(1, Ordering::SeqCst);
            let _ = a.as_ref_cell().unwrap().get_untracked();
        });
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    a.set(5).unwrap();
    // The effect never subscribed, so it does not re-run.
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
