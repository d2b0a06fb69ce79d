use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

use filament_core::{computed, effect, reactive, ref_, Value};

fn ref_creation_benchmark(c: &mut Criterion) {
    c.bench_function("ref_creation", |b| {
        b.iter(|| ref_(black_box(42)));
    });
}

fn ref_read_benchmark(c: &mut Criterion) {
    let cell = ref_(42);

    c.bench_function("ref_read", |b| {
        b.iter(|| {
            black_box(cell.get().unwrap());
        });
    });
}

fn ref_write_benchmark(c: &mut Criterion) {
    let cell = ref_(0);

    c.bench_function("ref_write", |b| {
        let mut i = 0i64;
        b.iter(|| {
            cell.set(black_box(i)).unwrap();
            i += 1;
        });
    });
}

fn reactive_read_benchmark(c: &mut Criterion) {
    let state = reactive(Value::map([("count", 0)]));

    c.bench_function("reactive_read", |b| {
        b.iter(|| {
            black_box(state.get_item("count").unwrap());
        });
    });
}

fn reactive_write_with_subscriber_benchmark(c: &mut Criterion) {
    let state = reactive(Value::map([("count", 0)]));
    {
        let state = state.clone();
        effect(move || {
            let _ = state.get_item("count").unwrap();
        });
    }

    c.bench_function("reactive_write_with_subscriber", |b| {
        let mut i = 0i64;
        b.iter(|| {
            state.set_item("count", black_box(i)).unwrap();
            i += 1;
        });
    });
}

fn computed_cached_read_benchmark(c: &mut Criterion) {
    let base = ref_(5);
    let sum = {
        let base = base.clone();
        computed(move || Value::Int(base.get().unwrap().as_int().unwrap() + 10))
    };
    // Prime the cache; reads below are hits.
    let _ = sum.get().unwrap();

    c.bench_function("computed_cached_read", |b| {
        b.iter(|| {
            black_box(sum.get().unwrap());
        });
    });
}

criterion_group!(
    benches,
    ref_creation_benchmark,
    ref_read_benchmark,
    ref_write_benchmark,
    reactive_read_benchmark,
    reactive_write_with_subscriber_benchmark,
    computed_cached_read_benchmark
);
criterion_main!(benches);
