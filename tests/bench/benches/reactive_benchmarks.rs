//! Reactivity benchmarks
//!
//! - Observing nested state
//! - Tracked reads through a computed value
//! - Batched watcher flushes

use criterion::{Criterion, criterion_group, criterion_main};
use reinhardt_reactive::{Runtime, RuntimeConfig, Value, WatchOptions, WatchSource};
use std::hint::black_box;

fn nested_state(width: usize) -> Value {
	Value::object((0..width).map(|i| {
		(
			format!("k{i}"),
			Value::object([("value", Value::from(i)), ("tags", Value::array([Value::from("a")]))]),
		)
	}))
}

fn benchmark_observe(c: &mut Criterion) {
	c.bench_function("observe_nested_object", |b| {
		let rt = Runtime::new();
		b.iter(|| black_box(rt.reactive(nested_state(64))));
	});
}

fn benchmark_computed(c: &mut Criterion) {
	let rt = Runtime::new();
	let state = rt.reactive(nested_state(64));
	let source = state.clone();
	let total = rt
		.computed(None, move |_| {
			let Some(object) = source.as_object() else {
				return Ok(Value::Null);
			};
			let sum: f64 = object
				.keys()
				.iter()
				.filter_map(|key| object.get(key))
				.filter_map(|entry| entry.as_object().and_then(|e| e.get("value")))
				.filter_map(|value| value.as_f64())
				.sum();
			Ok(Value::from(sum))
		})
		.expect("computed");

	c.bench_function("computed_cached_read", |b| {
		b.iter(|| black_box(total.get()));
	});

	let entry = state
		.as_object()
		.and_then(|object| object.get("k0"))
		.expect("entry");
	let mut n = 0;
	c.bench_function("computed_invalidate_and_read", |b| {
		b.iter(|| {
			n += 1;
			entry.as_object().expect("object").set("value", n);
			black_box(total.get())
		});
	});
}

fn benchmark_flush(c: &mut Criterion) {
	let rt = Runtime::with_config(RuntimeConfig::default());
	let state = rt.reactive(Value::object([("count", Value::from(0))]));
	let _watchers: Vec<_> = (0..100)
		.map(|_| {
			rt.watch(
				None,
				WatchSource::path(&state, "count"),
				|_, _, _| Ok(()),
				WatchOptions::default(),
			)
			.expect("watch")
		})
		.collect();

	let mut n = 0;
	c.bench_function("flush_100_watchers", |b| {
		b.iter(|| {
			n += 1;
			state.as_object().expect("object").set("count", n);
			black_box(rt.run_until_idle())
		});
	});
}

criterion_group!(benches, benchmark_observe, benchmark_computed, benchmark_flush);
criterion_main!(benches);
