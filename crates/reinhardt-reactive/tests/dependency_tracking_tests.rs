//! Integration tests for dependency tracking
//!
//! 1. Watchers re-run exactly once per flush after writes to what they read
//! 2. Writes to unrelated paths never re-run them
//! 3. Branch changes prune stale subscriptions

use proptest::prelude::*;
use reinhardt_reactive::{Runtime, Value, WatcherOptions};
use serde_json::json;
use std::cell::Cell;
use std::rc::Rc;

const KEYS: [&str; 4] = ["a", "b", "c", "d"];

fn reading_watcher(rt: &Runtime, data: &Value, read: Vec<&'static str>) -> (reinhardt_reactive::Watcher, Rc<Cell<usize>>) {
	let runs = Rc::new(Cell::new(0));
	let (d, r) = (data.clone(), runs.clone());
	let watcher = rt
		.watcher(
			None,
			move |_: &Runtime| {
				r.set(r.get() + 1);
				let obj = d.as_object().unwrap();
				for key in &read {
					obj.get(key);
				}
				Ok(Value::Null)
			},
			None,
			WatcherOptions::default(),
		)
		.unwrap();
	(watcher, runs)
}

proptest! {
	#[test]
	fn prop_rerun_once_per_flush_for_read_paths(
		read_mask in 1usize..16,
		batches in prop::collection::vec(prop::collection::vec(0usize..4, 1..6), 1..8),
	) {
		let rt = Runtime::new();
		let data = rt.reactive(json!({"a": 0, "b": 0, "c": 0, "d": 0}));
		let read: Vec<&'static str> = KEYS
			.iter()
			.enumerate()
			.filter(|(i, _)| read_mask & (1 << i) != 0)
			.map(|(_, key)| *key)
			.collect();
		let (_watcher, runs) = reading_watcher(&rt, &data, read.clone());
		let mut counter = 0.0;
		let mut expected = 1;
		for batch in batches {
			let mut touched = false;
			for index in batch {
				counter += 1.0;
				data.as_object().unwrap().set(KEYS[index], counter);
				touched |= read.contains(&KEYS[index]);
			}
			rt.run_until_idle();
			if touched {
				expected += 1;
			}
			prop_assert_eq!(runs.get(), expected);
		}
	}
}

#[test]
fn test_branch_switch_prunes_subscription() {
	let rt = Runtime::new();
	let data = rt.reactive(json!({"show": true, "a": 1, "b": 1}));
	let runs = Rc::new(Cell::new(0));
	let (d, r) = (data.clone(), runs.clone());
	let _watcher = rt
		.watcher(
			None,
			move |_: &Runtime| {
				r.set(r.get() + 1);
				let obj = d.as_object().unwrap();
				if obj.get("show").unwrap().is_truthy() {
					obj.get("a");
				} else {
					obj.get("b");
				}
				Ok(Value::Null)
			},
			None,
			WatcherOptions::default(),
		)
		.unwrap();
	let obj = data.as_object().unwrap();

	obj.set("show", false);
	rt.run_until_idle();
	assert_eq!(runs.get(), 2);

	obj.set("a", 2);
	rt.run_until_idle();
	assert_eq!(runs.get(), 2);

	obj.set("b", 2);
	rt.run_until_idle();
	assert_eq!(runs.get(), 3);
}

#[test]
fn test_reactive_key_added_through_set_is_tracked() {
	let rt = Runtime::new();
	let data = rt.reactive(json!({"nested": {}}));
	let runs = Rc::new(Cell::new(0));
	let (d, r) = (data.clone(), runs.clone());
	let _watcher = rt
		.watcher(
			None,
			move |_: &Runtime| {
				r.set(r.get() + 1);
				let nested = d.as_object().unwrap().get("nested").unwrap();
				Ok(nested.as_object().unwrap().get("late").unwrap_or_default())
			},
			None,
			WatcherOptions::default(),
		)
		.unwrap();
	let nested = data.as_object().unwrap().peek("nested").unwrap();

	// Shape dependency fires on key addition.
	rt.set(&nested, "late", 1).unwrap();
	rt.run_until_idle();
	assert_eq!(runs.get(), 2);

	// The new key is reactive on its own.
	nested.as_object().unwrap().set("late", 2);
	rt.run_until_idle();
	assert_eq!(runs.get(), 3);

	rt.delete(&nested, "late").unwrap();
	rt.run_until_idle();
	assert_eq!(runs.get(), 4);
}
