//! Deep traversal
//!
//! Reads every nested property of a value so the evaluating watcher depends
//! on all of them. Observed values are visited once per traversal, keyed by
//! the identity of their shape dependency, which also stops cycles.

use std::collections::HashSet;

use crate::dep::DepId;
use crate::value::Value;

/// Recursively touches every nested property of `value`.
pub fn traverse(value: &Value) {
	let mut seen = HashSet::new();
	traverse_inner(value, &mut seen);
}

fn traverse_inner(value: &Value, seen: &mut HashSet<DepId>) {
	let flags = match value {
		Value::Object(object) => object.flags(),
		Value::Array(array) => array.flags(),
		_ => return,
	};
	if flags.frozen || flags.internal {
		return;
	}
	if let Some(observer) = value.observer()
		&& !seen.insert(observer.dep().id())
	{
		return;
	}
	match value {
		Value::Array(array) => {
			for item in array.to_vec() {
				traverse_inner(&item, seen);
			}
		}
		Value::Object(object) => {
			for key in object.keys() {
				if let Some(child) = object.get(&key) {
					traverse_inner(&child, seen);
				}
			}
		}
		_ => {}
	}
}
