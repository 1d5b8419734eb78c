//! Observable sequence mutations
//!
//! Element reads on an [`Array`] are not tracked, so every mutation goes
//! through one of the methods below. Each performs the native mutation,
//! observes newly inserted elements and notifies the array's shape
//! dependency exactly once. Mutations of frozen arrays are ignored.

use std::cmp::Ordering;

use crate::observer::observe_items;
use crate::value::{Array, Value};

impl Array {
	/// Appends `items`, returning the new length.
	pub fn push(&self, items: impl IntoIterator<Item = Value>) -> usize {
		let items: Vec<Value> = items.into_iter().collect();
		let len = self.len();
		self.splice(len, 0, items);
		self.len()
	}

	/// Prepends `items`, returning the new length.
	pub fn unshift(&self, items: impl IntoIterator<Item = Value>) -> usize {
		self.splice(0, 0, items.into_iter().collect());
		self.len()
	}

	/// Removes the last element.
	pub fn pop(&self) -> Option<Value> {
		let len = self.len();
		if len == 0 {
			self.notify();
			return None;
		}
		self.splice(len - 1, 1, Vec::new()).pop()
	}

	/// Removes the first element.
	pub fn shift(&self) -> Option<Value> {
		if self.is_empty() {
			self.notify();
			return None;
		}
		self.splice(0, 1, Vec::new()).pop()
	}

	/// Removes `delete_count` elements at `start` and inserts `items` there.
	///
	/// `start` and `delete_count` are clamped to the array bounds. Returns the
	/// removed elements.
	pub fn splice(&self, start: usize, delete_count: usize, items: Vec<Value>) -> Vec<Value> {
		if self.is_frozen() {
			return Vec::new();
		}
		let removed = {
			let mut current = self.0.items.borrow_mut();
			let start = start.min(current.len());
			let end = start.saturating_add(delete_count).min(current.len());
			current.splice(start..end, items.iter().cloned()).collect()
		};
		self.after_mutation(&items);
		removed
	}

	/// Sorts in place with `compare`.
	pub fn sort_by<F>(&self, compare: F)
	where
		F: FnMut(&Value, &Value) -> Ordering,
	{
		if self.is_frozen() {
			return;
		}
		self.0.items.borrow_mut().sort_by(compare);
		self.after_mutation(&[]);
	}

	/// Reverses in place.
	pub fn reverse(&self) {
		if self.is_frozen() {
			return;
		}
		self.0.items.borrow_mut().reverse();
		self.after_mutation(&[]);
	}

	/// Assigns an element by index, extending the array with `Null` when the
	/// index is past the end.
	pub fn set(&self, index: usize, value: Value) {
		if self.is_frozen() {
			return;
		}
		let len = self.len();
		if index >= len {
			// Extend first so the splice below replaces a hole.
			self.0.items.borrow_mut().resize(index + 1, Value::Null);
		}
		self.splice(index, 1, vec![value]);
	}

	/// Shortens the array to `len` elements.
	pub fn truncate(&self, len: usize) {
		let current = self.len();
		if len < current {
			self.splice(len, current - len, Vec::new());
		}
	}

	fn after_mutation(&self, inserted: &[Value]) {
		let Some(observer) = self.observer() else {
			return;
		};
		let Some(rt) = observer.runtime() else {
			return;
		};
		if !inserted.is_empty() {
			observe_items(&rt, inserted);
		}
		observer.dep().notify(&rt);
	}

	fn notify(&self) {
		self.after_mutation(&[]);
	}
}
