//! Computed values
//!
//! A [`Computed`] wraps a lazy [`Watcher`]: it evaluates on first read and
//! after any dependency change, and otherwise returns its cached value. Read
//! inside another watcher, it forwards its own dependencies to that watcher.

use std::fmt;
use std::rc::Weak;

use crate::error::ReactiveResult;
use crate::runtime::{Runtime, RuntimeInner};
use crate::value::Value;
use crate::watcher::Watcher;

/// Cached derived value.
///
/// Holds the runtime weakly, so a computed captured by a scoped watcher's
/// getter does not keep the runtime alive.
#[derive(Clone)]
pub struct Computed {
	runtime: Weak<RuntimeInner>,
	watcher: Watcher,
}

impl Computed {
	pub(crate) fn new(runtime: &Runtime, watcher: Watcher) -> Self {
		Self {
			runtime: runtime.downgrade(),
			watcher,
		}
	}

	/// Returns the cached value, re-evaluating first if dirty.
	pub fn get(&self) -> ReactiveResult<Value> {
		if self.watcher.is_dirty() {
			self.watcher.evaluate()?;
		}
		if let Some(rt) = Runtime::upgrade(&self.runtime)
			&& rt.current_target().is_some()
		{
			self.watcher.depend();
		}
		Ok(self.watcher.value())
	}

	/// The underlying lazy watcher.
	pub fn watcher(&self) -> &Watcher {
		&self.watcher
	}
}

impl fmt::Debug for Computed {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Computed").field("watcher", &self.watcher).finish()
	}
}

#[cfg(test)]
mod tests {
	use crate::{Runtime, RuntimeConfig, Value, WatcherOptions};
	use serde_json::json;
	use std::cell::Cell;
	use std::rc::Rc;

	#[test]
	fn test_lazy_evaluation_counts() {
		let rt = Runtime::new();
		let data = rt.reactive(json!({"n": 2}));
		let evaluations = Rc::new(Cell::new(0));
		let (d, e) = (data.clone(), evaluations.clone());
		let doubled = rt
			.computed(None, move |_: &Runtime| {
				e.set(e.get() + 1);
				let n = d.as_object().unwrap().get("n").unwrap().as_f64().unwrap();
				Ok(Value::from(n * 2.0))
			})
			.unwrap();
		assert_eq!(evaluations.get(), 0);

		assert_eq!(doubled.get().unwrap(), Value::from(4));
		assert_eq!(evaluations.get(), 1);
		assert_eq!(doubled.get().unwrap(), Value::from(4));
		assert_eq!(evaluations.get(), 1);

		data.as_object().unwrap().set("n", 5);
		assert_eq!(doubled.get().unwrap(), Value::from(10));
		assert_eq!(evaluations.get(), 2);
	}

	#[test]
	fn test_outer_watcher_inherits_computed_dependencies() {
		let rt = Runtime::with_config(RuntimeConfig::default().with_async_flush(false));
		let data = rt.reactive(json!({"n": 1}));
		let d = data.clone();
		let plus_one = rt
			.computed(None, move |_: &Runtime| {
				let n = d.as_object().unwrap().get("n").unwrap().as_f64().unwrap();
				Ok(Value::from(n + 1.0))
			})
			.unwrap();
		let seen = Rc::new(Cell::new(0.0));
		let (c, s) = (plus_one.clone(), seen.clone());
		let _render = rt
			.watcher(
				None,
				move |_: &Runtime| {
					let value = c.get()?;
					s.set(value.as_f64().unwrap_or_default());
					Ok(value)
				},
				None,
				WatcherOptions::default(),
			)
			.unwrap();
		assert_eq!(seen.get(), 2.0);
		data.as_object().unwrap().set("n", 41);
		assert_eq!(seen.get(), 42.0);
	}

	#[test]
	fn test_computed_read_by_scoped_watcher_does_not_keep_runtime_alive() {
		let rt = Runtime::new();
		let weak = rt.downgrade();
		let scope = rt.create_scope(None);
		let data = rt.reactive(json!({"n": 1}));
		let d = data.clone();
		let n = rt
			.computed(Some(scope), move |_: &Runtime| {
				Ok(d.as_object().unwrap().get("n").unwrap_or_default())
			})
			.unwrap();
		let render = rt
			.watcher(Some(scope), move |_: &Runtime| n.get(), None, WatcherOptions::default())
			.unwrap();
		assert_eq!(render.value(), Value::from(1));

		drop(render);
		drop(data);
		drop(rt);
		assert!(weak.upgrade().is_none());
	}
}
