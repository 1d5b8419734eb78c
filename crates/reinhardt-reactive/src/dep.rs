//! Dependency node
//!
//! A [`Dep`] represents one observable fact: a property, the shape of an
//! object or array, or a watch target. Watchers subscribe to it while they
//! evaluate and are notified when it changes.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::runtime::Runtime;
use crate::watcher::{Watcher, WatcherInner};

/// Unique identifier of a [`Dep`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DepId(usize);

impl DepId {
	fn next() -> Self {
		static COUNTER: AtomicUsize = AtomicUsize::new(0);
		Self(COUNTER.fetch_add(1, Ordering::Relaxed))
	}
}

struct DepInner {
	id: DepId,
	/// Subscribers in insertion order. Weak so a dropped watcher does not leak.
	subs: RefCell<Vec<Weak<WatcherInner>>>,
}

/// Publish/subscribe node.
#[derive(Clone)]
pub struct Dep(Rc<DepInner>);

impl Dep {
	pub fn new() -> Self {
		Self(Rc::new(DepInner {
			id: DepId::next(),
			subs: RefCell::new(Vec::new()),
		}))
	}

	pub fn id(&self) -> DepId {
		self.0.id
	}

	/// Adds a subscriber. Adding the same watcher twice is a no-op.
	pub(crate) fn add_sub(&self, watcher: &Watcher) {
		let mut subs = self.0.subs.borrow_mut();
		let ptr = Rc::as_ptr(&watcher.0);
		if !subs.iter().any(|sub| sub.as_ptr() == ptr) {
			subs.push(Rc::downgrade(&watcher.0));
		}
	}

	pub(crate) fn remove_sub(&self, watcher: &Watcher) {
		let ptr = Rc::as_ptr(&watcher.0);
		self.0.subs.borrow_mut().retain(|sub| sub.as_ptr() != ptr && sub.strong_count() > 0);
	}

	/// Records this dependency against the runtime's current evaluating watcher.
	pub fn depend(&self, rt: &Runtime) {
		if let Some(target) = rt.current_target() {
			target.add_dep(self);
		}
	}

	/// Notifies every live subscriber.
	///
	/// Works on a snapshot so subscribers may unsubscribe (or subscribe)
	/// while being notified. Without asynchronous flushing subscribers run in
	/// creation order.
	pub fn notify(&self, rt: &Runtime) {
		let mut subs: Vec<Watcher> = {
			let mut live = self.0.subs.borrow_mut();
			live.retain(|sub| sub.strong_count() > 0);
			live.iter().filter_map(|sub| sub.upgrade().map(Watcher)).collect()
		};
		if !rt.config().async_flush {
			subs.sort_by_key(|watcher| watcher.id());
		}
		for watcher in subs {
			watcher.update();
		}
	}

	/// Number of live subscribers.
	pub fn subscriber_count(&self) -> usize {
		self.0.subs.borrow().iter().filter(|sub| sub.strong_count() > 0).count()
	}

	/// Returns `true` if `watcher` is subscribed.
	pub fn has_subscriber(&self, watcher: &Watcher) -> bool {
		let ptr = Rc::as_ptr(&watcher.0);
		self.0.subs.borrow().iter().any(|sub| sub.as_ptr() == ptr)
	}
}

impl Default for Dep {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for Dep {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Dep")
			.field("id", &self.0.id)
			.field("subscribers", &self.subscriber_count())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{Runtime, RuntimeConfig, Value, WatcherOptions};
	use std::cell::Cell;

	fn sync_runtime() -> Runtime {
		Runtime::with_config(RuntimeConfig::default().with_async_flush(false))
	}

	#[test]
	fn test_ids_are_unique() {
		assert_ne!(Dep::new().id(), Dep::new().id());
	}

	#[test]
	fn test_depend_without_target_is_noop() {
		let rt = sync_runtime();
		let dep = Dep::new();
		dep.depend(&rt);
		assert_eq!(dep.subscriber_count(), 0);
	}

	#[test]
	fn test_subscriber_recorded_once() {
		let rt = sync_runtime();
		let dep = Dep::new();
		let d = dep.clone();
		let watcher = rt
			.watcher(
				None,
				move |rt: &Runtime| {
					d.depend(rt);
					d.depend(rt);
					Ok(Value::Null)
				},
				None,
				WatcherOptions::default(),
			)
			.unwrap();
		assert_eq!(dep.subscriber_count(), 1);
		assert!(dep.has_subscriber(&watcher));
		assert_eq!(watcher.dep_ids(), vec![dep.id()]);
	}

	#[test]
	fn test_notify_reruns_subscriber() {
		let rt = sync_runtime();
		let dep = Dep::new();
		let runs = Rc::new(Cell::new(0));
		let (d, r) = (dep.clone(), runs.clone());
		let _watcher = rt
			.watcher(
				None,
				move |rt: &Runtime| {
					d.depend(rt);
					r.set(r.get() + 1);
					Ok(Value::Null)
				},
				None,
				WatcherOptions::default(),
			)
			.unwrap();
		dep.notify(&rt);
		assert_eq!(runs.get(), 2);
	}

	#[test]
	fn test_dropped_watcher_is_pruned() {
		let rt = sync_runtime();
		let dep = Dep::new();
		let d = dep.clone();
		let watcher = rt
			.watcher(
				None,
				move |rt: &Runtime| {
					d.depend(rt);
					Ok(Value::Null)
				},
				None,
				WatcherOptions::default(),
			)
			.unwrap();
		drop(watcher);
		dep.notify(&rt);
		assert_eq!(dep.subscriber_count(), 0);
	}
}
