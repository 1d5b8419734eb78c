//! Ownership scopes
//!
//! A scope stands in for a component instance: it owns watchers, knows its
//! parent, and can register error-capture hooks for errors raised by its
//! descendants. Scopes live in an arena indexed by [`ScopeId`]; parent links
//! are indices, so walking the ancestor chain is a plain loop.

use std::rc::Rc;

use crate::error::{ReactiveError, ReactiveResult};
use crate::watcher::Watcher;

/// Index of a scope in its runtime's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeId(usize);

/// Returned by an error-capture hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
	/// Let outer scopes and the global handler see the error
	Continue,
	/// Stop propagation here
	Stop,
}

/// Hook receiving `(error, originating scope, info)`.
pub type ErrorCapturedHook = Rc<dyn Fn(&ReactiveError, ScopeId, &str) -> ReactiveResult<Propagation>>;

#[derive(Default)]
struct ScopeData {
	parent: Option<ScopeId>,
	children: Vec<ScopeId>,
	error_captured: Vec<ErrorCapturedHook>,
	watchers: Vec<Watcher>,
	destroyed: bool,
}

#[derive(Default)]
pub(crate) struct ScopeArena {
	scopes: Vec<ScopeData>,
}

impl ScopeArena {
	pub(crate) fn create(&mut self, parent: Option<ScopeId>) -> ScopeId {
		let id = ScopeId(self.scopes.len());
		self.scopes.push(ScopeData {
			parent,
			..ScopeData::default()
		});
		if let Some(parent) = parent.and_then(|p| self.scopes.get_mut(p.0)) {
			parent.children.push(id);
		}
		id
	}

	pub(crate) fn parent(&self, id: ScopeId) -> Option<ScopeId> {
		self.scopes.get(id.0).and_then(|scope| scope.parent)
	}

	pub(crate) fn is_destroyed(&self, id: ScopeId) -> bool {
		self.scopes.get(id.0).is_none_or(|scope| scope.destroyed)
	}

	pub(crate) fn hooks(&self, id: ScopeId) -> Vec<ErrorCapturedHook> {
		self.scopes
			.get(id.0)
			.map(|scope| scope.error_captured.clone())
			.unwrap_or_default()
	}

	pub(crate) fn add_hook(&mut self, id: ScopeId, hook: ErrorCapturedHook) {
		if let Some(scope) = self.scopes.get_mut(id.0) {
			scope.error_captured.push(hook);
		}
	}

	pub(crate) fn add_watcher(&mut self, id: ScopeId, watcher: &Watcher) {
		if let Some(scope) = self.scopes.get_mut(id.0) {
			scope.watchers.push(watcher.clone());
		}
	}

	pub(crate) fn remove_watcher(&mut self, id: ScopeId, watcher: &Watcher) {
		if let Some(scope) = self.scopes.get_mut(id.0) {
			scope.watchers.retain(|w| !w.ptr_eq(watcher));
		}
	}

	pub(crate) fn watchers(&self, id: ScopeId) -> Vec<Watcher> {
		self.scopes
			.get(id.0)
			.map(|scope| scope.watchers.clone())
			.unwrap_or_default()
	}

	/// Marks `id` and its live descendants destroyed and hands back their
	/// watchers for teardown.
	pub(crate) fn destroy(&mut self, id: ScopeId) -> Vec<Watcher> {
		let mut watchers = Vec::new();
		let mut stack = vec![id];
		while let Some(current) = stack.pop() {
			let Some(scope) = self.scopes.get_mut(current.0) else {
				continue;
			};
			if scope.destroyed {
				continue;
			}
			scope.destroyed = true;
			scope.error_captured.clear();
			watchers.append(&mut scope.watchers);
			stack.extend(scope.children.iter().copied());
		}
		watchers
	}
}
