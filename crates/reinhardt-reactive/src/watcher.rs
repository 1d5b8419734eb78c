//! Computation node
//!
//! A [`Watcher`] evaluates a getter while registered as the runtime's
//! current target, so every dependency read during the evaluation subscribes
//! it. After each evaluation the subscription set is reconciled against the
//! dependencies actually touched, pruning stale ones in both directions.
//!
//! ## Lifecycle
//!
//! constructed -> (lazy: dirty) -> evaluated -> re-evaluated on notify -> torn down
//!
//! - **lazy** watchers only flip a dirty flag when notified (computed values)
//! - **sync** watchers re-run immediately when notified
//! - all others are handed to the scheduler and run in id order

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::dep::{Dep, DepId};
use crate::error::{ReactiveError, ReactiveResult};
use crate::error_handling::{handle_error, invoke_with_error_handling};
use crate::runtime::{Runtime, RuntimeInner};
use crate::scheduler::queue_watcher;
use crate::scope::ScopeId;
use crate::traverse::traverse;
use crate::value::Value;

/// Unique, monotonically increasing watcher identifier. Flush order key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WatcherId(usize);

impl WatcherId {
	fn next() -> Self {
		static COUNTER: AtomicUsize = AtomicUsize::new(1);
		Self(COUNTER.fetch_add(1, Ordering::Relaxed))
	}
}

/// Tracked computation.
pub type Getter = Rc<dyn Fn(&Runtime) -> ReactiveResult<Value>>;

/// Change callback receiving `(new, old)`.
pub type WatchCallback = Rc<dyn Fn(&Runtime, &Value, &Value) -> ReactiveResult<()>>;

/// Pre-flush hook, run right before the scheduler re-runs the watcher.
pub type BeforeHook = Rc<dyn Fn(&Runtime) -> ReactiveResult<()>>;

/// Watcher construction options.
#[derive(Clone, Default)]
pub struct WatcherOptions {
	/// Traverse the result so every nested property is a dependency
	pub deep: bool,
	/// User watchers route getter and callback failures to the error chain
	pub user: bool,
	/// Defer evaluation until first read
	pub lazy: bool,
	/// Bypass the scheduler
	pub sync: bool,
	pub before: Option<BeforeHook>,
	/// Render watcher of its scope
	pub is_render: bool,
	/// Source text used in diagnostics
	pub expression: Option<String>,
}

pub(crate) struct WatcherInner {
	id: WatcherId,
	runtime: Weak<RuntimeInner>,
	scope: Option<ScopeId>,
	getter: Getter,
	callback: Option<WatchCallback>,
	before: Option<BeforeHook>,
	deep: bool,
	user: bool,
	lazy: bool,
	sync: bool,
	is_render: bool,
	expression: String,
	dirty: Cell<bool>,
	active: Cell<bool>,
	evaluating: Cell<bool>,
	value: RefCell<Value>,
	deps: RefCell<Vec<Dep>>,
	new_deps: RefCell<Vec<Dep>>,
	dep_ids: RefCell<HashSet<DepId>>,
	new_dep_ids: RefCell<HashSet<DepId>>,
}

/// Computation node handle. Clones share the node.
#[derive(Clone)]
pub struct Watcher(pub(crate) Rc<WatcherInner>);

impl Watcher {
	/// Creates a watcher and, unless lazy, evaluates it once.
	///
	/// The watcher is owned by `scope` when given and torn down with it. A
	/// failed first evaluation tears it down before the error is returned.
	pub(crate) fn new(
		rt: &Runtime,
		scope: Option<ScopeId>,
		getter: Getter,
		callback: Option<WatchCallback>,
		options: WatcherOptions,
	) -> ReactiveResult<Self> {
		let watcher = Self(Rc::new(WatcherInner {
			id: WatcherId::next(),
			runtime: rt.downgrade(),
			scope,
			getter,
			callback,
			before: options.before,
			deep: options.deep,
			user: options.user,
			lazy: options.lazy,
			sync: options.sync,
			is_render: options.is_render,
			expression: options.expression.unwrap_or_default(),
			dirty: Cell::new(options.lazy),
			active: Cell::new(true),
			evaluating: Cell::new(false),
			value: RefCell::new(Value::Null),
			deps: RefCell::new(Vec::new()),
			new_deps: RefCell::new(Vec::new()),
			dep_ids: RefCell::new(HashSet::new()),
			new_dep_ids: RefCell::new(HashSet::new()),
		}));
		if let Some(scope) = scope {
			rt.register_scope_watcher(scope, &watcher);
		}
		if !watcher.0.lazy {
			match watcher.get() {
				Ok(value) => *watcher.0.value.borrow_mut() = value,
				Err(err) => {
					// Leave neither a scope entry nor subscriptions behind.
					watcher.teardown();
					return Err(err);
				}
			}
		}
		Ok(watcher)
	}

	pub fn id(&self) -> WatcherId {
		self.0.id
	}

	pub fn scope(&self) -> Option<ScopeId> {
		self.0.scope
	}

	pub fn expression(&self) -> &str {
		&self.0.expression
	}

	/// Last computed value.
	pub fn value(&self) -> Value {
		self.0.value.borrow().clone()
	}

	pub fn is_dirty(&self) -> bool {
		self.0.dirty.get()
	}

	pub fn is_active(&self) -> bool {
		self.0.active.get()
	}

	pub fn is_lazy(&self) -> bool {
		self.0.lazy
	}

	pub fn is_render(&self) -> bool {
		self.0.is_render
	}

	/// Ids of the dependencies recorded by the last evaluation, in read order.
	pub fn dep_ids(&self) -> Vec<DepId> {
		self.0.deps.borrow().iter().map(Dep::id).collect()
	}

	pub fn ptr_eq(&self, other: &Watcher) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	fn runtime(&self) -> Option<Runtime> {
		Runtime::upgrade(&self.0.runtime)
	}

	/// Evaluates the getter and re-collects dependencies.
	pub fn get(&self) -> ReactiveResult<Value> {
		let Some(rt) = self.runtime() else {
			return Ok(self.value());
		};
		if self.0.evaluating.replace(true) {
			return Err(ReactiveError::ReentrantEvaluation(self.0.expression.clone()));
		}
		rt.push_target(Some(self.clone()));
		let result = match (self.0.getter)(&rt) {
			Ok(value) => Ok(value),
			Err(err) if self.0.user => {
				let info = format!("getter for watcher \"{}\"", self.0.expression);
				handle_error(&rt, &err, self.0.scope, &info);
				Ok(Value::Null)
			}
			Err(err) => Err(err),
		};
		if self.0.deep
			&& let Ok(value) = &result
		{
			traverse(value);
		}
		rt.pop_target();
		self.0.evaluating.set(false);
		self.cleanup_deps();
		result
	}

	/// Adds a dependency to the working set, subscribing if it is new.
	pub(crate) fn add_dep(&self, dep: &Dep) {
		let id = dep.id();
		if self.0.new_dep_ids.borrow_mut().insert(id) {
			self.0.new_deps.borrow_mut().push(dep.clone());
			if !self.0.dep_ids.borrow().contains(&id) {
				dep.add_sub(self);
			}
		}
	}

	/// Drops subscriptions not renewed by the last evaluation and promotes
	/// the working set.
	fn cleanup_deps(&self) {
		let new_ids = std::mem::take(&mut *self.0.new_dep_ids.borrow_mut());
		let new_deps = std::mem::take(&mut *self.0.new_deps.borrow_mut());
		let old_deps = std::mem::replace(&mut *self.0.deps.borrow_mut(), new_deps);
		for dep in &old_deps {
			if !new_ids.contains(&dep.id()) {
				dep.remove_sub(self);
			}
		}
		*self.0.dep_ids.borrow_mut() = new_ids;
	}

	/// Subscriber interface, called when a dependency changes.
	pub fn update(&self) {
		if self.0.lazy {
			self.0.dirty.set(true);
		} else if self.0.sync {
			if let Err(err) = self.run()
				&& let Some(rt) = self.runtime()
			{
				handle_error(&rt, &err, self.0.scope, "sync watcher");
			}
		} else if let Some(rt) = self.runtime() {
			queue_watcher(&rt, self.clone());
		}
	}

	/// Re-evaluates and fires the callback if the value changed, is an
	/// object or array, or the watcher is deep.
	pub fn run(&self) -> ReactiveResult<()> {
		if !self.0.active.get() {
			return Ok(());
		}
		let Some(rt) = self.runtime() else {
			return Ok(());
		};
		let value = self.get()?;
		let old = self.value();
		if value.same_value(&old) && !value.is_object() && !self.0.deep {
			return Ok(());
		}
		*self.0.value.borrow_mut() = value.clone();
		let Some(callback) = self.0.callback.clone() else {
			return Ok(());
		};
		if self.0.user {
			let info = format!("callback for watcher \"{}\"", self.0.expression);
			invoke_with_error_handling(&rt, self.0.scope, &info, || callback(&rt, &value, &old));
			Ok(())
		} else {
			callback(&rt, &value, &old)
		}
	}

	/// Runs the pre-flush hook.
	pub(crate) fn run_before(&self, rt: &Runtime) -> ReactiveResult<()> {
		match &self.0.before {
			Some(before) if self.0.active.get() => before(rt),
			_ => Ok(()),
		}
	}

	/// Evaluates a lazy watcher and clears its dirty flag.
	pub fn evaluate(&self) -> ReactiveResult<()> {
		let value = self.get()?;
		*self.0.value.borrow_mut() = value;
		self.0.dirty.set(false);
		Ok(())
	}

	/// Re-publishes every dependency of this watcher to the current target.
	pub fn depend(&self) {
		let Some(rt) = self.runtime() else {
			return;
		};
		let deps = self.0.deps.borrow().clone();
		for dep in deps {
			dep.depend(&rt);
		}
	}

	/// Unsubscribes from every dependency. Terminal.
	pub fn teardown(&self) {
		if !self.0.active.get() {
			return;
		}
		if let Some(scope) = self.0.scope
			&& let Some(rt) = self.runtime()
		{
			rt.unregister_scope_watcher(scope, self);
		}
		let deps = std::mem::take(&mut *self.0.deps.borrow_mut());
		for dep in deps {
			dep.remove_sub(self);
		}
		self.0.dep_ids.borrow_mut().clear();
		self.0.active.set(false);
	}
}

impl fmt::Debug for Watcher {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Watcher")
			.field("id", &self.0.id)
			.field("expression", &self.0.expression)
			.field("lazy", &self.0.lazy)
			.field("dirty", &self.0.dirty.get())
			.field("active", &self.0.active.get())
			.finish()
	}
}
