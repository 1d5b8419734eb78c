//! Reactive Runtime
//!
//! A [`Runtime`] owns all state shared by one reactive system: the stack of
//! evaluating watchers, the scheduler queue, the deferred-callback queue, the
//! scope arena and the configured handlers. Independent runtimes never share
//! state, which keeps tests and multiple roots isolated.
//!
//! ## Architecture
//!
//! 1. **Target Stack**: the watcher currently evaluating sits on top; nested
//!    evaluations push and pop around themselves
//! 2. **Dependency Tracking**: tracked reads record their [`Dep`](crate::Dep)
//!    against the top of the stack
//! 3. **Update Scheduling**: notified watchers are batched and flushed in id order
//! 4. **Deferred Execution**: flushes run from the deferred-callback queue,
//!    drained by a host task scheduler or manually
//!
//! ## Example
//!
//! ```ignore
//! use reinhardt_reactive::{Runtime, WatchOptions, WatchSource};
//! use serde_json::json;
//!
//! let rt = Runtime::new();
//! let data = rt.reactive(json!({"count": 0}));
//!
//! let _handle = rt.watch(
//!     None,
//!     WatchSource::path(&data, "count"),
//!     |_rt, new, old| {
//!         println!("count: {old} -> {new}");
//!         Ok(())
//!     },
//!     Default::default(),
//! )?;
//!
//! data.as_object().unwrap().set("count", 1);
//! rt.run_until_idle();
//! ```

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::{Rc, Weak};

use crate::computed::Computed;
use crate::config::RuntimeConfig;
use crate::error::{ReactiveError, ReactiveResult};
use crate::error_handling::{self, GlobalErrorHandler, invoke_with_error_handling};
use crate::next_tick::{self, TaskScheduler, TickState};
use crate::observer::{self, Observer};
use crate::scheduler::{self, LifecycleHooks, SchedulerState};
use crate::scope::{ErrorCapturedHook, Propagation, ScopeArena, ScopeId};
use crate::value::{Key, Value};
use crate::watch::{Unwatch, WatchOptions, WatchSource};
use crate::watcher::{Watcher, WatcherOptions};

pub(crate) struct RuntimeInner {
	config: Cell<RuntimeConfig>,
	target_stack: RefCell<Vec<Option<Watcher>>>,
	should_observe: Cell<bool>,
	scheduler: RefCell<SchedulerState>,
	ticks: RefCell<TickState>,
	scopes: RefCell<ScopeArena>,
	error_handler: RefCell<Option<GlobalErrorHandler>>,
	lifecycle: RefCell<Option<Rc<dyn LifecycleHooks>>>,
	task_scheduler: RefCell<Option<TaskScheduler>>,
}

/// Handle to a reactive runtime. Clones share the runtime.
#[derive(Clone)]
pub struct Runtime(Rc<RuntimeInner>);

impl Runtime {
	/// Create a runtime with the default (development, asynchronous) configuration.
	pub fn new() -> Self {
		Self::with_config(RuntimeConfig::default())
	}

	pub fn with_config(config: RuntimeConfig) -> Self {
		Self(Rc::new(RuntimeInner {
			config: Cell::new(config),
			target_stack: RefCell::new(Vec::new()),
			should_observe: Cell::new(true),
			scheduler: RefCell::new(SchedulerState::default()),
			ticks: RefCell::new(TickState::default()),
			scopes: RefCell::new(ScopeArena::default()),
			error_handler: RefCell::new(None),
			lifecycle: RefCell::new(None),
			task_scheduler: RefCell::new(None),
		}))
	}

	pub fn config(&self) -> RuntimeConfig {
		self.0.config.get()
	}

	pub fn set_config(&self, config: RuntimeConfig) {
		self.0.config.set(config);
	}

	pub(crate) fn downgrade(&self) -> Weak<RuntimeInner> {
		Rc::downgrade(&self.0)
	}

	pub(crate) fn upgrade(weak: &Weak<RuntimeInner>) -> Option<Self> {
		weak.upgrade().map(Self)
	}

	pub(crate) fn scheduler_state(&self) -> &RefCell<SchedulerState> {
		&self.0.scheduler
	}

	pub(crate) fn tick_state(&self) -> &RefCell<TickState> {
		&self.0.ticks
	}

	/// The watcher currently evaluating, if any.
	pub fn current_target(&self) -> Option<Watcher> {
		self.0.target_stack.borrow().last().cloned().flatten()
	}

	/// Push a target. `None` suspends tracking until the matching pop.
	pub fn push_target(&self, target: Option<Watcher>) {
		self.0.target_stack.borrow_mut().push(target);
	}

	/// Restore the previous target.
	pub fn pop_target(&self) {
		self.0.target_stack.borrow_mut().pop();
	}

	pub fn should_observe(&self) -> bool {
		self.0.should_observe.get()
	}

	/// Enable or disable recursive observation.
	pub fn toggle_observing(&self, value: bool) {
		self.0.should_observe.set(value);
	}

	/// Attach a reactive wrapper to `value` (see [`Observer`]).
	pub fn observe(&self, value: &Value) -> Option<Observer> {
		observer::observe(self, value, false)
	}

	/// Observe `value` as the root data of a scope, counting the usage.
	pub fn observe_root(&self, value: &Value) -> Option<Observer> {
		observer::observe(self, value, true)
	}

	/// Convert and observe in one step.
	pub fn reactive(&self, value: impl Into<Value>) -> Value {
		let value = value.into();
		self.observe(&value);
		value
	}

	/// Add or assign a property so the change is observable.
	///
	/// Array indices go through splice. New keys on observed objects become
	/// reactive and notify the object's shape dependency.
	pub fn set(&self, target: &Value, key: impl Into<Key>, value: impl Into<Value>) -> ReactiveResult<Value> {
		observer::set(self, target, key.into(), value.into())
	}

	/// Remove a property so the change is observable.
	pub fn delete(&self, target: &Value, key: impl Into<Key>) -> ReactiveResult<()> {
		observer::delete(self, target, key.into())
	}

	/// Create a watcher. Non-lazy watchers are evaluated immediately; if that
	/// first evaluation fails the watcher is torn down and the error returned.
	///
	/// # Arguments
	///
	/// * `scope` - owning scope; the watcher is torn down with it
	/// * `getter` - tracked computation
	/// * `callback` - `(new, old)` callback run when the value changes
	/// * `options` - see [`WatcherOptions`]
	pub fn watcher<G>(
		&self,
		scope: Option<ScopeId>,
		getter: G,
		callback: Option<crate::WatchCallback>,
		options: WatcherOptions,
	) -> ReactiveResult<Watcher>
	where
		G: Fn(&Runtime) -> ReactiveResult<Value> + 'static,
	{
		Watcher::new(self, scope, Rc::new(getter), callback, options)
	}

	/// Create a user watcher on a path or getter.
	///
	/// With `immediate`, the callback also runs once right away with the
	/// initial value and `Null` as the old value.
	pub fn watch<C>(
		&self,
		scope: Option<ScopeId>,
		source: WatchSource,
		callback: C,
		options: WatchOptions,
	) -> ReactiveResult<Unwatch>
	where
		C: Fn(&Runtime, &Value, &Value) -> ReactiveResult<()> + 'static,
	{
		let expression = source.expression();
		let getter = source.into_getter().inspect_err(|err| {
			crate::dev_warn!(self.config().mode, "{}", err);
		})?;
		let callback: crate::WatchCallback = Rc::new(callback);
		let watcher = Watcher::new(
			self,
			scope,
			getter,
			Some(callback.clone()),
			WatcherOptions {
				deep: options.deep,
				user: true,
				sync: options.sync,
				expression: Some(expression),
				..WatcherOptions::default()
			},
		)?;
		if options.immediate {
			let info = format!("callback for immediate watcher \"{}\"", watcher.expression());
			let value = watcher.value();
			self.push_target(None);
			invoke_with_error_handling(self, scope, &info, || callback(self, &value, &Value::Null));
			self.pop_target();
		}
		Ok(Unwatch(watcher))
	}

	/// Create a cached, lazily evaluated derived value.
	pub fn computed<G>(&self, scope: Option<ScopeId>, getter: G) -> ReactiveResult<Computed>
	where
		G: Fn(&Runtime) -> ReactiveResult<Value> + 'static,
	{
		let watcher = Watcher::new(
			self,
			scope,
			Rc::new(getter),
			None,
			WatcherOptions {
				lazy: true,
				expression: Some("computed".to_string()),
				..WatcherOptions::default()
			},
		)?;
		Ok(Computed::new(self, watcher))
	}

	/// Queue a watcher for the next flush.
	pub fn queue_watcher(&self, watcher: &Watcher) {
		scheduler::queue_watcher(self, watcher.clone());
	}

	/// Run the scheduler queue now. Ignored while a flush is running.
	pub fn flush_scheduler(&self) {
		scheduler::flush_scheduler_queue(self);
	}

	/// Returns `true` while a flush is scheduled or running.
	pub fn is_flush_pending(&self) -> bool {
		self.0.scheduler.borrow().is_pending()
	}

	pub fn is_flushing(&self) -> bool {
		self.0.scheduler.borrow().is_flushing()
	}

	/// Report a kept-alive scope as activated after the next flush.
	pub fn queue_activated_scope(&self, scope: ScopeId) {
		scheduler::queue_activated_scope(self, scope);
	}

	pub fn set_lifecycle_hooks(&self, hooks: impl LifecycleHooks + 'static) {
		*self.0.lifecycle.borrow_mut() = Some(Rc::new(hooks));
	}

	pub(crate) fn lifecycle_hooks(&self) -> Option<Rc<dyn LifecycleHooks>> {
		self.0.lifecycle.borrow().clone()
	}

	/// Queue a callback to run after the current batch.
	pub fn next_tick<F>(&self, callback: F)
	where
		F: FnOnce(&Runtime) -> ReactiveResult<()> + 'static,
	{
		next_tick::next_tick(self, Box::new(callback));
	}

	/// Future resolving after the next drain.
	pub fn next_tick_future(&self) -> impl Future<Output = ()> + 'static {
		next_tick::next_tick_future(self)
	}

	/// Drain one snapshot of the deferred-callback queue.
	pub fn flush_callbacks(&self) -> usize {
		next_tick::flush_callbacks(self)
	}

	/// Drain until nothing is queued, including flushes scheduled by flushes.
	pub fn run_until_idle(&self) -> usize {
		next_tick::run_until_idle(self)
	}

	pub fn has_pending_callbacks(&self) -> bool {
		self.0.ticks.borrow().is_pending()
	}

	/// Set the host facility that runs drain tasks.
	///
	/// If no scheduler is set, callbacks must be drained manually.
	pub fn set_task_scheduler(&self, scheduler: TaskScheduler) {
		*self.0.task_scheduler.borrow_mut() = Some(scheduler);
	}

	pub(crate) fn task_scheduler(&self) -> Option<TaskScheduler> {
		self.0.task_scheduler.borrow().clone()
	}

	pub fn create_scope(&self, parent: Option<ScopeId>) -> ScopeId {
		self.0.scopes.borrow_mut().create(parent)
	}

	pub fn scope_parent(&self, scope: ScopeId) -> Option<ScopeId> {
		self.0.scopes.borrow().parent(scope)
	}

	pub fn is_scope_destroyed(&self, scope: ScopeId) -> bool {
		self.0.scopes.borrow().is_destroyed(scope)
	}

	/// Watchers currently owned by `scope`.
	pub fn scope_watchers(&self, scope: ScopeId) -> Vec<Watcher> {
		self.0.scopes.borrow().watchers(scope)
	}

	/// Destroy `scope` and its descendants, tearing down their watchers.
	pub fn destroy_scope(&self, scope: ScopeId) {
		let watchers = self.0.scopes.borrow_mut().destroy(scope);
		for watcher in watchers {
			watcher.teardown();
		}
	}

	/// Register a hook capturing errors raised in descendants of `scope`.
	pub fn on_error_captured<F>(&self, scope: ScopeId, hook: F)
	where
		F: Fn(&ReactiveError, ScopeId, &str) -> ReactiveResult<Propagation> + 'static,
	{
		let hook: ErrorCapturedHook = Rc::new(hook);
		self.0.scopes.borrow_mut().add_hook(scope, hook);
	}

	pub(crate) fn error_captured_hooks(&self, scope: ScopeId) -> Vec<ErrorCapturedHook> {
		self.0.scopes.borrow().hooks(scope)
	}

	pub(crate) fn register_scope_watcher(&self, scope: ScopeId, watcher: &Watcher) {
		self.0.scopes.borrow_mut().add_watcher(scope, watcher);
	}

	pub(crate) fn unregister_scope_watcher(&self, scope: ScopeId, watcher: &Watcher) {
		self.0.scopes.borrow_mut().remove_watcher(scope, watcher);
	}

	/// Set the handler of last resort for runtime errors.
	pub fn set_error_handler<F>(&self, handler: F)
	where
		F: Fn(&ReactiveError, Option<ScopeId>, &str) -> ReactiveResult<()> + 'static,
	{
		*self.0.error_handler.borrow_mut() = Some(Rc::new(handler));
	}

	pub(crate) fn error_handler(&self) -> Option<GlobalErrorHandler> {
		self.0.error_handler.borrow().clone()
	}

	/// Route an error through the capture chain of `scope`.
	pub fn handle_error(&self, err: &ReactiveError, scope: Option<ScopeId>, info: &str) {
		error_handling::handle_error(self, err, scope, info);
	}
}

impl Default for Runtime {
	fn default() -> Self {
		Self::new()
	}
}

thread_local! {
	static RUNTIME: Runtime = Runtime::new();
}

/// Access the thread's default runtime.
///
/// # Example
///
/// ```ignore
/// use reinhardt_reactive::with_runtime;
///
/// with_runtime(|rt| rt.run_until_idle());
/// ```
pub fn with_runtime<F, R>(f: F) -> R
where
	F: FnOnce(&Runtime) -> R,
{
	RUNTIME.with(f)
}

/// Like [`with_runtime`], but returns `None` during thread teardown.
pub fn try_with_runtime<F, R>(f: F) -> Option<R>
where
	F: FnOnce(&Runtime) -> R,
{
	RUNTIME.try_with(f).ok()
}
