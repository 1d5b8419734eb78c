//! Update scheduler
//!
//! Batches watcher re-runs requested during one synchronous turn into a
//! single flush, deduplicated by watcher id and executed in ascending id
//! order (parents before children, a scope's user watchers before its render
//! watcher).
//!
//! ## Mid-flush enqueues
//!
//! A watcher queued while a flush is running joins the running flush at its
//! sorted position if its id is greater than the id under the cursor.
//! Otherwise it is deferred to the next flush, which is scheduled as soon as
//! the current one completes. In development mode a watcher re-queued more
//! than [`RuntimeConfig::max_update_count`](crate::RuntimeConfig) times
//! within one chain of flushes aborts the chain with a diagnostic.

use std::collections::{HashMap, HashSet};

use crate::config::RuntimeConfig;
use crate::error::ReactiveError;
use crate::error_handling::handle_error;
use crate::next_tick::next_tick;
use crate::runtime::Runtime;
use crate::scope::ScopeId;
use crate::watcher::{Watcher, WatcherId};

/// Receives lifecycle notifications after each flush.
///
/// Both methods get a snapshot taken before the scheduler state is reset.
pub trait LifecycleHooks {
	/// Scopes queued through [`Runtime::queue_activated_scope`] during the flush.
	fn activated(&self, rt: &Runtime, scopes: &[ScopeId]) {
		let _ = (rt, scopes);
	}

	/// Scopes whose render watcher ran during the flush, in flush order.
	fn updated(&self, rt: &Runtime, scopes: &[ScopeId]) {
		let _ = (rt, scopes);
	}
}

#[derive(Default)]
pub(crate) struct SchedulerState {
	queue: Vec<Watcher>,
	/// Watchers queued at or before the cursor, run by the next flush
	deferred: Vec<Watcher>,
	activated: Vec<ScopeId>,
	has: HashSet<WatcherId>,
	circular: HashMap<WatcherId, usize>,
	waiting: bool,
	flushing: bool,
	index: usize,
	runaway: Option<Watcher>,
}

impl SchedulerState {
	pub(crate) fn is_pending(&self) -> bool {
		self.waiting
	}

	pub(crate) fn is_flushing(&self) -> bool {
		self.flushing
	}
}

/// Queues `watcher` for the next flush. Duplicate requests are ignored.
pub(crate) fn queue_watcher(rt: &Runtime, watcher: Watcher) {
	let config = rt.config();
	let schedule = {
		let mut state = rt.scheduler_state().borrow_mut();
		let id = watcher.id();
		if !state.has.insert(id) {
			return;
		}
		if state.flushing && config.mode.is_development() {
			let count = state.circular.entry(id).or_insert(0);
			*count += 1;
			if *count > config.max_update_count && state.runaway.is_none() {
				state.runaway = Some(watcher.clone());
			}
		}
		if !state.flushing {
			state.queue.push(watcher);
		} else {
			let cursor = state.queue.get(state.index).map(Watcher::id);
			match cursor {
				Some(cursor) if id > cursor => {
					let mut i = state.queue.len() - 1;
					while i > state.index && state.queue[i].id() > id {
						i -= 1;
					}
					state.queue.insert(i + 1, watcher);
				}
				_ => state.deferred.push(watcher),
			}
		}
		if state.waiting {
			false
		} else {
			state.waiting = true;
			true
		}
	};
	if schedule {
		schedule_flush(rt, config);
	}
}

fn schedule_flush(rt: &Runtime, config: RuntimeConfig) {
	if config.async_flush {
		next_tick(
			rt,
			Box::new(|rt: &Runtime| {
				flush_scheduler_queue(rt);
				Ok(())
			}),
		);
	} else {
		flush_scheduler_queue(rt);
	}
}

/// Records a kept-alive scope activation to report after the flush.
pub(crate) fn queue_activated_scope(rt: &Runtime, scope: ScopeId) {
	rt.scheduler_state().borrow_mut().activated.push(scope);
}

/// Runs every queued watcher. Re-entrant calls are ignored.
///
/// Watchers deferred behind the cursor form the next batch. In synchronous
/// mode that batch runs in the same call, one pass after another, so a long
/// chain of re-queues never grows the stack.
pub(crate) fn flush_scheduler_queue(rt: &Runtime) {
	let config = rt.config();
	while flush_pass(rt, config) {
		if config.async_flush {
			schedule_flush(rt, config);
			return;
		}
	}
}

/// Runs one batch. Returns whether deferred watchers are waiting for another.
fn flush_pass(rt: &Runtime, config: RuntimeConfig) -> bool {
	{
		let mut state = rt.scheduler_state().borrow_mut();
		if state.flushing {
			return false;
		}
		state.flushing = true;
		state.index = 0;
		state.queue.sort_by_key(Watcher::id);
	}

	let mut runaway = None;
	loop {
		let watcher = {
			let state = rt.scheduler_state().borrow();
			match state.queue.get(state.index) {
				Some(watcher) => watcher.clone(),
				None => break,
			}
		};
		if let Err(err) = watcher.run_before(rt) {
			handle_error(rt, &err, watcher.scope(), "before hook");
		}
		rt.scheduler_state().borrow_mut().has.remove(&watcher.id());
		if let Err(err) = watcher.run() {
			handle_error(rt, &err, watcher.scope(), "scheduler flush");
		}
		let mut state = rt.scheduler_state().borrow_mut();
		if let Some(looping) = state.runaway.take() {
			runaway = Some(looping);
			break;
		}
		state.index += 1;
	}

	let (activated, updated, carry_over) = {
		let mut state = rt.scheduler_state().borrow_mut();
		let activated = std::mem::take(&mut state.activated);
		let updated: Vec<ScopeId> = state
			.queue
			.iter()
			.filter(|watcher| watcher.is_render() && watcher.is_active())
			.filter_map(Watcher::scope)
			.collect();
		let carry = if runaway.is_some() {
			Vec::new()
		} else {
			std::mem::take(&mut state.deferred)
		};
		state.deferred.clear();
		state.queue.clear();
		state.has.clear();
		state.index = 0;
		state.flushing = false;
		if carry.is_empty() {
			state.circular.clear();
			state.waiting = false;
		} else {
			state.has.extend(carry.iter().map(Watcher::id));
			state.queue = carry;
			state.waiting = true;
		}
		(activated, updated, !state.queue.is_empty())
	};

	if let Some(watcher) = runaway {
		let location = if watcher.is_render() {
			"in a component render function.".to_string()
		} else {
			format!("in watcher with expression \"{}\"", watcher.expression())
		};
		crate::dev_warn!(config.mode, "{}", ReactiveError::InfiniteUpdateLoop { location });
	}

	if let Some(hooks) = rt.lifecycle_hooks() {
		if !activated.is_empty() {
			hooks.activated(rt, &activated);
		}
		if !updated.is_empty() {
			hooks.updated(rt, &updated);
		}
	}

	carry_over
}

#[cfg(test)]
mod tests {
	use crate::{Runtime, RuntimeConfig, Value, WatcherOptions};
	use serde_json::json;
	use std::cell::RefCell;
	use std::rc::Rc;

	fn logging_watcher(
		rt: &Runtime,
		data: &Value,
		key: &'static str,
		name: &'static str,
		log: &Rc<RefCell<Vec<&'static str>>>,
	) -> crate::Watcher {
		let (d, l) = (data.clone(), log.clone());
		rt.watcher(
			None,
			move |_: &Runtime| {
				l.borrow_mut().push(name);
				Ok(d.as_object().unwrap().get(key).unwrap_or_default())
			},
			None,
			WatcherOptions::default(),
		)
		.unwrap()
	}

	#[test]
	fn test_flush_runs_in_id_order_and_dedups() {
		let rt = Runtime::new();
		let data = rt.reactive(json!({"a": 1, "b": 1}));
		let log = Rc::new(RefCell::new(Vec::new()));
		let parent = logging_watcher(&rt, &data, "a", "parent", &log);
		let child = logging_watcher(&rt, &data, "b", "child", &log);
		log.borrow_mut().clear();

		let obj = data.as_object().unwrap();
		obj.set("b", 2);
		obj.set("a", 2);
		obj.set("b", 3);
		assert!(log.borrow().is_empty());
		assert!(rt.is_flush_pending());

		rt.run_until_idle();
		assert_eq!(*log.borrow(), vec!["parent", "child"]);
		assert!(!rt.is_flush_pending());
		drop((parent, child));
	}

	#[test]
	fn test_watcher_queued_ahead_of_cursor_joins_current_flush() {
		let rt = Runtime::new();
		let data = rt.reactive(json!({"a": 1, "b": 1}));
		let log = Rc::new(RefCell::new(Vec::new()));
		let (d, l) = (data.clone(), log.clone());
		// Earlier watcher writes the later watcher's dependency while flushing.
		let _writer = rt
			.watcher(
				None,
				move |_: &Runtime| {
					l.borrow_mut().push("writer");
					let obj = d.as_object().unwrap();
					let a = obj.get("a").unwrap().as_f64().unwrap();
					obj.set("b", a * 10.0);
					Ok(Value::Null)
				},
				None,
				WatcherOptions::default(),
			)
			.unwrap();
		let _reader = logging_watcher(&rt, &data, "b", "reader", &log);
		log.borrow_mut().clear();

		data.as_object().unwrap().set("a", 2);
		let drained = rt.flush_callbacks();
		assert_eq!(drained, 1);
		assert_eq!(*log.borrow(), vec!["writer", "reader"]);
		assert!(!rt.is_flush_pending());
	}

	#[test]
	fn test_watcher_queued_behind_cursor_runs_next_flush() {
		let rt = Runtime::new();
		let data = rt.reactive(json!({"a": 1, "b": 1}));
		let log = Rc::new(RefCell::new(Vec::new()));
		let _first = logging_watcher(&rt, &data, "a", "first", &log);
		let (d, l) = (data.clone(), log.clone());
		let _second = rt
			.watcher(
				None,
				move |_: &Runtime| {
					l.borrow_mut().push("second");
					let obj = d.as_object().unwrap();
					let b = obj.get("b").unwrap().as_f64().unwrap();
					obj.set("a", b);
					Ok(Value::Null)
				},
				None,
				WatcherOptions::default(),
			)
			.unwrap();
		log.borrow_mut().clear();

		data.as_object().unwrap().set("b", 5);
		rt.flush_callbacks();
		assert_eq!(*log.borrow(), vec!["second"]);
		assert!(rt.is_flush_pending());
		rt.flush_callbacks();
		assert_eq!(*log.borrow(), vec!["second", "first"]);
	}

	#[test]
	fn test_infinite_loop_is_aborted_in_development() {
		let rt = Runtime::new();
		let data = rt.reactive(json!({"n": 0}));
		let d = data.clone();
		let runs = Rc::new(RefCell::new(0usize));
		let r = runs.clone();
		let _looping = rt
			.watcher(
				None,
				move |_: &Runtime| {
					*r.borrow_mut() += 1;
					let obj = d.as_object().unwrap();
					let n = obj.get("n").unwrap().as_f64().unwrap();
					obj.set("n", n + 1.0);
					Ok(Value::Null)
				},
				None,
				WatcherOptions {
					expression: Some("bump".into()),
					..WatcherOptions::default()
				},
			)
			.unwrap();
		rt.run_until_idle();
		assert!(*runs.borrow() <= 102);
		assert!(!rt.is_flush_pending());
	}

	#[test]
	fn test_synchronous_mode_flushes_immediately() {
		let rt = Runtime::with_config(RuntimeConfig::default().with_async_flush(false));
		let data = rt.reactive(json!({"a": 1}));
		let log = Rc::new(RefCell::new(Vec::new()));
		let _w = logging_watcher(&rt, &data, "a", "w", &log);
		data.as_object().unwrap().set("a", 2);
		assert_eq!(log.borrow().len(), 2);
	}

	#[test]
	fn test_synchronous_production_chain_runs_pass_after_pass() {
		let rt = Runtime::with_config(RuntimeConfig::production().with_async_flush(false));
		let data = rt.reactive(json!({"n": 0}));
		let d = data.clone();
		let runs = Rc::new(RefCell::new(0usize));
		let r = runs.clone();
		// Each run re-queues the watcher behind the cursor until n reaches 10k.
		let _counter = rt
			.watcher(
				None,
				move |_: &Runtime| {
					*r.borrow_mut() += 1;
					let obj = d.as_object().unwrap();
					let n = obj.get("n").unwrap().as_f64().unwrap();
					if n > 0.0 && n < 10_000.0 {
						obj.set("n", n + 1.0);
					}
					Ok(Value::Null)
				},
				None,
				WatcherOptions::default(),
			)
			.unwrap();

		data.as_object().unwrap().set("n", 1);
		assert_eq!(data.as_object().unwrap().peek("n").unwrap().as_f64(), Some(10_000.0));
		assert_eq!(*runs.borrow(), 10_001);
		assert!(!rt.is_flush_pending());
		assert!(!rt.is_flushing());
	}
}
