//! Deferred callback queue
//!
//! Callbacks requested during one synchronous turn are appended to a single
//! queue and drained together, in FIFO order, by one drain task handed to the
//! host task scheduler. A drain works on a snapshot: callbacks queued while
//! draining wait for the next drain.
//!
//! If no host scheduler is set, the queue must be drained manually with
//! [`Runtime::flush_callbacks`] or [`Runtime::run_until_idle`].
//!
//! ## Example
//!
//! ```ignore
//! use reinhardt_reactive::Runtime;
//!
//! let rt = Runtime::new();
//! rt.next_tick(|_rt| {
//!     println!("after the current batch");
//!     Ok(())
//! });
//! rt.run_until_idle();
//! ```

use std::future::Future;
use std::rc::Rc;

use futures::channel::oneshot;

use crate::error::ReactiveResult;
use crate::error_handling::handle_error;
use crate::runtime::Runtime;

/// A queued deferred callback.
pub type TickCallback = Box<dyn FnOnce(&Runtime) -> ReactiveResult<()>>;

/// Unit of work handed to the host.
pub type Task = Box<dyn FnOnce()>;

/// Host facility that runs a task after the current call stack unwinds,
/// preferably as a microtask.
pub type TaskScheduler = Rc<dyn Fn(Task)>;

#[derive(Default)]
pub(crate) struct TickState {
	callbacks: Vec<TickCallback>,
	pending: bool,
}

impl TickState {
	pub(crate) fn is_pending(&self) -> bool {
		self.pending || !self.callbacks.is_empty()
	}
}

pub(crate) fn next_tick(rt: &Runtime, callback: TickCallback) {
	let schedule = {
		let mut state = rt.tick_state().borrow_mut();
		state.callbacks.push(callback);
		!std::mem::replace(&mut state.pending, true)
	};
	if schedule && let Some(scheduler) = rt.task_scheduler() {
		let weak = rt.downgrade();
		scheduler(Box::new(move || {
			if let Some(rt) = Runtime::upgrade(&weak) {
				flush_callbacks(&rt);
			}
		}));
	}
}

/// Drains a snapshot of the queue. Returns the number of callbacks run.
pub(crate) fn flush_callbacks(rt: &Runtime) -> usize {
	let callbacks = {
		let mut state = rt.tick_state().borrow_mut();
		state.pending = false;
		std::mem::take(&mut state.callbacks)
	};
	let count = callbacks.len();
	for callback in callbacks {
		if let Err(err) = callback(rt) {
			handle_error(rt, &err, None, "nextTick");
		}
	}
	count
}

/// Drains until no callback is queued. Returns the number of callbacks run.
pub(crate) fn run_until_idle(rt: &Runtime) -> usize {
	let mut total = 0;
	loop {
		let ran = flush_callbacks(rt);
		if ran == 0 {
			return total;
		}
		total += ran;
	}
}

/// Future resolving once the deferred callbacks queued before it have run.
pub(crate) fn next_tick_future(rt: &Runtime) -> impl Future<Output = ()> + 'static {
	let (tx, rx) = oneshot::channel::<()>();
	next_tick(
		rt,
		Box::new(move |_: &Runtime| {
			let _ = tx.send(());
			Ok(())
		}),
	);
	async move {
		let _ = rx.await;
	}
}

/// Host scheduler backed by `tokio::task::spawn_local`.
///
/// Tasks must be scheduled from within a `tokio::task::LocalSet`.
#[cfg(feature = "tokio")]
pub fn tokio_task_scheduler() -> TaskScheduler {
	Rc::new(|task: Task| {
		tokio::task::spawn_local(async move { task() });
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::ReactiveError;
	use std::cell::RefCell;
	use std::collections::VecDeque;

	#[test]
	fn test_callbacks_run_in_fifo_order() {
		let rt = Runtime::new();
		let log = Rc::new(RefCell::new(Vec::new()));
		for i in 0..3 {
			let l = log.clone();
			rt.next_tick(move |_| {
				l.borrow_mut().push(i);
				Ok(())
			});
		}
		assert_eq!(rt.flush_callbacks(), 3);
		assert_eq!(*log.borrow(), vec![0, 1, 2]);
	}

	#[test]
	fn test_callbacks_queued_while_draining_wait_for_next_drain() {
		let rt = Runtime::new();
		let log = Rc::new(RefCell::new(Vec::new()));
		let l = log.clone();
		rt.next_tick(move |rt| {
			l.borrow_mut().push("outer");
			let l2 = l.clone();
			rt.next_tick(move |_| {
				l2.borrow_mut().push("inner");
				Ok(())
			});
			Ok(())
		});
		assert_eq!(rt.flush_callbacks(), 1);
		assert_eq!(*log.borrow(), vec!["outer"]);
		assert_eq!(rt.flush_callbacks(), 1);
		assert_eq!(*log.borrow(), vec!["outer", "inner"]);
	}

	#[test]
	fn test_single_drain_task_per_turn() {
		let rt = Runtime::new();
		let tasks: Rc<RefCell<VecDeque<Task>>> = Rc::new(RefCell::new(VecDeque::new()));
		let t = tasks.clone();
		rt.set_task_scheduler(Rc::new(move |task: Task| t.borrow_mut().push_back(task)));
		for _ in 0..5 {
			rt.next_tick(|_| Ok(()));
		}
		assert_eq!(tasks.borrow().len(), 1);
		let task = tasks.borrow_mut().pop_front().unwrap();
		task();
		assert!(!rt.has_pending_callbacks());
	}

	#[test]
	fn test_failing_callback_does_not_stop_the_drain() {
		let rt = Runtime::new();
		let handled = Rc::new(RefCell::new(Vec::new()));
		let h = handled.clone();
		rt.set_error_handler(move |err: &ReactiveError, _scope, info: &str| {
			h.borrow_mut().push(format!("{info}: {err}"));
			Ok(())
		});
		let ran = Rc::new(RefCell::new(false));
		let r = ran.clone();
		rt.next_tick(|_| Err(ReactiveError::callback("boom")));
		rt.next_tick(move |_| {
			*r.borrow_mut() = true;
			Ok(())
		});
		rt.flush_callbacks();
		assert!(*ran.borrow());
		assert_eq!(*handled.borrow(), vec!["nextTick: boom".to_string()]);
	}

	#[test]
	fn test_next_tick_future_resolves_after_drain() {
		let rt = Runtime::new();
		let mut future = Box::pin(rt.next_tick_future());
		let waker = futures::task::noop_waker();
		let mut cx = std::task::Context::from_waker(&waker);
		assert!(future.as_mut().poll(&mut cx).is_pending());
		rt.flush_callbacks();
		assert!(future.as_mut().poll(&mut cx).is_ready());
	}
}
