//! Error capture chain
//!
//! Failures of user callbacks are routed here instead of unwinding through
//! the scheduler. Starting from the parent of the scope the error originated
//! in, every ancestor's error-capture hooks are called outward; a hook
//! returning [`Propagation::Stop`] ends the walk. Unclaimed errors reach the
//! global handler and, failing that, the log.
//!
//! Dependency tracking is suspended while hooks and handlers run, so reading
//! reactive state from a hook never subscribes the failing watcher.

use std::future::Future;

use crate::error::{ReactiveError, ReactiveResult};
use crate::runtime::Runtime;
use crate::scope::{Propagation, ScopeId};

/// Global handler receiving `(error, originating scope, info)`.
///
/// Returning `Ok(())` marks the error as handled. A failing handler is
/// logged in addition to the original error.
pub type GlobalErrorHandler = std::rc::Rc<dyn Fn(&ReactiveError, Option<ScopeId>, &str) -> ReactiveResult<()>>;

/// Routes `err` through the capture chain of `scope`.
///
/// # Arguments
///
/// * `scope` - scope owning the failed callback, if any
/// * `info` - short description of where the error happened
pub fn handle_error(rt: &Runtime, err: &ReactiveError, scope: Option<ScopeId>, info: &str) {
	rt.push_target(None);
	if !capture(rt, err, scope, info) {
		global_handle_error(rt, err, scope, info);
	}
	rt.pop_target();
}

fn capture(rt: &Runtime, err: &ReactiveError, scope: Option<ScopeId>, info: &str) -> bool {
	let Some(origin) = scope else {
		return false;
	};
	let mut current = rt.scope_parent(origin);
	while let Some(id) = current {
		for hook in rt.error_captured_hooks(id) {
			match hook(err, origin, info) {
				Ok(Propagation::Stop) => return true,
				Ok(Propagation::Continue) => {}
				Err(hook_err) => global_handle_error(rt, &hook_err, Some(id), "errorCaptured hook"),
			}
		}
		current = rt.scope_parent(id);
	}
	false
}

fn global_handle_error(rt: &Runtime, err: &ReactiveError, scope: Option<ScopeId>, info: &str) {
	if let Some(handler) = rt.error_handler() {
		match handler(err, scope, info) {
			Ok(()) => return,
			Err(handler_err) => log_error(rt, &handler_err, "global error handler"),
		}
	}
	log_error(rt, err, info);
}

fn log_error(rt: &Runtime, err: &ReactiveError, info: &str) {
	crate::dev_warn!(rt.config().mode, "Error in {}: \"{}\"", info, err);
	tracing::error!(target: "reinhardt", info, error = %err, "unhandled error");
}

/// Runs a user callback, routing a failure through [`handle_error`].
///
/// Errors already marked handled are not routed again. Returns `None` when
/// the callback failed.
pub fn invoke_with_error_handling<T, F>(rt: &Runtime, scope: Option<ScopeId>, info: &str, f: F) -> Option<T>
where
	F: FnOnce() -> ReactiveResult<T>,
{
	match f() {
		Ok(value) => Some(value),
		Err(err) => {
			if !err.is_handled() {
				handle_error(rt, &err, scope, info);
			}
			None
		}
	}
}

/// Awaits an asynchronous user handler, routing a failure through
/// [`handle_error`] once.
///
/// The returned error is marked handled, so an enclosing call that catches it
/// again does not report it a second time.
pub async fn invoke_async_with_error_handling<T, F>(
	rt: &Runtime,
	scope: Option<ScopeId>,
	info: &str,
	future: F,
) -> ReactiveResult<T>
where
	F: Future<Output = ReactiveResult<T>>,
{
	match future.await {
		Ok(value) => Ok(value),
		Err(err) if err.is_handled() => Err(err),
		Err(err) => {
			handle_error(rt, &err, scope, info);
			Err(err.into_handled())
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::cell::RefCell;
	use std::rc::Rc;

	#[test]
	fn test_hooks_called_from_parent_outward() {
		let rt = Runtime::new();
		let root = rt.create_scope(None);
		let middle = rt.create_scope(Some(root));
		let leaf = rt.create_scope(Some(middle));
		let log = Rc::new(RefCell::new(Vec::new()));
		for (scope, name) in [(root, "root"), (middle, "middle"), (leaf, "leaf")] {
			let l = log.clone();
			rt.on_error_captured(scope, move |_err, origin, _info| {
				l.borrow_mut().push((name, origin));
				Ok(Propagation::Continue)
			});
		}
		handle_error(&rt, &ReactiveError::callback("x"), Some(leaf), "test");
		assert_eq!(*log.borrow(), vec![("middle", leaf), ("root", leaf)]);
	}

	#[test]
	fn test_stop_suppresses_global_handler() {
		let rt = Runtime::new();
		let root = rt.create_scope(None);
		let leaf = rt.create_scope(Some(root));
		rt.on_error_captured(root, |_err, _origin, _info| Ok(Propagation::Stop));
		let global = Rc::new(RefCell::new(0));
		let g = global.clone();
		rt.set_error_handler(move |_err, _scope, _info| {
			*g.borrow_mut() += 1;
			Ok(())
		});
		handle_error(&rt, &ReactiveError::callback("x"), Some(leaf), "test");
		assert_eq!(*global.borrow(), 0);
		handle_error(&rt, &ReactiveError::callback("x"), Some(root), "test");
		assert_eq!(*global.borrow(), 1);
	}

	#[test]
	fn test_failing_hook_goes_to_global_handler() {
		let rt = Runtime::new();
		let root = rt.create_scope(None);
		let leaf = rt.create_scope(Some(root));
		rt.on_error_captured(root, |_err, _origin, _info| Err(ReactiveError::callback("hook broke")));
		let seen = Rc::new(RefCell::new(Vec::new()));
		let s = seen.clone();
		rt.set_error_handler(move |err, _scope, info| {
			s.borrow_mut().push(format!("{info}: {err}"));
			Ok(())
		});
		handle_error(&rt, &ReactiveError::callback("original"), Some(leaf), "render");
		assert_eq!(
			*seen.borrow(),
			vec!["errorCaptured hook: hook broke".to_string(), "render: original".to_string()]
		);
	}

	#[test]
	fn test_invoke_skips_already_handled_errors() {
		let rt = Runtime::new();
		let count = Rc::new(RefCell::new(0));
		let c = count.clone();
		rt.set_error_handler(move |_err, _scope, _info| {
			*c.borrow_mut() += 1;
			Ok(())
		});
		let out: Option<()> =
			invoke_with_error_handling(&rt, None, "handler", || Err(ReactiveError::callback("a").into_handled()));
		assert!(out.is_none());
		assert_eq!(*count.borrow(), 0);
	}

	#[test]
	fn test_async_failure_is_reported_once() {
		let rt = Runtime::new();
		let count = Rc::new(RefCell::new(0));
		let c = count.clone();
		rt.set_error_handler(move |_err, _scope, _info| {
			*c.borrow_mut() += 1;
			Ok(())
		});
		let result = futures::executor::block_on(async {
			let inner = invoke_async_with_error_handling(&rt, None, "inner", async {
				Err::<(), _>(ReactiveError::callback("async boom"))
			});
			invoke_async_with_error_handling(&rt, None, "outer", inner).await
		});
		assert!(result.unwrap_err().is_handled());
		assert_eq!(*count.borrow(), 1);
	}
}
