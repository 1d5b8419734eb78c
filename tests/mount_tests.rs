//! Integration tests for mounting render functions
//!
//! 1. The first render is patched synchronously, re-renders are batched
//! 2. Render failures reach the error chain and keep the last tree
//! 3. `before_update` and the `updated` lifecycle hook bracket re-renders
//! 4. Destroying a component stops its updates

use reinhardt_ui::reactive::{BeforeHook, LifecycleHooks, Propagation, ReactiveError};
use reinhardt_ui::{Reconciler, ReactiveResult, Runtime, ScopeId, Value, mount};
use rstest::{fixture, rstest};
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

/// Records every patch as `(previous, next)`.
#[derive(Default)]
struct Recorder {
	patches: Vec<(Option<String>, String)>,
}

impl Reconciler for Recorder {
	type Tree = String;

	fn patch(&mut self, previous: Option<&String>, next: &String) -> ReactiveResult<()> {
		self.patches.push((previous.cloned(), next.clone()));
		Ok(())
	}
}

fn render_greeting(state: &Value) -> impl Fn(&Runtime) -> ReactiveResult<String> + 'static {
	let state = state.clone();
	move |_: &Runtime| {
		let object = state.as_object().ok_or_else(|| ReactiveError::callback("no state"))?;
		let name = object.get("name").unwrap_or_default();
		if name.is_null() {
			return Err(ReactiveError::callback("name is missing"));
		}
		Ok(format!("<p>Hello {name}</p>"))
	}
}

#[fixture]
fn runtime() -> Runtime {
	Runtime::new()
}

#[rstest]
fn test_first_render_then_batched_updates(runtime: Runtime) {
	let state = runtime.reactive(json!({"name": "Ada", "unused": 0}));
	let mounted = mount(&runtime, None, render_greeting(&state), Recorder::default(), None).unwrap();
	assert_eq!(
		mounted.reconciler().borrow().patches,
		[(None, "<p>Hello Ada</p>".to_owned())]
	);

	let object = state.as_object().unwrap();
	object.set("name", "Grace");
	object.set("name", "Linus");
	object.set("unused", 1);
	assert_eq!(mounted.reconciler().borrow().patches.len(), 1);

	runtime.run_until_idle();
	let patches = &mounted.reconciler().borrow().patches;
	assert_eq!(patches.len(), 2);
	assert_eq!(
		patches[1],
		(Some("<p>Hello Ada</p>".to_owned()), "<p>Hello Linus</p>".to_owned())
	);
	mounted.with_tree(|tree| assert_eq!(tree.map(String::as_str), Some("<p>Hello Linus</p>")));
}

#[rstest]
fn test_render_error_is_captured_and_tree_kept(runtime: Runtime) {
	let parent = runtime.create_scope(None);
	let captured: Rc<RefCell<Vec<(String, String)>>> = Rc::default();
	let sink = captured.clone();
	runtime.on_error_captured(parent, move |err, _, info| {
		sink.borrow_mut().push((err.to_string(), info.to_owned()));
		Ok(Propagation::Stop)
	});

	let state = runtime.reactive(json!({"name": "Ada"}));
	let mounted = mount(&runtime, Some(parent), render_greeting(&state), Recorder::default(), None).unwrap();
	state.as_object().unwrap().set("name", Value::Null);
	runtime.run_until_idle();

	assert_eq!(
		*captured.borrow(),
		[("name is missing".to_owned(), "render".to_owned())]
	);
	assert_eq!(mounted.reconciler().borrow().patches.len(), 1);
	mounted.with_tree(|tree| assert_eq!(tree.map(String::as_str), Some("<p>Hello Ada</p>")));

	// The failed render still tracked its reads, so recovery re-renders.
	state.as_object().unwrap().set("name", "Grace");
	runtime.run_until_idle();
	assert_eq!(mounted.reconciler().borrow().patches.len(), 2);
}

#[rstest]
fn test_failed_first_render_still_mounts(runtime: Runtime) {
	let errors = Rc::new(RefCell::new(Vec::new()));
	let sink = errors.clone();
	runtime.set_error_handler(move |_, scope, info| {
		sink.borrow_mut().push((scope, info.to_owned()));
		Ok(())
	});
	let state = runtime.reactive(json!({}));
	let mounted = mount(&runtime, None, render_greeting(&state), Recorder::default(), None).unwrap();
	assert_eq!(*errors.borrow(), [(Some(mounted.scope()), "render".to_owned())]);
	assert!(mounted.with_tree(|tree| tree.is_none()));
	assert!(mounted.watcher().is_render());
}

struct UpdatedLog(Rc<RefCell<Vec<String>>>);

impl LifecycleHooks for UpdatedLog {
	fn updated(&self, _rt: &Runtime, scopes: &[ScopeId]) {
		self.0.borrow_mut().push(format!("updated {}", scopes.len()));
	}
}

#[rstest]
fn test_before_update_and_updated_bracket_rerender(runtime: Runtime) {
	let log: Rc<RefCell<Vec<String>>> = Rc::default();
	runtime.set_lifecycle_hooks(UpdatedLog(log.clone()));

	let state = runtime.reactive(json!({"name": "Ada"}));
	let render = {
		let log = log.clone();
		let render = render_greeting(&state);
		move |rt: &Runtime| {
			log.borrow_mut().push("render".to_owned());
			render(rt)
		}
	};
	let before: BeforeHook = {
		let log = log.clone();
		Rc::new(move |_: &Runtime| -> ReactiveResult<()> {
			log.borrow_mut().push("before".to_owned());
			Ok(())
		})
	};
	let _mounted = mount(&runtime, None, render, Recorder::default(), Some(before)).unwrap();
	assert_eq!(*log.borrow(), ["render"]);

	state.as_object().unwrap().set("name", "Grace");
	runtime.run_until_idle();
	assert_eq!(*log.borrow(), ["render", "before", "render", "updated 1"]);
}

#[rstest]
fn test_destroy_stops_updates(runtime: Runtime) {
	let state = runtime.reactive(json!({"name": "Ada"}));
	let mounted = mount(&runtime, None, render_greeting(&state), Recorder::default(), None).unwrap();
	let reconciler = mounted.reconciler().clone();
	let watcher = mounted.watcher().clone();
	let scope = mounted.scope();

	mounted.destroy();
	assert!(runtime.is_scope_destroyed(scope));
	assert!(!watcher.is_active());

	state.as_object().unwrap().set("name", "Grace");
	runtime.run_until_idle();
	assert_eq!(reconciler.borrow().patches.len(), 1);
}

#[rstest]
fn test_child_watchers_are_torn_down_with_component(runtime: Runtime) {
	let state = runtime.reactive(json!({"name": "Ada"}));
	let mounted = mount(&runtime, None, render_greeting(&state), Recorder::default(), None).unwrap();
	let child = runtime.create_scope(Some(mounted.scope()));
	let source = state.clone();
	let computed = runtime
		.computed(Some(child), move |_| {
			Ok(source.as_object().and_then(|o| o.get("name")).unwrap_or_default())
		})
		.unwrap();
	assert_eq!(computed.get().unwrap(), Value::from("Ada"));

	mounted.destroy();
	assert!(runtime.is_scope_destroyed(child));
	assert!(runtime.scope_watchers(child).is_empty());
}
