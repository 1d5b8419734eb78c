//! Mounting render functions
//!
//! A mounted component is a scope plus one render watcher. The watcher's
//! getter calls the render function and hands the new tree to a
//! [`Reconciler`], so every reactive read made while rendering becomes a
//! dependency of the component, and a change re-renders it on the next
//! scheduler flush.
//!
//! ```
//! use reinhardt_ui::reactive::{ReactiveResult, Runtime, Value};
//! use reinhardt_ui::render::{Reconciler, mount};
//!
//! #[derive(Default)]
//! struct Log(Vec<String>);
//!
//! impl Reconciler for Log {
//! 	type Tree = String;
//!
//! 	fn patch(&mut self, _previous: Option<&String>, next: &String) -> ReactiveResult<()> {
//! 		self.0.push(next.clone());
//! 		Ok(())
//! 	}
//! }
//!
//! let rt = Runtime::new();
//! let state = rt.reactive(Value::object([("msg", Value::from("hi"))]));
//! let source = state.clone();
//! let mounted = mount(
//! 	&rt,
//! 	None,
//! 	move |_: &Runtime| {
//! 		let msg = source.as_object().and_then(|obj| obj.get("msg"));
//! 		Ok(msg.map(|msg| msg.to_string()).unwrap_or_default())
//! 	},
//! 	Log::default(),
//! 	None,
//! )
//! .unwrap();
//! assert_eq!(mounted.reconciler().borrow().0, ["hi"]);
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use reinhardt_reactive::{BeforeHook, ReactiveResult, Runtime, ScopeId, Value, Watcher, WatcherOptions};

/// Applies rendered trees to a host.
pub trait Reconciler {
	/// Output of the render function
	type Tree;

	/// Brings the host from `previous` (`None` on first mount) to `next`.
	fn patch(&mut self, previous: Option<&Self::Tree>, next: &Self::Tree) -> ReactiveResult<()>;
}

/// A mounted component.
pub struct Mounted<R: Reconciler> {
	runtime: Runtime,
	scope: ScopeId,
	watcher: Watcher,
	reconciler: Rc<RefCell<R>>,
	tree: Rc<RefCell<Option<R::Tree>>>,
}

impl<R: Reconciler> Mounted<R> {
	pub fn scope(&self) -> ScopeId {
		self.scope
	}

	/// The render watcher.
	pub fn watcher(&self) -> &Watcher {
		&self.watcher
	}

	pub fn reconciler(&self) -> &Rc<RefCell<R>> {
		&self.reconciler
	}

	/// Calls `f` with the last successfully patched tree.
	pub fn with_tree<T>(&self, f: impl FnOnce(Option<&R::Tree>) -> T) -> T {
		f(self.tree.borrow().as_ref())
	}

	/// Destroys the scope, tearing down the render watcher and every
	/// watcher created inside the component.
	pub fn destroy(self) {
		self.runtime.destroy_scope(self.scope);
	}
}

/// Mounts `render` in a new child scope of `parent`.
///
/// The first render happens before this returns. A render or patch
/// failure is routed to the error capture chain with the component's scope
/// and the previously patched tree is kept. `before_update` runs before
/// each scheduled re-render.
///
/// # Errors
///
/// Fails only if the render watcher itself cannot be created.
pub fn mount<F, R>(
	rt: &Runtime,
	parent: Option<ScopeId>,
	render: F,
	reconciler: R,
	before_update: Option<BeforeHook>,
) -> ReactiveResult<Mounted<R>>
where
	F: Fn(&Runtime) -> ReactiveResult<R::Tree> + 'static,
	R: Reconciler + 'static,
	R::Tree: 'static,
{
	let scope = rt.create_scope(parent);
	let reconciler = Rc::new(RefCell::new(reconciler));
	let tree: Rc<RefCell<Option<R::Tree>>> = Rc::new(RefCell::new(None));

	let getter = {
		let reconciler = reconciler.clone();
		let tree = tree.clone();
		move |rt: &Runtime| -> ReactiveResult<Value> {
			let next = match render(rt) {
				Ok(next) => next,
				Err(err) => {
					rt.handle_error(&err, Some(scope), "render");
					return Ok(Value::Null);
				}
			};
			let patched = reconciler.borrow_mut().patch(tree.borrow().as_ref(), &next);
			match patched {
				Ok(()) => *tree.borrow_mut() = Some(next),
				Err(err) => rt.handle_error(&err, Some(scope), "patch"),
			}
			Ok(Value::Null)
		}
	};

	let watcher = match rt.watcher(
		Some(scope),
		getter,
		None,
		WatcherOptions {
			before: before_update,
			is_render: true,
			expression: Some("render".to_string()),
			..WatcherOptions::default()
		},
	) {
		Ok(watcher) => watcher,
		Err(err) => {
			rt.destroy_scope(scope);
			return Err(err);
		}
	};
	tracing::debug!(?scope, watcher = ?watcher.id(), "mounted component");

	Ok(Mounted {
		runtime: rt.clone(),
		scope,
		watcher,
		reconciler,
		tree,
	})
}
