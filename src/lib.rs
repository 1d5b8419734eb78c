//! # Reinhardt UI
//!
//! A reactive UI runtime: dependency-tracking state, batched re-rendering
//! and a compiler from HTML-like templates to render code.
//!
//! ## Crates
//!
//! - [`reactive`] (`reinhardt-reactive`): observed values, watchers, the
//!   update scheduler, the next-tick queue and the error capture chain
//! - [`compiler`] (`reinhardt-compiler`): tokenizer, AST builder,
//!   optimizer, code generator and the compile-to-function cache
//!
//! This crate adds [`Settings`] for loading both configurations from one
//! TOML or JSON file, and [`render::mount`] for driving a render function
//! from a render watcher.
//!
//! ## Feature Flags
//!
//! - `compiler` (default) - the template compiler
//! - `tokio` - [`reactive::tokio_task_scheduler`] for running next-tick
//!   flushes on a `tokio::task::LocalSet`
//!
//! ## Quick Example
//!
//! ```
//! use reinhardt_ui::reactive::{Runtime, RuntimeConfig, Value, WatchOptions, WatchSource};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let rt = Runtime::with_config(RuntimeConfig::default().with_async_flush(false));
//! let state = rt.reactive(Value::object([("count", Value::from(1))]));
//! let seen = Rc::new(Cell::new(0.0));
//! let sink = seen.clone();
//! let _unwatch = rt
//! 	.watch(
//! 		None,
//! 		WatchSource::path(&state, "count"),
//! 		move |_, new, _| {
//! 			sink.set(new.as_f64().unwrap_or_default());
//! 			Ok(())
//! 		},
//! 		WatchOptions::default(),
//! 	)
//! 	.unwrap();
//! state.as_object().unwrap().set("count", 2);
//! assert_eq!(seen.get(), 2.0);
//! ```

pub mod render;
pub mod settings;

pub use reinhardt_reactive as reactive;

#[cfg(feature = "compiler")]
pub use reinhardt_compiler as compiler;

pub use render::{Mounted, Reconciler, mount};
pub use settings::{Settings, SettingsError};

pub use reinhardt_reactive::{
	Computed, Mode, ReactiveError, ReactiveResult, Runtime, RuntimeConfig, ScopeId, Value, Watcher,
	WatcherOptions,
};

#[cfg(feature = "compiler")]
pub use reinhardt_compiler::{
	CompiledFunctions, CompiledResult, CompilerConfig, CompilerOptions, FunctionFactory, SourceFactory,
	TemplateCompiler, compile,
};
