//! Reactivity error types.
//!
//! Errors raised by user callbacks (watch getters, watch callbacks, hooks,
//! deferred callbacks) are values of [`ReactiveError`] and are funnelled
//! through [`handle_error`](crate::handle_error) instead of unwinding through
//! the scheduler.

use thiserror::Error;

/// Result type for reactive operations.
pub type ReactiveResult<T> = Result<T, ReactiveError>;

/// Reactivity errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReactiveError {
	/// Failure reported by a user supplied callback.
	#[error("{0}")]
	Callback(String),

	/// Failure from an arbitrary source, kept for its `Display` and chain.
	#[error("{0}")]
	External(#[from] Box<dyn std::error::Error + Send + Sync + 'static>),

	/// A watch path contained characters outside `[\w.$]`.
	#[error("Failed watching path: \"{0}\" Watcher only accepts simple dot-delimited paths. For full control, use a function instead.")]
	InvalidWatchPath(String),

	/// Reactive keys cannot be added to or removed from a root data object.
	#[error("Avoid adding or deleting reactive properties on a root data object at runtime - declare it upfront instead.")]
	RootDataMutation,

	/// `set`/`delete` was called on a value that is neither an object nor an array.
	#[error("Cannot {operation} reactive property on null or primitive value: {value}")]
	InvalidTarget {
		/// `set` or `delete`.
		operation: &'static str,
		/// Rendering of the offending value.
		value: String,
	},

	/// A watcher was re-queued too many times in one flush chain.
	#[error("You may have an infinite update loop {location}")]
	InfiniteUpdateLoop {
		/// Either `in watcher with expression "..."` or `in a component render function.`
		location: String,
	},

	/// A watcher getter evaluated itself recursively.
	#[error("watcher \"{0}\" was evaluated while already evaluating")]
	ReentrantEvaluation(String),

	/// An error that has already been routed through the capture chain.
	#[error("{0}")]
	Handled(Box<ReactiveError>),
}

impl ReactiveError {
	/// Shorthand for [`ReactiveError::Callback`].
	pub fn callback(message: impl Into<String>) -> Self {
		Self::Callback(message.into())
	}

	/// Returns `true` if this error was already handled.
	pub fn is_handled(&self) -> bool {
		matches!(self, Self::Handled(_))
	}

	/// Wraps the error as handled. Wrapping twice is a no-op.
	pub fn into_handled(self) -> Self {
		match self {
			handled @ Self::Handled(_) => handled,
			other => Self::Handled(Box::new(other)),
		}
	}
}
