//! Explicit watch API

use std::rc::Rc;

use crate::error::{ReactiveError, ReactiveResult};
use crate::runtime::Runtime;
use crate::value::Value;
use crate::watcher::{Getter, Watcher};

/// What a user watcher observes.
#[derive(Clone)]
pub enum WatchSource {
	/// Dot-delimited path into a target value, e.g. `a.b.0.c`
	Path { target: Value, path: String },
	/// Arbitrary tracked computation
	Getter(Getter),
}

impl WatchSource {
	pub fn path(target: &Value, path: impl Into<String>) -> Self {
		Self::Path {
			target: target.clone(),
			path: path.into(),
		}
	}

	pub fn getter<G>(getter: G) -> Self
	where
		G: Fn(&Runtime) -> ReactiveResult<Value> + 'static,
	{
		Self::Getter(Rc::new(getter))
	}

	pub(crate) fn expression(&self) -> String {
		match self {
			Self::Path { path, .. } => path.clone(),
			Self::Getter(_) => "function".to_string(),
		}
	}

	pub(crate) fn into_getter(self) -> ReactiveResult<Getter> {
		match self {
			Self::Getter(getter) => Ok(getter),
			Self::Path { target, path } => {
				let segments = parse_path(&path).ok_or(ReactiveError::InvalidWatchPath(path))?;
				Ok(Rc::new(move |_: &Runtime| Ok(resolve_path(&target, &segments))))
			}
		}
	}
}

/// Splits a watch path into segments.
///
/// Returns `None` if the path contains anything other than word characters,
/// `.` and `$`.
pub fn parse_path(path: &str) -> Option<Vec<String>> {
	let valid = path
		.chars()
		.all(|c| c.is_alphanumeric() || c == '_' || c == '.' || c == '$');
	if !valid {
		return None;
	}
	Some(path.split('.').map(str::to_string).collect())
}

fn resolve_path(target: &Value, segments: &[String]) -> Value {
	let mut current = target.clone();
	for segment in segments {
		current = match &current {
			Value::Object(object) => object.get(segment).unwrap_or_default(),
			Value::Array(array) => segment
				.parse::<usize>()
				.ok()
				.and_then(|index| array.get(index))
				.unwrap_or_default(),
			_ => return Value::Null,
		};
	}
	current
}

/// Options of [`Runtime::watch`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WatchOptions {
	/// Depend on every nested property of the watched value
	pub deep: bool,
	/// Invoke the callback once with the initial value
	pub immediate: bool,
	/// Run on change instead of in the next flush
	pub sync: bool,
}

/// Handle returned by [`Runtime::watch`].
#[derive(Debug, Clone)]
pub struct Unwatch(pub(crate) Watcher);

impl Unwatch {
	/// Tears the watcher down.
	pub fn unwatch(self) {
		self.0.teardown();
	}

	pub fn watcher(&self) -> &Watcher {
		&self.0
	}
}
