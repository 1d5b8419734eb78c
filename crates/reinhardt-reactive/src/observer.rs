//! Reactive object wrapper
//!
//! Observing a value attaches an [`Observer`] to it. The observer owns the
//! value's shape dependency (keys added or removed, array mutations) and
//! every own property of an observed object gets its own [`Dep`]. Nested
//! values are observed eagerly.
//!
//! ## Key Features
//!
//! - **Idempotent**: observing an observed value returns the existing wrapper
//! - **Selective**: frozen, non-extensible and internal values are skipped
//! - **Toggleable**: [`Runtime::toggle_observing`] suspends recursive
//!   observation while cloning or diffing
//! - **Root guard**: root data objects refuse reactive key addition/removal

use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::dep::Dep;
use crate::error::{ReactiveError, ReactiveResult};
use crate::runtime::{Runtime, RuntimeInner};
use crate::value::{Array, Key, Object, Property, Value};

struct ObserverInner {
	dep: Dep,
	vm_count: Cell<usize>,
	runtime: Weak<RuntimeInner>,
}

/// Reactive wrapper attached to an observed object or array.
#[derive(Clone)]
pub struct Observer(Rc<ObserverInner>);

impl Observer {
	fn new(rt: &Runtime) -> Self {
		Self(Rc::new(ObserverInner {
			dep: Dep::new(),
			vm_count: Cell::new(0),
			runtime: rt.downgrade(),
		}))
	}

	/// Shape dependency of the observed value.
	pub fn dep(&self) -> &Dep {
		&self.0.dep
	}

	/// Number of scopes using the observed value as root data.
	pub fn vm_count(&self) -> usize {
		self.0.vm_count.get()
	}

	pub(crate) fn runtime(&self) -> Option<Runtime> {
		Runtime::upgrade(&self.0.runtime)
	}
}

impl fmt::Debug for Observer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Observer")
			.field("dep", &self.0.dep)
			.field("vm_count", &self.0.vm_count.get())
			.finish()
	}
}

/// Attaches an observer to `value` if it can be observed.
///
/// Returns the existing observer for already-observed values and `None` for
/// primitives, frozen, non-extensible and internal values, or when
/// observation is toggled off.
pub(crate) fn observe(rt: &Runtime, value: &Value, as_root: bool) -> Option<Observer> {
	let observer = match value {
		Value::Object(object) => observe_object(rt, object),
		Value::Array(array) => observe_array(rt, array),
		_ => None,
	}?;
	if as_root {
		observer.0.vm_count.set(observer.0.vm_count.get() + 1);
	}
	Some(observer)
}

fn observe_object(rt: &Runtime, object: &Object) -> Option<Observer> {
	if let Some(existing) = object.observer() {
		return Some(existing);
	}
	let flags = object.flags();
	if !rt.should_observe() || !flags.extensible || flags.frozen || flags.internal {
		return None;
	}
	let observer = Observer::new(rt);
	*object.0.observer.borrow_mut() = Some(observer.clone());
	for key in object.keys() {
		define_reactive(rt, object, &key, None, false);
	}
	Some(observer)
}

fn observe_array(rt: &Runtime, array: &Array) -> Option<Observer> {
	if let Some(existing) = array.observer() {
		return Some(existing);
	}
	let flags = array.flags();
	if !rt.should_observe() || !flags.extensible || flags.frozen || flags.internal {
		return None;
	}
	let observer = Observer::new(rt);
	*array.0.observer.borrow_mut() = Some(observer.clone());
	observe_items(rt, &array.to_vec());
	Some(observer)
}

/// Observes each element of a freshly inserted run of array items.
pub(crate) fn observe_items(rt: &Runtime, items: &[Value]) {
	for item in items {
		observe(rt, item, false);
	}
}

/// Turns `key` of `object` into a tracked property.
///
/// When `value` is `None` the current value is kept. Shallow properties do not
/// observe their value.
pub(crate) fn define_reactive(rt: &Runtime, object: &Object, key: &str, value: Option<Value>, shallow: bool) {
	let value = match value {
		Some(value) => value,
		None => object.peek(key).unwrap_or_default(),
	};
	if !shallow {
		observe(rt, &value, false);
	}
	object.insert_property(
		key,
		Property {
			value,
			dep: Some(Dep::new()),
			shallow,
		},
	);
}

/// Tracked getter.
pub(crate) fn reactive_get(object: &Object, key: &str) -> Option<Value> {
	let property = object.property(key)?;
	if let Some(dep) = &property.dep
		&& let Some(rt) = object.observer().and_then(|ob| ob.runtime())
		&& rt.current_target().is_some()
	{
		dep.depend(&rt);
		if !property.shallow
			&& let Some(child) = property.value.observer()
		{
			child.dep().depend(&rt);
			if let Value::Array(array) = &property.value {
				depend_array(&rt, array);
			}
		}
	}
	Some(property.value)
}

/// Tracked setter.
pub(crate) fn reactive_set(object: &Object, key: &str, value: Value) {
	let flags = object.flags();
	if flags.frozen {
		return;
	}
	let Some(property) = object.property(key) else {
		if flags.extensible {
			object.insert_property(key, Property::plain(value));
		}
		return;
	};
	let Some(dep) = property.dep.clone() else {
		object.insert_property(key, Property { value, ..property });
		return;
	};
	if property.value.same_value(&value) {
		return;
	}
	let shallow = property.shallow;
	object.insert_property(
		key,
		Property {
			value: value.clone(),
			dep: Some(dep.clone()),
			shallow,
		},
	);
	if let Some(rt) = object.observer().and_then(|ob| ob.runtime()) {
		if !shallow {
			observe(&rt, &value, false);
		}
		dep.notify(&rt);
	}
}

/// Records the shape dependency of every nested observed element, since
/// element reads cannot be intercepted.
pub(crate) fn depend_array(rt: &Runtime, array: &Array) {
	for item in array.to_vec() {
		if let Some(observer) = item.observer() {
			observer.dep().depend(rt);
		}
		if let Value::Array(nested) = &item {
			depend_array(rt, nested);
		}
	}
}

/// Adds a property (or array element) and triggers change notification if
/// the property did not exist.
pub(crate) fn set(rt: &Runtime, target: &Value, key: Key, value: Value) -> ReactiveResult<Value> {
	match (target, key) {
		(Value::Array(array), Key::Index(index)) => {
			array.set(index, value.clone());
			Ok(value)
		}
		(Value::Array(_), Key::Name(name)) => Err(ReactiveError::InvalidTarget {
			operation: "set",
			value: format!("array key \"{name}\""),
		}),
		(Value::Object(object), key) => {
			let key = key.to_string();
			if object.contains_key(&key) {
				object.set(&key, value.clone());
				return Ok(value);
			}
			let observer = object.observer();
			if object.is_internal() || observer.as_ref().is_some_and(|ob| ob.vm_count() > 0) {
				crate::dev_warn!(rt.config().mode, "{}", ReactiveError::RootDataMutation);
				return Err(ReactiveError::RootDataMutation);
			}
			match observer {
				None => object.set(&key, value.clone()),
				Some(observer) => {
					define_reactive(rt, object, &key, Some(value.clone()), false);
					observer.dep().notify(rt);
				}
			}
			Ok(value)
		}
		(other, _) => {
			let err = ReactiveError::InvalidTarget {
				operation: "set",
				value: format!("{other}"),
			};
			crate::dev_warn!(rt.config().mode, "{}", err);
			Err(err)
		}
	}
}

/// Removes a property (or array element) and triggers change notification if
/// it existed.
pub(crate) fn delete(rt: &Runtime, target: &Value, key: Key) -> ReactiveResult<()> {
	match (target, key) {
		(Value::Array(array), Key::Index(index)) => {
			if index < array.len() {
				array.splice(index, 1, Vec::new());
			}
			Ok(())
		}
		(Value::Object(object), key) => {
			let key = key.to_string();
			let observer = object.observer();
			if object.is_internal() || observer.as_ref().is_some_and(|ob| ob.vm_count() > 0) {
				crate::dev_warn!(rt.config().mode, "{}", ReactiveError::RootDataMutation);
				return Err(ReactiveError::RootDataMutation);
			}
			if object.is_frozen() || object.remove_property(&key).is_none() {
				return Ok(());
			}
			if let Some(observer) = observer {
				observer.dep().notify(rt);
			}
			Ok(())
		}
		(other, _) => {
			let err = ReactiveError::InvalidTarget {
				operation: "delete",
				value: format!("{other}"),
			};
			crate::dev_warn!(rt.config().mode, "{}", err);
			Err(err)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::RuntimeConfig;
	use serde_json::json;

	fn runtime() -> Runtime {
		Runtime::with_config(RuntimeConfig::default().with_async_flush(false))
	}

	#[test]
	fn test_observe_is_idempotent() {
		let rt = runtime();
		let data = Value::from(json!({"a": {"b": 1}}));
		let first = rt.observe(&data).unwrap();
		let second = rt.observe(&data).unwrap();
		assert_eq!(first.dep().id(), second.dep().id());
	}

	#[test]
	fn test_nested_values_observed_eagerly() {
		let rt = runtime();
		let data = Value::from(json!({"a": {"b": [ {"c": 1} ]}}));
		rt.observe(&data);
		let a = data.as_object().unwrap().peek("a").unwrap();
		assert!(a.observer().is_some());
		let b = a.as_object().unwrap().peek("b").unwrap();
		assert!(b.observer().is_some());
		assert!(b.as_array().unwrap().get(0).unwrap().observer().is_some());
	}

	#[test]
	fn test_primitives_and_frozen_values_are_skipped() {
		let rt = runtime();
		assert!(rt.observe(&Value::from(1)).is_none());
		let frozen = Object::new();
		frozen.freeze();
		assert!(rt.observe(&Value::Object(frozen)).is_none());
		let internal = Object::new();
		internal.mark_internal();
		assert!(rt.observe(&Value::Object(internal)).is_none());
		let sealed = Array::new(vec![]);
		sealed.prevent_extensions();
		assert!(rt.observe(&Value::Array(sealed)).is_none());
	}

	#[test]
	fn test_toggle_observing_suspends_wrapping() {
		let rt = runtime();
		rt.toggle_observing(false);
		let data = Value::from(json!({"a": 1}));
		assert!(rt.observe(&data).is_none());
		rt.toggle_observing(true);
		assert!(rt.observe(&data).is_some());
	}

	#[test]
	fn test_root_counts_refuse_key_addition() {
		let rt = runtime();
		let data = Value::from(json!({"a": 1}));
		let observer = rt.observe_root(&data).unwrap();
		assert_eq!(observer.vm_count(), 1);
		assert!(matches!(rt.set(&data, "b", Value::from(2)), Err(ReactiveError::RootDataMutation)));
		assert!(matches!(rt.delete(&data, "a"), Err(ReactiveError::RootDataMutation)));
		// Existing keys can still be assigned.
		assert!(rt.set(&data, "a", Value::from(5)).is_ok());
		assert_eq!(data.as_object().unwrap().peek("a"), Some(Value::from(5)));
	}

	#[test]
	fn test_set_on_primitive_is_rejected() {
		let rt = runtime();
		let err = rt.set(&Value::from(3), "a", Value::Null).unwrap_err();
		assert!(matches!(err, ReactiveError::InvalidTarget { operation: "set", .. }));
	}

	#[test]
	fn test_set_on_unobserved_object_stores_plainly() {
		let rt = runtime();
		let data = Value::from(json!({}));
		rt.set(&data, "x", Value::from(1)).unwrap();
		let object = data.as_object().unwrap();
		assert_eq!(object.peek("x"), Some(Value::from(1)));
		assert!(object.property("x").unwrap().dep.is_none());
	}

	#[test]
	fn test_assigned_nested_value_becomes_reactive() {
		let rt = runtime();
		let data = Value::from(json!({"a": null}));
		rt.observe(&data);
		let fresh = Value::from(json!({"n": 1}));
		data.as_object().unwrap().set("a", fresh.clone());
		assert!(fresh.observer().is_some());
	}

	#[test]
	fn test_delete_missing_key_is_noop() {
		let rt = runtime();
		let data = Value::from(json!({"a": 1}));
		rt.observe(&data);
		assert!(rt.delete(&data, "missing").is_ok());
		assert_eq!(data.as_object().unwrap().len(), 1);
	}
}
