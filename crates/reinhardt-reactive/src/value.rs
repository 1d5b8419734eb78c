//! Dynamic values
//!
//! State handed to the reactivity core is a tree of [`Value`]s. Objects and
//! arrays are reference types: cloning a [`Value::Object`] clones the handle,
//! not the data, so identity is preserved the way shared references behave
//! in a garbage-collected data model.
//!
//! Property access on an [`Object`] goes through the owning object: once the
//! object has been observed, [`Object::get`] records the property's
//! dependency against the evaluating watcher and [`Object::set`] notifies it.
//! Index reads on an [`Array`] are never tracked.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::dep::Dep;
use crate::observer::{self, Observer};

/// Object/array flags that decide whether a value can be observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Flags {
	pub(crate) extensible: bool,
	pub(crate) frozen: bool,
	/// Framework-internal values (render-tree nodes, runtime handles)
	pub(crate) internal: bool,
}

impl Default for Flags {
	fn default() -> Self {
		Self {
			extensible: true,
			frozen: false,
			internal: false,
		}
	}
}

/// One own property of an [`Object`].
///
/// `dep` is `Some` once the property has been made reactive.
#[derive(Clone)]
pub(crate) struct Property {
	pub(crate) value: Value,
	pub(crate) dep: Option<Dep>,
	pub(crate) shallow: bool,
}

impl Property {
	pub(crate) fn plain(value: Value) -> Self {
		Self {
			value,
			dep: None,
			shallow: false,
		}
	}
}

pub(crate) struct ObjectData {
	pub(crate) props: RefCell<IndexMap<String, Property>>,
	pub(crate) flags: Cell<Flags>,
	pub(crate) observer: RefCell<Option<Observer>>,
}

pub(crate) struct ArrayData {
	pub(crate) items: RefCell<Vec<Value>>,
	pub(crate) flags: Cell<Flags>,
	pub(crate) observer: RefCell<Option<Observer>>,
}

/// Keyed structure with insertion-ordered own properties.
#[derive(Clone)]
pub struct Object(pub(crate) Rc<ObjectData>);

/// Ordered sequence.
#[derive(Clone)]
pub struct Array(pub(crate) Rc<ArrayData>);

/// A dynamically typed value.
#[derive(Clone, Default)]
pub enum Value {
	#[default]
	Null,
	Bool(bool),
	Number(f64),
	String(String),
	Object(Object),
	Array(Array),
}

/// Property key used by [`Runtime::set`](crate::Runtime::set) and
/// [`Runtime::delete`](crate::Runtime::delete).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
	Name(String),
	Index(usize),
}

impl From<&str> for Key {
	fn from(value: &str) -> Self {
		Key::Name(value.to_string())
	}
}

impl From<String> for Key {
	fn from(value: String) -> Self {
		Key::Name(value)
	}
}

impl From<usize> for Key {
	fn from(value: usize) -> Self {
		Key::Index(value)
	}
}

impl fmt::Display for Key {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Key::Name(name) => f.write_str(name),
			Key::Index(index) => write!(f, "{index}"),
		}
	}
}

impl Object {
	/// Creates an empty, unobserved object.
	pub fn new() -> Self {
		Self(Rc::new(ObjectData {
			props: RefCell::new(IndexMap::new()),
			flags: Cell::new(Flags::default()),
			observer: RefCell::new(None),
		}))
	}

	/// Creates an object from key/value pairs.
	pub fn from_entries<K, I>(entries: I) -> Self
	where
		K: Into<String>,
		I: IntoIterator<Item = (K, Value)>,
	{
		let object = Self::new();
		{
			let mut props = object.0.props.borrow_mut();
			for (key, value) in entries {
				props.insert(key.into(), Property::plain(value));
			}
		}
		object
	}

	/// Reads a property.
	///
	/// On an observed object this records the property's dependency (and the
	/// nested value's shape dependency) against the current evaluating watcher.
	pub fn get(&self, key: &str) -> Option<Value> {
		observer::reactive_get(self, key)
	}

	/// Reads a property without recording any dependency.
	pub fn peek(&self, key: &str) -> Option<Value> {
		self.0.props.borrow().get(key).map(|prop| prop.value.clone())
	}

	/// Writes a property.
	///
	/// Existing reactive properties go through the tracked setter. A key that
	/// does not exist yet is added as a plain, untracked property; use
	/// [`Runtime::set`](crate::Runtime::set) to add a reactive one.
	/// Writes to frozen objects and new keys on non-extensible objects are
	/// ignored.
	pub fn set(&self, key: &str, value: impl Into<Value>) {
		observer::reactive_set(self, key, value.into());
	}

	pub fn contains_key(&self, key: &str) -> bool {
		self.0.props.borrow().contains_key(key)
	}

	/// Own keys in insertion order.
	pub fn keys(&self) -> Vec<String> {
		self.0.props.borrow().keys().cloned().collect()
	}

	pub fn len(&self) -> usize {
		self.0.props.borrow().len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.props.borrow().is_empty()
	}

	/// The reactive wrapper attached to this object, if observed.
	pub fn observer(&self) -> Option<Observer> {
		self.0.observer.borrow().clone()
	}

	/// Returns `true` if both handles point to the same object.
	pub fn ptr_eq(&self, other: &Object) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	/// Forbids new keys and property writes. Frozen objects are never observed.
	pub fn freeze(&self) {
		self.0.flags.set(Flags {
			extensible: false,
			frozen: true,
			..self.0.flags.get()
		});
	}

	/// Forbids new keys. Non-extensible objects are never observed.
	pub fn prevent_extensions(&self) {
		self.0.flags.set(Flags {
			extensible: false,
			..self.0.flags.get()
		});
	}

	/// Flags the object as framework-internal so it is never observed.
	pub fn mark_internal(&self) {
		self.0.flags.set(Flags {
			internal: true,
			..self.0.flags.get()
		});
	}

	pub fn is_frozen(&self) -> bool {
		self.0.flags.get().frozen
	}

	pub fn is_extensible(&self) -> bool {
		self.0.flags.get().extensible
	}

	pub fn is_internal(&self) -> bool {
		self.0.flags.get().internal
	}

	pub(crate) fn flags(&self) -> Flags {
		self.0.flags.get()
	}

	pub(crate) fn property(&self, key: &str) -> Option<Property> {
		self.0.props.borrow().get(key).cloned()
	}

	pub(crate) fn insert_property(&self, key: &str, property: Property) {
		self.0.props.borrow_mut().insert(key.to_string(), property);
	}

	pub(crate) fn remove_property(&self, key: &str) -> Option<Property> {
		self.0.props.borrow_mut().shift_remove(key)
	}
}

impl Default for Object {
	fn default() -> Self {
		Self::new()
	}
}

impl Array {
	/// Creates an unobserved array.
	pub fn new(items: Vec<Value>) -> Self {
		Self(Rc::new(ArrayData {
			items: RefCell::new(items),
			flags: Cell::new(Flags::default()),
			observer: RefCell::new(None),
		}))
	}

	/// Reads an element. Index reads are not tracked.
	pub fn get(&self, index: usize) -> Option<Value> {
		self.0.items.borrow().get(index).cloned()
	}

	pub fn len(&self) -> usize {
		self.0.items.borrow().len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.items.borrow().is_empty()
	}

	/// Snapshot of the elements.
	pub fn to_vec(&self) -> Vec<Value> {
		self.0.items.borrow().clone()
	}

	pub fn observer(&self) -> Option<Observer> {
		self.0.observer.borrow().clone()
	}

	pub fn ptr_eq(&self, other: &Array) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}

	/// Forbids every mutation. Frozen arrays are never observed.
	pub fn freeze(&self) {
		self.0.flags.set(Flags {
			extensible: false,
			frozen: true,
			..self.0.flags.get()
		});
	}

	pub fn prevent_extensions(&self) {
		self.0.flags.set(Flags {
			extensible: false,
			..self.0.flags.get()
		});
	}

	pub fn mark_internal(&self) {
		self.0.flags.set(Flags {
			internal: true,
			..self.0.flags.get()
		});
	}

	pub fn is_frozen(&self) -> bool {
		self.0.flags.get().frozen
	}

	pub(crate) fn flags(&self) -> Flags {
		self.0.flags.get()
	}
}

impl Value {
	/// Builds an object value from key/value pairs.
	pub fn object<K, I>(entries: I) -> Self
	where
		K: Into<String>,
		I: IntoIterator<Item = (K, Value)>,
	{
		Value::Object(Object::from_entries(entries))
	}

	/// Builds an array value.
	pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
		Value::Array(Array::new(items.into_iter().collect()))
	}

	/// Objects and arrays. Matches the values a watcher callback always fires for.
	pub fn is_object(&self) -> bool {
		matches!(self, Value::Object(_) | Value::Array(_))
	}

	pub fn is_null(&self) -> bool {
		matches!(self, Value::Null)
	}

	pub fn as_object(&self) -> Option<&Object> {
		match self {
			Value::Object(object) => Some(object),
			_ => None,
		}
	}

	pub fn as_array(&self) -> Option<&Array> {
		match self {
			Value::Array(array) => Some(array),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::String(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_f64(&self) -> Option<f64> {
		match self {
			Value::Number(n) => Some(*n),
			_ => None,
		}
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Value::Bool(b) => Some(*b),
			_ => None,
		}
	}

	/// Loose truthiness: `null`, `false`, `0`, `NaN` and `""` are falsy.
	pub fn is_truthy(&self) -> bool {
		match self {
			Value::Null => false,
			Value::Bool(b) => *b,
			Value::Number(n) => *n != 0.0 && !n.is_nan(),
			Value::String(s) => !s.is_empty(),
			Value::Object(_) | Value::Array(_) => true,
		}
	}

	/// The reactive wrapper of an observed object or array.
	pub fn observer(&self) -> Option<Observer> {
		match self {
			Value::Object(object) => object.observer(),
			Value::Array(array) => array.observer(),
			_ => None,
		}
	}

	/// Identity comparison used by the tracked setter and by watchers.
	///
	/// Objects and arrays compare by reference; `NaN` equals `NaN`.
	pub fn same_value(&self, other: &Value) -> bool {
		match (self, other) {
			(Value::Null, Value::Null) => true,
			(Value::Bool(a), Value::Bool(b)) => a == b,
			(Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
			(Value::String(a), Value::String(b)) => a == b,
			(Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
			(Value::Array(a), Value::Array(b)) => a.ptr_eq(b),
			_ => false,
		}
	}

	/// Untracked snapshot as JSON. Cyclic references serialize as `null`.
	pub fn to_json(&self) -> serde_json::Value {
		let mut seen = HashSet::new();
		self.to_json_inner(&mut seen)
	}

	fn to_json_inner(&self, seen: &mut HashSet<usize>) -> serde_json::Value {
		match self {
			Value::Null => serde_json::Value::Null,
			Value::Bool(b) => serde_json::Value::Bool(*b),
			Value::Number(n) => number_to_json(*n),
			Value::String(s) => serde_json::Value::String(s.clone()),
			Value::Object(object) => {
				let addr = Rc::as_ptr(&object.0) as usize;
				if !seen.insert(addr) {
					return serde_json::Value::Null;
				}
				let props = object.0.props.borrow().clone();
				let map = props
					.into_iter()
					.map(|(key, prop)| (key, prop.value.to_json_inner(seen)))
					.collect();
				seen.remove(&addr);
				serde_json::Value::Object(map)
			}
			Value::Array(array) => {
				let addr = Rc::as_ptr(&array.0) as usize;
				if !seen.insert(addr) {
					return serde_json::Value::Null;
				}
				let items = array.to_vec();
				let out = items.iter().map(|item| item.to_json_inner(seen)).collect();
				seen.remove(&addr);
				serde_json::Value::Array(out)
			}
		}
	}
}

fn number_to_json(n: f64) -> serde_json::Value {
	// Integral values round-trip as integers so they compare equal to `json!(1)`.
	if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
		return serde_json::Value::from(n as i64);
	}
	serde_json::Number::from_f64(n)
		.map(serde_json::Value::Number)
		.unwrap_or(serde_json::Value::Null)
}

impl PartialEq for Value {
	fn eq(&self, other: &Self) -> bool {
		self.same_value(other)
	}
}

impl fmt::Debug for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Value::Null => f.write_str("Null"),
			Value::Bool(b) => write!(f, "Bool({b})"),
			Value::Number(n) => write!(f, "Number({n})"),
			Value::String(s) => write!(f, "String({s:?})"),
			Value::Object(object) => write!(f, "Object({:?})", object.keys()),
			Value::Array(array) => write!(f, "Array(len={})", array.len()),
		}
	}
}

impl fmt::Display for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Value::String(s) => f.write_str(s),
			other => write!(f, "{}", other.to_json()),
		}
	}
}

impl From<serde_json::Value> for Value {
	fn from(value: serde_json::Value) -> Self {
		match value {
			serde_json::Value::Null => Value::Null,
			serde_json::Value::Bool(b) => Value::Bool(b),
			serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
			serde_json::Value::String(s) => Value::String(s),
			serde_json::Value::Array(items) => Value::array(items.into_iter().map(Value::from)),
			serde_json::Value::Object(map) => {
				Value::object(map.into_iter().map(|(key, value)| (key, Value::from(value))))
			}
		}
	}
}

impl From<bool> for Value {
	fn from(value: bool) -> Self {
		Value::Bool(value)
	}
}

impl From<f64> for Value {
	fn from(value: f64) -> Self {
		Value::Number(value)
	}
}

impl From<i32> for Value {
	fn from(value: i32) -> Self {
		Value::Number(f64::from(value))
	}
}

impl From<i64> for Value {
	fn from(value: i64) -> Self {
		Value::Number(value as f64)
	}
}

impl From<usize> for Value {
	fn from(value: usize) -> Self {
		Value::Number(value as f64)
	}
}

impl From<&str> for Value {
	fn from(value: &str) -> Self {
		Value::String(value.to_string())
	}
}

impl From<String> for Value {
	fn from(value: String) -> Self {
		Value::String(value)
	}
}

impl From<Object> for Value {
	fn from(value: Object) -> Self {
		Value::Object(value)
	}
}

impl From<Array> for Value {
	fn from(value: Array) -> Self {
		Value::Array(value)
	}
}

impl From<Vec<Value>> for Value {
	fn from(value: Vec<Value>) -> Self {
		Value::Array(Array::new(value))
	}
}
