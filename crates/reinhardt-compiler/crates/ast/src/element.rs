//! Element nodes and attribute bookkeeping.

use indexmap::IndexMap;
use serde::Serialize;

use crate::node::NodeId;

fn is_false(value: &bool) -> bool {
	!*value
}

/// An attribute as written in the template, or a processed attribute whose
/// `value` is a render expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attr {
	pub name: String,
	pub value: String,
	/// Name is a bracketed dynamic argument
	#[serde(skip_serializing_if = "is_false")]
	pub dynamic: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub start: Option<usize>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub end: Option<usize>,
}

impl Attr {
	pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			value: value.into(),
			dynamic: false,
			start: None,
			end: None,
		}
	}

	pub fn with_range(mut self, start: Option<usize>, end: Option<usize>) -> Self {
		self.start = start;
		self.end = end;
		self
	}
}

/// Event handler entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Handler {
	/// Handler expression
	pub value: String,
	#[serde(skip_serializing_if = "is_false")]
	pub dynamic: bool,
	/// Modifiers left for code generation (`stop`, `prevent`, `enter`, ...)
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub modifiers: Vec<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub start: Option<usize>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub end: Option<usize>,
}

/// Generic directive (`v-show`, `v-model`, custom directives).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Directive {
	pub name: String,
	pub raw_name: String,
	pub value: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub arg: Option<String>,
	#[serde(skip_serializing_if = "is_false")]
	pub is_dynamic_arg: bool,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub modifiers: Vec<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub start: Option<usize>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub end: Option<usize>,
}

/// One branch of a conditional chain. `exp` is `None` for the `else` branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IfCondition {
	pub exp: Option<String>,
	pub block: NodeId,
}

/// Named scoped slot definitions of a component element.
pub type ScopedSlots = IndexMap<String, NodeId>;

/// `v-model` on a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentModel {
	pub value: String,
	pub expression: String,
	pub callback: String,
}

/// Element node.
///
/// Fields beyond `tag`, the attribute collections and the tree links are
/// filled in by directive processing. [`Element::populated_keys`] lists the
/// ones that have been set, which is what the static analyzer inspects.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
	pub tag: String,
	pub attrs_list: Vec<Attr>,
	pub attrs_map: IndexMap<String, String>,
	pub raw_attrs_map: IndexMap<String, Attr>,
	#[serde(skip)]
	pub parent: Option<NodeId>,
	pub children: Vec<NodeId>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub start: Option<usize>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub end: Option<usize>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub ns: Option<String>,

	#[serde(skip_serializing_if = "is_false")]
	pub forbidden: bool,
	#[serde(skip_serializing_if = "is_false")]
	pub pre: bool,
	#[serde(skip_serializing_if = "is_false")]
	pub plain: bool,
	/// Already expanded by a pre-transform
	#[serde(skip_serializing_if = "is_false")]
	pub processed: bool,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub key: Option<String>,
	#[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
	pub ref_name: Option<String>,
	#[serde(skip_serializing_if = "is_false")]
	pub ref_in_for: bool,

	#[serde(rename = "for", skip_serializing_if = "Option::is_none")]
	pub for_exp: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub alias: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub iterator1: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub iterator2: Option<String>,

	#[serde(rename = "if", skip_serializing_if = "Option::is_none")]
	pub if_condition: Option<String>,
	#[serde(rename = "elseif", skip_serializing_if = "Option::is_none")]
	pub else_if: Option<String>,
	#[serde(rename = "else", skip_serializing_if = "is_false")]
	pub else_branch: bool,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub if_conditions: Vec<IfCondition>,
	#[serde(skip_serializing_if = "is_false")]
	pub once: bool,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub slot_target: Option<String>,
	#[serde(skip_serializing_if = "is_false")]
	pub slot_target_dynamic: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub slot_scope: Option<String>,
	#[serde(skip_serializing_if = "IndexMap::is_empty")]
	pub scoped_slots: ScopedSlots,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub slot_name: Option<String>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub component: Option<String>,
	#[serde(skip_serializing_if = "is_false")]
	pub inline_template: bool,

	#[serde(skip_serializing_if = "is_false")]
	pub has_bindings: bool,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub attrs: Vec<Attr>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub dynamic_attrs: Vec<Attr>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub props: Vec<Attr>,
	#[serde(skip_serializing_if = "IndexMap::is_empty")]
	pub events: IndexMap<String, Vec<Handler>>,
	#[serde(skip_serializing_if = "IndexMap::is_empty")]
	pub native_events: IndexMap<String, Vec<Handler>>,
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub directives: Vec<Directive>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub model: Option<ComponentModel>,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub static_class: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub class_binding: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub static_style: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub style_binding: Option<String>,

	/// Optimizer output
	#[serde(rename = "static")]
	pub is_static: bool,
	#[serde(skip_serializing_if = "is_false")]
	pub static_root: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub static_in_for: Option<bool>,
}

impl Element {
	/// Creates an element from its start tag.
	///
	/// The attribute map keeps the last value of duplicated names; duplicate
	/// detection is the parser's job.
	pub fn new(tag: impl Into<String>, attrs: Vec<Attr>, parent: Option<NodeId>) -> Self {
		let attrs_map = attrs
			.iter()
			.map(|attr| (attr.name.clone(), attr.value.clone()))
			.collect();
		Self {
			tag: tag.into(),
			attrs_list: attrs,
			attrs_map,
			parent,
			..Self::default()
		}
	}

	/// Fresh element with the same tag and a copy of the raw attributes.
	///
	/// Used by pre-transforms that expand one element into several.
	pub fn clone_unprocessed(&self) -> Self {
		Self::new(self.tag.clone(), self.attrs_list.clone(), self.parent)
	}

	/// Names of the fields that directive processing has set.
	///
	/// Optimizer and code generation flags are not included, so the static
	/// analysis gives the same answer when run twice.
	pub fn populated_keys(&self) -> Vec<&'static str> {
		let mut keys = vec!["type", "tag", "attrsList", "attrsMap", "rawAttrsMap", "parent", "children"];
		let mut push = |present: bool, key: &'static str| {
			if present {
				keys.push(key);
			}
		};
		push(self.start.is_some(), "start");
		push(self.end.is_some(), "end");
		push(self.ns.is_some(), "ns");
		push(self.forbidden, "forbidden");
		push(self.pre, "pre");
		push(self.plain, "plain");
		push(self.processed, "processed");
		push(self.key.is_some(), "key");
		push(self.ref_name.is_some(), "ref");
		push(self.ref_in_for, "refInFor");
		push(self.for_exp.is_some(), "for");
		push(self.alias.is_some(), "alias");
		push(self.iterator1.is_some(), "iterator1");
		push(self.iterator2.is_some(), "iterator2");
		push(self.if_condition.is_some(), "if");
		push(self.else_if.is_some(), "elseif");
		push(self.else_branch, "else");
		push(!self.if_conditions.is_empty(), "ifConditions");
		push(self.once, "once");
		push(self.slot_target.is_some(), "slotTarget");
		push(self.slot_target_dynamic, "slotTargetDynamic");
		push(self.slot_scope.is_some(), "slotScope");
		push(!self.scoped_slots.is_empty(), "scopedSlots");
		push(self.slot_name.is_some(), "slotName");
		push(self.component.is_some(), "component");
		push(self.inline_template, "inlineTemplate");
		push(self.has_bindings, "hasBindings");
		push(!self.attrs.is_empty(), "attrs");
		push(!self.dynamic_attrs.is_empty(), "dynamicAttrs");
		push(!self.props.is_empty(), "props");
		push(!self.events.is_empty(), "events");
		push(!self.native_events.is_empty(), "nativeEvents");
		push(!self.directives.is_empty(), "directives");
		push(self.model.is_some(), "model");
		push(self.static_class.is_some(), "staticClass");
		push(self.class_binding.is_some(), "classBinding");
		push(self.static_style.is_some(), "staticStyle");
		push(self.style_binding.is_some(), "styleBinding");
		keys
	}

	/// Removes `name` from the attribute list and returns its value.
	///
	/// The attribute map keeps the entry unless `remove_from_map` is set, so
	/// later stages (e.g. code generation of `<input type>`) can still see it.
	pub fn get_and_remove_attr(&mut self, name: &str, remove_from_map: bool) -> Option<String> {
		let value = self.attrs_map.get(name).cloned();
		if value.is_some()
			&& let Some(index) = self.attrs_list.iter().position(|attr| attr.name == name)
		{
			self.attrs_list.remove(index);
		}
		if remove_from_map {
			self.attrs_map.shift_remove(name);
		}
		value
	}

	/// Removes and returns the first attribute whose name satisfies `matches`.
	pub fn get_and_remove_attr_by(&mut self, matches: impl Fn(&str) -> bool) -> Option<Attr> {
		let index = self.attrs_list.iter().position(|attr| matches(&attr.name))?;
		Some(self.attrs_list.remove(index))
	}

	/// Raw attribute for a binding named `name` in any of its spellings.
	pub fn get_raw_binding_attr(&self, name: &str) -> Option<&Attr> {
		self.raw_attrs_map
			.get(&format!(":{name}"))
			.or_else(|| self.raw_attrs_map.get(&format!("v-bind:{name}")))
			.or_else(|| self.raw_attrs_map.get(name))
	}

	pub fn add_attr(&mut self, attr: Attr) {
		if attr.dynamic {
			self.dynamic_attrs.push(attr);
		} else {
			self.attrs.push(attr);
		}
		self.plain = false;
	}

	pub fn add_prop(&mut self, prop: Attr) {
		self.props.push(prop);
		self.plain = false;
	}

	/// Adds a raw attribute after the element was created.
	pub fn add_raw_attr(&mut self, attr: Attr) {
		self.attrs_map.insert(attr.name.clone(), attr.value.clone());
		self.attrs_list.push(attr);
	}

	pub fn add_directive(&mut self, directive: Directive) {
		self.directives.push(directive);
		self.plain = false;
	}

	/// Adds the branch of a conditional chain.
	pub fn add_if_condition(&mut self, condition: IfCondition) {
		self.if_conditions.push(condition);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn element() -> Element {
		Element::new(
			"input",
			vec![Attr::new("type", "text"), Attr::new("v-model", "msg"), Attr::new(":value", "v")],
			None,
		)
	}

	#[test]
	fn test_get_and_remove_attr_keeps_map_by_default() {
		let mut el = element();
		assert_eq!(el.get_and_remove_attr("type", false), Some("text".into()));
		assert_eq!(el.attrs_list.len(), 2);
		assert!(el.attrs_map.contains_key("type"));
		assert_eq!(el.get_and_remove_attr("v-model", true), Some("msg".into()));
		assert!(!el.attrs_map.contains_key("v-model"));
		assert_eq!(el.get_and_remove_attr("missing", true), None);
	}

	#[test]
	fn test_get_and_remove_attr_by_predicate() {
		let mut el = element();
		let attr = el.get_and_remove_attr_by(|name| name.starts_with(':')).unwrap();
		assert_eq!(attr.value, "v");
		assert_eq!(el.attrs_list.len(), 2);
	}

	#[rstest]
	#[case(":key")]
	#[case("v-bind:key")]
	#[case("key")]
	fn test_raw_binding_attr_spellings(#[case] name: &str) {
		let mut el = Element::new("div", vec![], None);
		el.raw_attrs_map.insert(name.to_string(), Attr::new(name, "k"));
		assert_eq!(el.get_raw_binding_attr("key").unwrap().value, "k");
	}

	#[test]
	fn test_populated_keys_ignore_optimizer_flags() {
		let mut el = Element::new("div", vec![], None);
		el.plain = true;
		let before = el.populated_keys();
		el.is_static = true;
		el.static_root = true;
		el.static_in_for = Some(false);
		assert_eq!(before, el.populated_keys());
		el.key = Some("k".into());
		assert!(el.populated_keys().contains(&"key"));
	}

	#[test]
	fn test_clone_unprocessed_copies_raw_attributes_only() {
		let mut el = element();
		el.processed = true;
		el.if_condition = Some("x".into());
		let copy = el.clone_unprocessed();
		assert_eq!(copy.attrs_list, el.attrs_list);
		assert!(!copy.processed);
		assert!(copy.if_condition.is_none());
	}
}
