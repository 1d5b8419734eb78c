//! Directive extraction.
//!
//! Each `process_*` function reads one family of attributes off an element
//! and records it in typed fields. They run in a fixed order: `v-pre`,
//! `v-for`, `v-if` and `v-once` on the start tag, the rest through
//! [`process_element`] when the element is closed.

use std::sync::LazyLock;

use regex::Regex;
use reinhardt_compiler_ast::{Ast, AstNode, Attr, Directive, Element, IfCondition, NodeId};

use crate::diagnostics::{Diagnostics, Span};
use crate::helpers::{
	HandlerSpec, add_handler, attr_span, gen_assignment_code, get_binding_attr, maybe_component,
	raw_attr_span,
};
use crate::parser::ParseContext;
use crate::text::parse_text;
use crate::util::{camelize, hyphenate, quote};

/// Scope of a `v-slot` without a value; forces a scoped slot.
pub const EMPTY_SLOT_SCOPE_TOKEN: &str = "_empty_";

static FOR_ALIAS: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?s)^(.*?)\s+(?:in|of)\s+(.*)$").expect("FOR_ALIAS: invalid regex pattern")
});
static FOR_ITERATOR: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r",([^,\}\]]*)(?:,([^,\}\]]*))?$").expect("FOR_ITERATOR: invalid regex pattern")
});

/// Result of parsing a `v-for` expression.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ForParseResult {
	pub source: String,
	pub alias: String,
	pub iterator1: Option<String>,
	pub iterator2: Option<String>,
}

/// Parses `alias in source`, `(alias, i1, i2) of source`, or destructuring
/// aliases such as `{ a, b } in list`.
pub fn parse_for(exp: &str) -> Option<ForParseResult> {
	let caps = FOR_ALIAS.captures(exp)?;
	let source = caps.get(2)?.as_str().trim().to_owned();
	let alias = caps.get(1)?.as_str().trim();
	let alias = alias.strip_prefix('(').unwrap_or(alias);
	let alias = alias.strip_suffix(')').unwrap_or(alias);

	let Some(iterators) = FOR_ITERATOR.captures(alias) else {
		return Some(ForParseResult {
			source,
			alias: alias.to_owned(),
			..ForParseResult::default()
		});
	};
	let whole = iterators.get(0)?;
	Some(ForParseResult {
		source,
		alias: alias[..whole.start()].trim().to_owned(),
		iterator1: iterators.get(1).map(|m| m.as_str().trim().to_owned()),
		iterator2: iterators
			.get(2)
			.map(|m| m.as_str().trim().to_owned())
			.filter(|i| !i.is_empty()),
	})
}

pub fn process_pre(el: &mut Element) {
	if el.get_and_remove_attr("v-pre", false).is_some() {
		el.pre = true;
	}
}

/// Attributes inside `v-pre` are kept verbatim as static attributes.
pub fn process_raw_attrs(el: &mut Element) {
	if !el.attrs_list.is_empty() {
		el.attrs = el
			.attrs_list
			.iter()
			.map(|attr| Attr {
				value: quote(&attr.value),
				..attr.clone()
			})
			.collect();
	} else if !el.pre {
		el.plain = true;
	}
}

pub fn process_for(el: &mut Element, diagnostics: &mut Diagnostics) {
	let Some(exp) = el.get_and_remove_attr("v-for", false).filter(|exp| !exp.is_empty()) else {
		return;
	};
	match parse_for(&exp) {
		Some(parsed) => {
			el.for_exp = Some(parsed.source);
			el.alias = Some(parsed.alias);
			el.iterator1 = parsed.iterator1;
			el.iterator2 = parsed.iterator2;
		}
		None => diagnostics.warn(
			format!("Invalid v-for expression: {exp}"),
			raw_attr_span(el, "v-for"),
		),
	}
}

/// Reads `v-if`, `v-else-if` and `v-else` off the element stored at `id`.
pub fn process_if(el: &mut Element, id: NodeId) {
	if let Some(exp) = el.get_and_remove_attr("v-if", false).filter(|exp| !exp.is_empty()) {
		el.if_condition = Some(exp.clone());
		el.add_if_condition(IfCondition {
			exp: Some(exp),
			block: id,
		});
	} else if el.get_and_remove_attr("v-else", false).is_some() {
		el.else_branch = true;
	} else if let Some(exp) = el.get_and_remove_attr("v-else-if", false).filter(|exp| !exp.is_empty()) {
		el.else_if = Some(exp);
	}
}

pub fn process_once(el: &mut Element) {
	if el.get_and_remove_attr("v-once", false).is_some() {
		el.once = true;
	}
}

/// Runs every attribute processor that needs the element's children.
pub fn process_element(cx: &mut ParseContext<'_>, id: NodeId) {
	process_key(cx, id);
	if let Some(el) = cx.ast.element_mut(id) {
		el.plain = el.key.is_none() && el.scoped_slots.is_empty() && el.attrs_list.is_empty();
	}
	process_ref(cx, id);
	process_slot_content(cx, id);
	if let Some(el) = cx.ast.element_mut(id) {
		process_slot_outlet(el, cx.diagnostics);
		process_component(el);
	}
	let options = cx.options;
	for module in &options.modules {
		module.transform_node(cx, id);
	}
	process_attrs(cx, id);
}

fn process_key(cx: &mut ParseContext<'_>, id: NodeId) {
	let parent_tag = parent_of(&cx.ast, id)
		.and_then(|parent| cx.ast.element(parent))
		.map(|parent| parent.tag.clone());
	let Some(el) = cx.ast.element_mut(id) else {
		return;
	};
	let Some(exp) = get_binding_attr(el, "key", true).filter(|exp| !exp.is_empty()) else {
		return;
	};
	let span = el.get_raw_binding_attr("key").map_or(Span::NONE, attr_span);
	if el.tag == "template" {
		cx.diagnostics.warn(
			"<template> cannot be keyed. Place the key on real elements instead.",
			span,
		);
	}
	if el.for_exp.is_some() {
		let iterator = el.iterator2.as_ref().or(el.iterator1.as_ref());
		if iterator == Some(&exp) && parent_tag.as_deref() == Some("transition-group") {
			cx.diagnostics.tip(
				"Do not use v-for index as key on <transition-group> children, \
				 this is the same as not using keys.",
				span,
			);
		}
	}
	el.key = Some(exp);
}

fn parent_of(ast: &Ast, id: NodeId) -> Option<NodeId> {
	ast.element(id)?.parent
}

/// Whether `id` or one of its ancestors carries `v-for`.
fn check_in_for(ast: &Ast, id: NodeId) -> bool {
	let mut current = Some(id);
	while let Some(el) = current.and_then(|id| ast.element(id)) {
		if el.for_exp.is_some() {
			return true;
		}
		current = el.parent;
	}
	false
}

fn process_ref(cx: &mut ParseContext<'_>, id: NodeId) {
	let in_for = check_in_for(&cx.ast, id);
	let Some(el) = cx.ast.element_mut(id) else {
		return;
	};
	if let Some(name) = get_binding_attr(el, "ref", true).filter(|name| !name.is_empty()) {
		el.ref_name = Some(name);
		el.ref_in_for = in_for;
	}
}

fn is_slot_attr(name: &str) -> bool {
	name == "v-slot" || name.starts_with("v-slot:") || name.starts_with('#')
}

fn is_dynamic_arg(name: &str) -> bool {
	name.len() >= 2 && name.starts_with('[') && name.ends_with(']')
}

fn slot_name(binding: &Attr, diagnostics: &mut Diagnostics) -> (String, bool) {
	let name = binding
		.name
		.strip_prefix("v-slot:")
		.or_else(|| binding.name.strip_prefix("v-slot"))
		.or_else(|| binding.name.strip_prefix('#'))
		.unwrap_or(&binding.name);
	let name = if !name.is_empty() {
		name
	} else if !binding.name.starts_with('#') {
		"default"
	} else {
		diagnostics.warn("v-slot shorthand syntax requires a slot name.", attr_span(binding));
		name
	};
	if is_dynamic_arg(name) {
		(name[1..name.len() - 1].to_owned(), true)
	} else {
		(format!("\"{name}\""), false)
	}
}

fn process_slot_content(cx: &mut ParseContext<'_>, id: NodeId) {
	let platform = &*cx.options.platform;
	let parent_is_component = parent_of(&cx.ast, id)
		.and_then(|parent| cx.ast.element(parent))
		.map(|parent| maybe_component(parent, platform));
	let Some(el) = cx.ast.element_mut(id) else {
		return;
	};
	let diagnostics = &mut *cx.diagnostics;
	let is_template = el.tag == "template";

	if is_template {
		let scope = el.get_and_remove_attr("scope", false).filter(|s| !s.is_empty());
		if scope.is_some() {
			diagnostics.tip(
				"the \"scope\" attribute for scoped slots have been deprecated and \
				 replaced by \"slot-scope\" since 2.5. The new \"slot-scope\" attribute \
				 can also be used on plain elements in addition to <template> to \
				 denote scoped slots.",
				raw_attr_span(el, "scope"),
			);
		}
		el.slot_scope = scope.or_else(|| el.get_and_remove_attr("slot-scope", false));
	} else if let Some(scope) = el.get_and_remove_attr("slot-scope", false).filter(|s| !s.is_empty()) {
		if el.attrs_map.get("v-for").is_some_and(|v| !v.is_empty()) {
			diagnostics.tip(
				format!(
					"Ambiguous combined usage of slot-scope and v-for on <{}> \
					 (v-for takes higher priority). Use a wrapper <template> for the \
					 scoped slot to make it clearer.",
					el.tag
				),
				raw_attr_span(el, "slot-scope"),
			);
		}
		el.slot_scope = Some(scope);
	}

	if let Some(target) = get_binding_attr(el, "slot", true).filter(|t| !t.is_empty()) {
		el.slot_target = Some(if target == "\"\"" {
			"\"default\"".to_owned()
		} else {
			target.clone()
		});
		let bound = |key: &str| el.attrs_map.get(key).is_some_and(|v| !v.is_empty());
		el.slot_target_dynamic = bound(":slot") || bound("v-bind:slot");
		if !is_template && el.slot_scope.is_none() {
			let (start, end) = el
				.get_raw_binding_attr("slot")
				.map_or((None, None), |attr| (attr.start, attr.end));
			el.add_attr(Attr::new("slot", target).with_range(start, end));
		}
	}

	let Some(binding) = el.get_and_remove_attr_by(is_slot_attr) else {
		return;
	};
	let element_span = Span::at(el.start);
	if is_template {
		if el.slot_target.is_some() || el.slot_scope.is_some() {
			diagnostics.warn("Unexpected mixed usage of different slot syntaxes.", element_span);
		}
		if parent_is_component == Some(false) {
			diagnostics.warn(
				"<template v-slot> can only appear at the root level inside the receiving component",
				element_span,
			);
		}
		let (name, dynamic) = slot_name(&binding, diagnostics);
		el.slot_target = Some(name);
		el.slot_target_dynamic = dynamic;
		el.slot_scope = Some(scope_or_empty(&binding.value));
		return;
	}

	if !maybe_component(el, platform) {
		diagnostics.warn(
			"v-slot can only be used on components or <template>.",
			attr_span(&binding),
		);
	}
	if el.slot_scope.is_some() || el.slot_target.is_some() {
		diagnostics.warn("Unexpected mixed usage of different slot syntaxes.", element_span);
	}
	if !el.scoped_slots.is_empty() {
		diagnostics.warn(
			"To avoid scope ambiguity, the default slot should also use \
			 <template> syntax when there are other named slots.",
			attr_span(&binding),
		);
	}

	// Default slot content moves into an implicit <template v-slot>.
	let (name, dynamic) = slot_name(&binding, diagnostics);
	let mut container = Element::new("template", Vec::new(), Some(id));
	container.slot_target = Some(name.clone());
	container.slot_target_dynamic = dynamic;
	container.slot_scope = Some(scope_or_empty(&binding.value));
	let children = std::mem::take(&mut el.children);
	el.plain = false;

	let mut moved = Vec::new();
	for child in children {
		let scoped = cx.ast.element(child).is_some_and(|child| child.slot_scope.is_some());
		if !scoped {
			moved.push(child);
		}
	}
	container.children = moved.clone();
	let container_id = cx.ast.push(AstNode::Element(Box::new(container)));
	for child in moved {
		if let Some(child) = cx.ast.element_mut(child) {
			child.parent = Some(container_id);
		}
	}
	if let Some(el) = cx.ast.element_mut(id) {
		el.scoped_slots.insert(name, container_id);
	}
}

fn scope_or_empty(value: &str) -> String {
	if value.is_empty() {
		EMPTY_SLOT_SCOPE_TOKEN.to_owned()
	} else {
		value.to_owned()
	}
}

fn process_slot_outlet(el: &mut Element, diagnostics: &mut Diagnostics) {
	if el.tag != "slot" {
		return;
	}
	el.slot_name = get_binding_attr(el, "name", true);
	if el.key.is_some() {
		diagnostics.warn(
			"`key` does not work on <slot> because slots are abstract outlets \
			 and can possibly expand into multiple elements. \
			 Use the key on a wrapping element instead.",
			el.get_raw_binding_attr("key").map_or(Span::NONE, attr_span),
		);
	}
}

fn process_component(el: &mut Element) {
	if let Some(binding) = get_binding_attr(el, "is", true).filter(|b| !b.is_empty()) {
		el.component = Some(binding);
	}
	if el.get_and_remove_attr("inline-template", false).is_some() {
		el.inline_template = true;
	}
}

fn is_directive_attr(name: &str) -> bool {
	name.starts_with("v-") || name.starts_with('@') || name.starts_with(':') || name.starts_with('#')
}

fn strip_directive_prefix(name: &str) -> &str {
	name.strip_prefix("v-")
		.or_else(|| name.strip_prefix('@'))
		.or_else(|| name.strip_prefix(':'))
		.or_else(|| name.strip_prefix('#'))
		.unwrap_or(name)
}

/// Splits `name.mod1.mod2` into the name and its modifiers. Dots inside a
/// dynamic `[argument]` are not modifier separators.
fn split_modifiers(name: &str) -> (&str, Option<Vec<String>>) {
	let tail_start = name.rfind(']').map_or(0, |index| index + 1);
	let Some(dot) = name[tail_start..].find('.') else {
		return (name, None);
	};
	let split = tail_start + dot;
	let modifiers = name[split + 1..]
		.split('.')
		.filter(|m| !m.is_empty())
		.map(str::to_owned)
		.collect();
	(&name[..split], Some(modifiers))
}

fn strip_dynamic(name: &str) -> (String, bool) {
	if is_dynamic_arg(name) {
		(name[1..name.len() - 1].to_owned(), true)
	} else {
		(name.to_owned(), false)
	}
}

/// Binds, events, generic directives and plain attributes.
fn process_attrs(cx: &mut ParseContext<'_>, id: NodeId) {
	let options = cx.options;
	let platform = &*options.platform;
	let in_for_alias_check = collect_for_aliases(&cx.ast, id);
	let Some(el) = cx.ast.element_mut(id) else {
		return;
	};
	let diagnostics = &mut *cx.diagnostics;

	for attr in el.attrs_list.clone() {
		let raw_name = attr.name.as_str();
		let value = attr.value.as_str();
		let span = attr_span(&attr);

		if !is_directive_attr(raw_name) {
			if parse_text(value, options.delimiters()).is_some() {
				diagnostics.warn(
					format!(
						"{raw_name}=\"{value}\": Interpolation inside attributes has been removed. \
						 Use v-bind or the colon shorthand instead. For example, \
						 instead of <div id=\"{{{{ val }}}}\">, use <div :id=\"val\">."
					),
					span,
				);
			}
			el.add_attr(Attr::new(raw_name, quote(value)).with_range(attr.start, attr.end));
			if el.component.is_none()
				&& raw_name == "muted"
				&& platform.must_use_prop(&el.tag, el.attrs_map.get("type").map(String::as_str), "muted")
			{
				el.add_prop(Attr::new("muted", "true").with_range(attr.start, attr.end));
			}
			continue;
		}

		el.has_bindings = true;
		let (name, modifiers) = split_modifiers(raw_name);
		let has = |modifier: &str| {
			modifiers
				.as_ref()
				.is_some_and(|mods| mods.iter().any(|m| m == modifier))
		};

		if let Some(bound) = name.strip_prefix(':').or_else(|| name.strip_prefix("v-bind:")) {
			let (mut name, dynamic) = strip_dynamic(bound);
			if value.trim().is_empty() {
				diagnostics.warn(
					format!(
						"The value for a v-bind expression cannot be empty. Found in \"v-bind:{name}\""
					),
					Span::NONE,
				);
			}
			let prop = has("prop");
			if prop && !dynamic {
				name = camelize(&name);
				if name == "innerHtml" {
					name = "innerHTML".to_owned();
				}
			}
			if has("camel") && !dynamic {
				name = camelize(&name);
			}
			if has("sync") {
				let sync_gen = gen_assignment_code(value, "$event");
				let spec = || HandlerSpec {
					span,
					dynamic,
					..HandlerSpec::default()
				};
				if dynamic {
					add_handler(el, &format!("\"update:\"+({name})"), &sync_gen, spec(), diagnostics);
				} else {
					let camel = camelize(&name);
					add_handler(el, &format!("update:{camel}"), &sync_gen, spec(), diagnostics);
					let hyphen = hyphenate(&name);
					if hyphen != camel {
						add_handler(el, &format!("update:{hyphen}"), &sync_gen, spec(), diagnostics);
					}
				}
			}
			let binding = Attr {
				name,
				value: value.to_owned(),
				dynamic,
				start: attr.start,
				end: attr.end,
			};
			let type_attr = el.attrs_map.get("type").map(String::as_str);
			if prop
				|| (el.component.is_none() && platform.must_use_prop(&el.tag, type_attr, &binding.name))
			{
				el.add_prop(binding);
			} else {
				el.add_attr(binding);
			}
		} else if let Some(event) = name.strip_prefix('@').or_else(|| name.strip_prefix("v-on:")) {
			let (event, dynamic) = strip_dynamic(event);
			let spec = HandlerSpec {
				modifiers: modifiers.clone().unwrap_or_default(),
				important: false,
				dynamic,
				span,
			};
			add_handler(el, &event, value, spec, diagnostics);
		} else {
			let name = strip_directive_prefix(name);
			// The argument starts at the first colon.
			let (name, arg) = match name.split_once(':') {
				Some((name, arg)) => (name, Some(arg)),
				None => (name, None),
			};
			let (arg, is_dynamic_arg) = match arg {
				Some(arg) => {
					let (arg, dynamic) = strip_dynamic(arg);
					(Some(arg), dynamic)
				}
				None => (None, false),
			};
			el.add_directive(Directive {
				name: name.to_owned(),
				raw_name: raw_name.to_owned(),
				value: value.to_owned(),
				arg,
				is_dynamic_arg,
				modifiers: modifiers.clone().unwrap_or_default(),
				start: attr.start,
				end: attr.end,
			});
			if name == "model" && in_for_alias_check.iter().any(|alias| alias == value) {
				diagnostics.warn(
					format!(
						"<{} v-model=\"{value}\">: You are binding v-model directly to a v-for \
						 iteration alias. This will not be able to modify the v-for source array \
						 because writing to the alias is like modifying a function local variable. \
						 Consider using an array of objects and use v-model on an object property instead.",
						el.tag
					),
					raw_attr_span(el, "v-model"),
				);
			}
		}
	}
}

/// Aliases of every `v-for` on `id` and its ancestors.
fn collect_for_aliases(ast: &Ast, id: NodeId) -> Vec<String> {
	let mut aliases = Vec::new();
	let mut current = Some(id);
	while let Some(el) = current.and_then(|id| ast.element(id)) {
		if el.for_exp.is_some()
			&& let Some(alias) = &el.alias
		{
			aliases.push(alias.clone());
		}
		current = el.parent;
	}
	aliases
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("item in items", "items", "item", None, None)]
	#[case("item of items", "items", "item", None, None)]
	#[case("(item, index) in items", "items", "item", Some("index"), None)]
	#[case("(value, key, index) in object", "object", "value", Some("key"), Some("index"))]
	#[case("{ a, b } in list", "list", "{ a, b }", None, None)]
	#[case("({ a }, i) in list", "list", "{ a }", Some("i"), None)]
	fn test_parse_for(
		#[case] exp: &str,
		#[case] source: &str,
		#[case] alias: &str,
		#[case] iterator1: Option<&str>,
		#[case] iterator2: Option<&str>,
	) {
		let parsed = parse_for(exp).unwrap();
		assert_eq!(parsed.source, source);
		assert_eq!(parsed.alias, alias);
		assert_eq!(parsed.iterator1.as_deref(), iterator1);
		assert_eq!(parsed.iterator2.as_deref(), iterator2);
	}

	#[test]
	fn test_parse_for_rejects_missing_keyword() {
		assert_eq!(parse_for("items"), None);
	}

	#[rstest]
	#[case("v-on:click.stop.prevent", "v-on:click", Some(vec!["stop", "prevent"]))]
	#[case(":[a.b]", ":[a.b]", None)]
	#[case(":[a.b].sync", ":[a.b]", Some(vec!["sync"]))]
	#[case("v-model", "v-model", None)]
	fn test_split_modifiers(#[case] raw: &str, #[case] name: &str, #[case] modifiers: Option<Vec<&str>>) {
		let (split, mods) = split_modifiers(raw);
		assert_eq!(split, name);
		assert_eq!(
			mods,
			modifiers.map(|m| m.into_iter().map(str::to_owned).collect::<Vec<_>>())
		);
	}

	#[test]
	fn test_raw_attrs_are_quoted() {
		let mut el = Element::new("p", vec![Attr::new(":id", "x")], None);
		process_raw_attrs(&mut el);
		assert_eq!(el.attrs[0].value, "\"x\"");

		let mut empty = Element::new("p", vec![], None);
		process_raw_attrs(&mut empty);
		assert!(empty.plain);
	}

	#[test]
	fn test_if_variants() {
		let mut el = Element::new("p", vec![Attr::new("v-else-if", "b")], None);
		process_if(&mut el, NodeId(0));
		assert_eq!(el.else_if.as_deref(), Some("b"));

		let mut el = Element::new("p", vec![Attr::new("v-else", "")], None);
		process_if(&mut el, NodeId(0));
		assert!(el.else_branch);
	}
}
