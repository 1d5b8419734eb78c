//! Directive code generators
//!
//! Code generation hands every directive of an element to the generator
//! registered under its name. A generator rewrites the element's data
//! (props, handlers, component model) and reports whether the directive is
//! still needed at runtime; directives without a generator are always
//! emitted as runtime directives.
//!
//! Generators work on a copy of the element owned by the code generator, so
//! the AST returned from `compile` is never touched by code generation.

use std::sync::Arc;

use indexmap::IndexMap;
use reinhardt_compiler_ast::{Attr, ComponentModel, Directive, Element};

use crate::diagnostics::Diagnostics;
use crate::helpers::{HandlerSpec, add_handler, gen_assignment_code, get_binding_attr, raw_attr_span};
use crate::platform::Platform;

/// `v-bind="object"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindObject {
	pub value: String,
	pub prop: bool,
	pub sync: bool,
}

/// Context handed to a [`DirectiveHandler`].
pub struct DirectiveContext<'a> {
	pub platform: &'a dyn Platform,
	pub diagnostics: &'a mut Diagnostics,
	/// Object spread into the element data
	pub bind_object: Option<BindObject>,
	/// Object of listeners merged into the element data
	pub listener_object: Option<String>,
}

pub trait DirectiveHandler: Send + Sync {
	/// Applies `dir` to `el`. Returns `true` when the directive must also be
	/// emitted for the runtime.
	fn apply(&self, el: &mut Element, dir: &Directive, cx: &mut DirectiveContext<'_>) -> bool;
}

fn has_modifier(dir: &Directive, name: &str) -> bool {
	dir.modifiers.iter().any(|m| m == name)
}

/// `v-on="object"`
#[derive(Debug, Clone, Copy, Default)]
pub struct OnDirective;

impl DirectiveHandler for OnDirective {
	fn apply(&self, el: &mut Element, dir: &Directive, cx: &mut DirectiveContext<'_>) -> bool {
		if !dir.modifiers.is_empty() {
			cx.diagnostics.warn(
				"v-on without argument does not support modifiers.",
				raw_attr_span(el, &dir.raw_name),
			);
		}
		cx.listener_object = Some(dir.value.clone());
		false
	}
}

/// `v-bind="object"`
#[derive(Debug, Clone, Copy, Default)]
pub struct BindDirective;

impl DirectiveHandler for BindDirective {
	fn apply(&self, _el: &mut Element, dir: &Directive, cx: &mut DirectiveContext<'_>) -> bool {
		cx.bind_object = Some(BindObject {
			value: dir.value.clone(),
			prop: has_modifier(dir, "prop"),
			sync: has_modifier(dir, "sync"),
		});
		false
	}
}

/// `v-cloak` only matters before compilation.
#[derive(Debug, Clone, Copy, Default)]
pub struct CloakDirective;

impl DirectiveHandler for CloakDirective {
	fn apply(&self, _el: &mut Element, _dir: &Directive, _cx: &mut DirectiveContext<'_>) -> bool {
		false
	}
}

/// `v-text`
#[derive(Debug, Clone, Copy, Default)]
pub struct TextDirective;

impl DirectiveHandler for TextDirective {
	fn apply(&self, el: &mut Element, dir: &Directive, _cx: &mut DirectiveContext<'_>) -> bool {
		if !dir.value.is_empty() {
			el.add_prop(Attr::new("textContent", format!("_s({})", dir.value)).with_range(dir.start, dir.end));
		}
		false
	}
}

/// `v-html`
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlDirective;

impl DirectiveHandler for HtmlDirective {
	fn apply(&self, el: &mut Element, dir: &Directive, _cx: &mut DirectiveContext<'_>) -> bool {
		if !dir.value.is_empty() {
			el.add_prop(Attr::new("innerHTML", format!("_s({})", dir.value)).with_range(dir.start, dir.end));
		}
		false
	}
}

/// Event used by range inputs so the runtime can pick `input` or `change`.
pub const RANGE_TOKEN: &str = "__r";

/// `v-model` on form elements and components.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelDirective;

impl DirectiveHandler for ModelDirective {
	fn apply(&self, el: &mut Element, dir: &Directive, cx: &mut DirectiveContext<'_>) -> bool {
		let value = dir.value.as_str();
		let input_type = el.attrs_map.get("type").cloned();
		let number = has_modifier(dir, "number");
		let trim = has_modifier(dir, "trim");

		if el.tag == "input" && input_type.as_deref() == Some("file") {
			cx.diagnostics.warn(
				format!(
					"<{} v-model=\"{value}\" type=\"file\">:\n\
					 File inputs are read only. Use a v-on:change listener instead.",
					el.tag
				),
				raw_attr_span(el, "v-model"),
			);
		}

		if el.component.is_some() {
			gen_component_model(el, value, number, trim);
			return false;
		}
		match (el.tag.as_str(), input_type.as_deref()) {
			("select", _) => gen_select(el, value, number, cx.diagnostics),
			("input", Some("checkbox")) => gen_checkbox_model(el, value, number, cx.diagnostics),
			("input", Some("radio")) => gen_radio_model(el, value, number, cx.diagnostics),
			("input" | "textarea", _) => gen_default_model(el, dir, cx.diagnostics),
			(tag, _) if !cx.platform.is_reserved_tag(tag) => {
				gen_component_model(el, value, number, trim);
				return false;
			}
			_ => cx.diagnostics.warn(
				format!(
					"<{} v-model=\"{value}\">: v-model is not supported on this element type. \
					 If you are working with contenteditable, it's recommended to wrap a library \
					 dedicated for that purpose inside a custom component.",
					el.tag
				),
				raw_attr_span(el, "v-model"),
			),
		}
		true
	}
}

fn important() -> HandlerSpec {
	HandlerSpec {
		important: true,
		..HandlerSpec::default()
	}
}

/// Component `v-model`: a `value` prop plus an update callback.
pub fn gen_component_model(el: &mut Element, value: &str, number: bool, trim: bool) {
	let base = "$$v";
	let mut value_expression = base.to_owned();
	if trim {
		value_expression = format!("(typeof {base} === 'string'? {base}.trim(): {base})");
	}
	if number {
		value_expression = format!("_n({value_expression})");
	}
	let assignment = gen_assignment_code(value, &value_expression);
	el.model = Some(ComponentModel {
		value: format!("({value})"),
		expression: crate::util::quote(value),
		callback: format!("function ({base}) {{{assignment}}}"),
	});
}

fn gen_checkbox_model(el: &mut Element, value: &str, number: bool, diagnostics: &mut Diagnostics) {
	let value_binding = get_binding_attr(el, "value", true).unwrap_or_else(|| "null".to_owned());
	let true_value = get_binding_attr(el, "true-value", true).unwrap_or_else(|| "true".to_owned());
	let false_value = get_binding_attr(el, "false-value", true).unwrap_or_else(|| "false".to_owned());

	let checked_when_scalar = if true_value == "true" {
		format!(":({value})")
	} else {
		format!(":_q({value},{true_value})")
	};
	el.add_prop(Attr::new(
		"checked",
		format!("Array.isArray({value})?_i({value},{value_binding})>-1{checked_when_scalar}"),
	));

	let member = if number {
		format!("_n({value_binding})")
	} else {
		value_binding
	};
	let code = format!(
		"var $$a={value},$$el=$event.target,$$c=$$el.checked?({true_value}):({false_value});\
		 if(Array.isArray($$a)){{var $$v={member},$$i=_i($$a,$$v);\
		 if($$el.checked){{$$i<0&&({})}}\
		 else{{$$i>-1&&({})}}}}else{{{}}}",
		gen_assignment_code(value, "$$a.concat([$$v])"),
		gen_assignment_code(value, "$$a.slice(0,$$i).concat($$a.slice($$i+1))"),
		gen_assignment_code(value, "$$c"),
	);
	add_handler(el, "change", &code, important(), diagnostics);
}

fn gen_radio_model(el: &mut Element, value: &str, number: bool, diagnostics: &mut Diagnostics) {
	let mut value_binding = get_binding_attr(el, "value", true).unwrap_or_else(|| "null".to_owned());
	if number {
		value_binding = format!("_n({value_binding})");
	}
	el.add_prop(Attr::new("checked", format!("_q({value},{value_binding})")));
	let code = gen_assignment_code(value, &value_binding);
	add_handler(el, "change", &code, important(), diagnostics);
}

fn gen_select(el: &mut Element, value: &str, number: bool, diagnostics: &mut Diagnostics) {
	let selected = format!(
		"Array.prototype.filter.call($event.target.options,function(o){{return o.selected}})\
		 .map(function(o){{var val = \"_value\" in o ? o._value : o.value;return {}}})",
		if number { "_n(val)" } else { "val" }
	);
	let code = format!(
		"var $$selectedVal = {selected}; {}",
		gen_assignment_code(value, "$event.target.multiple ? $$selectedVal : $$selectedVal[0]")
	);
	add_handler(el, "change", &code, important(), diagnostics);
}

fn gen_default_model(el: &mut Element, dir: &Directive, diagnostics: &mut Diagnostics) {
	let value = dir.value.as_str();
	let input_type = el.attrs_map.get("type").cloned();

	let bound_value = ["v-bind:value", ":value"]
		.into_iter()
		.find(|key| el.attrs_map.get(*key).is_some_and(|v| !v.is_empty()));
	let type_bound = ["v-bind:type", ":type"]
		.into_iter()
		.any(|key| el.attrs_map.get(key).is_some_and(|v| !v.is_empty()));
	if let Some(binding) = bound_value
		&& !type_bound
	{
		diagnostics.warn(
			format!(
				"{binding}=\"{}\" conflicts with v-model on the same element \
				 because the latter already expands to a value binding internally",
				el.attrs_map[binding]
			),
			raw_attr_span(el, binding),
		);
	}

	let lazy = has_modifier(dir, "lazy");
	let number = has_modifier(dir, "number");
	let trim = has_modifier(dir, "trim");
	let is_range = input_type.as_deref() == Some("range");
	let event = if lazy {
		"change"
	} else if is_range {
		RANGE_TOKEN
	} else {
		"input"
	};

	let mut value_expression = if trim {
		"$event.target.value.trim()".to_owned()
	} else {
		"$event.target.value".to_owned()
	};
	if number {
		value_expression = format!("_n({value_expression})");
	}
	let mut code = gen_assignment_code(value, &value_expression);
	if !lazy && !is_range {
		code = format!("if($event.target.composing)return;{code}");
	}

	el.add_prop(Attr::new("value", format!("({value})")));
	add_handler(el, event, &code, important(), diagnostics);
	if trim || number {
		add_handler(el, "blur", "$forceUpdate()", HandlerSpec::default(), diagnostics);
	}
}

/// Generators of the web platform.
pub fn web_directives() -> IndexMap<String, Arc<dyn DirectiveHandler>> {
	let mut directives: IndexMap<String, Arc<dyn DirectiveHandler>> = IndexMap::new();
	directives.insert("on".to_owned(), Arc::new(OnDirective));
	directives.insert("bind".to_owned(), Arc::new(BindDirective));
	directives.insert("cloak".to_owned(), Arc::new(CloakDirective));
	directives.insert("model".to_owned(), Arc::new(ModelDirective));
	directives.insert("text".to_owned(), Arc::new(TextDirective));
	directives.insert("html".to_owned(), Arc::new(HtmlDirective));
	directives
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::platform::WebPlatform;
	use reinhardt_reactive::Mode;
	use rstest::rstest;

	fn directive(name: &str, value: &str, modifiers: &[&str]) -> Directive {
		Directive {
			name: name.to_owned(),
			raw_name: format!("v-{name}"),
			value: value.to_owned(),
			arg: None,
			is_dynamic_arg: false,
			modifiers: modifiers.iter().map(|m| m.to_string()).collect(),
			start: None,
			end: None,
		}
	}

	fn apply(el: &mut Element, dir: &Directive) -> (bool, Diagnostics) {
		let mut diagnostics = Diagnostics::new(Mode::Development, false);
		let mut cx = DirectiveContext {
			platform: &WebPlatform,
			diagnostics: &mut diagnostics,
			bind_object: None,
			listener_object: None,
		};
		let runtime = ModelDirective.apply(el, dir, &mut cx);
		(runtime, diagnostics)
	}

	#[test]
	fn test_text_input_model() {
		let mut el = Element::new("input", vec![], None);
		let (runtime, _) = apply(&mut el, &directive("model", "msg", &[]));
		assert!(runtime);
		assert_eq!(el.props[0].value, "(msg)");
		assert_eq!(
			el.events["input"][0].value,
			"if($event.target.composing)return;msg=$event.target.value"
		);
	}

	#[rstest]
	#[case(&["lazy"], "change")]
	#[case(&["trim"], "input")]
	fn test_model_modifiers_pick_event(#[case] modifiers: &[&str], #[case] event: &str) {
		let mut el = Element::new("textarea", vec![], None);
		apply(&mut el, &directive("model", "msg", modifiers));
		assert!(el.events.contains_key(event));
		assert_eq!(el.events.contains_key("blur"), modifiers.contains(&"trim"));
	}

	#[test]
	fn test_component_model_needs_no_runtime() {
		let mut el = Element::new("my-input", vec![], None);
		let (runtime, _) = apply(&mut el, &directive("model", "form.name", &["trim"]));
		assert!(!runtime);
		let model = el.model.unwrap();
		assert_eq!(model.value, "(form.name)");
		assert_eq!(model.expression, "\"form.name\"");
		assert!(model.callback.contains("$set(form, \"name\""));
	}

	#[test]
	fn test_unsupported_element_warns() {
		let mut el = Element::new("div", vec![], None);
		let (_, diagnostics) = apply(&mut el, &directive("model", "x", &[]));
		assert!(diagnostics.errors()[0].msg.contains("not supported on this element type"));
	}

	#[test]
	fn test_radio_model() {
		let mut el = Element::new("input", vec![Attr::new("type", "radio"), Attr::new("value", "a")], None);
		apply(&mut el, &directive("model", "picked", &[]));
		assert_eq!(el.props[0].value, "_q(picked,\"a\")");
		assert_eq!(el.events["change"][0].value, "picked=\"a\"");
	}
}
