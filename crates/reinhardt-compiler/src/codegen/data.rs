//! The element data object: everything passed to `_c` besides tag and
//! children.

use reinhardt_compiler_ast::{Ast, AstNode, Attr, Element, NodeId};

use super::events::gen_handlers;
use super::{CodegenState, Stage};
use crate::diagnostics::Span;
use crate::directives::DirectiveContext;
use crate::options::CompilerOptions;
use crate::parser::EMPTY_SLOT_SCOPE_TOKEN;
use crate::util::{quote, transform_special_newlines};

/// `{"name":value}`, or `_d({...},[name,value])` when some names are
/// dynamic.
pub(crate) fn gen_props(props: &[Attr]) -> String {
	let mut static_props = Vec::new();
	let mut dynamic_props = Vec::new();
	for prop in props {
		let value = transform_special_newlines(&prop.value);
		if prop.dynamic {
			dynamic_props.push(format!("{},{value}", prop.name));
		} else {
			static_props.push(format!("\"{}\":{value}", prop.name));
		}
	}
	let static_props = format!("{{{}}}", static_props.join(","));
	if dynamic_props.is_empty() {
		static_props
	} else {
		format!("_d({static_props},[{}])", dynamic_props.join(","))
	}
}

/// djb2 variant over UTF-16 code units, iterated from the end.
fn hash(code: &str) -> u32 {
	let units: Vec<u16> = code.encode_utf16().collect();
	units
		.iter()
		.rev()
		.fold(5381u32, |hash, &unit| hash.wrapping_mul(33) ^ u32::from(unit))
}

fn contains_slot_child(ast: &Ast, id: NodeId) -> bool {
	match ast.node(id) {
		AstNode::Element(el) if el.tag == "slot" => true,
		AstNode::Element(el) => el.children.iter().any(|&child| contains_slot_child(ast, child)),
		_ => false,
	}
}

impl<'a> CodegenState<'a> {
	pub(super) fn gen_data(&mut self, id: NodeId) -> String {
		let Some(source) = self.element(id) else {
			return "{}".to_owned();
		};
		// Directive generators rewrite props and handlers on a private copy.
		let mut el = source.clone();
		let mut entries = Vec::new();
		let mut cx = DirectiveContext {
			platform: &*self.options.platform,
			diagnostics: &mut *self.diagnostics,
			bind_object: None,
			listener_object: None,
		};
		if let Some(directives) = gen_directives(&mut el, self.options, &mut cx) {
			entries.push(directives);
		}
		let bind_object = cx.bind_object.take();
		let listener_object = cx.listener_object.take();

		if let Some(key) = &el.key {
			entries.push(format!("key:{key}"));
		}
		if let Some(ref_name) = &el.ref_name {
			entries.push(format!("ref:{ref_name}"));
		}
		if el.ref_in_for {
			entries.push("refInFor:true".to_owned());
		}
		if el.pre {
			entries.push("pre:true".to_owned());
		}
		if el.component.is_some() {
			entries.push(format!("tag:\"{}\"", el.tag));
		}

		let mut data = String::from("{");
		for entry in &entries {
			data.push_str(entry);
			data.push(',');
		}
		for module in &self.options.modules {
			data.push_str(&module.gen_data(&el));
		}
		if !el.attrs.is_empty() {
			data.push_str(&format!("attrs:{},", gen_props(&el.attrs)));
		}
		if !el.props.is_empty() {
			data.push_str(&format!("domProps:{},", gen_props(&el.props)));
		}
		if !el.events.is_empty() {
			data.push_str(&format!("{},", gen_handlers(&el.events, false)));
		}
		if !el.native_events.is_empty() {
			data.push_str(&format!("{},", gen_handlers(&el.native_events, true)));
		}
		if let Some(target) = &el.slot_target
			&& el.slot_scope.is_none()
		{
			data.push_str(&format!("slot:{target},"));
		}
		if !el.scoped_slots.is_empty() {
			let scoped_slots = self.gen_scoped_slots(id, &el);
			data.push_str(&format!("{scoped_slots},"));
		}
		if let Some(model) = &el.model {
			data.push_str(&format!(
				"model:{{value:{},callback:{},expression:{}}},",
				model.value, model.callback, model.expression
			));
		}
		if el.inline_template
			&& let Some(inline_template) = self.gen_inline_template(&el)
		{
			data.push_str(&format!("{inline_template},"));
		}
		if data.ends_with(',') {
			data.pop();
		}
		data.push('}');

		if !el.dynamic_attrs.is_empty() {
			data = format!("_b({data},\"{}\",{})", el.tag, gen_props(&el.dynamic_attrs));
		}
		if let Some(bind) = bind_object {
			let prop = if bind.prop { "true" } else { "false" };
			let sync = if bind.sync { ",true" } else { "" };
			data = format!("_b({data},'{}',{},{prop}{sync})", el.tag, bind.value);
		}
		if let Some(listeners) = listener_object {
			data = format!("_g({data},{listeners})");
		}
		data
	}

	fn gen_scoped_slots(&mut self, id: NodeId, el: &Element) -> String {
		let ast = self.ast;
		let mut needs_force_update = el.for_exp.is_some()
			|| el.scoped_slots.values().any(|&slot| {
				ast.element(slot).is_some_and(|slot_el| {
					slot_el.slot_target_dynamic
						|| slot_el.if_condition.is_some()
						|| slot_el.for_exp.is_some()
						|| contains_slot_child(ast, slot)
				})
			});
		// A slot inside a conditional needs a key so branches sharing the
		// same slot names do not reuse each other's functions.
		let mut needs_key = el.if_condition.is_some();
		if !needs_force_update {
			let mut parent = ast.element(id).and_then(|el| el.parent);
			while let Some(parent_el) = parent.and_then(|parent| ast.element(parent)) {
				let scoped = parent_el
					.slot_scope
					.as_deref()
					.is_some_and(|scope| scope != EMPTY_SLOT_SCOPE_TOKEN);
				if scoped || parent_el.for_exp.is_some() {
					needs_force_update = true;
					break;
				}
				if parent_el.if_condition.is_some() {
					needs_key = true;
				}
				parent = parent_el.parent;
			}
		}

		let slots: Vec<String> = el
			.scoped_slots
			.values()
			.map(|&slot| self.gen_scoped_slot(slot))
			.collect();
		let generated = slots.join(",");
		if needs_force_update {
			format!("scopedSlots:_u([{generated}],null,true)")
		} else if needs_key {
			format!("scopedSlots:_u([{generated}],null,false,{})", hash(&generated))
		} else {
			format!("scopedSlots:_u([{generated}])")
		}
	}

	fn gen_scoped_slot(&mut self, id: NodeId) -> String {
		let Some(el) = self.element(id) else {
			return String::new();
		};
		let legacy_syntax = el.attrs_map.contains_key("slot-scope");
		if el.if_condition.is_some() && !legacy_syntax && !self.is_processed(id, Stage::If) {
			return self.gen_if(id, Some(Self::gen_scoped_slot), Some("null"));
		}
		if el.for_exp.is_some() && !self.is_processed(id, Stage::For) {
			return self.gen_for(id, Some(Self::gen_scoped_slot));
		}

		let slot_scope = match el.slot_scope.as_deref() {
			Some(EMPTY_SLOT_SCOPE_TOKEN) | None => "",
			Some(scope) => scope,
		};
		let body = if el.tag == "template" {
			let children = self.gen_children(id, false).unwrap_or_else(|| "undefined".to_owned());
			match el.if_condition.as_deref() {
				Some(condition) if legacy_syntax => format!("({condition})?{children}:undefined"),
				_ => children,
			}
		} else {
			self.gen_element(id)
		};
		let key = el.slot_target.as_deref().unwrap_or("\"default\"");
		let reverse_proxy = if slot_scope.is_empty() { ",proxy:true" } else { "" };
		format!("{{key:{key},fn:function({slot_scope}){{return {body}}}{reverse_proxy}}}")
	}

	/// Renders the single child of an `inline-template` component as its
	/// own render function.
	fn gen_inline_template(&mut self, el: &Element) -> Option<String> {
		let first = el.children.first().copied();
		let child = first.filter(|&child| self.ast.node(child).is_element());
		if el.children.len() != 1 || child.is_none() {
			self.warn(
				"Inline-template components must have exactly one child element.",
				Span::at(el.start),
			);
		}
		let child = child?;
		let inner = CodegenState::new(self.ast, self.options, &mut *self.diagnostics).generate_root(Some(child));
		let static_fns: Vec<String> = inner
			.static_render_fns
			.iter()
			.map(|code| format!("function(){{{code}}}"))
			.collect();
		Some(format!(
			"inlineTemplate:{{render:function(){{{}}},staticRenderFns:[{}]}}",
			inner.render,
			static_fns.join(",")
		))
	}
}

/// `directives:[...]` for the directives that still need the runtime.
fn gen_directives(
	el: &mut Element,
	options: &CompilerOptions,
	cx: &mut DirectiveContext<'_>,
) -> Option<String> {
	let directives = el.directives.clone();
	let mut runtime = Vec::new();
	for dir in &directives {
		let needs_runtime = match options.directives.get(&dir.name) {
			Some(handler) => handler.apply(el, dir, cx),
			None => true,
		};
		if !needs_runtime {
			continue;
		}
		let mut code = format!("{{name:\"{}\",rawName:\"{}\"", dir.name, dir.raw_name);
		if !dir.value.is_empty() {
			code.push_str(&format!(",value:({}),expression:{}", dir.value, quote(&dir.value)));
		}
		if let Some(arg) = &dir.arg {
			if dir.is_dynamic_arg {
				code.push_str(&format!(",arg:{arg}"));
			} else {
				code.push_str(&format!(",arg:\"{arg}\""));
			}
		}
		if !dir.modifiers.is_empty() {
			let modifiers: serde_json::Map<String, serde_json::Value> = dir
				.modifiers
				.iter()
				.map(|m| (m.clone(), serde_json::Value::Bool(true)))
				.collect();
			code.push_str(&format!(",modifiers:{}", serde_json::Value::Object(modifiers)));
		}
		code.push('}');
		runtime.push(code);
	}
	(!runtime.is_empty()).then(|| format!("directives:[{}]", runtime.join(",")))
}
