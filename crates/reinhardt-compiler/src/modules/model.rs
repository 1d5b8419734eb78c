//! `<input v-model :type="t">`: the input type is only known at runtime,
//! so the element is expanded into a checkbox, radio and generic branch
//! selected by a conditional chain.

use reinhardt_compiler_ast::{Attr, AstNode, Element, IfCondition, NodeId};

use crate::helpers::get_binding_attr;
use crate::modules::Module;
use crate::parser::{ParseContext, process_element, process_for};

/// One branch of the expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputBranch {
	Checkbox,
	Radio,
	Other,
}

/// Copy of `el` specialised for `branch`.
///
/// Only the checkbox branch keeps `v-for`: it heads the chain and the
/// chain is repeated as a whole.
pub fn expand_input_branch(el: &Element, branch: InputBranch, type_binding: &str) -> Element {
	let mut copy = el.clone_unprocessed();
	match branch {
		InputBranch::Checkbox => copy.add_raw_attr(Attr::new("type", "checkbox")),
		InputBranch::Radio => {
			copy.get_and_remove_attr("v-for", true);
			copy.add_raw_attr(Attr::new("type", "radio"));
		}
		InputBranch::Other => {
			copy.get_and_remove_attr("v-for", true);
			copy.add_raw_attr(Attr::new(":type", type_binding));
		}
	}
	copy
}

/// Pre-transform for dynamically typed `v-model` inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelModule;

impl Module for ModelModule {
	fn pre_transform_node(&self, cx: &mut ParseContext<'_>, id: NodeId) -> Option<NodeId> {
		let el = cx.ast.element_mut(id)?;
		if el.tag != "input" || !el.attrs_map.get("v-model").is_some_and(|v| !v.is_empty()) {
			return None;
		}

		let bound = |key: &str| el.attrs_map.get(key).is_some_and(|v| !v.is_empty());
		let has_type_binding = bound(":type") || bound("v-bind:type");
		let mut type_binding = None;
		if has_type_binding {
			type_binding = get_binding_attr(el, "type", false);
		}
		if !el.attrs_map.contains_key("type")
			&& type_binding.is_none()
			&& let Some(object) = el.attrs_map.get("v-bind")
		{
			type_binding = Some(format!("({object}).type"));
		}
		let type_binding = type_binding?;

		let if_condition = el.get_and_remove_attr("v-if", true);
		let extra = if_condition
			.as_ref()
			.map(|condition| format!("&&({condition})"))
			.unwrap_or_default();
		let has_else = el.get_and_remove_attr("v-else", true).is_some();
		let else_if = el.get_and_remove_attr("v-else-if", true);

		let checkbox = expand_input_branch(el, InputBranch::Checkbox, &type_binding);
		let radio = expand_input_branch(el, InputBranch::Radio, &type_binding);
		let other = expand_input_branch(el, InputBranch::Other, &type_binding);

		let checkbox_id = cx.ast.push(AstNode::Element(Box::new(checkbox)));
		if let Some(el) = cx.ast.element_mut(checkbox_id) {
			process_for(el, cx.diagnostics);
		}
		process_element(cx, checkbox_id);
		let radio_id = cx.ast.push(AstNode::Element(Box::new(radio)));
		process_element(cx, radio_id);
		let other_id = cx.ast.push(AstNode::Element(Box::new(other)));
		process_element(cx, other_id);

		let checkbox_exp = format!("({type_binding})==='checkbox'{extra}");
		let el = cx.ast.element_mut(checkbox_id)?;
		el.processed = true;
		el.if_condition = Some(checkbox_exp.clone());
		el.add_if_condition(IfCondition {
			exp: Some(checkbox_exp),
			block: checkbox_id,
		});
		el.add_if_condition(IfCondition {
			exp: Some(format!("({type_binding})==='radio'{extra}")),
			block: radio_id,
		});
		el.add_if_condition(IfCondition {
			exp: if_condition,
			block: other_id,
		});
		if has_else {
			el.else_branch = true;
		} else if else_if.is_some() {
			el.else_if = else_if;
		}
		Some(checkbox_id)
	}
}
