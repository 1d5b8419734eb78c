//! Static analysis
//!
//! Marks subtrees that never change after the first render so code
//! generation can hoist them into render functions that run once.
//!
//! 1. `mark_static` flags every node whose output is fixed.
//! 2. `mark_static_roots` picks the static elements worth hoisting: those
//!    with children other than a single text node.
//!
//! Both passes only overwrite the flags they own, so running the optimizer
//! again on the same tree gives the same result.

use std::collections::HashSet;

use reinhardt_compiler_ast::{Ast, AstNode, NodeId};

use crate::options::CompilerOptions;
use crate::platform::{Platform, is_built_in_tag};

/// Element keys that never make an element dynamic.
///
/// `else`/`elseif` only select a branch: the condition is evaluated by the
/// element heading the chain, so a branch's own content can still be fixed.
const BASE_STATIC_KEYS: &[&str] = &[
	"type",
	"tag",
	"attrsList",
	"attrsMap",
	"plain",
	"parent",
	"children",
	"attrs",
	"start",
	"end",
	"rawAttrsMap",
	"else",
	"elseif",
];

struct Optimizer<'a> {
	static_keys: HashSet<&'static str>,
	platform: &'a dyn Platform,
}

/// Marks static nodes and static roots in place.
pub fn optimize(ast: &mut Ast, options: &CompilerOptions) {
	let Some(root) = ast.root() else {
		return;
	};
	let optimizer = Optimizer {
		static_keys: BASE_STATIC_KEYS
			.iter()
			.copied()
			.chain(options.static_keys())
			.collect(),
		platform: &*options.platform,
	};
	optimizer.mark_static(ast, root);
	optimizer.mark_static_roots(ast, root, false);
}

impl Optimizer<'_> {
	fn mark_static(&self, ast: &mut Ast, id: NodeId) {
		let is_static = self.is_static(ast, id);
		let Some(el) = ast.element_mut(id) else {
			return;
		};
		el.is_static = is_static;

		// Component slot content must stay reactive to the component, so
		// children of non-platform elements are left alone. `<slot>` and
		// inline templates are exceptions.
		if !self.platform.is_reserved_tag(&el.tag)
			&& el.tag != "slot"
			&& !el.attrs_map.contains_key("inline-template")
		{
			return;
		}

		let children = el.children.clone();
		let branches: Vec<NodeId> = el.if_conditions.iter().skip(1).map(|c| c.block).collect();
		for child in children.into_iter().chain(branches) {
			self.mark_static(ast, child);
			if !ast.node(child).is_static()
				&& let Some(el) = ast.element_mut(id)
			{
				el.is_static = false;
			}
		}
	}

	fn mark_static_roots(&self, ast: &mut Ast, id: NodeId, in_for: bool) {
		let single_text_child = ast
			.element(id)
			.is_some_and(|el| el.children.len() == 1 && matches!(ast.node(el.children[0]), AstNode::Text(_)));
		let Some(el) = ast.element_mut(id) else {
			return;
		};
		if el.is_static || el.once {
			el.static_in_for = Some(in_for);
		}
		// Hoisting a lone text child costs more than re-rendering it.
		if el.is_static && !el.children.is_empty() && !single_text_child {
			el.static_root = true;
			return;
		}
		el.static_root = false;

		let children = el.children.clone();
		let branches: Vec<NodeId> = el.if_conditions.iter().skip(1).map(|c| c.block).collect();
		let child_in_for = in_for || el.for_exp.is_some();
		for child in children {
			self.mark_static_roots(ast, child, child_in_for);
		}
		for block in branches {
			self.mark_static_roots(ast, block, in_for);
		}
	}

	fn is_static(&self, ast: &Ast, id: NodeId) -> bool {
		let el = match ast.node(id) {
			AstNode::Expression(_) => return false,
			AstNode::Text(_) => return true,
			AstNode::Element(el) => el,
		};
		if el.pre {
			return true;
		}
		!el.has_bindings
			&& el.if_condition.is_none()
			&& el.for_exp.is_none()
			&& !is_built_in_tag(&el.tag)
			&& self.platform.is_reserved_tag(&el.tag)
			&& !is_direct_child_of_template_for(ast, id)
			&& el
				.populated_keys()
				.iter()
				.all(|key| self.static_keys.contains(key))
	}
}

fn is_direct_child_of_template_for(ast: &Ast, id: NodeId) -> bool {
	let mut current = ast.element(id).and_then(|el| el.parent);
	while let Some(parent) = current.and_then(|parent| ast.element(parent)) {
		if parent.tag != "template" {
			return false;
		}
		if parent.for_exp.is_some() {
			return true;
		}
		current = parent.parent;
	}
	false
}
