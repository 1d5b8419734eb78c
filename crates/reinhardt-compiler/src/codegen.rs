//! Render code generation
//!
//! Produces the body of a render function from an optimized [`Ast`]. The
//! output is an expression over runtime helpers:
//!
//! | Helper | Meaning |
//! |--------|---------|
//! | `_c(tag, data, children, normalization)` | create element |
//! | `_v(text)` | text node |
//! | `_e()` | empty / comment node |
//! | `_s(value)` | to display string |
//! | `_l(source, fn)` | render list |
//! | `_t(name, fallback, props, bind)` | render slot |
//! | `_m(index, in_for)` | static subtree |
//! | `_o(vnode, id, key)` | mark once |
//! | `_u(slots)` | resolve scoped slots |
//! | `_b`, `_d`, `_g`, `_p` | bind object, dynamic keys, listeners, modifier marker |
//!
//! Each element is visited by a fixed sequence of stages (static hoisting,
//! once, for, if, then the element itself); a stage marks the element as
//! processed before recursing so the next visit moves on to the next stage.

mod data;
mod events;

use std::collections::HashSet;

use reinhardt_compiler_ast::{Ast, AstNode, Element, IfCondition, NodeId};

use crate::diagnostics::{Diagnostics, Span};
use crate::helpers::{maybe_component, raw_attr_span};
use crate::options::CompilerOptions;
use crate::util::{camelize, quote, transform_special_newlines};

pub use events::{gen_handler, gen_handlers};

/// Generated render code.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CodegenResult {
	/// `with(this){return ...}`
	pub render: String,
	pub static_render_fns: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Stage {
	Static,
	Once,
	For,
	If,
}

type GenFn<'a> = fn(&mut CodegenState<'a>, NodeId) -> String;

pub(crate) struct CodegenState<'a> {
	options: &'a CompilerOptions,
	ast: &'a Ast,
	diagnostics: &'a mut Diagnostics,
	static_render_fns: Vec<String>,
	once_id: usize,
	pre: bool,
	processed: HashSet<(NodeId, Stage)>,
}

/// Generates render code for the tree rooted at `ast.root()`.
pub fn generate(ast: &Ast, options: &CompilerOptions, diagnostics: &mut Diagnostics) -> CodegenResult {
	let mut state = CodegenState::new(ast, options, diagnostics);
	state.generate_root(ast.root())
}

impl<'a> CodegenState<'a> {
	fn new(ast: &'a Ast, options: &'a CompilerOptions, diagnostics: &'a mut Diagnostics) -> Self {
		Self {
			options,
			ast,
			diagnostics,
			static_render_fns: Vec::new(),
			once_id: 0,
			pre: false,
			processed: HashSet::new(),
		}
	}

	fn generate_root(mut self, root: Option<NodeId>) -> CodegenResult {
		let code = match root.and_then(|root| self.ast.element(root).map(|el| (root, el))) {
			Some((_, el)) if el.tag == "script" => "null".to_owned(),
			Some((root, _)) => self.gen_element(root),
			None => "_c(\"div\")".to_owned(),
		};
		CodegenResult {
			render: format!("with(this){{return {code}}}"),
			static_render_fns: self.static_render_fns,
		}
	}

	fn element(&self, id: NodeId) -> Option<&'a Element> {
		self.ast.element(id)
	}

	fn mark(&mut self, id: NodeId, stage: Stage) -> bool {
		self.processed.insert((id, stage))
	}

	fn is_processed(&self, id: NodeId, stage: Stage) -> bool {
		self.processed.contains(&(id, stage))
	}

	fn maybe_component(&self, el: &Element) -> bool {
		maybe_component(el, &*self.options.platform)
	}

	/// `v-pre` applies to the whole subtree.
	fn in_pre(&self, id: NodeId) -> bool {
		let mut current = Some(id);
		while let Some(el) = current.and_then(|id| self.element(id)) {
			if el.pre {
				return true;
			}
			current = el.parent;
		}
		false
	}

	pub(crate) fn gen_element(&mut self, id: NodeId) -> String {
		let Some(el) = self.element(id) else {
			return self.gen_node(id);
		};
		if el.static_root && !self.is_processed(id, Stage::Static) {
			return self.gen_static(id);
		}
		if el.once && !self.is_processed(id, Stage::Once) {
			return self.gen_once(id);
		}
		if el.for_exp.is_some() && !self.is_processed(id, Stage::For) {
			return self.gen_for(id, None);
		}
		if el.if_condition.is_some() && !self.is_processed(id, Stage::If) {
			return self.gen_if(id, None, None);
		}
		if el.tag == "template" && el.slot_target.is_none() && !self.pre {
			return self.gen_children(id, false).unwrap_or_else(|| "void 0".to_owned());
		}
		if el.tag == "slot" {
			return self.gen_slot(id);
		}

		if let Some(component) = &el.component {
			return self.gen_component(component, id);
		}
		let data = (!el.plain || (self.in_pre(id) && self.maybe_component(el))).then(|| self.gen_data(id));
		let children = if el.inline_template {
			None
		} else {
			self.gen_children(id, true)
		};
		let mut code = format!("_c('{}'", el.tag);
		if let Some(data) = data {
			code.push(',');
			code.push_str(&data);
		}
		if let Some(children) = children {
			code.push(',');
			code.push_str(&children);
		}
		code.push(')');
		code
	}

	/// Hoists a static subtree into its own render function.
	fn gen_static(&mut self, id: NodeId) -> String {
		self.mark(id, Stage::Static);
		let Some(el) = self.element(id) else {
			return String::new();
		};
		let original_pre = self.pre;
		if el.pre {
			self.pre = true;
		}
		let inner = self.gen_element(id);
		self.static_render_fns.push(format!("with(this){{return {inner}}}"));
		self.pre = original_pre;
		let in_for = if el.static_in_for == Some(true) { ",true" } else { "" };
		format!("_m({}{in_for})", self.static_render_fns.len() - 1)
	}

	fn gen_once(&mut self, id: NodeId) -> String {
		self.mark(id, Stage::Once);
		let Some(el) = self.element(id) else {
			return String::new();
		};
		if el.if_condition.is_some() && !self.is_processed(id, Stage::If) {
			return self.gen_if(id, None, None);
		}
		if el.static_in_for != Some(true) {
			return self.gen_static(id);
		}

		let mut key = None;
		let mut parent = el.parent;
		while let Some(parent_el) = parent.and_then(|id| self.element(id)) {
			if parent_el.for_exp.is_some() {
				key = parent_el.key.clone();
				break;
			}
			parent = parent_el.parent;
		}
		let Some(key) = key else {
			self.diagnostics.warn(
				"v-once can only be used inside v-for that is keyed. ",
				raw_attr_span(el, "v-once"),
			);
			return self.gen_element(id);
		};
		let inner = self.gen_element(id);
		let once_id = self.once_id;
		self.once_id += 1;
		format!("_o({inner},{once_id},{key})")
	}

	fn gen_if(&mut self, id: NodeId, alt: Option<GenFn<'a>>, alt_empty: Option<&str>) -> String {
		self.mark(id, Stage::If);
		let conditions = self
			.element(id)
			.map(|el| el.if_conditions.as_slice())
			.unwrap_or_default();
		self.gen_if_conditions(conditions, alt, alt_empty)
	}

	fn gen_if_conditions(
		&mut self,
		conditions: &'a [IfCondition],
		alt: Option<GenFn<'a>>,
		alt_empty: Option<&str>,
	) -> String {
		let Some((condition, rest)) = conditions.split_first() else {
			return alt_empty.unwrap_or("_e()").to_owned();
		};
		let block = self.gen_ternary_branch(condition.block, alt);
		match &condition.exp {
			Some(exp) => format!(
				"({exp})?{block}:{}",
				self.gen_if_conditions(rest, alt, alt_empty)
			),
			None => block,
		}
	}

	fn gen_ternary_branch(&mut self, id: NodeId, alt: Option<GenFn<'a>>) -> String {
		if let Some(alt) = alt {
			return alt(self, id);
		}
		if self.element(id).is_some_and(|el| el.once) {
			self.gen_once(id)
		} else {
			self.gen_element(id)
		}
	}

	fn gen_for(&mut self, id: NodeId, alt: Option<GenFn<'a>>) -> String {
		let Some(el) = self.element(id) else {
			return String::new();
		};
		let exp = el.for_exp.as_deref().unwrap_or_default();
		let alias = el.alias.as_deref().unwrap_or_default();
		let iterator1 = el.iterator1.as_ref().map(|i| format!(",{i}")).unwrap_or_default();
		let iterator2 = el.iterator2.as_ref().map(|i| format!(",{i}")).unwrap_or_default();

		if self.maybe_component(el) && el.tag != "slot" && el.tag != "template" && el.key.is_none() {
			self.diagnostics.tip(
				format!(
					"<{} v-for=\"{alias} in {exp}\">: component lists rendered with \
					 v-for should have explicit keys.",
					el.tag
				),
				raw_attr_span(el, "v-for"),
			);
		}

		self.mark(id, Stage::For);
		let body = match alt {
			Some(alt) => alt(self, id),
			None => self.gen_element(id),
		};
		format!("_l(({exp}),function({alias}{iterator1}{iterator2}){{return {body}}})")
	}

	/// Children array plus normalization hint, or `None` without children.
	fn gen_children(&mut self, id: NodeId, check_skip: bool) -> Option<String> {
		let el = self.element(id)?;
		let children = &el.children;
		let first = *children.first()?;

		if children.len() == 1
			&& let Some(only) = self.element(first)
			&& only.for_exp.is_some()
			&& only.tag != "template"
			&& only.tag != "slot"
		{
			let normalization = match (check_skip, self.maybe_component(only)) {
				(false, _) => "",
				(true, true) => ",1",
				(true, false) => ",0",
			};
			return Some(format!("{}{normalization}", self.gen_element(first)));
		}

		let normalization = if check_skip {
			self.normalization_type(children)
		} else {
			0
		};
		let nodes: Vec<String> = children.iter().map(|&child| self.gen_node(child)).collect();
		let suffix = if normalization > 0 {
			format!(",{normalization}")
		} else {
			String::new()
		};
		Some(format!("[{}]{suffix}", nodes.join(",")))
	}

	/// 0: none, 1: components may return arrays (shallow), 2: full.
	fn normalization_type(&self, children: &[NodeId]) -> u8 {
		let needs_normalization =
			|el: &Element| el.for_exp.is_some() || el.tag == "template" || el.tag == "slot";
		let mut result = 0;
		for el in children.iter().filter_map(|&child| self.element(child)) {
			let branches: Vec<&Element> = el
				.if_conditions
				.iter()
				.filter_map(|condition| self.element(condition.block))
				.collect();
			if needs_normalization(el) || branches.iter().any(|block| needs_normalization(block)) {
				return 2;
			}
			if self.maybe_component(el) || branches.iter().any(|block| self.maybe_component(block)) {
				result = 1;
			}
		}
		result
	}

	fn gen_node(&mut self, id: NodeId) -> String {
		match self.ast.node(id) {
			AstNode::Element(_) => self.gen_element(id),
			AstNode::Text(text) if text.is_comment => format!("_e({})", quote(&text.text)),
			AstNode::Text(text) => format!("_v({})", transform_special_newlines(&quote(&text.text))),
			AstNode::Expression(exp) => format!("_v({})", exp.expression),
		}
	}

	fn gen_slot(&mut self, id: NodeId) -> String {
		let Some(el) = self.element(id) else {
			return String::new();
		};
		let slot_name = el.slot_name.as_deref().unwrap_or("\"default\"");
		let children = self.gen_children(id, false);
		let mut code = format!("_t({slot_name}");
		if let Some(children) = &children {
			code.push_str(&format!(",function(){{return {children}}}"));
		}

		let attrs = (!el.attrs.is_empty() || !el.dynamic_attrs.is_empty()).then(|| {
			let props: Vec<_> = el
				.attrs
				.iter()
				.chain(&el.dynamic_attrs)
				.map(|attr| reinhardt_compiler_ast::Attr {
					name: camelize(&attr.name),
					value: attr.value.clone(),
					dynamic: attr.dynamic,
					start: None,
					end: None,
				})
				.collect();
			data::gen_props(&props)
		});
		let bind = el.attrs_map.get("v-bind");
		if (attrs.is_some() || bind.is_some()) && children.is_none() {
			code.push_str(",null");
		}
		if let Some(attrs) = &attrs {
			code.push(',');
			code.push_str(attrs);
		}
		if let Some(bind) = bind {
			if attrs.is_none() {
				code.push_str(",null");
			}
			code.push(',');
			code.push_str(bind);
		}
		code.push(')');
		code
	}

	fn gen_component(&mut self, component: &str, id: NodeId) -> String {
		let inline_template = self.element(id).is_some_and(|el| el.inline_template);
		let data = self.gen_data(id);
		let children = if inline_template {
			None
		} else {
			self.gen_children(id, true)
		};
		match children {
			Some(children) => format!("_c({component},{data},{children})"),
			None => format!("_c({component},{data})"),
		}
	}

	fn warn(&mut self, msg: impl Into<String>, span: Span) {
		self.diagnostics.warn(msg, span);
	}
}
