//! Tree construction from tokenizer events.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use reinhardt_compiler_ast::{Ast, AstNode, Attr, Element, ExpressionNode, IfCondition, NodeId, TextNode};

use crate::diagnostics::Span;
use crate::helpers::{attr_span, raw_attr_span};
use crate::html::TokenSink;
use crate::options::WhitespaceMode;
use crate::parser::ParseContext;
use crate::parser::directives::{process_element, process_for, process_if, process_once, process_pre, process_raw_attrs};
use crate::text::parse_text;

static WHITESPACE_RUN: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"[ \f\t\r\n]+").expect("WHITESPACE_RUN: invalid regex pattern"));

fn is_invalid_attr_name(name: &str) -> bool {
	name.chars()
		.any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '<' | '>' | '/' | '='))
}

fn is_forbidden_tag(el: &Element) -> bool {
	el.tag == "style"
		|| (el.tag == "script"
			&& el
				.attrs_map
				.get("type")
				.is_none_or(|kind| kind.is_empty() || kind == "text/javascript"))
}

pub(super) struct AstBuilder<'a> {
	cx: ParseContext<'a>,
	template: &'a str,
	stack: Vec<NodeId>,
	root: Option<NodeId>,
	current_parent: Option<NodeId>,
	in_v_pre: bool,
	in_pre: bool,
	warned: bool,
}

impl<'a> AstBuilder<'a> {
	pub(super) fn new(cx: ParseContext<'a>, template: &'a str) -> Self {
		Self {
			cx,
			template,
			stack: Vec::new(),
			root: None,
			current_parent: None,
			in_v_pre: false,
			in_pre: false,
			warned: false,
		}
	}

	pub(super) fn finish(self) -> Ast {
		let mut ast = self.cx.ast;
		if let Some(root) = self.root {
			ast.set_root(root);
		}
		ast
	}

	fn with_ranges(&self) -> bool {
		self.cx.options.config.output_source_range
	}

	fn warn_once(&mut self, msg: impl Into<String>, span: Span) {
		if !self.warned {
			self.warned = true;
			self.cx.diagnostics.warn(msg, span);
		}
	}

	fn element(&self, id: NodeId) -> Option<&Element> {
		self.cx.ast.element(id)
	}

	fn check_root_constraints(&mut self, id: NodeId) {
		let Some(el) = self.element(id) else {
			return;
		};
		let start = Span::at(el.start);
		let has_for = el.attrs_map.contains_key("v-for");
		let for_span = raw_attr_span(el, "v-for");
		if el.tag == "slot" || el.tag == "template" {
			let tag = el.tag.clone();
			self.warn_once(
				format!(
					"Cannot use <{tag}> as component root element because it may contain multiple nodes."
				),
				start,
			);
		}
		if has_for {
			self.warn_once(
				"Cannot use v-for on stateful component root element because it renders multiple elements.",
				for_span,
			);
		}
	}

	/// Drops trailing whitespace-only text children outside `<pre>`.
	fn trim_ending_whitespace(&mut self, id: NodeId) {
		if self.in_pre {
			return;
		}
		loop {
			let Some(&last) = self.element(id).and_then(|el| el.children.last()) else {
				return;
			};
			let is_space = matches!(self.cx.ast.node(last), AstNode::Text(text) if text.text == " ");
			if !is_space {
				return;
			}
			if let Some(el) = self.cx.ast.element_mut(id) {
				el.children.pop();
			}
		}
	}

	fn close_element(&mut self, id: NodeId) {
		self.trim_ending_whitespace(id);
		if !self.in_v_pre && self.element(id).is_some_and(|el| !el.processed) {
			process_element(&mut self.cx, id);
		}

		if self.stack.is_empty() && self.root.is_some_and(|root| root != id) {
			self.attach_root_sibling(id);
		}

		let Some(el) = self.element(id) else {
			return;
		};
		if let Some(parent) = self.current_parent
			&& !el.forbidden
		{
			if el.else_if.is_some() || el.else_branch {
				self.process_if_conditions(id, parent);
			} else {
				let slot = el
					.slot_scope
					.as_ref()
					.map(|_| el.slot_target.clone().unwrap_or_else(|| "\"default\"".to_owned()));
				let ast = &mut self.cx.ast;
				if let Some(parent_el) = ast.element_mut(parent) {
					if let Some(name) = slot {
						parent_el.scoped_slots.insert(name, id);
					}
					parent_el.children.push(id);
				}
				if let Some(el) = ast.element_mut(id) {
					el.parent = Some(parent);
				}
			}
		}

		// Scoped slots live in `scoped_slots`, not among the children.
		let ast = &self.cx.ast;
		let children: Vec<NodeId> = ast
			.children(id)
			.into_iter()
			.filter(|&child| ast.element(child).is_none_or(|child| child.slot_scope.is_none()))
			.collect();
		if let Some(el) = self.cx.ast.element_mut(id) {
			el.children = children;
		}

		self.trim_ending_whitespace(id);

		let Some(el) = self.element(id) else {
			return;
		};
		let (leaves_v_pre, leaves_pre) = (el.pre, self.cx.options.platform.is_pre_tag(&el.tag));
		if leaves_v_pre {
			self.in_v_pre = false;
		}
		if leaves_pre {
			self.in_pre = false;
		}
		let options = self.cx.options;
		for module in &options.modules {
			module.post_transform_node(&mut self.cx, id);
		}
	}

	/// A second top-level element is only allowed as a branch of the
	/// root's conditional chain.
	fn attach_root_sibling(&mut self, id: NodeId) {
		let Some(root) = self.root else {
			return;
		};
		let root_has_if = self.element(root).is_some_and(|el| el.if_condition.is_some());
		let Some(el) = self.element(id) else {
			return;
		};
		if root_has_if && (el.else_if.is_some() || el.else_branch) {
			let exp = el.else_if.clone();
			self.check_root_constraints(id);
			if let Some(root_el) = self.cx.ast.element_mut(root) {
				root_el.add_if_condition(IfCondition { exp, block: id });
			}
		} else {
			let start = Span::at(el.start);
			self.warn_once(
				"Component template should contain exactly one root element. \
				 If you are using v-if on multiple elements, use v-else-if to chain them instead.",
				start,
			);
		}
	}

	fn process_if_conditions(&mut self, id: NodeId, parent: NodeId) {
		let prev = self.find_prev_element(parent);
		let Some(el) = self.element(id) else {
			return;
		};
		let exp = el.else_if.clone();
		let prev_has_if = prev
			.and_then(|prev| self.element(prev))
			.is_some_and(|prev| prev.if_condition.is_some());
		match prev {
			Some(prev) if prev_has_if => {
				if let Some(prev_el) = self.cx.ast.element_mut(prev) {
					prev_el.add_if_condition(IfCondition { exp, block: id });
				}
			}
			_ => {
				let (directive, attr) = match &exp {
					Some(exp) => (format!("else-if=\"{exp}\""), "v-else-if"),
					None => ("else".to_owned(), "v-else"),
				};
				let msg = format!(
					"v-{directive} used on element <{}> without corresponding v-if.",
					el.tag
				);
				let span = raw_attr_span(el, attr);
				self.cx.diagnostics.warn(msg, span);
			}
		}
	}

	/// Last element child of `parent`. Text in between is discarded.
	fn find_prev_element(&mut self, parent: NodeId) -> Option<NodeId> {
		loop {
			let last = *self.element(parent)?.children.last()?;
			let dropped = match self.cx.ast.node(last) {
				AstNode::Element(_) => return Some(last),
				AstNode::Text(text) => (text.text.clone(), text.start, text.end),
				AstNode::Expression(exp) => (exp.text.clone(), exp.start, exp.end),
			};
			let (text, start, end) = dropped;
			if text != " " {
				self.cx.diagnostics.warn(
					format!(
						"text \"{}\" between v-if and v-else(-if) will be ignored.",
						text.trim()
					),
					Span { start, end },
				);
			}
			if let Some(el) = self.cx.ast.element_mut(parent) {
				el.children.pop();
			}
		}
	}

	fn range(&self, span: &Range<usize>) -> (Option<usize>, Option<usize>) {
		if self.with_ranges() {
			(Some(span.start), Some(span.end))
		} else {
			(None, None)
		}
	}
}

impl TokenSink for AstBuilder<'_> {
	fn start(&mut self, tag: &str, attrs: Vec<Attr>, unary: bool, span: Range<usize>) {
		let options = self.cx.options;
		let platform = &*options.platform;
		let ns = self
			.current_parent
			.and_then(|parent| self.element(parent))
			.and_then(|parent| parent.ns.clone())
			.or_else(|| platform.tag_namespace(tag).map(str::to_owned));

		let mut seen = std::collections::HashSet::new();
		for attr in &attrs {
			if !seen.insert(attr.name.as_str()) {
				self.cx
					.diagnostics
					.warn(format!("duplicate attribute: {}", attr.name), attr_span(attr));
			}
			if is_invalid_attr_name(&attr.name) {
				let offset = attr.name.find('[').unwrap_or(0);
				self.cx.diagnostics.warn(
					"Invalid dynamic argument expression: attribute names cannot contain \
					 spaces, quotes, <, >, / or =.",
					Span {
						start: attr.start.map(|start| start + offset),
						end: attr.start.map(|start| start + attr.name.len()),
					},
				);
			}
		}

		let mut el = Element::new(tag, attrs, self.current_parent);
		el.ns = ns;
		if self.with_ranges() {
			el.start = Some(span.start);
			el.end = Some(span.end);
			el.raw_attrs_map = el
				.attrs_list
				.iter()
				.map(|attr| (attr.name.clone(), attr.clone()))
				.collect();
		}
		if is_forbidden_tag(&el) {
			el.forbidden = true;
			self.cx.diagnostics.warn(
				format!(
					"Templates should only be responsible for mapping the state to the UI. \
					 Avoid placing tags with side-effects in your templates, such as <{tag}>, \
					 as they will not be parsed."
				),
				Span::at(el.start),
			);
		}

		let mut id = self.cx.ast.push(AstNode::Element(Box::new(el)));
		for module in &options.modules {
			if let Some(replacement) = module.pre_transform_node(&mut self.cx, id) {
				id = replacement;
			}
		}

		let Some(el) = self.cx.ast.element_mut(id) else {
			return;
		};
		if !self.in_v_pre {
			process_pre(el);
			if el.pre {
				self.in_v_pre = true;
			}
		}
		if platform.is_pre_tag(&el.tag) {
			self.in_pre = true;
		}
		if self.in_v_pre {
			process_raw_attrs(el);
		} else if !el.processed {
			process_for(el, self.cx.diagnostics);
			process_if(el, id);
			process_once(el);
		}

		if self.root.is_none() {
			self.root = Some(id);
			self.check_root_constraints(id);
		}

		if unary {
			self.close_element(id);
		} else {
			self.current_parent = Some(id);
			self.stack.push(id);
		}
	}

	fn end(&mut self, _tag: &str, span: Range<usize>) {
		let Some(id) = self.stack.pop() else {
			return;
		};
		self.current_parent = self.stack.last().copied();
		if self.with_ranges()
			&& let Some(el) = self.cx.ast.element_mut(id)
		{
			el.end = Some(span.end);
		}
		self.close_element(id);
	}

	fn chars(&mut self, text: &str, span: Range<usize>) {
		let Some(parent) = self.current_parent else {
			let start = Span::at(Some(span.start));
			if text == self.template {
				self.warn_once("Component template requires a root element, rather than just text.", start);
			} else if !text.trim().is_empty() {
				self.warn_once(
					format!("text \"{}\" outside root element will be ignored.", text.trim()),
					start,
				);
			}
			return;
		};
		let Some(parent_el) = self.element(parent) else {
			return;
		};
		let whitespace = self.cx.options.config.whitespace;
		let is_text_tag = parent_el.tag == "script" || parent_el.tag == "style";
		let children_empty = parent_el.children.is_empty();

		let mut text = if self.in_pre || !text.trim().is_empty() {
			if is_text_tag {
				text.to_owned()
			} else {
				html_escape::decode_html_entities(text).into_owned()
			}
		} else if children_empty {
			String::new()
		} else {
			match whitespace {
				WhitespaceMode::Condense if text.contains(['\r', '\n']) => String::new(),
				WhitespaceMode::Condense | WhitespaceMode::Preserve => " ".to_owned(),
				WhitespaceMode::Drop => String::new(),
			}
		};
		if text.is_empty() {
			return;
		}
		if !self.in_pre && whitespace == WhitespaceMode::Condense {
			text = WHITESPACE_RUN.replace_all(&text, " ").into_owned();
		}

		let (start, end) = self.range(&span);
		let node = if !self.in_v_pre
			&& text != " "
			&& let Some(parsed) = parse_text(&text, self.cx.options.delimiters())
		{
			Some(AstNode::Expression(ExpressionNode {
				expression: parsed.expression,
				tokens: parsed.tokens,
				text,
				start,
				end,
			}))
		} else {
			let last_is_space = self
				.element(parent)
				.and_then(|el| el.children.last())
				.is_some_and(|&last| match self.cx.ast.node(last) {
					AstNode::Text(node) => node.text == " ",
					AstNode::Expression(node) => node.text == " ",
					AstNode::Element(_) => false,
				});
			(text != " " || children_empty || !last_is_space).then(|| {
				AstNode::Text(TextNode {
					start,
					end,
					..TextNode::new(text)
				})
			})
		};
		if let Some(node) = node {
			let child = self.cx.ast.push(node);
			if let Some(parent_el) = self.cx.ast.element_mut(parent) {
				parent_el.children.push(child);
			}
		}
	}

	fn comment(&mut self, text: &str, span: Range<usize>) {
		let Some(parent) = self.current_parent else {
			return;
		};
		let (start, end) = self.range(&span);
		let child = self.cx.ast.push(AstNode::Text(TextNode {
			start,
			end,
			..TextNode::comment(text)
		}));
		if let Some(parent_el) = self.cx.ast.element_mut(parent) {
			parent_el.children.push(child);
		}
	}

	fn warn(&mut self, msg: String, span: Span) {
		self.cx.diagnostics.warn(msg, span);
	}
}
