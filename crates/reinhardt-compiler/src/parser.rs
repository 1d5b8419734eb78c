//! Template parser
//!
//! Turns the tokenizer's event stream into an [`Ast`]. Elements are created
//! on their start tag and processed on their end tag, when their children
//! are known. Processing extracts every directive from the raw attributes
//! into typed element fields.
//!
//! ## Architecture
//!
//! - `builder`: the [`TokenSink`](crate::html::TokenSink) that maintains
//!   the open-element stack, the root, whitespace handling and the
//!   conditional chains.
//! - `directives`: one function per directive family (`v-pre`, `v-for`,
//!   `v-if`, `v-once`, `key`, `ref`, slots, components, bindings and
//!   events). Modules reuse them when they expand elements.
//!
//! Problems are reported to the [`Diagnostics`] collector and never stop
//! the parse.
//!
//! ## Example
//!
//! ```ignore
//! use reinhardt_compiler::{CompilerOptions, Diagnostics, parser::parse};
//!
//! let options = CompilerOptions::web();
//! let mut diagnostics = Diagnostics::new(options.mode(), false);
//! let ast = parse("<p v-if=\"ok\">{{ msg }}</p>", &options, &mut diagnostics);
//! assert_eq!(ast.root_element().unwrap().if_condition.as_deref(), Some("ok"));
//! ```

mod builder;
mod directives;

use reinhardt_compiler_ast::Ast;

use crate::diagnostics::Diagnostics;
use crate::html::Tokenizer;
use crate::options::CompilerOptions;

pub use directives::{
	EMPTY_SLOT_SCOPE_TOKEN, ForParseResult, parse_for, process_element, process_for, process_if,
	process_once, process_pre, process_raw_attrs,
};

/// State shared by the parser and the modules' transform hooks.
pub struct ParseContext<'a> {
	pub options: &'a CompilerOptions,
	pub ast: Ast,
	pub diagnostics: &'a mut Diagnostics,
}

/// Parses a (trimmed) template.
pub fn parse(template: &str, options: &CompilerOptions, diagnostics: &mut Diagnostics) -> Ast {
	let cx = ParseContext {
		options,
		ast: Ast::new(),
		diagnostics,
	};
	let mut builder = builder::AstBuilder::new(cx, template);
	Tokenizer::new(template, options.html_options()).scan(&mut builder);
	builder.finish()
}

#[cfg(test)]
mod tests {
	use super::*;
	use reinhardt_compiler_ast::{AstNode, Element};
	use reinhardt_reactive::Mode;
	use rstest::rstest;

	use crate::options::{CompilerConfig, WhitespaceMode};

	fn parse_with(template: &str, config: CompilerConfig) -> (Ast, Diagnostics) {
		let options = CompilerOptions::web().with_config(config);
		let mut diagnostics = Diagnostics::new(Mode::Development, false);
		let ast = parse(template, &options, &mut diagnostics);
		(ast, diagnostics)
	}

	fn parse_web(template: &str) -> (Ast, Diagnostics) {
		parse_with(template, CompilerConfig::default())
	}

	fn root(ast: &Ast) -> &Element {
		ast.root_element().unwrap()
	}

	fn messages(diagnostics: &Diagnostics) -> Vec<String> {
		diagnostics.errors().iter().map(|d| d.msg.clone()).collect()
	}

	#[test]
	fn test_simple_element() {
		let (ast, diagnostics) = parse_web("<h1>hello world</h1>");
		let root = root(&ast);
		assert_eq!(root.tag, "h1");
		assert!(root.plain);
		match ast.node(root.children[0]) {
			AstNode::Text(text) => assert_eq!(text.text, "hello world"),
			other => panic!("unexpected node {other:?}"),
		}
		assert!(!diagnostics.has_errors());
	}

	#[test]
	fn test_interpolation_becomes_expression() {
		let (ast, _) = parse_web("<p>Hi {{ name }}</p>");
		match ast.node(root(&ast).children[0]) {
			AstNode::Expression(exp) => {
				assert_eq!(exp.expression, "\"Hi \"+_s(name)");
				assert_eq!(exp.text, "Hi {{ name }}");
			}
			other => panic!("unexpected node {other:?}"),
		}
	}

	#[test]
	fn test_v_pre_keeps_interpolation_as_text() {
		let (ast, _) = parse_web("<div v-pre><p :a=\"b\">{{ raw }}</p></div>");
		let root = root(&ast);
		assert!(root.pre);
		let p = ast.element(root.children[0]).unwrap();
		assert_eq!(p.attrs[0].name, ":a");
		assert_eq!(p.attrs[0].value, "\"b\"");
		assert!(matches!(ast.node(p.children[0]), AstNode::Text(t) if t.text == "{{ raw }}"));
	}

	#[test]
	fn test_v_for_aliases() {
		let (ast, _) = parse_web("<ul><li v-for=\"(item, key, index) in items\"></li></ul>");
		let li = ast.element(root(&ast).children[0]).unwrap();
		assert_eq!(li.for_exp.as_deref(), Some("items"));
		assert_eq!(li.alias.as_deref(), Some("item"));
		assert_eq!(li.iterator1.as_deref(), Some("key"));
		assert_eq!(li.iterator2.as_deref(), Some("index"));
	}

	#[test]
	fn test_invalid_v_for_warns() {
		let (_, diagnostics) = parse_web("<div><p v-for=\"items\"></p></div>");
		assert_eq!(messages(&diagnostics), vec!["Invalid v-for expression: items"]);
	}

	#[test]
	fn test_conditional_chain() {
		let (ast, diagnostics) =
			parse_web("<div><p v-if=\"a\">1</p><p v-else-if=\"b\">2</p><p v-else>3</p></div>");
		let root = root(&ast);
		assert_eq!(root.children.len(), 1);
		let head = ast.element(root.children[0]).unwrap();
		let exps: Vec<_> = head.if_conditions.iter().map(|c| c.exp.clone()).collect();
		assert_eq!(exps, vec![Some("a".to_owned()), Some("b".to_owned()), None]);
		assert!(!diagnostics.has_errors());
	}

	#[test]
	fn test_text_between_branches_is_dropped_with_warning() {
		let (ast, diagnostics) = parse_web("<div><p v-if=\"a\"></p> stray <p v-else></p></div>");
		assert_eq!(root(&ast).children.len(), 1);
		assert_eq!(
			messages(&diagnostics),
			vec!["text \"stray\" between v-if and v-else(-if) will be ignored."]
		);
	}

	#[test]
	fn test_else_without_if_warns() {
		let (_, diagnostics) = parse_web("<div><p v-else></p></div>");
		assert_eq!(
			messages(&diagnostics),
			vec!["v-else used on element <p> without corresponding v-if."]
		);
	}

	#[test]
	fn test_multiple_roots_warn_once() {
		let (ast, diagnostics) = parse_web("<div></div><span></span><b></b>");
		assert_eq!(root(&ast).tag, "div");
		assert_eq!(diagnostics.errors().len(), 1);
		assert!(messages(&diagnostics)[0].contains("exactly one root element"));
	}

	#[test]
	fn test_root_if_chain_is_allowed() {
		let (ast, diagnostics) = parse_web("<div v-if=\"a\"></div><span v-else></span>");
		assert_eq!(root(&ast).if_conditions.len(), 2);
		assert!(!diagnostics.has_errors());
	}

	#[rstest]
	#[case("<slot></slot>", "Cannot use <slot> as component root element")]
	#[case("<div v-for=\"i in 3\"></div>", "Cannot use v-for on stateful component root element")]
	#[case("text only", "Component template requires a root element, rather than just text.")]
	fn test_root_constraints(#[case] template: &str, #[case] expected: &str) {
		let (_, diagnostics) = parse_web(template);
		assert!(messages(&diagnostics)[0].starts_with(expected));
	}

	#[test]
	fn test_forbidden_tag() {
		let (ast, diagnostics) = parse_web("<div><script>alert(1)</script></div>");
		assert!(root(&ast).children.is_empty());
		assert!(messages(&diagnostics)[0].contains("<script>"));
	}

	#[test]
	fn test_bindings_and_events() {
		let (ast, _) = parse_web(
			"<div :id=\"uid\" v-bind:title.camel=\"t\" @click.stop=\"go\" :value.prop=\"v\" data-x=\"1\"></div>",
		);
		let root = root(&ast);
		assert!(root.has_bindings);
		let attrs: Vec<_> = root.attrs.iter().map(|a| (a.name.as_str(), a.value.as_str())).collect();
		assert_eq!(attrs, vec![("id", "uid"), ("title", "t"), ("data-x", "\"1\"")]);
		assert_eq!(root.props[0].name, "value");
		assert_eq!(root.events["click"][0].modifiers, vec!["stop"]);
	}

	#[test]
	fn test_dynamic_arguments() {
		let (ast, _) = parse_web("<div :[key]=\"v\" @[evt]=\"h\" v-foo:[arg].bar=\"x\"></div>");
		let root = root(&ast);
		assert!(root.dynamic_attrs[0].dynamic);
		assert_eq!(root.dynamic_attrs[0].name, "key");
		assert!(root.events["evt"][0].dynamic);
		let dir = &root.directives[0];
		assert_eq!(dir.name, "foo");
		assert_eq!(dir.arg.as_deref(), Some("arg"));
		assert!(dir.is_dynamic_arg);
		assert_eq!(dir.modifiers, vec!["bar"]);
	}

	#[test]
	fn test_sync_modifier_adds_update_handlers() {
		let (ast, _) = parse_web("<comp :foo-bar.sync=\"x\"></comp>");
		let root = root(&ast);
		assert!(root.events.contains_key("update:fooBar"));
		assert!(root.events.contains_key("update:foo-bar"));
		assert_eq!(root.events["update:fooBar"][0].value, "x=$event");
	}

	#[test]
	fn test_interpolation_in_attribute_warns() {
		let (_, diagnostics) = parse_web("<div id=\"{{ a }}\"></div>");
		assert!(messages(&diagnostics)[0].contains("Interpolation inside attributes has been removed"));
	}

	#[test]
	fn test_key_ref_and_ref_in_for() {
		let (ast, _) = parse_web("<ul><li v-for=\"i in l\" :key=\"i\"><a ref=\"x\"></a></li></ul>");
		let li = ast.element(root(&ast).children[0]).unwrap();
		assert_eq!(li.key.as_deref(), Some("i"));
		let a = ast.element(li.children[0]).unwrap();
		assert_eq!(a.ref_name.as_deref(), Some("\"x\""));
		assert!(a.ref_in_for);
	}

	#[test]
	fn test_keyed_template_warns() {
		let (_, diagnostics) = parse_web("<div><template :key=\"a\"><p></p></template></div>");
		assert!(messages(&diagnostics)[0].starts_with("<template> cannot be keyed"));
	}

	#[test]
	fn test_v_slot_on_template() {
		let (ast, _) = parse_web("<comp><template #header=\"{ title }\"><h1>{{ title }}</h1></template></comp>");
		let root = root(&ast);
		assert!(root.children.is_empty());
		let slot = ast.element(root.scoped_slots["\"header\""]).unwrap();
		assert_eq!(slot.slot_scope.as_deref(), Some("{ title }"));
	}

	#[test]
	fn test_v_slot_on_component_wraps_children() {
		let (ast, _) = parse_web("<comp v-slot=\"props\"><span>{{ props.a }}</span></comp>");
		let root = root(&ast);
		assert!(root.children.is_empty());
		let container = ast.element(root.scoped_slots["\"default\""]).unwrap();
		assert_eq!(container.tag, "template");
		assert_eq!(container.slot_scope.as_deref(), Some("props"));
		assert_eq!(container.children.len(), 1);
	}

	#[test]
	fn test_slot_outlet_and_component() {
		let (ast, _) = parse_web("<div><slot name=\"footer\"></slot><div is=\"my-comp\"></div></div>");
		let root = root(&ast);
		let slot = ast.element(root.children[0]).unwrap();
		assert_eq!(slot.slot_name.as_deref(), Some("\"footer\""));
		let dynamic = ast.element(root.children[1]).unwrap();
		assert_eq!(dynamic.component.as_deref(), Some("\"my-comp\""));
	}

	#[rstest]
	#[case(WhitespaceMode::Preserve, 3)]
	#[case(WhitespaceMode::Condense, 2)]
	#[case(WhitespaceMode::Drop, 2)]
	fn test_whitespace_between_tags(#[case] whitespace: WhitespaceMode, #[case] children: usize) {
		let config = CompilerConfig {
			whitespace,
			..CompilerConfig::default()
		};
		let (ast, _) = parse_with("<div>\n  <span></span>\n  <b></b>\n</div>", config);
		assert_eq!(root(&ast).children.len(), children);
	}

	#[test]
	fn test_condense_collapses_text_whitespace() {
		let config = CompilerConfig {
			whitespace: WhitespaceMode::Condense,
			..CompilerConfig::default()
		};
		let (ast, _) = parse_with("<p>a   b\n c</p>", config);
		assert!(matches!(ast.node(root(&ast).children[0]), AstNode::Text(t) if t.text == "a b c"));
	}

	#[test]
	fn test_entities_are_decoded() {
		let (ast, _) = parse_web("<p>&lt;b&gt; &amp;</p>");
		assert!(matches!(ast.node(root(&ast).children[0]), AstNode::Text(t) if t.text == "<b> &"));
	}

	#[test]
	fn test_comments_kept_when_enabled() {
		let config = CompilerConfig {
			comments: true,
			..CompilerConfig::default()
		};
		let (ast, _) = parse_with("<div><!-- note --></div>", config);
		assert!(matches!(ast.node(root(&ast).children[0]), AstNode::Text(t) if t.is_comment && t.text == " note "));
	}

	#[test]
	fn test_svg_namespace_is_inherited() {
		let (ast, _) = parse_web("<svg><g></g></svg>");
		let root = root(&ast);
		assert_eq!(root.ns.as_deref(), Some("svg"));
		assert_eq!(ast.element(root.children[0]).unwrap().ns.as_deref(), Some("svg"));
	}

	#[test]
	fn test_dynamic_input_type_is_expanded() {
		let (ast, _) = parse_web("<div><input v-model=\"x\" :type=\"t\"></div>");
		let input = ast.element(root(&ast).children[0]).unwrap();
		let exps: Vec<_> = input.if_conditions.iter().map(|c| c.exp.clone()).collect();
		assert_eq!(
			exps,
			vec![Some("(t)==='checkbox'".to_owned()), Some("(t)==='radio'".to_owned()), None]
		);
		let other = ast.element(input.if_conditions[2].block).unwrap();
		assert_eq!(other.attrs_map.get(":type").map(String::as_str), Some("t"));
	}

	#[test]
	fn test_source_ranges() {
		let config = CompilerConfig {
			output_source_range: true,
			..CompilerConfig::default()
		};
		let (ast, _) = parse_with("<div id=\"a\">x</div>", config);
		let root = root(&ast);
		assert_eq!((root.start, root.end), (Some(0), Some(19)));
		assert_eq!(root.raw_attrs_map["id"].start, Some(5));
	}
}
