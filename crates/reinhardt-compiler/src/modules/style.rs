use reinhardt_compiler_ast::{Element, NodeId};
use serde_json::{Map, Value};

use crate::helpers::{get_binding_attr, raw_attr_span};
use crate::modules::Module;
use crate::parser::ParseContext;
use crate::text::parse_text;

/// Parses an inline `style` attribute into a JSON object literal.
///
/// Declarations are split on `;` outside parentheses, so `url(a;b)` stays
/// whole. Later duplicates win.
pub fn parse_style_text(text: &str) -> String {
	let mut declarations = Vec::new();
	let mut depth = 0usize;
	let mut last = 0;
	for (index, c) in text.char_indices() {
		match c {
			'(' => depth += 1,
			')' => depth = depth.saturating_sub(1),
			';' if depth == 0 => {
				declarations.push(&text[last..index]);
				last = index + 1;
			}
			_ => {}
		}
	}
	declarations.push(&text[last..]);

	let mut object = Map::new();
	for declaration in declarations {
		if let Some((property, value)) = declaration.split_once(':') {
			object.insert(property.trim().to_owned(), Value::String(value.trim().to_owned()));
		}
	}
	Value::Object(object).to_string()
}

/// `style` and `:style`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StyleModule;

impl Module for StyleModule {
	fn static_keys(&self) -> &'static [&'static str] {
		&["staticStyle"]
	}

	fn transform_node(&self, cx: &mut ParseContext<'_>, id: NodeId) {
		let delimiters = cx.options.delimiters();
		let Some(el) = cx.ast.element_mut(id) else {
			return;
		};
		if let Some(static_style) = el.get_and_remove_attr("style", false) {
			if parse_text(&static_style, delimiters).is_some() {
				cx.diagnostics.warn(
					format!(
						"style=\"{static_style}\": Interpolation inside attributes has been removed. \
						 Use v-bind or the colon shorthand instead. For example, \
						 instead of <div style=\"{{{{ val }}}}\">, use <div :style=\"val\">."
					),
					raw_attr_span(el, "style"),
				);
			}
			el.static_style = Some(parse_style_text(&static_style));
		}
		if let Some(binding) = get_binding_attr(el, "style", false) {
			el.style_binding = Some(binding);
		}
	}

	fn gen_data(&self, el: &Element) -> String {
		let mut data = String::new();
		if let Some(static_style) = &el.static_style {
			data.push_str(&format!("staticStyle:{static_style},"));
		}
		if let Some(binding) = &el.style_binding {
			data.push_str(&format!("style:({binding}),"));
		}
		data
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("color: red; font-size: 12px", r#"{"color":"red","font-size":"12px"}"#)]
	#[case("background: url(a;b.png);", r#"{"background":"url(a;b.png)"}"#)]
	#[case("color: red; color: blue", r#"{"color":"blue"}"#)]
	#[case("", "{}")]
	fn test_parse_style_text(#[case] text: &str, #[case] expected: &str) {
		assert_eq!(parse_style_text(text), expected);
	}
}
