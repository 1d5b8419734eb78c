use std::sync::LazyLock;

use regex::Regex;
use reinhardt_compiler_ast::{Element, NodeId};

use crate::helpers::{get_binding_attr, raw_attr_span};
use crate::modules::Module;
use crate::parser::ParseContext;
use crate::text::parse_text;
use crate::util::quote;

static WHITESPACE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"\s+").expect("WHITESPACE: invalid regex pattern"));

/// `class` and `:class`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassModule;

impl Module for ClassModule {
	fn static_keys(&self) -> &'static [&'static str] {
		&["staticClass"]
	}

	fn transform_node(&self, cx: &mut ParseContext<'_>, id: NodeId) {
		let delimiters = cx.options.delimiters();
		let Some(el) = cx.ast.element_mut(id) else {
			return;
		};
		if let Some(static_class) = el.get_and_remove_attr("class", false) {
			if parse_text(&static_class, delimiters).is_some() {
				cx.diagnostics.warn(
					format!(
						"class=\"{static_class}\": Interpolation inside attributes has been removed. \
						 Use v-bind or the colon shorthand instead. For example, \
						 instead of <div class=\"{{{{ val }}}}\">, use <div :class=\"val\">."
					),
					raw_attr_span(el, "class"),
				);
			}
			el.static_class = Some(quote(WHITESPACE.replace_all(&static_class, " ").trim()));
		}
		if let Some(binding) = get_binding_attr(el, "class", false) {
			el.class_binding = Some(binding);
		}
	}

	fn gen_data(&self, el: &Element) -> String {
		let mut data = String::new();
		if let Some(static_class) = &el.static_class {
			data.push_str(&format!("staticClass:{static_class},"));
		}
		if let Some(binding) = &el.class_binding {
			data.push_str(&format!("class:{binding},"));
		}
		data
	}
}
