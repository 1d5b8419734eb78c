//! Compiler entry point.

use reinhardt_compiler_ast::Ast;
use serde::Serialize;

use crate::codegen::generate;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::optimizer::optimize;
use crate::options::CompilerOptions;
use crate::parser::parse;

/// Output of [`compile`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledResult {
	pub ast: Ast,
	/// Render function body, `with(this){return ...}`
	pub render: String,
	/// Bodies of the hoisted static subtrees, referenced by `_m(index)`
	pub static_render_fns: Vec<String>,
	pub errors: Vec<Diagnostic>,
	pub tips: Vec<Diagnostic>,
}

impl CompiledResult {
	pub fn has_errors(&self) -> bool {
		!self.errors.is_empty()
	}
}

/// Compiles a template into render code.
///
/// Never fails: template problems are reported in `errors` and `tips`
/// next to whatever could be generated. Surrounding whitespace is ignored,
/// but diagnostic ranges still refer to offsets in `template` itself.
///
/// # Examples
///
/// ```
/// use reinhardt_compiler::{CompilerOptions, compile};
///
/// let result = compile("<div>{{ msg }}</div>", &CompilerOptions::web());
/// assert_eq!(result.render, "with(this){return _c('div',[_v(_s(msg))])}");
/// assert!(result.errors.is_empty());
/// ```
pub fn compile(template: &str, options: &CompilerOptions) -> CompiledResult {
	let leading = template.len() - template.trim_start().len();
	let template = template.trim();
	let mut diagnostics =
		Diagnostics::new(options.mode(), options.config.output_source_range).with_offset(leading);

	let mut ast = parse(template, options, &mut diagnostics);
	if options.config.optimize {
		optimize(&mut ast, options);
	}
	let code = generate(&ast, options, &mut diagnostics);
	let (errors, tips) = diagnostics.into_parts();
	tracing::debug!(
		errors = errors.len(),
		tips = tips.len(),
		static_roots = code.static_render_fns.len(),
		"compiled template"
	);

	CompiledResult {
		ast,
		render: code.render,
		static_render_fns: code.static_render_fns,
		errors,
		tips,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::options::CompilerConfig;
	use reinhardt_reactive::Mode;

	#[test]
	fn test_ranges_account_for_leading_whitespace() {
		let options = CompilerOptions::web().with_config(CompilerConfig {
			output_source_range: true,
			..CompilerConfig::default()
		});
		let result = compile("\n  <div><p v-else>x</p></div>", &options);
		let error = &result.errors[0];
		assert!(error.msg.contains("v-else"));
		assert_eq!(error.start, Some(11));
	}

	#[test]
	fn test_production_collects_nothing() {
		let options = CompilerOptions::web().with_config(CompilerConfig {
			mode: Mode::Production,
			..CompilerConfig::default()
		});
		let result = compile("<div><span></div>", &options);
		assert!(result.errors.is_empty());
		assert!(result.ast.root_element().is_some());
	}

	#[test]
	fn test_optimize_can_be_disabled() {
		let options = CompilerOptions::web().with_config(CompilerConfig {
			optimize: false,
			..CompilerConfig::default()
		});
		let result = compile("<div><p><b>x</b></p></div>", &options);
		assert!(result.static_render_fns.is_empty());
		assert!(!result.ast.root_element().is_some_and(|el| el.static_root));
	}
}
