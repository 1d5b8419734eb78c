//! Turning render code into something callable.
//!
//! The compiler only produces source text. A [`FunctionFactory`] supplied by
//! the host converts that text into its own invocable type (a script
//! engine handle, a bytecode blob, a closure). [`TemplateCompiler`] drives
//! compilation, logs diagnostics in development mode and caches the
//! converted functions for the lifetime of the compiler.
//!
//! The cache is keyed by delimiters and template text and is never evicted.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use reinhardt_reactive::{dev_tip, dev_warn};

use crate::code_frame::generate_code_frame;
use crate::compile::{CompiledResult, compile};
use crate::diagnostics::Diagnostic;
use crate::error::{FunctionGenerationError, FunctionResult};
use crate::options::CompilerOptions;
use crate::text::Delimiters;

/// Converts render source into an invocable unit.
pub trait FunctionFactory: Send + Sync {
	type Output: Clone + Send + Sync;

	/// Builds a function from `code`. The error is a human readable reason.
	fn create(&self, code: &str) -> Result<Self::Output, String>;

	/// Placeholder used when `create` fails.
	fn noop(&self) -> Self::Output;
}

/// Render functions of one template.
#[derive(Debug, Clone)]
pub struct CompiledFunctions<T> {
	pub render: T,
	pub static_render_fns: Vec<T>,
	/// Template diagnostics
	pub errors: Vec<Diagnostic>,
	pub tips: Vec<Diagnostic>,
	/// Sources the factory rejected; these point at the code generator
	pub function_errors: Vec<FunctionGenerationError>,
}

type CacheKey = (Option<Delimiters>, String);

/// Compiles templates to functions with a process-lifetime cache.
pub struct TemplateCompiler<F: FunctionFactory> {
	options: CompilerOptions,
	factory: F,
	cache: Mutex<HashMap<CacheKey, Arc<CompiledFunctions<F::Output>>>>,
}

impl<F: FunctionFactory> TemplateCompiler<F> {
	pub fn new(options: CompilerOptions, factory: F) -> Self {
		Self {
			options,
			factory,
			cache: Mutex::new(HashMap::new()),
		}
	}

	pub fn options(&self) -> &CompilerOptions {
		&self.options
	}

	/// Compiles without touching the cache.
	pub fn compile(&self, template: &str) -> CompiledResult {
		compile(template, &self.options)
	}

	/// Compiles `template` and converts the result, reusing a previous
	/// conversion of the same template.
	pub fn compile_to_functions(&self, template: &str) -> Arc<CompiledFunctions<F::Output>> {
		let key = (self.options.delimiters().cloned(), template.to_owned());
		if let Some(cached) = self.cache.lock().get(&key) {
			return Arc::clone(cached);
		}

		let compiled = compile(template, &self.options);
		self.report(template, &compiled);

		let mut function_errors = Vec::new();
		let render = self.create_function(&compiled.render, &mut function_errors);
		let static_render_fns = compiled
			.static_render_fns
			.iter()
			.map(|code| self.create_function(code, &mut function_errors))
			.collect();

		// Only meaningful when the template itself was fine.
		if compiled.errors.is_empty() && !function_errors.is_empty() {
			let details: Vec<String> = function_errors.iter().map(ToString::to_string).collect();
			dev_warn!(
				self.options.mode(),
				"Failed to generate render function:\n\n{}",
				details.join("\n")
			);
		}

		let functions = Arc::new(CompiledFunctions {
			render,
			static_render_fns,
			errors: compiled.errors,
			tips: compiled.tips,
			function_errors,
		});
		// Another thread may have compiled the same template meanwhile; the
		// first entry wins so callers share one instance.
		Arc::clone(self.cache.lock().entry(key).or_insert(functions))
	}

	/// Number of cached templates.
	pub fn cache_len(&self) -> usize {
		self.cache.lock().len()
	}

	fn create_function(&self, code: &str, errors: &mut Vec<FunctionGenerationError>) -> F::Output {
		match self.try_create(code) {
			Ok(function) => function,
			Err(err) => {
				errors.push(err);
				self.factory.noop()
			}
		}
	}

	fn try_create(&self, code: &str) -> FunctionResult<F::Output> {
		self.factory
			.create(code)
			.map_err(|message| FunctionGenerationError::rejected(message, code))
	}

	fn report(&self, template: &str, compiled: &CompiledResult) {
		let mode = self.options.mode();
		if !compiled.errors.is_empty() {
			if self.options.config.output_source_range {
				for error in &compiled.errors {
					let frame = generate_code_frame(
						template,
						error.start.unwrap_or(0),
						error.end.unwrap_or(template.len()),
					);
					dev_warn!(mode, "Error compiling template:\n\n{}\n\n{}", error.msg, frame);
				}
			} else {
				let list: Vec<String> = compiled.errors.iter().map(|e| format!("- {e}")).collect();
				dev_warn!(mode, "Error compiling template:\n\n{}\n\n{}\n", template, list.join("\n"));
			}
		}
		for tip in &compiled.tips {
			dev_tip!(mode, "{}", tip.msg);
		}
	}
}

/// Factory keeping the render source as text after a bracket balance check.
///
/// Useful for hosts that evaluate render code elsewhere, and for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceFactory;

impl FunctionFactory for SourceFactory {
	type Output = Arc<str>;

	fn create(&self, code: &str) -> Result<Self::Output, String> {
		check_balanced(code)?;
		Ok(Arc::from(code))
	}

	fn noop(&self) -> Self::Output {
		Arc::from("function(){}")
	}
}

/// Rejects unbalanced `()[]{}` outside string literals.
fn check_balanced(code: &str) -> Result<(), String> {
	let mut stack = Vec::new();
	let mut quote: Option<char> = None;
	let mut escaped = false;
	for (index, c) in code.char_indices() {
		if let Some(q) = quote {
			match c {
				_ if escaped => escaped = false,
				'\\' => escaped = true,
				_ if c == q => quote = None,
				_ => {}
			}
			continue;
		}
		match c {
			'"' | '\'' | '`' => quote = Some(c),
			'(' | '[' | '{' => stack.push(c),
			')' | ']' | '}' => {
				let expected = match c {
					')' => '(',
					']' => '[',
					_ => '{',
				};
				if stack.pop() != Some(expected) {
					return Err(format!("SyntaxError: unexpected '{c}' at {index}"));
				}
			}
			_ => {}
		}
	}
	match (quote, stack.last()) {
		(Some(q), _) => Err(format!("SyntaxError: unterminated string starting with {q}")),
		(None, Some(open)) => Err(format!("SyntaxError: unclosed '{open}'")),
		(None, None) => Ok(()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	struct RejectingFactory;

	impl FunctionFactory for RejectingFactory {
		type Output = ();

		fn create(&self, _code: &str) -> Result<(), String> {
			Err("unsupported".to_owned())
		}

		fn noop(&self) {}
	}

	#[test]
	fn test_cache_hit_returns_same_instance() {
		let compiler = TemplateCompiler::new(CompilerOptions::web(), SourceFactory);
		let first = compiler.compile_to_functions("<div>{{ a }}</div>");
		let second = compiler.compile_to_functions("<div>{{ a }}</div>");
		assert!(Arc::ptr_eq(&first, &second));
		assert_eq!(compiler.cache_len(), 1);
		assert_eq!(&*first.render, "with(this){return _c('div',[_v(_s(a))])}");
	}

	#[test]
	fn test_cache_key_includes_delimiters() {
		let custom = CompilerOptions::web().with_config(crate::options::CompilerConfig {
			delimiters: Some(("${".to_owned(), "}".to_owned())),
			..Default::default()
		});
		let default = TemplateCompiler::new(CompilerOptions::web(), SourceFactory);
		let custom = TemplateCompiler::new(custom, SourceFactory);
		let template = "<div>${ a }</div>";
		assert_eq!(&*default.compile_to_functions(template).render, "with(this){return _c('div',[_v(\"${ a }\")])}");
		assert_eq!(&*custom.compile_to_functions(template).render, "with(this){return _c('div',[_v(_s(a))])}");
	}

	#[test]
	fn test_function_errors_are_separate() {
		let compiler = TemplateCompiler::new(CompilerOptions::web(), RejectingFactory);
		let functions = compiler.compile_to_functions("<div><p><b>x</b></p>{{ a }}</div>");
		assert!(functions.errors.is_empty());
		assert_eq!(functions.function_errors.len(), 2);
		assert!(functions.function_errors[0].code().starts_with("with(this){return _c('div'"));
	}

	#[test]
	fn test_template_errors_are_kept() {
		let compiler = TemplateCompiler::new(CompilerOptions::web(), SourceFactory);
		let functions = compiler.compile_to_functions("<div><span></div>");
		assert!(!functions.errors.is_empty());
		assert!(functions.function_errors.is_empty());
	}

	#[rstest]
	#[case("with(this){return _c('div',[_v(\")\")])}", true)]
	#[case("with(this){return _c('div'}", false)]
	#[case("with(this){return \"a}", false)]
	#[case("with(this){return _c('div',[_v(\"\\\"}\")])}", true)]
	fn test_source_factory_balance(#[case] code: &str, #[case] ok: bool) {
		assert_eq!(SourceFactory.create(code).is_ok(), ok);
	}
}
