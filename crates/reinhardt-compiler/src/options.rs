//! Compiler configuration
//!
//! [`CompilerConfig`] is the plain, deserializable part (read from settings
//! files); [`CompilerOptions`] adds the pluggable pieces: the platform
//! predicates, transformation modules and directive code generators.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use reinhardt_reactive::Mode;
use serde::{Deserialize, Serialize};

use crate::directives::{DirectiveHandler, web_directives};
use crate::html::HtmlOptions;
use crate::modules::{Module, web_modules};
use crate::platform::{Platform, WebPlatform};
use crate::text::Delimiters;

/// Handling of whitespace-only text between tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WhitespaceMode {
	/// Keep a single space
	#[default]
	Preserve,
	/// Drop whitespace containing a newline, keep a single space otherwise,
	/// and collapse whitespace runs inside text
	Condense,
	/// Drop it
	Drop,
}

/// Serializable compiler settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
	/// Interpolation markers, `{{ }}` when unset
	pub delimiters: Option<Delimiters>,
	pub whitespace: WhitespaceMode,
	/// Keep HTML comments as comment nodes
	pub comments: bool,
	/// Record source offsets on nodes and diagnostics
	pub output_source_range: bool,
	/// Run static analysis before code generation
	pub optimize: bool,
	pub mode: Mode,
	pub should_decode_newlines: bool,
	pub should_decode_newlines_for_href: bool,
}

impl Default for CompilerConfig {
	fn default() -> Self {
		Self {
			delimiters: None,
			whitespace: WhitespaceMode::default(),
			comments: false,
			output_source_range: false,
			optimize: true,
			mode: Mode::default(),
			should_decode_newlines: false,
			should_decode_newlines_for_href: false,
		}
	}
}

/// Full compiler options.
///
/// Cheap to clone: the pluggable parts are shared.
#[derive(Clone)]
pub struct CompilerOptions {
	pub config: CompilerConfig,
	/// Apply browser quirks for `<p>` and optional end tags
	pub expect_html: bool,
	pub platform: Arc<dyn Platform>,
	pub modules: Vec<Arc<dyn Module>>,
	pub directives: IndexMap<String, Arc<dyn DirectiveHandler>>,
}

impl CompilerOptions {
	/// Web platform with the class, style and model modules and the
	/// built-in directive generators.
	pub fn web() -> Self {
		Self {
			config: CompilerConfig::default(),
			expect_html: true,
			platform: Arc::new(WebPlatform),
			modules: web_modules(),
			directives: web_directives(),
		}
	}

	/// Options with no modules and no directive generators.
	pub fn bare(platform: Arc<dyn Platform>) -> Self {
		Self {
			config: CompilerConfig::default(),
			expect_html: false,
			platform,
			modules: Vec::new(),
			directives: IndexMap::new(),
		}
	}

	pub fn with_config(mut self, config: CompilerConfig) -> Self {
		self.config = config;
		self
	}

	/// Appends a module after the existing ones.
	pub fn with_module(mut self, module: Arc<dyn Module>) -> Self {
		self.modules.push(module);
		self
	}

	/// Registers a directive generator, replacing one of the same name.
	pub fn with_directive(mut self, name: impl Into<String>, handler: Arc<dyn DirectiveHandler>) -> Self {
		self.directives.insert(name.into(), handler);
		self
	}

	pub fn mode(&self) -> Mode {
		self.config.mode
	}

	pub fn delimiters(&self) -> Option<&Delimiters> {
		self.config.delimiters.as_ref()
	}

	/// Element keys the modules declare safe for static hoisting.
	pub fn static_keys(&self) -> Vec<&'static str> {
		self.modules
			.iter()
			.flat_map(|module| module.static_keys().iter().copied())
			.collect()
	}

	pub(crate) fn html_options(&self) -> HtmlOptions<'_> {
		HtmlOptions {
			expect_html: self.expect_html,
			platform: &*self.platform,
			should_decode_newlines: self.config.should_decode_newlines,
			should_decode_newlines_for_href: self.config.should_decode_newlines_for_href,
			should_keep_comment: self.config.comments,
		}
	}
}

impl Default for CompilerOptions {
	fn default() -> Self {
		Self::web()
	}
}

impl fmt::Debug for CompilerOptions {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CompilerOptions")
			.field("config", &self.config)
			.field("expect_html", &self.expect_html)
			.field("modules", &self.modules.len())
			.field("directives", &self.directives.keys().collect::<Vec<_>>())
			.finish_non_exhaustive()
	}
}
