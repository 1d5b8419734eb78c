//! Interpolation parsing for text nodes.

use std::collections::HashMap;
use std::sync::LazyLock;

use parking_lot::Mutex;
use regex::Regex;
use reinhardt_compiler_ast::TextToken;

use crate::util::quote;

/// Interpolation markers, `("{{", "}}")` by default.
pub type Delimiters = (String, String);

static DEFAULT_TAG: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"(?s)\{\{(.+?)\}\}").expect("DEFAULT_TAG: invalid regex pattern"));

static CUSTOM_TAGS: LazyLock<Mutex<HashMap<Delimiters, Regex>>> =
	LazyLock::new(|| Mutex::new(HashMap::new()));

fn tag_pattern(delimiters: Option<&Delimiters>) -> Option<Regex> {
	let Some(delimiters) = delimiters else {
		return Some(DEFAULT_TAG.clone());
	};
	let mut cache = CUSTOM_TAGS.lock();
	if let Some(re) = cache.get(delimiters) {
		return Some(re.clone());
	}
	let pattern = format!(
		"(?s){}(.+?){}",
		regex::escape(&delimiters.0),
		regex::escape(&delimiters.1)
	);
	let re = Regex::new(&pattern).ok()?;
	cache.insert(delimiters.clone(), re.clone());
	Some(re)
}

/// Interpolated text split into literal and binding parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedText {
	/// Render expression, e.g. `"Hello "+_s(name)`
	pub expression: String,
	pub tokens: Vec<TextToken>,
}

/// Parses the interpolations in `text`. Returns `None` when there are none.
pub fn parse_text(text: &str, delimiters: Option<&Delimiters>) -> Option<ParsedText> {
	let re = tag_pattern(delimiters)?;
	if !re.is_match(text) {
		return None;
	}
	let mut parts = Vec::new();
	let mut tokens = Vec::new();
	let mut last_index = 0;
	for caps in re.captures_iter(text) {
		let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
			continue;
		};
		if whole.start() > last_index {
			let literal = &text[last_index..whole.start()];
			parts.push(quote(literal));
			tokens.push(TextToken::Literal(literal.to_owned()));
		}
		let exp = inner.as_str().trim();
		parts.push(format!("_s({exp})"));
		tokens.push(TextToken::Binding(exp.to_owned()));
		last_index = whole.end();
	}
	if last_index < text.len() {
		let literal = &text[last_index..];
		parts.push(quote(literal));
		tokens.push(TextToken::Literal(literal.to_owned()));
	}
	Some(ParsedText {
		expression: parts.join("+"),
		tokens,
	})
}
