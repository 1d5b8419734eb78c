//! String helpers shared by the compiler stages.

/// Quotes `value` as a JSON string literal.
pub fn quote(value: &str) -> String {
	serde_json::Value::String(value.to_owned()).to_string()
}

/// `foo-bar` to `fooBar`.
pub fn camelize(value: &str) -> String {
	let mut out = String::with_capacity(value.len());
	let mut chars = value.chars().peekable();
	while let Some(c) = chars.next() {
		if c == '-'
			&& let Some(next) = chars.peek().copied()
			&& next.is_ascii_alphanumeric()
		{
			out.extend(next.to_uppercase());
			chars.next();
		} else {
			out.push(c);
		}
	}
	out
}

/// `fooBar` to `foo-bar`.
pub fn hyphenate(value: &str) -> String {
	let mut out = String::with_capacity(value.len() + 4);
	for (index, c) in value.char_indices() {
		if c.is_ascii_uppercase() && index > 0 {
			out.push('-');
		}
		out.push(c.to_ascii_lowercase());
	}
	out
}

/// Escapes the line and paragraph separators, which are valid in JSON
/// strings but terminate string literals in render source.
pub fn transform_special_newlines(text: &str) -> String {
	text.replace('\u{2028}', "\\u2028").replace('\u{2029}', "\\u2029")
}
