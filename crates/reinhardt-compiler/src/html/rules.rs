//! Production rules of the tokenizer.
//!
//! Each rule looks at the unconsumed input and reports what it would
//! consume, without touching any tokenizer state. Offsets are relative to
//! the slice handed in.

use std::collections::HashMap;
use std::ops::Range;
use std::sync::LazyLock;

use parking_lot::Mutex;
use regex::{Captures, Regex};

use crate::platform::is_plain_text_element;

macro_rules! ncname {
	() => {
		r"[a-zA-Z_][\-\.0-9_a-zA-Z\x{00B7}\x{00C0}-\x{00D6}\x{00D8}-\x{00F6}\x{00F8}-\x{037D}\x{037F}-\x{1FFF}\x{200C}-\x{200D}\x{203F}-\x{2040}\x{2070}-\x{218F}\x{2C00}-\x{2FEF}\x{3001}-\x{D7FF}\x{F900}-\x{FDCF}\x{FDF0}-\x{FFFD}]*"
	};
}

macro_rules! attr_value {
	() => {
		r#"(?:\s*(=)\s*(?:"([^"]*)"+|'([^']*)'+|([^\s"'=<>`]+)))?"#
	};
}

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(concat!(r#"^\s*([^\s"'<>/=]+)"#, attr_value!()))
		.expect("ATTRIBUTE: invalid regex pattern")
});

static DYNAMIC_ARG_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(concat!(
		r#"^\s*((?:v-[\w-]+:|@|:|#)\[[^=]+?\][^\s"'<>/=]*)"#,
		attr_value!()
	))
	.expect("DYNAMIC_ARG_ATTRIBUTE: invalid regex pattern")
});

static START_TAG_OPEN: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(concat!("^<((?:", ncname!(), ":)?", ncname!(), ")"))
		.expect("START_TAG_OPEN: invalid regex pattern")
});

static START_TAG_CLOSE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^\s*(/?)>").expect("START_TAG_CLOSE: invalid regex pattern"));

static END_TAG: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(concat!("^</((?:", ncname!(), ":)?", ncname!(), ")[^>]*>"))
		.expect("END_TAG: invalid regex pattern")
});

static DOCTYPE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"(?i)^<!DOCTYPE [^>]+>").expect("DOCTYPE: invalid regex pattern"));

static ENCODED_ATTR: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"&(?:lt|gt|quot|amp|#39);").expect("ENCODED_ATTR: invalid regex pattern")
});

static ENCODED_ATTR_WITH_NEWLINES: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"&(?:lt|gt|quot|amp|#39|#10|#9);")
		.expect("ENCODED_ATTR_WITH_NEWLINES: invalid regex pattern")
});

static COMMENT_WRAPPER: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"<!--([\s\S]*?)-->").expect("COMMENT_WRAPPER: invalid regex pattern"));

static CDATA_WRAPPER: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"<!\[CDATA\[([\s\S]*?)\]\]>").expect("CDATA_WRAPPER: invalid regex pattern")
});

/// Closing-tag patterns of raw-text elements, compiled once per tag name.
static RAW_TEXT_END: LazyLock<Mutex<HashMap<String, Regex>>> =
	LazyLock::new(|| Mutex::new(HashMap::new()));

/// `<!-- ... -->`
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CommentMatch {
	pub text: Range<usize>,
	pub len: usize,
}

pub(crate) fn comment(rest: &str) -> Option<CommentMatch> {
	if !rest.starts_with("<!--") {
		return None;
	}
	let end = rest.find("-->")?;
	Some(CommentMatch {
		text: 4..end.max(4),
		len: end + 3,
	})
}

/// `<![if IE]>`-style conditional comments. Consumed and dropped.
pub(crate) fn conditional_comment(rest: &str) -> Option<usize> {
	if !rest.starts_with("<![") {
		return None;
	}
	rest.find("]>").map(|end| end + 2)
}

pub(crate) fn doctype(rest: &str) -> Option<usize> {
	DOCTYPE.find(rest).map(|m| m.end())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EndTagMatch<'a> {
	pub tag_name: &'a str,
	pub len: usize,
}

pub(crate) fn end_tag(rest: &str) -> Option<EndTagMatch<'_>> {
	let caps = END_TAG.captures(rest)?;
	Some(EndTagMatch {
		tag_name: caps.get(1)?.as_str(),
		len: caps.get(0)?.end(),
	})
}

/// One attribute of a start tag, value not yet decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AttrMatch<'a> {
	pub name: &'a str,
	pub value: &'a str,
	/// Range of `name="value"` without the leading whitespace
	pub range: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StartTagMatch<'a> {
	pub tag_name: &'a str,
	pub attrs: Vec<AttrMatch<'a>>,
	/// Written as `<tag />`
	pub unary_slash: bool,
	pub len: usize,
}

fn attr_from<'a>(caps: &Captures<'a>, base: usize) -> Option<AttrMatch<'a>> {
	let whole = caps.get(0)?.as_str();
	let leading = whole.len() - whole.trim_start().len();
	let value = caps
		.get(3)
		.or_else(|| caps.get(4))
		.or_else(|| caps.get(5))
		.map_or("", |m| m.as_str());
	Some(AttrMatch {
		name: caps.get(1)?.as_str(),
		value,
		range: base + leading..base + whole.len(),
	})
}

/// A complete start tag up to and including its `>`.
///
/// Returns `None` when the tag is not closed, leaving the input for the text
/// rule.
pub(crate) fn start_tag(rest: &str) -> Option<StartTagMatch<'_>> {
	let open = START_TAG_OPEN.captures(rest)?;
	let tag_name = open.get(1)?.as_str();
	let mut pos = open.get(0)?.end();
	let mut attrs = Vec::new();
	loop {
		let tail = &rest[pos..];
		if let Some(close) = START_TAG_CLOSE.captures(tail) {
			return Some(StartTagMatch {
				tag_name,
				attrs,
				unary_slash: close.get(1).is_some_and(|slash| !slash.as_str().is_empty()),
				len: pos + close.get(0)?.end(),
			});
		}
		let caps = DYNAMIC_ARG_ATTRIBUTE
			.captures(tail)
			.or_else(|| ATTRIBUTE.captures(tail))?;
		let attr = attr_from(&caps, pos)?;
		pos = attr.range.end;
		attrs.push(attr);
	}
}

fn starts_markup(tail: &str) -> bool {
	END_TAG.is_match(tail)
		|| START_TAG_OPEN.is_match(tail)
		|| tail.starts_with("<!--")
		|| tail.starts_with("<![")
}

/// Length of the text run at the start of `rest`.
///
/// A `<` that does not open real markup is treated as text, so the run
/// extends to the next tag-like construct. Zero means `rest` starts with
/// markup that no other rule accepted.
pub(crate) fn text_len(rest: &str) -> usize {
	let Some(mut text_end) = rest.find('<') else {
		return rest.len();
	};
	loop {
		let tail = &rest[text_end..];
		if starts_markup(tail) {
			break;
		}
		match tail[1..].find('<') {
			Some(next) => text_end += next + 1,
			None => break,
		}
	}
	text_end
}

/// Content of a raw-text element followed by its closing tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawTextMatch {
	pub text_len: usize,
	pub close_len: usize,
}

fn raw_text_end_pattern(tag: &str) -> Option<Regex> {
	let key = tag.to_lowercase();
	let mut cache = RAW_TEXT_END.lock();
	if let Some(re) = cache.get(&key) {
		return Some(re.clone());
	}
	let re = Regex::new(&format!(r"(?i)</{}[^>]*>", regex::escape(&key))).ok()?;
	cache.insert(key, re.clone());
	Some(re)
}

pub(crate) fn raw_text(tag: &str, rest: &str) -> Option<RawTextMatch> {
	let found = raw_text_end_pattern(tag)?.find(rest)?;
	Some(RawTextMatch {
		text_len: found.start(),
		close_len: found.len(),
	})
}

/// Text handed to the sink for raw-text content.
pub(crate) fn normalize_raw_text(tag: &str, text: &str) -> String {
	let lower = tag.to_lowercase();
	let mut text = text.to_owned();
	if !is_plain_text_element(&lower) && lower != "noscript" {
		text = COMMENT_WRAPPER.replace_all(&text, "$1").into_owned();
		text = CDATA_WRAPPER.replace_all(&text, "$1").into_owned();
	}
	if should_ignore_first_newline(&lower, &text) {
		text.remove(0);
	}
	text
}

/// A newline right after `<pre>` or `<textarea>` is not content.
pub(crate) fn should_ignore_first_newline(tag: &str, rest: &str) -> bool {
	matches!(tag, "pre" | "textarea") && rest.starts_with('\n')
}

/// Decodes the entities browsers decode inside attribute values.
pub(crate) fn decode_attr(value: &str, decode_newlines: bool) -> String {
	let pattern = if decode_newlines {
		&*ENCODED_ATTR_WITH_NEWLINES
	} else {
		&*ENCODED_ATTR
	};
	pattern
		.replace_all(value, |caps: &Captures<'_>| match &caps[0] {
			"&lt;" => "<",
			"&gt;" => ">",
			"&quot;" => "\"",
			"&amp;" => "&",
			"&#10;" => "\n",
			"&#9;" => "\t",
			_ => "'",
		})
		.into_owned()
}
