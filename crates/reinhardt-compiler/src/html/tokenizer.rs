//! Tokenizer state machine.

use std::ops::Range;

use reinhardt_compiler_ast::Attr;

use super::rules;
use crate::diagnostics::Span;
use crate::platform::{Platform, WebPlatform, is_plain_text_element};

/// Receiver of tokenizer events.
///
/// Spans are byte ranges into the scanned input. End events produced by
/// force-closing an element carry the span of the tag that caused it.
pub trait TokenSink {
	fn start(&mut self, tag: &str, attrs: Vec<Attr>, unary: bool, span: Range<usize>);

	fn end(&mut self, tag: &str, span: Range<usize>);

	fn chars(&mut self, text: &str, span: Range<usize>);

	fn comment(&mut self, _text: &str, _span: Range<usize>) {}

	fn warn(&mut self, _msg: String, _span: Span) {}
}

/// Tokenizer switches.
#[derive(Clone, Copy)]
pub struct HtmlOptions<'a> {
	/// Apply the browser's implicit `<p>` and left-open tag closing
	pub expect_html: bool,
	pub platform: &'a dyn Platform,
	/// Decode `&#10;` and `&#9;` in attribute values
	pub should_decode_newlines: bool,
	/// Same as `should_decode_newlines`, for `<a href>`
	pub should_decode_newlines_for_href: bool,
	/// Emit comment events
	pub should_keep_comment: bool,
}

impl Default for HtmlOptions<'_> {
	fn default() -> Self {
		Self {
			expect_html: true,
			platform: &WebPlatform,
			should_decode_newlines: false,
			should_decode_newlines_for_href: false,
			should_keep_comment: false,
		}
	}
}

#[derive(Debug, Clone)]
struct OpenTag {
	tag: String,
	lower: String,
	start: usize,
	end: usize,
}

/// Incremental scanner over one template.
///
/// Holds the unconsumed input (as an offset into the source), the stack of
/// open elements and the innermost open tag name. Every step either consumes
/// input or ends the scan.
pub struct Tokenizer<'s, 'o> {
	source: &'s str,
	offset: usize,
	stack: Vec<OpenTag>,
	last_tag: Option<String>,
	options: HtmlOptions<'o>,
}

impl<'s, 'o> Tokenizer<'s, 'o> {
	pub fn new(source: &'s str, options: HtmlOptions<'o>) -> Self {
		Self {
			source,
			offset: 0,
			stack: Vec::new(),
			last_tag: None,
			options,
		}
	}

	/// Absolute offset of the unconsumed input.
	pub fn offset(&self) -> usize {
		self.offset
	}

	fn rest(&self) -> &'s str {
		&self.source[self.offset..]
	}

	fn advance(&mut self, len: usize) {
		self.offset += len;
	}

	/// Scans the whole input, then closes whatever is still open.
	pub fn scan<S: TokenSink + ?Sized>(mut self, sink: &mut S) {
		while self.offset < self.source.len() {
			if !self.step(sink) {
				break;
			}
		}
		let at = self.offset;
		self.parse_end_tag(None, at..at, sink);
	}

	/// Applies one production rule. Returns `false` when nothing could be
	/// consumed, after reporting the remainder as text.
	fn step<S: TokenSink + ?Sized>(&mut self, sink: &mut S) -> bool {
		let before = self.offset;
		let raw = self.last_tag.as_deref().is_some_and(is_plain_text_element);
		if raw {
			self.scan_raw_text(sink);
		} else {
			self.scan_markup(sink);
		}
		if self.offset > before {
			return true;
		}
		let rest = self.rest();
		sink.chars(rest, before..self.source.len());
		if self.stack.is_empty() {
			sink.warn(
				format!("Mal-formatted tag at end of template: \"{rest}\""),
				Span::at(Some(self.source.len())),
			);
		}
		false
	}

	fn scan_markup<S: TokenSink + ?Sized>(&mut self, sink: &mut S) {
		let rest = self.rest();
		let start = self.offset;
		if rest.starts_with('<') {
			if let Some(comment) = rules::comment(rest) {
				if self.options.should_keep_comment {
					sink.comment(&rest[comment.text.clone()], start..start + comment.len);
				}
				self.advance(comment.len);
				return;
			}
			if let Some(len) = rules::conditional_comment(rest) {
				self.advance(len);
				return;
			}
			if let Some(len) = rules::doctype(rest) {
				self.advance(len);
				return;
			}
			if let Some(end) = rules::end_tag(rest) {
				self.advance(end.len);
				self.parse_end_tag(Some(end.tag_name), start..self.offset, sink);
				return;
			}
			if let Some(tag) = rules::start_tag(rest) {
				self.advance(tag.len);
				let tag_name = tag.tag_name;
				self.handle_start_tag(tag, start, sink);
				if rules::should_ignore_first_newline(tag_name, self.rest()) {
					self.advance(1);
				}
				return;
			}
		}
		let len = rules::text_len(rest);
		if len > 0 {
			self.advance(len);
			sink.chars(&rest[..len], start..self.offset);
		}
	}

	fn scan_raw_text<S: TokenSink + ?Sized>(&mut self, sink: &mut S) {
		let Some(tag) = self.last_tag.clone() else {
			return;
		};
		let rest = self.rest();
		let start = self.offset;
		match rules::raw_text(&tag, rest) {
			Some(found) => {
				let raw = &rest[..found.text_len];
				if !raw.is_empty() {
					let text = rules::normalize_raw_text(&tag, raw);
					sink.chars(&text, start..start + found.text_len);
				}
				self.advance(found.text_len + found.close_len);
				self.parse_end_tag(Some(&tag), start + found.text_len..self.offset, sink);
			}
			// Unterminated: close the element here and let `step` report
			// the remainder as text.
			None => self.parse_end_tag(Some(&tag), start..start, sink),
		}
	}

	fn handle_start_tag<S: TokenSink + ?Sized>(
		&mut self,
		tag: rules::StartTagMatch<'s>,
		start: usize,
		sink: &mut S,
	) {
		let tag_name = tag.tag_name;
		let platform = self.options.platform;
		if self.options.expect_html {
			let at = self.offset;
			if self.last_tag.as_deref() == Some("p") && platform.is_non_phrasing_tag(tag_name) {
				self.parse_end_tag(Some("p"), at..at, sink);
			}
			if platform.can_be_left_open_tag(tag_name) && self.last_tag.as_deref() == Some(tag_name) {
				self.parse_end_tag(Some(tag_name), at..at, sink);
			}
		}

		let unary = platform.is_unary_tag(tag_name) || tag.unary_slash;
		let attrs = tag
			.attrs
			.iter()
			.map(|attr| {
				let decode_newlines = if tag_name == "a" && attr.name == "href" {
					self.options.should_decode_newlines_for_href
				} else {
					self.options.should_decode_newlines
				};
				Attr::new(attr.name, rules::decode_attr(attr.value, decode_newlines))
					.with_range(Some(start + attr.range.start), Some(start + attr.range.end))
			})
			.collect();

		if !unary {
			self.stack.push(OpenTag {
				tag: tag_name.to_owned(),
				lower: tag_name.to_lowercase(),
				start,
				end: self.offset,
			});
			self.last_tag = Some(tag_name.to_owned());
		}
		sink.start(tag_name, attrs, unary, start..self.offset);
	}

	/// Closes `tag_name` and everything opened after it. With no name,
	/// closes every open element.
	fn parse_end_tag<S: TokenSink + ?Sized>(
		&mut self,
		tag_name: Option<&str>,
		span: Range<usize>,
		sink: &mut S,
	) {
		let lower = tag_name.map(str::to_lowercase);
		let pos = match lower.as_deref() {
			Some(lower) => self.stack.iter().rposition(|open| open.lower == lower),
			None => Some(0),
		};

		match pos {
			Some(pos) => {
				for index in (pos..self.stack.len()).rev() {
					let open = &self.stack[index];
					if index > pos || tag_name.is_none() {
						sink.warn(
							format!("tag <{}> has no matching end tag.", open.tag),
							Span::new(open.start, open.end),
						);
					}
					sink.end(&open.tag, span.clone());
				}
				self.stack.truncate(pos);
				self.last_tag = self.stack.last().map(|open| open.tag.clone());
			}
			None => {
				let Some(tag_name) = tag_name else {
					return;
				};
				match lower.as_deref() {
					// `</br>` behaves like `<br>`
					Some("br") => sink.start(tag_name, Vec::new(), true, span),
					// `</p>` without an open `<p>` behaves like `<p></p>`
					Some("p") => {
						sink.start(tag_name, Vec::new(), false, span.clone());
						sink.end(tag_name, span);
					}
					_ => {}
				}
			}
		}
	}
}

/// A tokenizer event, as recorded by [`TokenCollector`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
	Start { tag: String, attrs: Vec<Attr>, unary: bool },
	End { tag: String },
	Chars(String),
	Comment(String),
}

/// Sink that records every event with its span.
#[derive(Debug, Clone, Default)]
pub struct TokenCollector {
	pub tokens: Vec<(Token, Range<usize>)>,
	pub warnings: Vec<String>,
}

impl TokenSink for TokenCollector {
	fn start(&mut self, tag: &str, attrs: Vec<Attr>, unary: bool, span: Range<usize>) {
		self.tokens.push((
			Token::Start {
				tag: tag.to_owned(),
				attrs,
				unary,
			},
			span,
		));
	}

	fn end(&mut self, tag: &str, span: Range<usize>) {
		self.tokens.push((Token::End { tag: tag.to_owned() }, span));
	}

	fn chars(&mut self, text: &str, span: Range<usize>) {
		self.tokens.push((Token::Chars(text.to_owned()), span));
	}

	fn comment(&mut self, text: &str, span: Range<usize>) {
		self.tokens.push((Token::Comment(text.to_owned()), span));
	}

	fn warn(&mut self, msg: String, _span: Span) {
		self.warnings.push(msg);
	}
}

/// Tokenizes `source` into a [`TokenCollector`].
pub fn tokenize(source: &str, options: HtmlOptions<'_>) -> TokenCollector {
	let mut collector = TokenCollector::default();
	Tokenizer::new(source, options).scan(&mut collector);
	collector
}
