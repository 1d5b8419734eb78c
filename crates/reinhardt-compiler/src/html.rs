//! HTML tokenizer
//!
//! A forgiving, regex-driven scanner that walks a template once and reports
//! start tags, end tags, text and comments to a [`TokenSink`].
//!
//! ## Architecture
//!
//! - `rules`: one pure function per production (comment, conditional
//!   comment, doctype, end tag, start tag, text, raw text). Each reports the
//!   span it would consume.
//! - [`Tokenizer`]: the state machine. It owns the absolute offset, the
//!   stack of open elements and the innermost open tag, and applies the
//!   rules in order.
//!
//! Malformed markup never aborts the scan: unmatched elements are closed
//! with a warning, stray `</br>` and `</p>` follow browser behaviour, and an
//! input that no rule can consume is reported as text before stopping.
//!
//! ## Example
//!
//! ```ignore
//! use reinhardt_compiler::html::{HtmlOptions, Token, tokenize};
//!
//! let collected = tokenize("<p>hi</p>", HtmlOptions::default());
//! assert!(matches!(collected.tokens[1].0, Token::Chars(ref text) if text == "hi"));
//! ```

mod rules;
mod tokenizer;

pub use tokenizer::{HtmlOptions, Token, TokenCollector, TokenSink, Tokenizer, tokenize};
