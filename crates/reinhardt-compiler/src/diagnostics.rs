//! Compile-time diagnostics
//!
//! Template problems are collected, never thrown: compilation always
//! completes and hands the lists back next to whatever render code it could
//! produce. Errors and tips are kept apart, and nothing is collected in
//! production mode.

use reinhardt_reactive::Mode;
use serde::Serialize;

/// One template diagnostic. Offsets are byte offsets into the template as
/// passed to `compile`, present only when source ranges are requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
	pub msg: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub start: Option<usize>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub end: Option<usize>,
}

impl Diagnostic {
	pub fn new(msg: impl Into<String>) -> Self {
		Self {
			msg: msg.into(),
			start: None,
			end: None,
		}
	}
}

impl std::fmt::Display for Diagnostic {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.msg)
	}
}

/// Source range attached to a diagnostic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Span {
	pub start: Option<usize>,
	pub end: Option<usize>,
}

impl Span {
	pub const NONE: Span = Span {
		start: None,
		end: None,
	};

	pub fn new(start: usize, end: usize) -> Self {
		Self {
			start: Some(start),
			end: Some(end),
		}
	}

	pub fn at(start: Option<usize>) -> Self {
		Self { start, end: None }
	}
}

/// Collector shared by every compiler stage.
#[derive(Debug, Clone)]
pub struct Diagnostics {
	mode: Mode,
	with_ranges: bool,
	/// Length of the whitespace trimmed off the template before parsing
	offset: usize,
	errors: Vec<Diagnostic>,
	tips: Vec<Diagnostic>,
}

impl Diagnostics {
	pub fn new(mode: Mode, with_ranges: bool) -> Self {
		Self {
			mode,
			with_ranges,
			offset: 0,
			errors: Vec::new(),
			tips: Vec::new(),
		}
	}

	pub(crate) fn with_offset(mut self, offset: usize) -> Self {
		self.offset = offset;
		self
	}

	pub fn mode(&self) -> Mode {
		self.mode
	}

	pub fn warn(&mut self, msg: impl Into<String>, span: Span) {
		if let Some(diagnostic) = self.build(msg, span) {
			self.errors.push(diagnostic);
		}
	}

	pub fn tip(&mut self, msg: impl Into<String>, span: Span) {
		if let Some(diagnostic) = self.build(msg, span) {
			self.tips.push(diagnostic);
		}
	}

	fn build(&self, msg: impl Into<String>, span: Span) -> Option<Diagnostic> {
		if !self.mode.is_development() {
			return None;
		}
		let mut diagnostic = Diagnostic::new(msg);
		if self.with_ranges {
			diagnostic.start = span.start.map(|start| start + self.offset);
			diagnostic.end = span.end.map(|end| end + self.offset);
		}
		Some(diagnostic)
	}

	pub fn errors(&self) -> &[Diagnostic] {
		&self.errors
	}

	pub fn tips(&self) -> &[Diagnostic] {
		&self.tips
	}

	pub fn has_errors(&self) -> bool {
		!self.errors.is_empty()
	}

	pub fn into_parts(self) -> (Vec<Diagnostic>, Vec<Diagnostic>) {
		(self.errors, self.tips)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_ranges_are_shifted_by_trimmed_prefix() {
		let mut diagnostics = Diagnostics::new(Mode::Development, true).with_offset(3);
		diagnostics.warn("broken", Span::new(1, 4));
		diagnostics.tip("hint", Span::at(Some(0)));

		assert_eq!(diagnostics.errors()[0].start, Some(4));
		assert_eq!(diagnostics.errors()[0].end, Some(7));
		assert_eq!(diagnostics.tips()[0].start, Some(3));
		assert_eq!(diagnostics.tips()[0].end, None);
	}

	#[test]
	fn test_ranges_dropped_unless_requested() {
		let mut diagnostics = Diagnostics::new(Mode::Development, false);
		diagnostics.warn("broken", Span::new(1, 4));
		assert_eq!(diagnostics.errors()[0], Diagnostic::new("broken"));
	}

	#[test]
	fn test_production_collects_nothing() {
		let mut diagnostics = Diagnostics::new(Mode::Production, true);
		diagnostics.warn("broken", Span::NONE);
		diagnostics.tip("hint", Span::NONE);
		assert!(!diagnostics.has_errors());
		assert!(diagnostics.tips().is_empty());
	}
}
