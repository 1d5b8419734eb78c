//! Function-generation errors.
//!
//! Template problems are [`Diagnostic`](crate::Diagnostic)s. The errors here
//! describe a failure to turn generated render source into something
//! invocable, which points at the code generator rather than the template.

use thiserror::Error;

/// Result type for function generation.
pub type FunctionResult<T> = Result<T, FunctionGenerationError>;

/// Failure converting generated source into an invocable unit.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum FunctionGenerationError {
	/// The factory rejected the source.
	#[error("{message} in\n\n{code}\n")]
	Rejected {
		/// Factory error message
		message: String,
		/// The generated source that failed
		code: String,
	},
}

impl FunctionGenerationError {
	pub fn rejected(message: impl Into<String>, code: impl Into<String>) -> Self {
		Self::Rejected {
			message: message.into(),
			code: code.into(),
		}
	}

	/// The generated source that failed.
	pub fn code(&self) -> &str {
		match self {
			Self::Rejected { code, .. } => code,
		}
	}
}
