//! Development diagnostics
//!
//! Thin wrappers over `tracing` that only emit in development mode. The mode
//! is a runtime value (see [`Mode`](crate::Mode)) rather than a compile-time
//! `debug_assertions` gate, so production behaviour can be selected per
//! runtime or per compiler invocation.
//!
//! ## Macro Overview
//!
//! | Macro | Development | Production | Level |
//! |-------|-------------|------------|-------|
//! | `dev_warn!` | emitted | suppressed | `WARN` |
//! | `dev_tip!` | emitted | suppressed | `INFO` |
//! | `dev_error!` | emitted | suppressed | `ERROR` |
//!
//! ## Example
//!
//! ```ignore
//! use reinhardt_reactive::{dev_warn, Mode};
//!
//! dev_warn!(Mode::Development, "Failed watching path: \"{}\"", path);
//! ```

/// Logs a development warning.
///
/// # Arguments
///
/// * `$mode` - anything dereferencing to [`Mode`](crate::Mode)
/// * remaining arguments follow `format!`
#[macro_export]
macro_rules! dev_warn {
	($mode:expr, $($arg:tt)*) => {{
		if $crate::Mode::is_development(&$mode) {
			$crate::__tracing::warn!(target: "reinhardt", "[reinhardt warn]: {}", format!($($arg)*));
		}
	}};
}

/// Logs a development tip.
#[macro_export]
macro_rules! dev_tip {
	($mode:expr, $($arg:tt)*) => {{
		if $crate::Mode::is_development(&$mode) {
			$crate::__tracing::info!(target: "reinhardt", "[reinhardt tip]: {}", format!($($arg)*));
		}
	}};
}

/// Logs a development error.
#[macro_export]
macro_rules! dev_error {
	($mode:expr, $($arg:tt)*) => {{
		if $crate::Mode::is_development(&$mode) {
			$crate::__tracing::error!(target: "reinhardt", "[reinhardt error]: {}", format!($($arg)*));
		}
	}};
}

#[cfg(test)]
mod tests {
	use crate::Mode;

	#[test]
	fn test_macros_compile_in_both_modes() {
		let path = "a-b";
		dev_warn!(Mode::Development, "Failed watching path: \"{}\"", path);
		dev_tip!(Mode::Production, "never shown");
		dev_error!(Mode::Production, "never shown {}", 1);
	}
}
