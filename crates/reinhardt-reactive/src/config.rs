//! Runtime configuration
//!
//! [`RuntimeConfig`] controls the development/production split and the
//! flushing strategy of a [`Runtime`](crate::Runtime). It is deserializable so
//! it can be loaded from the `[reactive]` table of a settings file.

use serde::{Deserialize, Serialize};

/// Default threshold after which a watcher re-queued within one flush chain
/// is reported as an infinite update loop.
pub const MAX_UPDATE_COUNT: usize = 100;

/// Build mode.
///
/// Development mode enables diagnostics (warnings, tips, loop detection).
/// Production mode suppresses all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
	#[default]
	Development,
	Production,
}

impl Mode {
	/// Returns `true` in development mode.
	pub fn is_development(&self) -> bool {
		matches!(self, Mode::Development)
	}
}

/// Configuration of a reactive runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
	/// Development or production behaviour
	pub mode: Mode,
	/// When `false`, the scheduler flushes synchronously on enqueue and
	/// dependency notification runs subscribers in creation order.
	pub async_flush: bool,
	/// Re-queue threshold for the infinite loop guard
	pub max_update_count: usize,
}

impl Default for RuntimeConfig {
	fn default() -> Self {
		Self {
			mode: Mode::Development,
			async_flush: true,
			max_update_count: MAX_UPDATE_COUNT,
		}
	}
}

impl RuntimeConfig {
	/// Production configuration with asynchronous flushing.
	pub fn production() -> Self {
		Self {
			mode: Mode::Production,
			..Self::default()
		}
	}

	/// Builder-style setter for [`RuntimeConfig::async_flush`].
	pub fn with_async_flush(mut self, async_flush: bool) -> Self {
		self.async_flush = async_flush;
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_config() {
		let config = RuntimeConfig::default();
		assert_eq!(config.mode, Mode::Development);
		assert!(config.async_flush);
		assert_eq!(config.max_update_count, 100);
	}

	#[test]
	fn test_partial_deserialization_keeps_defaults() {
		let config: RuntimeConfig = serde_json::from_str(r#"{"mode":"production"}"#).unwrap();
		assert_eq!(config.mode, Mode::Production);
		assert!(config.async_flush);
		assert_eq!(config.max_update_count, MAX_UPDATE_COUNT);
	}
}
