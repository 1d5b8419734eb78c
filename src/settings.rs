//! Settings loading
//!
//! One document configures both halves of the runtime:
//!
//! ```toml
//! [reactive]
//! mode = "production"
//! async_flush = true
//! max_update_count = 100
//!
//! [compiler]
//! whitespace = "condense"
//! delimiters = ["${", "}"]
//! output_source_range = false
//! ```
//!
//! Every key is optional. The compiler table is only read with the
//! `compiler` feature.

use std::path::Path;

use reinhardt_reactive::{Mode, Runtime, RuntimeConfig};
use serde::{Deserialize, Serialize};

#[cfg(feature = "compiler")]
use reinhardt_compiler::{CompilerConfig, CompilerOptions};

/// Error type for settings loading
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("TOML error: {0}")]
	Toml(#[from] toml::de::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("Unsupported settings format: {0}")]
	UnsupportedFormat(String),
}

/// Runtime and compiler settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
	pub reactive: RuntimeConfig,
	#[cfg(feature = "compiler")]
	pub compiler: CompilerConfig,
}

impl Settings {
	/// Parses a TOML document.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_ui::Settings;
	///
	/// let settings = Settings::from_toml_str("[reactive]\nasync_flush = false\n").unwrap();
	/// assert!(!settings.reactive.async_flush);
	/// ```
	pub fn from_toml_str(source: &str) -> Result<Self, SettingsError> {
		Ok(toml::from_str(source)?)
	}

	/// Loads a `.toml` or `.json` file.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
		let path = path.as_ref();
		let contents = std::fs::read_to_string(path)?;
		let settings = match path.extension().and_then(|ext| ext.to_str()) {
			Some("toml") => toml::from_str(&contents)?,
			Some("json") => serde_json::from_str(&contents)?,
			_ => {
				return Err(SettingsError::UnsupportedFormat(
					"Supported formats: .toml, .json".to_string(),
				));
			}
		};
		tracing::debug!(path = %path.display(), "loaded settings");
		Ok(settings)
	}

	/// Mode of the reactive runtime.
	pub fn mode(&self) -> Mode {
		self.reactive.mode
	}

	/// A fresh runtime configured from these settings.
	pub fn runtime(&self) -> Runtime {
		Runtime::with_config(self.reactive)
	}

	/// Web-platform compiler options configured from these settings.
	#[cfg(feature = "compiler")]
	pub fn compiler_options(&self) -> CompilerOptions {
		CompilerOptions::web().with_config(self.compiler.clone())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[test]
	fn test_empty_document_uses_defaults() {
		let settings = Settings::from_toml_str("").unwrap();
		assert_eq!(settings, Settings::default());
		assert_eq!(settings.mode(), Mode::Development);
		assert_eq!(settings.reactive.max_update_count, 100);
	}

	#[test]
	fn test_reactive_table() {
		let settings = Settings::from_toml_str(
			"[reactive]\nmode = \"production\"\nasync_flush = false\nmax_update_count = 5\n",
		)
		.unwrap();
		assert_eq!(settings.mode(), Mode::Production);
		let rt = settings.runtime();
		assert!(!rt.config().async_flush);
		assert_eq!(rt.config().max_update_count, 5);
	}

	#[cfg(feature = "compiler")]
	#[test]
	fn test_compiler_table() {
		use reinhardt_compiler::WhitespaceMode;

		let settings = Settings::from_toml_str(
			"[compiler]\nwhitespace = \"condense\"\ndelimiters = [\"${\", \"}\"]\n",
		)
		.unwrap();
		assert_eq!(settings.compiler.whitespace, WhitespaceMode::Condense);
		let options = settings.compiler_options();
		assert_eq!(
			options.delimiters(),
			Some(&("${".to_owned(), "}".to_owned()))
		);
	}

	#[rstest]
	#[case("[reactive]\nmode = \"staging\"\n")]
	#[case("[reactive]\nmax_update_count = \"many\"\n")]
	fn test_invalid_values_are_rejected(#[case] source: &str) {
		assert!(matches!(Settings::from_toml_str(source), Err(SettingsError::Toml(_))));
	}

	#[test]
	fn test_from_file_by_extension() {
		let dir = tempfile::tempdir().unwrap();
		let toml_path = dir.path().join("ui.toml");
		std::fs::write(&toml_path, "[reactive]\nasync_flush = false\n").unwrap();
		assert!(!Settings::from_file(&toml_path).unwrap().reactive.async_flush);

		let json_path = dir.path().join("ui.json");
		std::fs::write(&json_path, r#"{"reactive": {"mode": "production"}}"#).unwrap();
		assert_eq!(Settings::from_file(&json_path).unwrap().mode(), Mode::Production);

		let yaml_path = dir.path().join("ui.yaml");
		std::fs::write(&yaml_path, "reactive: {}").unwrap();
		assert!(matches!(
			Settings::from_file(&yaml_path),
			Err(SettingsError::UnsupportedFormat(_))
		));
	}
}
