#![forbid(unsafe_code)]

//! Engine configuration.
//!
//! [`ValidationConfig`] holds the user-facing strings the engine produces on
//! its own: the text shown when a rule fails unexpectedly, the placeholder
//! shown while an asynchronous check is running, and the separator used to
//! render combined messages on one line.
//!
//! With the `config-file` feature the configuration can be loaded from TOML
//! or JSON. Missing keys fall back to the defaults.

use crate::error::{Result, ValidationError};
use crate::formatter::SingleLineFormatter;

/// Default text for a rule whose evaluation failed.
pub const DEFAULT_FAILURE_TEXT: &str = "Validation failed.";

/// Default placeholder text while an asynchronous check is in flight.
pub const DEFAULT_PENDING_TEXT: &str = "Please wait...";

/// Default separator for single-line rendering.
pub const DEFAULT_LINE_SEPARATOR: &str = "\n";

/// Configuration for validation contexts and the rules they build.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "config-file",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct ValidationConfig {
    /// Text reported by a rule whose predicate panicked or whose state
    /// source produced an error. Must not be blank.
    /// Default: `"Validation failed."`.
    pub failure_text: String,

    /// Placeholder text for [`Pending`](crate::source::Pending) sources.
    /// Default: `"Please wait..."`.
    pub pending_text: String,

    /// Separator used by [`formatter`](Self::formatter).
    /// Default: newline.
    pub line_separator: String,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            failure_text: DEFAULT_FAILURE_TEXT.to_string(),
            pending_text: DEFAULT_PENDING_TEXT.to_string(),
            line_separator: DEFAULT_LINE_SEPARATOR.to_string(),
        }
    }
}

impl ValidationConfig {
    /// Set the failure text.
    #[must_use]
    pub fn with_failure_text(mut self, text: impl Into<String>) -> Self {
        self.failure_text = text.into();
        self
    }

    /// Set the pending placeholder text.
    #[must_use]
    pub fn with_pending_text(mut self, text: impl Into<String>) -> Self {
        self.pending_text = text.into();
        self
    }

    /// Set the single-line separator.
    #[must_use]
    pub fn with_line_separator(mut self, separator: impl Into<String>) -> Self {
        self.line_separator = separator.into();
        self
    }

    /// Check the configuration for values the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.failure_text.trim().is_empty() {
            return Err(ValidationError::invalid_argument(
                "failure_text",
                "failure text must not be blank",
            ));
        }
        if self.line_separator.is_empty() {
            return Err(ValidationError::invalid_argument(
                "line_separator",
                "separator must not be empty",
            ));
        }
        Ok(())
    }

    /// Formatter joining messages with [`line_separator`](Self::line_separator).
    #[must_use]
    pub fn formatter(&self) -> SingleLineFormatter {
        SingleLineFormatter::new(self.line_separator.clone())
    }

    /// Parse a TOML document.
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| ValidationError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON document.
    #[cfg(feature = "config-file")]
    pub fn from_json_str(source: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(source).map_err(|e| ValidationError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
