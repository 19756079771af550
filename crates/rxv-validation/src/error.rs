#![forbid(unsafe_code)]

//! Error type for validation setup.
//!
//! Errors are raised synchronously while rules, contexts and configuration
//! are being built. Nothing in the steady-state data flow returns an error:
//! a failing rule is reported as validation text instead.

use std::fmt;

/// Errors from constructing rules, registering them, or loading config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required argument was missing or malformed.
    InvalidArgument {
        /// Name of the offending argument.
        argument: &'static str,
        /// What was wrong with it.
        reason: String,
    },
    /// Registration would give an exclusively claimed property a second rule.
    MultipleRulesNotSupported {
        /// Every property name in conflict, in first-seen order.
        properties: Vec<String>,
    },
    /// The context has been disposed and accepts no more rules.
    Disposed,
    /// A configuration document could not be parsed.
    Config(String),
}

impl ValidationError {
    pub(crate) fn invalid_argument(argument: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            argument,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument { argument, reason } => {
                write!(f, "invalid argument '{argument}': {reason}")
            }
            Self::MultipleRulesNotSupported { properties } => {
                write!(
                    f,
                    "multiple validation rules not supported for property {}",
                    properties.join(", ")
                )
            }
            Self::Disposed => write!(f, "validation context has been disposed"),
            Self::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, ValidationError>;

/// Validates a caller-supplied property name.
pub(crate) fn check_property_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ValidationError::invalid_argument(
            "property",
            "property name must not be empty",
        ));
    }
    Ok(())
}
