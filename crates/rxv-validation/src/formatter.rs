#![forbid(unsafe_code)]

//! Adapters from [`ValidationText`] to a UI-specific representation.

use crate::text::ValidationText;

/// Turns validation text into whatever a sink displays.
///
/// Implementations must be pure. Any `Fn(&ValidationText) -> T` closure is a
/// formatter.
pub trait ValidationTextFormatter<T> {
    /// Render `text`.
    fn format(&self, text: &ValidationText) -> T;
}

impl<T, F> ValidationTextFormatter<T> for F
where
    F: Fn(&ValidationText) -> T,
{
    fn format(&self, text: &ValidationText) -> T {
        self(text)
    }
}

/// Joins all messages into one string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleLineFormatter {
    separator: String,
}

impl SingleLineFormatter {
    /// Formatter using `separator` between messages.
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
        }
    }

    /// Separator placed between messages.
    #[must_use]
    pub fn separator(&self) -> &str {
        &self.separator
    }
}

impl Default for SingleLineFormatter {
    fn default() -> Self {
        Self::new("\n")
    }
}

impl ValidationTextFormatter<String> for SingleLineFormatter {
    fn format(&self, text: &ValidationText) -> String {
        text.to_single_line(&self.separator)
    }
}
