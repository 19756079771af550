#![forbid(unsafe_code)]

//! Ordered, immutable collections of validation messages.
//!
//! # Invariants
//!
//! 1. **Two singletons**: [`ValidationText::NONE`] has zero messages and
//!    [`ValidationText::EMPTY`] has exactly one zero-length message. They are
//!    distinct values; "nothing to say" is not the same as "one blank line".
//!
//! 2. **Normalization**: every factory drops absent entries, then collapses
//!    a zero-length result to `NONE` and a lone `""` to `EMPTY`.
//!
//! 3. **Order is significant**: messages keep insertion order, which is the
//!    order rules were declared. Duplicates are preserved.
//!
//! 4. **Thread safety**: `ValidationText` is `Send + Sync` and clones in
//!    O(1) (shared `Arc<[String]>` storage).

use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

static EMPTY_MESSAGES: [String; 1] = [String::new()];

#[derive(Clone)]
enum Repr {
    None,
    Empty,
    Messages(Arc<[String]>),
}

/// An ordered list of human-readable validation messages.
#[derive(Clone)]
pub struct ValidationText {
    repr: Repr,
}

impl ValidationText {
    /// No messages at all.
    pub const NONE: Self = Self { repr: Repr::None };

    /// Exactly one zero-length message.
    pub const EMPTY: Self = Self { repr: Repr::Empty };

    /// Build from at most one message. `None` yields [`NONE`](Self::NONE).
    #[must_use]
    pub fn create(message: Option<&str>) -> Self {
        Self::from_messages(message.map(str::to_owned))
    }

    /// Build from a single message.
    #[must_use]
    pub fn single(message: impl Into<String>) -> Self {
        Self::from_messages([message.into()])
    }

    /// Build from a sequence of messages, dropping absent entries.
    ///
    /// Accepts both `String` and `Option<String>` items.
    pub fn from_messages<I>(messages: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Option<String>>,
    {
        let messages: Vec<String> = messages.into_iter().filter_map(Into::into).collect();
        Self::normalize(messages)
    }

    /// Concatenate several texts into one, preserving order.
    pub fn merge<I, B>(texts: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Borrow<ValidationText>,
    {
        let mut messages = Vec::new();
        for text in texts {
            messages.extend(text.borrow().iter().map(str::to_owned));
        }
        Self::normalize(messages)
    }

    fn normalize(messages: Vec<String>) -> Self {
        match messages.as_slice() {
            [] => Self::NONE,
            [only] if only.is_empty() => Self::EMPTY,
            _ => Self {
                repr: Repr::Messages(messages.into()),
            },
        }
    }

    /// Join all messages with `separator`.
    #[must_use]
    pub fn to_single_line(&self, separator: &str) -> String {
        self.as_slice().join(separator)
    }

    /// Messages as a slice, in order.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        match &self.repr {
            Repr::None => &[],
            Repr::Empty => &EMPTY_MESSAGES,
            Repr::Messages(messages) => &messages[..],
        }
    }

    /// Iterate messages in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.as_slice().iter().map(String::as_str)
    }

    /// Message at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.as_slice().get(index).map(String::as_str)
    }

    /// Number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// Whether there are no messages. Only true for [`NONE`](Self::NONE).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    /// Whether any message contains `needle`.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.iter().any(|message| message.contains(needle))
    }
}

impl Default for ValidationText {
    fn default() -> Self {
        Self::NONE
    }
}

impl PartialEq for ValidationText {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for ValidationText {}

impl Hash for ValidationText {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_slice().hash(state);
    }
}

impl fmt::Debug for ValidationText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.repr {
            Repr::None => f.write_str("ValidationText::NONE"),
            Repr::Empty => f.write_str("ValidationText::EMPTY"),
            Repr::Messages(_) => f.debug_list().entries(self.iter()).finish(),
        }
    }
}

impl fmt::Display for ValidationText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_single_line("\n"))
    }
}

impl From<&str> for ValidationText {
    fn from(message: &str) -> Self {
        Self::single(message)
    }
}

impl From<String> for ValidationText {
    fn from(message: String) -> Self {
        Self::single(message)
    }
}

impl FromIterator<String> for ValidationText {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self::from_messages(iter)
    }
}
