#![forbid(unsafe_code)]

//! Point-in-time validation snapshots and their equality rules.
//!
//! A [`ValidationState`] is produced every time a rule re-evaluates. Two
//! states compare equal when they say the same thing to the user: same
//! validity flag and the same messages in the same order. The producing
//! component is carried along for diagnostics but ignored by equality, so
//! an aggregate that is rebuilt with identical content never re-fires.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::text::ValidationText;

static NEXT_COMPONENT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a validation component or context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(u64);

impl ComponentId {
    /// Allocate a fresh, process-unique id.
    pub(crate) fn next() -> Self {
        Self(NEXT_COMPONENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Validity plus message text, as reported by one component.
#[derive(Clone)]
pub struct ValidationState {
    is_valid: bool,
    text: ValidationText,
    owner: ComponentId,
}

impl ValidationState {
    /// Create a state owned by `owner`.
    pub fn new(is_valid: bool, text: impl Into<ValidationText>, owner: ComponentId) -> Self {
        Self {
            is_valid,
            text: text.into(),
            owner,
        }
    }

    /// A valid state with no messages.
    #[must_use]
    pub fn valid(owner: ComponentId) -> Self {
        Self::new(true, ValidationText::NONE, owner)
    }

    /// An invalid state carrying `text`.
    pub fn invalid(text: impl Into<ValidationText>, owner: ComponentId) -> Self {
        Self::new(false, text, owner)
    }

    /// Whether the component considered its input valid.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    /// Messages to show. [`ValidationText::NONE`] when there is nothing to say.
    #[must_use]
    pub fn text(&self) -> &ValidationText {
        &self.text
    }

    /// Component (or context) that produced this state.
    #[must_use]
    pub fn owner(&self) -> ComponentId {
        self.owner
    }
}

impl PartialEq for ValidationState {
    fn eq(&self, other: &Self) -> bool {
        ValidationStateComparer.equals(self, other)
    }
}

impl Eq for ValidationState {}

impl Hash for ValidationState {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.is_valid.hash(state);
        self.text.hash(state);
    }
}

impl fmt::Debug for ValidationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationState")
            .field("is_valid", &self.is_valid)
            .field("text", &self.text)
            .field("owner", &self.owner)
            .finish()
    }
}

/// Explicit comparer for [`ValidationState`].
///
/// `PartialEq` and `Hash` on the state delegate to the same rules; the
/// comparer exists for call sites that want to name the policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationStateComparer;

impl ValidationStateComparer {
    /// Same validity flag and ordinal-equal message sequences.
    #[must_use]
    pub fn equals(&self, a: &ValidationState, b: &ValidationState) -> bool {
        a.is_valid == b.is_valid && a.text == b.text
    }

    /// Hash consistent with [`equals`](Self::equals).
    #[must_use]
    pub fn hash_of(&self, state: &ValidationState) -> u64 {
        let mut hasher = DefaultHasher::new();
        state.hash(&mut hasher);
        hasher.finish()
    }
}
