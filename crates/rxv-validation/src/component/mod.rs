#![forbid(unsafe_code)]

//! Validation components: the units a context aggregates.
//!
//! Every component implements [`ValidationComponent`]. Three variants ship
//! with the crate:
//!
//! - [`PropertyRule`]: a predicate over one observable property, evaluated
//!   synchronously on every change.
//! - [`MultiPropertyRule`]: a predicate over two or three properties,
//!   registered as covering all of them.
//! - [`ObservableRule`]: re-emits outcomes from an external
//!   [`StateSource`](crate::source::StateSource), typically asynchronous.
//!
//! # Invariants
//!
//! 1. A component always has exactly one current state, readable through
//!    [`changes`](ValidationComponent::changes).
//! 2. Emissions are delivered in evaluation order; an emission equal to the
//!    current state is swallowed.
//! 3. After [`dispose`](ValidationComponent::dispose) the component stops
//!    reacting to its inputs. Its last state stays readable.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Predicate panics | Bug in caller code | Invalid state with failure text, `warn!` logged |
//! | Message function panics | Bug in caller code | Same as above |
//! | Source yields `Err` | Async check failed | Same as above |

mod multi;
mod observable;
mod property;

pub use multi::MultiPropertyRule;
pub use observable::ObservableRule;
pub use property::PropertyRule;

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use rxv_reactive::{Observable, Signal, Subscription};

use crate::config::DEFAULT_FAILURE_TEXT;
use crate::error::{Result, ValidationError, check_property_name};
use crate::state::{ComponentId, ValidationState};
use crate::text::ValidationText;

/// Capability set shared by every validation component.
pub trait ValidationComponent {
    /// Identity of this component. States it emits carry the same id.
    fn id(&self) -> ComponentId;

    /// Names of the properties this component validates, in declaration order.
    fn property_names(&self) -> &[String];

    /// Whether this component is the sole validator of its properties.
    fn claim(&self) -> ClaimMode;

    /// Live state signal. `watch` on it yields the current state first.
    fn changes(&self) -> Signal<ValidationState>;

    /// Stop reacting to inputs and release every held subscription.
    fn dispose(&self);

    /// Number of covered properties.
    fn property_count(&self) -> usize {
        self.property_names().len()
    }

    /// Whether `name` is covered.
    ///
    /// With `exclusively`, matches only when `name` is the one and only
    /// covered property.
    fn contains_property(&self, name: &str, exclusively: bool) -> bool {
        let names = self.property_names();
        if exclusively {
            names.len() == 1 && names[0] == name
        } else {
            names.iter().any(|n| n == name)
        }
    }

    /// Current state snapshot.
    fn state(&self) -> ValidationState {
        self.changes().get()
    }

    /// Current validity.
    fn is_valid(&self) -> bool {
        self.changes().with(ValidationState::is_valid)
    }

    /// Current message text.
    fn text(&self) -> ValidationText {
        self.changes().with(|state| state.text().clone())
    }
}

/// How a component claims its properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClaimMode {
    /// Other components may validate the same properties.
    #[default]
    Shared,
    /// This component must be the only validator of its properties.
    Exclusive,
}

impl ClaimMode {
    /// Whether this is [`ClaimMode::Exclusive`].
    #[must_use]
    pub fn is_exclusive(self) -> bool {
        matches!(self, Self::Exclusive)
    }
}

/// Result of one evaluation, before it is stamped with an owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOutcome {
    /// Whether the input is valid.
    pub is_valid: bool,
    /// Messages to show.
    pub text: ValidationText,
}

impl RuleOutcome {
    /// Valid, nothing to say.
    #[must_use]
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            text: ValidationText::NONE,
        }
    }

    /// Invalid with `text`.
    pub fn invalid(text: impl Into<ValidationText>) -> Self {
        Self {
            is_valid: false,
            text: text.into(),
        }
    }

    /// Valid when `is_valid`, otherwise invalid with `message`.
    pub fn check(is_valid: bool, message: impl Into<ValidationText>) -> Self {
        if is_valid {
            Self::valid()
        } else {
            Self::invalid(message)
        }
    }
}

/// Failure reported by an asynchronous check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleError {
    message: String,
}

impl RuleError {
    /// Error with a diagnostic message. The message is logged, not shown.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Diagnostic message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation check failed: {}", self.message)
    }
}

impl std::error::Error for RuleError {}

/// What a state source delivers.
pub type RuleResult = std::result::Result<RuleOutcome, RuleError>;

/// Message shown when a predicate rejects a value.
pub enum RuleMessage<T> {
    /// The same text every time.
    Fixed(String),
    /// Text derived from the rejected value.
    Computed(Box<dyn Fn(&T) -> String>),
}

impl<T> RuleMessage<T> {
    /// Message computed from the rejected value.
    pub fn computed(f: impl Fn(&T) -> String + 'static) -> Self {
        Self::Computed(Box::new(f))
    }

    pub(crate) fn render(&self, value: &T) -> String {
        match self {
            Self::Fixed(text) => text.clone(),
            Self::Computed(f) => f(value),
        }
    }
}

impl<T> From<&str> for RuleMessage<T> {
    fn from(text: &str) -> Self {
        Self::Fixed(text.to_string())
    }
}

impl<T> From<String> for RuleMessage<T> {
    fn from(text: String) -> Self {
        Self::Fixed(text)
    }
}

impl<T> fmt::Debug for RuleMessage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(text) => f.debug_tuple("Fixed").field(text).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// State shared between a rule and the callbacks that feed it.
pub(crate) struct RuleShared {
    id: ComponentId,
    state: Observable<ValidationState>,
    failure_text: RefCell<String>,
}

impl RuleShared {
    /// Publish an outcome. Equal consecutive outcomes are swallowed.
    pub(crate) fn publish(&self, outcome: RuleOutcome) {
        self.state
            .set(ValidationState::new(outcome.is_valid, outcome.text, self.id));
    }

    /// Publish a source item, isolating errors as failure text.
    pub(crate) fn publish_result(&self, result: RuleResult) {
        match result {
            Ok(outcome) => self.publish(outcome),
            Err(error) => {
                tracing::warn!(component = %self.id, error = %error, "validation source failed");
                self.publish_failure();
            }
        }
    }

    /// Run `evaluate` and publish its outcome; a panic becomes failure text.
    pub(crate) fn evaluate(&self, evaluate: impl FnOnce() -> RuleOutcome) {
        match catch_unwind(AssertUnwindSafe(evaluate)) {
            Ok(outcome) => self.publish(outcome),
            Err(payload) => {
                tracing::warn!(
                    component = %self.id,
                    panic = panic_message(payload.as_ref()),
                    "validation rule panicked"
                );
                self.publish_failure();
            }
        }
    }

    fn publish_failure(&self) {
        let text = self.failure_text.borrow().clone();
        self.publish(RuleOutcome::invalid(text));
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "<non-string panic payload>"
    }
}

/// Bookkeeping every built-in rule delegates to.
pub(crate) struct RuleCore {
    shared: Rc<RuleShared>,
    properties: Vec<String>,
    claim: ClaimMode,
    subscriptions: RefCell<Vec<Subscription>>,
}

impl RuleCore {
    /// Validate `properties` and start in the valid state.
    pub(crate) fn new(properties: Vec<String>) -> Result<Self> {
        for (index, name) in properties.iter().enumerate() {
            check_property_name(name)?;
            if properties[..index].contains(name) {
                return Err(ValidationError::invalid_argument(
                    "properties",
                    format!("property '{name}' listed more than once"),
                ));
            }
        }
        let id = ComponentId::next();
        Ok(Self {
            shared: Rc::new(RuleShared {
                id,
                state: Observable::new(ValidationState::valid(id)),
                failure_text: RefCell::new(DEFAULT_FAILURE_TEXT.to_string()),
            }),
            properties,
            claim: ClaimMode::Shared,
            subscriptions: RefCell::new(Vec::new()),
        })
    }

    pub(crate) fn shared(&self) -> Rc<RuleShared> {
        Rc::clone(&self.shared)
    }

    pub(crate) fn attach(&self, subscription: Subscription) {
        self.subscriptions.borrow_mut().push(subscription);
    }

    pub(crate) fn set_claim(&mut self, claim: ClaimMode) {
        self.claim = claim;
    }

    pub(crate) fn set_failure_text(&self, text: String) {
        *self.shared.failure_text.borrow_mut() = text;
    }

    pub(crate) fn id(&self) -> ComponentId {
        self.shared.id
    }

    pub(crate) fn property_names(&self) -> &[String] {
        &self.properties
    }

    pub(crate) fn claim(&self) -> ClaimMode {
        self.claim
    }

    pub(crate) fn changes(&self) -> Signal<ValidationState> {
        self.shared.state.signal()
    }

    pub(crate) fn dispose(&self) {
        let released = std::mem::take(&mut *self.subscriptions.borrow_mut());
        if !released.is_empty() {
            tracing::debug!(
                component = %self.shared.id,
                subscriptions = released.len(),
                "validation rule disposed"
            );
        }
    }
}

impl fmt::Debug for RuleCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleCore")
            .field("id", &self.shared.id)
            .field("properties", &self.properties)
            .field("claim", &self.claim)
            .field("state", &self.shared.state.get())
            .finish()
    }
}

/// Implements [`ValidationComponent`] and the shared builder methods for a
/// rule type with a `core: RuleCore` field.
macro_rules! delegate_to_core {
    ($rule:ty) => {
        impl $rule {
            /// Mark this rule as the sole validator of its properties.
            #[must_use]
            pub fn exclusive(mut self) -> Self {
                self.core.set_claim($crate::component::ClaimMode::Exclusive);
                self
            }

            /// Text reported if evaluation fails unexpectedly.
            #[must_use]
            pub fn with_failure_text(self, text: impl Into<String>) -> Self {
                self.core.set_failure_text(text.into());
                self
            }
        }

        impl $crate::component::ValidationComponent for $rule {
            fn id(&self) -> $crate::state::ComponentId {
                self.core.id()
            }

            fn property_names(&self) -> &[String] {
                self.core.property_names()
            }

            fn claim(&self) -> $crate::component::ClaimMode {
                self.core.claim()
            }

            fn changes(&self) -> rxv_reactive::Signal<$crate::state::ValidationState> {
                self.core.changes()
            }

            fn dispose(&self) {
                self.core.dispose();
            }
        }
    };
}

pub(crate) use delegate_to_core;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_property_names_rejected() {
        let err = RuleCore::new(vec!["A".into(), "B".into(), "A".into()]).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::InvalidArgument {
                argument: "properties",
                ..
            }
        ));
    }

    #[test]
    fn core_starts_valid() {
        let core = RuleCore::new(vec!["A".into()]).expect("valid names");
        let state = core.changes().get();
        assert!(state.is_valid());
        assert_eq!(state.owner(), core.id());
    }

    #[test]
    fn panic_becomes_failure_text() {
        let core = RuleCore::new(vec!["A".into()]).expect("valid names");
        core.set_failure_text("Could not validate.".into());
        core.shared().evaluate(|| panic!("boom"));
        let state = core.changes().get();
        assert!(!state.is_valid());
        assert_eq!(state.text(), &ValidationText::single("Could not validate."));
    }

    #[test]
    fn source_error_becomes_failure_text() {
        let core = RuleCore::new(vec![]).expect("no names");
        core.shared()
            .publish_result(Err(RuleError::new("connection reset")));
        assert_eq!(
            core.changes().get().text(),
            &ValidationText::single(DEFAULT_FAILURE_TEXT)
        );
    }

    #[test]
    fn outcome_check_helper() {
        assert_eq!(RuleOutcome::check(true, "x"), RuleOutcome::valid());
        assert_eq!(RuleOutcome::check(false, "x"), RuleOutcome::invalid("x"));
    }

    #[test]
    fn computed_message_renders_value() {
        let message = RuleMessage::computed(|len: &usize| format!("{len} is too short"));
        assert_eq!(message.render(&2), "2 is too short");
        let fixed: RuleMessage<usize> = "Required".into();
        assert_eq!(fixed.render(&0), "Required");
    }
}
