#![forbid(unsafe_code)]

//! Pushing validation results into UI sinks.
//!
//! A [`ValidationBinding`] connects a state signal (a component's, or a
//! context's aggregate) to a sink closure. The sink receives the current
//! value immediately and every later distinct value until the binding is
//! released.
//!
//! ```
//! use rxv_reactive::Observable;
//! use rxv_validation::{SingleLineFormatter, ValidationBinding, ValidationContext};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let name = Observable::new(String::new());
//! let context = ValidationContext::new();
//! context
//!     .add_property_rule(&name, "Name", |n: &String| !n.is_empty(), "Name is required.")
//!     .unwrap();
//!
//! let label = Rc::new(RefCell::new(String::new()));
//! let l = Rc::clone(&label);
//! let _binding = ValidationBinding::bind_text(
//!     &context.changes(),
//!     SingleLineFormatter::default(),
//!     move |text: String| *l.borrow_mut() = text,
//! );
//! assert_eq!(*label.borrow(), "Name is required.");
//!
//! name.set("Ada".into());
//! assert_eq!(*label.borrow(), "");
//! ```
//!
//! # Invariants
//!
//! 1. Creating a binding writes the current value to the sink exactly once.
//! 2. Consecutive equal values are written once.
//! 3. After [`release`](ValidationBinding::release) (or drop) the sink is
//!    never called again.
//! 4. A [`BindingScope`] releases its bindings in reverse registration order.

use std::cell::{Cell, RefCell};
use std::fmt;

use rxv_reactive::{Observable, Signal, Subscription};

use crate::context::ValidationContext;
use crate::formatter::ValidationTextFormatter;
use crate::state::{ComponentId, ValidationState};
use crate::text::ValidationText;

/// Live connection from a validation signal to a sink.
#[must_use = "dropping a ValidationBinding releases it"]
pub struct ValidationBinding {
    subscription: Subscription,
}

impl ValidationBinding {
    /// Push every distinct state to `sink`.
    pub fn bind_state(
        signal: &Signal<ValidationState>,
        sink: impl Fn(&ValidationState) + 'static,
    ) -> Self {
        Self {
            subscription: signal.watch(sink),
        }
    }

    /// Push validity changes to `sink`.
    pub fn bind_validity(signal: &Signal<ValidationState>, sink: impl Fn(bool) + 'static) -> Self {
        let last = Cell::new(None);
        Self {
            subscription: signal.watch(move |state| {
                let valid = state.is_valid();
                if last.replace(Some(valid)) != Some(valid) {
                    sink(valid);
                }
            }),
        }
    }

    /// Push formatted text changes to `sink`.
    pub fn bind_text<T, F>(
        signal: &Signal<ValidationState>,
        formatter: F,
        sink: impl Fn(T) + 'static,
    ) -> Self
    where
        F: ValidationTextFormatter<T> + 'static,
        T: 'static,
    {
        let last: RefCell<Option<ValidationText>> = RefCell::new(None);
        Self {
            subscription: signal.watch(move |state| {
                let text = state.text();
                {
                    let mut last = last.borrow_mut();
                    if last.as_ref() == Some(text) {
                        return;
                    }
                    *last = Some(text.clone());
                }
                sink(formatter.format(text));
            }),
        }
    }

    /// Push the merged text of every component covering `property_name`.
    ///
    /// The set of components is taken when the binding is created;
    /// components registered later are not included.
    pub fn bind_property<T, F>(
        context: &ValidationContext,
        property_name: &str,
        formatter: F,
        sink: impl Fn(T) + 'static,
    ) -> Self
    where
        F: ValidationTextFormatter<T> + 'static,
        T: 'static,
    {
        let signals: Vec<Signal<ValidationState>> = context
            .components_for(property_name, false)
            .iter()
            .map(|handle| handle.changes())
            .collect();
        let owner = context.id();
        let merged = Observable::new(merged_state(&signals, owner));
        let mut subscriptions: Vec<Subscription> = signals
            .iter()
            .map(|signal| {
                let signals = signals.clone();
                let merged = merged.clone();
                signal.subscribe(move |_| merged.set(merged_state(&signals, owner)))
            })
            .collect();
        let text = Self::bind_text(&merged.signal(), formatter, sink);
        subscriptions.push(text.into_subscription());

        Self {
            subscription: Subscription::join(subscriptions),
        }
    }

    /// Push every distinct aggregate state of `context` to `sink`.
    pub fn bind_context(
        context: &ValidationContext,
        sink: impl Fn(&ValidationState) + 'static,
    ) -> Self {
        Self::bind_state(&context.changes(), sink)
    }

    /// Stop pushing. Calling this again is a no-op.
    ///
    /// Returns `true` if this call released the binding.
    pub fn release(&mut self) -> bool {
        self.subscription.unsubscribe()
    }

    /// Whether the binding still pushes values.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.subscription.is_active()
    }

    /// Give up the typed wrapper, keeping the connection alive.
    pub fn into_subscription(self) -> Subscription {
        self.subscription
    }
}

impl fmt::Debug for ValidationBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationBinding")
            .field("active", &self.is_active())
            .finish()
    }
}

fn merged_state(signals: &[Signal<ValidationState>], owner: ComponentId) -> ValidationState {
    let states: Vec<ValidationState> = signals.iter().map(Signal::get).collect();
    let is_valid = states.iter().all(ValidationState::is_valid);
    let text = ValidationText::merge(
        states
            .iter()
            .filter(|state| !state.is_valid())
            .map(ValidationState::text),
    );
    ValidationState::new(is_valid, text, owner)
}

/// Holds the bindings of one activation region, such as a view.
///
/// Clearing or dropping the scope releases everything it holds, newest
/// first. The scope can be reused after [`clear`](Self::clear).
pub struct BindingScope {
    subscriptions: Vec<Subscription>,
}

impl BindingScope {
    /// Create an empty scope.
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscriptions: Vec::new(),
        }
    }

    /// Keep `binding` alive until the scope is cleared.
    pub fn hold(&mut self, binding: ValidationBinding) -> &mut Self {
        self.subscriptions.push(binding.into_subscription());
        self
    }

    /// Keep a raw subscription alive until the scope is cleared.
    pub fn hold_subscription(&mut self, subscription: Subscription) -> &mut Self {
        self.subscriptions.push(subscription);
        self
    }

    /// [`ValidationBinding::bind_state`] held by this scope.
    pub fn bind_state(
        &mut self,
        signal: &Signal<ValidationState>,
        sink: impl Fn(&ValidationState) + 'static,
    ) -> &mut Self {
        self.hold(ValidationBinding::bind_state(signal, sink))
    }

    /// [`ValidationBinding::bind_validity`] held by this scope.
    pub fn bind_validity(
        &mut self,
        signal: &Signal<ValidationState>,
        sink: impl Fn(bool) + 'static,
    ) -> &mut Self {
        self.hold(ValidationBinding::bind_validity(signal, sink))
    }

    /// [`ValidationBinding::bind_text`] held by this scope.
    pub fn bind_text<T, F>(
        &mut self,
        signal: &Signal<ValidationState>,
        formatter: F,
        sink: impl Fn(T) + 'static,
    ) -> &mut Self
    where
        F: ValidationTextFormatter<T> + 'static,
        T: 'static,
    {
        self.hold(ValidationBinding::bind_text(signal, formatter, sink))
    }

    /// [`ValidationBinding::bind_property`] held by this scope.
    pub fn bind_property<T, F>(
        &mut self,
        context: &ValidationContext,
        property_name: &str,
        formatter: F,
        sink: impl Fn(T) + 'static,
    ) -> &mut Self
    where
        F: ValidationTextFormatter<T> + 'static,
        T: 'static,
    {
        self.hold(ValidationBinding::bind_property(
            context,
            property_name,
            formatter,
            sink,
        ))
    }

    /// [`ValidationBinding::bind_context`] held by this scope.
    pub fn bind_context(
        &mut self,
        context: &ValidationContext,
        sink: impl Fn(&ValidationState) + 'static,
    ) -> &mut Self {
        self.hold(ValidationBinding::bind_context(context, sink))
    }

    /// Number of held bindings and subscriptions.
    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.subscriptions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Release everything now, newest first.
    pub fn clear(&mut self) {
        while let Some(subscription) = self.subscriptions.pop() {
            drop(subscription);
        }
    }
}

impl Default for BindingScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BindingScope {
    fn drop(&mut self) {
        self.clear();
    }
}

impl fmt::Debug for BindingScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingScope")
            .field("binding_count", &self.subscriptions.len())
            .finish()
    }
}
