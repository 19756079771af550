#![forbid(unsafe_code)]

//! Aggregation of many validation components into one state.
//!
//! A [`ValidationContext`] owns the components registered with it, listens
//! to each one, and keeps a single aggregate [`ValidationState`] current:
//!
//! - **validity** is the logical AND of every component's latest validity;
//! - **text** is the concatenation, in registration order, of the texts of
//!   components that are currently invalid.
//!
//! The aggregate is published through [`changes`](ValidationContext::changes),
//! which only emits when the aggregate differs from the previous one under
//! [`ValidationStateComparer`](crate::state::ValidationStateComparer).
//!
//! # Invariants
//!
//! 1. With no components, the aggregate is valid with
//!    [`ValidationText::NONE`].
//! 2. The aggregate is recomputed synchronously on every component emission
//!    and on every registration or removal.
//! 3. Two components may cover the same property only if neither claims it
//!    exclusively. A conflicting registration is rejected and leaves the
//!    context unchanged.
//! 4. [`dispose`](ValidationContext::dispose) runs at most once; each owned
//!    component is disposed exactly once. The last aggregate stays readable.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Exclusive claim overlap | Two rules for one property | `MultipleRulesNotSupported`, `warn!` logged |
//! | Register after dispose | Lifecycle misuse | `Disposed` |
//! | Aggregate subscriber re-enters `register` | Caller code | Supported; borrows are released before notifying |

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use rxv_reactive::{Observable, Signal, Subscription};

use crate::component::{
    ClaimMode, MultiPropertyRule, ObservableRule, PropertyRule, RuleMessage, ValidationComponent,
};
use crate::config::ValidationConfig;
use crate::error::{Result, ValidationError};
use crate::source::{CompletionSource, Pending, StateSource};
use crate::state::{ComponentId, ValidationState};
use crate::text::ValidationText;

struct Entry {
    id: ComponentId,
    component: Box<dyn ValidationComponent>,
    latest: ValidationState,
    subscription: Subscription,
}

impl Entry {
    fn release(self) {
        drop(self.subscription);
        self.component.dispose();
    }

    fn handle(&self) -> ComponentHandle {
        ComponentHandle {
            id: self.id,
            properties: self.component.property_names().to_vec(),
            claim: self.component.claim(),
            changes: self.component.changes(),
        }
    }
}

struct ContextInner {
    entries: Vec<Entry>,
    disposed: bool,
}

/// Composes validation components into one observable state.
pub struct ValidationContext {
    id: ComponentId,
    config: ValidationConfig,
    inner: Rc<RefCell<ContextInner>>,
    aggregate: Observable<ValidationState>,
}

impl Default for ValidationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationContext {
    /// Empty context with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::build(ValidationConfig::default())
    }

    /// Empty context with `config`.
    ///
    /// # Errors
    ///
    /// Whatever [`ValidationConfig::validate`] rejects.
    pub fn with_config(config: ValidationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: ValidationConfig) -> Self {
        let id = ComponentId::next();
        Self {
            id,
            config,
            inner: Rc::new(RefCell::new(ContextInner {
                entries: Vec::new(),
                disposed: false,
            })),
            aggregate: Observable::new(ValidationState::valid(id)),
        }
    }

    /// Identity stamped on aggregate states.
    #[must_use]
    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// Configuration used by the `add_*` helpers.
    #[must_use]
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    // ── Registration ─────────────────────────────────────────────────

    /// Take ownership of `component` and fold it into the aggregate.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::Disposed`] if the context was disposed.
    /// - [`ValidationError::MultipleRulesNotSupported`] if the component's
    ///   properties overlap an already registered component and either of
    ///   them claims exclusively.
    pub fn register<C>(&self, component: C) -> Result<ComponentId>
    where
        C: ValidationComponent + 'static,
    {
        self.register_boxed(Box::new(component))
    }

    /// [`register`](Self::register) for an already boxed component.
    ///
    /// # Errors
    ///
    /// Same as [`register`](Self::register).
    pub fn register_boxed(&self, component: Box<dyn ValidationComponent>) -> Result<ComponentId> {
        {
            let inner = self.inner.borrow();
            if inner.disposed {
                return Err(ValidationError::Disposed);
            }
            let conflicts = conflicting_properties(&inner.entries, component.as_ref());
            if !conflicts.is_empty() {
                tracing::warn!(
                    context = %self.id,
                    component = %component.id(),
                    properties = ?conflicts,
                    "validation rule conflicts with an exclusive claim"
                );
                return Err(ValidationError::MultipleRulesNotSupported {
                    properties: conflicts,
                });
            }
        }

        let id = component.id();
        let changes = component.changes();
        let latest = changes.get();
        let subscription = changes.subscribe(self.on_component_change(id));

        let next = {
            let mut inner = self.inner.borrow_mut();
            inner.entries.push(Entry {
                id,
                component,
                latest,
                subscription,
            });
            aggregate_of(&inner.entries, self.id)
        };
        tracing::debug!(
            context = %self.id,
            component = %id,
            valid = next.is_valid(),
            "validation component registered"
        );
        self.aggregate.set(next);
        Ok(id)
    }

    fn on_component_change(&self, id: ComponentId) -> impl Fn(&ValidationState) + 'static {
        let inner: Weak<RefCell<ContextInner>> = Rc::downgrade(&self.inner);
        let aggregate = self.aggregate.clone();
        let owner = self.id;
        move |state: &ValidationState| {
            let Some(inner) = inner.upgrade() else {
                return;
            };
            let next = {
                let mut inner = inner.borrow_mut();
                let Some(entry) = inner.entries.iter_mut().find(|entry| entry.id == id) else {
                    return;
                };
                entry.latest = state.clone();
                aggregate_of(&inner.entries, owner)
            };
            aggregate.set(next);
        }
    }

    /// Remove and dispose the component with `id`.
    ///
    /// Returns `false` if no such component is registered.
    pub fn unregister(&self, id: ComponentId) -> bool {
        let (entry, next) = {
            let mut inner = self.inner.borrow_mut();
            let Some(index) = inner.entries.iter().position(|entry| entry.id == id) else {
                return false;
            };
            let entry = inner.entries.remove(index);
            (entry, aggregate_of(&inner.entries, self.id))
        };
        entry.release();
        tracing::debug!(context = %self.id, component = %id, "validation component unregistered");
        self.aggregate.set(next);
        true
    }

    /// Build a [`PropertyRule`] with this context's failure text and
    /// register it.
    ///
    /// # Errors
    ///
    /// Construction errors of [`PropertyRule::new`] or registration errors.
    pub fn add_property_rule<T>(
        &self,
        property: &Observable<T>,
        property_name: impl Into<String>,
        predicate: impl Fn(&T) -> bool + 'static,
        message: impl Into<RuleMessage<T>>,
    ) -> Result<ComponentId>
    where
        T: Clone + PartialEq + 'static,
    {
        let rule = PropertyRule::new(property, property_name, predicate, message)?
            .with_failure_text(self.config.failure_text.clone());
        self.register(rule)
    }

    /// Build a two-property [`MultiPropertyRule`] and register it.
    ///
    /// # Errors
    ///
    /// Construction errors of [`MultiPropertyRule::new2`] or registration
    /// errors.
    pub fn add_multi_property_rule<A, B>(
        &self,
        first: (&Observable<A>, &str),
        second: (&Observable<B>, &str),
        predicate: impl Fn(&A, &B) -> bool + 'static,
        message: impl Into<RuleMessage<(A, B)>>,
    ) -> Result<ComponentId>
    where
        A: Clone + PartialEq + 'static,
        B: Clone + PartialEq + 'static,
    {
        let rule = MultiPropertyRule::new2(first, second, predicate, message)?
            .with_failure_text(self.config.failure_text.clone());
        self.register(rule)
    }

    /// Build an [`ObservableRule`] fed by `source` and register it.
    ///
    /// # Errors
    ///
    /// Construction errors of [`ObservableRule::new`] or registration
    /// errors.
    pub fn add_observable_rule<I, S>(&self, properties: I, source: impl StateSource) -> Result<ComponentId>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rule = ObservableRule::new(properties, source)?
            .with_failure_text(self.config.failure_text.clone());
        self.register(rule)
    }

    /// Like [`add_observable_rule`](Self::add_observable_rule), but shows the
    /// configured pending text each time `trigger` changes until `source`
    /// reports. The source must report every completed check, see
    /// [`CompletionSource`].
    ///
    /// # Errors
    ///
    /// Same as [`add_observable_rule`](Self::add_observable_rule).
    pub fn add_pending_rule<I, S, T>(
        &self,
        properties: I,
        trigger: &Observable<T>,
        source: impl CompletionSource,
    ) -> Result<ComponentId>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        T: Clone + PartialEq + 'static,
    {
        let source = Pending::new(source, trigger, self.config.pending_text.as_str());
        self.add_observable_rule(properties, source)
    }

    // ── Aggregate reads ──────────────────────────────────────────────

    /// Validity of the last aggregate.
    #[must_use]
    pub fn current_validity(&self) -> bool {
        self.aggregate.with(ValidationState::is_valid)
    }

    /// Text of the last aggregate.
    #[must_use]
    pub fn current_text(&self) -> ValidationText {
        self.aggregate.with(|state| state.text().clone())
    }

    /// Last aggregate state.
    #[must_use]
    pub fn state(&self) -> ValidationState {
        self.aggregate.get()
    }

    /// Aggregate signal. Every `watch` starts from the current aggregate.
    #[must_use]
    pub fn changes(&self) -> Signal<ValidationState> {
        self.aggregate.signal()
    }

    /// Subscribe to future aggregate changes.
    pub fn subscribe(&self, callback: impl Fn(&ValidationState) + 'static) -> Subscription {
        self.aggregate.subscribe(callback)
    }

    /// Subscribe and receive the current aggregate immediately.
    pub fn watch(&self, callback: impl Fn(&ValidationState) + 'static) -> Subscription {
        self.aggregate.watch(callback)
    }

    // ── Component lookup ─────────────────────────────────────────────

    /// Number of registered components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    /// Whether no components are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().entries.is_empty()
    }

    /// Ids of registered components in registration order.
    #[must_use]
    pub fn component_ids(&self) -> Vec<ComponentId> {
        self.inner.borrow().entries.iter().map(|entry| entry.id).collect()
    }

    /// Handle onto the component with `id`.
    #[must_use]
    pub fn component(&self, id: ComponentId) -> Option<ComponentHandle> {
        self.inner
            .borrow()
            .entries
            .iter()
            .find(|entry| entry.id == id)
            .map(Entry::handle)
    }

    /// Components covering `name`, in registration order.
    ///
    /// With `exclusively`, only components whose sole property is `name`.
    #[must_use]
    pub fn components_for(&self, name: &str, exclusively: bool) -> Vec<ComponentHandle> {
        self.inner
            .borrow()
            .entries
            .iter()
            .filter(|entry| entry.component.contains_property(name, exclusively))
            .map(Entry::handle)
            .collect()
    }

    /// Merged text of the invalid components covering `name`.
    #[must_use]
    pub fn text_for(&self, name: &str) -> ValidationText {
        let inner = self.inner.borrow();
        ValidationText::merge(
            inner
                .entries
                .iter()
                .filter(|entry| {
                    !entry.latest.is_valid() && entry.component.contains_property(name, false)
                })
                .map(|entry| entry.latest.text()),
        )
    }

    /// Whether every component covering `name` is valid.
    #[must_use]
    pub fn is_property_valid(&self, name: &str) -> bool {
        self.inner
            .borrow()
            .entries
            .iter()
            .filter(|entry| entry.component.contains_property(name, false))
            .all(|entry| entry.latest.is_valid())
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Unsubscribe from and dispose every component. Idempotent.
    pub fn dispose(&self) {
        let entries = {
            let mut inner = self.inner.borrow_mut();
            if inner.disposed {
                return;
            }
            inner.disposed = true;
            std::mem::take(&mut inner.entries)
        };
        let components = entries.len();
        for entry in entries {
            entry.release();
        }
        tracing::debug!(context = %self.id, components, "validation context disposed");
    }

    /// Whether [`dispose`](Self::dispose) has run.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.borrow().disposed
    }
}

impl Drop for ValidationContext {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for ValidationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ValidationContext")
            .field("id", &self.id)
            .field("components", &inner.entries.len())
            .field("disposed", &inner.disposed)
            .field("state", &self.aggregate.get())
            .finish()
    }
}

/// Read-only view of a registered component.
#[derive(Clone)]
pub struct ComponentHandle {
    id: ComponentId,
    properties: Vec<String>,
    claim: ClaimMode,
    changes: Signal<ValidationState>,
}

impl ComponentHandle {
    /// Identity of the component.
    #[must_use]
    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// Covered property names, in declaration order.
    #[must_use]
    pub fn property_names(&self) -> &[String] {
        &self.properties
    }

    /// How the component claims its properties.
    #[must_use]
    pub fn claim(&self) -> ClaimMode {
        self.claim
    }

    /// The component's state signal.
    #[must_use]
    pub fn changes(&self) -> Signal<ValidationState> {
        self.changes.clone()
    }

    /// Current state snapshot.
    #[must_use]
    pub fn state(&self) -> ValidationState {
        self.changes.get()
    }

    /// Current validity.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.changes.with(ValidationState::is_valid)
    }
}

impl fmt::Debug for ComponentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentHandle")
            .field("id", &self.id)
            .field("properties", &self.properties)
            .field("claim", &self.claim)
            .finish()
    }
}

fn conflicting_properties(entries: &[Entry], candidate: &dyn ValidationComponent) -> Vec<String> {
    let mut conflicts: Vec<String> = Vec::new();
    for entry in entries {
        let existing = entry.component.as_ref();
        if !existing.claim().is_exclusive() && !candidate.claim().is_exclusive() {
            continue;
        }
        for name in candidate.property_names() {
            if existing.contains_property(name, false) && !conflicts.contains(name) {
                conflicts.push(name.clone());
            }
        }
    }
    conflicts
}

fn aggregate_of(entries: &[Entry], owner: ComponentId) -> ValidationState {
    let is_valid = entries.iter().all(|entry| entry.latest.is_valid());
    let text = ValidationText::merge(
        entries
            .iter()
            .filter(|entry| !entry.latest.is_valid())
            .map(|entry| entry.latest.text()),
    );
    tracing::trace!(
        components = entries.len(),
        is_valid,
        messages = text.len(),
        "validation aggregate recomputed"
    );
    ValidationState::new(is_valid, text, owner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::RuleOutcome;
    use crate::source::StateChannel;
    use std::cell::Cell;

    struct Counted {
        inner: ObservableRule,
        disposed: Rc<Cell<usize>>,
    }

    impl ValidationComponent for Counted {
        fn id(&self) -> ComponentId {
            self.inner.id()
        }

        fn property_names(&self) -> &[String] {
            self.inner.property_names()
        }

        fn claim(&self) -> ClaimMode {
            self.inner.claim()
        }

        fn changes(&self) -> Signal<ValidationState> {
            self.inner.changes()
        }

        fn dispose(&self) {
            self.disposed.set(self.disposed.get() + 1);
            self.inner.dispose();
        }
    }

    fn counted(name: &str, outcome: &Observable<RuleOutcome>) -> (Counted, Rc<Cell<usize>>) {
        let disposed = Rc::new(Cell::new(0));
        let inner = ObservableRule::new([name], outcome.clone()).expect("valid rule");
        (
            Counted {
                inner,
                disposed: Rc::clone(&disposed),
            },
            disposed,
        )
    }

    #[test]
    fn empty_context_is_valid() {
        let context = ValidationContext::new();
        assert!(context.current_validity());
        assert_eq!(context.current_text(), ValidationText::NONE);
        assert!(context.is_empty());
    }

    #[test]
    fn only_failing_cross_rule_reported() {
        let user_name = Observable::new(String::from("Bob"));
        let password = Observable::new(String::from("secret"));
        let confirm = Observable::new(String::from("secrets"));

        let context = ValidationContext::new();
        context
            .add_property_rule(&user_name, "UserName", |v: &String| !v.is_empty(), "UserName is required.")
            .expect("register");
        context
            .add_property_rule(&password, "Password", |v: &String| v.len() > 2, "Password too short.")
            .expect("register");
        context
            .add_multi_property_rule(
                (&password, "Password"),
                (&confirm, "ConfirmPassword"),
                |a: &String, b: &String| a == b,
                "Passwords must match.",
            )
            .expect("register");

        assert!(!context.current_validity());
        assert_eq!(context.current_text(), ValidationText::single("Passwords must match."));

        confirm.set("secret".into());
        assert!(context.current_validity());
        assert_eq!(context.current_text(), ValidationText::NONE);
    }

    #[test]
    fn texts_follow_registration_order() {
        let a = Observable::new(RuleOutcome::invalid("first"));
        let b = Observable::new(RuleOutcome::invalid("second"));
        let context = ValidationContext::new();
        context.add_observable_rule(["B"], b.clone()).expect("register");
        context.add_observable_rule(["A"], a.clone()).expect("register");

        assert_eq!(
            context.current_text(),
            ValidationText::from_messages(["second".to_string(), "first".to_string()])
        );

        b.set(RuleOutcome::valid());
        assert_eq!(context.current_text(), ValidationText::single("first"));
    }

    #[test]
    fn registering_invalid_component_updates_immediately() {
        let context = ValidationContext::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let _sub = context.subscribe(move |state| s.borrow_mut().push(state.is_valid()));

        let outcome = Observable::new(RuleOutcome::invalid("Nope"));
        context.add_observable_rule(["X"], outcome).expect("register");
        assert_eq!(*seen.borrow(), vec![false]);
    }

    #[test]
    fn equal_aggregates_are_not_re_emitted() {
        let outcome = Observable::new(RuleOutcome::invalid("Nope"));
        let other = Observable::new(RuleOutcome::valid());
        let context = ValidationContext::new();
        context.add_observable_rule(["X"], outcome).expect("register");

        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let _sub = context.subscribe(move |_| h.set(h.get() + 1));

        context.add_observable_rule(["Y"], other.clone()).expect("register");
        other.set(RuleOutcome::valid());
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn exclusive_conflict_leaves_context_unchanged() {
        let first = Observable::new(RuleOutcome::invalid("one"));
        let second = Observable::new(RuleOutcome::invalid("two"));
        let context = ValidationContext::new();
        let rule = ObservableRule::new(["Email"], first).expect("rule").exclusive();
        context.register(rule).expect("register");
        let before = context.state();

        let err = context
            .add_observable_rule(["Name", "Email"], second)
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::MultipleRulesNotSupported {
                properties: vec!["Email".to_string()],
            }
        );
        assert_eq!(context.len(), 1);
        assert_eq!(context.state(), before);
    }

    #[test]
    fn shared_overlap_is_allowed() {
        let a = Observable::new(RuleOutcome::valid());
        let b = Observable::new(RuleOutcome::invalid("bad"));
        let context = ValidationContext::new();
        context.add_observable_rule(["Email"], a).expect("register");
        context.add_observable_rule(["Email"], b).expect("register");
        assert_eq!(context.components_for("Email", true).len(), 2);
        assert!(!context.is_property_valid("Email"));
        assert_eq!(context.text_for("Email"), ValidationText::single("bad"));
        assert!(context.is_property_valid("Other"));
    }

    #[test]
    fn double_dispose_disposes_each_component_once() {
        let a = Observable::new(RuleOutcome::valid());
        let b = Observable::new(RuleOutcome::valid());
        let context = ValidationContext::new();
        let (first, first_count) = counted("A", &a);
        let (second, second_count) = counted("B", &b);
        context.register(first).expect("register");
        context.register(second).expect("register");

        context.dispose();
        context.dispose();
        drop(context);
        assert_eq!(first_count.get(), 1);
        assert_eq!(second_count.get(), 1);
    }

    #[test]
    fn dispose_keeps_last_aggregate_and_rejects_registration() {
        let outcome = Observable::new(RuleOutcome::invalid("Nope"));
        let context = ValidationContext::new();
        context.add_observable_rule(["X"], outcome.clone()).expect("register");
        context.dispose();

        outcome.set(RuleOutcome::valid());
        assert!(!context.current_validity());
        assert!(context.is_disposed());
        assert_eq!(
            context.add_observable_rule(["Y"], Observable::new(RuleOutcome::valid())),
            Err(ValidationError::Disposed)
        );
    }

    #[test]
    fn unregister_disposes_and_recomputes() {
        let outcome = Observable::new(RuleOutcome::invalid("Nope"));
        let context = ValidationContext::new();
        let (rule, count) = counted("X", &outcome);
        let id = context.register(rule).expect("register");
        assert!(!context.current_validity());

        assert!(context.unregister(id));
        assert!(!context.unregister(id));
        assert_eq!(count.get(), 1);
        assert!(context.current_validity());
        assert!(context.component(id).is_none());
    }

    #[test]
    fn pending_rule_uses_configured_text() {
        let config = ValidationConfig::default().with_pending_text("Checking...");
        let context = ValidationContext::with_config(config).expect("config");
        let user_name = Observable::new(String::new());
        let (channel, sender) = StateChannel::new();
        let pump = channel.pump_handle();
        context
            .add_pending_rule(["UserName"], &user_name, channel)
            .expect("register");
        assert!(context.current_validity());

        user_name.set("bob".into());
        assert_eq!(context.current_text(), ValidationText::single("Checking..."));

        sender.send_outcome(RuleOutcome::invalid("UserName is taken."));
        pump.pump();
        assert_eq!(context.current_text(), ValidationText::single("UserName is taken."));
    }

    #[test]
    fn pending_rule_clears_when_recheck_repeats_result() {
        let context = ValidationContext::new();
        let user_name = Observable::new(String::new());
        let (channel, sender) = StateChannel::new();
        let pump = channel.pump_handle();
        context
            .add_pending_rule(["UserName"], &user_name, channel)
            .expect("register");

        for name in ["bob", "bobby"] {
            user_name.set(name.into());
            assert!(!context.current_validity());
            sender.send_outcome(RuleOutcome::valid());
            assert!(pump.pump());
            assert!(context.current_validity());
            assert_eq!(context.current_text(), ValidationText::NONE);
        }
    }

    #[test]
    fn failure_text_comes_from_config() {
        let config = ValidationConfig::default().with_failure_text("Could not check.");
        let context = ValidationContext::with_config(config).expect("config");
        let value = Observable::new(0u32);
        context
            .add_property_rule(
                &value,
                "Value",
                |v: &u32| {
                    assert!(*v < 10, "out of range");
                    true
                },
                "unused",
            )
            .expect("register");

        value.set(50);
        assert_eq!(context.current_text(), ValidationText::single("Could not check."));
    }

    #[test]
    fn invalid_config_rejected() {
        let config = ValidationConfig::default().with_failure_text("");
        assert!(ValidationContext::with_config(config).is_err());
    }
}
