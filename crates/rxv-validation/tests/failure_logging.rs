//! Rule failures are isolated into validation text and reported through
//! `tracing`.

use std::sync::{Arc, Mutex};

use rxv_reactive::Observable;
use rxv_validation::{RuleError, RuleResult, ValidationContext, ValidationText};
use tracing::subscriber::with_default;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Registry;
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

// ── Helpers ──────────────────────────────────────────────────────────

#[derive(Clone, Default)]
struct Captured {
    events: Arc<Mutex<Vec<(Level, String)>>>,
}

impl Captured {
    fn at(&self, level: Level) -> Vec<String> {
        self.events
            .lock()
            .expect("capture lock")
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, message)| message.clone())
            .collect()
    }
}

struct MessageVisitor<'a>(&'a mut String);

impl tracing::field::Visit for MessageVisitor<'_> {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.0 = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for Captured {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut message = String::new();
        event.record(&mut MessageVisitor(&mut message));
        self.events
            .lock()
            .expect("capture lock")
            .push((*event.metadata().level(), message));
    }
}

fn capture() -> (Captured, impl Subscriber + Send + Sync) {
    let captured = Captured::default();
    let subscriber = Registry::default().with(captured.clone());
    (captured, subscriber)
}

// ── Tests ────────────────────────────────────────────────────────────

#[test]
fn panicking_predicate_is_logged_and_shown_as_failure_text() {
    let (captured, subscriber) = capture();
    with_default(subscriber, || {
        let age = Observable::new(30u32);
        let context = ValidationContext::new();
        context
            .add_property_rule(
                &age,
                "Age",
                |v: &u32| {
                    assert!(*v < 200, "age overflow");
                    *v >= 18
                },
                "Must be an adult.",
            )
            .expect("register");

        age.set(500);
        assert!(!context.current_validity());
        assert_eq!(
            context.current_text(),
            ValidationText::single(context.config().failure_text.as_str())
        );

        age.set(40);
        assert!(context.current_validity());
    });

    assert_eq!(captured.at(Level::WARN), vec!["validation rule panicked".to_string()]);
}

#[test]
fn source_error_is_logged_and_isolated() {
    let (captured, subscriber) = capture();
    with_default(subscriber, || {
        let result: Observable<RuleResult> = Observable::new(Err(RuleError::new("timeout")));
        let context = ValidationContext::new();
        context
            .add_observable_rule(["Email"], result)
            .expect("register");
        assert!(!context.current_validity());
    });

    assert_eq!(captured.at(Level::WARN), vec!["validation source failed".to_string()]);
}

#[test]
fn lifecycle_events_are_debug_logged() {
    let (captured, subscriber) = capture();
    with_default(subscriber, || {
        let name = Observable::new(String::from("x"));
        let context = ValidationContext::new();
        context
            .add_property_rule(&name, "Name", |v: &String| !v.is_empty(), "Required.")
            .expect("register");
        context.dispose();
    });

    let debug = captured.at(Level::DEBUG);
    assert!(debug.contains(&"validation component registered".to_string()));
    assert!(debug.contains(&"validation context disposed".to_string()));
}
