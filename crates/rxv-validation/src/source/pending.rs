#![forbid(unsafe_code)]

//! Placeholder state while an asynchronous check is in flight.

use std::rc::Rc;

use rxv_reactive::{Observable, Subscription};

use super::{CompletionSource, StateSink, StateSource};
use crate::component::RuleOutcome;
use crate::text::ValidationText;

/// Wraps a source and reports "still checking" whenever `trigger` changes.
///
/// The placeholder is an invalid state, so a form cannot be submitted while
/// a check is outstanding. The wrapped source's next item replaces it, which
/// is why the source must be a [`CompletionSource`]: it reports every
/// completed check, including one identical to the previous result.
/// Nothing applies this adapter implicitly.
pub struct Pending<S, T> {
    inner: S,
    trigger: Observable<T>,
    text: ValidationText,
}

impl<S, T> Pending<S, T>
where
    S: CompletionSource,
    T: Clone + PartialEq + 'static,
{
    /// Emit `text` as an invalid state each time `trigger` changes, then
    /// forward whatever `inner` produces.
    pub fn new(inner: S, trigger: &Observable<T>, text: impl Into<ValidationText>) -> Self {
        Self {
            inner,
            trigger: trigger.clone(),
            text: text.into(),
        }
    }
}

impl<S, T> StateSource for Pending<S, T>
where
    S: CompletionSource,
    T: Clone + PartialEq + 'static,
{
    fn connect(self, sink: StateSink) -> Subscription {
        let placeholder = RuleOutcome::invalid(self.text);
        let on_trigger = Rc::clone(&sink);
        let trigger = self
            .trigger
            .subscribe(move |_| on_trigger(Ok(placeholder.clone())));
        let inner = self.inner.connect(sink);
        Subscription::join(vec![trigger, inner])
    }
}
