#![forbid(unsafe_code)]

//! Sources of externally computed validation outcomes.
//!
//! An [`ObservableRule`](crate::component::ObservableRule) does no
//! evaluation of its own; it re-emits whatever its [`StateSource`] delivers.
//! Sources in this module:
//!
//! - `Observable<RuleOutcome>` / `Signal<RuleOutcome>` / `Observable<RuleResult>`:
//!   outcomes computed elsewhere on the UI thread.
//! - [`Mapped`]: an observable property projected through a closure.
//! - [`StateChannel`]: results produced on worker threads, delivered when
//!   the host pumps.
//! - [`Pending`]: wraps a [`CompletionSource`] and emits a placeholder while
//!   a check is in flight.
//!
//! # Invariants
//!
//! 1. A source delivers items to its sink in production order.
//! 2. Dropping the subscription returned by [`StateSource::connect`] stops
//!    all further deliveries.

mod channel;
mod pending;

pub use channel::{StateChannel, StatePump, StateSender, Ticket};
pub use pending::Pending;

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use rxv_reactive::{Observable, Signal, Subscription};

use crate::component::{RuleError, RuleOutcome, RuleResult, panic_message};

/// Callback a source delivers items to.
pub type StateSink = Rc<dyn Fn(RuleResult)>;

/// Something that produces validation outcomes over time.
pub trait StateSource {
    /// Start delivering items to `sink`.
    ///
    /// Sources that hold a current value deliver it immediately.
    fn connect(self, sink: StateSink) -> Subscription;
}

/// A source that delivers one item per completed check, even when the
/// result equals the previous one.
///
/// Observable-backed sources suppress repeated values, so a placeholder
/// shown ahead of them could never be replaced by an identical result.
/// [`Pending`] therefore only wraps sources with this guarantee.
pub trait CompletionSource: StateSource {}

impl CompletionSource for StateChannel {}

impl StateSource for Observable<RuleOutcome> {
    fn connect(self, sink: StateSink) -> Subscription {
        self.watch(move |outcome| sink(Ok(outcome.clone())))
    }
}

impl StateSource for Signal<RuleOutcome> {
    fn connect(self, sink: StateSink) -> Subscription {
        self.watch(move |outcome| sink(Ok(outcome.clone())))
    }
}

impl StateSource for Observable<RuleResult> {
    fn connect(self, sink: StateSink) -> Subscription {
        self.watch(move |result| sink(result.clone()))
    }
}

/// An observable projected into outcomes.
///
/// A panic in the projection is delivered as an `Err` item, so the rule
/// shows its failure text instead of unwinding into the caller of `set`.
pub struct Mapped<T> {
    source: Observable<T>,
    map: Box<dyn Fn(&T) -> RuleResult>,
}

impl<T> fmt::Debug for Mapped<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapped").finish_non_exhaustive()
    }
}

/// Project `source` through an infallible closure.
pub fn map<T>(source: &Observable<T>, f: impl Fn(&T) -> RuleOutcome + 'static) -> Mapped<T>
where
    T: Clone + PartialEq + 'static,
{
    Mapped {
        source: source.clone(),
        map: Box::new(move |value: &T| Ok(f(value))),
    }
}

/// Project `source` through a closure that may fail.
pub fn try_map<T>(source: &Observable<T>, f: impl Fn(&T) -> RuleResult + 'static) -> Mapped<T>
where
    T: Clone + PartialEq + 'static,
{
    Mapped {
        source: source.clone(),
        map: Box::new(f),
    }
}

impl<T: Clone + PartialEq + 'static> StateSource for Mapped<T> {
    fn connect(self, sink: StateSink) -> Subscription {
        let map = self.map;
        self.source.watch(move |value| {
            let result = catch_unwind(AssertUnwindSafe(|| map(value))).unwrap_or_else(|payload| {
                Err(RuleError::new(format!(
                    "projection panicked: {}",
                    panic_message(payload.as_ref())
                )))
            });
            sink(result);
        })
    }
}
