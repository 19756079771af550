#![forbid(unsafe_code)]

//! Cross-thread delivery of asynchronous check results.
//!
//! Long-running checks (a uniqueness lookup, a remote policy call) run on
//! worker threads. They report through a [`StateSender`], which is
//! `Send + Clone`. The UI side owns the [`StateChannel`] and calls
//! [`StatePump::pump`] from its event loop to hand results to the rule.
//!
//! # Invariants
//!
//! 1. **Last state wins**: one `pump` delivers at most one item, the most
//!    recent one received. Intermediate results are dropped.
//! 2. **Switch to latest**: a result completed through a [`Ticket`] is
//!    dropped if a newer ticket has been issued, even when the older check
//!    finishes last.
//! 3. **Late results are harmless**: once the rule is disposed the channel
//!    disconnects; `send` and `complete` return `false` and nothing is
//!    delivered.
//!
//! # Example
//!
//! ```
//! use rxv_validation::component::{ObservableRule, RuleOutcome, ValidationComponent};
//! use rxv_validation::source::StateChannel;
//!
//! let (channel, sender) = StateChannel::new();
//! let pump = channel.pump_handle();
//! let rule = ObservableRule::new(["UserName"], channel).unwrap();
//!
//! let worker = std::thread::spawn(move || {
//!     sender.send(Ok(RuleOutcome::invalid("UserName is taken.")));
//! });
//! worker.join().unwrap();
//!
//! assert!(pump.pump());
//! assert!(!rule.is_valid());
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;

use rxv_reactive::Subscription;

use super::{StateSink, StateSource};
use crate::component::{RuleOutcome, RuleResult};

struct Envelope {
    ticket: Option<u64>,
    result: RuleResult,
}

/// Thread-safe producer half of a [`StateChannel`].
#[derive(Clone)]
pub struct StateSender {
    tx: mpsc::Sender<Envelope>,
    issued: Arc<AtomicU64>,
}

impl StateSender {
    /// Deliver `result` unconditionally on the next pump.
    ///
    /// Returns `false` if the receiving rule is gone.
    pub fn send(&self, result: RuleResult) -> bool {
        self.tx
            .send(Envelope {
                ticket: None,
                result,
            })
            .is_ok()
    }

    /// Shorthand for `send(Ok(outcome))`.
    pub fn send_outcome(&self, outcome: RuleOutcome) -> bool {
        self.send(Ok(outcome))
    }

    /// Start a new check. Results of every earlier ticket become stale.
    #[must_use]
    pub fn issue(&self) -> Ticket {
        let generation = self.issued.fetch_add(1, Ordering::AcqRel) + 1;
        Ticket {
            generation,
            tx: self.tx.clone(),
        }
    }
}

impl fmt::Debug for StateSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateSender")
            .field("issued", &self.issued.load(Ordering::Acquire))
            .finish()
    }
}

/// Handle for one in-flight check.
pub struct Ticket {
    generation: u64,
    tx: mpsc::Sender<Envelope>,
}

impl Ticket {
    /// Sequence number of this check; later tickets have larger numbers.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Report the result of this check.
    ///
    /// Returns `false` if the receiving rule is gone. A `true` return does
    /// not mean the result will be shown: it may already be stale.
    pub fn complete(self, result: RuleResult) -> bool {
        self.tx
            .send(Envelope {
                ticket: Some(self.generation),
                result,
            })
            .is_ok()
    }
}

impl fmt::Debug for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ticket")
            .field("generation", &self.generation)
            .finish()
    }
}

struct PumpInner {
    rx: Option<mpsc::Receiver<Envelope>>,
    issued: Arc<AtomicU64>,
    sink: Option<Weak<dyn Fn(RuleResult)>>,
}

/// UI-thread consumer half of an asynchronous check.
///
/// Connect it to an [`ObservableRule`](crate::component::ObservableRule);
/// keep a [`StatePump`] to drive delivery.
pub struct StateChannel {
    pump: StatePump,
}

impl StateChannel {
    /// Create a connected channel/sender pair.
    #[must_use]
    pub fn new() -> (Self, StateSender) {
        let (tx, rx) = mpsc::channel();
        let issued = Arc::new(AtomicU64::new(0));
        let channel = Self {
            pump: StatePump {
                inner: Rc::new(RefCell::new(PumpInner {
                    rx: Some(rx),
                    issued: Arc::clone(&issued),
                    sink: None,
                })),
            },
        };
        (channel, StateSender { tx, issued })
    }

    /// Handle used to deliver pending results.
    #[must_use]
    pub fn pump_handle(&self) -> StatePump {
        self.pump.clone()
    }
}

impl fmt::Debug for StateChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateChannel")
            .field("pump", &self.pump)
            .finish()
    }
}

impl StateSource for StateChannel {
    fn connect(self, sink: StateSink) -> Subscription {
        self.pump.inner.borrow_mut().sink = Some(Rc::downgrade(&sink));
        Subscription::hold(Connection {
            _sink: sink,
            pump: Rc::downgrade(&self.pump.inner),
        })
    }
}

/// Keeps the sink alive and disconnects the channel on release.
struct Connection {
    _sink: StateSink,
    pump: Weak<RefCell<PumpInner>>,
}

impl Drop for Connection {
    fn drop(&mut self) {
        let Some(inner) = self.pump.upgrade() else {
            return;
        };
        if let Ok(mut inner) = inner.try_borrow_mut() {
            inner.rx = None;
            inner.sink = None;
        }
    }
}

/// Drives delivery for a [`StateChannel`]. Cloning shares the channel.
#[derive(Clone)]
pub struct StatePump {
    inner: Rc<RefCell<PumpInner>>,
}

impl StatePump {
    /// Deliver the newest non-stale result, if any.
    ///
    /// Returns `true` when something was delivered. Results received before
    /// the channel is connected stay queued.
    pub fn pump(&self) -> bool {
        let (latest, sink) = {
            let inner = self.inner.borrow();
            let (Some(rx), Some(sink)) = (&inner.rx, inner.sink.as_ref().and_then(Weak::upgrade))
            else {
                return false;
            };
            let newest = inner.issued.load(Ordering::Acquire);
            let mut latest = None;
            let mut stale = 0usize;
            let mut superseded = 0usize;
            for envelope in rx.try_iter() {
                if envelope.ticket.is_some_and(|generation| generation < newest) {
                    stale += 1;
                    continue;
                }
                if latest.is_some() {
                    superseded += 1;
                }
                latest = Some(envelope.result);
            }
            if stale + superseded > 0 {
                tracing::trace!(stale, superseded, "coalesced asynchronous validation results");
            }
            (latest, sink)
        };

        match latest {
            Some(result) => {
                sink(result);
                true
            }
            None => false,
        }
    }

    /// Whether a rule is listening.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        let inner = self.inner.borrow();
        inner.rx.is_some() && inner.sink.as_ref().is_some_and(|s| s.strong_count() > 0)
    }
}

impl fmt::Debug for StatePump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatePump")
            .field("connected", &self.is_connected())
            .finish()
    }
}
