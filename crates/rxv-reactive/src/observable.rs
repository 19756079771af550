#![forbid(unsafe_code)]

//! Shared, version-tracked values with change notification.
//!
//! # Design
//!
//! [`Observable<T>`] keeps its value, a version counter and its subscriber
//! list behind one `Rc<RefCell<..>>`. Subscribers are stored as `Weak`
//! callbacks; the strong half lives in the [`Subscription`] returned to the
//! caller, so dropping the guard is all it takes to unsubscribe. Dead entries
//! are pruned on the next mutation or registration.
//!
//! [`Signal<T>`] is a read-only handle onto the same storage, handed out to
//! consumers that may observe but must not write.
//!
//! # Invariants
//!
//! 1. `version()` increments exactly once per `set` that changes the value.
//! 2. Setting a value equal to the current value is a no-op.
//! 3. Subscribers are notified in registration order.
//! 4. A subscription released during a notification cycle receives no
//!    further callbacks, including later ones in the same cycle.
//! 5. A re-entrant `set` from inside a callback supersedes the outer cycle:
//!    callbacks that have not yet seen the older value skip it, so every
//!    subscriber observes values in mutation order.
//!
//! # Failure Modes
//!
//! - **Callback panics**: the panic unwinds through `set`. The value has
//!   already been stored and the version bumped.
//! - **`with` closure calls `set` on the same observable**: panics with a
//!   `RefCell` borrow error.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

type Callback<T> = dyn Fn(&T);

struct ObservableInner<T> {
    value: T,
    version: u64,
    subscribers: Vec<Weak<Callback<T>>>,
}

/// A shared value with change notification.
///
/// Cloning an `Observable` creates a new handle to the **same** value.
pub struct Observable<T> {
    inner: Rc<RefCell<ObservableInner<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}

impl<T: Default + Clone + PartialEq + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Create an observable holding `value` at version 0.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ObservableInner {
                value,
                version: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Borrow the current value for the duration of `f`.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Replace the value, notifying subscribers if it changed.
    pub fn set(&self, value: T) {
        let (callbacks, version) = {
            let mut inner = self.inner.borrow_mut();
            if inner.value == value {
                return;
            }
            inner.value = value;
            inner.version += 1;
            inner.subscribers.retain(|weak| weak.strong_count() > 0);
            let callbacks: Vec<Rc<Callback<T>>> =
                inner.subscribers.iter().filter_map(Weak::upgrade).collect();
            (callbacks, inner.version)
        };
        self.notify(callbacks, version);
    }

    /// Mutate a copy of the value in place and store it with [`set`](Self::set).
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let mut value = self.get();
        f(&mut value);
        self.set(value);
    }

    /// Register `callback` for future changes.
    ///
    /// The callback is not invoked for the current value; use
    /// [`watch`](Self::watch) for current-then-future delivery.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let callback: Rc<Callback<T>> = Rc::new(callback);
        self.register(&callback);
        Subscription::from_callback(callback)
    }

    /// Register `callback` and immediately invoke it with the current value.
    pub fn watch(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let callback: Rc<Callback<T>> = Rc::new(callback);
        self.register(&callback);
        let current = self.get();
        callback(&current);
        Subscription::from_callback(callback)
    }

    fn register(&self, callback: &Rc<Callback<T>>) {
        let mut inner = self.inner.borrow_mut();
        inner.subscribers.retain(|weak| weak.strong_count() > 0);
        inner.subscribers.push(Rc::downgrade(callback));
    }

    /// Number of mutations that changed the value.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .borrow()
            .subscribers
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    /// Read-only handle onto this observable.
    #[must_use]
    pub fn signal(&self) -> Signal<T> {
        Signal {
            source: self.clone(),
        }
    }

    fn notify(&self, callbacks: Vec<Rc<Callback<T>>>, version: u64) {
        let value = self.get();
        for callback in callbacks {
            // A nested set already delivered a newer value to everyone.
            if self.version() != version {
                break;
            }
            // Only our local clone is left: the subscription was released
            // earlier in this cycle.
            if Rc::strong_count(&callback) == 1 {
                continue;
            }
            callback(&value);
        }
    }
}

/// Read-only view of an [`Observable`].
///
/// A `Signal` can read and subscribe but never write. Cloning creates a new
/// handle to the same source.
pub struct Signal<T> {
    source: Observable<T>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Signal").field(&self.source).finish()
    }
}

impl<T: Clone + PartialEq + 'static> Signal<T> {
    /// Clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.source.get()
    }

    /// Borrow the current value for the duration of `f`.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.source.with(f)
    }

    /// Register `callback` for future changes.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        self.source.subscribe(callback)
    }

    /// Register `callback` and immediately invoke it with the current value.
    pub fn watch(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        self.source.watch(callback)
    }

    /// Version of the underlying observable.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.source.version()
    }

    /// Number of live subscribers on the underlying observable.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.source.subscriber_count()
    }
}

impl<T: Clone + PartialEq + 'static> From<&Observable<T>> for Signal<T> {
    fn from(source: &Observable<T>) -> Self {
        source.signal()
    }
}

/// RAII guard for a registered callback.
///
/// Dropping the guard (or calling [`unsubscribe`](Self::unsubscribe))
/// releases the callback. Several guards can be merged with
/// [`join`](Self::join) so one handle controls a group.
#[must_use = "dropping a Subscription unsubscribes its callback"]
pub struct Subscription {
    guard: Option<Box<dyn Any>>,
}

impl Subscription {
    fn from_callback<T: 'static>(callback: Rc<Callback<T>>) -> Self {
        Self {
            guard: Some(Box::new(callback)),
        }
    }

    /// A subscription that holds nothing.
    pub fn empty() -> Self {
        Self { guard: None }
    }

    /// Keep `guard` alive until the subscription is released.
    ///
    /// Use this to expose a custom release action (a `Drop` impl) through
    /// the same handle type as observable callbacks.
    pub fn hold<G: 'static>(guard: G) -> Self {
        Self {
            guard: Some(Box::new(guard)),
        }
    }

    /// Merge several subscriptions into one guard.
    pub fn join(subscriptions: Vec<Subscription>) -> Self {
        Self {
            guard: Some(Box::new(subscriptions)),
        }
    }

    /// Release the callback now. Calling this again is a no-op.
    ///
    /// Returns `true` if this call released something.
    pub fn unsubscribe(&mut self) -> bool {
        self.guard.take().is_some()
    }

    /// Whether the guard still holds its callback.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.guard.is_some()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
