#![forbid(unsafe_code)]

//! Reactive property primitives for rxv.
//!
//! This crate is the host side of the validation engine: view-model
//! properties are [`Observable`] values, and everything downstream reacts to
//! their change notifications.
//!
//! - [`Observable`]: A shared, version-tracked value wrapper with change
//!   notification via subscriber callbacks.
//! - [`Signal`]: A read-only handle onto an `Observable`.
//! - [`Subscription`]: RAII guard that automatically unsubscribes on drop.
//!
//! # Architecture
//!
//! `Observable<T>` uses `Rc<RefCell<..>>` for single-threaded shared ownership.
//! Subscribers are stored as `Weak` function pointers and cleaned up lazily
//! during notification.
//!
//! # Invariants
//!
//! 1. Version increments exactly once per mutation that changes the value.
//! 2. Subscribers are notified in registration order.
//! 3. Setting a value equal to the current value is a no-op (no version bump,
//!    no notifications). This is the distinct-until-changed filter every
//!    downstream consumer relies on.
//! 4. Dropping a [`Subscription`] removes the callback before the next
//!    notification.

pub mod observable;

pub use observable::{Observable, Signal, Subscription};
