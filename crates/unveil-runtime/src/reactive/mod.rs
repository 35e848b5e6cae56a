#![forbid(unsafe_code)]

//! Reactive values for the reveal engine.
//!
//! This module provides the change-tracking primitives every component
//! publishes its state through:
//!
//! - [`Observable`]: A shared, version-tracked value wrapper with change
//!   notification via subscriber callbacks. Owned by the component that
//!   mutates it.
//! - [`Signal`]: A read-only handle to an `Observable`, handed to callers so
//!   they can read and subscribe but never write.
//! - [`Subscription`]: RAII guard that automatically unsubscribes on drop.
//! - [`Derived`]: A value recomputed from two signals whenever either
//!   changes (e.g. "media ready AND section revealed").
//!
//! # Architecture
//!
//! `Observable<T>` uses `Rc<RefCell<..>>` for single-threaded shared ownership.
//! Subscribers are stored as `Weak` function pointers and pruned on subscribe
//! and during notification.
//!
//! # Invariants
//!
//! 1. Version increments exactly once per mutation that changes the value.
//! 2. Subscribers are notified in registration order.
//! 3. Setting a value equal to the current value is a no-op (no version bump,
//!    no notifications).
//! 4. Dropping a [`Subscription`] removes the callback before the next
//!    notification cycle.
//! 5. A [`Signal`] can never change the value it views.

pub mod derived;
pub mod observable;

pub use derived::Derived;
pub use observable::{Observable, Signal, Subscription};
