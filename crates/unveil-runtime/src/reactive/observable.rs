#![forbid(unsafe_code)]

//! Observable value wrapper with change notification and version tracking.
//!
//! # Design
//!
//! [`Observable<T>`] wraps a value of type `T` in shared, reference-counted
//! storage (`Rc<RefCell<..>>`). When the value changes (determined by
//! `PartialEq`), all live subscribers are notified in registration order.
//!
//! Components keep the `Observable` private and hand out [`Signal`]s. That
//! is how the one-way latches stay one-way: only the component's own
//! transition guard can call `set`.
//!
//! # Failure Modes
//!
//! - **Re-entrant set**: A subscriber may call `set()` on the same
//!   observable; notifications are dispatched after the borrow is released,
//!   so the nested change is delivered in a nested notification cycle.
//! - **Subscriber leak**: If `Subscription` guards are stored indefinitely
//!   without being dropped, callbacks accumulate. Dead weak references are
//!   pruned on every `subscribe()` and `notify()`.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

type CallbackRc<T> = Rc<dyn Fn(&T)>;
type CallbackWeak<T> = Weak<dyn Fn(&T)>;

struct ObservableInner<T> {
    value: T,
    version: u64,
    /// Subscribers stored as weak references. Dead entries are pruned on
    /// subscribe and notify.
    subscribers: Vec<CallbackWeak<T>>,
}

/// A shared, version-tracked value with change notification.
///
/// Cloning an `Observable` creates a new handle to the **same** inner state.
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
            .field("subscriber_count", &inner.subscribers.len())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Create a new observable. The initial version is 0.
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

    /// Get a clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Access the current value by reference without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Set a new value. Returns `true` if the value changed (and
    /// subscribers were notified).
    pub fn set(&self, value: T) -> bool {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.value == value {
                return false;
            }
            inner.value = value;
            inner.version += 1;
        }
        self.notify();
        true
    }

    /// Subscribe to value changes.
    ///
    /// The callback is not invoked for the current value, only for later
    /// changes. Dropping the returned guard unsubscribes. Dead entries are
    /// pruned here as well as in `notify()`, so a value that never changes
    /// does not accumulate them.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let strong: CallbackRc<T> = Rc::new(callback);
        let weak = Rc::downgrade(&strong);
        let mut inner = self.inner.borrow_mut();
        inner.subscribers.retain(|w| w.strong_count() > 0);
        inner.subscribers.push(weak);
        Subscription {
            _guard: Box::new(strong),
        }
    }

    /// Current version number.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Number of registered subscribers (including dead ones not yet pruned).
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    /// Read-only handle to this observable.
    #[must_use]
    pub fn signal(&self) -> Signal<T> {
        Signal {
            source: self.clone(),
        }
    }

    fn notify(&self) {
        let (callbacks, value): (Vec<CallbackRc<T>>, T) = {
            let mut inner = self.inner.borrow_mut();
            inner.subscribers.retain(|w| w.strong_count() > 0);
            let live = inner
                .subscribers
                .iter()
                .filter_map(|w| w.upgrade())
                .collect();
            (live, inner.value.clone())
        };
        for cb in &callbacks {
            cb(&value);
        }
    }
}

// ---------------------------------------------------------------------------
// Signal
// ---------------------------------------------------------------------------

/// Read-only view of an [`Observable`].
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
        let inner = self.source.inner.borrow();
        f.debug_struct("Signal")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Signal<T> {
    /// A signal that never changes.
    #[must_use]
    pub fn constant(value: T) -> Self {
        Observable::new(value).signal()
    }

    #[must_use]
    pub fn get(&self) -> T {
        self.source.get()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.source.with(f)
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.source.version()
    }

    /// Subscribe to changes; see [`Observable::subscribe`].
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        self.source.subscribe(callback)
    }
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// RAII guard for a subscriber callback.
///
/// Dropping the `Subscription` drops the strong `Rc` of the callback, so the
/// `Weak` in the observable's subscriber list fails to upgrade on the next
/// notification cycle.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    _guard: Box<dyn std::any::Any>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn set_reports_change() {
        let obs = Observable::new(false);
        assert!(obs.set(true));
        assert!(!obs.set(true));
        assert_eq!(obs.version(), 1);
    }

    #[test]
    fn subscriber_sees_each_change_once() {
        let obs = Observable::new(0u8);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        let _sub = obs.subscribe(move |v| log.borrow_mut().push(*v));

        obs.set(1);
        obs.set(1);
        obs.set(2);
        assert_eq!(*seen.borrow(), vec![1, 2]);
    }

    #[test]
    fn subscribe_does_not_replay_current_value() {
        let obs = Observable::new(true);
        let count = Rc::new(Cell::new(0u32));
        let c = Rc::clone(&count);
        let _sub = obs.subscribe(move |_| c.set(c.get() + 1));
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn dropped_subscription_is_silent_and_pruned() {
        let obs = Observable::new(0);
        let count = Rc::new(Cell::new(0u32));
        let c = Rc::clone(&count);
        let sub = obs.subscribe(move |_| c.set(c.get() + 1));
        obs.set(1);
        drop(sub);
        assert_eq!(obs.subscriber_count(), 1);
        obs.set(2);
        assert_eq!(count.get(), 1);
        assert_eq!(obs.subscriber_count(), 0);
    }

    #[test]
    fn churn_without_changes_stays_bounded() {
        let obs = Observable::new(false);
        for _ in 0..10_000 {
            let _sub = obs.subscribe(|_| {});
        }
        assert!(obs.subscriber_count() <= 1);

        let _kept = obs.subscribe(|_| {});
        assert_eq!(obs.subscriber_count(), 1);
        assert_eq!(obs.version(), 0);
    }

    #[test]
    fn notification_order_is_registration_order() {
        let obs = Observable::new(0);
        let log = Rc::new(RefCell::new(Vec::new()));
        let l1 = Rc::clone(&log);
        let _a = obs.subscribe(move |_| l1.borrow_mut().push('A'));
        let l2 = Rc::clone(&log);
        let _b = obs.subscribe(move |_| l2.borrow_mut().push('B'));
        obs.set(1);
        assert_eq!(*log.borrow(), vec!['A', 'B']);
    }

    #[test]
    fn signal_tracks_source() {
        let obs = Observable::new("hidden");
        let signal = obs.signal();
        obs.set("revealed");
        assert_eq!(signal.get(), "revealed");
        assert_eq!(signal.version(), 1);
    }

    #[test]
    fn signal_subscription_fires() {
        let obs = Observable::new(false);
        let signal = obs.signal();
        let hit = Rc::new(Cell::new(false));
        let h = Rc::clone(&hit);
        let _sub = signal.subscribe(move |v| h.set(*v));
        obs.set(true);
        assert!(hit.get());
    }

    #[test]
    fn constant_signal_never_changes() {
        let signal = Signal::constant(7);
        assert_eq!(signal.get(), 7);
        assert_eq!(signal.version(), 0);
    }

    #[test]
    fn nested_set_from_subscriber() {
        let obs = Observable::new(0);
        let inner = obs.clone();
        let _sub = obs.subscribe(move |v| {
            if *v == 1 {
                inner.set(2);
            }
        });
        obs.set(1);
        assert_eq!(obs.get(), 2);
        assert_eq!(obs.version(), 2);
    }

    #[test]
    fn debug_format() {
        let dbg = format!("{:?}", Observable::new(42));
        assert!(dbg.contains("Observable"));
        assert!(dbg.contains("42"));
        let dbg = format!("{:?}", Signal::constant(true));
        assert!(dbg.contains("Signal"));
    }
}
