#![forbid(unsafe_code)]

//! Values derived from two signals.
//!
//! A [`Derived<T>`] subscribes to both sources and recomputes eagerly on
//! every change, so it can itself be observed. Dropping it unsubscribes
//! from both sources.

use std::fmt;
use std::rc::Rc;

use super::observable::{Observable, Signal, Subscription};

/// Eagerly recomputed combination of two signals.
pub struct Derived<T> {
    value: Observable<T>,
    _subs: [Subscription; 2],
}

impl<T: fmt::Debug> fmt::Debug for Derived<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Derived")
            .field("value", &self.value)
            .finish_non_exhaustive()
    }
}

impl<T: Clone + PartialEq + 'static> Derived<T> {
    /// Combine `a` and `b` with `map`.
    pub fn new<A, B>(a: &Signal<A>, b: &Signal<B>, map: impl Fn(&A, &B) -> T + 'static) -> Self
    where
        A: Clone + PartialEq + 'static,
        B: Clone + PartialEq + 'static,
    {
        let map: Rc<dyn Fn(&A, &B) -> T> = Rc::new(map);
        let value = Observable::new(a.with(|va| b.with(|vb| map(va, vb))));

        let (out, other, f) = (value.clone(), b.clone(), Rc::clone(&map));
        let sub_a = a.subscribe(move |va| {
            out.set(other.with(|vb| f(va, vb)));
        });

        let (out, other, f) = (value.clone(), a.clone(), map);
        let sub_b = b.subscribe(move |vb| {
            out.set(other.with(|va| f(va, vb)));
        });

        Self {
            value,
            _subs: [sub_a, sub_b],
        }
    }

    #[must_use]
    pub fn get(&self) -> T {
        self.value.get()
    }

    /// Read-only handle to the derived value.
    #[must_use]
    pub fn signal(&self) -> Signal<T> {
        self.value.signal()
    }

    /// Subscribe to changes of the derived value.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        self.value.subscribe(callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn initial_value_is_computed() {
        let a = Observable::new(true);
        let b = Observable::new(false);
        let both = Derived::new(&a.signal(), &b.signal(), |x, y| *x && *y);
        assert!(!both.get());
    }

    #[test]
    fn recomputes_on_either_side() {
        let a = Observable::new(false);
        let b = Observable::new(false);
        let both = Derived::new(&a.signal(), &b.signal(), |x, y| *x && *y);
        a.set(true);
        assert!(!both.get());
        b.set(true);
        assert!(both.get());
        a.set(false);
        assert!(!both.get());
    }

    #[test]
    fn notifies_only_on_result_change() {
        let a = Observable::new(0);
        let b = Observable::new(0);
        let sum_positive = Derived::new(&a.signal(), &b.signal(), |x, y| x + y > 0);
        let count = Rc::new(Cell::new(0u32));
        let c = Rc::clone(&count);
        let _sub = sum_positive.subscribe(move |_| c.set(c.get() + 1));
        a.set(1);
        b.set(2);
        a.set(5);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn dropping_detaches_from_sources() {
        let a = Observable::new(false);
        let b = Observable::new(false);
        let derived = Derived::new(&a.signal(), &b.signal(), |x, y| *x || *y);
        let signal = derived.signal();
        drop(derived);
        a.set(true);
        assert!(!signal.get());
    }
}
