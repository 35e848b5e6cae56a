#![forbid(unsafe_code)]

//! Reduce-motion signal.
//!
//! Combines the desktop breakpoint and the user's reduced-motion preference
//! under a [`MotionPolicy`] into the single flag reveal subscriptions follow
//! via [`RevealSubscription::bind_reduce_motion`](crate::reveal::RevealSubscription::bind_reduce_motion).

use std::fmt;

use unveil_core::config::MotionPolicy;
use unveil_core::host::{MediaQueryHost, Scheduler};
use unveil_core::media_query::{Breakpoint, MediaQuery};

use crate::reactive::{Derived, Signal, Subscription};
use crate::responsive::{MediaQuerySignal, ResponsiveMode};

/// Live reduce-motion flag.
pub struct ReducedMotion {
    policy: MotionPolicy,
    value: Derived<bool>,
    _sources: Option<(ResponsiveMode, MediaQuerySignal)>,
}

impl fmt::Debug for ReducedMotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReducedMotion")
            .field("policy", &self.policy)
            .field("reduce", &self.value.get())
            .finish_non_exhaustive()
    }
}

impl ReducedMotion {
    /// Track both environment signals on `host`.
    pub fn new<H>(host: &H, breakpoint: Breakpoint, policy: MotionPolicy) -> Self
    where
        H: MediaQueryHost + Scheduler + Clone + 'static,
    {
        let desktop = ResponsiveMode::with_breakpoint(host, breakpoint);
        let prefers = MediaQuerySignal::new(host, MediaQuery::PrefersReducedMotion);
        let value = Self::combine(&desktop.signal(), &prefers.signal(), policy);
        Self {
            policy,
            value,
            _sources: Some((desktop, prefers)),
        }
    }

    /// Combine signals owned elsewhere (e.g. a page-wide `ResponsiveMode`).
    pub fn from_signals(
        is_desktop: &Signal<bool>,
        prefers_reduced: &Signal<bool>,
        policy: MotionPolicy,
    ) -> Self {
        Self {
            policy,
            value: Self::combine(is_desktop, prefers_reduced, policy),
            _sources: None,
        }
    }

    fn combine(
        is_desktop: &Signal<bool>,
        prefers_reduced: &Signal<bool>,
        policy: MotionPolicy,
    ) -> Derived<bool> {
        Derived::new(is_desktop, prefers_reduced, move |&desktop, &prefers| {
            policy.reduce_motion(desktop, prefers)
        })
    }

    #[must_use]
    pub fn policy(&self) -> MotionPolicy {
        self.policy
    }

    #[must_use]
    pub fn current(&self) -> bool {
        self.value.get()
    }

    #[must_use]
    pub fn signal(&self) -> Signal<bool> {
        self.value.signal()
    }

    pub fn on_change(&self, callback: impl Fn(bool) + 'static) -> Subscription {
        self.value.subscribe(move |&reduce| callback(reduce))
    }
}
