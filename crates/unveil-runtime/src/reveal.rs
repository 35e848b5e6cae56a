#![forbid(unsafe_code)]

//! Viewport reveal tracking.
//!
//! A [`RevealSubscription`] answers one question for one element: has its
//! entrance animation been triggered yet? The answer is a one-way latch,
//! modeled as a two-state machine:
//!
//! ```text
//!   Hidden ──(report meets threshold | reduce motion | no intersection support)──▶ Revealed
//! ```
//!
//! There is no edge back to `Hidden`. Re-mounting the same logical element
//! means creating a new subscription, which starts hidden again.
//!
//! # Lifecycle
//!
//! - Created by [`RevealTracker::observe`], with or without a target.
//! - A missing target leaves the subscription hidden until
//!   [`attach`](RevealSubscription::attach) supplies one.
//! - Once revealed, observation stops and the target is released; the
//!   latch cannot move again.
//! - Dropping the subscription releases the host observer. Reports that
//!   arrive afterwards find no live state and are ignored.
//!
//! # Failure Modes
//!
//! | Condition | Outcome |
//! |-----------|---------|
//! | Host lacks intersection support | Revealed immediately (fail open) |
//! | Target never attached | Stays hidden, no observer registered |
//! | Report after drop | Ignored |

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, trace, warn};
use unveil_core::config::RevealConfig;
use unveil_core::host::{HostHandle, IntersectionEntry, IntersectionHost, IntersectionOptions};

use crate::reactive::{Observable, Signal, Subscription};

/// Why a subscription left the hidden state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealCause {
    /// An intersection report met the threshold.
    Intersection,
    /// Motion is reduced; the animation is skipped.
    ReduceMotion,
    /// The host cannot observe intersections.
    Unsupported,
}

/// State of the reveal latch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RevealPhase {
    #[default]
    Hidden,
    Revealed(RevealCause),
}

impl RevealPhase {
    #[must_use]
    pub fn is_revealed(self) -> bool {
        matches!(self, RevealPhase::Revealed(_))
    }
}

/// The only writer of a reveal phase. `Hidden -> Revealed` is the single
/// permitted transition.
#[derive(Clone)]
struct RevealLatch {
    phase: Observable<RevealPhase>,
}

impl RevealLatch {
    fn new() -> Self {
        Self {
            phase: Observable::new(RevealPhase::Hidden),
        }
    }

    fn is_revealed(&self) -> bool {
        self.phase.with(|p| p.is_revealed())
    }

    /// Returns `true` if this call performed the transition.
    fn reveal(&self, cause: RevealCause) -> bool {
        if self.is_revealed() {
            return false;
        }
        self.phase.set(RevealPhase::Revealed(cause))
    }
}

struct RevealState<H: IntersectionHost> {
    host: H,
    config: RevealConfig,
    target: Option<H::Target>,
    observer: Option<HostHandle>,
}

/// Creates reveal subscriptions against one host.
#[derive(Debug, Clone)]
pub struct RevealTracker<H> {
    host: H,
}

impl<H> RevealTracker<H>
where
    H: IntersectionHost + Clone + 'static,
{
    pub fn new(host: H) -> Self {
        Self { host }
    }

    /// Start tracking `target` (which may not be attached yet).
    ///
    /// With `config.reduce_motion` set the subscription is revealed before
    /// this returns and no observer is registered.
    pub fn observe(
        &self,
        target: Option<&H::Target>,
        config: RevealConfig,
    ) -> RevealSubscription<H> {
        let sub = RevealSubscription {
            state: Rc::new(RefCell::new(RevealState {
                host: self.host.clone(),
                config,
                target: target.cloned(),
                observer: None,
            })),
            latch: RevealLatch::new(),
            follow: None,
        };
        if config.reduce_motion {
            sub.latch.reveal(RevealCause::ReduceMotion);
            release_target(&sub.state);
            debug!("reveal skipped: reduce motion");
        } else {
            start_observing(&sub.state, &sub.latch);
        }
        sub
    }
}

/// One observed element and its reveal latch.
pub struct RevealSubscription<H: IntersectionHost> {
    state: Rc<RefCell<RevealState<H>>>,
    latch: RevealLatch,
    /// Keeps a reduce-motion source subscription alive.
    follow: Option<Subscription>,
}

impl<H: IntersectionHost> fmt::Debug for RevealSubscription<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("RevealSubscription")
            .field("phase", &self.latch.phase.get())
            .field("attached", &state.target.is_some())
            .field(
                "observing",
                &state.observer.as_ref().is_some_and(HostHandle::is_active),
            )
            .finish()
    }
}

impl<H> RevealSubscription<H>
where
    H: IntersectionHost + Clone + 'static,
{
    /// Whether the element has been revealed.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.latch.is_revealed()
    }

    #[must_use]
    pub fn phase(&self) -> RevealPhase {
        self.latch.phase.get()
    }

    /// Read-only, observable reveal phase.
    #[must_use]
    pub fn signal(&self) -> Signal<RevealPhase> {
        self.latch.phase.signal()
    }

    /// Invoke `callback` when the element is revealed.
    pub fn on_reveal(&self, callback: impl Fn(RevealCause) + 'static) -> Subscription {
        self.latch.phase.subscribe(move |phase| {
            if let RevealPhase::Revealed(cause) = *phase {
                callback(cause);
            }
        })
    }

    #[must_use]
    pub fn config(&self) -> RevealConfig {
        self.state.borrow().config
    }

    /// Whether a host observer is currently registered and live.
    #[must_use]
    pub fn is_observing(&self) -> bool {
        self.state
            .borrow()
            .observer
            .as_ref()
            .is_some_and(HostHandle::is_active)
    }

    /// Whether a target element is currently held.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.state.borrow().target.is_some()
    }

    /// Supply (or replace) the target element.
    ///
    /// Any previous observer is released. Already revealed subscriptions
    /// ignore the target.
    pub fn attach(&self, target: &H::Target) {
        if self.latch.is_revealed() {
            return;
        }
        let previous = {
            let mut state = self.state.borrow_mut();
            state.target = Some(target.clone());
            state.observer.take()
        };
        drop(previous);
        if !self.latch.is_revealed() && !self.state.borrow().config.reduce_motion {
            start_observing(&self.state, &self.latch);
        }
    }

    /// The target went away. Observation stops; the latch is untouched.
    pub fn detach(&self) {
        let previous = {
            let mut state = self.state.borrow_mut();
            state.target = None;
            state.observer.take()
        };
        drop(previous);
    }

    /// Update the reduce-motion flag. Turning it on reveals immediately;
    /// turning it off never hides a revealed element.
    pub fn set_reduce_motion(&self, reduce: bool) {
        apply_reduce_motion(&self.state, &self.latch, reduce);
    }

    /// Follow `reduce` for the lifetime of this subscription.
    pub fn bind_reduce_motion(&mut self, reduce: &Signal<bool>) {
        self.set_reduce_motion(reduce.get());
        let state = Rc::downgrade(&self.state);
        let latch = self.latch.clone();
        self.follow = Some(reduce.subscribe(move |&reduce| {
            if let Some(state) = state.upgrade() {
                apply_reduce_motion(&state, &latch, reduce);
            }
        }));
    }
}

fn apply_reduce_motion<H>(state: &Rc<RefCell<RevealState<H>>>, latch: &RevealLatch, reduce: bool)
where
    H: IntersectionHost + Clone + 'static,
{
    let changed = {
        let mut state = state.borrow_mut();
        let changed = state.config.reduce_motion != reduce;
        state.config.reduce_motion = reduce;
        changed
    };
    if !changed {
        return;
    }
    if reduce {
        if latch.reveal(RevealCause::ReduceMotion) {
            debug!("reveal forced: reduce motion enabled");
        }
        release_target(state);
    } else if !latch.is_revealed() {
        start_observing(state, latch);
    }
}

fn start_observing<H>(state: &Rc<RefCell<RevealState<H>>>, latch: &RevealLatch)
where
    H: IntersectionHost + Clone + 'static,
{
    if latch.is_revealed() {
        return;
    }
    let (host, target, config) = {
        let state = state.borrow();
        let Some(target) = state.target.clone() else {
            trace!("reveal target not attached yet");
            return;
        };
        (state.host.clone(), target, state.config)
    };
    let options = IntersectionOptions::new(config.threshold).root_margin(config.root_margin);
    let callback = report_handler(Rc::downgrade(state), latch.clone(), config.threshold);

    match host.observe(&target, &options, callback) {
        Ok(handle) => {
            if latch.is_revealed() {
                // The host reported synchronously and the latch already moved.
                drop(handle);
                release_target(state);
                return;
            }
            state.borrow_mut().observer = Some(handle);
        }
        Err(err) => {
            warn!(%err, "intersection observation unavailable, revealing");
            latch.reveal(RevealCause::Unsupported);
            release_target(state);
        }
    }
}

/// Drop the observer and the target once the latch has moved.
fn release_target<H: IntersectionHost>(state: &Rc<RefCell<RevealState<H>>>) {
    let released = {
        let mut state = state.borrow_mut();
        (state.observer.take(), state.target.take())
    };
    drop(released);
}

fn report_handler<H>(
    state: Weak<RefCell<RevealState<H>>>,
    latch: RevealLatch,
    threshold: f64,
) -> Box<dyn FnMut(IntersectionEntry)>
where
    H: IntersectionHost + 'static,
{
    Box::new(move |entry: IntersectionEntry| {
        let Some(state) = state.upgrade() else {
            return;
        };
        trace!(ratio = entry.ratio, threshold, "reveal report");
        if !entry.meets(threshold) || !latch.reveal(RevealCause::Intersection) {
            return;
        }
        debug!(ratio = entry.ratio, "element revealed");
        // Stop observing without freeing the closure that is running now.
        let target = {
            let mut state = state.borrow_mut();
            if let Some(observer) = state.observer.as_mut() {
                observer.cancel();
            }
            state.target.take()
        };
        drop(target);
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latch_moves_once() {
        let latch = RevealLatch::new();
        assert!(latch.reveal(RevealCause::Intersection));
        assert!(!latch.reveal(RevealCause::ReduceMotion));
        assert_eq!(
            latch.phase.get(),
            RevealPhase::Revealed(RevealCause::Intersection)
        );
        assert_eq!(latch.phase.version(), 1);
    }

    #[test]
    fn default_phase_is_hidden() {
        assert!(!RevealPhase::default().is_revealed());
    }
}
