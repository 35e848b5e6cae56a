#![forbid(unsafe_code)]

//! Media readiness gate.
//!
//! Media load events are unreliable across devices and networks, so a
//! reveal that waits for its background video must not wait forever. A
//! [`MediaReadiness`] gate settles on whichever comes first:
//!
//! - an explicit [`mark_loaded`](MediaReadiness::mark_loaded) (usually wired
//!   to the media element's "data loaded" event), or
//! - the fallback timer started at creation.
//!
//! # Invariants
//!
//! 1. `is_ready == loaded || timed_out`, and the first source wins.
//! 2. Once ready, the gate never becomes pending again.
//! 3. Settling cancels the pending timer; later `mark_loaded` calls are no-ops.
//! 4. Dropping the gate cancels the timer and every media listener. A
//!    callback that still fires afterwards changes nothing.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use tracing::{debug, warn};
use unveil_core::host::{HostHandle, MediaElement, Scheduler};

use crate::reactive::{Observable, Signal, Subscription};

/// What made the gate ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyCause {
    /// The media reported enough buffered data.
    Loaded,
    /// The bounded wait elapsed first.
    TimedOut,
}

/// Gate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Readiness {
    #[default]
    Pending,
    Ready(ReadyCause),
}

impl Readiness {
    #[must_use]
    pub fn is_ready(self) -> bool {
        matches!(self, Readiness::Ready(_))
    }
}

struct GateState {
    readiness: Observable<Readiness>,
    timer: RefCell<Option<HostHandle>>,
    media: RefCell<Vec<HostHandle>>,
}

impl GateState {
    /// First-result-wins settle. Returns `true` if this call settled.
    fn settle(&self, cause: ReadyCause) -> bool {
        if self.readiness.with(|r| r.is_ready()) {
            return false;
        }
        self.readiness.set(Readiness::Ready(cause));
        debug!(?cause, "media gate ready");
        // Cancel rather than drop: this may run inside the timer callback.
        if let Some(timer) = self.timer.borrow_mut().as_mut() {
            timer.cancel();
        }
        true
    }
}

/// Readiness of one media resource, bounded by a maximum wait.
pub struct MediaReadiness {
    state: Rc<GateState>,
    max_wait: Duration,
}

impl fmt::Debug for MediaReadiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaReadiness")
            .field("readiness", &self.state.readiness.get())
            .field("max_wait", &self.max_wait)
            .finish_non_exhaustive()
    }
}

impl MediaReadiness {
    /// Create a gate and start its fallback countdown.
    ///
    /// If the scheduler cannot provide a timer the gate is ready at once.
    pub fn track<S: Scheduler>(scheduler: &S, max_wait: Duration) -> Self {
        let state = Rc::new(GateState {
            readiness: Observable::new(Readiness::Pending),
            timer: RefCell::new(None),
            media: RefCell::new(Vec::new()),
        });
        let weak: Weak<GateState> = Rc::downgrade(&state);
        let fallback = Box::new(move || {
            if let Some(state) = weak.upgrade() {
                state.settle(ReadyCause::TimedOut);
            }
        });
        match scheduler.set_timeout(max_wait, fallback) {
            Ok(handle) => *state.timer.borrow_mut() = Some(handle),
            Err(err) => {
                warn!(%err, "no timer for media gate, treating media as ready");
                state.settle(ReadyCause::TimedOut);
            }
        }
        Self { state, max_wait }
    }

    /// Report that the media has buffered enough to display. Returns `true`
    /// if this call made the gate ready.
    pub fn mark_loaded(&self) -> bool {
        self.state.settle(ReadyCause::Loaded)
    }

    /// Wire a media element's "data loaded" event to this gate. Several
    /// elements may feed one gate; the first to load wins.
    pub fn bind_media<M: MediaElement>(&self, media: &M) {
        if self.is_ready() {
            return;
        }
        let weak = Rc::downgrade(&self.state);
        let listener = media.on_data_loaded(Box::new(move || {
            if let Some(state) = weak.upgrade() {
                state.settle(ReadyCause::Loaded);
            }
        }));
        match listener {
            Ok(handle) => self.state.media.borrow_mut().push(handle),
            Err(err) => debug!(%err, "media load event unavailable, relying on timer"),
        }
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state.readiness.with(|r| r.is_ready())
    }

    #[must_use]
    pub fn readiness(&self) -> Readiness {
        self.state.readiness.get()
    }

    /// Read-only, observable gate state.
    #[must_use]
    pub fn signal(&self) -> Signal<Readiness> {
        self.state.readiness.signal()
    }

    /// Invoke `callback` when the gate becomes ready.
    pub fn on_ready(&self, callback: impl Fn(ReadyCause) + 'static) -> Subscription {
        self.state.readiness.subscribe(move |r| {
            if let Readiness::Ready(cause) = *r {
                callback(cause);
            }
        })
    }

    #[must_use]
    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    /// Whether the fallback timer is still pending.
    #[must_use]
    pub fn timer_pending(&self) -> bool {
        self.state
            .timer
            .borrow()
            .as_ref()
            .is_some_and(HostHandle::is_active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readiness_default_is_pending() {
        assert!(!Readiness::default().is_ready());
        assert!(Readiness::Ready(ReadyCause::Loaded).is_ready());
    }

    #[test]
    fn settle_is_first_wins() {
        let state = GateState {
            readiness: Observable::new(Readiness::Pending),
            timer: RefCell::new(None),
            media: RefCell::new(Vec::new()),
        };
        assert!(state.settle(ReadyCause::Loaded));
        assert!(!state.settle(ReadyCause::TimedOut));
        assert_eq!(
            state.readiness.get(),
            Readiness::Ready(ReadyCause::Loaded)
        );
    }
}
