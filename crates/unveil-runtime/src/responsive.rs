#![forbid(unsafe_code)]

//! Responsive mode signal.
//!
//! [`MediaQuerySignal`] tracks one media query as an observable boolean.
//! [`ResponsiveMode`] is the desktop-breakpoint instance the page layer
//! consumes as `isDesktop`.
//!
//! # Initial Read
//!
//! A read taken during construction may run before layout is final. The
//! value read then is *provisional*; the authoritative read is deferred to
//! the next render frame. Until that frame (or the first host change
//! event) arrives, [`is_settled`](MediaQuerySignal::is_settled) is `false`.
//!
//! # Failure Modes
//!
//! | Condition | Outcome |
//! |-----------|---------|
//! | Host cannot evaluate queries | Value stays `false`, settled immediately |
//! | Host cannot notify changes | Value is read once and never updates |
//! | Host has no frame scheduling | Authoritative read happens at construction |
//! | Change event after drop | Ignored |

use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, trace, warn};
use unveil_core::host::{HostHandle, MediaQueryHost, Scheduler};
use unveil_core::media_query::{Breakpoint, MediaQuery};

use crate::reactive::{Observable, Signal, Subscription};

struct SignalState {
    query: MediaQuery,
    value: Observable<bool>,
    settled: Cell<bool>,
}

impl SignalState {
    fn update(&self, matches: bool, source: &'static str) {
        self.settled.set(true);
        if self.value.set(matches) {
            debug!(query = %self.query, matches, source, "media query changed");
        } else {
            trace!(query = %self.query, matches, source, "media query unchanged");
        }
    }
}

/// Live boolean view of one media query.
pub struct MediaQuerySignal {
    state: Rc<SignalState>,
    _listener: Option<HostHandle>,
    _frame: Option<HostHandle>,
}

impl fmt::Debug for MediaQuerySignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaQuerySignal")
            .field("query", &self.state.query)
            .field("matches", &self.state.value.get())
            .field("settled", &self.state.settled.get())
            .finish_non_exhaustive()
    }
}

impl MediaQuerySignal {
    /// Start tracking `query` on `host`.
    pub fn new<H>(host: &H, query: MediaQuery) -> Self
    where
        H: MediaQueryHost + Scheduler + Clone + 'static,
    {
        let provisional = match host.matches(&query) {
            Ok(matches) => Some(matches),
            Err(err) => {
                warn!(%query, %err, "media query unavailable, assuming no match");
                None
            }
        };
        let state = Rc::new(SignalState {
            query,
            value: Observable::new(provisional.unwrap_or(false)),
            settled: Cell::new(provisional.is_none()),
        });
        if provisional.is_none() {
            return Self {
                state,
                _listener: None,
                _frame: None,
            };
        }

        let weak = Rc::downgrade(&state);
        let listener = match host.listen(
            &query,
            Box::new(move |matches| {
                if let Some(state) = weak.upgrade() {
                    state.update(matches, "change");
                }
            }),
        ) {
            Ok(handle) => Some(handle),
            Err(err) => {
                warn!(%query, %err, "media query changes unavailable, value is fixed");
                None
            }
        };

        let frame = Self::schedule_settle(host, Rc::downgrade(&state));
        Self {
            state,
            _listener: listener,
            _frame: frame,
        }
    }

    fn schedule_settle<H>(host: &H, weak: Weak<SignalState>) -> Option<HostHandle>
    where
        H: MediaQueryHost + Scheduler + Clone + 'static,
    {
        let reader = host.clone();
        let settle_from = weak.clone();
        let settle = Box::new(move || {
            let Some(state) = settle_from.upgrade() else {
                return;
            };
            match reader.matches(&state.query) {
                Ok(matches) => state.update(matches, "frame"),
                Err(_) => state.settled.set(true),
            }
        });
        match host.request_frame(settle) {
            Ok(handle) => Some(handle),
            Err(err) => {
                trace!(%err, "no frame scheduling, settling now");
                if let Some(state) = weak.upgrade() {
                    match host.matches(&state.query) {
                        Ok(matches) => state.update(matches, "construct"),
                        Err(_) => state.settled.set(true),
                    }
                }
                None
            }
        }
    }

    /// Current match state.
    #[must_use]
    pub fn current(&self) -> bool {
        self.state.value.get()
    }

    /// Whether an authoritative read has happened yet.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.state.settled.get()
    }

    #[must_use]
    pub fn query(&self) -> MediaQuery {
        self.state.query
    }

    /// Read-only, observable match state.
    #[must_use]
    pub fn signal(&self) -> Signal<bool> {
        self.state.value.signal()
    }

    /// Invoke `callback` once per change of the match state.
    pub fn on_change(&self, callback: impl Fn(bool) + 'static) -> Subscription {
        self.state.value.subscribe(move |&matches| callback(matches))
    }
}

/// Desktop / mobile layout signal.
#[derive(Debug)]
pub struct ResponsiveMode {
    breakpoint: Breakpoint,
    signal: MediaQuerySignal,
}

impl ResponsiveMode {
    /// Track the standard desktop breakpoint.
    pub fn new<H>(host: &H) -> Self
    where
        H: MediaQueryHost + Scheduler + Clone + 'static,
    {
        Self::with_breakpoint(host, Breakpoint::DESKTOP)
    }

    pub fn with_breakpoint<H>(host: &H, breakpoint: Breakpoint) -> Self
    where
        H: MediaQueryHost + Scheduler + Clone + 'static,
    {
        Self {
            breakpoint,
            signal: MediaQuerySignal::new(host, breakpoint.query()),
        }
    }

    #[must_use]
    pub fn current_is_desktop(&self) -> bool {
        self.signal.current()
    }

    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.signal.is_settled()
    }

    #[must_use]
    pub fn breakpoint(&self) -> Breakpoint {
        self.breakpoint
    }

    #[must_use]
    pub fn signal(&self) -> Signal<bool> {
        self.signal.signal()
    }

    pub fn on_change(&self, callback: impl Fn(bool) + 'static) -> Subscription {
        self.signal.on_change(callback)
    }
}
