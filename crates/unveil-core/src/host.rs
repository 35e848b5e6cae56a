#![forbid(unsafe_code)]

//! Host capability traits.
//!
//! The engine never talks to a browser (or any other environment) directly.
//! Everything it consumes is named here:
//!
//! | Capability | Trait | Typical browser backing |
//! |------------|-------|-------------------------|
//! | Viewport intersection | [`IntersectionHost`] | `IntersectionObserver` |
//! | Viewport class | [`MediaQueryHost`] | `matchMedia` + `change` listener |
//! | Time | [`Scheduler`] | `setTimeout`, `requestAnimationFrame` |
//! | Playable media | [`MediaElement`] | `HTMLVideoElement` |
//!
//! # Registrations
//!
//! Every registration returns a [`HostHandle`]. Dropping the handle releases
//! the registration (unobserve, remove listener, clear timer). A handle can
//! also be [`cancel`](HostHandle::cancel)ed early while still owning the
//! resources backing it; this is what a callback uses to stop its own
//! observation without freeing the closure that is currently running.
//!
//! # Threading
//!
//! All capabilities are single-threaded. Callbacks are plain boxed closures
//! and are dispatched by the host's event loop, never concurrently.

use std::any::Any;
use std::fmt;
use std::time::Duration;

use crate::geometry::RootMargin;
use crate::media_query::MediaQuery;

/// Callback receiving intersection reports for one observed target.
pub type IntersectionCallback = Box<dyn FnMut(IntersectionEntry)>;
/// Callback receiving the new match state of a media query.
pub type MatchCallback = Box<dyn FnMut(bool)>;
/// One-shot callback for timers and animation frames.
pub type TaskCallback = Box<dyn FnOnce()>;
/// Repeating callback for element events.
pub type EventCallback = Box<dyn FnMut()>;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A host could not provide a capability.
///
/// Components treat every variant as "fail open": content is shown, media
/// is left alone, and the error is logged rather than surfaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    /// The environment does not implement the named capability at all.
    Unsupported(&'static str),
    /// The target element is not attached to a document.
    Detached,
    /// The host reported an error while registering.
    Host(String),
}

impl fmt::Display for CapabilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsupported(name) => write!(f, "capability unsupported: {name}"),
            Self::Detached => write!(f, "target is not attached"),
            Self::Host(msg) => write!(f, "host error: {msg}"),
        }
    }
}

impl std::error::Error for CapabilityError {}

/// A playback start request was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    /// Autoplay policy denied the request (`NotAllowedError`).
    NotAllowed,
    /// The media source cannot be played (`NotSupportedError`).
    NotSupported,
    /// The start was interrupted by a pause or source change (`AbortError`).
    Aborted,
    /// Anything else the host reported.
    Other(String),
}

impl fmt::Display for PlaybackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAllowed => f.write_str("playback not allowed"),
            Self::NotSupported => f.write_str("media not supported"),
            Self::Aborted => f.write_str("playback aborted"),
            Self::Other(msg) => write!(f, "playback failed: {msg}"),
        }
    }
}

impl std::error::Error for PlaybackError {}

// ---------------------------------------------------------------------------
// HostHandle
// ---------------------------------------------------------------------------

/// RAII guard for a host registration.
///
/// # Invariants
///
/// 1. The cancel action runs at most once.
/// 2. Dropping an active handle runs the cancel action before the owned
///    resources are released.
/// 3. After [`cancel`](Self::cancel), the resources stay alive until drop.
#[must_use = "dropping a HostHandle releases the registration immediately"]
pub struct HostHandle {
    cancel: Option<Box<dyn FnOnce()>>,
    /// Keeps host-side objects (closures, observers) alive. Dropped after
    /// the cancel action has run.
    _resources: Option<Box<dyn Any>>,
}

impl HostHandle {
    /// Handle whose release runs `cancel`.
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
            _resources: None,
        }
    }

    /// Handle that also owns `resources` until it is dropped.
    pub fn with_resources(cancel: impl FnOnce() + 'static, resources: impl Any) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
            _resources: Some(Box::new(resources)),
        }
    }

    /// Handle for a registration that holds nothing.
    pub fn noop() -> Self {
        Self {
            cancel: None,
            _resources: None,
        }
    }

    /// Release the registration now. Idempotent.
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    /// Whether the registration is still live.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }
}

impl Drop for HostHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for HostHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostHandle")
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Intersection
// ---------------------------------------------------------------------------

/// One intersection report for an observed target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionEntry {
    /// Fraction of the target's area inside the (margin-adjusted) viewport.
    pub ratio: f64,
    /// Whether the target overlaps the viewport at all.
    pub is_intersecting: bool,
    /// Host timestamp of the report.
    pub time: Duration,
}

impl IntersectionEntry {
    /// Report with `is_intersecting` derived from `ratio`.
    #[must_use]
    pub fn from_ratio(ratio: f64, time: Duration) -> Self {
        let ratio = ratio.clamp(0.0, 1.0);
        Self {
            ratio,
            is_intersecting: ratio > 0.0,
            time,
        }
    }

    /// Whether this report counts as visible at `threshold`.
    ///
    /// A threshold of 0 means "any overlap", so a non-intersecting report
    /// never meets it even though its ratio equals 0.
    #[must_use]
    pub fn meets(&self, threshold: f64) -> bool {
        self.is_intersecting && self.ratio >= threshold
    }
}

/// Observation parameters for [`IntersectionHost::observe`].
#[derive(Debug, Clone, PartialEq)]
pub struct IntersectionOptions {
    /// Ratios at which the host must deliver a report when crossed.
    pub thresholds: Vec<f64>,
    /// Inset/outset applied to the viewport before intersecting.
    pub root_margin: RootMargin,
}

impl IntersectionOptions {
    /// Options with a single threshold and no margin.
    #[must_use]
    pub fn new(threshold: f64) -> Self {
        Self {
            thresholds: vec![threshold.clamp(0.0, 1.0)],
            root_margin: RootMargin::default(),
        }
    }

    /// Replace the root margin.
    #[must_use]
    pub fn root_margin(mut self, margin: RootMargin) -> Self {
        self.root_margin = margin;
        self
    }
}

/// Viewport-intersection observation.
pub trait IntersectionHost {
    /// Element reference understood by this host.
    type Target: Clone + 'static;

    /// Start observing `target`. The host delivers an initial report soon
    /// after registration and another whenever a threshold is crossed.
    fn observe(
        &self,
        target: &Self::Target,
        options: &IntersectionOptions,
        callback: IntersectionCallback,
    ) -> Result<HostHandle, CapabilityError>;
}

// ---------------------------------------------------------------------------
// Media queries, time, media
// ---------------------------------------------------------------------------

/// Viewport-class evaluation and change notification.
pub trait MediaQueryHost {
    /// Evaluate `query` now.
    fn matches(&self, query: &MediaQuery) -> Result<bool, CapabilityError>;

    /// Invoke `callback` with the new match state whenever it flips.
    fn listen(
        &self,
        query: &MediaQuery,
        callback: MatchCallback,
    ) -> Result<HostHandle, CapabilityError>;
}

/// Monotonic timers and render-frame scheduling.
pub trait Scheduler {
    /// Current monotonic time.
    fn now(&self) -> Duration;

    /// Run `callback` once after `delay`.
    fn set_timeout(
        &self,
        delay: Duration,
        callback: TaskCallback,
    ) -> Result<HostHandle, CapabilityError>;

    /// Run `callback` before the next paint.
    fn request_frame(&self, callback: TaskCallback) -> Result<HostHandle, CapabilityError>;
}

/// A playable media element.
pub trait MediaElement {
    /// Start or resume playback. Hosts may refuse.
    fn play(&self) -> Result<(), PlaybackError>;

    /// Pause playback.
    fn pause(&self);

    /// Move the playback position.
    fn seek(&self, position: Duration);

    /// Invoke `callback` when enough data is buffered to show a frame.
    fn on_data_loaded(&self, callback: EventCallback) -> Result<HostHandle, CapabilityError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn handle_cancels_once_on_drop() {
        let count = Rc::new(Cell::new(0u32));
        let c = Rc::clone(&count);
        let handle = HostHandle::new(move || c.set(c.get() + 1));
        assert!(handle.is_active());
        drop(handle);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn early_cancel_is_idempotent() {
        let count = Rc::new(Cell::new(0u32));
        let c = Rc::clone(&count);
        let mut handle = HostHandle::new(move || c.set(c.get() + 1));
        handle.cancel();
        handle.cancel();
        assert!(!handle.is_active());
        drop(handle);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn resources_outlive_cancel() {
        let marker = Rc::new(());
        let weak = Rc::downgrade(&marker);
        let mut handle = HostHandle::with_resources(|| {}, marker);
        handle.cancel();
        assert!(weak.upgrade().is_some());
        drop(handle);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn noop_handle_is_inactive() {
        assert!(!HostHandle::noop().is_active());
    }

    #[test]
    fn zero_threshold_requires_overlap() {
        let none = IntersectionEntry::from_ratio(0.0, Duration::ZERO);
        assert!(!none.meets(0.0));
        let some = IntersectionEntry::from_ratio(0.01, Duration::ZERO);
        assert!(some.meets(0.0));
    }

    #[test]
    fn meets_is_inclusive() {
        let entry = IntersectionEntry::from_ratio(0.4, Duration::ZERO);
        assert!(entry.meets(0.4));
        assert!(!entry.meets(0.41));
    }

    #[test]
    fn options_clamp_threshold() {
        assert_eq!(IntersectionOptions::new(1.5).thresholds, vec![1.0]);
        assert_eq!(IntersectionOptions::new(-0.2).thresholds, vec![0.0]);
    }

    #[test]
    fn error_display() {
        assert_eq!(
            CapabilityError::Unsupported("IntersectionObserver").to_string(),
            "capability unsupported: IntersectionObserver"
        );
        assert_eq!(PlaybackError::NotAllowed.to_string(), "playback not allowed");
    }
}
