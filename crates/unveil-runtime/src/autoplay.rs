#![forbid(unsafe_code)]

//! Autoplay-on-visibility.
//!
//! An [`AutoplayItem`] plays its media while most of its container is in
//! view and pauses it otherwise. Pausing also rewinds to the start, so an
//! item that scrolled away half-watched restarts from zero when it comes
//! back.
//!
//! ```text
//!            meets threshold
//!   Idle ───────────────────────▶ Playing
//!    │                             │    ▲
//!    │ below threshold             │    │ meets threshold
//!    ▼                             ▼    │
//!   Paused ◀──────────────────────────────
//! ```
//!
//! Items are independent; nothing limits how many play at once.
//!
//! # Failure Modes
//!
//! | Condition | Outcome |
//! |-----------|---------|
//! | Host refuses `play()` | Logged, state still `Playing`, no retry |
//! | Host lacks intersection support | Item stays `Idle`, media never autoplays |
//! | Report after drop | Ignored |

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use tracing::{debug, trace, warn};
use unveil_core::config::DEFAULT_AUTOPLAY_THRESHOLD;
use unveil_core::host::{
    HostHandle, IntersectionEntry, IntersectionHost, IntersectionOptions, MediaElement,
};

use crate::reactive::{Observable, Signal, Subscription};

/// Playback state driven by visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// No report delivered yet.
    #[default]
    Idle,
    Playing,
    Paused,
}

/// Kind of a gallery item, parsed from its `format` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Image,
}

impl MediaKind {
    /// `"video"` (any case) is a video; everything else is a still.
    #[must_use]
    pub fn parse(format: &str) -> Self {
        if format.trim().eq_ignore_ascii_case("video") {
            Self::Video
        } else {
            Self::Image
        }
    }

    #[must_use]
    pub fn autoplays(self) -> bool {
        self == Self::Video
    }
}

struct ItemState<M> {
    media: M,
    playback: Observable<PlaybackState>,
    observer: RefCell<Option<HostHandle>>,
}

/// Attaches autoplay behavior to media items on one host.
#[derive(Debug, Clone)]
pub struct AutoplayController<H> {
    host: H,
    threshold: f64,
}

impl<H: IntersectionHost> AutoplayController<H> {
    /// Controller with the default majority-visible threshold.
    pub fn new(host: H) -> Self {
        Self::with_threshold(host, DEFAULT_AUTOPLAY_THRESHOLD)
    }

    pub fn with_threshold(host: H, threshold: f64) -> Self {
        Self {
            host,
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Drive `media` from the visibility of `container`.
    pub fn attach<M>(&self, container: &H::Target, media: M) -> AutoplayItem<M>
    where
        M: MediaElement + 'static,
    {
        let state = Rc::new(ItemState {
            media,
            playback: Observable::new(PlaybackState::Idle),
            observer: RefCell::new(None),
        });
        let options = IntersectionOptions::new(self.threshold);
        let callback = report_handler(Rc::downgrade(&state), self.threshold);
        match self.host.observe(container, &options, callback) {
            Ok(handle) => *state.observer.borrow_mut() = Some(handle),
            Err(err) => warn!(%err, "intersection observation unavailable, autoplay disabled"),
        }
        AutoplayItem { state }
    }

    /// Attach only when `kind` autoplays. Images get no controller.
    pub fn attach_item<M>(
        &self,
        kind: MediaKind,
        container: &H::Target,
        media: M,
    ) -> Option<AutoplayItem<M>>
    where
        M: MediaElement + 'static,
    {
        kind.autoplays().then(|| self.attach(container, media))
    }
}

fn report_handler<M>(
    state: Weak<ItemState<M>>,
    threshold: f64,
) -> Box<dyn FnMut(IntersectionEntry)>
where
    M: MediaElement + 'static,
{
    Box::new(move |entry: IntersectionEntry| {
        let Some(state) = state.upgrade() else {
            return;
        };
        trace!(ratio = entry.ratio, threshold, "autoplay report");
        if entry.meets(threshold) {
            if let Err(err) = state.media.play() {
                debug!(%err, "play refused");
            }
            if state.playback.set(PlaybackState::Playing) {
                debug!(ratio = entry.ratio, "autoplay started");
            }
        } else {
            state.media.pause();
            state.media.seek(Duration::ZERO);
            if state.playback.set(PlaybackState::Paused) {
                debug!(ratio = entry.ratio, "autoplay paused");
            }
        }
    })
}

/// One media item under autoplay control. Dropping it stops observation.
pub struct AutoplayItem<M> {
    state: Rc<ItemState<M>>,
}

impl<M> fmt::Debug for AutoplayItem<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoplayItem")
            .field("playback", &self.state.playback.get())
            .finish_non_exhaustive()
    }
}

impl<M: MediaElement> AutoplayItem<M> {
    #[must_use]
    pub fn playback(&self) -> PlaybackState {
        self.state.playback.get()
    }

    #[must_use]
    pub fn signal(&self) -> Signal<PlaybackState> {
        self.state.playback.signal()
    }

    pub fn on_change(&self, callback: impl Fn(PlaybackState) + 'static) -> Subscription {
        self.state.playback.subscribe(move |&state| callback(state))
    }

    #[must_use]
    pub fn is_observing(&self) -> bool {
        self.state
            .observer
            .borrow()
            .as_ref()
            .is_some_and(HostHandle::is_active)
    }

    /// Borrow the controlled media element.
    pub fn with_media<R>(&self, f: impl FnOnce(&M) -> R) -> R {
        f(&self.state.media)
    }
}
