#![forbid(unsafe_code)]

//! Simulated media element.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};
use std::time::Duration;

use unveil_core::host::{CapabilityError, EventCallback, HostHandle, MediaElement, PlaybackError};

/// One call made on a [`SimVideo`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEvent {
    Play,
    PlayRejected(PlaybackError),
    Pause,
    Seek(Duration),
}

#[derive(Default)]
struct VideoState {
    playing: bool,
    position: Duration,
    reject_play: Option<PlaybackError>,
    events: Vec<MediaEvent>,
    next_listener: u64,
    listeners: BTreeMap<u64, Option<EventCallback>>,
}

/// In-memory video that records every control call. Clones share state.
#[derive(Clone, Default)]
pub struct SimVideo {
    state: Rc<RefCell<VideoState>>,
}

impl std::fmt::Debug for SimVideo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("SimVideo")
            .field("playing", &state.playing)
            .field("position", &state.position)
            .field("events", &state.events)
            .finish_non_exhaustive()
    }
}

impl SimVideo {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later `play()` fail with `error` (autoplay policy).
    pub fn reject_play(&self, error: PlaybackError) {
        self.state.borrow_mut().reject_play = Some(error);
    }

    pub fn allow_play(&self) {
        self.state.borrow_mut().reject_play = None;
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.state.borrow().playing
    }

    #[must_use]
    pub fn position(&self) -> Duration {
        self.state.borrow().position
    }

    /// Simulate playback progress.
    pub fn set_position(&self, position: Duration) {
        self.state.borrow_mut().position = position;
    }

    /// Every control call so far, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<MediaEvent> {
        self.state.borrow().events.clone()
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.state.borrow().listeners.len()
    }

    /// Fire the "data loaded" event.
    pub fn load_data(&self) {
        let ids: Vec<u64> = self.state.borrow().listeners.keys().copied().collect();
        for id in ids {
            let callback = self
                .state
                .borrow_mut()
                .listeners
                .get_mut(&id)
                .and_then(Option::take);
            let Some(mut callback) = callback else {
                continue;
            };
            callback();
            let leftover = match self.state.borrow_mut().listeners.get_mut(&id) {
                Some(slot) => {
                    *slot = Some(callback);
                    None
                }
                None => Some(callback),
            };
            drop(leftover);
        }
    }
}

impl MediaElement for SimVideo {
    fn play(&self) -> Result<(), PlaybackError> {
        let mut state = self.state.borrow_mut();
        if let Some(err) = state.reject_play.clone() {
            state.events.push(MediaEvent::PlayRejected(err.clone()));
            return Err(err);
        }
        state.playing = true;
        state.events.push(MediaEvent::Play);
        Ok(())
    }

    fn pause(&self) {
        let mut state = self.state.borrow_mut();
        state.playing = false;
        state.events.push(MediaEvent::Pause);
    }

    fn seek(&self, position: Duration) {
        let mut state = self.state.borrow_mut();
        state.position = position;
        state.events.push(MediaEvent::Seek(position));
    }

    fn on_data_loaded(&self, callback: EventCallback) -> Result<HostHandle, CapabilityError> {
        let id = {
            let mut state = self.state.borrow_mut();
            state.next_listener += 1;
            let id = state.next_listener;
            state.listeners.insert(id, Some(callback));
            id
        };
        let weak: Weak<RefCell<VideoState>> = Rc::downgrade(&self.state);
        Ok(HostHandle::new(move || {
            if let Some(state) = weak.upgrade() {
                let removed = state.borrow_mut().listeners.remove(&id);
                drop(removed);
            }
        }))
    }
}
