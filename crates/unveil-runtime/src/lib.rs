#![forbid(unsafe_code)]

//! Viewport-driven reveal and media-readiness engine.
//!
//! Components publish their state as read-only [`Signal`]s:
//!
//! | Component | Signal | Moves |
//! |-----------|--------|-------|
//! | [`RevealSubscription`] | `RevealPhase` | once, hidden to revealed |
//! | [`ResponsiveMode`] | `bool` (is desktop) | on every breakpoint crossing |
//! | [`MediaReadiness`] | `Readiness` | once, pending to ready |
//! | [`AutoplayItem`] | `PlaybackState` | on every threshold crossing |
//!
//! Everything is single-threaded and callback driven. The host (browser or
//! simulator) is reached only through the capability traits in
//! [`unveil_core::host`]; every registration returns a
//! [`HostHandle`](unveil_core::HostHandle) that the owning component drops
//! on teardown.
//!
//! # Example
//!
//! ```ignore
//! let tracker = RevealTracker::new(host.clone());
//! let header = tracker.observe(Some(&header_el), RevealConfig::new().threshold(0.25));
//! let video = MediaReadiness::track(&host, Duration::from_millis(2000));
//! video.bind_media(&desktop_video);
//! let hero = gated_reveal(&header, &video);
//! ```

pub mod autoplay;
pub mod gated;
pub mod motion;
pub mod reactive;
pub mod readiness;
pub mod responsive;
pub mod reveal;

pub use autoplay::{AutoplayController, AutoplayItem, MediaKind, PlaybackState};
pub use gated::gated_reveal;
pub use motion::ReducedMotion;
pub use reactive::{Derived, Observable, Signal, Subscription};
pub use readiness::{MediaReadiness, ReadyCause, Readiness};
pub use responsive::{MediaQuerySignal, ResponsiveMode};
pub use reveal::{RevealCause, RevealPhase, RevealSubscription, RevealTracker};
