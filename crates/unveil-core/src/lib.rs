#![forbid(unsafe_code)]

//! Core: host capabilities, viewport geometry, and engine configuration.
//!
//! # Role in unveil
//! `unveil-core` is the boundary layer. It names everything the engine
//! needs from its environment (intersection reports, media queries, timers,
//! playable media) as traits, and owns the pure math and configuration that
//! the stateful components in `unveil-runtime` are built on.
//!
//! # Primary responsibilities
//! - **Host capabilities**: [`host::IntersectionHost`], [`host::MediaQueryHost`],
//!   [`host::Scheduler`], [`host::MediaElement`], and the RAII
//!   [`host::HostHandle`] every registration returns.
//! - **Geometry**: [`geometry::Rect`], [`geometry::RootMargin`], and
//!   intersection ratio computation.
//! - **Media queries**: [`media_query::MediaQuery`] and breakpoints.
//! - **Configuration**: [`config::EngineConfig`] and [`config::RevealConfig`].
//!
//! # How it fits in the system
//! The runtime (`unveil-runtime`) is generic over the capability traits.
//! The browser bindings (`unveil-web`) and the deterministic simulator
//! (`unveil-harness`) implement them, so the same state machines run in
//! production and under test.

pub mod config;
pub mod geometry;
pub mod host;
pub mod media_query;

pub use config::{ConfigError, EngineConfig, MotionPolicy, RevealConfig};
pub use geometry::{Length, MarginParseError, Rect, RootMargin, intersection_ratio};
pub use host::{
    CapabilityError, HostHandle, IntersectionEntry, IntersectionHost, IntersectionOptions,
    MediaElement, MediaQueryHost, PlaybackError, Scheduler,
};
pub use media_query::{Breakpoint, MediaQuery};
