#![forbid(unsafe_code)]

//! Test harness for unveil.
//!
//! # Role in unveil
//! The runtime state machines are generic over the host capability traits
//! in `unveil-core`. This crate implements those traits deterministically
//! so tests can scroll, resize, and advance time step by step and observe
//! exactly which callbacks ran.
//!
//! - [`SimHost`]: document, viewport, clock, timers, frames, media queries.
//! - [`SimVideo`]: a media element that records its control calls.
//! - [`init_test_tracing`]: route `tracing` output to the test writer.

pub mod sim_host;
pub mod sim_video;

pub use sim_host::{SimCapabilities, SimElement, SimHost};
pub use sim_video::{MediaEvent, SimVideo};

/// Install a `tracing` subscriber that writes through the test harness.
///
/// Filtered by `RUST_LOG` (default `warn`). Safe to call from every test;
/// only the first call installs anything.
pub fn init_test_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(filter)
        .try_init();
}
