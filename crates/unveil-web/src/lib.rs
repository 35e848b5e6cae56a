#![forbid(unsafe_code)]

//! Browser bindings for unveil.
//!
//! [`WebHost`] implements the intersection, media-query, and scheduler
//! capabilities over `window`; [`WebVideo`] implements the media element
//! capability over `<video>`. On native targets only the conversion rules
//! in [`convert`] are built, which keeps them testable without a browser.

pub mod convert;

#[cfg(target_arch = "wasm32")]
mod web;

#[cfg(target_arch = "wasm32")]
pub use web::{WebHost, WebVideo, config_from_dataset};
