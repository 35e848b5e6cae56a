#![forbid(unsafe_code)]

//! Reveal gated on media readiness.
//!
//! Hero sections over a background video animate in only once the section
//! is revealed *and* the video is ready (or its wait has run out). Both
//! inputs are latches, so the gated value is a latch too.

use unveil_core::host::IntersectionHost;

use crate::reactive::Derived;
use crate::readiness::MediaReadiness;
use crate::reveal::RevealSubscription;

/// `section revealed && media ready`, kept current as either input moves.
pub fn gated_reveal<H>(section: &RevealSubscription<H>, media: &MediaReadiness) -> Derived<bool>
where
    H: IntersectionHost + Clone + 'static,
{
    Derived::new(&section.signal(), &media.signal(), |phase, readiness| {
        phase.is_revealed() && readiness.is_ready()
    })
}
