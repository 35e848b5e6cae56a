#![forbid(unsafe_code)]

//! Media queries the engine evaluates.
//!
//! Only the handful of predicates the reveal engine needs are modeled. Each
//! renders to the exact CSS text a browser `matchMedia` call expects, and
//! can be evaluated directly against a simulated environment.

use std::fmt;

/// Logical-pixel width at which the layout switches to desktop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Breakpoint(pub u32);

impl Breakpoint {
    /// The `md` breakpoint used by the site's layout.
    pub const DESKTOP: Breakpoint = Breakpoint(768);

    /// Query matching viewports at or above this breakpoint.
    #[must_use]
    pub const fn query(self) -> MediaQuery {
        MediaQuery::MinWidth(self.0)
    }
}

impl Default for Breakpoint {
    fn default() -> Self {
        Self::DESKTOP
    }
}

/// A single media-query predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaQuery {
    /// `(min-width: Npx)`
    MinWidth(u32),
    /// `(max-width: Npx)`
    MaxWidth(u32),
    /// `(prefers-reduced-motion: reduce)`
    PrefersReducedMotion,
}

impl MediaQuery {
    /// Evaluate against explicit environment values.
    #[must_use]
    pub fn evaluate(&self, viewport_width: f64, prefers_reduced_motion: bool) -> bool {
        match *self {
            MediaQuery::MinWidth(px) => viewport_width >= f64::from(px),
            MediaQuery::MaxWidth(px) => viewport_width <= f64::from(px),
            MediaQuery::PrefersReducedMotion => prefers_reduced_motion,
        }
    }
}

impl fmt::Display for MediaQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaQuery::MinWidth(px) => write!(f, "(min-width: {px}px)"),
            MediaQuery::MaxWidth(px) => write!(f, "(max-width: {px}px)"),
            MediaQuery::PrefersReducedMotion => f.write_str("(prefers-reduced-motion: reduce)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn css_text() {
        assert_eq!(Breakpoint::DESKTOP.query().to_string(), "(min-width: 768px)");
        assert_eq!(MediaQuery::MaxWidth(480).to_string(), "(max-width: 480px)");
        assert_eq!(
            MediaQuery::PrefersReducedMotion.to_string(),
            "(prefers-reduced-motion: reduce)"
        );
    }

    #[test]
    fn min_width_is_inclusive() {
        let q = Breakpoint::DESKTOP.query();
        assert!(!q.evaluate(767.0, false));
        assert!(q.evaluate(768.0, false));
        assert!(q.evaluate(900.0, false));
    }

    #[test]
    fn reduced_motion_ignores_width() {
        let q = MediaQuery::PrefersReducedMotion;
        assert!(q.evaluate(0.0, true));
        assert!(!q.evaluate(2000.0, false));
    }
}
