#![forbid(unsafe_code)]

//! Viewport geometry in CSS pixels.
//!
//! [`intersection_ratio`] is the reference computation behind every
//! intersection report: the root rectangle is grown or shrunk by a
//! [`RootMargin`], then intersected with the target.
//!
//! # Invariants
//!
//! 1. A returned ratio is always within `[0, 1]`.
//! 2. Edge-adjacent rectangles intersect (with ratio 0), matching browser
//!    intersection semantics.
//! 3. A zero-area target that touches the root is fully visible (ratio 1).
//! 4. `RootMargin` printing is canonical: parsing the printed form yields
//!    the same margin.

use std::fmt;
use std::str::FromStr;

/// Axis-aligned rectangle. `width`/`height` are never negative.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Create a rectangle; negative sizes are clamped to zero.
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    #[inline]
    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[inline]
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    #[inline]
    #[must_use]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Translate by `(dx, dy)`.
    #[must_use]
    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Overlap of two rectangles. Touching edges yield a zero-area overlap
    /// rather than `None`.
    #[must_use]
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right < left || bottom < top {
            return None;
        }
        Some(Rect::new(left, top, right - left, bottom - top))
    }

    /// Grow (positive) or shrink (negative) each edge by the resolved margin.
    #[must_use]
    pub fn inflate(&self, margin: &RootMargin) -> Self {
        let top = margin.top.resolve(self.height);
        let right = margin.right.resolve(self.width);
        let bottom = margin.bottom.resolve(self.height);
        let left = margin.left.resolve(self.width);
        Rect::new(
            self.x - left,
            self.y - top,
            self.width + left + right,
            self.height + top + bottom,
        )
    }
}

/// Fraction of `target` inside `root` after applying `margin` to the root.
///
/// Returns `None` when the two do not intersect at all.
#[must_use]
pub fn intersection_ratio(target: &Rect, root: &Rect, margin: &RootMargin) -> Option<f64> {
    let root = root.inflate(margin);
    let overlap = target.intersection(&root)?;
    let area = target.area();
    if area <= 0.0 {
        return Some(1.0);
    }
    Some((overlap.area() / area).clamp(0.0, 1.0))
}

// ---------------------------------------------------------------------------
// Lengths and margins
// ---------------------------------------------------------------------------

/// A margin component: absolute pixels or a percentage of the root size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Length {
    Px(f64),
    Percent(f64),
}

impl Default for Length {
    fn default() -> Self {
        Length::Px(0.0)
    }
}

impl Length {
    /// Resolve against the root extent along the same axis.
    #[inline]
    #[must_use]
    pub fn resolve(&self, extent: f64) -> f64 {
        match *self {
            Length::Px(px) => px,
            Length::Percent(pct) => extent * pct / 100.0,
        }
    }

    fn parse(token: &str) -> Result<Self, MarginParseError> {
        let invalid = || MarginParseError::InvalidLength(token.to_string());
        if let Some(num) = token.strip_suffix("px") {
            return num.parse::<f64>().map(Length::Px).map_err(|_| invalid());
        }
        if let Some(num) = token.strip_suffix('%') {
            return num
                .parse::<f64>()
                .map(Length::Percent)
                .map_err(|_| invalid());
        }
        // Unitless zero is the only unitless value CSS accepts here.
        match token.parse::<f64>() {
            Ok(v) if v == 0.0 => Ok(Length::Px(0.0)),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Normalize -0 so printing stays canonical.
        let norm = |v: f64| if v == 0.0 { 0.0 } else { v };
        match *self {
            Length::Px(v) => write!(f, "{}px", norm(v)),
            Length::Percent(v) => write!(f, "{}%", norm(v)),
        }
    }
}

/// Signed offsets applied to the viewport before intersecting, in CSS
/// `margin` shorthand order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RootMargin {
    pub top: Length,
    pub right: Length,
    pub bottom: Length,
    pub left: Length,
}

impl RootMargin {
    /// Same length on every edge.
    #[must_use]
    pub const fn uniform(length: Length) -> Self {
        Self {
            top: length,
            right: length,
            bottom: length,
            left: length,
        }
    }

    /// Only the bottom edge is moved. Negative values trigger later.
    #[must_use]
    pub fn bottom(length: Length) -> Self {
        Self {
            bottom: length,
            ..Self::default()
        }
    }

    /// Whether every edge is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        [self.top, self.right, self.bottom, self.left]
            .iter()
            .all(|l| matches!(l, Length::Px(v) | Length::Percent(v) if *v == 0.0))
    }
}

impl FromStr for RootMargin {
    type Err = MarginParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split_whitespace()
            .map(Length::parse)
            .collect::<Result<Vec<_>, _>>()?;
        match parts.as_slice() {
            [all] => Ok(Self::uniform(*all)),
            [v, h] => Ok(Self {
                top: *v,
                right: *h,
                bottom: *v,
                left: *h,
            }),
            [t, h, b] => Ok(Self {
                top: *t,
                right: *h,
                bottom: *b,
                left: *h,
            }),
            [t, r, b, l] => Ok(Self {
                top: *t,
                right: *r,
                bottom: *b,
                left: *l,
            }),
            _ => Err(MarginParseError::WrongArity(parts.len())),
        }
    }
}

impl fmt::Display for RootMargin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.top, self.right, self.bottom, self.left)
    }
}

/// A root margin string could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarginParseError {
    /// Expected 1 to 4 components.
    WrongArity(usize),
    /// A component was not `<number>px`, `<number>%`, or `0`.
    InvalidLength(String),
}

impl fmt::Display for MarginParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongArity(n) => write!(f, "expected 1-4 margin values, got {n}"),
            Self::InvalidLength(tok) => write!(f, "invalid margin length {tok:?}"),
        }
    }
}

impl std::error::Error for MarginParseError {}
