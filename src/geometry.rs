//! Geometry: frame-relative coordinates and bounding boxes.
//!
//! DESIGN
//! ======
//! Board items are positioned by their centre. Template children store an
//! offset from the owning frame's top-left corner, so converting between the
//! two only needs the frame's centre and size. Every function here refuses
//! non-finite input by returning `None` (or skipping the item) instead of
//! letting NaN leak into board coordinates. Values pass through unchanged:
//! no rounding, no clamping.

use serde::Serialize;

// =============================================================================
// TYPES
// =============================================================================

/// A point on the board plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Centre-anchored rectangle, the way the board reports frames and items.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    /// Top-left corner, or `None` when any field is non-finite.
    #[must_use]
    pub fn top_left(&self) -> Option<Point> {
        if !self.is_finite() {
            return None;
        }
        Some(Point::new(self.x - self.width / 2.0, self.y - self.height / 2.0))
    }

    /// Inclusive containment test for a centre point.
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        let Some(tl) = self.top_left() else {
            return false;
        };
        point.is_finite()
            && point.x >= tl.x
            && point.x <= tl.x + self.width
            && point.y >= tl.y
            && point.y <= tl.y + self.height
    }
}

// =============================================================================
// NORMALIZER
// =============================================================================

/// Frame-relative offset → absolute board position.
#[must_use]
pub fn to_absolute(frame: &Rect, relative: Point) -> Option<Point> {
    if !relative.is_finite() {
        return None;
    }
    let origin = frame.top_left()?;
    let abs = Point::new(origin.x + relative.x, origin.y + relative.y);
    abs.is_finite().then_some(abs)
}

/// Absolute board position → offset from the frame's top-left corner.
#[must_use]
pub fn to_relative(frame: &Rect, absolute: Point) -> Option<Point> {
    if !absolute.is_finite() {
        return None;
    }
    let origin = frame.top_left()?;
    let rel = Point::new(absolute.x - origin.x, absolute.y - origin.y);
    rel.is_finite().then_some(rel)
}

// =============================================================================
// BOUNDING BOX
// =============================================================================

/// Returned when nothing contributed to a bounding box.
pub const FALLBACK_BOUNDS: Bounds =
    Bounds { min_x: 0.0, min_y: 0.0, width: 1000.0, height: 1000.0, center_y: 0.0, fallback: true };

/// Axis-aligned enclosing rectangle, top-left anchored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub width: f64,
    pub height: f64,
    pub center_y: f64,
    #[serde(skip)]
    fallback: bool,
}

impl Bounds {
    /// True only for [`FALLBACK_BOUNDS`]; a real box with the same numbers is
    /// not a fallback.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }
}

/// Running min/max accumulator. `merge` is associative and commutative, with
/// `Extent::EMPTY` as identity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Extent {
    pub const EMPTY: Self =
        Self { min_x: f64::INFINITY, max_x: f64::NEG_INFINITY, min_y: f64::INFINITY, max_y: f64::NEG_INFINITY };

    /// Extent of a single centre-anchored rect, `None` if it is non-finite.
    #[must_use]
    pub fn of(rect: &Rect) -> Option<Self> {
        if !rect.is_finite() {
            return None;
        }
        let (hw, hh) = (rect.width / 2.0, rect.height / 2.0);
        Some(Self { min_x: rect.x - hw, max_x: rect.x + hw, min_y: rect.y - hh, max_y: rect.y + hh })
    }

    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            max_x: self.max_x.max(other.max_x),
            min_y: self.min_y.min(other.min_y),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Add one item; non-finite items leave the extent untouched.
    #[must_use]
    pub fn include(self, rect: &Rect) -> Self {
        match Self::of(rect) {
            Some(e) => self.merge(e),
            None => self,
        }
    }

    /// `None` while nothing finite has been included.
    #[must_use]
    pub fn to_bounds(self) -> Option<Bounds> {
        let finite = [self.min_x, self.max_x, self.min_y, self.max_y]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return None;
        }
        Some(Bounds {
            min_x: self.min_x,
            min_y: self.min_y,
            width: self.max_x - self.min_x,
            height: self.max_y - self.min_y,
            center_y: f64::midpoint(self.min_y, self.max_y),
            fallback: false,
        })
    }
}

/// Minimal rectangle enclosing every finite item, `None` when no item
/// contributed.
pub fn try_bounding_box<'a>(items: impl IntoIterator<Item = &'a Rect>) -> Option<Bounds> {
    items
        .into_iter()
        .fold(Extent::EMPTY, Extent::include)
        .to_bounds()
}

/// Like [`try_bounding_box`] but returns [`FALLBACK_BOUNDS`] when nothing
/// contributed.
pub fn bounding_box<'a>(items: impl IntoIterator<Item = &'a Rect>) -> Bounds {
    try_bounding_box(items).unwrap_or(FALLBACK_BOUNDS)
}

#[cfg(test)]
#[path = "geometry_test.rs"]
mod tests;
