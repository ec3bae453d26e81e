//! Geometry primitives: the rectangular areas content is flowed into.

use serde::Serialize;

/// Comparison slack for floating point fits.
pub const TOLERANCE: f64 = 1e-6;

/// An axis-aligned rectangle in y-down page coordinates. A height of
/// `f64::INFINITY` marks an unbounded area (table cells being measured).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rectangle {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rectangle {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn unbounded(x: f64, y: f64, width: f64) -> Self {
        Self::new(x, y, width, f64::INFINITY)
    }

    pub fn is_unbounded(&self) -> bool {
        self.height.is_infinite()
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Shrink from the top by `dy`, keeping the bottom edge in place.
    pub fn lower(&self, dy: f64) -> Rectangle {
        let dy = dy.min(self.height).max(0.0);
        Rectangle::new(self.x, self.y + dy, self.width, self.height - dy)
    }

    /// The bounding box of both rectangles.
    ///
    /// Known approximation: two disjoint areas unite to their bounding box
    /// rather than a true rectangle union. Layout decisions downstream are
    /// made against this box.
    pub fn unite(&self, other: &Rectangle) -> Rectangle {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rectangle::new(x, y, right - x, bottom - y)
    }

    /// The widest rectangle of `height` starting at `y` that lies inside
    /// this area, or `None` when it would run past the bottom.
    pub fn fitting_rect(&self, y: f64, height: f64) -> Option<Rectangle> {
        if y + height > self.bottom() + TOLERANCE {
            return None;
        }
        Some(Rectangle::new(self.x, y, self.width, height))
    }

    pub fn inset(&self, left: f64, top: f64, right: f64, bottom: f64) -> Rectangle {
        Rectangle::new(
            self.x + left,
            self.y + top,
            (self.width - left - right).max(0.0),
            (self.height - top - bottom).max(0.0),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lower_keeps_bottom() {
        let r = Rectangle::new(10.0, 20.0, 100.0, 50.0);
        let l = r.lower(15.0);
        assert_eq!(l.y, 35.0);
        assert_eq!(l.bottom(), r.bottom());
        assert_eq!(r.lower(80.0).height, 0.0);
    }

    #[test]
    fn unite_is_bounding_box() {
        let a = Rectangle::new(0.0, 0.0, 10.0, 10.0);
        let b = Rectangle::new(20.0, 30.0, 10.0, 10.0);
        assert_eq!(a.unite(&b), Rectangle::new(0.0, 0.0, 30.0, 40.0));
    }

    #[test]
    fn fitting_rect_respects_bottom() {
        let r = Rectangle::new(0.0, 0.0, 100.0, 30.0);
        assert!(r.fitting_rect(12.0, 12.0).is_some());
        assert!(r.fitting_rect(24.0, 12.0).is_none());
        let open = Rectangle::unbounded(0.0, 0.0, 100.0);
        assert!(open.fitting_rect(1e9, 12.0).is_some());
        assert!(open.lower(50.0).is_unbounded());
    }
}
