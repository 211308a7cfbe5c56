//! Screen Geometry
//!
//! Points and rectangles in screen pixels. The origin is the top-left corner
//! of the screen and `y` grows downward, so the floor is the bottom edge.

use serde::{Deserialize, Serialize};

/// A point in screen pixels
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position
    pub x: f64,
    /// Vertical position (grows downward)
    pub y: f64,
}

impl Point {
    /// Create a new point
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Offset this point by a delta
    #[must_use]
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Width and height in pixels
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl Size {
    /// Create a new size
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// An axis-aligned rectangle
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge
    pub x: f64,
    /// Top edge
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl Rect {
    /// Create a new rectangle
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle at `origin` with `size`
    #[must_use]
    pub const fn from_origin(origin: Point, size: Size) -> Self {
        Self::new(origin.x, origin.y, size.width, size.height)
    }

    /// Left edge
    #[must_use]
    pub fn left(&self) -> f64 {
        self.x
    }

    /// Right edge
    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Top edge
    #[must_use]
    pub fn top(&self) -> f64 {
        self.y
    }

    /// Bottom edge
    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Top-left corner
    #[must_use]
    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Whether the point lies inside or on the boundary
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.left() && p.x <= self.right() && p.y >= self.top() && p.y <= self.bottom()
    }

    /// Whether the point lies strictly inside (boundary excluded)
    #[must_use]
    pub fn contains_strict(&self, p: Point) -> bool {
        p.x > self.left() && p.x < self.right() && p.y > self.top() && p.y < self.bottom()
    }

    /// Whether `other` fits entirely inside this rectangle
    #[must_use]
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.left() >= self.left()
            && other.right() <= self.right()
            && other.top() >= self.top()
            && other.bottom() <= self.bottom()
    }

    /// Grow (positive) or shrink (negative) the rectangle on every side
    #[must_use]
    pub fn inset(&self, amount: f64) -> Rect {
        Rect::new(
            self.x + amount,
            self.y + amount,
            (self.width - 2.0 * amount).max(0.0),
            (self.height - 2.0 * amount).max(0.0),
        )
    }

    /// Clamp a rectangle of `size` placed at `origin` so it stays inside `self`
    ///
    /// If `size` is larger than `self` on an axis the origin snaps to the
    /// leading edge of that axis.
    #[must_use]
    pub fn clamp_origin(&self, origin: Point, size: Size) -> Point {
        let max_x = (self.right() - size.width).max(self.left());
        let max_y = (self.bottom() - size.height).max(self.top());
        Point::new(
            origin.x.clamp(self.left(), max_x),
            origin.y.clamp(self.top(), max_y),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_is_inclusive() {
        let r = Rect::new(10.0, 10.0, 100.0, 50.0);
        assert!(r.contains(Point::new(10.0, 10.0)));
        assert!(r.contains(Point::new(110.0, 60.0)));
        assert!(!r.contains(Point::new(110.5, 60.0)));
        assert!(!r.contains_strict(Point::new(10.0, 30.0)));
        assert!(r.contains_strict(Point::new(10.5, 30.0)));
    }

    #[test]
    fn test_inset_never_goes_negative() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0).inset(8.0);
        assert_eq!(r.width, 0.0);
        assert_eq!(r.height, 0.0);
    }

    #[test]
    fn test_clamp_origin_keeps_box_on_screen() {
        let screen = Rect::new(0.0, 0.0, 800.0, 600.0);
        let size = Size::new(48.0, 48.0);

        let p = screen.clamp_origin(Point::new(-20.0, 590.0), size);
        assert_eq!(p, Point::new(0.0, 552.0));

        let p = screen.clamp_origin(Point::new(790.0, -3.0), size);
        assert_eq!(p, Point::new(752.0, 0.0));
    }
}
