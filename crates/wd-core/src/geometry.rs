//! Point and rectangle math used by hit testing, snapping and module
//! rotation. Pure functions only; nothing here touches the scene.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

/// A 2D canvas-space point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Axis-aligned rectangle (top-left origin, y grows downwards).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Square of side `size` centered on `center`.
    pub fn centered(center: Point, size: f32) -> Self {
        Self::new(center.x - size / 2.0, center.y - size / 2.0, size, size)
    }

    /// Normalize a drag rectangle from two corner points.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self::new(a.x.min(b.x), a.y.min(b.y), (b.x - a.x).abs(), (b.y - a.y).abs())
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn bottom_right(&self) -> Point {
        Point::new(self.x + self.width, self.y + self.height)
    }

    /// Grow the rectangle by `margin` on every side.
    pub fn expand(&self, margin: f32) -> Self {
        Self::new(
            self.x - margin,
            self.y - margin,
            self.width + margin * 2.0,
            self.height + margin * 2.0,
        )
    }

    /// AABB overlap test.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.x + other.width
            && self.x + self.width > other.x
            && self.y < other.y + other.height
            && self.y + self.height > other.y
    }
}

/// Perpendicular distance from `p` to the infinite line through `a` and `b`.
/// `None` when `a == b` (no line is defined).
pub fn distance_to_line(p: Point, a: Point, b: Point) -> Option<f32> {
    let num = ((b.y - a.y) * p.x - (b.x - a.x) * p.y + b.x * a.y - b.y * a.x).abs();
    let den = ((b.y - a.y).powi(2) + (b.x - a.x).powi(2)).sqrt();
    if den == 0.0 {
        return None;
    }
    Some(num / den)
}

/// Segment hit test: perpendicular distance within `tolerance` AND the point
/// inside the segment's bounding box expanded by `tolerance`.
pub fn point_near_segment(p: Point, a: Point, b: Point, tolerance: f32) -> bool {
    let Some(distance) = distance_to_line(p, a, b) else {
        return false;
    };
    let bounds = Rect::from_corners(a, b).expand(tolerance);
    distance <= tolerance && bounds.contains(p)
}

/// Rotate `p` around `center` by `degrees` (positive = clockwise on a
/// y-down canvas).
pub fn rotate_about(p: Point, center: Point, degrees: f32) -> Point {
    let (sin, cos) = degrees.to_radians().sin_cos();
    let dx = p.x - center.x;
    let dy = p.y - center.y;
    Point::new(
        center.x + dx * cos - dy * sin,
        center.y + dx * sin + dy * cos,
    )
}

/// Direction of a quarter turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuarterTurn {
    Clockwise,
    CounterClockwise,
}

impl QuarterTurn {
    /// Signed angle in degrees.
    pub fn degrees(self) -> f32 {
        match self {
            QuarterTurn::Clockwise => 90.0,
            QuarterTurn::CounterClockwise => -90.0,
        }
    }
}

/// Exact ±90° rotation around `center`. Swaps axes instead of going through
/// sin/cos so repeated turns do not drift.
pub fn rotate_quarter(p: Point, center: Point, turn: QuarterTurn) -> Point {
    let dx = p.x - center.x;
    let dy = p.y - center.y;
    match turn {
        QuarterTurn::Clockwise => Point::new(center.x - dy, center.y + dx),
        QuarterTurn::CounterClockwise => Point::new(center.x + dy, center.y - dx),
    }
}

/// Arithmetic mean of a set of points. `None` for an empty set.
pub fn centroid(points: &[Point]) -> Option<Point> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f32;
    let sum = points.iter().fold(Point::ORIGIN, |acc, p| acc + *p);
    Some(Point::new(sum.x / n, sum.y / n))
}

/// Round a coordinate to the nearest multiple of `grid_size`.
pub fn snap_value(value: f32, grid_size: f32) -> f32 {
    if grid_size <= 0.0 {
        return value;
    }
    (value / grid_size).round() * grid_size
}

/// Snap both axes independently.
pub fn snap_point(p: Point, grid_size: f32) -> Point {
    Point::new(snap_value(p.x, grid_size), snap_value(p.y, grid_size))
}

/// Waypoints of an L-bend between two endpoints, bending at the horizontal
/// midpoint.
pub fn l_bend(a: Point, b: Point) -> [Point; 2] {
    let mid_x = (a.x + b.x) / 2.0;
    [Point::new(mid_x, a.y), Point::new(mid_x, b.y)]
}

/// Normalize an angle into `[0, 360)`.
pub fn wrap_degrees(degrees: f32) -> f32 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_contains_edges() {
        let r = Rect::centered(Point::new(0.0, 0.0), 30.0);
        assert!(r.contains(Point::new(15.0, 15.0)));
        assert!(r.contains(Point::new(-15.0, 0.0)));
        assert!(!r.contains(Point::new(15.1, 0.0)));
    }

    #[test]
    fn segment_hit_respects_bounding_box() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(100.0, 0.0);
        assert!(point_near_segment(Point::new(50.0, 5.0), a, b, 10.0));
        assert!(!point_near_segment(Point::new(50.0, 11.0), a, b, 10.0));
        // On the infinite line but past the end of the segment
        assert!(!point_near_segment(Point::new(150.0, 0.0), a, b, 10.0));
        assert!(point_near_segment(Point::new(105.0, 0.0), a, b, 10.0));
    }

    #[test]
    fn zero_length_segment_never_hits() {
        let a = Point::new(10.0, 10.0);
        assert!(!point_near_segment(a, a, a, 10.0));
    }

    #[test]
    fn quarter_turns_are_exact() {
        let c = Point::new(10.0, 10.0);
        let p = Point::new(20.0, 10.0);
        let cw = rotate_quarter(p, c, QuarterTurn::Clockwise);
        assert_eq!(cw, Point::new(10.0, 20.0));
        let back = rotate_quarter(cw, c, QuarterTurn::CounterClockwise);
        assert_eq!(back, p);

        let mut q = p;
        for _ in 0..4 {
            q = rotate_quarter(q, c, QuarterTurn::Clockwise);
        }
        assert_eq!(q, p);
    }

    #[test]
    fn rotate_about_matches_quarter_turn() {
        let c = Point::new(0.0, 0.0);
        let p = Point::new(10.0, 0.0);
        let r = rotate_about(p, c, 90.0);
        assert!((r.x - 0.0).abs() < 1e-4);
        assert!((r.y - 10.0).abs() < 1e-4);
    }

    #[test]
    fn snap_is_idempotent() {
        for &(x, y) in &[(13.0, 27.0), (-4.9, 5.1), (0.0, 0.0), (1234.5, -987.6)] {
            let p = Point::new(x, y);
            let once = snap_point(p, 10.0);
            assert_eq!(snap_point(once, 10.0), once);
        }
        assert_eq!(snap_point(Point::new(14.0, 16.0), 10.0), Point::new(10.0, 20.0));
    }

    #[test]
    fn centroid_is_arithmetic_mean() {
        let pts = [Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(20.0, 30.0)];
        assert_eq!(centroid(&pts), Some(Point::new(10.0, 10.0)));
        assert_eq!(centroid(&[]), None);
    }

    #[test]
    fn l_bend_uses_horizontal_midpoint() {
        let [w1, w2] = l_bend(Point::new(0.0, 0.0), Point::new(100.0, 40.0));
        assert_eq!(w1, Point::new(50.0, 0.0));
        assert_eq!(w2, Point::new(50.0, 40.0));
    }

    #[test]
    fn wrap_degrees_stays_in_range() {
        assert_eq!(wrap_degrees(450.0), 90.0);
        assert_eq!(wrap_degrees(-90.0), 270.0);
        assert_eq!(wrap_degrees(360.0), 0.0);
    }
}
