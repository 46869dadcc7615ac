//! Geometry helpers for working in the world coordinate space.

use kurbo::{Point, Vec2};

/// Normalize a vector, returning the zero vector when the input has zero length.
pub fn normalize_or_zero(v: Vec2) -> Vec2 {
    let len = v.length();
    if len == 0.0 {
        Vec2::ZERO
    } else {
        v / len
    }
}

/// Rotate a vector so it points at `angle` (radians) while keeping its length.
pub fn with_angle(v: Vec2, angle: f64) -> Vec2 {
    let len = v.length();
    Vec2::new(len * angle.cos(), len * angle.sin())
}

/// Scale a vector to `length` while keeping its direction.
///
/// A zero vector has no direction; `atan2(0, 0)` is 0, so the result points
/// along positive X.
pub fn with_length(v: Vec2, length: f64) -> Vec2 {
    let angle = v.y.atan2(v.x);
    Vec2::new(length * angle.cos(), length * angle.sin())
}

/// Shorten a vector by `amount` without letting it flip direction.
pub fn shorten_by(v: Vec2, amount: f64) -> Vec2 {
    let len = v.length();
    if len <= amount {
        Vec2::ZERO
    } else {
        v * ((len - amount) / len)
    }
}

/// Angle (radians) of the direction from `from` to `to`.
pub fn direction(from: Point, to: Point) -> f64 {
    let d = to - from;
    d.y.atan2(d.x)
}

/// Interior angle at `vertex` formed by the segments to `a` and `c`.
///
/// Always in `[0, pi]`. Returns 0 when either arm has zero length.
pub fn angle_between_points(a: Point, vertex: Point, c: Point) -> f64 {
    let va = a - vertex;
    let vc = c - vertex;
    let len_a = va.length();
    let len_c = vc.length();
    if len_a == 0.0 || len_c == 0.0 {
        return 0.0;
    }
    let cos = (va.dot(vc) / (len_a * len_c)).clamp(-1.0, 1.0);
    cos.acos()
}

/// Closest point to `p` on the segment from `a` to `b`.
pub fn closest_point_on_segment(p: Point, a: Point, b: Point) -> Point {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq == 0.0 {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Whether two points are within `distance` of each other (inclusive).
pub fn within_distance(a: Point, b: Point, distance: f64) -> bool {
    (b - a).length() <= distance
}

/// Format an angle given in radians as degrees with two decimals, e.g. `90.00°`.
pub fn format_degrees(radians: f64) -> String {
    format!("{:.2}°", radians.to_degrees())
}

/// Axis-aligned rectangle in world coordinates.
///
/// The constructor normalizes the corners so `min` is always the bottom-left
/// and `max` the top-right, whatever order the inputs arrive in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldRect {
    /// Bottom-left corner.
    pub min: Point,
    /// Top-right corner.
    pub max: Point,
}

impl WorldRect {
    /// Build a rectangle from two opposite corners, in any order.
    pub fn new(a: Point, b: Point) -> Self {
        Self {
            min: Point::new(a.x.min(b.x), a.y.min(b.y)),
            max: Point::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Width of the rectangle.
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// Height of the rectangle.
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Center point.
    pub fn center(&self) -> Point {
        Point::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }

    /// Whether `p` lies inside the rectangle, borders included.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Whether two rectangles overlap with positive area.
    pub fn intersects(&self, other: &WorldRect) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
    }

    /// One quadrant of the rectangle, counter-clockwise from the bottom-left.
    ///
    /// 0 = bottom-left, 1 = bottom-right, 2 = top-right, 3 = top-left.
    /// Panics on any other index.
    pub fn quadrant(&self, index: usize) -> WorldRect {
        let c = self.center();
        match index {
            0 => WorldRect::new(self.min, c),
            1 => WorldRect::new(Point::new(c.x, self.min.y), Point::new(self.max.x, c.y)),
            2 => WorldRect::new(c, self.max),
            3 => WorldRect::new(Point::new(self.min.x, c.y), Point::new(c.x, self.max.y)),
            _ => panic!("quadrant index out of range: {index}"),
        }
    }
}
