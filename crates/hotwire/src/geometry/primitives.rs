//! Small planar predicates shared by the curve, profile and fillet code.

use kurbo::{Affine, Point, Vec2};
use std::f64::consts::PI;

/// Drop points closer than `threshold` to the last kept point.
pub fn dedup_points(points: &[Point], threshold: f64) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    for &p in points {
        match out.last() {
            Some(last) if last.distance(p) < threshold => {}
            _ => out.push(p),
        }
    }
    out
}

/// Sum of chord lengths.
pub fn polyline_length(points: &[Point]) -> f64 {
    points.windows(2).map(|w| w[0].distance(w[1])).sum()
}

/// Cumulative chord length, starting at 0.
pub fn chord_length_array(points: &[Point]) -> Vec<f64> {
    let mut acc = 0.0;
    let mut out = Vec::with_capacity(points.len());
    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            acc += points[i - 1].distance(*p);
        }
        out.push(acc);
    }
    out
}

fn side(p: Point, a: Point, b: Point) -> f64 {
    (b - a).cross(p - a)
}

/// Bounding-box rejection followed by the cross-product sign test.
///
/// Touching and collinear-overlapping segments count as crossing.
#[must_use]
pub fn segments_cross(a1: Point, a2: Point, b1: Point, b2: Point) -> bool {
    if a1.x.max(a2.x) < b1.x.min(b2.x)
        || b1.x.max(b2.x) < a1.x.min(a2.x)
        || a1.y.max(a2.y) < b1.y.min(b2.y)
        || b1.y.max(b2.y) < a1.y.min(a2.y)
    {
        return false;
    }
    let c1 = side(b1, a1, a2) * side(b2, a1, a2);
    let c2 = side(a1, b1, b2) * side(a2, b1, b2);
    c1 <= 0.0 && c2 <= 0.0
}

/// Intersection of the infinite lines through `a1 a2` and `b1 b2`.
///
/// Returns `None` for parallel or degenerate lines.
#[must_use]
pub fn cross_point(a1: Point, a2: Point, b1: Point, b2: Point) -> Option<Point> {
    let da = a2 - a1;
    let db = b2 - b1;
    let denom = da.cross(db);
    if denom.abs() <= 1e-12 * da.hypot() * db.hypot() {
        return None;
    }
    let t = (b1 - a1).cross(db) / denom;
    Some(a1 + da * t)
}

/// Shoelace sum over the closed polygon; positive for counter-clockwise.
pub fn signed_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let n = points.len();
    let twice: f64 = (0..n)
        .map(|i| {
            let p = points[i];
            let q = points[(i + 1) % n];
            p.x * q.y - q.x * p.y
        })
        .sum();
    twice / 2.0
}

pub fn is_ccw(points: &[Point]) -> bool {
    signed_area(points) > 0.0
}

/// Wrap an angle difference into `(-PI, PI]`.
pub fn wrap_angle(delta: f64) -> f64 {
    let mut d = delta % (2.0 * PI);
    if d > PI {
        d -= 2.0 * PI;
    } else if d <= -PI {
        d += 2.0 * PI;
    }
    d
}

/// Rotate points by `angle` radians about `center`.
pub fn rotate_points(points: &mut [Point], angle: f64, center: Point) {
    let affine = Affine::rotate_about(angle, center);
    for p in points.iter_mut() {
        *p = affine * *p;
    }
}

pub fn translate_points(points: &mut [Point], delta: Vec2) {
    for p in points.iter_mut() {
        *p += delta;
    }
}

/// Mean of all points, or the origin for an empty slice.
pub fn mean_point(points: &[Point]) -> Point {
    if points.is_empty() {
        return Point::ORIGIN;
    }
    let sum = points
        .iter()
        .fold(Vec2::ZERO, |acc, p| acc + p.to_vec2());
    (sum / points.len() as f64).to_point()
}
