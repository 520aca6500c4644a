use super::primitives::{cross_point, wrap_angle};
use super::Tolerances;
use kurbo::{Point, Vec2};
use std::f64::consts::FRAC_PI_2;

/// Arc points bridging the gap between the end of one offset path and the
/// start of the next.
///
/// `prev` holds the last two points of the previous path, `next` the first
/// two of the following one. The arc is tangent to both, its radius is the
/// smaller offset, and it has `n` points of which only the `n - 2` interior
/// ones are returned. An empty result means no fillet applies: the gap is
/// negligible, too wide for the offsets, or the stubs do not form a corner.
pub fn fillet_points(
    prev: [Point; 2],
    next: [Point; 2],
    prev_offset: f64,
    next_offset: f64,
    n: usize,
    tol: &Tolerances,
) -> Vec<Point> {
    let (prev_offset, next_offset) = (prev_offset.abs(), next_offset.abs());
    let gap = prev[1].distance(next[0]);
    if n < 3 || gap <= tol.dist_near || gap >= 2.0 * prev_offset || gap >= 2.0 * next_offset {
        return Vec::new();
    }
    let radius = prev_offset.min(next_offset).max(10.0 * tol.dist_near);

    let incoming = prev[1] - prev[0];
    let outgoing = next[0] - next[1];
    if incoming.hypot() <= tol.dist_delta || outgoing.hypot() <= tol.dist_delta {
        return Vec::new();
    }
    let Some(corner) = cross_point(prev[0], prev[1], next[0], next[1]) else {
        return Vec::new();
    };
    let (a, b) = (incoming.normalize(), outgoing.normalize());

    let half = a.dot(b).clamp(-1.0, 1.0).acos() / 2.0;
    if half < 1e-6 || FRAC_PI_2 - half < 1e-6 {
        return Vec::new();
    }
    let reach = radius / half.tan();
    let start = corner - a * reach;
    let end = corner - b * reach;

    let bisector: Vec2 = -(a + b);
    let center = corner + bisector.normalize() * (radius / half.sin());

    let from = (start - center).atan2();
    let sweep = wrap_angle((end - center).atan2() - from);
    (1..n - 1)
        .map(|k| {
            let angle = from + sweep * k as f64 / (n - 1) as f64;
            center + Vec2::from_angle(angle) * radius
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_fillet_rounds_convex_corner() {
        // square [0,10]^2 offset outwards by 1 around its bottom-right corner
        let prev = [Point::new(9.0, -1.0), Point::new(10.0, -1.0)];
        let next = [Point::new(11.0, 0.0), Point::new(11.0, 1.0)];
        let tol = Tolerances::default();
        let arc = fillet_points(prev, next, 1.0, 1.0, 12, &tol);
        assert_eq!(arc.len(), 10);
        for p in &arc {
            assert_abs_diff_eq!(p.distance(Point::new(10.0, 0.0)), 1.0, epsilon = 1e-9);
            assert!(p.x > 10.0 && p.y < 0.0);
        }
        // sweeps from the previous end towards the next start
        assert!(arc[0].distance(prev[1]) < arc[9].distance(prev[1]));
    }

    #[test]
    fn test_fillet_skips_tiny_and_wide_gaps() {
        let tol = Tolerances::default();
        let prev = [Point::new(9.0, -1.0), Point::new(10.0, -1.0)];
        let touching = [Point::new(10.0, -1.0), Point::new(10.0, 1.0)];
        assert!(fillet_points(prev, touching, 1.0, 1.0, 12, &tol).is_empty());

        let far = [Point::new(15.0, 0.0), Point::new(15.0, 1.0)];
        assert!(fillet_points(prev, far, 1.0, 1.0, 12, &tol).is_empty());
    }

    #[test]
    fn test_fillet_skips_parallel_stubs() {
        let tol = Tolerances::default();
        let prev = [Point::new(0.0, 0.0), Point::new(1.0, 0.0)];
        let next = [Point::new(1.5, 0.0), Point::new(2.5, 0.0)];
        assert!(fillet_points(prev, next, 1.0, 1.0, 12, &tol).is_empty());
    }
}
