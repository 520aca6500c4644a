use super::primitives::{cross_point, dedup_points, segments_cross};
use super::{InterpolationMode, Tolerances};
use kurbo::Point;

fn tangent_angle(from: Point, to: Point) -> f64 {
    (to.y - from.y).atan2(to.x - from.x)
}

/// Shift `p` by `distance` along the left normal of a tangent at angle `theta`.
fn shifted(p: Point, theta: f64, distance: f64) -> Point {
    Point::new(p.x - distance * theta.sin(), p.y + distance * theta.cos())
}

/// Offset a point sequence by a signed distance; positive is to the left of
/// the direction of travel.
///
/// Points whose tangent is undefined (neighbours closer than `dist_near`)
/// are dropped. In linear mode an even-length sequence is a list of segment
/// pairs and every pair moves along its own normal, which keeps corners sharp.
pub fn offset_line(
    points: &[Point],
    distance: f64,
    mode: InterpolationMode,
    tol: &Tolerances,
) -> Vec<Point> {
    match points {
        [] | [_] => points.to_vec(),
        [a, b] => {
            let theta = tangent_angle(*a, *b);
            vec![shifted(*a, theta, distance), shifted(*b, theta, distance)]
        }
        _ if mode == InterpolationMode::Linear && points.len() % 2 == 0 => {
            offset_pairs(points, distance, tol)
        }
        _ => offset_smooth(points, distance, tol),
    }
}

fn offset_pairs(points: &[Point], distance: f64, tol: &Tolerances) -> Vec<Point> {
    let mut angles: Vec<Option<f64>> = points
        .chunks_exact(2)
        .map(|pair| {
            (pair[0].distance(pair[1]) > tol.dist_near).then(|| tangent_angle(pair[0], pair[1]))
        })
        .collect();

    // Zero-length pairs borrow the direction of a neighbouring pair.
    let mut last = None;
    for a in angles.iter_mut() {
        match a {
            Some(theta) => last = Some(*theta),
            None => *a = last,
        }
    }
    let mut next = None;
    for a in angles.iter_mut().rev() {
        match a {
            Some(theta) => next = Some(*theta),
            None => *a = next,
        }
    }

    if angles.iter().all(Option::is_none) {
        return points.to_vec();
    }
    points
        .chunks_exact(2)
        .zip(angles)
        .flat_map(|(pair, theta)| {
            let theta = theta.unwrap_or_default();
            [shifted(pair[0], theta, distance), shifted(pair[1], theta, distance)]
        })
        .collect()
}

fn offset_smooth(points: &[Point], distance: f64, tol: &Tolerances) -> Vec<Point> {
    let last = points.len() - 1;
    (0..points.len())
        .filter_map(|i| {
            let prev = points[i.saturating_sub(1)];
            let next = points[(i + 1).min(last)];
            (prev.distance(next) > tol.dist_near)
                .then(|| shifted(points[i], tangent_angle(prev, next), distance))
        })
        .collect()
}

/// One pass of loop excision. Returns `None` when no crossing was found.
fn excise_first_loops(points: &[Point]) -> Option<Vec<Point>> {
    let n = points.len();
    let mut out = Vec::with_capacity(n);
    out.push(*points.first()?);
    let mut found = false;
    let mut i = 1;
    while i < n {
        let (p1, p2) = (points[i - 1], points[i]);
        let mut resume = i;
        // the last two segments are never tested
        let mut j = i + 1;
        while j + 3 < n {
            if segments_cross(p1, p2, points[j], points[j + 1]) {
                found = true;
                resume = j + 1;
            }
            j += 1;
        }
        out.push(points[resume]);
        i = resume + 1;
    }
    found.then_some(out)
}

/// Remove every loop a curve makes across itself.
///
/// Each crossing drops the points between the two crossing segments
/// instead of inserting the intersection. Returns the repaired points and
/// whether anything was removed.
pub fn remove_self_collision(points: &[Point], tol: &Tolerances) -> (Vec<Point>, bool) {
    let mut current = dedup_points(points, tol.dist_delta);
    let mut removed = false;
    while let Some(next) = excise_first_loops(&current) {
        removed = true;
        current = next;
    }
    if removed {
        (current, true)
    } else {
        (points.to_vec(), false)
    }
}

/// Trim two consecutive curves back to the first point where they cross.
///
/// `first` is scanned from its end backwards and `second` from its start
/// forwards. Returns `None` when the curves do not cross.
pub fn remove_collision(
    first: &[Point],
    second: &[Point],
    tol: &Tolerances,
) -> Option<(Vec<Point>, Vec<Point>)> {
    let a = dedup_points(first, tol.dist_delta);
    let b = dedup_points(second, tol.dist_delta);
    for i in (1..a.len()).rev() {
        for j in 1..b.len() {
            if !segments_cross(a[i - 1], a[i], b[j - 1], b[j]) {
                continue;
            }
            let Some(hit) = cross_point(a[i - 1], a[i], b[j - 1], b[j]) else {
                continue;
            };
            let mut head: Vec<Point> = a[..i].to_vec();
            head.push(hit);
            let mut tail = vec![hit];
            tail.extend_from_slice(&b[j..]);
            return Some((dedup_points(&head, tol.dist_delta), dedup_points(&tail, tol.dist_delta)));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::primitives::polyline_length;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    fn tol() -> Tolerances {
        Tolerances::default()
    }

    fn has_crossing(points: &[Point]) -> bool {
        let n = points.len();
        (1..n).any(|i| {
            (i + 2..n).any(|j| segments_cross(points[i - 1], points[i], points[j - 1], points[j]))
        })
    }

    #[test]
    fn test_offset_segment_moves_left() {
        let out = offset_line(
            &[Point::new(0.0, 0.0), Point::new(10.0, 0.0)],
            2.0,
            InterpolationMode::Cubic,
            &tol(),
        );
        assert_abs_diff_eq!(out[0].y, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out[1].x, 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_offset_short_input_unchanged() {
        let single = [Point::new(1.0, 2.0)];
        assert_eq!(offset_line(&single, 5.0, InterpolationMode::Cubic, &tol()), single.to_vec());
        assert!(offset_line(&[], 5.0, InterpolationMode::Linear, &tol()).is_empty());
    }

    #[test]
    fn test_linear_pairs_keep_corners() {
        // L-shape as duplicated-vertex pairs
        let pts = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
        ];
        let out = offset_line(&pts, -1.0, InterpolationMode::Linear, &tol());
        assert_eq!(out.len(), 4);
        assert_abs_diff_eq!(out[1].x, 10.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out[1].y, -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out[2].x, 11.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out[2].y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_smooth_offset_skips_duplicates() {
        let pts = [
            Point::new(0.0, 0.0),
            Point::new(0.0, 0.0),
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
        ];
        let out = offset_line(&pts, 1.0, InterpolationMode::Cubic, &tol());
        // points whose neighbours coincide have no tangent
        assert_eq!(out.len(), 2);
        assert_abs_diff_eq!(out[1].y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_offset_round_trip_preserves_length() {
        let circle: Vec<Point> = (0..=72)
            .map(|i| {
                let a = 2.0 * PI * i as f64 / 72.0;
                Point::new(20.0 * a.cos(), 20.0 * a.sin())
            })
            .collect();
        let out = offset_line(&circle, -1.5, InterpolationMode::Cubic, &tol());
        let back = offset_line(&out, 1.5, InterpolationMode::Cubic, &tol());
        assert_eq!(back.len(), circle.len());
        let original = polyline_length(&circle);
        assert!((polyline_length(&out) - original).abs() > 5.0);
        assert_abs_diff_eq!(polyline_length(&back), original, epsilon = 0.1);
    }

    #[test]
    fn test_remove_self_collision_excises_loop() {
        let pts = [
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(4.0, 2.0),
            Point::new(2.0, 2.0),
            Point::new(2.0, -2.0),
            Point::new(2.0, -3.0),
            Point::new(2.0, -4.0),
            Point::new(2.0, -5.0),
        ];
        assert!(has_crossing(&pts));
        let (fixed, removed) = remove_self_collision(&pts, &tol());
        assert!(removed);
        assert!(!has_crossing(&fixed));
        assert_eq!(fixed.first(), pts.first());
        assert_eq!(fixed.last(), pts.last());

        let (again, removed_again) = remove_self_collision(&fixed, &tol());
        assert!(!removed_again);
        assert_eq!(again, fixed);
    }

    #[test]
    fn test_remove_collision_trims_to_crossing() {
        let first = [Point::new(0.0, 0.0), Point::new(5.0, 0.0), Point::new(11.0, 0.0)];
        let second = [Point::new(10.0, -1.0), Point::new(10.0, 5.0), Point::new(10.0, 9.0)];
        let (a, b) = remove_collision(&first, &second, &tol()).expect("curves cross");
        let hit = Point::new(10.0, 0.0);
        assert!(a[a.len() - 1].distance(hit) < 1e-9);
        assert!(b[0].distance(hit) < 1e-9);
        assert_eq!(a.len(), 3);
        assert_eq!(b.len(), 3);

        let apart = [Point::new(20.0, 0.0), Point::new(30.0, 0.0)];
        assert!(remove_collision(&first, &apart, &tol()).is_none());
    }
}
