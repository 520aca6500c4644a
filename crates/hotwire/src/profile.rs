use crate::error::{HotwireError, Result};
use crate::geometry::offset::remove_collision;
use crate::geometry::primitives::{dedup_points, is_ccw, mean_point};
use crate::geometry::{Curve, CurveId, CurveKind, InterpolationMode, Tolerances};
use crate::import::CadPrimitive;
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// The ordered curves of one cross-section (XY or UV).
///
/// Curves live in an id-keyed arena; `order` is the cut order. Every
/// operation that takes a selection validates it completely before
/// touching any curve.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    curves: HashMap<CurveId, Curve>,
    order: Vec<CurveId>,
    origin_offset: Vec2,
    /// Degrees.
    rotation: f64,
    rotation_center: Point,
}

/// Result of [`Profile::sort`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortReport {
    /// Number of disjoint loops found.
    pub groups: usize,
    /// Winding every loop was normalized to.
    pub ccw: bool,
}

/// Result of [`Profile::merge`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    pub parent: CurveId,
    pub merged: Vec<CurveId>,
    /// Curves that were not adjacent to the parent and stayed untouched.
    pub skipped: Vec<CurveId>,
}

impl Profile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Build a profile from drawing primitives.
    pub fn from_primitives(
        name: impl Into<String>,
        primitives: &[CadPrimitive],
        refine: bool,
        tol: &Tolerances,
    ) -> Self {
        let mut profile = Self::new(name);
        profile.reload(primitives, refine, tol);
        profile
    }

    /// Replace every curve with freshly ingested primitives and reset the
    /// transform state. Zero-length lines are dropped.
    pub fn reload(&mut self, primitives: &[CadPrimitive], refine: bool, tol: &Tolerances) {
        self.curves.clear();
        self.order.clear();
        self.origin_offset = Vec2::ZERO;
        self.rotation = 0.0;
        self.rotation_center = Point::ORIGIN;

        for primitive in primitives.iter().filter(|p| !p.is_degenerate()) {
            let (points, mode) = primitive.to_points();
            let curve = Curve::with_refine(points, self.order.len(), mode, refine, tol);
            self.insert(curve);
        }
        info!(profile = %self.name, curves = self.order.len(), "profile loaded");
    }

    /// Append a curve built from raw points, returning its id.
    pub fn add_curve(&mut self, points: Vec<Point>, interpolation: InterpolationMode) -> CurveId {
        let index = self.next_index();
        self.insert(Curve::new(points, index, interpolation))
    }

    fn insert(&mut self, curve: Curve) -> CurveId {
        let id = curve.id;
        self.order.push(id);
        self.curves.insert(id, curve);
        id
    }

    fn next_index(&self) -> usize {
        self.curves
            .values()
            .map(|c| c.index + 1)
            .max()
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Curve ids in cut order.
    pub fn ids(&self) -> &[CurveId] {
        &self.order
    }

    /// Curves in cut order.
    pub fn curves(&self) -> impl Iterator<Item = &Curve> + '_ {
        self.order.iter().filter_map(|id| self.curves.get(id))
    }

    pub fn curve(&self, id: &CurveId) -> Option<&Curve> {
        self.curves.get(id)
    }

    pub fn curve_mut(&mut self, id: &CurveId) -> Option<&mut Curve> {
        self.curves.get_mut(id)
    }

    /// The curve at cut position `position`.
    pub fn curve_at(&self, position: usize) -> Option<&Curve> {
        self.order.get(position).and_then(|id| self.curves.get(id))
    }

    pub fn position(&self, id: &CurveId) -> Option<usize> {
        self.order.iter().position(|other| other == id)
    }

    pub fn origin_offset(&self) -> Vec2 {
        self.origin_offset
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    fn get(&self, id: &CurveId) -> Result<&Curve> {
        self.curves.get(id).ok_or(HotwireError::UnknownCurve(*id))
    }

    fn get_mut(&mut self, id: &CurveId) -> Result<&mut Curve> {
        self.curves
            .get_mut(id)
            .ok_or(HotwireError::UnknownCurve(*id))
    }

    fn check_selection(&self, selection: &[CurveId]) -> Result<()> {
        match selection.iter().find(|id| !self.curves.contains_key(id)) {
            Some(id) => Err(HotwireError::UnknownCurve(*id)),
            None => Ok(()),
        }
    }

    /// Set the offset distance of the selected curves.
    pub fn set_offset_distance(
        &mut self,
        selection: &[CurveId],
        distance: f64,
        tol: &Tolerances,
    ) -> Result<()> {
        self.check_selection(selection)?;
        for id in selection {
            self.get_mut(id)?.set_offset_distance(distance, tol);
        }
        Ok(())
    }

    pub fn set_offset_distance_all(&mut self, distance: f64, tol: &Tolerances) {
        for curve in self.curves.values_mut() {
            curve.set_offset_distance(distance, tol);
        }
    }

    pub fn toggle_cut_dir(&mut self, selection: &[CurveId]) -> Result<()> {
        self.check_selection(selection)?;
        for id in selection {
            self.get_mut(id)?.toggle_cut_dir();
        }
        Ok(())
    }

    pub fn toggle_offset_side(&mut self, selection: &[CurveId], tol: &Tolerances) -> Result<()> {
        self.check_selection(selection)?;
        for id in selection {
            self.get_mut(id)?.toggle_offset_side(tol);
        }
        Ok(())
    }

    /// Exchange the cut positions of two curves.
    pub fn swap(&mut self, a: &CurveId, b: &CurveId) -> Result<()> {
        let pa = self.position(a).ok_or(HotwireError::UnknownCurve(*a))?;
        let pb = self.position(b).ok_or(HotwireError::UnknownCurve(*b))?;
        self.order.swap(pa, pb);
        Ok(())
    }

    /// Remove the selected curves, returning them in selection order.
    pub fn delete(&mut self, selection: &[CurveId]) -> Result<Vec<Curve>> {
        self.check_selection(selection)?;
        self.order.retain(|id| !selection.contains(id));
        Ok(selection
            .iter()
            .filter_map(|id| self.curves.remove(id))
            .collect())
    }

    /// Reverse the cut order and the direction of every curve.
    pub fn reverse_all(&mut self) {
        self.order.reverse();
        for curve in self.curves.values_mut() {
            curve.toggle_cut_dir();
        }
    }

    /// Reassign display indices to match the cut order.
    pub fn renumber(&mut self) {
        for (index, id) in self.order.iter().enumerate() {
            if let Some(curve) = self.curves.get_mut(id) {
                curve.index = index;
            }
        }
    }

    /// Order the curves into a continuous cut, starting from `seed`.
    ///
    /// Repeatedly takes the curve with an endpoint nearest to the current
    /// end (reversing it when its end is the nearer one). A jump longer than
    /// `dist_near` starts a new loop. Every loop is then turned to the
    /// winding of the first one and each curve's `ccw` flag set to match.
    pub fn sort(&mut self, seed: &[CurveId], tol: &Tolerances) -> Result<SortReport> {
        let [seed] = seed else {
            return Err(HotwireError::SeedSelection { count: seed.len() });
        };
        let mut cursor = self.get(seed)?.end_point();
        let mut remaining: Vec<CurveId> = self.order.iter().filter(|id| *id != seed).copied().collect();
        let mut groups: Vec<Vec<CurveId>> = vec![vec![*seed]];

        while !remaining.is_empty() {
            let mut best: Option<(usize, f64, bool)> = None;
            for (pos, id) in remaining.iter().enumerate() {
                let curve = self.get(id)?;
                let to_start = curve.start_point().distance(cursor);
                let to_end = curve.end_point().distance(cursor);
                let (dist, reverse) = if to_end < to_start {
                    (to_end, true)
                } else {
                    (to_start, false)
                };
                if best.map_or(true, |(_, d, _)| dist < d) {
                    best = Some((pos, dist, reverse));
                }
            }
            let Some((pos, dist, reverse)) = best else {
                break;
            };
            let id = remaining.remove(pos);
            let curve = self.get_mut(&id)?;
            if reverse {
                curve.toggle_cut_dir();
            }
            cursor = curve.end_point();
            match groups.last_mut() {
                Some(group) if dist <= tol.dist_near => group.push(id),
                _ => groups.push(vec![id]),
            }
        }

        let ccw = self.group_is_ccw(&groups[0]);
        for group in groups.iter_mut() {
            if self.group_is_ccw(group) != ccw {
                group.reverse();
                for id in group.iter() {
                    self.get_mut(id)?.toggle_cut_dir();
                }
            }
        }
        for id in groups.iter().flatten() {
            self.get_mut(id)?.set_ccw(ccw, tol);
        }

        debug!(groups = groups.len(), ccw, "sorted profile");
        let report = SortReport {
            groups: groups.len(),
            ccw,
        };
        self.order = groups.concat();
        Ok(report)
    }

    fn group_is_ccw(&self, group: &[CurveId]) -> bool {
        let points: Vec<Point> = group
            .iter()
            .filter_map(|id| self.curves.get(id))
            .flat_map(|c| c.raw_points().iter().copied())
            .collect();
        is_ccw(&points)
    }

    /// Absorb the selected curves into the first one.
    ///
    /// Each child is attached at whichever end pairing is closest, if that
    /// gap is within `merge_distance`; the child is reversed as needed and
    /// removed from the profile. Children too far away are reported as
    /// skipped.
    pub fn merge(&mut self, selection: &[CurveId], tol: &Tolerances) -> Result<MergeReport> {
        if selection.len() < 2 {
            return Err(HotwireError::SelectionTooSmall {
                needed: 2,
                count: selection.len(),
            });
        }
        self.check_selection(selection)?;
        let parent_id = selection[0];
        let mut report = MergeReport {
            parent: parent_id,
            merged: Vec::new(),
            skipped: Vec::new(),
        };

        for child_id in &selection[1..] {
            if *child_id == parent_id {
                continue;
            }
            let parent = self.get(&parent_id)?;
            let child = self.get(child_id)?;
            let Some(joined) = join_curves(parent, child, tol) else {
                report.skipped.push(*child_id);
                continue;
            };
            let (points, mode) = joined;
            self.get_mut(&parent_id)?.replace_points(points, mode, tol);
            self.order.retain(|id| id != child_id);
            self.curves.remove(child_id);
            report.merged.push(*child_id);
        }

        if !report.skipped.is_empty() {
            warn!(skipped = report.skipped.len(), "curves not adjacent to the merge parent");
        }
        Ok(report)
    }

    /// Split a curve at an interior raw point. The second half becomes a new
    /// curve placed right after the first; its id is returned.
    pub fn split(&mut self, id: &CurveId, point_index: usize, tol: &Tolerances) -> Result<CurveId> {
        let curve = self.get(id)?;
        let raw = curve.raw_points();
        let len = raw.len();
        if point_index == 0 || point_index + 1 >= len {
            return Err(HotwireError::InvalidSplit {
                id: *id,
                index: point_index,
                len,
            });
        }

        let mode = curve.interpolation();
        let (head, tail) = if mode == InterpolationMode::Linear && len % 2 == 0 {
            // cut between pairs so both halves stay pair lists
            let cut = if point_index % 2 == 1 { point_index + 1 } else { point_index };
            (raw[..cut].to_vec(), raw[cut..].to_vec())
        } else {
            (raw[..=point_index].to_vec(), raw[point_index..].to_vec())
        };
        if head.len() < 2 || tail.len() < 2 {
            return Err(HotwireError::InvalidSplit {
                id: *id,
                index: point_index,
                len,
            });
        }

        let mut second = curve.clone();
        second.id = CurveId::new();
        second.index = self.next_index();
        second.replace_points(tail, mode, tol);
        let new_id = second.id;

        self.get_mut(id)?.replace_points(head, mode, tol);
        let position = self.position(id).ok_or(HotwireError::UnknownCurve(*id))?;
        self.order.insert(position + 1, new_id);
        self.curves.insert(new_id, second);
        Ok(new_id)
    }

    /// Excise self-crossings from the selected curves' offset geometry.
    /// Returns the display indices of the curves that changed.
    pub fn remove_self_collisions(
        &mut self,
        selection: &[CurveId],
        tol: &Tolerances,
    ) -> Result<Vec<usize>> {
        self.check_selection(selection)?;
        let mut fixed = Vec::new();
        for id in selection {
            let curve = self.get_mut(id)?;
            if curve.remove_self_collision(tol) {
                fixed.push(curve.index);
            }
        }
        if !fixed.is_empty() {
            info!(curves = ?fixed, "removed self collisions");
        }
        Ok(fixed)
    }

    /// Trim every pair of consecutive curves back to their crossing.
    /// Returns the display indices of the trimmed pairs.
    pub fn remove_line_collisions(&mut self, tol: &Tolerances) -> Vec<(usize, usize)> {
        let mut trimmed = Vec::new();
        for pair in self.order.clone().windows(2) {
            let (Some(a), Some(b)) = (self.curves.get(&pair[0]), self.curves.get(&pair[1])) else {
                continue;
            };
            let indices = (a.index, b.index);
            let Some((head, tail)) = remove_collision(a.offset_points(), b.offset_points(), tol)
            else {
                continue;
            };
            if let Some(a) = self.curves.get_mut(&pair[0]) {
                a.set_offset_points(head);
            }
            if let Some(b) = self.curves.get_mut(&pair[1]) {
                b.set_offset_points(tail);
            }
            trimmed.push(indices);
        }
        if !trimmed.is_empty() {
            info!(pairs = ?trimmed, "trimmed colliding curves");
        }
        trimmed
    }

    /// Move the profile so its cumulative origin offset becomes `offset`.
    pub fn set_origin_offset(&mut self, offset: Vec2) {
        let delta = offset - self.origin_offset;
        for curve in self.curves.values_mut() {
            curve.translate(delta);
        }
        self.origin_offset = offset;
        self.rotation_center += delta;
    }

    /// Rotate the profile so its cumulative rotation becomes `degrees`,
    /// turning about `center`.
    ///
    /// The previous rotation is undone about the pivot it was applied with,
    /// so the result only depends on the latest angle and center.
    pub fn set_rotation(&mut self, degrees: f64, center: Point) {
        let undo = -self.rotation.to_radians();
        let angle = degrees.to_radians();
        let pivot = self.rotation_center;
        for curve in self.curves.values_mut() {
            if undo != 0.0 {
                curve.rotate(undo, pivot);
            }
            curve.rotate(angle, center);
        }
        self.rotation = degrees;
        self.rotation_center = center;
    }

    /// Mean of every raw point.
    pub fn centroid(&self) -> Point {
        let points: Vec<Point> = self
            .curves()
            .flat_map(|c| c.raw_points().iter().copied())
            .collect();
        mean_point(&points)
    }
}

fn pair_compatible(curve: &Curve) -> bool {
    curve.interpolation() == InterpolationMode::Linear || curve.kind() == CurveKind::Segment
}

/// Join `child` onto `parent` at their closest end pairing, if close enough.
fn join_curves(
    parent: &Curve,
    child: &Curve,
    tol: &Tolerances,
) -> Option<(Vec<Point>, InterpolationMode)> {
    let forward = child.raw_points().to_vec();
    let mut backward = forward.clone();
    backward.reverse();

    let candidates = [
        (parent.end_point().distance(child.start_point()), true, false),
        (parent.end_point().distance(child.end_point()), true, true),
        (parent.start_point().distance(child.end_point()), false, false),
        (parent.start_point().distance(child.start_point()), false, true),
    ];
    let (gap, append, reverse) = candidates
        .into_iter()
        .filter(|(gap, ..)| *gap <= tol.merge_distance)
        .min_by(|a, b| a.0.total_cmp(&b.0))?;
    debug!(gap, append, reverse, "joining curves");

    let child_points = if reverse { backward } else { forward };
    let (first, second) = if append {
        (parent.raw_points().to_vec(), child_points)
    } else {
        (child_points, parent.raw_points().to_vec())
    };

    if pair_compatible(parent) && pair_compatible(child) {
        let mut points = first;
        points.extend(second);
        Some((points, InterpolationMode::Linear))
    } else {
        let mut points = dedup_points(&first, tol.dist_delta);
        points.extend(second.into_iter().skip(1));
        Some((dedup_points(&points, tol.dist_delta), InterpolationMode::Cubic))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn tol() -> Tolerances {
        Tolerances::default()
    }

    fn segment(profile: &mut Profile, a: (f64, f64), b: (f64, f64)) -> CurveId {
        profile.add_curve(
            vec![Point::new(a.0, a.1), Point::new(b.0, b.1)],
            InterpolationMode::Cubic,
        )
    }

    #[test]
    fn test_reload_skips_zero_length_lines() {
        let prims = vec![
            CadPrimitive::Line {
                start: Point::new(0.0, 0.0),
                end: Point::new(0.0, 0.0),
            },
            CadPrimitive::Line {
                start: Point::new(0.0, 0.0),
                end: Point::new(5.0, 0.0),
            },
            CadPrimitive::Polyline {
                vertices: vec![Point::new(5.0, 0.0), Point::new(5.0, 5.0), Point::new(0.0, 5.0)],
                closed: false,
            },
        ];
        let profile = Profile::from_primitives("xy", &prims, false, &tol());
        assert_eq!(profile.len(), 2);
        let indices: Vec<usize> = profile.curves().map(|c| c.index).collect();
        assert_eq!(indices, vec![0, 1]);
        assert_eq!(profile.curve_at(1).map(Curve::interpolation), Some(InterpolationMode::Linear));
    }

    #[test]
    fn test_sort_requires_one_seed() {
        let mut profile = Profile::new("xy");
        let a = segment(&mut profile, (0.0, 0.0), (1.0, 0.0));
        let b = segment(&mut profile, (1.0, 0.0), (1.0, 1.0));
        assert_eq!(
            profile.sort(&[], &tol()),
            Err(HotwireError::SeedSelection { count: 0 })
        );
        assert_eq!(
            profile.sort(&[a, b], &tol()),
            Err(HotwireError::SeedSelection { count: 2 })
        );
    }

    #[test]
    fn test_sort_splits_disjoint_loops_and_matches_winding() {
        let mut profile = Profile::new("xy");
        // outer square, counter-clockwise, edges listed out of order
        let seed = segment(&mut profile, (0.0, 0.0), (10.0, 0.0));
        segment(&mut profile, (10.0, 10.0), (0.0, 10.0));
        // inner square drawn clockwise
        segment(&mut profile, (3.0, 3.0), (3.0, 6.0));
        segment(&mut profile, (3.0, 6.0), (6.0, 6.0));
        segment(&mut profile, (6.0, 6.0), (6.0, 3.0));
        segment(&mut profile, (6.0, 3.0), (3.0, 3.0));
        segment(&mut profile, (10.0, 0.0), (10.0, 10.0));
        segment(&mut profile, (0.0, 10.0), (0.0, 0.0));

        let report = profile.sort(&[seed], &tol()).expect("sort");
        assert_eq!(report.groups, 2);
        assert!(report.ccw);
        assert_eq!(profile.ids()[0], seed);

        let curves: Vec<&Curve> = profile.curves().collect();
        for pair in curves[..4].windows(2) {
            assert!(pair[0].end_point().distance(pair[1].start_point()) < 1e-9);
        }
        let inner: Vec<Point> = curves[4..]
            .iter()
            .flat_map(|c| c.raw_points().iter().copied())
            .collect();
        assert!(is_ccw(&inner));
        assert!(curves.iter().all(|c| c.is_ccw()));
    }

    #[test]
    fn test_merge_joins_adjacent_and_skips_far() {
        let mut profile = Profile::new("xy");
        let a = segment(&mut profile, (0.0, 0.0), (5.0, 0.0));
        let b = segment(&mut profile, (5.0, 5.0), (5.05, 0.0));
        let far = segment(&mut profile, (50.0, 0.0), (60.0, 0.0));

        let report = profile.merge(&[a, b, far], &tol()).expect("merge");
        assert_eq!(report.merged, vec![b]);
        assert_eq!(report.skipped, vec![far]);
        assert_eq!(profile.len(), 2);
        let merged = profile.curve(&a).expect("parent");
        assert_eq!(merged.interpolation(), InterpolationMode::Linear);
        assert_eq!(merged.raw_points().len(), 4);
        assert_eq!(merged.end_point(), Point::new(5.0, 5.0));
    }

    #[test]
    fn test_merge_needs_two_curves() {
        let mut profile = Profile::new("xy");
        let a = segment(&mut profile, (0.0, 0.0), (5.0, 0.0));
        assert_eq!(
            profile.merge(&[a], &tol()),
            Err(HotwireError::SelectionTooSmall { needed: 2, count: 1 })
        );
    }

    #[test]
    fn test_split_inserts_after_original() {
        let mut profile = Profile::new("xy");
        let pts: Vec<Point> = (0..=6).map(|i| Point::new(i as f64, (i as f64).sin())).collect();
        let id = profile.add_curve(pts, InterpolationMode::Cubic);
        let tail = segment(&mut profile, (6.0, 0.0), (7.0, 0.0));

        assert!(profile.split(&id, 0, &tol()).is_err());
        assert!(profile.split(&id, 6, &tol()).is_err());

        let new_id = profile.split(&id, 2, &tol()).expect("split");
        assert_eq!(profile.ids(), &[id, new_id, tail]);
        let first = profile.curve(&id).expect("first");
        let second = profile.curve(&new_id).expect("second");
        assert_eq!(first.raw_points().len(), 3);
        assert_eq!(second.raw_points().len(), 5);
        assert_eq!(first.end_point(), second.start_point());
        assert_eq!(second.index, 2);
    }

    #[test]
    fn test_split_linear_keeps_pairs() {
        let mut profile = Profile::new("xy");
        let v = [
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ];
        let id = profile.add_curve(crate::import::polyline_points(&v, false), InterpolationMode::Linear);
        let new_id = profile.split(&id, 3, &tol()).expect("split");
        assert_eq!(profile.curve(&id).map(|c| c.raw_points().len()), Some(4));
        assert_eq!(profile.curve(&new_id).map(|c| c.raw_points().len()), Some(2));
    }

    #[test]
    fn test_delete_swap_reverse() {
        let mut profile = Profile::new("xy");
        let a = segment(&mut profile, (0.0, 0.0), (1.0, 0.0));
        let b = segment(&mut profile, (1.0, 0.0), (2.0, 0.0));
        let c = segment(&mut profile, (2.0, 0.0), (3.0, 0.0));

        profile.swap(&a, &c).expect("swap");
        assert_eq!(profile.ids(), &[c, b, a]);

        profile.reverse_all();
        assert_eq!(profile.ids(), &[a, b, c]);
        assert_eq!(profile.curve(&a).map(Curve::start_point), Some(Point::new(1.0, 0.0)));

        let unknown = CurveId::new();
        assert_eq!(
            profile.delete(&[b, unknown]).map(|v| v.len()),
            Err(HotwireError::UnknownCurve(unknown))
        );
        assert_eq!(profile.len(), 3);
        let removed = profile.delete(&[b]).expect("delete");
        assert_eq!(removed.len(), 1);
        assert_eq!(profile.ids(), &[a, c]);

        profile.renumber();
        assert_eq!(profile.curve(&c).map(|c| c.index), Some(1));
    }

    #[test]
    fn test_transforms_apply_deltas() {
        let mut profile = Profile::new("xy");
        let a = segment(&mut profile, (1.0, 0.0), (2.0, 0.0));
        profile.set_origin_offset(Vec2::new(5.0, 0.0));
        profile.set_origin_offset(Vec2::new(2.0, 1.0));
        assert_eq!(profile.curve(&a).map(Curve::start_point), Some(Point::new(3.0, 1.0)));

        profile.set_rotation(90.0, Point::new(3.0, 1.0));
        profile.set_rotation(180.0, Point::new(3.0, 1.0));
        let end = profile.curve(&a).map(Curve::end_point).expect("curve");
        assert_abs_diff_eq!(end.x, 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(end.y, 1.0, epsilon = 1e-9);
        assert_eq!(profile.rotation(), 180.0);
    }

    #[test]
    fn test_rotation_with_moved_center_does_not_accumulate() {
        let mut moved = Profile::new("xy");
        let a = segment(&mut moved, (1.0, 0.0), (2.0, 0.0));
        moved.set_rotation(90.0, Point::new(0.0, 0.0));
        moved.set_rotation(90.0, Point::new(4.0, 4.0));

        let mut direct = Profile::new("xy");
        let b = segment(&mut direct, (1.0, 0.0), (2.0, 0.0));
        direct.set_rotation(90.0, Point::new(4.0, 4.0));

        let got = moved.curve(&a).map(Curve::end_point).expect("moved");
        let want = direct.curve(&b).map(Curve::end_point).expect("direct");
        assert_abs_diff_eq!(got.x, want.x, epsilon = 1e-9);
        assert_abs_diff_eq!(got.y, want.y, epsilon = 1e-9);

        moved.set_origin_offset(Vec2::new(1.0, -2.0));
        moved.set_rotation(0.0, Point::new(-7.0, 3.0));
        let back = moved.curve(&a).map(Curve::end_point).expect("moved");
        assert_abs_diff_eq!(back.x, 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(back.y, -2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_line_collisions_trim_consecutive_offsets() {
        let mut profile = Profile::new("xy");
        // concave corner: offsets on the inside overlap
        let a = segment(&mut profile, (0.0, 0.0), (10.0, 0.0));
        let b = segment(&mut profile, (10.0, 0.0), (10.0, 10.0));
        profile.set_offset_distance(&[a, b], 1.0, &tol()).expect("offset");
        profile.toggle_offset_side(&[a, b], &tol()).expect("side");

        let trimmed = profile.remove_line_collisions(&tol());
        assert_eq!(trimmed, vec![(0, 1)]);
        let end = profile.curve(&a).and_then(|c| c.offset_points().last().copied()).expect("end");
        assert_abs_diff_eq!(end.x, 9.0, epsilon = 1e-9);
        assert_abs_diff_eq!(end.y, 1.0, epsilon = 1e-9);
    }
}
