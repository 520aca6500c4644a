use super::offset::{offset_line, remove_self_collision};
use super::primitives::{chord_length_array, polyline_length, rotate_points, translate_points};
use super::spline::{refine_spline_curvature, spline_length, spline_length_array, ArcLengthSampler};
use super::{CurveId, Tolerances};
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Cut speed assigned to freshly imported curves.
pub const DEFAULT_CUT_SPEED: f64 = 200.0;

/// Shape class, derived from the number of raw points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurveKind {
    Point,
    Segment,
    Spline,
}

impl CurveKind {
    pub fn from_len(len: usize) -> Self {
        match len {
            0 | 1 => CurveKind::Point,
            2 => CurveKind::Segment,
            _ => CurveKind::Spline,
        }
    }
}

/// How points between the raw samples are interpolated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InterpolationMode {
    /// Smooth spline through the samples (splines and arcs).
    #[default]
    Cubic,
    /// Straight segments between duplicated-vertex pairs (polylines).
    Linear,
}

/// Which geometry a length query measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthMode {
    Raw,
    Offset,
}

/// One contiguous cuttable edge of a profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Curve {
    pub id: CurveId,
    /// Display number; only changes on explicit renumbering.
    pub index: usize,
    raw_points: Vec<Point>,
    offset_points: Vec<Point>,
    interpolation: InterpolationMode,
    offset_distance: f64,
    ccw: bool,
    work_cut_speed: f64,
    machine_cut_speed: f64,
}

impl Curve {
    pub fn new(points: Vec<Point>, index: usize, interpolation: InterpolationMode) -> Self {
        Self {
            id: CurveId::new(),
            index,
            offset_points: points.clone(),
            raw_points: points,
            interpolation,
            offset_distance: 0.0,
            ccw: true,
            work_cut_speed: DEFAULT_CUT_SPEED,
            machine_cut_speed: DEFAULT_CUT_SPEED,
        }
    }

    /// Build a curve, resampling smooth splines by curvature when `refine` is set.
    pub fn with_refine(
        points: Vec<Point>,
        index: usize,
        interpolation: InterpolationMode,
        refine: bool,
        tol: &Tolerances,
    ) -> Self {
        let refinable = refine
            && interpolation == InterpolationMode::Cubic
            && CurveKind::from_len(points.len()) == CurveKind::Spline;
        if !refinable {
            return Self::new(points, index, interpolation);
        }
        let length = spline_length(&points);
        let n = ((length / tol.refine_step) as usize).max(tol.refine_min_points);
        let refined = refine_spline_curvature(&points, n, tol);
        debug!(index, before = points.len(), after = refined.len(), "refined spline");
        Self::new(refined, index, interpolation)
    }

    pub fn raw_points(&self) -> &[Point] {
        &self.raw_points
    }

    pub fn offset_points(&self) -> &[Point] {
        &self.offset_points
    }

    pub fn kind(&self) -> CurveKind {
        CurveKind::from_len(self.raw_points.len())
    }

    pub fn interpolation(&self) -> InterpolationMode {
        self.interpolation
    }

    pub fn start_point(&self) -> Point {
        self.raw_points.first().copied().unwrap_or(Point::ORIGIN)
    }

    pub fn end_point(&self) -> Point {
        self.raw_points.last().copied().unwrap_or(Point::ORIGIN)
    }

    pub fn offset_distance(&self) -> f64 {
        self.offset_distance
    }

    pub fn is_ccw(&self) -> bool {
        self.ccw
    }

    pub fn work_cut_speed(&self) -> f64 {
        self.work_cut_speed
    }

    pub fn machine_cut_speed(&self) -> f64 {
        self.machine_cut_speed
    }

    pub fn set_cut_speeds(&mut self, work: f64, machine: f64) {
        self.work_cut_speed = work;
        self.machine_cut_speed = machine;
    }

    /// Set the outward offset and rebuild the offset geometry.
    pub fn set_offset_distance(&mut self, distance: f64, tol: &Tolerances) {
        self.offset_distance = distance;
        self.update_offset(tol);
    }

    pub fn set_ccw(&mut self, ccw: bool, tol: &Tolerances) {
        if self.ccw != ccw {
            self.ccw = ccw;
            self.update_offset(tol);
        }
    }

    /// Move the offset to the other side without changing the cut direction.
    pub fn toggle_offset_side(&mut self, tol: &Tolerances) {
        self.set_ccw(!self.ccw, tol);
    }

    /// Reverse the cut direction. The offset stays on the same geometric side.
    pub fn toggle_cut_dir(&mut self) {
        self.raw_points.reverse();
        self.offset_points.reverse();
        self.ccw = !self.ccw;
    }

    /// Replace the defining points, e.g. after a merge or split.
    pub fn replace_points(
        &mut self,
        points: Vec<Point>,
        interpolation: InterpolationMode,
        tol: &Tolerances,
    ) {
        self.raw_points = points;
        self.interpolation = interpolation;
        self.update_offset(tol);
    }

    pub(crate) fn set_offset_points(&mut self, points: Vec<Point>) {
        self.offset_points = points;
    }

    fn update_offset(&mut self, tol: &Tolerances) {
        // Counter-clockwise loops have their outside on the right.
        let signed = if self.ccw {
            -self.offset_distance
        } else {
            self.offset_distance
        };
        self.offset_points = offset_line(&self.raw_points, signed, self.interpolation, tol);
    }

    fn points(&self, mode: LengthMode) -> &[Point] {
        match mode {
            LengthMode::Raw => &self.raw_points,
            LengthMode::Offset => &self.offset_points,
        }
    }

    /// Cumulative length at every point.
    pub fn length_array(&self, mode: LengthMode) -> Vec<f64> {
        let points = self.points(mode);
        match (CurveKind::from_len(points.len()), self.interpolation) {
            (CurveKind::Point, _) => vec![0.0],
            (CurveKind::Segment, _) | (_, InterpolationMode::Linear) => chord_length_array(points),
            (CurveKind::Spline, InterpolationMode::Cubic) => spline_length_array(points),
        }
    }

    pub fn length(&self, mode: LengthMode) -> f64 {
        let points = self.points(mode);
        match (CurveKind::from_len(points.len()), self.interpolation) {
            (CurveKind::Point, _) => 0.0,
            (CurveKind::Segment, _) | (_, InterpolationMode::Linear) => polyline_length(points),
            (CurveKind::Spline, InterpolationMode::Cubic) => spline_length(points),
        }
    }

    pub fn translate(&mut self, delta: Vec2) {
        translate_points(&mut self.raw_points, delta);
        translate_points(&mut self.offset_points, delta);
    }

    /// Rotate by `angle` radians about `center`.
    pub fn rotate(&mut self, angle: f64, center: Point) {
        rotate_points(&mut self.raw_points, angle, center);
        rotate_points(&mut self.offset_points, angle, center);
    }

    /// Excise self-crossing loops from the offset geometry. Returns whether
    /// anything was removed.
    pub fn remove_self_collision(&mut self, tol: &Tolerances) -> bool {
        let (points, removed) = remove_self_collision(&self.offset_points, tol);
        if !removed {
            return false;
        }
        let before = polyline_length(&self.offset_points);
        let after = polyline_length(&points);
        if before > 0.0 && (before - after) / before > tol.collision_shortening_warn_ratio {
            warn!(
                index = self.index,
                before, after, "self-collision repair shortened the curve"
            );
        }
        self.offset_points = points;
        true
    }

    /// Sampler over the offset geometry by normalized arc length.
    pub fn sampler(&self, tol: &Tolerances) -> ArcLengthSampler {
        ArcLengthSampler::new(&self.offset_points, self.interpolation, tol)
    }

    /// `n` offset points equally spaced by arc length.
    pub fn generate_arc_length_points(&self, n: usize, tol: &Tolerances) -> Vec<Point> {
        super::spline::generate_arc_length_points(&self.offset_points, self.interpolation, n, tol)
    }
}
