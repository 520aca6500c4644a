//! Parametric interpolation, arc length, and the two resampling schemes:
//! curvature-adaptive refinement and equal arc-length spacing.

use super::primitives::{chord_length_array, dedup_points};
use super::{InterpolationMode, SplineFit, Tolerances};
use kurbo::Point;

/// Piecewise cubic `y(t)` over strictly increasing knots.
///
/// Segment `i` is `a + b*s + c*s^2 + d*s^3` with `s = t - knots[i]`.
/// Outside the knot range the first/last segment is extrapolated.
#[derive(Debug, Clone, PartialEq)]
pub struct PiecewiseCubic {
    knots: Vec<f64>,
    coeffs: Vec<[f64; 4]>,
}

fn strictly_increasing(xs: &[f64]) -> bool {
    xs.windows(2).all(|w| w[1] > w[0])
}

impl PiecewiseCubic {
    /// Piecewise-linear interpolant.
    pub fn linear(xs: &[f64], ys: &[f64]) -> Option<Self> {
        if xs.len() != ys.len() || xs.is_empty() || !strictly_increasing(xs) {
            return None;
        }
        if xs.len() == 1 {
            return Some(Self::constant(xs[0], ys[0]));
        }
        let coeffs = (0..xs.len() - 1)
            .map(|i| {
                let slope = (ys[i + 1] - ys[i]) / (xs[i + 1] - xs[i]);
                [ys[i], slope, 0.0, 0.0]
            })
            .collect();
        Some(Self {
            knots: xs.to_vec(),
            coeffs,
        })
    }

    /// Natural cubic spline (zero second derivative at both ends).
    pub fn natural(xs: &[f64], ys: &[f64]) -> Option<Self> {
        if xs.len() < 3 {
            return Self::linear(xs, ys);
        }
        if xs.len() != ys.len() || !strictly_increasing(xs) {
            return None;
        }
        let n = xs.len();
        let h: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();

        // Tridiagonal system for the interior second derivatives.
        let m = n - 2;
        let mut diag = vec![0.0; m];
        let mut upper = vec![0.0; m];
        let mut rhs = vec![0.0; m];
        for k in 0..m {
            let i = k + 1;
            diag[k] = 2.0 * (h[i - 1] + h[i]);
            upper[k] = h[i];
            rhs[k] = 6.0 * ((ys[i + 1] - ys[i]) / h[i] - (ys[i] - ys[i - 1]) / h[i - 1]);
        }
        for k in 1..m {
            let w = h[k] / diag[k - 1];
            diag[k] -= w * upper[k - 1];
            rhs[k] -= w * rhs[k - 1];
        }
        let mut second = vec![0.0; n];
        for k in (0..m).rev() {
            let next = if k + 1 < m { second[k + 2] } else { 0.0 };
            second[k + 1] = (rhs[k] - upper[k] * next) / diag[k];
        }

        let coeffs = (0..n - 1)
            .map(|i| {
                let hi = h[i];
                let b = (ys[i + 1] - ys[i]) / hi - hi * (2.0 * second[i] + second[i + 1]) / 6.0;
                [
                    ys[i],
                    b,
                    second[i] / 2.0,
                    (second[i + 1] - second[i]) / (6.0 * hi),
                ]
            })
            .collect();
        Some(Self {
            knots: xs.to_vec(),
            coeffs,
        })
    }

    /// Monotone piecewise cubic Hermite (Fritsch-Carlson slopes).
    pub fn pchip(xs: &[f64], ys: &[f64]) -> Option<Self> {
        if xs.len() < 3 {
            return Self::linear(xs, ys);
        }
        if xs.len() != ys.len() || !strictly_increasing(xs) {
            return None;
        }
        let n = xs.len();
        let h: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();
        let delta: Vec<f64> = (0..n - 1).map(|i| (ys[i + 1] - ys[i]) / h[i]).collect();

        let mut slopes = vec![0.0; n];
        for k in 1..n - 1 {
            let (d0, d1) = (delta[k - 1], delta[k]);
            if d0 * d1 <= 0.0 {
                continue;
            }
            let w1 = 2.0 * h[k] + h[k - 1];
            let w2 = h[k] + 2.0 * h[k - 1];
            slopes[k] = (w1 + w2) / (w1 / d0 + w2 / d1);
        }
        slopes[0] = pchip_edge_slope(h[0], h[1], delta[0], delta[1]);
        slopes[n - 1] = pchip_edge_slope(h[n - 2], h[n - 3], delta[n - 2], delta[n - 3]);

        let coeffs = (0..n - 1)
            .map(|i| {
                let hi = h[i];
                let (m0, m1) = (slopes[i], slopes[i + 1]);
                [
                    ys[i],
                    m0,
                    (3.0 * delta[i] - 2.0 * m0 - m1) / hi,
                    (m0 + m1 - 2.0 * delta[i]) / (hi * hi),
                ]
            })
            .collect();
        Some(Self {
            knots: xs.to_vec(),
            coeffs,
        })
    }

    /// Fit with the interpolant selected in the tolerances.
    pub fn fit(xs: &[f64], ys: &[f64], fit: SplineFit) -> Option<Self> {
        match fit {
            SplineFit::Pchip => Self::pchip(xs, ys),
            SplineFit::Cubic => Self::natural(xs, ys),
        }
    }

    fn constant(x: f64, y: f64) -> Self {
        Self {
            knots: vec![x, x],
            coeffs: vec![[y, 0.0, 0.0, 0.0]],
        }
    }

    fn segment(&self, t: f64) -> (usize, f64) {
        let last = self.coeffs.len() - 1;
        let i = self
            .knots
            .partition_point(|&k| k <= t)
            .saturating_sub(1)
            .min(last);
        (i, t - self.knots[i])
    }

    pub fn eval(&self, t: f64) -> f64 {
        let (i, s) = self.segment(t);
        let [a, b, c, d] = self.coeffs[i];
        a + s * (b + s * (c + s * d))
    }

    pub fn deriv(&self, t: f64) -> f64 {
        let (i, s) = self.segment(t);
        let [_, b, c, d] = self.coeffs[i];
        b + s * (2.0 * c + 3.0 * d * s)
    }

    pub fn deriv2(&self, t: f64) -> f64 {
        let (i, s) = self.segment(t);
        let [_, _, c, d] = self.coeffs[i];
        2.0 * c + 6.0 * d * s
    }

    pub fn knots(&self) -> &[f64] {
        &self.knots
    }
}

fn pchip_edge_slope(h0: f64, h1: f64, d0: f64, d1: f64) -> f64 {
    let m = ((2.0 * h0 + h1) * d0 - h0 * d1) / (h0 + h1);
    if m.signum() != d0.signum() || d0 == 0.0 {
        0.0
    } else if d0.signum() != d1.signum() && m.abs() > 3.0 * d0.abs() {
        3.0 * d0
    } else {
        m
    }
}

const GAUSS_NODES: [f64; 5] = [
    -0.906_179_845_938_664,
    -0.538_469_310_105_683,
    0.0,
    0.538_469_310_105_683,
    0.906_179_845_938_664,
];
const GAUSS_WEIGHTS: [f64; 5] = [
    0.236_926_885_056_189,
    0.478_628_670_499_366,
    0.568_888_888_888_889,
    0.478_628_670_499_366,
    0.236_926_885_056_189,
];

fn speed_integral(fx: &PiecewiseCubic, fy: &PiecewiseCubic, a: f64, b: f64) -> f64 {
    let half = (b - a) / 2.0;
    let mid = (a + b) / 2.0;
    GAUSS_NODES
        .iter()
        .zip(GAUSS_WEIGHTS.iter())
        .map(|(&x, &w)| {
            let t = mid + half * x;
            w * fx.deriv(t).hypot(fy.deriv(t))
        })
        .sum::<f64>()
        * half
}

/// Cumulative arc length of the natural cubic spline through `points`,
/// parametrized uniformly by point index.
pub fn spline_length_array(points: &[Point]) -> Vec<f64> {
    if points.len() < 3 {
        return chord_length_array(points);
    }
    let ts: Vec<f64> = (0..points.len()).map(|i| i as f64).collect();
    let xs: Vec<f64> = points.iter().map(|p| p.x).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.y).collect();
    let (Some(fx), Some(fy)) = (PiecewiseCubic::natural(&ts, &xs), PiecewiseCubic::natural(&ts, &ys))
    else {
        return chord_length_array(points);
    };

    let mut out = Vec::with_capacity(points.len());
    let mut acc = 0.0;
    out.push(acc);
    for w in ts.windows(2) {
        acc += speed_integral(&fx, &fy, w[0], w[1]);
        out.push(acc);
    }
    out
}

pub fn spline_length(points: &[Point]) -> f64 {
    spline_length_array(points).last().copied().unwrap_or(0.0)
}

/// `n` evenly spaced values over `[a, b]`, both ends included.
pub fn linspace(a: f64, b: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![a],
        _ => (0..n)
            .map(|i| a + (b - a) * i as f64 / (n - 1) as f64)
            .collect(),
    }
}

/// Linear interpolation of `x` against increasing `xp`, clamped at both ends.
pub fn interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    if xp.is_empty() {
        return 0.0;
    }
    if x <= xp[0] {
        return fp[0];
    }
    let last = xp.len() - 1;
    if x >= xp[last] {
        return fp[last];
    }
    let i = xp.partition_point(|&v| v <= x).saturating_sub(1);
    let span = xp[i + 1] - xp[i];
    if span <= 0.0 {
        return fp[i];
    }
    fp[i] + (fp[i + 1] - fp[i]) * (x - xp[i]) / span
}

fn normalized(lengths: &[f64]) -> Option<Vec<f64>> {
    let total = *lengths.last()?;
    if total <= 0.0 {
        return None;
    }
    Some(lengths.iter().map(|l| l / total).collect())
}

/// Drop samples whose parameter does not strictly increase.
fn strictly_increasing_samples(params: Vec<f64>, points: Vec<Point>) -> (Vec<f64>, Vec<Point>) {
    let mut ts = Vec::with_capacity(params.len());
    let mut ps = Vec::with_capacity(points.len());
    for (t, p) in params.into_iter().zip(points) {
        if ts.last().map_or(true, |&last| t > last) {
            ts.push(t);
            ps.push(p);
        }
    }
    (ts, ps)
}

fn sorted_unique(mut values: Vec<f64>) -> Vec<f64> {
    values.sort_by(f64::total_cmp);
    values.dedup_by(|a, b| (*a - *b).abs() < 1e-12);
    values
}

/// Redistribute a spline's points so their density follows curvature.
///
/// Returns the input (deduplicated) when it is too short to fit.
pub fn refine_spline_curvature(points: &[Point], n: usize, tol: &Tolerances) -> Vec<Point> {
    let pts = dedup_points(points, tol.dist_delta);
    if pts.len() < 2 {
        return pts;
    }
    let n = n.max(4);

    let lengths = spline_length_array(&pts);
    let total = lengths.last().copied().unwrap_or(0.0);
    let Some(u) = normalized(&lengths) else {
        return pts;
    };
    let (u, pts) = strictly_increasing_samples(u, pts);
    let xs: Vec<f64> = pts.iter().map(|p| p.x).collect();
    let ys: Vec<f64> = pts.iter().map(|p| p.y).collect();
    let (Some(fx), Some(fy)) = (
        PiecewiseCubic::fit(&u, &xs, tol.spline_fit),
        PiecewiseCubic::fit(&u, &ys, tol.spline_fit),
    ) else {
        return pts;
    };

    let grid = linspace(0.0, 1.0, n);
    let curvature: Vec<f64> = grid
        .iter()
        .map(|&t| {
            let (dx, dy) = (fx.deriv(t), fy.deriv(t));
            let (ddx, ddy) = (fx.deriv2(t), fy.deriv2(t));
            let denom = (dx * dx + dy * dy).powf(1.5);
            if denom < tol.dist_delta {
                1.0 / tol.r_min
            } else {
                ((dx * ddy - dy * ddx).abs() / denom).clamp(1.0 / tol.r_max, 1.0 / tol.r_min)
            }
        })
        .collect();

    let mut cumulative = vec![0.0; n];
    for i in 1..n {
        cumulative[i] =
            cumulative[i - 1] + (curvature[i] + curvature[i - 1]) / 2.0 * (grid[i] - grid[i - 1]);
    }
    let last = cumulative[n - 1];
    for c in cumulative.iter_mut() {
        *c /= last;
    }

    let mut params: Vec<f64> = grid.iter().map(|&t| interp(t, &cumulative, &grid)).collect();

    if tol.edge_refine && total > 0.0 {
        let step = tol.edge_distance / total;
        let first_gap = params[1];
        let last_gap = params[n - 2];
        for i in 1..=tol.edge_points {
            let near_start = step * i as f64;
            if near_start < first_gap {
                params.push(near_start);
            }
            let near_end = 1.0 - step * i as f64;
            if near_end > last_gap {
                params.push(near_end);
            }
        }
    }

    sorted_unique(params)
        .into_iter()
        .map(|t| Point::new(fx.eval(t), fy.eval(t)))
        .collect()
}

/// Position along a curve as a function of normalized arc length.
#[derive(Debug, Clone)]
pub struct ArcLengthSampler {
    fx: PiecewiseCubic,
    fy: PiecewiseCubic,
    /// Knot parameters that must survive resampling (corners of a polyline).
    corners: Vec<f64>,
}

impl ArcLengthSampler {
    pub fn new(points: &[Point], mode: InterpolationMode, tol: &Tolerances) -> Self {
        let constant = |p: Point| Self {
            fx: PiecewiseCubic::constant(0.0, p.x),
            fy: PiecewiseCubic::constant(0.0, p.y),
            corners: Vec::new(),
        };
        let Some(&first) = points.first() else {
            return constant(Point::ORIGIN);
        };
        let pts = dedup_points(points, tol.dist_delta);
        if pts.len() < 2 {
            return constant(first);
        }

        let linear = pts.len() == 2 || mode == InterpolationMode::Linear;
        let lengths = if linear {
            chord_length_array(&pts)
        } else {
            spline_length_array(&pts)
        };
        let Some(t) = normalized(&lengths) else {
            return constant(first);
        };
        let (t, pts) = strictly_increasing_samples(t, pts);
        let xs: Vec<f64> = pts.iter().map(|p| p.x).collect();
        let ys: Vec<f64> = pts.iter().map(|p| p.y).collect();

        let fitted = if linear {
            PiecewiseCubic::linear(&t, &xs).zip(PiecewiseCubic::linear(&t, &ys))
        } else {
            PiecewiseCubic::fit(&t, &xs, tol.spline_fit)
                .zip(PiecewiseCubic::fit(&t, &ys, tol.spline_fit))
        };
        match fitted {
            Some((fx, fy)) => Self {
                fx,
                fy,
                corners: if mode == InterpolationMode::Linear && t.len() > 2 {
                    t
                } else {
                    Vec::new()
                },
            },
            None => constant(first),
        }
    }

    pub fn corners(&self) -> &[f64] {
        &self.corners
    }

    pub fn at(&self, t: f64) -> Point {
        Point::new(self.fx.eval(t), self.fy.eval(t))
    }

    pub fn sample(&self, params: &[f64]) -> Vec<Point> {
        params.iter().map(|&t| self.at(t)).collect()
    }
}

/// The parameter set shared by a matched pair: `n` uniform values plus every
/// polyline corner of either side.
pub fn shared_parameters(n: usize, samplers: &[&ArcLengthSampler]) -> Vec<f64> {
    let mut params = linspace(0.0, 1.0, n);
    let has_corners = samplers.iter().any(|s| !s.corners().is_empty());
    if !has_corners {
        return params;
    }
    for s in samplers {
        params.extend_from_slice(s.corners());
    }
    sorted_unique(params)
}

/// Resample a point sequence to `n` points equally spaced by arc length.
///
/// Linear mode keeps its corner points, so it may return more than `n`.
pub fn generate_arc_length_points(
    points: &[Point],
    mode: InterpolationMode,
    n: usize,
    tol: &Tolerances,
) -> Vec<Point> {
    let sampler = ArcLengthSampler::new(points, mode, tol);
    sampler.sample(&shared_parameters(n, &[&sampler]))
}
