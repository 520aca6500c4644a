use serde::{Deserialize, Serialize};

pub mod curve;
pub mod fillet;
pub mod ids;
pub mod offset;
pub mod primitives;
pub mod spline;

// Re-export public types
pub use curve::{Curve, CurveKind, InterpolationMode, LengthMode};
pub use ids::CurveId;

/// Which interpolant is fitted when a spline is resampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SplineFit {
    /// Shape-preserving piecewise cubic Hermite; never overshoots between knots.
    #[default]
    Pchip,
    /// Natural cubic spline.
    Cubic,
}

/// Numeric tunables shared by every geometry routine.
///
/// Built once (usually from the job configuration) and passed by reference;
/// nothing in the crate mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerances {
    /// Points closer than this are the same point for tangents, sorting and fillets.
    pub dist_near: f64,
    /// Duplicate threshold used before fitting splines.
    pub dist_delta: f64,
    /// Curvature is clamped to `[1/r_max, 1/r_min]` during refinement.
    pub r_min: f64,
    pub r_max: f64,
    /// Target spacing when a spline is refined at import.
    pub refine_step: f64,
    pub refine_min_points: usize,
    /// Add extra samples near both ends of a refined spline.
    pub edge_refine: bool,
    pub edge_distance: f64,
    pub edge_points: usize,
    pub spline_fit: SplineFit,
    /// Points per fillet arc, ends included.
    pub fillet_points: usize,
    /// Maximum endpoint gap for merging two curves.
    pub merge_distance: f64,
    /// Self-collision repair warns when a curve loses more than this share of its length.
    pub collision_shortening_warn_ratio: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            dist_near: 0.01,
            dist_delta: 1e-6,
            r_min: 0.5,
            r_max: 1000.0,
            refine_step: 1.0,
            refine_min_points: 20,
            edge_refine: true,
            edge_distance: 0.5,
            edge_points: 4,
            spline_fit: SplineFit::Pchip,
            fillet_points: 12,
            merge_distance: 0.1,
            collision_shortening_warn_ratio: 0.1,
        }
    }
}
