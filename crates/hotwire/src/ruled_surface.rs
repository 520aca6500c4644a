//! Projection of work-piece paths onto the machine planes.
//!
//! The wire is a straight line through the XY and UV work-piece faces. The
//! machine moves its two carriages in planes further out, so every point
//! pair is extended along the line joining them.

use crate::error::{HotwireError, Result};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Distances along the wire axis, all measured from the XY machine plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaneDistances {
    /// XY machine plane to XY work face.
    pub z_xy: f64,
    /// UV machine plane to UV work face.
    pub z_uv: f64,
    /// XY machine plane to UV machine plane.
    pub z_mach: f64,
}

impl Default for PlaneDistances {
    fn default() -> Self {
        Self {
            z_xy: 25.0,
            z_uv: 50.0,
            z_mach: 500.0,
        }
    }
}

/// Scale factors from work face to machine plane for each side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneRatios {
    pub xy: f64,
    pub uv: f64,
}

impl PlaneDistances {
    pub fn validate(&self) -> Result<()> {
        let all_finite = [self.z_xy, self.z_uv, self.z_mach]
            .iter()
            .all(|d| d.is_finite());
        if !all_finite {
            return Err(HotwireError::MachineGeometry(
                "plane distances must be finite".into(),
            ));
        }
        if self.z_xy > self.z_mach || self.z_uv > self.z_mach {
            return Err(HotwireError::MachineGeometry(format!(
                "work faces ({}, {}) lie beyond the machine span {}",
                self.z_xy, self.z_uv, self.z_mach
            )));
        }
        Ok(())
    }

    /// Work-piece thickness between the two work faces.
    pub fn work_span(&self) -> f64 {
        self.z_mach - self.z_xy - self.z_uv
    }

    /// Projection ratios, measured from the mid plane between the work faces.
    /// A zero-thickness work piece projects with ratio 1 on both sides.
    pub fn ratios(&self) -> PlaneRatios {
        let z_mid = self.work_span() / 2.0 + self.z_xy;
        let xy_work = (z_mid - self.z_xy).abs();
        let uv_work = ((self.z_mach - self.z_uv) - z_mid).abs();
        if xy_work == 0.0 || uv_work == 0.0 {
            return PlaneRatios { xy: 1.0, uv: 1.0 };
        }
        PlaneRatios {
            xy: z_mid.abs() / xy_work,
            uv: (self.z_mach - z_mid).abs() / uv_work,
        }
    }
}

/// Extend work-face point pairs out to the machine planes.
///
/// Each output pair lies on the line through the input pair, which is what
/// keeps the wire cutting the intended ruled surface.
pub fn make_offset_path(
    xy: &[Point],
    uv: &[Point],
    planes: &PlaneDistances,
) -> Result<(Vec<Point>, Vec<Point>)> {
    if xy.len() != uv.len() {
        return Err(HotwireError::CurveCountMismatch {
            xy: xy.len(),
            uv: uv.len(),
        });
    }
    let k = planes.ratios();
    Ok(xy
        .iter()
        .zip(uv)
        .map(|(a, b)| {
            let mid = a.midpoint(*b);
            (mid + (*a - mid) * k.xy, mid + (*b - mid) * k.uv)
        })
        .unzip())
}

/// Feed rate at each reference plane along the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaneSpeeds {
    pub xy_mech: f64,
    pub xy_work: f64,
    pub mid: f64,
    pub uv_work: f64,
    pub uv_mech: f64,
}

impl PlaneSpeeds {
    pub fn uniform(speed: f64) -> Self {
        Self {
            xy_mech: speed,
            xy_work: speed,
            mid: speed,
            uv_work: speed,
            uv_mech: speed,
        }
    }
}

/// Plane whose speed is held at the nominal cut speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpeedReference {
    #[serde(rename = "XY(Mech)")]
    XyMech,
    #[serde(rename = "XY(Work)")]
    XyWork,
    #[default]
    #[serde(rename = "Center")]
    Center,
    #[serde(rename = "UV(Work)")]
    UvWork,
    #[serde(rename = "UV(Mech)")]
    UvMech,
}

impl std::str::FromStr for SpeedReference {
    type Err = HotwireError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "XY(Mech)" => Ok(Self::XyMech),
            "XY(Work)" => Ok(Self::XyWork),
            "Center" => Ok(Self::Center),
            "UV(Work)" => Ok(Self::UvWork),
            "UV(Mech)" => Ok(Self::UvMech),
            other => Err(HotwireError::InvalidSetting {
                kind: "speed reference",
                value: other.to_string(),
            }),
        }
    }
}

/// Distribute a nominal cut speed across the planes of one curve pair.
///
/// Speeds scale with the path length in each plane so every plane finishes
/// at the same time; the reference plane runs at `cut_speed`. A degenerate
/// reference length leaves every plane at the nominal speed.
pub fn cut_speeds(
    length_xy: f64,
    length_uv: f64,
    cut_speed: f64,
    planes: &PlaneDistances,
    reference: SpeedReference,
) -> PlaneSpeeds {
    let k = planes.ratios();
    let mid = (length_xy + length_uv) / 2.0;
    let lengths = PlaneSpeeds {
        xy_mech: k.xy * (length_xy - mid) + mid,
        xy_work: length_xy,
        mid,
        uv_work: length_uv,
        uv_mech: k.uv * (length_uv - mid) + mid,
    };
    let reference_length = match reference {
        SpeedReference::XyMech => lengths.xy_mech,
        SpeedReference::XyWork => lengths.xy_work,
        SpeedReference::Center => lengths.mid,
        SpeedReference::UvWork => lengths.uv_work,
        SpeedReference::UvMech => lengths.uv_mech,
    };
    if reference_length <= 0.0 || !reference_length.is_finite() {
        return PlaneSpeeds::uniform(cut_speed);
    }
    let scale = |length: f64| cut_speed * length / reference_length;
    PlaneSpeeds {
        xy_mech: scale(lengths.xy_mech),
        xy_work: scale(lengths.xy_work),
        mid: scale(lengths.mid),
        uv_work: scale(lengths.uv_work),
        uv_mech: scale(lengths.uv_mech),
    }
}
