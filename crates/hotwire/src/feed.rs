use crate::error::{HotwireError, Result};
use crate::geometry::spline::interp;
use crate::types::WirePoint;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// How the controller interprets the `F` word of a four-axis move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FeedMode {
    /// Speed of the XY carriage.
    #[default]
    #[serde(rename = "XY")]
    Xy,
    /// Speed of the UV carriage.
    #[serde(rename = "UV")]
    Uv,
    /// XY speed scaled to the vector length of the X, Y and U motion.
    #[serde(rename = "XYU")]
    Xyu,
    /// XY speed scaled to the vector length of the X, Y and V motion.
    #[serde(rename = "XYV")]
    Xyv,
    /// Inverse time (G93): moves per minute of the slower carriage.
    #[serde(rename = "InvertTime")]
    InvertTime,
    /// Speed of the faster carriage.
    #[serde(rename = "Faster")]
    Faster,
}

impl std::str::FromStr for FeedMode {
    type Err = HotwireError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "XY" => Ok(Self::Xy),
            "UV" => Ok(Self::Uv),
            "XYU" => Ok(Self::Xyu),
            "XYV" => Ok(Self::Xyv),
            "InvertTime" => Ok(Self::InvertTime),
            "Faster" => Ok(Self::Faster),
            other => Err(HotwireError::InvalidSetting {
                kind: "feed mode",
                value: other.to_string(),
            }),
        }
    }
}

impl FeedMode {
    /// Decimal places for the `F` word.
    pub fn feed_precision(self) -> usize {
        match self {
            FeedMode::InvertTime => 8,
            _ => 2,
        }
    }
}

fn travel_time(length: f64, speed: f64) -> f64 {
    if speed > 0.0 {
        length / speed
    } else {
        0.0
    }
}

/// Feed word for the move `from -> to`, given the machine-plane speeds of
/// the two carriages.
pub fn feed_for_move(
    mode: FeedMode,
    from: &WirePoint,
    to: &WirePoint,
    speed_xy: f64,
    speed_uv: f64,
    dist_near: f64,
) -> f64 {
    let (dx, dy) = (to.x - from.x, to.y - from.y);
    let (du, dv) = (to.u - from.u, to.v - from.v);
    let length_xy = dx.hypot(dy);
    let length_uv = du.hypot(dv);

    match mode {
        FeedMode::Xy => speed_xy,
        FeedMode::Uv => speed_uv,
        FeedMode::Xyu | FeedMode::Xyv => {
            let extra = if mode == FeedMode::Xyu { du } else { dv };
            let length = (dx * dx + dy * dy + extra * extra).sqrt();
            if length_xy > dist_near && length > dist_near {
                speed_xy * length / length_xy
            } else {
                speed_xy
            }
        }
        FeedMode::InvertTime => {
            let time = travel_time(length_xy, speed_xy).max(travel_time(length_uv, speed_uv));
            let time = if time > 0.0 {
                time
            } else {
                travel_time(dist_near, speed_xy.max(speed_uv))
            };
            if time > 0.0 {
                1.0 / time
            } else {
                0.0
            }
        }
        FeedMode::Faster => speed_xy.max(speed_uv),
    }
}

/// Kerf compensation: offset distance as a function of cut speed.
///
/// Piecewise linear between samples and flat outside them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OffsetFunction {
    speeds: Vec<f64>,
    offsets: Vec<f64>,
}

impl Default for OffsetFunction {
    fn default() -> Self {
        Self {
            speeds: vec![1.0, 1000.0],
            offsets: vec![0.0, 0.0],
        }
    }
}

impl OffsetFunction {
    pub fn new(speeds: Vec<f64>, offsets: Vec<f64>) -> Result<Self> {
        if speeds.is_empty() || speeds.len() != offsets.len() {
            return Err(HotwireError::OffsetTable(format!(
                "{} speeds for {} offsets",
                speeds.len(),
                offsets.len()
            )));
        }
        if speeds.iter().chain(&offsets).any(|v| !v.is_finite()) {
            return Err(HotwireError::OffsetTable("non-finite sample".into()));
        }
        if speeds.windows(2).any(|w| w[1] <= w[0]) {
            return Err(HotwireError::OffsetTable(
                "speeds must be strictly increasing".into(),
            ));
        }
        Ok(Self { speeds, offsets })
    }

    /// Load a `{ "speeds": [...], "offsets": [...] }` table.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data =
            fs::read(path).with_context(|| format!("read offset table {}", path.display()))?;
        let raw: OffsetFunction =
            serde_json::from_slice(&data).context("deserialize offset table")?;
        Ok(Self::new(raw.speeds, raw.offsets)?)
    }

    pub fn eval(&self, speed: f64) -> f64 {
        interp(speed, &self.speeds, &self.offsets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::io::Write;

    fn wp(x: f64, y: f64, u: f64, v: f64) -> WirePoint {
        WirePoint { x, y, u, v }
    }

    #[test]
    fn test_feed_modes() {
        let from = wp(0.0, 0.0, 0.0, 0.0);
        let to = wp(3.0, 4.0, 6.0, 8.0);
        let near = 0.01;
        assert_eq!(feed_for_move(FeedMode::Xy, &from, &to, 100.0, 200.0, near), 100.0);
        assert_eq!(feed_for_move(FeedMode::Uv, &from, &to, 100.0, 200.0, near), 200.0);
        assert_eq!(feed_for_move(FeedMode::Faster, &from, &to, 100.0, 200.0, near), 200.0);

        let xyu = feed_for_move(FeedMode::Xyu, &from, &to, 100.0, 200.0, near);
        assert_abs_diff_eq!(xyu, 100.0 * (61.0f64).sqrt() / 5.0, epsilon = 1e-9);
        let xyv = feed_for_move(FeedMode::Xyv, &from, &to, 100.0, 200.0, near);
        assert_abs_diff_eq!(xyv, 100.0 * (89.0f64).sqrt() / 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_inverse_time_uses_slower_carriage() {
        let from = wp(0.0, 0.0, 0.0, 0.0);
        let to = wp(10.0, 0.0, 30.0, 0.0);
        // XY needs 0.1 min, UV needs 0.3 min
        let feed = feed_for_move(FeedMode::InvertTime, &from, &to, 100.0, 100.0, 0.01);
        assert_abs_diff_eq!(feed, 1.0 / 0.3, epsilon = 1e-9);

        let still = feed_for_move(FeedMode::InvertTime, &from, &from, 100.0, 50.0, 0.01);
        assert_abs_diff_eq!(still, 100.0 / 0.01, epsilon = 1e-6);
    }

    #[test]
    fn test_xyu_falls_back_on_zero_xy_move() {
        let from = wp(0.0, 0.0, 0.0, 0.0);
        let to = wp(0.0, 0.0, 5.0, 0.0);
        assert_eq!(feed_for_move(FeedMode::Xyu, &from, &to, 120.0, 80.0, 0.01), 120.0);
    }

    #[test]
    fn test_feed_mode_strings() {
        assert_eq!("InvertTime".parse::<FeedMode>(), Ok(FeedMode::InvertTime));
        assert!("G93".parse::<FeedMode>().is_err());
        assert_eq!(FeedMode::InvertTime.feed_precision(), 8);
        assert_eq!(FeedMode::Faster.feed_precision(), 2);
    }

    #[test]
    fn test_offset_function_is_flat_outside_samples() {
        let f = OffsetFunction::new(vec![100.0, 300.0], vec![0.4, 0.2]).expect("table");
        assert_abs_diff_eq!(f.eval(0.0), 0.4);
        assert_abs_diff_eq!(f.eval(200.0), 0.3, epsilon = 1e-12);
        assert_abs_diff_eq!(f.eval(10000.0), 0.2);
        assert_eq!(OffsetFunction::default().eval(500.0), 0.0);
    }

    #[test]
    fn test_offset_function_rejects_bad_tables() {
        assert!(OffsetFunction::new(vec![], vec![]).is_err());
        assert!(OffsetFunction::new(vec![1.0, 2.0], vec![0.1]).is_err());
        assert!(OffsetFunction::new(vec![2.0, 1.0], vec![0.1, 0.2]).is_err());
    }

    #[test]
    fn test_offset_function_load() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"speeds": [50, 150], "offsets": [1.0, 0.5]}}"#).expect("write");
        let f = OffsetFunction::load_from_path(file.path()).expect("load");
        assert_abs_diff_eq!(f.eval(100.0), 0.75, epsilon = 1e-12);

        let mut bad = tempfile::NamedTempFile::new().expect("temp file");
        write!(bad, r#"{{"speeds": [150, 50], "offsets": [1.0, 0.5]}}"#).expect("write");
        assert!(OffsetFunction::load_from_path(bad.path()).is_err());
    }
}
