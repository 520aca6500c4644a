use crate::feed::FeedMode;
use crate::geometry::Tolerances;
use crate::ruled_surface::{PlaneDistances, SpeedReference};
use anyhow::{anyhow, Context, Result};
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const DEFAULT_HEADER: &str = "T1\nG17 G49 G54 G80 G90 G94 G21 G40 G64\n";

/// Job settings. Every field falls back to its default when missing from
/// the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotwireConfig {
    /// Default XY drawing.
    pub xy_file: Option<PathBuf>,
    /// Default UV drawing.
    pub uv_file: Option<PathBuf>,
    /// Where the wire enters, on both planes.
    pub start: Point,
    /// Where the wire leaves, on both planes.
    pub end: Point,
    /// Target spacing between emitted points.
    pub step_length: f64,
    pub offset_xy: f64,
    pub offset_uv: f64,
    /// Nominal cut speed, applied at `speed_reference`.
    pub cut_speed: f64,
    pub speed_reference: SpeedReference,
    pub feed_mode: FeedMode,
    pub planes: PlaneDistances,
    pub origin_offset: Vec2,
    /// Degrees.
    pub rotation: f64,
    /// Program header. Literal `\n` sequences become line breaks on load.
    pub header: String,
    /// Output names for the X, Y, U and V axes, whitespace separated.
    pub axis_labels: String,
    /// Repair self collisions before generating.
    pub auto_repair: bool,
    /// Resample splines by curvature on import.
    pub auto_refine: bool,
    /// Round gaps between consecutive curves with arcs.
    pub fillet: bool,
    pub tolerances: Tolerances,
}

impl Default for HotwireConfig {
    fn default() -> Self {
        Self {
            xy_file: None,
            uv_file: None,
            start: Point::ORIGIN,
            end: Point::ORIGIN,
            step_length: 1.0,
            offset_xy: 0.0,
            offset_uv: 0.0,
            cut_speed: 200.0,
            speed_reference: SpeedReference::Center,
            feed_mode: FeedMode::Xy,
            planes: PlaneDistances::default(),
            origin_offset: Vec2::ZERO,
            rotation: 0.0,
            header: DEFAULT_HEADER.to_string(),
            axis_labels: "X Y Z A".to_string(),
            auto_repair: false,
            auto_refine: false,
            fillet: true,
            tolerances: Tolerances::default(),
        }
    }
}

/// How a configuration was obtained.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigStatus {
    Loaded,
    /// Defaults are in use; `reason` says why.
    Defaulted { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigLoad {
    pub config: HotwireConfig,
    pub status: ConfigStatus,
}

impl HotwireConfig {
    /// Strict load; any problem is an error.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
        let mut config: HotwireConfig =
            serde_json::from_slice(&data).context("deserialize config")?;
        config.header = config.header.replace("\\n", "\n");
        config.validate()?;
        Ok(config)
    }

    /// Load the file, or fall back to the defaults with the failure reason.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> ConfigLoad {
        match Self::load_from_path(&path) {
            Ok(config) => {
                info!(path = %path.as_ref().display(), "config loaded");
                ConfigLoad {
                    config,
                    status: ConfigStatus::Loaded,
                }
            }
            Err(err) => {
                let reason = format!("{err:#}");
                warn!(%reason, "using default config");
                ConfigLoad {
                    config: Self::default(),
                    status: ConfigStatus::Defaulted { reason },
                }
            }
        }
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("create config directory {}", parent.display()))?;
        }
        let data = serde_json::to_vec_pretty(self).context("serialize config to JSON bytes")?;
        fs::write(path, data).with_context(|| format!("write config {}", path.display()))
    }

    /// Resolve the default config path (`~/.hotwire/config.json`).
    pub fn default_config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| anyhow!("could not determine home directory"))?;
        Ok(home.join(".hotwire").join("config.json"))
    }

    pub fn validate(&self) -> Result<()> {
        let numbers = [
            self.step_length,
            self.offset_xy,
            self.offset_uv,
            self.cut_speed,
            self.rotation,
        ];
        if numbers.iter().any(|n| !n.is_finite()) {
            return Err(anyhow!("config holds a non-finite number"));
        }
        if self.cut_speed <= 0.0 {
            return Err(anyhow!("cut speed must be positive, got {}", self.cut_speed));
        }
        self.planes.validate()?;
        Ok(())
    }

    /// Non-empty header lines.
    pub fn header_lines(&self) -> Vec<String> {
        self.header
            .split('\n')
            .map(|l| l.trim_end_matches('\r'))
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Output letters for X, Y, U and V, or `None` unless exactly four are
    /// configured.
    pub fn axis_labels(&self) -> Option<[String; 4]> {
        let mut labels = self.axis_labels.split_whitespace().map(str::to_string);
        let parsed = [labels.next()?, labels.next()?, labels.next()?, labels.next()?];
        labels.next().is_none().then_some(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HotwireConfig::default();
        assert_eq!(config.cut_speed, 200.0);
        assert_eq!(config.planes.z_mach, 500.0);
        assert_eq!(
            config.header_lines(),
            vec!["T1", "G17 G49 G54 G80 G90 G94 G21 G40 G64"]
        );
        assert_eq!(
            config.axis_labels(),
            Some(["X", "Y", "Z", "A"].map(String::from))
        );
    }

    #[test]
    fn test_partial_file_expands_header() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"cut_speed": 150, "header": "G90\\nG21", "feed_mode": "InvertTime",
                "speed_reference": "UV(Work)"}"#,
        )
        .expect("write");

        let load = HotwireConfig::load_or_default(&path);
        assert_eq!(load.status, ConfigStatus::Loaded);
        assert_eq!(load.config.cut_speed, 150.0);
        assert_eq!(load.config.header_lines(), vec!["G90", "G21"]);
        assert_eq!(load.config.feed_mode, FeedMode::InvertTime);
        assert_eq!(load.config.speed_reference, SpeedReference::UvWork);
        assert_eq!(load.config.step_length, 1.0);
    }

    #[test]
    fn test_bad_files_fall_back_with_reason() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = HotwireConfig::load_or_default(dir.path().join("nope.json"));
        assert_eq!(missing.config, HotwireConfig::default());
        assert!(matches!(missing.status, ConfigStatus::Defaulted { .. }));

        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"feed_mode": "Sideways"}"#).expect("write");
        let bad = HotwireConfig::load_or_default(&path);
        assert!(matches!(bad.status, ConfigStatus::Defaulted { .. }));

        let path = dir.path().join("span.json");
        std::fs::write(&path, r#"{"planes": {"z_xy": 900, "z_uv": 10, "z_mach": 500}}"#)
            .expect("write");
        let span = HotwireConfig::load_or_default(&path);
        match span.status {
            ConfigStatus::Defaulted { reason } => assert!(reason.contains("machine span")),
            ConfigStatus::Loaded => panic!("expected defaults"),
        }
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("config.json");
        let config = HotwireConfig {
            rotation: 12.5,
            auto_repair: true,
            ..HotwireConfig::default()
        };
        config.save_to_path(&path).expect("save");
        let loaded = HotwireConfig::load_from_path(&path).expect("load");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_axis_labels_need_four() {
        let config = HotwireConfig {
            axis_labels: "X Y Z".to_string(),
            ..HotwireConfig::default()
        };
        assert_eq!(config.axis_labels(), None);
    }
}
