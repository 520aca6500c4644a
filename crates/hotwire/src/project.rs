use crate::config::HotwireConfig;
use crate::import::{check_file, load_primitives};
use crate::profile::Profile;
use anyhow::{Context, Result};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};
use tracing::info;

/// Increment when the on-disk layout changes.
pub const PROJECT_FILE_VERSION: u32 = 1;

/// Which cross-section a profile describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Plane {
    Xy,
    Uv,
}

/// A hot-wire job: the two cross-sections and the settings they are cut with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub meta: ProjectMeta,
    pub config: HotwireConfig,
    pub xy: Profile,
    pub uv: Profile,
    #[serde(default)]
    pub xy_source: Option<PathBuf>,
    #[serde(default)]
    pub uv_source: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMeta {
    pub name: String,
    pub description: Option<String>,
    pub version: u32,
    pub created_at_epoch_ms: u64,
    pub updated_at_epoch_ms: u64,
    pub file_version: u32,
}

/// Compact description of a job for listings.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectSummary {
    pub name: String,
    pub xy_curves: usize,
    pub uv_curves: usize,
    pub cut_speed: f64,
}

impl Project {
    pub fn new(name: impl Into<String>, config: HotwireConfig) -> Self {
        let now = current_epoch_ms();
        Self {
            meta: ProjectMeta {
                name: name.into(),
                description: None,
                version: 1,
                created_at_epoch_ms: now,
                updated_at_epoch_ms: now,
                file_version: PROJECT_FILE_VERSION,
            },
            config,
            xy: Profile::new("XY"),
            uv: Profile::new("UV"),
            xy_source: None,
            uv_source: None,
        }
    }

    /// Persist the project to disk as prettified JSON.
    pub fn save_to_path<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.touch_updated_timestamp();
        let data = serde_json::to_vec_pretty(self).context("serialize project")?;
        fs::write(path, data).context("write project file")
    }

    /// Load a project from disk.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = fs::read(&path).with_context(|| {
            format!("read project file from {}", path.as_ref().to_string_lossy())
        })?;
        let project: Project =
            serde_json::from_slice(&bytes).context("deserialize project file")?;
        Ok(project)
    }

    pub fn touch_updated_timestamp(&mut self) {
        self.meta.updated_at_epoch_ms = current_epoch_ms();
    }

    pub fn summary(&self) -> ProjectSummary {
        ProjectSummary {
            name: self.meta.name.clone(),
            xy_curves: self.xy.len(),
            uv_curves: self.uv.len(),
            cut_speed: self.config.cut_speed,
        }
    }

    pub fn profile(&self, plane: Plane) -> &Profile {
        match plane {
            Plane::Xy => &self.xy,
            Plane::Uv => &self.uv,
        }
    }

    pub fn profile_mut(&mut self, plane: Plane) -> &mut Profile {
        match plane {
            Plane::Xy => &mut self.xy,
            Plane::Uv => &mut self.uv,
        }
    }

    /// Replace one cross-section with the contents of a DXF or SVG drawing.
    ///
    /// The drawing picks up the configured offset for its plane; the job's
    /// origin offset and rotation are re-applied to both planes.
    pub fn import<P: AsRef<Path>>(&mut self, plane: Plane, path: P) -> Result<()> {
        let path = path.as_ref();
        check_file(path).into_result(path)?;
        let primitives = load_primitives(path)
            .with_context(|| format!("import drawing {}", path.display()))?;

        let tol = self.config.tolerances.clone();
        let refine = self.config.auto_refine;
        let offset = match plane {
            Plane::Xy => self.config.offset_xy,
            Plane::Uv => self.config.offset_uv,
        };
        let profile = self.profile_mut(plane);
        profile.reload(&primitives, refine, &tol);
        profile.set_offset_distance_all(offset, &tol);

        match plane {
            Plane::Xy => self.xy_source = Some(path.to_path_buf()),
            Plane::Uv => self.uv_source = Some(path.to_path_buf()),
        }
        info!(?plane, path = %path.display(), curves = self.profile(plane).len(), "imported drawing");
        self.apply_transforms();
        Ok(())
    }

    /// Move both profiles to the configured origin offset and rotation. The
    /// rotation turns about the midpoint of the two profiles' centroids.
    pub fn apply_transforms(&mut self) {
        let offset = self.config.origin_offset;
        self.xy.set_origin_offset(offset);
        self.uv.set_origin_offset(offset);

        let center = rotation_center(&self.xy, &self.uv);
        self.xy.set_rotation(self.config.rotation, center);
        self.uv.set_rotation(self.config.rotation, center);
    }

    /// Re-apply the configured offsets to every curve of both planes.
    pub fn apply_offsets(&mut self) {
        let tol = &self.config.tolerances;
        self.xy.set_offset_distance_all(self.config.offset_xy, tol);
        self.uv.set_offset_distance_all(self.config.offset_uv, tol);
    }
}

fn rotation_center(xy: &Profile, uv: &Profile) -> Point {
    match (xy.is_empty(), uv.is_empty()) {
        (true, true) => Point::ORIGIN,
        (false, true) => xy.centroid(),
        (true, false) => uv.centroid(),
        (false, false) => xy.centroid().midpoint(uv.centroid()),
    }
}

fn current_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|dur| dur.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::InterpolationMode;
    use approx::assert_abs_diff_eq;

    const SQUARE_SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100">
<path d="M 0 0 L 10 0 L 10 10 L 0 10 Z" fill="none" stroke="black"/>
</svg>"#;

    #[test]
    fn project_round_trip() {
        let mut project = Project::new("Wing", HotwireConfig::default());
        project.xy.add_curve(
            vec![Point::new(0.0, 0.0), Point::new(10.0, 10.0)],
            InterpolationMode::Cubic,
        );

        let mut bytes = Vec::new();
        project.touch_updated_timestamp();
        serde_json::to_writer(&mut bytes, &project).expect("serialize");
        let restored: Project = serde_json::from_slice(&bytes).expect("deserialize");

        assert_eq!(restored.meta.name, "Wing");
        assert_eq!(restored.xy.len(), 1);
        assert_eq!(restored.xy.ids(), project.xy.ids());
        assert_eq!(restored.config, project.config);
    }

    #[test]
    fn save_and_load_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("job.json");
        let mut project = Project::new("Job", HotwireConfig::default());
        project.uv.add_curve(
            vec![Point::new(1.0, 0.0), Point::new(2.0, 0.0)],
            InterpolationMode::Cubic,
        );
        project.save_to_path(&path).expect("save");
        let loaded = Project::load_from_path(&path).expect("load");
        assert_eq!(loaded.summary().uv_curves, 1);
        assert!(Project::load_from_path(dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn import_applies_offset_and_transforms() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("root.svg");
        std::fs::write(&path, SQUARE_SVG).expect("write svg");

        let config = HotwireConfig {
            offset_xy: 0.5,
            origin_offset: kurbo::Vec2::new(100.0, 0.0),
            ..HotwireConfig::default()
        };
        let mut project = Project::new("Import", config);
        project.import(Plane::Xy, &path).expect("import");

        assert_eq!(project.xy.len(), 1);
        assert!(project.xy_source.is_some());
        let curve = project.xy.curve_at(0).expect("curve");
        assert_eq!(curve.offset_distance(), 0.5);
        assert_abs_diff_eq!(curve.start_point().x, 100.0, epsilon = 1e-9);
    }

    #[test]
    fn import_rejects_wrong_extension() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("root.txt");
        std::fs::write(&path, "hello").expect("write");
        let mut project = Project::new("Import", HotwireConfig::default());
        assert!(project.import(Plane::Uv, &path).is_err());
        assert!(project.uv.is_empty());
    }

    #[test]
    fn rotation_turns_about_shared_center() {
        let config = HotwireConfig {
            rotation: 180.0,
            ..HotwireConfig::default()
        };
        let mut project = Project::new("Rotate", config);
        project.xy.add_curve(
            vec![Point::new(0.0, 0.0), Point::new(2.0, 0.0)],
            InterpolationMode::Cubic,
        );
        project.uv.add_curve(
            vec![Point::new(0.0, 2.0), Point::new(2.0, 2.0)],
            InterpolationMode::Cubic,
        );
        project.apply_transforms();
        // centroids (1, 0) and (1, 2), shared center (1, 1)
        let xy_start = project.xy.curve_at(0).map(|c| c.start_point()).expect("xy");
        assert_abs_diff_eq!(xy_start.x, 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(xy_start.y, 2.0, epsilon = 1e-9);
        let uv_start = project.uv.curve_at(0).map(|c| c.start_point()).expect("uv");
        assert_abs_diff_eq!(uv_start.y, 0.0, epsilon = 1e-9);
    }
}
