use anyhow::Context;
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One wire position: the XY carriage at `(x, y)` and the UV carriage at
/// `(u, v)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WirePoint {
    pub x: f64,
    pub y: f64,
    pub u: f64,
    pub v: f64,
}

impl WirePoint {
    pub fn new(xy: Point, uv: Point) -> Self {
        Self {
            x: xy.x,
            y: xy.y,
            u: uv.x,
            v: uv.y,
        }
    }

    pub fn xy(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn uv(&self) -> Point {
        Point::new(self.u, self.v)
    }
}

/// The machine-plane motion generated from one matched curve pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutSegment {
    /// Index of the pair in cut order.
    pub pair: usize,
    pub points: Vec<WirePoint>,
    /// XY carriage speed for this pair.
    pub speed_xy: f64,
    /// UV carriage speed for this pair.
    pub speed_uv: f64,
}

/// Everything the emitter needs: machine-plane segments in cut order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WirePath {
    pub segments: Vec<CutSegment>,
}

impl WirePath {
    pub fn point_count(&self) -> usize {
        self.segments.iter().map(|s| s.points.len()).sum()
    }

    pub fn points(&self) -> impl Iterator<Item = &WirePoint> + '_ {
        self.segments.iter().flat_map(|s| s.points.iter())
    }
}

/// Represents the final, machine-specific G-code output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GCode {
    /// A list of G-code command strings.
    pub lines: Vec<String>,
}

impl GCode {
    pub fn to_text(&self) -> String {
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }

    /// Write the program, creating the parent directory when needed.
    pub fn write_to_path<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("create output directory {}", parent.display()))?;
        }
        fs::write(path, self.to_text())
            .with_context(|| format!("write program {}", path.display()))
    }
}
