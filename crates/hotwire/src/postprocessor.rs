use crate::config::HotwireConfig;
use crate::feed::{feed_for_move, FeedMode};
use crate::types::{GCode, WirePath, WirePoint};
use chrono::{DateTime, Local};
use std::path::Path;

/// Axis letters the emitter writes before remapping.
const AXES: [char; 4] = ['X', 'Y', 'U', 'V'];

fn coords(p: &WirePoint) -> String {
    format!("X{:.6} Y{:.6} U{:.6} V{:.6}", p.x, p.y, p.u, p.v)
}

struct Emitter<'a> {
    lines: Vec<String>,
    mode: FeedMode,
    dist_near: f64,
    labels: Option<&'a [String; 4]>,
    last: WirePoint,
}

impl Emitter<'_> {
    fn push_motion(&mut self, line: String) {
        let line = match self.labels {
            Some(labels) => remap_axes(&line, labels),
            None => line,
        };
        self.lines.push(line);
    }

    fn rapid(&mut self, to: WirePoint) {
        self.push_motion(format!("G00 {}", coords(&to)));
        self.last = to;
    }

    fn cut(&mut self, to: WirePoint, speed_xy: f64, speed_uv: f64) {
        let feed = feed_for_move(self.mode, &self.last, &to, speed_xy, speed_uv, self.dist_near);
        let precision = self.mode.feed_precision();
        self.push_motion(format!("G01 {} F{:.*}", coords(&to), precision, feed));
        self.last = to;
    }
}

/// Convert a machine-plane wire path into a four-axis hot-wire program.
///
/// Header from the configuration, a rapid to the start point, one `G01` per
/// sample, a final cut to the end point, then `M02`.
pub fn post_process_hotwire(path: &WirePath, config: &HotwireConfig) -> GCode {
    let labels = config.axis_labels();
    let mut emitter = Emitter {
        lines: config.header_lines(),
        mode: config.feed_mode,
        dist_near: config.tolerances.dist_near,
        labels: labels.as_ref(),
        last: WirePoint::default(),
    };

    emitter.rapid(WirePoint::new(config.start, config.start));

    let mut speeds = None;
    for segment in &path.segments {
        for point in &segment.points {
            emitter.cut(*point, segment.speed_xy, segment.speed_uv);
        }
        speeds = Some((segment.speed_xy, segment.speed_uv));
    }

    let (speed_xy, speed_uv) = speeds.unwrap_or((config.cut_speed, config.cut_speed));
    emitter.cut(WirePoint::new(config.end, config.end), speed_xy, speed_uv);

    emitter.lines.push("M02".to_string());
    GCode {
        lines: emitter.lines,
    }
}

/// Rename the X/Y/U/V axis letters of a motion line.
///
/// Letters are substituted simultaneously, so swapping two axes works. Lines
/// missing any of G, X, Y, U or V are returned unchanged.
pub fn remap_axes(line: &str, labels: &[String; 4]) -> String {
    if !['G', 'X', 'Y', 'U', 'V'].iter().all(|c| line.contains(*c)) {
        return line.to_string();
    }
    let mut out = String::with_capacity(line.len());
    for c in line.chars() {
        match AXES.iter().position(|a| *a == c) {
            Some(i) => out.push_str(&labels[i]),
            None => out.push(c),
        }
    }
    out
}

/// `<xy stem>,<uv stem>,<cut speed>_<YYYYmmdd_HHMMSS>.nc`
///
/// The cut speed always keeps a decimal point (`200.0`).
pub fn output_file_name(
    xy_source: &Path,
    uv_source: &Path,
    cut_speed: f64,
    time: DateTime<Local>,
) -> String {
    let stem = |p: &Path| {
        p.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    };
    format!(
        "{},{},{:?}_{}.nc",
        stem(xy_source),
        stem(uv_source),
        cut_speed,
        time.format("%Y%m%d_%H%M%S")
    )
}
