use crate::error::{HotwireError, Result};
use crate::feed::OffsetFunction;
use crate::geometry::fillet::fillet_points;
use crate::geometry::spline::shared_parameters;
use crate::geometry::{CurveId, LengthMode, Tolerances};
use crate::import::check_file;
use crate::postprocessor::{output_file_name, post_process_hotwire};
use crate::profile::Profile;
use crate::ruled_surface::{cut_speeds, make_offset_path, PlaneSpeeds};
use crate::types::{CutSegment, GCode, WirePath, WirePoint};
use crate::Project;
use anyhow::Context;
use kurbo::Point;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Smallest step length the resampler accepts.
const MIN_STEP_LENGTH: f64 = 0.1;

/// Fillet point count for very small radii.
const SMALL_FILLET_POINTS: usize = 4;

#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub output: PathBuf,
    pub pairs: usize,
    pub points: usize,
    pub lines: usize,
}

/// Curves repaired by [`repair_collisions`], by display index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepairReport {
    pub xy_self: Vec<usize>,
    pub uv_self: Vec<usize>,
    pub xy_pairs: Vec<(usize, usize)>,
    pub uv_pairs: Vec<(usize, usize)>,
}

impl RepairReport {
    pub fn is_empty(&self) -> bool {
        self.xy_self.is_empty()
            && self.uv_self.is_empty()
            && self.xy_pairs.is_empty()
            && self.uv_pairs.is_empty()
    }
}

/// Both drawings must exist and have a supported extension.
pub fn check_paths(xy: &Path, uv: &Path) -> Result<()> {
    check_file(xy).into_result(xy)?;
    check_file(uv).into_result(uv)
}

fn ensure_matched(project: &Project) -> Result<()> {
    if project.xy.len() != project.uv.len() {
        return Err(HotwireError::CurveCountMismatch {
            xy: project.xy.len(),
            uv: project.uv.len(),
        });
    }
    Ok(())
}

/// Matched `(xy, uv)` curve ids in cut order.
fn matched_ids(project: &Project) -> Vec<(CurveId, CurveId)> {
    project
        .xy
        .ids()
        .iter()
        .copied()
        .zip(project.uv.ids().iter().copied())
        .collect()
}

fn pair_speeds(project: &Project, xy: &CurveId, uv: &CurveId) -> Option<PlaneSpeeds> {
    let a = project.xy.curve(xy)?;
    let b = project.uv.curve(uv)?;
    Some(cut_speeds(
        a.length(LengthMode::Offset),
        b.length(LengthMode::Offset),
        project.config.cut_speed,
        &project.config.planes,
        project.config.speed_reference,
    ))
}

fn store_speeds(project: &mut Project, xy: &CurveId, uv: &CurveId, speeds: &PlaneSpeeds) {
    if let Some(curve) = project.xy.curve_mut(xy) {
        curve.set_cut_speeds(speeds.xy_work, speeds.xy_mech);
    }
    if let Some(curve) = project.uv.curve_mut(uv) {
        curve.set_cut_speeds(speeds.uv_work, speeds.uv_mech);
    }
}

/// Give every matched curve pair its per-plane cut speeds.
///
/// Unmatched profiles fall back to the nominal speed everywhere.
pub fn assign_cut_speeds(project: &mut Project) -> Vec<PlaneSpeeds> {
    if ensure_matched(project).is_err() {
        warn!(
            xy = project.xy.len(),
            uv = project.uv.len(),
            "curve counts differ, using the nominal cut speed"
        );
        let nominal = project.config.cut_speed;
        for profile in [&mut project.xy, &mut project.uv] {
            for id in profile.ids().to_vec() {
                if let Some(curve) = profile.curve_mut(&id) {
                    curve.set_cut_speeds(nominal, nominal);
                }
            }
        }
        return Vec::new();
    }

    let mut all = Vec::new();
    for (xy, uv) in matched_ids(project) {
        if let Some(speeds) = pair_speeds(project, &xy, &uv) {
            store_speeds(project, &xy, &uv, &speeds);
            all.push(speeds);
        }
    }
    all
}

/// Set each curve's offset from its work-plane cut speed.
pub fn assign_offsets_from_function(
    project: &mut Project,
    function: &OffsetFunction,
) -> Result<Vec<PlaneSpeeds>> {
    ensure_matched(project)?;
    let tol = project.config.tolerances.clone();

    let mut all = Vec::new();
    for (xy, uv) in matched_ids(project) {
        let Some(speeds) = pair_speeds(project, &xy, &uv) else {
            continue;
        };
        if let Some(curve) = project.xy.curve_mut(&xy) {
            curve.set_offset_distance(function.eval(speeds.xy_work), &tol);
        }
        if let Some(curve) = project.uv.curve_mut(&uv) {
            curve.set_offset_distance(function.eval(speeds.uv_work), &tol);
        }
        store_speeds(project, &xy, &uv, &speeds);
        all.push(speeds);
    }
    info!(pairs = all.len(), "offsets updated from cut speed");

    if project.config.auto_repair {
        repair_collisions(project);
    }
    Ok(all)
}

/// Remove self crossings from every curve, then trim crossing neighbours.
pub fn repair_collisions(project: &mut Project) -> RepairReport {
    let tol = project.config.tolerances.clone();
    let repair_self = |profile: &mut Profile| {
        let ids = profile.ids().to_vec();
        profile.remove_self_collisions(&ids, &tol).unwrap_or_default()
    };
    let report = RepairReport {
        xy_self: repair_self(&mut project.xy),
        uv_self: repair_self(&mut project.uv),
        xy_pairs: project.xy.remove_line_collisions(&tol),
        uv_pairs: project.uv.remove_line_collisions(&tol),
    };
    if !report.is_empty() {
        info!(?report, "collisions repaired");
    }
    report
}

fn fillet_bridge(
    work_xy: &[Point],
    work_uv: &[Point],
    next_xy: &[Point],
    next_uv: &[Point],
    offsets: ([f64; 2], [f64; 2]),
    tol: &Tolerances,
) -> Option<(Vec<Point>, Vec<Point>)> {
    let ([prev_xy_off, next_xy_off], [prev_uv_off, next_uv_off]) = offsets;
    let &[xy0, xy1] = work_xy.last_chunk::<2>()?;
    let &[uv0, uv1] = work_uv.last_chunk::<2>()?;
    let radius = prev_xy_off
        .abs()
        .min(next_xy_off.abs())
        .min(prev_uv_off.abs())
        .min(next_uv_off.abs());
    let n = if radius <= 10.0 * tol.dist_near {
        SMALL_FILLET_POINTS
    } else {
        tol.fillet_points
    };

    let f_xy = fillet_points(
        [xy0, xy1],
        [*next_xy.first()?, *next_xy.get(1)?],
        prev_xy_off,
        next_xy_off,
        n,
        tol,
    );
    let f_uv = fillet_points(
        [uv0, uv1],
        [*next_uv.first()?, *next_uv.get(1)?],
        prev_uv_off,
        next_uv_off,
        n,
        tol,
    );
    (!f_xy.is_empty() && f_xy.len() == f_uv.len()).then_some((f_xy, f_uv))
}

fn projected_segment(
    pair: usize,
    xy: &[Point],
    uv: &[Point],
    speeds: (f64, f64),
    project: &Project,
) -> Result<CutSegment> {
    let (mx, mu) = make_offset_path(xy, uv, &project.config.planes)?;
    Ok(CutSegment {
        pair,
        points: mx.into_iter().zip(mu).map(|(a, b)| WirePoint::new(a, b)).collect(),
        speed_xy: speeds.0,
        speed_uv: speeds.1,
    })
}

/// Resample, fillet and project every matched curve pair.
///
/// Each pair is sampled with the same number of points on both planes,
/// spaced evenly by arc length at roughly the configured step. Between
/// pairs, an arc is inserted when both planes produce one; otherwise the new
/// pair starts exactly where the previous one ended.
pub fn generate_wire_path(project: &Project) -> Result<WirePath> {
    ensure_matched(project)?;
    let config = &project.config;
    if let Err(err) = config.planes.validate() {
        warn!(%err, "machine geometry rejected");
        return Err(err);
    }
    let tol = &config.tolerances;
    let step = if config.step_length.is_finite() {
        config.step_length.max(MIN_STEP_LENGTH)
    } else {
        MIN_STEP_LENGTH
    };

    let mut work_xy = vec![config.start];
    let mut work_uv = vec![config.start];
    let mut prev_offsets = (0.0, 0.0);
    let mut path = WirePath::default();

    for (pair, (xy_id, uv_id)) in matched_ids(project).iter().enumerate() {
        let (Some(a), Some(b)) = (project.xy.curve(xy_id), project.uv.curve(uv_id)) else {
            continue;
        };
        let longest = a.length(LengthMode::Offset).max(b.length(LengthMode::Offset));
        let n = ((longest / step) as usize).max(2);
        let sa = a.sampler(tol);
        let sb = b.sampler(tol);
        let params = shared_parameters(n, &[&sa, &sb]);
        let mut xy = sa.sample(&params);
        let mut uv = sb.sample(&params);
        let speeds = (a.machine_cut_speed(), b.machine_cut_speed());
        let offsets = (a.offset_distance(), b.offset_distance());
        debug!(pair, n, samples = params.len(), "resampled pair");

        if pair > 0 {
            let bridge = if config.fillet {
                fillet_bridge(
                    &work_xy,
                    &work_uv,
                    &xy,
                    &uv,
                    ([prev_offsets.0, offsets.0], [prev_offsets.1, offsets.1]),
                    tol,
                )
            } else {
                None
            };
            match bridge {
                Some((f_xy, f_uv)) => {
                    path.segments
                        .push(projected_segment(pair, &f_xy, &f_uv, speeds, project)?);
                    work_xy.extend(f_xy);
                    work_uv.extend(f_uv);
                }
                None => {
                    if let (Some(first), Some(end)) = (xy.first_mut(), work_xy.last()) {
                        *first = *end;
                    }
                    if let (Some(first), Some(end)) = (uv.first_mut(), work_uv.last()) {
                        *first = *end;
                    }
                }
            }
        }

        path.segments
            .push(projected_segment(pair, &xy, &uv, speeds, project)?);
        work_xy.extend(xy);
        work_uv.extend(uv);
        prev_offsets = offsets;
    }

    info!(
        pairs = project.xy.len(),
        points = path.point_count(),
        "wire path generated"
    );
    Ok(path)
}

/// Assign cut speeds, build the wire path and emit the program.
pub fn generate_program(project: &mut Project) -> Result<GCode> {
    assign_cut_speeds(project);
    let path = generate_wire_path(project)?;
    Ok(post_process_hotwire(&path, &project.config))
}

/// Generate the program and write it into `output_dir` under the
/// `<xy>,<uv>,<speed>_<timestamp>.nc` name.
pub fn generate_to_dir(project: &mut Project, output_dir: &Path) -> anyhow::Result<GenerationReport> {
    assign_cut_speeds(project);
    let path = generate_wire_path(project)?;
    let gcode = post_process_hotwire(&path, &project.config);

    let xy_source = project.xy_source.clone().unwrap_or_else(|| PathBuf::from("xy"));
    let uv_source = project.uv_source.clone().unwrap_or_else(|| PathBuf::from("uv"));
    let name = output_file_name(
        &xy_source,
        &uv_source,
        project.config.cut_speed,
        chrono::Local::now(),
    );
    let output = output_dir.join(name);
    gcode
        .write_to_path(&output)
        .with_context(|| format!("save program for {}", project.meta.name))?;
    info!(path = %output.display(), lines = gcode.lines.len(), "program written");

    Ok(GenerationReport {
        output,
        pairs: project.xy.len(),
        points: path.point_count(),
        lines: gcode.lines.len(),
    })
}
