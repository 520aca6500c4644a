//! CAD ingestion: file checks, DXF/SVG readers, and the conversion of
//! drawing primitives into curve point sequences.

use crate::error::HotwireError;
use crate::geometry::spline::linspace;
use crate::geometry::InterpolationMode;
use anyhow::{anyhow, Context, Result};
use kurbo::{BezPath, PathEl, Point};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

const SUPPORTED_EXTENSIONS: [&str; 2] = ["dxf", "svg"];

/// Arc sampling density, in degrees per point.
const ARC_STEP_DEGREES: f64 = 10.0;

/// Flattening tolerance for curved SVG segments.
const SVG_FLATTEN_TOLERANCE: f64 = 0.05;

/// Outcome of checking a drawing path before parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileCheck {
    Ok,
    WrongExtension,
    NotFound,
}

pub fn check_file<P: AsRef<Path>>(path: P) -> FileCheck {
    let path = path.as_ref();
    if !path.is_file() {
        return FileCheck::NotFound;
    }
    let supported = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false);
    if supported {
        FileCheck::Ok
    } else {
        FileCheck::WrongExtension
    }
}

impl FileCheck {
    /// Turn a failed check into the matching input error.
    pub fn into_result<P: AsRef<Path>>(self, path: P) -> std::result::Result<(), HotwireError> {
        let shown = path.as_ref().display().to_string();
        match self {
            FileCheck::Ok => Ok(()),
            FileCheck::WrongExtension => Err(HotwireError::WrongExtension(shown)),
            FileCheck::NotFound => Err(HotwireError::FileNotFound(shown)),
        }
    }
}

/// A drawing entity as the core sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CadPrimitive {
    Line {
        start: Point,
        end: Point,
    },
    Polyline {
        vertices: Vec<Point>,
        closed: bool,
    },
    /// Angles in degrees, counter-clockwise from +X.
    Arc {
        center: Point,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
    },
    Spline {
        control_points: Vec<Point>,
    },
}

impl CadPrimitive {
    /// Raw curve points and the interpolation they are meant for.
    pub fn to_points(&self) -> (Vec<Point>, InterpolationMode) {
        match self {
            CadPrimitive::Line { start, end } => (vec![*start, *end], InterpolationMode::Cubic),
            CadPrimitive::Polyline { vertices, closed } => {
                (polyline_points(vertices, *closed), InterpolationMode::Linear)
            }
            CadPrimitive::Arc {
                center,
                radius,
                start_angle,
                end_angle,
            } => (
                arc_points(*center, *radius, *start_angle, *end_angle),
                InterpolationMode::Cubic,
            ),
            CadPrimitive::Spline { control_points } => {
                (control_points.clone(), InterpolationMode::Cubic)
            }
        }
    }

    /// Lines whose ends coincide carry no geometry.
    pub fn is_degenerate(&self) -> bool {
        matches!(self, CadPrimitive::Line { start, end } if start == end)
    }

    fn import_rank(&self) -> u8 {
        match self {
            CadPrimitive::Spline { .. } => 0,
            CadPrimitive::Arc { .. } => 1,
            CadPrimitive::Polyline { .. } => 2,
            CadPrimitive::Line { .. } => 3,
        }
    }
}

/// Sample an arc every ten degrees, at least three points, ends included.
pub fn arc_points(center: Point, radius: f64, start_angle: f64, end_angle: f64) -> Vec<Point> {
    let end_angle = if end_angle < start_angle {
        end_angle + 360.0
    } else {
        end_angle
    };
    let n = (((end_angle - start_angle).abs() / ARC_STEP_DEGREES) as usize).max(3);
    linspace(start_angle, end_angle, n)
        .into_iter()
        .map(|deg| {
            let a = deg.to_radians();
            Point::new(center.x + radius * a.cos(), center.y + radius * a.sin())
        })
        .collect()
}

/// Duplicate every interior vertex so the sequence reads as segment pairs.
pub fn polyline_points(vertices: &[Point], closed: bool) -> Vec<Point> {
    let mut vertices = vertices.to_vec();
    if closed && vertices.len() > 2 && vertices.first() != vertices.last() {
        vertices.push(vertices[0]);
    }
    if vertices.len() < 3 {
        return vertices;
    }
    let last = vertices.len() - 1;
    let mut out = Vec::with_capacity(2 * last);
    out.push(vertices[0]);
    for v in &vertices[1..last] {
        out.push(*v);
        out.push(*v);
    }
    out.push(vertices[last]);
    out
}

/// Check and read a drawing, dispatching on its extension.
pub fn load_primitives<P: AsRef<Path>>(path: P) -> Result<Vec<CadPrimitive>> {
    let path = path.as_ref();
    check_file(path).into_result(path)?;
    let is_svg = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));
    let primitives = if is_svg {
        read_svg(path)?
    } else {
        read_dxf(path)?
    };
    info!(path = %path.display(), count = primitives.len(), "loaded drawing");
    Ok(primitives)
}

fn dxf_point(p: &dxf::Point) -> Point {
    Point::new(p.x, p.y)
}

/// Read the model-space entities of a DXF drawing.
///
/// Splines come first, then arcs and circles, polylines, and lines last,
/// each group in file order.
pub fn read_dxf<P: AsRef<Path>>(path: P) -> Result<Vec<CadPrimitive>> {
    use dxf::entities::EntityType;

    let path = path.as_ref();
    let mut file =
        File::open(path).with_context(|| format!("open DXF file {}", path.display()))?;
    let drawing = dxf::Drawing::load(&mut file)
        .map_err(|err| anyhow!("Failed to parse DXF {}: {}", path.display(), err))?;

    let mut primitives = Vec::new();
    for entity in drawing.entities() {
        let primitive = match &entity.specific {
            EntityType::Line(line) => CadPrimitive::Line {
                start: dxf_point(&line.p1),
                end: dxf_point(&line.p2),
            },
            EntityType::Arc(arc) => CadPrimitive::Arc {
                center: dxf_point(&arc.center),
                radius: arc.radius,
                start_angle: arc.start_angle,
                end_angle: arc.end_angle,
            },
            EntityType::Circle(circle) => CadPrimitive::Arc {
                center: dxf_point(&circle.center),
                radius: circle.radius,
                start_angle: 0.0,
                end_angle: 360.0,
            },
            EntityType::LwPolyline(polyline) => CadPrimitive::Polyline {
                vertices: polyline
                    .vertices
                    .iter()
                    .map(|v| Point::new(v.x, v.y))
                    .collect(),
                closed: polyline.flags & 1 != 0,
            },
            EntityType::Polyline(polyline) => CadPrimitive::Polyline {
                vertices: polyline.vertices().map(|v| dxf_point(&v.location)).collect(),
                closed: polyline.flags & 1 != 0,
            },
            EntityType::Spline(spline) => CadPrimitive::Spline {
                control_points: spline.control_points.iter().map(dxf_point).collect(),
            },
            _ => {
                debug!("skipping unsupported DXF entity");
                continue;
            }
        };
        primitives.push(primitive);
    }
    primitives.sort_by_key(CadPrimitive::import_rank);
    Ok(primitives)
}

/// Read every visible SVG path, one primitive per subpath.
///
/// Subpaths made only of straight segments become polylines, anything with
/// curves is flattened into a spline. The Y axis is flipped so the drawing
/// keeps its orientation in machine coordinates.
pub fn read_svg<P: AsRef<Path>>(path: P) -> Result<Vec<CadPrimitive>> {
    let path = path.as_ref();
    let data =
        std::fs::read(path).with_context(|| format!("Failed to read SVG {}", path.display()))?;
    let tree = usvg::Tree::from_data(&data, &usvg::Options::default())
        .map_err(|err| anyhow!("Failed to parse SVG {}: {}", path.display(), err))?;

    let mut primitives = Vec::new();
    collect_svg_group(tree.root(), &mut primitives);
    Ok(primitives)
}

fn collect_svg_group(group: &usvg::Group, out: &mut Vec<CadPrimitive>) {
    for node in group.children() {
        match node {
            usvg::Node::Group(g) => collect_svg_group(g, out),
            usvg::Node::Path(path) if path.is_visible() => {
                let bezpath = convert_tiny_skia_to_kurbo(path.data(), path.abs_transform());
                out.extend(bezpath_primitives(&bezpath));
            }
            _ => {}
        }
    }
}

fn convert_tiny_skia_to_kurbo(
    path: &tiny_skia_path::Path,
    transform: tiny_skia_path::Transform,
) -> BezPath {
    let map = |p: tiny_skia_path::Point| {
        let mut p = p;
        transform.map_points(std::slice::from_mut(&mut p));
        Point::new(p.x as f64, -(p.y as f64))
    };

    let mut bezpath = BezPath::new();
    for segment in path.segments() {
        match segment {
            tiny_skia_path::PathSegment::MoveTo(p) => bezpath.move_to(map(p)),
            tiny_skia_path::PathSegment::LineTo(p) => bezpath.line_to(map(p)),
            tiny_skia_path::PathSegment::QuadTo(p1, p2) => bezpath.quad_to(map(p1), map(p2)),
            tiny_skia_path::PathSegment::CubicTo(p1, p2, p3) => {
                bezpath.curve_to(map(p1), map(p2), map(p3))
            }
            tiny_skia_path::PathSegment::Close => bezpath.close_path(),
        }
    }
    bezpath
}

/// Split a path into subpaths and convert each one.
fn bezpath_primitives(path: &BezPath) -> Vec<CadPrimitive> {
    let mut out = Vec::new();
    let mut current = BezPath::new();
    let mut curved = false;
    let mut closed = false;

    let mut flush = |current: &mut BezPath, curved: &mut bool, closed: &mut bool| {
        let sub = std::mem::take(current);
        if let Some(primitive) = subpath_primitive(&sub, *curved, *closed) {
            out.push(primitive);
        }
        *curved = false;
        *closed = false;
    };

    for el in path.elements() {
        match el {
            PathEl::MoveTo(_) => {
                flush(&mut current, &mut curved, &mut closed);
                current.push(*el);
            }
            PathEl::QuadTo(..) | PathEl::CurveTo(..) => {
                curved = true;
                current.push(*el);
            }
            PathEl::ClosePath => {
                closed = true;
                current.push(*el);
            }
            PathEl::LineTo(_) => current.push(*el),
        }
    }
    flush(&mut current, &mut curved, &mut closed);
    out
}

fn subpath_primitive(sub: &BezPath, curved: bool, closed: bool) -> Option<CadPrimitive> {
    let mut points: Vec<Point> = Vec::new();
    kurbo::flatten(sub.elements().iter().copied(), SVG_FLATTEN_TOLERANCE, |el| match el {
        PathEl::MoveTo(p) | PathEl::LineTo(p) => points.push(p),
        _ => {}
    });
    if closed {
        if let Some(&first) = points.first() {
            if points.last() != Some(&first) {
                points.push(first);
            }
        }
    }
    match points.len() {
        0 | 1 => None,
        2 => Some(CadPrimitive::Line {
            start: points[0],
            end: points[1],
        }),
        _ if curved => Some(CadPrimitive::Spline {
            control_points: points,
        }),
        _ => Some(CadPrimitive::Polyline {
            vertices: points,
            closed: false,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::io::Write;

    #[test]
    fn test_arc_points_density() {
        let pts = arc_points(Point::ORIGIN, 2.0, 0.0, 90.0);
        assert_eq!(pts.len(), 9);
        assert_abs_diff_eq!(pts[8].y, 2.0, epsilon = 1e-12);

        // wraps through 360 degrees
        let wrapped = arc_points(Point::ORIGIN, 1.0, 350.0, 10.0);
        assert_eq!(wrapped.len(), 3);
        assert_abs_diff_eq!(wrapped[1].x, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_short_arc_has_three_points() {
        assert_eq!(arc_points(Point::ORIGIN, 1.0, 0.0, 5.0).len(), 3);
    }

    #[test]
    fn test_polyline_points_duplicate_interior() {
        let v = [Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(1.0, 1.0)];
        let pts = polyline_points(&v, false);
        assert_eq!(pts, vec![v[0], v[1], v[1], v[2]]);

        let closed = polyline_points(&v, true);
        assert_eq!(closed.len(), 6);
        assert_eq!(closed[5], v[0]);
    }

    #[test]
    fn test_check_file_states() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dxf = dir.path().join("wing.DXF");
        let txt = dir.path().join("wing.txt");
        std::fs::File::create(&dxf).expect("create");
        std::fs::File::create(&txt).expect("create");

        assert_eq!(check_file(&dxf), FileCheck::Ok);
        assert_eq!(check_file(&txt), FileCheck::WrongExtension);
        assert_eq!(check_file(dir.path().join("missing.dxf")), FileCheck::NotFound);
        assert!(matches!(
            check_file(&txt).into_result(&txt),
            Err(HotwireError::WrongExtension(_))
        ));
    }

    #[test]
    fn test_read_svg_polyline_and_curve() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("shape.svg");
        let mut file = std::fs::File::create(&path).expect("create");
        write!(
            file,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100">
                <path d="M 0 0 L 10 0 L 10 10" fill="none" stroke="black"/>
                <path d="M 20 0 C 20 10 30 10 30 0" fill="none" stroke="black"/>
            </svg>"#
        )
        .expect("write");

        let prims = load_primitives(&path).expect("svg loads");
        assert_eq!(prims.len(), 2);
        match &prims[0] {
            CadPrimitive::Polyline { vertices, .. } => {
                assert_eq!(vertices.len(), 3);
                assert_abs_diff_eq!(vertices[2].y, -10.0, epsilon = 1e-4);
            }
            other => panic!("expected polyline, got {other:?}"),
        }
        assert!(matches!(&prims[1], CadPrimitive::Spline { control_points } if control_points.len() > 3));
    }
}
