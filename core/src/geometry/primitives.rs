//! Closest-point and distance routines used by the constraint variants.
//!
//! Everything here is allocation free and safe to call from the realtime
//! thread.

use super::{GeometryError, GeometryResult, Point3, Vector3, EPSILON};
use nalgebra as na;
use serde::{Deserialize, Serialize};

/// Lower bound on the parallel tolerance. Two copies of the same direction
/// normalize to unit vectors whose dot product can miss 1.0 by a few ulps.
const PARALLEL_ROUNDING_FLOOR: f64 = 64.0 * f64::EPSILON;

/// Relative size of the normal-equation determinant (`sin^2` of the angle
/// between the lines) below which the system is treated as singular.
const SINGULAR_DETERMINANT: f64 = 1e-10;

/// A line through two points. Parameter `t` runs from `start` (0) to
/// `end` (1) and extends beyond in both directions. The same two points
/// also serve as a finite segment, see [`Line3::closest_point_on_segment`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line3 {
    pub start: Point3,
    pub end: Point3,
}

impl Line3 {
    pub fn new(start: Point3, end: Point3) -> Self {
        Self { start, end }
    }

    /// Unnormalized direction `end - start`.
    pub fn direction(&self) -> Vector3 {
        self.end - self.start
    }

    pub fn at(&self, t: f64) -> Point3 {
        self.start + self.direction() * t
    }

    pub fn is_finite(&self) -> bool {
        self.start.coords.iter().chain(self.end.coords.iter()).all(|c| c.is_finite())
    }

    /// No usable direction: coincident endpoints or a non-finite coordinate.
    pub fn is_degenerate(&self) -> bool {
        !self.is_finite() || self.direction().norm() < EPSILON
    }

    /// Closest point to `point` on the segment `start..=end`. A
    /// zero-length segment returns `start`.
    pub fn closest_point_on_segment(&self, point: &Point3) -> Point3 {
        let dir = self.direction();
        let len_sq = dir.norm_squared();
        if len_sq.is_nan() || len_sq < EPSILON * EPSILON {
            return self.start;
        }
        let t = ((point - self.start).dot(&dir) / len_sq).clamp(0.0, 1.0);
        self.at(t)
    }
}

/// Closest approach between two lines, as returned by
/// [`closest_points_between_lines`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineApproach {
    /// Parameter on the first line.
    pub t_a: f64,
    /// Parameter on the second line.
    pub t_b: f64,
    /// Distance between the points at `t_a` and `t_b`.
    pub distance: f64,
}

/// Euclidean distance between two points.
pub fn distance(a: &Point3, b: &Point3) -> f64 {
    na::distance(a, b)
}

/// Orthogonal projection of `point` onto the infinite line through
/// `line_start` and `line_end`.
///
/// A line shorter than [`EPSILON`], or one with a non-finite endpoint, has
/// no direction; callers get `DegenerateGeometry` and are expected to fall
/// back to `line_start`. A non-finite `point` yields a non-finite result.
pub fn project_point_on_line(
    point: &Point3,
    line_start: &Point3,
    line_end: &Point3,
) -> GeometryResult<Point3> {
    let dir = line_end - line_start;
    let len = dir.norm();
    if !len.is_finite() {
        return Err(GeometryError::DegenerateGeometry("non-finite line coordinates"));
    }
    if len < EPSILON {
        return Err(GeometryError::DegenerateGeometry("zero-length line direction"));
    }
    let unit = dir / len;
    let along = (point - line_start).dot(&unit);
    Ok(line_start + unit * along)
}

/// Closest point on a plane. `plane_normal` must already be unit length;
/// it is not renormalized here.
pub fn closest_point_on_plane(point: &Point3, plane_point: &Point3, plane_normal: &Vector3) -> Point3 {
    point - plane_normal * plane_normal.dot(&(point - plane_point))
}

/// True when the two directions are parallel or anti-parallel within
/// `epsilon` (measured as `1 - |cos|`).
///
/// Near-zero and non-finite directions count as parallel so that callers
/// take the simple branch instead of an ill-conditioned solve.
pub fn are_parallel(dir_a: &Vector3, dir_b: &Vector3, epsilon: f64) -> bool {
    let len_a = dir_a.norm();
    let len_b = dir_b.norm();
    if !len_a.is_finite() || !len_b.is_finite() || len_a < EPSILON || len_b < EPSILON {
        return true;
    }
    let cos = (dir_a / len_a).dot(&(dir_b / len_b)).abs();
    1.0 - cos <= epsilon.max(PARALLEL_ROUNDING_FLOOR)
}

/// Closest approach of two infinite lines via the 2x2 normal equations.
///
/// Parallel lines have no unique answer: `t_a` is fixed at 0 and `t_b` is
/// the projection of `a.start` onto `b`, clamped to `[0, 1]`. Lines that
/// pass the parallel test but still produce a numerically singular system
/// return `DegenerateGeometry`, as does any non-finite coordinate.
pub fn closest_points_between_lines(a: &Line3, b: &Line3, epsilon: f64) -> GeometryResult<LineApproach> {
    if !a.is_finite() || !b.is_finite() {
        return Err(GeometryError::DegenerateGeometry("non-finite line coordinates"));
    }

    let u = a.direction();
    let v = b.direction();
    let w = a.start - b.start;

    let uu = u.dot(&u);
    let uv = u.dot(&v);
    let vv = v.dot(&v);
    let uw = u.dot(&w);
    let vw = v.dot(&w);

    if are_parallel(&u, &v, epsilon) {
        let t_b = if vv < EPSILON * EPSILON {
            0.0
        } else {
            (vw / vv).clamp(0.0, 1.0)
        };
        return Ok(LineApproach {
            t_a: 0.0,
            t_b,
            distance: distance(&a.start, &b.at(t_b)),
        });
    }

    let det = uu * vv - uv * uv;
    if det <= SINGULAR_DETERMINANT * uu * vv {
        return Err(GeometryError::DegenerateGeometry("singular line-line system"));
    }

    let t_a = (uv * vw - vv * uw) / det;
    let t_b = (uu * vw - uv * uw) / det;
    Ok(LineApproach {
        t_a,
        t_b,
        distance: distance(&a.at(t_a), &b.at(t_b)),
    })
}
