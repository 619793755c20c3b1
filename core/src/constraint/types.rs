use super::{ConstraintError, ConstraintResult};
use crate::config::SnapConfig;
use crate::geometry::{
    closest_point_on_plane, distance, project_point_on_line, GeometryResult, Line3, Point3, Vector3, EPSILON,
};
use std::fmt;

/// Result of testing a query point against a constraint's geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Probe {
    /// Distance from the query point to `proxy`
    pub distance: f64,
    /// Closest point on the geometry
    pub proxy: Point3,
}

/// Outcome of one [`Constraint::apply`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Engagement {
    pub engaged: bool,
    /// Snapped point when engaged, the query point otherwise
    pub proxy: Point3,
    /// Distance reported by the geometry test (infinite if the test failed)
    pub distance: f64,
}

impl Engagement {
    fn disengaged(query: Point3, distance: f64) -> Self {
        Self {
            engaged: false,
            proxy: query,
            distance,
        }
    }
}

/// Extension point for target geometry beyond point, line and plane.
///
/// Implementations run on the realtime thread: they must not block,
/// allocate or free.
pub trait CustomGeometry: Send + fmt::Debug {
    fn test(&self, query: &Point3) -> GeometryResult<Probe>;
}

/// Side effects tied to a constraint's installation and removal.
///
/// The controller calls `on_start` once when the constraint is installed
/// and `on_end` once when it is reclaimed, both from the control thread.
pub trait ConstraintHooks: Send {
    fn on_start(&mut self) {}
    fn on_end(&mut self) {}
}

#[derive(Debug)]
pub enum ConstraintGeometry {
    Point(Point3),
    Line(Line3),
    /// `normal` is unit length.
    Plane { origin: Point3, normal: Vector3 },
    Custom(Box<dyn CustomGeometry>),
}

impl ConstraintGeometry {
    pub fn test(&self, query: &Point3) -> GeometryResult<Probe> {
        match self {
            ConstraintGeometry::Point(p) => Ok(Probe {
                distance: distance(p, query),
                proxy: *p,
            }),
            ConstraintGeometry::Line(line) => {
                // A zero-length line acts like a point at its start
                let proxy = project_point_on_line(query, &line.start, &line.end).unwrap_or(line.start);
                Ok(Probe {
                    distance: distance(&proxy, query),
                    proxy,
                })
            }
            ConstraintGeometry::Plane { origin, normal } => {
                let proxy = closest_point_on_plane(query, origin, normal);
                Ok(Probe {
                    distance: distance(&proxy, query),
                    proxy,
                })
            }
            ConstraintGeometry::Custom(custom) => custom.test(query),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ConstraintGeometry::Point(_) => "point",
            ConstraintGeometry::Line(_) => "line",
            ConstraintGeometry::Plane { .. } => "plane",
            ConstraintGeometry::Custom(_) => "custom",
        }
    }
}

/// A snap target with its engagement state.
///
/// `done` latches once the moving point leaves the snap radius and stays
/// set until [`Constraint::reset`] or reinstallation.
pub struct Constraint {
    geometry: ConstraintGeometry,
    snap_distance: f64,
    done: bool,
    anti: bool,
    auto_delete: bool,
    hooks: Option<Box<dyn ConstraintHooks>>,
}

impl Constraint {
    pub fn new(geometry: ConstraintGeometry, config: &SnapConfig) -> ConstraintResult<Self> {
        validate_snap_distance(config.snap_distance)?;
        Ok(Self {
            geometry,
            snap_distance: config.snap_distance,
            done: false,
            anti: false,
            auto_delete: config.auto_delete,
            hooks: None,
        })
    }

    pub fn point(point: Point3, config: &SnapConfig) -> ConstraintResult<Self> {
        Self::new(ConstraintGeometry::Point(point), config)
    }

    /// Line through `start` and `end`. The points must be distinct.
    pub fn line(start: Point3, end: Point3, config: &SnapConfig) -> ConstraintResult<Self> {
        let line = Line3::new(start, end);
        if !line.is_finite() {
            return Err(ConstraintError::DegenerateGeometry("line endpoints are not finite"));
        }
        if line.is_degenerate() {
            return Err(ConstraintError::DegenerateGeometry("line endpoints coincide"));
        }
        Self::new(ConstraintGeometry::Line(line), config)
    }

    /// Plane through `origin`. The normal is normalized here.
    pub fn plane(origin: Point3, normal: Vector3, config: &SnapConfig) -> ConstraintResult<Self> {
        let len = normal.norm();
        if len.is_nan() || len < EPSILON {
            return Err(ConstraintError::DegenerateGeometry("plane normal has zero length"));
        }
        Self::new(
            ConstraintGeometry::Plane {
                origin,
                normal: normal / len,
            },
            config,
        )
    }

    pub fn custom(geometry: Box<dyn CustomGeometry>, config: &SnapConfig) -> ConstraintResult<Self> {
        Self::new(ConstraintGeometry::Custom(geometry), config)
    }

    pub fn with_snap_distance(mut self, snap_distance: f64) -> ConstraintResult<Self> {
        self.set_snap_distance(snap_distance)?;
        Ok(self)
    }

    /// Engage without moving the proxy (exclusion zones).
    pub fn with_anti(mut self, anti: bool) -> Self {
        self.anti = anti;
        self
    }

    pub fn with_auto_delete(mut self, auto_delete: bool) -> Self {
        self.auto_delete = auto_delete;
        self
    }

    pub fn with_hooks(mut self, hooks: Box<dyn ConstraintHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn set_snap_distance(&mut self, snap_distance: f64) -> ConstraintResult<()> {
        validate_snap_distance(snap_distance)?;
        self.snap_distance = snap_distance;
        Ok(())
    }

    pub fn geometry(&self) -> &ConstraintGeometry {
        &self.geometry
    }

    pub fn snap_distance(&self) -> f64 {
        self.snap_distance
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn is_anti(&self) -> bool {
        self.anti
    }

    pub fn is_auto_delete(&self) -> bool {
        self.auto_delete
    }

    /// Re-arm a latched constraint.
    pub fn reset(&mut self) {
        self.done = false;
    }

    /// Pure geometry test; does not touch the latch.
    pub fn test(&self, query: &Point3) -> GeometryResult<Probe> {
        self.geometry.test(query)
    }

    /// Test `query` and update the latch.
    ///
    /// Inside the snap radius the constraint engages and the proxy moves
    /// onto the geometry (or stays at `query` for anti-constraints).
    /// Outside it, or once latched, it reports disengaged with the proxy at
    /// `query`. A geometry failure counts as leaving the radius.
    pub fn apply(&mut self, query: &Point3) -> Engagement {
        let probe = match self.geometry.test(query) {
            Ok(probe) => probe,
            Err(_) => {
                self.done = true;
                return Engagement::disengaged(*query, f64::INFINITY);
            }
        };

        if self.done {
            return Engagement::disengaged(*query, probe.distance);
        }

        if probe.distance < self.snap_distance {
            Engagement {
                engaged: true,
                proxy: if self.anti { *query } else { probe.proxy },
                distance: probe.distance,
            }
        } else {
            self.done = true;
            Engagement::disengaged(*query, probe.distance)
        }
    }

    pub(crate) fn start(&mut self) {
        if let Some(hooks) = self.hooks.as_mut() {
            hooks.on_start();
        }
    }

    pub(crate) fn end(&mut self) {
        if let Some(hooks) = self.hooks.as_mut() {
            hooks.on_end();
        }
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constraint")
            .field("geometry", &self.geometry)
            .field("snap_distance", &self.snap_distance)
            .field("done", &self.done)
            .field("anti", &self.anti)
            .field("auto_delete", &self.auto_delete)
            .field("hooks", &self.hooks.is_some())
            .finish()
    }
}

fn validate_snap_distance(snap_distance: f64) -> ConstraintResult<()> {
    if snap_distance.is_finite() && snap_distance >= 0.0 {
        Ok(())
    } else {
        Err(ConstraintError::InvalidSnapDistance(snap_distance))
    }
}
