//! Geometric snap constraints for a realtime control loop.
//!
//! A caller samples a device position every tick and asks the
//! [`ConstraintController`] for a constrained proxy to render a restoring
//! force toward a point, line or plane.

pub mod config;
pub mod constraint;
pub mod controller;
pub mod geometry;
pub mod holder;

pub use config::SnapConfig;
pub use constraint::{
    Constraint, ConstraintError, ConstraintGeometry, ConstraintHooks, ConstraintResult, CustomGeometry, Engagement,
    Probe,
};
pub use controller::{channel, ConstraintController, ControlHandle, ControllerState, TickHandle};
pub use geometry::{GeometryError, GeometryResult, Line3, Point3, Vector3};
pub use holder::{ConstraintHolder, ConstraintId, HolderError, HolderResult, HolderSnap};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
