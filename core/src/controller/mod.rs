//! Single-active-constraint controller.
//!
//! The controller is split into two halves that share a lock-free mailbox:
//!
//! - [`ControlHandle`] lives on a non-realtime thread. It arms and clears
//!   constraints, runs lifecycle hooks and reclaims retired constraints.
//! - [`TickHandle`] lives on the realtime thread. It evaluates the active
//!   constraint once per tick and never blocks, allocates or frees.
//!
//! [`ConstraintController`] bundles both halves for single-threaded use.

mod handoff;


use crate::constraint::{Constraint, Engagement};
use crate::geometry::Point3;
use handoff::{Command, Mailbox};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Engagement state as last published by the realtime side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerState {
    /// No constraint installed
    Idle = 0,
    /// A constraint is installed and has not latched
    Armed = 1,
    /// The last constraint latched and was disengaged automatically
    Latched = 2,
}

impl ControllerState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ControllerState::Armed,
            2 => ControllerState::Latched,
            _ => ControllerState::Idle,
        }
    }
}

/// Create a connected pair of controller halves.
pub fn channel() -> (ControlHandle, TickHandle) {
    let mailbox = Arc::new(Mailbox::new());
    (
        ControlHandle {
            mailbox: Arc::clone(&mailbox),
            returned: Vec::new(),
        },
        TickHandle {
            mailbox,
            active: None,
            parked: None,
            proxy: Point3::origin(),
        },
    )
}

// =============================================================================
// Control side
// =============================================================================

/// Non-realtime half of the controller.
#[derive(Debug)]
pub struct ControlHandle {
    mailbox: Arc<Mailbox>,
    /// Reclaimed constraints the caller still owns
    returned: Vec<Box<Constraint>>,
}

impl ControlHandle {
    /// Arm `constraint`, replacing whatever is active. The latch is reset
    /// and `on_start` runs here, before the realtime side can see it.
    ///
    /// The replaced constraint is swapped out by the realtime side, so its
    /// `on_end` runs at a later reclaim, after this `on_start`. Use
    /// [`ConstraintController::set_constraint`] when the end of the old
    /// constraint must come first.
    pub fn set_constraint(&mut self, constraint: Constraint) {
        self.collect();

        let mut constraint = Box::new(constraint);
        constraint.reset();
        constraint.start();
        info!(
            "Arming {} constraint (snap distance {}, anti: {})",
            constraint.geometry().kind(),
            constraint.snap_distance(),
            constraint.is_anti()
        );

        if let Some(stale) = self.mailbox.push(Command::Install(constraint)) {
            self.dispose(stale);
        }
    }

    /// Request that the active constraint be cleared. Idempotent.
    pub fn clear_constraint(&mut self) {
        self.collect();
        if let Some(stale) = self.mailbox.push(Command::Clear) {
            self.dispose(stale);
        }
        debug!("Requested constraint clear");
    }

    /// Reclaim constraints the realtime side has retired. Runs `on_end`,
    /// drops auto-delete constraints and queues the rest for
    /// [`ControlHandle::take_returned`]. Returns how many were reclaimed.
    pub fn collect(&mut self) -> usize {
        let mailbox = Arc::clone(&self.mailbox);
        let mut count = 0;
        mailbox.drain_retired(|constraint| {
            count += 1;
            self.reclaim(constraint);
        });
        count
    }

    /// Caller-owned constraints that have been cleared since the last call.
    pub fn take_returned(&mut self) -> Vec<Constraint> {
        self.returned.drain(..).map(|c| *c).collect()
    }

    pub fn state(&self) -> ControllerState {
        ControllerState::from_u8(self.mailbox.state())
    }

    fn dispose(&mut self, stale: Command) {
        if let Command::Install(constraint) = stale {
            debug!("Replaced {} constraint before it was picked up", constraint.geometry().kind());
            self.reclaim(constraint);
        }
    }

    fn reclaim(&mut self, mut constraint: Box<Constraint>) {
        constraint.end();
        if constraint.is_auto_delete() {
            debug!("Destroyed retired {} constraint", constraint.geometry().kind());
        } else {
            debug!("Returned retired {} constraint to caller", constraint.geometry().kind());
            self.returned.push(constraint);
        }
    }
}

impl Drop for ControlHandle {
    fn drop(&mut self) {
        if let Some(stale) = self.mailbox.withdraw() {
            self.dispose(stale);
        }
        self.collect();
    }
}

// =============================================================================
// Realtime side
// =============================================================================

/// Realtime half of the controller.
///
/// Dropping this handle retires its active constraint so the control side
/// still runs `on_end` for it. If no retirement slot is free, or the
/// [`ControlHandle`] is already gone, whatever is left is ended and freed
/// here, on the dropping thread. Drop the control handle last to keep that
/// work off the realtime thread.
#[derive(Debug)]
pub struct TickHandle {
    mailbox: Arc<Mailbox>,
    active: Option<Box<Constraint>>,
    /// A replaced constraint that found every retirement slot full. New
    /// commands wait until it has been handed back.
    parked: Option<Box<Constraint>>,
    proxy: Point3,
}

impl TickHandle {
    /// Evaluate the active constraint against `query`. Called once per tick.
    ///
    /// Returns whether the constraint engaged. The proxy is the snapped
    /// point when engaged and `query` otherwise. A constraint that latches
    /// is disengaged immediately.
    pub fn update_constraint(&mut self, query: Point3) -> bool {
        self.poll();

        let Some(active) = self.active.as_mut() else {
            self.proxy = query;
            return false;
        };

        if active.is_done() {
            // Latched earlier but the retirement slots were full
            self.retire_latched();
            self.proxy = query;
            return false;
        }

        let Engagement { engaged, proxy, .. } = active.apply(&query);
        if active.is_done() {
            self.retire_latched();
            self.mailbox.publish_state(ControllerState::Latched as u8);
            self.proxy = query;
        } else {
            self.proxy = proxy;
        }
        engaged
    }

    /// Pick up a pending install or clear without evaluating anything.
    pub fn poll(&mut self) {
        if let Some(parked) = self.parked.take() {
            if let Err(parked) = self.mailbox.retire(parked) {
                self.parked = Some(parked);
                return;
            }
        }

        match self.mailbox.poll() {
            Some(Command::Install(constraint)) => {
                self.park_active();
                self.active = Some(constraint);
                self.mailbox.publish_state(ControllerState::Armed as u8);
            }
            Some(Command::Clear) => {
                self.park_active();
                self.mailbox.publish_state(ControllerState::Idle as u8);
            }
            None => {}
        }
    }

    /// The active constraint, if armed.
    pub fn constraint(&self) -> Option<&Constraint> {
        self.active.as_deref().filter(|c| !c.is_done())
    }

    pub fn constrained_proxy(&self) -> Point3 {
        self.proxy
    }

    fn park_active(&mut self) {
        if let Some(previous) = self.active.take() {
            if let Err(previous) = self.mailbox.retire(previous) {
                self.parked = Some(previous);
            }
        }
    }

    fn retire_latched(&mut self) {
        if let Some(latched) = self.active.take() {
            if let Err(latched) = self.mailbox.retire(latched) {
                // Still latched, so it keeps reporting disengaged until a
                // slot frees up.
                self.active = Some(latched);
            }
        }
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        for constraint in [self.parked.take(), self.active.take()].into_iter().flatten() {
            if let Err(mut constraint) = self.mailbox.retire(constraint) {
                constraint.end();
            }
        }
    }
}

// =============================================================================
// Single-threaded facade
// =============================================================================

/// Both controller halves in one value.
///
/// Every call is synchronous: arming, clearing and reclamation take effect
/// before the call returns. Use [`ConstraintController::split`] to drive
/// the tick side from a realtime thread.
#[derive(Debug)]
pub struct ConstraintController {
    control: ControlHandle,
    tick: TickHandle,
}

impl Default for ConstraintController {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstraintController {
    pub fn new() -> Self {
        let (control, tick) = channel();
        Self { control, tick }
    }

    pub fn split(self) -> (ControlHandle, TickHandle) {
        (self.control, self.tick)
    }

    /// Clear whatever is active, then arm `constraint`. The old
    /// constraint's `on_end` runs before the new one's `on_start`.
    pub fn set_constraint(&mut self, constraint: Constraint) {
        if self.tick.active.is_some() || self.tick.parked.is_some() {
            self.clear_constraint();
        }
        self.control.set_constraint(constraint);
        self.tick.poll();
        self.control.collect();
    }

    pub fn clear_constraint(&mut self) {
        self.control.clear_constraint();
        self.tick.poll();
        self.control.collect();
    }

    pub fn update_constraint(&mut self, query: Point3) -> bool {
        let engaged = self.tick.update_constraint(query);
        self.control.collect();
        engaged
    }

    pub fn constraint(&self) -> Option<&Constraint> {
        self.tick.constraint()
    }

    pub fn constrained_proxy(&self) -> Point3 {
        self.tick.constrained_proxy()
    }

    pub fn state(&self) -> ControllerState {
        self.control.state()
    }

    pub fn take_returned(&mut self) -> Vec<Constraint> {
        self.control.take_returned()
    }
}
