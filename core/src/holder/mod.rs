//! Ordered collection of constraints for callers juggling several snap
//! targets outside the single-constraint controller.
//!
//! The holder owns every member. Auto-delete members are dropped when
//! removed; the rest are handed back to the caller.

use crate::constraint::Constraint;
use crate::geometry::Point3;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;


/// Identifies a constraint while it lives in a [`ConstraintHolder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConstraintId(pub Uuid);

impl ConstraintId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConstraintId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConstraintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HolderError {
    #[error("Constraint {0} is not in the holder")]
    NotFound(ConstraintId),

    #[error("Holder was modified during traversal")]
    IteratorInvalidated,

    #[error("No traversal in progress")]
    NoTraversal,

    #[error("Traversal is past the last constraint")]
    CursorExhausted,
}

pub type HolderResult<T> = Result<T, HolderError>;

/// Winner of [`ConstraintHolder::evaluate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HolderSnap {
    pub id: ConstraintId,
    pub proxy: Point3,
    pub distance: f64,
}

#[derive(Debug)]
struct Member {
    id: ConstraintId,
    constraint: Constraint,
}

#[derive(Debug, Clone, Copy)]
struct Cursor {
    index: usize,
    generation: u64,
}

#[derive(Debug, Default)]
pub struct ConstraintHolder {
    members: VecDeque<Member>,
    /// Bumped on every structural change; a cursor from an older generation is stale.
    generation: u64,
    cursor: Option<Cursor>,
}

impl ConstraintHolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: ConstraintId) -> bool {
        self.position(id).is_some()
    }

    pub fn add_front(&mut self, constraint: Constraint) -> ConstraintId {
        let id = ConstraintId::new();
        debug!("Holder: added {} constraint {} at front", constraint.geometry().kind(), id);
        self.members.push_front(Member { id, constraint });
        self.generation += 1;
        id
    }

    pub fn add_back(&mut self, constraint: Constraint) -> ConstraintId {
        let id = ConstraintId::new();
        debug!("Holder: added {} constraint {} at back", constraint.geometry().kind(), id);
        self.members.push_back(Member { id, constraint });
        self.generation += 1;
        id
    }

    /// Remove a member. Auto-delete constraints are dropped and `None` is
    /// returned; caller-owned ones come back as `Some`.
    pub fn remove(&mut self, id: ConstraintId) -> HolderResult<Option<Constraint>> {
        let constraint = self.detach(id)?;
        if constraint.is_auto_delete() {
            debug!("Holder: destroyed constraint {}", id);
            Ok(None)
        } else {
            Ok(Some(constraint))
        }
    }

    /// Move a member out regardless of its ownership hint, e.g. to install
    /// it in a controller.
    pub fn detach(&mut self, id: ConstraintId) -> HolderResult<Constraint> {
        let index = self.position(id).ok_or(HolderError::NotFound(id))?;
        let member = self.members.remove(index).ok_or(HolderError::NotFound(id))?;
        self.generation += 1;
        debug!("Holder: removed constraint {}", id);
        Ok(member.constraint)
    }

    /// Empty the holder. Auto-delete members are dropped; caller-owned
    /// members are returned in order. Any traversal is abandoned.
    pub fn clear_all(&mut self) -> Vec<Constraint> {
        let total = self.members.len();
        let returned: Vec<Constraint> = self
            .members
            .drain(..)
            .map(|m| m.constraint)
            .filter(|c| !c.is_auto_delete())
            .collect();
        self.generation += 1;
        self.cursor = None;
        debug!(
            "Holder: cleared {} constraints ({} returned to caller)",
            total,
            returned.len()
        );
        returned
    }

    pub fn get(&self, id: ConstraintId) -> Option<&Constraint> {
        self.members.iter().find(|m| m.id == id).map(|m| &m.constraint)
    }

    pub fn get_mut(&mut self, id: ConstraintId) -> Option<&mut Constraint> {
        self.members.iter_mut().find(|m| m.id == id).map(|m| &mut m.constraint)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ConstraintId, &Constraint)> {
        self.members.iter().map(|m| (m.id, &m.constraint))
    }

    // =========================================================================
    // Cursor traversal
    // =========================================================================

    /// Start a traversal from the front, replacing any traversal in progress.
    pub fn begin(&mut self) {
        self.cursor = Some(Cursor {
            index: 0,
            generation: self.generation,
        });
    }

    pub fn done(&self) -> HolderResult<bool> {
        let cursor = self.live_cursor()?;
        Ok(cursor.index >= self.members.len())
    }

    pub fn next(&mut self) -> HolderResult<()> {
        let cursor = self.live_cursor()?;
        if cursor.index >= self.members.len() {
            return Err(HolderError::CursorExhausted);
        }
        self.cursor = Some(Cursor {
            index: cursor.index + 1,
            ..cursor
        });
        Ok(())
    }

    pub fn current(&self) -> HolderResult<(ConstraintId, &Constraint)> {
        let cursor = self.live_cursor()?;
        self.members
            .get(cursor.index)
            .map(|m| (m.id, &m.constraint))
            .ok_or(HolderError::CursorExhausted)
    }

    pub fn current_mut(&mut self) -> HolderResult<(ConstraintId, &mut Constraint)> {
        let cursor = self.live_cursor()?;
        self.members
            .get_mut(cursor.index)
            .map(|m| (m.id, &mut m.constraint))
            .ok_or(HolderError::CursorExhausted)
    }

    /// Apply every member to `query` and return the engaged one closest to
    /// it. Ties go to the earlier member.
    ///
    /// Every member sees the query, so members outside their radius latch.
    pub fn evaluate(&mut self, query: &Point3) -> Option<HolderSnap> {
        let mut best: Option<HolderSnap> = None;
        for member in self.members.iter_mut() {
            let result = member.constraint.apply(query);
            if !result.engaged {
                continue;
            }
            let closer = best.map_or(true, |b| result.distance < b.distance);
            if closer {
                best = Some(HolderSnap {
                    id: member.id,
                    proxy: result.proxy,
                    distance: result.distance,
                });
            }
        }
        best
    }

    fn position(&self, id: ConstraintId) -> Option<usize> {
        self.members.iter().position(|m| m.id == id)
    }

    fn live_cursor(&self) -> HolderResult<Cursor> {
        let cursor = self.cursor.ok_or(HolderError::NoTraversal)?;
        if cursor.generation != self.generation {
            return Err(HolderError::IteratorInvalidated);
        }
        Ok(cursor)
    }
}
