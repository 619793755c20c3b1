//! Single-slot pointer exchange between the control thread and the
//! realtime thread.
//!
//! Ownership of a boxed constraint moves through `AtomicPtr` swaps: whoever
//! swaps a pointer out of a slot owns the allocation behind it. While
//! ticking, the realtime side only ever swaps and compares; allocation and
//! `Drop` stay on the control side. Teardown is the exception: the last
//! handle to go frees whatever is left.

use crate::constraint::Constraint;
use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicU8, Ordering};

/// Retirement capacity. The control side drains before every push, so at
/// most the previously active constraint and the newest install can be
/// waiting at once.
pub(crate) const RETIRE_SLOTS: usize = 2;

/// Address used to encode a clear request in the inbox. Never dereferenced.
static CLEAR_MARKER: u8 = 0;

fn clear_marker() -> *mut Constraint {
    ptr::addr_of!(CLEAR_MARKER) as *mut Constraint
}

#[derive(Debug)]
pub(crate) enum Command {
    Install(Box<Constraint>),
    Clear,
}

impl Command {
    fn into_raw(self) -> *mut Constraint {
        match self {
            Command::Install(constraint) => Box::into_raw(constraint),
            Command::Clear => clear_marker(),
        }
    }

    /// # Safety
    ///
    /// `raw` must be null, the clear marker, or a pointer from
    /// `Box::into_raw` that the caller now exclusively owns.
    unsafe fn from_raw(raw: *mut Constraint) -> Option<Self> {
        if raw.is_null() {
            None
        } else if raw == clear_marker() {
            Some(Command::Clear)
        } else {
            // SAFETY: guaranteed by the caller.
            Some(Command::Install(unsafe { Box::from_raw(raw) }))
        }
    }
}

#[derive(Debug)]
pub(crate) struct Mailbox {
    inbox: AtomicPtr<Constraint>,
    retired: [AtomicPtr<Constraint>; RETIRE_SLOTS],
    state: AtomicU8,
}

impl Mailbox {
    pub(crate) fn new() -> Self {
        Self {
            inbox: AtomicPtr::new(ptr::null_mut()),
            retired: [AtomicPtr::new(ptr::null_mut()), AtomicPtr::new(ptr::null_mut())],
            state: AtomicU8::new(0),
        }
    }

    /// Control side. Publish a command, returning the previous one if the
    /// realtime side never picked it up.
    pub(crate) fn push(&self, command: Command) -> Option<Command> {
        let previous = self.inbox.swap(command.into_raw(), Ordering::AcqRel);
        // SAFETY: every non-null, non-marker pointer in the inbox came from
        // `Box::into_raw`, and the swap made us its only holder.
        unsafe { Command::from_raw(previous) }
    }

    /// Control side. Take back whatever is still waiting in the inbox.
    pub(crate) fn withdraw(&self) -> Option<Command> {
        let previous = self.inbox.swap(ptr::null_mut(), Ordering::AcqRel);
        // SAFETY: as in `push`.
        unsafe { Command::from_raw(previous) }
    }

    /// Realtime side. Take the pending command, if any.
    pub(crate) fn poll(&self) -> Option<Command> {
        if self.inbox.load(Ordering::Relaxed).is_null() {
            return None;
        }
        let pending = self.inbox.swap(ptr::null_mut(), Ordering::AcqRel);
        // SAFETY: as in `push`.
        unsafe { Command::from_raw(pending) }
    }

    /// Realtime side. Hand a constraint back for reclamation. Returns it
    /// unchanged when every retirement slot is occupied.
    pub(crate) fn retire(&self, constraint: Box<Constraint>) -> Result<(), Box<Constraint>> {
        let raw = Box::into_raw(constraint);
        for slot in &self.retired {
            if slot
                .compare_exchange(ptr::null_mut(), raw, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                return Ok(());
            }
        }
        // SAFETY: `raw` was produced above and never published.
        Err(unsafe { Box::from_raw(raw) })
    }

    /// Control side. Move every retired constraint out to `reclaim`.
    pub(crate) fn drain_retired(&self, mut reclaim: impl FnMut(Box<Constraint>)) {
        for slot in &self.retired {
            let raw = slot.swap(ptr::null_mut(), Ordering::AcqRel);
            if !raw.is_null() {
                // SAFETY: retired slots only ever hold `Box::into_raw`
                // pointers, and the swap made us their only holder.
                reclaim(unsafe { Box::from_raw(raw) });
            }
        }
    }

    pub(crate) fn publish_state(&self, state: u8) {
        self.state.store(state, Ordering::Release);
    }

    pub(crate) fn state(&self) -> u8 {
        self.state.load(Ordering::Acquire)
    }
}

/// Runs when the last handle goes. Everything still here has had
/// `on_start`, so it is ended before being freed.
impl Drop for Mailbox {
    fn drop(&mut self) {
        if let Some(Command::Install(mut constraint)) = self.withdraw() {
            constraint.end();
        }
        self.drain_retired(|mut constraint| constraint.end());
    }
}
