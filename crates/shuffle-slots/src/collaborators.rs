//! `SlotActions` collaborator contract : the worker-level
//! operations a Task Slot asks its owner to perform on its behalf. Kept
//! as an injected trait rather than a callback closure //! "re-architect global mutable state as explicit injected
//! collaborators" design note.

use crate::ids::AllocationId;
use crate::timer::Ticket;

pub trait SlotActions: Send + Sync {
    /// Requests that the slot owning `allocation_id` be freed once it
    /// has no attached tasks, mirroring `TaskSlotTable::free_slot`.
    fn free_slot(&self, allocation_id: AllocationId);

    /// Requests that the slot be timed out. `ticket` is re-validated by
    /// the caller against the table's current timer state before this
    /// is invoked; implementations need not re-check it.
    fn timeout_slot(&self, allocation_id: AllocationId, ticket: Ticket);
}

/// A `SlotActions` that records invocations instead of acting on them.
/// Used by tests and as a starting point for a real worker integration.
#[derive(Default)]
pub struct RecordingSlotActions {
    freed: std::sync::Mutex<Vec<AllocationId>>,
    timed_out: std::sync::Mutex<Vec<AllocationId>>,
}

impl RecordingSlotActions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn freed(&self) -> Vec<AllocationId> {
        self.freed.lock().unwrap().clone()
    }

    pub fn timed_out(&self) -> Vec<AllocationId> {
        self.timed_out.lock().unwrap().clone()
    }
}

impl SlotActions for RecordingSlotActions {
    fn free_slot(&self, allocation_id: AllocationId) {
        self.freed.lock().unwrap().push(allocation_id);
    }

    fn timeout_slot(&self, allocation_id: AllocationId, _ticket: Ticket) {
        self.timed_out.lock().unwrap().push(allocation_id);
    }
}
