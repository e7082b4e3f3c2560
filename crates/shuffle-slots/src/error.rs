use crate::ids::{AllocationId, ExecutionAttemptId, JobId, SlotIndex};
use thiserror::Error;

/// Error taxonomy for the Task Slot Table. `duplicate-slot-
/// request` and `budget-exhausted` are deliberately *not* variants here:
/// they are idempotent/recoverable outcomes returned as `Ok(true)`/
/// `Ok(false)` from `TaskSlotTable::allocate`.
#[derive(Debug, Error)]
pub enum SlotError {
    #[error("slot table is not in the Running state")]
    NotRunning,

    #[error("static slot index {0} is already occupied by a different allocation")]
    IndexOccupied(SlotIndex),

    #[error("static slot index {index} is out of range (table has {capacity} static slots)")]
    IndexOutOfRange { index: SlotIndex, capacity: usize },

    #[error("allocation {0} is not known to this table")]
    SlotNotFound(AllocationId),

    #[error("slot for allocation {allocation_id} is not Active for job {job_id}")]
    SlotNotActive {
        allocation_id: AllocationId,
        job_id: JobId,
    },

    #[error("execution attempt {0} is not attached to its slot")]
    TaskNotFound(ExecutionAttemptId),
}
