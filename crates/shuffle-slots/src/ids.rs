//! Identity types for jobs, allocations, and execution attempts. Slots
//! reference these by value, never by pointer, matching the
//! arena-and-index discipline `shuffle-partition::ids` uses for
//! partitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(JobId, "Identifies one job whose tasks occupy slots on this worker.");
uuid_id!(AllocationId, "Identifies one slot-allocation event; distinct from the slot's static index.");
uuid_id!(ExecutionAttemptId, "Identifies one execution attempt of a task, attached to a slot.");
uuid_id!(ResourceId, "Identifies this worker, reported alongside its slot report.");

/// A slot's position in the table. Non-negative values are static slots
/// carved out at worker startup; negative values are dynamic slots
/// created on demand for one allocation and never reused by index.
pub type SlotIndex = i64;
