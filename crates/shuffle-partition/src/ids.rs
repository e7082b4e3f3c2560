//! Identity types. Sub-partitions and views reference their owning
//! partition by id rather than by pointer, per the arena-and-index model:
//! the manager owns partitions, and release is purely id-driven.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifies the logical output of a producer operator that a
/// `PartitionId` is one parallel-subtask instance of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntermediateDataSetId(Uuid);

impl IntermediateDataSetId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for IntermediateDataSetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for IntermediateDataSetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies one attempt of the producer task that owns a partition.
/// Distinct attempts of the same subtask (after a retry or speculative
/// re-execution) get distinct ids, so a stale attempt's partition can
/// never collide with the current one's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProducerAttemptId(Uuid);

impl ProducerAttemptId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ProducerAttemptId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProducerAttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies one Result Partition: one parallel subtask's output,
/// named by the pair `(intermediate data set, producer attempt)` rather
/// than a single flat id — this is what lets a speculative
/// re-execution's partition coexist, briefly, with a stale attempt's
/// under the same data set without the registry conflating them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartitionId {
    intermediate_data_set_id: IntermediateDataSetId,
    producer_attempt_id: ProducerAttemptId,
}

impl PartitionId {
    /// Builds a fresh, globally-unique partition id standing in for an
    /// arbitrary `(data set, attempt)` pair — convenient when a test or
    /// caller does not care about the composite identity, only its
    /// uniqueness.
    pub fn new() -> Self {
        Self::from_parts(IntermediateDataSetId::new(), ProducerAttemptId::new())
    }

    pub fn from_parts(
        intermediate_data_set_id: IntermediateDataSetId,
        producer_attempt_id: ProducerAttemptId,
    ) -> Self {
        Self {
            intermediate_data_set_id,
            producer_attempt_id,
        }
    }

    pub fn intermediate_data_set_id(&self) -> IntermediateDataSetId {
        self.intermediate_data_set_id
    }

    pub fn producer_attempt_id(&self) -> ProducerAttemptId {
        self.producer_attempt_id
    }
}

impl Default for PartitionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}",
            self.intermediate_data_set_id, self.producer_attempt_id
        )
    }
}

/// Index of one sub-partition within a Result Partition.
pub type SubpartitionIndex = usize;

/// Identifies one remote reader (network receiver channel), used by the
/// Partition Request Queue to key `allReaders`/`availableReaders`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReceiverId(Uuid);

impl ReceiverId {
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

impl Default for ReceiverId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReceiverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
