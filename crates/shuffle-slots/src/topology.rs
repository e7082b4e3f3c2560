//! Worker's view of its producer→consumer topology :
//! an `IntermediateResult` is the worker-local shadow of one logical
//! output of a producer operator, and an `Edge` is the worker-local
//! shadow of one consumer's dependency on it. Both reference Result
//! Partitions by id, never by pointer (the arena-and-index model of
//! applied one layer up from `shuffle-partition`).

use shuffle_partition::PartitionId;
use std::marker::PhantomData;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntermediateResultId(Uuid);

impl IntermediateResultId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for IntermediateResultId {
    fn default() -> Self {
        Self::new()
    }
}

/// A capability token that can only be constructed by a caller who has
/// independently verified no view (local or network) is currently
/// attached to any partition of the result being reset.
///
/// Resetting an intermediate result for a new execution attempt is only
/// sound if nothing is still reading the old one. This type is that
/// external proof: there is deliberately no safe constructor that derives
/// the fact from
/// `IntermediateResult`'s own state, because the state this crate can
/// see (registered partition ids) does not capture whether a remote
/// `NetworkSequenceViewReader` elsewhere in the process still holds a
/// view. The caller — who does have that global knowledge — attests to
/// it explicitly by constructing this token.
pub struct NoAttachedViewsProof(PhantomData<()>);

impl NoAttachedViewsProof {
    /// Asserts, on the caller's authority, that no view is attached to
    /// any sub-partition of the result about to be reset.
    pub fn assert_caller_has_verified() -> Self {
        Self(PhantomData)
    }
}

/// The worker's view of one intermediate data set produced by a task:
/// the set of Result Partitions it fans out to, one per parallel
/// producer subtask, plus how many sub-partitions each carries.
pub struct IntermediateResult {
    id: IntermediateResultId,
    partitions: Vec<PartitionId>,
    num_subpartitions: usize,
}

impl IntermediateResult {
    pub fn new(num_subpartitions: usize) -> Self {
        Self {
            id: IntermediateResultId::new(),
            partitions: Vec::new(),
            num_subpartitions,
        }
    }

    pub fn id(&self) -> IntermediateResultId {
        self.id
    }

    pub fn num_subpartitions(&self) -> usize {
        self.num_subpartitions
    }

    pub fn partitions(&self) -> &[PartitionId] {
        &self.partitions
    }

    pub fn add_partition(&mut self, partition_id: PartitionId) {
        self.partitions.push(partition_id);
    }

    /// Clears the partition set in preparation for a speculative
    /// re-execution of the producer. Requires a [`NoAttachedViewsProof`]
    /// per this module's doc comment.
    pub fn reset_for_new_execution(&mut self, _proof: NoAttachedViewsProof) {
        self.partitions.clear();
    }
}

/// The worker's view of one consumer's dependency on an
/// `IntermediateResult`: which result it reads, and which
/// sub-partition index within each of that result's partitions belongs
/// to this particular consuming subtask.
pub struct Edge {
    consumed_result: IntermediateResultId,
    consumer_subtask_index: usize,
}

impl Edge {
    pub fn new(consumed_result: IntermediateResultId, consumer_subtask_index: usize) -> Self {
        Self {
            consumed_result,
            consumer_subtask_index,
        }
    }

    pub fn consumed_result(&self) -> IntermediateResultId {
        self.consumed_result
    }

    pub fn consumer_subtask_index(&self) -> usize {
        self.consumer_subtask_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_clears_registered_partitions() {
        let mut result = IntermediateResult::new(4);
        result.add_partition(PartitionId::new());
        result.add_partition(PartitionId::new());
        assert_eq!(result.partitions().len(), 2);

        result.reset_for_new_execution(NoAttachedViewsProof::assert_caller_has_verified());
        assert!(result.partitions().is_empty());
    }

    #[test]
    fn edge_tracks_consumer_subtask_index() {
        let result_id = IntermediateResultId::new();
        let edge = Edge::new(result_id, 3);
        assert_eq!(edge.consumed_result(), result_id);
        assert_eq!(edge.consumer_subtask_index(), 3);
    }
}
