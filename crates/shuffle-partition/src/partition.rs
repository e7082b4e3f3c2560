//! A Result Partition: one parallel subtask's output, sharded into
//! sub-partitions, one per downstream consumer.

use crate::cause::ReleaseCause;
use crate::error::PartitionError;
use crate::ids::PartitionId;
use crate::subpartition::{AvailabilityListener, ResultSubpartition, SubpartitionKind};
use crate::view::ResultSubpartitionView;
use shuffle_memory::BufferPool;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct ResultPartition {
    id: PartitionId,
    pool: Arc<BufferPool>,
    subpartitions: Vec<Arc<ResultSubpartition>>,
    released: AtomicBool,
}

impl ResultPartition {
    pub fn new(id: PartitionId, pool: Arc<BufferPool>, kinds: Vec<SubpartitionKind>) -> Self {
        let subpartitions = kinds
.into_iter()
.enumerate()
.map(|(index, kind)| Arc::new(ResultSubpartition::new(index, kind)))
.collect();
        Self {
            id,
            pool,
            subpartitions,
            released: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> PartitionId {
        self.id
    }

    pub fn pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }

    pub fn subpartition_count(&self) -> usize {
        self.subpartitions.len()
    }

    pub fn subpartition(&self, index: usize) -> Result<&Arc<ResultSubpartition>, PartitionError> {
        self.subpartitions
.get(index)
.ok_or(PartitionError::SubpartitionIndexOutOfRange {
                index,
                count: self.subpartitions.len(),
            })
    }

    /// Creates a consumer-side cursor over sub-partition `index`.
    pub fn create_subpartition_view(
        &self,
        index: usize,
        listener: Option<Arc<dyn AvailabilityListener>>,
) -> Result<ResultSubpartitionView, PartitionError> {
        let subpartition = Arc::clone(self.subpartition(index)?);
        Ok(ResultSubpartitionView::new(subpartition, listener))
    }

    /// Releases every sub-partition with `cause` and tears down the pool.
    /// Idempotent: each sub-partition records only its first cause.
    pub fn release(&self, cause: ReleaseCause) {
        self.released.store(true, Ordering::Release);
        for subpartition in &self.subpartitions {
            subpartition.release(cause.clone());
        }
        self.pool.destroy();
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shuffle_memory::PoolConfig;

    #[test]
    fn out_of_range_subpartition_index_is_an_error() {
        let pool = BufferPool::new(PoolConfig::default());
        let partition = ResultPartition::new(
            PartitionId::new(),
            pool,
            vec![SubpartitionKind::Pipelined],
);
        assert!(matches!(
            partition.create_subpartition_view(3, None),
            Err(PartitionError::SubpartitionIndexOutOfRange { index: 3, count: 1 })
));
    }

    #[test]
    fn release_propagates_to_every_subpartition() {
        let pool = BufferPool::new(PoolConfig::default());
        let partition = ResultPartition::new(
            PartitionId::new(),
            pool,
            vec![SubpartitionKind::Pipelined, SubpartitionKind::Pipelined],
);
        partition.release(ReleaseCause::Shutdown);
        assert!(partition.subpartition(0).unwrap().is_released());
        assert!(partition.subpartition(1).unwrap().is_released());
    }
}
