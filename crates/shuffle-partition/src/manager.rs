//! Process-wide registry of Result Partitions, keyed by partition id.
//!
//! A `Mutex`/`Arc`-guarded singleton registry: "hold the `Arc` you were
//! given at registration time, not a re-looked-up one" is the discipline
//! behind the registered-instance check on release.

use crate::cause::ReleaseCause;
use crate::error::PartitionError;
use crate::ids::PartitionId;
use crate::partition::ResultPartition;
use crate::subpartition::AvailabilityListener;
use crate::view::ResultSubpartitionView;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct ResultPartitionManager {
    partitions: Mutex<HashMap<PartitionId, Arc<ResultPartition>>>,
}

impl ResultPartitionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a partition. Idempotent-by-error: registering the same
    /// id twice always fails rather than silently replacing the first
    /// registration.
    pub fn register(&self, partition: Arc<ResultPartition>) -> Result<(), PartitionError> {
        let mut partitions = self.partitions.lock().unwrap();
        if partitions.contains_key(&partition.id()) {
            return Err(PartitionError::AlreadyRegistered(partition.id()));
        }
        tracing::debug!(partition_id = %partition.id(), "result partition registered");
        partitions.insert(partition.id(), partition);
        Ok(())
    }

    pub fn create_subpartition_view(
        &self,
        partition_id: PartitionId,
        index: usize,
        listener: Option<Arc<dyn AvailabilityListener>>,
    ) -> Result<ResultSubpartitionView, PartitionError> {
        let partition = self
            .partitions
            .lock()
            .unwrap()
            .get(&partition_id)
            .cloned()
            .ok_or(PartitionError::PartitionNotFound(partition_id))?;
        partition.create_subpartition_view(index, listener)
    }

    /// Unconditionally releases and deregisters a partition.
    pub fn release(&self, partition_id: PartitionId, cause: ReleaseCause) {
        let removed = self.partitions.lock().unwrap().remove(&partition_id);
        if let Some(partition) = removed {
            tracing::debug!(partition_id = %partition_id, ?cause, "result partition released");
            partition.release(cause);
        }
    }

    /// Releases `partition_id` only if `instance` is still the
    /// registered `Arc` for that id — prevents a consumption-triggered
    /// release from racing a concurrent re-registration under the same
    /// id.
    pub fn release_if_still_registered(
        &self,
        partition_id: PartitionId,
        instance: &Arc<ResultPartition>,
        cause: ReleaseCause,
    ) {
        let mut partitions = self.partitions.lock().unwrap();
        let still_registered = partitions
            .get(&partition_id)
            .is_some_and(|current| Arc::ptr_eq(current, instance));
        if still_registered {
            partitions.remove(&partition_id);
            drop(partitions);
            instance.release(cause);
        }
    }

    /// Releases every registered partition (shutdown path).
    pub fn shutdown(&self) {
        let mut partitions = self.partitions.lock().unwrap();
        for (_, partition) in partitions.drain() {
            partition.release(ReleaseCause::Shutdown);
        }
    }

    pub fn registered_count(&self) -> usize {
        self.partitions.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subpartition::SubpartitionKind;
    use shuffle_memory::{BufferPool, PoolConfig};

    fn partition() -> Arc<ResultPartition> {
        let pool = BufferPool::new(PoolConfig::default());
        Arc::new(ResultPartition::new(
            PartitionId::new(),
            pool,
            vec![SubpartitionKind::Pipelined],
        ))
    }

    #[test]
    fn second_register_under_same_id_fails() {
        let manager = ResultPartitionManager::new();
        let id = PartitionId::new();
        let pool = BufferPool::new(PoolConfig::default());
        let a = Arc::new(ResultPartition::new(id, Arc::clone(&pool), vec![SubpartitionKind::Pipelined]));
        let b = Arc::new(ResultPartition::new(id, pool, vec![SubpartitionKind::Pipelined]));

        manager.register(a).unwrap();
        assert!(matches!(
            manager.register(b),
            Err(PartitionError::AlreadyRegistered(_))
        ));
    }

    #[test]
    fn unknown_partition_lookup_is_typed_error() {
        let manager = ResultPartitionManager::new();
        assert!(matches!(
            manager.create_subpartition_view(PartitionId::new(), 0, None),
            Err(PartitionError::PartitionNotFound(_))
        ));
    }

    #[test]
    fn release_if_still_registered_ignores_stale_instance() {
        let manager = ResultPartitionManager::new();
        let first = partition();
        let id = first.id();
        manager.register(Arc::clone(&first)).unwrap();

        // Simulate a re-registration under the same id after a prior
        // release removed it from the map.
        manager.release(id, ReleaseCause::Finished);
        let second = Arc::new(ResultPartition::new(
            id,
            shuffle_memory::BufferPool::new(PoolConfig::default()),
            vec![SubpartitionKind::Pipelined],
        ));
        manager.register(Arc::clone(&second)).unwrap();

        // A stale notification referencing `first` must not touch `second`.
        manager.release_if_still_registered(id, &first, ReleaseCause::ConsumerCancelled);
        assert_eq!(manager.registered_count(), 1);
        assert!(!second.is_released());
    }

    #[test]
    fn shutdown_releases_all_registered_partitions() {
        let manager = ResultPartitionManager::new();
        let a = partition();
        let b = partition();
        manager.register(Arc::clone(&a)).unwrap();
        manager.register(Arc::clone(&b)).unwrap();

        manager.shutdown();
        assert!(a.is_released());
        assert!(b.is_released());
        assert_eq!(manager.registered_count(), 0);
    }
}
