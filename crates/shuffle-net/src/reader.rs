//! One remote reader's server-side state: its sub-partition view plus
//! the credit it currently holds.

use shuffle_partition::{PartitionError, ReceiverId, ResultSubpartitionView, ViewItem};
use std::sync::atomic::{AtomicI64, Ordering};

/// Server-side bookkeeping for a single `PartitionRequest`. Wraps a
/// [`ResultSubpartitionView`] with the credit-based flow-control counter
/// /§4.7 layers on top of it: each delivered data buffer
/// (events are exempt) costs one credit unit, replenished by
/// `AddCredit` messages from the consumer.
pub struct NetworkReader {
    pub receiver_id: ReceiverId,
    pub view: ResultSubpartitionView,
    credit: AtomicI64,
}

impl NetworkReader {
    pub fn new(receiver_id: ReceiverId, view: ResultSubpartitionView, initial_credit: i32) -> Self {
        Self {
            receiver_id,
            view,
            credit: AtomicI64::new(i64::from(initial_credit)),
        }
    }

    pub fn add_credit(&self, delta: i32) {
        self.credit.fetch_add(i64::from(delta), Ordering::AcqRel);
    }

    pub fn current_credit(&self) -> i64 {
        self.credit.load(Ordering::Acquire)
    }

    /// Whether this reader currently has something deliverable: an
    /// event (always eligible) or a data buffer backed by positive
    /// credit.
    pub fn is_available(&self) -> bool {
        self.view.is_available(self.current_credit())
    }

    /// Pulls the next item, debiting one credit unit for data buffers.
    /// Events never consume credit.
    pub fn get_next_buffer(&self) -> Result<Option<ViewItem>, PartitionError> {
        let item = self.view.next()?;
        if let Some(item) = &item {
            if !matches!(
                item.next_data_type,
                shuffle_partition::NextDataType::Event | shuffle_partition::NextDataType::PriorityEvent
) {
                self.credit.fetch_sub(1, Ordering::AcqRel);
            }
        }
        Ok(item)
    }
}
