//! Consumer-side cursor over one sub-partition.

use crate::error::PartitionError;
use crate::subpartition::{AvailabilityListener, ResultSubpartition};
use shuffle_memory::{Buffer, DataType};
use std::sync::Arc;

/// `next-data-type` as described in : `none` is represented by
/// the absence of a returned tuple rather than as a variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextDataType {
    Data,
    Event,
    PriorityEvent,
}

impl From<DataType> for NextDataType {
    fn from(value: DataType) -> Self {
        match value {
            DataType::Data => Self::Data,
            DataType::Event => Self::Event,
            DataType::PriorityEvent => Self::PriorityEvent,
        }
    }
}

/// One item pulled from a sub-partition view.
pub struct ViewItem {
    pub buffer: Buffer,
    pub backlog: i32,
    pub next_data_type: NextDataType,
    pub sequence_number: u64,
}

/// Consumer-side cursor over a [`ResultSubpartition`]. Local consumers
/// hold one directly; remote consumers hold one behind a network
/// Sequence-View Reader (`shuffle-net`).
pub struct ResultSubpartitionView {
    subpartition: Arc<ResultSubpartition>,
}

impl ResultSubpartitionView {
    pub(crate) fn new(
        subpartition: Arc<ResultSubpartition>,
        listener: Option<Arc<dyn AvailabilityListener>>,
) -> Self {
        if let Some(listener) = listener {
            subpartition.register_listener(listener);
        }
        Self { subpartition }
    }

    /// Returns the next available item, or `None` if nothing is ready
    /// right now.
    pub fn next(&self) -> Result<Option<ViewItem>, PartitionError> {
        let item = self.subpartition.next()?;
        Ok(item.map(|(buffer, backlog, data_type, sequence_number)| ViewItem {
            buffer,
            backlog,
            next_data_type: data_type.into(),
            sequence_number,
        }))
    }

    /// Whether at least one item is ready to hand to a consumer that
    /// currently holds `credit` units. Events bypass the credit check —
    /// they are always deliverable.
    pub fn is_available(&self, credit: i64) -> bool {
        if self.subpartition.is_released() {
            return true; // a released view must be drained for its error
        }
        match self.peek_next_data_type() {
            Some(data_type) if data_type.is_event() => true,
            Some(_) => credit > 0,
            None => false,
        }
    }

    fn peek_next_data_type(&self) -> Option<DataType> {
        // A cheap best-effort peek; `next()` is authoritative. Re-deriving
        // readiness here avoids taking the item just to check credit.
        self.subpartition.peek_data_type()
    }

    /// Called after a checkpoint-alignment pause lifts. The pause itself
    /// lives entirely on the consumer side (it simply stops polling this
    /// view); this side has nothing to un-block beyond re-checking
    /// availability, since events were never gated on it. Kept as an
    /// explicit method, rather than folded away, so the network reader
    /// has a symmetric place to re-trigger its own enqueue check when a
    /// `ResumeConsumption` control message arrives.
    pub fn resume_consumption(&self) {}

    pub fn is_released(&self) -> bool {
        self.subpartition.is_released()
    }

    pub fn failure_cause(&self) -> Option<String> {
        self.subpartition.failure_cause()
    }

    pub fn buffers_in_backlog(&self) -> usize {
        self.subpartition.buffers_in_backlog()
    }
}
