//! Bridges a [`ResultSubpartition`]'s producer-side availability
//! callbacks to the consumer-side [`PartitionRequestQueue`] that is
//! waiting on them.

use crate::queue::PartitionRequestQueue;
use shuffle_partition::{AvailabilityListener, ReceiverId};
use std::sync::Arc;

pub struct QueueAvailabilityListener {
    queue: Arc<PartitionRequestQueue>,
    receiver_id: ReceiverId,
}

impl QueueAvailabilityListener {
    pub fn new(queue: Arc<PartitionRequestQueue>, receiver_id: ReceiverId) -> Arc<Self> {
        Arc::new(Self { queue, receiver_id })
    }
}

impl AvailabilityListener for QueueAvailabilityListener {
    fn notify_data_available(&self) {
        self.queue.notify_data_available(self.receiver_id);
    }

    fn notify_priority_event(&self, _sequence_number: u64) {
        self.queue.notify_data_available(self.receiver_id);
    }
}
