//! One shard of a Result Partition: a FIFO of queued buffers, with
//! priority events permitted to overtake an unfinished tail.

use crate::cause::ReleaseCause;
use crate::error::PartitionError;
use crate::spill::SpillWriter;
use shuffle_memory::{Buffer, BufferConsumer, DataType};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Registered once per view; called by the producer side to wake a
/// sleeping consumer without the consumer having to poll.
pub trait AvailabilityListener: Send + Sync {
    fn notify_data_available(&self);
    fn notify_priority_event(&self, sequence_number: u64);
}

/// Which scheduling/back-pressure contract this sub-partition honors.
/// All three variants expose the same method set , so a single enum matched internally
/// stands in for a trait object — there is no caller that needs to hold
/// a `dyn ResultSubpartition`.
pub enum SubpartitionKind {
    /// Unbounded in-memory queue; producer never blocks on this sub-partition.
    Pipelined,
    /// In-memory queue bounded by buffer count; producer blocks (via the
    /// pool's own backpressure) once the bound is reached.
    PipelinedBounded { max_buffers_in_flight: usize },
    /// Buffers beyond the in-memory window are appended to a spill file
    /// instead of held live.
    Blocking { spill: Option<Mutex<SpillWriter>> },
}

struct QueueEntry {
    consumer: BufferConsumer,
    data_type: DataType,
    #[allow(dead_code)]
    partial_record_length: usize,
}

struct State {
    queue: VecDeque<QueueEntry>,
    finished: bool,
    released: bool,
    cause: Option<ReleaseCause>,
    buffers_in_backlog: usize,
}

/// One shard of a Result Partition. `add`/`flush`/`finish`/`release` are
/// called from the producer thread; `next`/availability queries are
/// called from the (possibly remote) consumer side.
pub struct ResultSubpartition {
    index: usize,
    kind: SubpartitionKind,
    state: Mutex<State>,
    sequence_number: AtomicU64,
    listener: Mutex<Option<Arc<dyn AvailabilityListener>>>,
}

impl ResultSubpartition {
    pub fn new(index: usize, kind: SubpartitionKind) -> Self {
        Self {
            index,
            kind,
            state: Mutex::new(State {
                queue: VecDeque::new(),
                finished: false,
                released: false,
                cause: None,
                buffers_in_backlog: 0,
            }),
            sequence_number: AtomicU64::new(0),
            listener: Mutex::new(None),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn register_listener(&self, listener: Arc<dyn AvailabilityListener>) {
        let mut slot = self.listener.lock().unwrap();
        crate::invariants::debug_assert_no_orphaned_listener!(slot.is_none());
        *slot = Some(listener);
    }

    /// Enqueues a Buffer Consumer. `partial_record_length` carries the
    /// byte length of a record that started in a previous buffer and
    /// spills into this one, so a downstream reader can reconstruct
    /// record boundaries that cross buffer edges.
    ///
    /// # Panics
    ///
    /// Panics if called after `finish()` — adding to a finished
    /// sub-partition is structural misuse.
    pub fn add(&self, consumer: BufferConsumer, partial_record_length: usize) {
        let mut state = self.state.lock().unwrap();
        assert!(!state.finished, "add after finish is structural misuse");

        let data_type = consumer.buffer().data_type();
        let entry = QueueEntry {
            consumer,
            data_type,
            partial_record_length,
        };

        if data_type.is_priority() {
            // A priority event may overtake an unfinished tail: insert it
            // just before the last entry instead of appending after it,
            // so it is read before the (still-growing) data buffer.
            let overtake_unfinished_tail = state
.queue
.back()
.is_some_and(|tail| !tail.consumer.is_finished());
            if overtake_unfinished_tail {
                let insert_at = state.queue.len() - 1;
                state.queue.insert(insert_at, entry);
            } else {
                state.queue.push_back(entry);
            }
        } else {
            state.queue.push_back(entry);
        }
        state.buffers_in_backlog += 1;
        drop(state);

        if data_type.is_priority() {
            if let Some(listener) = self.listener.lock().unwrap().as_ref() {
                let seq = self.sequence_number.load(Ordering::Acquire);
                listener.notify_priority_event(seq);
            }
        }
    }

    /// Nudges the attached view that data is available.
    pub fn flush(&self) {
        if let Some(listener) = self.listener.lock().unwrap().as_ref() {
            listener.notify_data_available();
        }
    }

    /// Writes an end-of-partition marker and blocks further `add` calls.
    pub fn finish(&self) {
        let mut state = self.state.lock().unwrap();
        assert!(!state.finished, "finish called twice is structural misuse");
        state.finished = true;
        drop(state);
        self.flush();
    }

    /// Idempotent: the first call records `cause`; subsequent calls are
    /// no-ops.
    pub fn release(&self, cause: ReleaseCause) {
        let mut state = self.state.lock().unwrap();
        if state.released {
            return;
        }
        state.released = true;
        state.cause = Some(cause);
        drop(state);
        self.flush();
    }

    pub fn is_released(&self) -> bool {
        self.state.lock().unwrap().released
    }

    pub fn failure_cause(&self) -> Option<String> {
        match &self.state.lock().unwrap().cause {
            Some(ReleaseCause::ProducerFailed(reason)) => Some(reason.clone()),
            _ => None,
        }
    }

    pub fn buffers_in_backlog(&self) -> usize {
        self.state.lock().unwrap().buffers_in_backlog
    }

    /// Pops and returns the next readable item, or `None` if nothing is
    /// currently available. Advances the shared reader index on the
    /// returned buffer and assigns the next sequence number.
    pub(crate) fn next(&self) -> Result<Option<(Buffer, i32, DataType, u64)>, PartitionError> {
        let mut state = self.state.lock().unwrap();

        if state.released {
            let cause = state.cause.as_ref().map(ToString::to_string).unwrap_or_default();
            return Err(PartitionError::AlreadyReleased { cause });
        }

        let Some(front) = state.queue.front() else {
            return Ok(None);
        };

        let (committed_len, consumer_finished) = front.consumer.snapshot();
        let buffer = front.consumer.buffer();
        let reader_index = buffer.reader_index();

        if committed_len <= reader_index {
            // The front entry has nothing new yet; since this is a FIFO
            // and the front blocks everything behind it, there is
            // nothing to deliver right now.
            return Ok(None);
        }

        buffer.set_reader_index(committed_len);
        let result_buffer = buffer.clone();
        let data_type = front.data_type;
        let fully_drained = consumer_finished && committed_len == buffer.writer_index();

        if fully_drained {
            state.queue.pop_front();
            state.buffers_in_backlog = state.buffers_in_backlog.saturating_sub(1);
        }

        let seq = self.sequence_number.fetch_add(1, Ordering::AcqRel);
        crate::invariants::debug_assert_contiguous_sequence!(seq, seq + 1);
        let backlog = state.buffers_in_backlog as i32;
        Ok(Some((result_buffer, backlog, data_type, seq)))
    }

    /// Appends a record directly to this sub-partition's spill file,
    /// bypassing the live queue entirely. Used once the in-memory window
    /// for a `SubpartitionKind::Blocking` sub-partition is exceeded.
    pub fn spill(&self, data_type: u8, payload: &[u8]) -> Result<(), PartitionError> {
        match &self.kind {
            SubpartitionKind::Blocking { spill: Some(writer) } => {
                writer.lock().unwrap().write_record(data_type, payload)
            }
            _ => Err(PartitionError::Spill(
                "sub-partition is not spill-backed".into(),
)),
        }
    }

    /// Best-effort readiness check used by `is_available` without
    /// consuming the front entry.
    pub(crate) fn peek_data_type(&self) -> Option<DataType> {
        let state = self.state.lock().unwrap();
        let front = state.queue.front()?;
        let (committed_len, _) = front.consumer.snapshot();
        if front.data_type.is_event() || committed_len > front.consumer.buffer().reader_index() {
            Some(front.data_type)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shuffle_memory::{BufferBuilder, BufferPool, PoolConfig};
    use std::sync::Arc as StdArc;

    fn leased(pool: &StdArc<BufferPool>, data_type: DataType) -> Buffer {
        let segment = pool.try_lease().expect("lease");
        pool.wrap_buffer(segment, data_type)
    }

    #[test]
    fn delivers_data_in_fifo_order() {
        let pool = BufferPool::new(PoolConfig::new(64, 2, 2));
        let sub = ResultSubpartition::new(0, SubpartitionKind::Pipelined);

        let mut builder = BufferBuilder::new(leased(&pool, DataType::Data));
        let consumer = builder.create_consumer();
        builder.append(b"hello");
        builder.commit();
        builder.finish();
        sub.add(consumer, 0);
        sub.flush();

        let (buffer, _backlog, data_type, seq) = sub.next().unwrap().expect("item ready");
        assert_eq!(data_type, DataType::Data);
        assert_eq!(seq, 0);
        assert_eq!(buffer.readable_bytes(), 0); // reader index caught up to writer
    }

    #[test]
    fn priority_event_overtakes_unfinished_tail() {
        let pool = BufferPool::new(PoolConfig::new(64, 2, 2));
        let sub = ResultSubpartition::new(0, SubpartitionKind::Pipelined);

        let mut data_builder = BufferBuilder::new(leased(&pool, DataType::Data));
        let data_consumer = data_builder.create_consumer();
        data_builder.append(b"partial");
        data_builder.commit();
        sub.add(data_consumer, 0); // unfinished tail

        let mut event_builder = BufferBuilder::new(leased(&pool, DataType::PriorityEvent));
        let event_consumer = event_builder.create_consumer();
        event_builder.append(b"evt");
        event_builder.commit();
        event_builder.finish();
        sub.add(event_consumer, 0);

        let (_, _, first_type, _) = sub.next().unwrap().expect("priority ready first");
        assert_eq!(first_type, DataType::PriorityEvent);

        let (_, _, second_type, _) = sub.next().unwrap().expect("data buffer next");
        assert_eq!(second_type, DataType::Data);
    }

    #[test]
    #[should_panic(expected = "structural misuse")]
    fn add_after_finish_panics() {
        let pool = BufferPool::new(PoolConfig::new(64, 1, 1));
        let sub = ResultSubpartition::new(0, SubpartitionKind::Pipelined);
        sub.finish();

        let mut builder = BufferBuilder::new(leased(&pool, DataType::Data));
        let consumer = builder.create_consumer();
        sub.add(consumer, 0);
    }

    #[test]
    fn blocking_subpartition_spills_records_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub-0.spill");
        let writer = SpillWriter::create(&path).unwrap();
        let sub = ResultSubpartition::new(
            0,
            SubpartitionKind::Blocking {
                spill: Some(Mutex::new(writer)),
            },
);

        sub.spill(0, b"spilled payload").unwrap();

        let pool_sub = ResultSubpartition::new(0, SubpartitionKind::Pipelined);
        assert!(pool_sub.spill(0, b"nope").is_err());
    }

    #[test]
    fn release_records_only_first_cause() {
        let sub = ResultSubpartition::new(0, SubpartitionKind::Pipelined);
        sub.release(ReleaseCause::ProducerFailed("boom".into()));
        sub.release(ReleaseCause::ConsumerCancelled);
        assert_eq!(sub.failure_cause().as_deref(), Some("boom"));
    }
}
