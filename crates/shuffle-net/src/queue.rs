//! Partition Request Queue: the server-side multiplexer that decides,
//! for one network connection, which registered reader's next buffer to
//! frame and send.
//!
//! A hybrid event-driven/poll receiver: buffered queue drain,
//! `Notify`-driven wake-up, shutdown-drain-then-`None`, paired with a
//! single-pending-item sender state machine — "pop the next available
//! reader, frame-and-emit, re-enqueue or not," generalized from one
//! channel to many multiplexed readers. A `fatalError` latch blocks any
//! further enqueue once tripped.
//!
//! The drain loop itself (`drain`) is plain synchronous code driven by a
//! caller-supplied `can_continue`/`emit` pair so it can be exercised
//! without a real socket; [`run_on`] in `connection.rs` is the thin
//! async wrapper that drives it from a `Framed` transport.

use crate::collaborators::{BufferCompressor, NoopCompressor};
use crate::error::NetError;
use crate::message::{BufferResponse, ErrorResponse, Message};
use crate::reader::NetworkReader;
use shuffle_partition::{PartitionError, ReceiverId, ResultSubpartitionView};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

struct Inner {
    all_readers: HashMap<ReceiverId, Arc<NetworkReader>>,
    available: VecDeque<ReceiverId>,
    registered_as_available: HashSet<ReceiverId>,
}

/// Outcome of attempting to pull and send one reader's next item.
#[derive(Debug, PartialEq, Eq)]
pub enum DrainStep {
    /// A data/event buffer was framed and handed to `emit`, and the
    /// reader has more to give right away.
    BufferAndMore,
    /// A buffer was framed and handed to `emit`; the reader has nothing
    /// further ready this round.
    BufferAndNone,
    /// Nothing was ready; the reader was not re-enqueued.
    NothingReady,
    /// The reader's sub-partition was released (with or without an
    /// error cause); an `ErrorResponse` was emitted and the reader was
    /// deregistered.
    Released,
}

pub struct PartitionRequestQueue {
    inner: Mutex<Inner>,
    fatal_error: AtomicBool,
    /// Signaled whenever a reader newly becomes available, so an async
    /// caller can `await` data instead of busy-polling `drain`.
    wake: Notify,
    /// Applied to `Data`-typed payloads only; events always bypass it,
    /// per the "Buffer Compressor (optional)" collaborator contract.
    compressor: Arc<dyn BufferCompressor>,
}

impl Default for PartitionRequestQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl PartitionRequestQueue {
    pub fn new() -> Self {
        Self::with_compressor(Arc::new(NoopCompressor))
    }

    /// Creates a queue that runs every outgoing data payload through
    /// `compressor` before framing it. Priority/regular events are
    /// never passed to it.
    pub fn with_compressor(compressor: Arc<dyn BufferCompressor>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                all_readers: HashMap::new(),
                available: VecDeque::new(),
                registered_as_available: HashSet::new(),
            }),
            fatal_error: AtomicBool::new(false),
            wake: Notify::new(),
            compressor,
        }
    }

    /// Resolves the next time a reader becomes newly available (or
    /// immediately, spuriously — callers should re-check after waking).
    pub async fn notified(&self) {
        self.wake.notified().await;
    }

    pub fn is_fatally_errored(&self) -> bool {
        self.fatal_error.load(Ordering::Acquire)
    }

    /// Latches a fatal transport error. After this, every queue
    /// operation becomes a no-op: no reader is ever enqueued again.
    pub fn mark_fatal(&self) {
        let was_already_fatal = self.fatal_error.swap(true, Ordering::AcqRel);
        crate::invariants::debug_assert_fatal_latch_monotonic!(was_already_fatal, true);
        tracing::warn!("partition request queue latched a fatal transport error");
        let mut inner = self.inner.lock().unwrap();
        inner.available.clear();
        inner.registered_as_available.clear();
    }

    pub fn register_reader(
        &self,
        receiver_id: ReceiverId,
        view: ResultSubpartitionView,
        initial_credit: i32,
) -> Result<(), NetError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.all_readers.contains_key(&receiver_id) {
            return Err(NetError::ReaderAlreadyRegistered(receiver_id));
        }
        let reader = Arc::new(NetworkReader::new(receiver_id, view, initial_credit));
        inner.all_readers.insert(receiver_id, reader);
        drop(inner);
        tracing::debug!(%receiver_id, initial_credit, "network reader registered");
        self.enqueue_if_available(receiver_id);
        Ok(())
    }

    pub fn add_credit(&self, receiver_id: ReceiverId, delta: i32) -> Result<(), NetError> {
        let reader = self.reader(receiver_id)?;
        reader.add_credit(delta);
        self.enqueue_if_available(receiver_id);
        Ok(())
    }

    pub fn resume_consumption(&self, receiver_id: ReceiverId) -> Result<(), NetError> {
        let reader = self.reader(receiver_id)?;
        reader.view.resume_consumption();
        self.enqueue_if_available(receiver_id);
        Ok(())
    }

    /// Called by the producer-side `AvailabilityListener` when new data
    /// lands on this reader's sub-partition.
    pub fn notify_data_available(&self, receiver_id: ReceiverId) {
        self.enqueue_if_available(receiver_id);
    }

    /// Removes a reader without emitting anything — used for
    /// `CancelRequest`. The caller is responsible for releasing the
    /// underlying sub-partition view with `ConsumerCancelled`.
    pub fn cancel_reader(&self, receiver_id: ReceiverId) -> Result<Arc<NetworkReader>, NetError> {
        let mut inner = self.inner.lock().unwrap();
        let reader = inner
.all_readers
.remove(&receiver_id)
.ok_or(NetError::ReaderNotRegistered(receiver_id))?;
        inner.registered_as_available.remove(&receiver_id);
        inner.available.retain(|id| *id != receiver_id);
        Ok(reader)
    }

    pub fn registered_count(&self) -> usize {
        self.inner.lock().unwrap().all_readers.len()
    }

    fn reader(&self, receiver_id: ReceiverId) -> Result<Arc<NetworkReader>, NetError> {
        self.inner
.lock()
.unwrap()
.all_readers
.get(&receiver_id)
.cloned()
.ok_or(NetError::ReaderNotRegistered(receiver_id))
    }

    /// Enqueues `receiver_id` onto `availableReaders` iff it is
    /// currently deliverable and not already enqueued (invariant: a
    /// reader appears in `availableReaders` at most once).
    fn enqueue_if_available(&self, receiver_id: ReceiverId) {
        if self.is_fatally_errored() {
            return;
        }
        let mut inner = self.inner.lock().unwrap();
        if inner.registered_as_available.contains(&receiver_id) {
            return;
        }
        let Some(reader) = inner.all_readers.get(&receiver_id) else {
            return;
        };
        if reader.is_available() {
            let was_present = !inner.registered_as_available.insert(receiver_id);
            crate::invariants::debug_assert_not_double_enqueued!(was_present);
            inner.available.push_back(receiver_id);
            drop(inner);
            self.wake.notify_one();
        }
    }

    fn pop_available(&self) -> Option<ReceiverId> {
        if self.is_fatally_errored() {
            return None;
        }
        let mut inner = self.inner.lock().unwrap();
        let id = inner.available.pop_front()?;
        inner.registered_as_available.remove(&id);
        Some(id)
    }

    /// Pulls and frames one reader's next item, calling `emit` with the
    /// resulting `Message` if there is one; see [`DrainStep`] for the
    /// four possible outcomes.
    fn process_one(&self, receiver_id: ReceiverId, emit: &mut impl FnMut(Message)) -> DrainStep {
        let Some(reader) = self.inner.lock().unwrap().all_readers.get(&receiver_id).cloned()
        else {
            return DrainStep::NothingReady;
        };

        match reader.get_next_buffer() {
            Ok(Some(item)) => {
                let raw = read_payload(&item.buffer);
                let is_data = matches!(item.next_data_type, shuffle_partition::NextDataType::Data);
                let (payload, is_compressed) = if is_data {
                    let compressed = self.compressor.compress(&raw);
                    let shrank = compressed.len() < raw.len();
                    (if shrank { compressed } else { raw }, shrank)
                } else {
                    (raw, false)
                };
                emit(Message::Buffer(BufferResponse {
                    receiver_id,
                    sequence_number: item.sequence_number as u32,
                    backlog: item.backlog,
                    data_type: next_data_type_byte(item.next_data_type),
                    is_compressed,
                    payload,
                }));
                if reader.is_available() {
                    self.enqueue_if_available(receiver_id);
                    DrainStep::BufferAndMore
                } else {
                    DrainStep::BufferAndNone
                }
            }
            Ok(None) => DrainStep::NothingReady,
            Err(PartitionError::AlreadyReleased { cause }) => {
                emit(Message::Error(ErrorResponse {
                    receiver_id: Some(receiver_id),
                    cause,
                }));
                self.inner.lock().unwrap().all_readers.remove(&receiver_id);
                DrainStep::Released
            }
            Err(other) => {
                emit(Message::Error(ErrorResponse {
                    receiver_id: Some(receiver_id),
                    cause: other.to_string(),
                }));
                self.inner.lock().unwrap().all_readers.remove(&receiver_id);
                DrainStep::Released
            }
        }
    }

    /// Drains available readers, calling `emit` for each framed message,
    /// until either no reader is available or `can_continue` reports the
    /// transport is no longer writable.
    pub fn drain(&self, mut can_continue: impl FnMut() -> bool, mut emit: impl FnMut(Message)) {
        while can_continue() {
            let Some(receiver_id) = self.pop_available() else {
                break;
            };
            self.process_one(receiver_id, &mut emit);
        }
    }
}

fn next_data_type_byte(data_type: shuffle_partition::NextDataType) -> u8 {
    match data_type {
        shuffle_partition::NextDataType::Data => 0,
        shuffle_partition::NextDataType::Event => 1,
        shuffle_partition::NextDataType::PriorityEvent => 2,
    }
}

fn read_payload(buffer: &shuffle_memory::Buffer) -> Vec<u8> {
    let len = buffer.writer_index();
    let mut out = bytes::BytesMut::with_capacity(len);
    buffer
.segment()
.copy_to_buf(0, len, &mut out)
.expect("committed length is always within the segment's own capacity");
    out.to_vec()
}
