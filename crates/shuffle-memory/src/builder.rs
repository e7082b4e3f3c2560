//! Single-writer/single-reader view over one segment, publishing a
//! committed write position through a signed position marker.
//!
//! The writer accumulates into a cached, unsynchronized position and
//! performs exactly one `Release` store per `commit`/`finish` — "publish
//! a caller-chosen prefix, optionally negated to signal completion."

use crate::buffer::Buffer;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

/// Sentinel published by `finish()` when zero bytes were ever committed.
/// `i64::MIN` cannot be represented as a positive count, which is exactly
/// why it is reserved for this case instead of overloading `0`.
const FINISHED_EMPTY: i64 = i64::MIN;

#[inline]
fn is_finished(raw: i64) -> bool {
    raw < 0
}

#[inline]
fn absolute(raw: i64) -> usize {
    if raw == FINISHED_EMPTY {
        0
    } else {
        raw.unsigned_abs() as usize
    }
}

/// Shared, atomically-published write position. `BufferBuilder` writes it
/// (via `commit`/`finish`); `BufferConsumer` only ever reads it.
#[derive(Debug)]
pub(crate) struct PositionMarker(AtomicI64);

impl PositionMarker {
    fn new() -> Self {
        Self(AtomicI64::new(0))
    }
}

/// The writer side of a builder/consumer pair. Appends into the
/// underlying segment at a cached, unsynchronized position; only
/// `commit`/`finish` perform the single volatile publish that makes
/// progress visible to the consumer.
pub struct BufferBuilder {
    buffer: Buffer,
    position: Arc<PositionMarker>,
    cached: usize,
    finished: bool,
    consumer_created: AtomicBool,
}

impl BufferBuilder {
    /// Creates a builder over a freshly leased buffer.
    pub fn new(buffer: Buffer) -> Self {
        Self {
            buffer,
            position: Arc::new(PositionMarker::new()),
            cached: 0,
            finished: false,
            consumer_created: AtomicBool::new(false),
        }
    }

    /// Bytes still available to write before the segment is full.
    pub fn writable_bytes(&self) -> usize {
        self.buffer.segment().capacity() - self.cached
    }

    /// Appends as much of `source` as fits, returning the number of bytes
    /// actually copied (`min(source.len(), capacity - cached)`).
    ///
    /// # Panics
    ///
    /// Panics if called after `finish()` — writing to a finished builder
    /// is structural misuse , not a recoverable condition.
    pub fn append(&mut self, source: &[u8]) -> usize {
        assert!(!self.finished, "append after finish is structural misuse");
        let n = source.len().min(self.writable_bytes());
        if n > 0 {
            self.buffer
.segment()
.copy_from_slice(self.cached, &source[..n])
.expect("bounds already checked via writable_bytes");
            self.cached += n;
        }
        n
    }

    /// Publishes the cached position. This is the only `Release` store
    /// on the common append path — the design deliberately avoids a
    /// per-append memory fence.
    pub fn commit(&self) {
        assert!(!self.finished, "commit after finish is structural misuse");
        crate::invariants::debug_assert_not_yet_finished!(self.finished);
        self.position.0.store(self.cached as i64, Ordering::Release);
    }

    /// Marks the builder finished, publishing the final committed length
    /// with its sign negated (or the "finished empty" sentinel if the
    /// builder was never written to). Returns the number of bytes that
    /// were committed before finishing.
    pub fn finish(&mut self) -> usize {
        assert!(!self.finished, "finish called twice is structural misuse");
        self.finished = true;
        let committed = self.cached;
        let published = if committed == 0 {
            FINISHED_EMPTY
        } else {
            -(committed as i64)
        };
        self.position.0.store(published, Ordering::Release);
        self.buffer.set_writer_index(committed);
        committed
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Creates the single consumer view over this builder's position.
    ///
    /// # Panics
    ///
    /// Panics if a consumer has already been created — states
    /// this rule as an invariant ("at most one Buffer Consumer per
    /// Builder"), and classes the violation as structural misuse.
    pub fn create_consumer(&self) -> BufferConsumer {
        assert!(
            !self.consumer_created.swap(true, Ordering::AcqRel),
            "a second consumer was requested for this builder"
);
        BufferConsumer {
            buffer: self.buffer.clone(),
            position: Arc::clone(&self.position),
        }
    }
}

/// The reader side of a builder/consumer pair. Snapshots the shared
/// position with a single `Acquire` load per poll.
pub struct BufferConsumer {
    buffer: Buffer,
    position: Arc<PositionMarker>,
}

impl BufferConsumer {
    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    /// Returns `(committed_length, writer_finished)`.
    pub fn snapshot(&self) -> (usize, bool) {
        let raw = self.position.0.load(Ordering::Acquire);
        (absolute(raw), is_finished(raw))
    }

    /// Convenience: bytes committed so far, regardless of finished state.
    pub fn committed_len(&self) -> usize {
        self.snapshot().0
    }

    pub fn is_finished(&self) -> bool {
        self.snapshot().1
    }
}
