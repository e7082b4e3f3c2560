//! Reference-counted handle over a slice of a [`MemorySegment`].

use crate::segment::MemorySegment;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Tag distinguishing ordinary records from control events on the wire.
/// Priority events may overtake an unfinished data buffer at the tail of
/// a sub-partition and are always deliverable regardless of
/// reader credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Data,
    Event,
    PriorityEvent,
}

impl DataType {
    #[inline]
    pub fn is_event(self) -> bool {
        matches!(self, Self::Event | Self::PriorityEvent)
    }

    #[inline]
    pub fn is_priority(self) -> bool {
        matches!(self, Self::PriorityEvent)
    }
}

/// Invoked when a buffer's refcount drops to zero, handing the segment
/// back to wherever it came from (typically a [`crate::pool::BufferPool`]).
pub type RecycleFn = Box<dyn FnOnce(Arc<MemorySegment>) + Send>;

struct BufferInner {
    segment: Arc<MemorySegment>,
    data_type: DataType,
    reader_index: AtomicUsize,
    writer_index: AtomicUsize,
    recycle: Mutex<Option<RecycleFn>>,
}

impl Drop for BufferInner {
    fn drop(&mut self) {
        if let Some(recycle) = self.recycle.lock().unwrap().take() {
            recycle(Arc::clone(&self.segment));
        }
    }
}

/// A reference-counted, `Clone`-able view over a byte range of a
/// [`MemorySegment`]. Cloning increments the refcount; the segment is
/// returned to its pool only once the last clone is dropped.
#[derive(Clone)]
pub struct Buffer {
    inner: Arc<BufferInner>,
}

impl Buffer {
    /// Wraps a leased segment as a buffer. `recycle` is called exactly
    /// once, when the last `Buffer` handle referencing this segment drops.
    pub fn new(segment: Arc<MemorySegment>, data_type: DataType, recycle: RecycleFn) -> Self {
        let writer_index = segment.capacity();
        Self {
            inner: Arc::new(BufferInner {
                segment,
                data_type,
                reader_index: AtomicUsize::new(0),
                writer_index: AtomicUsize::new(writer_index),
                recycle: Mutex::new(Some(recycle)),
            }),
        }
    }

    pub fn data_type(&self) -> DataType {
        self.inner.data_type
    }

    pub fn segment(&self) -> &MemorySegment {
        &self.inner.segment
    }

    pub fn reader_index(&self) -> usize {
        self.inner.reader_index.load(Ordering::Acquire)
    }

    pub fn set_reader_index(&self, index: usize) {
        self.inner.reader_index.store(index, Ordering::Release);
    }

    pub fn writer_index(&self) -> usize {
        self.inner.writer_index.load(Ordering::Acquire)
    }

    /// Shrinks the writer index to `size`, used once a builder publishes
    /// its committed length onto the buffer it hands off to a consumer.
    pub fn set_writer_index(&self, size: usize) {
        self.inner.writer_index.store(size, Ordering::Release);
    }

    /// Readable length: bytes between the reader and writer index.
    pub fn readable_bytes(&self) -> usize {
        self.writer_index().saturating_sub(self.reader_index())
    }

    /// Number of outstanding handles to this buffer (diagnostic only).
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recycle_runs_once_refcount_reaches_zero() {
        use std::sync::atomic::AtomicBool;

        let segment = Arc::new(MemorySegment::allocate_heap(16));
        let recycled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&recycled);

        let buffer = Buffer::new(
            Arc::clone(&segment),
            DataType::Data,
            Box::new(move |_seg| flag.store(true, Ordering::SeqCst)),
);
        let clone = buffer.clone();
        assert_eq!(buffer.ref_count(), 2);

        drop(buffer);
        assert!(!recycled.load(Ordering::SeqCst), "still one live handle");

        drop(clone);
        assert!(recycled.load(Ordering::SeqCst));
    }

    #[test]
    fn priority_event_is_always_deliverable_by_type() {
        assert!(DataType::PriorityEvent.is_priority());
        assert!(DataType::Event.is_event());
        assert!(!DataType::Data.is_event());
    }
}
