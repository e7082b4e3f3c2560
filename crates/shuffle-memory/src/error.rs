use thiserror::Error;

/// Error conditions for [`crate::segment::MemorySegment`] access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SegmentError {
    /// An access fell outside `[0, capacity)`.
    #[error("index out of bounds: offset {offset} + length {length} exceeds capacity {capacity}")]
    OutOfBounds {
        offset: usize,
        length: usize,
        capacity: usize,
    },
    /// The segment was freed and may not be accessed or reused.
    #[error("segment freed")]
    SegmentFreed,
    /// `wrap` was called on a segment kind that does not allow sharing a view.
    #[error("wrap unsupported on this segment kind")]
    WrapUnsupported,
    /// A source/destination byte buffer offered neither direct access nor
    /// an accessible backing array.
    #[error("unsupported buffer kind")]
    UnsupportedBufferKind,
}

// Builder/consumer misuse (a second consumer, writes after finish) is
// structural and is raised via `assert!` in `builder.rs` rather
// than through a recoverable error type.
