//! Fixed-capacity byte regions, on- or off-heap, with bulk and typed access.

use crate::error::SegmentError;
use bytes::{Buf, BufMut, Bytes};
use std::alloc::{alloc, dealloc, Layout};
use std::io::{self, Read, Write};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, Ordering};

/// Callback invoked exactly once when an off-heap or unsafe segment is freed.
pub type ReleaseFn = Box<dyn FnOnce() + Send + 'static>;

/// Back-pointer kept alive for the lifetime of a segment, used only for
/// diagnostics (it is never dereferenced by the segment itself).
pub type Owner = std::sync::Arc<dyn std::any::Any + Send + Sync>;

enum Storage {
    /// Backed by a plain heap byte array.
    Heap(Box<[u8]>),
    /// Off-heap region with a known base address; wrapping into a
    /// read-only view is permitted because ownership is still tracked by
    /// this struct alone (no raw pointer escapes without a refcount).
    OffHeap { base: NonNull<u8>, layout: Layout },
    /// Off-heap region managed entirely by the caller. Wrapping is
    /// refused: the segment cannot prove the memory will outlive a view
    /// handed to another owner.
    Unsafe { base: NonNull<u8>, layout: Layout },
}

// SAFETY: the raw pointers in `OffHeap`/`Unsafe` are never aliased outside
// this struct; all access goes through the bounds-checked methods below,
// which is what makes `MemorySegment` safe to hand across threads.
unsafe impl Send for Storage {}
unsafe impl Sync for Storage {}

/// A fixed-capacity byte region. See module docs for the variant semantics.
pub struct MemorySegment {
    storage: Storage,
    capacity: usize,
    freed: AtomicBool,
    release: Option<ReleaseFn>,
    _owner: Option<Owner>,
}

impl MemorySegment {
    /// Allocates a heap-backed segment of `capacity` bytes, zero-filled.
    pub fn allocate_heap(capacity: usize) -> Self {
        Self {
            storage: Storage::Heap(vec![0u8; capacity].into_boxed_slice()),
            capacity,
            freed: AtomicBool::new(false),
            release: None,
            _owner: None,
        }
    }

    /// Allocates an off-heap segment that may later be `wrap`ped into a
    /// read-only view. `release` runs exactly once when the segment is freed.
    pub fn allocate_off_heap(capacity: usize, release: Option<ReleaseFn>) -> Self {
        let (base, layout) = Self::alloc_raw(capacity);
        Self {
            storage: Storage::OffHeap { base, layout },
            capacity,
            freed: AtomicBool::new(false),
            release,
            _owner: None,
        }
    }

    /// Allocates an off-heap segment whose memory is managed manually by
    /// the caller through `release`. Refuses `wrap`.
    pub fn allocate_unsafe(capacity: usize, release: Option<ReleaseFn>) -> Self {
        let (base, layout) = Self::alloc_raw(capacity);
        Self {
            storage: Storage::Unsafe { base, layout },
            capacity,
            freed: AtomicBool::new(false),
            release,
            _owner: None,
        }
    }

    /// Attaches a diagnostic owner back-pointer, keeping it alive for as
    /// long as the segment is live.
    #[must_use]
    pub fn with_owner(mut self, owner: Owner) -> Self {
        self._owner = Some(owner);
        self
    }

    fn alloc_raw(capacity: usize) -> (NonNull<u8>, Layout) {
        let layout = Layout::array::<u8>(capacity.max(1)).expect("layout overflow");
        // SAFETY: layout is non-zero-sized (capacity.max(1)).
        let ptr = unsafe { alloc(layout) };
        let base = NonNull::new(ptr).expect("allocation failed");
        // SAFETY: base is freshly allocated and `capacity` bytes long.
        unsafe { std::ptr::write_bytes(base.as_ptr(), 0, capacity) };
        (base, layout)
    }

    #[inline]
    fn as_slice(&self) -> &[u8] {
        match &self.storage {
            Storage::Heap(b) => b,
            // SAFETY: base/layout describe `capacity` live bytes owned by
            // this segment for as long as `freed` is false; callers check
            // `freed` before reaching here.
            Storage::OffHeap { base,.. } | Storage::Unsafe { base,.. } => unsafe {
                std::slice::from_raw_parts(base.as_ptr(), self.capacity)
            },
        }
    }

    #[inline]
    #[allow(clippy::mut_from_ref)]
    fn as_slice_mut(&self) -> &mut [u8] {
        match &self.storage {
            // SAFETY: single-writer discipline is enforced by callers
            // (Buffer Builder holds the only writable handle); this mirrors
            // the `UnsafeCell`-free-for-atomics-only protocol used by the
            // single-writer/single-reader ring buffer this module is
            // modeled on.
            Storage::Heap(b) => unsafe {
                std::slice::from_raw_parts_mut(b.as_ptr().cast_mut(), b.len())
            },
            Storage::OffHeap { base,.. } | Storage::Unsafe { base,.. } => unsafe {
                std::slice::from_raw_parts_mut(base.as_ptr(), self.capacity)
            },
        }
    }

    #[inline]
    fn check_freed(&self) -> Result<(), SegmentError> {
        if self.freed.load(Ordering::Acquire) {
            Err(SegmentError::SegmentFreed)
        } else {
            Ok(())
        }
    }

    #[inline]
    fn check_bounds(&self, offset: usize, length: usize) -> Result<(), SegmentError> {
        // Unsigned-subtraction form catches both negative-equivalent and
        // near-overflow cases in one predicate.
        if offset > self.capacity || length > self.capacity - offset {
            Err(SegmentError::OutOfBounds {
                offset,
                length,
                capacity: self.capacity,
            })
        } else {
            crate::invariants::debug_assert_in_bounds!(offset, length, self.capacity);
            Ok(())
        }
    }

    /// Capacity in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether this segment allows `wrap` (off-heap and heap segments do;
    /// unsafe-managed segments never do,).
    #[inline]
    pub fn allows_wrap(&self) -> bool {
        !matches!(self.storage, Storage::Unsafe {.. })
    }

    /// Frees the segment. Idempotent only in the sense that a second call
    /// observes `SegmentFreed`; the release callback runs at most once.
    pub fn free(&self) -> Result<(), SegmentError> {
        if self.freed.swap(true, Ordering::AcqRel) {
            return Err(SegmentError::SegmentFreed);
        }
        tracing::trace!(capacity = self.capacity, "memory segment freed");
        Ok(())
    }

    #[inline]
    pub fn is_freed(&self) -> bool {
        self.freed.load(Ordering::Acquire)
    }

    // -- typed access -------------------------------------------------

    pub fn get_u8(&self, offset: usize) -> Result<u8, SegmentError> {
        self.check_freed()?;
        self.check_bounds(offset, 1)?;
        Ok(self.as_slice()[offset])
    }

    pub fn put_u8(&self, offset: usize, value: u8) -> Result<(), SegmentError> {
        self.check_freed()?;
        self.check_bounds(offset, 1)?;
        self.as_slice_mut()[offset] = value;
        Ok(())
    }

    pub fn get_bool(&self, offset: usize) -> Result<bool, SegmentError> {
        Ok(self.get_u8(offset)? != 0)
    }

    pub fn put_bool(&self, offset: usize, value: bool) -> Result<(), SegmentError> {
        self.put_u8(offset, u8::from(value))
    }
}

macro_rules! typed_accessors {
    ($ty:ty, $get_le:ident, $put_le:ident, $get_be:ident, $put_be:ident) => {
        impl MemorySegment {
            pub fn $get_le(&self, offset: usize) -> Result<$ty, SegmentError> {
                self.check_freed()?;
                let len = std::mem::size_of::<$ty>();
                self.check_bounds(offset, len)?;
                let bytes = &self.as_slice()[offset..offset + len];
                Ok(<$ty>::from_le_bytes(bytes.try_into().unwrap()))
            }

            pub fn $put_le(&self, offset: usize, value: $ty) -> Result<(), SegmentError> {
                self.check_freed()?;
                let len = std::mem::size_of::<$ty>();
                self.check_bounds(offset, len)?;
                let bytes = value.to_le_bytes();
                self.as_slice_mut()[offset..offset + len].copy_from_slice(&bytes);
                Ok(())
            }

            pub fn $get_be(&self, offset: usize) -> Result<$ty, SegmentError> {
                self.check_freed()?;
                let len = std::mem::size_of::<$ty>();
                self.check_bounds(offset, len)?;
                let bytes = &self.as_slice()[offset..offset + len];
                Ok(<$ty>::from_be_bytes(bytes.try_into().unwrap()))
            }

            pub fn $put_be(&self, offset: usize, value: $ty) -> Result<(), SegmentError> {
                self.check_freed()?;
                let len = std::mem::size_of::<$ty>();
                self.check_bounds(offset, len)?;
                let bytes = value.to_be_bytes();
                self.as_slice_mut()[offset..offset + len].copy_from_slice(&bytes);
                Ok(())
            }
        }
    };
}

typed_accessors!(i16, get_i16_le, put_i16_le, get_i16_be, put_i16_be);
typed_accessors!(u16, get_u16_le, put_u16_le, get_u16_be, put_u16_be);
typed_accessors!(i32, get_i32_le, put_i32_le, get_i32_be, put_i32_be);
typed_accessors!(u32, get_u32_le, put_u32_le, get_u32_be, put_u32_be);
typed_accessors!(i64, get_i64_le, put_i64_le, get_i64_be, put_i64_be);
typed_accessors!(u64, get_u64_le, put_u64_le, get_u64_be, put_u64_be);
typed_accessors!(f32, get_f32_le, put_f32_le, get_f32_be, put_f32_be);
typed_accessors!(f64, get_f64_le, put_f64_le, get_f64_be, put_f64_be);

impl MemorySegment {
    // -- bulk access ----------------------------------------------------

    /// Copies `dst.len()` bytes starting at `offset` into `dst`.
    pub fn copy_to_slice(&self, offset: usize, dst: &mut [u8]) -> Result<(), SegmentError> {
        self.check_freed()?;
        self.check_bounds(offset, dst.len())?;
        dst.copy_from_slice(&self.as_slice()[offset..offset + dst.len()]);
        Ok(())
    }

    /// Copies `src` into the segment starting at `offset`.
    pub fn copy_from_slice(&self, offset: usize, src: &[u8]) -> Result<(), SegmentError> {
        self.check_freed()?;
        self.check_bounds(offset, src.len())?;
        self.as_slice_mut()[offset..offset + src.len()].copy_from_slice(src);
        Ok(())
    }

    /// Copies `length` bytes from `offset` into an external byte buffer,
    /// accepting any type that implements [`bytes::BufMut`].
    pub fn copy_to_buf(
        &self,
        offset: usize,
        length: usize,
        dst: &mut impl BufMut,
) -> Result<(), SegmentError> {
        self.check_freed()?;
        self.check_bounds(offset, length)?;
        dst.put_slice(&self.as_slice()[offset..offset + length]);
        Ok(())
    }

    /// Copies bytes from an external buffer into the segment at `offset`.
    /// The source must expose its remaining bytes as a contiguous chunk
    /// (direct buffers) or be fully drainable via `copy_to_slice`
    /// (array-backed buffers); a buffer that is neither direct nor
    /// array-backed is rejected with `UnsupportedBufferKind`.
    pub fn copy_from_buf(&self, offset: usize, src: &mut impl Buf) -> Result<usize, SegmentError> {
        self.check_freed()?;
        let remaining = src.remaining();
        self.check_bounds(offset, remaining)?;
        if remaining == 0 {
            return Ok(0);
        }
        let chunk = src.chunk();
        if chunk.len() >= remaining {
            self.copy_from_slice(offset, &chunk[..remaining])?;
            src.advance(remaining);
            return Ok(remaining);
        }
        // Fall back to a scratch buffer for non-contiguous sources.
        let mut scratch = vec![0u8; remaining];
        src.copy_to_slice(&mut scratch);
        self.copy_from_slice(offset, &scratch)?;
        Ok(remaining)
    }

    /// Bulk-reads `length` bytes from `reader` into the segment at `offset`.
    pub fn read_from(
        &self,
        offset: usize,
        length: usize,
        reader: &mut impl Read,
) -> Result<(), SegmentError> {
        self.check_freed()?;
        self.check_bounds(offset, length)?;
        let dst = &mut self.as_slice_mut()[offset..offset + length];
        reader
.read_exact(dst)
.map_err(|_| SegmentError::UnsupportedBufferKind)
    }

    /// Bulk-writes `length` bytes from `offset` into `writer`.
    pub fn write_to(
        &self,
        offset: usize,
        length: usize,
        writer: &mut impl Write,
) -> Result<(), SegmentError> {
        self.check_freed()?;
        self.check_bounds(offset, length)?;
        writer
.write_all(&self.as_slice()[offset..offset + length])
.map_err(|_| SegmentError::UnsupportedBufferKind)
    }

    /// Produces a read-only snapshot view of `[offset, offset+length)`.
    /// Refused on unsafe-managed segments : their ownership
    /// cannot be safely shared beyond this struct.
    pub fn wrap(&self, offset: usize, length: usize) -> Result<Bytes, SegmentError> {
        self.check_freed()?;
        if !self.allows_wrap() {
            return Err(SegmentError::WrapUnsupported);
        }
        self.check_bounds(offset, length)?;
        Ok(Bytes::copy_from_slice(
            &self.as_slice()[offset..offset + length],
))
    }
}

impl Drop for MemorySegment {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
        match &self.storage {
            Storage::Heap(_) => {}
            Storage::OffHeap { base, layout } | Storage::Unsafe { base, layout } => {
                // SAFETY: `base`/`layout` were produced by `alloc_raw` and
                // are freed exactly once here.
                unsafe { dealloc(base.as_ptr(), *layout) };
            }
        }
    }
}

/// Helper implementing [`io::Write`] over a segment region, used by
/// callers that want to stream bytes in via the `std::io` traits.
pub struct SegmentWriter<'a> {
    segment: &'a MemorySegment,
    offset: usize,
    limit: usize,
}

impl<'a> SegmentWriter<'a> {
    pub fn new(segment: &'a MemorySegment, offset: usize, limit: usize) -> Self {
        Self {
            segment,
            offset,
            limit,
        }
    }
}

impl Write for SegmentWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let remaining = self.limit.saturating_sub(self.offset);
        let n = buf.len().min(remaining);
        self.segment
.copy_from_slice(self.offset, &buf[..n])
.map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        self.offset += n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heap_segment_roundtrips_le_and_be() {
        let seg = MemorySegment::allocate_heap(64);
        seg.put_i32_le(0, -123).unwrap();
        assert_eq!(seg.get_i32_le(0).unwrap(), -123);

        seg.put_u64_be(8, 0xdead_beef_cafe_babe).unwrap();
        assert_eq!(seg.get_u64_be(8).unwrap(), 0xdead_beef_cafe_babe);
    }

    #[test]
    fn out_of_bounds_is_rejected() {
        let seg = MemorySegment::allocate_heap(4);
        assert_eq!(
            seg.get_u8(4).unwrap_err(),
            SegmentError::OutOfBounds {
                offset: 4,
                length: 1,
                capacity: 4
            }
);
        assert!(seg.put_i32_le(2, 1).is_err());
    }

    #[test]
    fn access_after_free_fails() {
        let seg = MemorySegment::allocate_heap(8);
        seg.free().unwrap();
        assert_eq!(seg.get_u8(0).unwrap_err(), SegmentError::SegmentFreed);
        assert_eq!(seg.free().unwrap_err(), SegmentError::SegmentFreed);
    }

    #[test]
    fn off_heap_segment_wraps() {
        let seg = MemorySegment::allocate_off_heap(16, None);
        seg.copy_from_slice(0, b"hello world12345").unwrap();
        let view = seg.wrap(0, 5).unwrap();
        assert_eq!(&view[..], b"hello");
    }

    #[test]
    fn unsafe_segment_refuses_wrap() {
        let seg = MemorySegment::allocate_unsafe(16, None);
        assert_eq!(seg.wrap(0, 4).unwrap_err(), SegmentError::WrapUnsupported);
    }

    #[test]
    fn release_callback_runs_exactly_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let seg = MemorySegment::allocate_off_heap(8, Some(Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        })));
        drop(seg);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn bulk_copy_roundtrips() {
        let seg = MemorySegment::allocate_heap(32);
        seg.copy_from_slice(4, b"abcd").unwrap();
        let mut out = [0u8; 4];
        seg.copy_to_slice(4, &mut out).unwrap();
        assert_eq!(&out, b"abcd");
    }

    #[test]
    fn copy_from_buf_handles_bytes_source() {
        let seg = MemorySegment::allocate_heap(32);
        let mut src = Bytes::from_static(b"zero-copy-ish");
        let n = seg.copy_from_buf(0, &mut src).unwrap();
        assert_eq!(n, 13);
        let mut out = vec![0u8; 13];
        seg.copy_to_slice(0, &mut out).unwrap();
        assert_eq!(&out, b"zero-copy-ish");
    }
}
