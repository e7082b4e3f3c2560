//! Property-based checks for `MemorySegment`'s typed accessors and bulk
//! copy path: whatever bytes go in at a valid offset come back out
//! unchanged, and any offset past the end of the segment is rejected
//! rather than silently truncated.

use proptest::prelude::*;
use shuffle_memory::MemorySegment;

proptest! {
    #[test]
    fn i32_round_trips_through_little_endian_accessors(
        capacity in 4usize..256,
        value in any::<i32>(),
    ) {
        let segment = MemorySegment::allocate_heap(capacity);
        let offset = capacity - 4;
        segment.put_i32_le(offset, value).unwrap();
        prop_assert_eq!(segment.get_i32_le(offset).unwrap(), value);
    }

    #[test]
    fn u64_round_trips_through_big_endian_accessors(
        capacity in 8usize..256,
        value in any::<u64>(),
    ) {
        let segment = MemorySegment::allocate_heap(capacity);
        let offset = capacity - 8;
        segment.put_u64_be(offset, value).unwrap();
        prop_assert_eq!(segment.get_u64_be(offset).unwrap(), value);
    }

    #[test]
    fn bulk_copy_preserves_arbitrary_byte_payloads(
        capacity in 1usize..512,
        payload in prop::collection::vec(any::<u8>(), 0..512),
    ) {
        prop_assume!(payload.len() <= capacity);
        let segment = MemorySegment::allocate_heap(capacity);
        let offset = capacity - payload.len();
        segment.copy_from_slice(offset, &payload).unwrap();

        let mut out = vec![0u8; payload.len()];
        segment.copy_to_slice(offset, &mut out).unwrap();
        prop_assert_eq!(out, payload);
    }

    #[test]
    fn write_past_capacity_is_always_rejected(
        capacity in 1usize..64,
        overrun in 1usize..64,
    ) {
        let segment = MemorySegment::allocate_heap(capacity);
        let result = segment.put_u8(capacity + overrun - 1, 0xAB);
        prop_assert!(result.is_err());
    }
}
