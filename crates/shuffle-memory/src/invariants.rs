//! Debug assertion macros for memory-pool and segment invariants.
//!
//! These macros provide runtime checks for the invariants documented in
//! `pool.rs`, `builder.rs`, and `segment.rs`. They are only active in debug
//! builds (`#[cfg(debug_assertions)]`), so there is zero overhead in release
//! builds.

// =============================================================================
// INV-POOL-01: Bounded Pool Size
// =============================================================================

/// Assert that `required <= requested <= max` holds for a pool.
///
/// **Invariant**: a pool never allocates below its floor or above its ceiling.
///
/// Used in: `BufferPool::new`, `BufferPool::try_lease`
macro_rules! debug_assert_pool_bounds {
    ($required:expr, $requested:expr, $max:expr) => {
        debug_assert!(
            $required <= $requested && $requested <= $max,
            "INV-POOL-01 violated: required {} <= requested {} <= max {} does not hold",
            $required,
            $requested,
            $max
)
    };
}

// =============================================================================
// INV-POOL-02: Monotonic Position Publication
// =============================================================================

/// Assert that a builder's published position only moves toward
/// completion: once negative (finished), it never changes again.
///
/// Used in: `BufferBuilder::commit`, `BufferBuilder::finish`
macro_rules! debug_assert_not_yet_finished {
    ($finished:expr) => {
        debug_assert!(
            !$finished,
            "INV-POOL-02 violated: publishing a position after the builder finished"
)
    };
}

// =============================================================================
// INV-SEG-01: Initialized Range Check
// =============================================================================

/// Assert that an access falls within `[0, capacity)`.
///
/// Used in: `MemorySegment::check_bounds`
macro_rules! debug_assert_in_bounds {
    ($offset:expr, $length:expr, $capacity:expr) => {
        debug_assert!(
            $offset.checked_add($length).map_or(false, |end| end <= $capacity),
            "INV-SEG-01 violated: offset {} + length {} exceeds capacity {}",
            $offset,
            $length,
            $capacity
)
    };
}

pub(crate) use debug_assert_in_bounds;
pub(crate) use debug_assert_not_yet_finished;
pub(crate) use debug_assert_pool_bounds;
