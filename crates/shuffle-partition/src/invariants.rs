//! Debug assertion macros for sub-partition and partition invariants.
//! Active only in debug builds; zero overhead in release.

// =============================================================================
// INV-SUB-01: Monotonic, Contiguous Sequence Numbers
// =============================================================================

/// Assert that a reader's observed sequence numbers are strictly
/// monotone and contiguous from its first observation until release.
///
/// Used in: `ResultSubpartition::next`
macro_rules! debug_assert_contiguous_sequence {
    ($previous:expr, $next:expr) => {
        debug_assert!(
            $next == $previous + 1,
            "INV-SUB-01 violated: sequence jumped from {} to {}",
            $previous,
            $next
)
    };
}

// =============================================================================
// INV-SUB-02: At Most One Registered Availability Listener
// =============================================================================

/// Assert that registering a listener does not silently orphan a
/// previously-registered one — a sub-partition has exactly one
/// downstream consumer.
///
/// Used in: `ResultSubpartition::register_listener`
macro_rules! debug_assert_no_orphaned_listener {
    ($previous_is_none:expr) => {
        debug_assert!(
            $previous_is_none,
            "INV-SUB-02 violated: a second view registered over the same sub-partition"
)
    };
}

pub(crate) use debug_assert_contiguous_sequence;
pub(crate) use debug_assert_no_orphaned_listener;
