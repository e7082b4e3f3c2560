//! Debug-only invariant checks, zero-cost in release builds.

/// A reader must never appear in `availableReaders` more than once.
macro_rules! debug_assert_not_double_enqueued {
    ($already_present:expr) => {
        debug_assert!(
            !$already_present,
            "a reader was enqueued onto availableReaders while already present"
);
    };
}

/// The fatal-error latch, once set, must never be cleared.
macro_rules! debug_assert_fatal_latch_monotonic {
    ($was_already_fatal:expr, $is_now_fatal:expr) => {
        debug_assert!(
            !$was_already_fatal || $is_now_fatal,
            "fatalError latch was cleared after being set"
);
    };
}

pub(crate) use debug_assert_fatal_latch_monotonic;
pub(crate) use debug_assert_not_double_enqueued;
