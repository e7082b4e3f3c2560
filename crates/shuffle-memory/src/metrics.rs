use std::sync::atomic::{AtomicU64, Ordering};

/// Optional counters for monitoring buffer pool behavior.
///
/// All fields use `Relaxed` ordering: these are purely statistical
/// counters with no control-flow dependency on their freshness.
#[derive(Debug, Default)]
pub struct PoolMetrics {
    segments_leased: AtomicU64,
    segments_returned: AtomicU64,
    lease_waits: AtomicU64,
    listener_hands: AtomicU64,
}

impl PoolMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_lease(&self) {
        self.segments_leased.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_return(&self) {
        self.segments_returned.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_wait(&self) {
        self.lease_waits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_listener_hand(&self) {
        self.listener_hands.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PoolMetricsSnapshot {
        PoolMetricsSnapshot {
            segments_leased: self.segments_leased.load(Ordering::Relaxed),
            segments_returned: self.segments_returned.load(Ordering::Relaxed),
            lease_waits: self.lease_waits.load(Ordering::Relaxed),
            listener_hands: self.listener_hands.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of [`PoolMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolMetricsSnapshot {
    pub segments_leased: u64,
    pub segments_returned: u64,
    pub lease_waits: u64,
    pub listener_hands: u64,
}
