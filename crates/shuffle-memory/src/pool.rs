//! Lease/return of [`MemorySegment`]s with bounded, per-owner quotas.
//!
//! A non-blocking fast path and an adaptive-backoff slow path: a
//! `BufferPool` offers the same two tiers for "lease whole segments
//! from a shared arena."

use crate::backoff::Backoff;
use crate::config::PoolConfig;
use crate::metrics::PoolMetrics;
use crate::segment::MemorySegment;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

/// Subscriber notified when a segment becomes available or the pool is
/// torn down. The return value of `on_available` decides whether the
/// listener stays subscribed for the next segment.
pub trait BufferListener: Send {
    /// Returns `true` to remain subscribed for the next available segment.
    fn on_available(&mut self, segment: Arc<MemorySegment>) -> bool;

    /// Called once when the pool is destroyed while this listener is
    /// still subscribed.
    fn on_destroyed(&mut self) {}
}

struct State {
    requested: usize,
    free: VecDeque<Arc<MemorySegment>>,
    pending: VecDeque<oneshot::Sender<Arc<MemorySegment>>>,
    listeners: VecDeque<Box<dyn BufferListener>>,
    destroyed: bool,
}

/// A pool of fixed-size segments leased out under `required <= requested
/// <= max`. The pool always keeps at least one
/// segment obtainable so a pipelined DAG cannot deadlock waiting on its
/// own output.
pub struct BufferPool {
    state: Mutex<State>,
    config: PoolConfig,
    metrics: PoolMetrics,
}

impl BufferPool {
    /// Creates a pool, eagerly allocating `config.required` segments so
    /// the progress invariant holds from the first lease onward.
    pub fn new(config: PoolConfig) -> Arc<Self> {
        let mut free = VecDeque::with_capacity(config.required);
        for _ in 0..config.required {
            free.push_back(Arc::new(MemorySegment::allocate_heap(config.segment_size)));
        }
        Arc::new(Self {
            state: Mutex::new(State {
                requested: config.required,
                free,
                pending: VecDeque::new(),
                listeners: VecDeque::new(),
                destroyed: false,
            }),
            config,
            metrics: PoolMetrics::new(),
        })
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn metrics(&self) -> &PoolMetrics {
        &self.metrics
    }

    /// Currently allocated segment count (free + leased).
    pub fn requested(&self) -> usize {
        self.state.lock().unwrap().requested
    }

    fn recycle_fn(self: &Arc<Self>) -> Box<dyn FnOnce(Arc<MemorySegment>) + Send> {
        let pool = Arc::clone(self);
        Box::new(move |segment| pool.recycle(segment))
    }

    fn recycle(self: &Arc<Self>, segment: Arc<MemorySegment>) {
        let mut state = self.state.lock().unwrap();
        if state.destroyed {
            // Pool is gone; let the segment itself drop (its own Drop
            // impl runs any release callback for off-heap/unsafe memory).
            state.requested = state.requested.saturating_sub(1);
            return;
        }

        // FIFO pending requesters first.
        while let Some(sender) = state.pending.pop_front() {
            match sender.send(Arc::clone(&segment)) {
                Ok(()) => {
                    self.metrics.record_lease();
                    return;
                }
                Err(_) => continue, // requester dropped its future; try the next
            }
        }

        // Then registered listeners, in registration order.
        while let Some(mut listener) = state.listeners.pop_front() {
            let keep = listener.on_available(Arc::clone(&segment));
            self.metrics.record_listener_hand();
            if keep {
                state.listeners.push_front(listener);
            }
            return;
        }

        // Otherwise, store it for a future lease.
        state.free.push_back(segment);
        self.metrics.record_return();
    }

    /// Leases a segment without blocking. Returns `None` if the pool is
    /// at capacity and no segment is immediately free.
    pub fn try_lease(self: &Arc<Self>) -> Option<Arc<MemorySegment>> {
        let mut state = self.state.lock().unwrap();
        if state.destroyed {
            return None;
        }
        if let Some(segment) = state.free.pop_front() {
            self.metrics.record_lease();
            return Some(segment);
        }
        if state.requested < self.config.max {
            state.requested += 1;
            crate::invariants::debug_assert_pool_bounds!(
                self.config.required,
                state.requested,
                self.config.max
);
            tracing::trace!(
                requested = state.requested,
                max = self.config.max,
                "buffer pool grew past its required floor"
);
            self.metrics.record_lease();
            return Some(Arc::new(MemorySegment::allocate_heap(
                self.config.segment_size,
)));
        }
        None
    }

    /// Leases a segment, spin/yield-backing off while waiting for one to
    /// be recycled. Gives up after the backoff strategy is exhausted.
    pub fn lease_blocking(self: &Arc<Self>) -> Option<Arc<MemorySegment>> {
        let mut backoff = Backoff::new();
        loop {
            if let Some(segment) = self.try_lease() {
                return Some(segment);
            }
            if backoff.is_completed() {
                self.metrics.record_wait();
                return None;
            }
            backoff.snooze();
        }
    }

    /// Leases a segment, registering a one-shot future if none is
    /// immediately available. Resolves when a segment is recycled back
    /// to the pool, honoring FIFO order among waiting requesters.
    pub async fn lease(self: &Arc<Self>) -> Option<Arc<MemorySegment>> {
        if let Some(segment) = self.try_lease() {
            return Some(segment);
        }
        let (tx, rx) = oneshot::channel();
        {
            let mut state = self.state.lock().unwrap();
            if state.destroyed {
                return None;
            }
            state.pending.push_back(tx);
        }
        self.metrics.record_wait();
        rx.await.ok()
    }

    /// Wraps a leased segment as a `Buffer` whose drop returns the
    /// segment back to this pool.
    pub fn wrap_buffer(
        self: &Arc<Self>,
        segment: Arc<MemorySegment>,
        data_type: crate::buffer::DataType,
) -> crate::buffer::Buffer {
        crate::buffer::Buffer::new(segment, data_type, self.recycle_fn())
    }

    /// Registers a listener to be notified the next time (or every time,
    /// depending on its return value) a segment becomes available.
    pub fn register_listener(&self, listener: Box<dyn BufferListener>) {
        let mut state = self.state.lock().unwrap();
        if state.destroyed {
            return;
        }
        state.listeners.push_back(listener);
    }

    /// Tears down the pool: pending listeners are notified of
    /// destruction; segments currently leased are reclaimed only once
    /// their refcount falls to zero (the pool simply stops re-issuing
    /// them once they come back).
    pub fn destroy(&self) {
        let mut state = self.state.lock().unwrap();
        tracing::debug!(requested = state.requested, "buffer pool destroyed");
        state.destroyed = true;
        state.free.clear();
        state.pending.clear();
        for mut listener in state.listeners.drain(..) {
            listener.on_destroyed();
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.state.lock().unwrap().destroyed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::DataType;

    #[test]
    fn invariant_required_le_requested_le_max() {
        let pool = BufferPool::new(PoolConfig::new(128, 2, 4));
        assert!(pool.config().required <= pool.requested());
        assert!(pool.requested() <= pool.config().max);

        let a = pool.try_lease().unwrap();
        let b = pool.try_lease().unwrap();
        let c = pool.try_lease().unwrap();
        let d = pool.try_lease().unwrap();
        assert!(pool.try_lease().is_none(), "pool should be at max");
        assert!(pool.config().required <= pool.requested());
        assert!(pool.requested() <= pool.config().max);
        drop((a, b, c, d));
    }

    #[test]
    fn two_leases_at_max_capacity_recycle_without_deadlock() {
        // Two sub-partitions each demand one buffer from a pool sized
        // required=2, max=2: both finish and recycle without deadlock.
        let pool = BufferPool::new(PoolConfig::new(64, 2, 2));
        let seg_a = pool.try_lease().expect("first lease");
        let seg_b = pool.try_lease().expect("second lease");
        assert!(pool.try_lease().is_none());

        let buf_a = pool.wrap_buffer(seg_a, DataType::Data);
        let buf_b = pool.wrap_buffer(seg_b, DataType::Data);
        drop(buf_a);
        assert!(pool.try_lease().is_some(), "recycled segment must be re-leasable");
        drop(buf_b);
    }

    #[tokio::test]
    async fn lease_future_resolves_on_recycle() {
        let pool = BufferPool::new(PoolConfig::new(64, 1, 1));
        let seg = pool.try_lease().expect("only segment");
        let buf = pool.wrap_buffer(seg, DataType::Data);

        let pool2 = Arc::clone(&pool);
        let waiter = tokio::spawn(async move { pool2.lease().await });

        // give the spawned task a chance to register as a pending waiter
        tokio::task::yield_now().await;
        drop(buf);

        let leased = waiter.await.unwrap();
        assert!(leased.is_some());
    }

    #[test]
    fn destroy_notifies_listeners() {
        struct Flag(Arc<std::sync::atomic::AtomicBool>);
        impl BufferListener for Flag {
            fn on_available(&mut self, _segment: Arc<MemorySegment>) -> bool {
                false
            }
            fn on_destroyed(&mut self) {
                self.0.store(true, std::sync::atomic::Ordering::SeqCst);
            }
        }

        let pool = BufferPool::new(PoolConfig::new(32, 1, 1));
        let notified = Arc::new(std::sync::atomic::AtomicBool::new(false));
        pool.register_listener(Box::new(Flag(Arc::clone(&notified))));
        pool.destroy();
        assert!(notified.load(std::sync::atomic::Ordering::SeqCst));
    }
}
