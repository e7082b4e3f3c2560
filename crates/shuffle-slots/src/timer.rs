//! Timer Service collaborator : arms and cancels per-allocation
//! timeouts, identifying each armed timer by a `(key, ticket)` pair so a
//! late callback from a timer that has since been re-armed can be
//! detected and silently ignored.
//!
//! Pacing runs through `tokio::time`, with a small piece of
//! `Mutex`-guarded state checked on every transition.

use crate::ids::AllocationId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Identifies one armed timer instance. A ticket is valid only until the
/// timer for its key is re-armed or cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

/// Receives timeout notifications once a [`TimerService`] has been
/// started.
pub trait TimeoutListener: Send + Sync {
    fn notify_timeout(&self, key: AllocationId, ticket: Ticket);
}

/// Collaborator contract for arming/cancelling/validating timeouts.
/// The slot table never runs its own timer wheel; it is handed one.
pub trait TimerService: Send + Sync {
    fn start(&self, listener: Arc<dyn TimeoutListener>);
    fn stop(&self);
    fn register_timeout(&self, key: AllocationId, duration: Duration) -> Ticket;
    fn unregister_timeout(&self, key: AllocationId);
    fn is_valid(&self, key: AllocationId, ticket: Ticket) -> bool;
}

struct ArmedTimer {
    ticket: Ticket,
    handle: JoinHandle<()>,
}

/// `tokio::time::sleep`-backed [`TimerService`]. One sleep task per
/// armed timeout; firing posts `(key, ticket)` to the registered
/// listener, which re-checks validity before acting — "has enough time
/// passed, and am I still in the state I scheduled for."
pub struct TokioTimerService {
    next_ticket: AtomicU64,
    timers: Mutex<HashMap<AllocationId, ArmedTimer>>,
    listener: Mutex<Option<Arc<dyn TimeoutListener>>>,
}

impl TokioTimerService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_ticket: AtomicU64::new(0),
            timers: Mutex::new(HashMap::new()),
            listener: Mutex::new(None),
        })
    }
}

impl TimerService for TokioTimerService {
    fn start(&self, listener: Arc<dyn TimeoutListener>) {
        *self.listener.lock().unwrap() = Some(listener);
    }

    fn stop(&self) {
        let mut timers = self.timers.lock().unwrap();
        for (_, armed) in timers.drain() {
            armed.handle.abort();
        }
        *self.listener.lock().unwrap() = None;
    }

    fn register_timeout(&self, key: AllocationId, duration: Duration) -> Ticket {
        let ticket = Ticket(self.next_ticket.fetch_add(1, Ordering::Relaxed));

        // Cancel whatever timer previously owned this key; its ticket
        // is now stale, so even if its sleep already fired and is
        // racing us, `is_valid` rejects it once we overwrite the entry.
        let listener = self.listener.lock().unwrap().clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            if let Some(listener) = listener {
                listener.notify_timeout(key, ticket);
            }
        });

        let mut timers = self.timers.lock().unwrap();
        if let Some(previous) = timers.insert(key, ArmedTimer { ticket, handle }) {
            crate::invariants::debug_assert_ticket_advances!(previous.ticket.0, ticket.0);
            previous.handle.abort();
        }
        ticket
    }

    fn unregister_timeout(&self, key: AllocationId) {
        if let Some(armed) = self.timers.lock().unwrap().remove(&key) {
            armed.handle.abort();
        }
    }

    fn is_valid(&self, key: AllocationId, ticket: Ticket) -> bool {
        self.timers
            .lock()
            .unwrap()
            .get(&key)
            .is_some_and(|armed| armed.ticket == ticket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    struct FlagListener(Arc<AtomicBool>);
    impl TimeoutListener for FlagListener {
        fn notify_timeout(&self, _key: AllocationId, _ticket: Ticket) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn re_arming_invalidates_the_previous_ticket() {
        let service = TokioTimerService::new();
        let key = AllocationId::new();
        let first = service.register_timeout(key, Duration::from_secs(60));
        let second = service.register_timeout(key, Duration::from_secs(60));

        assert!(!service.is_valid(key, first));
        assert!(service.is_valid(key, second));
    }

    #[tokio::test]
    async fn timer_fires_and_notifies_listener() {
        let service = TokioTimerService::new();
        let fired = Arc::new(AtomicBool::new(false));
        service.start(Arc::new(FlagListener(Arc::clone(&fired))));

        let key = AllocationId::new();
        service.register_timeout(key, Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(fired.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn unregister_cancels_before_it_fires() {
        let service = TokioTimerService::new();
        let fired = Arc::new(AtomicBool::new(false));
        service.start(Arc::new(FlagListener(Arc::clone(&fired))));

        let key = AllocationId::new();
        service.register_timeout(key, Duration::from_millis(10));
        service.unregister_timeout(key);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(!fired.load(Ordering::SeqCst));
    }
}
