//! Task Slot Table : the worker-level resource and
//! task-attachment table with per-slot timeouts.
//!
//! All mutable state lives behind one `Mutex`, the same
//! `Arc`/`Mutex`-guarded registry shape used by
//! `shuffle-partition::manager::ResultPartitionManager`. The table is
//! conceptually owned, unlocked, by a single worker main thread; a
//! `Mutex` emulates that safely without requiring callers to route every
//! access through a dedicated executor.

use crate::budget::ResourceBudgetManager;
use crate::collaborators::SlotActions;
use crate::error::SlotError;
use crate::ids::{AllocationId, ExecutionAttemptId, JobId, ResourceId, SlotIndex};
use crate::invariants::debug_assert_slot_report_count;
use crate::resource::ResourceProfile;
use crate::timer::{Ticket, TimeoutListener, TimerService};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableState {
    Created,
    Running,
    Closing,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Free,
    Allocated,
    Active,
    Releasing,
}

struct TaskSlot {
    index: SlotIndex,
    allocation_id: AllocationId,
    job_id: JobId,
    profile: ResourceProfile,
    state: SlotState,
    tasks: HashSet<ExecutionAttemptId>,
    ticket: Option<Ticket>,
}

#[derive(Clone, Copy)]
enum SlotLocation {
    Static(usize),
    Dynamic,
}

struct Inner {
    state: TableState,
    static_slots: Vec<Option<TaskSlot>>,
    dynamic_slots: HashMap<AllocationId, TaskSlot>,
    by_allocation: HashMap<AllocationId, SlotLocation>,
    by_job: HashMap<JobId, HashSet<AllocationId>>,
}

impl Inner {
    fn slot_mut(&mut self, allocation_id: AllocationId) -> Option<&mut TaskSlot> {
        match *self.by_allocation.get(&allocation_id)? {
            SlotLocation::Static(idx) => self.static_slots[idx].as_mut(),
            SlotLocation::Dynamic => self.dynamic_slots.get_mut(&allocation_id),
        }
    }

    fn remove_slot(&mut self, allocation_id: AllocationId) -> Option<TaskSlot> {
        let location = self.by_allocation.remove(&allocation_id)?;
        let slot = match location {
            SlotLocation::Static(idx) => self.static_slots[idx].take(),
            SlotLocation::Dynamic => self.dynamic_slots.remove(&allocation_id),
        };
        if let Some(slot) = &slot {
            if let Some(job_slots) = self.by_job.get_mut(&slot.job_id) {
                job_slots.remove(&allocation_id);
                if job_slots.is_empty() {
                    self.by_job.remove(&slot.job_id);
                }
            }
        }
        slot
    }
}

pub struct SlotStatus {
    pub index: SlotIndex,
    pub state: SlotState,
    pub profile: ResourceProfile,
    pub job_id: Option<JobId>,
    pub allocation_id: Option<AllocationId>,
}

pub struct SlotReport {
    pub resource_id: ResourceId,
    pub slots: Vec<SlotStatus>,
}

/// Worker-level resource and task-attachment table.
pub struct TaskSlotTable {
    capacity: usize,
    default_profile: ResourceProfile,
    budget: ResourceBudgetManager,
    timer_service: Arc<dyn TimerService>,
    slot_actions: Arc<dyn SlotActions>,
    inner: Mutex<Inner>,
}

impl TaskSlotTable {
    pub fn new(
        capacity: usize,
        default_profile: ResourceProfile,
        total_budget: ResourceProfile,
        timer_service: Arc<dyn TimerService>,
        slot_actions: Arc<dyn SlotActions>,
    ) -> Arc<Self> {
        let table = Arc::new(Self {
            capacity,
            default_profile,
            budget: ResourceBudgetManager::new(total_budget),
            timer_service,
            slot_actions,
            inner: Mutex::new(Inner {
                state: TableState::Created,
                static_slots: (0..capacity).map(|_| None).collect(),
                dynamic_slots: HashMap::new(),
                by_allocation: HashMap::new(),
                by_job: HashMap::new(),
            }),
        });
        let listener: Arc<dyn TimeoutListener> = table.clone();
        table.timer_service.start(listener);
        table
    }

    /// `Created -> Running`. All other public operations require
    /// `Running`.
    pub fn start(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.state == TableState::Created {
            inner.state = TableState::Running;
        }
    }

    pub fn state(&self) -> TableState {
        self.inner.lock().unwrap().state
    }

    fn require_running(inner: &Inner) -> Result<(), SlotError> {
        if inner.state != TableState::Running {
            return Err(SlotError::NotRunning);
        }
        Ok(())
    }

    /// Allocates a slot. Returns `Ok(true)` on a fresh allocation,
    /// `Ok(false)` if `allocation_id` is already known (idempotent, not
    /// an error) or if the resource budget is exhausted (also not an
    /// error — `budget-exhausted` propagation policy).
    pub fn allocate(
        &self,
        index: SlotIndex,
        job_id: JobId,
        allocation_id: AllocationId,
        profile: ResourceProfile,
        timeout: Duration,
    ) -> Result<bool, SlotError> {
        let mut inner = self.inner.lock().unwrap();
        Self::require_running(&inner)?;

        if inner.by_allocation.contains_key(&allocation_id) {
            return Ok(false);
        }

        let location = if index >= 0 {
            let idx = index as usize;
            if idx >= self.capacity {
                return Err(SlotError::IndexOutOfRange {
                    index,
                    capacity: self.capacity,
                });
            }
            if let Some(existing) = &inner.static_slots[idx] {
                if existing.job_id != job_id || existing.allocation_id != allocation_id {
                    return Err(SlotError::IndexOccupied(index));
                }
                return Ok(true);
            }
            SlotLocation::Static(idx)
        } else {
            SlotLocation::Dynamic
        };

        if !self.budget.reserve(&profile) {
            return Ok(false);
        }

        let ticket = self.timer_service.register_timeout(allocation_id, timeout);
        let slot = TaskSlot {
            index,
            allocation_id,
            job_id,
            profile,
            state: SlotState::Allocated,
            tasks: HashSet::new(),
            ticket: Some(ticket),
        };

        match location {
            SlotLocation::Static(idx) => inner.static_slots[idx] = Some(slot),
            SlotLocation::Dynamic => {
                inner.dynamic_slots.insert(allocation_id, slot);
            }
        }
        inner.by_allocation.insert(allocation_id, location);
        inner.by_job.entry(job_id).or_default().insert(allocation_id);

        tracing::debug!(%allocation_id, %job_id, index, "slot allocated");
        Ok(true)
    }

    /// `Allocated -> Active`, cancelling the slot's timeout.
    pub fn mark_active(&self, job_id: JobId, allocation_id: AllocationId) -> Result<(), SlotError> {
        let mut inner = self.inner.lock().unwrap();
        Self::require_running(&inner)?;
        let slot = inner
            .slot_mut(allocation_id)
            .filter(|slot| slot.job_id == job_id)
            .ok_or(SlotError::SlotNotFound(allocation_id))?;
        slot.state = SlotState::Active;
        slot.ticket = None;
        self.timer_service.unregister_timeout(allocation_id);
        Ok(())
    }

    /// `Active -> Allocated`, re-arming the slot's timeout.
    pub fn mark_inactive(
        &self,
        job_id: JobId,
        allocation_id: AllocationId,
        timeout: Duration,
    ) -> Result<(), SlotError> {
        let mut inner = self.inner.lock().unwrap();
        Self::require_running(&inner)?;
        let slot = inner
            .slot_mut(allocation_id)
            .filter(|slot| slot.job_id == job_id)
            .ok_or(SlotError::SlotNotFound(allocation_id))?;
        slot.state = SlotState::Allocated;
        let ticket = self.timer_service.register_timeout(allocation_id, timeout);
        slot.ticket = Some(ticket);
        Ok(())
    }

    /// Attaches an execution attempt. Requires the slot to be `Active`
    /// for the attempt's `(job_id, allocation_id)`.
    pub fn add_task(
        &self,
        job_id: JobId,
        allocation_id: AllocationId,
        attempt_id: ExecutionAttemptId,
    ) -> Result<(), SlotError> {
        let mut inner = self.inner.lock().unwrap();
        Self::require_running(&inner)?;
        let slot = inner
            .slot_mut(allocation_id)
            .ok_or(SlotError::SlotNotFound(allocation_id))?;
        if slot.state != SlotState::Active || slot.job_id != job_id {
            return Err(SlotError::SlotNotActive {
                allocation_id,
                job_id,
            });
        }
        slot.tasks.insert(attempt_id);
        Ok(())
    }

    /// Detaches an execution attempt. If the slot is `Releasing` and now
    /// empty, finalizes the free and notifies `SlotActions`.
    pub fn remove_task(
        &self,
        allocation_id: AllocationId,
        attempt_id: ExecutionAttemptId,
    ) -> Result<(), SlotError> {
        let mut inner = self.inner.lock().unwrap();
        Self::require_running(&inner)?;
        let should_finalize = {
            let slot = inner
                .slot_mut(allocation_id)
                .ok_or(SlotError::SlotNotFound(allocation_id))?;
            if !slot.tasks.remove(&attempt_id) {
                return Err(SlotError::TaskNotFound(attempt_id));
            }
            slot.state == SlotState::Releasing && slot.tasks.is_empty()
        };
        if should_finalize {
            self.finalize_free(&mut *inner, allocation_id);
        }
        Ok(())
    }

    /// No-op (but state-transitioning) while the slot still owns tasks:
    /// transitions to `Releasing` and returns `Ok(false)`. Frees
    /// immediately and returns `Ok(true)` if the slot was already empty.
    pub fn free_slot(&self, allocation_id: AllocationId) -> Result<bool, SlotError> {
        let mut inner = self.inner.lock().unwrap();
        Self::require_running(&inner)?;
        let is_empty = {
            let slot = inner
                .slot_mut(allocation_id)
                .ok_or(SlotError::SlotNotFound(allocation_id))?;
            slot.state = SlotState::Releasing;
            slot.tasks.is_empty()
        };
        if is_empty {
            self.finalize_free(&mut *inner, allocation_id);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn finalize_free(&self, inner: &mut Inner, allocation_id: AllocationId) {
        if let Some(slot) = inner.remove_slot(allocation_id) {
            self.timer_service.unregister_timeout(allocation_id);
            self.budget.release(&slot.profile);
            self.slot_actions.free_slot(allocation_id);
            tracing::debug!(%allocation_id, "slot freed");
        }
    }

    /// One status per static index in `[0, N)` (free slots carry the
    /// default profile) plus one per currently-allocated dynamic slot.
    pub fn create_slot_report(&self, resource_id: ResourceId) -> SlotReport {
        let inner = self.inner.lock().unwrap();
        let mut slots = Vec::with_capacity(self.capacity + inner.dynamic_slots.len());

        for (idx, slot) in inner.static_slots.iter().enumerate() {
            slots.push(match slot {
                Some(slot) => SlotStatus {
                    index: slot.index,
                    state: slot.state,
                    profile: slot.profile.clone(),
                    job_id: Some(slot.job_id),
                    allocation_id: Some(slot.allocation_id),
                },
                None => SlotStatus {
                    index: idx as SlotIndex,
                    state: SlotState::Free,
                    profile: self.default_profile.clone(),
                    job_id: None,
                    allocation_id: None,
                },
            });
        }

        for slot in inner.dynamic_slots.values() {
            slots.push(SlotStatus {
                index: slot.index,
                state: slot.state,
                profile: slot.profile.clone(),
                job_id: Some(slot.job_id),
                allocation_id: Some(slot.allocation_id),
            });
        }

        debug_assert_slot_report_count!(slots.len(), self.capacity, inner.dynamic_slots.len());

        SlotReport { resource_id, slots }
    }

    /// `Running -> Closing`, force-freeing every allocated slot
    /// regardless of attached tasks, then `Closing -> Closed`.
    pub fn close(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.state == TableState::Closed {
            return;
        }
        inner.state = TableState::Closing;

        let allocation_ids: Vec<AllocationId> = inner.by_allocation.keys().copied().collect();
        for allocation_id in allocation_ids {
            self.finalize_free(&mut *inner, allocation_id);
        }

        inner.state = TableState::Closed;
    }
}

impl TimeoutListener for TaskSlotTable {
    fn notify_timeout(&self, key: AllocationId, ticket: Ticket) {
        if self.timer_service.is_valid(key, ticket) {
            tracing::warn!(allocation_id = %key, "slot allocation timed out");
            self.slot_actions.timeout_slot(key, ticket);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::RecordingSlotActions;
    use crate::timer::TokioTimerService;

    fn table(capacity: usize) -> Arc<TaskSlotTable> {
        let table = TaskSlotTable::new(
            capacity,
            ResourceProfile::default_static(),
            ResourceProfile::new(100.0, 100 * 1024 * 1024 * 1024, 0, u64::MAX, u64::MAX),
            TokioTimerService::new(),
            Arc::new(RecordingSlotActions::new()),
        );
        table.start();
        table
    }

    #[tokio::test]
    async fn allocate_known_id_is_idempotent() {
        let table = table(4);
        let job = JobId::new();
        let allocation = AllocationId::new();
        assert!(table
.allocate(0, job, allocation, ResourceProfile::ZERO, Duration::from_secs(1))
.unwrap());
        assert!(!table
.allocate(0, job, allocation, ResourceProfile::ZERO, Duration::from_secs(1))
.unwrap());
    }

    #[tokio::test]
    async fn occupied_index_with_different_allocation_fails() {
        let table = table(4);
        let job = JobId::new();
        table
.allocate(0, job, AllocationId::new(), ResourceProfile::ZERO, Duration::from_secs(1))
.unwrap();
        let result = table.allocate(
            0,
            job,
            AllocationId::new(),
            ResourceProfile::ZERO,
            Duration::from_secs(1),
);
        assert!(matches!(result, Err(SlotError::IndexOccupied(0))));
    }

    #[tokio::test]
    async fn add_task_requires_active_state() {
        let table = table(4);
        let job = JobId::new();
        let allocation = AllocationId::new();
        table
.allocate(0, job, allocation, ResourceProfile::ZERO, Duration::from_secs(1))
.unwrap();

        let attempt = ExecutionAttemptId::new();
        assert!(matches!(
            table.add_task(job, allocation, attempt),
            Err(SlotError::SlotNotActive {.. })
));

        table.mark_active(job, allocation).unwrap();
        assert!(table.add_task(job, allocation, attempt).is_ok());
    }

    #[tokio::test]
    async fn free_slot_waits_for_last_task_removal() {
        let table = table(4);
        let job = JobId::new();
        let allocation = AllocationId::new();
        table
.allocate(0, job, allocation, ResourceProfile::ZERO, Duration::from_secs(1))
.unwrap();
        table.mark_active(job, allocation).unwrap();
        let attempt = ExecutionAttemptId::new();
        table.add_task(job, allocation, attempt).unwrap();

        assert!(!table.free_slot(allocation).unwrap());
        table.remove_task(allocation, attempt).unwrap();

        let report = table.create_slot_report(ResourceId::new());
        let freed = report
.slots
.iter()
.find(|status| status.index == 0)
.unwrap();
        assert_eq!(freed.state, SlotState::Free);
    }

    #[tokio::test]
    async fn slot_report_has_one_entry_per_static_index_plus_dynamic() {
        let table = table(3);
        table
.allocate(
                -1,
                JobId::new(),
                AllocationId::new(),
                ResourceProfile::ZERO,
                Duration::from_secs(1),
)
.unwrap();

        let report = table.create_slot_report(ResourceId::new());
        assert_eq!(report.slots.len(), 4);
    }

    #[tokio::test]
    async fn allocate_rejects_when_not_running() {
        let table = TaskSlotTable::new(
            2,
            ResourceProfile::default_static(),
            ResourceProfile::new(100.0, u64::MAX, 0, u64::MAX, u64::MAX),
            TokioTimerService::new(),
            Arc::new(RecordingSlotActions::new()),
);
        // Deliberately not started: state is Created, not Running.
        let result = table.allocate(
            0,
            JobId::new(),
            AllocationId::new(),
            ResourceProfile::ZERO,
            Duration::from_secs(1),
);
        assert!(matches!(result, Err(SlotError::NotRunning)));
    }

    #[tokio::test]
    async fn close_force_frees_slots_with_attached_tasks() {
        let table = table(2);
        let job = JobId::new();
        let allocation = AllocationId::new();
        table
.allocate(0, job, allocation, ResourceProfile::ZERO, Duration::from_secs(1))
.unwrap();
        table.mark_active(job, allocation).unwrap();
        table.add_task(job, allocation, ExecutionAttemptId::new()).unwrap();

        table.close();
        assert_eq!(table.state(), TableState::Closed);
    }
}
