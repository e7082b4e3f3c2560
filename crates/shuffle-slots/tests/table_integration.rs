//! Slot table boundary scenarios exercised against the real
//! `TokioTimerService`, one `tests/` integration file for this crate.

use shuffle_slots::{
    AllocationId, ExecutionAttemptId, JobId, RecordingSlotActions, ResourceProfile, SlotError,
    TaskSlotTable, TokioTimerService,
};
use std::sync::Arc;
use std::time::Duration;

fn make_table(capacity: usize) -> (Arc<TaskSlotTable>, Arc<RecordingSlotActions>) {
    let actions = Arc::new(RecordingSlotActions::new());
    let table = TaskSlotTable::new(
        capacity,
        ResourceProfile::default_static(),
        ResourceProfile::new(1000.0, u64::MAX, 0, u64::MAX, u64::MAX),
        TokioTimerService::new(),
        actions.clone(),
);
    table.start();
    (table, actions)
}

#[tokio::test]
async fn slot_timeout_then_late_registration_does_not_fire_stale_ticket() {
    let (table, actions) = make_table(1);
    let job = JobId::new();
    let allocation = AllocationId::new();

    table
.allocate(0, job, allocation, ResourceProfile::ZERO, Duration::from_millis(50))
.unwrap();

    // Re-arm before the first timer fires — this is the "late
    // registration" race: markActive issues ticket t2, invalidating t1.
    tokio::time::sleep(Duration::from_millis(20)).await;
    table.mark_active(job, allocation).unwrap();

    // Give any in-flight (now-stale) timer callback a chance to run.
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(
        actions.timed_out().is_empty(),
        "a stale ticket must not trigger timeoutSlot"
);
}

#[tokio::test]
async fn pool_starvation_progress_allocate_and_free_round_trip() {
    let (table, _actions) = make_table(2);
    let job = JobId::new();

    let first = AllocationId::new();
    let second = AllocationId::new();
    assert!(table
.allocate(0, job, first, ResourceProfile::ZERO, Duration::from_secs(5))
.unwrap());
    assert!(table
.allocate(1, job, second, ResourceProfile::ZERO, Duration::from_secs(5))
.unwrap());

    table.mark_active(job, first).unwrap();
    table.mark_active(job, second).unwrap();

    let attempt_a = ExecutionAttemptId::new();
    let attempt_b = ExecutionAttemptId::new();
    table.add_task(job, first, attempt_a).unwrap();
    table.add_task(job, second, attempt_b).unwrap();

    table.remove_task(first, attempt_a).unwrap();
    table.remove_task(second, attempt_b).unwrap();

    assert!(table.free_slot(first).unwrap());
    assert!(table.free_slot(second).unwrap());
}

#[tokio::test]
async fn removing_unknown_task_is_a_typed_error() {
    let (table, _actions) = make_table(1);
    let job = JobId::new();
    let allocation = AllocationId::new();
    table
.allocate(0, job, allocation, ResourceProfile::ZERO, Duration::from_secs(5))
.unwrap();
    table.mark_active(job, allocation).unwrap();

    let result = table.remove_task(allocation, ExecutionAttemptId::new());
    assert!(matches!(result, Err(SlotError::TaskNotFound(_))));
}
