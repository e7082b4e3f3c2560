//! Task slot table, checkpoint options, and the worker's
//! producer→consumer topology shadow for the shuffle data plane.
//!
//! # Key Features
//!
//! - [`table::TaskSlotTable`]: `Created -> Running -> Closing -> Closed`
//! resource and task-attachment table with per-slot timeouts
//! - [`timer::TimerService`]/[`collaborators::SlotActions`]: collaborator
//! traits injected into the table rather than called through global state
//! - [`checkpoint::CheckpointOptions`]: the barrier alignment/unalignment
//! policy value object
//! - [`topology::IntermediateResult`]/[`topology::Edge`]: the worker's
//! arena-and-index shadow of its producer→consumer topology

mod budget;
mod checkpoint;
mod collaborators;
mod error;
mod ids;
mod invariants;
mod resource;
mod table;
mod timer;
mod topology;

pub use checkpoint::{CheckpointOptions, CheckpointStorageLocationReference, CheckpointType, NO_ALIGNMENT_TIMEOUT};
pub use collaborators::{RecordingSlotActions, SlotActions};
pub use error::SlotError;
pub use ids::{AllocationId, ExecutionAttemptId, JobId, ResourceId, SlotIndex};
pub use resource::ResourceProfile;
pub use table::{SlotReport, SlotState, SlotStatus, TableState, TaskSlotTable};
pub use timer::{Ticket, TimeoutListener, TimerService, TokioTimerService};
pub use topology::{Edge, IntermediateResult, IntermediateResultId, NoAttachedViewsProof};
