//! Result sub-partitions, result partitions, and the process-wide
//! partition registry for the shuffle data plane.
//!
//! # Key Features
//!
//! - [`subpartition::ResultSubpartition`]: a FIFO of queued buffers with
//! priority-event overtaking of an unfinished tail
//! - [`partition::ResultPartition`]: owns a buffer pool and a fixed set
//! of sub-partitions, one per downstream consumer
//! - [`manager::ResultPartitionManager`]: process-wide registry keyed by
//! partition id, with registered-instance-aware release
//! - [`spill`]: on-disk framing for `SubpartitionKind::Blocking`
//! sub-partitions that spill past their in-memory window

mod cause;
mod error;
mod ids;
mod invariants;
mod manager;
mod partition;
mod spill;
mod subpartition;
mod view;

pub use cause::ReleaseCause;
pub use error::PartitionError;
pub use ids::{IntermediateDataSetId, PartitionId, ProducerAttemptId, ReceiverId, SubpartitionIndex};
pub use manager::ResultPartitionManager;
pub use partition::ResultPartition;
pub use spill::{SpillReader, SpillRecord, SpillWriter};
pub use subpartition::{AvailabilityListener, ResultSubpartition, SubpartitionKind};
pub use view::{NextDataType, ResultSubpartitionView, ViewItem};
