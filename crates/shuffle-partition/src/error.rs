use crate::ids::PartitionId;
use thiserror::Error;

/// Error taxonomy for partitions and the partition registry :
/// recoverable conditions return `Result`, structural misuse panics
/// instead (see `ResultSubpartition::add`/`finish`).
#[derive(Debug, Error)]
pub enum PartitionError {
    #[error("partition {0} is not registered")]
    PartitionNotFound(PartitionId),

    #[error("partition {0} is already registered")]
    AlreadyRegistered(PartitionId),

    #[error("subpartition index {index} out of range (partition has {count})")]
    SubpartitionIndexOutOfRange { index: usize, count: usize },

    #[error("sub-partition already released: {cause}")]
    AlreadyReleased { cause: String },

    #[error("spill I/O error: {0}")]
    Spill(String),
}
