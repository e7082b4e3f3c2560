//! Checkpoint Options : an immutable value object describing
//! one barrier's alignment/unalignment policy. The one data-model type
//! in this crate that plausibly crosses a process boundary (from a
//! job-manager collaborator, out of scope here, into the worker), so it
//! carries `serde` derives, as any plain record crossing a process
//! boundary in this workspace does.

use serde::{Deserialize, Serialize};

/// Sentinel meaning "no alignment timeout configured."
pub const NO_ALIGNMENT_TIMEOUT: u64 = u64::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckpointType {
    Checkpoint,
    Savepoint,
}

/// Opaque reference to where a checkpoint/savepoint is stored. Out of
/// scope for this crate; carried
/// only as an opaque handle so `CheckpointOptions` can name it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointStorageLocationReference(Option<Vec<u8>>);

impl CheckpointStorageLocationReference {
    /// The default location implied by the job's configured state backend.
    pub fn default_location() -> Self {
        Self(None)
    }

    pub fn custom(reference: Vec<u8>) -> Self {
        Self(Some(reference))
    }

    pub fn is_default(&self) -> bool {
        self.0.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointOptions {
    checkpoint_type: CheckpointType,
    storage_location: CheckpointStorageLocationReference,
    exactly_once: bool,
    unaligned: bool,
    alignment_timeout: u64,
}

impl CheckpointOptions {
    /// Factory computing the derived fields from :
    /// `can_be_unaligned = (type == checkpoint) && unaligned_enabled`;
    /// final `unaligned = can_be_unaligned && timeout == 0`; final
    /// `timeout = can_be_unaligned ? timeout : NO_ALIGNMENT_TIMEOUT`.
    pub fn create(
        checkpoint_type: CheckpointType,
        storage_location: CheckpointStorageLocationReference,
        exactly_once: bool,
        unaligned_enabled: bool,
        timeout: u64,
) -> Self {
        let can_be_unaligned =
            matches!(checkpoint_type, CheckpointType::Checkpoint) && unaligned_enabled;
        let unaligned = can_be_unaligned && timeout == 0;
        let alignment_timeout = if can_be_unaligned {
            timeout
        } else {
            NO_ALIGNMENT_TIMEOUT
        };

        Self {
            checkpoint_type,
            storage_location,
            exactly_once,
            unaligned,
            alignment_timeout,
        }
    }

    /// The default, fully-aligned exactly-once checkpoint with no
    /// unalignment and no timeout.
    pub fn checkpoint_default() -> Self {
        Self::create(
            CheckpointType::Checkpoint,
            CheckpointStorageLocationReference::default_location(),
            true,
            false,
            0,
)
    }

    pub fn checkpoint_type(&self) -> CheckpointType {
        self.checkpoint_type
    }

    pub fn storage_location(&self) -> &CheckpointStorageLocationReference {
        &self.storage_location
    }

    pub fn exactly_once(&self) -> bool {
        self.exactly_once
    }

    pub fn unaligned(&self) -> bool {
        self.unaligned
    }

    pub fn alignment_timeout(&self) -> u64 {
        self.alignment_timeout
    }

    pub fn is_savepoint(&self) -> bool {
        matches!(self.checkpoint_type, CheckpointType::Savepoint)
    }

    /// `needsAlignment = exactlyOnce && (isSavepoint || !unaligned)`
    ///.
    pub fn needs_alignment(&self) -> bool {
        self.exactly_once && (self.is_savepoint() || !self.unaligned)
    }

    /// `timeoutable = 0 < timeout < NO_ALIGNMENT_TIMEOUT`.
    pub fn timeoutable(&self) -> bool {
        0 < self.alignment_timeout && self.alignment_timeout < NO_ALIGNMENT_TIMEOUT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unaligned_implies_checkpoint_not_savepoint() {
        let savepoint = CheckpointOptions::create(
            CheckpointType::Savepoint,
            CheckpointStorageLocationReference::default_location(),
            true,
            true,
            0,
);
        assert!(!savepoint.unaligned());
    }

    #[test]
    fn needs_alignment_matches_spec_formula() {
        let unaligned = CheckpointOptions::create(
            CheckpointType::Checkpoint,
            CheckpointStorageLocationReference::default_location(),
            true,
            true,
            0,
);
        assert!(unaligned.unaligned());
        assert!(!unaligned.needs_alignment());

        let savepoint_exactly_once = CheckpointOptions::create(
            CheckpointType::Savepoint,
            CheckpointStorageLocationReference::default_location(),
            true,
            true,
            0,
);
        assert!(savepoint_exactly_once.needs_alignment());

        let at_least_once = CheckpointOptions::create(
            CheckpointType::Checkpoint,
            CheckpointStorageLocationReference::default_location(),
            false,
            true,
            0,
);
        assert!(!at_least_once.needs_alignment());
    }

    #[test]
    fn timeoutable_excludes_zero_and_sentinel() {
        let aligned = CheckpointOptions::checkpoint_default();
        assert!(!aligned.timeoutable());

        let with_timeout = CheckpointOptions::create(
            CheckpointType::Checkpoint,
            CheckpointStorageLocationReference::default_location(),
            true,
            true,
            5_000,
);
        assert!(with_timeout.timeoutable());
        assert!(!with_timeout.unaligned());
    }

    #[test]
    fn non_unaligned_enabled_forces_sentinel_timeout() {
        let opts = CheckpointOptions::create(
            CheckpointType::Checkpoint,
            CheckpointStorageLocationReference::default_location(),
            true,
            false,
            5_000,
);
        assert_eq!(opts.alignment_timeout(), NO_ALIGNMENT_TIMEOUT);
        assert!(!opts.unaligned());
    }
}
