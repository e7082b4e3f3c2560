use std::fmt;

/// Why a sub-partition was released. Recorded once (the first cause wins)
/// and surfaced to any attached view.
#[derive(Debug, Clone)]
pub enum ReleaseCause {
    /// Consumed to completion; no error.
    Finished,
    /// The producing task failed; `reason` is a human-readable summary.
    ProducerFailed(String),
    /// The consumer issued a `CancelRequest`.
    ConsumerCancelled,
    /// The owning partition (or the whole registry) was shut down.
    Shutdown,
}

impl fmt::Display for ReleaseCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finished => write!(f, "finished"),
            Self::ProducerFailed(reason) => write!(f, "producer failed: {reason}"),
            Self::ConsumerCancelled => write!(f, "consumer cancelled"),
            Self::Shutdown => write!(f, "shutdown"),
        }
    }
}
