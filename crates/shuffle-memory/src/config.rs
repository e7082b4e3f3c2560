/// Configuration for a [`crate::pool::BufferPool`].
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    /// Segment size in bytes. All segments leased from a pool share this size.
    pub segment_size: usize,
    /// Reserved minimum segment count. Never reclaimed by the pool.
    pub required: usize,
    /// Hard ceiling on the number of segments the pool may hand out.
    pub max: usize,
    /// Optional per-sub-partition cap, enforced by the caller (the pool
    /// itself only tracks the aggregate `required`/`requested`/`max`).
    pub per_subpartition_max: Option<usize>,
}

impl PoolConfig {
    /// Creates a new configuration.
    ///
    /// # Panics
    ///
    /// Panics if `required > max`, matching the invariant `required <=
    /// requested <= max` that must hold for the lifetime of the pool.
    pub const fn new(segment_size: usize, required: usize, max: usize) -> Self {
        assert!(required <= max, "required must not exceed max");
        Self {
            segment_size,
            required,
            max,
            per_subpartition_max: None,
        }
    }

    /// Sets a per-sub-partition cap.
    #[must_use]
    pub const fn with_per_subpartition_max(mut self, cap: usize) -> Self {
        self.per_subpartition_max = Some(cap);
        self
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new(32 * 1024, 2, 8)
    }
}

/// Preset tuned for a bounded, blocking result partition: few segments,
/// strict ceiling, favoring predictable memory over throughput.
pub const BOUNDED_BLOCKING: PoolConfig = PoolConfig::new(32 * 1024, 1, 2);

/// Preset tuned for a network-facing pipelined partition: more headroom
/// so the multiplexer rarely blocks the producer.
pub const UNBOUNDED_NETWORK: PoolConfig = PoolConfig::new(32 * 1024, 4, 64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_satisfies_required_le_max() {
        let cfg = PoolConfig::default();
        assert!(cfg.required <= cfg.max);
    }

    #[test]
    #[should_panic(expected = "required must not exceed max")]
    fn rejects_required_above_max() {
        let _ = PoolConfig::new(1024, 4, 2);
    }
}
