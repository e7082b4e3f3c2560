//! Resource profile: the multi-dimensional quantity a Task Slot reserves
//! from the worker's budget and a task consumes from its slot.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// CPU shares, memory pools, and named extended resources carved out
/// for one slot. All fields are additive/comparable component-wise; a
/// plain struct rather than a newtype-per-dimension scheme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceProfile {
    pub cpu_shares: f64,
    pub task_heap_memory_bytes: u64,
    pub task_off_heap_memory_bytes: u64,
    pub managed_memory_bytes: u64,
    pub network_memory_bytes: u64,
    pub extended_resources: BTreeMap<String, f64>,
}

impl ResourceProfile {
    pub const ZERO: Self = Self {
        cpu_shares: 0.0,
        task_heap_memory_bytes: 0,
        task_off_heap_memory_bytes: 0,
        managed_memory_bytes: 0,
        network_memory_bytes: 0,
        extended_resources: BTreeMap::new(),
    };

    pub fn new(
        cpu_shares: f64,
        task_heap_memory_bytes: u64,
        task_off_heap_memory_bytes: u64,
        managed_memory_bytes: u64,
        network_memory_bytes: u64,
) -> Self {
        Self {
            cpu_shares,
            task_heap_memory_bytes,
            task_off_heap_memory_bytes,
            managed_memory_bytes,
            network_memory_bytes,
            extended_resources: BTreeMap::new(),
        }
    }

    /// Preset used for static slots created without an explicit profile
    ///.
    pub fn default_static() -> Self {
        Self::new(1.0, 128 * 1024 * 1024, 0, 128 * 1024 * 1024, 32 * 1024 * 1024)
    }

    #[must_use]
    pub fn with_extended(mut self, name: impl Into<String>, amount: f64) -> Self {
        self.extended_resources.insert(name.into(), amount);
        self
    }

    pub fn plus(&self, other: &Self) -> Self {
        let mut extended = self.extended_resources.clone();
        for (name, amount) in &other.extended_resources {
            *extended.entry(name.clone()).or_insert(0.0) += amount;
        }
        Self {
            cpu_shares: self.cpu_shares + other.cpu_shares,
            task_heap_memory_bytes: self.task_heap_memory_bytes + other.task_heap_memory_bytes,
            task_off_heap_memory_bytes: self.task_off_heap_memory_bytes
                + other.task_off_heap_memory_bytes,
            managed_memory_bytes: self.managed_memory_bytes + other.managed_memory_bytes,
            network_memory_bytes: self.network_memory_bytes + other.network_memory_bytes,
            extended_resources: extended,
        }
    }

    pub fn minus(&self, other: &Self) -> Self {
        let mut extended = self.extended_resources.clone();
        for (name, amount) in &other.extended_resources {
            if let Some(slot) = extended.get_mut(name) {
                *slot -= amount;
            }
        }
        Self {
            cpu_shares: self.cpu_shares - other.cpu_shares,
            task_heap_memory_bytes: self
.task_heap_memory_bytes
.saturating_sub(other.task_heap_memory_bytes),
            task_off_heap_memory_bytes: self
.task_off_heap_memory_bytes
.saturating_sub(other.task_off_heap_memory_bytes),
            managed_memory_bytes: self
.managed_memory_bytes
.saturating_sub(other.managed_memory_bytes),
            network_memory_bytes: self
.network_memory_bytes
.saturating_sub(other.network_memory_bytes),
            extended_resources: extended,
        }
    }

    /// Whether `self` fits within `ceiling` on every dimension.
    pub fn fits_within(&self, ceiling: &Self) -> bool {
        self.cpu_shares <= ceiling.cpu_shares
            && self.task_heap_memory_bytes <= ceiling.task_heap_memory_bytes
            && self.task_off_heap_memory_bytes <= ceiling.task_off_heap_memory_bytes
            && self.managed_memory_bytes <= ceiling.managed_memory_bytes
            && self.network_memory_bytes <= ceiling.network_memory_bytes
            && self.extended_resources.iter().all(|(name, amount)| {
                ceiling
.extended_resources
.get(name)
.is_some_and(|ceiling_amount| amount <= ceiling_amount)
            })
    }
}

impl Default for ResourceProfile {
    fn default() -> Self {
        Self::default_static()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plus_then_minus_is_identity() {
        let a = ResourceProfile::new(1.0, 100, 0, 50, 10);
        let b = ResourceProfile::new(0.5, 40, 0, 10, 5);
        let sum = a.plus(&b);
        let back = sum.minus(&b);
        assert_eq!(back.cpu_shares, a.cpu_shares);
        assert_eq!(back.task_heap_memory_bytes, a.task_heap_memory_bytes);
    }

    #[test]
    fn fits_within_checks_every_dimension() {
        let small = ResourceProfile::new(1.0, 10, 0, 0, 0);
        let big = ResourceProfile::new(2.0, 20, 0, 0, 0);
        assert!(small.fits_within(&big));
        assert!(!big.fits_within(&small));
    }
}
