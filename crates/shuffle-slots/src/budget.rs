//! Tracks how much of the worker's total resource budget is currently
//! reserved by allocated slots.
//!
//! A small piece of mutable state guarded by a `Mutex`, mutated only
//! through methods that check-then-commit in one critical section.

use crate::resource::ResourceProfile;
use std::sync::Mutex;

pub struct ResourceBudgetManager {
    total: ResourceProfile,
    reserved: Mutex<ResourceProfile>,
}

impl ResourceBudgetManager {
    pub fn new(total: ResourceProfile) -> Self {
        Self {
            total,
            reserved: Mutex::new(ResourceProfile::ZERO),
        }
    }

    /// Attempts to reserve `profile` from the remaining budget. Returns
    /// `false` (not an error) on insufficient budget, /// `budget-exhausted` propagation policy.
    pub fn reserve(&self, profile: &ResourceProfile) -> bool {
        let mut reserved = self.reserved.lock().unwrap();
        let candidate = reserved.plus(profile);
        if !candidate.fits_within(&self.total) {
            return false;
        }
        *reserved = candidate;
        true
    }

    pub fn release(&self, profile: &ResourceProfile) {
        let mut reserved = self.reserved.lock().unwrap();
        *reserved = reserved.minus(profile);
    }

    pub fn reserved(&self) -> ResourceProfile {
        self.reserved.lock().unwrap().clone()
    }

    pub fn total(&self) -> &ResourceProfile {
        &self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_fails_past_total() {
        let budget = ResourceBudgetManager::new(ResourceProfile::new(1.0, 100, 0, 0, 0));
        assert!(budget.reserve(&ResourceProfile::new(1.0, 60, 0, 0, 0)));
        assert!(!budget.reserve(&ResourceProfile::new(1.0, 60, 0, 0, 0)));
    }

    #[test]
    fn release_frees_budget_for_reuse() {
        let budget = ResourceBudgetManager::new(ResourceProfile::new(1.0, 100, 0, 0, 0));
        let profile = ResourceProfile::new(1.0, 100, 0, 0, 0);
        assert!(budget.reserve(&profile));
        assert!(!budget.reserve(&profile));
        budget.release(&profile);
        assert!(budget.reserve(&profile));
    }
}
