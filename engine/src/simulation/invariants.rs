//! Invariant checking for deterministic simulation testing.
//!
//! The checker is fed every observation the simulator makes about a lookup
//! and records each property that does not hold.

use crate::storage::CacheStats;
use crate::storage::btree::{LookupResult, LookupStage};

/// An invariant violation detected during simulation.
#[derive(Debug, Clone)]
pub struct InvariantViolation {
    /// Description of the violation.
    pub description: String,
    /// Index of the lookup that exposed it, in query order.
    pub lookup_index: usize,
    /// Additional context.
    pub context: String,
}

/// Checker for traversal invariants.
pub struct InvariantChecker {
    violations: Vec<InvariantViolation>,
}

impl Default for InvariantChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl InvariantChecker {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            violations: Vec::new(),
        }
    }

    #[must_use]
    pub fn violations(&self) -> &[InvariantViolation] {
        &self.violations
    }

    #[must_use]
    pub const fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    pub fn add_violation(&mut self, violation: InvariantViolation) {
        self.violations.push(violation);
    }

    fn violation(&mut self, lookup_index: usize, description: &str, context: String) {
        self.add_violation(InvariantViolation {
            description: description.to_string(),
            lookup_index,
            context,
        });
    }

    /// A lookup's stage never moves backwards.
    pub fn check_transition(&mut self, lookup_index: usize, before: LookupStage, after: LookupStage) {
        if after < before {
            self.violation(
                lookup_index,
                "stage moved backwards",
                format!("{before} -> {after}"),
            );
        }
    }

    /// Between driver calls no lookup holds a page, so the cache has no pins.
    pub fn check_no_pin_held(&mut self, lookup_index: usize, holds_page: bool, pinned_pages: u64) {
        if holds_page || pinned_pages != 0 {
            self.violation(
                lookup_index,
                "page pinned between driver calls",
                format!("holds_page={holds_page} pinned_pages={pinned_pages}"),
            );
        }
    }

    /// A lookup finishes within one call per level plus the superblock and
    /// the initial call.
    pub fn check_progress(&mut self, lookup_index: usize, calls: u32, depth: u32) {
        if calls > depth + 2 {
            self.violation(
                lookup_index,
                "too many driver calls",
                format!("calls={calls} depth={depth}"),
            );
        }
    }

    /// The result agrees with the data the tree was built from.
    pub fn check_result(
        &mut self,
        lookup_index: usize,
        result: &LookupResult,
        expected: Option<&[u8]>,
        aborted: bool,
    ) {
        let ok = match result {
            LookupResult::Found(value) => expected == Some(value.as_slice()),
            LookupResult::NotFound => expected.is_none(),
            LookupResult::Cancelled => aborted,
        };
        if !ok {
            self.violation(
                lookup_index,
                "wrong lookup result",
                format!("got {result:?}, expected {expected:?}, aborted={aborted}"),
            );
        }
    }

    /// Once every lookup is done, every pin has been returned.
    pub fn check_cache_balanced(&mut self, stats: &CacheStats, pinned_pages: u64) {
        if stats.acquires != stats.releases || pinned_pages != 0 {
            self.violation(
                usize::MAX,
                "unbalanced acquire/release",
                format!(
                    "acquires={} releases={} pinned_pages={pinned_pages}",
                    stats.acquires, stats.releases
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backwards_transition_detected() {
        let mut checker = InvariantChecker::new();
        checker.check_transition(0, LookupStage::AcquiringSuperblock, LookupStage::Complete);
        assert!(!checker.has_violations());

        checker.check_transition(1, LookupStage::AcquiringNode, LookupStage::AcquiringRoot);
        assert_eq!(checker.violations().len(), 1);
        assert_eq!(checker.violations()[0].lookup_index, 1);
    }

    #[test]
    fn test_result_checks() {
        let mut checker = InvariantChecker::new();
        checker.check_result(0, &LookupResult::Found(b"v".to_vec()), Some(b"v"), false);
        checker.check_result(1, &LookupResult::NotFound, None, false);
        checker.check_result(2, &LookupResult::Cancelled, Some(b"v"), true);
        assert!(!checker.has_violations());

        checker.check_result(3, &LookupResult::NotFound, Some(b"v"), false);
        checker.check_result(4, &LookupResult::Cancelled, None, false);
        assert_eq!(checker.violations().len(), 2);
    }

    #[test]
    fn test_progress_bound() {
        let mut checker = InvariantChecker::new();
        checker.check_progress(0, 5, 3);
        assert!(!checker.has_violations());
        checker.check_progress(0, 6, 3);
        assert!(checker.has_violations());
    }
}
