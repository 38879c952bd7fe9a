//! GDSF (Greedy Dual-Size Frequency) eviction scoring (spec.md §4.4).
//!
//! `score = inflation + (access_count * construction_cost) / memory`. The
//! inflation term is the classic GDSF aging factor: every time an entry is
//! evicted, inflation is raised to that entry's score, so later insertions
//! are compared against the priority floor of everything already evicted
//! rather than starting fresh at zero — otherwise a burst of cheap new
//! entries could starve out everything old regardless of how valuable it
//! was.
//!
//! Per the resolved Open Question (DESIGN.md), the histogram resets only on
//! a full `purge()`, accumulating across individual `try_sweep()` ticks in
//! between.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::entry::CachedPageEntry;

pub struct GdsfHistogram {
    inflation: AtomicU64,
}

impl GdsfHistogram {
    pub fn new() -> Self {
        GdsfHistogram {
            inflation: AtomicU64::new(0),
        }
    }

    pub fn score(&self, entry: &CachedPageEntry) -> u64 {
        let inflation = self.inflation.load(Ordering::Acquire);
        let weight = entry
            .access_count()
            .saturating_mul(entry.construction_cost_micros.max(1));
        let memory = entry.memory_estimate().max(1) as u64;
        inflation.saturating_add(weight / memory)
    }

    /// Called when `score` is evicted; raises the inflation floor if this
    /// entry's score was higher than the current floor.
    pub fn record_eviction(&self, score: u64) {
        self.inflation.fetch_max(score, Ordering::AcqRel);
    }

    pub fn reset(&self) {
        self.inflation.store(0, Ordering::Release);
    }

    pub fn current_inflation(&self) -> u64 {
        self.inflation.load(Ordering::Acquire)
    }
}

impl Default for GdsfHistogram {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use listcache_common::Row;
    use std::time::Duration;

    fn make_entry(access_count: u64, cost: u64, rows: usize) -> CachedPageEntry {
        let entry = CachedPageEntry::new(
            (0..rows).map(|_| Row::default()).collect(),
            None,
            0,
            listcache_keys::build_group_key("repo", &[], 0, listcache_common::Direction::Asc),
            Duration::from_secs(60),
            cost,
            0,
        );
        for _ in 0..access_count {
            entry.record_access();
        }
        entry
    }

    #[test]
    fn higher_access_count_yields_higher_score() {
        let hist = GdsfHistogram::new();
        let cold = make_entry(1, 10, 1);
        let hot = make_entry(100, 10, 1);
        assert!(hist.score(&hot) > hist.score(&cold));
    }

    #[test]
    fn eviction_raises_inflation_floor() {
        let hist = GdsfHistogram::new();
        let entry = make_entry(50, 20, 1);
        let score = hist.score(&entry);
        hist.record_eviction(score);
        assert_eq!(hist.current_inflation(), score);
    }

    #[test]
    fn reset_clears_inflation() {
        let hist = GdsfHistogram::new();
        hist.record_eviction(500);
        hist.reset();
        assert_eq!(hist.current_inflation(), 0);
    }

    #[test]
    fn larger_pages_score_lower_for_equal_access_and_cost() {
        let hist = GdsfHistogram::new();
        let small = make_entry(10, 10, 1);
        let large = make_entry(10, 10, 100);
        assert!(hist.score(&small) >= hist.score(&large));
    }
}
