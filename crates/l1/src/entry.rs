//! One cached page and the reference-counted handle lookups return.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use listcache_common::Row;
use listcache_keys::{GroupKey, ListBoundsHeader};

/// A cached page plus everything the sweeper and the GDSF scorer need to
/// reason about it, independent of its body.
pub struct CachedPageEntry {
    pub rows: Vec<Row>,
    pub header: Option<ListBoundsHeader>,
    pub sort_index: usize,
    pub group: GroupKey,
    pub created_at: Instant,
    pub ttl: Duration,
    /// Modification log sequence number current as of when this entry was
    /// last validated (either at construction or at a prior successful
    /// lookup). Only records with a higher sequence need to be checked
    /// against the predicate on the next lookup.
    last_checked_sequence: AtomicU64,
    /// Wall-clock microseconds spent building this page (DB round trip +
    /// materialization). Feeds the GDSF `construction_cost` term.
    pub construction_cost_micros: u64,
    access_count: AtomicU64,
}

impl CachedPageEntry {
    pub fn new(
        rows: Vec<Row>,
        header: Option<ListBoundsHeader>,
        sort_index: usize,
        group: GroupKey,
        ttl: Duration,
        construction_cost_micros: u64,
        checked_at_sequence: u64,
    ) -> Self {
        CachedPageEntry {
            rows,
            header,
            sort_index,
            group,
            created_at: Instant::now(),
            ttl,
            last_checked_sequence: AtomicU64::new(checked_at_sequence),
            construction_cost_micros,
            access_count: AtomicU64::new(0),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() >= self.ttl
    }

    pub fn last_checked_sequence(&self) -> u64 {
        self.last_checked_sequence.load(Ordering::Acquire)
    }

    pub fn mark_checked(&self, sequence: u64) {
        self.last_checked_sequence.fetch_max(sequence, Ordering::AcqRel);
    }

    pub fn record_access(&self) -> u64 {
        self.access_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn access_count(&self) -> u64 {
        self.access_count.load(Ordering::Relaxed)
    }

    /// Rough estimate of the page's resident memory footprint, used as the
    /// GDSF denominator. Counts only the row count since row bodies are
    /// caller-opaque; good enough to rank entries relative to each other.
    pub fn memory_estimate(&self) -> usize {
        64 + self.rows.len() * 128
    }
}

/// A strong handle to a cached page, safe to hold across an `.await` point.
/// The underlying entry is only reclaimed once every outstanding `PageGuard`
/// clone (and the map's own reference) has been dropped.
#[derive(Clone)]
pub struct PageGuard(pub(crate) Arc<CachedPageEntry>);

impl PageGuard {
    pub fn entry(&self) -> &CachedPageEntry {
        &self.0
    }
}

impl std::ops::Deref for PageGuard {
    type Target = CachedPageEntry;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
