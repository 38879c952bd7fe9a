//! L1 List Cache (spec.md §4.4): the facade wrapping a `ChunkedMap` of
//! cached pages with lazy modification-log validation and a one-chunk-per-
//! tick sweep cursor.
//!
//! Every cached page is validated against the `ModificationLog` lazily —
//! on `get`, and again on its chunk's turn during a sweep — rather than
//! eagerly on every write, matching spec.md §4.4/§5: writes only `notify`
//! the log, they never walk the cache themselves.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use listcache_keys::PageKey;
use listcache_modlog::ModificationLog;

use crate::chunked_map::ChunkedMap;
use crate::entry::{CachedPageEntry, PageGuard};
use crate::gdsf::GdsfHistogram;

pub struct L1ListCache {
    map: ChunkedMap<PageKey, CachedPageEntry>,
    modlog: Arc<ModificationLog>,
    histogram: GdsfHistogram,
    sweep_cursor: AtomicU32,
    chunk_count: u32,
    capacity_per_chunk: usize,
}

impl L1ListCache {
    pub fn new(chunk_count: u32, capacity_per_chunk: usize, modlog: Arc<ModificationLog>) -> Self {
        L1ListCache {
            map: ChunkedMap::new(chunk_count),
            modlog,
            histogram: GdsfHistogram::new(),
            sweep_cursor: AtomicU32::new(0),
            chunk_count,
            capacity_per_chunk,
        }
    }

    /// Returns `true` if every modification recorded since the entry was
    /// last checked (matching its sort field) leaves it unaffected.
    fn is_still_valid(&self, entry: &CachedPageEntry) -> bool {
        let last_checked = entry.last_checked_sequence();
        if self.modlog.chunk_overflowed(last_checked) {
            return false;
        }
        let mut valid = true;
        self.modlog.for_each(|record| {
            if !valid || record.sequence <= last_checked || record.sort_index != entry.sort_index
            {
                return;
            }
            if listcache_predicate::affects(entry.header.as_ref(), &record.change) {
                valid = false;
            }
        });
        valid
    }

    /// Looks up a page, lazily validating it. A stale or expired hit is
    /// evicted in place and reported as a miss.
    pub fn get(&self, key: &PageKey) -> Option<PageGuard> {
        let arc = self.map.get(key)?;
        if arc.is_expired() || !self.is_still_valid(&arc) {
            self.map.remove(key);
            return None;
        }
        arc.record_access();
        arc.mark_checked(self.modlog.latest_sequence());
        Some(PageGuard(arc))
    }

    pub fn store(&self, key: PageKey, entry: CachedPageEntry) -> PageGuard {
        let arc = Arc::new(entry);
        self.map.insert(key, arc.clone());
        PageGuard(arc)
    }

    pub fn remove(&self, key: &PageKey) {
        self.map.remove(key);
    }

    /// Advances the sweep cursor by exactly one chunk: revalidates and
    /// TTL-expires that chunk's entries, applies GDSF eviction if the
    /// chunk is over its capacity, then acknowledges the chunk's sweep to
    /// the modification log so fully-acknowledged records can be dropped.
    pub fn try_sweep(&self) {
        let chunk_id = self.sweep_cursor.fetch_add(1, Ordering::Relaxed) % self.chunk_count;
        let cutoff = self.modlog.latest_sequence();

        let mut survivors = Vec::new();
        for (key, entry) in self.map.snapshot_chunk(chunk_id) {
            if entry.is_expired() || !self.is_still_valid(&entry) {
                self.map.remove(&key);
                continue;
            }
            entry.mark_checked(cutoff);
            let score = self.histogram.score(&entry);
            survivors.push((key, entry, score));
        }

        if survivors.len() > self.capacity_per_chunk {
            survivors.sort_by_key(|(_, _, score)| *score);
            let overflow = survivors.len() - self.capacity_per_chunk;
            for (key, _entry, score) in survivors.into_iter().take(overflow) {
                self.map.remove(&key);
                self.histogram.record_eviction(score);
            }
        }

        self.modlog.drain_chunk(cutoff, chunk_id);
        tracing::debug!(chunk_id, cutoff, "l1 sweep tick complete");
    }

    /// Drops every cached page, resets the GDSF histogram (per the resolved
    /// Open Question: inflation only resets on a full purge, not per
    /// individual sweep tick), and tells the modification log nothing
    /// older than the current high-water mark needs to be retained.
    pub fn purge(&self) {
        self.map.clear();
        self.modlog.drain(self.modlog.latest_sequence());
        self.histogram.reset();
        self.sweep_cursor.store(0, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn chunk_count(&self) -> u32 {
        self.chunk_count
    }
}

pub fn default_ttl() -> Duration {
    Duration::from_secs(30)
}
