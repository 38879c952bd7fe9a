//! Modification Log (spec.md §4.3): a bounded, shared record of every
//! sort-affecting change to the underlying data, consulted lazily by L1
//! (and mirrored conceptually by L2's tracking sets) to decide whether a
//! cached page is still valid.
//!
//! Concurrency follows the Design Notes literally: a `parking_lot::RwLock`
//! protects the growable buffer itself (insertion, capacity eviction), but
//! each record's per-chunk "not yet swept" bitmap is an `AtomicU64`, so a
//! reader holding only the *read* lock can still clear its own chunk's bit
//! via `fetch_and` without contending with concurrent readers.
//!
//! Chunk count is invariant-bounded to `[2, 64]` (see `listcache-l1`), so a
//! `u64` bitmap always has enough bits — no variable-width integer is ever
//! needed, and none is implemented.
//!
//! A modification record is tagged with the declared *sort field index* it
//! pertains to (a write fans out into one record per sort field a
//! descriptor declares, since different cached pages may be sorted by
//! different fields). A lookup only applies records tagged with the same
//! sort index the page itself was sorted by; this is a deliberate
//! over-invalidation vs. under-invalidation trade-off — a record is never
//! filtered by *filter group*, only by sort field, so a write can cause a
//! page from an unrelated filter group (but the same sort field) to be
//! invalidated unnecessarily. That is always safe; the reverse would not
//! be.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

pub use listcache_predicate::SortChange;

/// One recorded change, still awaiting acknowledgement from some subset of
/// L1 chunks.
pub struct TrackedModification {
    pub sequence: u64,
    pub sort_index: usize,
    pub change: SortChange,
    /// Bit `i` set means chunk `i` has not yet swept past this record.
    unswept: AtomicU64,
}

impl TrackedModification {
    pub fn is_unswept_by(&self, chunk_id: u32) -> bool {
        self.unswept.load(Ordering::Acquire) & (1 << chunk_id) != 0
    }

    fn all_swept(&self) -> bool {
        self.unswept.load(Ordering::Acquire) == 0
    }

    fn clear_chunk(&self, chunk_id: u32) {
        self.unswept.fetch_and(!(1u64 << chunk_id), Ordering::AcqRel);
    }
}

pub struct ModificationLog {
    records: RwLock<VecDeque<Arc<TrackedModification>>>,
    next_sequence: AtomicU64,
    /// Highest sequence number of any record evicted by capacity pressure
    /// before every chunk had swept it. A chunk whose own sweep cursor is
    /// behind this value has missed modifications and must treat itself as
    /// fully stale (conservatively invalidate everything it owns).
    overflow_epoch: AtomicU64,
    capacity: usize,
    chunk_count: u32,
}

impl ModificationLog {
    pub fn new(capacity: usize, chunk_count: u32) -> Self {
        assert!((2..=64).contains(&chunk_count), "chunk_count out of range");
        ModificationLog {
            records: RwLock::new(VecDeque::with_capacity(capacity.min(1024))),
            next_sequence: AtomicU64::new(1),
            overflow_epoch: AtomicU64::new(0),
            capacity,
            chunk_count,
        }
    }

    fn initial_bitmap(&self) -> u64 {
        if self.chunk_count == 64 {
            u64::MAX
        } else {
            (1u64 << self.chunk_count) - 1
        }
    }

    /// Records one modification and returns its assigned sequence number.
    pub fn notify(&self, sort_index: usize, change: SortChange) -> u64 {
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        let record = Arc::new(TrackedModification {
            sequence,
            sort_index,
            change,
            unswept: AtomicU64::new(self.initial_bitmap()),
        });

        let mut records = self.records.write();
        if records.len() >= self.capacity {
            if let Some(evicted) = records.pop_front() {
                if !evicted.all_swept() {
                    self.overflow_epoch
                        .fetch_max(evicted.sequence, Ordering::AcqRel);
                    tracing::warn!(
                        sequence = evicted.sequence,
                        "modification log evicted an unswept record under capacity pressure"
                    );
                }
            }
        }
        records.push_back(record);
        sequence
    }

    /// Calls `f` for every record currently held, oldest first.
    pub fn for_each<F: FnMut(&TrackedModification)>(&self, mut f: F) {
        let records = self.records.read();
        for record in records.iter() {
            f(record);
        }
    }

    /// Cheap check for whether any record with `sequence > since` exists —
    /// including any record lost to overflow since `since`.
    pub fn has_since(&self, since: u64) -> bool {
        if self.overflow_epoch.load(Ordering::Acquire) > since {
            return true;
        }
        let records = self.records.read();
        records.back().map(|r| r.sequence > since).unwrap_or(false)
    }

    /// Whether `chunk_id` has missed a record evicted before it could sweep
    /// past it.
    pub fn chunk_overflowed(&self, chunk_last_swept: u64) -> bool {
        self.overflow_epoch.load(Ordering::Acquire) > chunk_last_swept
    }

    /// Acknowledges `chunk_id` has swept past every record with
    /// `sequence <= cutoff`, clearing that chunk's bit on each and
    /// discarding any record whose bitmap has reached zero as a result.
    pub fn drain_chunk(&self, cutoff: u64, chunk_id: u32) {
        let records = self.records.read();
        for record in records.iter() {
            if record.sequence <= cutoff {
                record.clear_chunk(chunk_id);
            }
        }
        drop(records);
        self.records.write().retain(|r| !r.all_swept());
    }

    /// Unconditionally discards every record with `sequence <= cutoff`,
    /// regardless of which chunks have acknowledged it. Used by a full
    /// `purge()`, after which no chunk has anything left to miss.
    pub fn drain(&self, cutoff: u64) {
        let mut records = self.records.write();
        records.retain(|r| r.sequence > cutoff);
    }

    pub fn latest_sequence(&self) -> u64 {
        self.next_sequence.load(Ordering::Acquire).saturating_sub(1)
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notify_assigns_increasing_sequences() {
        let log = ModificationLog::new(100, 4);
        let a = log.notify(0, SortChange::Inserted(1));
        let b = log.notify(0, SortChange::Inserted(2));
        assert!(b > a);
    }

    #[test]
    fn has_since_reflects_new_records() {
        let log = ModificationLog::new(100, 4);
        let before = log.latest_sequence();
        assert!(!log.has_since(before));
        log.notify(0, SortChange::Inserted(1));
        assert!(log.has_since(before));
    }

    #[test]
    fn drain_chunk_discards_once_every_chunk_has_swept() {
        let log = ModificationLog::new(100, 2);
        let seq = log.notify(0, SortChange::Inserted(1));
        assert_eq!(log.len(), 1);
        log.drain_chunk(seq, 0);
        assert_eq!(log.len(), 1, "still awaiting chunk 1");
        log.drain_chunk(seq, 1);
        assert_eq!(log.len(), 0);
    }

    #[test]
    fn capacity_eviction_sets_overflow_epoch_for_unswept_record() {
        let log = ModificationLog::new(2, 4);
        let first = log.notify(0, SortChange::Inserted(1));
        log.notify(0, SortChange::Inserted(2));
        log.notify(0, SortChange::Inserted(3)); // evicts `first`, unswept by any chunk
        assert!(log.chunk_overflowed(first - 1));
    }

    #[test]
    fn capacity_eviction_is_silent_once_fully_swept() {
        let log = ModificationLog::new(2, 2);
        let first = log.notify(0, SortChange::Inserted(1));
        log.drain_chunk(first, 0);
        log.drain_chunk(first, 1);
        log.notify(0, SortChange::Inserted(2));
        log.notify(0, SortChange::Inserted(3));
        assert!(!log.chunk_overflowed(first));
    }

    #[test]
    fn drain_is_unconditional() {
        let log = ModificationLog::new(100, 4);
        let seq = log.notify(0, SortChange::Inserted(1));
        log.drain(seq);
        assert_eq!(log.len(), 0);
    }

    #[test]
    fn for_each_visits_every_live_record_in_order() {
        let log = ModificationLog::new(100, 4);
        log.notify(0, SortChange::Inserted(1));
        log.notify(1, SortChange::Inserted(2));
        let mut seen = Vec::new();
        log.for_each(|r| seen.push(r.sort_index));
        assert_eq!(seen, vec![0, 1]);
    }
}
