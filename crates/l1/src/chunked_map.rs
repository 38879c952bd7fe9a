//! L1 Chunked Map (spec.md §4.4): a hash map split into a fixed number of
//! independently-locked chunks, so sweeping (or evicting from) one chunk
//! never blocks lookups against another.
//!
//! The spec's Design Notes sanction two equivalent implementation
//! strategies for safe concurrent access to cache entries without blocking
//! readers across an `.await`: a true epoch-based reclamation scheme, or
//! reference counting where a lookup clones out a strong handle and
//! reclamation is deferred until every clone is dropped. This implements
//! the latter — each chunk is a `parking_lot::RwLock<HashMap<K, Arc<V>>>`;
//! `get` clones the `Arc` out from under the read lock, so the returned
//! handle is `Send + Sync` and safe to hold across a suspension point,
//! exactly like `mini-aurora-storage::engine::Inner`'s single-writer
//! resources but generalized to N independently-locked shards instead of
//! one engine-wide mutex.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::RwLock;

pub struct ChunkedMap<K, V> {
    chunks: Vec<RwLock<HashMap<K, Arc<V>>>>,
}

impl<K, V> ChunkedMap<K, V>
where
    K: Eq + Hash + Clone,
{
    /// `chunk_count` must be in `[2, 64]` (spec.md invariant), matching the
    /// bitmap width the modification log uses to track per-chunk sweep
    /// state.
    pub fn new(chunk_count: u32) -> Self {
        assert!(
            (2..=64).contains(&chunk_count),
            "chunk_count out of range"
        );
        let chunks = (0..chunk_count).map(|_| RwLock::new(HashMap::new())).collect();
        ChunkedMap { chunks }
    }

    pub fn chunk_count(&self) -> u32 {
        self.chunks.len() as u32
    }

    fn chunk_index(&self, key: &K) -> u32 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % self.chunks.len() as u64) as u32
    }

    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        let idx = self.chunk_index(key);
        self.chunks[idx as usize].read().get(key).cloned()
    }

    pub fn insert(&self, key: K, value: Arc<V>) {
        let idx = self.chunk_index(&key);
        self.chunks[idx as usize].write().insert(key, value);
    }

    pub fn remove(&self, key: &K) -> Option<Arc<V>> {
        let idx = self.chunk_index(key);
        self.chunks[idx as usize].write().remove(key)
    }

    /// Retains only entries for which `keep` returns true, scoped to one
    /// chunk. Used by the sweep cursor — each tick touches exactly one
    /// chunk's write lock, never the whole map at once.
    pub fn retain_chunk<F: FnMut(&K, &Arc<V>) -> bool>(&self, chunk_id: u32, mut keep: F) {
        self.chunks[chunk_id as usize]
            .write()
            .retain(|k, v| keep(k, v));
    }

    pub fn clear(&self) {
        for chunk in &self.chunks {
            chunk.write().clear();
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.iter().map(|c| c.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshots every `(key, value)` pair currently in one chunk. Used by
    /// eviction scoring, which needs to compare scores across a whole
    /// chunk's worth of entries at once.
    pub fn snapshot_chunk(&self, chunk_id: u32) -> Vec<(K, Arc<V>)> {
        self.chunks[chunk_id as usize]
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_get_round_trips() {
        let map: ChunkedMap<String, i32> = ChunkedMap::new(4);
        map.insert("a".to_string(), Arc::new(1));
        assert_eq!(*map.get(&"a".to_string()).unwrap(), 1);
    }

    #[test]
    fn remove_drops_entry() {
        let map: ChunkedMap<String, i32> = ChunkedMap::new(4);
        map.insert("a".to_string(), Arc::new(1));
        assert!(map.remove(&"a".to_string()).is_some());
        assert!(map.get(&"a".to_string()).is_none());
    }

    #[test]
    fn len_sums_across_chunks() {
        let map: ChunkedMap<String, i32> = ChunkedMap::new(4);
        for i in 0..20 {
            map.insert(format!("k{i}"), Arc::new(i));
        }
        assert_eq!(map.len(), 20);
    }

    #[test]
    fn retain_chunk_only_touches_named_chunk() {
        let map: ChunkedMap<String, i32> = ChunkedMap::new(2);
        for i in 0..20 {
            map.insert(format!("k{i}"), Arc::new(i));
        }
        let before = map.len();
        map.retain_chunk(0, |_, _| false);
        let after = map.len();
        assert!(after < before);
    }

    #[test]
    #[should_panic]
    fn rejects_chunk_count_out_of_range() {
        let _map: ChunkedMap<String, i32> = ChunkedMap::new(1);
    }
}
