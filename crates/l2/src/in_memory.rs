//! Pure-Rust `RemoteStore` test double with behavior equivalent to
//! `RedisRemoteStore` (including the same five script semantics), used for
//! unit and integration tests without a live Redis server — the same role
//! `MockStorage` plays against `StorageApi` in the teacher's compute-engine
//! tests.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use listcache_common::{CacheError, RemoteStore};

struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

#[derive(Default)]
struct State {
    strings: HashMap<String, Entry>,
    sets: HashMap<String, HashSet<String>>,
    set_expiry: HashMap<String, Instant>,
}

impl State {
    fn is_expired(&self, key: &str) -> bool {
        self.strings
            .get(key)
            .and_then(|e| e.expires_at)
            .map(|t| Instant::now() >= t)
            .unwrap_or(false)
    }

    fn set_is_expired(&self, key: &str) -> bool {
        self.set_expiry
            .get(key)
            .map(|t| Instant::now() >= t)
            .unwrap_or(false)
    }
}

#[derive(Default)]
pub struct InMemoryRemoteStore {
    state: Mutex<State>,
}

impl InMemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemoteStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut state = self.state.lock();
        if state.is_expired(key) {
            state.strings.remove(key);
            return Ok(None);
        }
        Ok(state.strings.get(key).map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), CacheError> {
        self.state.lock().strings.insert(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn setex(&self, key: &str, value: &[u8], ttl_secs: u64) -> Result<(), CacheError> {
        self.state.lock().strings.insert(
            key.to_string(),
            Entry {
                value: value.to_vec(),
                expires_at: Some(Instant::now() + Duration::from_secs(ttl_secs)),
            },
        );
        Ok(())
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<(), CacheError> {
        let mut state = self.state.lock();
        if let Some(entry) = state.strings.get_mut(key) {
            entry.expires_at = Some(Instant::now() + Duration::from_secs(ttl_secs));
        }
        if state.sets.contains_key(key) {
            state
                .set_expiry
                .insert(key.to_string(), Instant::now() + Duration::from_secs(ttl_secs));
        }
        Ok(())
    }

    async fn expire_nx(&self, key: &str, ttl_secs: u64) -> Result<bool, CacheError> {
        let mut state = self.state.lock();
        let already_has_ttl = state.set_expiry.contains_key(key)
            || state
                .strings
                .get(key)
                .map(|e| e.expires_at.is_some())
                .unwrap_or(false);
        if already_has_ttl {
            return Ok(false);
        }
        let deadline = Instant::now() + Duration::from_secs(ttl_secs);
        if let Some(entry) = state.strings.get_mut(key) {
            entry.expires_at = Some(deadline);
        }
        if state.sets.contains_key(key) {
            state.set_expiry.insert(key.to_string(), deadline);
        }
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut state = self.state.lock();
        state.strings.remove(key);
        state.sets.remove(key);
        state.set_expiry.remove(key);
        Ok(())
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<(), CacheError> {
        self.state
            .lock()
            .sets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    async fn srem(&self, key: &str, member: &str) -> Result<(), CacheError> {
        if let Some(set) = self.state.lock().sets.get_mut(key) {
            set.remove(member);
        }
        Ok(())
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, CacheError> {
        let mut state = self.state.lock();
        if state.set_is_expired(key) {
            state.sets.remove(key);
            state.set_expiry.remove(key);
            return Ok(vec![]);
        }
        Ok(state
            .sets
            .get(key)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn getrange(&self, key: &str, start: isize, end: isize) -> Result<Vec<u8>, CacheError> {
        let state = self.state.lock();
        let Some(entry) = state.strings.get(key) else {
            return Ok(vec![]);
        };
        let len = entry.value.len() as isize;
        let norm = |i: isize| -> usize {
            let v = if i < 0 { (len + i).max(0) } else { i.min(len) };
            v as usize
        };
        let s = norm(start);
        let e = (norm(end) + 1).min(entry.value.len());
        if s >= e {
            return Ok(vec![]);
        }
        Ok(entry.value[s..e].to_vec())
    }

    async fn scan(
        &self,
        cursor: u64,
        pattern: &str,
        count: usize,
    ) -> Result<(u64, Vec<String>), CacheError> {
        let state = self.state.lock();
        let mut keys: Vec<&String> = state.strings.keys().collect();
        keys.sort();
        let glob_prefix = pattern.trim_end_matches('*');
        let matches: Vec<String> = keys
            .into_iter()
            .filter(|k| k.starts_with(glob_prefix))
            .skip(cursor as usize)
            .take(count)
            .cloned()
            .collect();
        let next = cursor as usize + matches.len();
        let done = matches.len() < count;
        Ok((if done { 0 } else { next as u64 }, matches))
    }

    async fn run_script(
        &self,
        name: &str,
        keys: &[&str],
        args: &[&str],
    ) -> Result<Vec<String>, CacheError> {
        match name {
            "invalidate_group" => {
                let group_key = keys[0];
                let groups_set_key = keys[1];
                let page_prefix = args[0];
                let group_hex = args[1];
                let mut state = self.state.lock();
                let members: Vec<String> = state
                    .sets
                    .get(group_key)
                    .map(|s| s.iter().cloned().collect())
                    .unwrap_or_default();
                for m in &members {
                    state.strings.remove(&format!("{page_prefix}{m}"));
                }
                state.sets.remove(group_key);
                state.set_expiry.remove(group_key);
                if let Some(set) = state.sets.get_mut(groups_set_key) {
                    set.remove(group_hex);
                }
                Ok(members)
            }
            "invalidate_group_selective" | "invalidate_group_selective_update" => {
                let group_key = keys[0];
                let page_prefix = args[0];
                let mut state = self.state.lock();
                let mut n = 0;
                for hex in &args[1..] {
                    state.strings.remove(&format!("{page_prefix}{hex}"));
                    if let Some(set) = state.sets.get_mut(group_key) {
                        set.remove(*hex);
                    }
                    n += 1;
                }
                Ok(vec![n.to_string()])
            }
            "invalidate_all_list_groups" => {
                let groups_set_key = keys[0];
                let page_prefix = args[0];
                let group_prefix = args[1];
                let mut state = self.state.lock();
                let groups: Vec<String> = state
                    .sets
                    .get(groups_set_key)
                    .map(|s| s.iter().cloned().collect())
                    .unwrap_or_default();
                let mut total = 0;
                for g in groups {
                    let gkey = format!("{group_prefix}{g}");
                    let members: Vec<String> = state
                        .sets
                        .get(&gkey)
                        .map(|s| s.iter().cloned().collect())
                        .unwrap_or_default();
                    for m in members {
                        state.strings.remove(&format!("{page_prefix}{m}"));
                        total += 1;
                    }
                    state.sets.remove(&gkey);
                    state.set_expiry.remove(&gkey);
                }
                state.sets.remove(groups_set_key);
                state.set_expiry.remove(groups_set_key);
                Ok(vec![total.to_string()])
            }
            other => Err(CacheError::Transient(format!("unknown script: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_and_get_round_trip() {
        let store = InMemoryRemoteStore::new();
        store.set("k", b"v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"v".to_vec()));
    }

    #[tokio::test]
    async fn expire_nx_does_not_renew_existing_ttl() {
        let store = InMemoryRemoteStore::new();
        store.sadd("g", "m").await.unwrap();
        assert!(store.expire_nx("g", 60).await.unwrap());
        assert!(!store.expire_nx("g", 120).await.unwrap());
    }

    #[tokio::test]
    async fn getrange_returns_header_sized_slice() {
        let store = InMemoryRemoteStore::new();
        let body: Vec<u8> = (0..30).collect();
        store.set("p", &body).await.unwrap();
        let range = store.getrange("p", 0, 18).await.unwrap();
        assert_eq!(range.len(), 19);
        assert_eq!(range, body[0..19]);
    }

    #[tokio::test]
    async fn invalidate_group_script_deletes_pages_and_group() {
        let store = InMemoryRemoteStore::new();
        store.set("repo:dlist:p:aa", b"1").await.unwrap();
        store.sadd("repo:dlist:g:grp", "aa").await.unwrap();
        store.sadd("repo:dlist_groups", "grp").await.unwrap();

        let deleted = store
            .run_script(
                "invalidate_group",
                &["repo:dlist:g:grp", "repo:dlist_groups"],
                &["repo:dlist:p:", "grp"],
            )
            .await
            .unwrap();
        assert_eq!(deleted, vec!["aa".to_string()]);
        assert_eq!(store.get("repo:dlist:p:aa").await.unwrap(), None);
        assert!(store.smembers("repo:dlist_groups").await.unwrap().is_empty());
    }
}
