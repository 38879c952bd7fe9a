//! L2 tracking and invalidation (spec.md §4.5/§6): wires the namespacing
//! constants, the `RemoteStore` collaborator, and the shared Range
//! Predicate together into the five named operations.

use std::sync::Arc;

use listcache_common::RemoteStore;
use listcache_common::CacheError;
use listcache_keys::{GroupKey, ListBoundsHeader, PageKey, HEADER_LEN};
use listcache_predicate::{affects, SortChange};

use crate::constants::{
    group_key, groups_set_key, page_key, SCRIPT_INVALIDATE_ALL_LIST_GROUPS,
    SCRIPT_INVALIDATE_GROUP, SCRIPT_INVALIDATE_GROUP_SELECTIVE,
    SCRIPT_INVALIDATE_GROUP_SELECTIVE_UPDATE,
};

pub struct L2Invalidator {
    store: Arc<dyn RemoteStore>,
    repo: String,
    tracking_ttl_secs: u64,
}

impl L2Invalidator {
    pub fn new(store: Arc<dyn RemoteStore>, repo: impl Into<String>, tracking_ttl_secs: u64) -> Self {
        L2Invalidator {
            store,
            repo: repo.into(),
            tracking_ttl_secs,
        }
    }

    fn page_key_str(&self, page: &PageKey) -> String {
        page_key(&self.repo, &page.to_hex())
    }

    fn group_key_str(&self, group: &GroupKey) -> String {
        group_key(&self.repo, &group.to_hex())
    }

    fn groups_set_key_str(&self) -> String {
        groups_set_key(&self.repo)
    }

    fn page_prefix(&self) -> String {
        format!("{}:{}", self.repo, crate::constants::PAGE_PREFIX)
    }

    fn group_prefix(&self) -> String {
        format!("{}:{}", self.repo, crate::constants::GROUP_PREFIX)
    }

    /// Writes a page (header bytes, if any, followed by the serialized
    /// body) and registers it with its group's tracking set, creating the
    /// tracking set's TTL only if it did not already have one.
    pub async fn store_page(
        &self,
        group: &GroupKey,
        page: &PageKey,
        header: Option<&ListBoundsHeader>,
        body: &[u8],
        page_ttl_secs: u64,
    ) -> Result<(), CacheError> {
        let mut blob = Vec::with_capacity(HEADER_LEN + body.len());
        if let Some(h) = header {
            blob.extend_from_slice(&h.encode());
        }
        blob.extend_from_slice(body);

        self.store
            .setex(&self.page_key_str(page), &blob, page_ttl_secs)
            .await?;

        let group_key_str = self.group_key_str(group);
        self.store.sadd(&group_key_str, &page.to_hex()).await?;
        self.store
            .expire_nx(&group_key_str, self.tracking_ttl_secs)
            .await?;
        self.store
            .sadd(&self.groups_set_key_str(), &group.to_hex())
            .await?;
        Ok(())
    }

    pub async fn lookup_page(&self, page: &PageKey) -> Result<Option<Vec<u8>>, CacheError> {
        self.store.get(&self.page_key_str(page)).await
    }

    /// Drops every page in `group` and the group itself (§6:
    /// `invalidate_group`).
    pub async fn invalidate_group(&self, group: &GroupKey) -> Result<Vec<String>, CacheError> {
        let group_key_str = self.group_key_str(group);
        let groups_set_key_str = self.groups_set_key_str();
        let page_prefix = self.page_prefix();
        let group_hex = group.to_hex();
        self.store
            .run_script(
                SCRIPT_INVALIDATE_GROUP,
                &[&group_key_str, &groups_set_key_str],
                &[&page_prefix, &group_hex],
            )
            .await
    }

    async fn selective(
        &self,
        script: &str,
        group: &GroupKey,
        change: &SortChange,
    ) -> Result<usize, CacheError> {
        let group_key_str = self.group_key_str(group);
        let members = self.store.smembers(&group_key_str).await?;
        let page_prefix = self.page_prefix();

        let mut affected_hexes = Vec::new();
        for hex in members {
            let full_key = format!("{page_prefix}{hex}");
            let range = self.store.getrange(&full_key, 0, HEADER_LEN as isize - 1).await?;
            let header = ListBoundsHeader::decode(&range).ok();
            if affects(header.as_ref(), change) {
                affected_hexes.push(hex);
            }
        }
        if affected_hexes.is_empty() {
            return Ok(0);
        }

        let mut args: Vec<&str> = vec![&page_prefix];
        args.extend(affected_hexes.iter().map(|s| s.as_str()));
        let result = self
            .store
            .run_script(script, &[&group_key_str], &args)
            .await?;
        Ok(result
            .first()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(affected_hexes.len()))
    }

    /// Invalidates only the pages in `group` whose header the Range
    /// Predicate says an insert/delete could affect (§6:
    /// `invalidate_group_selective`).
    pub async fn invalidate_group_selective(
        &self,
        group: &GroupKey,
        change: SortChange,
    ) -> Result<usize, CacheError> {
        self.selective(SCRIPT_INVALIDATE_GROUP_SELECTIVE, group, &change)
            .await
    }

    /// Same operation, for an update's old/new value pair (§6:
    /// `invalidate_group_selective_update`).
    pub async fn invalidate_group_selective_update(
        &self,
        group: &GroupKey,
        old: i64,
        new: i64,
    ) -> Result<usize, CacheError> {
        self.selective(
            SCRIPT_INVALIDATE_GROUP_SELECTIVE_UPDATE,
            group,
            &SortChange::Updated { old, new },
        )
        .await
    }

    /// Drops every tracked group and every page in every group (§6:
    /// `invalidate_all_list_groups`). The nuclear option, used when a
    /// change cannot be scoped to any specific group (e.g. a schema-level
    /// event).
    pub async fn invalidate_all_list_groups(&self) -> Result<usize, CacheError> {
        let groups_set_key_str = self.groups_set_key_str();
        let page_prefix = self.page_prefix();
        let group_prefix = self.group_prefix();
        let result = self
            .store
            .run_script(
                SCRIPT_INVALIDATE_ALL_LIST_GROUPS,
                &[&groups_set_key_str],
                &[&page_prefix, &group_prefix],
            )
            .await?;
        Ok(result
            .first()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(0))
    }

    /// Invalidates every key matching `pattern` using the non-blocking
    /// cursor-based `SCAN` primitive rather than a single blocking `KEYS`
    /// call (§6: `invalidate_pattern_safe`) — deliberately not a Lua
    /// script, since scanning the keyspace from inside one would block the
    /// server exactly like `KEYS` does.
    pub async fn invalidate_pattern_safe(&self, pattern: &str) -> Result<usize, CacheError> {
        let full_pattern = format!("{}:{pattern}", self.repo);
        let mut cursor = 0u64;
        let mut deleted = 0usize;
        loop {
            let (next, keys) = self.store.scan(cursor, &full_pattern, 100).await?;
            for key in &keys {
                self.store.delete(key).await?;
                deleted += 1;
            }
            if next == 0 {
                break;
            }
            cursor = next;
        }
        Ok(deleted)
    }
}
