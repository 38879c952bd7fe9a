//! The repository facade (spec.md §4.6): wires the key builder, the L1 and
//! L2 tiers, and the modification log together behind the read/write
//! surface described in §2/§6.

use std::marker::PhantomData;
use std::sync::Arc;

use listcache_common::{
    CacheError, Database, Descriptor, Direction, FilterValue, Query, QueryPlan, RemoteStore,
    ResolvedFilter, Row, SortBounds,
};
use listcache_keys::{build_group_key, build_page_key, GroupKey, ListBoundsHeader, PageKey, HEADER_LEN};
use listcache_l1::{CachedPageEntry, L1ListCache};
use listcache_l2::L2Invalidator;
use listcache_modlog::{ModificationLog, SortChange};

use crate::config::RepositoryConfig;

pub struct ListCacheRepository<D: Descriptor> {
    database: Arc<dyn Database>,
    l1: Arc<L1ListCache>,
    l2: Option<Arc<L2Invalidator>>,
    modlog: Arc<ModificationLog>,
    config: RepositoryConfig,
    _marker: PhantomData<D>,
}

fn decode_page_blob(blob: &[u8]) -> Option<(Option<ListBoundsHeader>, Vec<Row>)> {
    if blob.len() >= HEADER_LEN {
        if let Ok(header) = ListBoundsHeader::decode(&blob[..HEADER_LEN]) {
            let rows: Vec<Row> = serde_json::from_slice(&blob[HEADER_LEN..]).ok()?;
            return Some((Some(header), rows));
        }
    }
    let rows: Vec<Row> = serde_json::from_slice(blob).ok()?;
    Some((None, rows))
}

fn encode_page_blob(header: Option<&ListBoundsHeader>, rows: &[Row]) -> Vec<u8> {
    let body = serde_json::to_vec(rows).unwrap_or_default();
    let mut blob = Vec::with_capacity(HEADER_LEN + body.len());
    if let Some(h) = header {
        blob.extend_from_slice(&h.encode());
    }
    blob.extend_from_slice(&body);
    blob
}

fn row_sort_value(row: &Row, column: &str) -> i64 {
    match row.columns.get(column) {
        Some(FilterValue::Int(v)) => *v,
        Some(FilterValue::Bool(b)) => {
            if *b {
                1
            } else {
                0
            }
        }
        _ => 0,
    }
}

fn compute_bounds(rows: &[Row], column: &str) -> SortBounds {
    match (rows.first(), rows.last()) {
        (Some(first), Some(last)) => SortBounds {
            first_value: row_sort_value(first, column),
            last_value: row_sort_value(last, column),
            valid: true,
        },
        _ => SortBounds::empty(),
    }
}

impl<D: Descriptor> ListCacheRepository<D> {
    pub fn new(
        database: Arc<dyn Database>,
        remote_store: Option<Arc<dyn RemoteStore>>,
        config: RepositoryConfig,
    ) -> Self {
        let modlog = Arc::new(ModificationLog::new(config.modlog_capacity, config.chunk_count));
        let l1 = Arc::new(L1ListCache::new(
            config.chunk_count,
            config.l1_capacity_per_chunk,
            modlog.clone(),
        ));
        let l2 = remote_store.map(|store| {
            Arc::new(L2Invalidator::new(
                store,
                D::repo_name(),
                config.tracking_ttl.as_secs(),
            ))
        });
        ListCacheRepository {
            database,
            l1,
            l2,
            modlog,
            config,
            _marker: PhantomData,
        }
    }

    fn resolve_sort(&self, query: &Query) -> (usize, Direction) {
        match query.sort {
            Some(pair) => pair,
            None => (0, D::sorts()[0].default_direction),
        }
    }

    fn build_plan(&self, query: &Query, sort_index: usize, direction: Direction) -> QueryPlan {
        let mut filters = Vec::new();
        for (idx, decl) in D::filters().iter().enumerate() {
            if let Some(value) = &query.filter_values[idx] {
                filters.push(ResolvedFilter {
                    column: decl.name,
                    comparison: decl.comparison,
                    value: value.clone(),
                });
            }
        }
        QueryPlan {
            filters,
            sort_column: D::sorts()[sort_index].column,
            direction,
            limit: query.limit,
            offset: query.offset,
            cursor: query.cursor.clone(),
        }
    }

    fn populate_l1(
        &self,
        page_key: &PageKey,
        group: &GroupKey,
        sort_index: usize,
        header: Option<ListBoundsHeader>,
        rows: Vec<Row>,
        construction_cost_micros: u64,
    ) {
        let entry = CachedPageEntry::new(
            rows,
            header,
            sort_index,
            group.clone(),
            self.config.page_ttl,
            construction_cost_micros,
            self.modlog.latest_sequence(),
        );
        self.l1.store(page_key.clone(), entry);
    }

    /// Core read path (spec.md §2): L1, then L2, then the database,
    /// returning the row set underlying one page.
    pub async fn query_rows(&self, query: Query) -> Result<Vec<Row>, CacheError> {
        let (sort_index, direction) = self.resolve_sort(&query);
        let group = build_group_key(D::repo_name(), &query.filter_values, sort_index, direction);
        let page_key = build_page_key(&group, &query);

        if let Some(guard) = self.l1.get(&page_key) {
            tracing::debug!(page = %page_key, "l1 hit");
            return Ok(guard.rows.clone());
        }

        if let Some(l2) = &self.l2 {
            match l2.lookup_page(&page_key).await {
                Ok(Some(blob)) => {
                    if let Some((header, rows)) = decode_page_blob(&blob) {
                        tracing::debug!(page = %page_key, "l2 hit");
                        self.populate_l1(&page_key, &group, sort_index, header, rows.clone(), 0);
                        return Ok(rows);
                    }
                }
                Ok(None) => {}
                Err(err) => tracing::warn!(%err, "l2 lookup failed, falling through to database"),
            }
        }

        tracing::debug!(page = %page_key, "cache miss, querying database");
        let started = std::time::Instant::now();
        let plan = self.build_plan(&query, sort_index, direction);
        let rows = self.database.query_page(&plan).await?;
        let construction_cost_micros = started.elapsed().as_micros() as u64;

        let bounds = compute_bounds(&rows, D::sorts()[sort_index].column);
        let is_first_page = query.offset == 0 && query.cursor.is_none();
        let incomplete = rows.len() < query.limit as usize;
        let header = ListBoundsHeader::from_bounds(
            bounds,
            direction,
            is_first_page,
            incomplete,
            query.cursor.is_some(),
        );

        self.populate_l1(
            &page_key,
            &group,
            sort_index,
            header,
            rows.clone(),
            construction_cost_micros,
        );

        if let Some(l2) = &self.l2 {
            let blob_header = header;
            if let Err(err) = l2
                .store_page(
                    &group,
                    &page_key,
                    blob_header.as_ref(),
                    &serde_json::to_vec(&rows).unwrap_or_default(),
                    self.config.page_ttl.as_secs(),
                )
                .await
            {
                tracing::warn!(%err, "l2 store failed");
            }
        }

        Ok(rows)
    }

    pub async fn query(&self, query: Query) -> Result<Vec<D::Entity>, CacheError> {
        let rows = self.query_rows(query).await?;
        Ok(rows.iter().map(D::from_row).collect())
    }

    pub async fn query_json(&self, query: Query) -> Result<String, CacheError> {
        let rows = self.query_rows(query).await?;
        serde_json::to_string(&rows).map_err(|e| CacheError::Database(e.to_string()))
    }

    /// Returns the same wire format L2 stores a page in: the 19-byte list
    /// bounds header (when the page is non-empty) followed by the
    /// JSON-encoded row body.
    pub async fn query_binary(&self, query: Query) -> Result<Vec<u8>, CacheError> {
        let (sort_index, direction) = self.resolve_sort(&query);
        let rows = self.query_rows(query.clone()).await?;
        let bounds = compute_bounds(&rows, D::sorts()[sort_index].column);
        let header = ListBoundsHeader::from_bounds(bounds, direction, true, false, query.cursor.is_some());
        Ok(encode_page_blob(header.as_ref(), &rows))
    }

    /// Records an insertion in the modification log for every declared
    /// sort field, so any page sorted on any of them can lazily notice.
    pub fn notify_created(&self, entity: &D::Entity) {
        for idx in 0..D::sorts().len() {
            self.modlog
                .notify(idx, SortChange::Inserted(D::sort_value(entity, idx)));
        }
    }

    pub fn notify_deleted(&self, entity: &D::Entity) {
        for idx in 0..D::sorts().len() {
            self.modlog
                .notify(idx, SortChange::Deleted(D::sort_value(entity, idx)));
        }
    }

    pub fn notify_updated(&self, old: &D::Entity, new: &D::Entity) {
        for idx in 0..D::sorts().len() {
            self.modlog.notify(
                idx,
                SortChange::Updated {
                    old: D::sort_value(old, idx),
                    new: D::sort_value(new, idx),
                },
            );
        }
    }

    /// Proactively invalidates, at L2, the one group each declared sort
    /// field's default-direction listing would place this entity's
    /// current filter values into. Other directions or filter
    /// combinations age out via their own page TTL or via L1's lazy
    /// per-lookup check — a deliberate trade-off, not an oversight (see
    /// DESIGN.md).
    async fn invalidate_entity_groups(&self, entity: &D::Entity) -> Result<(), CacheError> {
        let Some(l2) = &self.l2 else {
            return Ok(());
        };
        let filter_values: Vec<Option<FilterValue>> = D::filters()
            .iter()
            .enumerate()
            .map(|(idx, _)| D::filter_value(entity, idx))
            .collect();
        for (idx, decl) in D::sorts().iter().enumerate() {
            let group = build_group_key(D::repo_name(), &filter_values, idx, decl.default_direction);
            l2.invalidate_group(&group).await?;
        }
        Ok(())
    }

    pub async fn insert(&self, entity: &D::Entity) -> Result<(), CacheError> {
        self.notify_created(entity);
        self.invalidate_entity_groups(entity).await
    }

    pub async fn update(&self, old: &D::Entity, new: &D::Entity) -> Result<(), CacheError> {
        self.notify_updated(old, new);
        self.invalidate_entity_groups(old).await?;
        self.invalidate_entity_groups(new).await
    }

    pub async fn patch(&self, old: &D::Entity, new: &D::Entity) -> Result<(), CacheError> {
        self.update(old, new).await
    }

    pub async fn erase(&self, entity: &D::Entity) -> Result<(), CacheError> {
        self.notify_deleted(entity);
        self.invalidate_entity_groups(entity).await
    }

    /// One L1 sweep tick, intended to be driven by a periodic background
    /// task (see `src/main.rs`).
    pub fn sweep_tick(&self) {
        self.l1.try_sweep();
    }

    /// Drops every cached page at both tiers. The nuclear invalidation
    /// option, for schema-level changes that cannot be scoped to any
    /// specific group.
    pub async fn invalidate_all(&self) -> Result<(), CacheError> {
        self.l1.purge();
        if let Some(l2) = &self.l2 {
            l2.invalidate_all_list_groups().await?;
        }
        Ok(())
    }

    pub fn l1_len(&self) -> usize {
        self.l1.len()
    }
}
