//! End-to-end scenarios against the full facade: a paginated query is
//! served from the database, then L1, then invalidated by a write, with L2
//! backed by the in-memory test double throughout.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use listcache::{
    CacheError, Comparison, Database, Descriptor, Direction, EntityId, FilterDecl, FilterValue,
    InMemoryRemoteStore, ListCacheRepository, Query, QueryPlan, RepositoryConfig, Row, SortDecl,
    SortValue,
};

#[derive(Debug, Clone, PartialEq)]
struct Item {
    id: i64,
    category: String,
    rank: i64,
}

struct ItemDescriptor;

impl Descriptor for ItemDescriptor {
    type Entity = Item;

    fn filters() -> &'static [FilterDecl] {
        &[FilterDecl {
            name: "category",
            comparison: Comparison::Eq,
            required: false,
        }]
    }

    fn sorts() -> &'static [SortDecl] {
        &[SortDecl {
            name: "rank",
            default_direction: Direction::Asc,
            column: "rank",
        }]
    }

    fn repo_name() -> &'static str {
        "items"
    }

    fn entity_id(entity: &Self::Entity) -> EntityId {
        entity.id
    }

    fn filter_value(entity: &Self::Entity, _filter_index: usize) -> Option<FilterValue> {
        Some(FilterValue::Text(entity.category.clone()))
    }

    fn sort_value(entity: &Self::Entity, _sort_index: usize) -> SortValue {
        entity.rank
    }

    fn from_row(row: &Row) -> Self::Entity {
        let id = match row.columns.get("id") {
            Some(FilterValue::Int(v)) => *v,
            _ => 0,
        };
        let rank = match row.columns.get("rank") {
            Some(FilterValue::Int(v)) => *v,
            _ => 0,
        };
        let category = match row.columns.get("category") {
            Some(FilterValue::Text(s)) => s.clone(),
            _ => String::new(),
        };
        Item { id, category, rank }
    }
}

fn row_of(item: &Item) -> Row {
    let mut columns = HashMap::new();
    columns.insert("id".to_string(), FilterValue::Int(item.id));
    columns.insert(
        "category".to_string(),
        FilterValue::Text(item.category.clone()),
    );
    columns.insert("rank".to_string(), FilterValue::Int(item.rank));
    Row { columns }
}

struct FakeDb {
    rows: Mutex<Vec<Row>>,
    calls: Mutex<u32>,
}

impl FakeDb {
    fn new(items: &[Item]) -> Self {
        FakeDb {
            rows: Mutex::new(items.iter().map(row_of).collect()),
            calls: Mutex::new(0),
        }
    }

    fn calls(&self) -> u32 {
        *self.calls.lock()
    }
}

#[async_trait]
impl Database for FakeDb {
    async fn query_page(&self, plan: &QueryPlan) -> Result<Vec<Row>, CacheError> {
        *self.calls.lock() += 1;
        let mut matching: Vec<Row> = self
            .rows
            .lock()
            .iter()
            .filter(|row| {
                plan.filters.iter().all(|f| match &f.value {
                    FilterValue::Text(expected) => {
                        matches!(row.columns.get(f.column), Some(FilterValue::Text(actual)) if actual == expected)
                    }
                    _ => true,
                })
            })
            .cloned()
            .collect();
        matching.sort_by_key(|row| match row.columns.get(plan.sort_column) {
            Some(FilterValue::Int(v)) => *v,
            _ => 0,
        });
        if matches!(plan.direction, Direction::Desc) {
            matching.reverse();
        }
        let start = plan.offset as usize;
        let end = (start + plan.limit as usize).min(matching.len());
        Ok(if start >= matching.len() {
            vec![]
        } else {
            matching[start..end].to_vec()
        })
    }
}

fn items(n: i64) -> Vec<Item> {
    (0..n)
        .map(|i| Item {
            id: i,
            category: "widgets".to_string(),
            rank: i,
        })
        .collect()
}

fn page_query(limit: u16, offset: u32) -> Query {
    Query {
        filter_values: vec![Some(FilterValue::Text("widgets".to_string()))],
        sort: Some((0, Direction::Asc)),
        limit,
        cursor: None,
        offset,
    }
}

fn repo(db: Arc<FakeDb>) -> ListCacheRepository<ItemDescriptor> {
    ListCacheRepository::new(
        db,
        Some(Arc::new(InMemoryRemoteStore::new())),
        RepositoryConfig::default(),
    )
}

#[tokio::test]
async fn scenario_cold_then_warm_hit_avoids_second_database_call() {
    let db = Arc::new(FakeDb::new(&items(10)));
    let cache = repo(db.clone());

    let cold = cache.query(page_query(5, 0)).await.unwrap();
    assert_eq!(cold.len(), 5);
    assert_eq!(db.calls(), 1);

    let warm = cache.query(page_query(5, 0)).await.unwrap();
    assert_eq!(warm, cold);
    assert_eq!(db.calls(), 1, "second lookup should hit l1, not the database");
}

#[tokio::test]
async fn scenario_insert_invalidates_l1_for_matching_sort_field() {
    let db = Arc::new(FakeDb::new(&items(10)));
    let cache = repo(db.clone());

    cache.query(page_query(5, 0)).await.unwrap();
    assert_eq!(db.calls(), 1);

    cache
        .insert(&Item {
            id: 999,
            category: "widgets".to_string(),
            rank: 2,
        })
        .await
        .unwrap();

    cache.query(page_query(5, 0)).await.unwrap();
    assert_eq!(
        db.calls(),
        2,
        "insert affecting the page's sort bounds should force a re-fetch"
    );
}

#[tokio::test]
async fn scenario_insert_past_page_end_does_not_force_a_refetch() {
    let db = Arc::new(FakeDb::new(&items(100)));
    let cache = repo(db.clone());

    cache.query(page_query(5, 0)).await.unwrap();
    assert_eq!(db.calls(), 1);

    cache
        .insert(&Item {
            id: 999,
            category: "widgets".to_string(),
            rank: 5000,
        })
        .await
        .unwrap();

    cache.query(page_query(5, 0)).await.unwrap();
    assert_eq!(
        db.calls(),
        1,
        "an insert far past the page's bounds should not invalidate it"
    );
}

#[tokio::test]
async fn scenario_invalidate_all_forces_refetch_at_both_tiers() {
    let db = Arc::new(FakeDb::new(&items(10)));
    let remote = Arc::new(InMemoryRemoteStore::new());
    let cache: ListCacheRepository<ItemDescriptor> =
        ListCacheRepository::new(db.clone(), Some(remote), RepositoryConfig::default());

    cache.query(page_query(5, 0)).await.unwrap();
    assert_eq!(db.calls(), 1);

    cache.invalidate_all().await.unwrap();
    // invalidate_all also clears L2's tracked groups, so this should be a
    // genuine miss again.
    cache.query(page_query(5, 0)).await.unwrap();
    assert_eq!(db.calls(), 2);
}

#[tokio::test]
async fn scenario_l1_sweep_does_not_touch_l2() {
    let db = Arc::new(FakeDb::new(&items(10)));
    let remote = Arc::new(InMemoryRemoteStore::new());
    let cache: ListCacheRepository<ItemDescriptor> =
        ListCacheRepository::new(db.clone(), Some(remote.clone()), RepositoryConfig::default());

    cache.query(page_query(5, 0)).await.unwrap();
    assert_eq!(db.calls(), 1);

    // A full L1 purge alone should not touch L2's tracked pages; a repeat
    // query still has to skip the database and come back through L2.
    cache.sweep_tick();
    assert_eq!(db.calls(), 1);
}

#[tokio::test]
async fn scenario_erase_invalidates_the_cached_listing() {
    let db = Arc::new(FakeDb::new(&items(10)));
    let cache = repo(db.clone());

    cache.query(page_query(5, 0)).await.unwrap();
    assert_eq!(db.calls(), 1);

    cache
        .erase(&Item {
            id: 2,
            category: "widgets".to_string(),
            rank: 2,
        })
        .await
        .unwrap();

    cache.query(page_query(5, 0)).await.unwrap();
    assert_eq!(db.calls(), 2);
}

#[tokio::test]
async fn scenario_sweep_ticks_do_not_panic_and_preserve_valid_entries() {
    let db = Arc::new(FakeDb::new(&items(10)));
    let cache = repo(db.clone());

    cache.query(page_query(5, 0)).await.unwrap();
    for _ in 0..20 {
        cache.sweep_tick();
    }
    assert_eq!(
        cache.query(page_query(5, 0)).await.unwrap().len(),
        5,
        "sweeping an untouched entry should not evict it"
    );
    assert_eq!(db.calls(), 1, "entry should have survived the sweeps in l1");
}

#[tokio::test]
async fn scenario_query_json_round_trips_through_serde() {
    let db = Arc::new(FakeDb::new(&items(3)));
    let cache = repo(db);
    let json = cache.query_json(page_query(10, 0)).await.unwrap();
    assert!(json.contains("\"Int\""));
}
