//! Demo binary: a toy in-memory "tasks" repository exercising the L1/L2
//! list cache end to end — insert, paginated query (cold + warm), a write
//! that invalidates an in-flight page, and a couple of background sweep
//! ticks.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use listcache::{
    CacheError, Comparison, Database, Descriptor, Direction, EntityId, FilterDecl, FilterValue,
    InMemoryRemoteStore, ListCacheRepository, Query, QueryPlan, RepositoryConfig, Row, SortDecl,
    SortValue,
};

#[derive(Debug, Clone)]
struct Task {
    id: i64,
    title: String,
    done: bool,
    priority: i64,
}

struct TaskDescriptor;

impl Descriptor for TaskDescriptor {
    type Entity = Task;

    fn filters() -> &'static [FilterDecl] {
        &[FilterDecl {
            name: "done",
            comparison: Comparison::Eq,
            required: false,
        }]
    }

    fn sorts() -> &'static [SortDecl] {
        &[
            SortDecl {
                name: "priority",
                default_direction: Direction::Desc,
                column: "priority",
            },
            SortDecl {
                name: "id",
                default_direction: Direction::Asc,
                column: "id",
            },
        ]
    }

    fn repo_name() -> &'static str {
        "tasks"
    }

    fn entity_id(entity: &Self::Entity) -> EntityId {
        entity.id
    }

    fn filter_value(entity: &Self::Entity, filter_index: usize) -> Option<FilterValue> {
        match filter_index {
            0 => Some(FilterValue::Bool(entity.done)),
            _ => None,
        }
    }

    fn sort_value(entity: &Self::Entity, sort_index: usize) -> SortValue {
        match sort_index {
            0 => entity.priority,
            1 => entity.id,
            _ => 0,
        }
    }

    fn from_row(row: &Row) -> Self::Entity {
        let get_int = |col: &str| match row.columns.get(col) {
            Some(FilterValue::Int(v)) => *v,
            _ => 0,
        };
        let get_bool = |col: &str| matches!(row.columns.get(col), Some(FilterValue::Bool(true)));
        let title = match row.columns.get("title") {
            Some(FilterValue::Text(s)) => s.clone(),
            _ => String::new(),
        };
        Task {
            id: get_int("id"),
            title,
            done: get_bool("done"),
            priority: get_int("priority"),
        }
    }
}

fn task_to_row(task: &Task) -> Row {
    let mut columns = HashMap::new();
    columns.insert("id".to_string(), FilterValue::Int(task.id));
    columns.insert("title".to_string(), FilterValue::Text(task.title.clone()));
    columns.insert("done".to_string(), FilterValue::Bool(task.done));
    columns.insert("priority".to_string(), FilterValue::Int(task.priority));
    Row { columns }
}

struct InMemoryTaskDb {
    rows: Mutex<Vec<Row>>,
}

impl InMemoryTaskDb {
    fn new() -> Self {
        InMemoryTaskDb {
            rows: Mutex::new(Vec::new()),
        }
    }

    fn insert(&self, task: &Task) {
        self.rows.lock().push(task_to_row(task));
    }
}

fn row_matches(row: &Row, column: &str, comparison: Comparison, value: &FilterValue) -> bool {
    let Some(actual) = row.columns.get(column) else {
        return false;
    };
    match comparison {
        Comparison::Eq => actual == value,
        Comparison::Ne => actual != value,
        _ => true, // demo DB only exercises equality filters
    }
}

fn row_sort_key(row: &Row, column: &str) -> i64 {
    match row.columns.get(column) {
        Some(FilterValue::Int(v)) => *v,
        Some(FilterValue::Bool(b)) => *b as i64,
        _ => 0,
    }
}

#[async_trait]
impl Database for InMemoryTaskDb {
    async fn query_page(&self, plan: &QueryPlan) -> Result<Vec<Row>, CacheError> {
        let mut matching: Vec<Row> = self
            .rows
            .lock()
            .iter()
            .filter(|row| {
                plan.filters
                    .iter()
                    .all(|f| row_matches(row, f.column, f.comparison, &f.value))
            })
            .cloned()
            .collect();

        matching.sort_by_key(|row| row_sort_key(row, plan.sort_column));
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

fn query(filter_done: Option<bool>, sort: Option<(usize, Direction)>, limit: u16, offset: u32) -> Query {
    Query {
        filter_values: vec![filter_done.map(FilterValue::Bool)],
        sort,
        limit,
        cursor: None,
        offset,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let db = Arc::new(InMemoryTaskDb::new());
    for i in 0..25 {
        db.insert(&Task {
            id: i,
            title: format!("task-{i}"),
            done: i % 3 == 0,
            priority: (i * 7) % 13,
        });
    }

    let remote = Arc::new(InMemoryRemoteStore::new());
    let repo: ListCacheRepository<TaskDescriptor> = ListCacheRepository::new(
        db,
        Some(remote),
        RepositoryConfig::default(),
    );

    let first_page = query(None, Some((1, Direction::Asc)), 5, 0);

    let cold = repo.query(first_page.clone()).await?;
    tracing::info!(count = cold.len(), "cold query served from database");

    let warm = repo.query(first_page.clone()).await?;
    tracing::info!(count = warm.len(), "warm query served from l1");

    repo.insert(&Task {
        id: 999,
        title: "new-urgent-task".to_string(),
        done: false,
        priority: 12,
    })
    .await?;
    tracing::info!("inserted a new task; the cached page above is now stale");

    let after_write = repo.query(first_page).await?;
    tracing::info!(
        count = after_write.len(),
        "query after write was re-validated against the modification log"
    );

    for _ in 0..4 {
        repo.sweep_tick();
    }
    tracing::info!(l1_len = repo.l1_len(), "ran a few background sweep ticks");

    Ok(())
}
