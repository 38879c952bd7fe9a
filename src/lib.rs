//! `listcache`: a two-tier (in-process + remote) read-through cache for
//! paginated list query results, with lazy L1 invalidation via a shared
//! modification log and proactive L2 invalidation via server-side scripts.
//!
//! See `SPEC_FULL.md` / `DESIGN.md` in the repository root for the full
//! design; this crate is the thin facade tying `listcache-keys`,
//! `listcache-predicate`, `listcache-modlog`, `listcache-l1`, and
//! `listcache-l2` together.

mod config;
mod repository;

pub use config::RepositoryConfig;
pub use repository::ListCacheRepository;

pub use listcache_common::{
    CacheError, Comparison, CursorCodec, Database, Descriptor, Direction, EntityId, FilterDecl,
    FilterValue, Query, QueryPlan, RemoteStore, ResolvedFilter, Row, SortBounds, SortDecl,
    SortValue,
};
pub use listcache_keys::{build_group_key, build_page_key, GroupKey, ListBoundsHeader, PageKey};
pub use listcache_l2::{InMemoryRemoteStore, L2Invalidator, RedisRemoteStore};
pub use listcache_modlog::{ModificationLog, SortChange};
pub use listcache_parser::{parse_query, Base64CursorCodec, ParseError, ParseMode};
