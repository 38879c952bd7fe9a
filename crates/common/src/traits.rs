use async_trait::async_trait;

use crate::error::CacheError;
use crate::types::{QueryPlan, Row};

/// The sole database collaborator (spec.md §4.6). The cache calls this only
/// on a miss; everything it returns is treated as opaque rows handed back to
/// the caller's `Descriptor` extraction functions.
///
/// Mirrors the `StorageApi` trait boundary in the teacher's storage crate:
/// one async method, one error type, no assumptions about the backing store.
#[async_trait]
pub trait Database: Send + Sync {
    async fn query_page(&self, plan: &QueryPlan) -> Result<Vec<Row>, CacheError>;
}

/// The L2 remote-store collaborator (spec.md §4.5/§6). Implementations live
/// in `listcache-l2` (`RedisRemoteStore`, `InMemoryRemoteStore`); the trait
/// itself is declared here because both `listcache-l1` callers and
/// `listcache-l2` implementers need a shared definition.
///
/// All methods are best-effort: a `Transient` error from any of them is
/// treated as a cache miss by the caller, never surfaced further (§7).
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), CacheError>;

    async fn setex(&self, key: &str, value: &[u8], ttl_secs: u64) -> Result<(), CacheError>;

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<(), CacheError>;

    /// Sets a TTL only if `key` does not already have one — Redis `EXPIRE
    /// key seconds NX`. Used for tracking-set TTLs so that an existing
    /// tracking set's expiry is never renewed (Design Notes §9, resolved
    /// Open Question — create-only semantics; the accepted consequence is
    /// over-caching until the tracking set's own TTL lapses).
    async fn expire_nx(&self, key: &str, ttl_secs: u64) -> Result<bool, CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    async fn sadd(&self, key: &str, member: &str) -> Result<(), CacheError>;

    async fn srem(&self, key: &str, member: &str) -> Result<(), CacheError>;

    async fn smembers(&self, key: &str) -> Result<Vec<String>, CacheError>;

    /// Fetches only `[start, end]` (inclusive) of the value at `key`. Used
    /// to pull just the 19-byte list bounds header off a stored page
    /// without transferring the whole page body, the same way Redis
    /// `GETRANGE` is used against a binary blob.
    async fn getrange(&self, key: &str, start: isize, end: isize) -> Result<Vec<u8>, CacheError>;

    /// Cursor-based key scan matching `pattern`. Returns a batch and an
    /// opaque continuation cursor; `0` (or an empty cursor) means done,
    /// matching Redis `SCAN` semantics.
    async fn scan(
        &self,
        cursor: u64,
        pattern: &str,
        count: usize,
    ) -> Result<(u64, Vec<String>), CacheError>;

    /// Execute one of the named server-side scripts (§4.5/§6) atomically.
    /// `keys` and `args` follow the same positional convention a Redis
    /// `EVALSHA` call would use; implementations dispatch on `name`.
    async fn run_script(
        &self,
        name: &str,
        keys: &[&str],
        args: &[&str],
    ) -> Result<Vec<String>, CacheError>;
}

/// Encodes/decodes an opaque cursor to and from its wire string form.
/// Injected into `listcache-parser` so the actual encoding (base64 by
/// default) stays swappable without touching query-parsing logic.
pub trait CursorCodec: Send + Sync {
    fn encode(&self, raw: &[u8]) -> String;

    fn decode(&self, encoded: &str) -> Result<Vec<u8>, CacheError>;
}
