use thiserror::Error;

/// Unified error taxonomy for the repository layer (spec.md §7).
///
/// Read paths never propagate this out of L1 or L2 — a cache-layer failure
/// degrades to a miss and falls through to `Database`. Only `Database`
/// itself and `listcache-parser`'s strict mode surface a `Result` to
/// callers.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("remote store error: {0}")]
    Transient(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("invalid sort: {0}")]
    InvalidSort(String),

    #[error("invalid limit: {0}")]
    InvalidLimit(String),

    #[error("cursor and offset were both supplied")]
    ConflictingPagination,
}
