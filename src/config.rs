//! Plain configuration structs, the same shape as
//! `mini-aurora-storage::config::{StoragePreset, TieredConfig}` — no
//! file-based config crate, since the teacher never reaches for one
//! either.

use std::time::Duration;

/// Tuning knobs for one `ListCacheRepository`.
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    /// Number of independently-locked L1 chunks. Must be in `[2, 64]`.
    pub chunk_count: u32,
    /// Soft cap on cached pages per chunk before GDSF eviction kicks in.
    pub l1_capacity_per_chunk: usize,
    /// Maximum modification-log records retained before the oldest is
    /// forcibly evicted under capacity pressure.
    pub modlog_capacity: usize,
    /// TTL applied to each cached page, at both L1 and L2.
    pub page_ttl: Duration,
    /// TTL applied to an L2 group tracking set, created-only (never
    /// renewed — see `listcache_l2::L2Invalidator`).
    pub tracking_ttl: Duration,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        RepositoryConfig {
            chunk_count: 16,
            l1_capacity_per_chunk: 256,
            modlog_capacity: 4096,
            page_ttl: Duration::from_secs(30),
            tracking_ttl: Duration::from_secs(300),
        }
    }
}
