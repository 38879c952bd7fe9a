//! L1: the in-process chunked map and the list-cache facade built on top
//! of it (spec.md §4.4).

mod chunked_map;
mod entry;
mod gdsf;
mod list_cache;

pub use chunked_map::ChunkedMap;
pub use entry::{CachedPageEntry, PageGuard};
pub use gdsf::GdsfHistogram;
pub use list_cache::{default_ttl, L1ListCache};
