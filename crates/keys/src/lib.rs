//! Canonical cache-key construction and the list bounds header codec
//! (spec.md §3, §4.1).

mod builder;
mod header;

pub use builder::{build_group_key, build_page_key, GroupKey, PageKey};
pub use header::{HeaderDecodeError, ListBoundsHeader, HEADER_LEN};
