//! Canonical cache-key construction (spec.md §4.1).
//!
//! Keys are built by hand into a `Vec<u8>` accumulator with explicit
//! little-endian encoding, the same way `mini-aurora-wal::writer` builds its
//! fixed-layout headers — no serde derive, so the byte layout is stable
//! across process/host boundaries regardless of struct field order or
//! serde's internal format choices.
//!
//! The group key covers filters + sort (the part two different pages of the
//! same logical listing share); the page key extends the group key with the
//! pagination parameters that select one page out of that group.

use std::fmt;

use listcache_common::{Direction, FilterValue, Query};

const TAG_INT: u8 = 0;
const TAG_TEXT: u8 = 1;
const TAG_BOOL: u8 = 2;

const PAGINATION_OFFSET: u8 = 0;
const PAGINATION_CURSOR: u8 = 1;

/// Identifies one logical filters+sort grouping, shared by every page of
/// the same listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey(Vec<u8>);

/// Identifies one concrete paginated page within a `GroupKey`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageKey(Vec<u8>);

impl GroupKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Hex-encoded form suitable for use inside an L2 key string.
    pub fn to_hex(&self) -> String {
        hex_encode(&self.0)
    }
}

impl PageKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex_encode(&self.0)
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{:02x}", b));
    }
    s
}

fn push_filter_value(buf: &mut Vec<u8>, value: &FilterValue) {
    match value {
        FilterValue::Int(v) => {
            buf.push(TAG_INT);
            buf.extend_from_slice(&v.to_le_bytes());
        }
        FilterValue::Bool(b) => {
            buf.push(TAG_BOOL);
            buf.push(if *b { 1 } else { 0 });
        }
        FilterValue::Text(s) => {
            buf.push(TAG_TEXT);
            let bytes = s.as_bytes();
            buf.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
            buf.extend_from_slice(bytes);
        }
    }
}

/// Builds the group-key bytes: repo name, then one presence-flagged slot
/// per declared filter in declaration order, then the resolved sort field
/// index and direction.
///
/// `sort_index`/`direction` must already be resolved (query's explicit sort
/// or the descriptor's default) — this function never consults a
/// `Descriptor` itself, keeping the builder pure data-in/data-out.
pub fn build_group_key(
    repo_name: &str,
    filter_values: &[Option<FilterValue>],
    sort_index: usize,
    direction: Direction,
) -> GroupKey {
    let mut buf = Vec::with_capacity(64);

    let repo_bytes = repo_name.as_bytes();
    buf.extend_from_slice(&(repo_bytes.len() as u32).to_le_bytes());
    buf.extend_from_slice(repo_bytes);

    buf.extend_from_slice(&(filter_values.len() as u32).to_le_bytes());
    for slot in filter_values {
        match slot {
            Some(v) => {
                buf.push(1);
                push_filter_value(&mut buf, v);
            }
            None => buf.push(0),
        }
    }

    buf.extend_from_slice(&(sort_index as u32).to_le_bytes());
    buf.push(if direction.is_desc() { 1 } else { 0 });

    GroupKey(buf)
}

/// Builds the page-key bytes by extending a group key with the query's
/// pagination parameters. Cursor pagination and offset pagination are
/// mutually exclusive and tagged explicitly so the two families never
/// collide in key space even if the raw byte ranges overlap.
pub fn build_page_key(group: &GroupKey, query: &Query) -> PageKey {
    let mut buf = group.0.clone();

    match &query.cursor {
        Some(cursor_bytes) => {
            buf.push(PAGINATION_CURSOR);
            buf.extend_from_slice(&(cursor_bytes.len() as u32).to_le_bytes());
            buf.extend_from_slice(cursor_bytes);
        }
        None => {
            buf.push(PAGINATION_OFFSET);
            buf.extend_from_slice(&query.offset.to_le_bytes());
        }
    }
    buf.extend_from_slice(&query.limit.to_le_bytes());

    PageKey(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use listcache_common::Direction;

    fn query(offset: u32, limit: u16, cursor: Option<Vec<u8>>) -> Query {
        Query {
            filter_values: vec![Some(FilterValue::Int(7))],
            sort: Some((0, Direction::Asc)),
            limit,
            cursor,
            offset,
        }
    }

    #[test]
    fn group_key_is_deterministic() {
        let filters = vec![Some(FilterValue::Int(7)), None];
        let a = build_group_key("widgets", &filters, 0, Direction::Asc);
        let b = build_group_key("widgets", &filters, 0, Direction::Asc);
        assert_eq!(a, b);
    }

    #[test]
    fn different_filter_values_produce_different_group_keys() {
        let a = build_group_key("widgets", &[Some(FilterValue::Int(1))], 0, Direction::Asc);
        let b = build_group_key("widgets", &[Some(FilterValue::Int(2))], 0, Direction::Asc);
        assert_ne!(a, b);
    }

    #[test]
    fn direction_changes_group_key() {
        let filters = [Some(FilterValue::Int(1))];
        let a = build_group_key("widgets", &filters, 0, Direction::Asc);
        let b = build_group_key("widgets", &filters, 0, Direction::Desc);
        assert_ne!(a, b);
    }

    #[test]
    fn offset_and_cursor_pages_never_collide() {
        let filters = vec![Some(FilterValue::Int(7))];
        let group = build_group_key("widgets", &filters, 0, Direction::Asc);
        let offset_page = build_page_key(&group, &query(0, 20, None));
        let cursor_page = build_page_key(&group, &query(0, 20, Some(vec![0, 0])));
        assert_ne!(offset_page, cursor_page);
    }

    #[test]
    fn different_offsets_produce_different_page_keys() {
        let filters = vec![Some(FilterValue::Int(7))];
        let group = build_group_key("widgets", &filters, 0, Direction::Asc);
        let p1 = build_page_key(&group, &query(0, 20, None));
        let p2 = build_page_key(&group, &query(20, 20, None));
        assert_ne!(p1, p2);
    }

    #[test]
    fn page_key_extends_its_group_key_bytes() {
        let filters = vec![Some(FilterValue::Int(7))];
        let group = build_group_key("widgets", &filters, 0, Direction::Asc);
        let page = build_page_key(&group, &query(5, 20, None));
        assert!(page.as_bytes().starts_with(group.as_bytes()));
    }
}
