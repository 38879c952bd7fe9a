//! List Bounds Header codec (spec.md §3): a fixed 19-byte record stored
//! alongside each cached page, carrying just enough of the page's sort
//! bounds for the Range Predicate to decide relevance without deserializing
//! the page body itself.
//!
//! Hand-encoded the same way `mini-aurora-wal::writer::encode_header` builds
//! its fixed layout: explicit `to_le_bytes()` calls into a preallocated
//! buffer, no serde. A page with an empty `SortBounds` (no rows) never gets
//! a header written at all — absence of the magic bytes on read is treated
//! as "unknown, assume affected" by the predicate, which is the
//! conservative choice required when there is nothing to compare against.

use listcache_common::{Direction, SortBounds};

pub const HEADER_LEN: usize = 19;
const MAGIC: [u8; 2] = [0x53, 0x52];

const FLAG_DESC: u8 = 1 << 0;
const FLAG_FIRST_PAGE: u8 = 1 << 1;
const FLAG_INCOMPLETE: u8 = 1 << 2;
const FLAG_CURSOR_PAGINATED: u8 = 1 << 3;

/// In-memory form of the 19-byte wire header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListBoundsHeader {
    pub first_value: i64,
    pub last_value: i64,
    pub direction: Direction,
    pub is_first_page: bool,
    /// Set when the page was served short of a full `limit` (fewer rows
    /// than requested) — a hint that it overlaps the tail of the listing.
    pub incomplete: bool,
    pub cursor_paginated: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum HeaderDecodeError {
    #[error("buffer too short for a list bounds header: {0} bytes")]
    TooShort(usize),
    #[error("bad magic bytes")]
    BadMagic,
}

impl ListBoundsHeader {
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0..2].copy_from_slice(&MAGIC);
        buf[2..10].copy_from_slice(&self.first_value.to_le_bytes());
        buf[10..18].copy_from_slice(&self.last_value.to_le_bytes());

        let mut flags = 0u8;
        if self.direction.is_desc() {
            flags |= FLAG_DESC;
        }
        if self.is_first_page {
            flags |= FLAG_FIRST_PAGE;
        }
        if self.incomplete {
            flags |= FLAG_INCOMPLETE;
        }
        if self.cursor_paginated {
            flags |= FLAG_CURSOR_PAGINATED;
        }
        buf[18] = flags;
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, HeaderDecodeError> {
        if bytes.len() < HEADER_LEN {
            return Err(HeaderDecodeError::TooShort(bytes.len()));
        }
        if bytes[0..2] != MAGIC {
            return Err(HeaderDecodeError::BadMagic);
        }
        let first_value = i64::from_le_bytes(bytes[2..10].try_into().unwrap());
        let last_value = i64::from_le_bytes(bytes[10..18].try_into().unwrap());
        let flags = bytes[18];

        Ok(ListBoundsHeader {
            first_value,
            last_value,
            direction: Direction::from_flag(flags & FLAG_DESC != 0),
            is_first_page: flags & FLAG_FIRST_PAGE != 0,
            incomplete: flags & FLAG_INCOMPLETE != 0,
            cursor_paginated: flags & FLAG_CURSOR_PAGINATED != 0,
        })
    }

    /// Builds a header from logical sort bounds, or `None` if the page was
    /// empty (`SortBounds::valid == false`) — callers must then skip writing
    /// any header bytes at all.
    pub fn from_bounds(
        bounds: SortBounds,
        direction: Direction,
        is_first_page: bool,
        incomplete: bool,
        cursor_paginated: bool,
    ) -> Option<Self> {
        if !bounds.valid {
            return None;
        }
        Some(ListBoundsHeader {
            first_value: bounds.first_value,
            last_value: bounds.last_value,
            direction,
            is_first_page,
            incomplete,
            cursor_paginated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_encode_decode() {
        let header = ListBoundsHeader {
            first_value: -42,
            last_value: 1000,
            direction: Direction::Desc,
            is_first_page: true,
            incomplete: false,
            cursor_paginated: true,
        };
        let encoded = header.encode();
        assert_eq!(encoded.len(), HEADER_LEN);
        let decoded = ListBoundsHeader::decode(&encoded).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn rejects_short_buffers() {
        let err = ListBoundsHeader::decode(&[0u8; 10]).unwrap_err();
        assert!(matches!(err, HeaderDecodeError::TooShort(10)));
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0] = 0xFF;
        let err = ListBoundsHeader::decode(&bytes).unwrap_err();
        assert!(matches!(err, HeaderDecodeError::BadMagic));
    }

    #[test]
    fn empty_bounds_yield_no_header() {
        let bounds = SortBounds::empty();
        let header = ListBoundsHeader::from_bounds(bounds, Direction::Asc, true, false, false);
        assert!(header.is_none());
    }

    #[test]
    fn all_flag_bits_survive_independently() {
        for flags in 0u8..16 {
            let header = ListBoundsHeader {
                first_value: 1,
                last_value: 2,
                direction: Direction::from_flag(flags & FLAG_DESC != 0),
                is_first_page: flags & FLAG_FIRST_PAGE != 0,
                incomplete: flags & FLAG_INCOMPLETE != 0,
                cursor_paginated: flags & FLAG_CURSOR_PAGINATED != 0,
            };
            let decoded = ListBoundsHeader::decode(&header.encode()).unwrap();
            assert_eq!(decoded, header, "flags={:04b}", flags);
        }
    }
}
