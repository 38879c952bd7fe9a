//! Range Predicate (spec.md §4.2): decides whether a single modification to
//! the underlying data could possibly affect a specific cached page,
//! without ever looking at the page body — only its `ListBoundsHeader`.
//!
//! Implemented as pure functions over data, the same way
//! `mini-aurora-pagestore::materialize::materialize_page` reasons purely
//! over a struct with no I/O. This is the one piece of logic L1 and L2 both
//! call, so it lives in its own crate with no collaborator traits at all —
//! just `listcache-common` (for `Direction`) and `listcache-keys` (for
//! `ListBoundsHeader`).
//!
//! Two distinct decision tables exist because offset pagination and cursor
//! pagination react differently to the same modification:
//!
//! - **Offset mode (cascade)**: rows are addressed by position. An
//!   insert/delete anywhere at or before a page's last row shifts every row
//!   after it by one position, so the page must be treated as affected even
//!   if the changed value never appears on the page itself.
//! - **Cursor mode (localized)**: rows are addressed relative to a key, not
//!   a position. A change only matters if it falls inside the page's own
//!   bounds, or — at the two edges of the listing — if it could extend the
//!   first page backward or the last (incomplete) page forward.
//!
//! Both tables are symmetric between ascending and descending sort: all the
//! asymmetry is captured once, in the `before`/`within`/`after` helpers.

use listcache_common::Direction;
use listcache_keys::ListBoundsHeader;

/// A single modification to the sorted field of one row, expressed as
/// whatever values the row's sort field took before/after the change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortChange {
    Inserted(i64),
    Deleted(i64),
    Updated { old: i64, new: i64 },
}

fn before(value: i64, header: &ListBoundsHeader) -> bool {
    match header.direction {
        Direction::Asc => value < header.first_value,
        Direction::Desc => value > header.first_value,
    }
}

fn within(value: i64, header: &ListBoundsHeader) -> bool {
    match header.direction {
        Direction::Asc => value >= header.first_value && value <= header.last_value,
        Direction::Desc => value <= header.first_value && value >= header.last_value,
    }
}

fn after(value: i64, header: &ListBoundsHeader) -> bool {
    match header.direction {
        Direction::Asc => value > header.last_value,
        Direction::Desc => value < header.last_value,
    }
}

fn at_or_before_end(value: i64, header: &ListBoundsHeader) -> bool {
    before(value, header) || within(value, header)
}

/// Cascade rule for offset-paginated pages: affected if the value sorts at
/// or before the page's last row, or the page is incomplete (the current
/// last page, whose tail could always grow).
fn offset_affects_value(value: i64, header: &ListBoundsHeader) -> bool {
    at_or_before_end(value, header) || header.incomplete
}

/// Localized rule for cursor-paginated pages: affected if the value falls
/// inside the page, or could extend it at either open edge (backward on the
/// first page, forward on an incomplete/last page).
fn cursor_affects_value(value: i64, header: &ListBoundsHeader) -> bool {
    within(value, header)
        || (header.is_first_page && before(value, header))
        || (header.incomplete && after(value, header))
}

fn affects_value(value: i64, header: &ListBoundsHeader) -> bool {
    if header.cursor_paginated {
        cursor_affects_value(value, header)
    } else {
        offset_affects_value(value, header)
    }
}

fn page_range(header: &ListBoundsHeader) -> (i64, i64) {
    if header.first_value <= header.last_value {
        (header.first_value, header.last_value)
    } else {
        (header.last_value, header.first_value)
    }
}

/// Offset-mode update rule: an update shifts one row from `old` to `new`,
/// which only disturbs a page's positions if the range it spans,
/// `[min(old,new), max(old,new)]`, intersects the page's own range — not
/// merely if either endpoint alone would cascade. An incomplete (tail) page
/// is always affected, same as insert/delete.
fn offset_update_affects(old: i64, new: i64, header: &ListBoundsHeader) -> bool {
    if header.incomplete {
        return true;
    }
    let (change_lo, change_hi) = if old <= new { (old, new) } else { (new, old) };
    let (page_lo, page_hi) = page_range(header);
    change_lo <= page_hi && page_lo <= change_hi
}

/// Decides whether `change` could affect the page described by `header`.
///
/// `header` is `None` when the page carries no bounds header at all — an
/// empty cached page, or one whose header failed to decode. Per spec.md
/// §3/§4.2 this is always treated as affected: there is nothing to compare
/// against, so the conservative answer is the only safe one.
pub fn affects(header: Option<&ListBoundsHeader>, change: &SortChange) -> bool {
    let header = match header {
        Some(h) => h,
        None => return true,
    };

    match change {
        SortChange::Inserted(v) | SortChange::Deleted(v) => affects_value(*v, header),
        SortChange::Updated { old, new } => {
            if header.cursor_paginated {
                affects_value(*old, header) || affects_value(*new, header)
            } else {
                offset_update_affects(*old, *new, header)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(first: i64, last: i64, direction: Direction) -> ListBoundsHeader {
        ListBoundsHeader {
            first_value: first,
            last_value: last,
            direction,
            is_first_page: false,
            incomplete: false,
            cursor_paginated: false,
        }
    }

    #[test]
    fn no_header_is_always_affected() {
        assert!(affects(None, &SortChange::Inserted(999)));
    }

    #[test]
    fn offset_mode_cascades_from_inserts_before_page_end() {
        let h = header(10, 20, Direction::Asc);
        assert!(affects(Some(&h), &SortChange::Inserted(5)));
        assert!(affects(Some(&h), &SortChange::Inserted(15)));
        assert!(affects(Some(&h), &SortChange::Inserted(20)));
        assert!(!affects(Some(&h), &SortChange::Inserted(25)));
    }

    #[test]
    fn offset_mode_incomplete_page_is_always_affected_by_growth() {
        let mut h = header(10, 20, Direction::Asc);
        h.incomplete = true;
        assert!(affects(Some(&h), &SortChange::Inserted(25)));
    }

    #[test]
    fn cursor_mode_is_localized_to_page_bounds() {
        let h = header(10, 20, Direction::Asc);
        assert!(!affects(
            Some(&ListBoundsHeader {
                cursor_paginated: true,
                ..h
            }),
            &SortChange::Inserted(5)
        ));
        assert!(affects(
            Some(&ListBoundsHeader {
                cursor_paginated: true,
                ..h
            }),
            &SortChange::Inserted(15)
        ));
        assert!(!affects(
            Some(&ListBoundsHeader {
                cursor_paginated: true,
                ..h
            }),
            &SortChange::Inserted(25)
        ));
    }

    #[test]
    fn cursor_mode_first_page_reacts_to_leading_inserts() {
        let h = ListBoundsHeader {
            cursor_paginated: true,
            is_first_page: true,
            ..header(10, 20, Direction::Asc)
        };
        assert!(affects(Some(&h), &SortChange::Inserted(1)));
    }

    #[test]
    fn cursor_mode_incomplete_page_reacts_to_trailing_inserts() {
        let h = ListBoundsHeader {
            cursor_paginated: true,
            incomplete: true,
            ..header(10, 20, Direction::Asc)
        };
        assert!(affects(Some(&h), &SortChange::Inserted(100)));
    }

    #[test]
    fn descending_sort_mirrors_ascending_decision() {
        let h = header(20, 10, Direction::Desc);
        assert!(affects(Some(&h), &SortChange::Inserted(25)));
        assert!(affects(Some(&h), &SortChange::Inserted(15)));
        assert!(!affects(Some(&h), &SortChange::Inserted(5)));
    }

    #[test]
    fn offset_update_affects_when_change_range_intersects_page_range() {
        let h = header(10, 20, Direction::Asc);
        assert!(affects(
            Some(&h),
            &SortChange::Updated { old: 5, new: 999 }
        ));
        assert!(!affects(
            Some(&h),
            &SortChange::Updated {
                old: 999,
                new: 998
            }
        ));
    }

    #[test]
    fn offset_update_does_not_cascade_when_ranges_are_disjoint() {
        // Desc offset pages [10..8], [7..5], [4..2]: an update from 100 to
        // 101 never intersects any page's range, so none are affected, even
        // though a single-value cascade on 100 alone would say otherwise.
        let page1 = header(10, 8, Direction::Desc);
        let page2 = header(7, 5, Direction::Desc);
        let page3 = header(4, 2, Direction::Desc);
        let change = SortChange::Updated { old: 100, new: 101 };
        assert!(!affects(Some(&page1), &change));
        assert!(!affects(Some(&page2), &change));
        assert!(!affects(Some(&page3), &change));
    }

    #[test]
    fn offset_update_incomplete_page_is_always_affected() {
        let mut h = header(10, 20, Direction::Asc);
        h.incomplete = true;
        assert!(affects(
            Some(&h),
            &SortChange::Updated { old: 100, new: 101 }
        ));
    }

    #[test]
    fn cursor_update_affects_if_either_endpoint_affects() {
        let h = ListBoundsHeader {
            cursor_paginated: true,
            ..header(10, 20, Direction::Asc)
        };
        // old sits inside the page, new is far outside it: the old-side
        // single-value predicate alone should be enough to trigger.
        assert!(affects(
            Some(&h),
            &SortChange::Updated { old: 15, new: 999 }
        ));
        // neither endpoint falls inside or at an open edge.
        assert!(!affects(
            Some(&h),
            &SortChange::Updated {
                old: 999,
                new: 998
            }
        ));
    }

    #[test]
    fn middle_page_offset_mode_unaffected_by_far_future_insert() {
        let h = header(10, 20, Direction::Asc);
        assert!(!affects(Some(&h), &SortChange::Deleted(1000)));
    }
}
