use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Every sort field is castable to a signed 64-bit value; this is the only
/// numeric type the invalidation engine reasons about.
pub type SortValue = i64;

/// Opaque entity identifier. The cache never interprets this beyond using it
/// as a map key for write-side notifications.
pub type EntityId = i64;

/// Sort direction for a query or a declared sort field's default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn is_desc(self) -> bool {
        matches!(self, Direction::Desc)
    }

    pub fn from_flag(desc: bool) -> Self {
        if desc {
            Direction::Desc
        } else {
            Direction::Asc
        }
    }
}

/// Fixed small vocabulary of comparisons a declared filter may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

/// A concrete filter value supplied by a query or read off an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterValue {
    Int(i64),
    Text(String),
    Bool(bool),
}

/// Compile-time declaration of one filter field on a descriptor.
#[derive(Debug, Clone, Copy)]
pub struct FilterDecl {
    pub name: &'static str,
    pub comparison: Comparison,
    pub required: bool,
}

/// Compile-time declaration of one sort field on a descriptor.
#[derive(Debug, Clone, Copy)]
pub struct SortDecl {
    pub name: &'static str,
    pub default_direction: Direction,
    pub column: &'static str,
}

/// Compile-time declaration bound to an entity type (spec.md §3).
///
/// Implementations are typically zero-sized marker types; the hot lookup
/// path never dispatches through `dyn Descriptor` (per Design Notes §9 —
/// "avoid per-call virtual dispatch inside the hot lookup path").
pub trait Descriptor {
    type Entity;

    /// Declared filters, in a fixed declaration order.
    fn filters() -> &'static [FilterDecl];

    /// Declared sorts, in a fixed declaration order. At least one.
    fn sorts() -> &'static [SortDecl];

    /// Repository namespace used for L2 key prefixes (`"<repo>:dlist:..."`).
    fn repo_name() -> &'static str;

    /// Extract the entity's identifier.
    fn entity_id(entity: &Self::Entity) -> EntityId;

    /// Extract the entity's value for a declared filter, by index into
    /// `filters()`. `None` means the entity has no value for that filter.
    fn filter_value(entity: &Self::Entity, filter_index: usize) -> Option<FilterValue>;

    /// Extract the entity's value for a declared sort field, by index into
    /// `sorts()`, as a signed 64-bit value.
    fn sort_value(entity: &Self::Entity, sort_index: usize) -> SortValue;

    /// Reconstructs an entity from a `Database`-returned row. The cache
    /// itself never calls this on the hot path (a cached page stores
    /// `Row`s, not entities); the repository facade calls it once per row
    /// when handing a page back to its caller.
    fn from_row(row: &Row) -> Self::Entity;
}

/// A single list query: filters + sort + pagination (spec.md §3).
///
/// `cursor` and `offset` are mutually exclusive; cursor wins when both are
/// present (the builder and parser both enforce this at construction, so a
/// `Query` built through either path already reflects the resolved choice).
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// One slot per declared filter, in declaration order. `None` means the
    /// filter was not supplied for this query.
    pub filter_values: Vec<Option<FilterValue>>,
    /// `(sort field index, direction)`. `None` falls back to the
    /// descriptor's single default sort (required to exist per §3).
    pub sort: Option<(usize, Direction)>,
    /// Clamped to `[1, 100]` by whoever builds the query.
    pub limit: u16,
    /// Opaque cursor bytes (already decoded from base64 by the collaborator
    /// `CursorCodec`, if parsed from HTTP params).
    pub cursor: Option<Vec<u8>>,
    /// Ignored when `cursor` is `Some`.
    pub offset: u32,
}

impl Query {
    pub fn uses_cursor(&self) -> bool {
        self.cursor.is_some()
    }
}

/// First/last sort-field values observed on one concrete cached page
/// (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortBounds {
    pub first_value: SortValue,
    pub last_value: SortValue,
    /// `false` iff the page is empty — in that case no header is ever
    /// written to L2 (see `listcache-keys::header`).
    pub valid: bool,
}

impl SortBounds {
    pub fn empty() -> Self {
        SortBounds {
            first_value: 0,
            last_value: 0,
            valid: false,
        }
    }
}

/// A resolved plan handed to the `Database` collaborator: one concrete
/// filter value per declared filter (comparison taken from the descriptor),
/// a single resolved sort column/direction, and a concrete limit/offset.
/// Built by the facade from a `Query` plus a `Descriptor`'s declarations —
/// the `Database` impl never needs to consult the descriptor itself.
#[derive(Debug, Clone)]
pub struct QueryPlan {
    pub filters: Vec<ResolvedFilter>,
    pub sort_column: &'static str,
    pub direction: Direction,
    pub limit: u16,
    pub offset: u32,
    pub cursor: Option<Vec<u8>>,
}

/// One resolved filter clause: a column name, the comparison to apply, and
/// the value to compare against.
#[derive(Debug, Clone)]
pub struct ResolvedFilter {
    pub column: &'static str,
    pub comparison: Comparison,
    pub value: FilterValue,
}

/// An opaque row returned by the `Database` collaborator. The cache never
/// interprets columns beyond handing the row to the caller-supplied
/// extraction closures that build `Self::Entity` values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Row {
    pub columns: HashMap<String, FilterValue>,
}

impl fmt::Display for SortBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.valid {
            write!(f, "[{}..{}]", self.first_value, self.last_value)
        } else {
            write!(f, "[empty]")
        }
    }
}
