//! Shared types and collaborator traits for the list-query cache
//! invalidation engine. Every other crate in the workspace depends on this
//! one; it depends on nothing but `thiserror` and `async-trait`.

mod error;
mod traits;
mod types;

pub use error::CacheError;
pub use traits::{CursorCodec, Database, RemoteStore};
pub use types::{
    Comparison, Descriptor, Direction, EntityId, FilterDecl, FilterValue, Query, QueryPlan,
    ResolvedFilter, Row, SortBounds, SortDecl, SortValue,
};
