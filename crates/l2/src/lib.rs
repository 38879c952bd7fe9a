//! L2 tracking sets and server-side invalidation scripts (spec.md §4.5,
//! §6).

mod constants;
mod in_memory;
mod invalidator;
mod lua;
mod redis_store;

pub use constants::{group_key, groups_set_key, page_key};
pub use in_memory::InMemoryRemoteStore;
pub use invalidator::L2Invalidator;
pub use redis_store::RedisRemoteStore;
