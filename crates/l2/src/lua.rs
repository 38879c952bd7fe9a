//! Lua source for the server-side scripts (spec.md §4.5/§6). Each runs as a
//! single atomic round trip via `redis::Script`; `invalidate_pattern_safe`
//! is deliberately not one of these (see `invalidator.rs`) since scanning
//! the keyspace inside a Lua script blocks the server the same way a bare
//! `KEYS` command would — the safe version instead composes the
//! non-blocking `SCAN` primitive from Rust across multiple round trips.

/// `KEYS[1]` = group tracking-set key, `KEYS[2]` = groups master-set key.
/// `ARGV[1]` = page key prefix (e.g. `"repo:dlist:p:"`), `ARGV[2]` = this
/// group's hex id. Deletes every page in the group, the tracking set
/// itself, and removes the group from the master set.
pub const INVALIDATE_GROUP: &str = r#"
local members = redis.call('SMEMBERS', KEYS[1])
for i, m in ipairs(members) do
    redis.call('DEL', ARGV[1] .. m)
end
redis.call('DEL', KEYS[1])
redis.call('SREM', KEYS[2], ARGV[2])
return members
"#;

/// `KEYS[1]` = group tracking-set key. `ARGV[1]` = page key prefix,
/// `ARGV[2..]` = the specific page hex ids to drop (already selected by
/// the Rust-side Range Predicate against each page's header). Deletes only
/// those pages and removes only those members from the tracking set,
/// leaving the rest of the group's pages cached.
pub const INVALIDATE_GROUP_SELECTIVE: &str = r#"
local prefix = ARGV[1]
local n = 0
for i = 2, #ARGV do
    redis.call('DEL', prefix .. ARGV[i])
    redis.call('SREM', KEYS[1], ARGV[i])
    n = n + 1
end
return n
"#;

/// Identical shape to `INVALIDATE_GROUP_SELECTIVE`; kept as a distinctly
/// named script because the caller's selection step differs (an update's
/// old/new value pair, rather than a single insert/delete value) even
/// though the atomic server-side operation it performs is the same.
pub const INVALIDATE_GROUP_SELECTIVE_UPDATE: &str = INVALIDATE_GROUP_SELECTIVE;

/// `KEYS[1]` = groups master-set key. `ARGV[1]` = page key prefix,
/// `ARGV[2]` = group key prefix. Walks every tracked group, deleting all of
/// its pages and the group's own tracking set, then clears the master set.
pub const INVALIDATE_ALL_LIST_GROUPS: &str = r#"
local groups = redis.call('SMEMBERS', KEYS[1])
local total = 0
for i, g in ipairs(groups) do
    local gkey = ARGV[2] .. g
    local members = redis.call('SMEMBERS', gkey)
    for j, m in ipairs(members) do
        redis.call('DEL', ARGV[1] .. m)
        total = total + 1
    end
    redis.call('DEL', gkey)
end
redis.call('DEL', KEYS[1])
return total
"#;
