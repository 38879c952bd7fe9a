//! Real `RemoteStore` implementation on top of the `redis` crate, the way
//! `harborgrid-justin-caddy`'s `database::cache::CacheManager` wraps its L3
//! tier around `redis::aio::ConnectionManager` and `redis::cmd`.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use listcache_common::{CacheError, RemoteStore};

use crate::lua::{
    INVALIDATE_ALL_LIST_GROUPS, INVALIDATE_GROUP, INVALIDATE_GROUP_SELECTIVE,
    INVALIDATE_GROUP_SELECTIVE_UPDATE,
};

pub struct RedisRemoteStore {
    conn: ConnectionManager,
}

impl RedisRemoteStore {
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client =
            redis::Client::open(url).map_err(|e| CacheError::Transient(e.to_string()))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| CacheError::Transient(e.to_string()))?;
        Ok(RedisRemoteStore { conn })
    }

    fn script_source(name: &str) -> Result<&'static str, CacheError> {
        match name {
            "invalidate_group" => Ok(INVALIDATE_GROUP),
            "invalidate_group_selective" => Ok(INVALIDATE_GROUP_SELECTIVE),
            "invalidate_group_selective_update" => Ok(INVALIDATE_GROUP_SELECTIVE_UPDATE),
            "invalidate_all_list_groups" => Ok(INVALIDATE_ALL_LIST_GROUPS),
            other => Err(CacheError::Transient(format!("unknown script: {other}"))),
        }
    }
}

#[async_trait]
impl RemoteStore for RedisRemoteStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.conn.clone();
        conn.get(key)
            .await
            .map_err(|e| CacheError::Transient(e.to_string()))
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.set(key, value)
            .await
            .map_err(|e| CacheError::Transient(e.to_string()))
    }

    async fn setex(&self, key: &str, value: &[u8], ttl_secs: u64) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.set_ex(key, value, ttl_secs)
            .await
            .map_err(|e| CacheError::Transient(e.to_string()))
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.expire(key, ttl_secs as i64)
            .await
            .map_err(|e| CacheError::Transient(e.to_string()))
    }

    async fn expire_nx(&self, key: &str, ttl_secs: u64) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        redis::cmd("EXPIRE")
            .arg(key)
            .arg(ttl_secs)
            .arg("NX")
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::Transient(e.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.del(key)
            .await
            .map_err(|e| CacheError::Transient(e.to_string()))
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.sadd(key, member)
            .await
            .map_err(|e| CacheError::Transient(e.to_string()))
    }

    async fn srem(&self, key: &str, member: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.srem(key, member)
            .await
            .map_err(|e| CacheError::Transient(e.to_string()))
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, CacheError> {
        let mut conn = self.conn.clone();
        conn.smembers(key)
            .await
            .map_err(|e| CacheError::Transient(e.to_string()))
    }

    async fn getrange(&self, key: &str, start: isize, end: isize) -> Result<Vec<u8>, CacheError> {
        let mut conn = self.conn.clone();
        conn.getrange(key, start, end)
            .await
            .map_err(|e| CacheError::Transient(e.to_string()))
    }

    async fn scan(
        &self,
        cursor: u64,
        pattern: &str,
        count: usize,
    ) -> Result<(u64, Vec<String>), CacheError> {
        let mut conn = self.conn.clone();
        let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(count)
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::Transient(e.to_string()))?;
        Ok((next, keys))
    }

    async fn run_script(
        &self,
        name: &str,
        keys: &[&str],
        args: &[&str],
    ) -> Result<Vec<String>, CacheError> {
        let source = Self::script_source(name)?;
        let mut invocation = redis::Script::new(source).prepare_invoke();
        for k in keys {
            invocation.key(*k);
        }
        for a in args {
            invocation.arg(*a);
        }
        let mut conn = self.conn.clone();
        let result: redis::Value = invocation
            .invoke_async(&mut conn)
            .await
            .map_err(|e| CacheError::Transient(e.to_string()))?;
        Ok(value_to_strings(result))
    }
}

fn value_to_strings(value: redis::Value) -> Vec<String> {
    match value {
        redis::Value::Bulk(items) => items.into_iter().flat_map(value_to_strings).collect(),
        redis::Value::Data(bytes) => vec![String::from_utf8_lossy(&bytes).into_owned()],
        redis::Value::Int(n) => vec![n.to_string()],
        redis::Value::Status(s) => vec![s],
        redis::Value::Okay => vec!["OK".to_string()],
        redis::Value::Nil => vec![],
    }
}
