//! Key/value cache port with TTL, used to accelerate token introspection.
//!
//! Cache failures are never fatal: every error is logged and the caller
//! proceeds as if the lookup missed, falling back to the database.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use redis::AsyncCommands;

/// Key/value store with per-key TTL.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn set(&self, key: &str, value: &str, ttl_secs: u64);
    async fn delete(&self, key: &str);
}

/// Redis-backed cache shared across server instances.
#[derive(Clone)]
pub struct RedisCache {
    client: redis::Client,
}

impl RedisCache {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    pub fn from_url(url: &str) -> Result<Self, redis::RedisError> {
        Ok(Self::new(redis::Client::open(url)?))
    }

    async fn connection(&self) -> Option<redis::aio::MultiplexedConnection> {
        match self.client.get_multiplexed_async_connection().await {
            Ok(conn) => Some(conn),
            Err(e) => {
                tracing::warn!(error = %e, "failed to get Redis connection");
                None
            }
        }
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Option<String> {
        let mut conn = self.connection().await?;

        match conn.get::<_, Option<String>>(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "cache get failed, treating as miss");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) {
        let Some(mut conn) = self.connection().await else {
            return;
        };

        if let Err(e) = conn.set_ex::<_, _, ()>(key, value, ttl_secs).await {
            tracing::warn!(error = %e, key = %key, "cache set failed");
        }
    }

    async fn delete(&self, key: &str) {
        let Some(mut conn) = self.connection().await else {
            return;
        };

        if let Err(e) = conn.del::<_, ()>(key).await {
            tracing::warn!(error = %e, key = %key, "cache delete failed");
        }
    }
}

/// Process-local cache used by tests.
#[derive(Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, (String, DateTime<Utc>)>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().unwrap();
        let (value, expires_at) = entries.get(key)?;
        if Utc::now() > *expires_at {
            return None;
        }
        Some(value.clone())
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) {
        let expires_at = Utc::now() + Duration::seconds(ttl_secs as i64);
        self.entries
            .write()
            .unwrap()
            .insert(key.to_string(), (value.to_string(), expires_at));
    }

    async fn delete(&self, key: &str) {
        self.entries.write().unwrap().remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let cache = InMemoryCache::new();

        cache.set("k", "1", 60).await;
        assert_eq!(cache.get("k").await.as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let cache = InMemoryCache::new();

        cache.set("k", "1", 60).await;
        cache.delete("k").await;
        assert!(cache.get("k").await.is_none());
    }

    #[tokio::test]
    async fn expired_entries_miss() {
        let cache = InMemoryCache::new();

        cache.set("k", "1", 0).await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        assert!(cache.get("k").await.is_none());
    }
}
