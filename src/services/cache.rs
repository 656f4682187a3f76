//! Redis cache for raw analysis responses.
//!
//! Only text-only analyses are cached, keyed by model and a digest of the
//! sanitized text. Redis failures degrade to a cache miss.

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

use super::ResultCache;

/// Redis cache client with connection pooling.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
    default_ttl: Duration,
}

impl RedisCache {
    pub async fn new(redis_url: &str, default_ttl_seconds: u64) -> Result<Self> {
        let client = redis::Client::open(redis_url).context("Failed to create Redis client")?;

        let conn = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;

        tracing::info!("Redis cache connected");

        Ok(Self {
            conn,
            default_ttl: Duration::from_secs(default_ttl_seconds),
        })
    }

    pub async fn health_check(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .context("Redis health check failed")?;
        Ok(())
    }
}

#[async_trait]
impl ResultCache for RedisCache {
    #[instrument(skip(self), fields(cache_hit))]
    async fn get_raw(&self, key: &str) -> Option<Value> {
        let mut conn = self.conn.clone();

        let hit = match conn.get::<_, Option<String>>(key).await {
            Ok(Some(data)) => match serde_json::from_str(&data) {
                Ok(value) => {
                    debug!(key = key, "Cache hit");
                    Some(value)
                }
                Err(e) => {
                    warn!(key = key, error = %e, "Failed to deserialize cached value");
                    None
                }
            },
            Ok(None) => {
                debug!(key = key, "Cache miss");
                None
            }
            Err(e) => {
                error!(key = key, error = %e, "Redis get error");
                None
            }
        };

        tracing::Span::current().record("cache_hit", hit.is_some());
        hit
    }

    #[instrument(skip(self, value))]
    async fn put_raw(&self, key: &str, value: &Value) {
        let mut conn = self.conn.clone();
        let ttl = self.default_ttl.as_secs();

        match conn.set_ex::<_, _, ()>(key, value.to_string(), ttl).await {
            Ok(()) => debug!(key = key, ttl_secs = ttl, "Cached analysis"),
            Err(e) => warn!(key = key, error = %e, "Failed to cache analysis"),
        }
    }

    async fn health_check(&self) -> Result<()> {
        RedisCache::health_check(self).await
    }
}
