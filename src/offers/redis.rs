//! Redis-backed offer store over a deadpool connection pool.

use async_trait::async_trait;
use deadpool_redis::redis;
use deadpool_redis::{Config, Pool, PoolConfig, Runtime, Timeouts};
use std::future::Future;
use std::time::Duration;

use super::{CacheError, Offer, OfferStore};
use crate::config::CacheConfig;

const KEY_PREFIX: &str = "offer:";

fn offer_key(offer_id: &str) -> String {
    format!("{}{}", KEY_PREFIX, offer_id)
}

pub struct RedisOfferStore {
    pool: Pool,
    command_timeout: Duration,
}

/// Bound one cache operation; on expiry the future is dropped and the
/// operation's error variant is returned.
async fn with_deadline<T, F>(
    deadline: Duration,
    on_timeout: fn(String) -> CacheError,
    fut: F,
) -> Result<T, CacheError>
where
    F: Future<Output = Result<T, CacheError>>,
{
    tokio::time::timeout(deadline, fut)
        .await
        .map_err(|_| on_timeout(format!("timed out after {:?}", deadline)))?
}

impl RedisOfferStore {
    /// Build the pool; connections are opened on first use
    pub fn new(config: &CacheConfig) -> Result<Self, CacheError> {
        let mut cfg = Config::from_url(config.url.clone());
        let mut pool_config = PoolConfig::new(config.max_size);
        pool_config.timeouts = Timeouts {
            wait: Some(Duration::from_secs(config.wait_timeout_secs)),
            create: Some(Duration::from_secs(config.create_timeout_secs)),
            recycle: Some(Duration::from_secs(config.recycle_timeout_secs)),
        };
        cfg.pool = Some(pool_config);

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| CacheError::Unknown(format!("failed to create pool: {}", e)))?;

        tracing::info!(
            url = %config.url,
            max_size = config.max_size,
            command_timeout_ms = config.command_timeout_ms,
            "offer cache pool created"
        );
        Ok(Self {
            pool,
            command_timeout: config.command_timeout(),
        })
    }

    async fn connection(&self) -> Result<deadpool_redis::Connection, CacheError> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::Unknown(format!("failed to get connection: {}", e)))
    }

    pub fn close(&self) {
        self.pool.close();
    }
}

#[async_trait]
impl OfferStore for RedisOfferStore {
    async fn put(&self, offer_id: &str, offer: &Offer, ttl: Duration) -> Result<(), CacheError> {
        let value = serde_json::to_string(offer).map_err(|e| CacheError::Set(e.to_string()))?;
        let millis = ttl.as_millis().max(1) as u64;

        with_deadline(self.command_timeout, CacheError::Set, async {
            let mut conn = self
                .connection()
                .await
                .map_err(|e| CacheError::Set(e.to_string()))?;
            redis::cmd("SET")
                .arg(offer_key(offer_id))
                .arg(value)
                .arg("PX")
                .arg(millis)
                .query_async::<()>(&mut conn)
                .await
                .map_err(|e| CacheError::Set(e.to_string()))
        })
        .await
    }

    async fn get(&self, offer_id: &str) -> Result<Offer, CacheError> {
        let value: Option<String> = with_deadline(self.command_timeout, CacheError::Unknown, async {
            let mut conn = self.connection().await?;
            redis::cmd("GET")
                .arg(offer_key(offer_id))
                .query_async(&mut conn)
                .await
                .map_err(|e| CacheError::Unknown(e.to_string()))
        })
        .await?;

        let value = value.ok_or(CacheError::Miss)?;
        serde_json::from_str(&value).map_err(|e| CacheError::Unknown(format!("corrupt offer: {}", e)))
    }

    async fn del(&self, offer_id: &str) -> Result<(), CacheError> {
        let deleted: i64 = with_deadline(self.command_timeout, CacheError::Del, async {
            let mut conn = self
                .connection()
                .await
                .map_err(|e| CacheError::Del(e.to_string()))?;
            redis::cmd("DEL")
                .arg(offer_key(offer_id))
                .query_async(&mut conn)
                .await
                .map_err(|e| CacheError::Del(e.to_string()))
        })
        .await?;

        if deleted == 0 {
            Err(CacheError::Miss)
        } else {
            Ok(())
        }
    }

    async fn health_check(&self) -> Result<(), CacheError> {
        let pong: String = with_deadline(self.command_timeout, CacheError::Unknown, async {
            let mut conn = self.connection().await?;
            redis::cmd("PING")
                .query_async(&mut conn)
                .await
                .map_err(|e| CacheError::Unknown(e.to_string()))
        })
        .await?;
        if pong == "PONG" {
            Ok(())
        } else {
            Err(CacheError::Unknown(format!("unexpected ping reply {}", pong)))
        }
    }
}
