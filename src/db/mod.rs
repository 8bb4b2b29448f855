//! Database connection management

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::config::PostgresConfig;

/// PostgreSQL database connection pool
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create the pool. With `lazy_connect` no connection is opened until first use.
    pub async fn connect(config: &PostgresConfig) -> Result<Self, sqlx::Error> {
        let options = PgPoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .test_before_acquire(true);

        let pool = if config.lazy_connect {
            options.connect_lazy(&config.url)?
        } else {
            options.connect(&config.url).await?
        };

        tracing::info!(
            min = config.min_connections,
            max = config.max_connections,
            lazy = config.lazy_connect,
            "PostgreSQL connection pool established"
        );
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Apply `migrations/` in order
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    /// Ping the pool every `period` and log failures until the pool is closed
    pub fn spawn_health_monitor(&self, period: Duration) -> JoinHandle<()> {
        let db = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if db.pool.is_closed() {
                    break;
                }
                if let Err(e) = db.health_check().await {
                    tracing::error!(error = %e, "[DB] health check failed");
                }
            }
        })
    }

    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("PostgreSQL connection pool closed");
    }
}
