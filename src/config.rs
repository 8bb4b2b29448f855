use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub gateway: GatewayConfig,
    pub postgres: PostgresConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    pub auth: AuthConfig,
    pub quotes: QuotesConfig,
    #[serde(default)]
    pub exchange: ExchangeConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Grace period for in-flight requests after a shutdown signal
    #[serde(default = "default_shutdown_delay")]
    pub shutdown_delay_secs: u64,
}

fn default_shutdown_delay() -> u64 {
    10
}

/// PostgreSQL pool and deadline settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PostgresConfig {
    pub url: String,
    pub min_connections: u32,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub health_check_period_secs: u64,
    pub query_timeout_secs: u64,
    pub transaction_timeout_secs: u64,
    #[serde(default)]
    pub lazy_connect: bool,
    #[serde(default)]
    pub run_migrations: bool,
}

impl PostgresConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn transaction_timeout(&self) -> Duration {
        Duration::from_secs(self.transaction_timeout_secs)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Redis,
    Memory,
}

/// Offer cache settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    pub url: String,
    pub max_size: usize,
    pub wait_timeout_secs: u64,
    pub create_timeout_secs: u64,
    pub recycle_timeout_secs: u64,
    /// Deadline for one cache operation, connection checkout included
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
}

fn default_command_timeout_ms() -> u64 {
    1000
}

impl CacheConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Redis,
            url: "redis://127.0.0.1:6379".to_string(),
            max_size: 16,
            wait_timeout_secs: 2,
            create_timeout_secs: 2,
            recycle_timeout_secs: 2,
            command_timeout_ms: default_command_timeout_ms(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuthConfig {
    /// HMAC secret used to verify client JWTs
    pub jwt_key: String,
    #[serde(default)]
    pub jwt_issuer: Option<String>,
    /// Base64 encoded 256-bit key for offer ids and page cursors
    pub token_key: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct QuotesConfig {
    pub fiat: QuoteEndpointConfig,
    pub crypto: QuoteEndpointConfig,
    pub timeout_secs: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct QuoteEndpointConfig {
    pub endpoint: String,
    pub header_key: String,
    pub api_key: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ExchangeConfig {
    pub offer_ttl_secs: u64,
    pub clock_skew_secs: u64,
    pub default_page_size: i64,
    pub max_page_size: i64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            offer_ttl_secs: 120,
            clock_skew_secs: 2,
            default_page_size: 10,
            max_page_size: 100,
        }
    }
}

impl ExchangeConfig {
    pub fn offer_ttl(&self) -> Duration {
        Duration::from_secs(self.offer_ttl_secs)
    }

    pub fn clock_skew(&self) -> Duration {
        Duration::from_secs(self.clock_skew_secs)
    }
}

impl AppConfig {
    pub fn load(env: &str) -> anyhow::Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        Self::from_yaml(&content).with_context(|| format!("Invalid config file: {}", config_path))
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let config: AppConfig =
            serde_yaml::from_str(content).context("Failed to parse config yaml")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject pool and key settings the ledger cannot run safely with
    pub fn validate(&self) -> anyhow::Result<()> {
        let pg = &self.postgres;
        if pg.min_connections < 4 || pg.max_connections < 4 {
            bail!("postgres pool must hold at least 4 connections");
        }
        if pg.min_connections > pg.max_connections {
            bail!("postgres min_connections exceeds max_connections");
        }
        if pg.health_check_period_secs < 5 {
            bail!("postgres health_check_period_secs must be at least 5");
        }
        if pg.query_timeout_secs == 0 || pg.transaction_timeout_secs == 0 {
            bail!("postgres timeouts must be non-zero");
        }
        if self.cache.max_size == 0 {
            bail!("cache max_size must be non-zero");
        }
        if self.cache.command_timeout_ms == 0 {
            bail!("cache command_timeout_ms must be non-zero");
        }
        if self.exchange.offer_ttl_secs == 0 {
            bail!("exchange offer_ttl_secs must be non-zero");
        }
        if self.exchange.default_page_size <= 0
            || self.exchange.max_page_size < self.exchange.default_page_size
        {
            bail!("exchange page sizes are inconsistent");
        }
        crate::auth::TokenCodec::from_base64_key(&self.auth.token_key)
            .context("auth token_key must be 32 bytes of base64")?;
        Ok(())
    }
}
