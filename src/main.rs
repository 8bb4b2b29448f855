//! Exchange Ledger server
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌──────────┐
//! │ Gateway  │───▶│ Services │───▶│ Postgres │
//! │  (axum)  │    │          │    └──────────┘
//! └──────────┘    │          │───▶ offer cache
//!                 │          │───▶ quote APIs
//!                 └──────────┘
//! ```
//!
//! Usage: `exchange_ledger [--env dev] [--port 8080]`

use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

use exchange_ledger::accounts::AccountService;
use exchange_ledger::auth::{JwtAuth, TokenCodec};
use exchange_ledger::config::{AppConfig, CacheBackend};
use exchange_ledger::db::Database;
use exchange_ledger::exchange::ExchangeService;
use exchange_ledger::gateway::{self, AppState};
use exchange_ledger::ledger::PgLedger;
use exchange_ledger::offers::{MemoryOfferStore, OfferStore, RedisOfferStore};
use exchange_ledger::quotes::HttpQuoteProvider;

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let mut app_config = AppConfig::load(&env)?;
    if let Some(port) = get_port_override() {
        app_config.gateway.port = port;
    }
    let _log_guard = exchange_ledger::logging::init_logging(&app_config);

    tracing::info!("Starting Exchange Ledger in {} mode", env);

    // ==========================================================================
    // Database
    // ==========================================================================
    let db = Database::connect(&app_config.postgres)
        .await
        .context("Failed to connect to PostgreSQL")?;
    if app_config.postgres.run_migrations {
        db.migrate().await.context("Failed to apply migrations")?;
        tracing::info!("[DB] migrations applied");
    }
    let monitor = db.spawn_health_monitor(Duration::from_secs(
        app_config.postgres.health_check_period_secs,
    ));

    // ==========================================================================
    // Offer cache
    // ==========================================================================
    let (offers, redis): (Arc<dyn OfferStore>, Option<Arc<RedisOfferStore>>) =
        match app_config.cache.backend {
            CacheBackend::Redis => {
                let store = Arc::new(
                    RedisOfferStore::new(&app_config.cache)
                        .context("Failed to create Redis pool")?,
                );
                let shared: Arc<dyn OfferStore> = store.clone();
                (shared, Some(store))
            }
            CacheBackend::Memory => {
                tracing::warn!("[CACHE] in-process offer store, offers are not shared between nodes");
                (Arc::new(MemoryOfferStore::new()) as Arc<dyn OfferStore>, None)
            }
        };

    // ==========================================================================
    // Services
    // ==========================================================================
    let codec = TokenCodec::from_base64_key(&app_config.auth.token_key)
        .context("Invalid auth.token_key")?;
    let jwt = Arc::new(JwtAuth::new(&app_config.auth));
    let quotes = Arc::new(
        HttpQuoteProvider::new(&app_config.quotes).context("Failed to build quote client")?,
    );
    let ledger = Arc::new(PgLedger::new(&db, &app_config.postgres));

    let accounts = Arc::new(AccountService::new(
        ledger.clone(),
        codec.clone(),
        &app_config.exchange,
    ));
    let exchange = Arc::new(ExchangeService::new(
        ledger.clone(),
        offers.clone(),
        quotes,
        codec,
        &app_config.exchange,
    ));
    let state = Arc::new(AppState::new(jwt, accounts, exchange, ledger, offers));

    // ==========================================================================
    // Serve, then close HTTP → cache → database
    // ==========================================================================
    let served = gateway::run_server(&app_config.gateway, state).await;

    if let Some(redis) = redis {
        redis.close();
        tracing::info!("[CACHE] pool closed");
    }
    monitor.abort();
    db.close().await;
    tracing::info!("[DB] pool closed");

    served.context("Gateway server error")
}
