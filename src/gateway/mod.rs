//! HTTP gateway: routing, bearer auth, error rendering and graceful shutdown.

pub mod handlers;
pub mod state;
pub mod types;


use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::auth::jwt_auth_middleware;
use crate::config::GatewayConfig;
pub use state::AppState;

/// Build the full `/api/v1` router
pub fn build_router(state: Arc<AppState>) -> Router {
    // ==========================================================================
    // Fiat Routes
    // ==========================================================================
    let fiat_routes = Router::new()
        .route("/open", post(handlers::open_fiat))
        .route("/deposit", post(handlers::deposit))
        .route("/exchange/offer", post(handlers::fiat_offer))
        .route("/exchange/transfer", post(handlers::fiat_transfer))
        .route("/info/balance", get(handlers::fiat_balances))
        .route("/info/balance/{code}", get(handlers::fiat_balance))
        .route("/info/transaction/{id}", get(handlers::fiat_transaction))
        .route("/info/transaction/all/{code}", get(handlers::fiat_transactions))
        .route("/info/transaction/all/{code}/", get(handlers::fiat_transactions));

    // ==========================================================================
    // Crypto Routes
    // ==========================================================================
    let crypto_routes = Router::new()
        .route("/open", post(handlers::open_crypto))
        .route("/offer", post(handlers::crypto_offer))
        .route("/exchange", post(handlers::crypto_exchange))
        .route("/info/balance", get(handlers::crypto_balances))
        .route("/info/balance/{ticker}", get(handlers::crypto_balance))
        .route("/info/transaction/{id}", get(handlers::crypto_transaction))
        .route("/info/transaction/all/{ticker}", get(handlers::crypto_transactions))
        .route("/info/transaction/all/{ticker}/", get(handlers::crypto_transactions));

    // Every route except /health needs a bearer token
    let private_routes = Router::new()
        .nest("/fiat", fiat_routes)
        .nest("/crypto", crypto_routes)
        .layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    Router::new()
        .route("/api/v1/health", get(handlers::health_check))
        .nest("/api/v1", private_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until SIGINT/SIGTERM, then give in-flight requests
/// `shutdown_delay_secs` to finish.
pub async fn run_server(config: &GatewayConfig, state: Arc<AppState>) -> std::io::Result<()> {
    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        tracing::error!("[GATEWAY] failed to bind {}: {}", addr, e);
        e
    })?;
    tracing::info!("[GATEWAY] listening on http://{}", addr);

    let (stop_tx, mut stop_rx) = tokio::sync::watch::channel(false);
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        let _ = stop_tx.send(true);
    });

    let drain = Duration::from_secs(config.shutdown_delay_secs);
    let drain_deadline = async move {
        if stop_rx.changed().await.is_ok() {
            tokio::time::sleep(drain).await;
        } else {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        result = server => {
            tracing::info!("[GATEWAY] stopped");
            result
        }
        _ = drain_deadline => {
            tracing::warn!("[GATEWAY] drain period of {:?} elapsed, dropping open connections", drain);
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("[GATEWAY] failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("[GATEWAY] failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("[GATEWAY] shutdown signal received");
}
