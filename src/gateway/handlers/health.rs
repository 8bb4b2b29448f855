//! Health check handler

use std::sync::Arc;
use std::time::Duration;

use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;

use super::super::state::AppState;
use super::super::types::ApiResponse;

const PING_TIMEOUT: Duration = Duration::from_secs(2);

/// Health check response data
#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Server timestamp in milliseconds
    pub timestamp_ms: i64,
}

/// Health check endpoint
///
/// Pings the ledger database and the offer cache. Which dependency failed
/// is logged, never returned.
///
/// - Healthy: 200 OK + {message: "ok", payload: {timestampMs}}
/// - Unhealthy: 503 Service Unavailable + {message: "unavailable", ...}
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ApiResponse<HealthResponse>>) {
    let (ledger, cache) = tokio::join!(
        tokio::time::timeout(PING_TIMEOUT, state.ledger.health_check()),
        tokio::time::timeout(PING_TIMEOUT, state.offers.health_check()),
    );

    let ledger_ok = match ledger {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            tracing::error!("[HEALTH] database ping failed: {}", e);
            false
        }
        Err(_) => {
            tracing::error!("[HEALTH] database ping timed out");
            false
        }
    };
    let cache_ok = match cache {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            tracing::error!("[HEALTH] offer cache ping failed: {}", e);
            false
        }
        Err(_) => {
            tracing::error!("[HEALTH] offer cache ping timed out");
            false
        }
    };

    let payload = HealthResponse {
        timestamp_ms: Utc::now().timestamp_millis(),
    };
    if ledger_ok && cache_ok {
        (StatusCode::OK, Json(ApiResponse::new("ok", payload)))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::new("unavailable", payload)),
        )
    }
}
