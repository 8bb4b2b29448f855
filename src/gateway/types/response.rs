//! API response envelope and error rendering
//!
//! - `ApiResponse<T>`: `{message, payload}` wrapper for every success
//! - `Links`: next-page pointers on paginated payloads
//! - `IntoResponse` for [`ExchangeError`]: `{message, payload?}` with the kind's status

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;

use crate::accounts::{BalancePage, TransactionPage};
use crate::error::{ErrorKind, ExchangeError};
use crate::ledger::{AccountSnapshot, JournalEntry};

// ============================================================================
// Unified API Response Format
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub message: String,
    pub payload: T,
}

impl<T> ApiResponse<T> {
    pub fn new(message: impl Into<String>, payload: T) -> Self {
        Self {
            message: message.into(),
            payload,
        }
    }
}

/// Handler result: 200 with the envelope, or a rendered [`ExchangeError`]
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ExchangeError>;

/// 200 response helper
pub fn ok<T>(message: &str, payload: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::new(message, payload)))
}

// ============================================================================
// Pagination
// ============================================================================

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Links {
    /// Query suffix for the REST client
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_cursor: Option<String>,
}

impl Links {
    pub fn new(next_cursor: Option<String>, page_size: i64) -> Self {
        match next_cursor {
            Some(cursor) => Self {
                next_page: Some(format!(
                    "?pageCursor={}&pageSize={}",
                    cursor.replace('=', "%3D"),
                    page_size
                )),
                page_cursor: Some(cursor),
            },
            None => Self::default(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalancesPayload {
    pub account_balances: Vec<AccountSnapshot>,
    pub links: Links,
}

impl From<BalancePage> for BalancesPayload {
    fn from(page: BalancePage) -> Self {
        Self {
            links: Links::new(page.next_cursor, page.page_size),
            account_balances: page.account_balances,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsPayload {
    pub transaction_details: Vec<JournalEntry>,
    pub links: Links,
}

impl From<TransactionPage> for TransactionsPayload {
    fn from(page: TransactionPage) -> Self {
        Self {
            links: Links::new(page.next_cursor, page.page_size),
            transaction_details: page.transaction_details,
        }
    }
}

// ============================================================================
// Error Rendering
// ============================================================================

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<Value>,
}

impl IntoResponse for ExchangeError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if self.kind == ErrorKind::Internal || self.kind.is_retryable() {
            tracing::warn!(kind = self.kind.name(), status = status.as_u16(), "[GATEWAY] {}", self.message);
        }
        let body = ErrorBody {
            message: self.message,
            payload: self.payload,
        };
        (status, Json(body)).into_response()
    }
}
