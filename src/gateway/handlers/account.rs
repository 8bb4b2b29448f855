//! Account handlers shared by the fiat and crypto routes

use std::sync::Arc;

use axum::{Json, http::StatusCode};
use serde_json::json;
use uuid::Uuid;

use super::super::state::AppState;
use super::super::types::{
    ApiResponse, ApiResult, BalancesPayload, BalancesQuery, OpenAccountRequest,
    TransactionsPayload, TransactionsQuery, ok,
};
use crate::auth::AuthenticatedClient;
use crate::error::ExchangeError;
use crate::ledger::{AccountSnapshot, JournalEntry};
use crate::money::AssetKind;

pub(crate) async fn open(
    state: Arc<AppState>,
    client: AuthenticatedClient,
    kind: AssetKind,
    req: OpenAccountRequest,
) -> Result<(StatusCode, Json<ApiResponse<(Uuid, String)>>), ExchangeError> {
    let opened = state
        .accounts
        .open_account(kind, client.client_id, &req.currency)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new("account created", opened)),
    ))
}

pub(crate) async fn balance(
    state: Arc<AppState>,
    client: AuthenticatedClient,
    kind: AssetKind,
    code: String,
) -> ApiResult<AccountSnapshot> {
    let account = state.accounts.balance(kind, client.client_id, &code).await?;
    ok("account balance", account)
}

pub(crate) async fn balances(
    state: Arc<AppState>,
    client: AuthenticatedClient,
    kind: AssetKind,
    query: BalancesQuery,
) -> ApiResult<BalancesPayload> {
    let page = state
        .accounts
        .balances_page(
            kind,
            client.client_id,
            query.page_cursor.as_deref(),
            query.page_size,
        )
        .await?;
    ok("account balances", page.into())
}

pub(crate) async fn transaction(
    state: Arc<AppState>,
    client: AuthenticatedClient,
    kind: AssetKind,
    tx_id: String,
) -> ApiResult<Vec<JournalEntry>> {
    let tx_id = Uuid::parse_str(&tx_id).map_err(|_| {
        ExchangeError::bad_request("invalid transaction id").with_payload(json!(["transactionID"]))
    })?;
    let rows = state
        .accounts
        .transaction_details(kind, client.client_id, tx_id)
        .await?;
    ok("transaction details", rows)
}

pub(crate) async fn transactions(
    state: Arc<AppState>,
    client: AuthenticatedClient,
    kind: AssetKind,
    code: String,
    query: TransactionsQuery,
) -> ApiResult<TransactionsPayload> {
    let page = state
        .accounts
        .transactions_page(kind, client.client_id, &code, &query.into())
        .await?;
    ok("account transactions", page.into())
}
