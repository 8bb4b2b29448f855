//! Fiat account, deposit and fiat-to-fiat exchange endpoints

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use super::super::state::AppState;
use super::super::types::{
    ApiResponse, ApiResult, BalancesPayload, BalancesQuery, DepositRequest, FiatOfferRequest,
    OpenAccountRequest, RedeemOfferRequest, TransactionsPayload, TransactionsQuery,
    ValidatedJson, ValidatedQuery, ok,
};
use super::account;
use crate::auth::AuthenticatedClient;
use crate::error::ExchangeError;
use crate::exchange::OfferResponse;
use crate::ledger::{AccountSnapshot, DepositReceipt, JournalEntry, TransferReceipt};
use crate::money::AssetKind;

/// POST /api/v1/fiat/open
pub async fn open_fiat(
    State(state): State<Arc<AppState>>,
    Extension(client): Extension<AuthenticatedClient>,
    ValidatedJson(req): ValidatedJson<OpenAccountRequest>,
) -> Result<(StatusCode, Json<ApiResponse<(Uuid, String)>>), ExchangeError> {
    account::open(state, client, AssetKind::Fiat, req).await
}

/// POST /api/v1/fiat/deposit
pub async fn deposit(
    State(state): State<Arc<AppState>>,
    Extension(client): Extension<AuthenticatedClient>,
    ValidatedJson(req): ValidatedJson<DepositRequest>,
) -> ApiResult<DepositReceipt> {
    let receipt = state
        .accounts
        .deposit_fiat(client.client_id, &req.currency, req.amount.inner())
        .await?;
    ok("funds successfully transferred", receipt)
}

/// POST /api/v1/fiat/exchange/offer
pub async fn fiat_offer(
    State(state): State<Arc<AppState>>,
    Extension(client): Extension<AuthenticatedClient>,
    ValidatedJson(req): ValidatedJson<FiatOfferRequest>,
) -> ApiResult<OfferResponse> {
    let offer = state
        .exchange
        .prepare_fiat_offer(
            client.client_id,
            &req.source_currency,
            &req.destination_currency,
            req.source_amount.inner(),
        )
        .await?;
    ok("conversion rate offer", offer)
}

/// POST /api/v1/fiat/exchange/transfer
pub async fn fiat_transfer(
    State(state): State<Arc<AppState>>,
    Extension(client): Extension<AuthenticatedClient>,
    ValidatedJson(req): ValidatedJson<RedeemOfferRequest>,
) -> ApiResult<TransferReceipt> {
    let receipt = state
        .exchange
        .redeem_fiat_offer(client.client_id, &req.offer_id)
        .await?;
    ok("funds exchange transfer successful", receipt)
}

/// GET /api/v1/fiat/info/balance/{code}
pub async fn fiat_balance(
    State(state): State<Arc<AppState>>,
    Extension(client): Extension<AuthenticatedClient>,
    Path(code): Path<String>,
) -> ApiResult<AccountSnapshot> {
    account::balance(state, client, AssetKind::Fiat, code).await
}

/// GET /api/v1/fiat/info/balance
pub async fn fiat_balances(
    State(state): State<Arc<AppState>>,
    Extension(client): Extension<AuthenticatedClient>,
    ValidatedQuery(query): ValidatedQuery<BalancesQuery>,
) -> ApiResult<BalancesPayload> {
    account::balances(state, client, AssetKind::Fiat, query).await
}

/// GET /api/v1/fiat/info/transaction/{id}
pub async fn fiat_transaction(
    State(state): State<Arc<AppState>>,
    Extension(client): Extension<AuthenticatedClient>,
    Path(tx_id): Path<String>,
) -> ApiResult<Vec<JournalEntry>> {
    account::transaction(state, client, AssetKind::Fiat, tx_id).await
}

/// GET /api/v1/fiat/info/transaction/all/{code}/
pub async fn fiat_transactions(
    State(state): State<Arc<AppState>>,
    Extension(client): Extension<AuthenticatedClient>,
    Path(code): Path<String>,
    ValidatedQuery(query): ValidatedQuery<TransactionsQuery>,
) -> ApiResult<TransactionsPayload> {
    account::transactions(state, client, AssetKind::Fiat, code, query).await
}
