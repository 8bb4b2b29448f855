//! Crypto account and purchase/sale endpoints

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use super::super::state::AppState;
use super::super::types::{
    ApiResponse, ApiResult, BalancesPayload, BalancesQuery, CryptoOfferRequest,
    OpenAccountRequest, RedeemOfferRequest, TransactionsPayload, TransactionsQuery,
    ValidatedJson, ValidatedQuery, ok,
};
use super::account;
use crate::auth::AuthenticatedClient;
use crate::error::ExchangeError;
use crate::exchange::OfferResponse;
use crate::ledger::{AccountSnapshot, JournalEntry, TransferReceipt};
use crate::money::AssetKind;

/// POST /api/v1/crypto/open
pub async fn open_crypto(
    State(state): State<Arc<AppState>>,
    Extension(client): Extension<AuthenticatedClient>,
    ValidatedJson(req): ValidatedJson<OpenAccountRequest>,
) -> Result<(StatusCode, Json<ApiResponse<(Uuid, String)>>), ExchangeError> {
    account::open(state, client, AssetKind::Crypto, req).await
}

/// POST /api/v1/crypto/offer
///
/// `isPurchase` selects fiat→crypto; otherwise the offer sells crypto for fiat.
pub async fn crypto_offer(
    State(state): State<Arc<AppState>>,
    Extension(client): Extension<AuthenticatedClient>,
    ValidatedJson(req): ValidatedJson<CryptoOfferRequest>,
) -> ApiResult<OfferResponse> {
    let offer = state
        .exchange
        .prepare_crypto_offer(
            client.client_id,
            &req.source_currency,
            &req.destination_currency,
            req.source_amount.inner(),
            req.is_purchase,
        )
        .await?;
    ok("crypto conversion rate offer", offer)
}

/// POST /api/v1/crypto/exchange
pub async fn crypto_exchange(
    State(state): State<Arc<AppState>>,
    Extension(client): Extension<AuthenticatedClient>,
    ValidatedJson(req): ValidatedJson<RedeemOfferRequest>,
) -> ApiResult<TransferReceipt> {
    let receipt = state
        .exchange
        .redeem_crypto_offer(client.client_id, &req.offer_id)
        .await?;
    ok("crypto exchange successful", receipt)
}

/// GET /api/v1/crypto/info/balance/{ticker}
pub async fn crypto_balance(
    State(state): State<Arc<AppState>>,
    Extension(client): Extension<AuthenticatedClient>,
    Path(ticker): Path<String>,
) -> ApiResult<AccountSnapshot> {
    account::balance(state, client, AssetKind::Crypto, ticker).await
}

/// GET /api/v1/crypto/info/balance
pub async fn crypto_balances(
    State(state): State<Arc<AppState>>,
    Extension(client): Extension<AuthenticatedClient>,
    ValidatedQuery(query): ValidatedQuery<BalancesQuery>,
) -> ApiResult<BalancesPayload> {
    account::balances(state, client, AssetKind::Crypto, query).await
}

/// GET /api/v1/crypto/info/transaction/{id}
pub async fn crypto_transaction(
    State(state): State<Arc<AppState>>,
    Extension(client): Extension<AuthenticatedClient>,
    Path(tx_id): Path<String>,
) -> ApiResult<Vec<JournalEntry>> {
    account::transaction(state, client, AssetKind::Crypto, tx_id).await
}

/// GET /api/v1/crypto/info/transaction/all/{ticker}/
pub async fn crypto_transactions(
    State(state): State<Arc<AppState>>,
    Extension(client): Extension<AuthenticatedClient>,
    Path(ticker): Path<String>,
    ValidatedQuery(query): ValidatedQuery<TransactionsQuery>,
) -> ApiResult<TransactionsPayload> {
    account::transactions(state, client, AssetKind::Crypto, ticker, query).await
}
