//! Request bodies and query strings. All camelCase on the wire.

use serde::Deserialize;

use super::money::StrictDecimal;
use crate::accounts::TransactionPageRequest;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenAccountRequest {
    pub currency: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositRequest {
    pub amount: StrictDecimal,
    pub currency: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiatOfferRequest {
    pub source_currency: String,
    pub destination_currency: String,
    pub source_amount: StrictDecimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoOfferRequest {
    pub source_currency: String,
    pub destination_currency: String,
    pub source_amount: StrictDecimal,
    pub is_purchase: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemOfferRequest {
    pub offer_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalancesQuery {
    pub page_cursor: Option<String>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsQuery {
    pub page_cursor: Option<String>,
    pub page_size: Option<i64>,
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub timezone: Option<String>,
}

impl From<TransactionsQuery> for TransactionPageRequest {
    fn from(q: TransactionsQuery) -> Self {
        Self {
            page_cursor: q.page_cursor,
            page_size: q.page_size,
            month: q.month,
            year: q.year,
            timezone: q.timezone,
        }
    }
}
