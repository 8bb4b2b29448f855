use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::TokenCodec;
use crate::config::ExchangeConfig;
use crate::error::ExchangeError;
use crate::exchange::offer::invalid_field;
use crate::ledger::{AccountSnapshot, DepositReceipt, JournalEntry, JournalQuery, Ledger};
use crate::money::AssetKind;
use crate::pagination::{
    TransactionCursor, clamp_page_size, decode_balance_cursor, encode_balance_cursor,
};

/// One page of account balances
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalancePage {
    pub account_balances: Vec<AccountSnapshot>,
    pub page_size: i64,
    pub next_cursor: Option<String>,
}

/// One page of journal rows for an account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionPage {
    pub transaction_details: Vec<JournalEntry>,
    pub page_size: i64,
    pub next_cursor: Option<String>,
}

/// First-page window or a cursor from a previous page
#[derive(Debug, Clone, Default)]
pub struct TransactionPageRequest {
    pub page_cursor: Option<String>,
    pub page_size: Option<i64>,
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub timezone: Option<String>,
}

/// Account opening, deposits and reads
pub struct AccountService {
    ledger: Arc<dyn Ledger>,
    codec: TokenCodec,
    default_page_size: i64,
    max_page_size: i64,
}

impl AccountService {
    pub fn new(ledger: Arc<dyn Ledger>, codec: TokenCodec, config: &ExchangeConfig) -> Self {
        Self {
            ledger,
            codec,
            default_page_size: config.default_page_size,
            max_page_size: config.max_page_size,
        }
    }

    fn parse_code(kind: AssetKind, code: &str) -> Result<String, ExchangeError> {
        kind.parse_code(code)
            .map_err(|e| invalid_field(e, &["currency"]))
    }

    /// Open a zero-balance account; returns `(client_id, code)`
    pub async fn open_account(
        &self,
        kind: AssetKind,
        client_id: Uuid,
        code: &str,
    ) -> Result<(Uuid, String), ExchangeError> {
        let code = Self::parse_code(kind, code)?;
        let account = self
            .ledger
            .create_account(kind, client_id, &code)
            .await
            .map_err(|e| {
                tracing::warn!(client_id = %client_id, %code, %kind, error = %e, "[ACCOUNT] open failed");
                ExchangeError::from(e)
            })?;
        tracing::info!(client_id = %client_id, %code, %kind, "[ACCOUNT] opened");
        Ok((account.client_id, account.code))
    }

    pub async fn open_fiat(
        &self,
        client_id: Uuid,
        currency: &str,
    ) -> Result<(Uuid, String), ExchangeError> {
        self.open_account(AssetKind::Fiat, client_id, currency).await
    }

    pub async fn open_crypto(
        &self,
        client_id: Uuid,
        ticker: &str,
    ) -> Result<(Uuid, String), ExchangeError> {
        self.open_account(AssetKind::Crypto, client_id, ticker).await
    }

    pub async fn deposit_fiat(
        &self,
        client_id: Uuid,
        currency: &str,
        amount: Decimal,
    ) -> Result<DepositReceipt, ExchangeError> {
        let currency = Self::parse_code(AssetKind::Fiat, currency)?;
        let amount = AssetKind::Fiat
            .check_amount(amount)
            .map_err(|e| invalid_field(e, &["amount"]))?;

        let receipt = self
            .ledger
            .deposit(client_id, &currency, amount)
            .await
            .map_err(|e| {
                tracing::warn!(client_id = %client_id, %currency, error = %e, "[ACCOUNT] deposit failed");
                ExchangeError::from_posting(e)
            })?;
        tracing::info!(client_id = %client_id, %currency, tx_id = %receipt.tx_id, "[ACCOUNT] deposit posted");
        Ok(receipt)
    }

    pub async fn balance(
        &self,
        kind: AssetKind,
        client_id: Uuid,
        code: &str,
    ) -> Result<AccountSnapshot, ExchangeError> {
        let code = Self::parse_code(kind, code)?;
        Ok(self.ledger.balance(kind, client_id, &code).await?)
    }

    pub async fn balances_page(
        &self,
        kind: AssetKind,
        client_id: Uuid,
        page_cursor: Option<&str>,
        page_size: Option<i64>,
    ) -> Result<BalancePage, ExchangeError> {
        let page_size = clamp_page_size(page_size, self.default_page_size, self.max_page_size);
        let start_code = match page_cursor.filter(|c| !c.is_empty()) {
            Some(token) => Some(decode_balance_cursor(&self.codec, token)?),
            None => None,
        };

        let mut rows = self
            .ledger
            .balances_page(kind, client_id, start_code.as_deref(), page_size + 1)
            .await?;
        if rows.is_empty() {
            return Err(ExchangeError::not_found("no accounts found"));
        }

        // The extra row is where the next page starts
        let next_cursor = if rows.len() as i64 > page_size {
            let extra = rows.split_off(page_size as usize);
            extra
                .first()
                .map(|next| encode_balance_cursor(&self.codec, &next.code))
                .transpose()?
        } else {
            None
        };

        Ok(BalancePage {
            account_balances: rows,
            page_size,
            next_cursor,
        })
    }

    /// Journal rows of `tx_id` owned by the caller. Crypto lookups include the
    /// fiat leg of the exchange.
    pub async fn transaction_details(
        &self,
        kind: AssetKind,
        client_id: Uuid,
        tx_id: Uuid,
    ) -> Result<Vec<JournalEntry>, ExchangeError> {
        let kinds: &[AssetKind] = match kind {
            AssetKind::Fiat => &[AssetKind::Fiat],
            AssetKind::Crypto => &[AssetKind::Fiat, AssetKind::Crypto],
        };
        let rows = self
            .ledger
            .transaction_details(kinds, client_id, tx_id)
            .await?;
        if rows.is_empty() {
            return Err(ExchangeError::not_found("transaction not found"));
        }
        Ok(rows)
    }

    pub async fn transactions_page(
        &self,
        kind: AssetKind,
        client_id: Uuid,
        code: &str,
        request: &TransactionPageRequest,
    ) -> Result<TransactionPage, ExchangeError> {
        let code = Self::parse_code(kind, code)?;
        let page_size =
            clamp_page_size(request.page_size, self.default_page_size, self.max_page_size);

        let cursor = match request.page_cursor.as_deref().filter(|c| !c.is_empty()) {
            Some(token) => TransactionCursor::decode(&self.codec, token)?,
            None => {
                let (Some(month), Some(year)) = (request.month, request.year) else {
                    return Err(ExchangeError::bad_request(
                        "month and year are required for the first page",
                    )
                    .with_payload(json!(["month", "year"])));
                };
                TransactionCursor::first_page(
                    month,
                    year,
                    request.timezone.as_deref().unwrap_or(""),
                )?
            }
        };

        let query = JournalQuery {
            client_id,
            code,
            start: cursor.start,
            end: cursor.end,
            offset: cursor.offset,
            limit: page_size + 1,
        };
        let mut rows = self.ledger.journal_page(kind, &query).await?;
        if rows.is_empty() {
            return Err(ExchangeError::range_not_satisfiable(
                "no transactions in the requested range",
            ));
        }

        let next_cursor = if rows.len() as i64 > page_size {
            rows.truncate(page_size as usize);
            Some(cursor.next(page_size).encode(&self.codec)?)
        } else {
            None
        };

        Ok(TransactionPage {
            transaction_details: rows,
            page_size,
            next_cursor,
        })
    }
}
