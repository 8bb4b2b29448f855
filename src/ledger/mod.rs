//! Journal & Balance Engine
//!
//! Double-entry postings over fiat and crypto accounts. Every posting writes
//! exactly two journal rows sharing a tx id and timestamp, and updates the
//! affected account balances in the same database transaction.
//!
//! Rows are locked in canonical `(client_id, code)` order before any write, so
//! concurrent transfers touching the same pair of accounts cannot deadlock.

pub mod models;
pub mod postgres;

#[cfg(test)]
pub(crate) mod mock;

pub use models::{
    AccountSnapshot, DepositReceipt, JournalEntry, JournalQuery, Leg, TransferReceipt,
    TransferRequest,
};
pub use postgres::PgLedger;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::money::AssetKind;

/// Reserved counterparty of every external fiat deposit
pub const DEPOSIT_CLIENT_ID: Uuid = Uuid::from_u128(1);

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("account already exists")]
    AccountExists,

    #[error("account not found")]
    NotFound,

    #[error("client is not registered")]
    UnknownClient,

    #[error("insufficient funds")]
    InsufficientFunds,

    #[error("ledger operation timed out")]
    Timeout,

    #[error("transaction aborted: {0}")]
    Transaction(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("ledger state is inconsistent: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait Ledger: Send + Sync {
    /// Open a zero-balance account; `AccountExists` on a duplicate pair
    async fn create_account(
        &self,
        kind: AssetKind,
        client_id: Uuid,
        code: &str,
    ) -> Result<AccountSnapshot, LedgerError>;

    /// Non-locking read of one account
    async fn balance(
        &self,
        kind: AssetKind,
        client_id: Uuid,
        code: &str,
    ) -> Result<AccountSnapshot, LedgerError>;

    /// Credit an external fiat inflow against the synthetic deposit client
    async fn deposit(
        &self,
        client_id: Uuid,
        currency: &str,
        amount: Decimal,
    ) -> Result<DepositReceipt, LedgerError>;

    /// Move value between two real accounts, possibly of different kinds
    async fn transfer(&self, request: &TransferRequest) -> Result<TransferReceipt, LedgerError>;

    /// Up to `limit` accounts ordered by code, starting at `start_code` inclusive
    async fn balances_page(
        &self,
        kind: AssetKind,
        client_id: Uuid,
        start_code: Option<&str>,
        limit: i64,
    ) -> Result<Vec<AccountSnapshot>, LedgerError>;

    /// Journal rows of one account inside the query window
    async fn journal_page(
        &self,
        kind: AssetKind,
        query: &JournalQuery,
    ) -> Result<Vec<JournalEntry>, LedgerError>;

    /// Rows of `tx_id` owned by `client_id`, searched across `kinds`
    async fn transaction_details(
        &self,
        kinds: &[AssetKind],
        client_id: Uuid,
        tx_id: Uuid,
    ) -> Result<Vec<JournalEntry>, LedgerError>;

    async fn health_check(&self) -> Result<(), LedgerError>;
}
