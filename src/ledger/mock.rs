//! In-process ledger for service and router tests.
//!
//! One mutex over the whole book gives each posting the same all-or-nothing
//! shape as a database transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    AccountSnapshot, DEPOSIT_CLIENT_ID, DepositReceipt, JournalEntry, JournalQuery, Ledger,
    LedgerError, TransferReceipt, TransferRequest,
};
use crate::money::{AssetKind, round_half_even};

type AccountKey = (AssetKind, Uuid, String);

#[derive(Default)]
struct Book {
    clients: HashSet<Uuid>,
    accounts: BTreeMap<AccountKey, AccountSnapshot>,
    journal: Vec<JournalEntry>,
}

#[derive(Default)]
pub struct MemoryLedger {
    book: Mutex<Book>,
    fail_postings: AtomicBool,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register_client(&self, client_id: Uuid) {
        self.book.lock().await.clients.insert(client_id);
    }

    /// Make every deposit and transfer abort
    pub fn set_fail_postings(&self, fail: bool) {
        self.fail_postings.store(fail, Ordering::SeqCst);
    }

    pub async fn journal(&self) -> Vec<JournalEntry> {
        self.book.lock().await.journal.clone()
    }

    /// Insert a journal row directly, bypassing balances
    pub async fn seed_entry(&self, entry: JournalEntry) {
        self.book.lock().await.journal.push(entry);
    }

    fn check_postings(&self) -> Result<(), LedgerError> {
        if self.fail_postings.load(Ordering::SeqCst) {
            return Err(LedgerError::Transaction("mock posting failure".to_string()));
        }
        Ok(())
    }
}

fn key(kind: AssetKind, client_id: Uuid, code: &str) -> AccountKey {
    (kind, client_id, code.to_string())
}

fn post(book: &mut Book, entry: &JournalEntry) -> Result<AccountSnapshot, LedgerError> {
    let account = book
        .accounts
        .get_mut(&key(entry.kind, entry.client_id, &entry.code))
        .ok_or(LedgerError::NotFound)?;
    account.balance = round_half_even(account.balance + entry.amount, entry.kind.scale());
    account.last_tx = entry.amount;
    account.last_tx_ts = entry.transacted_at;
    Ok(account.clone())
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn create_account(
        &self,
        kind: AssetKind,
        client_id: Uuid,
        code: &str,
    ) -> Result<AccountSnapshot, LedgerError> {
        let mut book = self.book.lock().await;
        if !book.clients.contains(&client_id) {
            return Err(LedgerError::UnknownClient);
        }
        let k = key(kind, client_id, code);
        if book.accounts.contains_key(&k) {
            return Err(LedgerError::AccountExists);
        }
        let now = Utc::now();
        let zero = round_half_even(Decimal::ZERO, kind.scale());
        let snapshot = AccountSnapshot {
            client_id,
            code: code.to_string(),
            balance: zero,
            last_tx: zero,
            last_tx_ts: now,
            created_at: now,
        };
        book.accounts.insert(k, snapshot.clone());
        Ok(snapshot)
    }

    async fn balance(
        &self,
        kind: AssetKind,
        client_id: Uuid,
        code: &str,
    ) -> Result<AccountSnapshot, LedgerError> {
        self.book
            .lock()
            .await
            .accounts
            .get(&key(kind, client_id, code))
            .cloned()
            .ok_or(LedgerError::NotFound)
    }

    async fn deposit(
        &self,
        client_id: Uuid,
        currency: &str,
        amount: Decimal,
    ) -> Result<DepositReceipt, LedgerError> {
        self.check_postings()?;
        let mut book = self.book.lock().await;
        if !book
            .accounts
            .contains_key(&key(AssetKind::Fiat, client_id, currency))
        {
            return Err(LedgerError::NotFound);
        }

        let amount = round_half_even(amount, AssetKind::Fiat.scale());
        let tx_id = Uuid::new_v4();
        let now = Utc::now();
        let inflow = JournalEntry {
            tx_id,
            kind: AssetKind::Fiat,
            client_id: DEPOSIT_CLIENT_ID,
            code: currency.to_string(),
            amount: -amount,
            transacted_at: now,
        };
        let credit = JournalEntry {
            client_id,
            amount,
            ..inflow.clone()
        };
        let account = post(&mut book, &credit)?;
        book.journal.push(inflow);
        book.journal.push(credit);

        Ok(DepositReceipt {
            tx_id,
            client_id,
            currency: currency.to_string(),
            amount,
            balance: account.balance,
            last_tx: account.last_tx,
            transacted_at: now,
        })
    }

    async fn transfer(&self, request: &TransferRequest) -> Result<TransferReceipt, LedgerError> {
        self.check_postings()?;
        let source = &request.source;
        let destination = &request.destination;
        if source.same_account(destination) {
            return Err(LedgerError::Transaction(
                "source and destination are the same account".to_string(),
            ));
        }

        let mut book = self.book.lock().await;
        let source_key = key(source.kind, source.client_id, &source.code);
        let destination_key = key(destination.kind, destination.client_id, &destination.code);
        let available = book
            .accounts
            .get(&source_key)
            .map(|a| a.balance)
            .ok_or(LedgerError::NotFound)?;
        if !book.accounts.contains_key(&destination_key) {
            return Err(LedgerError::NotFound);
        }

        let debit = round_half_even(source.amount, source.kind.scale());
        let credit = round_half_even(destination.amount, destination.kind.scale());
        if available < debit {
            return Err(LedgerError::InsufficientFunds);
        }

        let tx_id = Uuid::new_v4();
        let now: DateTime<Utc> = Utc::now();
        let debit_entry = JournalEntry {
            tx_id,
            kind: source.kind,
            client_id: source.client_id,
            code: source.code.clone(),
            amount: -debit,
            transacted_at: now,
        };
        let credit_entry = JournalEntry {
            tx_id,
            kind: destination.kind,
            client_id: destination.client_id,
            code: destination.code.clone(),
            amount: credit,
            transacted_at: now,
        };
        let source_account = post(&mut book, &debit_entry)?;
        let destination_account = post(&mut book, &credit_entry)?;
        book.journal.push(debit_entry.clone());
        book.journal.push(credit_entry.clone());

        Ok(TransferReceipt {
            tx_id,
            transacted_at: now,
            debit: debit_entry,
            credit: credit_entry,
            source_balance: source_account.balance,
            destination_balance: destination_account.balance,
        })
    }

    async fn balances_page(
        &self,
        kind: AssetKind,
        client_id: Uuid,
        start_code: Option<&str>,
        limit: i64,
    ) -> Result<Vec<AccountSnapshot>, LedgerError> {
        let start = start_code.unwrap_or("");
        let book = self.book.lock().await;
        Ok(book
            .accounts
            .iter()
            .filter(|((k, c, code), _)| *k == kind && *c == client_id && code.as_str() >= start)
            .map(|(_, snapshot)| snapshot.clone())
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn journal_page(
        &self,
        kind: AssetKind,
        query: &JournalQuery,
    ) -> Result<Vec<JournalEntry>, LedgerError> {
        let start = query.start.with_timezone(&Utc);
        let end = query.end.with_timezone(&Utc);
        let book = self.book.lock().await;
        let mut rows: Vec<JournalEntry> = book
            .journal
            .iter()
            .filter(|e| {
                e.kind == kind
                    && e.client_id == query.client_id
                    && e.code == query.code
                    && e.transacted_at >= start
                    && e.transacted_at < end
            })
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.transacted_at
                .cmp(&a.transacted_at)
                .then_with(|| a.tx_id.cmp(&b.tx_id))
        });
        Ok(rows
            .into_iter()
            .skip(query.offset.max(0) as usize)
            .take(query.limit.max(0) as usize)
            .collect())
    }

    async fn transaction_details(
        &self,
        kinds: &[AssetKind],
        client_id: Uuid,
        tx_id: Uuid,
    ) -> Result<Vec<JournalEntry>, LedgerError> {
        let book = self.book.lock().await;
        Ok(book
            .journal
            .iter()
            .filter(|e| e.tx_id == tx_id && e.client_id == client_id && kinds.contains(&e.kind))
            .cloned()
            .collect())
    }

    async fn health_check(&self) -> Result<(), LedgerError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Leg;
    use rust_decimal_macros::dec;

    async fn ledger_with_client() -> (MemoryLedger, Uuid) {
        let ledger = MemoryLedger::new();
        let client = Uuid::new_v4();
        ledger.register_client(client).await;
        (ledger, client)
    }

    #[tokio::test]
    async fn test_create_account_rules() {
        let (ledger, client) = ledger_with_client().await;
        let account = ledger
            .create_account(AssetKind::Crypto, client, "BTC")
            .await
            .unwrap();
        assert_eq!(account.balance.to_string(), "0.00000000");

        assert!(matches!(
            ledger.create_account(AssetKind::Crypto, client, "BTC").await,
            Err(LedgerError::AccountExists)
        ));
        assert!(matches!(
            ledger
                .create_account(AssetKind::Fiat, Uuid::new_v4(), "USD")
                .await,
            Err(LedgerError::UnknownClient)
        ));
    }

    #[tokio::test]
    async fn test_transfer_requires_both_accounts() {
        let (ledger, client) = ledger_with_client().await;
        ledger.create_account(AssetKind::Fiat, client, "USD").await.unwrap();
        ledger.deposit(client, "USD", dec!(10)).await.unwrap();

        let request = TransferRequest {
            source: Leg::new(AssetKind::Fiat, client, "USD", dec!(1)),
            destination: Leg::new(AssetKind::Fiat, client, "EUR", dec!(1)),
        };
        assert!(matches!(
            ledger.transfer(&request).await,
            Err(LedgerError::NotFound)
        ));
        assert_eq!(ledger.journal().await.len(), 2, "only the deposit rows");
    }

    #[tokio::test]
    async fn test_failed_posting_writes_nothing() {
        let (ledger, client) = ledger_with_client().await;
        ledger.create_account(AssetKind::Fiat, client, "USD").await.unwrap();
        ledger.set_fail_postings(true);
        assert!(ledger.deposit(client, "USD", dec!(10)).await.is_err());
        assert!(ledger.journal().await.is_empty());
    }
}
