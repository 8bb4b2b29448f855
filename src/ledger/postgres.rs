//! PostgreSQL ledger.
//!
//! Reads run under `query_timeout`, postings under `transaction_timeout`. A
//! posting that misses its deadline is dropped mid-flight, which rolls the
//! transaction back.

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::future::Future;
use std::time::Duration;
use uuid::Uuid;

use super::{
    AccountSnapshot, DEPOSIT_CLIENT_ID, DepositReceipt, JournalEntry, JournalQuery, Ledger,
    LedgerError, TransferReceipt, TransferRequest,
};
use crate::config::PostgresConfig;
use crate::db::Database;
use crate::money::{AssetKind, round_half_even};

/// Table and column names for one asset kind
struct Tables {
    accounts: &'static str,
    journal: &'static str,
    code: &'static str,
}

fn tables(kind: AssetKind) -> Tables {
    match kind {
        AssetKind::Fiat => Tables {
            accounts: "fiat_accounts",
            journal: "fiat_journal",
            code: "currency",
        },
        AssetKind::Crypto => Tables {
            accounts: "crypto_accounts",
            journal: "crypto_journal",
            code: "ticker",
        },
    }
}

fn snapshot_from_row(row: &PgRow) -> Result<AccountSnapshot, sqlx::Error> {
    Ok(AccountSnapshot {
        client_id: row.try_get("client_id")?,
        code: row.try_get("code")?,
        balance: row.try_get("balance")?,
        last_tx: row.try_get("last_tx")?,
        last_tx_ts: row.try_get("last_tx_ts")?,
        created_at: row.try_get("created_at")?,
    })
}

fn entry_from_row(kind: AssetKind, row: &PgRow) -> Result<JournalEntry, sqlx::Error> {
    Ok(JournalEntry {
        tx_id: row.try_get("tx_id")?,
        kind,
        client_id: row.try_get("client_id")?,
        code: row.try_get("code")?,
        amount: row.try_get("amount")?,
        transacted_at: row.try_get("transacted_at")?,
    })
}

/// Any failure inside a posting aborts it
fn tx_err(e: sqlx::Error) -> LedgerError {
    LedgerError::Transaction(e.to_string())
}

async fn with_deadline<T, F>(deadline: Duration, fut: F) -> Result<T, LedgerError>
where
    F: Future<Output = Result<T, LedgerError>>,
{
    tokio::time::timeout(deadline, fut)
        .await
        .map_err(|_| LedgerError::Timeout)?
}

/// Postgres keeps microseconds
fn now_micros() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

async fn lock_account(
    tx: &mut Transaction<'_, Postgres>,
    kind: AssetKind,
    client_id: Uuid,
    code: &str,
) -> Result<Decimal, LedgerError> {
    let t = tables(kind);
    let sql = format!(
        "SELECT balance FROM {} WHERE client_id = $1 AND {} = $2 FOR NO KEY UPDATE",
        t.accounts, t.code
    );
    let row = sqlx::query(&sql)
        .bind(client_id)
        .bind(code)
        .fetch_optional(&mut **tx)
        .await
        .map_err(tx_err)?
        .ok_or(LedgerError::NotFound)?;
    row.try_get("balance").map_err(tx_err)
}

async fn insert_entry(
    tx: &mut Transaction<'_, Postgres>,
    entry: &JournalEntry,
) -> Result<(), LedgerError> {
    let t = tables(entry.kind);
    let sql = format!(
        "INSERT INTO {} (tx_id, client_id, {}, amount, transacted_at) VALUES ($1, $2, $3, $4, $5)",
        t.journal, t.code
    );
    sqlx::query(&sql)
        .bind(entry.tx_id)
        .bind(entry.client_id)
        .bind(&entry.code)
        .bind(entry.amount)
        .bind(entry.transacted_at)
        .execute(&mut **tx)
        .await
        .map_err(tx_err)?;
    Ok(())
}

/// Add a signed delta to a locked row, rounding server-side at the kind's scale
async fn apply_delta(
    tx: &mut Transaction<'_, Postgres>,
    entry: &JournalEntry,
) -> Result<AccountSnapshot, LedgerError> {
    let t = tables(entry.kind);
    let sql = format!(
        r#"
        UPDATE {accounts}
        SET balance = round_half_even(balance + $3, $5), last_tx = $3, last_tx_ts = $4
        WHERE client_id = $1 AND {code} = $2
        RETURNING client_id, {code} AS code, balance, last_tx, last_tx_ts, created_at
        "#,
        accounts = t.accounts,
        code = t.code
    );
    let row = sqlx::query(&sql)
        .bind(entry.client_id)
        .bind(&entry.code)
        .bind(entry.amount)
        .bind(entry.transacted_at)
        .bind(entry.kind.scale() as i32)
        .fetch_optional(&mut **tx)
        .await
        .map_err(tx_err)?
        .ok_or_else(|| {
            LedgerError::Corrupt(format!("locked {} account vanished", entry.kind))
        })?;
    snapshot_from_row(&row).map_err(tx_err)
}

pub struct PgLedger {
    pool: PgPool,
    query_timeout: Duration,
    transaction_timeout: Duration,
}

impl PgLedger {
    pub fn new(db: &Database, config: &PostgresConfig) -> Self {
        Self {
            pool: db.pool().clone(),
            query_timeout: config.query_timeout(),
            transaction_timeout: config.transaction_timeout(),
        }
    }

    async fn deposit_tx(
        &self,
        client_id: Uuid,
        currency: &str,
        amount: Decimal,
    ) -> Result<DepositReceipt, LedgerError> {
        let amount = round_half_even(amount, AssetKind::Fiat.scale());
        let mut tx = self.pool.begin().await.map_err(tx_err)?;

        lock_account(&mut tx, AssetKind::Fiat, client_id, currency).await?;

        let tx_id = Uuid::new_v4();
        let now = now_micros();
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
        insert_entry(&mut tx, &inflow).await?;
        insert_entry(&mut tx, &credit).await?;
        let account = apply_delta(&mut tx, &credit).await?;

        tx.commit().await.map_err(tx_err)?;

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

    async fn transfer_tx(&self, request: &TransferRequest) -> Result<TransferReceipt, LedgerError> {
        let source = &request.source;
        let destination = &request.destination;
        if source.same_account(destination) {
            return Err(LedgerError::Transaction(
                "source and destination are the same account".to_string(),
            ));
        }

        let debit = round_half_even(source.amount, source.kind.scale());
        let credit = round_half_even(destination.amount, destination.kind.scale());
        if debit <= Decimal::ZERO || credit <= Decimal::ZERO {
            return Err(LedgerError::Transaction("non-positive posting".to_string()));
        }

        let mut tx = self.pool.begin().await.map_err(tx_err)?;

        let mut ordered = [source, destination];
        ordered.sort_by(|a, b| a.lock_key().cmp(&b.lock_key()));
        let mut source_balance = Decimal::ZERO;
        for leg in ordered {
            let balance = lock_account(&mut tx, leg.kind, leg.client_id, &leg.code).await?;
            if leg.same_account(source) {
                source_balance = balance;
            }
        }

        if source_balance < debit {
            return Err(LedgerError::InsufficientFunds);
        }

        let tx_id = Uuid::new_v4();
        let now = now_micros();
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

        insert_entry(&mut tx, &debit_entry).await?;
        insert_entry(&mut tx, &credit_entry).await?;
        let source_account = apply_delta(&mut tx, &debit_entry).await?;
        let destination_account = apply_delta(&mut tx, &credit_entry).await?;

        tx.commit().await.map_err(tx_err)?;

        Ok(TransferReceipt {
            tx_id,
            transacted_at: now,
            debit: debit_entry,
            credit: credit_entry,
            source_balance: source_account.balance,
            destination_balance: destination_account.balance,
        })
    }
}

#[async_trait]
impl Ledger for PgLedger {
    async fn create_account(
        &self,
        kind: AssetKind,
        client_id: Uuid,
        code: &str,
    ) -> Result<AccountSnapshot, LedgerError> {
        let t = tables(kind);
        let sql = format!(
            r#"
            INSERT INTO {accounts} (client_id, {code})
            SELECT client_id, $2 FROM users WHERE client_id = $1 AND NOT is_deleted
            RETURNING client_id, {code} AS code, balance, last_tx, last_tx_ts, created_at
            "#,
            accounts = t.accounts,
            code = t.code
        );
        with_deadline(self.query_timeout, async {
            let row = sqlx::query(&sql)
                .bind(client_id)
                .bind(code)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| match e {
                    sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                        LedgerError::AccountExists
                    }
                    sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                        LedgerError::UnknownClient
                    }
                    other => LedgerError::Database(other),
                })?
                .ok_or(LedgerError::UnknownClient)?;
            Ok::<_, LedgerError>(snapshot_from_row(&row)?)
        })
        .await
    }

    async fn balance(
        &self,
        kind: AssetKind,
        client_id: Uuid,
        code: &str,
    ) -> Result<AccountSnapshot, LedgerError> {
        let t = tables(kind);
        let sql = format!(
            "SELECT client_id, {code} AS code, balance, last_tx, last_tx_ts, created_at \
             FROM {accounts} WHERE client_id = $1 AND {code} = $2",
            accounts = t.accounts,
            code = t.code
        );
        with_deadline(self.query_timeout, async {
            let row = sqlx::query(&sql)
                .bind(client_id)
                .bind(code)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(LedgerError::NotFound)?;
            Ok::<_, LedgerError>(snapshot_from_row(&row)?)
        })
        .await
    }

    async fn deposit(
        &self,
        client_id: Uuid,
        currency: &str,
        amount: Decimal,
    ) -> Result<DepositReceipt, LedgerError> {
        let result = with_deadline(
            self.transaction_timeout,
            self.deposit_tx(client_id, currency, amount),
        )
        .await;
        if let Err(e) = &result {
            tracing::warn!(client_id = %client_id, currency, error = %e, "[LEDGER] deposit aborted");
        }
        result
    }

    async fn transfer(&self, request: &TransferRequest) -> Result<TransferReceipt, LedgerError> {
        let result = with_deadline(self.transaction_timeout, self.transfer_tx(request)).await;
        if let Err(e) = &result {
            tracing::warn!(
                client_id = %request.source.client_id,
                source = %request.source.code,
                destination = %request.destination.code,
                error = %e,
                "[LEDGER] transfer aborted"
            );
        }
        result
    }

    async fn balances_page(
        &self,
        kind: AssetKind,
        client_id: Uuid,
        start_code: Option<&str>,
        limit: i64,
    ) -> Result<Vec<AccountSnapshot>, LedgerError> {
        let t = tables(kind);
        let sql = format!(
            "SELECT client_id, {code} AS code, balance, last_tx, last_tx_ts, created_at \
             FROM {accounts} WHERE client_id = $1 AND {code} >= $2 \
             ORDER BY {code} ASC LIMIT $3",
            accounts = t.accounts,
            code = t.code
        );
        with_deadline(self.query_timeout, async {
            let rows = sqlx::query(&sql)
                .bind(client_id)
                .bind(start_code.unwrap_or(""))
                .bind(limit)
                .fetch_all(&self.pool)
                .await?;
            rows.iter()
                .map(|row| snapshot_from_row(row).map_err(LedgerError::from))
                .collect::<Result<Vec<_>, LedgerError>>()
        })
        .await
    }

    async fn journal_page(
        &self,
        kind: AssetKind,
        query: &JournalQuery,
    ) -> Result<Vec<JournalEntry>, LedgerError> {
        let t = tables(kind);
        let sql = format!(
            "SELECT tx_id, client_id, {code} AS code, amount, transacted_at \
             FROM {journal} \
             WHERE client_id = $1 AND {code} = $2 AND transacted_at >= $3 AND transacted_at < $4 \
             ORDER BY transacted_at DESC, tx_id ASC OFFSET $5 LIMIT $6",
            journal = t.journal,
            code = t.code
        );
        with_deadline(self.query_timeout, async {
            let rows = sqlx::query(&sql)
                .bind(query.client_id)
                .bind(&query.code)
                .bind(query.start.with_timezone(&Utc))
                .bind(query.end.with_timezone(&Utc))
                .bind(query.offset)
                .bind(query.limit)
                .fetch_all(&self.pool)
                .await?;
            rows.iter()
                .map(|row| entry_from_row(kind, row).map_err(LedgerError::from))
                .collect::<Result<Vec<_>, LedgerError>>()
        })
        .await
    }

    async fn transaction_details(
        &self,
        kinds: &[AssetKind],
        client_id: Uuid,
        tx_id: Uuid,
    ) -> Result<Vec<JournalEntry>, LedgerError> {
        with_deadline(self.query_timeout, async {
            let mut entries = Vec::new();
            for &kind in kinds {
                let t = tables(kind);
                let sql = format!(
                    "SELECT tx_id, client_id, {code} AS code, amount, transacted_at \
                     FROM {journal} WHERE tx_id = $1 AND client_id = $2 ORDER BY {code}",
                    journal = t.journal,
                    code = t.code
                );
                let rows = sqlx::query(&sql)
                    .bind(tx_id)
                    .bind(client_id)
                    .fetch_all(&self.pool)
                    .await?;
                for row in &rows {
                    entries.push(entry_from_row(kind, row)?);
                }
            }
            Ok::<_, LedgerError>(entries)
        })
        .await
    }

    async fn health_check(&self) -> Result<(), LedgerError> {
        with_deadline(self.query_timeout, async {
            sqlx::query("SELECT 1").execute(&self.pool).await?;
            Ok::<_, LedgerError>(())
        })
        .await
    }
}
