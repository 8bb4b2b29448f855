use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money::AssetKind;

/// Current state of one account row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSnapshot {
    pub client_id: Uuid,
    pub code: String,
    pub balance: Decimal,
    /// Signed delta of the most recent posting
    pub last_tx: Decimal,
    pub last_tx_ts: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// One side of a posting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub tx_id: Uuid,
    pub kind: AssetKind,
    pub client_id: Uuid,
    pub code: String,
    pub amount: Decimal,
    pub transacted_at: DateTime<Utc>,
}

/// An account plus an unsigned amount moving through it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leg {
    pub kind: AssetKind,
    pub client_id: Uuid,
    pub code: String,
    pub amount: Decimal,
}

impl Leg {
    pub fn new(kind: AssetKind, client_id: Uuid, code: impl Into<String>, amount: Decimal) -> Self {
        Self {
            kind,
            client_id,
            code: code.into(),
            amount,
        }
    }

    /// Canonical lock order key
    pub(crate) fn lock_key(&self) -> (Uuid, &str, AssetKind) {
        (self.client_id, self.code.as_str(), self.kind)
    }

    pub(crate) fn same_account(&self, other: &Leg) -> bool {
        self.lock_key() == other.lock_key()
    }
}

/// Debit `source.amount`, credit `destination.amount`, in one transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub source: Leg,
    pub destination: Leg,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositReceipt {
    pub tx_id: Uuid,
    pub client_id: Uuid,
    pub currency: String,
    pub amount: Decimal,
    pub balance: Decimal,
    pub last_tx: Decimal,
    pub transacted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReceipt {
    pub tx_id: Uuid,
    pub transacted_at: DateTime<Utc>,
    pub debit: JournalEntry,
    pub credit: JournalEntry,
    pub source_balance: Decimal,
    pub destination_balance: Decimal,
}

/// Journal window for one account: `[start, end)`, newest first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalQuery {
    pub client_id: Uuid,
    pub code: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub offset: i64,
    pub limit: i64,
}
