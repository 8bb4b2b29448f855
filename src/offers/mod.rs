//! Offer Store
//!
//! Pending exchange offers keyed by their plaintext offer id, each with its own
//! TTL. The store is the single source of truth for whether an offer can still
//! be redeemed: the redeem path deletes the entry before any ledger write.

pub mod memory;
pub mod redis;

pub use memory::MemoryOfferStore;
pub use redis::RedisOfferStore;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// A quote bound to one client, waiting to be redeemed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub client_id: Uuid,
    pub source: String,
    pub destination: String,
    pub debit_amount: Decimal,
    pub rate: Decimal,
    pub credit_amount: Decimal,
    pub is_crypto_purchase: bool,
    pub is_crypto_sale: bool,
    /// Unix seconds
    pub expires_at: i64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache entry not found")]
    Miss,

    #[error("cache write failed: {0}")]
    Set(String),

    #[error("cache delete failed: {0}")]
    Del(String),

    #[error("cache failure: {0}")]
    Unknown(String),
}

#[async_trait]
pub trait OfferStore: Send + Sync {
    /// Store `offer` under `offer_id`; durable once this returns `Ok`
    async fn put(&self, offer_id: &str, offer: &Offer, ttl: Duration) -> Result<(), CacheError>;

    /// `Miss` if absent or expired
    async fn get(&self, offer_id: &str) -> Result<Offer, CacheError>;

    /// `Miss` if nothing was deleted
    async fn del(&self, offer_id: &str) -> Result<(), CacheError>;

    async fn health_check(&self) -> Result<(), CacheError>;
}
