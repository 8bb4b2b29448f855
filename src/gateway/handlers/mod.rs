//! HTTP handlers, grouped by asset family

pub mod account;
pub mod crypto;
pub mod fiat;
pub mod health;

pub use crypto::{
    crypto_balance, crypto_balances, crypto_exchange, crypto_offer, crypto_transaction,
    crypto_transactions, open_crypto,
};
pub use fiat::{
    deposit, fiat_balance, fiat_balances, fiat_offer, fiat_transaction, fiat_transactions,
    fiat_transfer, open_fiat,
};
pub use health::health_check;
