//! Exchange Ledger - multi-currency fiat and crypto accounts
//!
//! Double-entry balances in PostgreSQL, quoted single-use exchange offers in
//! a TTL cache, and an axum HTTP surface in front of both.
//!
//! # Modules
//!
//! - [`money`] - Asset kinds, scales, code validation and banker's rounding
//! - [`auth`] - Client JWT verification and the sealed-token codec
//! - [`quotes`] - External conversion-rate providers
//! - [`offers`] - Offer cache (Redis or in-process)
//! - [`ledger`] - Accounts and journal postings
//! - [`pagination`] - Opaque cursors for balance and history pages
//! - [`accounts`] - Account opening, deposits and reads
//! - [`exchange`] - Offer minting and redemption
//! - [`error`] - Canonical error kinds
//! - [`gateway`] - HTTP routes

pub mod accounts;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod exchange;
pub mod gateway;
pub mod ledger;
pub mod logging;
pub mod money;
pub mod offers;
pub mod pagination;
pub mod quotes;

// Convenient re-exports at crate root
pub use error::{ErrorKind, ExchangeError};
pub use money::AssetKind;
