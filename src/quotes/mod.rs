//! Quote Provider Adapter
//!
//! Isolates the external market-data API behind [`QuoteProvider`]. Adapters are
//! stateless: no caching, no retries. Callers decide what to do with
//! [`QuoteError::Unavailable`].

pub mod http;

pub use http::HttpQuoteProvider;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

/// Rate plus the converted amount, before any scale rounding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub rate: Decimal,
    pub amount: Decimal,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuoteError {
    #[error("quote provider unavailable: {0}")]
    Unavailable(String),

    #[error("quote provider returned an unreadable response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Convert `amount` of fiat `source` into fiat `destination`
    async fn fiat_conversion(
        &self,
        source: &str,
        destination: &str,
        amount: Decimal,
    ) -> Result<Quote, QuoteError>;

    /// Convert between a fiat currency and a crypto ticker.
    ///
    /// For a purchase `source` is fiat and `destination` crypto; for a sale the
    /// reverse. The returned rate is always fiat per crypto unit.
    async fn crypto_conversion(
        &self,
        source: &str,
        destination: &str,
        amount: Decimal,
        is_purchase: bool,
    ) -> Result<Quote, QuoteError>;
}

/// Apply a fiat-per-crypto rate in the direction of the trade
pub(crate) fn convert_with_rate(
    rate: Decimal,
    amount: Decimal,
    is_purchase: bool,
) -> Result<Decimal, QuoteError> {
    if rate <= Decimal::ZERO {
        return Err(QuoteError::Unavailable(format!("non-positive rate {}", rate)));
    }
    let converted = if is_purchase {
        amount.checked_div(rate)
    } else {
        amount.checked_mul(rate)
    };
    converted.ok_or_else(|| QuoteError::Unavailable("conversion overflow".to_string()))
}
