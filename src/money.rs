//! Money Module
//!
//! Scales, banker's rounding and code validation for every amount that crosses
//! the ledger. Amounts are `rust_decimal::Decimal` end to end; nothing here ever
//! touches floating point.
//!
//! ## Scales
//! - Fiat balances and journal rows carry 2 fractional digits
//! - Crypto balances and journal rows carry 8 fractional digits
//!
//! ## Rounding
//! All writes go through [`round_half_even`]. The PostgreSQL schema ships a
//! function of the same name so balance updates round identically server-side.

use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fractional digits kept for fiat amounts
pub const FIAT_SCALE: u32 = 2;

/// Fractional digits kept for crypto amounts
pub const CRYPTO_SCALE: u32 = 8;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Precision overflow: provided {provided} decimals, max allowed {max}")]
    PrecisionOverflow { provided: u32, max: u32 },

    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("Unknown fiat currency code: {0}")]
    UnknownCurrency(String),

    #[error("Invalid crypto ticker: {0}")]
    InvalidTicker(String),
}

// ============================================================================
// Asset kinds
// ============================================================================

/// Which ledger an account or journal row lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Fiat,
    Crypto,
}

impl AssetKind {
    #[inline]
    pub fn scale(self) -> u32 {
        match self {
            AssetKind::Fiat => FIAT_SCALE,
            AssetKind::Crypto => CRYPTO_SCALE,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AssetKind::Fiat => "fiat",
            AssetKind::Crypto => "crypto",
        }
    }

    /// Validate and normalise a currency code or ticker for this kind
    pub fn parse_code(self, code: &str) -> Result<String, MoneyError> {
        match self {
            AssetKind::Fiat => parse_fiat_code(code),
            AssetKind::Crypto => parse_crypto_ticker(code),
        }
    }

    /// Reject amounts that are not positive or carry more digits than the scale
    pub fn check_amount(self, amount: Decimal) -> Result<Decimal, MoneyError> {
        check_amount(amount, self.scale())
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Rounding
// ============================================================================

/// Round half-to-even to `scale` fractional digits.
///
/// The result always carries exactly `scale` digits so it serializes as
/// `"135.00"` rather than `"135"`.
pub fn round_half_even(value: Decimal, scale: u32) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(scale, RoundingStrategy::MidpointNearestEven);
    rounded.rescale(scale);
    rounded
}

/// Validate a client supplied amount against a scale.
///
/// Trailing zeros do not count towards precision: `"10.500"` is a valid fiat amount.
pub fn check_amount(amount: Decimal, scale: u32) -> Result<Decimal, MoneyError> {
    if amount <= Decimal::ZERO {
        return Err(MoneyError::InvalidAmount);
    }
    let provided = amount.normalize().scale();
    if provided > scale {
        return Err(MoneyError::PrecisionOverflow {
            provided,
            max: scale,
        });
    }
    Ok(round_half_even(amount, scale))
}

// ============================================================================
// Codes
// ============================================================================

/// Active ISO 4217 alphabetic codes
const ISO_4217: &[&str] = &[
    "AED", "AFN", "ALL", "AMD", "ANG", "AOA", "ARS", "AUD", "AWG", "AZN", "BAM", "BBD", "BDT",
    "BGN", "BHD", "BIF", "BMD", "BND", "BOB", "BRL", "BSD", "BTN", "BWP", "BYN", "BZD", "CAD",
    "CDF", "CHF", "CLP", "CNY", "COP", "CRC", "CUP", "CVE", "CZK", "DJF", "DKK", "DOP", "DZD",
    "EGP", "ERN", "ETB", "EUR", "FJD", "FKP", "GBP", "GEL", "GHS", "GIP", "GMD", "GNF", "GTQ",
    "GYD", "HKD", "HNL", "HTG", "HUF", "IDR", "ILS", "INR", "IQD", "IRR", "ISK", "JMD", "JOD",
    "JPY", "KES", "KGS", "KHR", "KMF", "KPW", "KRW", "KWD", "KYD", "KZT", "LAK", "LBP", "LKR",
    "LRD", "LSL", "LYD", "MAD", "MDL", "MGA", "MKD", "MMK", "MNT", "MOP", "MRU", "MUR", "MVR",
    "MWK", "MXN", "MYR", "MZN", "NAD", "NGN", "NIO", "NOK", "NPR", "NZD", "OMR", "PAB", "PEN",
    "PGK", "PHP", "PKR", "PLN", "PYG", "QAR", "RON", "RSD", "RUB", "RWF", "SAR", "SBD", "SCR",
    "SDG", "SEK", "SGD", "SHP", "SLE", "SOS", "SRD", "SSP", "STN", "SVC", "SYP", "SZL", "THB",
    "TJS", "TMT", "TND", "TOP", "TRY", "TTD", "TWD", "TZS", "UAH", "UGX", "USD", "UYU", "UZS",
    "VES", "VND", "VUV", "WST", "XAF", "XCD", "XOF", "XPF", "YER", "ZAR", "ZMW", "ZWL",
];

pub fn is_fiat_code(code: &str) -> bool {
    ISO_4217.binary_search(&code).is_ok()
}

/// Uppercase and check against the ISO 4217 table
pub fn parse_fiat_code(code: &str) -> Result<String, MoneyError> {
    let upper = code.trim().to_ascii_uppercase();
    if is_fiat_code(&upper) {
        Ok(upper)
    } else {
        Err(MoneyError::UnknownCurrency(code.to_string()))
    }
}

/// Tickers are 2-6 ASCII alphanumerics and may not shadow a fiat code
pub fn parse_crypto_ticker(ticker: &str) -> Result<String, MoneyError> {
    let upper = ticker.trim().to_ascii_uppercase();
    let well_formed = (2..=6).contains(&upper.len())
        && upper.chars().all(|c| c.is_ascii_alphanumeric())
        && upper.chars().any(|c| c.is_ascii_alphabetic());
    if !well_formed || is_fiat_code(&upper) {
        return Err(MoneyError::InvalidTicker(ticker.to_string()));
    }
    Ok(upper)
}

// ============================================================================
// Unit Tests
// ============================================================================
