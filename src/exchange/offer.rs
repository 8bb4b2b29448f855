use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::error::ExchangeError;
use crate::money::{AssetKind, MoneyError};

/// Which way value moves across the fiat/crypto boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OfferDirection {
    FiatToFiat,
    /// Fiat debited, crypto credited
    CryptoPurchase,
    /// Crypto debited, fiat credited
    CryptoSale,
}

impl OfferDirection {
    pub fn from_flags(is_crypto_purchase: bool, is_crypto_sale: bool) -> Result<Self, ExchangeError> {
        match (is_crypto_purchase, is_crypto_sale) {
            (false, false) => Ok(Self::FiatToFiat),
            (true, false) => Ok(Self::CryptoPurchase),
            (false, true) => Ok(Self::CryptoSale),
            (true, true) => Err(ExchangeError::bad_request(
                "offer cannot be both a crypto purchase and a crypto sale",
            )),
        }
    }

    pub fn crypto(is_purchase: bool) -> Self {
        if is_purchase {
            Self::CryptoPurchase
        } else {
            Self::CryptoSale
        }
    }

    /// `(is_crypto_purchase, is_crypto_sale)`
    pub fn flags(self) -> (bool, bool) {
        match self {
            Self::FiatToFiat => (false, false),
            Self::CryptoPurchase => (true, false),
            Self::CryptoSale => (false, true),
        }
    }

    pub fn source_kind(self) -> AssetKind {
        match self {
            Self::FiatToFiat | Self::CryptoPurchase => AssetKind::Fiat,
            Self::CryptoSale => AssetKind::Crypto,
        }
    }

    pub fn destination_kind(self) -> AssetKind {
        match self {
            Self::FiatToFiat | Self::CryptoSale => AssetKind::Fiat,
            Self::CryptoPurchase => AssetKind::Crypto,
        }
    }

    pub fn is_crypto(self) -> bool {
        self != Self::FiatToFiat
    }

    /// Normalise both codes for this direction; the payload names the offending fields
    pub fn validate_codes(
        self,
        source: &str,
        destination: &str,
    ) -> Result<(String, String), ExchangeError> {
        let source_code = self.source_kind().parse_code(source);
        let destination_code = self.destination_kind().parse_code(destination);

        match (source_code, destination_code) {
            (Ok(s), Ok(d)) if s == d => Err(ExchangeError::bad_request(
                "source and destination currencies must differ",
            )
            .with_payload(json!(["sourceCurrency", "destinationCurrency"]))),
            (Ok(s), Ok(d)) => Ok((s, d)),
            (Err(e), Ok(_)) => Err(invalid_field(e, &["sourceCurrency"])),
            (Ok(_), Err(e)) => Err(invalid_field(e, &["destinationCurrency"])),
            (Err(e), Err(_)) => Err(invalid_field(e, &["sourceCurrency", "destinationCurrency"])),
        }
    }
}

pub(crate) fn invalid_field(e: MoneyError, fields: &[&str]) -> ExchangeError {
    ExchangeError::bad_request(e.to_string()).with_payload(json!(fields))
}

/// Offer as returned to the client; `offer_id` is the sealed token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferResponse {
    pub offer_id: String,
    pub client_id: Uuid,
    pub source: String,
    pub destination: String,
    pub rate: Decimal,
    pub debit_amount: Decimal,
    pub credit_amount: Decimal,
    /// Unix seconds
    pub expires_at: i64,
    pub is_crypto_purchase: bool,
    pub is_crypto_sale: bool,
}
