//! Offer minting and redemption.
//!
//! Minting: validate → quote → seal id → cache → return.
//! Redemption: unseal → get → authorize → del → validate → post → return.
//!
//! The cache `del` always precedes the ledger write, so an offer is posted at
//! most once. A failure after the `del` leaves the offer consumed; the client
//! has to request a new quote.

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::offer::{OfferDirection, OfferResponse, invalid_field};
use crate::auth::TokenCodec;
use crate::config::ExchangeConfig;
use crate::error::ExchangeError;
use crate::ledger::{Leg, Ledger, TransferReceipt, TransferRequest};
use crate::money::round_half_even;
use crate::offers::{CacheError, Offer, OfferStore};
use crate::quotes::QuoteProvider;

pub struct ExchangeService {
    ledger: Arc<dyn Ledger>,
    offers: Arc<dyn OfferStore>,
    quotes: Arc<dyn QuoteProvider>,
    codec: TokenCodec,
    offer_ttl: Duration,
    clock_skew: Duration,
}

impl ExchangeService {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        offers: Arc<dyn OfferStore>,
        quotes: Arc<dyn QuoteProvider>,
        codec: TokenCodec,
        config: &ExchangeConfig,
    ) -> Self {
        Self {
            ledger,
            offers,
            quotes,
            codec,
            offer_ttl: config.offer_ttl(),
            clock_skew: config.clock_skew(),
        }
    }

    pub async fn prepare_fiat_offer(
        &self,
        client_id: Uuid,
        source: &str,
        destination: &str,
        amount: Decimal,
    ) -> Result<OfferResponse, ExchangeError> {
        self.prepare_offer(client_id, OfferDirection::FiatToFiat, source, destination, amount)
            .await
    }

    pub async fn prepare_crypto_offer(
        &self,
        client_id: Uuid,
        source: &str,
        destination: &str,
        amount: Decimal,
        is_purchase: bool,
    ) -> Result<OfferResponse, ExchangeError> {
        self.prepare_offer(
            client_id,
            OfferDirection::crypto(is_purchase),
            source,
            destination,
            amount,
        )
        .await
    }

    pub async fn prepare_offer(
        &self,
        client_id: Uuid,
        direction: OfferDirection,
        source: &str,
        destination: &str,
        amount: Decimal,
    ) -> Result<OfferResponse, ExchangeError> {
        // 1. Validate
        let (source, destination) = direction.validate_codes(source, destination)?;
        let debit_amount = direction
            .source_kind()
            .check_amount(amount)
            .map_err(|e| invalid_field(e, &["sourceAmount"]))?;

        // 2. Quote
        let quote = match direction {
            OfferDirection::FiatToFiat => {
                self.quotes
                    .fiat_conversion(&source, &destination, debit_amount)
                    .await
            }
            OfferDirection::CryptoPurchase | OfferDirection::CryptoSale => {
                self.quotes
                    .crypto_conversion(
                        &source,
                        &destination,
                        debit_amount,
                        direction == OfferDirection::CryptoPurchase,
                    )
                    .await
            }
        }
        .map_err(|e| {
            tracing::warn!(client_id = %client_id, %source, %destination, error = %e, "[EXCHANGE] quote failed");
            ExchangeError::from(e)
        })?;

        let credit_amount = round_half_even(quote.amount, direction.destination_kind().scale());
        if credit_amount <= Decimal::ZERO {
            return Err(
                ExchangeError::bad_request("amount is too small to convert")
                    .with_payload(json!(["sourceAmount"])),
            );
        }

        // 3. Seal a fresh id
        let offer_id = Uuid::new_v4().simple().to_string();
        let token = self.codec.encode_str(&offer_id)?;

        // 4. Cache under the plaintext id
        let (is_crypto_purchase, is_crypto_sale) = direction.flags();
        let expires_at = Utc::now().timestamp() + self.offer_ttl.as_secs() as i64;
        let offer = Offer {
            client_id,
            source,
            destination,
            debit_amount,
            rate: quote.rate,
            credit_amount,
            is_crypto_purchase,
            is_crypto_sale,
            expires_at,
        };
        self.offers
            .put(&offer_id, &offer, self.offer_ttl)
            .await
            .map_err(|e| {
                tracing::error!(client_id = %client_id, offer_id = %offer_id, error = %e, "[EXCHANGE] offer cache write failed");
                ExchangeError::from(e)
            })?;

        tracing::info!(
            client_id = %client_id,
            offer_id = %offer_id,
            source = %offer.source,
            destination = %offer.destination,
            rate = %offer.rate,
            "[EXCHANGE] offer prepared"
        );

        Ok(OfferResponse {
            offer_id: token,
            client_id,
            source: offer.source,
            destination: offer.destination,
            rate: offer.rate,
            debit_amount: offer.debit_amount,
            credit_amount: offer.credit_amount,
            expires_at,
            is_crypto_purchase,
            is_crypto_sale,
        })
    }

    /// Redeem a crypto purchase or sale
    pub async fn redeem_crypto_offer(
        &self,
        client_id: Uuid,
        token: &str,
    ) -> Result<TransferReceipt, ExchangeError> {
        self.redeem_offer(client_id, token, true).await
    }

    /// Redeem a fiat to fiat conversion
    pub async fn redeem_fiat_offer(
        &self,
        client_id: Uuid,
        token: &str,
    ) -> Result<TransferReceipt, ExchangeError> {
        self.redeem_offer(client_id, token, false).await
    }

    async fn redeem_offer(
        &self,
        client_id: Uuid,
        token: &str,
        expect_crypto: bool,
    ) -> Result<TransferReceipt, ExchangeError> {
        // 1. Unseal
        let offer_id = self.codec.decode_str(token).map_err(|e| {
            tracing::warn!(client_id = %client_id, error = %e, "[EXCHANGE] offer id rejected");
            ExchangeError::from(e)
        })?;

        // 2. Get
        let offer = match self.offers.get(&offer_id).await {
            Ok(offer) => offer,
            Err(CacheError::Miss) => return Err(ExchangeError::offer_expired()),
            Err(e) => {
                tracing::error!(client_id = %client_id, offer_id = %offer_id, error = %e, "[EXCHANGE] offer lookup failed");
                return Err(e.into());
            }
        };

        // 3. Authorize; a foreign client leaves the entry in place
        if offer.client_id != client_id {
            tracing::warn!(
                client_id = %client_id,
                owner = %offer.client_id,
                offer_id = %offer_id,
                "[EXCHANGE] offer redeemed by a different client"
            );
            return Err(ExchangeError::forbidden("offer belongs to a different client"));
        }
        let direction = OfferDirection::from_flags(offer.is_crypto_purchase, offer.is_crypto_sale)?;
        if direction.is_crypto() != expect_crypto {
            let message = if expect_crypto {
                "offer is not a crypto exchange"
            } else {
                "offer is not a fiat exchange"
            };
            return Err(ExchangeError::bad_request(message));
        }

        // 4. Del: whoever deletes the entry owns the offer
        match self.offers.del(&offer_id).await {
            Ok(()) => {}
            Err(CacheError::Miss) => {
                tracing::info!(client_id = %client_id, offer_id = %offer_id, "[EXCHANGE] offer consumed concurrently");
                return Err(ExchangeError::offer_expired());
            }
            Err(e) => {
                tracing::error!(client_id = %client_id, offer_id = %offer_id, error = %e, "[EXCHANGE] offer delete failed");
                return Err(ExchangeError::internal(crate::error::RETRY_MESSAGE));
            }
        }

        // 5. Validate
        let deadline = offer.expires_at + self.clock_skew.as_secs() as i64;
        if Utc::now().timestamp() > deadline {
            return Err(ExchangeError::offer_expired());
        }
        let (source, destination) = direction.validate_codes(&offer.source, &offer.destination)?;

        // 6. Post
        let request = TransferRequest {
            source: Leg::new(direction.source_kind(), client_id, source, offer.debit_amount),
            destination: Leg::new(
                direction.destination_kind(),
                client_id,
                destination,
                offer.credit_amount,
            ),
        };
        let receipt = self.ledger.transfer(&request).await.map_err(|e| {
            tracing::error!(client_id = %client_id, offer_id = %offer_id, error = %e, "[EXCHANGE] offer posting failed");
            ExchangeError::from_posting(e)
        })?;

        tracing::info!(
            client_id = %client_id,
            offer_id = %offer_id,
            tx_id = %receipt.tx_id,
            "[EXCHANGE] offer redeemed"
        );
        Ok(receipt)
    }
}
