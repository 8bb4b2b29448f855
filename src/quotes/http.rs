//! Quote provider backed by two HTTP market-data APIs.
//!
//! - fiat: Fixer-compatible `GET {endpoint}?from=&to=&amount=`, rate at `info.rate`
//! - crypto: CoinAPI-compatible `GET {endpoint}/{crypto}/{fiat}`, rate at `rate`

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

use super::{Quote, QuoteError, QuoteProvider, convert_with_rate};
use crate::config::{QuoteEndpointConfig, QuotesConfig};

#[derive(Debug, Deserialize)]
struct FiatInfo {
    rate: Decimal,
}

#[derive(Debug, Deserialize)]
struct FiatResponse {
    #[serde(default = "default_success")]
    success: bool,
    info: Option<FiatInfo>,
}

fn default_success() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct CryptoResponse {
    rate: Decimal,
}

pub(crate) fn parse_fiat_rate(body: &str) -> Result<Decimal, QuoteError> {
    let parsed: FiatResponse =
        serde_json::from_str(body).map_err(|e| QuoteError::Decode(e.to_string()))?;
    if !parsed.success {
        return Err(QuoteError::Unavailable("fiat provider reported failure".to_string()));
    }
    parsed
        .info
        .map(|info| info.rate)
        .ok_or_else(|| QuoteError::Decode("missing info.rate".to_string()))
}

pub(crate) fn parse_crypto_rate(body: &str) -> Result<Decimal, QuoteError> {
    let parsed: CryptoResponse =
        serde_json::from_str(body).map_err(|e| QuoteError::Decode(e.to_string()))?;
    Ok(parsed.rate)
}

pub struct HttpQuoteProvider {
    client: reqwest::Client,
    fiat: QuoteEndpointConfig,
    crypto: QuoteEndpointConfig,
}

impl HttpQuoteProvider {
    pub fn new(config: &QuotesConfig) -> Result<Self, QuoteError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| QuoteError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            fiat: config.fiat.clone(),
            crypto: config.crypto.clone(),
        })
    }

    async fn fetch(
        &self,
        endpoint: &QuoteEndpointConfig,
        request: reqwest::RequestBuilder,
    ) -> Result<String, QuoteError> {
        let response = request
            .header(endpoint.header_key.as_str(), endpoint.api_key.as_str())
            .send()
            .await
            .map_err(|e| QuoteError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(QuoteError::Unavailable(format!(
                "{} answered {}",
                endpoint.endpoint, status
            )));
        }

        response
            .text()
            .await
            .map_err(|e| QuoteError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl QuoteProvider for HttpQuoteProvider {
    async fn fiat_conversion(
        &self,
        source: &str,
        destination: &str,
        amount: Decimal,
    ) -> Result<Quote, QuoteError> {
        let amount_text = amount.to_string();
        let request = self.client.get(&self.fiat.endpoint).query(&[
            ("from", source),
            ("to", destination),
            ("amount", amount_text.as_str()),
        ]);
        let body = self.fetch(&self.fiat, request).await?;
        let rate = parse_fiat_rate(&body)?;
        if rate <= Decimal::ZERO {
            return Err(QuoteError::Unavailable(format!("non-positive rate {}", rate)));
        }

        let converted = amount
            .checked_mul(rate)
            .ok_or_else(|| QuoteError::Unavailable("conversion overflow".to_string()))?;
        tracing::debug!(source, destination, %rate, "fiat quote");
        Ok(Quote {
            rate,
            amount: converted,
        })
    }

    async fn crypto_conversion(
        &self,
        source: &str,
        destination: &str,
        amount: Decimal,
        is_purchase: bool,
    ) -> Result<Quote, QuoteError> {
        let (fiat, crypto) = if is_purchase {
            (source, destination)
        } else {
            (destination, source)
        };
        let url = format!(
            "{}/{}/{}",
            self.crypto.endpoint.trim_end_matches('/'),
            crypto,
            fiat
        );
        let body = self.fetch(&self.crypto, self.client.get(url)).await?;
        let rate = parse_crypto_rate(&body)?;
        let converted = convert_with_rate(rate, amount, is_purchase)?;
        tracing::debug!(fiat, crypto, %rate, is_purchase, "crypto quote");
        Ok(Quote {
            rate,
            amount: converted,
        })
    }
}
