//! End-to-end exchange scenarios over in-process collaborators.
//!
//! Ledger, offer cache and quotes are all fakes, so these run without
//! PostgreSQL or Redis.

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::accounts::AccountService;
use crate::auth::TokenCodec;
use crate::config::ExchangeConfig;
use crate::error::ErrorKind;
use crate::exchange::ExchangeService;
use crate::ledger::mock::MemoryLedger;
use crate::ledger::{DEPOSIT_CLIENT_ID, Ledger};
use crate::money::AssetKind;
use crate::offers::{MemoryOfferStore, Offer, OfferStore};
use crate::quotes::mock::FixedQuotes;

/// Helper wiring both services over shared fakes
struct TestHarness {
    exchange: ExchangeService,
    accounts: AccountService,
    ledger: Arc<MemoryLedger>,
    offers: Arc<MemoryOfferStore>,
    quotes: Arc<FixedQuotes>,
    codec: TokenCodec,
}

impl TestHarness {
    fn new() -> Self {
        let ledger = Arc::new(MemoryLedger::new());
        let offers = Arc::new(MemoryOfferStore::new());
        let quotes = Arc::new(
            FixedQuotes::new()
                .with_rate("USD", "CAD", dec!(1.3500))
                .with_rate("USD", "BTC", dec!(25000))
                .with_rate("USD", "DOGE", dec!(100000000000)),
        );
        let codec = TokenCodec::new(&[42u8; 32]);
        let config = ExchangeConfig::default();

        let exchange = ExchangeService::new(
            ledger.clone(),
            offers.clone(),
            quotes.clone(),
            codec.clone(),
            &config,
        );
        let accounts = AccountService::new(ledger.clone(), codec.clone(), &config);

        Self {
            exchange,
            accounts,
            ledger,
            offers,
            quotes,
            codec,
        }
    }

    async fn client(&self) -> Uuid {
        let client = Uuid::new_v4();
        self.ledger.register_client(client).await;
        client
    }

    async fn balance(&self, kind: AssetKind, client: Uuid, code: &str) -> Decimal {
        self.ledger.balance(kind, client, code).await.unwrap().balance
    }

    /// `C1` with `USD=1000.00` and empty `CAD`/`BTC` accounts
    async fn funded_client(&self) -> Uuid {
        let client = self.client().await;
        self.accounts.open_fiat(client, "USD").await.unwrap();
        self.accounts.open_fiat(client, "CAD").await.unwrap();
        self.accounts.open_crypto(client, "BTC").await.unwrap();
        self.accounts
            .deposit_fiat(client, "USD", dec!(1000.00))
            .await
            .unwrap();
        client
    }

    /// Cache an offer directly and return its sealed id
    async fn plant_offer(&self, offer: &Offer) -> String {
        let offer_id = Uuid::new_v4().simple().to_string();
        self.offers
            .put(&offer_id, offer, Duration::from_secs(600))
            .await
            .unwrap();
        self.codec.encode_str(&offer_id).unwrap()
    }
}

// ========================================================================
// Literal scenarios
// ========================================================================

/// S1: deposit into an existing fiat account
#[tokio::test]
async fn test_s1_deposit() {
    let h = TestHarness::new();
    let client = h.client().await;
    h.accounts.open_fiat(client, "USD").await.unwrap();

    let receipt = h
        .accounts
        .deposit_fiat(client, "USD", dec!(1024.55))
        .await
        .unwrap();
    assert_eq!(receipt.balance, dec!(1024.55));
    assert_eq!(receipt.last_tx, dec!(1024.55));

    let rows = h.ledger.journal().await;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows.iter().map(|r| r.amount).sum::<Decimal>(), Decimal::ZERO);
    assert!(rows.iter().all(|r| r.tx_id == receipt.tx_id));
    assert!(rows.iter().any(|r| r.client_id == DEPOSIT_CLIENT_ID));

    let account = h.ledger.balance(AssetKind::Fiat, client, "USD").await.unwrap();
    assert_eq!(account.balance.to_string(), "1024.55");
    assert_eq!(account.last_tx, dec!(1024.55));
}

/// S2: fiat to fiat at 1.35
#[tokio::test]
async fn test_s2_fiat_to_fiat() {
    let h = TestHarness::new();
    let client = h.funded_client().await;

    let offer = h
        .exchange
        .prepare_fiat_offer(client, "USD", "CAD", dec!(100.00))
        .await
        .unwrap();
    assert_eq!(offer.credit_amount.to_string(), "135.00");
    assert!(!offer.is_crypto_purchase && !offer.is_crypto_sale);

    let receipt = h
        .exchange
        .redeem_fiat_offer(client, &offer.offer_id)
        .await
        .unwrap();
    assert_eq!(h.balance(AssetKind::Fiat, client, "USD").await, dec!(900.00));
    assert_eq!(h.balance(AssetKind::Fiat, client, "CAD").await, dec!(135.00));
    assert_eq!(receipt.debit.amount, dec!(-100.00));
    assert_eq!(receipt.debit.code, "USD");
    assert_eq!(receipt.credit.amount, dec!(135.00));
    assert_eq!(receipt.credit.code, "CAD");
    assert_eq!(receipt.debit.tx_id, receipt.credit.tx_id);
}

/// S3: buy BTC at 25 000
#[tokio::test]
async fn test_s3_crypto_purchase() {
    let h = TestHarness::new();
    let client = h.funded_client().await;

    let offer = h
        .exchange
        .prepare_crypto_offer(client, "USD", "BTC", dec!(500.00), true)
        .await
        .unwrap();
    assert_eq!(offer.rate, dec!(25000));
    assert_eq!(offer.credit_amount.to_string(), "0.02000000");
    assert!(offer.is_crypto_purchase && !offer.is_crypto_sale);

    h.exchange
        .redeem_crypto_offer(client, &offer.offer_id)
        .await
        .unwrap();
    assert_eq!(h.balance(AssetKind::Fiat, client, "USD").await, dec!(500.00));
    assert_eq!(
        h.balance(AssetKind::Crypto, client, "BTC").await.to_string(),
        "0.02000000"
    );
}

/// S4: the same offer redeemed twice
#[tokio::test]
async fn test_s4_second_redeem_expired() {
    let h = TestHarness::new();
    let client = h.funded_client().await;
    let offer = h
        .exchange
        .prepare_crypto_offer(client, "USD", "BTC", dec!(500.00), true)
        .await
        .unwrap();

    h.exchange
        .redeem_crypto_offer(client, &offer.offer_id)
        .await
        .unwrap();
    let err = h
        .exchange
        .redeem_crypto_offer(client, &offer.offer_id)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::OfferExpired);
    assert_eq!(err.status(), 408);

    assert_eq!(h.balance(AssetKind::Fiat, client, "USD").await, dec!(500.00));
    assert_eq!(h.ledger.journal().await.len(), 4, "deposit + one exchange");
}

/// S5: balances paged two at a time
#[tokio::test]
async fn test_s5_paginated_balances() {
    let h = TestHarness::new();
    let client = h.client().await;
    for code in ["USD", "AED", "CAD"] {
        h.accounts.open_fiat(client, code).await.unwrap();
    }

    let first = h
        .accounts
        .balances_page(AssetKind::Fiat, client, None, Some(2))
        .await
        .unwrap();
    let codes: Vec<_> = first.account_balances.iter().map(|a| a.code.clone()).collect();
    assert_eq!(codes, ["AED", "CAD"]);
    let cursor = first.next_cursor.expect("second page expected");
    assert!(!cursor.is_empty());

    let second = h
        .accounts
        .balances_page(AssetKind::Fiat, client, Some(&cursor), Some(2))
        .await
        .unwrap();
    let codes: Vec<_> = second.account_balances.iter().map(|a| a.code.clone()).collect();
    assert_eq!(codes, ["USD"]);
    assert!(second.next_cursor.is_none());
}

/// S6: another client cannot redeem, the owner still can
#[tokio::test]
async fn test_s6_cross_client_rejection() {
    let h = TestHarness::new();
    let owner = h.funded_client().await;
    let intruder = h.funded_client().await;

    let offer = h
        .exchange
        .prepare_crypto_offer(owner, "USD", "BTC", dec!(500.00), true)
        .await
        .unwrap();

    let err = h
        .exchange
        .redeem_crypto_offer(intruder, &offer.offer_id)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Forbidden);
    assert_eq!(h.balance(AssetKind::Fiat, intruder, "USD").await, dec!(1000.00));
    assert_eq!(h.offers.len(), 1, "offer left in place");

    h.exchange
        .redeem_crypto_offer(owner, &offer.offer_id)
        .await
        .unwrap();
    assert_eq!(h.balance(AssetKind::Fiat, owner, "USD").await, dec!(500.00));
}

// ========================================================================
// Properties
// ========================================================================

#[tokio::test]
async fn test_concurrent_redeem_single_winner() {
    let h = Arc::new(TestHarness::new());
    let client = h.funded_client().await;
    let offer = h
        .exchange
        .prepare_crypto_offer(client, "USD", "BTC", dec!(100.00), true)
        .await
        .unwrap();
    let rows_before = h.ledger.journal().await.len();

    let (a, b) = tokio::join!(
        h.exchange.redeem_crypto_offer(client, &offer.offer_id),
        h.exchange.redeem_crypto_offer(client, &offer.offer_id),
    );
    let results = [a, b];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let failure = results.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert_eq!(failure.kind, ErrorKind::OfferExpired);

    assert_eq!(h.ledger.journal().await.len(), rows_before + 2);
    assert_eq!(h.balance(AssetKind::Fiat, client, "USD").await, dec!(900.00));
}

#[tokio::test]
async fn test_many_concurrent_redeems() {
    let h = Arc::new(TestHarness::new());
    let client = h.funded_client().await;
    let offer = h
        .exchange
        .prepare_fiat_offer(client, "USD", "CAD", dec!(10.00))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..16 {
        let h = h.clone();
        let token = offer.offer_id.clone();
        handles.push(tokio::spawn(async move {
            h.exchange.redeem_fiat_offer(client, &token).await
        }));
    }
    let mut wins = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => wins += 1,
            Err(e) => assert_eq!(e.kind, ErrorKind::OfferExpired),
        }
    }
    assert_eq!(wins, 1);
    assert_eq!(h.balance(AssetKind::Fiat, client, "CAD").await, dec!(13.50));
}

#[tokio::test]
async fn test_offer_past_deadline_expired() {
    let h = TestHarness::new();
    let client = h.funded_client().await;
    let skew = ExchangeConfig::default().clock_skew_secs as i64;

    let token = h
        .plant_offer(&Offer {
            client_id: client,
            source: "USD".to_string(),
            destination: "CAD".to_string(),
            debit_amount: dec!(100.00),
            rate: dec!(1.35),
            credit_amount: dec!(135.00),
            is_crypto_purchase: false,
            is_crypto_sale: false,
            expires_at: Utc::now().timestamp() - skew - 5,
        })
        .await;

    let err = h.exchange.redeem_fiat_offer(client, &token).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::OfferExpired);
    assert_eq!(h.balance(AssetKind::Fiat, client, "CAD").await, dec!(0.00));
}

#[tokio::test]
async fn test_offer_within_skew_accepted() {
    let h = TestHarness::new();
    let client = h.funded_client().await;

    let token = h
        .plant_offer(&Offer {
            client_id: client,
            source: "USD".to_string(),
            destination: "CAD".to_string(),
            debit_amount: dec!(100.00),
            rate: dec!(1.35),
            credit_amount: dec!(135.00),
            is_crypto_purchase: false,
            is_crypto_sale: false,
            expires_at: Utc::now().timestamp() + 30,
        })
        .await;

    assert!(h.exchange.redeem_fiat_offer(client, &token).await.is_ok());
}

#[tokio::test]
async fn test_journal_balances_for_every_exchange() {
    let h = TestHarness::new();
    let client = h.funded_client().await;

    let buy = h
        .exchange
        .prepare_crypto_offer(client, "USD", "BTC", dec!(250.00), true)
        .await
        .unwrap();
    let buy = h
        .exchange
        .redeem_crypto_offer(client, &buy.offer_id)
        .await
        .unwrap();

    let sell = h
        .exchange
        .prepare_crypto_offer(client, "BTC", "USD", dec!(0.004), false)
        .await
        .unwrap();
    assert_eq!(sell.credit_amount, dec!(100.00));
    let sell = h
        .exchange
        .redeem_crypto_offer(client, &sell.offer_id)
        .await
        .unwrap();

    for receipt in [&buy, &sell] {
        let rows = h
            .accounts
            .transaction_details(AssetKind::Crypto, client, receipt.tx_id)
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].transacted_at, rows[1].transacted_at);
    }

    let usd = h.ledger.balance(AssetKind::Fiat, client, "USD").await.unwrap();
    assert_eq!(usd.balance, dec!(850.00));
    assert_eq!(usd.last_tx, dec!(100.00));
    let btc = h.ledger.balance(AssetKind::Crypto, client, "BTC").await.unwrap();
    assert_eq!(btc.balance, dec!(0.006));
    assert_eq!(btc.last_tx, dec!(-0.004));

    // Every posting nets to zero per currency it touches
    let journal = h.ledger.journal().await;
    let net_usd: Decimal = journal
        .iter()
        .filter(|e| e.client_id == client && e.code == "USD")
        .map(|e| e.amount)
        .sum();
    assert_eq!(net_usd, usd.balance);
}

#[tokio::test]
async fn test_redeem_into_unopened_account_fails_transaction() {
    let h = TestHarness::new();
    let client = h.client().await;
    h.accounts.open_fiat(client, "USD").await.unwrap();
    h.accounts
        .deposit_fiat(client, "USD", dec!(1000.00))
        .await
        .unwrap();
    let offer = h
        .exchange
        .prepare_crypto_offer(client, "USD", "BTC", dec!(500.00), true)
        .await
        .unwrap();

    let err = h
        .exchange
        .redeem_crypto_offer(client, &offer.offer_id)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::TransactFailed);
    assert_eq!(err.status(), 500);

    assert_eq!(h.balance(AssetKind::Fiat, client, "USD").await, dec!(1000.00));
    assert_eq!(h.ledger.journal().await.len(), 2, "deposit only");
}

#[tokio::test]
async fn test_deposit_into_unopened_account_fails_transaction() {
    let h = TestHarness::new();
    let client = h.client().await;

    let err = h
        .accounts
        .deposit_fiat(client, "USD", dec!(10.00))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::TransactFailed);
    assert!(h.ledger.journal().await.is_empty());
}

#[tokio::test]
async fn test_redeem_on_wrong_endpoint_keeps_offer() {
    let h = TestHarness::new();
    let client = h.funded_client().await;
    let offer = h
        .exchange
        .prepare_crypto_offer(client, "USD", "BTC", dec!(10.00), true)
        .await
        .unwrap();

    let err = h
        .exchange
        .redeem_fiat_offer(client, &offer.offer_id)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::BadRequest);
    assert!(
        h.exchange
            .redeem_crypto_offer(client, &offer.offer_id)
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_both_flags_rejected() {
    let h = TestHarness::new();
    let client = h.funded_client().await;
    let token = h
        .plant_offer(&Offer {
            client_id: client,
            source: "USD".to_string(),
            destination: "BTC".to_string(),
            debit_amount: dec!(1.00),
            rate: dec!(25000),
            credit_amount: dec!(0.00004),
            is_crypto_purchase: true,
            is_crypto_sale: true,
            expires_at: Utc::now().timestamp() + 60,
        })
        .await;
    let err = h.exchange.redeem_crypto_offer(client, &token).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::BadRequest);
}

#[tokio::test]
async fn test_tampered_offer_id_rejected() {
    let h = TestHarness::new();
    let client = h.funded_client().await;
    let offer = h
        .exchange
        .prepare_fiat_offer(client, "USD", "CAD", dec!(1.00))
        .await
        .unwrap();

    let mut tampered = offer.offer_id.into_bytes();
    tampered[4] = if tampered[4] == b'A' { b'B' } else { b'A' };
    let tampered = String::from_utf8(tampered).unwrap();

    let err = h
        .exchange
        .redeem_fiat_offer(client, &tampered)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::BadRequest);
}

#[tokio::test]
async fn test_prepare_validation() {
    let h = TestHarness::new();
    let client = h.funded_client().await;

    let cases = [
        ("USD", "CAD", dec!(0)),
        ("USD", "CAD", dec!(1.001)),
        ("USD", "QQQ", dec!(1)),
        ("USD", "USD", dec!(1)),
        ("BTC", "CAD", dec!(1)),
    ];
    for (source, destination, amount) in cases {
        let err = h
            .exchange
            .prepare_fiat_offer(client, source, destination, amount)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadRequest, "{source}->{destination} {amount}");
        assert!(err.payload.is_some());
    }

    // Crypto side allows 8 places, not 9
    assert!(
        h.exchange
            .prepare_crypto_offer(client, "BTC", "USD", dec!(0.000000001), false)
            .await
            .is_err()
    );
    // Purchase must start from fiat
    assert!(
        h.exchange
            .prepare_crypto_offer(client, "BTC", "USD", dec!(1), true)
            .await
            .is_err()
    );
    assert_eq!(h.offers.len(), 0);
}

#[tokio::test]
async fn test_amount_too_small() {
    let h = TestHarness::new();
    let client = h.client().await;
    // 0.01 USD at 1e11 USD per DOGE rounds to zero DOGE
    let err = h
        .exchange
        .prepare_crypto_offer(client, "USD", "DOGE", dec!(0.01), true)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::BadRequest);
    assert_eq!(h.offers.len(), 0);
}

#[tokio::test]
async fn test_quote_failure_is_upstream() {
    let h = TestHarness::new();
    let client = h.funded_client().await;
    h.quotes.set_fail(true);

    let err = h
        .exchange
        .prepare_fiat_offer(client, "USD", "CAD", dec!(1.00))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Upstream);
    assert!(err.kind.is_retryable());
    assert_eq!(h.quotes.calls(), 1);
}

#[tokio::test]
async fn test_insufficient_funds_consumes_offer() {
    let h = TestHarness::new();
    let client = h.funded_client().await;
    let offer = h
        .exchange
        .prepare_fiat_offer(client, "USD", "CAD", dec!(5000.00))
        .await
        .unwrap();

    let err = h
        .exchange
        .redeem_fiat_offer(client, &offer.offer_id)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::BadRequest);
    assert_eq!(h.balance(AssetKind::Fiat, client, "USD").await, dec!(1000.00));

    let err = h
        .exchange
        .redeem_fiat_offer(client, &offer.offer_id)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::OfferExpired);
}

#[tokio::test]
async fn test_posting_failure_is_transact_failed() {
    let h = TestHarness::new();
    let client = h.funded_client().await;
    let offer = h
        .exchange
        .prepare_fiat_offer(client, "USD", "CAD", dec!(1.00))
        .await
        .unwrap();
    let rows_before = h.ledger.journal().await.len();

    h.ledger.set_fail_postings(true);
    let err = h
        .exchange
        .redeem_fiat_offer(client, &offer.offer_id)
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::TransactFailed);
    assert_eq!(h.ledger.journal().await.len(), rows_before);
}
