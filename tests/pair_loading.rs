//! End-to-end pair loading through in-memory collaborators.
//!
//! Builds a USDC lending market with SOL collateral, loads both accounts
//! and prices concurrently, and checks the resulting views and health.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use paystream_market::allocator::RawSlot;
use paystream_market::market::{
    build_pair_view, encode_market_account, MatchPool, TraderPool, TraderRole, ViewContext,
};
use paystream_market::oracle::{FixedFeedClient, OracleClient, OraclePriceData, QuoteAssetClient};
use paystream_market::types::{MatchIdKey, MatchRecord, TraderKey, TraderRecord};
use paystream_market::{
    AccountSource, MarketConfig, MarketError, MarketPairLoader, MemoryAccountSource, Precision,
    Pubkey, Settings,
};

// ============================================================================
// FIXTURES
// ============================================================================

const ALICE: Pubkey = Pubkey::new([0xA1; 32]);
const BOB: Pubkey = Pubkey::new([0xB0; 32]);

const NOW: u64 = 1_700_000_000 + 10 * 86_400;

fn settings() -> Settings {
    Settings::from_toml_str(
        r#"
[[markets]]
name = "USDC/SOL"
market = "11111111111111111111111111111112"
collateral_market = "11111111111111111111111111111113"
mint = "11111111111111111111111111111114"
collateral_mint = "11111111111111111111111111111115"
mint_decimals = 6
collateral_decimals = 9
ltv_ratio = 8000
liquidation_threshold = 8500
collateral_ltv_ratio = 5000
collateral_liquidation_threshold = 6000
status = "active"
"#,
    )
    .unwrap()
}

/// USDC market: Alice lends 1,000 USDC of which 100 are matched to Bob.
fn usdc_account() -> Vec<u8> {
    let traders = TraderPool::from_parts(
        3,
        vec![
            RawSlot::new(
                0,
                TraderKey::new(ALICE),
                TraderRecord {
                    on_vault_lends: 900_000_000,
                    in_p2p_lends: 100_000_000,
                    flags: 1,
                    ..Default::default()
                },
            ),
            RawSlot::new(
                0,
                TraderKey::new(BOB),
                TraderRecord {
                    in_p2p_borrows: 100_000_000,
                    ..Default::default()
                },
            ),
        ],
    );
    let matches = MatchPool::from_parts(
        2,
        vec![RawSlot::new(
            0,
            MatchIdKey { match_id: 1 },
            MatchRecord {
                lender_index: 1,
                borrower_index: 2,
                amount_in_p2p: 100_000_000,
                original_amount: 100_000_000,
                match_timestamp: 1_700_000_000,
                last_interest_payment_timestamp: 1_700_000_000,
                total_interest_paid: 0,
            },
        )],
    );
    encode_market_account(1, &traders, &matches, 32, 128).unwrap()
}

/// SOL market: Bob pledges 1 SOL of collateral.
fn sol_account() -> Vec<u8> {
    let traders = TraderPool::from_parts(
        2,
        vec![RawSlot::new(
            0,
            TraderKey::new(BOB),
            TraderRecord {
                on_vault_lends: 1_000_000_000,
                collateral_amount: 1_000_000_000,
                ..Default::default()
            },
        )],
    );
    encode_market_account(0, &traders, &MatchPool::from_parts(1, vec![]), 32, 128).unwrap()
}

async fn accounts(config: &MarketConfig) -> MemoryAccountSource {
    let accounts = MemoryAccountSource::new();
    accounts.insert(config.market, usdc_account()).await;
    accounts.insert(config.collateral_market, sol_account()).await;
    accounts
}

/// Account source that answers after a delay.
struct SlowSource {
    inner: MemoryAccountSource,
    delay: Duration,
}

#[async_trait]
impl AccountSource for SlowSource {
    async fn fetch(&self, address: &Pubkey) -> Result<Vec<u8>, MarketError> {
        tokio::time::sleep(self.delay).await;
        self.inner.fetch(address).await
    }
}

/// Oracle that is always down.
struct FailingOracle;

#[async_trait]
impl OracleClient for FailingOracle {
    async fn price_data(&self) -> Result<OraclePriceData, MarketError> {
        Err(MarketError::Source {
            source_name: "oracle".to_string(),
            message: "feed unavailable".to_string(),
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[tokio::test]
async fn test_load_and_view_pair() {
    let settings = settings();
    let config = &settings.markets[0];
    let loader = MarketPairLoader::new(
        Arc::new(accounts(config).await),
        Arc::new(QuoteAssetClient::new(settings.precision)),
        Arc::new(FixedFeedClient::from_price(150_000_000).unwrap()),
    );

    let pair = loader.load(config, &settings.precision).await.unwrap();
    assert_eq!(pair.lending.traders.len(), 2);
    assert_eq!(pair.collateral.traders.len(), 1);

    let ctx = ViewContext {
        config,
        precision: &settings.precision,
        now: NOW,
        protocol_rates: None,
    };
    let view = build_pair_view(&pair.lending, &pair.collateral, &pair.prices, &ctx, None).unwrap();

    let lending = &view.lending;
    assert_eq!(lending.total_matches, 1);
    assert_eq!(lending.stats.total_supply.amount, 100_000_000);
    assert_eq!(lending.stats.lend_unmatched.amount, 900_000_000);
    assert_eq!(lending.stats.total_borrowed_p2p.amount, 100_000_000);
    assert_eq!(lending.stats.utilization_bps, 10_000);
    assert_eq!(lending.trader(&ALICE).unwrap().role, TraderRole::Lender);
    assert_eq!(lending.trader(&BOB).unwrap().role, TraderRole::Borrower);
    assert_eq!(lending.matches[0].duration_days, 10);
    assert_eq!(lending.matches[0].borrower.to_string(), BOB.to_string());

    // 1 SOL at $150 and 50% collateral LTV supports 75 USDC; Bob owes 100,
    // so the whole debt is settled from two thirds of his SOL
    let bob = view.lending_health[&BOB];
    assert_eq!(bob.collateral_value, 150_000_000);
    assert_eq!(bob.max_borrow, 75_000_000);
    assert!(bob.exceeds_ltv);
    assert_eq!(bob.collateral_ltv, Some(0));
    let liquidation = bob.liquidation.unwrap();
    assert_eq!(liquidation.debt_repaid, 100_000_000);
    assert_eq!(liquidation.collateral_seized, 666_666_666);
    assert!(view.collateral_health.is_empty());
}

#[tokio::test]
async fn test_load_tolerates_slow_accounts() {
    let settings = settings();
    let config = &settings.markets[0];
    let source = SlowSource {
        inner: accounts(config).await,
        delay: Duration::from_millis(20),
    };
    let loader = MarketPairLoader::new(
        Arc::new(source),
        Arc::new(QuoteAssetClient::new(settings.precision)),
        Arc::new(FixedFeedClient::from_price(150_000_000).unwrap()),
    );

    let pair = loader.load(config, &settings.precision).await.unwrap();
    assert_eq!(pair.lending.sequence_number, 1);
    assert_eq!(pair.prices.mint_price_in_collateral, 6_666);
}

#[tokio::test]
async fn test_oracle_failure_is_surfaced() {
    let settings = settings();
    let config = &settings.markets[0];
    let loader = MarketPairLoader::new(
        Arc::new(accounts(config).await),
        Arc::new(QuoteAssetClient::new(settings.precision)),
        Arc::new(FailingOracle),
    );

    let err = loader.load(config, &settings.precision).await.unwrap_err();
    assert!(matches!(err, MarketError::Source { .. }));
    assert!(!err.is_data_integrity());
}

#[tokio::test]
async fn test_truncated_account_is_data_integrity_failure() {
    let settings = settings();
    let config = &settings.markets[0];
    let accounts = accounts(config).await;
    accounts.insert(config.collateral_market, vec![0u8; 16]).await;

    let loader = MarketPairLoader::new(
        Arc::new(accounts),
        Arc::new(QuoteAssetClient::new(Precision::default())),
        Arc::new(FixedFeedClient::from_price(150_000_000).unwrap()),
    );

    let err = loader.load(config, &settings.precision).await.unwrap_err();
    assert!(matches!(err, MarketError::Decode(_)));
    assert!(err.is_data_integrity());
}
