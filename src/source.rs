//! Account fetching and concurrent pair loading.
//!
//! The crate does not ship a transport. Callers implement [`AccountSource`]
//! over whatever RPC client they use; [`MemoryAccountSource`] serves fixed
//! bytes for tests and offline inspection.
//!
//! Retries, timeouts and cancellation belong to the caller: a failed load
//! returns the first error and leaves nothing behind.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::MarketConfig;
use crate::error::{MarketError, NotFound};
use crate::market::{decode_market_snapshot, MarketPriceData, MarketSnapshot};
use crate::math::Precision;
use crate::oracle::OracleClient;
use crate::types::Pubkey;

/// Asynchronous source of raw account bytes.
#[async_trait]
pub trait AccountSource: Send + Sync {
    /// Current bytes of `address`.
    ///
    /// A missing account is [`MarketError::NotFound`]; transport failures
    /// are [`MarketError::Source`].
    async fn fetch(&self, address: &Pubkey) -> Result<Vec<u8>, MarketError>;
}

/// In-memory account store.
#[derive(Debug, Default, Clone)]
pub struct MemoryAccountSource {
    accounts: Arc<RwLock<HashMap<Pubkey, Vec<u8>>>>,
}

impl MemoryAccountSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store or replace the bytes of `address`.
    pub async fn insert(&self, address: Pubkey, data: Vec<u8>) {
        self.accounts.write().await.insert(address, data);
    }

    pub async fn remove(&self, address: &Pubkey) -> Option<Vec<u8>> {
        self.accounts.write().await.remove(address)
    }
}

#[async_trait]
impl AccountSource for MemoryAccountSource {
    async fn fetch(&self, address: &Pubkey) -> Result<Vec<u8>, MarketError> {
        self.accounts
            .read()
            .await
            .get(address)
            .cloned()
            .ok_or_else(|| {
                NotFound {
                    what: "account",
                    key: address.to_string(),
                }
                .into()
            })
    }
}

/// Both decoded markets of a pair with their prices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedPair {
    pub lending: MarketSnapshot,
    pub collateral: MarketSnapshot,
    pub prices: MarketPriceData,
}

/// Loads a market, its collateral partner and both prices concurrently.
pub struct MarketPairLoader {
    accounts: Arc<dyn AccountSource>,
    mint_oracle: Arc<dyn OracleClient>,
    collateral_oracle: Arc<dyn OracleClient>,
}

impl MarketPairLoader {
    pub fn new(
        accounts: Arc<dyn AccountSource>,
        mint_oracle: Arc<dyn OracleClient>,
        collateral_oracle: Arc<dyn OracleClient>,
    ) -> Self {
        Self {
            accounts,
            mint_oracle,
            collateral_oracle,
        }
    }

    /// Fetch both accounts and both prices, then decode each market.
    ///
    /// The four requests run concurrently and may complete in any order;
    /// each market is decoded independently of the other.
    ///
    /// # Errors
    ///
    /// The first fetch, oracle, decode or price error encountered.
    pub async fn load(
        &self,
        config: &MarketConfig,
        precision: &Precision,
    ) -> Result<LoadedPair, MarketError> {
        let (lending_bytes, collateral_bytes, mint_price, collateral_price) = tokio::try_join!(
            self.accounts.fetch(&config.market),
            self.accounts.fetch(&config.collateral_market),
            self.mint_oracle.price_data(),
            self.collateral_oracle.price_data(),
        )?;

        let lending =
            decode_market_snapshot(&lending_bytes, config.num_trader_slots, config.num_match_slots)?;
        let collateral = decode_market_snapshot(
            &collateral_bytes,
            config.num_trader_slots,
            config.num_match_slots,
        )?;
        let prices = MarketPriceData::from_oracle_prices(&mint_price, &collateral_price, precision)?;

        debug!(
            market = %config.market,
            collateral_market = %config.collateral_market,
            mint_price = prices.mint_price_usd,
            collateral_price = prices.collateral_price_usd,
            "loaded market pair"
        );

        Ok(LoadedPair {
            lending,
            collateral,
            prices,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{encode_market_account, MatchPool, TraderPool};
    use crate::oracle::{FixedFeedClient, QuoteAssetClient};

    fn empty_account(sequence: u64) -> Vec<u8> {
        encode_market_account(
            sequence,
            &TraderPool::from_parts(1, vec![]),
            &MatchPool::from_parts(1, vec![]),
            32,
            128,
        )
        .unwrap()
    }

    fn config() -> MarketConfig {
        crate::config::Settings::from_toml_str(
            r#"
[[markets]]
market = "11111111111111111111111111111112"
collateral_market = "11111111111111111111111111111113"
mint = "11111111111111111111111111111114"
collateral_mint = "11111111111111111111111111111115"
mint_decimals = 6
collateral_decimals = 9
ltv_ratio = 8000
liquidation_threshold = 8500
"#,
        )
        .unwrap()
        .markets
        .remove(0)
    }

    fn loader(accounts: MemoryAccountSource) -> MarketPairLoader {
        MarketPairLoader::new(
            Arc::new(accounts),
            Arc::new(QuoteAssetClient::new(Precision::default())),
            Arc::new(FixedFeedClient::from_price(150_000_000).unwrap()),
        )
    }

    #[tokio::test]
    async fn test_memory_source() {
        let source = MemoryAccountSource::new();
        let address = Pubkey::new([1u8; 32]);
        source.insert(address, vec![1, 2, 3]).await;

        assert_eq!(source.fetch(&address).await.unwrap(), vec![1, 2, 3]);
        assert_eq!(source.remove(&address).await, Some(vec![1, 2, 3]));
        assert!(matches!(
            source.fetch(&address).await,
            Err(MarketError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_load_pair() {
        let config = config();
        let accounts = MemoryAccountSource::new();
        accounts.insert(config.market, empty_account(3)).await;
        accounts.insert(config.collateral_market, empty_account(5)).await;

        let pair = loader(accounts).load(&config, &Precision::default()).await.unwrap();

        assert_eq!(pair.lending.sequence_number, 3);
        assert_eq!(pair.collateral.sequence_number, 5);
        assert_eq!(pair.prices.collateral_price_in_mint, 150_000_000);
    }

    #[tokio::test]
    async fn test_load_missing_collateral_account() {
        let config = config();
        let accounts = MemoryAccountSource::new();
        accounts.insert(config.market, empty_account(3)).await;

        let err = loader(accounts).load(&config, &Precision::default()).await.unwrap_err();
        assert!(matches!(err, MarketError::NotFound(_)));
        assert!(!err.is_data_integrity());
    }
}
