/*
 * Staleness-bounded cache of pool snapshots and relay asset USD prices
 */

use chrono::{DateTime, Duration, Utc};
use ethers::types::{Address, Bytes, I256, U256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info};
use crate::abi::{price as price_abi, protocol};
use crate::context::{Pool, SwapContext};
use crate::models::{Result, SwapError};
use crate::pipeline::{Clipboard, PipeCall};
use crate::token::{Amount, Asset};

pub const DEFAULT_MAX_STALE_SECS: i64 = 15 * 60;

const USD_DECIMALS: u32 = protocol::USD_DECIMALS;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub pool: Address,
    pub reserves: Vec<Amount>,
    pub price: Amount,
    pub liquidity: Amount,
    pub delta_b: I256,
    pub lp_usd: Amount,
    pub lp_bdv: Amount,
}

/// Immutable result of one refresh. Replaced wholesale, never edited.
#[derive(Debug, Clone, Default)]
pub struct PriceSnapshot {
    pub pools: HashMap<Address, PoolSnapshot>,
    pub prices: HashMap<Asset, Amount>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl PriceSnapshot {
    /// USD price of `asset`, zero when unknown.
    #[must_use]
    pub fn token_usd(&self, asset: &Asset) -> Amount {
        self.prices
            .get(asset)
            .cloned()
            .unwrap_or_else(|| Amount::zero(USD_DECIMALS))
    }

    #[must_use]
    pub fn has_reserves_and_prices(&self, pool: &Pool) -> bool {
        let Some(snapshot) = self.pools.get(&pool.address) else {
            return false;
        };
        snapshot.reserves.len() == pool.tokens.len()
            && snapshot.reserves.iter().all(Amount::is_positive)
            && snapshot.price.is_positive()
            && pool.tokens.iter().all(|t| self.token_usd(t).is_positive())
    }

    #[must_use]
    pub fn same_state(&self, other: &PriceSnapshot) -> bool {
        self.pools == other.pools && self.prices == other.prices
    }
}

pub struct PriceCache {
    ctx: Arc<SwapContext>,
    max_stale: Duration,
    snapshot: RwLock<Arc<PriceSnapshot>>,
}

impl PriceCache {
    #[must_use]
    pub fn new(ctx: Arc<SwapContext>, max_stale: Duration) -> Self {
        Self {
            ctx,
            max_stale,
            snapshot: RwLock::new(Arc::new(PriceSnapshot::default())),
        }
    }

    pub async fn snapshot(&self) -> Arc<PriceSnapshot> {
        self.snapshot.read().await.clone()
    }

    pub async fn is_stale(&self) -> bool {
        match self.snapshot.read().await.last_updated {
            Some(at) => Utc::now() - at > self.max_stale,
            None => true,
        }
    }

    pub async fn refresh(&self, force: bool) -> Result<bool> {
        if !force && !self.is_stale().await {
            debug!("Price cache is fresh; skipping refresh");
            self.record("skipped");
            return Ok(false);
        }

        match self.fetch().await {
            Ok(next) => {
                info!(
                    "Price cache refreshed: {} pools, {} prices",
                    next.pools.len(),
                    next.prices.len()
                );
                *self.snapshot.write().await = Arc::new(next);
                self.record("refreshed");
                Ok(true)
            }
            Err(e) => {
                error!("Price cache refresh failed; keeping previous state: {}", e);
                self.record("failed");
                Err(e)
            }
        }
    }

    pub async fn get_token_usd(&self, asset: &Asset) -> Amount {
        self.snapshot().await.token_usd(asset)
    }

    pub async fn has_reserves_and_prices(&self, pool: &Pool) -> bool {
        self.snapshot().await.has_reserves_and_prices(pool)
    }

    fn record(&self, outcome: &str) {
        self.ctx
            .metrics
            .cache_refreshes
            .with_label_values(&[outcome])
            .inc();
    }

    fn relay_assets(&self) -> Vec<Asset> {
        let mut assets: Vec<Asset> = Vec::new();
        for pool in self.ctx.primary_pools() {
            for token in &pool.tokens {
                if !self.ctx.is_primary(token) && !assets.contains(token) {
                    assets.push(token.clone());
                }
            }
        }
        assets
    }

    async fn fetch(&self) -> Result<PriceSnapshot> {
        let ctx = &self.ctx;
        let relays = self.relay_assets();
        let empty = Clipboard::Empty.encode();

        let mut calls = vec![PipeCall {
            target: ctx.contracts.price,
            call_data: price_abi::encode_price(),
            clipboard: empty.clone(),
        }];
        for asset in &relays {
            calls.push(PipeCall {
                target: ctx.contracts.protocol,
                call_data: protocol::encode_get_token_usd_price(asset.require_address("price cache")?),
                clipboard: empty.clone(),
            });
        }

        debug!("Price cache batched read: 1 price call, {} usd price calls", relays.len());
        let results = ctx.chain.advanced_pipe(calls, U256::zero()).await?;
        if results.len() != relays.len() + 1 {
            return Err(SwapError::decode(
                "price cache batch",
                format!("expected {} results, got {}", relays.len() + 1, results.len()),
            ));
        }
        let (report_raw, usd_raw) = results
            .split_first()
            .ok_or_else(|| SwapError::decode("price cache batch", "empty result"))?;

        let report = price_abi::decode_price(report_raw)?;

        let mut prices = HashMap::new();
        prices.insert(
            ctx.tokens.primary.clone(),
            Amount::from_blockchain(report.price, USD_DECIMALS),
        );
        for (asset, raw) in relays.iter().zip(usd_raw) {
            let usd = decode_usd(asset, raw)?;
            prices.insert(asset.clone(), usd);
        }
        if let Some(wrapped) = prices.get(&ctx.tokens.wrapped_native).cloned() {
            prices.insert(ctx.tokens.native.clone(), wrapped);
        }

        let mut pools = HashMap::new();
        for data in report.pools {
            let Some(pool) = ctx.pool_by_address(data.pool) else {
                debug!("Ignoring unregistered pool {:?} in price report", data.pool);
                continue;
            };
            let reserves = pool
                .tokens
                .iter()
                .map(|asset| {
                    let address = asset.require_address(&pool.name)?;
                    data.tokens
                        .iter()
                        .position(|t| *t == address)
                        .map(|i| asset.from_blockchain(data.balances[i]))
                        .ok_or_else(|| {
                            SwapError::decode(
                                "price report",
                                format!("pool {} does not list {}", pool.name, asset.symbol),
                            )
                        })
                })
                .collect::<Result<Vec<_>>>()?;

            pools.insert(
                pool.address,
                PoolSnapshot {
                    pool: pool.address,
                    reserves,
                    price: Amount::from_blockchain(data.price, USD_DECIMALS),
                    liquidity: Amount::from_blockchain(data.liquidity, USD_DECIMALS),
                    delta_b: data.delta_b,
                    lp_usd: Amount::from_blockchain(data.lp_usd, USD_DECIMALS),
                    lp_bdv: Amount::from_blockchain(data.lp_bdv, USD_DECIMALS),
                },
            );
        }

        Ok(PriceSnapshot {
            pools,
            prices,
            last_updated: Some(Utc::now()),
        })
    }
}

fn decode_usd(asset: &Asset, raw: &Bytes) -> Result<Amount> {
    let value = protocol::decode_get_token_usd_price(&asset.symbol, raw)?;
    Ok(Amount::from_blockchain(value, USD_DECIMALS))
}
