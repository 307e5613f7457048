/*
 * Explicit swap context handed to every component: chain bindings,
 * asset registry, pools and collaborators
 */

use ethers::types::Address;
use std::sync::Arc;
use crate::aggregator::AggregatorClient;
use crate::metrics::SwapMetrics;
use crate::models::{Result, SwapError};
use crate::rpc::ChainReader;
use crate::token::Asset;

#[derive(Debug, Clone, Copy)]
pub struct Contracts {
    pub protocol: Address,
    pub price: Address,
    pub pipeline: Address,
}

#[derive(Debug, Clone)]
pub struct TokenRegistry {
    pub primary: Asset,
    pub native: Asset,
    pub wrapped_native: Asset,
    pub erc20: Vec<Asset>,
}

impl TokenRegistry {
    #[must_use]
    pub fn by_symbol(&self, symbol: &str) -> Option<&Asset> {
        if self.native.symbol.eq_ignore_ascii_case(symbol) {
            return Some(&self.native);
        }
        self.erc20.iter().find(|a| a.symbol.eq_ignore_ascii_case(symbol))
    }

    #[must_use]
    pub fn by_address(&self, address: Address) -> Option<&Asset> {
        self.erc20.iter().find(|a| a.address() == Some(address))
    }

    #[must_use]
    pub fn is_primary(&self, asset: &Asset) -> bool {
        &self.primary == asset
    }
}

#[derive(Debug, Clone)]
pub struct Pool {
    pub name: String,
    pub address: Address,
    pub tokens: Vec<Asset>,
}

impl Pool {
    #[must_use]
    pub fn contains(&self, asset: &Asset) -> bool {
        self.tokens.iter().any(|t| t == asset)
    }

    pub fn pair_asset(&self, asset: &Asset) -> Result<&Asset> {
        if self.tokens.len() != 2 {
            return Err(SwapError::ConfigError(format!(
                "Pool {} has {} tokens; only pairs are supported",
                self.name,
                self.tokens.len()
            )));
        }
        match (&self.tokens[0], &self.tokens[1]) {
            (a, b) if a == asset => Ok(b),
            (a, b) if b == asset => Ok(a),
            _ => Err(SwapError::ConfigError(format!(
                "{} is not an underlying token of pool {}",
                asset.symbol, self.name
            ))),
        }
    }
}

pub struct SwapContext {
    pub chain_id: u64,
    pub tokens: TokenRegistry,
    pub pools: Vec<Pool>,
    pub contracts: Contracts,
    pub chain: Arc<dyn ChainReader>,
    pub aggregator: Arc<dyn AggregatorClient>,
    pub metrics: Arc<SwapMetrics>,
}

impl SwapContext {
    #[must_use]
    pub fn is_primary(&self, asset: &Asset) -> bool {
        self.tokens.is_primary(asset)
    }

    pub fn primary_pools(&self) -> impl Iterator<Item = &Pool> {
        self.pools
            .iter()
            .filter(move |p| p.tokens.len() == 2 && p.contains(&self.tokens.primary))
    }

    #[must_use]
    pub fn pool_by_address(&self, address: Address) -> Option<&Pool> {
        self.pools.iter().find(|p| p.address == address)
    }
}
