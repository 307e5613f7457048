/*
 * Configuration management for the pipeswap service
 */

use crate::context::{Contracts, Pool, TokenRegistry};
use crate::models::{Result, SwapError};
use crate::token::Asset;
use crate::utils::parse_address;
use config::{File, FileFormat};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

pub const DEFAULT_CHAIN_ID: u64 = 42161;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub chain: ChainConfig,
    pub aggregator: AggregatorConfig,
    pub trading: TradingConfig,
    pub registry_path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub chain_id: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AggregatorConfig {
    pub url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TradingConfig {
    pub default_slippage: Decimal,
    pub cache_max_stale_secs: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("SERVER_PORT")
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()
                    .map_err(|e| SwapError::ConfigError(format!("Invalid port: {e}")))?,
                log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            },
            chain: ChainConfig {
                rpc_url: env::var("RPC_URL")
                    .map_err(|_| SwapError::ConfigError("RPC_URL not set".to_string()))?,
                chain_id: env::var("CHAIN_ID")
                    .unwrap_or_else(|_| DEFAULT_CHAIN_ID.to_string())
                    .parse()
                    .map_err(|e| SwapError::ConfigError(format!("Invalid CHAIN_ID: {e}")))?,
            },
            aggregator: AggregatorConfig {
                url: env::var("AGGREGATOR_URL")
                    .unwrap_or_else(|_| crate::aggregator::DEFAULT_ENDPOINT.to_string()),
                api_key: env::var("AGGREGATOR_API_KEY").unwrap_or_default(),
            },
            trading: TradingConfig {
                default_slippage: Decimal::from_str(
                    &env::var("DEFAULT_SLIPPAGE").unwrap_or_else(|_| "0.005".to_string()),
                )
                .map_err(|e| SwapError::ConfigError(format!("Invalid DEFAULT_SLIPPAGE: {e}")))?,
                cache_max_stale_secs: env::var("CACHE_MAX_STALE_SECS")
                    .unwrap_or_else(|_| crate::cache::DEFAULT_MAX_STALE_SECS.to_string())
                    .parse()
                    .map_err(|e| SwapError::ConfigError(format!("Invalid CACHE_MAX_STALE_SECS: {e}")))?,
            },
            registry_path: env::var("REGISTRY_PATH").unwrap_or_else(|_| "registry.toml".to_string()),
        })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenEntry {
    pub symbol: String,
    pub address: String,
    pub decimals: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolEntry {
    pub name: String,
    pub address: String,
    pub tokens: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContractsEntry {
    pub protocol: String,
    pub price: String,
    pub pipeline: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Registry {
    pub native: String,
    pub primary: String,
    pub wrapped_native: String,
    pub tokens: Vec<TokenEntry>,
    #[serde(default)]
    pub pools: Vec<PoolEntry>,
    pub contracts: ContractsEntry,
}

fn config_error(e: config::ConfigError) -> SwapError {
    SwapError::ConfigError(format!("Invalid registry: {e}"))
}

impl Registry {
    pub fn load(path: &str) -> Result<Self> {
        config::Config::builder()
            .add_source(File::new(path, FileFormat::Toml))
            .build()
            .and_then(config::Config::try_deserialize)
            .map_err(config_error)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        config::Config::builder()
            .add_source(File::from_str(raw, FileFormat::Toml))
            .build()
            .and_then(config::Config::try_deserialize)
            .map_err(config_error)
    }

    pub fn resolve(&self, chain_id: u64) -> Result<(TokenRegistry, Vec<Pool>, Contracts)> {
        let native = Asset::native(chain_id, &self.native);
        let erc20 = self
            .tokens
            .iter()
            .map(|t| Ok(Asset::erc20(chain_id, &t.symbol, parse_address(&t.address)?, t.decimals)))
            .collect::<Result<Vec<_>>>()?;

        let find = |symbol: &str| -> Result<Asset> {
            erc20
                .iter()
                .find(|a| a.symbol.eq_ignore_ascii_case(symbol))
                .cloned()
                .ok_or_else(|| SwapError::ConfigError(format!("Unknown token symbol: {symbol}")))
        };

        let tokens = TokenRegistry {
            primary: find(self.primary.as_str())?,
            wrapped_native: find(self.wrapped_native.as_str())?,
            native,
            erc20: erc20.clone(),
        };

        let pools = self
            .pools
            .iter()
            .map(|p| {
                Ok(Pool {
                    name: p.name.clone(),
                    address: parse_address(&p.address)?,
                    tokens: p.tokens.iter().map(|s| find(s.as_str())).collect::<Result<Vec<_>>>()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let contracts = Contracts {
            protocol: parse_address(&self.contracts.protocol)?,
            price: parse_address(&self.contracts.price)?,
            pipeline: parse_address(&self.contracts.pipeline)?,
        };

        Ok((tokens, pools, contracts))
    }
}
