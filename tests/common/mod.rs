/*
 * In-memory chain and aggregator used by the integration tests
 */

#![allow(dead_code)]

use async_trait::async_trait;
use ethers::abi::{decode, encode, ParamType, Token};
use ethers::types::{Address, Bytes, H256, I256, U256};
use pipeswap::abi::price::{encode_price_report, PoolPriceData, PriceReport};
use pipeswap::abi::{pool as pool_abi, price as price_abi, protocol, selector, split_call};
use pipeswap::aggregator::{AggregatorClient, AggregatorQuote, AggregatorQuoteRequest};
use pipeswap::cache::PriceCache;
use pipeswap::context::{Contracts, Pool, SwapContext, TokenRegistry};
use pipeswap::metrics::SwapMetrics;
use pipeswap::pipeline::{PipeCall, Workflow};
use pipeswap::quoter::Quoter;
use pipeswap::rpc::{ChainReader, WorkflowRunner};
use pipeswap::token::Asset;
use pipeswap::{Result, SwapError};
use rust_decimal::prelude::ToPrimitive;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const CHAIN_ID: u64 = 42161;

pub fn addr(n: u64) -> Address {
    Address::from_low_u64_be(n)
}

pub fn protocol_address() -> Address {
    addr(0x900)
}

pub fn pipeline_address() -> Address {
    addr(0x902)
}

pub fn caller() -> Address {
    addr(0xca11)
}

pub fn usd(dollars: u64) -> U256 {
    U256::from(dollars) * U256::exp10(6)
}

pub fn units(whole: u64, decimals: usize) -> U256 {
    U256::from(whole) * U256::exp10(decimals)
}

#[derive(Debug, Clone)]
pub struct MockPool {
    pub address: Address,
    pub tokens: [Address; 2],
    pub reserves: [U256; 2],
}

impl MockPool {
    /// Constant-product output without fees.
    fn swap_out(&self, sell: Address, buy: Address, amount_in: U256) -> Option<U256> {
        let i = self.tokens.iter().position(|t| *t == sell)?;
        let j = self.tokens.iter().position(|t| *t == buy)?;
        if i == j {
            return None;
        }
        let (r_in, r_out) = (self.reserves[i], self.reserves[j]);
        Some(r_out * amount_in / (r_in + amount_in))
    }
}

/// Chain stub answering pool, price and protocol reads. Every round trip is
/// counted.
pub struct MockChain {
    pub pools: Vec<MockPool>,
    pub usd_prices: HashMap<Address, U256>,
    pub primary_price: U256,
    calls: AtomicUsize,
    fail: AtomicBool,
}

impl MockChain {
    pub fn new(pools: Vec<MockPool>, usd_prices: HashMap<Address, U256>) -> Self {
        Self {
            pools,
            usd_prices,
            primary_price: usd(1),
            calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn round_trip(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(SwapError::RpcError("connection refused".to_string()));
        }
        Ok(())
    }

    fn report(&self) -> PriceReport {
        PriceReport {
            price: self.primary_price,
            liquidity: U256::from(1_000_000u64),
            delta_b: I256::zero(),
            pools: self
                .pools
                .iter()
                .map(|p| PoolPriceData {
                    pool: p.address,
                    tokens: p.tokens,
                    balances: p.reserves,
                    price: self.primary_price,
                    liquidity: U256::from(1_000_000u64),
                    delta_b: I256::from(-5i64),
                    lp_usd: U256::from(2_000_000u64),
                    lp_bdv: U256::from(1_000_000u64),
                })
                .collect(),
        }
    }

    fn respond(&self, target: Address, data: &[u8]) -> Result<Bytes> {
        let (sel, args) = split_call(data).ok_or_else(|| SwapError::RpcError("empty call".into()))?;
        let revert = || SwapError::RpcError(format!("execution reverted at {target:?}"));

        if sel == selector(price_abi::PRICE) {
            return Ok(encode_price_report(&self.report()));
        }
        if sel == selector(protocol::GET_TOKEN_USD_PRICE) {
            let token = decode(&[ParamType::Address], args)
                .ok()
                .and_then(|t| t.into_iter().next())
                .and_then(Token::into_address)
                .ok_or_else(revert)?;
            let price = self.usd_prices.get(&token).copied().ok_or_else(revert)?;
            return Ok(Bytes::from(encode(&[Token::Uint(price)])));
        }

        let pool = self.pools.iter().find(|p| p.address == target).ok_or_else(revert)?;
        if sel == selector(pool_abi::GET_SWAP_OUT) {
            let decoded = decode(
                &[ParamType::Address, ParamType::Address, ParamType::Uint(256)],
                args,
            )
            .map_err(|_| revert())?;
            let (Some(sell), Some(buy), Some(amount)) = (
                decoded[0].clone().into_address(),
                decoded[1].clone().into_address(),
                decoded[2].clone().into_uint(),
            ) else {
                return Err(revert());
            };
            let out = pool.swap_out(sell, buy, amount).ok_or_else(revert)?;
            return Ok(Bytes::from(encode(&[Token::Uint(out)])));
        }
        if sel == selector(pool_abi::TOKENS) {
            let tokens = pool.tokens.iter().copied().map(Token::Address).collect();
            return Ok(Bytes::from(encode(&[Token::Array(tokens)])));
        }
        if sel == selector(pool_abi::GET_RESERVES) {
            let reserves = pool.reserves.iter().copied().map(Token::Uint).collect();
            return Ok(Bytes::from(encode(&[Token::Array(reserves)])));
        }
        Err(revert())
    }
}

#[async_trait]
impl ChainReader for MockChain {
    async fn call(&self, target: Address, data: Bytes) -> Result<Bytes> {
        self.round_trip()?;
        self.respond(target, &data)
    }

    async fn advanced_pipe(&self, calls: Vec<PipeCall>, _value: U256) -> Result<Vec<Bytes>> {
        self.round_trip()?;
        calls
            .iter()
            .map(|c| self.respond(c.target, &c.call_data))
            .collect()
    }
}

/// Converts at fixed USD prices and reports a slippage-reduced floor.
pub struct MockAggregator {
    tokens: HashMap<Address, (u32, U256)>,
    pub requests: Mutex<Vec<AggregatorQuoteRequest>>,
}

impl MockAggregator {
    pub fn new(tokens: HashMap<Address, (u32, U256)>) -> Self {
        Self {
            tokens,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl AggregatorClient for MockAggregator {
    async fn quote(&self, request: &AggregatorQuoteRequest) -> Result<AggregatorQuote> {
        self.requests.lock().unwrap().push(request.clone());
        let unknown = || SwapError::AggregatorError("unsupported token".to_string());
        let (sell_decimals, sell_usd) = *self.tokens.get(&request.sell_token).ok_or_else(unknown)?;
        let (buy_decimals, buy_usd) = *self.tokens.get(&request.buy_token).ok_or_else(unknown)?;

        let buy_amount = request.sell_amount * sell_usd * U256::exp10(buy_decimals as usize)
            / (buy_usd * U256::exp10(sell_decimals as usize));
        let bps = (request.slippage * rust_decimal::Decimal::from(10_000))
            .trunc()
            .to_u64()
            .unwrap_or(0);
        let min_buy_amount = buy_amount * U256::from(10_000 - bps) / U256::from(10_000u64);

        Ok(AggregatorQuote {
            buy_amount,
            min_buy_amount: Some(min_buy_amount),
            allowance_target: addr(0xdef1),
            target: addr(0xdef1),
            call_data: Bytes::from(vec![0xd9, 0x62, 0x7a, 0xa4]),
        })
    }
}

#[derive(Default)]
pub struct MockRunner {
    pub submitted: Mutex<Vec<String>>,
}

#[async_trait]
impl WorkflowRunner for MockRunner {
    async fn estimate_gas(&self, _workflow: &Workflow, _caller: Address) -> Result<U256> {
        Ok(U256::from(350_000u64))
    }

    async fn execute(&self, workflow: &Workflow, _caller: Address) -> Result<H256> {
        self.submitted.lock().unwrap().push(workflow.name.clone());
        Ok(H256::from_low_u64_be(0xabc))
    }
}

/// Registry, pools and mocks for one test.
pub struct Fixture {
    pub ctx: Arc<SwapContext>,
    pub chain: Arc<MockChain>,
    pub aggregator: Arc<MockAggregator>,
    pub bean: Asset,
    pub weth: Asset,
    pub eth: Asset,
    pub usdc: Asset,
    pub dai: Asset,
}

impl Fixture {
    /// BEAN:WETH with 1M BEAN / 500 WETH. `with_usdc_pool` adds a thin
    /// BEAN:USDC pool with 10k of each.
    pub fn new(with_usdc_pool: bool) -> Self {
        let bean = Asset::erc20(CHAIN_ID, "BEAN", addr(0xbea), 6);
        let weth = Asset::erc20(CHAIN_ID, "WETH", addr(0x1), 18);
        let usdc = Asset::erc20(CHAIN_ID, "USDC", addr(0x2), 6);
        let dai = Asset::erc20(CHAIN_ID, "DAI", addr(0x3), 18);
        let eth = Asset::native(CHAIN_ID, "ETH");

        let weth_pool = MockPool {
            address: addr(0x100),
            tokens: [addr(0xbea), addr(0x1)],
            reserves: [units(1_000_000, 6), units(500, 18)],
        };
        let usdc_pool = MockPool {
            address: addr(0x101),
            tokens: [addr(0xbea), addr(0x2)],
            reserves: [units(10_000, 6), units(10_000, 6)],
        };

        let mut mock_pools = vec![weth_pool];
        let mut pools = vec![Pool {
            name: "BEAN:WETH".to_string(),
            address: addr(0x100),
            tokens: vec![bean.clone(), weth.clone()],
        }];
        if with_usdc_pool {
            mock_pools.push(usdc_pool);
            pools.push(Pool {
                name: "BEAN:USDC".to_string(),
                address: addr(0x101),
                tokens: vec![bean.clone(), usdc.clone()],
            });
        }

        let usd_prices = HashMap::from([(addr(0x1), usd(2000)), (addr(0x2), usd(1))]);
        let chain = Arc::new(MockChain::new(mock_pools, usd_prices));

        let aggregator = Arc::new(MockAggregator::new(HashMap::from([
            (addr(0x1), (18, usd(2000))),
            (addr(0x2), (6, usd(1))),
            (addr(0x3), (18, usd(1))),
        ])));

        let ctx = Arc::new(SwapContext {
            chain_id: CHAIN_ID,
            tokens: TokenRegistry {
                primary: bean.clone(),
                native: eth.clone(),
                wrapped_native: weth.clone(),
                erc20: vec![bean.clone(), weth.clone(), usdc.clone(), dai.clone()],
            },
            pools,
            contracts: Contracts {
                protocol: protocol_address(),
                price: addr(0x901),
                pipeline: pipeline_address(),
            },
            chain: chain.clone(),
            aggregator: aggregator.clone(),
            metrics: Arc::new(SwapMetrics::new().unwrap()),
        });

        Self {
            ctx,
            chain,
            aggregator,
            bean,
            weth,
            eth,
            usdc,
            dai,
        }
    }

    pub fn cache(&self) -> Arc<PriceCache> {
        Arc::new(PriceCache::new(self.ctx.clone(), chrono::Duration::minutes(15)))
    }

    pub fn quoter(&self) -> Arc<Quoter> {
        Arc::new(Quoter::new(self.ctx.clone(), self.cache()))
    }
}
