/*
 * Swap service that wires configuration, chain access and the quoting
 * components together
 */

use chrono::{Duration, Utc};
use ethers::types::Address;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;
use crate::{
    aggregator::{AggregatorClient, ZeroExClient},
    cache::PriceCache,
    config::{Config, Registry},
    context::SwapContext,
    metrics::SwapMetrics,
    models::{QuoteSummary, Result, SwapError},
    pipeline::{BuildParams, FromMode, PipelineBuilder, ToMode},
    quoter::Quoter,
    rpc::{verify_pools, ProtocolClient, RpcClient, WorkflowRunner},
    swap::{CompiledQuote, SwapOperation},
    token::Asset,
    utils::{price_impact_percent, usd_value},
};

pub struct SwapService {
    config: Config,
    ctx: Arc<SwapContext>,
    quoter: Arc<Quoter>,
    runner: Arc<dyn WorkflowRunner>,
}

impl SwapService {
    pub async fn new(config: Config) -> Result<Self> {
        info!("Initializing Swap Service");

        let registry = Registry::load(&config.registry_path)?;
        let (tokens, pools, contracts) = registry.resolve(config.chain.chain_id)?;
        info!(
            "Registry loaded: {} tokens, {} pools",
            tokens.erc20.len(),
            pools.len()
        );

        let rpc = Arc::new(RpcClient::new(&config.chain.rpc_url, config.chain.chain_id).await?);
        info!("Connected to chain {}", rpc.chain_id());

        let protocol = Arc::new(ProtocolClient::new(rpc, contracts.protocol));
        verify_pools(protocol.as_ref(), &pools).await?;

        let aggregator: Arc<dyn AggregatorClient> = Arc::new(ZeroExClient::new(
            config.aggregator.url.clone(),
            config.aggregator.api_key.clone(),
        ));
        info!("Aggregator client initialized");

        let ctx = Arc::new(SwapContext {
            chain_id: config.chain.chain_id,
            tokens,
            pools,
            contracts,
            chain: protocol.clone(),
            aggregator,
            metrics: Arc::new(SwapMetrics::new()?),
        });

        Ok(Self::from_parts(config, ctx, protocol))
    }

    #[must_use]
    pub fn from_parts(config: Config, ctx: Arc<SwapContext>, runner: Arc<dyn WorkflowRunner>) -> Self {
        let cache = Arc::new(PriceCache::new(
            ctx.clone(),
            Duration::seconds(config.trading.cache_max_stale_secs),
        ));
        let quoter = Arc::new(Quoter::new(ctx.clone(), cache));
        Self {
            config,
            ctx,
            quoter,
            runner,
        }
    }

    #[must_use]
    pub fn context(&self) -> &Arc<SwapContext> {
        &self.ctx
    }

    #[must_use]
    pub fn quoter(&self) -> &Arc<Quoter> {
        &self.quoter
    }

    pub fn asset(&self, symbol: &str) -> Result<Asset> {
        self.ctx
            .tokens
            .by_symbol(symbol)
            .cloned()
            .ok_or_else(|| SwapError::validation("request", "token", format!("unknown symbol {symbol}")))
    }

    pub async fn quote(
        &self,
        sell_symbol: &str,
        buy_symbol: &str,
        amount: &str,
        slippage: Option<Decimal>,
    ) -> Result<QuoteSummary> {
        let sell = self.asset(sell_symbol)?;
        let buy = self.asset(buy_symbol)?;
        let amount = sell.from_human(amount)?;
        let slippage = slippage.unwrap_or(self.config.trading.default_slippage);

        info!("Quoting {} {} -> {}", amount, sell.symbol, buy.symbol);
        let legs = self.quoter.get_quote(&sell, &buy, amount.clone(), slippage).await?;
        let quote = CompiledQuote::from_legs(legs, amount, slippage)?;
        self.summarize(&quote).await
    }

    async fn summarize(&self, quote: &CompiledQuote) -> Result<QuoteSummary> {
        let snapshot = self.quoter.cache().snapshot().await;
        let usd_in = usd_value(&snapshot.token_usd(&quote.sell), &quote.sell_amount)?;
        let usd_out = usd_value(&snapshot.token_usd(&quote.buy), &quote.buy_amount)?;

        Ok(QuoteSummary {
            timestamp_utc: Utc::now(),
            sell_token: quote.sell.symbol.clone(),
            buy_token: quote.buy.symbol.clone(),
            sell_amount: quote.sell_amount.to_human(),
            buy_amount: quote.buy_amount.to_human(),
            min_buy_amount: quote.min_buy_amount.to_human(),
            slippage: quote.slippage,
            path: quote.path,
            legs: quote.legs.iter().map(|l| l.summary()).collect(),
            usd_in,
            usd_out,
            price_impact_percent: price_impact_percent(usd_in, usd_out),
        })
    }

    pub fn swap_operation(
        &self,
        sell_symbol: &str,
        buy_symbol: &str,
        caller: Address,
        recipient: Address,
    ) -> Result<SwapOperation> {
        let params = BuildParams {
            from_mode: FromMode::External,
            to_mode: ToMode::External,
            caller,
            recipient,
        };
        Ok(SwapOperation::new(
            self.asset(sell_symbol)?,
            self.asset(buy_symbol)?,
            params,
            self.quoter.clone(),
            PipelineBuilder::new(self.ctx.clone()),
            self.runner.clone(),
        ))
    }

    pub fn metrics_text(&self) -> Result<String> {
        self.ctx.metrics.render()
    }
}
