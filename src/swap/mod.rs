/*
 * Swap operation: owns one compiled quote and the workflow built from it
 */

use ethers::types::{H256, U256};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};
use crate::legs::SwapLeg;
use crate::models::{PathKind, Result, SwapError};
use crate::pipeline::{BuildParams, PipelineBuilder, Workflow};
use crate::quoter::{path_kind, Quoter};
use crate::rpc::WorkflowRunner;
use crate::token::{Amount, Asset};

#[derive(Debug, Clone)]
pub struct CompiledQuote {
    pub sell: Asset,
    pub buy: Asset,
    pub sell_amount: Amount,
    pub buy_amount: Amount,
    pub min_buy_amount: Amount,
    pub slippage: Decimal,
    pub path: PathKind,
    pub legs: Vec<SwapLeg>,
}

impl CompiledQuote {
    pub fn from_legs(legs: Vec<SwapLeg>, sell_amount: Amount, slippage: Decimal) -> Result<Self> {
        let (Some(first), Some(last)) = (legs.first(), legs.last()) else {
            return Err(SwapError::Precondition("quote produced no legs".to_string()));
        };
        Ok(Self {
            sell: first.sell().clone(),
            buy: last.buy().clone(),
            sell_amount,
            buy_amount: last.buy_amount()?.clone(),
            min_buy_amount: last.min_buy_amount()?.clone(),
            slippage,
            path: path_kind(&legs),
            legs,
        })
    }
}

pub struct SwapOperation {
    sell: Asset,
    buy: Asset,
    params: BuildParams,
    quoter: Arc<Quoter>,
    builder: PipelineBuilder,
    runner: Arc<dyn WorkflowRunner>,
    quote: Option<CompiledQuote>,
    workflow: Option<Workflow>,
}

impl SwapOperation {
    #[must_use]
    pub fn new(
        sell: Asset,
        buy: Asset,
        params: BuildParams,
        quoter: Arc<Quoter>,
        builder: PipelineBuilder,
        runner: Arc<dyn WorkflowRunner>,
    ) -> Self {
        Self {
            sell,
            buy,
            params,
            quoter,
            builder,
            runner,
            quote: None,
            workflow: None,
        }
    }

    #[must_use]
    pub fn quote(&self) -> Option<&CompiledQuote> {
        self.quote.as_ref()
    }

    #[must_use]
    pub fn workflow(&self) -> Option<&Workflow> {
        self.workflow.as_ref()
    }

    fn needs_quote(&self, amount: &Amount, slippage: Decimal) -> bool {
        match &self.quote {
            Some(q) => &q.sell_amount != amount || q.slippage != slippage,
            None => true,
        }
    }

    pub async fn estimate_swap(
        &mut self,
        amount: Amount,
        slippage: Decimal,
        force: bool,
    ) -> Result<&CompiledQuote> {
        if force || self.needs_quote(&amount, slippage) {
            let legs = self
                .quoter
                .get_quote(&self.sell, &self.buy, amount.clone(), slippage)
                .await?;
            let quote = CompiledQuote::from_legs(legs, amount, slippage)?;
            let workflow = self.builder.build(&quote.legs, &self.params)?;
            info!(
                "Swap {} -> {} quoted: {} (min {})",
                self.sell.symbol, self.buy.symbol, quote.buy_amount, quote.min_buy_amount
            );
            self.quote = Some(quote);
            self.workflow = Some(workflow);
        } else {
            debug!("Reusing cached quote for {} -> {}", self.sell.symbol, self.buy.symbol);
        }
        self.quote
            .as_ref()
            .ok_or_else(|| SwapError::Precondition("quote was not stored".to_string()))
    }

    fn require_workflow(&self) -> Result<&Workflow> {
        self.workflow.as_ref().ok_or_else(|| {
            SwapError::Precondition(format!(
                "No quote for {} -> {}; call estimate_swap first",
                self.sell.symbol, self.buy.symbol
            ))
        })
    }

    pub fn estimate(&self) -> Result<Amount> {
        let out = self.require_workflow()?.estimate()?;
        Ok(self.buy.from_blockchain(out))
    }

    pub async fn estimate_gas(&self) -> Result<U256> {
        let workflow = self.require_workflow()?;
        self.runner.estimate_gas(workflow, self.params.caller).await
    }

    pub async fn execute(&self) -> Result<H256> {
        let workflow = self.require_workflow()?;
        self.runner.execute(workflow, self.params.caller).await
    }
}
