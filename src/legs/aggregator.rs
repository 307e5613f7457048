/*
 * Swap priced and routed by the external aggregator
 */

use ethers::types::{Address, U256};
use rust_decimal::Decimal;
use tracing::debug;
use crate::abi::erc20;
use crate::aggregator::{AggregatorQuote, AggregatorQuoteRequest};
use crate::context::SwapContext;
use crate::legs::LegState;
use crate::models::{Result, SwapError};
use crate::pipeline::{Clipboard, PipeCall, PipeStep};
use crate::token::{Amount, Asset};

#[derive(Debug, Clone)]
pub struct AggregatorSwapLeg {
    pub(crate) state: LegState,
    quote: Option<AggregatorQuote>,
}

impl AggregatorSwapLeg {
    #[must_use]
    pub fn new(sell: Asset, buy: Asset) -> Self {
        Self {
            state: LegState::new(sell, buy),
            quote: None,
        }
    }

    #[must_use]
    pub fn name(&self) -> String {
        format!("0x {} -> {}", self.state.sell.symbol, self.state.buy.symbol)
    }

    #[must_use]
    pub fn quote(&self) -> Option<&AggregatorQuote> {
        self.quote.as_ref()
    }

    fn require_quote(&self) -> Result<&AggregatorQuote> {
        self.quote.as_ref().ok_or_else(|| {
            SwapError::validation(self.name(), "quote", "no quote found, run quote_forward first")
        })
    }

    pub fn allowance_target(&self) -> Result<Address> {
        Ok(self.require_quote()?.allowance_target)
    }

    fn validate_assets(&self, ctx: &SwapContext) -> Result<()> {
        let name = self.name();
        for (field, asset) in [("sellToken", &self.state.sell), ("buyToken", &self.state.buy)] {
            if ctx.is_primary(asset) {
                return Err(SwapError::validation(
                    &name,
                    field,
                    format!("{} must be swapped through a protocol pool", asset.symbol),
                ));
            }
            if asset.is_native() {
                return Err(SwapError::validation(
                    &name,
                    field,
                    format!("{} is native; wrap it first", asset.symbol),
                ));
            }
        }
        Ok(())
    }

    pub async fn quote_forward(
        &mut self,
        ctx: &SwapContext,
        amount: Amount,
        slippage: Decimal,
    ) -> Result<()> {
        let name = self.name();
        self.quote = None;
        self.state.set_input(amount, slippage);
        self.state.validate_quote_input(&name)?;
        self.validate_assets(ctx)?;

        let request = AggregatorQuoteRequest {
            sell_token: self.state.sell.require_address(&name)?,
            buy_token: self.state.buy.require_address(&name)?,
            sell_amount: self.state.require_sell_amount(&name)?.to_u256()?,
            taker: ctx.contracts.pipeline,
            slippage,
        };
        let quote = ctx.aggregator.quote(&request).await?;

        let buy_amount = self.state.buy.from_blockchain(quote.buy_amount);
        let min = self.state.buy.from_blockchain(quote.min_buy_amount());
        debug!("{} quoted {} -> {} (min {})", name, request.sell_amount, buy_amount, min);
        self.state.set_output(buy_amount, min);
        self.quote = Some(quote);
        self.state.validate_quoted(&name)
    }

    pub fn validate(&self) -> Result<()> {
        self.state.validate_quoted(&self.name())?;
        self.require_quote()?;
        Ok(())
    }

    pub fn approve_step(&self) -> Result<PipeStep> {
        let name = self.name();
        let spender = self.allowance_target()?;
        Ok(PipeStep {
            name: format!("approve {} for 0x", self.state.sell.symbol),
            call: PipeCall {
                target: self.state.sell.require_address(&name)?,
                call_data: erc20::encode_approve(spender, U256::MAX),
                clipboard: Clipboard::Empty.encode(),
            },
            amount_out: U256::MAX,
            tag: None,
        })
    }

    pub fn build_steps(&self, ctx: &SwapContext) -> Result<[PipeStep; 2]> {
        self.validate()?;
        let name = self.name();
        let quote = self.require_quote()?;
        let min_out = self.state.require_min_buy_amount(&name)?.to_u256()?;

        let swap = PipeStep {
            name: format!("{name} swap"),
            call: PipeCall {
                target: quote.target,
                call_data: quote.call_data.clone(),
                clipboard: Clipboard::Empty.encode(),
            },
            amount_out: min_out,
            tag: None,
        };
        let balance = PipeStep {
            name: format!("{name} balanceOf"),
            call: PipeCall {
                target: self.state.buy.require_address(&name)?,
                call_data: erc20::encode_balance_of(ctx.contracts.pipeline),
                clipboard: Clipboard::Empty.encode(),
            },
            amount_out: min_out,
            tag: Some(format!("buy-{}", self.state.buy.symbol)),
        };
        Ok([swap, balance])
    }
}
