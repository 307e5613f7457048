/*
 * Swap through a two-asset protocol pool
 */

use ethers::types::{Address, U256};
use rust_decimal::Decimal;
use tracing::debug;
use crate::abi::{erc20, pool as pool_abi};
use crate::context::{Pool, SwapContext};
use crate::legs::LegState;
use crate::models::{Result, SwapError};
use crate::pipeline::{Clipboard, ClipboardRef, PipeCall, PipeStep, Pipeline};
use crate::token::{Amount, Asset};

#[derive(Debug, Clone)]
pub struct PoolSwapLeg {
    pub pool: Pool,
    pub(crate) state: LegState,
}

impl PoolSwapLeg {
    pub fn new(pool: Pool, sell: Asset, buy: Asset) -> Result<Self> {
        let name = format!("Pool {}", pool.name);
        if pool.tokens.len() != 2 {
            return Err(SwapError::validation(
                &name,
                "pool",
                format!("expected a two-asset pool, found {} assets", pool.tokens.len()),
            ));
        }
        for (field, asset) in [("sellToken", &sell), ("buyToken", &buy)] {
            if !pool.contains(asset) {
                return Err(SwapError::validation(
                    &name,
                    field,
                    format!("{} is not an underlying asset of {}", asset.symbol, pool.name),
                ));
            }
        }
        let leg = Self {
            pool,
            state: LegState::new(sell, buy),
        };
        leg.state.validate_assets(&leg.name())?;
        Ok(leg)
    }

    pub fn quoted(
        pool: Pool,
        sell: Asset,
        buy: Asset,
        sell_amount: Amount,
        buy_amount: Amount,
        slippage: Decimal,
    ) -> Result<Self> {
        let mut leg = Self::new(pool, sell, buy)?;
        leg.state.set_input(sell_amount, slippage);
        let min = buy_amount.sub_slippage(slippage);
        leg.state.set_output(buy_amount, min);
        leg.validate()?;
        Ok(leg)
    }

    #[must_use]
    pub fn name(&self) -> String {
        format!("Pool {}", self.pool.name)
    }

    #[must_use]
    pub fn allowance_target(&self) -> Address {
        self.pool.address
    }

    fn addresses(&self) -> Result<(Address, Address)> {
        let name = self.name();
        Ok((
            self.state.sell.require_address(&name)?,
            self.state.buy.require_address(&name)?,
        ))
    }

    pub async fn quote_forward(
        &mut self,
        ctx: &SwapContext,
        amount: Amount,
        slippage: Decimal,
    ) -> Result<()> {
        let name = self.name();
        self.state.set_input(amount, slippage);
        self.state.validate_quote_input(&name)?;

        let (sell, buy) = self.addresses()?;
        let amount_in = self.state.require_sell_amount(&name)?.to_u256()?;
        let raw = ctx
            .chain
            .call(self.pool.address, pool_abi::encode_get_swap_out(sell, buy, amount_in))
            .await?;
        let buy_amount = self.state.buy.from_blockchain(pool_abi::decode_get_swap_out(&self.pool.name, &raw)?);
        let min = buy_amount.sub_slippage(slippage);
        debug!("{} quoted {} -> {} (min {})", name, amount_in, buy_amount, min);
        self.state.set_output(buy_amount, min);
        self.state.validate_quoted(&name)
    }

    pub fn validate(&self) -> Result<()> {
        self.state.validate_quoted(&self.name())
    }

    pub fn approve_step(&self) -> Result<PipeStep> {
        let (sell, _) = self.addresses()?;
        Ok(PipeStep {
            name: format!("approve {} for {}", self.state.sell.symbol, self.pool.name),
            call: PipeCall {
                target: sell,
                call_data: erc20::encode_approve(self.pool.address, U256::MAX),
                clipboard: Clipboard::Empty.encode(),
            },
            amount_out: U256::MAX,
            tag: None,
        })
    }

    pub fn build_step(
        &self,
        ctx: &SwapContext,
        pipeline: &Pipeline,
        copy_slot: Option<usize>,
    ) -> Result<PipeStep> {
        self.validate()?;
        let name = self.name();
        let (sell, buy) = self.addresses()?;
        let amount_in = self.state.require_sell_amount(&name)?.to_u256()?;
        let min_out = self.state.require_min_buy_amount(&name)?.to_u256()?;

        let clipboard = copy_slot
            .map(|slot| {
                let reference = ClipboardRef::from_slots(
                    format!("buy-{}", self.state.sell.symbol),
                    slot,
                    pool_abi::SWAP_FROM_AMOUNT_IN_SLOT,
                );
                pipeline.clipboard_for(&reference)
            })
            .unwrap_or(Clipboard::Empty);

        Ok(PipeStep {
            name: format!("{name} swapFrom"),
            call: PipeCall {
                target: self.pool.address,
                call_data: pool_abi::encode_swap_from(
                    sell,
                    buy,
                    amount_in,
                    min_out,
                    ctx.contracts.pipeline,
                    U256::MAX,
                ),
                clipboard: clipboard.encode(),
            },
            amount_out: min_out,
            tag: Some(format!("buy-{}", self.state.buy.symbol)),
        })
    }
}
