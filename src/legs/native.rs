/*
 * 1:1 conversions between the native asset and its wrapped token
 */

use ethers::types::U256;
use rust_decimal::Decimal;
use crate::legs::LegState;
use crate::models::{Result, SwapError};
use crate::pipeline::{Clipboard, FarmCall, FarmStep, FromMode, ToMode};
use crate::token::{Amount, Asset};

fn quote_one_to_one(state: &mut LegState, amount: Amount) {
    state.set_input(amount.clone(), Decimal::ZERO);
    state.set_output(amount.clone(), amount);
}

fn validate_one_to_one(state: &LegState, name: &str) -> Result<()> {
    state.validate_assets(name)?;
    let sell = state.require_sell_amount(name)?;
    let buy = state.require_buy_amount(name)?;
    if sell != buy {
        return Err(SwapError::validation(
            name,
            "buyAmount",
            format!("must equal sellAmount {sell}, got {buy}"),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct WrapLeg {
    pub(crate) state: LegState,
}

impl WrapLeg {
    #[must_use]
    pub fn new(native: Asset, wrapped: Asset) -> Self {
        Self {
            state: LegState::new(native, wrapped),
        }
    }

    #[must_use]
    pub fn name(&self) -> String {
        format!("Wrap {}", self.state.sell.symbol)
    }

    pub fn quote_forward(&mut self, amount: Amount) -> Result<()> {
        quote_one_to_one(&mut self.state, amount);
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        let name = self.name();
        if !self.state.sell.is_native() {
            return Err(SwapError::validation(&name, "sellToken", "must be the native asset"));
        }
        if self.state.buy.is_native() {
            return Err(SwapError::validation(&name, "buyToken", "must be the wrapped token"));
        }
        validate_one_to_one(&self.state, &name)
    }

    pub fn build_step(&self, to_mode: ToMode) -> Result<FarmStep> {
        self.validate()?;
        let amount: U256 = self.state.require_sell_amount(&self.name())?.to_u256()?;
        Ok(FarmStep {
            name: self.name(),
            call: FarmCall::WrapNative { amount, to_mode },
            amount_out: amount,
            clipboard: Clipboard::Empty,
        })
    }
}

#[derive(Debug, Clone)]
pub struct UnwrapLeg {
    pub(crate) state: LegState,
}

impl UnwrapLeg {
    #[must_use]
    pub fn new(wrapped: Asset, native: Asset) -> Self {
        Self {
            state: LegState::new(wrapped, native),
        }
    }

    #[must_use]
    pub fn name(&self) -> String {
        format!("Unwrap {}", self.state.sell.symbol)
    }

    pub fn quote_forward(&mut self, amount: Amount) -> Result<()> {
        quote_one_to_one(&mut self.state, amount);
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        let name = self.name();
        if self.state.sell.is_native() {
            return Err(SwapError::validation(&name, "sellToken", "must be the wrapped token"));
        }
        if !self.state.buy.is_native() {
            return Err(SwapError::validation(&name, "buyToken", "must be the native asset"));
        }
        validate_one_to_one(&self.state, &name)
    }

    pub fn build_step(&self, from_mode: FromMode) -> Result<FarmStep> {
        self.validate()?;
        let amount = self.state.require_sell_amount(&self.name())?.to_u256()?;
        Ok(FarmStep {
            name: self.name(),
            call: FarmCall::UnwrapNative { amount, from_mode },
            amount_out: amount,
            clipboard: Clipboard::Empty,
        })
    }
}
