/*
 * Plain relocation of a token between fund locations
 */

use ethers::types::Address;
use rust_decimal::Decimal;
use crate::legs::LegState;
use crate::models::{Result, SwapError};
use crate::pipeline::{Clipboard, FarmCall, FarmStep, FromMode, ToMode};
use crate::token::{Amount, Asset};

#[derive(Debug, Clone)]
pub struct TransferLeg {
    pub(crate) state: LegState,
}

impl TransferLeg {
    pub fn new(asset: Asset) -> Result<Self> {
        let leg = Self {
            state: LegState::new(asset.clone(), asset),
        };
        leg.validate_asset()?;
        Ok(leg)
    }

    #[must_use]
    pub fn name(&self) -> String {
        format!("Transfer {}", self.state.sell.symbol)
    }

    fn validate_asset(&self) -> Result<()> {
        if self.state.sell.is_native() {
            return Err(SwapError::validation(
                self.name(),
                "sellToken",
                "native assets cannot be transferred through the protocol",
            ));
        }
        if self.state.sell != self.state.buy {
            return Err(SwapError::validation(
                self.name(),
                "buyToken",
                "a transfer must keep the same asset",
            ));
        }
        Ok(())
    }

    pub fn quote_forward(&mut self, amount: Amount) -> Result<()> {
        self.state.set_input(amount.clone(), Decimal::ZERO);
        self.state.set_output(amount.clone(), amount);
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        self.validate_asset()?;
        self.state.require_sell_amount(&self.name())?;
        Ok(())
    }

    pub fn build_step(
        &self,
        recipient: Address,
        from_mode: FromMode,
        to_mode: ToMode,
    ) -> Result<FarmStep> {
        self.validate()?;
        let name = self.name();
        let amount = self.state.require_sell_amount(&name)?.to_u256()?;
        Ok(FarmStep {
            name,
            call: FarmCall::TransferToken {
                token: self.state.sell.require_address("transfer")?,
                recipient,
                amount,
                from_mode,
                to_mode,
            },
            amount_out: amount,
            clipboard: Clipboard::Empty,
        })
    }
}
