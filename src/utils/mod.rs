/*
 * Utility functions and helpers
 */

use ethers::types::Address;
use rust_decimal::Decimal;
use std::str::FromStr;
use crate::models::{Result, SwapError};
use crate::token::Amount;

pub fn usd_value(price: &Amount, amount: &Amount) -> Result<Decimal> {
    price
        .to_decimal()?
        .checked_mul(amount.to_decimal()?)
        .ok_or_else(|| SwapError::CalculationError(format!("USD value of {amount} overflows")))
}

#[must_use]
pub fn price_impact_percent(usd_in: Decimal, usd_out: Decimal) -> Decimal {
    if usd_in == Decimal::ZERO {
        return Decimal::ZERO;
    }
    ((usd_in - usd_out) / usd_in * Decimal::from(100)).round_dp(4)
}

pub fn parse_address(address: &str) -> Result<Address> {
    if !address.starts_with("0x") || address.len() != 42 {
        return Err(SwapError::ConfigError(format!("Invalid address format: {address}")));
    }
    Address::from_str(address)
        .map_err(|e| SwapError::ConfigError(format!("Invalid address {address}: {e}")))
}

pub fn parse_slippage(raw: &str) -> Result<Decimal> {
    let slippage = Decimal::from_str(raw.trim())
        .map_err(|e| SwapError::validation("request", "slippage", e.to_string()))?;
    if slippage < Decimal::ZERO || slippage > Decimal::ONE {
        return Err(SwapError::validation(
            "request",
            "slippage",
            format!("must be within [0, 1], got {slippage}"),
        ));
    }
    Ok(slippage)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn impact_is_relative_loss() {
        let impact = price_impact_percent(Decimal::from(200), Decimal::from(199));
        assert_eq!(impact, Decimal::new(5, 1));
        assert_eq!(price_impact_percent(Decimal::ZERO, Decimal::ONE), Decimal::ZERO);
    }

    #[test]
    fn usd_value_scales_by_price() {
        let price = Amount::from_human("2000", 6).unwrap();
        let amount = Amount::from_human("0.5", 18).unwrap();
        assert_eq!(usd_value(&price, &amount).unwrap(), Decimal::from(1000));
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(parse_address("0x1234").is_err());
        assert!(parse_address("0xBA12222222228d8Ba445958a75a0704d566BF2C8").is_ok());
    }

    #[test]
    fn slippage_must_be_a_fraction() {
        assert_eq!(parse_slippage("0.01").unwrap(), Decimal::new(1, 2));
        assert!(parse_slippage("1.5").is_err());
        assert!(parse_slippage("abc").is_err());
    }
}
