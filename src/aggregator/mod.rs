/*
 * External aggregator price service for legs that touch no protocol pool
 */

mod zero_x;

use async_trait::async_trait;
use ethers::types::{Address, Bytes, U256};
use rust_decimal::Decimal;
use crate::models::Result;

pub use zero_x::{ZeroExClient, DEFAULT_ENDPOINT};

#[derive(Debug, Clone)]
pub struct AggregatorQuoteRequest {
    pub sell_token: Address,
    pub buy_token: Address,
    pub sell_amount: U256,
    pub taker: Address,
    pub slippage: Decimal,
}

#[derive(Debug, Clone)]
pub struct AggregatorQuote {
    pub buy_amount: U256,
    /// Floor already reduced by the requested slippage, when reported.
    pub min_buy_amount: Option<U256>,
    pub allowance_target: Address,
    pub target: Address,
    pub call_data: Bytes,
}

impl AggregatorQuote {
    #[must_use]
    pub fn min_buy_amount(&self) -> U256 {
        self.min_buy_amount.unwrap_or(self.buy_amount)
    }
}

#[async_trait]
pub trait AggregatorClient: Send + Sync {
    async fn quote(&self, request: &AggregatorQuoteRequest) -> Result<AggregatorQuote>;
}
