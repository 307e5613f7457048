/*
 * 0x swap quote API client
 */

use async_trait::async_trait;
use ethers::types::{Address, Bytes, U256};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use crate::aggregator::{AggregatorClient, AggregatorQuote, AggregatorQuoteRequest};
use crate::models::{Result, SwapError};

pub const DEFAULT_ENDPOINT: &str = "https://arbitrum.api.0x.org/swap/v1/quote";

const MAX_RETRIES: u32 = 10;
const RETRY_AFTER: Duration = Duration::from_millis(200);

pub struct ZeroExClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteResponse {
    buy_amount: String,
    #[serde(default)]
    min_buy_amount: Option<String>,
    allowance_target: Address,
    to: Address,
    data: Bytes,
}

fn parse_amount(field: &str, value: &str) -> Result<U256> {
    U256::from_dec_str(value)
        .map_err(|e| SwapError::AggregatorError(format!("Invalid {field} '{value}': {e}")))
}

impl ZeroExClient {
    #[must_use]
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    fn query(request: &AggregatorQuoteRequest) -> Vec<(&'static str, String)> {
        vec![
            ("sellToken", format!("{:?}", request.sell_token)),
            ("buyToken", format!("{:?}", request.buy_token)),
            ("sellAmount", request.sell_amount.to_string()),
            ("takerAddress", format!("{:?}", request.taker)),
            ("slippagePercentage", request.slippage.to_string()),
            ("skipValidation", "true".to_string()),
            ("shouldSellEntireBalance", "true".to_string()),
        ]
    }
}

#[async_trait]
impl AggregatorClient for ZeroExClient {
    async fn quote(&self, request: &AggregatorQuoteRequest) -> Result<AggregatorQuote> {
        if self.api_key.is_empty() {
            return Err(SwapError::ConfigError("AGGREGATOR_API_KEY not set".to_string()));
        }

        let query = Self::query(request);
        let mut attempt = 0;
        let response = loop {
            debug!("0x quote request (attempt {}): {:?}", attempt + 1, query);
            let response = self
                .client
                .get(&self.endpoint)
                .header("0x-api-key", &self.api_key)
                .header("Accept", "application/json")
                .query(&query)
                .send()
                .await?;

            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                break response;
            }
            if attempt >= MAX_RETRIES {
                return Err(SwapError::AggregatorError(format!(
                    "Rate limited after {MAX_RETRIES} retries"
                )));
            }
            attempt += 1;
            warn!("0x rate limited; retrying in {:?} ({}/{})", RETRY_AFTER, attempt, MAX_RETRIES);
            tokio::time::sleep(RETRY_AFTER).await;
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SwapError::AggregatorError(format!("HTTP {status}: {body}")));
        }

        let body: QuoteResponse = response.json().await?;
        let quote = AggregatorQuote {
            buy_amount: parse_amount("buyAmount", &body.buy_amount)?,
            min_buy_amount: body
                .min_buy_amount
                .as_deref()
                .map(|v| parse_amount("minBuyAmount", v))
                .transpose()?,
            allowance_target: body.allowance_target,
            target: body.to,
            call_data: body.data,
        };
        debug!("0x quote: buy={} min={}", quote.buy_amount, quote.min_buy_amount());
        Ok(quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn query_carries_fixed_flags() {
        let request = AggregatorQuoteRequest {
            sell_token: Address::from_low_u64_be(1),
            buy_token: Address::from_low_u64_be(2),
            sell_amount: U256::from(1000u64),
            taker: Address::from_low_u64_be(3),
            slippage: Decimal::new(5, 3),
        };
        let query = ZeroExClient::query(&request);
        assert!(query.contains(&("skipValidation", "true".to_string())));
        assert!(query.contains(&("shouldSellEntireBalance", "true".to_string())));
        assert!(query.contains(&("sellAmount", "1000".to_string())));
        assert!(query.contains(&("slippagePercentage", "0.005".to_string())));
    }

    #[test]
    fn amounts_must_be_decimal_strings() {
        assert!(parse_amount("buyAmount", "12x").is_err());
        assert_eq!(parse_amount("buyAmount", "42").unwrap(), U256::from(42u64));
    }
}
