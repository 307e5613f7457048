/*
 * Shared error type and serializable quote models
 */

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteSummary {
    pub timestamp_utc: DateTime<Utc>,
    pub sell_token: String,
    pub buy_token: String,
    pub sell_amount: String,
    pub buy_amount: String,
    pub min_buy_amount: String,
    pub slippage: Decimal,
    pub path: PathKind,
    pub legs: Vec<LegSummary>,
    pub usd_in: Decimal,
    pub usd_out: Decimal,
    pub price_impact_percent: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegSummary {
    pub kind: String,
    pub source: String,
    pub sell_token: String,
    pub buy_token: String,
    pub sell_amount: String,
    pub buy_amount: String,
    pub min_buy_amount: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PathKind {
    Direct,
    Relayed,
    Aggregator,
    Wrap,
    Unwrap,
    Transfer,
}

impl PathKind {
    #[must_use]
    pub fn as_label(self) -> &'static str {
        match self {
            PathKind::Direct => "direct",
            PathKind::Relayed => "relayed",
            PathKind::Aggregator => "aggregator",
            PathKind::Wrap => "wrap",
            PathKind::Unwrap => "unwrap",
            PathKind::Transfer => "transfer",
        }
    }
}

#[derive(Debug, Error)]
pub enum SwapError {
    #[error("[{leg}] invalid {field}: {reason}")]
    Validation {
        leg: String,
        field: &'static str,
        reason: String,
    },

    #[error("Failed to decode {context}: {reason}")]
    DecodeError { context: String, reason: String },

    #[error("No route found for {sell} -> {buy}")]
    NoRouteFound { sell: String, buy: String },

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("RPC error: {0}")]
    RpcError(String),

    #[error("Contract interaction error: {0}")]
    ContractError(String),

    #[error("Aggregator error: {0}")]
    AggregatorError(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl SwapError {
    pub fn validation(leg: impl Into<String>, field: &'static str, reason: impl Into<String>) -> Self {
        SwapError::Validation {
            leg: leg.into(),
            field,
            reason: reason.into(),
        }
    }

    pub fn decode(context: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        SwapError::DecodeError {
            context: context.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SwapError>;
