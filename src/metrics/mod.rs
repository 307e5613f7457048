/*
 * Prometheus counters for cache refreshes, route lookups and quotes
 */

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder};
use crate::models::{Result, SwapError};

pub struct SwapMetrics {
    registry: Registry,
    pub cache_refreshes: IntCounterVec,
    pub route_lookups: IntCounterVec,
    pub quotes: IntCounterVec,
    pub quote_duration: Histogram,
}

fn metric_err(e: prometheus::Error) -> SwapError {
    SwapError::ConfigError(format!("Failed to register metric: {e}"))
}

impl SwapMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let cache_refreshes = IntCounterVec::new(
            Opts::new("pipeswap_cache_refreshes_total", "Price cache refresh attempts"),
            &["outcome"],
        )
        .map_err(metric_err)?;
        let route_lookups = IntCounterVec::new(
            Opts::new("pipeswap_route_lookups_total", "Route finder invocations"),
            &["direction"],
        )
        .map_err(metric_err)?;
        let quotes = IntCounterVec::new(
            Opts::new("pipeswap_quotes_total", "Quotes produced by path shape"),
            &["path"],
        )
        .map_err(metric_err)?;
        let quote_duration = Histogram::with_opts(HistogramOpts::new(
            "pipeswap_quote_duration_seconds",
            "Wall time of a full quote",
        ))
        .map_err(metric_err)?;

        registry.register(Box::new(cache_refreshes.clone())).map_err(metric_err)?;
        registry.register(Box::new(route_lookups.clone())).map_err(metric_err)?;
        registry.register(Box::new(quotes.clone())).map_err(metric_err)?;
        registry.register(Box::new(quote_duration.clone())).map_err(metric_err)?;

        Ok(Self {
            registry,
            cache_refreshes,
            route_lookups,
            quotes,
            quote_duration,
        })
    }

    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| SwapError::CalculationError(format!("Failed to encode metrics: {e}")))?;
        String::from_utf8(buffer)
            .map_err(|e| SwapError::CalculationError(format!("Metrics are not UTF-8: {e}")))
    }
}
