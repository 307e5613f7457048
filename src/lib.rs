/*
 * Pipeswap - multi-hop swap routing over a shared execution context
 * Core library exports and module declarations
 */

pub mod abi;
pub mod aggregator;
pub mod api;
pub mod cache;
pub mod config;
pub mod context;
pub mod legs;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod quoter;
pub mod router;
pub mod rpc;
pub mod service;
pub mod swap;
pub mod token;
pub mod utils;

pub use config::Config;
pub use models::*;
pub use service::SwapService;
