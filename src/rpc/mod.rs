/*
 * Chain access: raw RPC client, the protocol-backed batched reader and the
 * workflow runner that submits compiled workflows
 */

use async_trait::async_trait;
use ethers::providers::{Http, Middleware, Provider};
use ethers::types::{Address, Bytes, TransactionRequest, H256, U256};
use std::sync::Arc;
use tracing::{debug, info, warn};
use crate::abi::{pool as pool_abi, protocol};
use crate::context::Pool;
use crate::models::{Result, SwapError};
use crate::pipeline::{PipeCall, Workflow};

#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn call(&self, target: Address, data: Bytes) -> Result<Bytes>;

    /// Runs `calls` in one round trip; results come back in call order.
    async fn advanced_pipe(&self, calls: Vec<PipeCall>, value: U256) -> Result<Vec<Bytes>>;
}

#[async_trait]
pub trait WorkflowRunner: Send + Sync {
    async fn estimate_gas(&self, workflow: &Workflow, caller: Address) -> Result<U256>;
    async fn execute(&self, workflow: &Workflow, caller: Address) -> Result<H256>;
}

pub struct RpcClient {
    provider: Arc<Provider<Http>>,
    chain_id: u64,
}

impl RpcClient {
    pub async fn new(rpc_url: &str, chain_id: u64) -> Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| SwapError::RpcError(format!("Failed to create provider: {e}")))?;

        let chain = provider
            .get_chainid()
            .await
            .map_err(|e| SwapError::RpcError(format!("Failed to get chain ID: {e}")))?;

        if chain.as_u64() != chain_id {
            return Err(SwapError::RpcError(format!(
                "Chain ID mismatch: expected {}, got {}",
                chain_id,
                chain.as_u64()
            )));
        }

        Ok(Self {
            provider: Arc::new(provider),
            chain_id,
        })
    }

    #[must_use]
    pub fn provider(&self) -> Arc<Provider<Http>> {
        self.provider.clone()
    }

    #[must_use]
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub async fn call(&self, tx: TransactionRequest) -> Result<Bytes> {
        self.provider
            .call(&tx.into(), None)
            .await
            .map_err(|e| SwapError::RpcError(format!("eth_call failed: {e}")))
    }

    pub async fn estimate_gas(&self, tx: TransactionRequest) -> Result<U256> {
        self.provider
            .estimate_gas(&tx.into(), None)
            .await
            .map_err(|e| SwapError::RpcError(format!("eth_estimateGas failed: {e}")))
    }

    pub async fn send_transaction(&self, tx: TransactionRequest) -> Result<H256> {
        let pending = self
            .provider
            .send_transaction(tx, None)
            .await
            .map_err(|e| SwapError::RpcError(format!("eth_sendTransaction failed: {e}")))?;
        Ok(pending.tx_hash())
    }
}

pub struct ProtocolClient {
    rpc: Arc<RpcClient>,
    protocol: Address,
}

impl ProtocolClient {
    #[must_use]
    pub fn new(rpc: Arc<RpcClient>, protocol: Address) -> Self {
        Self { rpc, protocol }
    }

    fn workflow_request(&self, workflow: &Workflow, caller: Address) -> TransactionRequest {
        TransactionRequest::new()
            .from(caller)
            .to(self.protocol)
            .data(workflow.encode())
            .value(workflow.value())
    }
}

#[async_trait]
impl ChainReader for ProtocolClient {
    async fn call(&self, target: Address, data: Bytes) -> Result<Bytes> {
        self.rpc.call(TransactionRequest::new().to(target).data(data)).await
    }

    async fn advanced_pipe(&self, calls: Vec<PipeCall>, value: U256) -> Result<Vec<Bytes>> {
        debug!("advancedPipe static call with {} calls", calls.len());
        let data = protocol::encode_advanced_pipe(&calls, value);
        let tx = TransactionRequest::new().to(self.protocol).data(data).value(value);
        let raw = self.rpc.call(tx).await?;
        let results = protocol::decode_bytes_array("advancedPipe result", &raw)?;
        if results.len() != calls.len() {
            return Err(SwapError::decode(
                "advancedPipe result",
                format!("expected {} results, got {}", calls.len(), results.len()),
            ));
        }
        Ok(results)
    }
}

#[async_trait]
impl WorkflowRunner for ProtocolClient {
    async fn estimate_gas(&self, workflow: &Workflow, caller: Address) -> Result<U256> {
        let gas = self.rpc.estimate_gas(self.workflow_request(workflow, caller)).await?;
        info!("Workflow {} gas estimate: {}", workflow.name, gas);
        Ok(gas)
    }

    async fn execute(&self, workflow: &Workflow, caller: Address) -> Result<H256> {
        let hash = self.rpc.send_transaction(self.workflow_request(workflow, caller)).await?;
        info!("Workflow {} submitted: {:?}", workflow.name, hash);
        Ok(hash)
    }
}

pub async fn verify_pools(chain: &dyn ChainReader, pools: &[Pool]) -> Result<()> {
    for pool in pools {
        let raw = chain.call(pool.address, pool_abi::encode_tokens()).await?;
        let onchain = pool_abi::decode_tokens(&pool.name, &raw)?;
        let registered: Vec<Option<Address>> = pool.tokens.iter().map(|t| t.address()).collect();
        let matches = onchain.len() == registered.len()
            && onchain.iter().zip(&registered).all(|(a, r)| Some(*a) == *r);
        if !matches {
            return Err(SwapError::ConfigError(format!(
                "Pool {} token mismatch: registry {:?}, chain {:?}",
                pool.name, registered, onchain
            )));
        }

        let raw = chain.call(pool.address, pool_abi::encode_get_reserves()).await?;
        let reserves = pool_abi::decode_get_reserves(&pool.name, &raw)?;
        if reserves.iter().any(U256::is_zero) {
            warn!("Pool {} has empty reserves: {:?}", pool.name, reserves);
        } else {
            info!("Verified pool {} ({:?})", pool.name, pool.address);
        }
    }
    Ok(())
}
