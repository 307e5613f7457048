/*
 * Fungible asset identity: ERC20 tokens and the chain's native asset
 */

use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use crate::models::{Result, SwapError};
use super::Amount;

pub const NATIVE_DECIMALS: u32 = 18;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AssetKind {
    Native,
    Erc20 { address: Address },
}

/// Identity is `(chain_id, address)` for tokens and `chain_id` for the
/// native asset; symbol and decimals are descriptive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub chain_id: u64,
    pub symbol: String,
    pub decimals: u32,
    pub kind: AssetKind,
}

impl Asset {
    #[must_use]
    pub fn native(chain_id: u64, symbol: &str) -> Self {
        Self {
            chain_id,
            symbol: symbol.to_string(),
            decimals: NATIVE_DECIMALS,
            kind: AssetKind::Native,
        }
    }

    #[must_use]
    pub fn erc20(chain_id: u64, symbol: &str, address: Address, decimals: u32) -> Self {
        Self {
            chain_id,
            symbol: symbol.to_string(),
            decimals,
            kind: AssetKind::Erc20 { address },
        }
    }

    #[must_use]
    pub fn is_native(&self) -> bool {
        matches!(self.kind, AssetKind::Native)
    }

    #[must_use]
    pub fn address(&self) -> Option<Address> {
        match self.kind {
            AssetKind::Native => None,
            AssetKind::Erc20 { address } => Some(address),
        }
    }

    pub fn require_address(&self, context: &str) -> Result<Address> {
        self.address().ok_or_else(|| {
            SwapError::validation(
                context,
                "asset",
                format!("{} is native and has no contract address", self.symbol),
            )
        })
    }

    #[must_use]
    pub fn from_blockchain(&self, raw: U256) -> Amount {
        Amount::from_blockchain(raw, self.decimals)
    }

    pub fn from_human(&self, value: &str) -> Result<Amount> {
        Amount::from_human(value, self.decimals)
    }

    #[must_use]
    pub fn zero(&self) -> Amount {
        Amount::zero(self.decimals)
    }
}

impl PartialEq for Asset {
    fn eq(&self, other: &Self) -> bool {
        if self.chain_id != other.chain_id {
            return false;
        }
        match (self.kind, other.kind) {
            (AssetKind::Native, AssetKind::Native) => true,
            (AssetKind::Erc20 { address: a }, AssetKind::Erc20 { address: b }) => a == b,
            _ => false,
        }
    }
}

impl Eq for Asset {}

impl Hash for Asset {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.chain_id.hash(state);
        self.address().hash(state);
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_ignores_descriptive_fields() {
        let addr = Address::from_low_u64_be(7);
        let a = Asset::erc20(1, "BEAN", addr, 6);
        let b = Asset::erc20(1, "bean-renamed", addr, 6);
        let other_chain = Asset::erc20(10, "BEAN", addr, 6);

        assert_eq!(a, b);
        assert_ne!(a, other_chain);
        assert_eq!(Asset::native(1, "ETH"), Asset::native(1, "XETH"));
        assert_ne!(Asset::native(1, "ETH"), a);
    }

    #[test]
    fn native_has_no_address() {
        let eth = Asset::native(1, "ETH");
        assert!(eth.is_native());
        assert!(eth.require_address("test").is_err());
        assert_eq!(eth.decimals, NATIVE_DECIMALS);
    }
}
