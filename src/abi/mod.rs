/*
 * ABI encoding helpers for the pool, protocol, price and ERC20 contracts
 */

pub mod erc20;
pub mod pool;
pub mod price;
pub mod protocol;

use ethers::{
    abi::{decode, encode, ParamType, Token},
    types::{Bytes, U256},
    utils::keccak256,
};
use crate::models::{Result, SwapError};

#[must_use]
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

#[must_use]
pub fn encode_call(signature: &str, args: &[Token]) -> Bytes {
    let mut call_data = Vec::from(selector(signature));
    call_data.extend_from_slice(&encode(args));
    Bytes::from(call_data)
}

pub fn decode_output(context: &str, types: &[ParamType], data: &[u8]) -> Result<Vec<Token>> {
    decode(types, data).map_err(|e| SwapError::decode(context, e))
}

pub fn decode_uint(context: &str, data: &[u8]) -> Result<U256> {
    decode_output(context, &[ParamType::Uint(256)], data)?
        .into_iter()
        .next()
        .and_then(Token::into_uint)
        .ok_or_else(|| SwapError::decode(context, "expected a single uint256"))
}

#[must_use]
pub fn split_call(data: &[u8]) -> Option<([u8; 4], &[u8])> {
    if data.len() < 4 {
        return None;
    }
    Some(([data[0], data[1], data[2], data[3]], &data[4..]))
}
