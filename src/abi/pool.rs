/*
 * Two-asset pool contract interface
 */

use ethers::{
    abi::{ParamType, Token},
    types::{Address, Bytes, U256},
};
use crate::models::{Result, SwapError};

pub const GET_SWAP_OUT: &str = "getSwapOut(address,address,uint256)";
pub const SWAP_FROM: &str = "swapFrom(address,address,uint256,uint256,address,uint256)";
pub const GET_RESERVES: &str = "getReserves()";
pub const TOKENS: &str = "tokens()";

pub const SWAP_FROM_AMOUNT_IN_SLOT: usize = 2;

#[must_use]
pub fn encode_get_swap_out(sell: Address, buy: Address, amount_in: U256) -> Bytes {
    super::encode_call(
        GET_SWAP_OUT,
        &[Token::Address(sell), Token::Address(buy), Token::Uint(amount_in)],
    )
}

pub fn decode_get_swap_out(pool_name: &str, data: &[u8]) -> Result<U256> {
    super::decode_uint(&format!("getSwapOut for {pool_name}"), data)
}

#[must_use]
pub fn encode_swap_from(
    sell: Address,
    buy: Address,
    amount_in: U256,
    min_amount_out: U256,
    recipient: Address,
    deadline: U256,
) -> Bytes {
    super::encode_call(
        SWAP_FROM,
        &[
            Token::Address(sell),
            Token::Address(buy),
            Token::Uint(amount_in),
            Token::Uint(min_amount_out),
            Token::Address(recipient),
            Token::Uint(deadline),
        ],
    )
}

#[must_use]
pub fn encode_get_reserves() -> Bytes {
    super::encode_call(GET_RESERVES, &[])
}

pub fn decode_get_reserves(pool_name: &str, data: &[u8]) -> Result<Vec<U256>> {
    let context = format!("getReserves for {pool_name}");
    let tokens = super::decode_output(&context, &[ParamType::Array(Box::new(ParamType::Uint(256)))], data)?;
    tokens
        .into_iter()
        .next()
        .and_then(Token::into_array)
        .ok_or_else(|| SwapError::decode(&context, "expected uint256[]"))?
        .into_iter()
        .map(|t| t.into_uint().ok_or_else(|| SwapError::decode(&context, "non-uint reserve")))
        .collect()
}

#[must_use]
pub fn encode_tokens() -> Bytes {
    super::encode_call(TOKENS, &[])
}

pub fn decode_tokens(pool_name: &str, data: &[u8]) -> Result<Vec<Address>> {
    let context = format!("tokens for {pool_name}");
    let tokens = super::decode_output(&context, &[ParamType::Array(Box::new(ParamType::Address))], data)?;
    tokens
        .into_iter()
        .next()
        .and_then(Token::into_array)
        .ok_or_else(|| SwapError::decode(&context, "expected address[]"))?
        .into_iter()
        .map(|t| t.into_address().ok_or_else(|| SwapError::decode(&context, "non-address token")))
        .collect()
}
