/*
 * Protocol entry point: batched calls, fund movement and native wrapping
 */

use ethers::{
    abi::{ParamType, Token},
    types::{Address, Bytes, U256},
};
use crate::models::{Result, SwapError};
use crate::pipeline::{FromMode, PipeCall, ToMode};

pub const ADVANCED_PIPE: &str = "advancedPipe((address,bytes,bytes)[],uint256)";
pub const ADVANCED_FARM: &str = "advancedFarm((bytes,bytes)[])";
pub const GET_TOKEN_USD_PRICE: &str = "getTokenUsdPrice(address)";
pub const TRANSFER_TOKEN: &str = "transferToken(address,address,uint256,uint8,uint8)";
pub const WRAP_ETH: &str = "wrapEth(uint256,uint8)";
pub const UNWRAP_ETH: &str = "unwrapEth(uint256,uint8)";
pub const GET_INTERNAL_BALANCE: &str = "getInternalBalance(address,address)";

pub const TRANSFER_TOKEN_AMOUNT_SLOT: usize = 2;
pub const UNWRAP_ETH_AMOUNT_SLOT: usize = 0;

pub const USD_DECIMALS: u32 = 6;

fn pipe_call_type() -> ParamType {
    ParamType::Tuple(vec![ParamType::Address, ParamType::Bytes, ParamType::Bytes])
}

#[must_use]
pub fn pipe_calls_token(calls: &[PipeCall]) -> Token {
    Token::Array(
        calls
            .iter()
            .map(|c| {
                Token::Tuple(vec![
                    Token::Address(c.target),
                    Token::Bytes(c.call_data.to_vec()),
                    Token::Bytes(c.clipboard.to_vec()),
                ])
            })
            .collect(),
    )
}

#[must_use]
pub fn encode_advanced_pipe(calls: &[PipeCall], value: U256) -> Bytes {
    super::encode_call(ADVANCED_PIPE, &[pipe_calls_token(calls), Token::Uint(value)])
}

pub fn decode_advanced_pipe_args(args: &[u8]) -> Result<Vec<PipeCall>> {
    let context = "advancedPipe arguments";
    let tokens = super::decode_output(
        context,
        &[ParamType::Array(Box::new(pipe_call_type())), ParamType::Uint(256)],
        args,
    )?;
    tokens
        .into_iter()
        .next()
        .and_then(Token::into_array)
        .ok_or_else(|| SwapError::decode(context, "expected call array"))?
        .into_iter()
        .map(|t| {
            let mut fields = t
                .into_tuple()
                .ok_or_else(|| SwapError::decode(context, "expected call tuple"))?
                .into_iter();
            let target = fields.next().and_then(Token::into_address);
            let call_data = fields.next().and_then(Token::into_bytes);
            let clipboard = fields.next().and_then(Token::into_bytes);
            match (target, call_data, clipboard) {
                (Some(target), Some(call_data), Some(clipboard)) => Ok(PipeCall {
                    target,
                    call_data: Bytes::from(call_data),
                    clipboard: Bytes::from(clipboard),
                }),
                _ => Err(SwapError::decode(context, "malformed call tuple")),
            }
        })
        .collect()
}

#[must_use]
pub fn encode_advanced_farm(calls: &[(Bytes, Bytes)]) -> Bytes {
    let token = Token::Array(
        calls
            .iter()
            .map(|(data, clipboard)| {
                Token::Tuple(vec![Token::Bytes(data.to_vec()), Token::Bytes(clipboard.to_vec())])
            })
            .collect(),
    );
    super::encode_call(ADVANCED_FARM, &[token])
}

pub fn decode_bytes_array(context: &str, data: &[u8]) -> Result<Vec<Bytes>> {
    super::decode_output(context, &[ParamType::Array(Box::new(ParamType::Bytes))], data)?
        .into_iter()
        .next()
        .and_then(Token::into_array)
        .ok_or_else(|| SwapError::decode(context, "expected bytes[]"))?
        .into_iter()
        .map(|t| {
            t.into_bytes()
                .map(Bytes::from)
                .ok_or_else(|| SwapError::decode(context, "non-bytes element"))
        })
        .collect()
}

#[must_use]
pub fn encode_bytes_array(items: &[Bytes]) -> Bytes {
    Bytes::from(ethers::abi::encode(&[Token::Array(
        items.iter().map(|b| Token::Bytes(b.to_vec())).collect(),
    )]))
}

#[must_use]
pub fn encode_get_token_usd_price(token: Address) -> Bytes {
    super::encode_call(GET_TOKEN_USD_PRICE, &[Token::Address(token)])
}

pub fn decode_get_token_usd_price(symbol: &str, data: &[u8]) -> Result<U256> {
    super::decode_uint(&format!("getTokenUsdPrice for {symbol}"), data)
}

#[must_use]
pub fn encode_transfer_token(
    token: Address,
    recipient: Address,
    amount: U256,
    from_mode: FromMode,
    to_mode: ToMode,
) -> Bytes {
    super::encode_call(
        TRANSFER_TOKEN,
        &[
            Token::Address(token),
            Token::Address(recipient),
            Token::Uint(amount),
            Token::Uint(U256::from(from_mode as u8)),
            Token::Uint(U256::from(to_mode as u8)),
        ],
    )
}

#[must_use]
pub fn encode_wrap_eth(amount: U256, to_mode: ToMode) -> Bytes {
    super::encode_call(WRAP_ETH, &[Token::Uint(amount), Token::Uint(U256::from(to_mode as u8))])
}

#[must_use]
pub fn encode_unwrap_eth(amount: U256, from_mode: FromMode) -> Bytes {
    super::encode_call(UNWRAP_ETH, &[Token::Uint(amount), Token::Uint(U256::from(from_mode as u8))])
}

#[must_use]
pub fn encode_get_internal_balance(account: Address, token: Address) -> Bytes {
    super::encode_call(GET_INTERNAL_BALANCE, &[Token::Address(account), Token::Address(token)])
}
