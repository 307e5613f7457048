/*
 * Price contract: primary asset price and per-pool snapshots in one read
 */

use ethers::{
    abi::{ParamType, Token},
    types::{Address, Bytes, I256, U256},
};
use crate::models::{Result, SwapError};

pub const PRICE: &str = "price()";

const CONTEXT: &str = "price contract result";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolPriceData {
    pub pool: Address,
    pub tokens: [Address; 2],
    pub balances: [U256; 2],
    pub price: U256,
    pub liquidity: U256,
    pub delta_b: I256,
    pub lp_usd: U256,
    pub lp_bdv: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceReport {
    pub price: U256,
    pub liquidity: U256,
    pub delta_b: I256,
    pub pools: Vec<PoolPriceData>,
}

fn pool_type() -> ParamType {
    ParamType::Tuple(vec![
        ParamType::Address,
        ParamType::FixedArray(Box::new(ParamType::Address), 2),
        ParamType::FixedArray(Box::new(ParamType::Uint(256)), 2),
        ParamType::Uint(256),
        ParamType::Uint(256),
        ParamType::Int(256),
        ParamType::Uint(256),
        ParamType::Uint(256),
    ])
}

fn report_type() -> ParamType {
    ParamType::Tuple(vec![
        ParamType::Uint(256),
        ParamType::Uint(256),
        ParamType::Int(256),
        ParamType::Array(Box::new(pool_type())),
    ])
}

#[must_use]
pub fn encode_price() -> Bytes {
    super::encode_call(PRICE, &[])
}

fn field<T>(value: Option<T>, name: &str) -> Result<T> {
    value.ok_or_else(|| SwapError::decode(CONTEXT, format!("missing or malformed field '{name}'")))
}

fn pair<T>(token: Option<Token>, name: &str, convert: fn(Token) -> Option<T>) -> Result<[T; 2]> {
    let items = field(token.and_then(Token::into_fixed_array), name)?;
    let mut iter = items.into_iter().map(convert);
    let first = field(iter.next().flatten(), name)?;
    let second = field(iter.next().flatten(), name)?;
    Ok([first, second])
}

fn decode_pool(token: Token) -> Result<PoolPriceData> {
    let mut fields = field(token.into_tuple(), "pool")?.into_iter();
    Ok(PoolPriceData {
        pool: field(fields.next().and_then(Token::into_address), "pool.pool")?,
        tokens: pair(fields.next(), "pool.tokens", Token::into_address)?,
        balances: pair(fields.next(), "pool.balances", Token::into_uint)?,
        price: field(fields.next().and_then(Token::into_uint), "pool.price")?,
        liquidity: field(fields.next().and_then(Token::into_uint), "pool.liquidity")?,
        delta_b: I256::from_raw(field(fields.next().and_then(Token::into_int), "pool.deltaB")?),
        lp_usd: field(fields.next().and_then(Token::into_uint), "pool.lpUsd")?,
        lp_bdv: field(fields.next().and_then(Token::into_uint), "pool.lpBdv")?,
    })
}

pub fn decode_price(data: &[u8]) -> Result<PriceReport> {
    let root = super::decode_output(CONTEXT, &[report_type()], data)?
        .into_iter()
        .next();
    let mut fields = field(root.and_then(Token::into_tuple), "prices")?.into_iter();

    let price = field(fields.next().and_then(Token::into_uint), "price")?;
    let liquidity = field(fields.next().and_then(Token::into_uint), "liquidity")?;
    let delta_b = I256::from_raw(field(fields.next().and_then(Token::into_int), "deltaB")?);
    let pools = field(fields.next().and_then(Token::into_array), "ps")?
        .into_iter()
        .map(decode_pool)
        .collect::<Result<Vec<_>>>()?;

    Ok(PriceReport {
        price,
        liquidity,
        delta_b,
        pools,
    })
}

#[must_use]
pub fn encode_price_report(report: &PriceReport) -> Bytes {
    let pools = report
        .pools
        .iter()
        .map(|p| {
            Token::Tuple(vec![
                Token::Address(p.pool),
                Token::FixedArray(p.tokens.iter().copied().map(Token::Address).collect()),
                Token::FixedArray(p.balances.iter().copied().map(Token::Uint).collect()),
                Token::Uint(p.price),
                Token::Uint(p.liquidity),
                Token::Int(p.delta_b.into_raw()),
                Token::Uint(p.lp_usd),
                Token::Uint(p.lp_bdv),
            ])
        })
        .collect();

    Bytes::from(ethers::abi::encode(&[Token::Tuple(vec![
        Token::Uint(report.price),
        Token::Uint(report.liquidity),
        Token::Int(report.delta_b.into_raw()),
        Token::Array(pools),
    ])]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_survives_encoding() {
        let report = PriceReport {
            price: U256::from(1_000_100u64),
            liquidity: U256::from(5u64),
            delta_b: I256::from(-42i64),
            pools: vec![PoolPriceData {
                pool: Address::from_low_u64_be(1),
                tokens: [Address::from_low_u64_be(2), Address::from_low_u64_be(3)],
                balances: [U256::from(10u64), U256::from(20u64)],
                price: U256::from(999_000u64),
                liquidity: U256::from(7u64),
                delta_b: I256::from(13i64),
                lp_usd: U256::from(1u64),
                lp_bdv: U256::from(2u64),
            }],
        };

        let decoded = decode_price(&encode_price_report(&report)).unwrap();
        assert_eq!(decoded, report);
    }

    #[test]
    fn truncated_data_is_a_decode_error() {
        let err = decode_price(&[0u8; 16]).unwrap_err();
        assert!(matches!(err, SwapError::DecodeError { .. }));
    }
}
