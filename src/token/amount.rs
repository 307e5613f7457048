/*
 * Arbitrary-precision token amounts with an explicit decimal count
 */

use ethers::types::U256;
use num_bigint::{BigInt, Sign};
use num_traits::{Signed, Zero};
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;
use crate::models::{Result, SwapError};

/// An immutable fixed-point value. `value` is the raw integer, scaled by
/// `10^decimals`.
#[derive(Debug, Clone)]
pub struct Amount {
    value: BigInt,
    decimals: u32,
}

fn ten_pow(exp: u32) -> BigInt {
    BigInt::from(10u8).pow(exp)
}

impl Amount {
    #[must_use]
    pub fn zero(decimals: u32) -> Self {
        Self {
            value: BigInt::zero(),
            decimals,
        }
    }

    #[must_use]
    pub fn from_raw(value: impl Into<BigInt>, decimals: u32) -> Self {
        Self {
            value: value.into(),
            decimals,
        }
    }

    #[must_use]
    pub fn from_blockchain(raw: U256, decimals: u32) -> Self {
        let mut buf = [0u8; 32];
        raw.to_big_endian(&mut buf);
        Self {
            value: BigInt::from_bytes_be(Sign::Plus, &buf),
            decimals,
        }
    }

    /// Parses a human readable value such as `"3.14"`. Fractional digits
    /// beyond `decimals` are truncated.
    pub fn from_human(input: &str, decimals: u32) -> Result<Self> {
        let trimmed = input.trim();
        let (negative, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        let (int_part, frac_part) = match unsigned.split_once('.') {
            Some((i, f)) => (i, f),
            None => (unsigned, ""),
        };

        if int_part.is_empty() && frac_part.is_empty() {
            return Err(SwapError::CalculationError(format!(
                "Cannot parse empty amount '{input}'"
            )));
        }
        if !int_part.chars().all(|c| c.is_ascii_digit()) || !frac_part.chars().all(|c| c.is_ascii_digit()) {
            return Err(SwapError::CalculationError(format!(
                "Invalid amount '{input}'"
            )));
        }

        let width = decimals as usize;
        let mut frac: String = frac_part.chars().take(width).collect();
        while frac.len() < width {
            frac.push('0');
        }

        let digits = format!("{}{}", if int_part.is_empty() { "0" } else { int_part }, frac);
        let mut value = BigInt::from_str(&digits)
            .map_err(|e| SwapError::CalculationError(format!("Invalid amount '{input}': {e}")))?;
        if negative {
            value = -value;
        }

        Ok(Self { value, decimals })
    }

    #[must_use]
    pub fn from_decimal(input: Decimal, decimals: u32) -> Self {
        let scaled = BigInt::from(input.mantissa()) * ten_pow(decimals);
        Self {
            value: scaled / ten_pow(input.scale()),
            decimals,
        }
    }

    #[must_use]
    pub fn max_uint256() -> Self {
        Self::from_blockchain(U256::MAX, 0)
    }

    #[must_use]
    pub fn raw(&self) -> &BigInt {
        &self.value
    }

    #[must_use]
    pub fn decimals(&self) -> u32 {
        self.decimals
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.value.is_positive()
    }

    pub fn to_u256(&self) -> Result<U256> {
        if self.value.is_negative() {
            return Err(SwapError::CalculationError(format!(
                "Cannot encode negative amount {self} as uint256"
            )));
        }
        let (_, bytes) = self.value.to_bytes_be();
        if bytes.len() > 32 {
            return Err(SwapError::CalculationError(format!(
                "Amount {self} overflows uint256"
            )));
        }
        Ok(U256::from_big_endian(&bytes))
    }

    #[must_use]
    pub fn to_human(&self) -> String {
        let scale = ten_pow(self.decimals);
        let abs = self.value.abs();
        let int_part = &abs / &scale;
        let frac_part = &abs % &scale;

        let sign = if self.value.is_negative() { "-" } else { "" };
        if frac_part.is_zero() {
            return format!("{sign}{int_part}");
        }

        let frac = format!("{:0>width$}", frac_part.to_string(), width = self.decimals as usize);
        format!("{sign}{int_part}.{}", frac.trim_end_matches('0'))
    }

    pub fn to_decimal(&self) -> Result<Decimal> {
        Decimal::from_str(&self.to_human())
            .map_err(|e| SwapError::CalculationError(format!("Amount {self} exceeds decimal range: {e}")))
    }

    #[must_use]
    pub fn redecimal(&self, decimals: u32) -> Self {
        let value = match decimals.cmp(&self.decimals) {
            Ordering::Equal => self.value.clone(),
            Ordering::Greater => &self.value * ten_pow(decimals - self.decimals),
            Ordering::Less => &self.value / ten_pow(self.decimals - decimals),
        };
        Self { value, decimals }
    }

    #[must_use]
    pub fn mul(&self, other: &Amount) -> Self {
        Self {
            value: (&self.value * &other.value) / ten_pow(other.decimals),
            decimals: self.decimals,
        }
    }

    pub fn try_div(&self, other: &Amount, decimals: Option<u32>) -> Result<Self> {
        if other.is_zero() {
            return Err(SwapError::CalculationError(format!(
                "Division of {self} by zero"
            )));
        }
        let out = decimals.unwrap_or(self.decimals);
        let numerator = &self.value * ten_pow(out + other.decimals);
        let denominator = &other.value * ten_pow(self.decimals);
        Ok(Self {
            value: numerator / denominator,
            decimals: out,
        })
    }

    pub fn rem(&self, other: &Amount) -> Result<Self> {
        let divisor = other.redecimal(self.decimals);
        if divisor.is_zero() {
            return Err(SwapError::CalculationError(format!(
                "Modulo of {self} by zero"
            )));
        }
        Ok(Self {
            value: &self.value % &divisor.value,
            decimals: self.decimals,
        })
    }

    #[must_use]
    pub fn pow(&self, exp: u32) -> Self {
        if exp == 0 {
            return Self::from_raw(ten_pow(self.decimals), self.decimals);
        }
        let raw = self.value.pow(exp);
        Self {
            value: raw / ten_pow(self.decimals * (exp - 1)),
            decimals: self.decimals,
        }
    }

    pub fn pct(&self, percent: Decimal) -> Result<Self> {
        if percent.is_sign_negative() {
            return Err(SwapError::CalculationError(
                "Percent value must be bigger than 0".to_string(),
            ));
        }
        let base = self.redecimal(self.decimals.max(2));
        Ok(base.mul_decimal(percent / Decimal::ONE_HUNDRED))
    }

    #[must_use]
    pub fn mul_decimal(&self, factor: Decimal) -> Self {
        let product = &self.value * BigInt::from(factor.mantissa());
        Self {
            value: product / ten_pow(factor.scale()),
            decimals: self.decimals,
        }
    }

    /// Removes a fractional slippage (`0.01` = 1%).
    #[must_use]
    pub fn sub_slippage(&self, slippage: Decimal) -> Self {
        self - &self.mul_decimal(slippage)
    }

    fn aligned(&self, other: &Amount) -> (BigInt, BigInt, u32) {
        let decimals = self.decimals.max(other.decimals);
        (
            self.redecimal(decimals).value,
            other.redecimal(decimals).value,
            decimals,
        )
    }
}

impl Add for &Amount {
    type Output = Amount;

    fn add(self, rhs: &Amount) -> Amount {
        let (a, b, decimals) = self.aligned(rhs);
        Amount { value: a + b, decimals }
    }
}

impl Sub for &Amount {
    type Output = Amount;

    fn sub(self, rhs: &Amount) -> Amount {
        let (a, b, decimals) = self.aligned(rhs);
        Amount { value: a - b, decimals }
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        &self + &rhs
    }
}

impl Sub for Amount {
    type Output = Amount;

    fn sub(self, rhs: Amount) -> Amount {
        &self - &rhs
    }
}

impl PartialEq for Amount {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Amount {}

impl PartialOrd for Amount {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Amount {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b, _) = self.aligned(other);
        a.cmp(&b)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_human())
    }
}
