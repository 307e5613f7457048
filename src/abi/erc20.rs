use ethers::{
    abi::Token,
    types::{Address, Bytes, U256},
};

pub const APPROVE: &str = "approve(address,uint256)";
pub const BALANCE_OF: &str = "balanceOf(address)";

pub const APPROVE_AMOUNT_SLOT: usize = 1;

#[must_use]
pub fn encode_approve(spender: Address, amount: U256) -> Bytes {
    super::encode_call(APPROVE, &[Token::Address(spender), Token::Uint(amount)])
}

#[must_use]
pub fn encode_balance_of(holder: Address) -> Bytes {
    super::encode_call(BALANCE_OF, &[Token::Address(holder)])
}
