/*
 * Swap legs: a closed set of conversions that quote themselves against live
 * state and compile into executable steps
 */

mod aggregator;
mod native;
mod pool;
mod transfer;

pub use aggregator::AggregatorSwapLeg;
pub use native::{UnwrapLeg, WrapLeg};
pub use pool::PoolSwapLeg;
pub use transfer::TransferLeg;

use rust_decimal::Decimal;
use crate::context::SwapContext;
use crate::models::{LegSummary, Result, SwapError};
use crate::token::{Amount, Asset};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LegKind {
    Pool,
    Aggregator,
    Wrap,
    Unwrap,
    Transfer,
}

impl LegKind {
    pub const ALL: [LegKind; 5] = [
        LegKind::Pool,
        LegKind::Aggregator,
        LegKind::Wrap,
        LegKind::Unwrap,
        LegKind::Transfer,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LegKind::Pool => "pool",
            LegKind::Aggregator => "aggregator",
            LegKind::Wrap => "wrap",
            LegKind::Unwrap => "unwrap",
            LegKind::Transfer => "transfer",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LegState {
    pub sell: Asset,
    pub buy: Asset,
    sell_amount: Option<Amount>,
    buy_amount: Option<Amount>,
    min_buy_amount: Option<Amount>,
    slippage: Option<Decimal>,
}

fn require<'a>(value: Option<&'a Amount>, leg: &str, field: &'static str) -> Result<&'a Amount> {
    match value {
        None => Err(SwapError::validation(leg, field, "has not been set")),
        Some(a) if !a.is_positive() => {
            Err(SwapError::validation(leg, field, format!("must be greater than 0, got {a}")))
        }
        Some(a) => Ok(a),
    }
}

impl LegState {
    #[must_use]
    pub fn new(sell: Asset, buy: Asset) -> Self {
        Self {
            sell,
            buy,
            sell_amount: None,
            buy_amount: None,
            min_buy_amount: None,
            slippage: None,
        }
    }

    #[must_use]
    pub fn sell_amount(&self) -> Option<&Amount> {
        self.sell_amount.as_ref()
    }

    #[must_use]
    pub fn buy_amount(&self) -> Option<&Amount> {
        self.buy_amount.as_ref()
    }

    #[must_use]
    pub fn min_buy_amount(&self) -> Option<&Amount> {
        self.min_buy_amount.as_ref()
    }

    #[must_use]
    pub fn slippage(&self) -> Option<Decimal> {
        self.slippage
    }

    pub(crate) fn set_input(&mut self, sell_amount: Amount, slippage: Decimal) {
        self.sell_amount = Some(sell_amount);
        self.slippage = Some(slippage);
        self.buy_amount = None;
        self.min_buy_amount = None;
    }

    pub(crate) fn set_output(&mut self, buy_amount: Amount, min_buy_amount: Amount) {
        self.buy_amount = Some(buy_amount);
        self.min_buy_amount = Some(min_buy_amount);
    }

    pub fn validate_assets(&self, leg: &str) -> Result<()> {
        if self.sell == self.buy {
            return Err(SwapError::validation(
                leg,
                "buyToken",
                format!("sell and buy assets must differ, both are {}", self.sell.symbol),
            ));
        }
        Ok(())
    }

    pub fn require_sell_amount(&self, leg: &str) -> Result<&Amount> {
        require(self.sell_amount.as_ref(), leg, "sellAmount")
    }

    pub fn require_buy_amount(&self, leg: &str) -> Result<&Amount> {
        require(self.buy_amount.as_ref(), leg, "buyAmount")
    }

    pub fn require_min_buy_amount(&self, leg: &str) -> Result<&Amount> {
        let min = require(self.min_buy_amount.as_ref(), leg, "minBuyAmount")?;
        let buy = self.require_buy_amount(leg)?;
        if min > buy {
            return Err(SwapError::validation(
                leg,
                "minBuyAmount",
                format!("{min} exceeds buyAmount {buy}"),
            ));
        }
        Ok(min)
    }

    pub fn require_slippage(&self, leg: &str) -> Result<Decimal> {
        match self.slippage {
            None => Err(SwapError::validation(leg, "slippage", "has not been set")),
            Some(s) if s < Decimal::ZERO || s > Decimal::ONE => Err(SwapError::validation(
                leg,
                "slippage",
                format!("must be within [0, 1], got {s}"),
            )),
            Some(s) => Ok(s),
        }
    }

    pub fn validate_quote_input(&self, leg: &str) -> Result<()> {
        self.validate_assets(leg)?;
        self.require_sell_amount(leg)?;
        self.require_slippage(leg)?;
        Ok(())
    }

    pub fn validate_quoted(&self, leg: &str) -> Result<()> {
        self.validate_quote_input(leg)?;
        self.require_min_buy_amount(leg)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub enum SwapLeg {
    Pool(PoolSwapLeg),
    Aggregator(AggregatorSwapLeg),
    Wrap(WrapLeg),
    Unwrap(UnwrapLeg),
    Transfer(TransferLeg),
}

impl SwapLeg {
    #[must_use]
    pub fn kind(&self) -> LegKind {
        match self {
            SwapLeg::Pool(_) => LegKind::Pool,
            SwapLeg::Aggregator(_) => LegKind::Aggregator,
            SwapLeg::Wrap(_) => LegKind::Wrap,
            SwapLeg::Unwrap(_) => LegKind::Unwrap,
            SwapLeg::Transfer(_) => LegKind::Transfer,
        }
    }

    #[must_use]
    pub fn state(&self) -> &LegState {
        match self {
            SwapLeg::Pool(l) => &l.state,
            SwapLeg::Aggregator(l) => &l.state,
            SwapLeg::Wrap(l) => &l.state,
            SwapLeg::Unwrap(l) => &l.state,
            SwapLeg::Transfer(l) => &l.state,
        }
    }

    #[must_use]
    pub fn name(&self) -> String {
        match self {
            SwapLeg::Pool(l) => l.name(),
            SwapLeg::Aggregator(l) => l.name(),
            SwapLeg::Wrap(l) => l.name(),
            SwapLeg::Unwrap(l) => l.name(),
            SwapLeg::Transfer(l) => l.name(),
        }
    }

    #[must_use]
    pub fn sell(&self) -> &Asset {
        &self.state().sell
    }

    #[must_use]
    pub fn buy(&self) -> &Asset {
        &self.state().buy
    }

    pub fn sell_amount(&self) -> Result<&Amount> {
        self.state().require_sell_amount(&self.name())
    }

    pub fn buy_amount(&self) -> Result<&Amount> {
        self.state().require_buy_amount(&self.name())
    }

    pub fn min_buy_amount(&self) -> Result<&Amount> {
        self.state().require_min_buy_amount(&self.name())
    }

    #[must_use]
    pub fn tag(&self) -> String {
        format!("buy-{}", self.buy().symbol)
    }

    #[must_use]
    pub fn return_index_tag(&self) -> String {
        format!("buy-{}", self.sell().symbol)
    }

    #[must_use]
    pub fn amount_out_copy_slot(&self) -> Option<usize> {
        match self {
            SwapLeg::Pool(_) | SwapLeg::Aggregator(_) => Some(0),
            SwapLeg::Wrap(_) | SwapLeg::Unwrap(_) | SwapLeg::Transfer(_) => None,
        }
    }

    #[must_use]
    pub fn is_pipelined(&self) -> bool {
        self.amount_out_copy_slot().is_some()
    }

    pub async fn quote_forward(
        &mut self,
        ctx: &SwapContext,
        amount: Amount,
        slippage: Decimal,
    ) -> Result<()> {
        match self {
            SwapLeg::Pool(l) => l.quote_forward(ctx, amount, slippage).await,
            SwapLeg::Aggregator(l) => l.quote_forward(ctx, amount, slippage).await,
            SwapLeg::Wrap(l) => l.quote_forward(amount),
            SwapLeg::Unwrap(l) => l.quote_forward(amount),
            SwapLeg::Transfer(l) => l.quote_forward(amount),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            SwapLeg::Pool(l) => l.validate(),
            SwapLeg::Aggregator(l) => l.validate(),
            SwapLeg::Wrap(l) => l.validate(),
            SwapLeg::Unwrap(l) => l.validate(),
            SwapLeg::Transfer(l) => l.validate(),
        }
    }

    #[must_use]
    pub fn source(&self) -> String {
        match self {
            SwapLeg::Pool(l) => l.pool.name.clone(),
            SwapLeg::Aggregator(_) => "0x".to_string(),
            SwapLeg::Wrap(_) | SwapLeg::Unwrap(_) | SwapLeg::Transfer(_) => "protocol".to_string(),
        }
    }

    #[must_use]
    pub fn summary(&self) -> LegSummary {
        let state = self.state();
        let human = |a: Option<&Amount>| a.map(Amount::to_human).unwrap_or_default();
        LegSummary {
            kind: self.kind().as_str().to_string(),
            source: self.source(),
            sell_token: state.sell.symbol.clone(),
            buy_token: state.buy.symbol.clone(),
            sell_amount: human(state.sell_amount()),
            buy_amount: human(state.buy_amount()),
            min_buy_amount: human(state.min_buy_amount()),
        }
    }
}

impl From<PoolSwapLeg> for SwapLeg {
    fn from(leg: PoolSwapLeg) -> Self {
        SwapLeg::Pool(leg)
    }
}

impl From<AggregatorSwapLeg> for SwapLeg {
    fn from(leg: AggregatorSwapLeg) -> Self {
        SwapLeg::Aggregator(leg)
    }
}

impl From<WrapLeg> for SwapLeg {
    fn from(leg: WrapLeg) -> Self {
        SwapLeg::Wrap(leg)
    }
}

impl From<UnwrapLeg> for SwapLeg {
    fn from(leg: UnwrapLeg) -> Self {
        SwapLeg::Unwrap(leg)
    }
}

impl From<TransferLeg> for SwapLeg {
    fn from(leg: TransferLeg) -> Self {
        SwapLeg::Transfer(leg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Pool;
    use ethers::types::Address;

    fn asset(symbol: &str, n: u64, decimals: u32) -> Asset {
        Asset::erc20(42161, symbol, Address::from_low_u64_be(n), decimals)
    }

    fn leg_of(kind: LegKind) -> SwapLeg {
        let bean = asset("BEAN", 1, 6);
        let weth = asset("WETH", 2, 18);
        let eth = Asset::native(42161, "ETH");
        match kind {
            LegKind::Pool => {
                let pool = Pool {
                    name: "BEAN:WETH".into(),
                    address: Address::from_low_u64_be(10),
                    tokens: vec![bean.clone(), weth.clone()],
                };
                PoolSwapLeg::new(pool, bean, weth).unwrap().into()
            }
            LegKind::Aggregator => AggregatorSwapLeg::new(weth, asset("USDC", 3, 6)).into(),
            LegKind::Wrap => WrapLeg::new(eth, weth).into(),
            LegKind::Unwrap => UnwrapLeg::new(weth, eth).into(),
            LegKind::Transfer => TransferLeg::new(bean).unwrap().into(),
        }
    }

    #[test]
    fn every_kind_dispatches_to_its_variant() {
        for kind in LegKind::ALL {
            let leg = leg_of(kind);
            assert_eq!(leg.kind(), kind);
            assert!(!leg.name().is_empty());
            assert_eq!(leg.is_pipelined(), matches!(kind, LegKind::Pool | LegKind::Aggregator));
        }
    }

    #[test]
    fn tags_derive_from_symbols() {
        let leg = leg_of(LegKind::Pool);
        assert_eq!(leg.tag(), "buy-WETH");
        assert_eq!(leg.return_index_tag(), "buy-BEAN");
    }

    #[test]
    fn unset_amounts_are_reported_with_leg_name() {
        let leg = leg_of(LegKind::Pool);
        let err = leg.sell_amount().unwrap_err().to_string();
        assert!(err.contains("BEAN:WETH"));
        assert!(err.contains("sellAmount"));
    }

    #[test]
    fn slippage_outside_unit_interval_is_rejected() {
        let mut state = LegState::new(asset("A", 1, 6), asset("B", 2, 6));
        state.set_input(Amount::from_raw(10, 6), Decimal::new(15, 1));
        assert!(matches!(
            state.require_slippage("leg"),
            Err(SwapError::Validation { field: "slippage", .. })
        ));
        state.set_input(Amount::from_raw(10, 6), Decimal::new(-1, 2));
        assert!(state.require_slippage("leg").is_err());
    }

    #[test]
    fn min_buy_above_buy_is_rejected() {
        let mut state = LegState::new(asset("A", 1, 6), asset("B", 2, 6));
        state.set_input(Amount::from_raw(10, 6), Decimal::ZERO);
        state.set_output(Amount::from_raw(5, 6), Amount::from_raw(6, 6));
        assert!(matches!(
            state.validate_quoted("leg"),
            Err(SwapError::Validation { field: "minBuyAmount", .. })
        ));
    }

    #[test]
    fn identical_assets_are_rejected() {
        let a = asset("A", 1, 6);
        let mut state = LegState::new(a.clone(), a);
        state.set_input(Amount::from_raw(10, 6), Decimal::ZERO);
        assert!(matches!(
            state.validate_quote_input("leg"),
            Err(SwapError::Validation { field: "buyToken", .. })
        ));
    }
}
