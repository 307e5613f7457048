/*
 * Quoter: turns (sell, buy, amount, slippage) into an ordered list of
 * quoted legs, handling native wrapping and relay composition
 */

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};
use crate::cache::PriceCache;
use crate::context::SwapContext;
use crate::legs::{AggregatorSwapLeg, SwapLeg, TransferLeg, UnwrapLeg, WrapLeg};
use crate::models::{PathKind, Result, SwapError};
use crate::router::{Direction, RouteFinder};
use crate::token::{Amount, Asset};

#[must_use]
pub fn path_kind(legs: &[SwapLeg]) -> PathKind {
    match legs {
        [SwapLeg::Wrap(_)] => PathKind::Wrap,
        [SwapLeg::Unwrap(_)] => PathKind::Unwrap,
        [SwapLeg::Transfer(_)] => PathKind::Transfer,
        _ => {
            let pools = legs.iter().filter(|l| matches!(l, SwapLeg::Pool(_))).count();
            let aggregators = legs
                .iter()
                .filter(|l| matches!(l, SwapLeg::Aggregator(_)))
                .count();
            match (pools, aggregators) {
                (0, 0) => PathKind::Wrap,
                (_, 0) => PathKind::Direct,
                (0, _) => PathKind::Aggregator,
                _ => PathKind::Relayed,
            }
        }
    }
}

pub struct Quoter {
    ctx: Arc<SwapContext>,
    cache: Arc<PriceCache>,
    router: RouteFinder,
}

impl Quoter {
    #[must_use]
    pub fn new(ctx: Arc<SwapContext>, cache: Arc<PriceCache>) -> Self {
        let router = RouteFinder::new(ctx.clone(), cache.clone());
        Self { ctx, cache, router }
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<PriceCache> {
        &self.cache
    }

    pub async fn refresh(&self, force: bool) -> Result<bool> {
        self.cache.refresh(force).await
    }

    pub async fn get_quote(
        &self,
        sell: &Asset,
        buy: &Asset,
        amount: Amount,
        slippage: Decimal,
    ) -> Result<Vec<SwapLeg>> {
        let timer = self.ctx.metrics.quote_duration.start_timer();
        let legs = self.route(sell, buy, amount, slippage).await?;
        timer.observe_duration();

        let path = path_kind(&legs);
        self.ctx
            .metrics
            .quotes
            .with_label_values(&[path.as_label()])
            .inc();
        info!(
            "Quote {} -> {}: {:?} via [{}]",
            sell.symbol,
            buy.symbol,
            path,
            legs.iter().map(SwapLeg::name).collect::<Vec<_>>().join(", ")
        );
        Ok(legs)
    }

    async fn route(
        &self,
        sell: &Asset,
        buy: &Asset,
        amount: Amount,
        slippage: Decimal,
    ) -> Result<Vec<SwapLeg>> {
        if !amount.is_positive() {
            return Err(SwapError::validation(
                "quote",
                "sellAmount",
                format!("must be greater than 0, got {amount}"),
            ));
        }
        if slippage < Decimal::ZERO || slippage > Decimal::ONE {
            return Err(SwapError::validation(
                "quote",
                "slippage",
                format!("must be within [0, 1], got {slippage}"),
            ));
        }

        if sell == buy {
            let mut transfer = TransferLeg::new(sell.clone())?;
            transfer.quote_forward(amount)?;
            return Ok(vec![transfer.into()]);
        }

        self.cache.refresh(false).await?;

        let tokens = &self.ctx.tokens;
        let wrapped = &tokens.wrapped_native;

        if sell == wrapped && buy.is_native() {
            let mut unwrap = UnwrapLeg::new(wrapped.clone(), buy.clone());
            unwrap.quote_forward(amount)?;
            return Ok(vec![unwrap.into()]);
        }

        let mut legs: Vec<SwapLeg> = Vec::new();
        let erc20_sell = if sell.is_native() {
            let mut wrap = WrapLeg::new(sell.clone(), wrapped.clone());
            wrap.quote_forward(amount.clone())?;
            legs.push(wrap.into());
            if buy == wrapped {
                return Ok(legs);
            }
            wrapped.clone()
        } else {
            sell.clone()
        };
        let erc20_buy = if buy.is_native() { wrapped.clone() } else { buy.clone() };

        legs.extend(self.erc20_path(&erc20_sell, &erc20_buy, amount, slippage).await?);

        if buy.is_native() {
            let last_out = legs
                .last()
                .ok_or_else(|| SwapError::NoRouteFound {
                    sell: sell.symbol.clone(),
                    buy: buy.symbol.clone(),
                })?
                .min_buy_amount()?
                .clone();
            let mut unwrap = UnwrapLeg::new(wrapped.clone(), buy.clone());
            unwrap.quote_forward(last_out)?;
            legs.push(unwrap.into());
        }

        Ok(legs)
    }

    async fn erc20_path(
        &self,
        sell: &Asset,
        buy: &Asset,
        amount: Amount,
        slippage: Decimal,
    ) -> Result<Vec<SwapLeg>> {
        let ctx = &self.ctx;
        if !ctx.is_primary(sell) && !ctx.is_primary(buy) {
            let mut leg = AggregatorSwapLeg::new(sell.clone(), buy.clone());
            leg.quote_forward(ctx, amount, slippage).await?;
            return Ok(vec![leg.into()]);
        }

        let decision = self.router.find_routes(sell, buy, &amount, slippage).await?;
        if decision.direct_is_best() {
            debug!("Direct pool {} is also the best route", decision.best().pool.name);
            return Ok(vec![decision.best().clone().into()]);
        }

        let direct = decision.direct().cloned();
        let mut best = decision.best().clone();

        match decision.direction {
            Direction::SellPrimary => {
                let relay_out = best.state.require_min_buy_amount(&best.name())?.clone();
                let mut aggregator = AggregatorSwapLeg::new(best.state.buy.clone(), buy.clone());
                aggregator.quote_forward(ctx, relay_out, slippage).await?;

                let composed_min = aggregator.state.require_min_buy_amount(&aggregator.name())?;
                if let Some(direct) = direct {
                    if direct.state.require_min_buy_amount(&direct.name())? > composed_min {
                        debug!("Direct pool {} beats relay through {}", direct.pool.name, best.pool.name);
                        return Ok(vec![direct.into()]);
                    }
                }
                Ok(vec![best.into(), aggregator.into()])
            }
            Direction::BuyPrimary => {
                let mut aggregator = AggregatorSwapLeg::new(sell.clone(), best.state.sell.clone());
                aggregator.quote_forward(ctx, amount, slippage).await?;

                let relay_in = aggregator
                    .state
                    .require_min_buy_amount(&aggregator.name())?
                    .clone();
                best.quote_forward(ctx, relay_in, slippage).await?;

                let composed_min = best.state.require_min_buy_amount(&best.name())?;
                if let Some(direct) = direct {
                    if direct.state.require_min_buy_amount(&direct.name())? > composed_min {
                        debug!("Direct pool {} beats relay through {}", direct.pool.name, best.pool.name);
                        return Ok(vec![direct.into()]);
                    }
                }
                Ok(vec![aggregator.into(), best.into()])
            }
        }
    }
}
