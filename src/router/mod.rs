/*
 * Route finder for swaps with the primary asset on one side
 *
 * Every quotable primary pool is read in one batched call. Selling the
 * primary asset reads each pool with the literal amount; buying it first
 * approximates what an upstream aggregator leg would deliver in each pool's
 * relay asset and reads the pools with those approximations.
 */

use ethers::types::U256;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};
use crate::abi::pool as pool_abi;
use crate::cache::{PriceCache, PriceSnapshot};
use crate::context::{Pool, SwapContext};
use crate::legs::PoolSwapLeg;
use crate::models::{Result, SwapError};
use crate::pipeline::{Clipboard, PipeCall};
use crate::token::{Amount, Asset};

/// Flat fee assumed for any venue when approximating, as `1 - 0.03%`.
#[must_use]
pub fn assumed_fee_factor() -> Decimal {
    Decimal::new(9997, 4)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Approximation {
    pub min_amount_out: Amount,
    pub max_amount_out: Amount,
}

pub fn approximate(
    snapshot: &PriceSnapshot,
    from: &Asset,
    to: &Asset,
    amount: &Amount,
    slippage: Decimal,
) -> Result<Approximation> {
    let from_usd = snapshot.token_usd(from);
    let to_usd = snapshot.token_usd(to);
    if !from_usd.is_positive() || !to_usd.is_positive() {
        return Err(SwapError::CalculationError(format!(
            "Missing USD price for {} or {}",
            from.symbol, to.symbol
        )));
    }

    let relative = from_usd.try_div(&to_usd, Some(18))?;
    let pair_amount = relative.mul(amount).redecimal(to.decimals);
    let fee = assumed_fee_factor();

    Ok(Approximation {
        min_amount_out: pair_amount.sub_slippage(slippage).mul_decimal(fee),
        max_amount_out: pair_amount.mul_decimal(fee),
    })
}

const NOMINAL_USD: i64 = 100;

/// `NOMINAL_USD` worth of `pair`. Every unpriced candidate is read with the
/// same notional so the pools still rank against each other; the relay leg is
/// re-quoted with the aggregator's real output afterwards.
pub fn nominal_amount(snapshot: &PriceSnapshot, pair: &Asset) -> Result<Amount> {
    let pair_usd = snapshot.token_usd(pair);
    Amount::from_raw(NOMINAL_USD, 0).try_div(&pair_usd, Some(pair.decimals))
}

#[must_use]
pub fn usd_rank_key(snapshot: &PriceSnapshot, asset: &Asset, bought: &Amount) -> Amount {
    snapshot.token_usd(asset).redecimal(18).mul(bought)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    SellPrimary,
    BuyPrimary,
}

impl Direction {
    fn as_label(self) -> &'static str {
        match self {
            Direction::SellPrimary => "sell_primary",
            Direction::BuyPrimary => "buy_primary",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RouteDecision {
    pub direction: Direction,
    legs: Vec<PoolSwapLeg>,
    direct: Option<usize>,
}

impl RouteDecision {
    #[must_use]
    pub fn best(&self) -> &PoolSwapLeg {
        &self.legs[0]
    }

    #[must_use]
    pub fn direct(&self) -> Option<&PoolSwapLeg> {
        self.direct.map(|i| &self.legs[i])
    }

    #[must_use]
    pub fn direct_is_best(&self) -> bool {
        self.direct == Some(0)
    }

    #[must_use]
    pub fn legs(&self) -> &[PoolSwapLeg] {
        &self.legs
    }
}

struct Candidate {
    pool: Pool,
    sell: Asset,
    buy: Asset,
    amount_in: Amount,
}

pub struct RouteFinder {
    ctx: Arc<SwapContext>,
    cache: Arc<PriceCache>,
}

impl RouteFinder {
    #[must_use]
    pub fn new(ctx: Arc<SwapContext>, cache: Arc<PriceCache>) -> Self {
        Self { ctx, cache }
    }

    pub async fn find_routes(
        &self,
        sell: &Asset,
        buy: &Asset,
        amount: &Amount,
        slippage: Decimal,
    ) -> Result<RouteDecision> {
        let ctx = &self.ctx;
        let leg = "route finder";
        for (field, asset) in [("sellToken", sell), ("buyToken", buy)] {
            if asset.is_native() {
                return Err(SwapError::validation(leg, field, "pool routes need ERC20 assets"));
            }
        }
        let direction = match (ctx.is_primary(sell), ctx.is_primary(buy)) {
            (true, false) => Direction::SellPrimary,
            (false, true) => Direction::BuyPrimary,
            _ => {
                return Err(SwapError::validation(
                    leg,
                    "sellToken",
                    "exactly one side must be the primary asset",
                ))
            }
        };
        ctx.metrics
            .route_lookups
            .with_label_values(&[direction.as_label()])
            .inc();

        let snapshot = self.cache.snapshot().await;
        let candidates = self.candidates(&snapshot, direction, sell, amount, slippage)?;
        if candidates.is_empty() {
            return Err(SwapError::NoRouteFound {
                sell: sell.symbol.clone(),
                buy: buy.symbol.clone(),
            });
        }

        let empty = Clipboard::Empty.encode();
        let calls = candidates
            .iter()
            .map(|c| {
                Ok(PipeCall {
                    target: c.pool.address,
                    call_data: pool_abi::encode_get_swap_out(
                        c.sell.require_address(leg)?,
                        c.buy.require_address(leg)?,
                        c.amount_in.to_u256()?,
                    ),
                    clipboard: empty.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let expected = calls.len();
        debug!("Reading {} pool quotes in one batch", expected);
        let results = ctx.chain.advanced_pipe(calls, U256::zero()).await?;
        if results.len() != expected {
            return Err(SwapError::decode(
                "pool quote batch",
                format!("expected {expected} results, got {}", results.len()),
            ));
        }

        let mut ranked: Vec<(Amount, PoolSwapLeg)> = Vec::with_capacity(candidates.len());
        for (candidate, raw) in candidates.into_iter().zip(&results) {
            let out = pool_abi::decode_get_swap_out(&candidate.pool.name, raw)?;
            if out.is_zero() {
                debug!("Pool {} quoted zero output; skipping", candidate.pool.name);
                continue;
            }
            let buy_amount = candidate.buy.from_blockchain(out);
            let leg = PoolSwapLeg::quoted(
                candidate.pool,
                candidate.sell,
                candidate.buy,
                candidate.amount_in,
                buy_amount,
                slippage,
            )?;
            let key = match direction {
                Direction::SellPrimary => {
                    let bought = leg.state.require_buy_amount(&leg.name())?;
                    usd_rank_key(&snapshot, &leg.state.buy, bought)
                }
                Direction::BuyPrimary => leg.state.require_buy_amount(&leg.name())?.clone(),
            };
            ranked.push((key, leg));
        }

        if ranked.is_empty() {
            return Err(SwapError::NoRouteFound {
                sell: sell.symbol.clone(),
                buy: buy.symbol.clone(),
            });
        }
        ranked.sort_by(|a, b| b.0.cmp(&a.0));

        let legs: Vec<PoolSwapLeg> = ranked.into_iter().map(|(_, leg)| leg).collect();
        let direct = legs.iter().position(|l| match direction {
            Direction::SellPrimary => &l.state.buy == buy,
            Direction::BuyPrimary => &l.state.sell == sell,
        });

        info!(
            "Found {} routes for {} -> {}: best {}, direct {}",
            legs.len(),
            sell.symbol,
            buy.symbol,
            legs[0].pool.name,
            direct.map_or("none", |i| legs[i].pool.name.as_str())
        );

        Ok(RouteDecision {
            direction,
            legs,
            direct,
        })
    }

    fn candidates(
        &self,
        snapshot: &PriceSnapshot,
        direction: Direction,
        sell: &Asset,
        amount: &Amount,
        slippage: Decimal,
    ) -> Result<Vec<Candidate>> {
        let primary = &self.ctx.tokens.primary;
        let mut out = Vec::new();

        for pool in self.ctx.primary_pools() {
            if !snapshot.has_reserves_and_prices(pool) {
                debug!("Pool {} lacks reserves or prices; skipping", pool.name);
                continue;
            }
            let pair = pool.pair_asset(primary)?.clone();
            let candidate = match direction {
                Direction::SellPrimary => Candidate {
                    pool: pool.clone(),
                    sell: primary.clone(),
                    buy: pair,
                    amount_in: amount.clone(),
                },
                Direction::BuyPrimary => {
                    let amount_in = if &pair == sell {
                        amount.clone()
                    } else if snapshot.token_usd(sell).is_positive() {
                        approximate(snapshot, sell, &pair, amount, slippage)?.min_amount_out
                    } else {
                        debug!(
                            "No USD price for {}; reading pool {} with a nominal amount",
                            sell.symbol, pool.name
                        );
                        nominal_amount(snapshot, &pair)?
                    };
                    if !amount_in.is_positive() {
                        debug!("Approximated zero {} for pool {}; skipping", pair.symbol, pool.name);
                        continue;
                    }
                    Candidate {
                        pool: pool.clone(),
                        sell: pair,
                        buy: primary.clone(),
                        amount_in,
                    }
                }
            };
            out.push(candidate);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::Address;

    fn snapshot_with(prices: &[(&Asset, i64)]) -> PriceSnapshot {
        let mut snapshot = PriceSnapshot::default();
        for (asset, usd) in prices {
            snapshot
                .prices
                .insert((*asset).clone(), Amount::from_raw(*usd, 6));
        }
        snapshot
    }

    #[test]
    fn same_asset_approximation_only_pays_the_fee() {
        let usdc = Asset::erc20(1, "USDC", Address::from_low_u64_be(1), 6);
        let snapshot = snapshot_with(&[(&usdc, 1_000_000)]);
        let amount = Amount::from_human("1234.56", 6).unwrap();

        let approx = approximate(&snapshot, &usdc, &usdc, &amount, Decimal::new(1, 2)).unwrap();
        assert_eq!(
            approx.max_amount_out,
            amount.mul_decimal(Decimal::ONE - Decimal::new(3, 4))
        );
        assert!(approx.min_amount_out < approx.max_amount_out);
    }

    #[test]
    fn approximation_converts_by_usd_ratio() {
        let usdc = Asset::erc20(1, "USDC", Address::from_low_u64_be(1), 6);
        let weth = Asset::erc20(1, "WETH", Address::from_low_u64_be(2), 18);
        let snapshot = snapshot_with(&[(&usdc, 1_000_000), (&weth, 2_000_000_000)]);
        let amount = Amount::from_human("2000", 6).unwrap();

        let approx = approximate(&snapshot, &usdc, &weth, &amount, Decimal::ZERO).unwrap();
        assert_eq!(approx.max_amount_out.decimals(), 18);
        assert_eq!(approx.max_amount_out, Amount::from_human("0.9997", 18).unwrap());
        assert_eq!(approx.min_amount_out, approx.max_amount_out);
    }

    #[test]
    fn nominal_amount_is_a_fixed_usd_notional() {
        let usdc = Asset::erc20(1, "USDC", Address::from_low_u64_be(1), 6);
        let weth = Asset::erc20(1, "WETH", Address::from_low_u64_be(2), 18);
        let snapshot = snapshot_with(&[(&usdc, 1_000_000), (&weth, 2_000_000_000)]);

        assert_eq!(nominal_amount(&snapshot, &usdc).unwrap(), Amount::from_human("100", 6).unwrap());
        assert_eq!(nominal_amount(&snapshot, &weth).unwrap(), Amount::from_human("0.05", 18).unwrap());
    }

    #[test]
    fn rank_key_separates_tiny_outputs() {
        let weth = Asset::erc20(1, "WETH", Address::from_low_u64_be(2), 18);
        let snapshot = snapshot_with(&[(&weth, 2_000_000_000)]);
        let one_wei = Amount::from_raw(1, 18);
        let two_wei = Amount::from_raw(2, 18);

        assert!(usd_rank_key(&snapshot, &weth, &two_wei) > usd_rank_key(&snapshot, &weth, &one_wei));
        assert!(usd_rank_key(&snapshot, &weth, &one_wei).is_positive());
    }

    #[test]
    fn unknown_price_cannot_be_approximated() {
        let usdc = Asset::erc20(1, "USDC", Address::from_low_u64_be(1), 6);
        let dai = Asset::erc20(1, "DAI", Address::from_low_u64_be(3), 18);
        let snapshot = snapshot_with(&[(&usdc, 1_000_000)]);
        let amount = Amount::from_human("1", 6).unwrap();
        assert!(matches!(
            approximate(&snapshot, &usdc, &dai, &amount, Decimal::ZERO),
            Err(SwapError::CalculationError(_))
        ));
    }
}
