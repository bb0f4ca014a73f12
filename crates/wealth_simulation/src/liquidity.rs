//! Cash management and forced liquidation.
//!
//! Fees and tax are charged to cash. At the end of each period negative
//! cash is funded in two steps:
//!
//! 1. [`raise_cash`] sells daily-liquid holdings pro rata, paying normal
//!    trading costs. This is routine settlement and raises no flag.
//! 2. Whatever is still missing is a liquidity shortfall.
//!    [`cover_shortfall`] sells holdings in a fixed order:
//!    - daily-liquid assets by class: Cash, FixedIncome, Esg, Equity, Alternative
//!    - quarterly-gated assets
//!    - locked-up assets
//!
//! Daily-liquid sales pay normal trading costs. Gated and locked sales are
//! emergency redemptions and pay a haircut instead. Whatever cannot be
//! raised is reported as unfunded and cash is floored at zero.

use crate::costs::CostModel;
use crate::state::{PortfolioState, StateEvent};
use crate::tax::{sell_hifo, RealisedGains};
use serde::{Deserialize, Serialize};
use wealth_core::types::{Asset, LiquidityClass, Universe};

/// Shortfalls smaller than this are treated as rounding.
pub const CASH_TOLERANCE: f64 = 1e-6;

/// Shortfalls smaller than this fraction of portfolio value are treated as
/// rounding.
pub const RELATIVE_CASH_TOLERANCE: f64 = 1e-9;

const GROSS_UP_ITERATIONS: usize = 32;

/// Rounding allowance on cash for a portfolio worth `value`.
#[inline]
pub fn cash_tolerance(value: f64) -> f64 {
    CASH_TOLERANCE.max(RELATIVE_CASH_TOLERANCE * value.abs())
}

/// Cash buffer and emergency sale terms.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiquidityPolicy {
    /// Fraction of portfolio value kept in cash at each rebalance
    pub cash_buffer: f64,
    /// Haircut on forced sales of gated or locked assets
    pub emergency_haircut: f64,
}

impl Default for LiquidityPolicy {
    fn default() -> Self {
        Self {
            cash_buffer: 0.0,
            emergency_haircut: 0.05,
        }
    }
}

impl LiquidityPolicy {
    /// Validates ranges.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..1.0).contains(&self.cash_buffer) {
            return Err("cash_buffer must lie in [0, 1)".into());
        }
        if !(0.0..1.0).contains(&self.emergency_haircut) {
            return Err("emergency_haircut must lie in [0, 1)".into());
        }
        Ok(())
    }
}

/// Result of a forced liquidation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Liquidation {
    /// Net cash raised
    pub raised: f64,
    /// Trading costs and haircuts paid
    pub costs: f64,
    /// Gains realised by the sales
    pub realised: RealisedGains,
}

/// Order in which assets are sold to raise cash.
pub fn liquidation_order(universe: &Universe) -> Vec<usize> {
    let tier = |asset: &Asset| match asset.liquidity {
        LiquidityClass::Daily => 0u8,
        LiquidityClass::QuarterlyGated => 1,
        LiquidityClass::LockUp { .. } => 2,
    };
    let mut order: Vec<usize> = (0..universe.len()).collect();
    order.sort_by_key(|&i| {
        let asset = &universe.assets()[i];
        (tier(asset), asset.class.liquidation_rank(), i)
    });
    order
}

/// Funds negative cash in `state` by selling daily-liquid holdings pro rata.
///
/// The amount sold is grossed up so that proceeds net of trading costs
/// cover the deficit. Records a `CashRaised` event. If the daily-liquid
/// holdings are too small, everything tradable is sold and the remaining
/// deficit is left for [`cover_shortfall`].
pub fn raise_cash(
    state: &mut PortfolioState,
    universe: &Universe,
    costs: &CostModel,
    long_term_periods: usize,
) -> Option<Liquidation> {
    if state.cash >= -cash_tolerance(state.total_value()) {
        return None;
    }
    let need = -state.cash;
    let liquid: Vec<(usize, f64)> = universe
        .assets()
        .iter()
        .zip(&state.positions)
        .enumerate()
        .filter(|(_, (asset, position))| asset.liquidity.is_daily() && position.market_value() > 0.0)
        .map(|(i, (_, position))| (i, position.market_value()))
        .collect();
    let available: f64 = liquid.iter().map(|(_, v)| v).sum();
    if !(available > 0.0) {
        return None;
    }

    let charges = |gross: f64| -> f64 {
        liquid
            .iter()
            .map(|&(i, v)| costs.cost(&universe.assets()[i], gross * v / available).total())
            .sum()
    };
    let mut gross = need.min(available);
    for _ in 0..GROSS_UP_ITERATIONS {
        let next = (need + charges(gross)).min(available);
        let settled = (next - gross).abs() <= RELATIVE_CASH_TOLERANCE * need;
        gross = next;
        if settled {
            break;
        }
    }

    let mut outcome = Liquidation::default();
    for &(i, held) in &liquid {
        let value = gross * held / available;
        if value <= 0.0 {
            continue;
        }
        let charge = costs.cost(&universe.assets()[i], value).total();
        let proceeds = value - charge;
        let position = &mut state.positions[i];
        let price = position.price;
        outcome.realised += sell_hifo(
            &mut position.lots,
            value / price,
            price * proceeds / value,
            state.period,
            long_term_periods,
        );
        outcome.raised += proceeds;
        outcome.costs += charge;
    }

    state.cash += outcome.raised;
    state.costs_paid += outcome.costs;
    state.realised_ytd += outcome.realised;
    state.cumulative_realised += outcome.realised.total();
    state.events.push(StateEvent::CashRaised {
        sold: gross,
        costs: outcome.costs,
    });
    tracing::debug!(
        period = state.period,
        required = need,
        sold = gross,
        "Sold daily-liquid holdings to fund cash"
    );
    Some(outcome)
}

/// Covers negative cash in `state` by selling holdings.
///
/// Does nothing when cash is short by no more than [`cash_tolerance`] of
/// the portfolio value; otherwise records a `LiquidityShortfall` event, one
/// `ForcedSale` per asset sold, sets the shortfall flag and floors cash at
/// zero.
pub fn cover_shortfall(
    state: &mut PortfolioState,
    universe: &Universe,
    costs: &CostModel,
    policy: &LiquidityPolicy,
    long_term_periods: usize,
) -> Option<Liquidation> {
    if state.cash >= -cash_tolerance(state.total_value()) {
        if state.cash < 0.0 {
            state.cash = 0.0;
        }
        return None;
    }
    let required = -state.cash;
    let mut need = required;
    let mut outcome = Liquidation::default();

    for i in liquidation_order(universe) {
        if need <= CASH_TOLERANCE {
            break;
        }
        let asset = &universe.assets()[i];
        let position = &mut state.positions[i];
        let available = position.market_value();
        if available <= 0.0 {
            continue;
        }

        let (value, proceeds, charge) = if asset.liquidity.is_daily() {
            let fraction = (costs.cost(asset, need).total() / need).min(0.5);
            let value = available.min(need / (1.0 - fraction));
            let charge = costs.cost(asset, value).total();
            (value, value - charge, charge)
        } else {
            let h = policy.emergency_haircut;
            let value = available.min(need / (1.0 - h));
            (value, value * (1.0 - h), value * h)
        };

        let price = position.price;
        let effective_price = price * proceeds / value;
        outcome.realised += sell_hifo(
            &mut position.lots,
            value / price,
            effective_price,
            state.period,
            long_term_periods,
        );
        outcome.raised += proceeds;
        outcome.costs += charge;
        need -= proceeds;
        state.events.push(StateEvent::ForcedSale {
            asset: asset.id.clone(),
            value,
            haircut: if asset.liquidity.is_daily() { 0.0 } else { charge },
        });
    }

    let unfunded = need.max(0.0);
    state.cash = (state.cash + outcome.raised).max(0.0);
    state.costs_paid += outcome.costs;
    state.realised_ytd += outcome.realised;
    state.cumulative_realised += outcome.realised.total();
    state.liquidity_shortfall = true;
    state.events.push(StateEvent::LiquidityShortfall {
        required,
        raised: outcome.raised,
        unfunded,
    });
    tracing::warn!(
        period = state.period,
        required,
        raised = outcome.raised,
        unfunded,
        "Forced liquidation to cover negative cash"
    );
    Some(outcome)
}
