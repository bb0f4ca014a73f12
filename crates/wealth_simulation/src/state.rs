//! Portfolio snapshots.
//!
//! A [`PortfolioState`] is an immutable record of one period's end. The
//! simulator derives each state from the previous one with
//! [`PortfolioState::successor`] and never mutates a state once it has been
//! pushed onto a path.

use crate::costs::TradeCost;
use crate::tax::{RealisedGains, TaxLot};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use wealth_core::types::{AssetClass, AssetId, DataError, Universe};

/// Holding in one asset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Asset held
    pub asset: AssetId,
    /// Price index of the asset (1.0 at simulation start)
    pub price: f64,
    /// Open tax lots
    pub lots: Vec<TaxLot>,
}

impl Position {
    /// Position with no holdings at price 1.
    pub fn empty(asset: AssetId) -> Self {
        Self {
            asset,
            price: 1.0,
            lots: Vec::new(),
        }
    }

    /// Units held.
    pub fn quantity(&self) -> f64 {
        self.lots.iter().map(|l| l.quantity).sum()
    }

    /// Market value at the current price.
    #[inline]
    pub fn market_value(&self) -> f64 {
        self.quantity() * self.price
    }

    /// Total cost basis of open lots.
    pub fn cost_basis(&self) -> f64 {
        self.lots.iter().map(TaxLot::cost_basis).sum()
    }

    /// Unrealised gain at the current price.
    #[inline]
    pub fn unrealised_gain(&self) -> f64 {
        self.market_value() - self.cost_basis()
    }
}

/// Kind of fee charged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeKind {
    /// Tiered management fee
    Management,
    /// Performance fee above the high-water mark
    Performance,
}

/// Something that happened during a period.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StateEvent {
    /// Holdings were moved towards new target weights.
    Rebalanced {
        /// Strategy that produced the targets
        strategy: String,
        /// Why the rebalance fired
        trigger: String,
        /// `Σ|Δw|` over the invested weights
        turnover: f64,
        /// Trading costs paid
        costs: TradeCost,
        /// Solver status
        diagnostic: String,
    },
    /// The optimiser found no feasible portfolio; current weights were held.
    OptimiserFallback {
        /// Why the optimiser failed
        reason: String,
    },
    /// Cash went negative and holdings were sold to cover it.
    LiquidityShortfall {
        /// Cash that had to be raised
        required: f64,
        /// Cash actually raised
        raised: f64,
        /// Amount that could not be raised
        unfunded: f64,
    },
    /// Daily-liquid holdings were sold pro rata to fund fees or tax.
    CashRaised {
        /// Market value sold
        sold: f64,
        /// Trading costs paid
        costs: f64,
    },
    /// One forced sale made while covering a shortfall.
    ForcedSale {
        /// Asset sold
        asset: AssetId,
        /// Market value sold
        value: f64,
        /// Emergency haircut paid
        haircut: f64,
    },
    /// Year-end capital-gains settlement.
    TaxSettled {
        /// Realised gains of the tax year
        realised: RealisedGains,
        /// Tax paid
        tax: f64,
        /// Carryforward after settlement
        carryforward: f64,
    },
    /// Losses realised by tax-loss harvesting.
    TaxLossHarvested {
        /// Loss realised (negative)
        realised: f64,
    },
    /// A fee was deducted from cash.
    FeeCharged {
        /// Fee type
        kind: FeeKind,
        /// Amount
        amount: f64,
    },
}

/// Immutable end-of-period portfolio snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PortfolioState {
    /// Period index; 0 is the initial state
    pub period: usize,
    /// Valuation date
    pub date: NaiveDate,
    /// Positions in universe order
    pub positions: Vec<Position>,
    /// Cash balance
    pub cash: f64,
    /// Regime in force during the period
    pub regime: usize,
    /// Portfolio return over the period, after costs, fees and tax
    pub period_return: f64,
    /// Realised gains of the current tax year
    pub realised_ytd: RealisedGains,
    /// Cumulative realised gains since the start
    pub cumulative_realised: f64,
    /// Unused capital losses (≤ 0)
    pub loss_carryforward: f64,
    /// High-water mark for the performance fee
    pub high_water_mark: f64,
    /// Cumulative trading costs
    pub costs_paid: f64,
    /// Cumulative fees
    pub fees_paid: f64,
    /// Cumulative tax
    pub taxes_paid: f64,
    /// Client risk tolerance after this period
    pub risk_tolerance: f64,
    /// Weights targeted at the most recent rebalance
    pub target_weights: Vec<f64>,
    /// A forced liquidation took place this period
    pub liquidity_shortfall: bool,
    /// Events of this period
    pub events: Vec<StateEvent>,
}

impl PortfolioState {
    /// Total market value of positions.
    pub fn invested_value(&self) -> f64 {
        self.positions.iter().map(Position::market_value).sum()
    }

    /// Positions plus cash.
    #[inline]
    pub fn total_value(&self) -> f64 {
        self.invested_value() + self.cash
    }

    /// Weights of each position in total value (cash excluded from the vector).
    pub fn weights(&self) -> Vec<f64> {
        let total = self.total_value();
        self.positions
            .iter()
            .map(|p| if total > 0.0 { p.market_value() / total } else { 0.0 })
            .collect()
    }

    /// Weights of each position in invested value.
    pub fn invested_weights(&self) -> Vec<f64> {
        let invested = self.invested_value();
        self.positions
            .iter()
            .map(|p| if invested > 0.0 { p.market_value() / invested } else { 0.0 })
            .collect()
    }

    /// Holdings keyed by asset identifier (market values).
    pub fn holdings(&self) -> BTreeMap<AssetId, f64> {
        self.positions
            .iter()
            .map(|p| (p.asset.clone(), p.market_value()))
            .collect()
    }

    /// Next period's working copy: same holdings, no events.
    pub fn successor(&self, period: usize, date: NaiveDate) -> Self {
        Self {
            period,
            date,
            period_return: 0.0,
            liquidity_shortfall: false,
            events: Vec::new(),
            ..self.clone()
        }
    }

    /// Aggregate market value per asset class.
    pub fn class_values(&self, universe: &Universe) -> BTreeMap<AssetClass, f64> {
        let mut out = BTreeMap::new();
        for (asset, position) in universe.assets().iter().zip(&self.positions) {
            *out.entry(asset.class).or_insert(0.0) += position.market_value();
        }
        out
    }
}

/// Holdings at the start of a simulation.
///
/// # Examples
///
/// ```
/// use wealth_simulation::state::InitialPortfolio;
///
/// let portfolio = InitialPortfolio::from_weights(1_000_000.0, [("EQ", 0.6), ("BOND", 0.4)]);
/// assert_eq!(portfolio.total_value(), 1_000_000.0);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InitialPortfolio {
    /// Cash balance
    #[serde(default)]
    pub cash: f64,
    /// Market value per asset
    #[serde(default)]
    pub holdings: BTreeMap<AssetId, f64>,
    /// Total cost basis per asset; market value when absent
    #[serde(default)]
    pub cost_basis: BTreeMap<AssetId, f64>,
}

impl InitialPortfolio {
    /// Portfolio held entirely in cash.
    pub fn all_cash(value: f64) -> Self {
        Self {
            cash: value,
            ..Self::default()
        }
    }

    /// Portfolio of `value` split by `weights`.
    pub fn from_weights<I, K>(value: f64, weights: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<AssetId>,
    {
        Self {
            cash: 0.0,
            holdings: weights
                .into_iter()
                .map(|(id, w)| (id.into(), w * value))
                .collect(),
            cost_basis: BTreeMap::new(),
        }
    }

    /// Sets the cost basis of one holding.
    pub fn with_cost_basis(mut self, id: impl Into<AssetId>, basis: f64) -> Self {
        self.cost_basis.insert(id.into(), basis);
        self
    }

    /// Cash plus holdings.
    pub fn total_value(&self) -> f64 {
        self.cash + self.holdings.values().sum::<f64>()
    }

    /// Builds the period-0 state.
    ///
    /// Each holding becomes one lot of `value` units at price 1 acquired at
    /// period 0.
    ///
    /// # Errors
    ///
    /// Returns `DataError` for unknown assets or negative amounts.
    pub fn to_state(
        &self,
        universe: &Universe,
        date: NaiveDate,
        risk_tolerance: f64,
    ) -> Result<PortfolioState, DataError> {
        if !(self.cash >= 0.0) {
            return Err(DataError::invalid_client("portfolio", "cash must be non-negative"));
        }
        let mut positions: Vec<Position> = universe.ids().cloned().map(Position::empty).collect();
        for (id, value) in &self.holdings {
            let i = universe.require(id)?;
            if !(*value >= 0.0) || !value.is_finite() {
                return Err(DataError::invalid_asset(
                    id.as_str(),
                    "initial holding must be non-negative",
                ));
            }
            if *value > 0.0 {
                let basis = self.cost_basis.get(id).copied().unwrap_or(*value);
                positions[i].lots.push(TaxLot {
                    quantity: *value,
                    cost_per_unit: basis / value,
                    acquired_period: 0,
                });
            }
        }
        for id in self.cost_basis.keys() {
            universe.require(id)?;
        }
        let total = self.total_value();
        let target_weights = positions
            .iter()
            .map(|p| if total > 0.0 { p.market_value() / total } else { 0.0 })
            .collect();
        Ok(PortfolioState {
            period: 0,
            date,
            positions,
            cash: self.cash,
            regime: 0,
            period_return: 0.0,
            realised_ytd: RealisedGains::default(),
            cumulative_realised: 0.0,
            loss_carryforward: 0.0,
            high_water_mark: total,
            costs_paid: 0.0,
            fees_paid: 0.0,
            taxes_paid: 0.0,
            risk_tolerance,
            target_weights,
            liquidity_shortfall: false,
            events: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use wealth_core::types::Asset;

    fn universe() -> Universe {
        Universe::new(vec![
            Asset::new("EQ", AssetClass::Equity, 0.08, 0.15),
            Asset::new("BOND", AssetClass::FixedIncome, 0.03, 0.05),
        ])
        .unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
    }

    #[test]
    fn test_initial_state_values() {
        let state = InitialPortfolio::from_weights(1_000_000.0, [("EQ", 0.6), ("BOND", 0.3)])
            .with_cost_basis("EQ", 500_000.0);
        let state = InitialPortfolio {
            cash: 100_000.0,
            ..state
        }
        .to_state(&universe(), date(), 5.0)
        .unwrap();

        assert_relative_eq!(state.total_value(), 1_000_000.0);
        assert_relative_eq!(state.invested_value(), 900_000.0);
        assert_relative_eq!(state.weights()[0], 0.6);
        assert_relative_eq!(state.invested_weights()[1], 1.0 / 3.0);
        assert_relative_eq!(state.positions[0].unrealised_gain(), 100_000.0, epsilon = 1e-6);
        assert_eq!(state.high_water_mark, 1_000_000.0);
    }

    #[test]
    fn test_unknown_asset_rejected() {
        let result = InitialPortfolio::from_weights(1.0, [("XX", 1.0)]).to_state(&universe(), date(), 5.0);
        assert!(matches!(result, Err(DataError::UnknownAsset(_))));
    }

    #[test]
    fn test_successor_clears_events() {
        let mut state = InitialPortfolio::all_cash(1_000.0)
            .to_state(&universe(), date(), 5.0)
            .unwrap();
        state.events.push(StateEvent::FeeCharged {
            kind: FeeKind::Management,
            amount: 1.0,
        });
        state.liquidity_shortfall = true;
        let next = state.successor(1, date());
        assert!(next.events.is_empty());
        assert!(!next.liquidity_shortfall);
        assert_eq!(next.cash, state.cash);
        assert_eq!(next.period, 1);
    }

    #[test]
    fn test_event_serialisation_is_tagged() {
        let event = StateEvent::LiquidityShortfall {
            required: 10.0,
            raised: 10.0,
            unfunded: 0.0,
        };
        let rendered = toml::to_string(&Wrapper { event }).unwrap();
        assert!(rendered.contains("event = \"liquidity_shortfall\""));
    }

    #[derive(Serialize)]
    struct Wrapper {
        event: StateEvent,
    }
}
