//! Monte Carlo path simulator.
//!
//! Each scenario of each client is an independent path. Within a period the
//! steps run in a fixed order:
//!
//! ```text
//! draw returns ─► revalue ─► management fee ─► rebalance? ─► year end? ─► fund cash ─► adapt profile
//!                                              │                │              │
//!                                              │                │              └─ pro-rata sale, then forced sale
//!                                              │                └─ harvest, performance fee, tax
//!                                              └─ optimise ─► (fallback) ─► bias ─► trade with costs
//! ```
//!
//! Rebalances are self-funding: the invested budget is solved so that
//! trades plus their costs leave exactly the cash buffer. Fees and tax are
//! funded by pro-rata sales of daily-liquid holdings; only a deficit those
//! cannot cover is a liquidity shortfall.
//!
//! Scenarios run on the rayon pool. Each owns its RNG, seeded from
//! `(random_seed, client index, scenario index)`, its regime state and its
//! snapshots, so results do not depend on scheduling.

use crate::config::{SimulationConfig, MAX_CLIENTS, MAX_PERIODS, MAX_SCENARIOS};
use crate::costs::TradeCost;
use crate::error::{ConfigurationError, ScenarioError, ScenarioFailure, SimulationError};
use crate::liquidity::{cover_shortfall, raise_cash};
use crate::path::{SimulationOutcome, SimulationPath};
use crate::rebalance::{RebalanceInputs, RebalanceTrigger};
use crate::state::{FeeKind, InitialPortfolio, PortfolioState, StateEvent};
use crate::tax::{harvest_losses, sell_hifo, RealisedGains, TaxLot};
use chrono::{Days, Months, NaiveDate};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use wealth_core::types::client::MAX_RISK_TOLERANCE;
use wealth_core::types::{initial_allocation, ClientProfile};
use wealth_models::behaviour::{BiasContext, BiasInjector};
use wealth_models::rng::{derive_seed, SimRng};
use wealth_models::sampler::ReturnModel;
use wealth_optimiser::constraints::CandidateAsset;
use wealth_optimiser::strategy::OptimisationStrategy;
use wealth_optimiser::{optimise, Diagnostic, OptimisationProblem, OptimisationResult};

/// Trades smaller than this fraction of portfolio value are skipped.
const MIN_TRADE_FRACTION: f64 = 1e-9;

/// Funding residual, as a fraction of portfolio value, accepted when
/// solving the rebalance budget.
const FUNDING_TOLERANCE: f64 = 1e-12;
const FUNDING_ITERATIONS: usize = 32;

/// Cooperative cancellation flag shared with a running simulation.
///
/// Checked before each scenario starts; a cancelled run discards all
/// partial results.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Creates an un-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Per-client inputs shared by all of that client's scenarios.
struct ClientRun<'a> {
    index: usize,
    client: &'a ClientProfile,
    initial: &'a PortfolioState,
    anchor: &'a [f64],
    horizon: usize,
}

/// Multi-period wealth simulator.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use wealth_core::math::Matrix;
/// use wealth_core::types::{Asset, AssetClass, ClientProfile, Universe};
/// use wealth_models::factor::{FactorModel, PsdPolicy};
/// use wealth_models::regime::RegimeSwitching;
/// use wealth_models::sampler::ReturnModel;
/// use wealth_simulation::config::SimulationConfig;
/// use wealth_simulation::engine::PathSimulator;
/// use wealth_simulation::state::InitialPortfolio;
///
/// let universe = Arc::new(
///     Universe::new(vec![
///         Asset::new("EQ", AssetClass::Equity, 0.08, 0.15).with_exposures(vec![1.0]),
///         Asset::new("CASH", AssetClass::Cash, 0.02, 0.0).with_exposures(vec![0.0]),
///     ])
///     .unwrap(),
/// );
/// let factors = FactorModel::from_universe(
///     &universe,
///     vec!["equity".into()],
///     Matrix::from_rows(vec![vec![0.0225]]).unwrap(),
///     PsdPolicy::Reject,
/// )
/// .unwrap();
/// let model = ReturnModel::new(universe, factors, RegimeSwitching::calm(), 12).unwrap();
///
/// let config = SimulationConfig::builder().num_scenarios(8).num_periods(6).build().unwrap();
/// let simulator = PathSimulator::new(config, Arc::new(model)).unwrap();
/// let client = ClientProfile::new("C1", 100_000.0, 5.0);
/// let initial = InitialPortfolio::from_weights(100_000.0, [("EQ", 0.5), ("CASH", 0.5)]);
///
/// let outcome = simulator.simulate(&client, &initial, 6, 8).unwrap();
/// assert_eq!(outcome.paths.len(), 8);
/// assert_eq!(outcome.paths[0].states.len(), 7);
/// ```
#[derive(Clone, Debug)]
pub struct PathSimulator {
    config: SimulationConfig,
    model: Arc<ReturnModel>,
    injector: BiasInjector,
    consensus: Vec<f64>,
    risky: Vec<bool>,
    cancellation: CancellationToken,
}

impl PathSimulator {
    /// Creates a simulator.
    ///
    /// # Errors
    ///
    /// - `SimulationError::Configuration` if the configuration is invalid or
    ///   disagrees with the model's period length
    /// - `SimulationError::Data` if the consensus allocation names unknown assets
    pub fn new(config: SimulationConfig, model: Arc<ReturnModel>) -> Result<Self, SimulationError> {
        config.validate()?;
        if model.periods_per_year() != config.periods_per_year {
            return Err(ConfigurationError::invalid(
                "periods_per_year",
                format!(
                    "configuration uses {} but the return model was built for {}",
                    config.periods_per_year,
                    model.periods_per_year()
                ),
            )
            .into());
        }
        let universe = model.universe();
        let consensus = match &config.consensus_allocation {
            Some(allocation) => universe.dense_weights(allocation.iter())?,
            None => initial_allocation(MAX_RISK_TOLERANCE / 2.0, universe),
        };
        let risky = universe.assets().iter().map(|a| a.class.is_risky()).collect();
        let injector = BiasInjector::new(config.periods_per_year).with_toggles(config.biases);
        Ok(Self {
            config,
            model,
            injector,
            consensus,
            risky,
            cancellation: CancellationToken::new(),
        })
    }

    /// Attaches a cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Run configuration.
    #[inline]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Return model.
    #[inline]
    pub fn model(&self) -> &Arc<ReturnModel> {
        &self.model
    }

    /// Cancellation token of this simulator.
    #[inline]
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Simulates `num_scenarios` paths of `horizon` periods for one client.
    ///
    /// The client is treated as batch index 0 for seeding.
    ///
    /// # Errors
    ///
    /// - `SimulationError::Data` for an invalid client or portfolio
    /// - `SimulationError::Configuration` for an out-of-range horizon or scenario count
    /// - `SimulationError::Cancelled` if the run was cancelled
    pub fn simulate(
        &self,
        client: &ClientProfile,
        initial: &InitialPortfolio,
        horizon: usize,
        num_scenarios: usize,
    ) -> Result<SimulationOutcome, SimulationError> {
        self.simulate_client(0, client, initial, horizon, num_scenarios)
    }

    /// Simulates one client at batch position `client_index` with the
    /// configured horizon and scenario count.
    pub fn run(
        &self,
        client_index: usize,
        client: &ClientProfile,
        initial: &InitialPortfolio,
    ) -> Result<SimulationOutcome, SimulationError> {
        self.simulate_client(
            client_index,
            client,
            initial,
            self.config.num_periods,
            self.config.num_scenarios,
        )
    }

    /// Simulates every client of the batch in order, or the first
    /// `num_clients` when the configuration caps the batch.
    ///
    /// # Errors
    ///
    /// - `SimulationError::Configuration` for a batch larger than `MAX_CLIENTS`
    /// - otherwise the first client-level error aborts the batch
    pub fn simulate_batch(
        &self,
        clients: &[(ClientProfile, InitialPortfolio)],
    ) -> Result<Vec<SimulationOutcome>, SimulationError> {
        let count = match self.config.num_clients {
            Some(cap) => {
                if clients.len() < cap {
                    warn!(
                        configured = cap,
                        supplied = clients.len(),
                        "Fewer clients supplied than configured"
                    );
                }
                clients.len().min(cap)
            }
            None => clients.len(),
        };
        if count > MAX_CLIENTS {
            return Err(ConfigurationError::InvalidClientCount(count).into());
        }
        info!(
            clients = count,
            scenarios = self.config.num_scenarios,
            periods = self.config.num_periods,
            "Starting batch simulation"
        );
        clients[..count]
            .iter()
            .enumerate()
            .map(|(i, (client, initial))| self.run(i, client, initial))
            .collect()
    }

    fn simulate_client(
        &self,
        client_index: usize,
        client: &ClientProfile,
        initial: &InitialPortfolio,
        horizon: usize,
        num_scenarios: usize,
    ) -> Result<SimulationOutcome, SimulationError> {
        if horizon == 0 || horizon > MAX_PERIODS {
            return Err(ConfigurationError::InvalidPeriodCount(horizon).into());
        }
        if num_scenarios == 0 || num_scenarios > MAX_SCENARIOS {
            return Err(ConfigurationError::InvalidScenarioCount(num_scenarios).into());
        }
        client.validate()?;
        let universe = self.model.universe();
        let anchor = client.anchor_weights(universe)?;
        let initial_state =
            initial.to_state(universe, self.config.start_date, client.risk_tolerance)?;
        let initial_value = initial_state.total_value();
        if !(initial_value > 0.0) || !initial_value.is_finite() {
            return Err(SimulationError::invalid(format!(
                "client '{}' starts with no wealth",
                client.id
            )));
        }

        info!(
            client = %client.id,
            scenarios = num_scenarios,
            horizon,
            "Simulating client"
        );
        let run = ClientRun {
            index: client_index,
            client,
            initial: &initial_state,
            anchor: &anchor,
            horizon,
        };
        let results: Vec<Result<SimulationPath, ScenarioError>> = (0..num_scenarios)
            .into_par_iter()
            .map(|scenario| {
                if self.cancellation.is_cancelled() {
                    return Err(ScenarioError::Cancelled);
                }
                self.simulate_scenario(&run, scenario)
            })
            .collect();

        if self.cancellation.is_cancelled() {
            let completed = results.iter().filter(|r| r.is_ok()).count();
            warn!(completed, requested = num_scenarios, "Simulation cancelled");
            return Err(SimulationError::Cancelled {
                completed,
                requested: num_scenarios,
            });
        }

        let mut paths = Vec::with_capacity(num_scenarios);
        let mut failures = Vec::new();
        for (scenario, result) in results.into_iter().enumerate() {
            match result {
                Ok(path) => paths.push(path),
                Err(err) => {
                    warn!(client = %client.id, scenario, error = %err, "Scenario excluded");
                    failures.push(ScenarioFailure {
                        scenario,
                        cause: err.to_string(),
                    });
                }
            }
        }
        info!(
            client = %client.id,
            paths = paths.len(),
            failures = failures.len(),
            "Client simulation complete"
        );
        Ok(SimulationOutcome {
            client_id: client.id.clone(),
            client_index,
            initial_value,
            paths,
            failures,
        })
    }

    fn simulate_scenario(
        &self,
        run: &ClientRun<'_>,
        scenario: usize,
    ) -> Result<SimulationPath, ScenarioError> {
        let seed = derive_seed(self.config.random_seed, run.index as u64, scenario as u64);
        let mut rng = SimRng::from_seed(seed);
        let mut market = self.model.initial_state();
        let mut client = run.client.clone();
        let mut states = Vec::with_capacity(run.horizon + 1);
        states.push(run.initial.clone());
        let mut asset_history: Vec<Vec<f64>> = Vec::with_capacity(run.horizon);
        let mut portfolio_history: Vec<f64> = Vec::with_capacity(run.horizon);

        for period in 1..=run.horizon {
            let (draw, next_market) = self.model.draw_period(&market, period, &mut rng);
            market = next_market;

            let previous = &states[states.len() - 1];
            let opening = previous.total_value();
            let mut state = previous.successor(period, self.valuation_date(period));
            state.regime = draw.regime;

            self.revalue(&mut state, &draw.asset_returns);
            asset_history.push(draw.asset_returns);
            self.charge_management_fee(&mut state);

            let interim_return = relative_change(opening, state.total_value());
            let lookback = self.config.lookback_periods.max(1);
            let mut recent: Vec<f64> = portfolio_history
                [portfolio_history.len().saturating_sub(lookback - 1)..]
                .to_vec();
            recent.push(interim_return);

            let current_weights = state.weights();
            let decision = self.config.rebalance.decide(&RebalanceInputs {
                period,
                current_weights: &current_weights,
                target_weights: &state.target_weights,
                last_return: interim_return,
                biases: &client.biases,
            });
            if let Some(trigger) = decision {
                self.rebalance(&mut state, &client, run, trigger, &asset_history, &recent)?;
            }

            if period % self.config.periods_per_year == 0 || period == run.horizon {
                self.close_tax_year(&mut state);
            }

            raise_cash(
                &mut state,
                self.model.universe(),
                &self.config.costs,
                self.long_term_periods(),
            );
            cover_shortfall(
                &mut state,
                self.model.universe(),
                &self.config.costs,
                &self.config.liquidity,
                self.long_term_periods(),
            );

            let closing = state.total_value();
            if !closing.is_finite() {
                return Err(ScenarioError::NonFinite {
                    period,
                    quantity: "portfolio value",
                });
            }
            state.period_return = relative_change(opening, closing);
            client = self.injector.update_profile(&client, state.period_return);
            state.risk_tolerance = client.risk_tolerance;
            portfolio_history.push(state.period_return);
            states.push(state);
        }

        debug!(
            client = %run.client.id,
            scenario,
            final_value = states.last().map_or(0.0, PortfolioState::total_value),
            "Scenario complete"
        );
        Ok(SimulationPath {
            client_id: run.client.id.clone(),
            scenario,
            periods_per_year: self.config.periods_per_year,
            states,
        })
    }

    fn valuation_date(&self, period: usize) -> NaiveDate {
        let start = self.config.start_date;
        let date = match self.config.months_per_period() {
            Some(months) => start.checked_add_months(Months::new(months * period as u32)),
            None => start.checked_add_days(Days::new(
                (period * 365 / self.config.periods_per_year) as u64,
            )),
        };
        date.unwrap_or(start)
    }

    fn long_term_periods(&self) -> usize {
        self.config
            .tax
            .long_term_threshold(self.config.periods_per_year)
    }

    fn revalue(&self, state: &mut PortfolioState, returns: &[f64]) {
        for (position, r) in state.positions.iter_mut().zip(returns) {
            position.price *= 1.0 + r;
        }
        state.cash *= 1.0 + self.config.cash_rate / self.config.periods_per_year as f64;
    }

    fn charge_management_fee(&self, state: &mut PortfolioState) {
        let fee = self
            .config
            .fees
            .period_management_fee(state.total_value(), self.config.periods_per_year);
        if fee > 0.0 {
            state.cash -= fee;
            state.fees_paid += fee;
            state.events.push(StateEvent::FeeCharged {
                kind: FeeKind::Management,
                amount: fee,
            });
        }
    }

    fn rebalance(
        &self,
        state: &mut PortfolioState,
        client: &ClientProfile,
        run: &ClientRun<'_>,
        trigger: RebalanceTrigger,
        asset_history: &[Vec<f64>],
        recent_returns: &[f64],
    ) -> Result<(), ScenarioError> {
        let universe = self.model.universe();
        let period = state.period;
        let ppy = self.config.periods_per_year;
        let total = state.total_value();
        if !(total > 0.0) {
            return Ok(());
        }
        let investable = total * (1.0 - self.config.liquidity.cash_buffer);
        let candidates: Vec<CandidateAsset> = universe
            .assets()
            .iter()
            .map(|a| CandidateAsset::from_asset(a, period, ppy))
            .collect();
        let tradable: Vec<bool> = candidates.iter().map(|c| c.tradable).collect();
        let current: Vec<f64> = state
            .positions
            .iter()
            .map(|p| p.market_value() / investable)
            .collect();

        let expected = self.injector.subjective_returns(
            client,
            &self.model.expected_returns(),
            asset_history,
        );
        let strategy = self
            .config
            .strategy
            .select(client.segment, client.risk_tolerance);
        let mut problem = OptimisationProblem::new(
            candidates,
            expected,
            self.model.covariance().clone(),
            self.config.constraints.clone(),
        )
        .with_risk_aversion(client.risk_aversion());
        let holds_nothing = current.iter().all(|w| *w == 0.0);
        if !holds_nothing || tradable.iter().any(|t| !t) {
            problem = problem.with_current_weights(current.clone());
        }

        let result = match optimise(&problem, &strategy) {
            Ok(result) => result,
            Err(err) if err.is_infeasible() => {
                OptimisationResult::fallback(current.clone(), err.to_string())
            }
            Err(source) => return Err(ScenarioError::Optimiser { period, source }),
        };
        if let Diagnostic::FallbackUsed { reason } = &result.diagnostic {
            warn!(
                client = %client.id,
                period,
                %reason,
                "Optimiser infeasible; holding current weights"
            );
            state.events.push(StateEvent::OptimiserFallback {
                reason: reason.clone(),
            });
            return Ok(());
        }

        let ctx = BiasContext {
            current_weights: &current,
            anchor_weights: run.anchor,
            consensus_weights: &self.consensus,
            risky: &self.risky,
            recent_portfolio_returns: recent_returns,
            periods_elapsed: period,
        };
        let biased = self.injector.apply_bias(client, &result.weights, &ctx);
        let target = pin_untradable(&biased, &current, &tradable);

        let costs = self.execute_trades(state, &target, &tradable, investable);
        let turnover: f64 = target
            .iter()
            .zip(&current)
            .map(|(t, c)| (t - c).abs())
            .sum();
        state.events.push(StateEvent::Rebalanced {
            strategy: strategy.name().to_string(),
            trigger: trigger.to_string(),
            turnover,
            costs,
            diagnostic: result.diagnostic.to_string(),
        });
        state.target_weights = target;
        Ok(())
    }

    /// Moves holdings to `target` weights of the invested budget, sells first.
    ///
    /// The budget starts at `investable` and is solved by fixed-point
    /// iteration so that trades plus their costs leave exactly the cash
    /// buffer: the rebalance is self-funding.
    fn execute_trades(
        &self,
        state: &mut PortfolioState,
        target: &[f64],
        tradable: &[bool],
        investable: f64,
    ) -> TradeCost {
        let universe = self.model.universe();
        let total = state.total_value();
        let min_trade = MIN_TRADE_FRACTION * total;
        let reserve = total - investable;

        let plan = |budget: f64| -> (Vec<f64>, TradeCost) {
            let mut cost = TradeCost::default();
            let trades = state
                .positions
                .iter()
                .zip(target)
                .enumerate()
                .map(|(i, (p, w))| {
                    if !tradable[i] {
                        return 0.0;
                    }
                    let trade = w * budget - p.market_value();
                    if trade.abs() < min_trade {
                        return 0.0;
                    }
                    cost += self.config.costs.cost(&universe.assets()[i], trade);
                    trade
                })
                .collect();
            (trades, cost)
        };
        let funded_weight: f64 = target
            .iter()
            .zip(tradable)
            .filter(|(_, t)| **t)
            .map(|(w, _)| w)
            .sum();

        let mut budget = investable;
        let (mut trades, mut cost) = plan(budget);
        if funded_weight > 0.0 {
            for _ in 0..FUNDING_ITERATIONS {
                let spent = trades.iter().sum::<f64>() + cost.total();
                let residual = state.cash - spent - reserve;
                if residual.abs() <= FUNDING_TOLERANCE * total {
                    break;
                }
                budget = (budget + residual / funded_weight).max(0.0);
                (trades, cost) = plan(budget);
            }
        }

        let long_term = self.long_term_periods();
        let period = state.period;
        let mut realised = RealisedGains::default();
        for (position, trade) in state.positions.iter_mut().zip(&trades) {
            if *trade < 0.0 {
                realised += sell_hifo(
                    &mut position.lots,
                    -trade / position.price,
                    position.price,
                    period,
                    long_term,
                );
                state.cash -= trade;
            }
        }
        for (position, trade) in state.positions.iter_mut().zip(&trades) {
            if *trade > 0.0 {
                position.lots.push(TaxLot {
                    quantity: trade / position.price,
                    cost_per_unit: position.price,
                    acquired_period: period,
                });
                state.cash -= trade;
            }
        }
        state.cash -= cost.total();
        state.costs_paid += cost.total();
        state.realised_ytd += realised;
        state.cumulative_realised += realised.total();
        cost
    }

    fn close_tax_year(&self, state: &mut PortfolioState) {
        let long_term = self.long_term_periods();
        let period = state.period;
        let tax = &self.config.tax;

        if tax.harvest_losses {
            let ppy = self.config.periods_per_year;
            let mut harvested = RealisedGains::default();
            for (asset, position) in self
                .model
                .universe()
                .assets()
                .iter()
                .zip(state.positions.iter_mut())
            {
                if asset.liquidity.can_trade(period, ppy) {
                    harvested += harvest_losses(
                        &mut position.lots,
                        position.price,
                        period,
                        long_term,
                        tax.harvest_threshold,
                    );
                }
            }
            if harvested.total() < 0.0 {
                state.realised_ytd += harvested;
                state.cumulative_realised += harvested.total();
                state.events.push(StateEvent::TaxLossHarvested {
                    realised: harvested.total(),
                });
            }
        }

        let (fee, high_water_mark) = self
            .config
            .fees
            .performance_fee(state.total_value(), state.high_water_mark);
        if fee > 0.0 {
            state.cash -= fee;
            state.fees_paid += fee;
            state.events.push(StateEvent::FeeCharged {
                kind: FeeKind::Performance,
                amount: fee,
            });
        }
        state.high_water_mark = high_water_mark;

        let realised = state.realised_ytd;
        let settlement = tax.settle(realised, state.loss_carryforward);
        if realised.total() != 0.0 || settlement.tax > 0.0 {
            state.cash -= settlement.tax;
            state.taxes_paid += settlement.tax;
            state.events.push(StateEvent::TaxSettled {
                realised,
                tax: settlement.tax,
                carryforward: settlement.carryforward,
            });
        }
        state.loss_carryforward = settlement.carryforward;
        state.realised_ytd = RealisedGains::default();
    }
}

/// Holds assets that cannot trade at their current weight and rescales the
/// tradable ones to fill the rest.
fn pin_untradable(target: &[f64], current: &[f64], tradable: &[bool]) -> Vec<f64> {
    if tradable.iter().all(|t| *t) {
        return target.to_vec();
    }
    let pinned: f64 = current
        .iter()
        .zip(tradable)
        .filter(|(_, t)| !**t)
        .map(|(c, _)| c)
        .sum();
    let free: f64 = target
        .iter()
        .zip(tradable)
        .filter(|(_, t)| **t)
        .map(|(w, _)| w)
        .sum();
    let scale = if free > 0.0 {
        (1.0 - pinned).max(0.0) / free
    } else {
        0.0
    };
    target
        .iter()
        .zip(current)
        .zip(tradable)
        .map(|((w, c), t)| if *t { w * scale } else { *c })
        .collect()
}

#[inline]
fn relative_change(from: f64, to: f64) -> f64 {
    if from > 0.0 {
        to / from - 1.0
    } else {
        0.0
    }
}
