//! Risk report over a set of simulated paths.
//!
//! [`compute_risk`] produces the distributional measures every run needs.
//! [`RiskAnalyser`] adds the measures that need more context: stress
//! scenarios (factor model), ESG scores (universe) and goal attainment
//! (client goals).

use crate::drawdown::{drawdown_stats, DrawdownStats};
use crate::error::RiskError;
use crate::esg::{portfolio_esg_score, EsgRating};
use crate::goals::{evaluate_goals, GoalAttainment};
use crate::parallel::{mean_defined, ParallelConfig};
use crate::performance::PathPerformance;
use crate::stress::{stress_loss, StressPreset, StressResult, StressScenario};
use crate::var::{losses, VarEstimate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use wealth_core::math::statistics::{mean, quantile_sorted};
use wealth_core::types::{ClientId, Goal, Universe};
use wealth_models::factor::FactorModel;
use wealth_models::sampler::ReturnModel;
use wealth_simulation::error::ScenarioFailure;
use wealth_simulation::path::{SimulationOutcome, SimulationPath};
use wealth_simulation::state::PortfolioState;

/// Default annual risk-free rate for Sharpe and Sortino ratios.
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.02;

/// Distribution of terminal portfolio values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValueDistribution {
    /// Mean
    pub mean: f64,
    /// 5th percentile
    pub p05: f64,
    /// Median
    pub median: f64,
    /// 95th percentile
    pub p95: f64,
}

/// Path-averaged performance measures.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    /// Mean compounded return
    pub mean_total_return: f64,
    /// Mean annualised return
    pub mean_annualised_return: f64,
    /// Mean annualised volatility
    pub mean_annualised_volatility: f64,
    /// Mean Sharpe ratio over paths where it is defined
    pub mean_sharpe_ratio: Option<f64>,
    /// Mean Sortino ratio over paths where it is defined
    pub mean_sortino_ratio: Option<f64>,
    /// Mean EWMA volatility forecast at the horizon
    pub mean_volatility_forecast: f64,
}

/// Drawdown measures across paths.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DrawdownSummary {
    /// Mean of per-path maximum drawdowns
    pub mean_max_drawdown: f64,
    /// Largest per-path maximum drawdown
    pub worst_max_drawdown: f64,
    /// Mean longest underwater spell in periods
    pub mean_max_duration: f64,
}

/// Frictions and interventions along the paths.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrictionSummary {
    /// Mean cumulative trading costs
    pub mean_costs: f64,
    /// Mean cumulative fees
    pub mean_fees: f64,
    /// Mean cumulative tax
    pub mean_taxes: f64,
    /// Fraction of paths with a forced liquidation
    pub shortfall_frequency: f64,
    /// Mean optimiser fallbacks per path
    pub mean_fallbacks: f64,
}

/// Risk report for one client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    /// Client analysed
    pub client_id: ClientId,
    /// Paths analysed
    pub num_paths: usize,
    /// Scenarios excluded from the analysis and why
    pub excluded: Vec<ScenarioFailure>,
    /// Mean initial portfolio value
    pub initial_value: f64,
    /// Terminal values
    pub final_value: ValueDistribution,
    /// VaR measures by confidence level, ascending
    pub var: Vec<VarEstimate>,
    /// Drawdown measures
    pub drawdown: DrawdownSummary,
    /// Performance measures
    pub performance: PerformanceSummary,
    /// Costs, fees, tax and liquidity events
    pub frictions: FrictionSummary,
    /// Stress losses on the ending portfolios
    pub stress: Vec<StressResult>,
    /// Goal attainment, highest priority first
    pub goals: Vec<GoalAttainment>,
    /// Mean ending ESG score
    pub esg_score: Option<f64>,
    /// Rating of `esg_score`
    pub esg_rating: Option<EsgRating>,
}

impl RiskReport {
    /// VaR measures at `confidence_level`, if computed.
    pub fn var_at(&self, confidence_level: f64) -> Option<&VarEstimate> {
        self.var
            .iter()
            .find(|v| (v.confidence_level - confidence_level).abs() < 1e-12)
    }

    /// Number of excluded scenarios.
    #[inline]
    pub fn excluded_count(&self) -> usize {
        self.excluded.len()
    }
}

/// Distributional risk measures over `paths`.
///
/// # Errors
///
/// - `RiskError::EmptySample` if `paths` is empty
/// - `RiskError::InvalidConfidenceLevel` for a level outside (0, 1)
pub fn compute_risk(
    paths: &[SimulationPath],
    confidence_levels: &[f64],
) -> Result<RiskReport, RiskError> {
    RiskAnalyser::new(confidence_levels.to_vec()).analyse_paths(paths)
}

/// Configurable risk analysis.
///
/// # Examples
///
/// ```no_run
/// use wealth_core::types::Goal;
/// use wealth_risk::report::RiskAnalyser;
/// # fn run(outcome: &wealth_simulation::path::SimulationOutcome,
/// #        model: &wealth_models::sampler::ReturnModel) {
///
/// let report = RiskAnalyser::new(vec![0.95, 0.99])
///     .with_model(model)
///     .with_preset_stresses()
///     .with_goals(vec![Goal::new("house", 1_200_000.0, 60)])
///     .analyse(outcome)
///     .unwrap();
/// println!("VaR95 = {:.0}", report.var[0].historical_var);
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct RiskAnalyser {
    confidence_levels: Vec<f64>,
    risk_free_rate: f64,
    parallel: ParallelConfig,
    universe: Option<Arc<Universe>>,
    factors: Option<FactorModel>,
    stresses: Vec<StressScenario>,
    goals: Vec<Goal>,
}

impl RiskAnalyser {
    /// Analyser at the given confidence levels.
    pub fn new(confidence_levels: Vec<f64>) -> Self {
        Self {
            confidence_levels,
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
            parallel: ParallelConfig::default(),
            universe: None,
            factors: None,
            stresses: Vec::new(),
            goals: Vec::new(),
        }
    }

    /// Sets the annual risk-free rate.
    pub fn with_risk_free_rate(mut self, rate: f64) -> Self {
        self.risk_free_rate = rate;
        self
    }

    /// Sets when per-path metrics run in parallel.
    pub fn with_parallel(mut self, parallel: ParallelConfig) -> Self {
        self.parallel = parallel;
        self
    }

    /// Uses the model's universe (ESG) and factor model (stress).
    pub fn with_model(mut self, model: &ReturnModel) -> Self {
        self.universe = Some(Arc::clone(model.universe()));
        self.factors = Some(model.factor_model().clone());
        self
    }

    /// Adds stress scenarios.
    pub fn with_stresses(mut self, scenarios: impl IntoIterator<Item = StressScenario>) -> Self {
        self.stresses.extend(scenarios);
        self
    }

    /// Adds every preset stress scenario.
    pub fn with_preset_stresses(self) -> Self {
        self.with_stresses(StressPreset::ALL.iter().map(StressPreset::scenario))
    }

    /// Sets the goals to evaluate.
    pub fn with_goals(mut self, goals: Vec<Goal>) -> Self {
        self.goals = goals;
        self
    }

    /// Analyses a client outcome, reporting its excluded scenarios.
    pub fn analyse(&self, outcome: &SimulationOutcome) -> Result<RiskReport, RiskError> {
        let mut report = self.analyse_paths(&outcome.paths)?;
        report.excluded = outcome.failures.clone();
        Ok(report)
    }

    /// Analyses a set of paths of one client.
    pub fn analyse_paths(&self, paths: &[SimulationPath]) -> Result<RiskReport, RiskError> {
        let mut levels = self.confidence_levels.clone();
        for level in &levels {
            RiskError::check_confidence(*level)?;
        }
        levels.sort_by(f64::total_cmp);
        levels.dedup();
        let first = paths.first().ok_or(RiskError::EmptySample)?;

        let initial: Vec<f64> = paths.iter().map(SimulationPath::initial_value).collect();
        let finals: Vec<f64> = paths.iter().map(SimulationPath::final_value).collect();
        let mut sorted_losses = losses(&initial, &finals)?;
        sorted_losses.sort_by(f64::total_cmp);
        let var = levels
            .iter()
            .map(|p| VarEstimate::from_sorted(&sorted_losses, *p))
            .collect::<Result<Vec<_>, _>>()?;

        let mut sorted_finals = finals.clone();
        sorted_finals.sort_by(f64::total_cmp);
        let final_value = ValueDistribution {
            mean: mean(&finals),
            p05: quantile_sorted(&sorted_finals, 0.05),
            median: quantile_sorted(&sorted_finals, 0.5),
            p95: quantile_sorted(&sorted_finals, 0.95),
        };

        let rf = self.risk_free_rate;
        let per_path: Vec<(PathPerformance, DrawdownStats, f64)> = self.parallel.map(paths, |p| {
            (
                PathPerformance::from_returns(&p.period_returns(), p.periods_per_year, rf),
                drawdown_stats(&p.values()),
                p.volatility_forecast(),
            )
        });
        let n = paths.len() as f64;

        let performance = PerformanceSummary {
            mean_total_return: mean_by(&per_path, |x| x.0.total_return),
            mean_annualised_return: mean_by(&per_path, |x| x.0.annualised_return),
            mean_annualised_volatility: mean_by(&per_path, |x| x.0.annualised_volatility),
            mean_sharpe_ratio: mean_defined(per_path.iter().map(|x| x.0.sharpe_ratio)),
            mean_sortino_ratio: mean_defined(per_path.iter().map(|x| x.0.sortino_ratio)),
            mean_volatility_forecast: mean_by(&per_path, |x| x.2),
        };
        let drawdown = DrawdownSummary {
            mean_max_drawdown: mean_by(&per_path, |x| x.1.max_drawdown),
            worst_max_drawdown: per_path.iter().map(|x| x.1.max_drawdown).fold(0.0, f64::max),
            mean_max_duration: mean_by(&per_path, |x| x.1.max_duration as f64),
        };

        let last_states: Vec<_> = paths.iter().filter_map(SimulationPath::final_state).collect();
        let frictions = FrictionSummary {
            mean_costs: last_states.iter().map(|s| s.costs_paid).sum::<f64>() / n,
            mean_fees: last_states.iter().map(|s| s.fees_paid).sum::<f64>() / n,
            mean_taxes: last_states.iter().map(|s| s.taxes_paid).sum::<f64>() / n,
            shortfall_frequency: paths.iter().filter(|p| p.had_liquidity_shortfall()).count()
                as f64
                / n,
            mean_fallbacks: paths.iter().map(|p| p.fallback_count() as f64).sum::<f64>() / n,
        };

        let stress = self.stress_results(&last_states)?;
        let esg_score = self.universe.as_deref().and_then(|u| {
            mean_defined(last_states.iter().map(|s| portfolio_esg_score(s, u)))
        });

        let report = RiskReport {
            client_id: first.client_id.clone(),
            num_paths: paths.len(),
            excluded: Vec::new(),
            initial_value: mean(&initial),
            final_value,
            var,
            drawdown,
            performance,
            frictions,
            stress,
            goals: evaluate_goals(&self.goals, paths),
            esg_score,
            esg_rating: esg_score.map(EsgRating::from_score),
        };
        info!(
            client = %report.client_id,
            paths = report.num_paths,
            mean_final = report.final_value.mean,
            "Risk report computed"
        );
        Ok(report)
    }

    fn stress_results(
        &self,
        states: &[&PortfolioState],
    ) -> Result<Vec<StressResult>, RiskError> {
        if self.stresses.is_empty() {
            return Ok(Vec::new());
        }
        let (Some(universe), Some(factors)) = (self.universe.as_deref(), self.factors.as_ref())
        else {
            return Err(RiskError::InvalidInput(
                "stress scenarios need a return model".into(),
            ));
        };
        let n = states.len().max(1) as f64;
        self.stresses
            .iter()
            .map(|scenario| {
                let shocks = scenario.asset_shocks(factors, universe)?;
                let losses: Vec<(f64, f64)> = states
                    .iter()
                    .map(|s| (stress_loss(s, &shocks), s.total_value()))
                    .collect();
                let fraction = losses
                    .iter()
                    .map(|(l, v)| if *v > 0.0 { l / v } else { 0.0 })
                    .sum::<f64>()
                    / n;
                Ok(StressResult {
                    scenario: scenario.name.clone(),
                    mean_loss: losses.iter().map(|(l, _)| l).sum::<f64>() / n,
                    worst_loss: losses.iter().map(|(l, _)| *l).fold(f64::NEG_INFINITY, f64::max),
                    mean_loss_fraction: fraction,
                })
            })
            .collect()
    }
}

fn mean_by<T>(items: &[T], f: impl Fn(&T) -> f64) -> f64 {
    if items.is_empty() {
        return 0.0;
    }
    items.iter().map(f).sum::<f64>() / items.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use wealth_core::types::{Asset, AssetClass};
    use wealth_simulation::state::InitialPortfolio;

    fn path(scenario: usize, values: &[f64]) -> SimulationPath {
        let universe = Universe::new(vec![Asset::new("EQ", AssetClass::Equity, 0.08, 0.15)]).unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let mut states: Vec<_> = values
            .iter()
            .map(|v| {
                InitialPortfolio::all_cash(*v)
                    .to_state(&universe, date, 5.0)
                    .unwrap()
            })
            .collect();
        for t in 1..states.len() {
            states[t].period = t;
            states[t].period_return = values[t] / values[t - 1] - 1.0;
        }
        SimulationPath {
            client_id: "C1".into(),
            scenario,
            periods_per_year: 12,
            states,
        }
    }

    fn paths() -> Vec<SimulationPath> {
        (0..100)
            .map(|i| {
                let end = 80.0 + 0.4 * i as f64;
                path(i, &[100.0, (100.0 + end) / 2.0, end])
            })
            .collect()
    }

    #[test]
    fn test_var_from_terminal_losses() {
        let report = compute_risk(&paths(), &[0.99, 0.95]).unwrap();
        // losses are 20 − 0.4·i: VaR95 is the 95% quantile of that sample
        let expected = 20.0 - 0.4 * (99.0 * 0.05);
        let var95 = report.var_at(0.95).unwrap();
        assert_relative_eq!(var95.historical_var, expected, epsilon = 1e-9);
        assert!(report.var[1].historical_var >= report.var[0].historical_var);
        assert_eq!(report.var[0].confidence_level, 0.95);
        assert!(var95.cvar >= var95.historical_var);
    }

    #[test]
    fn test_summary_measures() {
        let report = compute_risk(&paths(), &[0.95]).unwrap();
        assert_eq!(report.num_paths, 100);
        assert_eq!(report.initial_value, 100.0);
        assert_relative_eq!(report.final_value.mean, 99.8, epsilon = 1e-9);
        assert!(report.drawdown.worst_max_drawdown <= 0.2 + 1e-12);
        assert!(report.drawdown.mean_max_drawdown > 0.0);
        assert_eq!(report.frictions.shortfall_frequency, 0.0);
        assert!(report.stress.is_empty());
        assert_eq!(report.esg_score, None);
    }

    #[test]
    fn test_empty_and_invalid_inputs() {
        assert_eq!(compute_risk(&[], &[0.95]), Err(RiskError::EmptySample));
        assert!(matches!(
            compute_risk(&paths(), &[0.0]),
            Err(RiskError::InvalidConfidenceLevel(_))
        ));
    }

    #[test]
    fn test_stress_without_model_rejected() {
        let err = RiskAnalyser::new(vec![0.95])
            .with_preset_stresses()
            .analyse_paths(&paths())
            .unwrap_err();
        assert!(matches!(err, RiskError::InvalidInput(_)));
    }
}
