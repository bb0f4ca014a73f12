//! Demo command: a self-contained batch over a built-in market.
//!
//! Three clients from different segments run through the full pipeline:
//! regime-switching returns, segment-driven strategy selection, biased
//! interventions, costs, fees, tax, forced liquidation and risk analysis.
//!
//! # Expected Log Output
//!
//! ```text
//! [Demo] Market: 5 assets, 2 factors, bull/bear/crisis regimes
//! [Demo] Clients: UHNW (PE sleeve), HNW (biased), Mass Affluent (ESG tilt)
//! ```

use std::sync::Arc;
use wealth_core::math::Matrix;
use wealth_core::types::{
    Asset, AssetClass, BiasProfile, ClientProfile, Goal, JCurve, LiquidityClass,
    PrivateMarketTerms, Universe,
};
use wealth_models::factor::{FactorModel, PsdPolicy};
use wealth_models::regime::RegimeSwitching;
use wealth_models::sampler::ReturnModel;
use wealth_simulation::state::InitialPortfolio;

use crate::commands::run::{print_table, simulate_and_analyse};
use crate::config::CliConfig;
use crate::Result;

/// Scenario cap keeping the demo interactive.
const DEMO_MAX_SCENARIOS: usize = 500;

/// Builds the demo market model.
pub fn demo_model(periods_per_year: usize) -> Result<Arc<ReturnModel>> {
    let universe = Arc::new(Universe::new(vec![
        Asset::new("GLOBAL_EQ", AssetClass::Equity, 0.08, 0.16)
            .with_exposures(vec![1.0, 0.0])
            .with_esg_score(52.0),
        Asset::new("GOVT_BOND", AssetClass::FixedIncome, 0.03, 0.05)
            .with_exposures(vec![0.0, 1.0])
            .with_esg_score(65.0),
        Asset::new("MONEY_MKT", AssetClass::Cash, 0.02, 0.005).with_exposures(vec![0.0, 0.1]),
        Asset::new("BUYOUT_PE", AssetClass::Alternative, 0.11, 0.22)
            .with_exposures(vec![1.1, 0.0])
            .with_liquidity(LiquidityClass::QuarterlyGated)
            .with_private_market(
                PrivateMarketTerms::smoothed(0.6).with_j_curve(JCurve::private_equity(), -24),
            ),
        Asset::new("CLIMATE_EQ", AssetClass::Esg, 0.075, 0.17)
            .with_exposures(vec![0.95, 0.05])
            .with_esg_score(86.0),
    ])?);
    let factors = FactorModel::from_universe(
        &universe,
        vec!["equity".into(), "rates".into()],
        Matrix::from_rows(vec![vec![0.0225, 0.0009], vec![0.0009, 0.0025]])?,
        PsdPolicy::Reject,
    )?;
    Ok(Arc::new(ReturnModel::new(
        universe,
        factors,
        RegimeSwitching::default_three_state(),
        periods_per_year,
    )?))
}

/// Demo clients with their starting portfolios.
pub fn demo_clients() -> Vec<(ClientProfile, InitialPortfolio)> {
    let uhnw = ClientProfile::new("UHNW-01", 40_000_000.0, 7.0)
        .with_goal(Goal::new("legacy", 45_000_000.0, 120));
    let uhnw_portfolio = InitialPortfolio::from_weights(
        40_000_000.0,
        [
            ("GLOBAL_EQ", 0.45),
            ("GOVT_BOND", 0.25),
            ("MONEY_MKT", 0.05),
            ("BUYOUT_PE", 0.25),
        ],
    )
    .with_cost_basis("GLOBAL_EQ", 12_000_000.0);

    let hnw = ClientProfile::new("HNW-01", 2_500_000.0, 5.0)
        .with_biases(BiasProfile {
            loss_aversion_strength: 0.7,
            herding_strength: 0.3,
            anchoring_weight: 0.4,
            recency_strength: 0.5,
            adaptation_rate: 0.05,
            ..BiasProfile::neutral()
        })
        .with_goal(Goal::new("retirement", 3_000_000.0, 120));
    let hnw_portfolio = InitialPortfolio::from_weights(
        2_500_000.0,
        [("GLOBAL_EQ", 0.6), ("GOVT_BOND", 0.35), ("MONEY_MKT", 0.05)],
    );

    let affluent = ClientProfile::new("MA-01", 250_000.0, 4.0)
        .with_biases(BiasProfile {
            herding_strength: 0.5,
            recency_strength: 0.3,
            ..BiasProfile::neutral()
        })
        .with_goal(Goal::new("house", 300_000.0, 60));
    let affluent_portfolio = InitialPortfolio::from_weights(
        250_000.0,
        [("CLIMATE_EQ", 0.4), ("GOVT_BOND", 0.5), ("MONEY_MKT", 0.1)],
    );

    vec![
        (uhnw, uhnw_portfolio),
        (hnw, hnw_portfolio),
        (affluent, affluent_portfolio),
    ]
}

/// Runs the demo batch.
pub fn run(config: &CliConfig) -> Result<()> {
    println!("========================================");
    println!("Wealth Engine Demo");
    println!("========================================");
    println!();

    let mut config = config.clone();
    config.simulation.num_scenarios = config.simulation.num_scenarios.min(DEMO_MAX_SCENARIOS);
    config.simulation.num_periods = config.simulation.num_periods.max(120);

    println!("[Demo] Market: 5 assets, 2 factors, bull/bear/crisis regimes");
    println!("[Demo] Clients: UHNW (PE sleeve), HNW (biased), Mass Affluent (ESG tilt)");
    println!(
        "[Demo] Running {} scenarios x {} periods per client (seed {})...",
        config.simulation.num_scenarios,
        config.simulation.num_periods,
        config.simulation.random_seed
    );

    let model = demo_model(config.simulation.periods_per_year)?;
    let reports = simulate_and_analyse(&config, model, &demo_clients())?;
    print_table(&reports);

    println!();
    println!("========================================");
    println!("Demo complete");
    println!("========================================");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_inputs_are_consistent() {
        let model = demo_model(12).unwrap();
        let universe = model.universe();
        for (client, portfolio) in demo_clients() {
            assert!(client.validate().is_ok());
            let state = portfolio
                .to_state(universe, CliConfig::default().simulation.start_date, client.risk_tolerance)
                .unwrap();
            assert!((state.total_value() - client.wealth).abs() < 1e-6);
        }
    }

    #[test]
    fn test_demo_runs_small_batch() {
        let mut config = CliConfig::default();
        config.simulation.num_scenarios = 8;
        config.simulation.num_periods = 24;
        let reports = simulate_and_analyse(&config, demo_model(12).unwrap(), &demo_clients()).unwrap();
        assert_eq!(reports.len(), 3);
        assert!(reports.iter().all(|r| r.num_paths + r.excluded_count() == 8));
        assert!(reports[2].esg_score.is_some());
    }
}
