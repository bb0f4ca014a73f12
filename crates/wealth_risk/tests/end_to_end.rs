//! End-to-end tests: simulate a client, then analyse the paths.

use approx::assert_relative_eq;
use std::sync::Arc;
use wealth_core::math::Matrix;
use wealth_core::types::{Asset, AssetClass, ClientProfile, Goal, LiquidityClass, Universe};
use wealth_models::factor::{FactorModel, PsdPolicy};
use wealth_models::regime::RegimeSwitching;
use wealth_models::sampler::ReturnModel;
use wealth_optimiser::constraints::{ClassBand, ConstraintSet};
use wealth_optimiser::strategy::StrategyKind;
use wealth_risk::prelude::*;
use wealth_simulation::prelude::*;

const INITIAL: f64 = 1_000_000.0;

fn model(assets: Vec<Asset>) -> Arc<ReturnModel> {
    let universe = Arc::new(Universe::new(assets).unwrap());
    // equity 15%, rates 5%, correlation 0.1
    let factors = FactorModel::from_universe(
        &universe,
        vec!["equity".into(), "rates".into()],
        Matrix::from_rows(vec![vec![0.0225, 0.00075], vec![0.00075, 0.0025]]).unwrap(),
        PsdPolicy::Reject,
    )
    .unwrap();
    Arc::new(ReturnModel::new(universe, factors, RegimeSwitching::calm(), 12).unwrap())
}

fn sixty_forty_model() -> Arc<ReturnModel> {
    model(vec![
        Asset::new("EQ", AssetClass::Equity, 0.08, 0.15)
            .with_exposures(vec![1.0, 0.0])
            .with_esg_score(60.0),
        Asset::new("BOND", AssetClass::FixedIncome, 0.03, 0.05)
            .with_exposures(vec![0.0, 1.0])
            .with_esg_score(80.0),
    ])
}

fn sixty_forty_outcome(model: &Arc<ReturnModel>) -> SimulationOutcome {
    let config = SimulationConfig::builder()
        .frictionless()
        .strategy(StrategyKind::mean_variance())
        .constraints(
            ConstraintSet::default().with_class_band(ClassBand::fixed(AssetClass::Equity, 0.6)),
        )
        .rebalance(RebalancePolicy::Calendar { every_periods: 1 })
        .num_periods(12)
        .num_scenarios(1_000)
        .build()
        .unwrap();
    let sim = PathSimulator::new(config, Arc::clone(model)).unwrap();
    let client = ClientProfile::new("C1", INITIAL, 5.0);
    let initial = InitialPortfolio::from_weights(INITIAL, [("EQ", 0.6), ("BOND", 0.4)]);
    sim.run(0, &client, &initial).unwrap()
}

// =============================================================================
// Balanced portfolio
// =============================================================================

#[test]
fn test_sixty_forty_distribution_and_var() {
    let model = sixty_forty_model();
    let outcome = sixty_forty_outcome(&model);
    assert_eq!(outcome.paths.len(), 1_000);

    let report = compute_risk(&outcome.paths, &[0.95, 0.99]).unwrap();
    assert_eq!(report.num_paths, 1_000);
    assert_relative_eq!(report.initial_value, INITIAL, max_relative = 1e-12);

    // blended 6% a year, monthly compounding, rebalanced each period
    let expected = INITIAL * (1.0 + 0.06 / 12.0_f64).powi(12);
    assert_relative_eq!(report.final_value.mean, expected, max_relative = 0.01);

    let var95 = report.var_at(0.95).unwrap();
    let var99 = report.var_at(0.99).unwrap();
    assert!(var95.historical_var > 0.0);
    assert!(var95.historical_var < 0.5 * INITIAL);
    assert!(var99.historical_var >= var95.historical_var);
    assert!(var95.cvar >= var95.historical_var);

    // portfolio volatility is about 9.4% a year
    let vol = report.performance.mean_annualised_volatility;
    assert!(vol > 0.06 && vol < 0.13, "volatility {vol}");
    assert!(report.performance.mean_sharpe_ratio.is_some());
    assert_eq!(report.frictions.mean_costs, 0.0);
    assert_eq!(report.frictions.shortfall_frequency, 0.0);
    assert_eq!(report.frictions.mean_fallbacks, 0.0);
}

#[test]
fn test_analyser_adds_stress_goals_and_esg() {
    let model = sixty_forty_model();
    let outcome = sixty_forty_outcome(&model);
    let report = RiskAnalyser::new(vec![0.95])
        .with_model(&model)
        .with_preset_stresses()
        .with_goals(vec![
            Goal::new("preserve", INITIAL, 12),
            Goal::new("double", 2.0 * INITIAL, 12),
        ])
        .analyse(&outcome)
        .unwrap();

    assert_eq!(report.stress.len(), StressPreset::ALL.len());
    let crash = &report.stress[0];
    assert_eq!(crash.scenario, StressPreset::EquityCrash.name());
    // 30% off the 60% equity sleeve; the credit shock matches no factor
    assert_relative_eq!(crash.mean_loss_fraction, 0.18, epsilon = 1e-3);
    assert!(crash.worst_loss >= crash.mean_loss);

    let preserve = report.goals.iter().find(|g| g.goal_id.as_str() == "preserve").unwrap();
    assert!(preserve.probability > 0.5 && preserve.probability < 0.95);
    let double = report.goals.iter().find(|g| g.goal_id.as_str() == "double").unwrap();
    assert_eq!(double.probability, 0.0);

    let esg = report.esg_score.unwrap();
    assert_relative_eq!(esg, 68.0, epsilon = 0.1);
    assert_eq!(report.esg_rating, Some(EsgRating::A));
    assert_eq!(report.excluded_count(), 0);
}

// =============================================================================
// Liquidity
// =============================================================================

#[test]
fn test_gated_portfolio_reports_shortfall() {
    let model = model(vec![Asset::new("PE", AssetClass::Alternative, 0.10, 0.20)
        .with_exposures(vec![1.0, 0.0])
        .with_liquidity(LiquidityClass::QuarterlyGated)]);
    let config = SimulationConfig::builder()
        .num_scenarios(32)
        .num_periods(12)
        .build()
        .unwrap();
    let sim = PathSimulator::new(config, Arc::clone(&model)).unwrap();
    let outcome = sim
        .run(
            0,
            &ClientProfile::new("C1", INITIAL, 5.0),
            &InitialPortfolio::from_weights(INITIAL, [("PE", 1.0)]),
        )
        .unwrap();

    let report = RiskAnalyser::new(vec![0.95, 0.99])
        .with_model(&model)
        .with_stresses([StressPreset::LiquidityCrisis.scenario()])
        .analyse(&outcome)
        .unwrap();
    assert_relative_eq!(report.frictions.shortfall_frequency, 1.0);
    assert!(report.frictions.mean_fees > 0.0);
    // gated holdings take the extra markdown on top of the equity shock
    assert!(report.stress[0].mean_loss_fraction > 0.2);
}
