//! Integration tests for the path simulator.
//!
//! Drives full paths through return model → optimiser → bias injector →
//! trading, fees, tax and liquidity.

use approx::assert_relative_eq;
use std::sync::Arc;
use wealth_core::math::Matrix;
use wealth_core::types::{Asset, AssetClass, BiasProfile, ClientProfile, LiquidityClass, Universe};
use wealth_models::behaviour::BiasToggles;
use wealth_models::factor::{FactorModel, PsdPolicy};
use wealth_models::regime::RegimeSwitching;
use wealth_models::sampler::ReturnModel;
use wealth_simulation::prelude::*;
use wealth_simulation::state::FeeKind;

fn model(assets: Vec<Asset>, regimes: RegimeSwitching) -> Arc<ReturnModel> {
    let universe = Arc::new(Universe::new(assets).unwrap());
    let factors = FactorModel::from_universe(
        &universe,
        vec!["equity".into(), "rates".into()],
        Matrix::from_rows(vec![vec![0.0225, 0.00075], vec![0.00075, 0.0025]]).unwrap(),
        PsdPolicy::Reject,
    )
    .unwrap();
    Arc::new(ReturnModel::new(universe, factors, regimes, 12).unwrap())
}

fn balanced_model() -> Arc<ReturnModel> {
    model(
        vec![
            Asset::new("EQ", AssetClass::Equity, 0.08, 0.15).with_exposures(vec![1.0, 0.0]),
            Asset::new("BOND", AssetClass::FixedIncome, 0.03, 0.05).with_exposures(vec![0.0, 1.0]),
            Asset::new("CASH", AssetClass::Cash, 0.02, 0.0).with_exposures(vec![0.0, 0.0]),
        ],
        RegimeSwitching::default_three_state(),
    )
}

fn biased_client() -> ClientProfile {
    ClientProfile::new("C1", 1_000_000.0, 6.0).with_biases(BiasProfile {
        loss_aversion_strength: 0.6,
        herding_strength: 0.3,
        anchoring_weight: 0.4,
        recency_strength: 0.5,
        adaptation_rate: 0.05,
        ..BiasProfile::neutral()
    })
}

fn balanced_portfolio() -> InitialPortfolio {
    InitialPortfolio::from_weights(1_000_000.0, [("EQ", 0.6), ("BOND", 0.35), ("CASH", 0.05)])
}

// =============================================================================
// Determinism
// =============================================================================

#[test]
fn test_reruns_are_bit_identical() {
    let config = SimulationConfig::builder()
        .num_scenarios(24)
        .num_periods(24)
        .random_seed(7)
        .build()
        .unwrap();
    let sim = PathSimulator::new(config, balanced_model()).unwrap();
    let a = sim.run(0, &biased_client(), &balanced_portfolio()).unwrap();
    let b = sim.run(0, &biased_client(), &balanced_portfolio()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_results_independent_of_thread_count() {
    let config = SimulationConfig::builder()
        .num_scenarios(16)
        .num_periods(12)
        .build()
        .unwrap();
    let sim = PathSimulator::new(config, balanced_model()).unwrap();
    let parallel = sim.run(0, &biased_client(), &balanced_portfolio()).unwrap();
    let single = rayon::ThreadPoolBuilder::new()
        .num_threads(1)
        .build()
        .unwrap()
        .install(|| sim.run(0, &biased_client(), &balanced_portfolio()))
        .unwrap();
    assert_eq!(parallel, single);
}

#[test]
fn test_seed_and_client_index_change_paths() {
    let build = |seed| {
        PathSimulator::new(
            SimulationConfig::builder()
                .num_scenarios(4)
                .random_seed(seed)
                .build()
                .unwrap(),
            balanced_model(),
        )
        .unwrap()
    };
    let client = biased_client();
    let base = build(1).run(0, &client, &balanced_portfolio()).unwrap();
    let reseeded = build(2).run(0, &client, &balanced_portfolio()).unwrap();
    let second_client = build(1).run(1, &client, &balanced_portfolio()).unwrap();
    assert_ne!(base.final_values(), reseeded.final_values());
    assert_ne!(base.final_values(), second_client.final_values());
}

#[test]
fn test_disabled_biases_match_neutral_client() {
    let off = BiasToggles {
        loss_aversion: false,
        herding: false,
        anchoring: false,
        recency: false,
        adaptation: false,
    };
    let config = SimulationConfig::builder().num_scenarios(8).num_periods(12);
    let muted = PathSimulator::new(config.clone().biases(off).build().unwrap(), balanced_model())
        .unwrap();
    let plain = PathSimulator::new(config.build().unwrap(), balanced_model()).unwrap();

    let neutral = ClientProfile::new("C1", 1_000_000.0, 6.0);
    let a = muted.run(0, &biased_client(), &balanced_portfolio()).unwrap();
    let b = plain.run(0, &neutral, &balanced_portfolio()).unwrap();
    assert_eq!(a.final_values(), b.final_values());
}

// =============================================================================
// Path structure
// =============================================================================

#[test]
fn test_path_shape_and_dates() {
    let config = SimulationConfig::builder()
        .num_scenarios(4)
        .num_periods(18)
        .build()
        .unwrap();
    let sim = PathSimulator::new(config, balanced_model()).unwrap();
    let outcome = sim.run(0, &biased_client(), &balanced_portfolio()).unwrap();

    assert_eq!(outcome.requested(), 4);
    assert_relative_eq!(outcome.initial_value, 1_000_000.0);
    for (i, path) in outcome.paths.iter().enumerate() {
        assert_eq!(path.scenario, i);
        assert_eq!(path.states.len(), 19);
        for pair in path.states.windows(2) {
            assert_eq!(pair[1].period, pair[0].period + 1);
            assert!(pair[1].date > pair[0].date);
            assert!(pair[1].total_value().is_finite());
        }
        assert!(path.volatility_forecast() > 0.0);
    }
}

#[test]
fn test_year_end_settles_tax_and_fees() {
    let config = SimulationConfig::builder()
        .num_scenarios(8)
        .num_periods(24)
        .rebalance(RebalancePolicy::Calendar { every_periods: 3 })
        .build()
        .unwrap();
    let sim = PathSimulator::new(config, balanced_model()).unwrap();
    let outcome = sim
        .run(0, &ClientProfile::new("C1", 1_000_000.0, 6.0), &balanced_portfolio())
        .unwrap();

    for path in &outcome.paths {
        let management = path
            .events()
            .filter(|e| {
                matches!(
                    e,
                    StateEvent::FeeCharged {
                        kind: FeeKind::Management,
                        ..
                    }
                )
            })
            .count();
        assert_eq!(management, 24);
        let settlements = path
            .events()
            .filter(|e| matches!(e, StateEvent::TaxSettled { .. }))
            .count();
        assert!(settlements <= 2);
        for event in path.events() {
            if let StateEvent::TaxSettled {
                realised,
                tax,
                carryforward,
            } = event
            {
                assert!(*carryforward <= 0.0);
                if realised.total() < 0.0 {
                    // a net realised loss is absorbed into the carryforward
                    assert_eq!(*tax, 0.0);
                    assert!(*carryforward <= realised.total() + 1e-9);
                }
            }
        }
        let last = path.final_state().unwrap();
        assert!(last.costs_paid > 0.0);
        assert!(last.taxes_paid >= 0.0);
        assert!(last.loss_carryforward <= 0.0);
    }
}

#[test]
fn test_batch_seeds_by_position() {
    let config = SimulationConfig::builder()
        .num_clients(2)
        .num_scenarios(4)
        .num_periods(6)
        .build()
        .unwrap();
    let sim = PathSimulator::new(config, balanced_model()).unwrap();
    let clients = vec![
        (biased_client(), balanced_portfolio()),
        (ClientProfile::new("C2", 500_000.0, 3.0), InitialPortfolio::all_cash(500_000.0)),
        (ClientProfile::new("C3", 500_000.0, 3.0), InitialPortfolio::all_cash(500_000.0)),
    ];
    let outcomes = sim.simulate_batch(&clients).unwrap();
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[1].client_index, 1);
    assert_eq!(outcomes[1], sim.run(1, &clients[1].0, &clients[1].1).unwrap());
}

#[test]
fn test_uncapped_batch_runs_every_client() {
    let config = SimulationConfig::builder()
        .num_scenarios(2)
        .num_periods(3)
        .build()
        .unwrap();
    assert_eq!(config.num_clients, None);
    let sim = PathSimulator::new(config, balanced_model()).unwrap();
    let clients: Vec<_> = (0..3)
        .map(|i| {
            (
                ClientProfile::new(format!("C{i}"), 500_000.0, 4.0),
                InitialPortfolio::from_weights(500_000.0, [("EQ", 0.5), ("BOND", 0.5)]),
            )
        })
        .collect();
    let outcomes = sim.simulate_batch(&clients).unwrap();
    assert_eq!(outcomes.len(), 3);
    for (i, outcome) in outcomes.iter().enumerate() {
        assert_eq!(outcome.client_index, i);
        assert_eq!(outcome.client_id.to_string(), format!("C{i}"));
    }
}

#[test]
fn test_invalid_inputs_rejected() {
    let sim = PathSimulator::new(SimulationConfig::default(), balanced_model()).unwrap();
    let client = biased_client();
    assert!(matches!(
        sim.simulate(&client, &balanced_portfolio(), 0, 10),
        Err(SimulationError::Configuration(_))
    ));
    assert!(matches!(
        sim.simulate(&client, &InitialPortfolio::all_cash(0.0), 12, 10),
        Err(SimulationError::InvalidInput(_))
    ));
    let unknown = InitialPortfolio::from_weights(1_000.0, [("NOPE", 1.0)]);
    assert!(matches!(
        sim.simulate(&client, &unknown, 12, 10),
        Err(SimulationError::Data(_))
    ));
}

// =============================================================================
// Liquidity
// =============================================================================

#[test]
fn test_gated_only_portfolio_flags_shortfall_without_failing() {
    let m = model(
        vec![Asset::new("PE", AssetClass::Alternative, 0.10, 0.20)
            .with_exposures(vec![1.0, 0.0])
            .with_liquidity(LiquidityClass::QuarterlyGated)],
        RegimeSwitching::calm(),
    );
    let config = SimulationConfig::builder()
        .num_scenarios(16)
        .num_periods(12)
        .build()
        .unwrap();
    let sim = PathSimulator::new(config, m).unwrap();
    let client = ClientProfile::new("C1", 1_000_000.0, 5.0);
    let initial = InitialPortfolio::from_weights(1_000_000.0, [("PE", 1.0)]);

    let outcome = sim.run(0, &client, &initial).unwrap();
    assert!(outcome.failures.is_empty());
    assert_eq!(outcome.paths.len(), 16);
    assert_relative_eq!(outcome.shortfall_frequency(), 1.0);
    for path in &outcome.paths {
        assert!(path
            .events()
            .any(|e| matches!(e, StateEvent::ForcedSale { haircut, .. } if *haircut > 0.0)));
        assert!(path.states.iter().all(|s| s.cash >= 0.0));
    }
}

#[test]
fn test_daily_liquid_portfolio_funds_fees_without_shortfall() {
    let m = model(
        vec![
            Asset::new("EQ", AssetClass::Equity, 0.08, 0.15).with_exposures(vec![1.0, 0.0]),
            Asset::new("BOND", AssetClass::FixedIncome, 0.03, 0.05).with_exposures(vec![0.0, 1.0]),
        ],
        RegimeSwitching::default_three_state(),
    );
    let client = ClientProfile::new("C1", 1_000_000.0, 5.0);
    let initial = InitialPortfolio::from_weights(1_000_000.0, [("EQ", 0.6), ("BOND", 0.4)]);
    for policy in [
        RebalancePolicy::DriftTriggered { threshold: 0.05 },
        RebalancePolicy::Calendar { every_periods: 1 },
    ] {
        let rebalances_rarely = matches!(policy, RebalancePolicy::DriftTriggered { .. });
        let config = SimulationConfig::builder()
            .rebalance(policy)
            .num_scenarios(32)
            .num_periods(24)
            .build()
            .unwrap();
        let sim = PathSimulator::new(config, Arc::clone(&m)).unwrap();
        let outcome = sim.run(0, &client, &initial).unwrap();
        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.shortfall_frequency(), 0.0);
        for path in &outcome.paths {
            assert!(!path.events().any(|e| matches!(
                e,
                StateEvent::LiquidityShortfall { .. } | StateEvent::ForcedSale { .. }
            )));
            if rebalances_rarely {
                // fees between rebalances are paid out of routine sales
                assert!(path.events().any(|e| matches!(e, StateEvent::CashRaised { .. })));
            }
            assert!(path.states.iter().all(|s| s.cash >= 0.0));
        }
    }
}

// =============================================================================
// Constraints
// =============================================================================

#[test]
fn test_turnover_capped_rebalances_hold_the_cap() {
    use wealth_optimiser::constraints::ConstraintSet;
    use wealth_optimiser::strategy::StrategyKind;

    let cap = 0.1;
    let config = SimulationConfig::builder()
        .strategy(StrategyKind::mean_variance())
        .constraints(ConstraintSet::default().with_turnover_cap(cap))
        .rebalance(RebalancePolicy::Calendar { every_periods: 1 })
        .num_scenarios(8)
        .num_periods(12)
        .build()
        .unwrap();
    let sim = PathSimulator::new(config, balanced_model()).unwrap();
    let client = ClientProfile::new("C1", 1_000_000.0, 2.0);
    let outcome = sim.run(0, &client, &balanced_portfolio()).unwrap();

    assert!(outcome.failures.is_empty());
    for path in &outcome.paths {
        assert_eq!(path.fallback_count(), 0);
        let mut rebalances = 0;
        for event in path.events() {
            if let StateEvent::Rebalanced { turnover, .. } = event {
                rebalances += 1;
                assert!(*turnover <= cap + 1e-6, "turnover {turnover} above cap");
            }
        }
        assert_eq!(rebalances, 12);
    }
}

#[test]
fn test_infeasible_constraints_fall_back_to_holding() {
    use wealth_optimiser::constraints::{ClassBand, ConstraintSet};

    let m = model(
        vec![
            Asset::new("PE", AssetClass::Alternative, 0.10, 0.20)
                .with_exposures(vec![1.0, 0.0])
                .with_liquidity(LiquidityClass::QuarterlyGated),
            Asset::new("BOND", AssetClass::FixedIncome, 0.03, 0.05).with_exposures(vec![0.0, 1.0]),
        ],
        RegimeSwitching::calm(),
    );
    // PE is pinned near 80% off-window, so an alternatives cap of 20% cannot hold
    let constraints =
        ConstraintSet::default().with_class_band(ClassBand::new(AssetClass::Alternative, 0.0, 0.2));
    let config = SimulationConfig::builder()
        .frictionless()
        .constraints(constraints)
        .num_scenarios(4)
        .num_periods(2)
        .build()
        .unwrap();
    let sim = PathSimulator::new(config, m).unwrap();
    let initial = InitialPortfolio::from_weights(1_000_000.0, [("PE", 0.8), ("BOND", 0.2)]);
    let outcome = sim
        .run(0, &ClientProfile::new("C1", 1_000_000.0, 5.0), &initial)
        .unwrap();
    assert!(outcome.failures.is_empty());
    for path in &outcome.paths {
        assert!(path.fallback_count() >= 1);
    }
}
