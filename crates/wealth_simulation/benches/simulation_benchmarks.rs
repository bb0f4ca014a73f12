//! Criterion benchmarks for the path simulator.
//!
//! Benchmarks cover:
//! - Frictionless calendar-rebalanced paths
//! - Full paths with costs, fees, tax and biases
//! - Scaling with scenario count

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use wealth_core::math::Matrix;
use wealth_core::types::{Asset, AssetClass, BiasProfile, ClientProfile, Universe};
use wealth_models::factor::{FactorModel, PsdPolicy};
use wealth_models::regime::RegimeSwitching;
use wealth_models::sampler::ReturnModel;
use wealth_simulation::config::SimulationConfig;
use wealth_simulation::engine::PathSimulator;
use wealth_simulation::state::InitialPortfolio;

fn build_model(n_assets: usize) -> Arc<ReturnModel> {
    let assets = (0..n_assets)
        .map(|i| {
            let (class, exposures) = if i % 2 == 0 {
                (AssetClass::Equity, vec![1.0, 0.0])
            } else {
                (AssetClass::FixedIncome, vec![0.1, 1.0])
            };
            Asset::new(format!("A{i}"), class, 0.03 + 0.01 * (i % 5) as f64, 0.12)
                .with_exposures(exposures)
        })
        .collect();
    let universe = Arc::new(Universe::new(assets).unwrap());
    let factors = FactorModel::from_universe(
        &universe,
        vec!["equity".into(), "rates".into()],
        Matrix::from_rows(vec![vec![0.0225, 0.00075], vec![0.00075, 0.0025]]).unwrap(),
        PsdPolicy::Reject,
    )
    .unwrap();
    Arc::new(
        ReturnModel::new(universe, factors, RegimeSwitching::default_three_state(), 12).unwrap(),
    )
}

fn equal_weight(n_assets: usize) -> InitialPortfolio {
    let w = 1.0 / n_assets as f64;
    InitialPortfolio::from_weights(1_000_000.0, (0..n_assets).map(|i| (format!("A{i}"), w)))
}

fn bench_paths(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulate_paths");
    group.sample_size(10);

    let client = ClientProfile::new("C1", 1_000_000.0, 6.0).with_biases(BiasProfile {
        loss_aversion_strength: 0.5,
        herding_strength: 0.2,
        recency_strength: 0.3,
        ..BiasProfile::neutral()
    });

    for n_assets in [4, 10] {
        let model = build_model(n_assets);
        let initial = equal_weight(n_assets);

        let frictionless = PathSimulator::new(
            SimulationConfig::builder().frictionless().build().unwrap(),
            model.clone(),
        )
        .unwrap();
        group.bench_with_input(
            BenchmarkId::new("frictionless", n_assets),
            &n_assets,
            |b, _| b.iter(|| frictionless.simulate(black_box(&client), &initial, 12, 100)),
        );

        let full = PathSimulator::new(SimulationConfig::default(), model).unwrap();
        group.bench_with_input(BenchmarkId::new("full", n_assets), &n_assets, |b, _| {
            b.iter(|| full.simulate(black_box(&client), &initial, 12, 100))
        });
    }

    group.finish();
}

fn bench_scenario_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenario_scaling");
    group.sample_size(10);

    let model = build_model(6);
    let initial = equal_weight(6);
    let client = ClientProfile::new("C1", 1_000_000.0, 5.0);
    let sim = PathSimulator::new(SimulationConfig::default(), model).unwrap();

    for scenarios in [100, 1_000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(scenarios),
            &scenarios,
            |b, &n| b.iter(|| sim.simulate(black_box(&client), &initial, 12, n)),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_paths, bench_scenario_scaling);
criterion_main!(benches);
