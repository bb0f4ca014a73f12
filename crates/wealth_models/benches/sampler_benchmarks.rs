//! Criterion benchmarks for wealth_models return generation.
//!
//! Benchmarks cover:
//! - RNG performance
//! - Single-period draws (Gaussian and Student-t)
//! - Cross-sectional sampling with regime switching

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use wealth_core::math::Matrix;
use wealth_core::types::{Asset, AssetClass, Universe};
use wealth_models::factor::{FactorModel, PsdPolicy};
use wealth_models::regime::RegimeSwitching;
use wealth_models::rng::SimRng;
use wealth_models::sampler::{ReturnModel, TailModel};

fn build_model(n_assets: usize, regimes: RegimeSwitching) -> ReturnModel {
    let assets = (0..n_assets)
        .map(|i| {
            let class = if i % 2 == 0 {
                AssetClass::Equity
            } else {
                AssetClass::FixedIncome
            };
            let exposures = vec![
                if i % 2 == 0 { 1.0 } else { 0.1 },
                if i % 2 == 0 { 0.0 } else { 1.0 },
                0.05 * (i % 5) as f64,
            ];
            Asset::new(format!("A{i}"), class, 0.05, 0.18).with_exposures(exposures)
        })
        .collect();
    let universe = Arc::new(Universe::new(assets).unwrap());
    let factor_cov = Matrix::from_rows(vec![
        vec![0.0225, 0.00075, 0.001],
        vec![0.00075, 0.0025, 0.0],
        vec![0.001, 0.0, 0.01],
    ])
    .unwrap();
    let factors = FactorModel::from_universe(
        &universe,
        vec!["equity".into(), "rates".into(), "credit".into()],
        factor_cov,
        PsdPolicy::Reject,
    )
    .unwrap();
    ReturnModel::new(universe, factors, regimes, 12).unwrap()
}

/// Benchmark RNG generation.
fn bench_rng(c: &mut Criterion) {
    let mut group = c.benchmark_group("rng_generation");
    for n_samples in [1_000, 10_000] {
        group.bench_with_input(
            BenchmarkId::new("normal_batch", n_samples),
            &n_samples,
            |b, &n| {
                let mut rng = SimRng::from_seed(42);
                let mut buffer = vec![0.0; n];
                b.iter(|| {
                    rng.fill_normal(&mut buffer);
                    black_box(buffer.iter().sum::<f64>())
                });
            },
        );
    }
    group.finish();
}

/// Benchmark one period draw for varying universe sizes.
fn bench_draw_period(c: &mut Criterion) {
    let mut group = c.benchmark_group("draw_period");
    for n_assets in [10, 50, 200] {
        let gaussian = build_model(n_assets, RegimeSwitching::default_three_state());
        let student = gaussian
            .clone()
            .with_tail_model(TailModel::StudentT {
                degrees_of_freedom: 5.0,
            })
            .unwrap();

        group.bench_with_input(BenchmarkId::new("gaussian", n_assets), &gaussian, |b, m| {
            let mut rng = SimRng::from_seed(7);
            let state = m.initial_state();
            b.iter(|| black_box(m.draw_period(&state, 1, &mut rng)));
        });
        group.bench_with_input(BenchmarkId::new("student_t", n_assets), &student, |b, m| {
            let mut rng = SimRng::from_seed(7);
            let state = m.initial_state();
            b.iter(|| black_box(m.draw_period(&state, 1, &mut rng)));
        });
    }
    group.finish();
}

/// Benchmark cross-sectional sampling.
fn bench_sample_returns(c: &mut Criterion) {
    let mut group = c.benchmark_group("sample_returns");
    group.sample_size(20);
    let model = build_model(20, RegimeSwitching::default_three_state());
    for n_scenarios in [1_000, 10_000] {
        group.bench_with_input(
            BenchmarkId::new("period_12", n_scenarios),
            &n_scenarios,
            |b, &n| b.iter(|| black_box(model.sample_returns(12, n, 42).unwrap())),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_rng, bench_draw_period, bench_sample_returns);
criterion_main!(benches);
