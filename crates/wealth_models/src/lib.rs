//! # wealth_models (L2: Models)
//!
//! Forward-looking return generation and client behaviour.
//!
//! This crate provides:
//! - A factor covariance model with positive semi-definiteness checks and
//!   explicit, logged regularisation (`factor`)
//! - A hidden-regime Markov chain that shifts drift, volatility and
//!   correlation (`regime`)
//! - Appraisal smoothing and vintage J-curves for private-market assets
//!   (`alternatives`)
//! - A per-scenario return sampler with explicit scenario state (`sampler`)
//! - Deterministic behavioural bias policies and the injector that applies
//!   them in a fixed order (`behaviour`)
//! - A seeded random number generator with per-scenario seed derivation (`rng`)
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │           wealth_models (L2)            │
//! ├─────────────────────────────────────────┤
//! │  factor/       - FactorModel, PSD check │
//! │  regime/       - RegimeSwitching        │
//! │  alternatives/ - smoothing, J-curve     │
//! │  sampler/      - ReturnModel            │
//! │  behaviour/    - BiasInjector, policies │
//! │  rng/          - SimRng, derive_seed    │
//! └─────────────────────────────────────────┘
//!          ↓
//! ┌─────────────────────────────────────────┐
//! │            wealth_core (L1)             │
//! │  Matrix, Universe, ClientProfile        │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use wealth_core::math::Matrix;
//! use wealth_core::types::{Asset, AssetClass, Universe};
//! use wealth_models::factor::{FactorModel, PsdPolicy};
//! use wealth_models::regime::RegimeSwitching;
//! use wealth_models::sampler::ReturnModel;
//!
//! let universe = Arc::new(
//!     Universe::new(vec![
//!         Asset::new("EQ", AssetClass::Equity, 0.08, 0.15).with_exposures(vec![1.0, 0.0]),
//!         Asset::new("BOND", AssetClass::FixedIncome, 0.03, 0.05).with_exposures(vec![0.0, 1.0]),
//!     ])
//!     .unwrap(),
//! );
//! let factor_cov = Matrix::from_rows(vec![vec![0.0225, 0.00075], vec![0.00075, 0.0025]]).unwrap();
//! let factors = FactorModel::from_universe(
//!     &universe,
//!     vec!["equity".into(), "rates".into()],
//!     factor_cov,
//!     PsdPolicy::Reject,
//! )
//! .unwrap();
//!
//! let model = ReturnModel::new(universe, factors, RegimeSwitching::calm(), 12).unwrap();
//! let draws = model.sample_returns(1, 500, 42).unwrap();
//! assert_eq!(draws.len(), 2);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod alternatives;
pub mod behaviour;
pub mod error;
pub mod factor;
pub mod regime;
pub mod rng;
pub mod sampler;

pub use error::ModelError;
