//! # wealth_core: Foundation Layer for the Wealth Engine
//!
//! ## Layer 1 (Foundation) Role
//!
//! wealth_core is the bottom layer of the engine and provides:
//! - Strongly-typed identifiers: `AssetId`, `ClientId`, `GoalId` (`types::ids`)
//! - Asset universe description: `Asset`, `AssetClass`, `LiquidityClass`, `Universe` (`types`)
//! - Client description: `ClientProfile`, `BiasProfile`, `Goal`, `WealthSegment` (`types::client`)
//! - Dense linear algebra: `Matrix`, Cholesky, symmetric eigen-decomposition,
//!   nearest positive semi-definite projection (`math`)
//! - Sample statistics and the standard normal distribution (`math::statistics`)
//! - Error types: `LinalgError`, `DataError` (`types::error`)
//!
//! ## Zero Dependency Principle
//!
//! Layer 1 has no dependencies on other wealth_* crates, with minimal external dependencies:
//! - nalgebra: Dense factorisations behind [`math::decomposition`]
//! - num-traits: Traits for generic numerical computation
//! - thiserror: Error derivation
//! - serde: Serialisation of every public record
//!
//! ## Usage Examples
//!
//! ```rust
//! use wealth_core::math::{cholesky, Matrix};
//! use wealth_core::math::statistics::quantile;
//!
//! let cov = Matrix::from_rows(vec![vec![0.04, 0.006], vec![0.006, 0.0025]]).unwrap();
//! let lower = cholesky(&cov).unwrap();
//! assert!((lower[(0, 0)] - 0.2).abs() < 1e-12);
//!
//! let q = quantile(&[1.0_f64, 2.0, 3.0, 4.0], 0.5);
//! assert!((q - 2.5).abs() < 1e-12);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod math;
pub mod types;
