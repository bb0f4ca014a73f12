//! # wealth_optimiser
//!
//! Constrained portfolio construction for the wealth engine.
//!
//! This crate sits between Models (L2) and Simulation (L3): at each
//! rebalance point the path simulator hands it expected returns, a
//! covariance and the client's constraints, and receives target weights.
//!
//! ## Architecture Position
//!
//! Layer 2.5. Depends on `wealth_core` (L1) only.
//!
//! ## Modules
//!
//! - `constraints`: constraint set, candidate assets and projection onto the feasible region
//! - `strategy`: mean-variance, Black-Litterman, risk parity, minimum variance, maximum Sharpe
//! - `solver`: projected gradient ascent shared by the quadratic strategies
//! - `problem`: problem and result types and the [`optimise`] entry point
//!
//! ## Guarantees
//!
//! Every successful result satisfies the budget, bounds, class bands,
//! liquidity floor and turnover cap within 1e-6. When no portfolio does,
//! [`optimise`] returns [`OptimisationError::Infeasible`] and the caller
//! holds its current weights via [`OptimisationResult::fallback`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod constraints;
pub mod problem;
pub mod solver;
pub mod strategy;

mod error;

pub use error::OptimisationError;
pub use problem::{optimise, Diagnostic, OptimisationProblem, OptimisationResult};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::constraints::{CandidateAsset, ClassBand, Constraint, ConstraintSet};
    pub use crate::problem::{optimise, Diagnostic, OptimisationProblem, OptimisationResult};
    pub use crate::strategy::{
        BlackLitterman, MaximumSharpe, MeanVariance, OptimisationStrategy, RiskParity,
        StrategyKind, StrategySelector, View,
    };
    pub use crate::OptimisationError;
}
