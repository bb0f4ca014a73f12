//! # wealth_risk (L4: Risk Analytics)
//!
//! Risk measures over simulated wealth paths.
//!
//! This crate provides:
//! - Historical, Normal and Cornish-Fisher VaR with CVaR (`var`)
//! - Running and batch drawdown measures (`drawdown`)
//! - Annualised return, volatility, Sharpe and Sortino ratios (`performance`)
//! - Factor stress scenarios on ending holdings (`stress`)
//! - Goal attainment probabilities (`goals`)
//! - Portfolio ESG scores and ratings (`esg`)
//! - The per-client risk report (`report`)
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │            wealth_risk (L4)                 │
//! ├─────────────────────────────────────────────┤
//! │  report/      - RiskAnalyser, RiskReport    │
//! │  var/ drawdown/ performance/                │
//! │  stress/ goals/ esg/                        │
//! │  parallel/    - per-path map                │
//! └─────────────────────────────────────────────┘
//!                       ↓
//! ┌─────────────────────────────────────────────┐
//! │         wealth_simulation (L3)              │
//! │   SimulationOutcome, SimulationPath         │
//! └─────────────────────────────────────────────┘
//!                       ↓
//! ┌──────────────────────┐ ┌──────────────────────┐
//! │ wealth_models (L2)   │ │ wealth_core (L1)     │
//! │ FactorModel          │ │ Universe, statistics │
//! └──────────────────────┘ └──────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! use wealth_risk::prelude::*;
//! # fn run(outcome: &wealth_simulation::path::SimulationOutcome) -> Result<(), RiskError> {
//!
//! let report = compute_risk(&outcome.paths, &[0.95, 0.99])?;
//! for v in &report.var {
//!     println!("VaR{:.0}: {:.0}", v.confidence_level * 100.0, v.historical_var);
//! }
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod drawdown;
pub mod error;
pub mod esg;
pub mod goals;
pub mod parallel;
pub mod performance;
pub mod report;
pub mod stress;
pub mod var;

pub use error::RiskError;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::drawdown::{drawdown_stats, DrawdownStats, DrawdownTracker};
    pub use crate::esg::{portfolio_esg_score, EsgRating};
    pub use crate::goals::{evaluate_goals, GoalAttainment};
    pub use crate::parallel::ParallelConfig;
    pub use crate::performance::PathPerformance;
    pub use crate::report::{compute_risk, RiskAnalyser, RiskReport};
    pub use crate::stress::{StressPreset, StressResult, StressScenario};
    pub use crate::var::{ParametricMethod, VarEstimate};
    pub use crate::RiskError;
}
