//! # wealth_simulation (L3: Simulation)
//!
//! Multi-period Monte Carlo simulation of client portfolios.
//!
//! This crate provides:
//! - Run configuration with builder validation (`config`)
//! - Portfolio snapshots with tax lots and an event log (`state`)
//! - Calendar, drift and bias-driven rebalance triggers (`rebalance`)
//! - Spread, square-root impact and commission costs (`costs`)
//! - Tiered management and high-water-mark performance fees (`fees`)
//! - HIFO lot relief, loss harvesting and carryforward (`tax`)
//! - Forced liquidation in liquidity order (`liquidity`)
//! - The parallel path simulator (`engine`)
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │          wealth_simulation (L3)             │
//! ├─────────────────────────────────────────────┤
//! │  engine/    - PathSimulator, cancellation   │
//! │  config/    - SimulationConfig              │
//! │  state/     - PortfolioState, StateEvent    │
//! │  rebalance/ - RebalancePolicy               │
//! │  costs/ fees/ tax/ liquidity/               │
//! └─────────────────────────────────────────────┘
//!          ↓                       ↓
//! ┌──────────────────────┐ ┌──────────────────────┐
//! │ wealth_models (L2)   │ │ wealth_optimiser     │
//! │ ReturnModel, biases  │ │ strategies, region   │
//! └──────────────────────┘ └──────────────────────┘
//!          ↓                       ↓
//! ┌─────────────────────────────────────────────┐
//! │             wealth_core (L1)                │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism
//!
//! Every scenario derives its seed from the run seed, the client's batch
//! position and the scenario index. Reruns with the same inputs produce
//! bit-identical paths regardless of the rayon thread count.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod config;
pub mod costs;
pub mod engine;
pub mod error;
pub mod fees;
pub mod liquidity;
pub mod path;
pub mod rebalance;
pub mod state;
pub mod tax;

pub use error::{ConfigurationError, ScenarioError, ScenarioFailure, SimulationError};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{SimulationConfig, SimulationConfigBuilder};
    pub use crate::costs::{CostModel, TradeCost};
    pub use crate::engine::{CancellationToken, PathSimulator};
    pub use crate::fees::FeeSchedule;
    pub use crate::liquidity::LiquidityPolicy;
    pub use crate::path::{SimulationOutcome, SimulationPath};
    pub use crate::rebalance::RebalancePolicy;
    pub use crate::state::{InitialPortfolio, PortfolioState, StateEvent};
    pub use crate::tax::TaxPolicy;
    pub use crate::{ConfigurationError, SimulationError};
}
