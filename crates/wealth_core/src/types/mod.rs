//! Domain types shared by every layer of the engine.
//!
//! - [`ids`]: newtype identifiers
//! - [`asset`]: asset classes, liquidity terms and the asset universe
//! - [`client`]: client profiles, behavioural biases and goals
//! - [`error`]: structured error types

pub mod asset;
pub mod client;
pub mod error;
pub mod ids;

pub use asset::{Asset, AssetClass, JCurve, LiquidityClass, PrivateMarketTerms, Universe};
pub use client::{initial_allocation, BiasProfile, ClientProfile, Goal, WealthSegment};
pub use error::{DataError, LinalgError};
pub use ids::{AssetId, ClientId, GoalId};
