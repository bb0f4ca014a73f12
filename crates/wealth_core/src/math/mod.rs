//! Numerical building blocks.
//!
//! - [`matrix`]: dense row-major matrices convertible to `nalgebra::DMatrix`
//! - [`decomposition`]: Cholesky, symmetric eigen-decomposition, LU solves,
//!   nearest positive semi-definite projection on `nalgebra`
//! - [`statistics`]: sample moments, quantiles and the standard normal distribution

pub mod decomposition;
pub mod matrix;
pub mod statistics;

pub use decomposition::{
    cholesky, covariance_factor, eigenvalues, inverse, is_positive_semidefinite, min_eigenvalue,
    nearest_positive_semidefinite, solve,
};
pub use matrix::Matrix;
