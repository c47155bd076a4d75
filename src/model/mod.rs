//! Regression models
//!
//! Ridge (L2-regularized) linear regression with closed-form, iterative and
//! gradient descent solvers.

pub mod ridge;

pub use ridge::{FitOptions, RidgeParams, RidgeRegression, Solver};
