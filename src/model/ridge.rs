//! Ridge regression
//!
//! Minimizes `||y - Xw - b||² + alpha * ||w||²`. The intercept `b` is never
//! penalized. Closed-form and conjugate gradient solvers work on the centred
//! normal equations `(XcᵀXc + alpha·I) w = Xcᵀyc`; the descent solvers train
//! a single `Linear` layer on the equivalent per-sample objective
//! `MSE + (alpha / n) * ||w||²`.

use burn::backend::ndarray::NdArrayDevice;
use burn::backend::{Autodiff, NdArray};
use burn::nn::{Initializer, Linear, LinearConfig};
use burn::optim::{AdamConfig, GradientsParams, Optimizer, SgdConfig};
use burn::tensor::{ElementConversion, Tensor};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{LeagueError, ModelConfig, Result};

/// Backend for the descent solvers
type DescentBackend = Autodiff<NdArray<f32>>;

/// Method used to solve for the coefficients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Solver {
    /// Cholesky factorization of the normal equations
    Cholesky,
    /// Conjugate gradient on the normal equations
    ConjugateGradient,
    /// Full-batch gradient descent
    Sgd,
    /// Full-batch Adam
    Adam,
}

impl fmt::Display for Solver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Solver::Cholesky => "cholesky",
            Solver::ConjugateGradient => "conjugate_gradient",
            Solver::Sgd => "sgd",
            Solver::Adam => "adam",
        };
        write!(f, "{}", name)
    }
}

/// Hyperparameters chosen by grid search
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RidgeParams {
    pub alpha: f64,
    pub solver: Solver,
}

impl fmt::Display for RidgeParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "alpha={} solver={}", self.alpha, self.solver)
    }
}

/// Solver settings that are not searched over
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitOptions {
    pub epochs: usize,
    pub learning_rate: f64,
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for FitOptions {
    fn default() -> Self {
        FitOptions {
            epochs: 500,
            learning_rate: 0.05,
            tolerance: 1e-8,
            max_iterations: 1000,
        }
    }
}

impl From<&ModelConfig> for FitOptions {
    fn from(config: &ModelConfig) -> Self {
        FitOptions {
            epochs: config.epochs,
            learning_rate: config.learning_rate,
            tolerance: config.tolerance,
            max_iterations: config.max_iterations,
        }
    }
}

/// Fitted ridge model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RidgeRegression {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    pub params: RidgeParams,
}

impl RidgeRegression {
    pub fn fit(x: &[Vec<f64>], y: &[f64], params: RidgeParams, options: &FitOptions) -> Result<Self> {
        let width = validate(x, y, params)?;

        let (coefficients, intercept) = match params.solver {
            Solver::Cholesky | Solver::ConjugateGradient => {
                let centred = CentredSystem::build(x, y, width, params.alpha);
                let w = if params.solver == Solver::Cholesky {
                    cholesky_solve(&centred.a, &centred.b)?
                } else {
                    conjugate_gradient(&centred.a, &centred.b, options.tolerance, options.max_iterations)
                };
                let intercept = centred.y_mean - dot(&centred.x_mean, &w);
                (w, intercept)
            }
            Solver::Sgd => {
                let optimizer = SgdConfig::new().init::<DescentBackend, Linear<DescentBackend>>();
                descend(optimizer, x, y, width, params.alpha, options)?
            }
            Solver::Adam => {
                let optimizer = AdamConfig::new().init::<DescentBackend, Linear<DescentBackend>>();
                descend(optimizer, x, y, width, params.alpha, options)?
            }
        };

        log::debug!(
            "Fitted ridge ({}) on {} x {}: intercept={:.4}",
            params,
            x.len(),
            width,
            intercept
        );

        Ok(RidgeRegression {
            coefficients,
            intercept,
            params,
        })
    }

    pub fn predict_one(&self, row: &[f64]) -> Result<f64> {
        if row.len() != self.coefficients.len() {
            return Err(LeagueError::DimensionMismatch {
                expected: self.coefficients.len(),
                found: row.len(),
            });
        }
        Ok(self.intercept + dot(row, &self.coefficients))
    }

    pub fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        x.iter().map(|row| self.predict_one(row)).collect()
    }
}

fn validate(x: &[Vec<f64>], y: &[f64], params: RidgeParams) -> Result<usize> {
    if !(params.alpha >= 0.0 && params.alpha.is_finite()) {
        return Err(LeagueError::InvalidParameter(format!(
            "alpha must be finite and >= 0, got {}",
            params.alpha
        )));
    }
    let width = x
        .first()
        .map(|r| r.len())
        .ok_or_else(|| LeagueError::EmptyDataset("cannot fit ridge on zero rows".to_string()))?;
    if y.len() != x.len() {
        return Err(LeagueError::DimensionMismatch {
            expected: x.len(),
            found: y.len(),
        });
    }
    if let Some(row) = x.iter().find(|r| r.len() != width) {
        return Err(LeagueError::DimensionMismatch {
            expected: width,
            found: row.len(),
        });
    }
    Ok(width)
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(u, v)| u * v).sum()
}

// ==================== Normal equations ====================

/// `(XcᵀXc + alpha·I) w = Xcᵀyc` plus the means needed for the intercept
struct CentredSystem {
    a: Vec<Vec<f64>>,
    b: Vec<f64>,
    x_mean: Vec<f64>,
    y_mean: f64,
}

impl CentredSystem {
    fn build(x: &[Vec<f64>], y: &[f64], width: usize, alpha: f64) -> Self {
        let n = x.len() as f64;
        let mut x_mean = vec![0.0; width];
        for row in x {
            for (m, v) in x_mean.iter_mut().zip(row) {
                *m += v / n;
            }
        }
        let y_mean = y.iter().sum::<f64>() / n;

        let mut a = vec![vec![0.0; width]; width];
        let mut b = vec![0.0; width];
        let mut centred = vec![0.0; width];
        for (row, target) in x.iter().zip(y) {
            for (c, (v, m)) in centred.iter_mut().zip(row.iter().zip(&x_mean)) {
                *c = v - m;
            }
            let yc = target - y_mean;
            for i in 0..width {
                b[i] += centred[i] * yc;
                for j in 0..=i {
                    a[i][j] += centred[i] * centred[j];
                }
            }
        }
        for i in 0..width {
            for j in 0..i {
                a[j][i] = a[i][j];
            }
            a[i][i] += alpha;
        }

        CentredSystem { a, b, x_mean, y_mean }
    }
}

/// Solve a symmetric positive definite system by Cholesky factorization
fn cholesky_solve(a: &[Vec<f64>], b: &[f64]) -> Result<Vec<f64>> {
    let n = b.len();
    let mut l = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..=i {
            let sum: f64 = (0..j).map(|k| l[i][k] * l[j][k]).sum();
            if i == j {
                let pivot = a[i][i] - sum;
                if pivot <= 0.0 || !pivot.is_finite() {
                    return Err(LeagueError::InvalidParameter(format!(
                        "normal equations are not positive definite (pivot {} at column {})",
                        pivot, i
                    )));
                }
                l[i][j] = pivot.sqrt();
            } else {
                l[i][j] = (a[i][j] - sum) / l[j][j];
            }
        }
    }

    // L z = b
    let mut z = vec![0.0; n];
    for i in 0..n {
        let sum: f64 = (0..i).map(|k| l[i][k] * z[k]).sum();
        z[i] = (b[i] - sum) / l[i][i];
    }
    // Lᵀ w = z
    let mut w = vec![0.0; n];
    for i in (0..n).rev() {
        let sum: f64 = (i + 1..n).map(|k| l[k][i] * w[k]).sum();
        w[i] = (z[i] - sum) / l[i][i];
    }
    Ok(w)
}

fn mat_vec(a: &[Vec<f64>], v: &[f64]) -> Vec<f64> {
    a.iter().map(|row| dot(row, v)).collect()
}

/// Conjugate gradient from w = 0, stopping once `||r|| <= tolerance * max(1, ||b||)`
fn conjugate_gradient(a: &[Vec<f64>], b: &[f64], tolerance: f64, max_iterations: usize) -> Vec<f64> {
    let n = b.len();
    let mut w = vec![0.0; n];
    let mut r = b.to_vec();
    let mut p = r.clone();
    let mut rs_old = dot(&r, &r);
    let threshold = tolerance * dot(b, b).sqrt().max(1.0);

    for iteration in 0..max_iterations.max(n) {
        if rs_old.sqrt() <= threshold {
            log::trace!("Conjugate gradient converged after {} iterations", iteration);
            break;
        }
        let ap = mat_vec(a, &p);
        let denom = dot(&p, &ap);
        if denom <= 0.0 {
            break;
        }
        let step = rs_old / denom;
        for i in 0..n {
            w[i] += step * p[i];
            r[i] -= step * ap[i];
        }
        let rs_new = dot(&r, &r);
        let beta = rs_new / rs_old;
        for i in 0..n {
            p[i] = r[i] + beta * p[i];
        }
        rs_old = rs_new;
    }
    w
}

// ==================== Gradient descent ====================

/// Full-batch descent on a single linear layer
fn descend<O>(
    mut optimizer: O,
    x: &[Vec<f64>],
    y: &[f64],
    width: usize,
    alpha: f64,
    options: &FitOptions,
) -> Result<(Vec<f64>, f64)>
where
    O: Optimizer<Linear<DescentBackend>, DescentBackend>,
{
    let device = NdArrayDevice::Cpu;
    let n = x.len();

    let x_flat: Vec<f32> = x.iter().flatten().map(|v| *v as f32).collect();
    let y_flat: Vec<f32> = y.iter().map(|v| *v as f32).collect();
    let x_tensor = Tensor::<DescentBackend, 1>::from_floats(x_flat.as_slice(), &device).reshape([n, width]);
    let y_tensor = Tensor::<DescentBackend, 1>::from_floats(y_flat.as_slice(), &device).reshape([n, 1]);

    let mut model: Linear<DescentBackend> = LinearConfig::new(width, 1)
        .with_initializer(Initializer::Zeros)
        .init(&device);
    let penalty_weight = (alpha / n as f64) as f32;

    for epoch in 0..options.epochs {
        let predictions = model.forward(x_tensor.clone());
        let mse = (predictions - y_tensor.clone()).powf_scalar(2.0).mean();
        let penalty = model.weight.val().powf_scalar(2.0).sum() * penalty_weight;
        let loss = mse + penalty;

        if epoch % 100 == 0 {
            let loss_val: f32 = loss.clone().into_scalar().elem();
            log::trace!("Epoch {}/{}: loss={:.6}", epoch + 1, options.epochs, loss_val);
        }

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &model);
        model = optimizer.step(options.learning_rate, model, grads);
    }

    // weight is [width, 1], so row-major order is coefficient order
    let coefficients = model
        .weight
        .val()
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| LeagueError::Parse(format!("Failed to read weights: {:?}", e)))?
        .into_iter()
        .map(f64::from)
        .collect();
    let intercept = match &model.bias {
        Some(bias) => {
            let value: f32 = bias.val().into_scalar().elem();
            value as f64
        }
        None => 0.0,
    };

    Ok((coefficients, intercept))
}
