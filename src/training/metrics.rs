//! Regression metrics and evaluation

use crate::{LeagueError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error metrics of predictions against known targets
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Mean squared error
    pub mse: f64,
    /// Root mean squared error
    pub rmse: f64,
    /// Mean absolute error
    pub mae: f64,
    /// Coefficient of determination; 0.0 when targets are constant
    pub r2: f64,
    /// Number of predictions scored
    pub count: usize,
}

impl RegressionMetrics {
    pub fn compute(y_true: &[f64], y_pred: &[f64]) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(LeagueError::DimensionMismatch {
                expected: y_true.len(),
                found: y_pred.len(),
            });
        }
        if y_true.is_empty() {
            return Err(LeagueError::EmptyDataset(
                "cannot score zero predictions".to_string(),
            ));
        }

        let n = y_true.len() as f64;
        let mut sq_sum = 0.0;
        let mut abs_sum = 0.0;
        for (t, p) in y_true.iter().zip(y_pred) {
            sq_sum += (t - p) * (t - p);
            abs_sum += (t - p).abs();
        }
        let mean = y_true.iter().sum::<f64>() / n;
        let total: f64 = y_true.iter().map(|t| (t - mean) * (t - mean)).sum();

        let mse = sq_sum / n;
        let r2 = if total > 0.0 { 1.0 - sq_sum / total } else { 0.0 };

        Ok(RegressionMetrics {
            mse,
            rmse: mse.sqrt(),
            mae: abs_sum / n,
            r2,
            count: y_true.len(),
        })
    }
}

impl fmt::Display for RegressionMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MSE: {:.4} | RMSE: {:.4} | MAE: {:.4} | R²: {:.4} (n={})",
            self.mse, self.rmse, self.mae, self.r2, self.count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_predictions() {
        let y = vec![1.0, 2.0, 3.0];
        let m = RegressionMetrics::compute(&y, &y).unwrap();
        assert_eq!(m.mse, 0.0);
        assert_eq!(m.mae, 0.0);
        assert_eq!(m.r2, 1.0);
        assert_eq!(m.count, 3);
    }

    #[test]
    fn test_known_values() {
        let y_true = vec![1.0, 2.0, 3.0, 4.0];
        let y_pred = vec![2.0, 2.0, 3.0, 2.0];
        let m = RegressionMetrics::compute(&y_true, &y_pred).unwrap();
        assert!((m.mse - 1.25).abs() < 1e-12);
        assert!((m.rmse - 1.25f64.sqrt()).abs() < 1e-12);
        assert!((m.mae - 0.75).abs() < 1e-12);
        // total sum of squares is 5.0
        assert!((m.r2 - 0.0).abs() < 1e-12);

        // Predicting the mean everywhere gives R² of zero
        let mean = vec![2.5; 4];
        let m = RegressionMetrics::compute(&y_true, &mean).unwrap();
        assert!(m.r2.abs() < 1e-12);
    }

    #[test]
    fn test_invalid_input() {
        assert!(RegressionMetrics::compute(&[], &[]).is_err());
        assert!(RegressionMetrics::compute(&[1.0], &[1.0, 2.0]).is_err());
        let m = RegressionMetrics::compute(&[2.0, 2.0], &[1.0, 3.0]).unwrap();
        assert_eq!(m.r2, 0.0);
    }
}
