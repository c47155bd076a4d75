//! Z-score standardization of numeric columns

use crate::{LeagueError, Result};
use serde::{Deserialize, Serialize};

/// Per-column standardization: (x - mean) / scale
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    /// Population standard deviation, 1.0 for constant columns
    pub scale: Vec<f64>,
    /// Rows seen during fit
    pub n_samples: usize,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fitted(&self) -> bool {
        self.n_samples > 0
    }

    pub fn width(&self) -> usize {
        self.mean.len()
    }

    /// Compute column statistics from rows of equal width
    pub fn fit(&mut self, rows: &[Vec<f64>]) -> Result<()> {
        let width = rows
            .first()
            .map(|r| r.len())
            .ok_or_else(|| LeagueError::EmptyDataset("cannot fit scaler on zero rows".to_string()))?;

        let mut sum = vec![0.0; width];
        for row in rows {
            check_width(width, row)?;
            for (s, v) in sum.iter_mut().zip(row) {
                *s += v;
            }
        }
        let n = rows.len() as f64;
        let mean: Vec<f64> = sum.iter().map(|s| s / n).collect();

        // Second pass keeps the variance stable for large offsets
        let mut sum_sq = vec![0.0; width];
        for row in rows {
            for ((s, v), m) in sum_sq.iter_mut().zip(row).zip(&mean) {
                *s += (v - m) * (v - m);
            }
        }
        let scale = sum_sq
            .iter()
            .map(|s| {
                let std = (s / n).sqrt();
                if std > f64::EPSILON {
                    std
                } else {
                    1.0
                }
            })
            .collect();

        self.mean = mean;
        self.scale = scale;
        self.n_samples = rows.len();
        Ok(())
    }

    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        if !self.is_fitted() {
            return Err(LeagueError::NotFitted("StandardScaler"));
        }
        check_width(self.width(), row)?;
        Ok(row
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(v, (m, s))| (v - m) / s)
            .collect())
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        rows.iter().map(|row| self.transform_row(row)).collect()
    }

    pub fn fit_transform(&mut self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        self.fit(rows)?;
        self.transform(rows)
    }
}

fn check_width(expected: usize, row: &[f64]) -> Result<()> {
    if row.len() != expected {
        return Err(LeagueError::DimensionMismatch {
            expected,
            found: row.len(),
        });
    }
    Ok(())
}
