//! K-fold cross-validation splits

use crate::{LeagueError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Train and validation indices for one fold
#[derive(Debug, Clone, PartialEq)]
pub struct Fold {
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
}

/// Shuffled k-fold splitter
#[derive(Debug, Clone, Copy)]
pub struct KFold {
    pub k: usize,
    pub seed: u64,
}

impl KFold {
    pub fn new(k: usize, seed: u64) -> Self {
        KFold { k, seed }
    }

    /// Split `0..n` into `k` disjoint validation folds covering every index.
    ///
    /// Fold sizes differ by at most one; the first `n % k` folds take the
    /// extra index.
    pub fn split(&self, n: usize) -> Result<Vec<Fold>> {
        if self.k < 2 || self.k > n {
            return Err(LeagueError::InvalidParameter(format!(
                "k-fold needs 2 <= k <= n, got k={} n={}",
                self.k, n
            )));
        }

        let mut indices: Vec<usize> = (0..n).collect();
        let mut rng = rand::rngs::StdRng::seed_from_u64(self.seed);
        indices.shuffle(&mut rng);

        let base = n / self.k;
        let extra = n % self.k;
        let mut folds = Vec::with_capacity(self.k);
        let mut start = 0;
        for fold in 0..self.k {
            let size = base + usize::from(fold < extra);
            let end = start + size;
            let validation = indices[start..end].to_vec();
            let train = indices[..start]
                .iter()
                .chain(&indices[end..])
                .copied()
                .collect();
            folds.push(Fold { train, validation });
            start = end;
        }
        Ok(folds)
    }
}
