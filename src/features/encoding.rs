//! One-hot encoding for the league identifier

use crate::{League, LeagueError, Result};
use serde::{Deserialize, Serialize};

/// One-hot encoder over leagues seen at fit time.
///
/// Leagues not seen during fit encode to an all-zero row, so inference can
/// run on populations the model was never trained on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OneHotEncoder {
    /// Sorted, unique categories
    categories: Vec<League>,
    fitted: bool,
}

impl OneHotEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit<'a, I>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a League>,
    {
        let mut categories: Vec<League> = values.into_iter().cloned().collect();
        if categories.is_empty() {
            return Err(LeagueError::EmptyDataset(
                "cannot fit encoder on zero values".to_string(),
            ));
        }
        categories.sort();
        categories.dedup();
        self.categories = categories;
        self.fitted = true;
        Ok(())
    }

    pub fn categories(&self) -> &[League] {
        &self.categories
    }

    pub fn width(&self) -> usize {
        self.categories.len()
    }

    /// Column index of a category, if it was seen at fit time
    pub fn index_of(&self, value: &League) -> Option<usize> {
        self.categories.binary_search(value).ok()
    }

    pub fn transform(&self, value: &League) -> Result<Vec<f64>> {
        if !self.fitted {
            return Err(LeagueError::NotFitted("OneHotEncoder"));
        }
        let mut row = vec![0.0; self.categories.len()];
        match self.index_of(value) {
            Some(idx) => row[idx] = 1.0,
            None => log::trace!("Unseen league {} encodes to zeros", value),
        }
        Ok(row)
    }

    /// Column names in the form `LEAGUE_<name>`
    pub fn feature_names(&self) -> Vec<String> {
        self.categories
            .iter()
            .map(|c| format!("LEAGUE_{}", c.as_str()))
            .collect()
    }
}
