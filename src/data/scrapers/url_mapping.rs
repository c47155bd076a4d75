//! League name to provider URL number mapping

use crate::{League, LeagueError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct MappingRow {
    #[serde(rename = "LEAGUE")]
    league: String,
    #[serde(rename = "URL_NUMBER")]
    url_number: u32,
}

/// League names and their numeric ids on the provider
#[derive(Debug, Clone, Default)]
pub struct UrlMapping {
    order: Vec<League>,
    numbers: HashMap<League, u32>,
}

impl UrlMapping {
    /// Load from a CSV file with `LEAGUE` and `URL_NUMBER` columns
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref()).map_err(|e| {
            LeagueError::Config(format!(
                "Failed to open URL mapping {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut mapping = UrlMapping::default();
        let mut csv_reader = csv::Reader::from_reader(reader);
        for row in csv_reader.deserialize() {
            let row: MappingRow = row?;
            mapping.insert(League::new(row.league.trim()), row.url_number);
        }
        log::debug!("Loaded {} league URL mappings", mapping.order.len());
        Ok(mapping)
    }

    pub fn insert(&mut self, league: League, url_number: u32) {
        if !self.numbers.contains_key(&league) {
            self.order.push(league.clone());
        }
        self.numbers.insert(league, url_number);
    }

    /// Unique leagues in file order
    pub fn leagues(&self) -> &[League] {
        &self.order
    }

    pub fn url_number(&self, league: &League) -> Result<u32> {
        self.numbers
            .get(league)
            .copied()
            .ok_or_else(|| LeagueError::UnknownLeague(league.0.clone()))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
