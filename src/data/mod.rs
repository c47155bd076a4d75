//! Data ingestion and storage
//!
//! Scrapers for the stats provider, the SQLite snapshot store, CSV snapshots
//! and the labeled dataset built from them.

pub mod database;
pub mod dataset;
pub mod scrapers;
pub mod snapshot;

pub use database::Database;
pub use dataset::{lagged_join, LeagueDataset, RowFilter};
