//! Data ingestion and storage
//!
//! Replay scraping and the per-match dataset table.

pub mod dataset;
pub mod scrapers;

pub use dataset::{DatasetBuilder, DatasetRow};
pub use scrapers::ReplayId;
