//! Feature table construction
//!
//! Turns dataset rows into one count column per card seen in the provider's
//! starting hands, plus the label column.

use super::deck_filter::DeckFilter;
use crate::data::dataset::{parse_bool_cell, DatasetRow};
use crate::{Result, YgoError};
use std::path::{Path, PathBuf};

/// Header of the coin-flip feature column
pub const COIN_FLIP_COLUMN: &str = "rps_winner";
/// Header of the target table
pub const TARGET_COLUMN: &str = "game1_winner";

/// Column header for a card count
pub fn card_column(card: &str) -> String {
    format!("{} (player1)", card)
}

/// Dense numeric table, one row per retained match
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f32>>,
}

impl FeatureTable {
    pub fn n_samples(&self) -> usize {
        self.rows.len()
    }

    pub fn n_features(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value of a named column in a row
    pub fn value(&self, row: usize, column: &str) -> Option<f32> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row).and_then(|r| r.get(col)).copied()
    }

    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = csv::Writer::from_path(path.as_ref())?;
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(|v| v.to_string()))?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path.as_ref())?;
        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let record = record?;
            let row = record
                .iter()
                .map(|cell| parse_feature_cell(cell))
                .collect::<Option<Vec<f32>>>()
                .ok_or_else(|| {
                    YgoError::Parse(format!("non-numeric feature value in row {}", i + 1))
                })?;
            if row.len() != columns.len() {
                return Err(YgoError::Parse(format!(
                    "row {} has {} values, expected {}",
                    i + 1,
                    row.len(),
                    columns.len()
                )));
            }
            rows.push(row);
        }

        Ok(FeatureTable { columns, rows })
    }
}

fn parse_feature_cell(cell: &str) -> Option<f32> {
    let cell = cell.trim();
    cell.parse::<f32>()
        .ok()
        .or_else(|| parse_bool_cell(cell).map(|b| if b { 1.0 } else { 0.0 }))
}

/// Write the label column
pub fn write_target_csv<P: AsRef<Path>>(labels: &[bool], path: P) -> Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    writer.write_record([TARGET_COLUMN])?;
    for label in labels {
        writer.write_record([if *label { "true" } else { "false" }])?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a label column; every cell must be a definite boolean
pub fn read_target_csv<P: AsRef<Path>>(path: P) -> Result<Vec<bool>> {
    let mut reader = csv::Reader::from_path(path.as_ref())?;
    let mut labels = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let cell = record.get(0).unwrap_or("");
        let label = parse_bool_cell(cell).ok_or_else(|| {
            YgoError::Parse(format!("row {}: label {:?} is not a boolean", i + 1, cell))
        })?;
        labels.push(label);
    }
    Ok(labels)
}

/// Features and labels for the retained rows
#[derive(Debug, Clone)]
pub struct FeatureSet {
    pub table: FeatureTable,
    pub labels: Vec<bool>,
    /// Card universe, in first-seen order
    pub cards: Vec<String>,
    /// Source document of each retained row
    pub files: Vec<String>,
}

/// Builds a [`FeatureSet`] from dataset rows
pub struct FeatureBuilder {
    replays_dir: PathBuf,
    deck_filter: Option<DeckFilter>,
    include_coin_flip: bool,
    drop_indices: Vec<usize>,
}

impl FeatureBuilder {
    pub fn new<P: AsRef<Path>>(replays_dir: P) -> Self {
        FeatureBuilder {
            replays_dir: replays_dir.as_ref().to_path_buf(),
            deck_filter: None,
            include_coin_flip: true,
            drop_indices: Vec::new(),
        }
    }

    pub fn with_deck_filter(mut self, filter: Option<DeckFilter>) -> Self {
        self.deck_filter = filter;
        self
    }

    pub fn include_coin_flip(mut self, include: bool) -> Self {
        self.include_coin_flip = include;
        self
    }

    /// Manual exclusions, as indices into the rows left after the label filter
    pub fn drop_indices(mut self, indices: &[usize]) -> Self {
        self.drop_indices = indices.to_vec();
        self
    }

    pub fn build(&self, rows: Vec<DatasetRow>) -> Result<FeatureSet> {
        let total = rows.len();

        let rows: Vec<DatasetRow> = rows
            .into_iter()
            .filter(|r| !r.file.is_empty())
            .filter(|r| r.game_winner.is_some())
            .collect();
        log::debug!("{} of {} rows have an identifier and a result", rows.len(), total);

        let rows: Vec<DatasetRow> = if self.drop_indices.is_empty() {
            rows
        } else {
            rows.into_iter()
                .enumerate()
                .filter(|(i, _)| !self.drop_indices.contains(i))
                .map(|(_, r)| r)
                .collect()
        };

        let rows: Vec<DatasetRow> = match &self.deck_filter {
            Some(filter) => {
                let before = rows.len();
                let kept: Vec<DatasetRow> = rows
                    .into_iter()
                    .filter(|r| filter.keeps(&self.replays_dir, &r.file))
                    .collect();
                log::info!("Deck filter kept {} of {} rows", kept.len(), before);
                kept
            }
            None => rows,
        };

        let mut cards: Vec<String> = Vec::new();
        for row in &rows {
            for card in row.hand_player1.iter().take(super::match_parser::HAND_SIZE) {
                if !card.is_empty() && !cards.contains(card) {
                    cards.push(card.clone());
                }
            }
        }

        let offset = usize::from(self.include_coin_flip);
        let mut columns = Vec::with_capacity(offset + cards.len());
        if self.include_coin_flip {
            columns.push(COIN_FLIP_COLUMN.to_string());
        }
        columns.extend(cards.iter().map(|c| card_column(c)));

        let mut table_rows = Vec::with_capacity(rows.len());
        let mut labels = Vec::with_capacity(rows.len());
        let mut files = Vec::with_capacity(rows.len());

        for row in rows {
            let mut values = vec![0.0f32; columns.len()];
            if self.include_coin_flip && row.rps_winner == Some(true) {
                values[0] = 1.0;
            }
            for card in row.hand_player1.iter().take(super::match_parser::HAND_SIZE) {
                if let Some(j) = cards.iter().position(|c| c == card) {
                    values[offset + j] += 1.0;
                }
            }
            table_rows.push(values);
            labels.push(row.game_winner.unwrap_or(false));
            files.push(row.file);
        }

        log::info!(
            "Feature table: {} rows x {} columns ({} cards)",
            table_rows.len(),
            columns.len(),
            cards.len()
        );

        Ok(FeatureSet {
            table: FeatureTable {
                columns,
                rows: table_rows,
            },
            labels,
            cards,
            files,
        })
    }
}
