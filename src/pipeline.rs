//! Stage orchestration
//!
//! Each stage reads the previous stage's files and writes its own, so any
//! stage can be rerun on its own from the CLI.

use crate::data::dataset::{self, DatasetBuild, DatasetBuilder, DatasetRow};
use crate::features::encoding::{read_target_csv, write_target_csv};
use crate::features::{DeckFilter, FeatureBuilder, FeatureSet, FeatureTable};
use crate::training::{BenchReport, ModelBench};
use crate::{Config, Result, YgoError};

pub struct Pipeline<'a> {
    config: &'a Config,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a Config) -> Self {
        Pipeline { config }
    }

    /// Replays directory → matches CSV
    pub fn build_dataset(&self) -> Result<DatasetBuild> {
        let data = &self.config.data;
        log::info!("Building dataset from {}", data.replays_dir);
        let build = DatasetBuilder::new(data.provider.as_deref()).build_from_dir(&data.replays_dir)?;
        dataset::write_csv(&build.rows, &data.matches_csv)?;
        log::info!("Wrote {} rows to {}", build.rows.len(), data.matches_csv);
        Ok(build)
    }

    /// Dataset rows → feature and target CSVs
    pub fn build_features(&self, rows: Vec<DatasetRow>, drop_indices: &[usize]) -> Result<FeatureSet> {
        let data = &self.config.data;
        let filter = DeckFilter::from_config(&self.config.deck_filter)?;
        if filter.is_none() {
            log::info!("Deck filter disabled");
        }

        let set = FeatureBuilder::new(&data.replays_dir)
            .with_deck_filter(filter)
            .include_coin_flip(self.config.features.include_coin_flip)
            .drop_indices(drop_indices)
            .build(rows)?;

        if set.table.is_empty() || set.table.n_features() == 0 {
            return Err(YgoError::InsufficientData(format!(
                "feature table is empty ({} rows, {} columns)",
                set.table.n_samples(),
                set.table.n_features()
            )));
        }

        set.table.write_csv(&data.features_csv)?;
        write_target_csv(&set.labels, &data.target_csv)?;
        log::info!("Wrote {} and {}", data.features_csv, data.target_csv);
        Ok(set)
    }

    /// Matches CSV → feature and target CSVs
    pub fn build_features_from_csv(&self, matches_csv: &str, drop_indices: &[usize]) -> Result<FeatureSet> {
        let rows = dataset::read_csv(matches_csv)?;
        log::info!("Loaded {} rows from {}", rows.len(), matches_csv);
        self.build_features(rows, drop_indices)
    }

    /// Feature table + labels → bench report
    pub fn bench(&self, table: &FeatureTable, labels: &[bool]) -> Result<BenchReport> {
        if table.n_samples() != labels.len() {
            return Err(YgoError::Parse(format!(
                "feature table has {} rows but target has {} labels",
                table.n_samples(),
                labels.len()
            )));
        }
        let report = ModelBench::from_config(&self.config.bench).run(&table.rows, labels)?;
        if let Some(path) = &self.config.data.scores_json {
            report.save_scores(path)?;
            log::info!("Saved scores to {}", path);
        }
        Ok(report)
    }

    /// Bench from the stored feature and target CSVs
    pub fn bench_from_csv(&self, features_csv: &str, target_csv: &str) -> Result<BenchReport> {
        let table = FeatureTable::read_csv(features_csv)?;
        let labels = read_target_csv(target_csv)?;
        self.bench(&table, &labels)
    }

    /// dataset → features → bench; `skip_dataset` reuses the matches CSV
    pub fn run_offline(&self, skip_dataset: bool) -> Result<BenchReport> {
        let rows = if skip_dataset {
            log::info!("Reusing {}", self.config.data.matches_csv);
            dataset::read_csv(&self.config.data.matches_csv)?
        } else {
            self.build_dataset()?.rows
        };
        let set = self.build_features(rows, &[])?;
        self.bench(&set.table, &set.labels)
    }
}
