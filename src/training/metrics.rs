//! Bench scores and report rendering

use serde::Serialize;
use std::fmt;
use std::path::Path;

use crate::{OutputFormat, Result};

/// Fraction of predictions equal to the labels
pub fn accuracy(predicted: &[bool], actual: &[bool]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let correct = predicted
        .iter()
        .zip(actual.iter())
        .filter(|(p, a)| p == a)
        .count();
    correct as f64 / actual.len() as f64
}

/// What happened to one model
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Scored { accuracy: f64 },
    Skipped { reason: String },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelScore {
    pub model: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl ModelScore {
    pub fn accuracy(&self) -> Option<f64> {
        match self.outcome {
            Outcome::Scored { accuracy } => Some(accuracy),
            _ => None,
        }
    }
}

/// Result of one bench run
#[derive(Debug, Clone, Serialize)]
pub struct BenchReport {
    pub n_samples: usize,
    pub n_features: usize,
    pub n_train: usize,
    pub n_test: usize,
    pub test_size: f64,
    pub random_state: u64,
    pub scores: Vec<ModelScore>,
}

impl BenchReport {
    pub fn score(&self, model: &str) -> Option<&ModelScore> {
        self.scores.iter().find(|s| s.model == model)
    }

    /// Models that produced an accuracy
    pub fn scored(&self) -> impl Iterator<Item = &ModelScore> {
        self.scores.iter().filter(|s| s.accuracy().is_some())
    }

    /// Highest-accuracy model, first listed on ties
    pub fn best(&self) -> Option<&ModelScore> {
        self.scored().fold(None, |best: Option<&ModelScore>, s| match best {
            Some(b) if b.accuracy() >= s.accuracy() => Some(b),
            _ => Some(s),
        })
    }

    pub fn render(&self, format: OutputFormat) -> Result<String> {
        Ok(match format {
            OutputFormat::Table => self.to_string(),
            OutputFormat::Json => serde_json::to_string_pretty(self)?,
            OutputFormat::Csv => {
                let mut writer = csv::Writer::from_writer(Vec::new());
                writer.write_record(["model", "status", "accuracy", "reason"])?;
                for score in &self.scores {
                    let (status, accuracy, reason) = match &score.outcome {
                        Outcome::Scored { accuracy } => ("scored", format!("{:.4}", accuracy), String::new()),
                        Outcome::Skipped { reason } => ("skipped", String::new(), reason.clone()),
                        Outcome::Failed { reason } => ("failed", String::new(), reason.clone()),
                    };
                    writer.write_record([score.model.as_str(), status, accuracy.as_str(), reason.as_str()])?;
                }
                let bytes = writer
                    .into_inner()
                    .map_err(|e| crate::YgoError::Io(e.into_error()))?;
                String::from_utf8_lossy(&bytes).into_owned()
            }
        })
    }

    /// Write `{model: accuracy}` for the scored models
    pub fn save_scores<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let scores: serde_json::Map<String, serde_json::Value> = self
            .scored()
            .filter_map(|s| s.accuracy().map(|a| (s.model.clone(), serde_json::json!(a))))
            .collect();
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(&scores)?)?;
        Ok(())
    }
}

impl fmt::Display for BenchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "\n=== Model Bench ({} samples, {} features, train={}, test={}, seed={}) ===\n",
            self.n_samples, self.n_features, self.n_train, self.n_test, self.random_state
        )?;
        writeln!(f, "{:<22} {:>10}  {}", "Model", "Accuracy", "Note")?;
        writeln!(f, "{}", "-".repeat(60))?;

        let best = self.best().map(|b| b.model.as_str());
        for score in &self.scores {
            match &score.outcome {
                Outcome::Scored { accuracy } => {
                    let marker = if Some(score.model.as_str()) == best { "*" } else { "" };
                    writeln!(f, "{:<22} {:>9.1}%  {}", score.model, accuracy * 100.0, marker)?
                }
                Outcome::Skipped { reason } => {
                    writeln!(f, "{:<22} {:>10}  skipped: {}", score.model, "-", reason)?
                }
                Outcome::Failed { reason } => {
                    writeln!(f, "{:<22} {:>10}  failed: {}", score.model, "-", reason)?
                }
            }
        }
        Ok(())
    }
}
