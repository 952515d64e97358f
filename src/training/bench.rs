//! Model bench
//!
//! One seeded split, a fixed roster of classifiers, held-out accuracy per
//! model. Degenerate inputs surface as errors or skips, never as scores.

use crate::model::mlp::MlpConfig;
use crate::model::{
    AdaBoost, Classifier, DecisionTreeClassifier, GaussianNaiveBayes, GradientBoosting,
    KNearestNeighbors, LogisticRegression, MlpClassifier, RandomForest, SupportVectorClassifier,
};
use crate::training::metrics::{accuracy, BenchReport, ModelScore, Outcome};
use crate::training::split::train_test_split;
use crate::{BenchConfig, Result, YgoError};

pub struct ModelBench {
    test_size: f64,
    random_state: u64,
    knn_neighbors: usize,
}

impl ModelBench {
    pub fn new(test_size: f64, random_state: u64) -> Self {
        ModelBench {
            test_size,
            random_state,
            knn_neighbors: 11,
        }
    }

    pub fn from_config(config: &BenchConfig) -> Self {
        Self::new(config.test_size, config.random_state).with_knn_neighbors(config.knn_neighbors)
    }

    pub fn with_knn_neighbors(mut self, k: usize) -> Self {
        self.knn_neighbors = k.max(1);
        self
    }

    /// The standard roster, seeded from the bench's random state
    pub fn roster(&self) -> Vec<Box<dyn Classifier>> {
        let seed = self.random_state;
        vec![
            Box::new(KNearestNeighbors::new(self.knn_neighbors)),
            Box::new(LogisticRegression::new(200, seed)),
            Box::new(DecisionTreeClassifier::new(10, seed)),
            Box::new(RandomForest::new(200, 10, seed)),
            Box::new(SupportVectorClassifier::new(1.0, seed)),
            Box::new(GradientBoosting::new(100, 3, 0.1, seed)),
            Box::new(AdaBoost::new(50, seed)),
            Box::new(GaussianNaiveBayes::new()),
            Box::new(MlpClassifier::new(MlpConfig::default(), seed)),
        ]
    }

    /// Bench the standard roster
    pub fn run(&self, x: &[Vec<f32>], y: &[bool]) -> Result<BenchReport> {
        self.run_with(x, y, self.roster())
    }

    /// Bench an explicit set of models on the configured split
    pub fn run_with(
        &self,
        x: &[Vec<f32>],
        y: &[bool],
        models: Vec<Box<dyn Classifier>>,
    ) -> Result<BenchReport> {
        if x.len() < 2 {
            return Err(YgoError::InsufficientData(format!(
                "need at least 2 samples to fit models, got {}",
                x.len()
            )));
        }
        let n_features = x[0].len();
        if n_features == 0 {
            return Err(YgoError::InsufficientData(
                "feature table has no columns".to_string(),
            ));
        }

        let split = train_test_split(x, y, self.test_size, self.random_state)?;
        let two_classes = split.train_has_both_classes();
        if !two_classes {
            log::warn!("Training split has a single label class; only models that tolerate it will run");
        }

        let mut scores = Vec::with_capacity(models.len());
        for mut model in models {
            let name = model.name().to_string();

            if model.needs_two_classes() && !two_classes {
                scores.push(ModelScore {
                    model: name,
                    outcome: Outcome::Skipped {
                        reason: "training split has a single label class".to_string(),
                    },
                });
                continue;
            }

            log::info!("Fitting {} on {} samples", name, split.n_train());
            let outcome = match model
                .fit(&split.x_train, &split.y_train)
                .and_then(|_| model.predict(&split.x_test))
            {
                Ok(predicted) => {
                    let acc = accuracy(&predicted, &split.y_test);
                    log::info!("{}: accuracy {:.3}", name, acc);
                    Outcome::Scored { accuracy: acc }
                }
                Err(e) => {
                    log::warn!("{} failed: {}", name, e);
                    Outcome::Failed {
                        reason: e.to_string(),
                    }
                }
            };
            scores.push(ModelScore {
                model: name,
                outcome,
            });
        }

        Ok(BenchReport {
            n_samples: x.len(),
            n_features,
            n_train: split.n_train(),
            n_test: split.n_test(),
            test_size: self.test_size,
            random_state: self.random_state,
            scores,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn light_roster() -> Vec<Box<dyn Classifier>> {
        vec![
            Box::new(KNearestNeighbors::new(11)),
            Box::new(DecisionTreeClassifier::new(10, 1)),
            Box::new(GaussianNaiveBayes::new()),
        ]
    }

    #[test]
    fn test_one_row_is_insufficient() {
        let bench = ModelBench::new(0.2, 1);
        let err = bench.run(&[vec![1.0, 0.0]], &[true]).unwrap_err();
        assert!(matches!(err, YgoError::InsufficientData(_)));
    }

    #[test]
    fn test_no_columns_is_insufficient() {
        let bench = ModelBench::new(0.5, 1);
        let err = bench
            .run_with(&[vec![], vec![]], &[true, false], light_roster())
            .unwrap_err();
        assert!(matches!(err, YgoError::InsufficientData(_)));
    }

    #[test]
    fn test_single_class_only_knn_scores() {
        let x: Vec<Vec<f32>> = (0..6).map(|i| vec![i as f32]).collect();
        let y = vec![true; 6];
        let report = ModelBench::new(0.5, 1).run(&x, &y).unwrap();

        let scored: Vec<&str> = report.scored().map(|s| s.model.as_str()).collect();
        assert_eq!(scored, vec!["knn"]);
        assert_eq!(report.scores.len(), 9);
        assert!(matches!(
            report.score("mlp").unwrap().outcome,
            Outcome::Skipped { .. }
        ));
    }

    #[test]
    fn test_scores_every_model_on_separable_data() {
        let x: Vec<Vec<f32>> = (0..20)
            .map(|i| vec![if i % 2 == 0 { 1.0 } else { 0.0 }, 1.0])
            .collect();
        let y: Vec<bool> = (0..20).map(|i| i % 2 == 0).collect();
        let report = ModelBench::new(0.2, 3)
            .with_knn_neighbors(3)
            .run_with(&x, &y, light_roster())
            .unwrap();

        assert_eq!(report.n_train, 16);
        assert_eq!(report.n_test, 4);
        for score in &report.scores {
            assert_eq!(score.accuracy(), Some(1.0), "{}", score.model);
        }
    }

    #[test]
    fn test_roster_names() {
        let names: Vec<&str> = ModelBench::new(0.2, 1)
            .roster()
            .iter()
            .map(|m| m.name())
            .collect();
        assert_eq!(
            names,
            vec![
                "knn",
                "logistic_regression",
                "decision_tree",
                "random_forest",
                "svc",
                "gradient_boosting",
                "adaboost",
                "naive_bayes",
                "mlp"
            ]
        );
    }
}
