//! Binary classifiers
//!
//! Every model predicts whether the provider wins game 1 from the
//! starting-hand feature rows:
//! - Instance based: k-nearest neighbours
//! - Trees: decision tree, random forest, gradient boosting, AdaBoost
//! - Probabilistic / kernel: Gaussian naive Bayes, RBF support vector machine
//! - Neural (burn): logistic regression, two-layer MLP

pub mod boosting;
pub mod forest;
pub mod knn;
pub mod logistic;
pub mod mlp;
pub mod naive_bayes;
pub mod neural;
pub mod svm;
pub mod tree;

pub use boosting::{AdaBoost, GradientBoosting};
pub use forest::RandomForest;
pub use knn::KNearestNeighbors;
pub use logistic::LogisticRegression;
pub use mlp::MlpClassifier;
pub use naive_bayes::GaussianNaiveBayes;
pub use svm::SupportVectorClassifier;
pub use tree::DecisionTreeClassifier;

use crate::{Result, YgoError};

/// A binary classifier over dense `f32` rows
pub trait Classifier {
    /// Short identifier used in reports
    fn name(&self) -> &'static str;

    /// Whether fitting needs both labels present in the training data
    fn needs_two_classes(&self) -> bool {
        true
    }

    fn fit(&mut self, x: &[Vec<f32>], y: &[bool]) -> Result<()>;

    fn predict(&self, x: &[Vec<f32>]) -> Result<Vec<bool>>;
}

/// Borrow the fitted state or fail with a model error
pub(crate) fn fitted<'a, T>(state: &'a Option<T>, name: &str) -> Result<&'a T> {
    state
        .as_ref()
        .ok_or_else(|| YgoError::Model(format!("{} used before fit", name)))
}

/// Check the training data is usable at all
pub(crate) fn check_training_data(name: &str, x: &[Vec<f32>], y: &[bool]) -> Result<()> {
    if x.is_empty() {
        return Err(YgoError::InsufficientData(format!(
            "{}: no training samples",
            name
        )));
    }
    if x.len() != y.len() {
        return Err(YgoError::Model(format!(
            "{}: {} rows but {} labels",
            name,
            x.len(),
            y.len()
        )));
    }
    let width = x[0].len();
    if x.iter().any(|row| row.len() != width) {
        return Err(YgoError::Model(format!("{}: ragged feature rows", name)));
    }
    Ok(())
}

pub(crate) fn as_targets(y: &[bool]) -> Vec<f32> {
    y.iter().map(|&l| if l { 1.0 } else { 0.0 }).collect()
}
