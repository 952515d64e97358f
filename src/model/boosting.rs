//! Boosted tree ensembles

use super::tree::{weighted_mean, Tree, TreeParams};
use super::Classifier;
use crate::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Gradient boosting on the binomial log-loss.
///
/// Each stage fits a squared-error regression tree to the residuals
/// `y - p` and replaces its leaves with a single Newton step
/// `sum(r) / sum(p(1-p))`.
pub struct GradientBoosting {
    n_estimators: usize,
    max_depth: usize,
    learning_rate: f64,
    seed: u64,
    state: Option<(f64, Vec<Tree>)>,
}

impl GradientBoosting {
    pub fn new(n_estimators: usize, max_depth: usize, learning_rate: f64, seed: u64) -> Self {
        GradientBoosting {
            n_estimators,
            max_depth,
            learning_rate,
            seed,
            state: None,
        }
    }

    fn raw_score(&self, init: f64, trees: &[Tree], row: &[f32]) -> f64 {
        init + trees
            .iter()
            .map(|t| self.learning_rate * t.predict_one(row) as f64)
            .sum::<f64>()
    }
}

impl Classifier for GradientBoosting {
    fn name(&self) -> &'static str {
        "gradient_boosting"
    }

    fn fit(&mut self, x: &[Vec<f32>], y: &[bool]) -> Result<()> {
        super::check_training_data(self.name(), x, y)?;
        let n = x.len();
        let targets = super::as_targets(y);
        let mut rng = StdRng::seed_from_u64(self.seed);
        let params = TreeParams::regression(self.max_depth);
        let weights = vec![1.0f32; n];

        let prior = (targets.iter().map(|&t| t as f64).sum::<f64>() / n as f64).clamp(1e-6, 1.0 - 1e-6);
        let init = (prior / (1.0 - prior)).ln();
        let mut scores = vec![init; n];
        let mut trees = Vec::with_capacity(self.n_estimators);

        for _ in 0..self.n_estimators {
            let probs: Vec<f64> = scores.iter().map(|&s| sigmoid(s)).collect();
            let residuals: Vec<f32> = targets
                .iter()
                .zip(&probs)
                .map(|(&t, &p)| (t as f64 - p) as f32)
                .collect();

            let newton = |idx: &[usize]| {
                let num: f64 = idx.iter().map(|&i| residuals[i] as f64).sum();
                let den: f64 = idx.iter().map(|&i| probs[i] * (1.0 - probs[i])).sum();
                if den.abs() < 1e-12 {
                    0.0
                } else {
                    (num / den) as f32
                }
            };
            let tree = Tree::fit(x, &residuals, &weights, &params, &mut rng, &newton);

            for (score, row) in scores.iter_mut().zip(x) {
                *score += self.learning_rate * tree.predict_one(row) as f64;
            }
            trees.push(tree);
        }

        self.state = Some((init, trees));
        Ok(())
    }

    fn predict(&self, x: &[Vec<f32>]) -> Result<Vec<bool>> {
        let (init, trees) = super::fitted(&self.state, self.name())?;
        Ok(x.iter()
            .map(|row| self.raw_score(*init, trees, row) > 0.0)
            .collect())
    }
}

/// Discrete AdaBoost (SAMME) over depth-one trees
pub struct AdaBoost {
    n_estimators: usize,
    seed: u64,
    stumps: Option<Vec<(f64, Tree)>>,
}

impl AdaBoost {
    pub fn new(n_estimators: usize, seed: u64) -> Self {
        AdaBoost {
            n_estimators: n_estimators.max(1),
            seed,
            stumps: None,
        }
    }
}

impl Classifier for AdaBoost {
    fn name(&self) -> &'static str {
        "adaboost"
    }

    fn fit(&mut self, x: &[Vec<f32>], y: &[bool]) -> Result<()> {
        super::check_training_data(self.name(), x, y)?;
        let n = x.len();
        let targets = super::as_targets(y);
        let mut rng = StdRng::seed_from_u64(self.seed);
        let params = TreeParams::classification(1);
        let mut weights = vec![1.0f32 / n as f32; n];
        let mut stumps: Vec<(f64, Tree)> = Vec::with_capacity(self.n_estimators);

        for round in 0..self.n_estimators {
            let leaf = |idx: &[usize]| weighted_mean(&targets, &weights, idx);
            let stump = Tree::fit(x, &targets, &weights, &params, &mut rng, &leaf);

            let wrong: Vec<bool> = x
                .iter()
                .zip(y)
                .map(|(row, &label)| (stump.predict_one(row) > 0.5) != label)
                .collect();
            let total: f64 = weights.iter().map(|&w| w as f64).sum();
            let error: f64 = weights
                .iter()
                .zip(&wrong)
                .filter(|(_, miss)| **miss)
                .map(|(&w, _)| w as f64)
                .sum::<f64>()
                / total;

            if error <= 0.0 {
                stumps.push((1.0, stump));
                break;
            }
            if error >= 0.5 {
                if stumps.is_empty() {
                    stumps.push((1.0, stump));
                }
                log::debug!("adaboost: stopped at round {} (error {:.3})", round, error);
                break;
            }

            let alpha = ((1.0 - error) / error).ln();
            for (w, &miss) in weights.iter_mut().zip(&wrong) {
                if miss {
                    *w = (*w as f64 * alpha.exp()) as f32;
                }
            }
            let sum: f32 = weights.iter().sum();
            weights.iter_mut().for_each(|w| *w /= sum);
            stumps.push((alpha, stump));
        }

        self.stumps = Some(stumps);
        Ok(())
    }

    fn predict(&self, x: &[Vec<f32>]) -> Result<Vec<bool>> {
        let stumps = super::fitted(&self.stumps, self.name())?;
        Ok(x.iter()
            .map(|row| {
                let vote: f64 = stumps
                    .iter()
                    .map(|(alpha, s)| if s.predict_one(row) > 0.5 { *alpha } else { -*alpha })
                    .sum();
                vote > 0.0
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn threshold_data() -> (Vec<Vec<f32>>, Vec<bool>) {
        let x: Vec<Vec<f32>> = (0..12).map(|i| vec![i as f32, (i % 2) as f32]).collect();
        let y: Vec<bool> = (0..12).map(|i| i >= 6).collect();
        (x, y)
    }

    #[test]
    fn test_gradient_boosting_fits_threshold() {
        let (x, y) = threshold_data();
        let mut gb = GradientBoosting::new(100, 3, 0.1, 1);
        gb.fit(&x, &y).unwrap();
        assert_eq!(gb.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_adaboost_fits_threshold() {
        let (x, y) = threshold_data();
        let mut ada = AdaBoost::new(50, 1);
        ada.fit(&x, &y).unwrap();
        assert_eq!(ada.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_unfitted_boosters_error() {
        assert!(GradientBoosting::new(1, 1, 0.1, 0).predict(&[vec![0.0]]).is_err());
        assert!(AdaBoost::new(1, 0).predict(&[vec![0.0]]).is_err());
    }
}
