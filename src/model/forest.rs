//! Random forest

use super::tree::{weighted_mean, Tree, TreeParams};
use super::Classifier;
use crate::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Bagged entropy trees with `sqrt(d)` features tried per split.
/// Prediction averages the per-tree positive fractions.
pub struct RandomForest {
    n_trees: usize,
    max_depth: usize,
    seed: u64,
    trees: Option<Vec<Tree>>,
}

impl RandomForest {
    pub fn new(n_trees: usize, max_depth: usize, seed: u64) -> Self {
        RandomForest {
            n_trees: n_trees.max(1),
            max_depth,
            seed,
            trees: None,
        }
    }

    fn probability(trees: &[Tree], row: &[f32]) -> f32 {
        let sum: f32 = trees.iter().map(|t| t.predict_one(row)).sum();
        sum / trees.len() as f32
    }
}

impl Classifier for RandomForest {
    fn name(&self) -> &'static str {
        "random_forest"
    }

    fn fit(&mut self, x: &[Vec<f32>], y: &[bool]) -> Result<()> {
        super::check_training_data(self.name(), x, y)?;
        let n = x.len();
        let d = x[0].len();
        let targets = super::as_targets(y);
        let mut rng = StdRng::seed_from_u64(self.seed);

        let params = TreeParams {
            max_features: Some(((d as f64).sqrt().floor() as usize).max(1)),
            ..TreeParams::classification(self.max_depth)
        };

        let mut trees = Vec::with_capacity(self.n_trees);
        for _ in 0..self.n_trees {
            // Bootstrap sample expressed as per-row draw counts
            let mut weights = vec![0.0f32; n];
            for _ in 0..n {
                weights[rng.gen_range(0..n)] += 1.0;
            }
            let leaf = |idx: &[usize]| weighted_mean(&targets, &weights, idx);
            trees.push(Tree::fit(x, &targets, &weights, &params, &mut rng, &leaf));
        }

        log::debug!("random_forest: grew {} trees", trees.len());
        self.trees = Some(trees);
        Ok(())
    }

    fn predict(&self, x: &[Vec<f32>]) -> Result<Vec<bool>> {
        let trees = super::fitted(&self.trees, self.name())?;
        Ok(x.iter()
            .map(|row| Self::probability(trees, row) > 0.5)
            .collect())
    }
}
