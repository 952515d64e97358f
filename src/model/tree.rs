//! Binary decision trees
//!
//! One CART-style core serves the classification tree (entropy), the random
//! forest and the regression trees inside gradient boosting (squared error).
//! Targets are `f32`; for classification they are 0/1 and leaves hold the
//! weighted fraction of positives.

use super::Classifier;
use crate::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::cmp::Ordering;

/// Split quality measure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criterion {
    Entropy,
    SquaredError,
}

#[derive(Debug, Clone)]
pub struct TreeParams {
    pub criterion: Criterion,
    pub max_depth: usize,
    pub min_samples_split: usize,
    /// Features examined per split; all when `None`
    pub max_features: Option<usize>,
}

impl TreeParams {
    pub fn classification(max_depth: usize) -> Self {
        TreeParams {
            criterion: Criterion::Entropy,
            max_depth,
            min_samples_split: 2,
            max_features: None,
        }
    }

    pub fn regression(max_depth: usize) -> Self {
        TreeParams {
            criterion: Criterion::SquaredError,
            ..Self::classification(max_depth)
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf(f32),
    Split {
        feature: usize,
        threshold: f32,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// Weighted sufficient statistics of a node
#[derive(Debug, Clone, Copy, Default)]
struct Stats {
    w: f64,
    wy: f64,
    wy2: f64,
}

impl Stats {
    fn add(&mut self, y: f32, w: f32) {
        let (y, w) = (y as f64, w as f64);
        self.w += w;
        self.wy += w * y;
        self.wy2 += w * y * y;
    }

    fn minus(&self, other: &Stats) -> Stats {
        Stats {
            w: self.w - other.w,
            wy: self.wy - other.wy,
            wy2: self.wy2 - other.wy2,
        }
    }

    fn impurity(&self, criterion: Criterion) -> f64 {
        if self.w <= 0.0 {
            return 0.0;
        }
        let mean = self.wy / self.w;
        match criterion {
            Criterion::Entropy => {
                let p = mean.clamp(0.0, 1.0);
                let h = |q: f64| if q > 0.0 { -q * q.log2() } else { 0.0 };
                h(p) + h(1.0 - p)
            }
            Criterion::SquaredError => (self.wy2 / self.w - mean * mean).max(0.0),
        }
    }

    /// Impurity weighted by node mass
    fn cost(&self, criterion: Criterion) -> f64 {
        self.w * self.impurity(criterion)
    }
}

struct Split {
    feature: usize,
    threshold: f32,
    cost: f64,
}

/// A fitted tree
#[derive(Debug, Clone)]
pub struct Tree {
    root: Node,
}

struct Grower<'a> {
    x: &'a [Vec<f32>],
    targets: &'a [f32],
    weights: &'a [f32],
    params: &'a TreeParams,
    leaf_value: &'a dyn Fn(&[usize]) -> f32,
}

impl Tree {
    /// Grow a tree over the samples with non-zero weight
    pub fn fit(
        x: &[Vec<f32>],
        targets: &[f32],
        weights: &[f32],
        params: &TreeParams,
        rng: &mut StdRng,
        leaf_value: &dyn Fn(&[usize]) -> f32,
    ) -> Tree {
        let indices: Vec<usize> = (0..x.len()).filter(|&i| weights[i] > 0.0).collect();
        let grower = Grower {
            x,
            targets,
            weights,
            params,
            leaf_value,
        };
        Tree {
            root: grower.grow(indices, 0, rng),
        }
    }

    /// Leaf value for one sample
    pub fn predict_one(&self, row: &[f32]) -> f32 {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf(value) => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let v = row.get(*feature).copied().unwrap_or(0.0);
                    node = if v <= *threshold { left } else { right };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn depth(node: &Node) -> usize {
            match node {
                Node::Leaf(_) => 0,
                Node::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        depth(&self.root)
    }
}

/// Weighted mean of the targets at a leaf
pub fn weighted_mean(targets: &[f32], weights: &[f32], indices: &[usize]) -> f32 {
    let (mut w, mut wy) = (0.0f64, 0.0f64);
    for &i in indices {
        w += weights[i] as f64;
        wy += (weights[i] * targets[i]) as f64;
    }
    if w > 0.0 {
        (wy / w) as f32
    } else {
        0.0
    }
}

impl Grower<'_> {
    fn stats(&self, indices: &[usize]) -> Stats {
        let mut stats = Stats::default();
        for &i in indices {
            stats.add(self.targets[i], self.weights[i]);
        }
        stats
    }

    fn grow(&self, indices: Vec<usize>, depth: usize, rng: &mut StdRng) -> Node {
        let stats = self.stats(&indices);
        let n_features = self.x.first().map(|r| r.len()).unwrap_or(0);

        if depth >= self.params.max_depth
            || indices.len() < self.params.min_samples_split
            || n_features == 0
            || stats.impurity(self.params.criterion) <= 1e-12
        {
            return Node::Leaf((self.leaf_value)(&indices));
        }

        let features: Vec<usize> = match self.params.max_features {
            Some(k) if k < n_features => {
                rand::seq::index::sample(&mut *rng, n_features, k.max(1)).into_vec()
            }
            _ => (0..n_features).collect(),
        };

        let parent_cost = stats.cost(self.params.criterion);
        let mut best = self.best_split_among(&features, &indices, &stats);
        if best.is_none() && features.len() < n_features {
            // Sampled features were all constant here; look at the rest
            let rest: Vec<usize> = (0..n_features).filter(|f| !features.contains(f)).collect();
            best = self.best_split_among(&rest, &indices, &stats);
        }

        let split = match best {
            Some(split) if parent_cost - split.cost > 1e-9 * parent_cost.max(1.0) => split,
            _ => return Node::Leaf((self.leaf_value)(&indices)),
        };

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| self.x[i][split.feature] <= split.threshold);

        Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: Box::new(self.grow(left, depth + 1, rng)),
            right: Box::new(self.grow(right, depth + 1, rng)),
        }
    }

    fn best_split_among(&self, features: &[usize], indices: &[usize], stats: &Stats) -> Option<Split> {
        features
            .iter()
            .filter_map(|&f| self.best_split_on(f, indices, stats))
            .min_by(|a, b| a.cost.partial_cmp(&b.cost).unwrap_or(Ordering::Equal))
    }

    fn best_split_on(&self, feature: usize, indices: &[usize], total: &Stats) -> Option<Split> {
        let mut order = indices.to_vec();
        order.sort_by(|&a, &b| {
            self.x[a][feature]
                .partial_cmp(&self.x[b][feature])
                .unwrap_or(Ordering::Equal)
        });

        let mut left = Stats::default();
        let mut best: Option<Split> = None;

        for pos in 0..order.len().saturating_sub(1) {
            let i = order[pos];
            left.add(self.targets[i], self.weights[i]);

            let here = self.x[i][feature];
            let next = self.x[order[pos + 1]][feature];
            if here >= next {
                continue;
            }

            let right = total.minus(&left);
            let cost = left.cost(self.params.criterion) + right.cost(self.params.criterion);
            if best.as_ref().map(|b| cost < b.cost).unwrap_or(true) {
                best = Some(Split {
                    feature,
                    threshold: here + (next - here) / 2.0,
                    cost,
                });
            }
        }

        best
    }
}

/// Entropy decision tree classifier
pub struct DecisionTreeClassifier {
    max_depth: usize,
    seed: u64,
    tree: Option<Tree>,
}

impl DecisionTreeClassifier {
    pub fn new(max_depth: usize, seed: u64) -> Self {
        DecisionTreeClassifier {
            max_depth,
            seed,
            tree: None,
        }
    }
}

impl Classifier for DecisionTreeClassifier {
    fn name(&self) -> &'static str {
        "decision_tree"
    }

    fn fit(&mut self, x: &[Vec<f32>], y: &[bool]) -> Result<()> {
        super::check_training_data(self.name(), x, y)?;
        let targets = super::as_targets(y);
        let weights = vec![1.0f32; y.len()];
        let mut rng = StdRng::seed_from_u64(self.seed);
        let leaf = |idx: &[usize]| weighted_mean(&targets, &weights, idx);
        self.tree = Some(Tree::fit(
            x,
            &targets,
            &weights,
            &TreeParams::classification(self.max_depth),
            &mut rng,
            &leaf,
        ));
        Ok(())
    }

    fn predict(&self, x: &[Vec<f32>]) -> Result<Vec<bool>> {
        let tree = super::fitted(&self.tree, self.name())?;
        Ok(x.iter().map(|row| tree.predict_one(row) > 0.5).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xor_data() -> (Vec<Vec<f32>>, Vec<bool>) {
        let x = vec![
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
        ];
        let y = vec![false, true, true, false];
        (x, y)
    }

    #[test]
    fn test_tree_learns_xor() {
        let (x, y) = xor_data();
        let mut clf = DecisionTreeClassifier::new(10, 1);
        clf.fit(&x, &y).unwrap();
        assert_eq!(clf.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_depth_limit() {
        let (x, y) = xor_data();
        let targets: Vec<f32> = y.iter().map(|&l| if l { 1.0 } else { 0.0 }).collect();
        let weights = vec![1.0; 4];
        let mut rng = StdRng::seed_from_u64(0);
        let leaf = |idx: &[usize]| weighted_mean(&targets, &weights, idx);
        let tree = Tree::fit(
            &x,
            &targets,
            &weights,
            &TreeParams::classification(1),
            &mut rng,
            &leaf,
        );
        assert!(tree.depth() <= 1);
    }

    #[test]
    fn test_regression_tree_fits_step() {
        let x: Vec<Vec<f32>> = (0..8).map(|i| vec![i as f32]).collect();
        let targets: Vec<f32> = (0..8).map(|i| if i < 4 { -1.0 } else { 3.0 }).collect();
        let weights = vec![1.0; 8];
        let mut rng = StdRng::seed_from_u64(0);
        let leaf = |idx: &[usize]| weighted_mean(&targets, &weights, idx);
        let tree = Tree::fit(
            &x,
            &targets,
            &weights,
            &TreeParams::regression(3),
            &mut rng,
            &leaf,
        );
        assert_eq!(tree.predict_one(&[1.0]), -1.0);
        assert_eq!(tree.predict_one(&[6.0]), 3.0);
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn test_zero_weight_samples_ignored() {
        let x = vec![vec![0.0], vec![1.0], vec![2.0]];
        let targets = vec![1.0, 0.0, 1.0];
        let weights = vec![1.0, 0.0, 1.0];
        let mut rng = StdRng::seed_from_u64(0);
        let leaf = |idx: &[usize]| weighted_mean(&targets, &weights, idx);
        let tree = Tree::fit(
            &x,
            &targets,
            &weights,
            &TreeParams::classification(5),
            &mut rng,
            &leaf,
        );
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.predict_one(&[1.0]), 1.0);
    }

    #[test]
    fn test_predict_before_fit_errors() {
        let clf = DecisionTreeClassifier::new(3, 0);
        assert!(clf.predict(&[vec![0.0]]).is_err());
    }
}
