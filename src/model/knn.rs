//! k-nearest neighbours

use super::Classifier;
use crate::Result;
use std::cmp::Ordering;

/// Majority vote of the `k` closest training rows (Euclidean distance).
///
/// `k` is capped at the training-set size, so a tiny split still yields a
/// model. A tied vote predicts `false`.
pub struct KNearestNeighbors {
    k: usize,
    train_x: Vec<Vec<f32>>,
    train_y: Vec<bool>,
}

impl KNearestNeighbors {
    pub fn new(k: usize) -> Self {
        KNearestNeighbors {
            k: k.max(1),
            train_x: Vec::new(),
            train_y: Vec::new(),
        }
    }

    /// Neighbour count actually used after fitting
    pub fn effective_k(&self) -> usize {
        self.k.min(self.train_x.len()).max(1)
    }

    fn vote(&self, row: &[f32]) -> bool {
        let mut distances: Vec<(f32, bool)> = self
            .train_x
            .iter()
            .zip(self.train_y.iter())
            .map(|(t, &label)| {
                let d: f32 = t.iter().zip(row).map(|(a, b)| (a - b) * (a - b)).sum();
                (d, label)
            })
            .collect();
        distances.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

        let k = self.effective_k();
        let positive = distances.iter().take(k).filter(|(_, l)| *l).count();
        positive * 2 > k
    }
}

impl Classifier for KNearestNeighbors {
    fn name(&self) -> &'static str {
        "knn"
    }

    fn needs_two_classes(&self) -> bool {
        false
    }

    fn fit(&mut self, x: &[Vec<f32>], y: &[bool]) -> Result<()> {
        super::check_training_data(self.name(), x, y)?;
        self.train_x = x.to_vec();
        self.train_y = y.to_vec();
        Ok(())
    }

    fn predict(&self, x: &[Vec<f32>]) -> Result<Vec<bool>> {
        if self.train_x.is_empty() {
            return Err(crate::YgoError::Model("knn used before fit".to_string()));
        }
        Ok(x.iter().map(|row| self.vote(row)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_k_capped_by_training_size() {
        let mut knn = KNearestNeighbors::new(11);
        knn.fit(&[vec![0.0], vec![1.0], vec![2.0]], &[true, true, false])
            .unwrap();
        assert_eq!(knn.effective_k(), 3);
        assert_eq!(knn.predict(&[vec![5.0]]).unwrap(), vec![true]);
    }

    #[test]
    fn test_nearest_neighbour() {
        let mut knn = KNearestNeighbors::new(1);
        knn.fit(&[vec![0.0, 0.0], vec![10.0, 10.0]], &[false, true])
            .unwrap();
        assert_eq!(
            knn.predict(&[vec![1.0, 1.0], vec![9.0, 8.0]]).unwrap(),
            vec![false, true]
        );
    }

    #[test]
    fn test_tie_predicts_false() {
        let mut knn = KNearestNeighbors::new(2);
        knn.fit(&[vec![0.0], vec![2.0]], &[true, false]).unwrap();
        assert_eq!(knn.predict(&[vec![1.0]]).unwrap(), vec![false]);
    }

    #[test]
    fn test_single_class_training_allowed() {
        let mut knn = KNearestNeighbors::new(11);
        assert!(!knn.needs_two_classes());
        knn.fit(&[vec![0.0]], &[true]).unwrap();
        assert_eq!(knn.predict(&[vec![3.0]]).unwrap(), vec![true]);
    }
}
