//! Seeded train/test split

use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::{Result, YgoError};

/// Rows and labels partitioned for one bench run
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub x_train: Vec<Vec<f32>>,
    pub y_train: Vec<bool>,
    pub x_test: Vec<Vec<f32>>,
    pub y_test: Vec<bool>,
    /// Original row index of each test sample
    pub test_indices: Vec<usize>,
}

impl TrainTestSplit {
    pub fn n_train(&self) -> usize {
        self.y_train.len()
    }

    pub fn n_test(&self) -> usize {
        self.y_test.len()
    }

    /// Whether both labels occur in the training half
    pub fn train_has_both_classes(&self) -> bool {
        self.y_train.iter().any(|&l| l) && self.y_train.iter().any(|&l| !l)
    }
}

/// Sizes of the two halves: the test half gets `ceil(n * test_size)` rows
pub fn split_sizes(n: usize, test_size: f64) -> Result<(usize, usize)> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(YgoError::Config(format!(
            "test size must be strictly between 0 and 1, got {}",
            test_size
        )));
    }
    let n_test = (n as f64 * test_size).ceil() as usize;
    let n_train = n.saturating_sub(n_test);
    if n_test == 0 || n_train == 0 {
        return Err(YgoError::InsufficientData(format!(
            "{} samples cannot be split with test size {} (train={}, test={})",
            n, test_size, n_train, n_test
        )));
    }
    Ok((n_train, n_test))
}

/// Shuffle row indices with `seed`, then take the test half from the front
pub fn train_test_split(
    x: &[Vec<f32>],
    y: &[bool],
    test_size: f64,
    seed: u64,
) -> Result<TrainTestSplit> {
    if x.len() != y.len() {
        return Err(YgoError::Parse(format!(
            "feature table has {} rows but target has {} labels",
            x.len(),
            y.len()
        )));
    }
    let n = x.len();
    if n < 2 {
        return Err(YgoError::InsufficientData(format!(
            "need at least 2 samples to split, got {}",
            n
        )));
    }
    let (n_train, n_test) = split_sizes(n, test_size)?;

    // Shuffle with seed for reproducibility
    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);

    let (test_idx, train_idx) = order.split_at(n_test);

    log::info!("Split {} samples: train={}, test={}", n, n_train, n_test);

    Ok(TrainTestSplit {
        x_train: train_idx.iter().map(|&i| x[i].clone()).collect(),
        y_train: train_idx.iter().map(|&i| y[i]).collect(),
        x_test: test_idx.iter().map(|&i| x[i].clone()).collect(),
        y_test: test_idx.iter().map(|&i| y[i]).collect(),
        test_indices: test_idx.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(n: usize) -> (Vec<Vec<f32>>, Vec<bool>) {
        let x = (0..n).map(|i| vec![i as f32]).collect();
        let y = (0..n).map(|i| i % 2 == 0).collect();
        (x, y)
    }

    #[test]
    fn test_sizes_round_test_half_up() {
        assert_eq!(split_sizes(10, 0.2).unwrap(), (8, 2));
        assert_eq!(split_sizes(2, 0.2).unwrap(), (1, 1));
        assert_eq!(split_sizes(7, 0.25).unwrap(), (5, 2));
    }

    #[test]
    fn test_invalid_sizes() {
        assert!(matches!(split_sizes(10, 0.0), Err(YgoError::Config(_))));
        assert!(matches!(split_sizes(10, 1.0), Err(YgoError::Config(_))));
        assert!(matches!(split_sizes(1, 0.5), Err(YgoError::InsufficientData(_))));
    }

    #[test]
    fn test_split_is_a_partition() {
        let (x, y) = data(10);
        let split = train_test_split(&x, &y, 0.3, 42).unwrap();
        assert_eq!(split.n_train(), 7);
        assert_eq!(split.n_test(), 3);

        let mut seen: Vec<usize> = split
            .x_train
            .iter()
            .chain(split.x_test.iter())
            .map(|r| r[0] as usize)
            .collect();
        seen.sort();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());

        for (row, &label) in split.x_test.iter().zip(&split.y_test) {
            assert_eq!(label, (row[0] as usize) % 2 == 0);
        }
    }

    #[test]
    fn test_same_seed_same_split() {
        let (x, y) = data(20);
        let a = train_test_split(&x, &y, 0.2, 7).unwrap();
        let b = train_test_split(&x, &y, 0.2, 7).unwrap();
        assert_eq!(a.test_indices, b.test_indices);
    }

    #[test]
    fn test_one_sample_is_insufficient() {
        let (x, y) = data(1);
        assert!(matches!(
            train_test_split(&x, &y, 0.2, 1),
            Err(YgoError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_length_mismatch() {
        let (x, _) = data(4);
        assert!(train_test_split(&x, &[true], 0.5, 1).is_err());
    }
}
