//! Gaussian naive Bayes

use super::Classifier;
use crate::Result;

/// Variance floor as a fraction of the largest feature variance
const VAR_SMOOTHING: f64 = 1e-9;

#[derive(Debug, Clone)]
struct ClassModel {
    log_prior: f64,
    mean: Vec<f64>,
    var: Vec<f64>,
}

impl ClassModel {
    fn fit(rows: &[&Vec<f32>], n_total: usize, epsilon: f64) -> Self {
        let d = rows.first().map(|r| r.len()).unwrap_or(0);
        let n = rows.len() as f64;
        let mut mean = vec![0.0; d];
        for row in rows {
            for (m, &v) in mean.iter_mut().zip(row.iter()) {
                *m += v as f64 / n;
            }
        }
        let mut var = vec![0.0; d];
        for row in rows {
            for ((s, &v), m) in var.iter_mut().zip(row.iter()).zip(&mean) {
                *s += (v as f64 - m).powi(2) / n;
            }
        }
        var.iter_mut().for_each(|v| *v += epsilon);

        ClassModel {
            log_prior: (n / n_total as f64).ln(),
            mean,
            var,
        }
    }

    fn joint_log_likelihood(&self, row: &[f32]) -> f64 {
        let log_2pi = (2.0 * std::f64::consts::PI).ln();
        self.log_prior
            - 0.5
                * row
                    .iter()
                    .zip(self.mean.iter().zip(&self.var))
                    .map(|(&x, (m, v))| log_2pi + v.ln() + (x as f64 - m).powi(2) / v)
                    .sum::<f64>()
    }
}

/// Per-class independent normal likelihoods with empirical priors.
/// Equal posteriors predict `false`.
pub struct GaussianNaiveBayes {
    classes: Option<(ClassModel, ClassModel)>,
}

impl GaussianNaiveBayes {
    pub fn new() -> Self {
        GaussianNaiveBayes { classes: None }
    }
}

impl Default for GaussianNaiveBayes {
    fn default() -> Self {
        Self::new()
    }
}

fn max_feature_variance(x: &[Vec<f32>]) -> f64 {
    let n = x.len() as f64;
    let d = x[0].len();
    (0..d)
        .map(|j| {
            let mean = x.iter().map(|r| r[j] as f64).sum::<f64>() / n;
            x.iter().map(|r| (r[j] as f64 - mean).powi(2)).sum::<f64>() / n
        })
        .fold(0.0, f64::max)
}

impl Classifier for GaussianNaiveBayes {
    fn name(&self) -> &'static str {
        "naive_bayes"
    }

    fn fit(&mut self, x: &[Vec<f32>], y: &[bool]) -> Result<()> {
        super::check_training_data(self.name(), x, y)?;
        // Constant features would otherwise get zero variance
        let epsilon = (VAR_SMOOTHING * max_feature_variance(x)).max(VAR_SMOOTHING);

        let negatives: Vec<&Vec<f32>> = x.iter().zip(y).filter(|(_, &l)| !l).map(|(r, _)| r).collect();
        let positives: Vec<&Vec<f32>> = x.iter().zip(y).filter(|(_, &l)| l).map(|(r, _)| r).collect();
        if negatives.is_empty() || positives.is_empty() {
            return Err(crate::YgoError::InsufficientData(
                "naive_bayes needs both classes".to_string(),
            ));
        }

        self.classes = Some((
            ClassModel::fit(&negatives, x.len(), epsilon),
            ClassModel::fit(&positives, x.len(), epsilon),
        ));
        Ok(())
    }

    fn predict(&self, x: &[Vec<f32>]) -> Result<Vec<bool>> {
        let (negative, positive) = super::fitted(&self.classes, self.name())?;
        Ok(x.iter()
            .map(|row| positive.joint_log_likelihood(row) > negative.joint_log_likelihood(row))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separates_gaussian_blobs() {
        let x = vec![
            vec![0.0, 0.1],
            vec![0.2, 0.0],
            vec![0.1, 0.2],
            vec![3.0, 3.1],
            vec![3.2, 2.9],
            vec![2.9, 3.0],
        ];
        let y = vec![false, false, false, true, true, true];
        let mut nb = GaussianNaiveBayes::new();
        nb.fit(&x, &y).unwrap();
        assert_eq!(
            nb.predict(&[vec![0.1, 0.1], vec![3.0, 3.0]]).unwrap(),
            vec![false, true]
        );
    }

    #[test]
    fn test_constant_features_do_not_break_fit() {
        let x = vec![vec![1.0, 0.0], vec![1.0, 1.0], vec![1.0, 0.0], vec![1.0, 1.0]];
        let y = vec![false, true, false, true];
        let mut nb = GaussianNaiveBayes::new();
        nb.fit(&x, &y).unwrap();
        assert_eq!(nb.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_single_class_rejected() {
        let mut nb = GaussianNaiveBayes::new();
        assert!(nb.fit(&[vec![0.0], vec![1.0]], &[true, true]).is_err());
    }
}
