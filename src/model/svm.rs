//! Support vector classifier with an RBF kernel
//!
//! Trained with simplified SMO (random second multiplier). Labels are
//! mapped to -1/+1; a positive decision value predicts `true`.

use super::Classifier;
use crate::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const TOLERANCE: f64 = 1e-3;
const MAX_PASSES: usize = 10;
const MAX_ITERATIONS: usize = 2000;

struct SupportVectors {
    vectors: Vec<Vec<f32>>,
    /// alpha_i * y_i
    coefficients: Vec<f64>,
    bias: f64,
    gamma: f64,
}

impl SupportVectors {
    fn decision(&self, row: &[f32]) -> f64 {
        self.vectors
            .iter()
            .zip(&self.coefficients)
            .map(|(v, c)| c * rbf(v, row, self.gamma))
            .sum::<f64>()
            + self.bias
    }
}

fn rbf(a: &[f32], b: &[f32], gamma: f64) -> f64 {
    let d: f64 = a.iter().zip(b).map(|(x, y)| ((x - y) as f64).powi(2)).sum();
    (-gamma * d).exp()
}

/// `1 / (n_features * var(X))`, falling back to 1 for constant data
pub fn scale_gamma(x: &[Vec<f32>]) -> f64 {
    let values: Vec<f64> = x.iter().flatten().map(|&v| v as f64).collect();
    let d = x.first().map(|r| r.len()).unwrap_or(0);
    if values.is_empty() || d == 0 {
        return 1.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    if var > 0.0 {
        1.0 / (d as f64 * var)
    } else {
        1.0
    }
}

pub struct SupportVectorClassifier {
    c: f64,
    seed: u64,
    model: Option<SupportVectors>,
}

impl SupportVectorClassifier {
    pub fn new(c: f64, seed: u64) -> Self {
        SupportVectorClassifier {
            c,
            seed,
            model: None,
        }
    }
}

impl Classifier for SupportVectorClassifier {
    fn name(&self) -> &'static str {
        "svc"
    }

    fn fit(&mut self, x: &[Vec<f32>], y: &[bool]) -> Result<()> {
        super::check_training_data(self.name(), x, y)?;
        let n = x.len();
        if n < 2 {
            return Err(crate::YgoError::InsufficientData(
                "svc needs at least two samples".to_string(),
            ));
        }

        let gamma = scale_gamma(x);
        let labels: Vec<f64> = y.iter().map(|&l| if l { 1.0 } else { -1.0 }).collect();
        let kernel: Vec<Vec<f64>> = x
            .iter()
            .map(|a| x.iter().map(|b| rbf(a, b, gamma)).collect())
            .collect();

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut alpha = vec![0.0f64; n];
        let mut bias = 0.0f64;
        let c = self.c;

        let output = |alpha: &[f64], bias: f64, i: usize| -> f64 {
            (0..n).map(|k| alpha[k] * labels[k] * kernel[k][i]).sum::<f64>() + bias
        };

        let mut passes = 0;
        let mut iterations = 0;
        while passes < MAX_PASSES && iterations < MAX_ITERATIONS {
            iterations += 1;
            let mut changed = 0;

            for i in 0..n {
                let e_i = output(&alpha, bias, i) - labels[i];
                let violates = (labels[i] * e_i < -TOLERANCE && alpha[i] < c)
                    || (labels[i] * e_i > TOLERANCE && alpha[i] > 0.0);
                if !violates {
                    continue;
                }

                let mut j = rng.gen_range(0..n - 1);
                if j >= i {
                    j += 1;
                }
                let e_j = output(&alpha, bias, j) - labels[j];
                let (a_i_old, a_j_old) = (alpha[i], alpha[j]);

                let (low, high) = if labels[i] != labels[j] {
                    ((a_j_old - a_i_old).max(0.0), (c + a_j_old - a_i_old).min(c))
                } else {
                    ((a_i_old + a_j_old - c).max(0.0), (a_i_old + a_j_old).min(c))
                };
                if (high - low).abs() < 1e-12 {
                    continue;
                }

                let eta = 2.0 * kernel[i][j] - kernel[i][i] - kernel[j][j];
                if eta >= 0.0 {
                    continue;
                }

                let a_j = (a_j_old - labels[j] * (e_i - e_j) / eta).clamp(low, high);
                if (a_j - a_j_old).abs() < 1e-5 {
                    continue;
                }
                let a_i = a_i_old + labels[i] * labels[j] * (a_j_old - a_j);
                alpha[i] = a_i;
                alpha[j] = a_j;

                let b1 = bias
                    - e_i
                    - labels[i] * (a_i - a_i_old) * kernel[i][i]
                    - labels[j] * (a_j - a_j_old) * kernel[i][j];
                let b2 = bias
                    - e_j
                    - labels[i] * (a_i - a_i_old) * kernel[i][j]
                    - labels[j] * (a_j - a_j_old) * kernel[j][j];
                bias = if a_i > 0.0 && a_i < c {
                    b1
                } else if a_j > 0.0 && a_j < c {
                    b2
                } else {
                    (b1 + b2) / 2.0
                };
                changed += 1;
            }

            passes = if changed == 0 { passes + 1 } else { 0 };
        }

        let (vectors, coefficients): (Vec<Vec<f32>>, Vec<f64>) = alpha
            .iter()
            .enumerate()
            .filter(|(_, &a)| a > 1e-8)
            .map(|(i, &a)| (x[i].clone(), a * labels[i]))
            .unzip();
        log::debug!(
            "svc: {} support vectors after {} sweeps (gamma {:.4})",
            vectors.len(),
            iterations,
            gamma
        );

        self.model = Some(SupportVectors {
            vectors,
            coefficients,
            bias,
            gamma,
        });
        Ok(())
    }

    fn predict(&self, x: &[Vec<f32>]) -> Result<Vec<bool>> {
        let model = super::fitted(&self.model, self.name())?;
        Ok(x.iter().map(|row| model.decision(row) > 0.0).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gamma_scale() {
        let x = vec![vec![0.0, 2.0], vec![0.0, 2.0]];
        // values 0,2,0,2: variance 1, two features
        assert!((scale_gamma(&x) - 0.5).abs() < 1e-12);
        assert_eq!(scale_gamma(&[vec![1.0], vec![1.0]]), 1.0);
    }

    #[test]
    fn test_separates_clusters() {
        let x = vec![
            vec![0.0, 0.0],
            vec![0.5, 0.0],
            vec![0.0, 0.5],
            vec![4.0, 4.0],
            vec![4.5, 4.0],
            vec![4.0, 4.5],
        ];
        let y = vec![false, false, false, true, true, true];
        let mut svc = SupportVectorClassifier::new(1.0, 1);
        svc.fit(&x, &y).unwrap();
        assert_eq!(svc.predict(&x).unwrap(), y);
    }
}
