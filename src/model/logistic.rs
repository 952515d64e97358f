//! L2-regularised logistic regression on burn

use burn::nn::{Linear, LinearConfig};
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::tensor::activation::sigmoid;
use burn::tensor::backend::Backend;
use burn::tensor::ElementConversion;

use super::neural::{self, TrainBackend};
use super::Classifier;
use crate::Result;

const LEARNING_RATE: f64 = 0.05;

/// Single linear unit with a sigmoid output, trained full-batch with Adam.
/// The penalty is `|w|^2 / (2 C n)` on the mean log-loss.
pub struct LogisticRegression {
    c: f64,
    epochs: usize,
    seed: u64,
    model: Option<Linear<TrainBackend>>,
}

impl LogisticRegression {
    pub fn new(epochs: usize, seed: u64) -> Self {
        LogisticRegression {
            c: 1.0,
            epochs,
            seed,
            model: None,
        }
    }
}

impl Classifier for LogisticRegression {
    fn name(&self) -> &'static str {
        "logistic_regression"
    }

    fn fit(&mut self, x: &[Vec<f32>], y: &[bool]) -> Result<()> {
        super::check_training_data(self.name(), x, y)?;
        <TrainBackend as Backend>::seed(self.seed);

        let device = Default::default();
        let n = x.len();
        let d = x[0].len();
        let x_train = neural::rows_tensor::<TrainBackend>(x, &device);
        let y_train = neural::labels_tensor::<TrainBackend>(y, &device);

        let mut model: Linear<TrainBackend> = LinearConfig::new(d, 1).init(&device);
        let mut optimizer = AdamConfig::new().init();
        let penalty_scale = 1.0 / (2.0 * self.c * n as f64);

        for epoch in 0..self.epochs {
            let probs = sigmoid(model.forward(x_train.clone()));
            let penalty = model.weight.val().powf_scalar(2.0).sum() * penalty_scale;
            let loss = neural::binary_cross_entropy(probs, y_train.clone()) + penalty;

            if epoch % 50 == 0 || epoch + 1 == self.epochs {
                let loss_val: f32 = loss.clone().into_scalar().elem();
                log::debug!("logistic_regression epoch {}/{}: loss={:.4}", epoch + 1, self.epochs, loss_val);
            }

            let grads = loss.backward();
            let grads_params = GradientsParams::from_grads(grads, &model);
            model = optimizer.step(LEARNING_RATE, model, grads_params);
        }

        self.model = Some(model);
        Ok(())
    }

    fn predict(&self, x: &[Vec<f32>]) -> Result<Vec<bool>> {
        let model = super::fitted(&self.model, self.name())?;
        let device = Default::default();
        let probs = sigmoid(model.forward(neural::rows_tensor::<TrainBackend>(x, &device)));
        neural::probabilities_to_labels(probs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_learns_single_informative_feature() {
        let x: Vec<Vec<f32>> = (0..20)
            .map(|i| vec![if i % 2 == 0 { 1.0 } else { 0.0 }, 0.5])
            .collect();
        let y: Vec<bool> = (0..20).map(|i| i % 2 == 0).collect();

        let mut lr = LogisticRegression::new(200, 1);
        lr.fit(&x, &y).unwrap();
        assert_eq!(lr.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_predict_requires_fit() {
        let lr = LogisticRegression::new(10, 0);
        assert!(lr.predict(&[vec![1.0]]).is_err());
    }
}
