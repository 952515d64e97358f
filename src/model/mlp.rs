//! Two-hidden-layer perceptron
//!
//! Architecture: Input(d) → Hidden1(64) → ReLU
//!                        → Hidden2(32) → ReLU
//!                        → win_head(1)

use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::tensor::activation::{relu, sigmoid};
use burn::tensor::backend::Backend;
use burn::tensor::{ElementConversion, Tensor};

use super::neural::{self, TrainBackend};
use super::Classifier;
use crate::Result;

/// Configuration for the MLP classifier
#[derive(Debug, Clone)]
pub struct MlpConfig {
    /// Hidden layer widths
    pub hidden_dims: [usize; 2],
    pub epochs: usize,
    pub learning_rate: f64,
}

impl Default for MlpConfig {
    fn default() -> Self {
        MlpConfig {
            hidden_dims: [64, 32],
            epochs: 500,
            learning_rate: 1e-3,
        }
    }
}

#[derive(Module, Debug)]
pub struct MlpNet<B: Backend> {
    hidden1: Linear<B>,
    hidden2: Linear<B>,
    win_head: Linear<B>,
}

impl<B: Backend> MlpNet<B> {
    pub fn new(device: &B::Device, input_dim: usize, hidden_dims: [usize; 2]) -> Self {
        MlpNet {
            hidden1: LinearConfig::new(input_dim, hidden_dims[0]).init(device),
            hidden2: LinearConfig::new(hidden_dims[0], hidden_dims[1]).init(device),
            win_head: LinearConfig::new(hidden_dims[1], 1).init(device),
        }
    }

    /// Win logit `[batch, 1]`
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = relu(self.hidden1.forward(x));
        let x = relu(self.hidden2.forward(x));
        self.win_head.forward(x)
    }
}

pub struct MlpClassifier {
    config: MlpConfig,
    seed: u64,
    model: Option<MlpNet<TrainBackend>>,
}

impl MlpClassifier {
    pub fn new(config: MlpConfig, seed: u64) -> Self {
        MlpClassifier {
            config,
            seed,
            model: None,
        }
    }
}

impl Classifier for MlpClassifier {
    fn name(&self) -> &'static str {
        "mlp"
    }

    fn fit(&mut self, x: &[Vec<f32>], y: &[bool]) -> Result<()> {
        super::check_training_data(self.name(), x, y)?;
        <TrainBackend as Backend>::seed(self.seed);

        let device = Default::default();
        let x_train = neural::rows_tensor::<TrainBackend>(x, &device);
        let y_train = neural::labels_tensor::<TrainBackend>(y, &device);

        let mut model = MlpNet::<TrainBackend>::new(&device, x[0].len(), self.config.hidden_dims);
        let mut optimizer = AdamConfig::new().init();
        let epochs = self.config.epochs;

        log::debug!("Starting MLP training for {} epochs", epochs);

        for epoch in 0..epochs {
            let probs = sigmoid(model.forward(x_train.clone()));
            let loss = neural::binary_cross_entropy(probs.clone(), y_train.clone());

            if epoch % 100 == 0 || epoch + 1 == epochs {
                let loss_val: f32 = loss.clone().into_scalar().elem();
                let train_acc = neural::accuracy(&probs, y)?;
                log::debug!(
                    "Epoch {}/{}: loss={:.4}, train_acc={:.1}%",
                    epoch + 1,
                    epochs,
                    loss_val,
                    train_acc * 100.0
                );
            }

            let grads = loss.backward();
            let grads_params = GradientsParams::from_grads(grads, &model);
            model = optimizer.step(self.config.learning_rate, model, grads_params);
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
    use burn::backend::NdArray;

    #[test]
    fn test_forward_shape() {
        let device = Default::default();
        let net = MlpNet::<NdArray<f32>>::new(&device, 4, [8, 4]);
        let x = neural::rows_tensor::<NdArray<f32>>(&[vec![0.0; 4], vec![1.0; 4], vec![0.5; 4]], &device);
        assert_eq!(net.forward(x).dims(), [3, 1]);
    }

    #[test]
    fn test_fits_separable_data() {
        let x: Vec<Vec<f32>> = (0..16)
            .map(|i| vec![if i < 8 { 0.0 } else { 1.0 }, (i % 4) as f32 / 4.0])
            .collect();
        let y: Vec<bool> = (0..16).map(|i| i >= 8).collect();

        let config = MlpConfig {
            learning_rate: 1e-2,
            epochs: 200,
            ..MlpConfig::default()
        };
        let mut mlp = MlpClassifier::new(config, 1);
        mlp.fit(&x, &y).unwrap();
        assert_eq!(mlp.predict(&x).unwrap(), y);
    }
}
