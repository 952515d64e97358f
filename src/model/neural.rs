//! Shared plumbing for the burn-backed classifiers

use burn::backend::{Autodiff, NdArray};
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use crate::{Result, YgoError};

/// CPU backend with autodiff for full-batch training
pub type TrainBackend = Autodiff<NdArray<f32>>;

/// Feature rows as a `[n, d]` tensor
pub fn rows_tensor<B: Backend>(x: &[Vec<f32>], device: &B::Device) -> Tensor<B, 2> {
    let n = x.len();
    let d = x.first().map(|r| r.len()).unwrap_or(0);
    let flat: Vec<f32> = x.iter().flatten().copied().collect();
    Tensor::<B, 1>::from_floats(flat.as_slice(), device).reshape([n, d])
}

/// Labels as a `[n, 1]` tensor of 0/1
pub fn labels_tensor<B: Backend>(y: &[bool], device: &B::Device) -> Tensor<B, 2> {
    let targets = super::as_targets(y);
    Tensor::<B, 1>::from_floats(targets.as_slice(), device).unsqueeze_dim::<2>(1)
}

/// Mean binary cross-entropy on probabilities
pub fn binary_cross_entropy<B: Backend>(probs: Tensor<B, 2>, targets: Tensor<B, 2>) -> Tensor<B, 1> {
    let eps = 1e-7;
    let probs_clamped = probs.clamp(eps, 1.0 - eps);
    let loss = targets.clone().neg() * probs_clamped.clone().log()
        - (targets.neg() + 1.0) * (probs_clamped.neg() + 1.0).log();
    loss.mean()
}

/// Threshold a `[n, 1]` probability tensor at 0.5
pub fn probabilities_to_labels<B: Backend>(probs: Tensor<B, 2>) -> Result<Vec<bool>> {
    let values = probs
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| YgoError::Model(format!("could not read predictions: {:?}", e)))?;
    Ok(values.into_iter().map(|p| p > 0.5).collect())
}

/// Fraction of thresholded probabilities matching the 0/1 targets
pub fn accuracy<B: Backend>(probs: &Tensor<B, 2>, targets: &[bool]) -> Result<f32> {
    let predicted = probabilities_to_labels(probs.clone())?;
    if predicted.is_empty() {
        return Ok(0.0);
    }
    let correct = predicted
        .iter()
        .zip(targets.iter())
        .filter(|(p, t)| p == t)
        .count();
    Ok(correct as f32 / predicted.len() as f32)
}
