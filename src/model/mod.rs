//! The windowed price regressor.
//!
//! One LSTM layer (hidden width 32) over a univariate window of closing
//! prices, followed by a single linear output unit. Trained with shuffled
//! mini-batch Adam on mean-squared error; no validation split, schedule,
//! or early stopping.

mod adam;
mod dense;
mod lstm;

pub use adam::Adam;
pub use dense::Dense;
pub use lstm::Lstm;

use crate::error::PipelineError;
use ndarray::{Array1, Array3, Axis};
use rand::seq::SliceRandom;

pub const HIDDEN_SIZE: usize = 32;
pub const DEFAULT_EPOCHS: usize = 5;
pub const BATCH_SIZE: usize = 16;
const LEARNING_RATE: f32 = 0.001;

pub struct PriceModel {
    pub lstm: Lstm,
    pub head: Dense,
}

impl PriceModel {
    pub fn new() -> Self {
        Self {
            lstm: Lstm::new(1, HIDDEN_SIZE),
            head: Dense::new(HIDDEN_SIZE, 1),
        }
    }

    /// Trains in place for `epochs` full passes over the dataset in shuffled
    /// mini-batches of [`BATCH_SIZE`], printing one loss line per epoch.
    /// Returns the per-epoch mean loss history.
    ///
    /// An empty dataset is rejected outright rather than reporting a
    /// spurious successful fit.
    pub fn fit(
        &mut self,
        inputs: &Array3<f32>,
        targets: &Array1<f32>,
        epochs: usize,
    ) -> Result<Vec<f32>, PipelineError> {
        let n_samples = inputs.shape()[0];
        if n_samples == 0 || targets.is_empty() {
            return Err(PipelineError::EmptyDataset);
        }

        let mut opt_w_x = Adam::new(LEARNING_RATE);
        let mut opt_w_h = Adam::new(LEARNING_RATE);
        let mut opt_b = Adam::new(LEARNING_RATE);
        let mut opt_head_w = Adam::new(LEARNING_RATE);
        let mut opt_head_b = Adam::new(LEARNING_RATE);

        let mut rng = rand::rng();
        let mut order: Vec<usize> = (0..n_samples).collect();
        let mut history = Vec::with_capacity(epochs);

        for epoch in 0..epochs {
            order.shuffle(&mut rng);
            let mut epoch_loss = 0.0;

            for chunk in order.chunks(BATCH_SIZE) {
                let x_batch = inputs.select(Axis(0), chunk);
                let y_batch = targets.select(Axis(0), chunk).insert_axis(Axis(1));
                let batch = chunk.len();

                let (h_last, caches) = self.lstm.forward(x_batch.view());
                let predictions = self.head.forward(&h_last);

                let diff = &predictions - &y_batch;
                let loss = diff.mapv(|v| v * v).mean().unwrap_or(0.0);
                epoch_loss += loss * batch as f32;

                let d_pred = diff.mapv(|v| 2.0 * v / batch as f32);
                let (d_head_w, d_head_b, d_h_last) = self.head.backward(&h_last, &d_pred);
                let grads = self.lstm.backward(x_batch.view(), &caches, d_h_last);

                opt_w_x.apply_gradients(flat_mut(&mut self.lstm.w_x), flat(&grads.w_x));
                opt_w_h.apply_gradients(flat_mut(&mut self.lstm.w_h), flat(&grads.w_h));
                opt_b.apply_gradients(
                    self.lstm.b.as_slice_mut().expect("bias is contiguous"),
                    grads.b.as_slice().expect("bias gradient is contiguous"),
                );
                opt_head_w.apply_gradients(flat_mut(&mut self.head.weights), flat(&d_head_w));
                opt_head_b.apply_gradients(
                    self.head.biases.as_slice_mut().expect("bias is contiguous"),
                    d_head_b.as_slice().expect("bias gradient is contiguous"),
                );
            }

            let mean_loss = epoch_loss / n_samples as f32;
            history.push(mean_loss);
            println!("Epoch {}/{} - loss: {:.6}", epoch + 1, epochs, mean_loss);
        }

        Ok(history)
    }

    /// Scalar prediction per sample, `[batch, window, 1]` in, `[batch]` out.
    pub fn predict(&self, inputs: &Array3<f32>) -> Array1<f32> {
        let (h_last, _) = self.lstm.forward(inputs.view());
        let out = self.head.forward(&h_last);
        out.index_axis(Axis(1), 0).to_owned()
    }
}

impl Default for PriceModel {
    fn default() -> Self {
        Self::new()
    }
}

fn flat(arr: &ndarray::Array2<f32>) -> &[f32] {
    arr.as_slice().expect("owned weight tensors are contiguous")
}

fn flat_mut(arr: &mut ndarray::Array2<f32>) -> &mut [f32] {
    arr.as_slice_mut().expect("owned weight tensors are contiguous")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::make_windows;

    #[test]
    fn predict_is_finite_on_zero_input() {
        let model = PriceModel::new();
        let inputs = Array3::zeros((2, 10, 1));

        let out = model.predict(&inputs);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn fit_rejects_empty_dataset() {
        let mut model = PriceModel::new();
        let inputs = Array3::zeros((0, 10, 1));
        let targets = Array1::zeros(0);

        assert!(matches!(
            model.fit(&inputs, &targets, DEFAULT_EPOCHS),
            Err(PipelineError::EmptyDataset)
        ));
    }

    #[test]
    fn fit_reduces_loss_on_a_ramp() {
        let closes: Vec<f32> = (0..40).map(|i| i as f32 * 0.01).collect();
        let (inputs, targets) = make_windows(&closes, 5).unwrap();

        let mut model = PriceModel::new();
        let history = model.fit(&inputs, &targets, 40).unwrap();

        assert_eq!(history.len(), 40);
        assert!(history.iter().all(|l| l.is_finite()));
        assert!(
            history.last().unwrap() < history.first().unwrap(),
            "loss did not decrease: {:?}",
            history
        );
    }
}
