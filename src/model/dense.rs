use ndarray::{Array1, Array2, Axis};
use rand::Rng;

/// Fully connected layer, no activation.
pub struct Dense {
    pub weights: Array2<f32>, // [in, out]
    pub biases: Array1<f32>,  // [out]
}

impl Dense {
    pub fn new(input_size: usize, output_size: usize) -> Self {
        let limit = (6.0 / (input_size + output_size) as f32).sqrt();
        let mut rng = rand::rng();

        Self {
            weights: Array2::from_shape_fn((input_size, output_size), |_| {
                rng.random_range(-limit..limit)
            }),
            biases: Array1::zeros(output_size),
        }
    }

    pub fn forward(&self, input: &Array2<f32>) -> Array2<f32> {
        input.dot(&self.weights) + &self.biases
    }

    /// Returns `(d_weights, d_biases, d_input)` for the given upstream
    /// gradient.
    pub fn backward(
        &self,
        input: &Array2<f32>,
        d_output: &Array2<f32>,
    ) -> (Array2<f32>, Array1<f32>, Array2<f32>) {
        let d_weights = input.t().dot(d_output);
        let d_biases = d_output.sum_axis(Axis(0));
        let d_input = d_output.dot(&self.weights.t());
        (d_weights, d_biases, d_input)
    }
}
