//! Single-layer LSTM with full backpropagation through time.
//!
//! Gate weights are packed along the first axis in i/f/g/o order (input
//! gate, forget gate, cell candidate, output gate), so `w_x` is
//! `[4 * hidden, input]`, `w_h` is `[4 * hidden, hidden]` and `b` is
//! `[4 * hidden]`. Per timestep:
//!
//! ```text
//! i = sigmoid(x W_xi^T + h W_hi^T + b_i)
//! f = sigmoid(x W_xf^T + h W_hf^T + b_f)
//! g = tanh   (x W_xg^T + h W_hg^T + b_g)
//! o = sigmoid(x W_xo^T + h W_ho^T + b_o)
//! c = f * c_prev + i * g
//! h = o * tanh(c)
//! ```

use ndarray::{Array1, Array2, ArrayView2, ArrayView3, Axis, s};
use rand::Rng;

pub struct Lstm {
    pub input_size: usize,
    pub hidden_size: usize,
    pub w_x: Array2<f32>,
    pub w_h: Array2<f32>,
    pub b: Array1<f32>,
}

/// Per-timestep activations kept for the backward pass.
pub struct StepCache {
    i: Array2<f32>,
    f: Array2<f32>,
    g: Array2<f32>,
    o: Array2<f32>,
    tanh_c: Array2<f32>,
    h_prev: Array2<f32>,
    c_prev: Array2<f32>,
}

pub struct LstmGrads {
    pub w_x: Array2<f32>,
    pub w_h: Array2<f32>,
    pub b: Array1<f32>,
}

fn sigmoid(x: ArrayView2<f32>) -> Array2<f32> {
    x.mapv(|v| 1.0 / (1.0 + (-v).exp()))
}

impl Lstm {
    /// Uniform init in ±1/sqrt(hidden), forget-gate bias starting at 1.0.
    pub fn new(input_size: usize, hidden_size: usize) -> Self {
        let limit = (1.0 / hidden_size as f32).sqrt();
        let mut rng = rand::rng();
        let mut init = |rows: usize, cols: usize| {
            Array2::from_shape_fn((rows, cols), |_| rng.random_range(-limit..limit))
        };

        let w_x = init(4 * hidden_size, input_size);
        let w_h = init(4 * hidden_size, hidden_size);

        let mut b = Array1::zeros(4 * hidden_size);
        b.slice_mut(s![hidden_size..2 * hidden_size]).fill(1.0);

        Self {
            input_size,
            hidden_size,
            w_x,
            w_h,
            b,
        }
    }

    /// Runs a `[batch, seq, input]` block through the sequence. Returns the
    /// final hidden state `[batch, hidden]` and the per-step caches needed
    /// by [`Lstm::backward`].
    pub fn forward(&self, x: ArrayView3<f32>) -> (Array2<f32>, Vec<StepCache>) {
        let (batch, seq_len, _) = x.dim();
        let hd = self.hidden_size;

        let mut h: Array2<f32> = Array2::zeros((batch, hd));
        let mut c: Array2<f32> = Array2::zeros((batch, hd));
        let mut caches = Vec::with_capacity(seq_len);

        for t in 0..seq_len {
            let x_t = x.slice(s![.., t, ..]);
            let pre = x_t.dot(&self.w_x.t()) + h.dot(&self.w_h.t()) + &self.b;

            let i = sigmoid(pre.slice(s![.., 0..hd]));
            let f = sigmoid(pre.slice(s![.., hd..2 * hd]));
            let g = pre.slice(s![.., 2 * hd..3 * hd]).mapv(f32::tanh);
            let o = sigmoid(pre.slice(s![.., 3 * hd..4 * hd]));

            let c_next = &f * &c + &i * &g;
            let tanh_c = c_next.mapv(f32::tanh);
            let h_next = &o * &tanh_c;

            caches.push(StepCache {
                i,
                f,
                g,
                o,
                tanh_c,
                h_prev: h,
                c_prev: c,
            });
            h = h_next;
            c = c_next;
        }

        (h, caches)
    }

    /// Backpropagation through time over one batch. `d_h_last` is the loss
    /// gradient with respect to the final hidden state.
    pub fn backward(
        &self,
        x: ArrayView3<f32>,
        caches: &[StepCache],
        d_h_last: Array2<f32>,
    ) -> LstmGrads {
        let (batch, _, _) = x.dim();
        let hd = self.hidden_size;

        let mut grads = LstmGrads {
            w_x: Array2::zeros(self.w_x.raw_dim()),
            w_h: Array2::zeros(self.w_h.raw_dim()),
            b: Array1::zeros(self.b.raw_dim()),
        };

        let mut d_h = d_h_last;
        let mut d_c: Array2<f32> = Array2::zeros((batch, hd));

        for (t, cache) in caches.iter().enumerate().rev() {
            let x_t = x.slice(s![.., t, ..]);

            // h = o * tanh(c): both branches feed d_c and the output gate.
            d_c = d_c + &d_h * &cache.o * cache.tanh_c.mapv(|v| 1.0 - v * v);
            let d_o = &d_h * &cache.tanh_c;

            // c = f * c_prev + i * g
            let d_i = &d_c * &cache.g;
            let d_f = &d_c * &cache.c_prev;
            let d_g = &d_c * &cache.i;

            // Through the gate nonlinearities to pre-activation space.
            let d_i_pre = d_i * &cache.i * cache.i.mapv(|v| 1.0 - v);
            let d_f_pre = d_f * &cache.f * cache.f.mapv(|v| 1.0 - v);
            let d_g_pre = d_g * cache.g.mapv(|v| 1.0 - v * v);
            let d_o_pre = d_o * &cache.o * cache.o.mapv(|v| 1.0 - v);

            let mut d_gates = Array2::zeros((batch, 4 * hd));
            d_gates.slice_mut(s![.., 0..hd]).assign(&d_i_pre);
            d_gates.slice_mut(s![.., hd..2 * hd]).assign(&d_f_pre);
            d_gates.slice_mut(s![.., 2 * hd..3 * hd]).assign(&d_g_pre);
            d_gates.slice_mut(s![.., 3 * hd..4 * hd]).assign(&d_o_pre);

            grads.w_x += &d_gates.t().dot(&x_t);
            grads.w_h += &d_gates.t().dot(&cache.h_prev);
            grads.b += &d_gates.sum_axis(Axis(0));

            d_h = d_gates.dot(&self.w_h);
            d_c = d_c * &cache.f;
        }

        grads
    }
}
