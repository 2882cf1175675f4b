
//! lstm.rs
//! Minimal LSTM layer with backpropagation through time.
//!
//! Weights for the four gates live in one combined matrix `W: 4H x (I+H)`
//! applied to the concatenated `[x_t; h_{t-1}]` vector, gate order
//! [input, forget, cell, output]. The forget-gate bias slice starts at 1.0
//! so early training does not immediately flush the cell state.
//!
//! `forward` caches every per-step activation; `backward` walks the cache in
//! reverse and returns parameter gradients plus dL/dx per step, which is the
//! dL/dh sequence of the layer below when layers are stacked.

use ndarray::{s, Array1, Array2};
use rand::random_range;

/// One recurrent layer.
#[derive(Debug, Clone)]
pub struct LstmLayer {
    pub input_size: usize,
    pub hidden_size: usize,
    /// `4H x (I+H)`, rows grouped [i, f, g, o].
    pub weights: Array2<f64>,
    /// `4H`, grouped like `weights`.
    pub biases: Array1<f64>,
}

/// Per-step activations kept from a forward pass, consumed by `backward`.
#[derive(Debug, Clone)]
pub struct LstmCache {
    /// concatenated `[x_t; h_{t-1}]` per step
    zs: Vec<Array1<f64>>,
    /// activated gates (i, f, g, o) per step
    gates: Vec<[Array1<f64>; 4]>,
    /// cell state per step
    cs: Vec<Array1<f64>>,
    /// tanh(c_t) per step
    tanh_cs: Vec<Array1<f64>>,
    /// hidden state per step
    hs: Vec<Array1<f64>>,
}

impl LstmCache {
    pub fn hidden_states(&self) -> &[Array1<f64>] {
        &self.hs
    }

    pub fn last_hidden(&self) -> &Array1<f64> {
        &self.hs[self.hs.len() - 1]
    }
}

/// Parameter gradients accumulated over one mini-batch.
#[derive(Debug, Clone)]
pub struct LstmGrads {
    pub d_weights: Array2<f64>,
    pub d_biases: Array1<f64>,
}

impl LstmGrads {
    pub fn zeros_like(layer: &LstmLayer) -> Self {
        Self {
            d_weights: Array2::zeros(layer.weights.dim()),
            d_biases: Array1::zeros(layer.biases.len()),
        }
    }

    pub fn accumulate(&mut self, other: &LstmGrads) {
        self.d_weights += &other.d_weights;
        self.d_biases += &other.d_biases;
    }

    pub fn scale(&mut self, factor: f64) {
        self.d_weights *= factor;
        self.d_biases *= factor;
    }
}

fn sigmoid(x: &Array1<f64>) -> Array1<f64> {
    x.mapv(|v| 1.0 / (1.0 + (-v).exp()))
}

fn concat(x: &Array1<f64>, h: &Array1<f64>) -> Array1<f64> {
    let mut z = Array1::zeros(x.len() + h.len());
    z.slice_mut(s![..x.len()]).assign(x);
    z.slice_mut(s![x.len()..]).assign(h);
    z
}

impl LstmLayer {
    /// Uniform init in ±sqrt(1/hidden); forget-gate biases start at 1.0.
    pub fn new(input_size: usize, hidden_size: usize) -> Self {
        let limit = (1.0 / hidden_size as f64).sqrt();
        let weights = Array2::from_shape_fn((4 * hidden_size, input_size + hidden_size), |_| {
            random_range(-limit..limit)
        });
        let mut biases = Array1::zeros(4 * hidden_size);
        biases
            .slice_mut(s![hidden_size..2 * hidden_size])
            .fill(1.0);

        Self {
            input_size,
            hidden_size,
            weights,
            biases,
        }
    }

    /// Runs the layer over a full sequence from zero initial state.
    pub fn forward(&self, xs: &[Array1<f64>]) -> LstmCache {
        let hsz = self.hidden_size;
        let mut cache = LstmCache {
            zs: Vec::with_capacity(xs.len()),
            gates: Vec::with_capacity(xs.len()),
            cs: Vec::with_capacity(xs.len()),
            tanh_cs: Vec::with_capacity(xs.len()),
            hs: Vec::with_capacity(xs.len()),
        };

        let mut h_prev = Array1::zeros(hsz);
        let mut c_prev = Array1::zeros(hsz);

        for x in xs {
            let z = concat(x, &h_prev);
            let a = self.weights.dot(&z) + &self.biases;

            let i = sigmoid(&a.slice(s![..hsz]).to_owned());
            let f = sigmoid(&a.slice(s![hsz..2 * hsz]).to_owned());
            let g = a.slice(s![2 * hsz..3 * hsz]).mapv(f64::tanh);
            let o = sigmoid(&a.slice(s![3 * hsz..]).to_owned());

            let c = &f * &c_prev + &i * &g;
            let tanh_c = c.mapv(f64::tanh);
            let h = &o * &tanh_c;

            cache.zs.push(z);
            cache.gates.push([i, f, g, o]);
            cache.cs.push(c.clone());
            cache.tanh_cs.push(tanh_c);
            cache.hs.push(h.clone());

            h_prev = h;
            c_prev = c;
        }

        cache
    }

    /// Backpropagation through time.
    ///
    /// `d_hs[t]` is dL/dh_t injected from above (zero vectors where the loss
    /// does not touch a step). Returns the parameter gradients and dL/dx_t
    /// per step.
    pub fn backward(&self, cache: &LstmCache, d_hs: &[Array1<f64>]) -> (LstmGrads, Vec<Array1<f64>>) {
        let hsz = self.hidden_size;
        let steps = cache.hs.len();
        let mut grads = LstmGrads::zeros_like(self);
        let mut d_xs = vec![Array1::zeros(self.input_size); steps];

        let mut dh_rec: Array1<f64> = Array1::zeros(hsz);
        let mut dc_rec: Array1<f64> = Array1::zeros(hsz);

        for t in (0..steps).rev() {
            let [i, f, g, o] = &cache.gates[t];
            let tanh_c = &cache.tanh_cs[t];
            let c_prev = if t == 0 {
                Array1::zeros(hsz)
            } else {
                cache.cs[t - 1].clone()
            };

            let dh = &d_hs[t] + &dh_rec;

            let d_o = &dh * tanh_c;
            let da_o = &d_o * o * &o.mapv(|v| 1.0 - v);

            let dc = &dc_rec + &(&dh * o * &tanh_c.mapv(|v| 1.0 - v * v));

            let d_f = &dc * &c_prev;
            let da_f = &d_f * f * &f.mapv(|v| 1.0 - v);

            let d_i = &dc * g;
            let da_i = &d_i * i * &i.mapv(|v| 1.0 - v);

            let d_g = &dc * i;
            let da_g = &d_g * &g.mapv(|v| 1.0 - v * v);

            // stack gate pre-activation gradients in [i, f, g, o] order
            let mut da = Array1::zeros(4 * hsz);
            da.slice_mut(s![..hsz]).assign(&da_i);
            da.slice_mut(s![hsz..2 * hsz]).assign(&da_f);
            da.slice_mut(s![2 * hsz..3 * hsz]).assign(&da_g);
            da.slice_mut(s![3 * hsz..]).assign(&da_o);

            grads
                .d_weights
                .scaled_add(1.0, &crate::model::layers::outer(&da, &cache.zs[t]));
            grads.d_biases += &da;

            let dz = self.weights.t().dot(&da);
            d_xs[t] = dz.slice(s![..self.input_size]).to_owned();
            dh_rec = dz.slice(s![self.input_size..]).to_owned();
            dc_rec = &dc * f;
        }

        (grads, d_xs)
    }
}
