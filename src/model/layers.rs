
//! layers.rs
//! Dense projection layer and its activations.

use ndarray::{Array1, Array2};
use rand::random_range;

/// Output activation of a dense layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Linear,
    Sigmoid,
}

impl Activation {
    pub fn apply(&self, x: f64) -> f64 {
        match self {
            Activation::Linear => x,
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
        }
    }

    /// Derivative expressed through the activated output `y` (cheaper than
    /// re-evaluating the pre-activation).
    pub fn derivative_from_output(&self, y: f64) -> f64 {
        match self {
            Activation::Linear => 1.0,
            Activation::Sigmoid => y * (1.0 - y),
        }
    }
}

/// Fully connected layer: `y = act(W x + b)`, weights `out x in`.
#[derive(Debug, Clone)]
pub struct Dense {
    pub weights: Array2<f64>,
    pub biases: Array1<f64>,
    pub activation: Activation,
}

/// Parameter gradients accumulated over one mini-batch.
#[derive(Debug, Clone)]
pub struct DenseGrads {
    pub d_weights: Array2<f64>,
    pub d_biases: Array1<f64>,
}

impl Dense {
    /// Uniform init in ±sqrt(1/input_size), biases zero.
    pub fn new(input_size: usize, output_size: usize, activation: Activation) -> Self {
        let limit = (1.0 / input_size as f64).sqrt();
        Self {
            weights: Array2::from_shape_fn((output_size, input_size), |_| {
                random_range(-limit..limit)
            }),
            biases: Array1::zeros(output_size),
            activation,
        }
    }

    pub fn forward(&self, x: &Array1<f64>) -> Array1<f64> {
        let z = self.weights.dot(x) + &self.biases;
        z.mapv(|v| self.activation.apply(v))
    }

    /// Backward pass for one sample.
    /// `x` is the forward input, `y` the activated output, `d_out` = dL/dy.
    /// Returns the parameter gradients and dL/dx.
    pub fn backward(
        &self,
        x: &Array1<f64>,
        y: &Array1<f64>,
        d_out: &Array1<f64>,
    ) -> (DenseGrads, Array1<f64>) {
        let mut dz = d_out.clone();
        for (v, &yv) in dz.iter_mut().zip(y.iter()) {
            *v *= self.activation.derivative_from_output(yv);
        }

        let d_weights = outer(&dz, x);
        let d_x = self.weights.t().dot(&dz);
        (
            DenseGrads {
                d_weights,
                d_biases: dz,
            },
            d_x,
        )
    }
}

impl DenseGrads {
    pub fn zeros_like(layer: &Dense) -> Self {
        Self {
            d_weights: Array2::zeros(layer.weights.dim()),
            d_biases: Array1::zeros(layer.biases.len()),
        }
    }

    pub fn accumulate(&mut self, other: &DenseGrads) {
        self.d_weights += &other.d_weights;
        self.d_biases += &other.d_biases;
    }

    pub fn scale(&mut self, factor: f64) {
        self.d_weights *= factor;
        self.d_biases *= factor;
    }
}

/// Column vector times row vector.
pub fn outer(a: &Array1<f64>, b: &Array1<f64>) -> Array2<f64> {
    let mut m = Array2::zeros((a.len(), b.len()));
    for (i, &av) in a.iter().enumerate() {
        for (j, &bv) in b.iter().enumerate() {
            m[[i, j]] = av * bv;
        }
    }
    m
}
