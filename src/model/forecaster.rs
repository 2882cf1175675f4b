
//! forecaster.rs
//! Multi-feature forecaster: maps a `past_steps x 4` window of scaled
//! metrics to a `future_steps x 4` prediction.
//!
//! Architecture: two stacked LSTM layers, dense projection from the final
//! hidden state of the top layer to `future_steps * feature_count` values.
//! Trained with MSE + Adam over ordered mini-batches (the train/test split
//! already happened upstream; batches are not shuffled here).

use ndarray::{Array1, Array2};
use log::debug;

use crate::error::{PipelineError, Result};
use crate::model::layers::{Activation, Dense, DenseGrads};
use crate::model::lstm::{LstmCache, LstmGrads, LstmLayer};
use crate::model::optim::{Adam, MomentMatrix, MomentVector};
use crate::model::ModelState;
use crate::pipeline::window::WindowSample;

/// All knobs of the multi-feature variant. Defaults: 20/4 window, hidden 50,
/// two layers, 50 epochs, batch 32, lr 1e-3.
#[derive(Debug, Clone)]
pub struct ForecasterConfig {
    pub past_steps: usize,
    pub future_steps: usize,
    pub feature_count: usize,
    pub hidden_size: usize,
    pub num_layers: usize,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub train_ratio: f64,
}

impl Default for ForecasterConfig {
    fn default() -> Self {
        Self {
            past_steps: 20,
            future_steps: 4,
            feature_count: 4,
            hidden_size: 50,
            num_layers: 2,
            epochs: 50,
            batch_size: 32,
            learning_rate: 1e-3,
            train_ratio: 0.8,
        }
    }
}

pub struct MetricForecaster {
    pub cfg: ForecasterConfig,
    layers: Vec<LstmLayer>,
    head: Dense,
    state: ModelState,
}

/// Adam moment buffers, one pair per parameter tensor.
struct OptimSlots {
    lstm: Vec<(MomentMatrix, MomentVector)>,
    head: (MomentMatrix, MomentVector),
}

impl MetricForecaster {
    pub fn new(cfg: ForecasterConfig) -> Self {
        let (layers, head) = Self::fresh_parameters(&cfg);
        Self {
            cfg,
            layers,
            head,
            state: ModelState::Untrained,
        }
    }

    pub fn state(&self) -> ModelState {
        self.state
    }

    fn fresh_parameters(cfg: &ForecasterConfig) -> (Vec<LstmLayer>, Dense) {
        let depth = cfg.num_layers.max(1);
        let mut layers = vec![LstmLayer::new(cfg.feature_count, cfg.hidden_size)];
        for _ in 1..depth {
            layers.push(LstmLayer::new(cfg.hidden_size, cfg.hidden_size));
        }
        let head = Dense::new(
            cfg.hidden_size,
            cfg.future_steps * cfg.feature_count,
            Activation::Linear,
        );
        (layers, head)
    }

    /// Trains from scratch on the ordered sample sequence and returns the
    /// mean loss per epoch. An empty sample set is a node-scoped
    /// `InsufficientData` error, never a panic.
    pub fn train(&mut self, samples: &[WindowSample]) -> Result<Vec<f64>> {
        if samples.is_empty() {
            return Err(PipelineError::InsufficientData {
                past: self.cfg.past_steps,
                future: self.cfg.future_steps,
            });
        }

        // not resumable: every call restarts from fresh parameters
        let (layers, head) = Self::fresh_parameters(&self.cfg);
        self.layers = layers;
        self.head = head;

        let mut adam = Adam::new(self.cfg.learning_rate);
        let mut slots = OptimSlots {
            lstm: self
                .layers
                .iter()
                .map(|l| {
                    (
                        MomentMatrix::zeros_like(&l.weights),
                        MomentVector::zeros_like(&l.biases),
                    )
                })
                .collect(),
            head: (
                MomentMatrix::zeros_like(&self.head.weights),
                MomentVector::zeros_like(&self.head.biases),
            ),
        };

        let mut epoch_losses = Vec::with_capacity(self.cfg.epochs);
        for epoch in 0..self.cfg.epochs {
            let mut loss_sum = 0.0;
            let mut batches = 0usize;
            for batch in samples.chunks(self.cfg.batch_size) {
                loss_sum += self.batch_step(batch, &mut adam, &mut slots);
                batches += 1;
            }
            let mean = loss_sum / batches as f64;
            epoch_losses.push(mean);
            debug!("epoch {}/{}: mean loss {:.6}", epoch + 1, self.cfg.epochs, mean);
        }

        self.state = ModelState::Trained;
        Ok(epoch_losses)
    }

    /// Predicts one `future_steps x feature_count` window (still in scaled
    /// units; the caller inverts normalization with the node's own scaler).
    pub fn predict(&self, input: &Array2<f64>) -> Result<Array2<f64>> {
        if self.state != ModelState::Trained {
            return Err(PipelineError::NotTrained);
        }

        let (_, flat) = self.forward_stack(input);
        let feat = self.cfg.feature_count;
        let mut out = Array2::zeros((self.cfg.future_steps, feat));
        for (idx, &v) in flat.iter().enumerate() {
            out[[idx / feat, idx % feat]] = v;
        }
        Ok(out)
    }

    /// Runs the window through every LSTM layer, then the dense head on the
    /// final hidden state. Returns the per-layer caches for backprop and the
    /// flat prediction.
    fn forward_stack(&self, input: &Array2<f64>) -> (Vec<LstmCache>, Array1<f64>) {
        let mut xs: Vec<Array1<f64>> = input.rows().into_iter().map(|r| r.to_owned()).collect();
        let mut caches = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            let cache = layer.forward(&xs);
            xs = cache.hidden_states().to_vec();
            caches.push(cache);
        }
        let pred = self.head.forward(caches[caches.len() - 1].last_hidden());
        (caches, pred)
    }

    /// One mini-batch: accumulate gradients over the batch, average, apply a
    /// single Adam update. Returns the mean per-sample MSE of the batch.
    fn batch_step(&mut self, batch: &[WindowSample], adam: &mut Adam, slots: &mut OptimSlots) -> f64 {
        let mut layer_grads: Vec<LstmGrads> =
            self.layers.iter().map(LstmGrads::zeros_like).collect();
        let mut head_grads = DenseGrads::zeros_like(&self.head);
        let mut loss_sum = 0.0;

        for sample in batch {
            let (caches, pred) = self.forward_stack(&sample.input);
            // targets flatten row-major: future steps outer, features inner
            let target = Array1::from_iter(sample.target.iter().copied());

            let diff = &pred - &target;
            let n = pred.len() as f64;
            loss_sum += diff.iter().map(|v| v * v).sum::<f64>() / n;
            let d_pred = diff * (2.0 / n);

            let top = self.layers.len() - 1;
            let (hg, d_h_last) = self.head.backward(caches[top].last_hidden(), &pred, &d_pred);
            head_grads.accumulate(&hg);

            // the loss only touches the final step of the top layer; lower
            // layers receive gradients at every step through d_xs
            let steps = sample.input.nrows();
            let mut d_hs = vec![Array1::zeros(self.cfg.hidden_size); steps];
            d_hs[steps - 1] = d_h_last;
            for l in (0..self.layers.len()).rev() {
                let (g, d_xs) = self.layers[l].backward(&caches[l], &d_hs);
                layer_grads[l].accumulate(&g);
                d_hs = d_xs;
            }
        }

        let scale = 1.0 / batch.len() as f64;
        for g in &mut layer_grads {
            g.scale(scale);
        }
        head_grads.scale(scale);

        adam.begin_step();
        for (layer, (grads, (mw, mb))) in self
            .layers
            .iter_mut()
            .zip(layer_grads.iter().zip(slots.lstm.iter_mut()))
        {
            adam.update_matrix(mw, &mut layer.weights, &grads.d_weights);
            adam.update_vector(mb, &mut layer.biases, &grads.d_biases);
        }
        adam.update_matrix(&mut slots.head.0, &mut self.head.weights, &head_grads.d_weights);
        adam.update_vector(&mut slots.head.1, &mut self.head.biases, &head_grads.d_biases);

        loss_sum * scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::window::make_windows;
    use ndarray::Array2;

    fn tiny_config() -> ForecasterConfig {
        ForecasterConfig {
            past_steps: 4,
            future_steps: 2,
            feature_count: 2,
            hidden_size: 8,
            num_layers: 2,
            epochs: 60,
            batch_size: 8,
            learning_rate: 0.02,
            train_ratio: 0.8,
        }
    }

    #[test]
    fn predict_before_train_is_rejected() {
        let model = MetricForecaster::new(tiny_config());
        let input = Array2::zeros((4, 2));
        match model.predict(&input) {
            Err(PipelineError::NotTrained) => {}
            other => panic!("expected NotTrained, got {:?}", other.map(|m| m.shape().to_vec())),
        }
    }

    #[test]
    fn empty_sample_set_is_insufficient_data_not_a_crash() {
        let mut model = MetricForecaster::new(tiny_config());
        match model.train(&[]) {
            Err(PipelineError::InsufficientData { past: 4, future: 2 }) => {}
            other => panic!("expected InsufficientData, got {:?}", other.is_ok()),
        }
        assert_eq!(model.state(), ModelState::Untrained);
    }

    #[test]
    fn training_on_a_constant_series_converges_toward_it() {
        let mut model = MetricForecaster::new(tiny_config());
        let matrix = Array2::from_elem((20, 2), 0.5);
        let samples = make_windows(&matrix, 4, 2);
        assert_eq!(samples.len(), 15);

        let losses = model.train(&samples).unwrap();
        assert_eq!(losses.len(), 60);
        assert!(
            losses[losses.len() - 1] < losses[0],
            "loss did not decrease: first {} last {}",
            losses[0],
            losses[losses.len() - 1]
        );
        assert!(losses[losses.len() - 1] < 0.05);
        assert_eq!(model.state(), ModelState::Trained);

        let pred = model.predict(&samples[0].input).unwrap();
        assert_eq!(pred.shape(), &[2, 2]);
        for &v in pred.iter() {
            assert!((v - 0.5).abs() < 0.2, "prediction {v} far from 0.5");
        }
    }
}
