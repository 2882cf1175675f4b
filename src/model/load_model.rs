
//! load_model.rs
//! Single-target load forecaster: one LSTM encoder over the raw metric
//! window, final hidden state only, dense head squashed by sigmoid (the
//! derived load target is a bounded capacity score).
//!
//! Unlike the multi-feature variant this one shuffles mini-batch order each
//! epoch. The windows themselves are cut before shuffling, so no future row
//! ever leaks into an input window.

use ndarray::{Array1, Array2};
use log::debug;
use rand::seq::SliceRandom;

use crate::error::{PipelineError, Result};
use crate::model::layers::{Activation, Dense, DenseGrads};
use crate::model::lstm::{LstmGrads, LstmLayer};
use crate::model::optim::{Adam, MomentMatrix, MomentVector};
use crate::model::ModelState;
use crate::pipeline::window::WindowSample;

/// Knobs of the load variant. Defaults: 80-step history, 30-step horizon,
/// hidden 32, 10 epochs, batch 32, lr 1e-3.
#[derive(Debug, Clone)]
pub struct LoadPredictorConfig {
    pub seq_length: usize,
    pub pred_length: usize,
    pub feature_count: usize,
    pub hidden_size: usize,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
}

impl Default for LoadPredictorConfig {
    fn default() -> Self {
        Self {
            seq_length: 80,
            pred_length: 30,
            feature_count: 4,
            hidden_size: 32,
            epochs: 10,
            batch_size: 32,
            learning_rate: 1e-3,
        }
    }
}

pub struct LoadPredictor {
    pub cfg: LoadPredictorConfig,
    encoder: LstmLayer,
    head: Dense,
    state: ModelState,
}

impl LoadPredictor {
    pub fn new(cfg: LoadPredictorConfig) -> Self {
        let encoder = LstmLayer::new(cfg.feature_count, cfg.hidden_size);
        let head = Dense::new(cfg.hidden_size, cfg.pred_length, Activation::Sigmoid);
        Self {
            cfg,
            encoder,
            head,
            state: ModelState::Untrained,
        }
    }

    pub fn state(&self) -> ModelState {
        self.state
    }

    /// Trains from scratch; returns the mean loss per epoch.
    pub fn train(&mut self, samples: &[WindowSample]) -> Result<Vec<f64>> {
        if samples.is_empty() {
            return Err(PipelineError::InsufficientData {
                past: self.cfg.seq_length,
                future: self.cfg.pred_length,
            });
        }

        self.encoder = LstmLayer::new(self.cfg.feature_count, self.cfg.hidden_size);
        self.head = Dense::new(self.cfg.hidden_size, self.cfg.pred_length, Activation::Sigmoid);

        let mut adam = Adam::new(self.cfg.learning_rate);
        let mut enc_slot = (
            MomentMatrix::zeros_like(&self.encoder.weights),
            MomentVector::zeros_like(&self.encoder.biases),
        );
        let mut head_slot = (
            MomentMatrix::zeros_like(&self.head.weights),
            MomentVector::zeros_like(&self.head.biases),
        );

        let mut order: Vec<usize> = (0..samples.len()).collect();
        let mut rng = rand::rng();

        let mut epoch_losses = Vec::with_capacity(self.cfg.epochs);
        for epoch in 0..self.cfg.epochs {
            order.shuffle(&mut rng);

            let mut loss_sum = 0.0;
            let mut batches = 0usize;
            for chunk in order.chunks(self.cfg.batch_size) {
                loss_sum += self.batch_step(samples, chunk, &mut adam, &mut enc_slot, &mut head_slot);
                batches += 1;
            }
            let mean = loss_sum / batches as f64;
            epoch_losses.push(mean);
            debug!("epoch {}/{}: mean loss {:.6}", epoch + 1, self.cfg.epochs, mean);
        }

        self.state = ModelState::Trained;
        Ok(epoch_losses)
    }

    /// Predicts the next `pred_length` load values (each in [0, 1] via the
    /// sigmoid head) from one `seq_length x feature_count` window.
    pub fn predict(&self, input: &Array2<f64>) -> Result<Array1<f64>> {
        if self.state != ModelState::Trained {
            return Err(PipelineError::NotTrained);
        }
        let (_, pred) = self.forward(input);
        Ok(pred)
    }

    fn forward(&self, input: &Array2<f64>) -> (crate::model::lstm::LstmCache, Array1<f64>) {
        let xs: Vec<Array1<f64>> = input.rows().into_iter().map(|r| r.to_owned()).collect();
        let cache = self.encoder.forward(&xs);
        let pred = self.head.forward(cache.last_hidden());
        (cache, pred)
    }

    fn batch_step(
        &mut self,
        samples: &[WindowSample],
        chunk: &[usize],
        adam: &mut Adam,
        enc_slot: &mut (MomentMatrix, MomentVector),
        head_slot: &mut (MomentMatrix, MomentVector),
    ) -> f64 {
        let mut enc_grads = LstmGrads::zeros_like(&self.encoder);
        let mut head_grads = DenseGrads::zeros_like(&self.head);
        let mut loss_sum = 0.0;

        for &idx in chunk {
            let sample = &samples[idx];
            let (cache, pred) = self.forward(&sample.input);
            let target = Array1::from_iter(sample.target.iter().copied());

            let diff = &pred - &target;
            let n = pred.len() as f64;
            loss_sum += diff.iter().map(|v| v * v).sum::<f64>() / n;
            let d_pred = diff * (2.0 / n);

            let (hg, d_h_last) = self.head.backward(cache.last_hidden(), &pred, &d_pred);
            head_grads.accumulate(&hg);

            // only the final hidden state feeds the head
            let steps = sample.input.nrows();
            let mut d_hs = vec![Array1::zeros(self.cfg.hidden_size); steps];
            d_hs[steps - 1] = d_h_last;
            let (g, _) = self.encoder.backward(&cache, &d_hs);
            enc_grads.accumulate(&g);
        }

        let scale = 1.0 / chunk.len() as f64;
        enc_grads.scale(scale);
        head_grads.scale(scale);

        adam.begin_step();
        adam.update_matrix(&mut enc_slot.0, &mut self.encoder.weights, &enc_grads.d_weights);
        adam.update_vector(&mut enc_slot.1, &mut self.encoder.biases, &enc_grads.d_biases);
        adam.update_matrix(&mut head_slot.0, &mut self.head.weights, &head_grads.d_weights);
        adam.update_vector(&mut head_slot.1, &mut self.head.biases, &head_grads.d_biases);

        loss_sum * scale
    }
}
