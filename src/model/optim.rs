
//! optim.rs
//! Adam (adaptive moment estimation) parameter updates.
//!
//! One `Adam` carries the hyperparameters and the shared step counter; each
//! parameter tensor owns its own moment state. `begin_step` is called once
//! per mini-batch so the bias correction sees a consistent `t` across all
//! tensors updated in that batch.

use ndarray::{Array1, Array2};

#[derive(Debug, Clone)]
pub struct Adam {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    t: i32,
}

/// First/second moment buffers for a matrix parameter.
#[derive(Debug, Clone)]
pub struct MomentMatrix {
    m: Array2<f64>,
    v: Array2<f64>,
}

/// First/second moment buffers for a vector parameter.
#[derive(Debug, Clone)]
pub struct MomentVector {
    m: Array1<f64>,
    v: Array1<f64>,
}

impl MomentMatrix {
    pub fn zeros_like(param: &Array2<f64>) -> Self {
        Self {
            m: Array2::zeros(param.dim()),
            v: Array2::zeros(param.dim()),
        }
    }
}

impl MomentVector {
    pub fn zeros_like(param: &Array1<f64>) -> Self {
        Self {
            m: Array1::zeros(param.len()),
            v: Array1::zeros(param.len()),
        }
    }
}

impl Adam {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            t: 0,
        }
    }

    /// Advances the shared timestep. Call once per mini-batch, before the
    /// per-tensor updates.
    pub fn begin_step(&mut self) {
        self.t += 1;
    }

    pub fn update_matrix(&self, state: &mut MomentMatrix, param: &mut Array2<f64>, grad: &Array2<f64>) {
        state.m = &state.m * self.beta1 + grad * (1.0 - self.beta1);
        state.v = &state.v * self.beta2 + &(grad * grad) * (1.0 - self.beta2);

        let m_hat = &state.m / (1.0 - self.beta1.powi(self.t));
        let v_hat = &state.v / (1.0 - self.beta2.powi(self.t));

        *param = &*param - &(&m_hat * self.learning_rate / &(v_hat.mapv(f64::sqrt) + self.epsilon));
    }

    pub fn update_vector(&self, state: &mut MomentVector, param: &mut Array1<f64>, grad: &Array1<f64>) {
        state.m = &state.m * self.beta1 + grad * (1.0 - self.beta1);
        state.v = &state.v * self.beta2 + &(grad * grad) * (1.0 - self.beta2);

        let m_hat = &state.m / (1.0 - self.beta1.powi(self.t));
        let v_hat = &state.v / (1.0 - self.beta2.powi(self.t));

        *param = &*param - &(&m_hat * self.learning_rate / &(v_hat.mapv(f64::sqrt) + self.epsilon));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn first_step_moves_param_by_roughly_the_learning_rate() {
        // With bias correction, the very first Adam step is ~lr * sign(grad).
        let mut adam = Adam::new(0.01);
        let mut param = arr2(&[[1.0]]);
        let mut state = MomentMatrix::zeros_like(&param);
        adam.begin_step();
        adam.update_matrix(&mut state, &mut param, &arr2(&[[2.5]]));
        assert!((param[[0, 0]] - (1.0 - 0.01)).abs() < 1e-6, "param = {}", param[[0, 0]]);
    }

    #[test]
    fn repeated_steps_descend_a_quadratic() {
        // minimize f(x) = (x - 3)^2 starting at 0
        let mut adam = Adam::new(0.05);
        let mut param = arr2(&[[0.0]]);
        let mut state = MomentMatrix::zeros_like(&param);
        for _ in 0..500 {
            let grad = arr2(&[[2.0 * (param[[0, 0]] - 3.0)]]);
            adam.begin_step();
            adam.update_matrix(&mut state, &mut param, &grad);
        }
        assert!((param[[0, 0]] - 3.0).abs() < 0.1, "param = {}", param[[0, 0]]);
    }
}
