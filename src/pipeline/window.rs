
//! window.rs
//! Sliding-window sample construction and the ordered train/test split.
//!
//! The split never shuffles: samples are time-windowed, and shuffling before
//! splitting would leak future rows into the training set. Callers that want
//! shuffled mini-batches shuffle *after* the samples are built.

use ndarray::{s, Array2};

/// Paired (past, future) windows cut from one node's matrix.
#[derive(Debug, Clone)]
pub struct WindowSample {
    /// `past_steps x feature_count`
    pub input: Array2<f64>,
    /// `future_steps x target_count`
    pub target: Array2<f64>,
}

/// Cuts every `(past_steps, future_steps)` window pair out of `matrix`.
///
/// Produces one sample per start index `i` in `0 ..= len - past - future`:
/// input `matrix[i .. i+past]`, target `matrix[i+past .. i+past+future]`
/// (contiguous, target immediately after input). A matrix shorter than
/// `past + future` rows yields an empty vec. That is a valid outcome, not
/// an error; the forecaster reports insufficient data instead of training.
pub fn make_windows(matrix: &Array2<f64>, past_steps: usize, future_steps: usize) -> Vec<WindowSample> {
    let rows = matrix.nrows();
    let span = past_steps + future_steps;
    if rows < span {
        return Vec::new();
    }

    let mut samples = Vec::with_capacity(rows - span + 1);
    for i in 0..=(rows - span) {
        samples.push(WindowSample {
            input: matrix.slice(s![i..i + past_steps, ..]).to_owned(),
            target: matrix
                .slice(s![i + past_steps..i + span, ..])
                .to_owned(),
        });
    }
    samples
}

/// Window variant for the load model: the input is the first four columns
/// (the raw metrics), the target is the last column (the derived load) over
/// the future span, shaped `future_steps x 1`.
pub fn make_load_windows(matrix: &Array2<f64>, past_steps: usize, future_steps: usize) -> Vec<WindowSample> {
    let rows = matrix.nrows();
    let last = matrix.ncols() - 1;
    let span = past_steps + future_steps;
    if rows < span {
        return Vec::new();
    }

    let mut samples = Vec::with_capacity(rows - span + 1);
    for i in 0..=(rows - span) {
        samples.push(WindowSample {
            input: matrix.slice(s![i..i + past_steps, ..last]).to_owned(),
            target: matrix
                .slice(s![i + past_steps..i + span, last..])
                .to_owned(),
        });
    }
    samples
}

/// Splits the ordered samples into a training prefix and a test suffix.
/// `train_ratio` defaults to 0.8 at the call sites. Order is preserved.
pub fn split_train_test(
    samples: Vec<WindowSample>,
    train_ratio: f64,
) -> (Vec<WindowSample>, Vec<WindowSample>) {
    let train_len = ((samples.len() as f64) * train_ratio).floor() as usize;
    let mut train = samples;
    let test = train.split_off(train_len);
    (train, test)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    /// Matrix whose row `i` is `[i, i, i, i]`, so windows are easy to check.
    fn ramp(rows: usize, cols: usize) -> Array2<f64> {
        Array2::from_shape_fn((rows, cols), |(r, _)| r as f64)
    }

    #[test]
    fn sample_count_follows_the_window_law() {
        // 30 rows, past 20, future 4 -> exactly 7 samples
        let samples = make_windows(&ramp(30, 4), 20, 4);
        assert_eq!(samples.len(), 7);
    }

    #[test]
    fn short_matrix_yields_zero_samples_without_error() {
        let samples = make_windows(&ramp(10, 4), 20, 4);
        assert!(samples.is_empty());
        // boundary: exactly past + future rows -> one sample
        let samples = make_windows(&ramp(24, 4), 20, 4);
        assert_eq!(samples.len(), 1);
    }

    #[test]
    fn target_window_immediately_follows_its_input_window() {
        let samples = make_windows(&ramp(30, 4), 20, 4);
        for (i, sample) in samples.iter().enumerate() {
            assert_eq!(sample.input.nrows(), 20);
            assert_eq!(sample.target.nrows(), 4);
            // first input row is the start index, first target row is start + past
            assert_eq!(sample.input[[0, 0]], i as f64);
            assert_eq!(sample.input[[19, 0]], (i + 19) as f64);
            assert_eq!(sample.target[[0, 0]], (i + 20) as f64);
            assert_eq!(sample.target[[3, 0]], (i + 23) as f64);
        }
    }

    #[test]
    fn load_windows_split_features_from_the_load_column() {
        // 5 columns: 4 metrics + derived load (load column = row * 10)
        let m = Array2::from_shape_fn((30, 5), |(r, c)| {
            if c == 4 { r as f64 * 10.0 } else { r as f64 }
        });
        let samples = make_load_windows(&m, 20, 4);
        assert_eq!(samples.len(), 7);
        assert_eq!(samples[0].input.shape(), &[20, 4]);
        assert_eq!(samples[0].target.shape(), &[4, 1]);
        assert_eq!(samples[0].target[[0, 0]], 200.0);
    }

    #[test]
    fn split_preserves_temporal_order() {
        let samples = make_windows(&ramp(30, 4), 20, 4);
        let (train, test) = split_train_test(samples, 0.8);
        assert_eq!(train.len(), 5);
        assert_eq!(test.len(), 2);
        // last training sample starts before the first test sample
        let last_train_start = train.last().unwrap().input[[0, 0]];
        let first_test_start = test.first().unwrap().input[[0, 0]];
        assert!(last_train_start < first_test_start);
    }
}
