
//! features.rs
//! Derived load score for the load-prediction variant.
//!
//! `load = 0.5*(tx+rx)/max(tx_max, 1) + 0.3*(1-delay) + 0.2*(1-loss/100)`
//!
//! `tx_max` is the maximum tx throughput seen in the node's series; the
//! `max(.., 1)` guard keeps an all-zero series from dividing by zero. The
//! composite itself is NOT clamped to [0, 1]; only the model's sigmoid
//! output is bounded.

use ndarray::Array2;

use crate::pipeline::loader::NodeSeries;

/// Weighted composite of throughput, delay and loss.
pub fn compute_load(tx: f64, rx: f64, delay: f64, loss: f64, tx_max: f64) -> f64 {
    0.5 * (tx + rx) / tx_max.max(1.0) + 0.3 * (1.0 - delay) + 0.2 * (1.0 - loss / 100.0)
}

/// Builds the 5-column matrix [tx, rx, delay, loss, load] for one node.
/// The caller is expected to have sorted the series by time first.
pub fn load_matrix(series: &NodeSeries) -> Array2<f64> {
    let tx_max = series
        .records
        .iter()
        .map(|r| r.tx_bps)
        .fold(f64::NEG_INFINITY, f64::max);

    let mut m = Array2::zeros((series.len(), 5));
    for (i, rec) in series.records.iter().enumerate() {
        m[[i, 0]] = rec.tx_bps;
        m[[i, 1]] = rec.rx_bps;
        m[[i, 2]] = rec.avg_delay_s;
        m[[i, 3]] = rec.loss_pct;
        m[[i, 4]] = compute_load(rec.tx_bps, rec.rx_bps, rec.avg_delay_s, rec.loss_pct, tx_max);
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::loader::TrafficRecord;

    #[test]
    fn load_formula_matches_the_literal_arithmetic() {
        // 0.5*(150/100) + 0.3*0.8 + 0.2*0.9 = 0.75 + 0.24 + 0.18 = 1.17
        // (not clamped to [0,1] at this stage)
        let load = compute_load(100.0, 50.0, 0.2, 10.0, 100.0);
        assert!((load - 1.17).abs() < 1e-12, "load = {load}");
    }

    #[test]
    fn zero_tx_max_is_guarded() {
        let load = compute_load(0.0, 0.0, 0.0, 0.0, 0.0);
        // divisor clamps to 1, so the first term is 0, not NaN
        assert!((load - 0.5).abs() < 1e-12);
        assert!(!load.is_nan());
    }

    #[test]
    fn load_matrix_appends_the_derived_column() {
        let series = NodeSeries {
            node_id: 6,
            records: vec![
                TrafficRecord {
                    time_s: 0.0,
                    node_id: 6,
                    tx_bps: 100.0,
                    rx_bps: 50.0,
                    avg_delay_s: 0.2,
                    loss_pct: 10.0,
                },
                TrafficRecord {
                    time_s: 1.0,
                    node_id: 6,
                    tx_bps: 50.0,
                    rx_bps: 25.0,
                    avg_delay_s: 0.1,
                    loss_pct: 5.0,
                },
            ],
        };
        let m = load_matrix(&series);
        assert_eq!(m.shape(), &[2, 5]);
        // tx_max over the series is 100
        assert!((m[[0, 4]] - 1.17).abs() < 1e-12);
        assert!((m[[1, 4]] - (0.5 * 0.75 + 0.3 * 0.9 + 0.2 * 0.95)).abs() < 1e-12);
    }
}
