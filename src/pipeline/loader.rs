
//! loader.rs
//! Parses a simulation traffic log (CSV text) into per-node series.
//! - schema is validated up front: every missing required column is named in the error
//! - row order within a node is preserved exactly as it appeared in the source
//! - node ids are reported in first-seen order
//!
//! The loader does not care where the bytes came from: a file on disk and a
//! payload received over a socket go through the same `parse_csv` path.

use std::path::Path;

use ndarray::Array2;
use serde::Deserialize;
use log::{info, debug};

use crate::error::{PipelineError, Result};

/// Required CSV columns, case-sensitive (the simulator writes these names).
pub const REQUIRED_COLUMNS: [&str; 6] = [
    "Time(s)",
    "NodeID",
    "TxThroughput(bps)",
    "RxThroughput(bps)",
    "AvgDelay(s)",
    "LossRate(%)",
];

/// One observation row of the traffic log.
#[derive(Debug, Clone, Deserialize)]
pub struct TrafficRecord {
    #[serde(rename = "Time(s)")]
    pub time_s: f64,
    #[serde(rename = "NodeID")]
    pub node_id: u32,
    #[serde(rename = "TxThroughput(bps)")]
    pub tx_bps: f64,
    #[serde(rename = "RxThroughput(bps)")]
    pub rx_bps: f64,
    #[serde(rename = "AvgDelay(s)")]
    pub avg_delay_s: f64,
    #[serde(rename = "LossRate(%)")]
    pub loss_pct: f64,
}

/// Whole parsed log, row order as in the source.
#[derive(Debug, Clone, Default)]
pub struct TrafficLog {
    pub records: Vec<TrafficRecord>,
}

/// One node's slice of the log, row order preserved.
#[derive(Debug, Clone)]
pub struct NodeSeries {
    pub node_id: u32,
    pub records: Vec<TrafficRecord>,
}

/// Loads and parses a traffic log from disk.
/// A missing file is a fatal `MissingFile` error, not a bare I/O error,
/// so the operator sees the offending path immediately.
pub fn load_file(path: &Path) -> Result<TrafficLog> {
    if !path.exists() {
        return Err(PipelineError::MissingFile(path.display().to_string()));
    }
    let text = std::fs::read_to_string(path)?;
    let log = parse_csv(&text)?;
    info!("loaded {} rows from {}", log.records.len(), path.display());
    Ok(log)
}

/// Parses CSV text into a `TrafficLog`.
/// Header validation happens before any row is deserialized: the error lists
/// every required column that is absent, not just the first one.
pub fn parse_csv(text: &str) -> Result<TrafficLog> {
    let mut reader = csv::Reader::from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|col| !headers.iter().any(|h| h == **col))
        .map(|col| col.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::Schema { missing });
    }

    let mut records = Vec::new();
    for row in reader.deserialize::<TrafficRecord>() {
        records.push(row?);
    }
    debug!("parsed {} traffic records", records.len());

    Ok(TrafficLog { records })
}

impl TrafficLog {
    /// Distinct node ids in first-seen order.
    pub fn node_ids(&self) -> Vec<u32> {
        let mut ids = Vec::new();
        for rec in &self.records {
            if !ids.contains(&rec.node_id) {
                ids.push(rec.node_id);
            }
        }
        ids
    }

    /// All rows belonging to one node, source order preserved.
    pub fn node_series(&self, node_id: u32) -> NodeSeries {
        NodeSeries {
            node_id,
            records: self
                .records
                .iter()
                .filter(|r| r.node_id == node_id)
                .cloned()
                .collect(),
        }
    }

    /// Partitions the log into per-node series, one per distinct id,
    /// in first-seen order.
    pub fn partition(&self) -> Vec<NodeSeries> {
        self.node_ids()
            .into_iter()
            .map(|id| self.node_series(id))
            .collect()
    }
}

impl NodeSeries {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Stable sort by timestamp. The load-prediction path sorts before
    /// windowing; the per-node forecast path trusts source order.
    pub fn sort_by_time(&mut self) {
        self.records
            .sort_by(|a, b| a.time_s.total_cmp(&b.time_s));
    }

    /// Timestamps column, in current row order.
    pub fn times(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.time_s).collect()
    }

    /// The four metric columns as an `n x 4` matrix:
    /// [tx_bps, rx_bps, avg_delay_s, loss_pct].
    pub fn feature_matrix(&self) -> Array2<f64> {
        let mut m = Array2::zeros((self.records.len(), 4));
        for (i, rec) in self.records.iter().enumerate() {
            m[[i, 0]] = rec.tx_bps;
            m[[i, 1]] = rec.rx_bps;
            m[[i, 2]] = rec.avg_delay_s;
            m[[i, 3]] = rec.loss_pct;
        }
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "Time(s),NodeID,TxThroughput(bps),RxThroughput(bps),AvgDelay(s),LossRate(%)";

    fn sample_csv() -> String {
        let mut s = String::from(HEADER);
        s.push('\n');
        // node 2 appears before node 1: first-seen order must be [2, 1]
        s.push_str("0.0,2,100.0,50.0,0.01,0.5\n");
        s.push_str("0.0,1,200.0,80.0,0.02,1.0\n");
        s.push_str("1.0,2,110.0,55.0,0.01,0.4\n");
        s.push_str("1.0,1,210.0,85.0,0.02,0.9\n");
        s
    }

    #[test]
    fn parses_rows_and_partitions_in_first_seen_order() {
        let log = parse_csv(&sample_csv()).unwrap();
        assert_eq!(log.records.len(), 4);
        assert_eq!(log.node_ids(), vec![2, 1]);

        let parts = log.partition();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].node_id, 2);
        assert_eq!(parts[0].len(), 2);
        assert_eq!(parts[0].records[0].tx_bps, 100.0);
        assert_eq!(parts[0].records[1].tx_bps, 110.0);
    }

    #[test]
    fn schema_error_names_every_missing_column() {
        let text = "Time(s),NodeID,TxThroughput(bps)\n0.0,1,100.0\n";
        match parse_csv(text) {
            Err(PipelineError::Schema { missing }) => {
                assert_eq!(
                    missing,
                    vec![
                        "RxThroughput(bps)".to_string(),
                        "AvgDelay(s)".to_string(),
                        "LossRate(%)".to_string(),
                    ]
                );
            }
            other => panic!("expected Schema error, got {:?}", other.map(|l| l.records.len())),
        }
    }

    #[test]
    fn missing_file_is_reported_with_its_path() {
        let err = load_file(Path::new("does/not/exist.csv")).unwrap_err();
        match err {
            PipelineError::MissingFile(p) => assert!(p.contains("exist.csv")),
            other => panic!("expected MissingFile, got {other}"),
        }
    }

    #[test]
    fn load_file_round_trips_through_disk() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(sample_csv().as_bytes()).unwrap();
        let log = load_file(tmp.path()).unwrap();
        assert_eq!(log.records.len(), 4);
    }

    #[test]
    fn feature_matrix_has_metric_columns_in_order() {
        let log = parse_csv(&sample_csv()).unwrap();
        let series = log.node_series(1);
        let m = series.feature_matrix();
        assert_eq!(m.shape(), &[2, 4]);
        assert_eq!(m[[0, 0]], 200.0);
        assert_eq!(m[[0, 1]], 80.0);
        assert_eq!(m[[0, 2]], 0.02);
        assert_eq!(m[[0, 3]], 1.0);
    }

    #[test]
    fn sort_by_time_orders_out_of_order_rows() {
        let text = format!(
            "{HEADER}\n3.0,1,3.0,0.0,0.0,0.0\n1.0,1,1.0,0.0,0.0,0.0\n2.0,1,2.0,0.0,0.0,0.0\n"
        );
        let log = parse_csv(&text).unwrap();
        let mut series = log.node_series(1);
        series.sort_by_time();
        assert_eq!(series.times(), vec![1.0, 2.0, 3.0]);
    }
}
