
//! # Network Traffic Forecasting Pipeline
//!
//! Offline analysis of simulated network-traffic logs: per-node metric
//! forecasting and derived-load prediction over a sliding-window dataset.
//!
//! ## Pipeline
//! Loader → Normalizer → Windower → Forecaster → inverse Normalizer → report.
//! Each node's series is processed independently and sequentially; nothing is
//! shared between nodes (scalers included).
//!
//! ## Stages
//! - **Loader:** CSV traffic log → validated per-node series.
//! - **Normalizer:** per-feature min/max scaling, invertible per node.
//! - **Windower:** (past, future) window pairs + ordered train/test split.
//! - **Forecaster:** stacked-LSTM metric forecaster and single-target load
//!   predictor, MSE + Adam, trained from scratch per node.
//!
//! The socket receiver (`net`) feeds the same loader from a TCP byte stream;
//! the `amplification` binary aggregates MPI rank logs separately.

pub mod error;
pub mod pipeline;
pub mod model;
pub mod net;
pub mod utils;

pub use error::{PipelineError, Result};
