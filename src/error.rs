
//! error.rs
//! One error type for the whole pipeline.
//! - load-time errors (missing file, bad schema) are fatal: the run aborts with a clear message
//! - per-node errors (insufficient history, predict-before-train) are node-scoped:
//!   the caller logs them and moves on to the next node
//! - socket errors surface as Protocol instead of an uncaught crash

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("input file not found: {0}")]
    MissingFile(String),

    #[error("required columns missing from CSV header: {}", .missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("insufficient data: no complete ({past}+{future})-step windows to train on")]
    InsufficientData { past: usize, future: usize },

    #[error("predict() called before train()")]
    NotTrained,

    #[error("socket transfer failed: {0}")]
    Protocol(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
