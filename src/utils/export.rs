
//! export.rs
//! Forecast reporting: per-node CSV exports and actual-vs-predicted figures.
//!
//! Outputs:
//! - `data/forecasts/forecast_node_X.csv` — one row per (window, future step)
//!   in original units, after the node's scaler inverted the normalization.
//! - `data/figures/*.svg` — actual vs predicted line chart for one series.

use std::fs::create_dir_all;
use std::path::Path;

use csv::Writer;
use plotters::prelude::*;
use serde::Serialize;
use log::{info, error};

use crate::error::Result;

/// One predicted future row, already inverse-transformed to original units.
#[derive(Debug, Clone, Serialize)]
pub struct ForecastRow {
    pub node_id: u32,
    /// Timestamp of the prediction origin (last observed row of the window).
    pub origin_time_s: f64,
    /// 1-based future step offset.
    pub step: usize,
    pub tx_bps: f64,
    pub rx_bps: f64,
    pub avg_delay_s: f64,
    pub loss_pct: f64,
}

/// Writes forecast rows for one node; creates the parent directory if needed.
pub fn export_forecast_csv(path: &Path, rows: &[ForecastRow]) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }

    let mut writer = Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    info!("exported {} forecast rows to {}", rows.len(), path.display());
    Ok(())
}

/// Draws actual vs predicted series into an SVG figure.
/// Both series are (time, value) points.
pub fn plot_forecast_svg(
    path: &Path,
    title: &str,
    actual: &[(f64, f64)],
    predicted: &[(f64, f64)],
) {
    if let Some(parent) = path.parent() {
        if let Err(e) = create_dir_all(parent) {
            error!("failed to create figure directory: {e}");
            return;
        }
    }

    let all = actual.iter().chain(predicted.iter());
    let (mut min_x, mut max_x) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut min_y, mut max_y) = (f64::INFINITY, f64::NEG_INFINITY);
    for &(x, y) in all {
        min_x = min_x.min(x);
        max_x = max_x.max(x);
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }
    if !min_x.is_finite() {
        error!("nothing to plot for {title}");
        return;
    }
    let max_x = max_x.max(min_x + 1e-6);
    let max_y = max_y.max(min_y + 1e-6);

    let path_str = path.display().to_string();
    let root = SVGBackend::new(&path_str, (1200, 600)).into_drawing_area();
    root.fill(&WHITE).ok();

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(30)
        .y_label_area_size(60)
        .build_cartesian_2d(min_x..max_x, min_y..max_y)
        .unwrap();
    chart.configure_mesh().draw().unwrap();

    chart
        .draw_series(LineSeries::new(actual.iter().copied(), &BLUE))
        .unwrap()
        .label("Actual")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));
    chart
        .draw_series(LineSeries::new(predicted.iter().copied(), &RED))
        .unwrap()
        .label("Predicted")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));

    chart
        .configure_series_labels()
        .background_style(&WHITE)
        .border_style(&BLACK)
        .draw()
        .unwrap();

    root.present().ok();
    info!("figure written to {}", path.display());
}
