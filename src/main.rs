
//! # Traffic Forecast Entry Point
//! Drives the Loader → Normalizer → Windower → Forecaster pipeline over a
//! simulated network-traffic log.
//!
//! ## Modes
//! - **File forecast:** parse a CSV log from disk, train and predict per node.
//! - **Socket forecast:** receive the CSV over one TCP connection, then the
//!   same per-node pipeline.
//! - **Load prediction:** derived-load forecast for a single node (sorted by
//!   time, 80-step history → 30-step horizon).
//!
//! ## Error policy
//! - File/schema errors are fatal for the run: reported, nothing trained.
//! - Per-node errors (insufficient history) are logged and the remaining
//!   nodes still run.
//!
//! ## Outputs
//! - `data/forecasts/forecast_node_X.csv` — per-node predictions in original units.
//! - `data/figures/*.svg` — actual vs predicted charts.

use std::io::{stdin, stdout, Write};
use std::path::{Path, PathBuf};

use log::{error, info};

use netsim_forecast::error::{PipelineError, Result};
use netsim_forecast::model::forecaster::{ForecasterConfig, MetricForecaster};
use netsim_forecast::model::load_model::{LoadPredictor, LoadPredictorConfig};
use netsim_forecast::net::receiver::{receive_csv, ReceiverConfig};
use netsim_forecast::pipeline::features;
use netsim_forecast::pipeline::loader::{self, NodeSeries, TrafficLog};
use netsim_forecast::pipeline::scaler::MinMaxScaler;
use netsim_forecast::pipeline::window;
use netsim_forecast::utils::export::{export_forecast_csv, plot_forecast_svg, ForecastRow};

const DEFAULT_CSV_PATH: &str = "test.csv";
const DEFAULT_PORT: u16 = 12345;
const DEFAULT_LOAD_NODE: u32 = 6;

fn main() {
    env_logger::init();
    info!("=== TRAFFIC FORECAST START ===");

    loop {
        let choice = prompt_menu();
        match choice.as_str() {
            "1" | "" => {
                let path = prompt_path();
                match loader::load_file(&path) {
                    Ok(log) => run_forecast_all(&log),
                    // fatal at load time: no partial-dataset recovery
                    Err(e) => error!("failed to load {}: {e}", path.display()),
                }
            }
            "2" => {
                let port = prompt_port();
                let cfg = ReceiverConfig {
                    port,
                    ..ReceiverConfig::default()
                };
                match receive_csv(&cfg).and_then(|text| loader::parse_csv(&text)) {
                    Ok(log) => run_forecast_all(&log),
                    Err(e) => error!("socket forecast failed: {e}"),
                }
            }
            "3" => {
                let path = prompt_path();
                let node_id = prompt_node();
                match loader::load_file(&path) {
                    Ok(log) => {
                        if let Err(e) = run_load_prediction(&log, node_id) {
                            error!("node {node_id}: {e}");
                        }
                    }
                    Err(e) => error!("failed to load {}: {e}", path.display()),
                }
            }
            "4" => {
                println!("Exiting. Goodbye!");
                info!("=== TRAFFIC FORECAST FINISHED ===");
                return;
            }
            other => {
                println!("Unrecognized option '{}', please try again.", other);
            }
        }
    }
}

fn prompt_menu() -> String {
    println!("\n┌─────────────────────────────────────────────┐");
    println!("│        SELECT FORECAST MODE                 │");
    println!("├─────────────────────────────────────────────┤");
    println!("│  1) Forecast per-node metrics (CSV file)    │");
    println!("│  2) Forecast per-node metrics (socket)      │");
    println!("│  3) Load prediction for one node            │");
    println!("│  4) Exit                                    │");
    println!("└─────────────────────────────────────────────┘");
    print!("Select [1/2/3/4] (default: 1): ");
    let _ = stdout().flush();

    let mut input = String::new();
    let _ = stdin().read_line(&mut input);
    input.trim().to_string()
}

fn prompt_path() -> PathBuf {
    print!("CSV log path [default: {}]: ", DEFAULT_CSV_PATH);
    let _ = stdout().flush();
    let mut input = String::new();
    let _ = stdin().read_line(&mut input);
    let trimmed = input.trim();
    if trimmed.is_empty() {
        PathBuf::from(DEFAULT_CSV_PATH)
    } else {
        PathBuf::from(trimmed)
    }
}

fn prompt_port() -> u16 {
    print!("Listen port [default: {}]: ", DEFAULT_PORT);
    let _ = stdout().flush();
    let mut input = String::new();
    let _ = stdin().read_line(&mut input);
    input.trim().parse::<u16>().unwrap_or(DEFAULT_PORT)
}

fn prompt_node() -> u32 {
    print!("Node id [default: {}]: ", DEFAULT_LOAD_NODE);
    let _ = stdout().flush();
    let mut input = String::new();
    let _ = stdin().read_line(&mut input);
    input.trim().parse::<u32>().unwrap_or(DEFAULT_LOAD_NODE)
}

/// Trains and predicts for every node in first-seen order. One node's
/// failure never aborts the others; the tx figure is drawn for the first
/// node only.
fn run_forecast_all(log: &TrafficLog) {
    let node_ids = log.node_ids();
    info!("nodes in log: {:?}", node_ids);
    if node_ids.is_empty() {
        error!("log contains no rows");
        return;
    }

    let cfg = ForecasterConfig::default();
    for (idx, series) in log.partition().into_iter().enumerate() {
        let node_id = series.node_id;
        match forecast_node(&series, &cfg, idx == 0) {
            Ok(()) => info!("node {node_id}: done"),
            Err(e) => error!("node {node_id}: {e}"),
        }
    }
}

/// Full per-node cycle: scale → window → split → train → predict test
/// windows → invert scaling → print/export.
fn forecast_node(series: &NodeSeries, cfg: &ForecasterConfig, draw_figure: bool) -> Result<()> {
    let node_id = series.node_id;
    let matrix = series.feature_matrix();

    // the scaler lives and dies with this node's run
    let (scaler, scaled) = MinMaxScaler::fit_transform(&matrix);

    let samples = window::make_windows(&scaled, cfg.past_steps, cfg.future_steps);
    if samples.is_empty() {
        return Err(PipelineError::InsufficientData {
            past: cfg.past_steps,
            future: cfg.future_steps,
        });
    }

    let (train, test) = window::split_train_test(samples, cfg.train_ratio);
    info!(
        "node {node_id}: {} train / {} test windows",
        train.len(),
        test.len()
    );

    let mut model = MetricForecaster::new(cfg.clone());
    let losses = model.train(&train)?;
    if let Some(last) = losses.last() {
        info!("node {node_id}: trained, final epoch loss {last:.6}");
    }

    let times = series.times();
    let mut rows = Vec::new();
    let mut actual_tx = Vec::new();
    let mut predicted_tx = Vec::new();

    println!("\nForecast for node {node_id}:");
    for (k, sample) in test.iter().enumerate() {
        let pred = scaler.inverse_transform(&model.predict(&sample.input)?);

        // window start within the node's series
        let start = train.len() + k;
        let origin_time_s = times[start + cfg.past_steps - 1];

        println!("  window ending at {origin_time_s}s:");
        for step in 0..cfg.future_steps {
            println!(
                "    +{}: tx={:.1} rx={:.1} delay={:.4} loss={:.2}",
                step + 1,
                pred[[step, 0]],
                pred[[step, 1]],
                pred[[step, 2]],
                pred[[step, 3]],
            );
            rows.push(ForecastRow {
                node_id,
                origin_time_s,
                step: step + 1,
                tx_bps: pred[[step, 0]],
                rx_bps: pred[[step, 1]],
                avg_delay_s: pred[[step, 2]],
                loss_pct: pred[[step, 3]],
            });
        }

        // one-step-ahead tx per window keeps the figure a clean series
        let t = times[start + cfg.past_steps];
        actual_tx.push((t, matrix[[start + cfg.past_steps, 0]]));
        predicted_tx.push((t, pred[[0, 0]]));
    }

    let csv_path = PathBuf::from(format!("data/forecasts/forecast_node_{node_id}.csv"));
    export_forecast_csv(&csv_path, &rows)?;

    if draw_figure && !actual_tx.is_empty() {
        plot_forecast_svg(
            Path::new(&format!("data/figures/node_{node_id}_tx.svg")),
            &format!("Node {node_id} - Actual vs Predicted TxThroughput(bps)"),
            &actual_tx,
            &predicted_tx,
        );
    }

    Ok(())
}

/// Derived-load forecast for one node: sort by time, append the load column,
/// train on every window, predict the last complete window.
fn run_load_prediction(log: &TrafficLog, node_id: u32) -> Result<()> {
    let cfg = LoadPredictorConfig::default();

    let mut series = log.node_series(node_id);
    if series.is_empty() {
        return Err(PipelineError::InsufficientData {
            past: cfg.seq_length,
            future: cfg.pred_length,
        });
    }
    series.sort_by_time();

    let matrix = features::load_matrix(&series);
    let samples = window::make_load_windows(&matrix, cfg.seq_length, cfg.pred_length);

    let mut model = LoadPredictor::new(cfg.clone());
    let losses = model.train(&samples)?;
    if let Some(last) = losses.last() {
        info!("node {node_id}: load model trained, final epoch loss {last:.6}");
    }

    // predict the last complete window so actual values exist for comparison
    let last_sample = &samples[samples.len() - 1];
    let predicted = model.predict(&last_sample.input)?;

    let times = series.times();
    let start = matrix.nrows() - cfg.seq_length - cfg.pred_length;

    println!(
        "\nLoad forecast for node {node_id} (next {} steps):",
        cfg.pred_length
    );
    let mut actual_points = Vec::with_capacity(cfg.pred_length);
    let mut predicted_points = Vec::with_capacity(cfg.pred_length);
    for step in 0..cfg.pred_length {
        let row = start + cfg.seq_length + step;
        let t = times[row];
        let actual = matrix[[row, 4]];
        println!(
            "  t={t}s: actual={actual:.4} predicted={:.4}",
            predicted[step]
        );
        actual_points.push((t, actual));
        predicted_points.push((t, predicted[step]));
    }

    plot_forecast_svg(
        Path::new(&format!("data/figures/node_{node_id}_load.svg")),
        &format!("Node {node_id} - Actual vs Predicted Load"),
        &actual_points,
        &predicted_points,
    );

    Ok(())
}
