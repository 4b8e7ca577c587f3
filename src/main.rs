//! runview - load, smooth, average and compare simulation runs.
//!
//! Exit codes:
//!   0 - Success
//!   1 - A required file was missing or unreadable, the configuration was
//!       invalid, or the window could not be opened

mod app;
mod cli;
mod color;
mod config;
mod data;
mod state;
mod ui;

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use app::RunViewApp;
use cli::Args;
use config::{ChartConfig, DEFAULT_CONFIG_FILE};
use data::pipeline::{build_chart, Chart};
use eframe::egui;
use state::AppState;

fn main() -> Result<()> {
    let args = Args::parse_args();

    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);
    log::debug!("Arguments: {args:?}");

    let config = args.chart_config()?;
    let chart = build_chart(&config)?;
    log_summary(&chart);

    if args.check {
        return Ok(());
    }

    let title = format!("runview – {}", chart.title);
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    let state = AppState::new(config, chart);
    eframe::run_native(
        &title,
        options,
        Box::new(|_cc| Ok(Box::new(RunViewApp::new(state)))),
    )
    .map_err(|e| anyhow!("window error: {e}"))
}

/// `RUST_LOG` overrides the level picked by `--verbose` / `--quiet`.
fn init_logging(args: &Args) {
    env_logger::Builder::new()
        .filter_level(args.log_level())
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

/// Handle --init-config: write a default runview.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);
    if path.exists() {
        bail!("{DEFAULT_CONFIG_FILE} already exists. Remove it first or edit it manually.");
    }

    std::fs::write(path, ChartConfig::default_toml())
        .with_context(|| format!("Failed to write {DEFAULT_CONFIG_FILE}"))?;

    println!("Created {DEFAULT_CONFIG_FILE}. Edit the paths, then run: runview --config {DEFAULT_CONFIG_FILE}");
    Ok(())
}

fn log_summary(chart: &Chart) {
    for (group, name) in chart.groups.iter().enumerate() {
        let points: usize = chart
            .lines
            .iter()
            .filter(|l| l.group == group)
            .map(|l| l.points.len())
            .sum();
        log::info!("{name}: {points} points");
    }
    for batch in &chart.batches {
        log::info!(
            "{}: {}/{} runs loaded, {} missing",
            batch.base_dir.display(),
            batch.loaded,
            batch.requested,
            batch.missing.len()
        );
    }
}
