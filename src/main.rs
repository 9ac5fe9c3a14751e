//! Order fulfillment pipeline
//!
//! Cleans the raw orders CSV, writes the processed dataset, prints KPIs and
//! renders the KPI charts.
//!
//! Usage:
//!   cargo run --release -- [OPTIONS]
//!
//! Options:
//!   --root <PATH>         Project root (default: .)
//!   --input <PATH>        Raw orders CSV (default: data/raw/E-Commerce Order Fulfillment Dataset (50K Records).csv)
//!   --output <PATH>       Processed CSV (default: data/processed/cleaned_merged_data.csv)
//!   --visuals-dir <PATH>  Chart output directory (default: visuals)
//!   --kpi-json <PATH>     Also write the KPIs as JSON
//!   --skip-charts         Do not render charts

use anyhow::Result;
use clap::Parser;
use order_fulfillment::config::PipelineConfig;
use order_fulfillment::pipeline;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Clean e-commerce orders and report fulfillment KPIs
#[derive(Parser, Debug)]
#[command(name = "order_fulfillment")]
#[command(about = "Repair order ship dates, compute fulfillment KPIs and render charts")]
struct Args {
    /// Project root; relative paths below resolve against it
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Raw orders CSV path
    #[arg(long)]
    input: Option<PathBuf>,

    /// Processed CSV output path
    #[arg(long)]
    output: Option<PathBuf>,

    /// Directory for chart images
    #[arg(long)]
    visuals_dir: Option<PathBuf>,

    /// Write the computed KPIs to this JSON file
    #[arg(long)]
    kpi_json: Option<PathBuf>,

    /// Skip chart rendering
    #[arg(long)]
    skip_charts: bool,

    /// Chart width in pixels
    #[arg(long, default_value = "1000")]
    chart_width: u32,

    /// Chart height in pixels
    #[arg(long, default_value = "600")]
    chart_height: u32,
}

impl Args {
    fn into_config(self) -> PipelineConfig {
        let mut config = PipelineConfig::from_root(self.root);
        if let Some(input) = self.input {
            config.raw_orders_path = config.resolve(&input);
        }
        if let Some(output) = self.output {
            config.processed_path = config.resolve(&output);
        }
        if let Some(dir) = self.visuals_dir {
            config.visuals_dir = config.resolve(&dir);
        }
        config.kpi_json_path = self.kpi_json.map(|p| config.resolve(&p));
        config.render_charts = !self.skip_charts;
        config.chart.width = self.chart_width;
        config.chart.height = self.chart_height;
        config
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Args::parse().into_config();
    let summary = pipeline::run(&config)?;

    info!(
        "Processed {} orders, {} KPIs, {} charts",
        summary.rows,
        summary.kpis.len(),
        summary.charts.len()
    );
    Ok(())
}
