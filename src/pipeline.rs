//! Load -> clean -> persist -> aggregate -> render

use crate::charts::create_visuals;
use crate::cleaning::{clean_orders, CleaningSummary};
use crate::config::PipelineConfig;
use crate::frame::{read_csv, write_csv};
use crate::kpi::{compute_kpis, Kpis};
use crate::report::{print_kpis, write_kpi_json};
use anyhow::Result;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone)]
pub struct PipelineSummary {
    pub rows: usize,
    pub processed_path: PathBuf,
    pub cleaning: CleaningSummary,
    pub kpis: Kpis,
    pub charts: Vec<PathBuf>,
}

pub fn run(config: &PipelineConfig) -> Result<PipelineSummary> {
    config.ensure_output_dirs()?;

    info!("Loading orders dataset from {}", config.raw_orders_path.display());
    let mut orders = read_csv(&config.raw_orders_path)?;
    info!("Loaded {} rows, {} columns", orders.height(), orders.width());

    info!("Cleaning orders dataset...");
    let cleaning = clean_orders(&mut orders)?;
    if let Some(report) = &cleaning.reconcile {
        info!(
            "Reconciled ship dates on {} rows ({} imputed, median cycle {:?} days)",
            report.eligible_rows, report.imputed_rows, report.median_cycle_days
        );
    }

    info!("Saving cleaned dataset...");
    write_csv(&mut orders, &config.processed_path)?;
    info!("Cleaned data saved to: {}", config.processed_path.display());

    info!("Computing KPIs...");
    let kpis = compute_kpis(&orders);
    print_kpis(&kpis);

    if let Some(path) = &config.kpi_json_path {
        write_kpi_json(&kpis, path)?;
        info!("KPI summary saved to: {}", path.display());
    }

    let charts = if config.render_charts {
        info!("Creating visuals...");
        let charts = create_visuals(&kpis, &config.visuals_dir, &config.chart)?;
        info!("Done. Visuals saved in: {}", config.visuals_dir.display());
        charts
    } else {
        info!("Chart rendering disabled");
        Vec::new()
    };

    Ok(PipelineSummary {
        rows: orders.height(),
        processed_path: config.processed_path.clone(),
        cleaning,
        kpis,
        charts,
    })
}
