//! Text and JSON output of the computed KPIs

use crate::kpi::{Kpi, KpiValue, Kpis, Series};
use anyhow::{Context, Result};
use std::path::Path;

fn section_header(out: &mut String, title: &str) {
    let rule = "═".repeat(70);
    out.push_str(&format!("\n{}\n  {}\n{}\n\n", rule, title, rule));
}

fn subsection(out: &mut String, title: &str) {
    out.push_str(&format!("\n{}\n{}\n", title, "─".repeat(60)));
}

fn scalar_label(kpi: Kpi) -> &'static str {
    match kpi {
        Kpi::OverallOnTimePct => "On-Time Rate (%)",
        Kpi::AvgDeliveryDays => "Avg Delivery Days",
        _ => kpi.as_str(),
    }
}

fn series_title(kpi: Kpi) -> (&'static str, &'static str) {
    match kpi {
        Kpi::DelaysByShippingMode => ("Delay Rate by Shipping Mode", "Delay %"),
        Kpi::OrdersByCategory => ("Orders by Product Category", "Orders"),
        Kpi::DeliveriesByRegion => ("Deliveries by Region", "Orders"),
        Kpi::DeliveriesOverTime => ("Deliveries per Month", "Orders"),
        _ => (kpi.as_str(), "Value"),
    }
}

fn write_series(out: &mut String, kpi: Kpi, series: &Series) {
    let (title, value_header) = series_title(kpi);
    subsection(out, title);
    out.push_str(&format!("  {:30} {:>12}\n", "Key", value_header));
    out.push_str(&format!("  {}\n", "─".repeat(43)));
    for point in &series.points {
        let key = point.key.to_string();
        let line = match kpi {
            Kpi::DelaysByShippingMode => format!("  {:30} {:>11.1}%\n", key, point.value * 100.0),
            _ => format!("  {:30} {:>12}\n", key, point.value),
        };
        out.push_str(&line);
    }
}

/// Render the KPI set as aligned text tables
pub fn format_kpis(kpis: &Kpis) -> String {
    let mut out = String::new();
    section_header(&mut out, "ORDER FULFILLMENT KPIs");

    if kpis.is_empty() {
        out.push_str("  No KPIs could be computed from the available columns.\n");
        return out;
    }

    for (kpi, value) in kpis.iter() {
        if let KpiValue::Scalar(v) = value {
            out.push_str(&format!("  {:24} {:>12.2}\n", scalar_label(*kpi), v));
        }
    }

    for (kpi, value) in kpis.iter() {
        if let KpiValue::Series(series) = value {
            write_series(&mut out, *kpi, series);
        }
    }
    out
}

pub fn print_kpis(kpis: &Kpis) {
    println!("{}", format_kpis(kpis));
}

/// Write the KPI set as pretty-printed JSON
pub fn write_kpi_json(kpis: &Kpis, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(kpis)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}
