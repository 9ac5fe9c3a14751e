//! PNG charts for the grouped KPIs

use crate::config::ChartStyle;
use crate::kpi::{Kpi, Kpis, Series};
use anyhow::Result;
use plotters::coord::ranged1d::SegmentValue;
use plotters::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    /// Categorical keys
    Bar,
    /// Monthly keys, marker at every point
    Line,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelOrientation {
    Horizontal,
    Vertical,
}

/// How KPI values are transformed before plotting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueScale {
    Raw,
    /// Fraction shown as a percentage rounded to one decimal
    Percent,
}

impl ValueScale {
    pub fn apply(self, v: f64) -> f64 {
        match self {
            ValueScale::Raw => v,
            ValueScale::Percent => (v * 1000.0).round() / 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartSpec {
    pub kpi: Kpi,
    pub kind: ChartKind,
    pub title: &'static str,
    pub x_label: &'static str,
    pub y_label: &'static str,
    pub file_name: &'static str,
    pub orientation: LabelOrientation,
    pub scale: ValueScale,
}

pub const CHART_SPECS: &[ChartSpec] = &[
    ChartSpec {
        kpi: Kpi::DeliveriesByRegion,
        kind: ChartKind::Bar,
        title: "Deliveries by Region",
        x_label: "Customer Region",
        y_label: "Number of Orders",
        file_name: "deliveries_by_region.png",
        orientation: LabelOrientation::Vertical,
        scale: ValueScale::Raw,
    },
    ChartSpec {
        kpi: Kpi::DelaysByShippingMode,
        kind: ChartKind::Bar,
        title: "Delay Rate by Shipping Mode (%)",
        x_label: "Shipping Mode",
        y_label: "Delay Rate (%)",
        file_name: "delays_by_shipping_mode.png",
        orientation: LabelOrientation::Horizontal,
        scale: ValueScale::Percent,
    },
    ChartSpec {
        kpi: Kpi::DeliveriesOverTime,
        kind: ChartKind::Line,
        title: "Deliveries Over Time (Orders per Month)",
        x_label: "Month",
        y_label: "Number of Orders",
        file_name: "deliveries_over_time.png",
        orientation: LabelOrientation::Horizontal,
        scale: ValueScale::Raw,
    },
    ChartSpec {
        kpi: Kpi::OrdersByCategory,
        kind: ChartKind::Bar,
        title: "Orders by Product Category",
        x_label: "Product Category",
        y_label: "Number of Orders",
        file_name: "orders_by_category.png",
        orientation: LabelOrientation::Vertical,
        scale: ValueScale::Raw,
    },
];

/// A chart that will be drawn, with its values already scaled
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedChart {
    pub spec: &'static ChartSpec,
    pub series: Series,
}

/// Pick the charts whose KPI was computed
pub fn plan_visuals(kpis: &Kpis) -> Vec<PlannedChart> {
    CHART_SPECS
        .iter()
        .filter_map(|spec| {
            let series = kpis.series(spec.kpi)?;
            Some(PlannedChart {
                spec,
                series: series.map_values(|v| spec.scale.apply(v)),
            })
        })
        .collect()
}

/// Render every planned chart into `dir`, overwriting existing files
pub fn create_visuals(kpis: &Kpis, dir: &Path, style: &ChartStyle) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for chart in plan_visuals(kpis) {
        if chart.series.is_empty() {
            debug!("{} has no data points, skipping chart", chart.spec.kpi);
            continue;
        }
        let path = dir.join(chart.spec.file_name);
        render_chart(chart.spec, &chart.series, &path, style)?;
        info!("Saved chart {}", path.display());
        written.push(path);
    }
    Ok(written)
}

fn y_upper_bound(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(0.0_f64, f64::max);
    if max > 0.0 {
        max * 1.1
    } else {
        1.0
    }
}

fn x_label_area(labels: &[String], orientation: LabelOrientation, style: &ChartStyle) -> u32 {
    match orientation {
        LabelOrientation::Horizontal => 50,
        LabelOrientation::Vertical => {
            let longest = labels.iter().map(|l| l.chars().count()).max().unwrap_or(0) as u32;
            (longest * style.label_size * 3 / 5 + 30)
                .min(style.height / 2)
                .max(50)
        }
    }
}

/// Draw one series as a bar or line chart to a PNG at `path`
pub fn render_chart(spec: &ChartSpec, series: &Series, path: &Path, style: &ChartStyle) -> Result<()> {
    let labels = series.keys();
    let values = series.values();
    let n = values.len() as u32;

    let root = BitMapBackend::new(path, (style.width, style.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let family = style.font_family.as_str();
    let label_font = match spec.orientation {
        LabelOrientation::Horizontal => (family, style.label_size).into_font(),
        LabelOrientation::Vertical => (family, style.label_size)
            .into_font()
            .transform(FontTransform::Rotate90),
    };

    let mut chart = ChartBuilder::on(&root)
        .caption(spec.title, (family, style.caption_size))
        .margin(20)
        .x_label_area_size(x_label_area(&labels, spec.orientation, style))
        .y_label_area_size(70)
        .build_cartesian_2d((0u32..n).into_segmented(), 0f64..y_upper_bound(&values))?;

    let key_label = |v: &SegmentValue<u32>| match v {
        SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => {
            labels.get(*i as usize).cloned().unwrap_or_default()
        }
        SegmentValue::Last => String::new(),
    };

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(labels.len())
        .x_label_formatter(&key_label)
        .x_label_style(label_font)
        .x_desc(spec.x_label)
        .y_desc(spec.y_label)
        .axis_desc_style((family, style.label_size))
        .draw()?;

    match spec.kind {
        ChartKind::Bar => {
            chart.draw_series(
                Histogram::vertical(&chart)
                    .style(BLUE.filled())
                    .margin(10)
                    .data(values.iter().enumerate().map(|(i, v)| (i as u32, *v))),
            )?;
        }
        ChartKind::Line => {
            let points: Vec<(SegmentValue<u32>, f64)> = values
                .iter()
                .enumerate()
                .map(|(i, v)| (SegmentValue::CenterOf(i as u32), *v))
                .collect();
            chart.draw_series(LineSeries::new(points.clone(), &BLUE))?;
            chart.draw_series(points.into_iter().map(|p| Circle::new(p, 4, BLUE.filled())))?;
        }
    }

    root.present()?;
    Ok(())
}
