//! Synthetic data generator for the order fulfillment pipeline
//!
//! Writes a raw orders CSV with the same headers as the source dataset,
//! including a controlled share of broken dates so the cleaning pass has
//! something to repair.
//!
//! Usage:
//!   cargo run --release --bin generate_synthetic -- [OPTIONS]
//!
//! Options:
//!   --rows <N>               Number of orders (default: 5000)
//!   --start <DATE>           First possible order date (default: 2024-01-01)
//!   --days <N>               Span of order dates in days (default: 365)
//!   --negative-rate <F>      Share of rows delivered "before" ordering (default: 0.03)
//!   --bad-date-rate <F>      Share of rows with an unparseable or empty date (default: 0.02)
//!   --delay-rate <F>         Share of rows marked Delayed (default: 0.2)
//!   --seed <N>               Random seed for reproducibility (optional)
//!   --output <PATH>          Output CSV path (default: data/raw/E-Commerce Order Fulfillment Dataset (50K Records).csv)

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use clap::Parser;
use csv::WriterBuilder;
use order_fulfillment::config::RAW_ORDERS_FILE;
use rand::prelude::*;
use rand::rngs::StdRng;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

/// Synthetic order generator
#[derive(Parser, Debug)]
#[command(name = "generate_synthetic")]
#[command(about = "Generate a synthetic raw e-commerce orders CSV")]
struct Args {
    /// Number of orders to generate
    #[arg(long, default_value = "5000")]
    rows: usize,

    /// Earliest order date (YYYY-MM-DD)
    #[arg(long, default_value = "2024-01-01")]
    start: NaiveDate,

    /// Order dates are spread over this many days
    #[arg(long, default_value = "365")]
    days: i64,

    /// Probability that the delivery date precedes the order date
    #[arg(long, default_value = "0.03")]
    negative_rate: f64,

    /// Probability of an unparseable or empty date field
    #[arg(long, default_value = "0.02")]
    bad_date_rate: f64,

    /// Probability of a Delayed status
    #[arg(long, default_value = "0.2")]
    delay_rate: f64,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Output CSV path
    #[arg(long)]
    output: Option<PathBuf>,
}

/// Raw record with the source dataset's header spelling
#[derive(Debug, Serialize)]
struct RawOrder {
    #[serde(rename = "Order_ID")]
    order_id: String,
    #[serde(rename = "Customer_Region")]
    customer_region: &'static str,
    #[serde(rename = "Product_Category")]
    product_category: &'static str,
    #[serde(rename = "Order_Date")]
    order_date: String,
    #[serde(rename = "Ship_Date")]
    ship_date: String,
    #[serde(rename = "Delivery_Date")]
    delivery_date: String,
    #[serde(rename = "Shipping_Mode")]
    shipping_mode: &'static str,
    #[serde(rename = "Shipping_Cost")]
    shipping_cost: f64,
    #[serde(rename = "Delivery_Status")]
    delivery_status: &'static str,
    #[serde(rename = "Delivery_Days")]
    delivery_days: i64,
}

const REGIONS: &[&str] = &["North", "South", "East", "West", "Central"];
const CATEGORIES: &[&str] = &[
    "Electronics",
    "Clothing",
    "Home & Kitchen",
    "Books",
    "Beauty",
    "Sports",
    "Toys",
];

/// Mode name, base cost, typical transit range in days
const MODES: &[(&str, f64, (i64, i64))] = &[
    ("Standard", 4.99, (3, 9)),
    ("Express", 12.99, (1, 4)),
    ("Same Day", 19.99, (0, 1)),
    ("Two-Day", 8.99, (2, 3)),
];

const BAD_DATES: &[&str] = &["", "N/A", "0000-00-00", "31/31/2024"];

fn format_date(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

/// Either the real date or a broken placeholder
fn maybe_break(date: NaiveDate, rate: f64, rng: &mut impl Rng) -> String {
    if rng.gen_bool(rate) {
        BAD_DATES.choose(rng).copied().unwrap_or_default().to_string()
    } else {
        format_date(date)
    }
}

fn generate_order(i: usize, args: &Args, rng: &mut impl Rng) -> RawOrder {
    let order_date = args.start + Duration::days(rng.gen_range(0..args.days.max(1)));
    let (mode, base_cost, (min_transit, max_transit)) = *MODES.choose(rng).unwrap_or(&MODES[0]);

    let dispatch = rng.gen_range(0..=3);
    let delayed = rng.gen_bool(args.delay_rate);
    let extra = if delayed { rng.gen_range(2..=6) } else { 0 };
    let transit = rng.gen_range(min_transit..=max_transit) + extra;

    let ship_date = order_date + Duration::days(dispatch);
    let delivery_date = if rng.gen_bool(args.negative_rate) {
        order_date - Duration::days(rng.gen_range(1..=5))
    } else {
        ship_date + Duration::days(transit)
    };

    RawOrder {
        order_id: format!("ORD{:07}", i + 1),
        customer_region: REGIONS.choose(rng).copied().unwrap_or("North"),
        product_category: CATEGORIES.choose(rng).copied().unwrap_or("Books"),
        order_date: maybe_break(order_date, args.bad_date_rate, rng),
        ship_date: maybe_break(ship_date, args.bad_date_rate, rng),
        delivery_date: maybe_break(delivery_date, args.bad_date_rate, rng),
        shipping_mode: mode,
        shipping_cost: ((base_cost + rng.gen_range(0.0..5.0)) * 100.0).round() / 100.0,
        delivery_status: if delayed { "Delayed" } else { "Delivered" },
        delivery_days: (delivery_date - ship_date).num_days(),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let args = Args::parse();
    for (name, rate) in [
        ("negative-rate", args.negative_rate),
        ("bad-date-rate", args.bad_date_rate),
        ("delay-rate", args.delay_rate),
    ] {
        anyhow::ensure!((0.0..=1.0).contains(&rate), "--{} must be within 0.0..=1.0", name);
    }

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from("data").join("raw").join(RAW_ORDERS_FILE));
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut writer = WriterBuilder::new()
        .has_headers(true)
        .from_path(&output)
        .with_context(|| format!("failed to create {}", output.display()))?;

    for i in 0..args.rows {
        writer.serialize(generate_order(i, &args, &mut rng))?;
        if (i + 1) % 10000 == 0 {
            info!("Generated {}/{} orders...", i + 1, args.rows);
        }
    }
    writer.flush()?;

    info!("Wrote {} synthetic orders to {}", args.rows, output.display());
    Ok(())
}
