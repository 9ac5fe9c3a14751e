//! Raw header -> canonical column name mapping

use anyhow::Result;
use polars::prelude::DataFrame;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;
use tracing::warn;

pub const ORDER_ID: &str = "order_id";
pub const CUSTOMER_REGION: &str = "customer_region";
pub const PRODUCT_CATEGORY: &str = "product_category";
pub const ORDER_DATE: &str = "order_date";
pub const SHIP_DATE: &str = "ship_date";
pub const DELIVERY_DATE: &str = "delivery_date";
pub const SHIPPING_MODE: &str = "shipping_mode";
pub const SHIPPING_COST: &str = "shipping_cost";
pub const DELIVERY_STATUS: &str = "delivery_status";
pub const DELIVERY_DAYS: &str = "delivery_days";
pub const ON_TIME_FLAG: &str = "on_time_flag";
pub const DELAY_FLAG: &str = "delay_flag";

/// Raw dataset headers mapped to their canonical names
pub static COLUMN_RENAMES: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    let mut m = HashMap::new();
    m.insert("Order_ID", ORDER_ID);
    m.insert("Customer_Region", CUSTOMER_REGION);
    m.insert("Product_Category", PRODUCT_CATEGORY);
    m.insert("Order_Date", ORDER_DATE);
    m.insert("Ship_Date", SHIP_DATE);
    m.insert("Delivery_Date", DELIVERY_DATE);
    m.insert("Shipping_Mode", SHIPPING_MODE);
    m.insert("Shipping_Cost", SHIPPING_COST);
    m.insert("Delivery_Status", DELIVERY_STATUS);
    m.insert("Delivery_Days", DELIVERY_DAYS);
    m
});

/// Canonical name for a header, trimming it first. Unknown headers pass through.
pub fn canonical_name(header: &str) -> String {
    let trimmed = header.trim();
    COLUMN_RENAMES
        .get(trimmed)
        .copied()
        .unwrap_or(trimmed)
        .to_string()
}

/// Trim and rename all headers in place; returns how many changed
///
/// When two headers land on the same canonical name the first one wins and the
/// later column is dropped.
pub fn standardize_columns(df: &mut DataFrame) -> Result<usize> {
    let raw: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();

    let mut seen = HashSet::new();
    let mut names = Vec::with_capacity(raw.len());
    let mut renamed = 0;
    for header in &raw {
        let canonical = canonical_name(header);
        if !seen.insert(canonical.clone()) {
            warn!("column {:?} duplicates {:?} after renaming, dropping it", header, canonical);
            df.drop_in_place(header)?;
            continue;
        }
        if canonical != *header {
            renamed += 1;
        }
        names.push(canonical);
    }

    df.set_column_names(names.iter().map(String::as_str))?;
    Ok(renamed)
}
