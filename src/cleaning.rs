//! Cleaning pass over the raw orders table

use crate::dates::normalize_dates;
use crate::frame::{dates, texts};
use crate::reconcile::{adjust_shipping_dates, ReconcileReport};
use crate::standardize::{
    standardize_columns, DELAY_FLAG, DELIVERY_DATE, DELIVERY_DAYS, DELIVERY_STATUS, ON_TIME_FLAG,
    ORDER_DATE, SHIPPING_COST, SHIP_DATE,
};
use anyhow::Result;
use polars::prelude::*;
use tracing::debug;

pub const DATE_COLUMNS: &[&str] = &[ORDER_DATE, SHIP_DATE, DELIVERY_DATE];

const DELAYED_STATUS: &str = "delayed";

/// What the cleaning pass did, for progress logging
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleaningSummary {
    pub renamed_columns: usize,
    pub delayed_orders: Option<usize>,
    pub delivery_days_backfilled: bool,
    pub reconcile: Option<ReconcileReport>,
}

/// Parse a whole-number field; fractional or non-numeric values are missing
pub fn parse_whole_number(raw: &str) -> Option<i64> {
    let s = raw.trim();
    if let Ok(n) = s.parse::<i64>() {
        return Some(n);
    }
    let f = s.parse::<f64>().ok()?;
    (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}

pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|f| f.is_finite())
}

fn has_dtype(df: &DataFrame, name: &str, dtype: &DataType) -> bool {
    df.column(name).map_or(false, |c| c.dtype() == dtype)
}

/// Coerce `shipping_cost` to float and `delivery_days` to integer where present
pub fn coerce_numeric_columns(df: &mut DataFrame) -> Result<()> {
    if !has_dtype(df, SHIPPING_COST, &DataType::Float64) {
        if let Some(raw) = texts(df, SHIPPING_COST) {
            let values: Vec<Option<f64>> =
                raw.iter().map(|v| v.as_deref().and_then(parse_number)).collect();
            df.with_column(Series::new(SHIPPING_COST.into(), values))?;
        }
    }

    if !has_dtype(df, DELIVERY_DAYS, &DataType::Int64) {
        if let Some(raw) = texts(df, DELIVERY_DAYS) {
            let values: Vec<Option<i64>> = raw
                .iter()
                .map(|v| v.as_deref().and_then(parse_whole_number))
                .collect();
            df.with_column(Series::new(DELIVERY_DAYS.into(), values))?;
        }
    }

    Ok(())
}

/// Add `on_time_flag` and `delay_flag` from `delivery_status`
///
/// A status reading "delayed" in any case is late; anything else, including a
/// missing status, is on time. Returns the number of delayed orders, or None
/// when there is no status column.
pub fn add_status_flags(df: &mut DataFrame) -> Result<Option<usize>> {
    if df.column(DELIVERY_STATUS).is_err() {
        return Ok(None);
    }

    let delayed = col(DELIVERY_STATUS)
        .cast(DataType::String)
        .str()
        .to_lowercase()
        .eq(lit(DELAYED_STATUS));
    *df = df
        .clone()
        .lazy()
        .with_columns([
            when(delayed.clone())
                .then(lit(0i64))
                .otherwise(lit(1i64))
                .cast(DataType::Int64)
                .alias(ON_TIME_FLAG),
            when(delayed)
                .then(lit(1i64))
                .otherwise(lit(0i64))
                .cast(DataType::Int64)
                .alias(DELAY_FLAG),
        ])
        .collect()?;

    let delayed_orders = df.column(DELAY_FLAG)?.i64()?.sum().unwrap_or(0);
    Ok(Some(delayed_orders as usize))
}

/// Recalculate `delivery_days` from the dates when the column is absent or
/// entirely missing. Returns whether anything was recalculated.
pub fn backfill_delivery_days(df: &mut DataFrame) -> Result<bool> {
    let needs_backfill = df
        .column(DELIVERY_DAYS)
        .map_or(true, |c| c.null_count() == c.len());
    if !needs_backfill {
        return Ok(false);
    }

    let (Some(ship), Some(delivery)) = (dates(df, SHIP_DATE), dates(df, DELIVERY_DATE)) else {
        return Ok(false);
    };

    let days: Vec<Option<i64>> = ship
        .iter()
        .zip(&delivery)
        .map(|(s, d)| match (s, d) {
            (Some(s), Some(d)) => Some((*d - *s).num_days()),
            _ => None,
        })
        .collect();

    df.with_column(Series::new(DELIVERY_DAYS.into(), days))?;
    Ok(true)
}

/// Run the full cleaning pass: standardize headers, parse dates, coerce numbers,
/// derive status flags, backfill delivery days, then reconcile ship dates
pub fn clean_orders(df: &mut DataFrame) -> Result<CleaningSummary> {
    let renamed_columns = standardize_columns(df)?;
    debug!("standardized {} column names", renamed_columns);

    normalize_dates(df, DATE_COLUMNS)?;
    coerce_numeric_columns(df)?;

    let delayed_orders = add_status_flags(df)?;
    let delivery_days_backfilled = backfill_delivery_days(df)?;
    let reconcile = adjust_shipping_dates(df)?;

    Ok(CleaningSummary {
        renamed_columns,
        delayed_orders,
        delivery_days_backfilled,
        reconcile,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{floats, has_column, ints, read_csv_bytes};
    use chrono::NaiveDate;

    fn d(s: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
    }

    fn raw_frame(csv: &str) -> DataFrame {
        read_csv_bytes(csv.as_bytes()).unwrap()
    }

    #[test]
    fn test_whole_numbers() {
        assert_eq!(parse_whole_number("5"), Some(5));
        assert_eq!(parse_whole_number(" -2 "), Some(-2));
        assert_eq!(parse_whole_number("4.0"), Some(4));
        assert_eq!(parse_whole_number("4.5"), None);
        assert_eq!(parse_whole_number("n/a"), None);
        assert_eq!(parse_number("12.75"), Some(12.75));
        assert_eq!(parse_number("NaN"), None);
    }

    #[test]
    fn test_flags_sum_to_one() {
        let mut df = raw_frame("Delivery_Status\nDelayed\ndelivered\n\"\"\nDELAYED\nOn Time\n");
        standardize_columns(&mut df).unwrap();
        let delayed = add_status_flags(&mut df).unwrap();

        assert_eq!(delayed, Some(2));
        let on_time = ints(&df, ON_TIME_FLAG).unwrap();
        let delay = ints(&df, DELAY_FLAG).unwrap();
        // status match ignores case; a blank status counts as on time
        assert_eq!(on_time, vec![Some(0), Some(1), Some(1), Some(0), Some(1)]);
        for (a, b) in on_time.iter().zip(&delay) {
            assert_eq!(a.unwrap() + b.unwrap(), 1);
        }
    }

    #[test]
    fn test_flags_skipped_without_status() {
        let mut df = raw_frame("order_id\nA\n");
        assert_eq!(add_status_flags(&mut df).unwrap(), None);
        assert!(!has_column(&df, ON_TIME_FLAG));
    }

    #[test]
    fn test_backfill_only_when_entirely_missing() {
        let mut df = raw_frame(
            "Ship_Date,Delivery_Date,Delivery_Days\n2024-01-02,2024-01-05,\n2024-01-03,,\n",
        );
        standardize_columns(&mut df).unwrap();
        normalize_dates(&mut df, DATE_COLUMNS).unwrap();
        coerce_numeric_columns(&mut df).unwrap();

        assert!(backfill_delivery_days(&mut df).unwrap());
        assert_eq!(ints(&df, DELIVERY_DAYS).unwrap(), vec![Some(3), None]);

        // now partially populated, left alone
        assert!(!backfill_delivery_days(&mut df).unwrap());
    }

    #[test]
    fn test_backfill_when_column_absent() {
        let mut df = raw_frame("Ship_Date,Delivery_Date\n2024-01-02,2024-01-09\n");
        standardize_columns(&mut df).unwrap();
        normalize_dates(&mut df, DATE_COLUMNS).unwrap();

        assert!(backfill_delivery_days(&mut df).unwrap());
        assert_eq!(ints(&df, DELIVERY_DAYS).unwrap(), vec![Some(7)]);
    }

    #[test]
    fn test_clean_orders_end_to_end() {
        let csv = "\
Order_ID,Customer_Region,Product_Category,Order_Date,Ship_Date,Delivery_Date,Shipping_Mode,Shipping_Cost,Delivery_Status,Delivery_Days
A,North,Books,2024-01-01,2024-01-02,2024-01-03,Standard,5.5,Delivered,1
B,South,Toys,2024-01-01,2024-01-03,2024-01-07,Express,9.25,Delayed,4
C,North,Books,2024-01-01,2024-01-05,2023-12-30,Standard,oops,delivered,-6
D,East,Games,not-a-date,2024-01-05,2024-01-09,Standard,3,Delivered,4
";
        let mut df = raw_frame(csv);
        let summary = clean_orders(&mut df).unwrap();

        assert_eq!(summary.renamed_columns, 10);
        assert_eq!(summary.delayed_orders, Some(1));
        assert!(!summary.delivery_days_backfilled);
        let report = summary.reconcile.unwrap();
        assert_eq!(report.eligible_rows, 3);
        assert_eq!(report.imputed_rows, 1);

        assert_eq!(
            dates(&df, SHIP_DATE).unwrap(),
            vec![d("2024-01-01"), d("2024-01-02"), d("2024-01-01"), d("2024-01-05")]
        );
        assert_eq!(
            ints(&df, DELIVERY_DAYS).unwrap(),
            vec![Some(2), Some(5), Some(-2), Some(4)]
        );
        assert_eq!(
            floats(&df, SHIPPING_COST).unwrap(),
            vec![Some(5.5), Some(9.25), None, Some(3.0)]
        );
        assert_eq!(dates(&df, ORDER_DATE).unwrap()[3], None);
    }
}
