//! Shipping date reconciliation
//!
//! Source ship dates are unreliable, so they are rebuilt from the order date plus
//! an assumed dispatch delay. The delay is picked from the order-to-delivery cycle
//! length:
//!
//! - cycle <= 4 days       -> shipped the same day
//! - 4 < cycle <= 8 days   -> shipped the next day
//! - cycle > 8 days        -> shipped 3 days after the order
//!
//! Negative cycles (delivery before order) are replaced by the median of the
//! non-negative cycles before bucketing. Only rows with both an order date and a
//! delivery date are touched.

use crate::frame::{date_series, dates};
use crate::standardize::{DELIVERY_DATE, DELIVERY_DAYS, ORDER_DATE, SHIP_DATE};
use anyhow::Result;
use chrono::{Duration, NaiveDate};
use polars::prelude::{DataFrame, DataType, NamedFrom, Series};
use tracing::{debug, warn};

/// Assumed days between order placement and dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchDelay {
    SameDay,
    NextDay,
    ThreeDays,
}

impl DispatchDelay {
    pub fn days(self) -> i64 {
        match self {
            DispatchDelay::SameDay => 0,
            DispatchDelay::NextDay => 1,
            DispatchDelay::ThreeDays => 3,
        }
    }

    /// Class used when the cycle length is undefined
    pub const FALLBACK: DispatchDelay = DispatchDelay::NextDay;
}

/// Bucket a non-negative cycle length; `None` when no bucket matches
pub fn classify_cycle(cycle: f64) -> Option<DispatchDelay> {
    if cycle <= 4.0 {
        Some(DispatchDelay::SameDay)
    } else if cycle > 4.0 && cycle <= 8.0 {
        Some(DispatchDelay::NextDay)
    } else if cycle > 8.0 {
        Some(DispatchDelay::ThreeDays)
    } else {
        None
    }
}

/// Median of the non-negative cycle lengths, None when there are none
pub fn valid_cycle_median(cycles: &[i64]) -> Option<f64> {
    let valid: Vec<f64> = cycles.iter().filter(|c| **c >= 0).map(|c| *c as f64).collect();
    Series::new("cycle_days".into(), valid).median()
}

/// Per-row outcome for an eligible row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleAssessment {
    pub row: usize,
    pub raw_cycle_days: i64,
    /// Cycle used for bucketing; None only when it had to be imputed but no
    /// valid cycle existed to take a median from
    pub effective_cycle_days: Option<f64>,
    pub delay: DispatchDelay,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    pub eligible_rows: usize,
    pub imputed_rows: usize,
    pub median_cycle_days: Option<f64>,
    pub same_day: usize,
    pub next_day: usize,
    pub three_days: usize,
    pub fallback_rows: usize,
}

/// Work out cycle lengths and dispatch delays without touching the frame
pub fn assess_cycles(
    order_dates: &[Option<NaiveDate>],
    delivery_dates: &[Option<NaiveDate>],
) -> (Vec<CycleAssessment>, Option<f64>) {
    let eligible: Vec<(usize, i64)> = order_dates
        .iter()
        .zip(delivery_dates)
        .enumerate()
        .filter_map(|(row, (order, delivery))| match (order, delivery) {
            (Some(o), Some(d)) => Some((row, (*d - *o).num_days())),
            _ => None,
        })
        .collect();

    let cycles: Vec<i64> = eligible.iter().map(|(_, c)| *c).collect();
    let median_cycle = valid_cycle_median(&cycles);

    let assessments = eligible
        .into_iter()
        .map(|(row, raw)| {
            let effective = if raw >= 0 { Some(raw as f64) } else { median_cycle };
            let delay = effective
                .and_then(classify_cycle)
                .unwrap_or(DispatchDelay::FALLBACK);
            CycleAssessment {
                row,
                raw_cycle_days: raw,
                effective_cycle_days: effective,
                delay,
            }
        })
        .collect();

    (assessments, median_cycle)
}

/// Column as a series of the given type, or all-missing when absent or unusable
fn existing_or_null(df: &DataFrame, name: &str, dtype: &DataType) -> Series {
    df.column(name)
        .ok()
        .and_then(|c| c.as_materialized_series().cast(dtype).ok())
        .unwrap_or_else(|| Series::full_null(name.into(), df.height(), dtype))
}

/// Rebuild `ship_date` and `delivery_days` for eligible rows in place
///
/// Returns None (and leaves the frame unchanged) when either date column is
/// missing or no row has both dates.
pub fn adjust_shipping_dates(df: &mut DataFrame) -> Result<Option<ReconcileReport>> {
    let (Some(order_dates), Some(delivery_dates)) =
        (dates(df, ORDER_DATE), dates(df, DELIVERY_DATE))
    else {
        debug!("order/delivery dates not available, skipping ship date reconciliation");
        return Ok(None);
    };

    let (assessments, median_cycle) = assess_cycles(&order_dates, &delivery_dates);
    if assessments.is_empty() {
        debug!("no rows with both order and delivery dates");
        return Ok(None);
    }

    let height = df.height();
    let mut ship_dates: Vec<Option<NaiveDate>> = vec![None; height];
    let mut delivery_days: Vec<Option<i64>> = vec![None; height];

    let mut report = ReconcileReport {
        eligible_rows: assessments.len(),
        median_cycle_days: median_cycle,
        ..Default::default()
    };

    for a in &assessments {
        // eligible rows have both dates by construction
        let (Some(order), Some(delivery)) = (order_dates[a.row], delivery_dates[a.row]) else {
            continue;
        };

        let ship = order + Duration::days(a.delay.days());
        ship_dates[a.row] = Some(ship);
        delivery_days[a.row] = Some((delivery - ship).num_days());

        if a.raw_cycle_days < 0 {
            report.imputed_rows += 1;
        }
        if a.effective_cycle_days.is_none() {
            report.fallback_rows += 1;
        }
        match a.delay {
            DispatchDelay::SameDay => report.same_day += 1,
            DispatchDelay::NextDay => report.next_day += 1,
            DispatchDelay::ThreeDays => report.three_days += 1,
        }
    }

    if report.fallback_rows > 0 {
        warn!(
            "{} rows had no usable cycle length, dispatch delay defaulted to {} day(s)",
            report.fallback_rows,
            DispatchDelay::FALLBACK.days()
        );
    }

    let eligible = &df.column(ORDER_DATE)?.as_materialized_series().is_not_null()
        & &df.column(DELIVERY_DATE)?.as_materialized_series().is_not_null();

    let ship = date_series(SHIP_DATE, &ship_dates)?
        .zip_with(&eligible, &existing_or_null(df, SHIP_DATE, &DataType::Date))?;
    let days = Series::new(DELIVERY_DAYS.into(), delivery_days)
        .zip_with(&eligible, &existing_or_null(df, DELIVERY_DAYS, &DataType::Int64))?;
    df.with_column(ship)?;
    df.with_column(days)?;

    debug!(
        eligible = report.eligible_rows,
        imputed = report.imputed_rows,
        median = ?report.median_cycle_days,
        "ship dates reconciled"
    );

    Ok(Some(report))
}
