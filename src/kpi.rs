//! KPI aggregation over the cleaned orders table
//!
//! Each KPI lists the columns it needs; KPIs whose columns are missing are
//! skipped rather than treated as errors.

use crate::frame::{dates, has_columns, numbers};
use crate::standardize::{
    CUSTOMER_REGION, DELAY_FLAG, DELIVERY_DAYS, ON_TIME_FLAG, ORDER_DATE, ORDER_ID,
    PRODUCT_CATEGORY, SHIPPING_MODE,
};
use chrono::NaiveDate;
use polars::prelude::{col, len, lit, DataFrame, DataType, IntoLazy};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Kpi {
    OverallOnTimePct,
    AvgDeliveryDays,
    DelaysByShippingMode,
    OrdersByCategory,
    DeliveriesByRegion,
    DeliveriesOverTime,
}

impl Kpi {
    pub fn as_str(self) -> &'static str {
        match self {
            Kpi::OverallOnTimePct => "overall_on_time_pct",
            Kpi::AvgDeliveryDays => "avg_delivery_days",
            Kpi::DelaysByShippingMode => "delays_by_shipping_mode",
            Kpi::OrdersByCategory => "orders_by_category",
            Kpi::DeliveriesByRegion => "deliveries_by_region",
            Kpi::DeliveriesOverTime => "deliveries_over_time",
        }
    }
}

impl fmt::Display for Kpi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Group key of a series point
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum SeriesKey {
    Category(String),
    /// First day of the month
    Month(NaiveDate),
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesKey::Category(c) => f.write_str(c),
            SeriesKey::Month(m) => write!(f, "{}", m.format("%Y-%m")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub key: SeriesKey,
    pub value: f64,
}

/// Ordered key -> value pairs
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Series {
    pub points: Vec<SeriesPoint>,
}

impl Series {
    pub fn from_pairs(pairs: impl IntoIterator<Item = (SeriesKey, f64)>) -> Self {
        Self {
            points: pairs
                .into_iter()
                .map(|(key, value)| SeriesPoint { key, value })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.points.iter().map(|p| p.key.to_string()).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// Apply `f` to every value, keeping keys and order
    pub fn map_values(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            points: self
                .points
                .iter()
                .map(|p| SeriesPoint {
                    key: p.key.clone(),
                    value: f(p.value),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum KpiValue {
    Scalar(f64),
    Series(Series),
}

impl KpiValue {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            KpiValue::Scalar(v) => Some(*v),
            KpiValue::Series(_) => None,
        }
    }

    pub fn as_series(&self) -> Option<&Series> {
        match self {
            KpiValue::Series(s) => Some(s),
            KpiValue::Scalar(_) => None,
        }
    }
}

/// Computed KPIs keyed by name, in definition order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Kpis(BTreeMap<Kpi, KpiValue>);

impl Kpis {
    pub fn get(&self, kpi: Kpi) -> Option<&KpiValue> {
        self.0.get(&kpi)
    }

    pub fn contains(&self, kpi: Kpi) -> bool {
        self.0.contains_key(&kpi)
    }

    pub fn scalar(&self, kpi: Kpi) -> Option<f64> {
        self.get(kpi).and_then(KpiValue::as_scalar)
    }

    pub fn series(&self, kpi: Kpi) -> Option<&Series> {
        self.get(kpi).and_then(KpiValue::as_series)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Kpi, &KpiValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub struct KpiDefinition {
    pub kpi: Kpi,
    pub requires: &'static [&'static str],
    pub compute: fn(&DataFrame) -> Option<KpiValue>,
}

pub const KPI_DEFINITIONS: &[KpiDefinition] = &[
    KpiDefinition {
        kpi: Kpi::OverallOnTimePct,
        requires: &[ON_TIME_FLAG],
        compute: overall_on_time_pct,
    },
    KpiDefinition {
        kpi: Kpi::AvgDeliveryDays,
        requires: &[DELIVERY_DAYS],
        compute: avg_delivery_days,
    },
    KpiDefinition {
        kpi: Kpi::DelaysByShippingMode,
        requires: &[SHIPPING_MODE, DELAY_FLAG],
        compute: delays_by_shipping_mode,
    },
    KpiDefinition {
        kpi: Kpi::OrdersByCategory,
        requires: &[PRODUCT_CATEGORY],
        compute: orders_by_category,
    },
    KpiDefinition {
        kpi: Kpi::DeliveriesByRegion,
        requires: &[CUSTOMER_REGION],
        compute: deliveries_by_region,
    },
    KpiDefinition {
        kpi: Kpi::DeliveriesOverTime,
        requires: &[ORDER_DATE, ORDER_ID],
        compute: deliveries_over_time,
    },
];

/// Compute every KPI whose required columns are present
pub fn compute_kpis(df: &DataFrame) -> Kpis {
    let mut out = BTreeMap::new();
    for def in KPI_DEFINITIONS {
        if !has_columns(df, def.requires) {
            continue;
        }
        if let Some(value) = (def.compute)(df) {
            out.insert(def.kpi, value);
        }
    }
    Kpis(out)
}

const COUNT: &str = "count";
const MONTH: &str = "month";

/// Mean of a numeric column, ignoring missing values
fn column_mean(df: &DataFrame, name: &str) -> Option<f64> {
    let column = df.column(name).ok()?;
    if column.dtype() == &DataType::String {
        return None;
    }
    column.as_materialized_series().mean()
}

fn overall_on_time_pct(df: &DataFrame) -> Option<KpiValue> {
    column_mean(df, ON_TIME_FLAG).map(|m| KpiValue::Scalar(m * 100.0))
}

fn avg_delivery_days(df: &DataFrame) -> Option<KpiValue> {
    column_mean(df, DELIVERY_DAYS).map(KpiValue::Scalar)
}

/// Sort descending by value; ties keep ascending key order
fn sort_descending(mut pairs: Vec<(SeriesKey, f64)>) -> Series {
    pairs.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    Series::from_pairs(pairs)
}

/// Pull (text key, value) rows out of an aggregated frame
fn category_pairs(grouped: &DataFrame, key: &str, value: &str) -> Option<Vec<(SeriesKey, f64)>> {
    let keys = grouped.column(key).ok()?.str().ok()?;
    let values = numbers(grouped, value)?;
    Some(
        keys.into_iter()
            .zip(values)
            .filter_map(|(k, v)| Some((SeriesKey::Category(k?.to_string()), v?)))
            .collect(),
    )
}

/// Rows per distinct non-missing key
fn value_counts(df: &DataFrame, key: &str) -> Option<KpiValue> {
    let counts = df
        .clone()
        .lazy()
        .select([col(key).cast(DataType::String)])
        .filter(col(key).is_not_null())
        .group_by([col(key)])
        .agg([len().alias(COUNT)])
        .collect()
        .ok()?;
    let pairs = category_pairs(&counts, key, COUNT)?;
    Some(KpiValue::Series(sort_descending(pairs)))
}

fn delays_by_shipping_mode(df: &DataFrame) -> Option<KpiValue> {
    let rates = df
        .clone()
        .lazy()
        .select([
            col(SHIPPING_MODE).cast(DataType::String),
            col(DELAY_FLAG).cast(DataType::Float64),
        ])
        .filter(col(SHIPPING_MODE).is_not_null().and(col(DELAY_FLAG).is_not_null()))
        .group_by([col(SHIPPING_MODE)])
        .agg([col(DELAY_FLAG).mean()])
        .collect()
        .ok()?;
    let pairs = category_pairs(&rates, SHIPPING_MODE, DELAY_FLAG)?;
    Some(KpiValue::Series(sort_descending(pairs)))
}

fn orders_by_category(df: &DataFrame) -> Option<KpiValue> {
    value_counts(df, PRODUCT_CATEGORY)
}

fn deliveries_by_region(df: &DataFrame) -> Option<KpiValue> {
    value_counts(df, CUSTOMER_REGION)
}

/// Non-missing order ids per calendar month of the order date
fn deliveries_over_time(df: &DataFrame) -> Option<KpiValue> {
    if df.column(ORDER_DATE).ok()?.dtype() != &DataType::Date {
        return None;
    }

    let monthly = df
        .clone()
        .lazy()
        .filter(col(ORDER_DATE).is_not_null())
        .group_by([col(ORDER_DATE).dt().truncate(lit("1mo")).alias(MONTH)])
        .agg([col(ORDER_ID).count().alias(COUNT)])
        .collect()
        .ok()?;

    let months: Vec<Option<NaiveDate>> = dates(&monthly, MONTH)?;
    let counts = numbers(&monthly, COUNT)?;
    let mut pairs: Vec<(SeriesKey, f64)> = months
        .into_iter()
        .zip(counts)
        .filter_map(|(m, n)| Some((SeriesKey::Month(m?), n?)))
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    Some(KpiValue::Series(Series::from_pairs(pairs)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::date_series;
    use polars::prelude::{Column, NamedFrom};

    fn d(s: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
    }

    fn sample() -> DataFrame {
        DataFrame::new(vec![
            Column::new(ORDER_ID.into(), [Some("A"), Some("B"), Some("C"), Some("D"), None]),
            Column::new(CUSTOMER_REGION.into(), ["North", "South", "North", "East", "North"]),
            Column::new(
                PRODUCT_CATEGORY.into(),
                [Some("Books"), Some("Toys"), Some("Books"), Some("Toys"), None],
            ),
            Column::new(
                SHIPPING_MODE.into(),
                ["Standard", "Express", "Standard", "Express", "Standard"],
            ),
            date_series(
                ORDER_DATE,
                &[d("2024-01-05"), d("2024-01-20"), d("2024-02-01"), None, d("2024-02-14")],
            )
            .unwrap()
            .into(),
            Column::new(ON_TIME_FLAG.into(), [1i64, 0, 1, 0, 1]),
            Column::new(DELAY_FLAG.into(), [0i64, 1, 0, 1, 0]),
            Column::new(DELIVERY_DAYS.into(), [Some(2i64), Some(5), None, Some(-2), Some(3)]),
        ])
        .unwrap()
    }

    #[test]
    fn test_scalar_kpis() {
        let kpis = compute_kpis(&sample());
        let on_time = kpis.scalar(Kpi::OverallOnTimePct).unwrap();
        assert!((on_time - 60.0).abs() < 1e-9);
        // missing values are excluded, not counted as zero
        assert_eq!(kpis.scalar(Kpi::AvgDeliveryDays), Some(2.0));
    }

    #[test]
    fn test_delays_by_mode_sorted_descending() {
        let kpis = compute_kpis(&sample());
        let series = kpis.series(Kpi::DelaysByShippingMode).unwrap();
        assert_eq!(series.keys(), vec!["Express", "Standard"]);
        assert_eq!(series.values(), vec![1.0, 0.0]);
    }

    #[test]
    fn test_counts_drop_missing_keys_and_break_ties_by_key() {
        let kpis = compute_kpis(&sample());

        let regions = kpis.series(Kpi::DeliveriesByRegion).unwrap();
        assert_eq!(regions.keys(), vec!["North", "East", "South"]);
        assert_eq!(regions.values(), vec![3.0, 1.0, 1.0]);

        let categories = kpis.series(Kpi::OrdersByCategory).unwrap();
        assert_eq!(categories.keys(), vec!["Books", "Toys"]);
        assert_eq!(categories.values(), vec![2.0, 2.0]);
    }

    #[test]
    fn test_deliveries_over_time_by_month() {
        let kpis = compute_kpis(&sample());
        let series = kpis.series(Kpi::DeliveriesOverTime).unwrap();

        assert_eq!(series.keys(), vec!["2024-01", "2024-02"]);
        // February has one row without an order id
        assert_eq!(series.values(), vec![2.0, 1.0]);
        assert_eq!(series.points[0].key, SeriesKey::Month(d("2024-01-01").unwrap()));
    }

    #[test]
    fn test_missing_columns_skip_kpis() {
        let mut df = sample();
        df.drop_in_place(PRODUCT_CATEGORY).unwrap();
        df.drop_in_place(ON_TIME_FLAG).unwrap();

        let kpis = compute_kpis(&df);
        assert!(!kpis.contains(Kpi::OrdersByCategory));
        assert!(!kpis.contains(Kpi::OverallOnTimePct));
        assert!(kpis.contains(Kpi::DeliveriesByRegion));
        assert_eq!(kpis.len(), 4);
    }

    #[test]
    fn test_text_order_dates_skip_monthly_series() {
        let df = DataFrame::new(vec![
            Column::new(ORDER_ID.into(), ["A"]),
            Column::new(ORDER_DATE.into(), ["2024-01-05"]),
        ])
        .unwrap();
        assert!(!compute_kpis(&df).contains(Kpi::DeliveriesOverTime));
    }

    #[test]
    fn test_empty_frame_has_no_scalars() {
        let df = DataFrame::new(vec![
            Column::new(ON_TIME_FLAG.into(), Vec::<i64>::new()),
            Column::new(DELIVERY_DAYS.into(), Vec::<i64>::new()),
        ])
        .unwrap();
        assert!(compute_kpis(&df).is_empty());
    }

    #[test]
    fn test_json_shape() {
        let kpis = compute_kpis(&sample());
        let json = serde_json::to_value(&kpis).unwrap();

        assert!(json["overall_on_time_pct"].is_f64());
        assert_eq!(json["deliveries_over_time"][0]["key"], "2024-01-01");
        assert_eq!(json["orders_by_category"][0]["key"], "Books");
    }
}
