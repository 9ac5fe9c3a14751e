//! Loading, saving and typed access for the orders `DataFrame`
//!
//! Raw files are read with every column as text; the cleaning pass types them.
//! Accessors return `None` when a column is absent or has another type, so
//! callers treat a type mismatch the same as a missing column.

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use std::fs::File;
use std::io::Cursor;
use std::path::Path;

/// Layout of date cells in the processed CSV
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// `Date` values count days from 1970-01-01; chrono counts from 0001-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

fn text_csv_options() -> CsvReadOptions {
    CsvReadOptions::default()
        .with_has_header(true)
        // no inference: every column comes in as String
        .with_infer_schema_length(Some(0))
}

pub fn read_csv(path: &Path) -> Result<DataFrame> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    text_csv_options()
        .into_reader_with_file_handle(file)
        .finish()
        .with_context(|| format!("failed to parse {}", path.display()))
}

/// Read CSV text already in memory
pub fn read_csv_bytes(bytes: &[u8]) -> Result<DataFrame> {
    let df = text_csv_options()
        .into_reader_with_file_handle(Cursor::new(bytes.to_vec()))
        .finish()?;
    Ok(df)
}

/// Write with a header row and no index column; missing cells are empty
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let mut file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_date_format(Some(DATE_FORMAT.to_string()))
        .finish(df)
        .with_context(|| format!("failed to write {}", path.display()))
}

pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|n| n.to_string()).collect()
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.column(name).is_ok()
}

pub fn has_columns(df: &DataFrame, names: &[&str]) -> bool {
    names.iter().all(|n| has_column(df, n))
}

/// Cell values rendered as text, whatever the column type
pub fn texts(df: &DataFrame, name: &str) -> Option<Vec<Option<String>>> {
    let column = df.column(name).ok()?.cast(&DataType::String).ok()?;
    let values = column.str().ok()?;
    Some(values.into_iter().map(|v| v.map(str::to_string)).collect())
}

pub fn ints(df: &DataFrame, name: &str) -> Option<Vec<Option<i64>>> {
    let values = df.column(name).ok()?.i64().ok()?;
    Some(values.into_iter().collect())
}

pub fn floats(df: &DataFrame, name: &str) -> Option<Vec<Option<f64>>> {
    let values = df.column(name).ok()?.f64().ok()?;
    Some(values.into_iter().collect())
}

/// Any numeric column widened to f64
pub fn numbers(df: &DataFrame, name: &str) -> Option<Vec<Option<f64>>> {
    let column = df.column(name).ok()?;
    if column.dtype() == &DataType::String {
        return None;
    }
    let column = column.cast(&DataType::Float64).ok()?;
    let values = column.f64().ok()?;
    Some(values.into_iter().collect())
}

pub fn dates(df: &DataFrame, name: &str) -> Option<Vec<Option<NaiveDate>>> {
    let column = df.column(name).ok()?;
    if column.dtype() != &DataType::Date {
        return None;
    }
    let days = column.cast(&DataType::Int32).ok()?;
    let days = days.i32().ok()?;
    Some(
        days.into_iter()
            .map(|d| d.and_then(|d| NaiveDate::from_num_days_from_ce_opt(d + UNIX_EPOCH_DAYS_FROM_CE)))
            .collect(),
    )
}

/// Build a `Date` series from calendar dates
pub fn date_series(name: &str, values: &[Option<NaiveDate>]) -> PolarsResult<Series> {
    let days: Vec<Option<i32>> = values
        .iter()
        .map(|d| d.map(|d| d.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE))
        .collect();
    Series::new(name.into(), days).cast(&DataType::Date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_read_keeps_everything_as_text() {
        let df = read_csv_bytes(b"order_id,delivery_days,shipping_cost\nA,3,4.5\nB,,x\n").unwrap();

        assert_eq!(df.height(), 2);
        assert_eq!(column_names(&df), vec!["order_id", "delivery_days", "shipping_cost"]);
        assert_eq!(
            texts(&df, "delivery_days").unwrap(),
            vec![Some("3".to_string()), None]
        );
        // text columns are not numbers until the cleaning pass says so
        assert_eq!(ints(&df, "delivery_days"), None);
        assert_eq!(numbers(&df, "shipping_cost"), None);
    }

    #[test]
    fn test_date_series_survives_typed_access() {
        let values = vec![ymd(1969, 12, 31), None, ymd(2024, 2, 29)];
        let df = DataFrame::new(vec![date_series("order_date", &values).unwrap().into()]).unwrap();

        assert_eq!(df.column("order_date").unwrap().dtype(), &DataType::Date);
        assert_eq!(dates(&df, "order_date").unwrap(), values);
        assert_eq!(dates(&df, "missing"), None);
    }

    #[test]
    fn test_write_csv_without_index() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out.csv");
        let mut df = DataFrame::new(vec![
            Column::new("order_id".into(), ["A", "B"]),
            date_series("ship_date", &[ymd(2024, 1, 2), None]).unwrap().into(),
            Column::new("delivery_days".into(), [Some(3i64), Some(-2)]),
        ])
        .unwrap();

        write_csv(&mut df, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["order_id,ship_date,delivery_days", "A,2024-01-02,3", "B,,-2"]);
    }

    #[test]
    fn test_missing_file_has_path_in_error() {
        let err = read_csv(Path::new("/nonexistent/orders.csv")).unwrap_err();
        assert!(format!("{:#}", err).contains("failed to open /nonexistent/orders.csv"));
    }
}
