//! Lenient date parsing for raw order columns

use crate::frame::{date_series, texts};
use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::{DataFrame, DataType};
use tracing::debug;

/// Date-only layouts, tried in order
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%d.%m.%Y",
    "%Y%m%d",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%d %B %Y",
];

/// Date-time layouts; the time part is dropped
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Parse a date-like string, returning None for anything unrecognised
pub fn parse_lenient_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

/// Convert each named column that exists into a `Date` column
///
/// Columns that are already dates are left alone. Values that do not parse
/// become missing rather than failing the pass.
pub fn normalize_dates(df: &mut DataFrame, columns: &[&str]) -> Result<()> {
    for &name in columns {
        let Ok(column) = df.column(name) else {
            continue;
        };
        if column.dtype() == &DataType::Date {
            continue;
        }
        let Some(raw) = texts(df, name) else {
            continue;
        };

        let before = raw.iter().filter(|v| v.is_some()).count();
        let parsed: Vec<Option<NaiveDate>> = raw
            .iter()
            .map(|v| v.as_deref().and_then(parse_lenient_date))
            .collect();
        let after = parsed.iter().filter(|d| d.is_some()).count();

        if after < before {
            debug!("{}: {} unparseable values coerced to missing", name, before - after);
        }

        df.with_column(date_series(name, &parsed)?)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{dates, has_column};
    use polars::prelude::{Column, NamedFrom};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_common_layouts() {
        assert_eq!(parse_lenient_date("2024-01-05"), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_lenient_date(" 2024/01/05 "), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_lenient_date("01/05/2024"), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_lenient_date("20240105"), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_lenient_date("Jan 5, 2024"), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_lenient_date("2024-01-05 13:45:00"), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_lenient_date("2024-01-05T23:10:00+02:00"), Some(ymd(2024, 1, 5)));
    }

    #[test]
    fn test_garbage_is_missing() {
        assert_eq!(parse_lenient_date(""), None);
        assert_eq!(parse_lenient_date("not a date"), None);
        assert_eq!(parse_lenient_date("2024-02-30"), None);
        assert_eq!(parse_lenient_date("13/45/2024"), None);
    }

    #[test]
    fn test_normalize_dates_skips_absent_columns() {
        let mut df = DataFrame::new(vec![Column::new(
            "order_date".into(),
            [Some("2024-01-01"), Some("??"), None],
        )])
        .unwrap();

        normalize_dates(&mut df, &["order_date", "ship_date"]).unwrap();

        assert!(!has_column(&df, "ship_date"));
        assert_eq!(
            dates(&df, "order_date").unwrap(),
            vec![Some(ymd(2024, 1, 1)), None, None]
        );
    }

    #[test]
    fn test_normalize_dates_is_repeatable() {
        let mut df =
            DataFrame::new(vec![Column::new("delivery_date".into(), ["03/02/2024"])]).unwrap();

        normalize_dates(&mut df, &["delivery_date"]).unwrap();
        let first = df.clone();
        normalize_dates(&mut df, &["delivery_date"]).unwrap();

        assert!(df.equals_missing(&first));
        assert_eq!(dates(&df, "delivery_date").unwrap(), vec![Some(ymd(2024, 3, 2))]);
    }
}
