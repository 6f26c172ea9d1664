//! CSV persistence for the indicator table
//!
//! Layout: a date column first, then one column per indicator using
//! [`Indicator::column_name`] headers. Dates must be strictly increasing.
//! Empty cells are read as missing and resolved by [`align`](super::align).

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

use super::hygiene::{align, RawSeries};
use super::{Indicator, ObservationSeries};
use crate::error::{CrisisError, Result};

const DATE_HEADER: &str = "Date";

/// Write the series to `path`, replacing any existing file
pub fn save<P: AsRef<Path>>(series: &ObservationSeries, path: P) -> Result<()> {
    let path = path.as_ref();
    let mut wtr = csv::Writer::from_path(path)?;

    let indicators: Vec<Indicator> = series.indicators().collect();
    let mut header = vec![DATE_HEADER.to_string()];
    header.extend(indicators.iter().map(|i| i.column_name().to_string()));
    wtr.write_record(&header)?;

    let columns = indicators
        .iter()
        .map(|i| series.column(*i))
        .collect::<Result<Vec<_>>>()?;

    for (idx, date) in series.dates().iter().enumerate() {
        let mut record = Vec::with_capacity(columns.len() + 1);
        record.push(date.format("%Y-%m-%d").to_string());
        record.extend(columns.iter().map(|c| c[idx].to_string()));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;

    info!("Saved {} rows to {}", series.len(), path.display());
    Ok(())
}

/// Read a series from `path`
pub fn load<P: AsRef<Path>>(path: P) -> Result<ObservationSeries> {
    let path = path.as_ref();
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;

    let headers = rdr.headers()?.clone();
    if headers.is_empty() {
        return Err(CrisisError::Data(format!("{} has no header", path.display())));
    }

    // Column 0 is the date index regardless of its header text
    let mut layout: Vec<(usize, Indicator)> = Vec::new();
    for (idx, name) in headers.iter().enumerate().skip(1) {
        match Indicator::from_column_name(name) {
            Some(indicator) => layout.push((idx, indicator)),
            None => debug!("Ignoring unknown column {:?}", name),
        }
    }

    let mut raw: BTreeMap<Indicator, RawSeries> =
        layout.iter().map(|(_, i)| (*i, Vec::new())).collect();

    let mut previous: Option<NaiveDate> = None;
    for (line, record) in rdr.records().enumerate() {
        let record = record?;
        let date_field = record.get(0).unwrap_or_default();
        let date = parse_date(date_field).ok_or_else(|| {
            CrisisError::Data(format!(
                "{}: invalid date {:?} on data line {}",
                path.display(),
                date_field,
                line + 1
            ))
        })?;
        if let Some(prev) = previous.filter(|p| date <= *p) {
            return Err(CrisisError::InvalidSeries(format!(
                "{}: date {} on data line {} does not follow {}",
                path.display(),
                date,
                line + 1,
                prev
            )));
        }
        previous = Some(date);

        for (idx, indicator) in &layout {
            let cell = record.get(*idx).unwrap_or_default();
            let value = if cell.is_empty() {
                None
            } else {
                Some(cell.parse::<f64>().map_err(|e| {
                    CrisisError::Data(format!(
                        "{}: bad {} value {:?} on data line {}: {}",
                        path.display(),
                        indicator,
                        cell,
                        line + 1,
                        e
                    ))
                })?)
            };
            if let Some(series) = raw.get_mut(indicator) {
                series.push((date, value));
            }
        }
    }

    let series = align(raw)?;
    info!("Loaded {} rows from {}", series.len(), path.display());
    Ok(series)
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time component
fn parse_date(field: &str) -> Option<NaiveDate> {
    let day = field.get(..10).unwrap_or(field);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_variants() {
        let d = NaiveDate::from_ymd_opt(2008, 9, 15).unwrap();
        assert_eq!(parse_date("2008-09-15"), Some(d));
        assert_eq!(parse_date("2008-09-15 00:00:00"), Some(d));
        assert_eq!(parse_date("15/09/2008"), None);
        assert_eq!(parse_date(""), None);
    }
}
