//! Series alignment: outer join on date, forward-fill, drop incomplete rows

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use super::{Indicator, ObservationSeries};
use crate::error::{CrisisError, Result};

/// One indicator's raw observations, possibly with gaps and missing values
pub type RawSeries = Vec<(NaiveDate, Option<f64>)>;

/// Join raw per-indicator series into a gap-free observation table.
///
/// Every date seen in any input becomes a row. Each column is forward-filled
/// from its last known value; rows where a column still has no value (before
/// that indicator's first observation) are dropped.
pub fn align(raw: BTreeMap<Indicator, RawSeries>) -> Result<ObservationSeries> {
    if raw.is_empty() {
        return Err(CrisisError::InvalidSeries("no indicator series to align".into()));
    }

    let all_dates: BTreeSet<NaiveDate> = raw
        .values()
        .flat_map(|series| series.iter().map(|(d, _)| *d))
        .collect();

    let mut filled: BTreeMap<Indicator, Vec<Option<f64>>> = BTreeMap::new();
    for (indicator, series) in &raw {
        let by_date: BTreeMap<NaiveDate, f64> = series
            .iter()
            .filter_map(|(d, v)| v.filter(|x| x.is_finite()).map(|x| (*d, x)))
            .collect();

        let mut last = None;
        let column = all_dates
            .iter()
            .map(|d| {
                if let Some(v) = by_date.get(d) {
                    last = Some(*v);
                }
                last
            })
            .collect();
        filled.insert(*indicator, column);
    }

    let mut dates = Vec::with_capacity(all_dates.len());
    let mut columns: BTreeMap<Indicator, Vec<f64>> =
        raw.keys().map(|k| (*k, Vec::with_capacity(all_dates.len()))).collect();

    for (idx, date) in all_dates.iter().enumerate() {
        if filled.values().any(|col| col[idx].is_none()) {
            continue;
        }
        dates.push(*date);
        for (indicator, col) in &filled {
            if let (Some(out), Some(v)) = (columns.get_mut(indicator), col[idx]) {
                out.push(v);
            }
        }
    }

    if dates.is_empty() {
        return Err(CrisisError::InvalidSeries(
            "no date has a value for every indicator".into(),
        ));
    }

    debug!(
        "Aligned {} indicators: {} candidate dates, {} complete rows",
        raw.len(),
        all_dates.len(),
        dates.len()
    );

    ObservationSeries::new(dates, columns)
}
