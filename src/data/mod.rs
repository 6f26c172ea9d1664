//! Indicator store
//!
//! A date-keyed table of daily indicator values. The table is validated on
//! construction (strictly increasing dates, equal column lengths) and is
//! read-only afterwards.

pub mod csv_store;
pub mod fetch;
pub mod hygiene;

#[cfg(test)]
mod tests;

pub use fetch::{Collector, FredProvider, SeriesProvider, YahooProvider};
pub use hygiene::{align, RawSeries};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{CrisisError, Result};

/// Macro-financial indicators known to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Indicator {
    /// S&P 500 index level; defines the crisis label
    #[serde(rename = "sp500")]
    Sp500,
    /// CBOE volatility index
    #[serde(rename = "vix")]
    Vix,
    /// WTI crude futures
    #[serde(rename = "oil")]
    Oil,
    /// 10Y minus 2Y treasury spread
    #[serde(rename = "t10y2y")]
    YieldSpread,
    /// Gold futures
    #[serde(rename = "gold")]
    Gold,
    /// KRW per USD
    #[serde(rename = "dexkous")]
    UsdKrw,
}

impl Indicator {
    pub const ALL: [Indicator; 6] = [
        Indicator::Sp500,
        Indicator::Vix,
        Indicator::Oil,
        Indicator::YieldSpread,
        Indicator::Gold,
        Indicator::UsdKrw,
    ];

    /// Indicators every collected dataset must carry
    pub const REQUIRED: [Indicator; 4] = [
        Indicator::Sp500,
        Indicator::Vix,
        Indicator::Oil,
        Indicator::YieldSpread,
    ];

    /// Short lowercase key used in config, query strings and feature names
    pub fn key(&self) -> &'static str {
        match self {
            Indicator::Sp500 => "sp500",
            Indicator::Vix => "vix",
            Indicator::Oil => "oil",
            Indicator::YieldSpread => "t10y2y",
            Indicator::Gold => "gold",
            Indicator::UsdKrw => "dexkous",
        }
    }

    /// Column header in the dataset CSV
    pub fn column_name(&self) -> &'static str {
        match self {
            Indicator::Sp500 => "S&P500",
            Indicator::Vix => "VIX",
            Indicator::Oil => "Oil",
            Indicator::YieldSpread => "T10Y2Y",
            Indicator::Gold => "Gold",
            Indicator::UsdKrw => "DEXKOUS",
        }
    }

    pub fn from_column_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|i| i.column_name() == name)
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|i| i.key() == key)
    }

    /// Name of the lagged feature derived from this indicator
    pub fn lagged_name(&self) -> String {
        format!("{}_lag", self.key())
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// Daily observations keyed by date
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationSeries {
    dates: Vec<NaiveDate>,
    columns: BTreeMap<Indicator, Vec<f64>>,
}

impl ObservationSeries {
    /// Build a series, checking date ordering and column lengths
    pub fn new(dates: Vec<NaiveDate>, columns: BTreeMap<Indicator, Vec<f64>>) -> Result<Self> {
        if let Some(pos) = dates.windows(2).position(|w| w[0] >= w[1]) {
            return Err(CrisisError::InvalidSeries(format!(
                "dates must be strictly increasing: {} followed by {}",
                dates[pos],
                dates[pos + 1]
            )));
        }
        for (indicator, values) in &columns {
            if values.len() != dates.len() {
                return Err(CrisisError::InvalidSeries(format!(
                    "column {} has {} values for {} dates",
                    indicator,
                    values.len(),
                    dates.len()
                )));
            }
        }
        Ok(Self { dates, columns })
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn has(&self, indicator: Indicator) -> bool {
        self.columns.contains_key(&indicator)
    }

    /// Indicators present, in stable order
    pub fn indicators(&self) -> impl Iterator<Item = Indicator> + '_ {
        self.columns.keys().copied()
    }

    pub fn column(&self, indicator: Indicator) -> Result<&[f64]> {
        self.columns
            .get(&indicator)
            .map(Vec::as_slice)
            .ok_or(CrisisError::MissingIndicator(indicator))
    }

    /// Last `n` rows (or all of them when shorter)
    pub fn tail(&self, n: usize) -> ObservationSeries {
        let start = self.len().saturating_sub(n);
        Self {
            dates: self.dates[start..].to_vec(),
            columns: self
                .columns
                .iter()
                .map(|(k, v)| (*k, v[start..].to_vec()))
                .collect(),
        }
    }

    /// Values of every column on row `idx`
    pub fn row(&self, idx: usize) -> Option<(NaiveDate, Vec<(Indicator, f64)>)> {
        let date = *self.dates.get(idx)?;
        let values = self.columns.iter().map(|(k, v)| (*k, v[idx])).collect();
        Some((date, values))
    }
}
